use axum::extract::{FromRequestParts, Path, Query};
use axum::http::request::Parts;
use axum::routing::{delete, post};
use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;

use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::services::documents::{store_upload, upload_status};
use crate::services::review_service::{ReviewQuestion, StartedSession, StoppedSession};
use crate::services::{ReviewService, ScheduleOutcome, ScheduleRequest, ScheduleService};
use crate::state::AppState;

pub const USERNAME_HEADER: &str = "x-application-username";

/// The calling user, taken from the `x-application-username` header.
pub struct Username(pub String);

impl<S> FromRequestParts<S> for Username
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let username = parts
            .headers
            .get(USERNAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::BadRequest(format!("{} header is required", USERNAME_HEADER)))?;
        Ok(Username(username.to_string()))
    }
}

#[derive(Deserialize)]
struct CourseQuery {
    course_id: String,
}

#[derive(Deserialize)]
struct ScheduleQuery {
    course_id: String,
    #[serde(default)]
    force_refresh: bool,
    #[serde(default)]
    make_schedule: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/{course_id}", delete(delete_course))
        .route("/documents", get(document_status).post(upload_document))
        .route("/schedule", get(get_schedule))
        .route("/review/topics", get(review_topics))
        .route("/review/sessions", post(start_review))
        .route("/review/sessions/{id}", delete(stop_review))
        .route("/review/sessions/{id}/question", get(review_question))
        .route("/review/sessions/{id}/answer", post(review_answer))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_courses(
    State(state): State<AppState>,
    Username(username): Username,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = repository::fetch_user_courses(&state.db, &username).await?;
    Ok(Json(courses))
}

async fn create_course(
    State(state): State<AppState>,
    Username(username): Username,
    Json(req): Json<NewCourseRequest>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    if req.course_id.trim().is_empty() || req.course_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Course ID and course name are required".to_string(),
        ));
    }

    let created =
        repository::register_course(&state.db, &username, &req.course_id, &req.course_name).await?;
    if !created {
        return Err(AppError::Conflict(format!(
            "Course {} already registered",
            req.course_id
        )));
    }

    Ok((
        StatusCode::CREATED,
        Json(Course {
            course_id: req.course_id,
            course_name: req.course_name,
        }),
    ))
}

async fn delete_course(
    State(state): State<AppState>,
    Username(username): Username,
    Path(course_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let ok = repository::delete_user_course(&state.db, &username, &course_id).await?;
    if ok {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn upload_document(
    State(state): State<AppState>,
    Username(username): Username,
    Json(req): Json<UploadDocumentRequest>,
) -> Result<Json<UploadStatus>, AppError> {
    store_upload(&state.db, &username, &req).await?;
    let status = upload_status(&state.db, &username, &req.course_id).await?;
    Ok(Json(status))
}

async fn document_status(
    State(state): State<AppState>,
    Username(username): Username,
    Query(params): Query<CourseQuery>,
) -> Result<Json<UploadStatus>, AppError> {
    let status = upload_status(&state.db, &username, &params.course_id).await?;
    Ok(Json(status))
}

async fn get_schedule(
    State(state): State<AppState>,
    Username(username): Username,
    Query(params): Query<ScheduleQuery>,
) -> Result<Json<ScheduleOutcome>, AppError> {
    let service = ScheduleService::new(
        state.db.clone(),
        state.agents.clone(),
        state.documents.clone(),
        state.calendar.clone(),
    );
    let outcome = service
        .run(&ScheduleRequest {
            username,
            course_id: params.course_id,
            force_refresh: params.force_refresh,
            push_to_calendar: params.make_schedule,
        })
        .await?;
    Ok(Json(outcome))
}

fn review_service(state: &AppState) -> ReviewService {
    ReviewService::new(
        state.db.clone(),
        state.review_agents.clone(),
        state.sessions.clone(),
    )
}

async fn review_topics(
    State(state): State<AppState>,
    Username(username): Username,
    Query(params): Query<CourseQuery>,
) -> Result<Json<Vec<String>>, AppError> {
    let topics = review_service(&state)
        .topics(&username, &params.course_id)
        .await?;
    Ok(Json(topics))
}

async fn start_review(
    State(state): State<AppState>,
    Username(username): Username,
    Json(req): Json<StartReviewRequest>,
) -> Result<(StatusCode, Json<StartedSession>), AppError> {
    let started = review_service(&state).start(&username, &req).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

async fn review_question(
    State(state): State<AppState>,
    Username(username): Username,
    Path(id): Path<String>,
) -> Result<Json<ReviewQuestion>, AppError> {
    let question = review_service(&state).question(&username, &id).await?;
    Ok(Json(question))
}

async fn review_answer(
    State(state): State<AppState>,
    Username(username): Username,
    Path(id): Path<String>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<ReviewFeedback>, AppError> {
    let feedback = review_service(&state)
        .answer(&username, &id, &req.explanation)
        .await?;
    Ok(Json(feedback))
}

async fn stop_review(
    State(state): State<AppState>,
    Username(username): Username,
    Path(id): Path<String>,
) -> Result<Json<StoppedSession>, AppError> {
    let stopped = review_service(&state).stop(&username, &id).await?;
    Ok(Json(stopped))
}
