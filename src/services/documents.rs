use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{DocumentKind, UploadDocumentRequest, UploadStatus};

/// Source text for the syllabus and calendar of a (username, course_id) pair.
///
/// A missing document is a `Retrieval` error carrying a user-facing message.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn retrieve(
        &self,
        kind: DocumentKind,
        username: &str,
        course_id: &str,
    ) -> Result<String, AppError>;
}

pub struct SqliteDocumentSource {
    db: SqlitePool,
}

impl SqliteDocumentSource {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentSource for SqliteDocumentSource {
    async fn retrieve(
        &self,
        kind: DocumentKind,
        username: &str,
        course_id: &str,
    ) -> Result<String, AppError> {
        match repository::fetch_document(&self.db, username, course_id, kind).await? {
            Some(content) if !content.trim().is_empty() => Ok(content),
            Some(_) => Err(AppError::Retrieval(format!(
                "Failed to extract text from {} file.",
                kind
            ))),
            None => Err(AppError::Retrieval(format!(
                "No {kind} file found for user '{username}' and course '{course_id}'. Please upload a {kind} first."
            ))),
        }
    }
}

/// Stores an uploaded document and raises its dirty flag, registering the course if needed.
pub async fn store_upload(
    db: &SqlitePool,
    username: &str,
    req: &UploadDocumentRequest,
) -> Result<(), AppError> {
    if req.course_id.trim().is_empty() {
        return Err(AppError::BadRequest("Course ID is required".to_string()));
    }
    if req.content.trim().is_empty() {
        return Err(AppError::BadRequest(format!("The {} document is empty", req.kind)));
    }

    if !repository::user_has_course(db, username, &req.course_id).await? {
        let name = format!("Course {}", req.course_id);
        repository::register_course(db, username, &req.course_id, &name).await?;
        info!("Created course {} for user {}", req.course_id, username);
    }

    let mut tx = db.begin().await?;
    repository::upsert_document(
        &mut *tx,
        username,
        &req.course_id,
        req.kind,
        req.filename.as_deref(),
        &req.content,
    )
    .await?;
    repository::mark_document_updated(&mut *tx, username, &req.course_id, req.kind).await?;
    tx.commit().await?;

    info!("Marked {} as updated for user {} and course {}", req.kind, username, req.course_id);
    Ok(())
}

pub async fn upload_status(
    db: &SqlitePool,
    username: &str,
    course_id: &str,
) -> Result<UploadStatus, AppError> {
    let kinds = repository::fetch_document_kinds(db, username, course_id).await?;
    let record = repository::fetch_course_record(db, username, course_id).await?;

    Ok(UploadStatus {
        course_id: course_id.to_string(),
        syllabus_uploaded: kinds.contains(&DocumentKind::Syllabus),
        calendar_uploaded: kinds.contains(&DocumentKind::Calendar),
        syllabus_updated: record.as_ref().is_some_and(|r| r.syllabus_updated),
        calendar_updated: record.as_ref().is_some_and(|r| r.calendar_updated),
    })
}
