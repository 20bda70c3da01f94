use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::models::{
    Course, CourseRecord, DocumentKind, ReviewTurn, SchedulePlan, SyllabusAnalysis,
};

fn decode_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, sqlx::Error> {
    serde_json::to_string(value).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

pub async fn fetch_user_courses(db: &SqlitePool, username: &str) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        r#"
        SELECT c.id AS course_id, c.name AS course_name
        FROM user_courses uc
        JOIN courses c ON c.id = uc.course_id
        WHERE uc.username = ?1
        ORDER BY uc.added_at ASC
        "#,
    )
    .bind(username)
    .fetch_all(db)
    .await
}

pub async fn user_has_course(
    db: &SqlitePool,
    username: &str,
    course_id: &str,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM user_courses WHERE username = ?1 AND course_id = ?2")
            .bind(username)
            .bind(course_id)
            .fetch_optional(db)
            .await?;
    Ok(row.is_some())
}

/// Registers `course_id` for `username`, creating the course and a clean
/// record if needed. Returns false when the user already has the course.
pub async fn register_course(
    db: &SqlitePool,
    username: &str,
    course_id: &str,
    course_name: &str,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let mut tx = db.begin().await?;

    sqlx::query("INSERT OR IGNORE INTO courses (id, name, created_at) VALUES (?1, ?2, ?3)")
        .bind(course_id)
        .bind(course_name)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

    let added = sqlx::query(
        "INSERT OR IGNORE INTO user_courses (username, course_id, added_at) VALUES (?1, ?2, ?3)",
    )
    .bind(username)
    .bind(course_id)
    .bind(&now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    // An upload may have created the record already; its flags stay as they are.
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO course_records
            (username, course_id, syllabus_updated, calendar_updated, flags_updated_at)
        VALUES (?1, ?2, 0, 0, ?3)
        "#,
    )
    .bind(username)
    .bind(course_id)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(added > 0)
}

/// Removes the registration and everything cached for the pair.
pub async fn delete_user_course(
    db: &SqlitePool,
    username: &str,
    course_id: &str,
) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;

    let removed = sqlx::query("DELETE FROM user_courses WHERE username = ?1 AND course_id = ?2")
        .bind(username)
        .bind(course_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if removed == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    for table in ["documents", "analyses", "schedules", "course_records"] {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE username = ?1 AND course_id = ?2",
            table
        ))
        .bind(username)
        .bind(course_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(true)
}

pub async fn fetch_course_record(
    db: &SqlitePool,
    username: &str,
    course_id: &str,
) -> Result<Option<CourseRecord>, sqlx::Error> {
    sqlx::query_as::<_, CourseRecord>(
        r#"
        SELECT username, course_id, syllabus_updated, calendar_updated
        FROM course_records
        WHERE username = ?1 AND course_id = ?2
        "#,
    )
    .bind(username)
    .bind(course_id)
    .fetch_optional(db)
    .await
}

/// Raises the dirty flag for `kind`, leaving the other flag untouched.
pub async fn mark_document_updated<'e, E>(
    db: E,
    username: &str,
    course_id: &str,
    kind: DocumentKind,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO course_records
            (username, course_id, syllabus_updated, calendar_updated, flags_updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(username, course_id) DO UPDATE SET
            syllabus_updated = MAX(syllabus_updated, excluded.syllabus_updated),
            calendar_updated = MAX(calendar_updated, excluded.calendar_updated),
            flags_updated_at = excluded.flags_updated_at
        "#,
    )
    .bind(username)
    .bind(course_id)
    .bind(kind == DocumentKind::Syllabus)
    .bind(kind == DocumentKind::Calendar)
    .bind(now)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn clear_syllabus_flag<'e, E>(
    db: E,
    username: &str,
    course_id: &str,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "UPDATE course_records SET syllabus_updated = 0 WHERE username = ?1 AND course_id = ?2",
    )
    .bind(username)
    .bind(course_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn clear_all_flags<'e, E>(db: E, username: &str, course_id: &str) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        UPDATE course_records
        SET syllabus_updated = 0, calendar_updated = 0
        WHERE username = ?1 AND course_id = ?2
        "#,
    )
    .bind(username)
    .bind(course_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn upsert_document<'e, E>(
    db: E,
    username: &str,
    course_id: &str,
    kind: DocumentKind,
    filename: Option<&str>,
    content: &str,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO documents (username, course_id, kind, filename, content, uploaded_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(username, course_id, kind) DO UPDATE SET
            filename = excluded.filename,
            content = excluded.content,
            uploaded_at = excluded.uploaded_at
        "#,
    )
    .bind(username)
    .bind(course_id)
    .bind(kind.as_str())
    .bind(filename)
    .bind(content)
    .bind(now)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn fetch_document(
    db: &SqlitePool,
    username: &str,
    course_id: &str,
    kind: DocumentKind,
) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT content FROM documents WHERE username = ?1 AND course_id = ?2 AND kind = ?3",
    )
    .bind(username)
    .bind(course_id)
    .bind(kind.as_str())
    .fetch_optional(db)
    .await?;
    Ok(row.map(|(content,)| content))
}

pub async fn fetch_document_kinds(
    db: &SqlitePool,
    username: &str,
    course_id: &str,
) -> Result<Vec<DocumentKind>, sqlx::Error> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT kind FROM documents WHERE username = ?1 AND course_id = ?2")
            .bind(username)
            .bind(course_id)
            .fetch_all(db)
            .await?;

    rows.into_iter()
        .map(|(kind,)| {
            kind.parse::<DocumentKind>()
                .map_err(|e| sqlx::Error::Decode(e.into()))
        })
        .collect()
}

pub async fn fetch_analysis(
    db: &SqlitePool,
    username: &str,
    course_id: &str,
) -> Result<Option<SyllabusAnalysis>, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT analysis FROM analyses WHERE username = ?1 AND course_id = ?2")
            .bind(username)
            .bind(course_id)
            .fetch_optional(db)
            .await?;

    row.map(|(raw,)| decode_json(&raw)).transpose()
}

pub async fn upsert_analysis<'e, E>(
    db: E,
    username: &str,
    course_id: &str,
    analysis: &SyllabusAnalysis,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let raw = encode_json(analysis)?;
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO analyses (username, course_id, analysis, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(username, course_id) DO UPDATE SET
            analysis = excluded.analysis,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(username)
    .bind(course_id)
    .bind(raw)
    .bind(now)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn fetch_schedule(
    db: &SqlitePool,
    username: &str,
    course_id: &str,
) -> Result<Option<SchedulePlan>, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT schedule FROM schedules WHERE username = ?1 AND course_id = ?2")
            .bind(username)
            .bind(course_id)
            .fetch_optional(db)
            .await?;

    row.map(|(raw,)| decode_json(&raw)).transpose()
}

pub async fn upsert_schedule<'e, E>(
    db: E,
    username: &str,
    course_id: &str,
    plan: &SchedulePlan,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let raw = encode_json(plan)?;
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO schedules (username, course_id, schedule, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(username, course_id) DO UPDATE SET
            schedule = excluded.schedule,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(username)
    .bind(course_id)
    .bind(raw)
    .bind(now)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn insert_review_history(
    db: &SqlitePool,
    session_id: &str,
    turns: &[ReviewTurn],
) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let mut tx = db.begin().await?;

    for turn in turns {
        sqlx::query(
            "INSERT INTO review_history (session_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(session_id)
        .bind(&turn.role)
        .bind(&turn.content)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

pub async fn fetch_review_history(
    db: &SqlitePool,
    session_id: &str,
) -> Result<Vec<ReviewTurn>, sqlx::Error> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT role, content FROM review_history WHERE session_id = ?1 ORDER BY id ASC",
    )
    .bind(session_id)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(role, content)| ReviewTurn { role, content })
        .collect())
}
