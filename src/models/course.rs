use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub course_id: String,
    pub course_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourseRequest {
    pub course_id: String,
    pub course_name: String,
}

/// Dirty flags for one (username, course_id) pair.
///
/// A flag is raised only by an upload of the matching document kind and is
/// lowered only after a regeneration that consumed it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CourseRecord {
    pub username: String,
    pub course_id: String,
    pub syllabus_updated: bool,
    pub calendar_updated: bool,
}

impl CourseRecord {
    pub fn clean(username: &str, course_id: &str) -> Self {
        Self {
            username: username.to_string(),
            course_id: course_id.to_string(),
            syllabus_updated: false,
            calendar_updated: false,
        }
    }
}
