use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Syllabus,
    Calendar,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Syllabus => "syllabus",
            DocumentKind::Calendar => "calendar",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "syllabus" => Ok(DocumentKind::Syllabus),
            "calendar" => Ok(DocumentKind::Calendar),
            other => Err(format!("unknown document kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDocumentRequest {
    pub course_id: String,
    pub kind: DocumentKind,
    /// Text already extracted from the uploaded file.
    pub content: String,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadStatus {
    pub course_id: String,
    pub syllabus_uploaded: bool,
    pub calendar_uploaded: bool,
    pub syllabus_updated: bool,
    pub calendar_updated: bool,
}
