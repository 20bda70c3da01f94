pub mod analysis;
pub mod course;
pub mod document;
pub mod review;
pub mod schedule;

pub use analysis::{SyllabusAnalysis, TaskEstimate};
pub use course::{Course, CourseRecord, NewCourseRequest};
pub use document::{DocumentKind, UploadDocumentRequest, UploadStatus};
pub use review::{ReviewFeedback, ReviewTurn, StartReviewRequest, AnswerRequest};
pub use schedule::{DayEntry, SchedulePlan};
