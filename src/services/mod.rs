pub mod cache;
pub mod documents;
pub mod review_service;
pub mod schedule_service;

pub use documents::{DocumentSource, SqliteDocumentSource};
pub use review_service::{ReviewAgents, ReviewService, ReviewSessions};
pub use schedule_service::{
    PlanSource, PlannerAgents, PushReport, ScheduleOutcome, ScheduleRequest, ScheduleService,
};
