use std::sync::Arc;

use sqlx::SqlitePool;

use crate::calendar::CalendarClient;
use crate::services::{DocumentSource, PlannerAgents, ReviewAgents, ReviewSessions};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub agents: PlannerAgents,
    pub review_agents: ReviewAgents,
    pub documents: Arc<dyn DocumentSource>,
    pub calendar: Arc<dyn CalendarClient>,
    pub sessions: ReviewSessions,
}
