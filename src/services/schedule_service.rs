use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::calendar::{CalendarClient, plan_to_events};
use crate::db::repository;
use crate::error::AppError;
use crate::json::JsonRepairer;
use crate::llm::{Agent, prompts};
use crate::models::{DocumentKind, SchedulePlan, SyllabusAnalysis};
use crate::services::cache::{CacheState, should_reuse_analysis, should_reuse_schedule};
use crate::services::documents::DocumentSource;

/// The agents the orchestrator talks to, built by the caller and injected.
#[derive(Clone)]
pub struct PlannerAgents {
    pub syllabus: Agent,
    pub planner: Agent,
    pub repairer: JsonRepairer,
}

#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub username: String,
    pub course_id: String,
    pub force_refresh: bool,
    pub push_to_calendar: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanSource {
    Cached,
    Generated,
}

/// Result of a calendar push. A failed push never invalidates the stored plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub events: usize,
    pub created: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleOutcome {
    pub schedule: SchedulePlan,
    pub source: PlanSource,
    pub analysis_regenerated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar: Option<PushReport>,
}

/// Orchestrator states. Failure leaves the loop through `?`.
#[derive(Debug)]
enum Stage {
    CachedSchedule(SchedulePlan),
    NeedAnalysis,
    HaveAnalysisNeedSchedule(SyllabusAnalysis),
    Done(SchedulePlan, PlanSource),
}

pub struct ScheduleService {
    db: SqlitePool,
    agents: PlannerAgents,
    documents: Arc<dyn DocumentSource>,
    calendar: Arc<dyn CalendarClient>,
}

impl ScheduleService {
    pub fn new(
        db: SqlitePool,
        agents: PlannerAgents,
        documents: Arc<dyn DocumentSource>,
        calendar: Arc<dyn CalendarClient>,
    ) -> Self {
        Self {
            db,
            agents,
            documents,
            calendar,
        }
    }

    pub async fn run(&self, req: &ScheduleRequest) -> Result<ScheduleOutcome, AppError> {
        let mut stage = self.initial_stage(req).await?;
        let mut analysis_regenerated = false;

        let (schedule, source) = loop {
            stage = match stage {
                Stage::CachedSchedule(plan) => {
                    info!("Using cached schedule for {}/{}", req.username, req.course_id);
                    Stage::Done(plan, PlanSource::Cached)
                }
                Stage::NeedAnalysis => {
                    let analysis = self.regenerate_analysis(req).await?;
                    analysis_regenerated = true;
                    Stage::HaveAnalysisNeedSchedule(analysis)
                }
                Stage::HaveAnalysisNeedSchedule(analysis) => {
                    let plan = self.regenerate_schedule(req, &analysis).await?;
                    Stage::Done(plan, PlanSource::Generated)
                }
                Stage::Done(plan, source) => break (plan, source),
            };
        };

        let calendar = if req.push_to_calendar {
            Some(self.push_to_calendar(req, &schedule).await)
        } else {
            None
        };

        Ok(ScheduleOutcome {
            schedule,
            source,
            analysis_regenerated,
            calendar,
        })
    }

    async fn initial_stage(&self, req: &ScheduleRequest) -> Result<Stage, AppError> {
        let record = repository::fetch_course_record(&self.db, &req.username, &req.course_id).await?;
        let analysis = repository::fetch_analysis(&self.db, &req.username, &req.course_id).await?;
        let schedule = repository::fetch_schedule(&self.db, &req.username, &req.course_id).await?;

        let state = CacheState::new(record.as_ref(), analysis.is_some(), schedule.is_some());

        if should_reuse_schedule(&state, req.force_refresh) {
            if let Some(plan) = schedule {
                return Ok(Stage::CachedSchedule(plan));
            }
        }

        match analysis {
            Some(analysis) if should_reuse_analysis(&state, req.force_refresh) => {
                info!("Using cached analysis for {}/{}", req.username, req.course_id);
                Ok(Stage::HaveAnalysisNeedSchedule(analysis))
            }
            _ => Ok(Stage::NeedAnalysis),
        }
    }

    async fn regenerate_analysis(&self, req: &ScheduleRequest) -> Result<SyllabusAnalysis, AppError> {
        info!("Analyzing syllabus for {}/{}", req.username, req.course_id);
        let syllabus = self
            .documents
            .retrieve(DocumentKind::Syllabus, &req.username, &req.course_id)
            .await?;

        let raw = self.agents.syllabus.send(&syllabus).await?;
        let value = self.agents.repairer.repair(&raw).await?;
        let analysis = SyllabusAnalysis::from_value(value)?;

        let mut tx = self.db.begin().await?;
        repository::upsert_analysis(&mut *tx, &req.username, &req.course_id, &analysis).await?;
        repository::clear_syllabus_flag(&mut *tx, &req.username, &req.course_id).await?;
        tx.commit().await?;

        Ok(analysis)
    }

    async fn regenerate_schedule(
        &self,
        req: &ScheduleRequest,
        analysis: &SyllabusAnalysis,
    ) -> Result<SchedulePlan, AppError> {
        info!("Generating schedule for {}/{}", req.username, req.course_id);
        let calendar_text = self
            .documents
            .retrieve(DocumentKind::Calendar, &req.username, &req.course_id)
            .await?;

        let analysis_json = serde_json::to_string(analysis)
            .map_err(|e| AppError::InvalidOutput(format!("syllabus analysis: {}", e)))?;
        let prompt = prompts::schedule_request(&analysis_json, &calendar_text);

        let raw = self.agents.planner.send(&prompt).await?;
        let value = self.agents.repairer.repair(&raw).await?;
        let plan = SchedulePlan::from_value(value)?;

        let mut tx = self.db.begin().await?;
        repository::upsert_schedule(&mut *tx, &req.username, &req.course_id, &plan).await?;
        repository::clear_all_flags(&mut *tx, &req.username, &req.course_id).await?;
        tx.commit().await?;

        info!("Stored {} schedule days for {}/{}", plan.0.len(), req.username, req.course_id);
        Ok(plan)
    }

    async fn push_to_calendar(&self, req: &ScheduleRequest, plan: &SchedulePlan) -> PushReport {
        let events = plan_to_events(plan, &req.username, &req.course_id);

        match self.calendar.create_events(&events, &req.username).await {
            Ok(created) => {
                info!("Pushed {}/{} calendar events for {}", created, events.len(), req.username);
                PushReport {
                    events: events.len(),
                    created,
                    error: None,
                }
            }
            Err(e) => {
                let err = AppError::Push(e.to_string());
                warn!("{}", err);
                PushReport {
                    events: events.len(),
                    created: 0,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}
