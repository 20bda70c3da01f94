#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::SqlitePool;

use syllabus_planner::calendar::{CalendarClient, CalendarEvent};
use syllabus_planner::db::{connect_in_memory, repository};
use syllabus_planner::error::AppError;
use syllabus_planner::json::JsonRepairer;
use syllabus_planner::llm::{Agent, LlmClient, Message};
use syllabus_planner::models::DocumentKind;
use syllabus_planner::services::{DocumentSource, PlannerAgents};

pub const ANALYSIS_REPLY: &str = "Here is the analysis:\n```json\n{\"tasks\":{\"Project\":{\"difficulty\":\"Hard\",\"day_needed\":[7,14]}},\"topic\":[\"Threads\",\"Scheduling\"],\"contains_schedule\":\"false\"}\n```";

pub const PLAN_REPLY: &str = r#"{"schedule":[{"date":"9.1","dues":["Project 0"],"start":["Homework 1"]},{"date":"9.3","dues":[],"start":["Lab 1"]}]}"#;

/// Replies in order, then fails. Records every request.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlm {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn last_user_message(&self) -> Option<String> {
        self.seen
            .lock()
            .unwrap()
            .last()
            .and_then(|m| m.last())
            .map(|m| m.content.clone())
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(&self, messages: &[Message]) -> Result<String, AppError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::Llm("no scripted reply left".to_string()))
    }
}

#[derive(Default)]
pub struct FakeDocuments {
    docs: Mutex<HashMap<DocumentKind, String>>,
    pub requests: Mutex<Vec<DocumentKind>>,
}

impl FakeDocuments {
    pub fn with(docs: &[(DocumentKind, &str)]) -> Arc<Self> {
        let fake = Self::default();
        for (kind, text) in docs {
            fake.docs.lock().unwrap().insert(*kind, text.to_string());
        }
        Arc::new(fake)
    }
}

#[async_trait]
impl DocumentSource for FakeDocuments {
    async fn retrieve(
        &self,
        kind: DocumentKind,
        username: &str,
        course_id: &str,
    ) -> Result<String, AppError> {
        self.requests.lock().unwrap().push(kind);
        self.docs.lock().unwrap().get(&kind).cloned().ok_or_else(|| {
            AppError::Retrieval(format!(
                "No {kind} file found for user '{username}' and course '{course_id}'. Please upload a {kind} first."
            ))
        })
    }
}

pub struct RecordingCalendar {
    fail: bool,
    pub pushed: Mutex<Vec<CalendarEvent>>,
}

impl RecordingCalendar {
    pub fn working() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            pushed: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            pushed: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl CalendarClient for RecordingCalendar {
    async fn create_events(&self, events: &[CalendarEvent], _username: &str) -> Result<usize, AppError> {
        if self.fail {
            return Err(AppError::Calendar("quota exceeded".to_string()));
        }
        self.pushed.lock().unwrap().extend_from_slice(events);
        Ok(events.len())
    }
}

pub struct Llms {
    pub syllabus: Arc<ScriptedLlm>,
    pub planner: Arc<ScriptedLlm>,
    pub repair: Arc<ScriptedLlm>,
}

impl Llms {
    pub fn new(syllabus: &[&str], planner: &[&str], repair: &[&str]) -> Self {
        Self {
            syllabus: ScriptedLlm::new(syllabus),
            planner: ScriptedLlm::new(planner),
            repair: ScriptedLlm::new(repair),
        }
    }

    pub fn agents(&self) -> PlannerAgents {
        PlannerAgents {
            syllabus: Agent::new("syllabus_agent", "analyze", self.syllabus.clone()),
            planner: Agent::new("plan_agent", "plan", self.planner.clone()),
            repairer: JsonRepairer::new(Agent::new("json_agent", "fix", self.repair.clone())),
        }
    }
}

/// A registered course with both documents freshly uploaded.
pub async fn setup_db(username: &str, course_id: &str) -> SqlitePool {
    let db = connect_in_memory().await.expect("Failed to create database");
    repository::register_course(&db, username, course_id, "Operating Systems")
        .await
        .expect("Failed to register course");
    repository::mark_document_updated(&db, username, course_id, DocumentKind::Syllabus)
        .await
        .unwrap();
    repository::mark_document_updated(&db, username, course_id, DocumentKind::Calendar)
        .await
        .unwrap();
    db
}
