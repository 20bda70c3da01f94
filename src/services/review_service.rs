use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::json::JsonRepairer;
use crate::llm::{Agent, Conversation, LlmClient, prompts};
use crate::models::{ReviewFeedback, ReviewTurn, StartReviewRequest};

/// Clients behind the per-topic review and question agents.
#[derive(Clone)]
pub struct ReviewAgents {
    pub reviewer: Arc<dyn LlmClient>,
    pub questioner: Arc<dyn LlmClient>,
    pub repairer: JsonRepairer,
}

pub struct ReviewSession {
    username: String,
    course_id: String,
    topic: String,
    conversation: Conversation,
}

impl ReviewSession {
    fn transcript(&self) -> Vec<ReviewTurn> {
        self.conversation
            .history()
            .iter()
            .map(|m| ReviewTurn {
                role: m.role.clone(),
                content: m.content.clone(),
            })
            .collect()
    }
}

/// Live sessions keyed by id. Each session is locked for the length of one model call.
#[derive(Clone, Default)]
pub struct ReviewSessions {
    inner: Arc<RwLock<HashMap<String, Arc<Mutex<ReviewSession>>>>>,
}

impl ReviewSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn active(&self) -> usize {
        self.inner.read().await.len()
    }

    async fn insert(&self, id: String, session: ReviewSession) {
        self.inner
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
    }

    /// Unknown ids and sessions owned by someone else look the same to the caller.
    async fn get(&self, id: &str, username: &str) -> Result<Arc<Mutex<ReviewSession>>, AppError> {
        let session = self
            .inner
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(AppError::NotFound)?;

        if session.lock().await.username != username {
            return Err(AppError::NotFound);
        }
        Ok(session)
    }

    async fn remove(&self, id: &str) {
        self.inner.write().await.remove(id);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartedSession {
    pub session_id: String,
    pub course_id: String,
    pub topic: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewQuestion {
    pub session_id: String,
    pub question: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoppedSession {
    pub session_id: String,
    pub turns_saved: usize,
}

pub struct ReviewService {
    db: SqlitePool,
    agents: ReviewAgents,
    sessions: ReviewSessions,
}

impl ReviewService {
    pub fn new(db: SqlitePool, agents: ReviewAgents, sessions: ReviewSessions) -> Self {
        Self {
            db,
            agents,
            sessions,
        }
    }

    pub async fn topics(&self, username: &str, course_id: &str) -> Result<Vec<String>, AppError> {
        let analysis = repository::fetch_analysis(&self.db, username, course_id)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok(analysis.topic)
    }

    pub async fn start(
        &self,
        username: &str,
        req: &StartReviewRequest,
    ) -> Result<StartedSession, AppError> {
        if req.topic.trim().is_empty() {
            return Err(AppError::BadRequest("Topic is required".to_string()));
        }
        if !repository::user_has_course(&self.db, username, &req.course_id).await? {
            return Err(AppError::NotFound);
        }

        let agent = Agent::new(
            "review_agent",
            prompts::review_prompt(&req.topic),
            self.agents.reviewer.clone(),
        );
        let session_id = Uuid::new_v4().to_string();

        self.sessions
            .insert(
                session_id.clone(),
                ReviewSession {
                    username: username.to_string(),
                    course_id: req.course_id.clone(),
                    topic: req.topic.clone(),
                    conversation: agent.conversation(),
                },
            )
            .await;

        info!("Started review session {} on '{}' for {}", session_id, req.topic, username);
        Ok(StartedSession {
            session_id,
            course_id: req.course_id.clone(),
            topic: req.topic.clone(),
        })
    }

    pub async fn question(&self, username: &str, session_id: &str) -> Result<ReviewQuestion, AppError> {
        let session = self.sessions.get(session_id, username).await?;
        let topic = session.lock().await.topic.clone();

        let agent = Agent::new(
            "question_agent",
            prompts::question_prompt(&topic),
            self.agents.questioner.clone(),
        );
        let question = agent.send(&format!("Ask me a question about {}.", topic)).await?;

        Ok(ReviewQuestion {
            session_id: session_id.to_string(),
            question: question.trim().to_string(),
        })
    }

    pub async fn answer(
        &self,
        username: &str,
        session_id: &str,
        explanation: &str,
    ) -> Result<ReviewFeedback, AppError> {
        if explanation.trim().is_empty() {
            return Err(AppError::BadRequest("Explanation is required".to_string()));
        }

        let session = self.sessions.get(session_id, username).await?;
        let mut session = session.lock().await;

        let raw = session.conversation.send(explanation).await?;
        let value = self.agents.repairer.repair(&raw).await?;
        ReviewFeedback::from_value(value)
    }

    pub async fn stop(&self, username: &str, session_id: &str) -> Result<StoppedSession, AppError> {
        let session = self.sessions.get(session_id, username).await?;
        let turns = session.lock().await.transcript();

        repository::insert_review_history(&self.db, session_id, &turns).await?;
        self.sessions.remove(session_id).await;

        let course_id = session.lock().await.course_id.clone();
        info!(
            "Stopped review session {} for {}/{} with {} turns",
            session_id,
            username,
            course_id,
            turns.len()
        );
        Ok(StoppedSession {
            session_id: session_id.to_string(),
            turns_saved: turns.len(),
        })
    }
}
