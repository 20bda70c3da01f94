use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use syllabus_planner::api::router;
use syllabus_planner::calendar::{
    CalendarClient, CalendarConfig, GoogleCalendarClient, NoopCalendarClient,
};
use syllabus_planner::config::AppConfig;
use syllabus_planner::db;
use syllabus_planner::error::AppError;
use syllabus_planner::json::JsonRepairer;
use syllabus_planner::llm::{Agent, HttpLlmClient, LlmClient, LlmConfig, Provider, prompts};
use syllabus_planner::services::{PlannerAgents, ReviewAgents, ReviewSessions, SqliteDocumentSource};
use syllabus_planner::state::AppState;

fn llm_client(provider: Provider, json_mode: bool) -> Result<Arc<dyn LlmClient>, AppError> {
    let config = LlmConfig::new_from_env(provider)?.with_json_mode(json_mode);
    Ok(Arc::new(HttpLlmClient::new(config)?))
}

fn calendar_client() -> Result<Arc<dyn CalendarClient>, AppError> {
    match CalendarConfig::new_from_env() {
        Ok(config) => Ok(Arc::new(GoogleCalendarClient::new(config)?)),
        Err(e) => {
            warn!("{}; calendar push disabled", e);
            Ok(Arc::new(NoopCalendarClient))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "syllabus_planner=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let pool = db::connect(&config.database_url).await?;

    let openai = llm_client(Provider::OpenAi, true)?;
    let deepseek = llm_client(Provider::DeepSeek, true)?;
    let moonshot = llm_client(Provider::Moonshot, true)?;

    let repairer = JsonRepairer::new(Agent::new("json_agent", prompts::JSON_FIX_PROMPT, moonshot));
    let agents = PlannerAgents {
        syllabus: Agent::new("syllabus_agent", prompts::SYLLABUS_ANALYSIS_PROMPT, openai.clone()),
        planner: Agent::new("plan_agent", prompts::STUDY_PLAN_PROMPT, deepseek),
        repairer: repairer.clone(),
    };
    let review_agents = ReviewAgents {
        reviewer: openai,
        questioner: llm_client(Provider::OpenAi, false)?,
        repairer,
    };

    let state = AppState {
        db: pool.clone(),
        agents,
        review_agents,
        documents: Arc::new(SqliteDocumentSource::new(pool.clone())),
        calendar: calendar_client()?,
        sessions: ReviewSessions::new(),
    };

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
