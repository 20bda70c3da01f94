use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::models::analysis::lenient_bool;

/// Evaluation returned by the review agent for one explanation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewFeedback {
    #[serde(default)]
    pub thought: String,
    /// One of "Good", "Needs Improvement", "Off Topic".
    #[serde(default)]
    pub evaluation: String,
    #[serde(default)]
    pub next_steps: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub continue_conversation: bool,
    #[serde(default)]
    pub response: String,
}

impl ReviewFeedback {
    pub fn from_value(value: Value) -> Result<Self, AppError> {
        if !value.is_object() {
            return Err(AppError::InvalidOutput(format!(
                "review feedback must be a JSON object, got: {}",
                value
            )));
        }
        serde_json::from_value(value)
            .map_err(|e| AppError::InvalidOutput(format!("review feedback: {}", e)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartReviewRequest {
    pub course_id: String,
    pub topic: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerRequest {
    pub explanation: String,
}
