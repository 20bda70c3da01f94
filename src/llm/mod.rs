//! Chat-completion providers and the agents built on top of them.

pub mod agent;
pub mod client;
pub mod prompts;
pub mod provider;

use serde::{Deserialize, Serialize};

pub use agent::{Agent, Conversation};
pub use client::{HttpLlmClient, LlmClient, LlmConfig};
pub use provider::Provider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}
