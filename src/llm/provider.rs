use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use crate::error::AppError;
use crate::json::bracket_span;
use crate::llm::Message;

const MAX_TOKENS: u32 = 8192;

/// OpenAI-compatible chat completion providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    DeepSeek,
    Moonshot,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::DeepSeek => "deepseek",
            Provider::Moonshot => "moonshot",
        }
    }

    pub fn api_key_var(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::DeepSeek => "DEEPSEEK_API_KEY",
            Provider::Moonshot => "MOONSHOT_API_KEY",
        }
    }

    pub fn base_url_var(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_BASE",
            Provider::DeepSeek => "DEEPSEEK_URL",
            Provider::Moonshot => "MOONSHOT_URL",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::DeepSeek => "https://api.deepseek.com",
            Provider::Moonshot => "https://api.moonshot.cn/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::DeepSeek => "deepseek-chat",
            Provider::Moonshot => "moonshot-v1-32k",
        }
    }

    pub fn default_temperature(&self) -> f32 {
        match self {
            Provider::OpenAi => 0.7,
            Provider::DeepSeek | Provider::Moonshot => 0.6,
        }
    }

    /// Reasoner models reject sampling parameters and JSON response mode.
    fn is_reasoner(&self, model: &str) -> bool {
        matches!(self, Provider::DeepSeek) && model.contains("reasoner")
    }

    pub fn format_request(
        &self,
        model: &str,
        messages: &[Message],
        temperature: f32,
        json_mode: bool,
    ) -> Value {
        let mut body = json!({
            "model": model,
            "messages": messages,
            "max_tokens": MAX_TOKENS,
        });

        if !self.is_reasoner(model) {
            body["temperature"] = json!(temperature);
            if json_mode {
                body["response_format"] = json!({ "type": "json_object" });
            }
        }

        body
    }

    /// Pulls the assistant text out of a completion body.
    ///
    /// In JSON mode, content that does not parse is narrowed to its first
    /// bracketed span when that span parses.
    pub fn parse_response(&self, body: &Value, json_mode: bool) -> Result<String, AppError> {
        if let Some(message) = body["error"]["message"].as_str() {
            return Err(AppError::Llm(format!("{} error: {}", self.name(), message)));
        }

        let choice = body["choices"]
            .get(0)
            .ok_or_else(|| AppError::Llm(format!("{} response has no choices", self.name())))?;

        if choice["finish_reason"].as_str() == Some("length") {
            warn!("{} completion truncated at max_tokens", self.name());
        }

        let content = choice["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        if !json_mode || serde_json::from_str::<Value>(&content).is_ok() {
            return Ok(content);
        }

        match bracket_span(&content) {
            Some(span) if serde_json::from_str::<Value>(span).is_ok() => Ok(span.to_string()),
            _ => Ok(content),
        }
    }
}
