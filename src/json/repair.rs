use std::borrow::Cow;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::json::extractor::{bracket_span, extract};
use crate::llm::Agent;

/// Input to the repair pipeline: raw model text, or data that is already parsed.
#[derive(Debug, Clone)]
pub enum JsonInput<'a> {
    Text(&'a str),
    Value(Value),
}

impl<'a> From<&'a str> for JsonInput<'a> {
    fn from(text: &'a str) -> Self {
        JsonInput::Text(text)
    }
}

impl<'a> From<&'a String> for JsonInput<'a> {
    fn from(text: &'a String) -> Self {
        JsonInput::Text(text.as_str())
    }
}

impl From<Value> for JsonInput<'_> {
    fn from(value: Value) -> Self {
        JsonInput::Value(value)
    }
}

type Attempt = fn(&str) -> Option<Value>;

/// Local strategies, cheapest first. The remote repair agent runs only after all of them fail.
const LOCAL_ATTEMPTS: [(&str, Attempt); 3] = [
    ("direct parse", parse_direct),
    ("extractor", parse_extracted),
    ("bracket span", parse_bracket_span),
];

fn parse_direct(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

fn parse_extracted(text: &str) -> Option<Value> {
    extract(text).ok()
}

fn parse_bracket_span(text: &str) -> Option<Value> {
    bracket_span(text).and_then(|span| serde_json::from_str(span).ok())
}

/// Runs the local strategies in order and returns the first success.
pub fn repair_locally(text: &str) -> Option<Value> {
    LOCAL_ATTEMPTS.iter().find_map(|(name, attempt)| {
        let value = attempt(text)?;
        debug!("json recovered by {}", name);
        Some(value)
    })
}

/// The full repair pipeline: local strategies, then one call to the repair agent.
#[derive(Clone)]
pub struct JsonRepairer {
    agent: Agent,
}

impl JsonRepairer {
    pub fn new(agent: Agent) -> Self {
        Self { agent }
    }

    pub async fn repair<'a>(&self, input: impl Into<JsonInput<'a>>) -> Result<Value, AppError> {
        let text: Cow<'a, str> = match input.into() {
            JsonInput::Text(text) => Cow::Borrowed(text),
            JsonInput::Value(Value::String(text)) => Cow::Owned(text),
            JsonInput::Value(value) => return Ok(value),
        };

        if let Some(value) = repair_locally(&text) {
            return Ok(value);
        }

        warn!(
            "local json strategies failed, asking {} to repair {} bytes",
            self.agent.name(),
            text.len()
        );
        let response = self.agent.send(&text).await?;

        serde_json::from_str(response.trim()).map_err(|e| AppError::RepairFailed {
            text: text.into_owned(),
            response,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::llm::{LlmClient, Message};

    struct CannedLlm {
        reply: Result<String, String>,
        calls: Mutex<Vec<Vec<Message>>>,
    }

    impl CannedLlm {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn chat(&self, messages: &[Message]) -> Result<String, AppError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            self.reply.clone().map_err(AppError::Llm)
        }
    }

    fn repairer(llm: Arc<CannedLlm>) -> JsonRepairer {
        JsonRepairer::new(Agent::new("json_agent", "fix json", llm))
    }

    #[tokio::test]
    async fn parsed_values_pass_through() {
        let llm = CannedLlm::replying("unused");
        let value = repairer(llm.clone())
            .repair(json!({"already": "parsed"}))
            .await
            .unwrap();

        assert_eq!(value, json!({"already": "parsed"}));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn string_values_are_treated_as_text() {
        let llm = CannedLlm::replying("unused");
        let value = repairer(llm.clone())
            .repair(Value::String("[1, 2]".to_string()))
            .await
            .unwrap();

        assert_eq!(value, json!([1, 2]));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn doubled_quotes_repair_without_agent() {
        let llm = CannedLlm::replying("unused");
        let value = repairer(llm.clone()).repair(r#"{""a"": 1}"#).await.unwrap();

        assert_eq!(value, json!({"a": 1}));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn bracket_span_recovers_unfenced_prose() {
        let llm = CannedLlm::replying("unused");
        let value = repairer(llm.clone())
            .repair("Here is the plan:\n[{\"date\": \"5.25\"}]\nGood luck!")
            .await
            .unwrap();

        assert_eq!(value, json!([{"date": "5.25"}]));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn agent_repairs_when_local_strategies_fail() {
        let llm = CannedLlm::replying("  {\"a\": 1}\n");
        let value = repairer(llm.clone()).repair("{a: 1,}").await.unwrap();

        assert_eq!(value, json!({"a": 1}));
        assert_eq!(llm.call_count(), 1);
        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls[0][0], Message::system("fix json"));
        assert_eq!(calls[0][1], Message::user("{a: 1,}"));
    }

    #[tokio::test]
    async fn unparseable_agent_output_is_terminal() {
        let llm = CannedLlm::replying("sorry, I cannot help");
        let err = repairer(llm.clone()).repair("{a: 1,}").await.unwrap_err();

        match err {
            AppError::RepairFailed { text, response, .. } => {
                assert_eq!(text, "{a: 1,}");
                assert_eq!(response, "sorry, I cannot help");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn agent_transport_errors_are_not_retried() {
        let llm = CannedLlm::failing("connection reset");
        let err = repairer(llm.clone()).repair("not json").await.unwrap_err();

        assert!(matches!(err, AppError::Llm(_)));
        assert_eq!(llm.call_count(), 1);
    }
}
