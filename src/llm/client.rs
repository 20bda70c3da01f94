use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::AppError;
use crate::llm::{Message, Provider};

/// One chat completion round trip. No streaming.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, messages: &[Message]) -> Result<String, AppError>;

    async fn complete(&self, system_prompt: &str, user_content: &str) -> Result<String, AppError> {
        let messages = [Message::system(system_prompt), Message::user(user_content)];
        self.chat(&messages).await
    }
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: Provider,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub json_mode: bool,
}

impl LlmConfig {
    pub fn new_from_env(provider: Provider) -> Result<Self, AppError> {
        let api_key = env::var(provider.api_key_var())
            .map_err(|_| AppError::BadRequest(format!("{} is not set", provider.api_key_var())))?;
        let base_url = env::var(provider.base_url_var())
            .ok()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| provider.default_base_url().to_string());

        Ok(Self {
            provider,
            api_key,
            base_url,
            model: provider.default_model().to_string(),
            temperature: provider.default_temperature(),
            json_mode: false,
        })
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{}/chat/completions", base)
        }
    }
}

pub struct HttpLlmClient {
    client: Client,
    config: LlmConfig,
}

impl HttpLlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| AppError::BadRequest(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn chat(&self, messages: &[Message]) -> Result<String, AppError> {
        let provider = self.config.provider;
        let request_body = provider.format_request(
            &self.config.model,
            messages,
            self.config.temperature,
            self.config.json_mode,
        );

        let response = self.client
            .post(self.config.endpoint())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("{} request failed: {}", provider.name(), e)))?;

        let status = response.status();
        let body_text = response.text().await.map_err(|e| {
            AppError::Llm(format!("Failed to read {} response body: {}", provider.name(), e))
        })?;
        if !status.is_success() {
            return Err(AppError::Llm(format!(
                "{} API error {}: {}",
                provider.name(),
                status,
                body_text
            )));
        }

        let body: Value = serde_json::from_str(&body_text).map_err(|e| {
            tracing::error!("Failed to parse {} response: {}", provider.name(), e);
            AppError::Llm(format!("Failed to parse {} response: {}", provider.name(), e))
        })?;

        provider.parse_response(&body, self.config.json_mode)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn config(base_url: &str) -> LlmConfig {
        LlmConfig {
            provider: Provider::DeepSeek,
            api_key: "key".to_string(),
            base_url: base_url.to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.6,
            json_mode: true,
        }
    }

    #[test]
    fn endpoint_appends_completions_path() {
        assert_eq!(
            config("https://api.deepseek.com/").endpoint(),
            "https://api.deepseek.com/chat/completions"
        );
        assert_eq!(
            config("http://localhost:1234/v1/chat/completions").endpoint(),
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn truncated_body_is_a_read_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"cho")
                .await
                .unwrap();
        });

        let client = HttpLlmClient::new(config(&format!("http://{}", addr))).unwrap();
        let err = client.chat(&[Message::user("hi")]).await.unwrap_err();

        match err {
            AppError::Llm(msg) => assert!(msg.starts_with("Failed to read deepseek response body"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
