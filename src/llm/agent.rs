use std::sync::Arc;

use tracing::debug;

use crate::error::AppError;
use crate::llm::{LlmClient, Message};

/// A named system prompt bound to a provider client.
#[derive(Clone)]
pub struct Agent {
    name: String,
    system_prompt: String,
    client: Arc<dyn LlmClient>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        client: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// One stateless round trip.
    pub async fn send(&self, message: &str) -> Result<String, AppError> {
        debug!("{}: sending {} bytes", self.name, message.len());
        let reply = self.client.complete(&self.system_prompt, message).await?;
        debug!("{}: received {} bytes", self.name, reply.len());
        Ok(reply)
    }

    /// Starts a multi-turn conversation that keeps its own history.
    pub fn conversation(&self) -> Conversation {
        Conversation {
            agent: self.clone(),
            history: Vec::new(),
        }
    }
}

pub struct Conversation {
    agent: Agent,
    history: Vec<Message>,
}

impl Conversation {
    /// User and assistant turns so far, without the system prompt.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Sends `message` with the full history. The turn is recorded only if the call succeeds.
    pub async fn send(&mut self, message: &str) -> Result<String, AppError> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(Message::system(self.agent.system_prompt.as_str()));
        messages.extend(self.history.iter().cloned());
        messages.push(Message::user(message));

        let reply = self.agent.client.chat(&messages).await?;

        self.history.push(Message::user(message));
        self.history.push(Message::assistant(reply.as_str()));
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct EchoLlm {
        seen: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl LlmClient for EchoLlm {
        async fn chat(&self, messages: &[Message]) -> Result<String, AppError> {
            self.seen.lock().unwrap().push(messages.len());
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(format!("echo: {}", last))
        }
    }

    #[tokio::test]
    async fn conversation_replays_history() {
        let llm = Arc::new(EchoLlm::default());
        let agent = Agent::new("reviewer", "be kind", llm.clone());
        let mut conversation = agent.conversation();

        assert_eq!(conversation.send("first").await.unwrap(), "echo: first");
        assert_eq!(conversation.send("second").await.unwrap(), "echo: second");

        // system + user, then system + 2 history + user
        assert_eq!(*llm.seen.lock().unwrap(), vec![2, 4]);
        assert_eq!(conversation.history().len(), 4);
        assert_eq!(conversation.history()[1], Message::assistant("echo: first"));
    }

    #[tokio::test]
    async fn send_is_stateless() {
        let llm = Arc::new(EchoLlm::default());
        let agent = Agent::new("planner", "plan", llm.clone());

        agent.send("a").await.unwrap();
        agent.send("b").await.unwrap();

        assert_eq!(*llm.seen.lock().unwrap(), vec![2, 2]);
    }
}
