// provider/ollama.rs - Ollama chat provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{response_schema, Decision, DecisionRequest, ProviderError, ReasoningProvider};

/// Configuration for the Ollama provider
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: Option<f32>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "mistral:latest".to_string(),
            temperature: None,
        }
    }
}

/// Reasoning provider backed by a local Ollama server
pub struct OllamaProvider {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_request(&self, request: &DecisionRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(ChatMessage {
            role: "system",
            content: request.system_prompt.clone(),
        });
        messages.extend(request.history.iter().map(|entry| ChatMessage {
            role: "assistant",
            content: entry.clone(),
        }));
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: self.config.model.clone(),
            messages,
            stream: false,
            format: response_schema(request.role),
            options: ChatOptions {
                temperature: self.config.temperature,
            },
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    /// JSON schema constraining the reply
    format: serde_json::Value,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl ReasoningProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(role = %request.role, iteration = request.iteration))]
    async fn propose(&self, request: &DecisionRequest) -> Result<Decision, ProviderError> {
        let body = self.build_request(request);
        let url = format!("{}/api/chat", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Schema(e.to_string()))?;

        debug!(content = %chat.message.content, "Model replied");

        Decision::from_json(request.role, chat.message.content.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use crate::protocol::ActorLimits;
    use crate::provider::TurnContext;

    fn request() -> DecisionRequest {
        DecisionRequest {
            role: Role::Developer,
            iteration: 3,
            system_prompt: "You are a developer".into(),
            history: vec!["first".into(), "second".into()],
            prompt: "Counter the client".into(),
            context: TurnContext {
                application_description: "app".into(),
                limits: ActorLimits::new("1200 eur", "3 weeks"),
                anchor: None,
                own_previous: None,
                counterpart: None,
                counterpart_reasoning: None,
            },
        }
    }

    #[test]
    fn test_chat_request_layout() {
        let provider = OllamaProvider::new(OllamaConfig::default());
        let body = serde_json::to_value(provider.build_request(&request())).unwrap();

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[3]["role"], "user");
        assert_eq!(messages[3]["content"], "Counter the client");
        assert_eq!(body["stream"], false);
        assert_eq!(body["model"], "mistral:latest");
        assert!(body["format"]["properties"]["developer_time"].is_object());
        assert!(body["options"].get("temperature").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_request_error() {
        let provider = OllamaProvider::new(OllamaConfig {
            base_url: "http://127.0.0.1:1".into(),
            ..Default::default()
        });
        let err = provider.propose(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Request(_)));
    }
}
