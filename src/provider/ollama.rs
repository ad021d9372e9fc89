// src/provider/ollama.rs — Ollama local model provider

use std::time::Duration;

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, Message, ModelProvider, StopReason, TokenUsage};
use crate::infra::config::OracleConfig;
use crate::infra::errors::SkillforgeError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

pub struct OllamaProvider {
    base_url: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: 0.7,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &OracleConfig) -> Self {
        let mut provider = Self::new(config.base_url.clone(), config.model.clone());
        provider.temperature = config.temperature;
        provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// List the models the server has pulled (`GET /api/tags`).
    pub async fn list_models(&self) -> Result<Vec<String>, SkillforgeError> {
        let resp = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| provider_error(format!("Cannot reach Ollama: {}", e), false))?;

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| provider_error(format!("Invalid Ollama response: {}", e), false))?;

        Ok(model_names(&body))
    }

    fn request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let system = request.system.as_deref().map(Message::system);
        let messages: Vec<serde_json::Value> = system
            .iter()
            .chain(&request.messages)
            .map(|m| {
                serde_json::json!({
                    "role": m.role.as_str(),
                    "content": m.content,
                })
            })
            .collect();

        let model = if request.model.is_empty() {
            &self.model
        } else {
            &request.model
        };
        let mut options = serde_json::json!({
            "temperature": request.temperature.unwrap_or(self.temperature),
        });
        if let Some(max) = request.max_tokens {
            options["num_predict"] = serde_json::json!(max);
        }

        serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": false,
            "options": options,
        })
    }
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    fn id(&self) -> &str {
        "ollama"
    }

    fn name(&self) -> &str {
        "Ollama"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, SkillforgeError> {
        let body = self.request_body(&request);

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| provider_error(e.to_string(), e.is_timeout() || e.is_connect()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(provider_error(
                format!("HTTP {}: {}", status.as_u16(), error_body),
                status.is_server_error(),
            ));
        }

        let resp: serde_json::Value = response
            .json()
            .await
            .map_err(|e| provider_error(format!("Failed to parse response: {}", e), false))?;

        let parsed = parse_chat_response(&resp);
        tracing::debug!(tokens = parsed.usage.total(), "Ollama chat complete");
        Ok(parsed)
    }
}

fn provider_error(message: String, retriable: bool) -> SkillforgeError {
    SkillforgeError::Provider {
        provider: "ollama".into(),
        message,
        retriable,
    }
}

fn model_names(body: &serde_json::Value) -> Vec<String> {
    body["models"]
        .as_array()
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m["name"].as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_chat_response(resp: &serde_json::Value) -> ChatResponse {
    let content = resp["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();

    let usage = TokenUsage {
        input_tokens: resp["prompt_eval_count"].as_u64().unwrap_or(0) as u32,
        output_tokens: resp["eval_count"].as_u64().unwrap_or(0) as u32,
    };

    let stop_reason = match resp["done_reason"].as_str() {
        Some("stop") => StopReason::EndTurn,
        Some("length") => StopReason::MaxTokens,
        _ => StopReason::Unknown,
    };

    ChatResponse {
        content,
        usage,
        stop_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_uses_default_model() {
        let p = OllamaProvider::new("http://localhost:11434/", "qwen3-coder");
        let body = p.request_body(&ChatRequest::prompt("sys", "hello"));
        assert_eq!(body["model"], "qwen3-coder");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(p.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_request_body_overrides() {
        let p = OllamaProvider::new("http://x", "a");
        let req = ChatRequest {
            model: "b".into(),
            messages: vec![Message::user("q")],
            temperature: Some(0.1),
            max_tokens: Some(256),
            system: None,
        };
        let body = p.request_body(&req);
        assert_eq!(body["model"], "b");
        assert_eq!(body["options"]["num_predict"], 256);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_parse_chat_response() {
        let resp = serde_json::json!({
            "message": {"role": "assistant", "content": "print(42)"},
            "done_reason": "stop",
            "prompt_eval_count": 12,
            "eval_count": 5,
        });
        let parsed = parse_chat_response(&resp);
        assert_eq!(parsed.content, "print(42)");
        assert_eq!(parsed.usage.total(), 17);
        assert!(matches!(parsed.stop_reason, StopReason::EndTurn));
    }

    #[test]
    fn test_model_names() {
        let body = serde_json::json!({"models": [{"name": "qwen3-coder"}, {"name": "llama3.3"}]});
        assert_eq!(model_names(&body), vec!["qwen3-coder", "llama3.3"]);
        assert!(model_names(&serde_json::json!({})).is_empty());
    }
}
