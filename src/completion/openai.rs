//! OpenAI client for completions and embeddings
//!
//! Uses a long-lived reqwest::Client for connection pooling, so one instance
//! is shared by every in-flight request.

use crate::completion::{Completion, CompletionClient, CompletionOptions, ResponseFormat};
use crate::error::OrchestrationError;
use crate::vector::Embedder;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Reusable OpenAI client (connection-pooled)
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    embedding_model: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: String,
        model: String,
        embedding_model: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            embedding_model,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn post<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<R, String> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("OpenAI request to {} failed: {}", path, e);
                format!("OpenAI API error: {}", e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI API error response ({}): {}", status, error_text);
            return Err(format!("OpenAI API error ({}): {}", status, error_text));
        }

        response.json::<R>().await.map_err(|e| {
            error!("Failed to parse OpenAI response: {}", e);
            format!("OpenAI parse error: {}", e)
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<Completion> {
        let request = build_chat_request(&self.model, prompt, options);

        debug!(model = %self.model, "Calling OpenAI chat completions");

        let response: ChatResponse = self
            .post("/chat/completions", &request)
            .await
            .map_err(OrchestrationError::LlmError)?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| OrchestrationError::LlmError("Empty response from OpenAI".to_string()))?;

        Ok(Completion { text })
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };

        let response: EmbeddingResponse = self
            .post("/embeddings", &request)
            .await
            .map_err(OrchestrationError::EmbeddingError)?;

        response
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| OrchestrationError::EmbeddingError("No embedding returned".to_string()))
    }
}

fn build_chat_request<'a>(
    model: &'a str,
    prompt: &'a str,
    options: &CompletionOptions,
) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![ChatMessage {
            role: "user",
            content: prompt,
        }],
        max_tokens: options.max_output_tokens,
        temperature: options.temperature,
        response_format: match options.response_format {
            Some(ResponseFormat::JsonObject) => Some(FormatSpec { kind: "json_object" }),
            Some(ResponseFormat::Text) => Some(FormatSpec { kind: "text" }),
            None => None,
        },
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<FormatSpec>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct FormatSpec {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let options = CompletionOptions::strict_json(30);
        let request = build_chat_request("gpt-4o-mini", "Extract the company", &options);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["content"], "Extract the company");
        assert_eq!(json["max_tokens"], 30);
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_default_options_omit_fields() {
        let request = build_chat_request("gpt-4o-mini", "hi", &CompletionOptions::default());
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("temperature").is_none());
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"qualitative"},"finish_reason":"stop"}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("qualitative"));

        let embedding = r#"{"data":[{"embedding":[0.1,0.2],"index":0}],"model":"text-embedding-ada-002"}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(embedding).unwrap();
        assert_eq!(parsed.data[0].embedding.len(), 2);
    }

    #[tokio::test]
    async fn test_round_trip_against_local_server() {
        use axum::{http::HeaderMap, routing::post, Json, Router};
        use serde_json::{json, Value};

        let router = Router::new()
            .route(
                "/chat/completions",
                post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                    let authorized = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        == Some("Bearer test-key");
                    let content = if authorized {
                        format!("echo: {}", body["messages"][0]["content"].as_str().unwrap_or(""))
                    } else {
                        "unauthorized".to_string()
                    };
                    Json(json!({ "choices": [{ "message": { "content": content } }] }))
                }),
            )
            .route(
                "/embeddings",
                post(|| async { Json(json!({ "data": [{ "embedding": [0.5, 0.25] }] })) }),
            );
        let base_url = crate::testing::serve_locally(router).await;

        let client = OpenAiClient::new(
            "test-key".into(),
            "gpt-4o-mini".into(),
            "text-embedding-ada-002".into(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_base_url(format!("{}/", base_url));

        let completion = client
            .complete("Classify the following query", &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(completion.text, "echo: Classify the following query");

        let embedding = client.embed("Apple risks").await.unwrap();
        assert_eq!(embedding, vec![0.5, 0.25]);
    }

    #[tokio::test]
    async fn test_error_status_is_llm_error() {
        use axum::{http::StatusCode, routing::post, Router};

        let router = Router::new().route(
            "/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limited") }),
        );
        let base_url = crate::testing::serve_locally(router).await;

        let client = OpenAiClient::new(
            "test-key".into(),
            "gpt-4o-mini".into(),
            "text-embedding-ada-002".into(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_base_url(base_url);

        let err = client
            .complete("hi", &CompletionOptions::default())
            .await
            .unwrap_err();
        match err {
            OrchestrationError::LlmError(message) => assert!(message.contains("rate limited")),
            other => panic!("expected LlmError, got {:?}", other),
        }
    }
}
