use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::analysis::prompt::AnalysisPrompt;
use crate::config::OpenAiConfig;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model returned no choices")]
    NoChoices,
}

/// One round trip to a hosted multimodal completion model.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn complete(&self, prompt: &AnalysisPrompt) -> Result<String, VisionError>;
}

#[derive(Clone)]
pub struct OpenAiVisionClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiVisionClient {
    pub fn new(cfg: &OpenAiConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = cfg.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("build OpenAI HTTP client")?;
        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl VisionModel for OpenAiVisionClient {
    async fn complete(&self, prompt: &AnalysisPrompt) -> Result<String, VisionError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(&prompt.system),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: &prompt.instruction,
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: &prompt.image_url,
                            },
                        },
                    ]),
                },
            ],
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, %url, "calling chat completions");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            error!(%status, body = %text, "chat completions returned error");
            return Err(VisionError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse = resp.json().await?;
        let choice = parsed.choices.into_iter().next().ok_or(VisionError::NoChoices)?;
        Ok(choice.message.content.unwrap_or_else(|| "{}".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured {
        body: Arc<Mutex<Option<Value>>>,
        auth: Arc<Mutex<Option<String>>>,
    }

    async fn spawn_stub(status: StatusCode, reply: Value) -> (String, Captured) {
        let captured = Captured::default();
        let app = Router::new()
            .route(
                "/v1/chat/completions",
                post(
                    move |State(c): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| {
                        let reply = reply.clone();
                        async move {
                            *c.body.lock().unwrap() = Some(body);
                            *c.auth.lock().unwrap() = headers
                                .get("authorization")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string);
                            (status, Json(reply))
                        }
                    },
                ),
            )
            .with_state(captured.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/v1", addr), captured)
    }

    fn client_for(base_url: String) -> OpenAiVisionClient {
        OpenAiVisionClient::new(&OpenAiConfig {
            api_key: "sk-test".into(),
            base_url,
            model: "gpt-4o".into(),
            max_tokens: 1000,
            timeout_secs: Some(5),
        })
        .unwrap()
    }

    fn prompt() -> AnalysisPrompt {
        AnalysisPrompt {
            system: "persona".into(),
            instruction: "describe".into(),
            image_url: "data:image/jpeg;base64,AAAA".into(),
        }
    }

    #[tokio::test]
    async fn sends_json_mode_request_with_image() {
        let (base, captured) = spawn_stub(
            StatusCode::OK,
            json!({"choices": [{"message": {"content": "{\"nutrition\":{}}"}}]}),
        )
        .await;

        let out = client_for(base).complete(&prompt()).await.unwrap();
        assert_eq!(out, "{\"nutrition\":{}}");

        let body = captured.body.lock().unwrap().clone().unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "persona");
        assert_eq!(body["messages"][1]["content"][0]["type"], "text");
        assert_eq!(body["messages"][1]["content"][0]["text"], "describe");
        assert_eq!(body["messages"][1]["content"][1]["type"], "image_url");
        assert_eq!(
            body["messages"][1]["content"][1]["image_url"]["url"],
            "data:image/jpeg;base64,AAAA"
        );
        assert_eq!(
            captured.auth.lock().unwrap().as_deref(),
            Some("Bearer sk-test")
        );
    }

    #[tokio::test]
    async fn null_content_becomes_empty_object() {
        let (base, _) = spawn_stub(
            StatusCode::OK,
            json!({"choices": [{"message": {"content": null}}]}),
        )
        .await;
        let out = client_for(base).complete(&prompt()).await.unwrap();
        assert_eq!(out, "{}");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (base, _) = spawn_stub(
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": {"message": "slow down"}}),
        )
        .await;
        let err = client_for(base).complete(&prompt()).await.unwrap_err();
        match err {
            VisionError::Status { status, body } => {
                assert_eq!(status, 429);
                assert!(body.contains("slow down"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let (base, _) = spawn_stub(StatusCode::OK, json!({"choices": []})).await;
        let err = client_for(base).complete(&prompt()).await.unwrap_err();
        assert!(matches!(err, VisionError::NoChoices));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = client_for(format!("http://{}/v1", addr))
            .complete(&prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, VisionError::Transport(_)));
    }
}
