//! Thin REST client for the Gemini generateContent API.
//!
//! A [`ChatSession`] mirrors the provider's chat surface: it is primed with
//! the conversation history and a generation config, and a send call ships
//! the final user turn through either the single-shot or the streaming path.

use std::sync::Arc;

use eventsource_stream::Eventsource;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use geminillm::apis::gemini::{
    ApiErrorBody, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    Part, Party,
};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Error)]
pub enum GeminiError {
    /// The provider rejected the call; the message is passed through as-is.
    #[error("gemini api error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("gemini transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gemini stream error: {0}")]
    Stream(String),
}

pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, GeminiError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, GeminiError> {
        let http = reqwest::Client::builder().build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    /// Primes a chat session on the given model with prior turns.
    pub fn chat(
        self: &Arc<Self>,
        model: &str,
        config: GenerationConfig,
        history: Vec<Content>,
    ) -> ChatSession {
        ChatSession {
            client: Arc::clone(self),
            model: model.to_string(),
            config,
            history,
        }
    }

    async fn post(
        &self,
        url: &str,
        body: &GenerateContentRequest,
    ) -> Result<reqwest::Response, GeminiError> {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body.error.message,
            Err(err) => format!("unreadable error body: {err}"),
        };
        Err(GeminiError::Api { status, message })
    }
}

pub struct ChatSession {
    client: Arc<GeminiClient>,
    model: String,
    config: GenerationConfig,
    history: Vec<Content>,
}

impl ChatSession {
    fn request_for(&self, parts: Vec<Part>) -> GenerateContentRequest {
        let mut contents = self.history.clone();
        contents.push(Content {
            role: Party::User,
            parts,
        });
        GenerateContentRequest {
            contents,
            generation_config: Some(self.config.clone()),
        }
    }

    /// Single-shot send of the new user turn.
    pub async fn send(&self, parts: Vec<Part>) -> Result<GenerateContentResponse, GeminiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.client.base_url, self.model
        );
        let response = self.client.post(&url, &self.request_for(parts)).await?;
        Ok(response.json().await?)
    }

    /// Streaming send; each SSE data event decodes to one incremental
    /// response. Errors before the stream opens surface here, later ones
    /// through the stream items.
    pub async fn send_stream(
        &self,
        parts: Vec<Part>,
    ) -> Result<BoxStream<'static, Result<GenerateContentResponse, GeminiError>>, GeminiError> {
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.client.base_url, self.model
        );
        let response = self.client.post(&url, &self.request_for(parts)).await?;

        let stream = response
            .bytes_stream()
            .eventsource()
            .filter_map(|event| async move {
                match event {
                    Ok(event) => {
                        let data = event.data.trim().to_string();
                        if data.is_empty() {
                            return None;
                        }
                        Some(
                            serde_json::from_str::<GenerateContentResponse>(&data).map_err(
                                |err| GeminiError::Stream(format!("bad stream payload: {err}")),
                            ),
                        )
                    }
                    Err(err) => Some(Err(GeminiError::Stream(err.to_string()))),
                }
            })
            .boxed();

        Ok(stream)
    }
}
