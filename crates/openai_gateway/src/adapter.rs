//! Orchestrates one chat-completion call end to end: translate the request,
//! pick a model, fetch the cached client, invoke the provider, and shape the
//! reply back into the wire format.

use futures_util::StreamExt;
use geminillm::apis::gemini::{Part, Party};
use geminillm::apis::openai::{
    ChatCompletionsRequest, ChatCompletionsResponse, ChatCompletionsStreamResponse,
};
use geminillm::translate::{
    enforce_turn_order, merge_messages, party_for_role, split_tail, to_chat_response,
    to_contents, to_generation_config, to_stream_chunk, TranslationError,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::ClientCache;
use crate::client::{ChatSession, GeminiError};

const TEXT_MODEL: &str = "gemini-pro";
const VISION_MODEL: &str = "gemini-pro-vision";

const STREAM_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// The translation layer cannot represent this request.
    #[error("invalid parameters: {0}")]
    InvalidParams(TranslationError),
    /// A shape that upstream validation should have made impossible.
    #[error("internal error: {0}")]
    Internal(TranslationError),
    #[error(transparent)]
    Provider(#[from] GeminiError),
}

impl From<TranslationError> for AdapterError {
    fn from(err: TranslationError) -> Self {
        match err {
            TranslationError::Internal(_) => AdapterError::Internal(err),
            _ => AdapterError::InvalidParams(err),
        }
    }
}

pub struct Adapter {
    cache: ClientCache,
}

impl Adapter {
    pub fn new(cache: ClientCache) -> Self {
        Self { cache }
    }

    pub fn teardown(&self) {
        self.cache.teardown();
    }

    /// Translates the request into a primed session plus the tail turn's
    /// parts. Establishes the boundary invariant that the conversation ends
    /// on a user-authored message.
    fn prepare(
        &self,
        api_key: &str,
        request: &ChatCompletionsRequest,
    ) -> Result<(ChatSession, Vec<Part>), AdapterError> {
        let last = request
            .messages
            .last()
            .ok_or(AdapterError::InvalidParams(
                TranslationError::EmptyConversation,
            ))?;
        if party_for_role(last.role)? != Party::User {
            return Err(AdapterError::InvalidParams(
                TranslationError::LastMessageNotUser,
            ));
        }

        let merged = merge_messages(request.messages.clone())?;
        let (contents, multimodal) = to_contents(&merged)?;
        let contents = enforce_turn_order(contents)?;
        let (history, tail) = split_tail(contents)?;

        let config = to_generation_config(request);
        let model = if multimodal { VISION_MODEL } else { TEXT_MODEL };
        info!(
            model,
            multimodal,
            candidate_count = ?config.candidate_count,
            max_output_tokens = ?config.max_output_tokens,
            stop_sequences = ?config.stop_sequences,
            temperature = ?config.temperature,
            top_p = ?config.top_p,
            "resolved generation parameters"
        );

        let client = self.cache.get(api_key)?;
        Ok((client.chat(model, config, history), tail.parts))
    }

    pub async fn chat_completion(
        &self,
        api_key: &str,
        request: &ChatCompletionsRequest,
    ) -> Result<ChatCompletionsResponse, AdapterError> {
        let (session, parts) = self.prepare(api_key, request)?;
        let response = session.send(parts).await?;
        Ok(to_chat_response(&response, &request.model)?)
    }

    /// Streaming path. Translation and the provider handshake happen before
    /// the producer task is spawned, so representability and call-setup
    /// errors surface synchronously. The channel closing is the end-of-stream
    /// sentinel; chunks already delivered are never retracted. If the
    /// receiver is dropped the producer stops pulling from the provider and
    /// exits without flushing undelivered chunks.
    pub async fn chat_completion_stream(
        &self,
        api_key: &str,
        request: &ChatCompletionsRequest,
    ) -> Result<mpsc::Receiver<ChatCompletionsStreamResponse>, AdapterError> {
        let (session, parts) = self.prepare(api_key, request)?;
        let mut stream = session.send_stream(parts).await?;
        let model = request.model.clone();

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                let increment = match item {
                    Ok(increment) => increment,
                    Err(err) => {
                        warn!(%err, "provider stream failed");
                        break;
                    }
                };
                let chunk = match to_stream_chunk(&increment, &model) {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        warn!(%err, "failed to translate stream increment");
                        break;
                    }
                };
                if tx.send(chunk).await.is_err() {
                    debug!("stream consumer went away, stopping provider pull");
                    break;
                }
            }
        });

        Ok(rx)
    }
}
