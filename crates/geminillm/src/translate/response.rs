//! Gemini response -> wire response.

use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use super::TranslationError;
use crate::apis::gemini::{Candidate, GeminiFinishReason, GenerateContentResponse, Part, Party};
use crate::apis::openai::{
    ChatCompletionsResponse, ChatCompletionsStreamResponse, Choice, FinishReason, ResponseMessage,
    Role, StreamChoice, StreamDelta, Usage,
};

const COMPLETION_OBJECT: &str = "chat.completion";
const CHUNK_OBJECT: &str = "chat.completion.chunk";

pub fn role_for_party(party: Party) -> Role {
    match party {
        Party::Model => Role::Assistant,
        Party::User => Role::User,
    }
}

/// Maps the provider finish-reason vocabulary onto the wire vocabulary.
/// Unspecified and "other" carry no signal and map to none; a code outside
/// the known vocabulary is an error, never a silent default.
pub fn map_finish_reason(
    reason: GeminiFinishReason,
) -> Result<Option<FinishReason>, TranslationError> {
    match reason {
        GeminiFinishReason::FinishReasonUnspecified | GeminiFinishReason::Other => Ok(None),
        GeminiFinishReason::Stop => Ok(Some(FinishReason::Stop)),
        GeminiFinishReason::MaxTokens => Ok(Some(FinishReason::Length)),
        GeminiFinishReason::Safety | GeminiFinishReason::Recitation => {
            Ok(Some(FinishReason::ContentFilter))
        }
        GeminiFinishReason::Unrecognized => Err(TranslationError::UnmappedFinishReason),
    }
}

/// Concatenates a candidate's text parts in order. By the time a response is
/// assembled every part must be text; anything else is a defect upstream.
fn candidate_text(parts: &[Part]) -> Result<String, TranslationError> {
    let mut text = String::new();
    for part in parts {
        match part.as_text() {
            Some(t) => text.push_str(t),
            None => return Err(TranslationError::Internal("candidate part is not text")),
        }
    }
    Ok(text)
}

fn candidate_finish_reason(
    candidate: &Candidate,
) -> Result<Option<FinishReason>, TranslationError> {
    match candidate.finish_reason {
        Some(reason) => map_finish_reason(reason),
        None => Ok(None),
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn completion_id() -> String {
    format!("cmpl-{}", Uuid::new_v4())
}

/// Assembles a completed provider response into a wire completion object.
/// Token usage is the sum of the candidates' reported counts.
pub fn to_chat_response(
    response: &GenerateContentResponse,
    model: &str,
) -> Result<ChatCompletionsResponse, TranslationError> {
    let mut choices = Vec::with_capacity(response.candidates.len());
    let mut completion_tokens = 0;

    for candidate in &response.candidates {
        completion_tokens += candidate.token_count.unwrap_or_default();
        choices.push(Choice {
            index: candidate.index,
            message: ResponseMessage {
                role: role_for_party(candidate.content.role),
                content: candidate_text(&candidate.content.parts)?,
            },
            finish_reason: candidate_finish_reason(candidate)?,
        });
    }

    Ok(ChatCompletionsResponse {
        id: completion_id(),
        object: COMPLETION_OBJECT.to_string(),
        created: unix_now(),
        model: model.to_string(),
        choices,
        usage: Usage {
            completion_tokens,
            ..Default::default()
        },
    })
}

/// Assembles one streaming increment into a wire chunk with a fresh
/// identifier and the request's echoed model name.
pub fn to_stream_chunk(
    response: &GenerateContentResponse,
    model: &str,
) -> Result<ChatCompletionsStreamResponse, TranslationError> {
    let mut choices = Vec::with_capacity(response.candidates.len());

    for candidate in &response.candidates {
        choices.push(StreamChoice {
            index: candidate.index,
            delta: StreamDelta {
                role: Some(role_for_party(candidate.content.role)),
                content: Some(candidate_text(&candidate.content.parts)?),
            },
            finish_reason: candidate_finish_reason(candidate)?,
        });
    }

    Ok(ChatCompletionsStreamResponse {
        id: completion_id(),
        object: CHUNK_OBJECT.to_string(),
        created: unix_now(),
        model: model.to_string(),
        choices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::gemini::{Blob, Content};
    use pretty_assertions::assert_eq;

    fn candidate(text: &str, finish_reason: Option<GeminiFinishReason>, tokens: u32) -> Candidate {
        Candidate {
            index: 0,
            content: Content {
                role: Party::Model,
                parts: vec![Part::text(text)],
            },
            finish_reason,
            token_count: Some(tokens),
        }
    }

    #[test]
    fn finish_reason_table_round_trips() {
        let table = [
            (GeminiFinishReason::FinishReasonUnspecified, None),
            (GeminiFinishReason::Stop, Some(FinishReason::Stop)),
            (GeminiFinishReason::MaxTokens, Some(FinishReason::Length)),
            (GeminiFinishReason::Safety, Some(FinishReason::ContentFilter)),
            (
                GeminiFinishReason::Recitation,
                Some(FinishReason::ContentFilter),
            ),
            (GeminiFinishReason::Other, None),
        ];
        for (provider, wire) in table {
            assert_eq!(map_finish_reason(provider).unwrap(), wire);
        }
    }

    #[test]
    fn unrecognized_finish_reason_is_an_error() {
        assert!(matches!(
            map_finish_reason(GeminiFinishReason::Unrecognized),
            Err(TranslationError::UnmappedFinishReason)
        ));
    }

    #[test]
    fn assembles_choices_and_sums_tokens() {
        let response = GenerateContentResponse {
            candidates: vec![
                candidate("4", Some(GeminiFinishReason::Stop), 1),
                candidate("four", Some(GeminiFinishReason::MaxTokens), 2),
            ],
        };

        let out = to_chat_response(&response, "gpt-3.5-turbo").unwrap();
        assert_eq!(out.object, "chat.completion");
        assert_eq!(out.model, "gpt-3.5-turbo");
        assert_eq!(out.usage.completion_tokens, 3);
        assert_eq!(out.choices.len(), 2);
        assert_eq!(out.choices[0].message.role, Role::Assistant);
        assert_eq!(out.choices[0].message.content, "4");
        assert_eq!(out.choices[0].finish_reason, Some(FinishReason::Stop));
        assert_eq!(out.choices[1].finish_reason, Some(FinishReason::Length));
    }

    #[test]
    fn concatenates_text_parts_in_order() {
        let response = GenerateContentResponse {
            candidates: vec![Candidate {
                index: 0,
                content: Content {
                    role: Party::Model,
                    parts: vec![Part::text("fo"), Part::text("ur")],
                },
                finish_reason: Some(GeminiFinishReason::Stop),
                token_count: None,
            }],
        };

        let out = to_chat_response(&response, "m").unwrap();
        assert_eq!(out.choices[0].message.content, "four");
    }

    #[test]
    fn non_text_part_is_an_internal_error() {
        let response = GenerateContentResponse {
            candidates: vec![Candidate {
                index: 0,
                content: Content {
                    role: Party::Model,
                    parts: vec![Part::InlineData {
                        inline_data: Blob::image("png", vec![1]),
                    }],
                },
                finish_reason: Some(GeminiFinishReason::Stop),
                token_count: None,
            }],
        };

        assert!(matches!(
            to_chat_response(&response, "m"),
            Err(TranslationError::Internal(_))
        ));
    }

    #[test]
    fn stream_chunk_carries_delta_and_fresh_id() {
        let response = GenerateContentResponse {
            candidates: vec![candidate("2+", None, 0)],
        };

        let chunk = to_stream_chunk(&response, "gpt-3.5-turbo").unwrap();
        assert_eq!(chunk.object, "chat.completion.chunk");
        assert_eq!(chunk.model, "gpt-3.5-turbo");
        assert!(chunk.id.starts_with("cmpl-"));
        assert_eq!(chunk.choices[0].delta.role, Some(Role::Assistant));
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("2+"));
        assert_eq!(chunk.choices[0].finish_reason, None);

        let second = to_stream_chunk(&response, "gpt-3.5-turbo").unwrap();
        assert_ne!(chunk.id, second.id);
    }
}
