//! Wire request -> Gemini turn list.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::{TranslationError, PRIMING_PROMPT};
use crate::apis::gemini::{Blob, Content, GenerationConfig, Part, Party};
use crate::apis::openai::{ChatCompletionsRequest, ContentPart, Message, MessageContent, Role};

/// Maps a wire role onto the provider party it speaks as. `system` turns are
/// carried as user turns; `tool` has no equivalent in this design.
pub fn party_for_role(role: Role) -> Result<Party, TranslationError> {
    match role {
        Role::System | Role::User => Ok(Party::User),
        Role::Assistant => Ok(Party::Model),
        Role::Tool => Err(TranslationError::UnmappableRole(role)),
    }
}

/// Folds the message list so that no two adjacent messages map to the same
/// party. For example:
///
/// ```text
/// [{user, "hello"}, {user, "world"}, {assistant, "hi"}, {assistant, "there"}]
/// ```
///
/// becomes
///
/// ```text
/// [{user, "hello\nworld"}, {assistant, "hi\nthere"}]
/// ```
pub fn merge_messages(msgs: Vec<Message>) -> Result<Vec<Message>, TranslationError> {
    let mut merged: Vec<Message> = Vec::with_capacity(msgs.len());
    let mut prev_party = None;

    for msg in msgs {
        let party = Some(party_for_role(msg.role)?);
        match merged.last_mut() {
            Some(prev) if party == prev_party => merge_into(prev, msg),
            _ => {
                prev_party = party;
                merged.push(msg);
            }
        }
    }

    Ok(merged)
}

fn merge_into(prev: &mut Message, curr: Message) {
    use MessageContent::{Parts, Text};

    let lhs = std::mem::replace(&mut prev.content, Text(String::new()));
    prev.content = match (lhs, curr.content) {
        (Parts(mut l), Parts(r)) => {
            l.extend(r);
            Parts(l)
        }
        (Parts(mut l), Text(r)) => {
            l.push(ContentPart::Text { text: r });
            Parts(l)
        }
        (Text(l), Parts(r)) => {
            let mut parts = Vec::with_capacity(r.len() + 1);
            parts.push(ContentPart::Text { text: l });
            parts.extend(r);
            Parts(parts)
        }
        (Text(l), Text(r)) => Text(format!("{l}\n{r}")),
    };
}

/// Converts merged messages into provider turns. The flag is true when any
/// produced part is inline image data.
pub fn to_contents(msgs: &[Message]) -> Result<(Vec<Content>, bool), TranslationError> {
    let mut contents = Vec::with_capacity(msgs.len());
    let mut multimodal = false;

    for msg in msgs {
        let role = party_for_role(msg.role)?;
        let parts = match &msg.content {
            MessageContent::Text(text) => vec![Part::text(text.clone())],
            MessageContent::Parts(parts) => parts
                .iter()
                .map(to_gemini_part)
                .collect::<Result<Vec<_>, _>>()?,
        };
        multimodal |= parts.iter().any(Part::is_inline_data);
        contents.push(Content { role, parts });
    }

    Ok((contents, multimodal))
}

fn to_gemini_part(part: &ContentPart) -> Result<Part, TranslationError> {
    match part {
        ContentPart::Text { text } => Ok(Part::text(text.clone())),
        ContentPart::ImageUrl { image_url } => {
            let (mime_type, data) = decode_data_uri(&image_url.url)?;
            let subtype = mime_type.strip_prefix("image/").unwrap_or(&mime_type);
            Ok(Part::InlineData {
                inline_data: Blob::image(subtype, data),
            })
        }
    }
}

/// Splits a `data:<mime>;base64,<payload>` literal into its MIME type and
/// decoded payload.
fn decode_data_uri(url: &str) -> Result<(String, Vec<u8>), TranslationError> {
    let (lhs, rhs) = url
        .split_once(';')
        .ok_or_else(|| TranslationError::InvalidImageUrl("missing ';' separator".to_string()))?;

    let mime_type = lhs.trim_start_matches("data:").to_string();
    let payload = rhs.strip_prefix("base64,").unwrap_or(rhs);
    let data = STANDARD
        .decode(payload)
        .map_err(|err| TranslationError::InvalidImageUrl(err.to_string()))?;

    Ok((mime_type, data))
}

/// Enforces the provider's structural invariants: the conversation must open
/// and close on the user party. The closing invariant is established at the
/// request boundary, so a violation here is an internal error; the opening
/// invariant is repaired by injecting a synthetic priming turn.
pub fn enforce_turn_order(mut contents: Vec<Content>) -> Result<Vec<Content>, TranslationError> {
    let last = contents
        .last()
        .ok_or(TranslationError::EmptyConversation)?;
    if last.role != Party::User {
        return Err(TranslationError::Internal(
            "conversation must end on a user turn",
        ));
    }

    if contents.first().map(|c| c.role) != Some(Party::User) {
        contents.insert(
            0,
            Content {
                role: Party::User,
                parts: vec![Part::text(PRIMING_PROMPT)],
            },
        );
    }

    Ok(contents)
}

/// Splits the turn list into the session history and the tail turn whose
/// parts become the payload of the send call.
pub fn split_tail(mut contents: Vec<Content>) -> Result<(Vec<Content>, Content), TranslationError> {
    match contents.pop() {
        Some(tail) => Ok((contents, tail)),
        None => Err(TranslationError::EmptyConversation),
    }
}

/// Maps the request's generation controls into the provider configuration.
/// Zero-valued fields are left unset so provider defaults apply; stop
/// sequences are always passed through, an empty list included. The provider
/// supports a single candidate, so the requested count is ignored.
pub fn to_generation_config(req: &ChatCompletionsRequest) -> GenerationConfig {
    let config = GenerationConfig {
        candidate_count: Some(1),
        max_output_tokens: req.max_tokens.filter(|&v| v != 0),
        stop_sequences: Some(req.stop.clone().unwrap_or_default()),
        temperature: req.temperature.filter(|&v| v != 0.0),
        top_p: req.top_p.filter(|&v| v != 0.0),
    };

    log::debug!(
        "generation config: candidate_count={:?} max_output_tokens={:?} stop_sequences={:?} temperature={:?} top_p={:?}",
        config.candidate_count,
        config.max_output_tokens,
        config.stop_sequences,
        config.temperature,
        config.top_p,
    );

    config
}
