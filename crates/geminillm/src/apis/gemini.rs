//! Gemini generateContent wire types.
//!
//! The provider models a strictly two-party conversation: every turn is a
//! `Content` owned by either the `user` or the `model` party, and content is
//! an ordered list of parts (text or inline binary data).

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as, skip_serializing_none};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    User,
    Model,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    #[serde_as(as = "Base64")]
    pub data: Vec<u8>,
}

impl Blob {
    /// Builds an image blob from its MIME subtype, e.g. `png` -> `image/png`.
    pub fn image(subtype: &str, data: Vec<u8>) -> Self {
        Self {
            mime_type: format!("image/{subtype}"),
            data,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            Part::InlineData { .. } => None,
        }
    }

    pub fn is_inline_data(&self) -> bool {
        matches!(self, Part::InlineData { .. })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub role: Party,
    pub parts: Vec<Part>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub candidate_count: Option<u32>,
    pub max_output_tokens: Option<u32>,
    pub stop_sequences: Option<Vec<String>>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: Option<GenerationConfig>,
}

/// The provider's finish-reason vocabulary. `Unrecognized` absorbs codes this
/// gateway does not know; mapping one to the wire format is an explicit error.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeminiFinishReason {
    FinishReasonUnspecified,
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other,
    #[serde(other)]
    Unrecognized,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub index: u32,
    pub content: Content,
    pub finish_reason: Option<GeminiFinishReason>,
    pub token_count: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiErrorDetail {
    pub code: Option<i32>,
    pub message: String,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn inline_data_round_trips_as_base64() {
        let part = Part::InlineData {
            inline_data: Blob::image("png", vec![1, 2, 3]),
        };
        let raw = serde_json::to_value(&part).unwrap();
        assert_eq!(raw["inlineData"]["mimeType"], "image/png");
        assert_eq!(raw["inlineData"]["data"], "AQID");

        let back: Part = serde_json::from_value(raw).unwrap();
        assert_eq!(back, part);
    }

    #[test]
    fn generation_config_omits_unset_fields() {
        let config = GenerationConfig {
            candidate_count: Some(1),
            stop_sequences: Some(vec![]),
            ..Default::default()
        };
        let raw = serde_json::to_value(&config).unwrap();
        assert_eq!(raw["candidateCount"], 1);
        assert_eq!(raw["stopSequences"], serde_json::json!([]));
        assert!(raw.get("temperature").is_none());
        assert!(raw.get("topP").is_none());
        assert!(raw.get("maxOutputTokens").is_none());
    }

    #[test]
    fn candidate_decodes_provider_response() {
        let raw = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "4"}]},
                "finishReason": "STOP",
                "tokenCount": 1
            }]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let candidate = &response.candidates[0];
        assert_eq!(candidate.index, 0);
        assert_eq!(candidate.content.role, Party::Model);
        assert_eq!(candidate.finish_reason, Some(GeminiFinishReason::Stop));
    }

    #[test]
    fn unknown_finish_reason_decodes_as_unrecognized() {
        let reason: GeminiFinishReason = serde_json::from_str(r#""BLOCKLIST""#).unwrap();
        assert_eq!(reason, GeminiFinishReason::Unrecognized);
    }
}
