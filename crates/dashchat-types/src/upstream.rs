//! Wire types for the upstream chat completion service.
//!
//! The upstream speaks the OpenAI-style `/v1/chat/completions` protocol:
//! requests carry `{model, stream, user, messages}`, and streaming
//! responses are `data: <json>` lines terminated by `data: [DONE]`.

use serde::{Deserialize, Serialize};

use std::fmt;

/// Role of a message sent upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for UpstreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamRole::System => write!(f, "system"),
            UpstreamRole::User => write!(f, "user"),
            UpstreamRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Image reference inside a multimodal content part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// One typed part of a multimodal message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// Message content: plain text or a list of typed parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// The textual portion of this content, joined across text parts.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A single message in the upstream conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamMessage {
    pub role: UpstreamRole,
    pub content: MessageContent,
}

impl UpstreamMessage {
    pub fn text(role: UpstreamRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(text.into()),
        }
    }
}

/// Body of the streaming completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub stream: bool,
    /// Session key; lets the upstream correlate multi-turn state.
    pub user: String,
    pub messages: Vec<UpstreamMessage>,
}

/// Incremental delta inside one streamed choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// One choice inside a streamed chunk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

/// Payload of one `data:` line in the upstream stream.
///
/// Only the fields the relay reads are modelled; everything else the
/// upstream sends (ids, usage, finish reasons) is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

impl CompletionChunk {
    /// Every text fragment carried by this chunk, in choice order.
    pub fn text_fragments(&self) -> impl Iterator<Item = &str> {
        self.choices
            .iter()
            .filter_map(|choice| choice.delta.content.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_serializes_as_string() {
        let msg = UpstreamMessage::text(UpstreamRole::User, "hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_parts_content_serializes_as_typed_list() {
        let msg = UpstreamMessage {
            role: UpstreamRole::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text {
                    text: "what is this?".to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: "data:image/png;base64,AAAA".to_string(),
                    },
                },
            ]),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "what is this?"},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}}
                ]
            })
        );
    }

    #[test]
    fn test_chunk_fragments_skip_empty_deltas() {
        let chunk: CompletionChunk = serde_json::from_str(
            r#"{"id":"x","choices":[{"delta":{"content":"Hel"}},{"delta":{}},{"delta":{"content":"p"}}]}"#,
        )
        .unwrap();
        let fragments: Vec<&str> = chunk.text_fragments().collect();
        assert_eq!(fragments, vec!["Hel", "p"]);
    }

    #[test]
    fn test_chunk_without_choices_parses() {
        let chunk: CompletionChunk =
            serde_json::from_str(r#"{"usage":{"prompt_tokens":3}}"#).unwrap();
        assert_eq!(chunk.text_fragments().count(), 0);
    }

    #[test]
    fn test_message_content_text_joins_parts() {
        let content = MessageContent::Parts(vec![
            ContentPart::Text {
                text: "look".to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "data:image/png;base64,AA".to_string(),
                },
            },
        ]);
        assert_eq!(content.text(), "look");
    }
}
