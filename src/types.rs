use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Message role in conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.into()),
        }
    }

    /// True if any part of this message is an image.
    pub fn has_images(&self) -> bool {
        match &self.content {
            MessageContent::Text(_) => false,
            MessageContent::Parts(parts) => parts
                .iter()
                .any(|p| matches!(p, ContentPart::ImageUrl { .. })),
        }
    }
}

/// Message content - either plain text or structured parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Get text content if available.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(s) => Some(s),
            MessageContent::Parts(_) => None,
        }
    }
}

/// Content part for multi-modal messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Token usage reported by the endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    #[serde(default)]
    pub cache_write_tokens: u32,
    #[serde(default)]
    pub cache_read_tokens: u32,
}

impl Usage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            ..Default::default()
        }
    }

    /// Total tokens used.
    #[inline]
    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// A normalized event produced while streaming a conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A fragment of assistant text.
    Text { content: String },
    /// Token counters carried by a chunk.
    Usage(Usage),
}

impl StreamEvent {
    pub fn text(content: impl Into<String>) -> Self {
        StreamEvent::Text {
            content: content.into(),
        }
    }

    /// Text content, if this is a text event.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StreamEvent::Text { content } => Some(content),
            StreamEvent::Usage(_) => None,
        }
    }

    /// Usage counters, if this is a usage event.
    pub fn as_usage(&self) -> Option<&Usage> {
        match self {
            StreamEvent::Usage(usage) => Some(usage),
            StreamEvent::Text { .. } => None,
        }
    }
}

/// Per-call context supplied by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct MessageMetadata {
    /// Orchestrator task the call belongs to, used for log correlation.
    pub task_id: Option<String>,
    /// Orchestrator mode (e.g. "code", "architect").
    pub mode: Option<String>,
    /// Cancels the request and ends the event stream when triggered.
    pub cancellation: Option<CancellationToken>,
}

impl MessageMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization() {
        let msg = Message::user("Hello");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, serde_json::json!({"role": "user", "content": "Hello"}));
    }

    #[test]
    fn test_parts_serialization() {
        let msg = Message {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text {
                    text: "look".into(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: "data:image/png;base64,AAAA".into(),
                        detail: None,
                    },
                },
            ]),
        };
        assert!(msg.has_images());
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }

    #[test]
    fn test_stream_event_accessors() {
        let text = StreamEvent::text("Hi");
        assert_eq!(text.as_text(), Some("Hi"));
        assert!(text.as_usage().is_none());

        let usage = StreamEvent::Usage(Usage::new(3, 4));
        assert_eq!(usage.as_usage().map(Usage::total), Some(7));
    }

    #[test]
    fn test_usage_total_saturates() {
        assert_eq!(Usage::new(u32::MAX, 1).total(), u32::MAX);
        assert_eq!(Usage::new(u32::MAX - 1, 1).total(), u32::MAX);
    }
}
