use serde::{Deserialize, Serialize};

/// Well-known channel identifiers.
pub mod channels {
    /// In-process test channel.
    pub const TEST: &str = "test";
    /// Interactive terminal channel used by the CLI.
    pub const CONSOLE: &str = "console";
    /// Microsoft Teams. Attachment prompts are not supported there.
    pub const MSTEAMS: &str = "msteams";
}

/// A user or bot taking part in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// MIME type as reported by the channel (e.g. `image/png`).
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Attachment {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            content_url: None,
            name: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.content_url = Some(url.into());
        self
    }

    /// Case-insensitive content type check against an allow list.
    pub fn has_content_type(&self, allowed: &[String]) -> bool {
        allowed
            .iter()
            .any(|t| t.eq_ignore_ascii_case(self.content_type.trim()))
    }
}

/// A message received from a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub channel_id: String,
    pub conversation_id: String,
    pub from: Participant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl InboundMessage {
    /// Build a plain text message with a fresh message id.
    pub fn text(
        channel_id: impl Into<String>,
        conversation_id: impl Into<String>,
        from: Participant,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel_id: channel_id.into(),
            conversation_id: conversation_id.into(),
            from,
            text: Some(text.into()),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Message text, or `""` for attachment-only messages.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// Address a reply back to the sender, in the same conversation.
    pub fn reply(&self, payload: ReplyPayload) -> Reply {
        Reply {
            recipient: self.from.clone(),
            conversation_id: self.conversation_id.clone(),
            reply_to_id: self.id.clone(),
            payload,
        }
    }
}

/// Content of an outbound reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplyPayload {
    Text {
        text: String,
    },
    Attachment {
        attachment: Attachment,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

/// A message sent by the bot in response to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub recipient: Participant,
    pub conversation_id: String,
    pub reply_to_id: String,
    pub payload: ReplyPayload,
}

impl Reply {
    /// Text of a text reply, `None` for attachments.
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            ReplyPayload::Text { text } => Some(text),
            ReplyPayload::Attachment { .. } => None,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_is_addressed_to_sender() {
        let msg = InboundMessage::text(
            channels::TEST,
            "alfred-conv",
            Participant::new("alfred", "Alfred"),
            "hello",
        );
        let reply = msg.reply(ReplyPayload::Text {
            text: "hi".into(),
        });
        assert_eq!(reply.recipient.id, "alfred");
        assert_eq!(reply.conversation_id, "alfred-conv");
        assert_eq!(reply.reply_to_id, msg.id);
        assert_eq!(reply.text(), Some("hi"));
    }

    #[test]
    fn content_type_match_ignores_case() {
        let allowed = vec!["image/png".to_string()];
        assert!(Attachment::new("IMAGE/PNG").has_content_type(&allowed));
        assert!(!Attachment::new("image/gif").has_content_type(&allowed));
    }

    #[test]
    fn attachment_only_message_has_empty_text() {
        let mut msg = InboundMessage::text(
            channels::TEST,
            "c",
            Participant::new("u", "U"),
            "",
        )
        .with_attachment(Attachment::new("image/png"));
        msg.text = None;
        assert_eq!(msg.text_or_empty(), "");
        assert_eq!(msg.attachments.len(), 1);
    }

    #[test]
    fn payload_serializes_with_type_tag() {
        let payload = ReplyPayload::Text {
            text: "hi".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "hi");
    }
}
