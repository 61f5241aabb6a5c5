use {
    async_trait::async_trait,
    parley_common::{Reply, ReplyPayload},
    parley_config::ChannelEntry,
    tokio::sync::Mutex,
    tracing::trace,
};

use crate::plugin::{ChannelError, ChannelOutbound};

/// In-memory channel that records every delivered reply.
///
/// Attachment replies are rejected when the channel is configured without
/// attachment rendering, which lets callers exercise their fallback path.
pub struct CaptureOutbound {
    channel_id: String,
    render_attachments: bool,
    sent: Mutex<Vec<Reply>>,
}

impl CaptureOutbound {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            render_attachments: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn for_channel(channel_id: impl Into<String>, entry: &ChannelEntry) -> Self {
        Self {
            render_attachments: entry.render_attachments,
            ..Self::new(channel_id)
        }
    }

    pub fn without_attachments(mut self) -> Self {
        self.render_attachments = false;
        self
    }

    /// Remove and return everything sent so far.
    pub async fn take(&self) -> Vec<Reply> {
        std::mem::take(&mut *self.sent.lock().await)
    }

    /// Texts of everything sent so far, attachments excluded.
    pub async fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|r| r.text().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl ChannelOutbound for CaptureOutbound {
    fn channel_id(&self) -> &str {
        &self.channel_id
    }

    async fn send(&self, reply: &Reply) -> Result<(), ChannelError> {
        if matches!(reply.payload, ReplyPayload::Attachment { .. }) && !self.render_attachments {
            return Err(ChannelError::Unsupported {
                channel: self.channel_id.clone(),
                what: "attachments",
            });
        }
        trace!(channel = %self.channel_id, to = %reply.recipient.id, "captured reply");
        self.sent.lock().await.push(reply.clone());
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        parley_common::{Attachment, InboundMessage, Participant},
    };

    fn inbound() -> InboundMessage {
        InboundMessage::text("test", "c", Participant::new("u", "U"), "hi")
    }

    #[tokio::test]
    async fn records_replies_in_order() {
        let channel = CaptureOutbound::new("test");
        let msg = inbound();
        for text in ["one", "two"] {
            channel
                .send(&msg.reply(ReplyPayload::Text { text: text.into() }))
                .await
                .unwrap();
        }
        assert_eq!(channel.texts().await, vec!["one", "two"]);
        assert_eq!(channel.take().await.len(), 2);
        assert!(channel.take().await.is_empty());
    }

    #[tokio::test]
    async fn rejects_attachments_when_rendering_is_off() {
        let channel = CaptureOutbound::new("test").without_attachments();
        let reply = inbound().reply(ReplyPayload::Attachment {
            attachment: Attachment::new("image/png"),
            caption: None,
        });
        let err = channel.send(&reply).await.unwrap_err();
        assert!(matches!(err, ChannelError::Unsupported { .. }));
        assert!(channel.take().await.is_empty());
    }

    #[tokio::test]
    async fn follows_channel_config() {
        let entry = ChannelEntry {
            render_attachments: false,
            ..ChannelEntry::default()
        };
        let channel = CaptureOutbound::for_channel("slack", &entry);
        assert_eq!(channel.channel_id(), "slack");
        let reply = inbound().reply(ReplyPayload::Attachment {
            attachment: Attachment::new("image/png"),
            caption: Some("pic".into()),
        });
        assert!(channel.send(&reply).await.is_err());
    }
}
