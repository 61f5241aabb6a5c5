use {async_trait::async_trait, parley_common::Reply};

/// Delivery failures reported by a channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel '{channel}' cannot render {what}")]
    Unsupported { channel: String, what: &'static str },

    #[error("delivery to '{recipient}' failed: {reason}")]
    Delivery { recipient: String, reason: String },
}

/// Send replies to a channel.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    /// Channel identifier (e.g. "test", "msteams").
    fn channel_id(&self) -> &str;

    async fn send(&self, reply: &Reply) -> Result<(), ChannelError>;
}
