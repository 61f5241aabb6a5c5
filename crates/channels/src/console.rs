use {
    async_trait::async_trait,
    parley_common::{Reply, ReplyPayload},
    parley_config::ChannelEntry,
    tokio::{
        io::{AsyncWrite, AsyncWriteExt, Stdout},
        sync::Mutex,
    },
};

use crate::plugin::{ChannelError, ChannelOutbound};

/// Writes replies as lines of text, one per reply:
///
/// ```text
/// [alfred-conv] Alfred <- Please enter your name.
/// [alfred-conv] Alfred <- [image/png https://example.test/me.png] This is your profile picture.
/// ```
pub struct ConsoleOutbound<W = Stdout> {
    channel_id: String,
    render_attachments: bool,
    out: Mutex<W>,
}

impl ConsoleOutbound<Stdout> {
    pub fn stdout(channel_id: impl Into<String>, entry: &ChannelEntry) -> Self {
        Self::new(channel_id, entry, tokio::io::stdout())
    }
}

impl<W> ConsoleOutbound<W> {
    pub fn new(channel_id: impl Into<String>, entry: &ChannelEntry, out: W) -> Self {
        Self {
            channel_id: channel_id.into(),
            render_attachments: entry.render_attachments,
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

fn render(reply: &Reply) -> String {
    let body = match &reply.payload {
        ReplyPayload::Text { text } => text.clone(),
        ReplyPayload::Attachment {
            attachment,
            caption,
        } => {
            let mut line = format!("[{}", attachment.content_type);
            if let Some(url) = &attachment.content_url {
                line.push(' ');
                line.push_str(url);
            }
            line.push(']');
            if let Some(caption) = caption {
                line.push(' ');
                line.push_str(caption);
            }
            line
        },
    };
    format!(
        "[{}] {} <- {body}\n",
        reply.conversation_id, reply.recipient.name
    )
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send + Sync> ChannelOutbound for ConsoleOutbound<W> {
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

        let delivery = |e: std::io::Error| ChannelError::Delivery {
            recipient: reply.recipient.id.clone(),
            reason: e.to_string(),
        };
        let mut out = self.out.lock().await;
        out.write_all(render(reply).as_bytes()).await.map_err(delivery)?;
        out.flush().await.map_err(delivery)
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
        InboundMessage::text("console", "alfred-conv", Participant::new("alfred", "Alfred"), "hi")
    }

    #[tokio::test]
    async fn writes_one_line_per_reply() {
        let console = ConsoleOutbound::new("console", &ChannelEntry::default(), Vec::<u8>::new());
        let msg = inbound();
        console
            .send(&msg.reply(ReplyPayload::Text {
                text: "Please enter your name.".into(),
            }))
            .await
            .unwrap();
        console
            .send(&msg.reply(ReplyPayload::Attachment {
                attachment: Attachment::new("image/png").with_url("https://example.test/me.png"),
                caption: Some("This is your profile picture.".into()),
            }))
            .await
            .unwrap();

        let written = String::from_utf8(console.into_inner()).unwrap();
        assert_eq!(
            written,
            "[alfred-conv] Alfred <- Please enter your name.\n\
             [alfred-conv] Alfred <- [image/png https://example.test/me.png] This is your profile picture.\n"
        );
    }

    #[tokio::test]
    async fn refuses_attachments_when_configured() {
        let entry = ChannelEntry {
            render_attachments: false,
            ..ChannelEntry::default()
        };
        let console = ConsoleOutbound::new("console", &entry, Vec::<u8>::new());
        let reply = inbound().reply(ReplyPayload::Attachment {
            attachment: Attachment::new("image/jpeg"),
            caption: None,
        });
        assert!(matches!(
            console.send(&reply).await,
            Err(ChannelError::Unsupported { .. })
        ));
        assert!(console.into_inner().is_empty());
    }
}
