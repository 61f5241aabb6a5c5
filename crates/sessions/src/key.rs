use std::fmt;

use {
    parley_common::InboundMessage,
    serde::{Deserialize, Serialize},
};

/// Session key: `<channel>:<conversation id>`.
///
/// Derived from the conversation, never from the sender, so two users in
/// two conversations always get two keys. `%`, `:` and `/` inside either
/// part are percent-encoded, so distinct (channel, conversation) pairs never
/// share a key and [`SessionKey::scoped`] keys never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn for_conversation(channel_id: &str, conversation_id: &str) -> Self {
        Self(format!("{}:{}", escape(channel_id), escape(conversation_id)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key for one namespace of this session's state.
    pub fn scoped(&self, namespace: &str) -> String {
        format!("{}/{namespace}", self.0)
    }
}

fn escape(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for c in part.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            '/' => out.push_str("%2F"),
            c => out.push(c),
        }
    }
    out
}

impl From<&InboundMessage> for SessionKey {
    fn from(msg: &InboundMessage) -> Self {
        Self::for_conversation(&msg.channel_id, &msg.conversation_id)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
