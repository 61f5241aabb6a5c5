//! Config schema types (dialog behaviour, channel capabilities).
use std::{collections::HashMap, fmt, str::FromStr};

use {
    parley_common::types::channels,
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    pub dialog: DialogConfig,
    pub channels: ChannelsConfig,
}

/// Where the user profile dialog keeps its in-progress profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageStrategy {
    /// Per-conversation session state. The only correct choice.
    #[default]
    Session,
    /// One process-wide profile shared by every conversation.
    Global,
    /// A profile field on the dialog instance shared by every conversation.
    Property,
}

impl StorageStrategy {
    pub const ALL: [StorageStrategy; 3] = [Self::Session, Self::Global, Self::Property];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Global => "global",
            Self::Property => "property",
        }
    }
}

impl fmt::Display for StorageStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" | "normal" => Ok(Self::Session),
            "global" | "globally" => Ok(Self::Global),
            "property" | "properties" | "singleton" => Ok(Self::Property),
            other => Err(format!(
                "unknown storage strategy '{other}' (expected session, global or property)"
            )),
        }
    }
}

/// User profile dialog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    pub strategy: StorageStrategy,

    /// Content types accepted as a profile picture.
    pub picture_content_types: Vec<String>,

    /// Exclusive lower bound for a valid age.
    pub min_age: i64,

    /// Exclusive upper bound for a valid age.
    pub max_age: i64,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            strategy: StorageStrategy::Session,
            picture_content_types: vec!["image/jpeg".into(), "image/png".into()],
            min_age: 0,
            max_age: 150,
        }
    }
}

/// Per-channel capability overrides keyed by channel id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    #[serde(flatten)]
    pub channels: HashMap<String, ChannelEntry>,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        let channels = [channels::MSTEAMS]
            .into_iter()
            .map(|id| (id.to_string(), ChannelEntry::builtin(id)))
            .collect();
        Self { channels }
    }
}

impl ChannelsConfig {
    /// Settings for a channel. Channels missing from the config fall back to
    /// their built-in capabilities.
    pub fn get(&self, channel_id: &str) -> ChannelEntry {
        self.channels
            .get(channel_id)
            .cloned()
            .unwrap_or_else(|| ChannelEntry::builtin(channel_id))
    }
}

/// Capabilities of a single channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelEntry {
    /// Whether users can answer the picture prompt with an attachment.
    pub attachment_prompt: bool,

    /// Whether the channel can display attachments sent by the bot.
    pub render_attachments: bool,

    /// Notice sent when the picture prompt is skipped on this channel.
    pub skip_notice: String,
}

impl ChannelEntry {
    /// Built-in capabilities of a known channel.
    pub fn builtin(channel_id: &str) -> Self {
        match channel_id {
            channels::MSTEAMS => Self {
                attachment_prompt: false,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }
}

impl Default for ChannelEntry {
    fn default() -> Self {
        Self {
            attachment_prompt: true,
            render_attachments: true,
            skip_notice: "Skipping attachment prompt in Teams channel...".into(),
        }
    }
}
