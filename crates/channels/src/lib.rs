//! Outbound channel adapters.
//!
//! A channel delivers the bot's replies. Dialogs only see the
//! [`ChannelOutbound`] trait; whether a channel can render attachments is
//! reported through [`ChannelError::Unsupported`] at send time.

pub mod capture;
pub mod console;
pub mod plugin;

pub use {
    capture::CaptureOutbound,
    console::ConsoleOutbound,
    plugin::{ChannelError, ChannelOutbound},
};
