//! Types shared by every crate: inbound messages, outbound replies and
//! attachments.

pub mod types;

pub use types::{Attachment, InboundMessage, Participant, Reply, ReplyPayload, channels};
