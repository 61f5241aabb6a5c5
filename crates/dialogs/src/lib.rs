//! Dialogs: prompt recognition, the waterfall step runner and the user
//! profile script.
//!
//! The user profile dialog can keep its in-progress profile in three places
//! (see [`slot`]). Only the session-scoped slot keeps conversations apart;
//! the other two are kept so their failure under interleaved conversations
//! can be demonstrated with the scripts in [`scenario`].

pub mod choice;
pub mod error;
pub mod profile;
pub mod prompt;
pub mod scenario;
pub mod slot;
pub mod user_profile;
pub mod waterfall;

pub use {
    error::DialogError,
    profile::{Age, Picture, Transport, UserProfile},
    slot::{GlobalSlot, ProfileSlot, PropertySlot, SessionSlot},
    user_profile::{UserProfileDialog, user_profile_runner},
    waterfall::{DialogRunner, DialogStatus, StepAction, StepContext, StepValue, TurnOutcome, Waterfall},
};
