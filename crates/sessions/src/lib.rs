//! Per-conversation session state.
//!
//! Every conversation gets a [`SessionKey`]. State for a key lives in a
//! [`SessionStore`] backed by a [`Storage`] implementation, and all turns for
//! one key are serialized through [`TurnLocks`]. Nothing in this crate is
//! shared between keys.

pub mod key;
pub mod lock;
pub mod storage;
pub mod store;

pub use {
    key::SessionKey,
    lock::{TurnGuard, TurnLocks},
    storage::{MemoryStorage, Storage},
    store::SessionStore,
};
