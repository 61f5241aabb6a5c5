//! Configuration: schema types, discovery and loading.
//!
//! Config files are looked up as `parley.{toml,yaml,yml,json}` in the
//! working directory, then in `~/.config/parley/`.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config, to_toml},
    schema::{ChannelEntry, ChannelsConfig, DialogConfig, ParleyConfig, StorageStrategy},
};
