//! Infrastructure layer: in-memory stores and configuration loading.

pub mod config;
pub mod memory;

pub use config::{load_settings, settings_from_toml};
pub use memory::{InMemoryGroupStore, InMemorySessionStore, InMemoryUserStore};
