//! Core services of the Scopeset settings engine.
//!
//! Settings groups are plain serde structs that declare their properties
//! through a [`GroupRegistry`]. The [`SettingsMapper`] resolves each group
//! against a pluggable [`SettingsStore`](scopeset_types::store_adapter::SettingsStore)
//! through the layered scope chain, applying casts, encryption, and lock
//! policy uniformly on load and save. Applications interact with the
//! typed [`Settings`] facade, which loads lazily on first access and
//! persists buffered edits on an explicit `save`.

pub mod casts;
pub mod config;
pub mod crypto;
pub mod mapper;
pub mod observer;
pub mod prelude;
pub mod settings;

pub use config::{
	GroupRegistry, PropertyDefinition, PropertyDefinitionBuilder, SettingsConfig, SettingsGroup,
};
pub use mapper::{SettingsMapper, SettingsMapperBuilder};
pub use settings::Settings;

// vim: ts=4
