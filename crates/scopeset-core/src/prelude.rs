//! Common imports for applications using the settings engine.

pub use scopeset_types::prelude::*;

pub use crate::casts::Cast;
pub use crate::config::{GroupRegistry, PropertyDefinition, SettingsConfig, SettingsGroup};
pub use crate::crypto::Encrypter;
pub use crate::mapper::{SettingsMapper, SettingsMapperBuilder};
pub use crate::observer::SettingsObserver;
pub use crate::settings::Settings;

// vim: ts=4
