//! Common imports for scopeset crates and storage adapters.

pub use crate::error::{Error, Operation, ScResult};
pub use crate::store_adapter::SettingsStore;
pub use crate::types::{PropertyBag, Scope, TeamId, UserId, merge_layers};

pub use tracing::{debug, error, info, trace, warn};

// vim: ts=4
