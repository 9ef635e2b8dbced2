//! Synchronous observer hooks around load and save.
//!
//! Observers are registered on the mapper builder and invoked in
//! registration order at four points: when a group's raw merged payloads
//! arrive from the store, when a facade instance finishes loading, right
//! before a save persists, and after a save completed.

use scopeset_types::prelude::*;

/// Hook points around settings load and save.
///
/// All methods have no-op defaults; implement the ones of interest.
#[allow(unused_variables)]
pub trait SettingsObserver: Send + Sync {
	/// Raw merged payloads of a group, before decryption and casts
	fn settings_loading(&self, group: &str, raw: &PropertyBag) {}

	/// Typed values a facade instance finished loading
	fn settings_loaded(&self, group: &str, values: &PropertyBag) {}

	/// About to persist: the new values alongside the original snapshot
	fn saving_settings(
		&self,
		group: &str,
		new_values: &PropertyBag,
		original_values: Option<&PropertyBag>,
	) {
	}

	/// Values as persisted after a save, locked properties resolved
	fn settings_saved(&self, group: &str, values: &PropertyBag) {}
}

// vim: ts=4
