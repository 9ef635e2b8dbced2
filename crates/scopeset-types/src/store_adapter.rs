//! Adapter trait for settings property storage backends.
//!
//! Every backend implements the exact same scope precedence semantics
//! (see [`crate::types::Scope`]) even though the storage shape differs:
//! rows with scope columns for relational backends, scope-prefixed keys
//! for key-value backends. The layer list and the merge itself are shared
//! so the semantics cannot drift per backend.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt::Debug;

use crate::error::ScResult;
use crate::types::{PropertyBag, Scope};

/// Backend-specific storage of named properties, keyed by
/// `(group, team, user)` cells.
///
/// Payloads cross this boundary as decoded JSON values: backends encode
/// to their storage form on write and decode on read, but never apply
/// casts or encryption — that is the mapper's job.
#[async_trait]
pub trait SettingsStore: Send + Sync + Debug {
	/// The effective, already-merged property set visible at `scope`:
	/// global defaults overlaid by team, user, and user-in-team cells,
	/// merged name by name.
	async fn properties_in_group(&self, group: &str, scope: Scope) -> ScResult<PropertyBag>;

	/// Whether a property exists at the scope's write-target cell.
	async fn property_exists(&self, group: &str, name: &str, scope: Scope) -> ScResult<bool>;

	/// A single property payload resolved through the precedence chain,
	/// most specific cell wins. `None` if no cell stores the name.
	async fn property_payload(&self, group: &str, name: &str, scope: Scope)
	-> ScResult<Option<Value>>;

	/// Create a property at the scope's write-target cell.
	async fn create_property(
		&self,
		group: &str,
		name: &str,
		payload: &Value,
		scope: Scope,
	) -> ScResult<()>;

	/// Upsert a property payload at the scope's write-target cell: if no
	/// property exists there yet, it is created instead of failing.
	async fn update_property_payload(
		&self,
		group: &str,
		name: &str,
		payload: &Value,
		scope: Scope,
	) -> ScResult<()>;

	/// Delete a property from the scope's write-target cell.
	async fn delete_property(&self, group: &str, name: &str, scope: Scope) -> ScResult<()>;

	/// Mark a set of property names as locked at the scope's write-target
	/// cell. Locking a name with no stored value is allowed.
	async fn lock_properties(&self, group: &str, names: &[&str], scope: Scope) -> ScResult<()>;

	/// Remove the locked mark from a set of property names at the scope's
	/// write-target cell.
	async fn unlock_properties(&self, group: &str, names: &[&str], scope: Scope) -> ScResult<()>;

	/// All property names locked anywhere along the scope's precedence
	/// chain.
	async fn locked_properties(&self, group: &str, scope: Scope) -> ScResult<BTreeSet<String>>;
}

// vim: ts=4
