//! Per-group settings metadata.
//!
//! Every settings group declares its properties once through a
//! [`GroupRegistry`]; the registry freezes into a [`SettingsConfig`] that
//! is cached by the mapper for the process lifetime. The config also
//! carries the process-local lock overlay, which is authoritative for
//! `is_locked` queries in this process.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Debug;
use std::sync::Arc;

use scopeset_types::prelude::*;

use crate::casts::Cast;

/// A settings group: a storage namespace plus its declared properties.
///
/// Implemented by plain serde structs. Every struct field must be covered
/// by a declared property of the same name.
pub trait SettingsGroup:
	serde::Serialize + serde::de::DeserializeOwned + Send + Sync + 'static
{
	/// Storage namespace of this group
	fn group() -> &'static str;

	/// Declare the group's properties
	fn declare(registry: &mut GroupRegistry) -> ScResult<()>;

	/// Name of the store this group persists to, when not the mapper's
	/// default store
	fn store() -> Option<&'static str> {
		None
	}
}

/// Metadata for one declared property: optional cast and encryption flag.
pub struct PropertyDefinition {
	name: Box<str>,
	cast: Option<Arc<dyn Cast>>,
	encrypted: bool,
}

impl PropertyDefinition {
	/// Create a builder for constructing a PropertyDefinition
	pub fn builder(name: impl Into<Box<str>>) -> PropertyDefinitionBuilder {
		PropertyDefinitionBuilder::new(name)
	}

	pub fn name(&self) -> &str {
		&self.name
	}
}

impl Debug for PropertyDefinition {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PropertyDefinition")
			.field("name", &self.name)
			.field("cast", &self.cast.is_some())
			.field("encrypted", &self.encrypted)
			.finish()
	}
}

/// Builder for PropertyDefinition with fluent API
pub struct PropertyDefinitionBuilder {
	name: Box<str>,
	cast: Option<Arc<dyn Cast>>,
	encrypted: bool,
}

impl PropertyDefinitionBuilder {
	pub fn new(name: impl Into<Box<str>>) -> Self {
		Self { name: name.into(), cast: None, encrypted: false }
	}

	/// Attach a cast translating between storage and typed form
	pub fn cast(mut self, cast: impl Cast + 'static) -> Self {
		self.cast = Some(Arc::new(cast));
		self
	}

	/// Store this property encrypted at rest
	pub fn encrypted(mut self, encrypted: bool) -> Self {
		self.encrypted = encrypted;
		self
	}

	pub fn build(self) -> ScResult<PropertyDefinition> {
		if self.name.is_empty() {
			return Err(Error::Config("property name must not be empty".into()));
		}

		Ok(PropertyDefinition { name: self.name, cast: self.cast, encrypted: self.encrypted })
	}
}

/// Mutable registry a group declares its properties into
pub struct GroupRegistry {
	properties: Vec<PropertyDefinition>,
	index: HashMap<Box<str>, usize>,
}

impl GroupRegistry {
	pub(crate) fn new() -> Self {
		Self { properties: Vec::new(), index: HashMap::new() }
	}

	/// Register a new property definition
	pub fn register(&mut self, def: PropertyDefinition) -> ScResult<()> {
		if self.index.contains_key(def.name()) {
			return Err(Error::Config(
				format!("property '{}' is already declared", def.name()).into(),
			));
		}

		self.index.insert(def.name.clone(), self.properties.len());
		self.properties.push(def);
		Ok(())
	}

	/// Get number of declared properties
	pub fn len(&self) -> usize {
		self.properties.len()
	}

	/// Check if registry is empty
	pub fn is_empty(&self) -> bool {
		self.properties.is_empty()
	}

	/// Freeze the registry into the immutable per-group config
	pub(crate) fn freeze(self, group: &'static str, store: Arc<dyn SettingsStore>) -> SettingsConfig {
		debug!("Freezing settings config for group '{}' with {} properties", group, self.len());

		SettingsConfig {
			group,
			properties: self.properties,
			index: self.index,
			store,
			locked: RwLock::new(BTreeSet::new()),
		}
	}
}

/// Immutable per-group metadata, built once and cached for the process.
///
/// The lock overlay is the only mutable part; it is process-local and not
/// synced to the backend.
pub struct SettingsConfig {
	group: &'static str,
	properties: Vec<PropertyDefinition>,
	index: HashMap<Box<str>, usize>,
	store: Arc<dyn SettingsStore>,
	locked: RwLock<BTreeSet<String>>,
}

impl SettingsConfig {
	pub fn group(&self) -> &'static str {
		self.group
	}

	/// Declared property names, in declaration order
	pub fn properties(&self) -> impl Iterator<Item = &str> {
		self.properties.iter().map(PropertyDefinition::name)
	}

	pub fn len(&self) -> usize {
		self.properties.len()
	}

	pub fn is_empty(&self) -> bool {
		self.properties.is_empty()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.index.contains_key(name)
	}

	pub fn cast(&self, name: &str) -> Option<Arc<dyn Cast>> {
		self.index.get(name).and_then(|&at| self.properties.get(at)).and_then(|def| def.cast.clone())
	}

	pub fn is_encrypted(&self, name: &str) -> bool {
		self.index
			.get(name)
			.and_then(|&at| self.properties.get(at))
			.is_some_and(|def| def.encrypted)
	}

	/// The store this group persists to
	pub fn store(&self) -> &Arc<dyn SettingsStore> {
		&self.store
	}

	/// Mark properties read-only for saves in this process
	pub fn lock(&self, names: &[&str]) {
		let mut locked = self.locked.write();
		for name in names {
			locked.insert((*name).to_string());
		}
	}

	pub fn unlock(&self, names: &[&str]) {
		let mut locked = self.locked.write();
		for name in names {
			locked.remove(*name);
		}
	}

	pub fn is_locked(&self, name: &str) -> bool {
		self.locked.read().contains(name)
	}

	pub fn locked(&self) -> BTreeSet<String> {
		self.locked.read().clone()
	}
}

impl Debug for SettingsConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SettingsConfig")
			.field("group", &self.group)
			.field("properties", &self.properties)
			.field("locked", &self.locked.read())
			.finish_non_exhaustive()
	}
}


// vim: ts=4
