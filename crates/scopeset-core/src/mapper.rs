//! Settings mapper: the load/save pipeline over a settings store.
//!
//! The mapper owns the per-group config cache (built once per group,
//! first writer wins), funnels every read and write through the store's
//! scope-chain merge, and applies the cast/encryption/lock pipeline
//! uniformly: save runs `cast.set` then encrypt then store, load runs
//! decrypt then `cast.get`.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use scopeset_types::prelude::*;

use crate::config::{GroupRegistry, SettingsConfig, SettingsGroup};
use crate::crypto::Encrypter;
use crate::observer::SettingsObserver;

pub struct SettingsMapper {
	default_store: Arc<dyn SettingsStore>,
	named_stores: HashMap<Box<str>, Arc<dyn SettingsStore>>,
	encrypter: Option<Arc<dyn Encrypter>>,
	observers: Vec<Arc<dyn SettingsObserver>>,
	configs: RwLock<HashMap<&'static str, Arc<SettingsConfig>>>,
}

impl SettingsMapper {
	pub fn builder(default_store: Arc<dyn SettingsStore>) -> SettingsMapperBuilder {
		SettingsMapperBuilder::new(default_store)
	}

	/// Resolve the config for a group, building it on first use.
	///
	/// Concurrent first-time builds for the same group serialize behind
	/// the write lock and re-check, so exactly one config is ever built.
	pub fn initialize<G: SettingsGroup>(&self) -> ScResult<Arc<SettingsConfig>> {
		// Fast path: already built
		{
			let configs = self.configs.read();
			if let Some(config) = configs.get(G::group()) {
				return Ok(Arc::clone(config));
			}
		}

		let mut configs = self.configs.write();

		// Double-checked: another caller may have built it meanwhile
		if let Some(config) = configs.get(G::group()) {
			return Ok(Arc::clone(config));
		}

		let mut registry = GroupRegistry::new();
		G::declare(&mut registry)?;
		if registry.is_empty() {
			return Err(Error::Config(
				format!("settings group '{}' declares no properties", G::group()).into(),
			));
		}

		let store = match G::store() {
			Some(name) => Arc::clone(self.named_stores.get(name).ok_or_else(|| {
				Error::Config(
					format!("settings group '{}' references unknown store '{}'", G::group(), name)
						.into(),
				)
			})?),
			None => Arc::clone(&self.default_store),
		};

		let config = Arc::new(registry.freeze(G::group(), store));
		configs.insert(G::group(), Arc::clone(&config));

		Ok(config)
	}

	/// Whether a group's config has been built already
	pub fn has(&self, group: &str) -> bool {
		self.configs.read().contains_key(group)
	}

	/// Load the full typed property set of a group at a scope.
	///
	/// Fails with [`Error::MissingSettings`] when the merged store state
	/// does not cover every declared property.
	pub async fn load<G: SettingsGroup>(&self, scope: Scope) -> ScResult<PropertyBag> {
		let config = self.initialize::<G>()?;

		let raw = self.raw_properties(&config, scope).await?;

		self.notify(|observer| observer.settings_loading(config.group(), &raw));

		self.ensure_no_missing(&config, &raw, Operation::Loading)?;

		let values = self.apply_read_pipeline(&config, raw)?;
		debug!("Loaded settings group '{}' at {}", config.group(), scope);

		Ok(values)
	}

	/// Persist a full typed property set for a group at a scope.
	///
	/// Locked properties are silently excluded from persistence and read
	/// back from storage, so the returned bag reflects true persisted
	/// state rather than caller-supplied values for locked names.
	pub async fn save<G: SettingsGroup>(
		&self,
		scope: Scope,
		properties: PropertyBag,
	) -> ScResult<PropertyBag> {
		let config = self.initialize::<G>()?;

		self.ensure_no_missing(&config, &properties, Operation::Saving)?;

		// Locked names: the process overlay plus whatever the store marks
		let mut locked = config.locked();
		locked.extend(config.store().locked_properties(config.group(), scope).await?);

		let mut changed = PropertyBag::new();
		for (name, value) in properties {
			if locked.contains(&name) {
				debug!("Skipping locked property '{}' in group '{}'", name, config.group());
				continue;
			}

			let mut payload = value.clone();
			if let Some(cast) = config.cast(&name) {
				payload = cast.set(payload)?;
			}
			if config.is_encrypted(&name) {
				payload = self.encrypter(&config)?.encrypt(&payload)?;
			}

			config.store().update_property_payload(config.group(), &name, &payload, scope).await?;
			changed.insert(name, value);
		}

		// Locked values are read back so callers see persisted state
		let locked_names: Vec<&str> = locked.iter().map(String::as_str).collect();
		let mut result = self.fetch_into(&config, scope, &locked_names).await?;
		for (name, value) in changed {
			result.insert(name, value);
		}

		debug!("Saved settings group '{}' at {}", config.group(), scope);

		Ok(result)
	}

	/// Fetch a subset of a group's properties with the read pipeline
	/// applied. Shared by `load` and the facade's test-double constructor.
	pub async fn fetch_properties<G: SettingsGroup>(
		&self,
		scope: Scope,
		names: &[&str],
	) -> ScResult<PropertyBag> {
		let config = self.initialize::<G>()?;

		self.fetch_into(&config, scope, names).await
	}

	pub(crate) fn notify<F>(&self, f: F)
	where
		F: Fn(&dyn SettingsObserver),
	{
		for observer in &self.observers {
			f(observer.as_ref());
		}
	}

	/// Merged store state restricted to the group's declared names.
	async fn raw_properties(&self, config: &SettingsConfig, scope: Scope) -> ScResult<PropertyBag> {
		let bag = config.store().properties_in_group(config.group(), scope).await?;

		Ok(bag.into_iter().filter(|(name, _)| config.contains(name)).collect())
	}

	async fn fetch_into(
		&self,
		config: &SettingsConfig,
		scope: Scope,
		names: &[&str],
	) -> ScResult<PropertyBag> {
		if names.is_empty() {
			return Ok(PropertyBag::new());
		}

		let bag = config.store().properties_in_group(config.group(), scope).await?;

		let mut filtered = PropertyBag::new();
		for (name, payload) in bag {
			if names.contains(&name.as_str()) {
				filtered.insert(name, payload);
			}
		}

		self.apply_read_pipeline(config, filtered)
	}

	/// Decrypt-then-cast, per property.
	fn apply_read_pipeline(
		&self,
		config: &SettingsConfig,
		bag: PropertyBag,
	) -> ScResult<PropertyBag> {
		let mut values = PropertyBag::new();
		for (name, mut payload) in bag {
			if config.is_encrypted(&name) {
				payload = self.encrypter(config)?.decrypt(&payload)?;
			}
			if let Some(cast) = config.cast(&name) {
				payload = cast.get(payload)?;
			}
			values.insert(name, payload);
		}

		Ok(values)
	}

	fn encrypter(&self, config: &SettingsConfig) -> ScResult<&Arc<dyn Encrypter>> {
		self.encrypter.as_ref().ok_or_else(|| {
			Error::Crypto(
				format!(
					"group '{}' declares encrypted properties but no encrypter is configured",
					config.group()
				)
				.into(),
			)
		})
	}

	fn ensure_no_missing(
		&self,
		config: &SettingsConfig,
		properties: &PropertyBag,
		operation: Operation,
	) -> ScResult<()> {
		let missing: Vec<&str> =
			config.properties().filter(|name| !properties.contains_key(*name)).collect();

		if missing.is_empty() {
			Ok(())
		} else {
			Err(Error::missing_settings(config.group(), missing, operation))
		}
	}
}

/// Builder assembling a mapper from a default store, optional named
/// stores, an encrypter, and observers.
pub struct SettingsMapperBuilder {
	default_store: Arc<dyn SettingsStore>,
	named_stores: HashMap<Box<str>, Arc<dyn SettingsStore>>,
	encrypter: Option<Arc<dyn Encrypter>>,
	observers: Vec<Arc<dyn SettingsObserver>>,
}

impl SettingsMapperBuilder {
	pub fn new(default_store: Arc<dyn SettingsStore>) -> Self {
		Self {
			default_store,
			named_stores: HashMap::new(),
			encrypter: None,
			observers: Vec::new(),
		}
	}

	/// Register a named store groups can opt into via
	/// [`SettingsGroup::store`]
	pub fn store(mut self, name: impl Into<Box<str>>, store: Arc<dyn SettingsStore>) -> Self {
		self.named_stores.insert(name.into(), store);
		self
	}

	pub fn encrypter(mut self, encrypter: Arc<dyn Encrypter>) -> Self {
		self.encrypter = Some(encrypter);
		self
	}

	pub fn observer(mut self, observer: Arc<dyn SettingsObserver>) -> Self {
		self.observers.push(observer);
		self
	}

	pub fn build(self) -> SettingsMapper {
		SettingsMapper {
			default_store: self.default_store,
			named_stores: self.named_stores,
			encrypter: self.encrypter,
			observers: self.observers,
			configs: RwLock::new(HashMap::new()),
		}
	}
}

// vim: ts=4
