//! Typed settings facade.
//!
//! A `Settings<G>` instance moves through a small lifecycle: bound to a
//! scope at construction, loaded on the first property access (exactly
//! once per instance), freely mutated in memory, and flushed through the
//! mapper on an explicit [`Settings::save`]. Every accessor funnels
//! through the `ensure_loaded` guard instead of relying on intercepted
//! property access.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use scopeset_types::prelude::*;

use crate::config::{SettingsConfig, SettingsGroup};
use crate::mapper::SettingsMapper;

pub struct Settings<G: SettingsGroup> {
	mapper: Arc<SettingsMapper>,
	config: Arc<SettingsConfig>,
	scope: Scope,
	values: Option<G>,
	original_values: Option<PropertyBag>,
}

impl<G: SettingsGroup> Settings<G> {
	/// Bind a facade instance to a scope. No storage access happens until
	/// the first property access or an explicit lifecycle call.
	pub fn new(mapper: Arc<SettingsMapper>, scope: Scope) -> ScResult<Self> {
		let config = mapper.initialize::<G>()?;

		Ok(Self { mapper, config, scope, values: None, original_values: None })
	}

	/// Test-double constructor: supplied values override storage, and any
	/// unspecified declared property is fetched from storage instead.
	pub async fn fake(
		mapper: Arc<SettingsMapper>,
		scope: Scope,
		overrides: PropertyBag,
	) -> ScResult<Self> {
		let mut settings = Self::new(mapper, scope)?;

		let values = {
			let unspecified: Vec<&str> = settings
				.config
				.properties()
				.filter(|name| !overrides.contains_key(*name))
				.collect();

			let mut values =
				settings.mapper.fetch_properties::<G>(scope, &unspecified).await?;
			for (name, value) in overrides {
				values.insert(name, value);
			}
			values
		};

		settings.install(values)?;
		settings.notify_loaded();

		Ok(settings)
	}

	pub fn scope(&self) -> Scope {
		self.scope
	}

	pub fn is_loaded(&self) -> bool {
		self.values.is_some()
	}

	/// Typed read access; triggers the deferred load on first use.
	pub async fn get(&mut self) -> ScResult<&G> {
		self.ensure_loaded().await?;
		self.values_ref()
	}

	/// Typed write access; mutations stay in memory until [`Self::save`].
	pub async fn get_mut(&mut self) -> ScResult<&mut G> {
		self.ensure_loaded().await?;
		match &mut self.values {
			Some(values) => Ok(values),
			None => Err(Error::NotFound),
		}
	}

	/// Apply a mutation to the typed values.
	pub async fn update<F>(&mut self, f: F) -> ScResult<()>
	where
		F: FnOnce(&mut G),
	{
		f(self.get_mut().await?);
		Ok(())
	}

	/// Merge a bag of property values into the in-memory state.
	pub async fn fill(&mut self, properties: PropertyBag) -> ScResult<()> {
		self.ensure_loaded().await?;

		let mut bag = self.to_bag_now()?;
		for (name, value) in properties {
			bag.insert(name, value);
		}

		self.values = Some(serde_json::from_value(Value::Object(bag))?);
		Ok(())
	}

	/// Flush the in-memory values through the mapper and refresh from the
	/// authoritative post-save state (locked properties come back as
	/// actually persisted, not as supplied).
	pub async fn save(&mut self) -> ScResult<&G> {
		self.ensure_loaded().await?;

		let new_values = self.to_bag_now()?;
		self.mapper.notify(|observer| {
			observer.saving_settings(self.config.group(), &new_values, self.original_values.as_ref())
		});

		let persisted = self.mapper.save::<G>(self.scope, new_values).await?;
		self.install(persisted)?;
		self.notify_saved();

		self.values_ref()
	}

	/// Throw away in-memory state and reload from storage.
	pub async fn refresh(&mut self) -> ScResult<&G> {
		self.values = None;
		self.original_values = None;
		self.get().await
	}

	/// Mark properties read-only for saves in this process
	pub fn lock(&self, names: &[&str]) {
		self.config.lock(names);
	}

	pub fn unlock(&self, names: &[&str]) {
		self.config.unlock(names);
	}

	pub fn locked_properties(&self) -> BTreeSet<String> {
		self.config.locked()
	}

	/// Export as a name/value bag in declared property order.
	pub async fn to_bag(&mut self) -> ScResult<PropertyBag> {
		self.ensure_loaded().await?;
		self.to_bag_now()
	}

	pub async fn to_json(&mut self) -> ScResult<String> {
		let bag = self.to_bag().await?;
		Ok(serde_json::to_string(&bag)?)
	}

	/// Replace the in-memory state from a previously exported JSON
	/// document, skipping storage entirely.
	pub fn from_json(&mut self, json: &str) -> ScResult<&G> {
		let values: PropertyBag = serde_json::from_str(json)?;
		self.install(values)?;
		self.notify_loaded();

		self.values_ref()
	}

	/// Load-once guard: every accessor funnels through here.
	async fn ensure_loaded(&mut self) -> ScResult<()> {
		if self.values.is_some() {
			return Ok(());
		}

		let values = self.mapper.load::<G>(self.scope).await?;
		self.install(values)?;
		self.notify_loaded();

		Ok(())
	}

	fn install(&mut self, values: PropertyBag) -> ScResult<()> {
		self.values = Some(serde_json::from_value(Value::Object(values.clone()))?);
		self.original_values = Some(values);
		Ok(())
	}

	fn values_ref(&self) -> ScResult<&G> {
		match &self.values {
			Some(values) => Ok(values),
			None => Err(Error::NotFound),
		}
	}

	/// Serialize the current values in declared order; assumes loaded.
	fn to_bag_now(&self) -> ScResult<PropertyBag> {
		let Some(values) = &self.values else {
			return Err(Error::Config(
				format!("settings group '{}' is not loaded", self.config.group()).into(),
			));
		};

		let Value::Object(map) = serde_json::to_value(values)? else {
			return Err(Error::Config(
				format!("settings group '{}' does not serialize to an object", self.config.group())
					.into(),
			));
		};

		let mut bag = PropertyBag::new();
		for name in self.config.properties() {
			if let Some(value) = map.get(name) {
				bag.insert(name.to_string(), value.clone());
			}
		}

		Ok(bag)
	}

	fn notify_loaded(&self) {
		if let Some(values) = &self.original_values {
			self.mapper.notify(|observer| observer.settings_loaded(self.config.group(), values));
		}
	}

	fn notify_saved(&self) {
		if let Some(values) = &self.original_values {
			self.mapper.notify(|observer| observer.settings_saved(self.config.group(), values));
		}
	}
}

// vim: ts=4
