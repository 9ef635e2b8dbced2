//! In-memory settings store.
//!
//! Keeps every `(group, team, user)` cell in process memory behind an
//! async lock. Used as the conformance reference for the store contract
//! and as a drop-in test double for applications that do not want to
//! touch a real backend in their test suites.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

use scopeset::prelude::*;

/// Exact storage cell: `(team, user)`, with user id 0 encoding "no user".
type CellKey = (u32, u32);

fn cell_of(scope: Scope) -> CellKey {
	(scope.team_id.0, scope.user_id.map_or(0, |user_id| user_id.0))
}

#[derive(Debug, Default)]
struct GroupState {
	properties: HashMap<CellKey, PropertyBag>,
	locks: HashMap<CellKey, BTreeSet<String>>,
}

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
	groups: RwLock<HashMap<Box<str>, GroupState>>,
}

impl MemorySettingsStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Drop all stored properties and locks.
	pub async fn clear(&self) {
		self.groups.write().await.clear();
	}
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
	async fn properties_in_group(&self, group: &str, scope: Scope) -> ScResult<PropertyBag> {
		let groups = self.groups.read().await;
		let Some(state) = groups.get(group) else {
			return Ok(PropertyBag::new());
		};

		Ok(merge_layers(scope.layers().into_iter().map(|layer| {
			state.properties.get(&cell_of(layer)).cloned().unwrap_or_default()
		})))
	}

	async fn property_exists(&self, group: &str, name: &str, scope: Scope) -> ScResult<bool> {
		let groups = self.groups.read().await;

		Ok(groups
			.get(group)
			.and_then(|state| state.properties.get(&cell_of(scope.write_target())))
			.is_some_and(|bag| bag.contains_key(name)))
	}

	async fn property_payload(
		&self,
		group: &str,
		name: &str,
		scope: Scope,
	) -> ScResult<Option<Value>> {
		let groups = self.groups.read().await;
		let Some(state) = groups.get(group) else {
			return Ok(None);
		};

		// Most specific cell wins
		for layer in scope.layers().into_iter().rev() {
			if let Some(payload) =
				state.properties.get(&cell_of(layer)).and_then(|bag| bag.get(name))
			{
				return Ok(Some(payload.clone()));
			}
		}

		Ok(None)
	}

	async fn create_property(
		&self,
		group: &str,
		name: &str,
		payload: &Value,
		scope: Scope,
	) -> ScResult<()> {
		self.update_property_payload(group, name, payload, scope).await
	}

	async fn update_property_payload(
		&self,
		group: &str,
		name: &str,
		payload: &Value,
		scope: Scope,
	) -> ScResult<()> {
		let mut groups = self.groups.write().await;
		let state = groups.entry(group.into()).or_default();

		state
			.properties
			.entry(cell_of(scope.write_target()))
			.or_default()
			.insert(name.to_string(), payload.clone());

		Ok(())
	}

	async fn delete_property(&self, group: &str, name: &str, scope: Scope) -> ScResult<()> {
		let mut groups = self.groups.write().await;

		if let Some(state) = groups.get_mut(group)
			&& let Some(bag) = state.properties.get_mut(&cell_of(scope.write_target()))
		{
			bag.remove(name);
		}

		Ok(())
	}

	async fn lock_properties(&self, group: &str, names: &[&str], scope: Scope) -> ScResult<()> {
		let mut groups = self.groups.write().await;
		let state = groups.entry(group.into()).or_default();

		state
			.locks
			.entry(cell_of(scope.write_target()))
			.or_default()
			.extend(names.iter().map(|name| (*name).to_string()));

		Ok(())
	}

	async fn unlock_properties(&self, group: &str, names: &[&str], scope: Scope) -> ScResult<()> {
		let mut groups = self.groups.write().await;

		if let Some(state) = groups.get_mut(group)
			&& let Some(locked) = state.locks.get_mut(&cell_of(scope.write_target()))
		{
			for name in names {
				locked.remove(*name);
			}
		}

		Ok(())
	}

	async fn locked_properties(&self, group: &str, scope: Scope) -> ScResult<BTreeSet<String>> {
		let groups = self.groups.read().await;
		let Some(state) = groups.get(group) else {
			return Ok(BTreeSet::new());
		};

		let mut locked = BTreeSet::new();
		for layer in scope.layers() {
			if let Some(names) = state.locks.get(&cell_of(layer)) {
				locked.extend(names.iter().cloned());
			}
		}

		Ok(locked)
	}
}

// vim: ts=4
