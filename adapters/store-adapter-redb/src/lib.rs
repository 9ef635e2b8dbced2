#![forbid(unsafe_code)]

//! redb-backed key-value settings store.
//!
//! Storage shape: one `props` entry per `(group, name, team, user)` cell,
//! keyed `"{team}/{user}/{group}/{name}"` with the payload JSON-encoded,
//! plus a parallel `locks` table keyed `"{team}/{user}/{group}"` holding
//! the set of locked names for that cell as a JSON array. redb calls are
//! blocking and run on the blocking thread pool.

mod error;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

pub use error::Error;

use scopeset::prelude::*;

/// Property payload table
pub const TABLE_PROPS: redb::TableDefinition<&str, &str> = redb::TableDefinition::new("props");

/// Locked name sets per scope cell
pub const TABLE_LOCKS: redb::TableDefinition<&str, &str> = redb::TableDefinition::new("locks");

fn cell_user(cell: Scope) -> u32 {
	cell.user_id.map_or(0, |user_id| user_id.0)
}

/// Key prefix covering every property of a group at one exact scope cell
fn cell_prefix(group: &str, cell: Scope) -> String {
	format!("{}/{}/{}/", cell.team_id.0, cell_user(cell), group)
}

fn props_key(group: &str, name: &str, cell: Scope) -> String {
	format!("{}/{}/{}/{}", cell.team_id.0, cell_user(cell), group, name)
}

fn locks_key(group: &str, cell: Scope) -> String {
	format!("{}/{}/{}", cell.team_id.0, cell_user(cell), group)
}

/// Run a blocking redb closure on the blocking pool and map its errors.
async fn run<T, F>(f: F) -> ScResult<T>
where
	T: Send + 'static,
	F: FnOnce() -> Result<T, error::Error> + Send + 'static,
{
	match tokio::task::spawn_blocking(f).await {
		Ok(res) => res.map_err(Into::into),
		Err(err) => Err(error::Error::from(err).into()),
	}
}

/// Read the locked name set stored for one cell, if any.
fn read_lock_set<T>(table: &T, key: &str) -> Result<BTreeSet<String>, error::Error>
where
	T: redb::ReadableTable<&'static str, &'static str>,
{
	match table.get(key).map_err(error::from_redb_error)? {
		Some(guard) => Ok(serde_json::from_str(guard.value())?),
		None => Ok(BTreeSet::new()),
	}
}

#[derive(Debug)]
pub struct RedbSettingsStore {
	db: Arc<redb::Database>,
}

impl RedbSettingsStore {
	pub async fn new(path: impl AsRef<Path>) -> ScResult<Self> {
		let path = path.as_ref().to_path_buf();

		let db = run(move || {
			let db = if path.exists() {
				redb::Database::open(&path).map_err(error::from_redb_error)?
			} else {
				redb::Database::create(&path).map_err(error::from_redb_error)?
			};

			// Initialize tables
			let tx = db.begin_write().map_err(error::from_redb_error)?;
			let _ = tx.open_table(TABLE_PROPS).map_err(error::from_redb_error)?;
			let _ = tx.open_table(TABLE_LOCKS).map_err(error::from_redb_error)?;
			tx.commit().map_err(error::from_redb_error)?;

			Ok(db)
		})
		.await?;

		debug!("Opened redb settings store");

		Ok(Self { db: Arc::new(db) })
	}
}

#[async_trait]
impl SettingsStore for RedbSettingsStore {
	async fn properties_in_group(&self, group: &str, scope: Scope) -> ScResult<PropertyBag> {
		let db = Arc::clone(&self.db);
		let group = group.to_string();

		run(move || {
			use redb::ReadableDatabase;

			let tx = db.begin_read().map_err(error::from_redb_error)?;
			let table = tx.open_table(TABLE_PROPS).map_err(error::from_redb_error)?;

			let mut layers = Vec::new();
			for layer in scope.layers() {
				let prefix = cell_prefix(&group, layer);
				let mut bag = PropertyBag::new();

				let range = table.range(prefix.as_str()..).map_err(error::from_redb_error)?;
				for item in range {
					let (key, value) = item.map_err(error::from_redb_error)?;
					let key_str = key.value();

					if !key_str.starts_with(&prefix) {
						break;
					}

					let name = &key_str[prefix.len()..];
					bag.insert(name.to_string(), serde_json::from_str(value.value())?);
				}

				layers.push(bag);
			}

			Ok(merge_layers(layers))
		})
		.await
	}

	async fn property_exists(&self, group: &str, name: &str, scope: Scope) -> ScResult<bool> {
		let db = Arc::clone(&self.db);
		let key = props_key(group, name, scope.write_target());

		run(move || {
			use redb::ReadableDatabase;

			let tx = db.begin_read().map_err(error::from_redb_error)?;
			let table = tx.open_table(TABLE_PROPS).map_err(error::from_redb_error)?;

			Ok(table.get(key.as_str()).map_err(error::from_redb_error)?.is_some())
		})
		.await
	}

	async fn property_payload(
		&self,
		group: &str,
		name: &str,
		scope: Scope,
	) -> ScResult<Option<Value>> {
		let db = Arc::clone(&self.db);
		let keys: Vec<String> =
			scope.layers().into_iter().rev().map(|layer| props_key(group, name, layer)).collect();

		run(move || {
			use redb::ReadableDatabase;

			let tx = db.begin_read().map_err(error::from_redb_error)?;
			let table = tx.open_table(TABLE_PROPS).map_err(error::from_redb_error)?;

			// Most specific cell wins
			for key in keys {
				if let Some(guard) = table.get(key.as_str()).map_err(error::from_redb_error)? {
					return Ok(Some(serde_json::from_str(guard.value())?));
				}
			}

			Ok(None)
		})
		.await
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
		let db = Arc::clone(&self.db);
		let key = props_key(group, name, scope.write_target());
		let encoded = payload.to_string();

		run(move || {
			let tx = db.begin_write().map_err(error::from_redb_error)?;
			{
				let mut table = tx.open_table(TABLE_PROPS).map_err(error::from_redb_error)?;
				table.insert(key.as_str(), encoded.as_str()).map_err(error::from_redb_error)?;
			}
			tx.commit().map_err(error::from_redb_error)?;

			Ok(())
		})
		.await
	}

	async fn delete_property(&self, group: &str, name: &str, scope: Scope) -> ScResult<()> {
		let db = Arc::clone(&self.db);
		let key = props_key(group, name, scope.write_target());

		run(move || {
			let tx = db.begin_write().map_err(error::from_redb_error)?;
			{
				let mut table = tx.open_table(TABLE_PROPS).map_err(error::from_redb_error)?;
				table.remove(key.as_str()).map_err(error::from_redb_error)?;
			}
			tx.commit().map_err(error::from_redb_error)?;

			Ok(())
		})
		.await
	}

	async fn lock_properties(&self, group: &str, names: &[&str], scope: Scope) -> ScResult<()> {
		let db = Arc::clone(&self.db);
		let key = locks_key(group, scope.write_target());
		let names: Vec<String> = names.iter().map(|name| (*name).to_string()).collect();

		run(move || {
			let tx = db.begin_write().map_err(error::from_redb_error)?;
			{
				let mut table = tx.open_table(TABLE_LOCKS).map_err(error::from_redb_error)?;

				let mut locked = read_lock_set(&table, key.as_str())?;
				locked.extend(names);

				let encoded = serde_json::to_string(&locked)?;
				table.insert(key.as_str(), encoded.as_str()).map_err(error::from_redb_error)?;
			}
			tx.commit().map_err(error::from_redb_error)?;

			Ok(())
		})
		.await
	}

	async fn unlock_properties(&self, group: &str, names: &[&str], scope: Scope) -> ScResult<()> {
		let db = Arc::clone(&self.db);
		let key = locks_key(group, scope.write_target());
		let names: Vec<String> = names.iter().map(|name| (*name).to_string()).collect();

		run(move || {
			let tx = db.begin_write().map_err(error::from_redb_error)?;
			{
				let mut table = tx.open_table(TABLE_LOCKS).map_err(error::from_redb_error)?;

				let mut locked = read_lock_set(&table, key.as_str())?;
				for name in &names {
					locked.remove(name);
				}

				if locked.is_empty() {
					table.remove(key.as_str()).map_err(error::from_redb_error)?;
				} else {
					let encoded = serde_json::to_string(&locked)?;
					table.insert(key.as_str(), encoded.as_str()).map_err(error::from_redb_error)?;
				}
			}
			tx.commit().map_err(error::from_redb_error)?;

			Ok(())
		})
		.await
	}

	async fn locked_properties(&self, group: &str, scope: Scope) -> ScResult<BTreeSet<String>> {
		let db = Arc::clone(&self.db);
		let keys: Vec<String> =
			scope.layers().into_iter().map(|layer| locks_key(group, layer)).collect();

		run(move || {
			use redb::ReadableDatabase;

			let tx = db.begin_read().map_err(error::from_redb_error)?;
			let table = tx.open_table(TABLE_LOCKS).map_err(error::from_redb_error)?;

			let mut locked = BTreeSet::new();
			for key in keys {
				locked.extend(read_lock_set(&table, key.as_str())?);
			}

			Ok(locked)
		})
		.await
	}
}

// vim: ts=4
