//! SQLite-backed settings store.
//!
//! Storage shape: one row per `(group, name, team, user)` cell with the
//! payload JSON-encoded as text. Locking a name with no stored value
//! materializes a placeholder row with a NULL payload; NULL payloads are
//! invisible to every read path.

mod schema;

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
	Row,
	sqlite::{self, SqlitePool},
};

use scopeset::prelude::*;

use schema::init_db;

fn db_err(err: sqlx::Error) -> Error {
	warn!("DB: {:#?}", err);
	Error::Store(err.to_string().into())
}

fn cell_user(scope: Scope) -> u32 {
	scope.user_id.map_or(0, |user_id| user_id.0)
}

#[derive(Debug)]
pub struct SqliteSettingsStore {
	db: SqlitePool,
}

impl SqliteSettingsStore {
	pub async fn new(path: impl AsRef<Path>) -> ScResult<Self> {
		let opts = sqlite::SqliteConnectOptions::new()
			.filename(path.as_ref())
			.create_if_missing(true)
			.journal_mode(sqlite::SqliteJournalMode::Wal);
		let db = sqlite::SqlitePoolOptions::new()
			.max_connections(5)
			.connect_with(opts)
			.await
			.map_err(db_err)?;

		init_db(&db).await.map_err(db_err)?;

		Ok(Self { db })
	}

	/// All visible properties stored at one exact scope cell.
	async fn cell_bag(&self, group: &str, cell: Scope) -> ScResult<PropertyBag> {
		let rows = sqlx::query(
			"SELECT name, payload FROM settings_properties
			WHERE grp = ?1 AND team_id = ?2 AND user_id = ?3 AND payload IS NOT NULL",
		)
		.bind(group)
		.bind(cell.team_id.0)
		.bind(cell_user(cell))
		.fetch_all(&self.db)
		.await
		.map_err(db_err)?;

		let mut bag = PropertyBag::new();
		for row in rows {
			let name: String = row.try_get("name").map_err(db_err)?;
			let payload: String = row.try_get("payload").map_err(db_err)?;
			bag.insert(name, serde_json::from_str(&payload)?);
		}

		Ok(bag)
	}

	async fn upsert(&self, group: &str, name: &str, payload: &Value, scope: Scope) -> ScResult<()> {
		let cell = scope.write_target();

		sqlx::query(
			"INSERT INTO settings_properties (grp, name, team_id, user_id, payload)
			VALUES (?1, ?2, ?3, ?4, ?5)
			ON CONFLICT(grp, name, team_id, user_id) DO UPDATE SET payload = excluded.payload",
		)
		.bind(group)
		.bind(name)
		.bind(cell.team_id.0)
		.bind(cell_user(cell))
		.bind(payload.to_string())
		.execute(&self.db)
		.await
		.map_err(db_err)?;

		Ok(())
	}
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
	async fn properties_in_group(&self, group: &str, scope: Scope) -> ScResult<PropertyBag> {
		let mut layers = Vec::new();
		for layer in scope.layers() {
			layers.push(self.cell_bag(group, layer).await?);
		}

		Ok(merge_layers(layers))
	}

	async fn property_exists(&self, group: &str, name: &str, scope: Scope) -> ScResult<bool> {
		let cell = scope.write_target();

		let row = sqlx::query(
			"SELECT 1 FROM settings_properties
			WHERE grp = ?1 AND name = ?2 AND team_id = ?3 AND user_id = ?4 AND payload IS NOT NULL",
		)
		.bind(group)
		.bind(name)
		.bind(cell.team_id.0)
		.bind(cell_user(cell))
		.fetch_optional(&self.db)
		.await
		.map_err(db_err)?;

		Ok(row.is_some())
	}

	async fn property_payload(
		&self,
		group: &str,
		name: &str,
		scope: Scope,
	) -> ScResult<Option<Value>> {
		// Most specific cell wins
		for layer in scope.layers().into_iter().rev() {
			let row = sqlx::query(
				"SELECT payload FROM settings_properties
				WHERE grp = ?1 AND name = ?2 AND team_id = ?3 AND user_id = ?4
					AND payload IS NOT NULL",
			)
			.bind(group)
			.bind(name)
			.bind(layer.team_id.0)
			.bind(cell_user(layer))
			.fetch_optional(&self.db)
			.await
			.map_err(db_err)?;

			if let Some(row) = row {
				let payload: String = row.try_get("payload").map_err(db_err)?;
				return Ok(Some(serde_json::from_str(&payload)?));
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
		self.upsert(group, name, payload, scope).await
	}

	async fn update_property_payload(
		&self,
		group: &str,
		name: &str,
		payload: &Value,
		scope: Scope,
	) -> ScResult<()> {
		self.upsert(group, name, payload, scope).await
	}

	async fn delete_property(&self, group: &str, name: &str, scope: Scope) -> ScResult<()> {
		let cell = scope.write_target();

		sqlx::query(
			"DELETE FROM settings_properties
			WHERE grp = ?1 AND name = ?2 AND team_id = ?3 AND user_id = ?4",
		)
		.bind(group)
		.bind(name)
		.bind(cell.team_id.0)
		.bind(cell_user(cell))
		.execute(&self.db)
		.await
		.map_err(db_err)?;

		Ok(())
	}

	async fn lock_properties(&self, group: &str, names: &[&str], scope: Scope) -> ScResult<()> {
		let cell = scope.write_target();

		for name in names {
			// Placeholder row (NULL payload) when the name has no value yet
			sqlx::query(
				"INSERT INTO settings_properties (grp, name, team_id, user_id, payload, locked)
				VALUES (?1, ?2, ?3, ?4, NULL, TRUE)
				ON CONFLICT(grp, name, team_id, user_id) DO UPDATE SET locked = TRUE",
			)
			.bind(group)
			.bind(*name)
			.bind(cell.team_id.0)
			.bind(cell_user(cell))
			.execute(&self.db)
			.await
			.map_err(db_err)?;
		}

		debug!("Locked {} properties in group '{}' at {}", names.len(), group, cell);

		Ok(())
	}

	async fn unlock_properties(&self, group: &str, names: &[&str], scope: Scope) -> ScResult<()> {
		let cell = scope.write_target();

		for name in names {
			sqlx::query(
				"UPDATE settings_properties SET locked = FALSE
				WHERE grp = ?1 AND name = ?2 AND team_id = ?3 AND user_id = ?4",
			)
			.bind(group)
			.bind(*name)
			.bind(cell.team_id.0)
			.bind(cell_user(cell))
			.execute(&self.db)
			.await
			.map_err(db_err)?;
		}

		// Placeholder rows have no reason to stay once unlocked
		sqlx::query(
			"DELETE FROM settings_properties
			WHERE grp = ?1 AND team_id = ?2 AND user_id = ?3
				AND payload IS NULL AND locked = FALSE",
		)
		.bind(group)
		.bind(cell.team_id.0)
		.bind(cell_user(cell))
		.execute(&self.db)
		.await
		.map_err(db_err)?;

		Ok(())
	}

	async fn locked_properties(&self, group: &str, scope: Scope) -> ScResult<BTreeSet<String>> {
		let mut locked = BTreeSet::new();

		for layer in scope.layers() {
			let rows = sqlx::query(
				"SELECT name FROM settings_properties
				WHERE grp = ?1 AND team_id = ?2 AND user_id = ?3 AND locked = TRUE",
			)
			.bind(group)
			.bind(layer.team_id.0)
			.bind(cell_user(layer))
			.fetch_all(&self.db)
			.await
			.map_err(db_err)?;

			for row in rows {
				let name: String = row.try_get("name").map_err(db_err)?;
				locked.insert(name);
			}
		}

		Ok(locked)
	}
}

// vim: ts=4
