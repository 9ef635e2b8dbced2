//! Database schema initialization
//!
//! Creates the properties table on first open. One row per
//! `(group, name, team, user)` cell; `user_id = 0` means "no user layer"
//! so the cell can participate in the primary key and upserts.

use sqlx::SqlitePool;

/// Initialize the database schema with all required tables and indexes
pub(crate) async fn init_db(db: &SqlitePool) -> Result<(), sqlx::Error> {
	let mut tx = db.begin().await?;

	// Properties
	//************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS settings_properties (
		grp text NOT NULL,
		name text NOT NULL,
		team_id integer NOT NULL DEFAULT 0,
		user_id integer NOT NULL DEFAULT 0,
		payload text,
		locked boolean NOT NULL DEFAULT FALSE,
		created_at datetime DEFAULT (unixepoch()),
		PRIMARY KEY(grp, name, team_id, user_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_settings_properties_scope
		ON settings_properties(grp, team_id, user_id)",
	)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;

	Ok(())
}

// vim: ts=4
