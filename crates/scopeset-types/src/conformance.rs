//! Shared conformance suite for [`SettingsStore`](crate::store_adapter::SettingsStore)
//! implementations.
//!
//! Every backend must pass the exact same precedence, upsert, delete, and
//! locking semantics. The suite is written once as a macro and invoked
//! from each adapter's `tests/` directory with an async constructor:
//!
//! ```ignore
//! async fn make_store() -> (MemorySettingsStore, ()) {
//! 	(MemorySettingsStore::new(), ())
//! }
//!
//! scopeset_types::store_conformance_tests!(make_store);
//! ```
//!
//! The constructor returns the store plus a guard value kept alive for
//! the duration of the test (a `TempDir` for file-backed stores).

/// Generate the store conformance test suite against `$make_store`.
#[macro_export]
macro_rules! store_conformance_tests {
	($make_store:ident) => {
		#[tokio::test]
		async fn test_create_and_read_property() {
			use $crate::store_adapter::SettingsStore as _;
			use $crate::types::Scope;

			let (store, _guard) = $make_store().await;

			store
				.create_property("general", "site_name", &::serde_json::json!("Acme"), Scope::global())
				.await
				.expect("create should succeed");

			assert!(
				store
					.property_exists("general", "site_name", Scope::global())
					.await
					.expect("exists check should succeed")
			);
			assert_eq!(
				store
					.property_payload("general", "site_name", Scope::global())
					.await
					.expect("read should succeed"),
				Some(::serde_json::json!("Acme"))
			);
		}

		#[tokio::test]
		async fn test_missing_property_resolves_to_none() {
			use $crate::store_adapter::SettingsStore as _;
			use $crate::types::Scope;

			let (store, _guard) = $make_store().await;

			assert_eq!(
				store
					.property_payload("general", "absent", Scope::global())
					.await
					.expect("read should succeed"),
				None
			);
			assert!(
				!store
					.property_exists("general", "absent", Scope::global())
					.await
					.expect("exists check should succeed")
			);
		}

		#[tokio::test]
		async fn test_merge_precedence_follows_scope_chain() {
			use $crate::store_adapter::SettingsStore as _;
			use $crate::types::{Scope, TeamId, UserId};

			let (store, _guard) = $make_store().await;

			store
				.create_property("general", "site_name", &::serde_json::json!("Acme"), Scope::global())
				.await
				.expect("create should succeed");
			store
				.create_property("general", "max_users", &::serde_json::json!(10), Scope::global())
				.await
				.expect("create should succeed");
			store
				.update_property_payload(
					"general",
					"max_users",
					&::serde_json::json!(50),
					Scope::team(TeamId(5)),
				)
				.await
				.expect("team override should succeed");
			store
				.update_property_payload(
					"general",
					"site_name",
					&::serde_json::json!("Nine's"),
					Scope::team_user(TeamId(5), UserId(9)),
				)
				.await
				.expect("user override should succeed");

			// Team 5 without a user: team override on top of defaults
			let bag = store
				.properties_in_group("general", Scope::team(TeamId(5)))
				.await
				.expect("merged read should succeed");
			assert_eq!(bag.get("site_name"), Some(&::serde_json::json!("Acme")));
			assert_eq!(bag.get("max_users"), Some(&::serde_json::json!(50)));

			// Unrelated team 7: defaults only
			let bag = store
				.properties_in_group("general", Scope::team(TeamId(7)))
				.await
				.expect("merged read should succeed");
			assert_eq!(bag.get("site_name"), Some(&::serde_json::json!("Acme")));
			assert_eq!(bag.get("max_users"), Some(&::serde_json::json!(10)));

			// User 9 in team 5: most specific layer wins per property
			let bag = store
				.properties_in_group("general", Scope::team_user(TeamId(5), UserId(9)))
				.await
				.expect("merged read should succeed");
			assert_eq!(bag.get("site_name"), Some(&::serde_json::json!("Nine's")));
			assert_eq!(bag.get("max_users"), Some(&::serde_json::json!(50)));

			// Another user in team 5 sees the team layer, not user 9's
			let bag = store
				.properties_in_group("general", Scope::team_user(TeamId(5), UserId(11)))
				.await
				.expect("merged read should succeed");
			assert_eq!(bag.get("site_name"), Some(&::serde_json::json!("Acme")));
			assert_eq!(bag.get("max_users"), Some(&::serde_json::json!(50)));
		}

		#[tokio::test]
		async fn test_merge_is_per_property_not_per_record() {
			use $crate::store_adapter::SettingsStore as _;
			use $crate::types::{Scope, TeamId, UserId};

			let (store, _guard) = $make_store().await;

			store
				.create_property("mail", "host", &::serde_json::json!("mail.example.com"), Scope::global())
				.await
				.expect("create should succeed");
			store
				.create_property("mail", "port", &::serde_json::json!(25), Scope::global())
				.await
				.expect("create should succeed");
			// The user cell stores only one of the two names
			store
				.update_property_payload(
					"mail",
					"port",
					&::serde_json::json!(2525),
					Scope::team_user(TeamId(3), UserId(4)),
				)
				.await
				.expect("override should succeed");

			let bag = store
				.properties_in_group("mail", Scope::team_user(TeamId(3), UserId(4)))
				.await
				.expect("merged read should succeed");

			// `host` must fall through even though the user cell exists
			assert_eq!(bag.get("host"), Some(&::serde_json::json!("mail.example.com")));
			assert_eq!(bag.get("port"), Some(&::serde_json::json!(2525)));
		}

		#[tokio::test]
		async fn test_user_without_team_layer_applies() {
			use $crate::store_adapter::SettingsStore as _;
			use $crate::types::{Scope, TeamId, UserId};

			let (store, _guard) = $make_store().await;

			store
				.create_property("ui", "theme", &::serde_json::json!("light"), Scope::global())
				.await
				.expect("create should succeed");
			store
				.update_property_payload("ui", "theme", &::serde_json::json!("dark"), Scope::user(UserId(9)))
				.await
				.expect("user write should succeed");

			// The user layer applies with and without a team
			let bag = store
				.properties_in_group("ui", Scope::user(UserId(9)))
				.await
				.expect("merged read should succeed");
			assert_eq!(bag.get("theme"), Some(&::serde_json::json!("dark")));

			let bag = store
				.properties_in_group("ui", Scope::team_user(TeamId(5), UserId(9)))
				.await
				.expect("merged read should succeed");
			assert_eq!(bag.get("theme"), Some(&::serde_json::json!("dark")));

			// A plain team scope never sees user cells
			let bag = store
				.properties_in_group("ui", Scope::team(TeamId(5)))
				.await
				.expect("merged read should succeed");
			assert_eq!(bag.get("theme"), Some(&::serde_json::json!("light")));
		}

		#[tokio::test]
		async fn test_upsert_creates_then_updates() {
			use $crate::store_adapter::SettingsStore as _;
			use $crate::types::{Scope, TeamId};

			let (store, _guard) = $make_store().await;
			let scope = Scope::team(TeamId(2));

			assert!(!store.property_exists("general", "banner", scope).await.expect("exists"));

			store
				.update_property_payload("general", "banner", &::serde_json::json!("hello"), scope)
				.await
				.expect("upsert-create should succeed");
			assert_eq!(
				store.property_payload("general", "banner", scope).await.expect("read"),
				Some(::serde_json::json!("hello"))
			);

			store
				.update_property_payload("general", "banner", &::serde_json::json!("goodbye"), scope)
				.await
				.expect("upsert-update should succeed");
			assert_eq!(
				store.property_payload("general", "banner", scope).await.expect("read"),
				Some(::serde_json::json!("goodbye"))
			);
		}

		#[tokio::test]
		async fn test_write_targets_most_specific_cell() {
			use $crate::store_adapter::SettingsStore as _;
			use $crate::types::{Scope, TeamId, UserId};

			let (store, _guard) = $make_store().await;

			store
				.create_property("general", "quota", &::serde_json::json!(100), Scope::global())
				.await
				.expect("create should succeed");
			store
				.update_property_payload(
					"general",
					"quota",
					&::serde_json::json!(500),
					Scope::team_user(TeamId(5), UserId(9)),
				)
				.await
				.expect("override should succeed");

			// The global cell is untouched
			assert_eq!(
				store.property_payload("general", "quota", Scope::global()).await.expect("read"),
				Some(::serde_json::json!(100))
			);
			assert_eq!(
				store
					.property_payload("general", "quota", Scope::team_user(TeamId(5), UserId(9)))
					.await
					.expect("read"),
				Some(::serde_json::json!(500))
			);
		}

		#[tokio::test]
		async fn test_delete_is_scoped_to_write_target() {
			use $crate::store_adapter::SettingsStore as _;
			use $crate::types::{Scope, TeamId};

			let (store, _guard) = $make_store().await;

			store
				.create_property("general", "quota", &::serde_json::json!(100), Scope::global())
				.await
				.expect("create should succeed");
			store
				.update_property_payload("general", "quota", &::serde_json::json!(500), Scope::team(TeamId(5)))
				.await
				.expect("override should succeed");

			store
				.delete_property("general", "quota", Scope::team(TeamId(5)))
				.await
				.expect("delete should succeed");

			// Team resolution falls back to the surviving global cell
			assert_eq!(
				store
					.property_payload("general", "quota", Scope::team(TeamId(5)))
					.await
					.expect("read"),
				Some(::serde_json::json!(100))
			);
		}

		#[tokio::test]
		async fn test_lock_unlock_roundtrip() {
			use $crate::store_adapter::SettingsStore as _;
			use $crate::types::{Scope, TeamId};

			let (store, _guard) = $make_store().await;
			let scope = Scope::team(TeamId(5));

			store
				.create_property("general", "site_name", &::serde_json::json!("Acme"), scope)
				.await
				.expect("create should succeed");

			store
				.lock_properties("general", &["site_name", "maintenance"], scope)
				.await
				.expect("lock should succeed");
			let locked = store.locked_properties("general", scope).await.expect("read locks");
			assert!(locked.contains("site_name"));
			// Locking a name with no stored value is allowed
			assert!(locked.contains("maintenance"));

			// Placeholder lock entries must not leak into reads
			let bag = store.properties_in_group("general", scope).await.expect("merged read");
			assert!(!bag.contains_key("maintenance"));

			store
				.unlock_properties("general", &["site_name", "maintenance"], scope)
				.await
				.expect("unlock should succeed");
			let locked = store.locked_properties("general", scope).await.expect("read locks");
			assert!(locked.is_empty());
		}

		#[tokio::test]
		async fn test_locked_properties_union_along_chain() {
			use $crate::store_adapter::SettingsStore as _;
			use $crate::types::{Scope, TeamId, UserId};

			let (store, _guard) = $make_store().await;

			store
				.lock_properties("general", &["site_name"], Scope::global())
				.await
				.expect("lock should succeed");
			store
				.lock_properties("general", &["max_users"], Scope::team(TeamId(5)))
				.await
				.expect("lock should succeed");

			let locked = store
				.locked_properties("general", Scope::team_user(TeamId(5), UserId(9)))
				.await
				.expect("read locks");
			assert!(locked.contains("site_name"));
			assert!(locked.contains("max_users"));

			// An unrelated team only inherits the global lock
			let locked = store
				.locked_properties("general", Scope::team(TeamId(7)))
				.await
				.expect("read locks");
			assert!(locked.contains("site_name"));
			assert!(!locked.contains("max_users"));
		}

		#[tokio::test]
		async fn test_payload_shapes_survive_storage() {
			use $crate::store_adapter::SettingsStore as _;
			use $crate::types::Scope;

			let (store, _guard) = $make_store().await;

			let payload = ::serde_json::json!({
				"enabled": true,
				"ratio": 0.25,
				"count": 0,
				"label": "",
				"tags": [],
				"nested": { "a": [1, 2, 3], "b": null },
			});

			store
				.create_property("shapes", "blob", &payload, Scope::global())
				.await
				.expect("create should succeed");
			assert_eq!(
				store.property_payload("shapes", "blob", Scope::global()).await.expect("read"),
				Some(payload)
			);
		}
	};
}

// vim: ts=4
