//! Mapper pipeline tests against the in-memory store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use scopeset_core::casts::{DateTimeCast, StringListCast};
use scopeset_core::crypto::{ChaChaEncrypter, is_encrypted_payload};
use scopeset_core::{GroupRegistry, PropertyDefinition, SettingsGroup, SettingsMapper};
use scopeset_store_adapter_memory::MemorySettingsStore;
use scopeset_types::prelude::*;

fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn bag(value: serde_json::Value) -> PropertyBag {
	match value {
		serde_json::Value::Object(map) => map,
		other => panic!("expected a JSON object, got {other}"),
	}
}

#[derive(Debug, Serialize, Deserialize)]
struct GeneralSettings {
	site_name: String,
	max_users: i64,
}

impl SettingsGroup for GeneralSettings {
	fn group() -> &'static str {
		"general"
	}

	fn declare(registry: &mut GroupRegistry) -> ScResult<()> {
		registry.register(PropertyDefinition::builder("site_name").build()?)?;
		registry.register(PropertyDefinition::builder("max_users").build()?)?;
		Ok(())
	}
}

#[derive(Debug, Serialize, Deserialize)]
struct VaultSettings {
	api_token: String,
	endpoint: String,
}

impl SettingsGroup for VaultSettings {
	fn group() -> &'static str {
		"vault"
	}

	fn declare(registry: &mut GroupRegistry) -> ScResult<()> {
		registry.register(PropertyDefinition::builder("api_token").encrypted(true).build()?)?;
		registry.register(PropertyDefinition::builder("endpoint").build()?)?;
		Ok(())
	}
}

#[derive(Debug, Serialize, Deserialize)]
struct ReportSettings {
	generated_at: chrono::DateTime<chrono::Utc>,
	recipients: Vec<String>,
}

impl SettingsGroup for ReportSettings {
	fn group() -> &'static str {
		"reports"
	}

	fn declare(registry: &mut GroupRegistry) -> ScResult<()> {
		registry.register(PropertyDefinition::builder("generated_at").cast(DateTimeCast).build()?)?;
		registry.register(PropertyDefinition::builder("recipients").cast(StringListCast).build()?)?;
		Ok(())
	}
}

#[derive(Debug, Serialize, Deserialize)]
struct BillingSettings {
	plan: String,
}

impl SettingsGroup for BillingSettings {
	fn group() -> &'static str {
		"billing"
	}

	fn declare(registry: &mut GroupRegistry) -> ScResult<()> {
		registry.register(PropertyDefinition::builder("plan").build()?)?;
		Ok(())
	}

	fn store() -> Option<&'static str> {
		Some("billing")
	}
}

async fn seed_general(store: &MemorySettingsStore) {
	store
		.create_property("general", "site_name", &json!("Acme"), Scope::global())
		.await
		.expect("seed should succeed");
	store
		.create_property("general", "max_users", &json!(10), Scope::global())
		.await
		.expect("seed should succeed");
}

#[tokio::test]
async fn test_load_returns_exactly_declared_names() {
	init_tracing();

	let store = Arc::new(MemorySettingsStore::new());
	seed_general(&store).await;
	// Undeclared leftovers in storage must not leak into loads
	store
		.create_property("general", "rogue", &json!(true), Scope::global())
		.await
		.expect("seed should succeed");

	let mapper = SettingsMapper::builder(store).build();
	let values = mapper.load::<GeneralSettings>(Scope::global()).await.expect("load should succeed");

	let names: Vec<&str> = values.keys().map(String::as_str).collect();
	assert_eq!(names, vec!["site_name", "max_users"]);
}

#[tokio::test]
async fn test_load_fails_with_missing_settings() {
	let store = Arc::new(MemorySettingsStore::new());
	store
		.create_property("general", "site_name", &json!("Acme"), Scope::global())
		.await
		.expect("seed should succeed");

	let mapper = SettingsMapper::builder(store).build();
	let err = mapper
		.load::<GeneralSettings>(Scope::global())
		.await
		.expect_err("load should fail");

	match err {
		Error::MissingSettings { group, names, operation } => {
			assert_eq!(group.as_ref(), "general");
			assert_eq!(names, vec![Box::from("max_users")]);
			assert_eq!(operation, Operation::Loading);
		}
		other => panic!("unexpected error: {other}"),
	}
}

#[tokio::test]
async fn test_save_fails_with_missing_settings() {
	let store = Arc::new(MemorySettingsStore::new());
	let mapper = SettingsMapper::builder(store).build();

	let err = mapper
		.save::<GeneralSettings>(Scope::global(), bag(json!({ "site_name": "Acme" })))
		.await
		.expect_err("save should fail");

	match err {
		Error::MissingSettings { group, names, operation } => {
			assert_eq!(group.as_ref(), "general");
			assert_eq!(names, vec![Box::from("max_users")]);
			assert_eq!(operation, Operation::Saving);
		}
		other => panic!("unexpected error: {other}"),
	}
}

#[tokio::test]
async fn test_merge_precedence_through_mapper() {
	let store = Arc::new(MemorySettingsStore::new());
	seed_general(&store).await;
	store
		.update_property_payload("general", "max_users", &json!(50), Scope::team(TeamId(5)))
		.await
		.expect("override should succeed");

	let mapper = SettingsMapper::builder(store).build();

	let values = mapper
		.load::<GeneralSettings>(Scope::team(TeamId(5)))
		.await
		.expect("load should succeed");
	assert_eq!(values.get("site_name"), Some(&json!("Acme")));
	assert_eq!(values.get("max_users"), Some(&json!(50)));

	let values = mapper
		.load::<GeneralSettings>(Scope::team(TeamId(7)))
		.await
		.expect("load should succeed");
	assert_eq!(values.get("site_name"), Some(&json!("Acme")));
	assert_eq!(values.get("max_users"), Some(&json!(10)));
}

#[tokio::test]
async fn test_save_skips_locked_overlay_properties() {
	let store = Arc::new(MemorySettingsStore::new());
	seed_general(&store).await;

	let mapper = SettingsMapper::builder(Arc::clone(&store) as Arc<dyn SettingsStore>).build();
	let config = mapper.initialize::<GeneralSettings>().expect("initialize should succeed");
	config.lock(&["site_name"]);

	let result = mapper
		.save::<GeneralSettings>(
			Scope::global(),
			bag(json!({ "site_name": "Evil Corp", "max_users": 50 })),
		)
		.await
		.expect("save should succeed");

	// The locked name keeps its persisted value, in storage and in the result
	assert_eq!(
		store
			.property_payload("general", "site_name", Scope::global())
			.await
			.expect("read should succeed"),
		Some(json!("Acme"))
	);
	assert_eq!(result.get("site_name"), Some(&json!("Acme")));
	assert_eq!(result.get("max_users"), Some(&json!(50)));

	// Unlocking makes the next save go through
	config.unlock(&["site_name"]);
	mapper
		.save::<GeneralSettings>(
			Scope::global(),
			bag(json!({ "site_name": "New Name", "max_users": 50 })),
		)
		.await
		.expect("save should succeed");
	assert_eq!(
		store
			.property_payload("general", "site_name", Scope::global())
			.await
			.expect("read should succeed"),
		Some(json!("New Name"))
	);
}

#[tokio::test]
async fn test_save_honors_store_level_locks() {
	let store = Arc::new(MemorySettingsStore::new());
	seed_general(&store).await;
	store
		.lock_properties("general", &["max_users"], Scope::global())
		.await
		.expect("lock should succeed");

	let mapper = SettingsMapper::builder(Arc::clone(&store) as Arc<dyn SettingsStore>).build();
	let result = mapper
		.save::<GeneralSettings>(
			Scope::global(),
			bag(json!({ "site_name": "Acme", "max_users": 9000 })),
		)
		.await
		.expect("save should succeed");

	assert_eq!(result.get("max_users"), Some(&json!(10)));
	assert_eq!(
		store
			.property_payload("general", "max_users", Scope::global())
			.await
			.expect("read should succeed"),
		Some(json!(10))
	);
}

#[tokio::test]
async fn test_save_is_idempotent() {
	let store = Arc::new(MemorySettingsStore::new());
	let mapper = SettingsMapper::builder(Arc::clone(&store) as Arc<dyn SettingsStore>).build();

	let values = bag(json!({ "site_name": "Acme", "max_users": 10 }));
	let first = mapper
		.save::<GeneralSettings>(Scope::global(), values.clone())
		.await
		.expect("save should succeed");
	let state_after_first = store
		.properties_in_group("general", Scope::global())
		.await
		.expect("read should succeed");

	let second = mapper
		.save::<GeneralSettings>(Scope::global(), values)
		.await
		.expect("save should succeed");
	let state_after_second = store
		.properties_in_group("general", Scope::global())
		.await
		.expect("read should succeed");

	assert_eq!(first, second);
	assert_eq!(state_after_first, state_after_second);
}

#[tokio::test]
async fn test_encrypted_property_is_ciphered_at_rest() {
	let store = Arc::new(MemorySettingsStore::new());
	let mapper = SettingsMapper::builder(Arc::clone(&store) as Arc<dyn SettingsStore>)
		.encrypter(Arc::new(ChaChaEncrypter::new([7; 32])))
		.build();

	mapper
		.save::<VaultSettings>(
			Scope::global(),
			bag(json!({ "api_token": "s3cr3t", "endpoint": "https://vault.example.com" })),
		)
		.await
		.expect("save should succeed");

	let raw_token = store
		.property_payload("vault", "api_token", Scope::global())
		.await
		.expect("read should succeed")
		.expect("token should be stored");
	assert!(is_encrypted_payload(&raw_token));
	assert_ne!(raw_token, json!("s3cr3t"));

	// Non-encrypted siblings stay in plaintext
	assert_eq!(
		store
			.property_payload("vault", "endpoint", Scope::global())
			.await
			.expect("read should succeed"),
		Some(json!("https://vault.example.com"))
	);

	let values = mapper.load::<VaultSettings>(Scope::global()).await.expect("load should succeed");
	assert_eq!(values.get("api_token"), Some(&json!("s3cr3t")));
}

#[tokio::test]
async fn test_encrypted_group_without_encrypter_fails() {
	let store = Arc::new(MemorySettingsStore::new());
	let mapper = SettingsMapper::builder(store).build();

	let err = mapper
		.save::<VaultSettings>(
			Scope::global(),
			bag(json!({ "api_token": "s3cr3t", "endpoint": "https://vault.example.com" })),
		)
		.await
		.expect_err("save should fail");

	assert!(matches!(err, Error::Crypto(_)));
}

#[tokio::test]
async fn test_casts_applied_on_save_and_load() {
	let store = Arc::new(MemorySettingsStore::new());
	let mapper = SettingsMapper::builder(Arc::clone(&store) as Arc<dyn SettingsStore>).build();

	mapper
		.save::<ReportSettings>(
			Scope::global(),
			bag(json!({
				"generated_at": "2024-05-01T10:00:00Z",
				"recipients": ["ops@example.com", "dev@example.com"],
			})),
		)
		.await
		.expect("save should succeed");

	// Storage holds the cast form: epoch seconds and a joined string
	assert_eq!(
		store
			.property_payload("reports", "generated_at", Scope::global())
			.await
			.expect("read should succeed"),
		Some(json!(1714557600))
	);
	assert_eq!(
		store
			.property_payload("reports", "recipients", Scope::global())
			.await
			.expect("read should succeed"),
		Some(json!("ops@example.com,dev@example.com"))
	);

	let values = mapper.load::<ReportSettings>(Scope::global()).await.expect("load should succeed");
	assert_eq!(values.get("generated_at"), Some(&json!("2024-05-01T10:00:00Z")));
	assert_eq!(values.get("recipients"), Some(&json!(["ops@example.com", "dev@example.com"])));
}

#[tokio::test]
async fn test_named_store_override() {
	let default_store = Arc::new(MemorySettingsStore::new());
	let billing_store = Arc::new(MemorySettingsStore::new());

	let mapper = SettingsMapper::builder(Arc::clone(&default_store) as Arc<dyn SettingsStore>)
		.store("billing", Arc::clone(&billing_store) as Arc<dyn SettingsStore>)
		.build();

	mapper
		.save::<BillingSettings>(Scope::global(), bag(json!({ "plan": "enterprise" })))
		.await
		.expect("save should succeed");

	assert_eq!(
		billing_store
			.property_payload("billing", "plan", Scope::global())
			.await
			.expect("read should succeed"),
		Some(json!("enterprise"))
	);
	assert!(
		default_store
			.properties_in_group("billing", Scope::global())
			.await
			.expect("read should succeed")
			.is_empty()
	);
}

#[tokio::test]
async fn test_config_cache_is_single_flight() {
	let store = Arc::new(MemorySettingsStore::new());
	let mapper = SettingsMapper::builder(store).build();

	assert!(!mapper.has("general"));
	let first = mapper.initialize::<GeneralSettings>().expect("initialize should succeed");
	assert!(mapper.has("general"));

	let second = mapper.initialize::<GeneralSettings>().expect("initialize should succeed");
	assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_fetch_properties_subset() {
	let store = Arc::new(MemorySettingsStore::new());
	seed_general(&store).await;

	let mapper = SettingsMapper::builder(store).build();
	let values = mapper
		.fetch_properties::<GeneralSettings>(Scope::global(), &["site_name"])
		.await
		.expect("fetch should succeed");

	assert_eq!(values.get("site_name"), Some(&json!("Acme")));
	assert_eq!(values.len(), 1);
}

// vim: ts=4
