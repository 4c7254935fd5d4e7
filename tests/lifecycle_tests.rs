//! End-to-end resource lifecycle against the in-memory vault.

mod common;

use common::{TestContext, FOLDER};
use ksm_records::cli::commands::apply::apply_all;
use ksm_records::cli::commands::import_cmd::declaration;
use ksm_records::cli::commands::plan::{compute, Planned};
use ksm_records::client::RecordClient;
use ksm_records::crypto::generator::satisfies;
use ksm_records::errors::ProviderError;
use ksm_records::provider::{self, DataSourceQuery};
use ksm_records::reconcile::{Action, CreateReason};
use ksm_records::record::wire::WireField;
use ksm_records::record::{Complexity, Field, RecordFields, RecordType, SecretRecord};
use std::sync::Arc;
use std::thread;

fn db_file(notes: &str) -> String {
    format!(
        r#"
[resource.secretsmanager_database_credentials.db]
folder_uid = "{FOLDER}"
title = "db"
notes = "{notes}"

[resource.secretsmanager_database_credentials.db.db_type]
label = "MyDB"
required = true
privacy_screen = true
value = "MySQL"

[resource.secretsmanager_database_credentials.db.password]
label = "MyDBPass"
enforce_generation = true
generate = "yes"
complexity = {{ length = 20, caps = 5, lowercase = 5, digits = 5, special = 5 }}

[resource.secretsmanager_database_credentials.db.host]
label = "MyDBHost"
value = {{ host_name = "127.0.0.1", port = "3306" }}
"#
    )
}

fn only_action(planned: &[Planned]) -> &Action {
    match planned {
        [Planned::Resource { plan, .. }] => &plan.action,
        other => panic!("expected one planned resource, got {other:?}"),
    }
}

#[test]
fn database_credentials_create_generates_a_conforming_password() {
    let t = TestContext::new();
    let manifest = t.manifest(&db_file("db"));
    let store = t.store(&manifest);

    let planned = compute(&t.vault, &manifest, &store.load().unwrap()).unwrap();
    assert_eq!(
        only_action(&planned),
        &Action::Create {
            reason: CreateReason::New
        }
    );
    assert_eq!(apply_all(&t.vault, &manifest, &store, &planned).unwrap(), 1);

    let state = store.load().unwrap();
    let entry = &state.resources["secretsmanager_database_credentials.db"];
    let record = t.vault.fetch(&t.ctx(), &entry.uid).unwrap();
    assert_eq!(record.record_type(), RecordType::DatabaseCredentials);
    assert_eq!(record.title, "db");
    assert_eq!(record.notes, "db");
    assert_eq!(record.folder_uid.as_deref(), Some(FOLDER));

    let RecordFields::DatabaseCredentials(f) = &record.fields else {
        panic!("wrong kind");
    };
    let password = f.password.value.as_deref().unwrap();
    let complexity = Complexity {
        length: 20,
        caps: 5,
        lowercase: 5,
        digits: 5,
        special: 5,
    };
    assert!(satisfies(password, &complexity), "{password}");
    assert_eq!(f.host.value.as_ref().unwrap().port, "3306");

    // Second plan sees nothing to do.
    let planned = compute(&t.vault, &manifest, &state).unwrap();
    assert!(only_action(&planned).is_noop());
}

#[test]
fn changing_notes_updates_only_notes() {
    let t = TestContext::new();
    let manifest = t.manifest(&db_file("A"));
    let store = t.store(&manifest);
    let planned = compute(&t.vault, &manifest, &store.load().unwrap()).unwrap();
    apply_all(&t.vault, &manifest, &store, &planned).unwrap();
    let uid = store.load().unwrap().resources["secretsmanager_database_credentials.db"]
        .uid
        .clone();
    let before = t.vault.fetch(&t.ctx(), &uid).unwrap();

    let manifest = t.manifest(&db_file("B"));
    let planned = compute(&t.vault, &manifest, &store.load().unwrap()).unwrap();
    assert_eq!(only_action(&planned).changed_paths(), ["notes"]);
    apply_all(&t.vault, &manifest, &store, &planned).unwrap();

    let after = t.vault.fetch(&t.ctx(), &uid).unwrap();
    assert_eq!(after.notes, "B");
    // The generated password is kept across the update.
    assert_eq!(after.fields, before.fields);
}

#[test]
fn record_deleted_outside_is_recreated_on_apply() {
    let t = TestContext::new();
    let manifest = t.manifest(&db_file("db"));
    let store = t.store(&manifest);
    let planned = compute(&t.vault, &manifest, &store.load().unwrap()).unwrap();
    apply_all(&t.vault, &manifest, &store, &planned).unwrap();
    let old_uid = store.load().unwrap().resources["secretsmanager_database_credentials.db"]
        .uid
        .clone();

    t.vault.delete(&t.ctx(), &old_uid).unwrap();
    let planned = compute(&t.vault, &manifest, &store.load().unwrap()).unwrap();
    assert_eq!(
        only_action(&planned),
        &Action::Create {
            reason: CreateReason::RemoteMissing
        }
    );

    apply_all(&t.vault, &manifest, &store, &planned).unwrap();
    let new_uid = &store.load().unwrap().resources["secretsmanager_database_credentials.db"].uid;
    assert_ne!(new_uid, &old_uid);
    assert!(t.vault.contains(new_uid));
}

#[test]
fn removed_declaration_deletes_the_record() {
    let t = TestContext::new();
    let manifest = t.manifest(&db_file("db"));
    let store = t.store(&manifest);
    let planned = compute(&t.vault, &manifest, &store.load().unwrap()).unwrap();
    apply_all(&t.vault, &manifest, &store, &planned).unwrap();
    assert_eq!(t.vault.len(), 1);

    let manifest = t.manifest("");
    let planned = compute(&t.vault, &manifest, &store.load().unwrap()).unwrap();
    assert!(matches!(planned.as_slice(), [Planned::Orphan { .. }]));
    apply_all(&t.vault, &manifest, &store, &planned).unwrap();

    assert!(t.vault.is_empty());
    assert!(store.load().unwrap().resources.is_empty());
}

#[test]
fn destroy_then_fetch_is_not_found() {
    let t = TestContext::new();
    let uid = t
        .vault
        .create(&t.ctx(), FOLDER, &SecretRecord::new(RecordType::Photo, "cat"))
        .unwrap();

    provider::destroy(&t.vault, &t.ctx(), &uid).unwrap();
    assert!(t.vault.fetch(&t.ctx(), &uid).unwrap_err().is_not_found());
    assert!(provider::destroy(&t.vault, &t.ctx(), &uid)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn imported_record_plans_no_changes() {
    let t = TestContext::new();
    let mut record = SecretRecord::new(RecordType::Login, "web");
    record.notes = "imported".into();
    if let RecordFields::Login(f) = &mut record.fields {
        f.login = Field::new("admin".to_string()).labelled("User");
        f.password.value = Some("hunter2".into());
        f.url = Field::new("https://example.com".to_string());
    }
    let uid = t.vault.create(&t.ctx(), FOLDER, &record).unwrap();

    let manifest = import_into(&t, "web", &uid);
    let store = t.store(&manifest);
    let planned = compute(&t.vault, &manifest, &store.load().unwrap()).unwrap();
    assert!(only_action(&planned).is_noop(), "{planned:?}");
}

#[test]
fn data_source_rejects_a_different_type() {
    let t = TestContext::new();
    let uid = t
        .vault
        .create(&t.ctx(), FOLDER, &SecretRecord::new(RecordType::Photo, "cat"))
        .unwrap();
    let query = DataSourceQuery::Uid { uid, title: None };

    let err =
        provider::read_data_source(&t.vault, &t.ctx(), RecordType::BankCard, &query).unwrap_err();
    assert!(
        matches!(err, ProviderError::Validation { ref field, .. } if field == "type"),
        "{err}"
    );
    assert!(provider::read_data_source(&t.vault, &t.ctx(), RecordType::Photo, &query).is_ok());
}

#[test]
fn unavailable_vault_fails_the_plan_with_a_retryable_error() {
    let t = TestContext::new();
    let manifest = t.manifest(&db_file("db"));
    let store = t.store(&manifest);
    let planned = compute(&t.vault, &manifest, &store.load().unwrap()).unwrap();
    apply_all(&t.vault, &manifest, &store, &planned).unwrap();

    t.vault.set_unavailable(true);
    let err = compute(&t.vault, &manifest, &store.load().unwrap()).unwrap_err();
    assert!(err.is_retryable(), "{err}");
}

/// Import `uid` the way `ksm import` does: state entry plus pasted declaration.
fn import_into(t: &TestContext, name: &str, uid: &str) -> ksm_records::config::Manifest {
    let adopted = provider::import(&t.vault, &t.ctx(), uid).unwrap();
    let manifest = t.manifest(&declaration(name, &adopted.record).unwrap());
    let store = t.store(&manifest);
    let mut state = store.load().unwrap();
    state
        .resources
        .insert(format!("secretsmanager_login.{name}"), adopted.state);
    store.save(&state).unwrap();
    manifest
}

#[test]
fn imported_enforced_password_without_complexity_is_left_alone() {
    let t = TestContext::new();
    let mut record = SecretRecord::new(RecordType::Login, "legacy");
    let pw = record.fields.password_mut().unwrap();
    pw.policy.enforce_generation = true;
    pw.value = Some("Existing-Password-1".into());
    let uid = t.vault.create(&t.ctx(), FOLDER, &record).unwrap();

    let manifest = import_into(&t, "legacy", &uid);
    let store = t.store(&manifest);
    let planned = compute(&t.vault, &manifest, &store.load().unwrap()).unwrap();
    assert!(only_action(&planned).is_noop(), "{planned:?}");

    apply_all(&t.vault, &manifest, &store, &planned).unwrap();
    let fetched = t.vault.fetch(&t.ctx(), &uid).unwrap();
    assert_eq!(
        fetched.fields.password().unwrap().value.as_deref(),
        Some("Existing-Password-1")
    );
}

#[test]
fn update_keeps_custom_and_unbound_vault_fields() {
    let t = TestContext::new();
    let mut record = SecretRecord::new(RecordType::Login, "web");
    record.unbound.fields.push(WireField {
        field_type: "oneTimeCode".into(),
        value: vec![serde_json::json!("otpauth://totp/web?secret=JBSWY3DPEHPK3PXP")],
        ..WireField::default()
    });
    record.unbound.custom.push(WireField {
        field_type: "text".into(),
        label: Some("Recovery".into()),
        value: vec![serde_json::json!("codes in the safe")],
        ..WireField::default()
    });
    let uid = t.vault.create(&t.ctx(), FOLDER, &record).unwrap();

    let mut manifest = import_into(&t, "web", &uid);
    manifest.resources[0].record.notes = "rotated".into();
    let store = t.store(&manifest);
    let planned = compute(&t.vault, &manifest, &store.load().unwrap()).unwrap();
    assert_eq!(only_action(&planned).changed_paths(), ["notes"]);
    apply_all(&t.vault, &manifest, &store, &planned).unwrap();

    let stored = t.vault.wire_record(&uid).unwrap();
    assert_eq!(stored.notes, "rotated");
    let types: Vec<_> = stored.fields.iter().map(|f| f.field_type.as_str()).collect();
    assert_eq!(types, ["login", "password", "url", "oneTimeCode"]);
    assert_eq!(stored.custom, record.unbound.custom);
}

#[test]
fn record_deleted_outside_keeps_its_declared_uid() {
    let t = TestContext::new();
    let uid = ksm_records::crypto::generate_uid();
    let file = format!(
        "[resource.secretsmanager_photo.cat]\nuid = \"{uid}\"\nfolder_uid = \"{FOLDER}\"\ntitle = \"cat\"\n"
    );
    let manifest = t.manifest(&file);
    let store = t.store(&manifest);
    let planned = compute(&t.vault, &manifest, &store.load().unwrap()).unwrap();
    assert_eq!(
        only_action(&planned),
        &Action::Create {
            reason: CreateReason::New
        }
    );
    apply_all(&t.vault, &manifest, &store, &planned).unwrap();
    assert!(t.vault.contains(&uid));

    t.vault.delete(&t.ctx(), &uid).unwrap();
    let planned = compute(&t.vault, &manifest, &store.load().unwrap()).unwrap();
    assert_eq!(
        only_action(&planned),
        &Action::Create {
            reason: CreateReason::RemoteMissing
        }
    );
    apply_all(&t.vault, &manifest, &store, &planned).unwrap();

    assert!(t.vault.contains(&uid));
    assert_eq!(store.load().unwrap().resources["secretsmanager_photo.cat"].uid, uid);
}

#[test]
fn vault_is_shared_safely_across_threads() {
    let vault = Arc::new(ksm_records::client::MemoryVault::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let vault = Arc::clone(&vault);
            thread::spawn(move || {
                let ctx = ksm_records::client::CallContext::new();
                let mut uids = Vec::new();
                for j in 0..10 {
                    let title = format!("t{i}-{j}");
                    let uid = vault
                        .create(&ctx, FOLDER, &SecretRecord::new(RecordType::Photo, &title))
                        .unwrap();
                    assert_eq!(vault.fetch(&ctx, &uid).unwrap().title, title);
                    uids.push(uid);
                }
                uids
            })
        })
        .collect();

    let mut all: Vec<String> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    assert_eq!(vault.len(), 80);
    all.sort();
    all.dedup();
    assert_eq!(all.len(), 80);
}
