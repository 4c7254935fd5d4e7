//! `ksm import`: adopt an existing vault record into local state.
//!
//! Prints the declarative block that reproduces the record, so pasting it
//! into the file gives an empty plan.

use crate::cli::output;
use crate::cli::{build_client, call_context, load_manifest, state_store, Cli};
use crate::errors::{ProviderError, Result};
use crate::provider;
use crate::reconcile;
use crate::record::{encode, AttrMap, AttrValue, RecordType, SecretRecord};

/// Render `[resource.<type>.<name>]` for an adopted record.
pub fn declaration(name: &str, record: &SecretRecord) -> Result<String> {
    let mut attrs = encode(&reconcile::adopt(record));
    // The type comes from the table name.
    attrs.remove("type");

    let mut by_name = AttrMap::new();
    by_name.insert(name.to_string(), AttrValue::Block(attrs));
    let mut by_type = AttrMap::new();
    by_type.insert(
        record.record_type().resource_name(),
        AttrValue::Block(by_name),
    );
    let mut root = AttrMap::new();
    root.insert("resource".into(), AttrValue::Block(by_type));

    toml::to_string(&root).map_err(|e| ProviderError::Serialization(format!("declaration: {e}")))
}

/// Execute the `import` command.
pub fn execute(cli: &Cli, name: &str, record_type: &str, uid: &str) -> Result<()> {
    let record_type = RecordType::lookup(record_type)?;
    let manifest = load_manifest(cli)?;
    let store = state_store(&manifest);
    let mut state = store.load()?;

    let address = format!("{}.{name}", record_type.resource_name());
    if state.resources.contains_key(&address) {
        return Err(ProviderError::CommandFailed(format!(
            "'{address}' is already managed; delete it from state first"
        )));
    }

    let client = build_client(cli, Some(&manifest))?;
    let ctx = call_context(Some(&manifest));
    let adopted = provider::import(&client, &ctx, uid)?;
    if adopted.record.record_type() != record_type {
        return Err(ProviderError::validation(
            "type",
            format!(
                "record {uid} is '{}', not '{record_type}'",
                adopted.record.record_type()
            ),
        ));
    }

    state.resources.insert(address.clone(), adopted.state);
    store.save(&state)?;

    output::success(&format!("Imported {uid} as {address}"));
    if manifest.resource(&address).is_none() {
        output::tip("Add this block to the declarative file:");
        println!("\n{}", declaration(name, &adopted.record)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Manifest;
    use crate::record::{Field, RecordFields};
    use std::path::Path;

    #[test]
    fn declaration_parses_back_into_the_same_record() {
        let mut record = SecretRecord::new(RecordType::Login, "web");
        record.uid = Some("uid-1".into());
        record.folder_uid = Some("folder-1".into());
        record.notes = "n".into();
        if let RecordFields::Login(f) = &mut record.fields {
            f.login = Field::new("admin".to_string()).labelled("User");
        }

        let toml = declaration("web", &record).unwrap();
        let manifest = Manifest::parse(Path::new("ksm.toml"), &toml).unwrap();
        let declared = &manifest.resource("secretsmanager_login.web").unwrap().record;
        assert_eq!(declared, &record);
    }
}
