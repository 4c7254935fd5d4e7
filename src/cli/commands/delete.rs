//! `ksm delete`: delete a managed record and remove it from state.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{build_client, call_context, load_manifest, resolve_address, state_store, Cli};
use crate::errors::{ProviderError, Result};
use crate::provider;

/// Execute the `delete` command.
pub fn execute(cli: &Cli, name: &str, force: bool) -> Result<()> {
    let manifest = load_manifest(cli)?;
    let store = state_store(&manifest);
    let mut state = store.load()?;
    let address = resolve_address(&state, name)?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete record '{address}' from the vault?"))
            .default(false)
            .interact()
            .map_err(|e| ProviderError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let uid = state
        .resources
        .get(&address)
        .map(|s| s.uid.clone())
        .ok_or_else(|| ProviderError::CommandFailed(format!("'{address}' is not in state")))?;

    let client = build_client(cli, Some(&manifest))?;
    provider::destroy(&client, &call_context(Some(&manifest)), &uid)?;

    state.resources.remove(&address);
    store.save(&state)?;

    output::success(&format!("Deleted {address} ({uid})"));
    if manifest.resource(&address).is_some() {
        output::warning("The resource is still declared; the next apply will create it again.");
    }
    Ok(())
}
