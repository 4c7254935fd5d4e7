//! `ksm apply`: carry out the plan and record the results in state.

use dialoguer::Confirm;

use super::plan::{self, Planned};
use crate::cli::output;
use crate::cli::{build_client, call_context, load_manifest, state_store, Cli};
use crate::client::RecordClient;
use crate::config::Manifest;
use crate::errors::{ProviderError, Result};
use crate::provider::{self, StateStore};

/// Apply every planned change, saving state after each one.
///
/// Stops at the first failure; changes made before it stay recorded.
pub fn apply_all<C>(
    client: &C,
    manifest: &Manifest,
    store: &StateStore,
    planned: &[Planned],
) -> Result<usize>
where
    C: RecordClient + ?Sized,
{
    let mut state = store.load()?;
    let mut applied = 0;

    for entry in planned.iter().filter(|p| !p.is_noop()) {
        let ctx = call_context(Some(manifest));
        match entry {
            Planned::Resource {
                address,
                declared,
                plan,
                ..
            } => {
                let result = provider::apply(client, &ctx, declared, plan)?;
                output::success(&format!("{address}: {} ({})", plan.action, result.uid));
                state.resources.insert(address.clone(), result);
            }
            Planned::Orphan {
                address,
                state: entry_state,
            } => {
                match provider::destroy(client, &ctx, &entry_state.uid) {
                    Ok(()) => output::success(&format!("{address}: deleted")),
                    Err(e) if e.is_not_found() => {
                        output::warning(&format!("{address}: already gone from the vault"));
                    }
                    Err(e) => return Err(e),
                }
                state.resources.remove(address);
            }
        }
        store.save(&state)?;
        applied += 1;
    }

    Ok(applied)
}

/// Execute the `apply` command.
pub fn execute(cli: &Cli, yes: bool) -> Result<()> {
    let manifest = load_manifest(cli)?;
    let store = state_store(&manifest);
    let state = store.load()?;
    let client = build_client(cli, Some(&manifest))?;

    let planned = plan::compute(&client, &manifest, &state)?;
    let pending = planned.iter().filter(|p| !p.is_noop()).count();
    if pending == 0 {
        output::success("No changes. Records match the declarative file.");
        return Ok(());
    }

    let rows: Vec<_> = planned.iter().map(Planned::row).collect();
    output::print_plan_table(&rows);

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Apply {pending} change(s)?"))
            .default(false)
            .interact()
            .map_err(|e| ProviderError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let applied = apply_all(&client, &manifest, &store, &planned)?;
    output::success(&format!("Applied {applied} change(s)."));
    Ok(())
}
