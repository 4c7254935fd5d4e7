//! `ksm plan`: compare the declarative file with the vault.

use crate::cli::output::{self, PlanRow};
use crate::cli::{build_client, call_context, load_manifest, state_store, Cli};
use crate::client::RecordClient;
use crate::config::Manifest;
use crate::errors::Result;
use crate::provider::{self, Plan, ResourceState, StateFile};
use crate::record::SecretRecord;

/// One entry of a full plan.
#[derive(Debug)]
pub enum Planned {
    /// A declared resource and what apply would do with it.
    Resource {
        address: String,
        declared: SecretRecord,
        prior: Option<ResourceState>,
        plan: Plan,
    },
    /// In state but no longer declared: apply deletes it.
    Orphan {
        address: String,
        state: ResourceState,
    },
}

impl Planned {
    pub fn address(&self) -> &str {
        match self {
            Self::Resource { address, .. } | Self::Orphan { address, .. } => address,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Self::Resource { plan, .. } if plan.action.is_noop())
    }

    pub fn row(&self) -> PlanRow<'_> {
        match self {
            Self::Resource { address, plan, .. } => PlanRow {
                address,
                action: Some(&plan.action),
            },
            Self::Orphan { address, .. } => PlanRow {
                address,
                action: None,
            },
        }
    }
}

/// Plan every declared resource and every orphaned state entry.
pub fn compute<C>(client: &C, manifest: &Manifest, state: &StateFile) -> Result<Vec<Planned>>
where
    C: RecordClient + ?Sized,
{
    let mut planned = Vec::with_capacity(manifest.resources.len());

    for resource in &manifest.resources {
        let prior = state.resources.get(&resource.address).cloned();
        let ctx = call_context(Some(manifest));
        let plan = provider::plan(client, &ctx, &resource.record, prior.as_ref())?;
        planned.push(Planned::Resource {
            address: resource.address.clone(),
            declared: resource.record.clone(),
            prior,
            plan,
        });
    }

    for (address, entry) in &state.resources {
        if manifest.resource(address).is_none() {
            planned.push(Planned::Orphan {
                address: address.clone(),
                state: entry.clone(),
            });
        }
    }

    Ok(planned)
}

/// Execute the `plan` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let manifest = load_manifest(cli)?;
    let state = state_store(&manifest).load()?;
    let client = build_client(cli, Some(&manifest))?;

    let planned = compute(&client, &manifest, &state)?;
    let rows: Vec<_> = planned.iter().map(Planned::row).collect();
    output::print_plan_table(&rows);

    let pending = planned.iter().filter(|p| !p.is_noop()).count();
    if pending == 0 {
        output::success("No changes. Records match the declarative file.");
    } else {
        output::tip(&format!("{pending} change(s). Run `ksm apply` to carry them out."));
    }
    Ok(())
}
