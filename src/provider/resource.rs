//! Resource lifecycle: plan, apply, destroy and import of one record.

use super::state::ResourceState;
use crate::client::{CallContext, RecordClient};
use crate::errors::{ProviderError, Result};
use crate::reconcile::{self, Action};
use crate::record::SecretRecord;

/// What an apply would do, plus the remote record it was planned against.
#[derive(Debug, Clone)]
pub struct Plan {
    pub action: Action,
    pub remote: Option<SecretRecord>,
}

/// Fetch that treats `NotFound` as "no remote record".
fn fetch_optional<C>(client: &C, ctx: &CallContext, uid: &str) -> Result<Option<SecretRecord>>
where
    C: RecordClient + ?Sized,
{
    match client.fetch(ctx, uid) {
        Ok(record) => Ok(Some(record)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Compare a declared record with the vault and decide the action.
pub fn plan<C>(
    client: &C,
    ctx: &CallContext,
    declared: &SecretRecord,
    prior: Option<&ResourceState>,
) -> Result<Plan>
where
    C: RecordClient + ?Sized,
{
    reconcile::validate_declared(declared)?;

    if let Some(prior) = prior {
        if prior.record_type()? != declared.record_type() {
            return Err(ProviderError::validation(
                "type",
                format!(
                    "state has '{}' for {}; record type cannot change",
                    prior.record_type, prior.uid
                ),
            ));
        }
        if let Some(uid) = declared.uid.as_deref() {
            if uid != prior.uid {
                return Err(ProviderError::validation(
                    "uid",
                    format!("'{uid}' differs from '{}' in state; uid cannot change", prior.uid),
                ));
            }
        }
    }

    let prior_uid = prior.map(|p| p.uid.as_str());
    let remote = match prior_uid.or(declared.uid.as_deref()) {
        Some(uid) => fetch_optional(client, ctx, uid)?,
        None => None,
    };

    let action = reconcile::decide(declared, prior_uid, remote.as_ref())?;
    if matches!(action, Action::Create { .. }) && declared.folder_uid.is_none() {
        return Err(ProviderError::validation(
            "folder_uid",
            "is required to create a record",
        ));
    }

    tracing::info!(
        record_type = %declared.record_type(),
        uid = prior_uid.or(declared.uid.as_deref()).unwrap_or("<new>"),
        action = %action,
        "planned"
    );
    Ok(Plan { action, remote })
}

/// Carry out a plan, then confirm the result by fetching it back.
pub fn apply<C>(
    client: &C,
    ctx: &CallContext,
    declared: &SecretRecord,
    plan: &Plan,
) -> Result<ResourceState>
where
    C: RecordClient + ?Sized,
{
    let uid = match &plan.action {
        Action::NoOp | Action::Adopt => plan
            .remote
            .as_ref()
            .and_then(|r| r.uid.clone())
            .ok_or_else(|| ProviderError::validation("uid", "plan has no remote record"))?,
        Action::Create { .. } => {
            let folder_uid = declared.folder_uid.as_deref().ok_or_else(|| {
                ProviderError::validation("folder_uid", "is required to create a record")
            })?;
            let resolved = reconcile::resolve_passwords(declared, None)?;
            client.create(ctx, folder_uid, &resolved)?
        }
        Action::Update { changes } => {
            let remote = plan
                .remote
                .as_ref()
                .ok_or_else(|| ProviderError::validation("uid", "plan has no remote record"))?;
            let uid = remote
                .uid
                .clone()
                .ok_or_else(|| ProviderError::validation("uid", "remote record has no uid"))?;
            let mut resolved = reconcile::resolve_passwords(declared, Some(remote))?;
            resolved.uid = Some(uid.clone());
            if resolved.folder_uid.is_none() {
                resolved.folder_uid = remote.folder_uid.clone();
            }
            resolved.unbound = remote.unbound.clone();
            tracing::debug!(uid = %uid, changed = changes.len(), "applying update");
            client.update(ctx, &uid, &resolved)?;
            uid
        }
    };

    let confirmed = match client.fetch(ctx, &uid) {
        Ok(record) => record,
        Err(e) if e.is_not_found() => {
            return Err(ProviderError::UnexpectedResponse {
                operation: "apply",
                message: format!("record '{uid}' is not visible after apply"),
            })
        }
        Err(e) => return Err(e),
    };
    ResourceState::from_record(&confirmed)
}

/// Delete the record behind a state entry. A record already gone is `NotFound`.
pub fn destroy<C>(client: &C, ctx: &CallContext, uid: &str) -> Result<()>
where
    C: RecordClient + ?Sized,
{
    client.delete(ctx, uid)?;
    tracing::info!(uid, "destroyed");
    Ok(())
}

/// An adopted record and the state that now tracks it.
#[derive(Debug, Clone)]
pub struct Adopted {
    pub state: ResourceState,
    /// The record as fetched.
    pub record: SecretRecord,
}

/// Adopt an existing vault record into local state.
pub fn import<C>(client: &C, ctx: &CallContext, uid: &str) -> Result<Adopted>
where
    C: RecordClient + ?Sized,
{
    let record = client.fetch(ctx, uid)?;
    tracing::info!(uid, record_type = %record.record_type(), action = %Action::Adopt, "imported");
    Ok(Adopted {
        state: ResourceState::from_record(&record)?,
        record,
    })
}
