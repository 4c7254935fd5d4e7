//! Reconciler: decide what an apply must do for one declared record.
//!
//! The comparison works on the encoded attribute form, leaf by leaf, so a
//! change to `host.value.port` is reported as exactly that path. Values
//! never appear in the result; only paths do.

use std::collections::BTreeSet;
use std::fmt;

use crate::crypto::generator;
use crate::errors::{ProviderError, Result};
use crate::record::attrs::flatten;
use crate::record::{encode, Complexity, PasswordField, SecretRecord};

/// Why a record must be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateReason {
    /// Never created (no prior state).
    New,
    /// Local state knows the record but the vault no longer has it.
    RemoteMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
}

/// One differing attribute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub path: String,
    pub kind: ChangeKind,
}

/// The reconciler's decision for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create { reason: CreateReason },
    Update { changes: Vec<FieldChange> },
    NoOp,
    /// Local state built purely from a remote fetch (import).
    Adopt,
}

impl Action {
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }

    /// Paths flagged by an `Update`; empty for every other action.
    pub fn changed_paths(&self) -> Vec<&str> {
        match self {
            Self::Update { changes } => changes.iter().map(|c| c.path.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Added => "+",
            Self::Removed => "-",
            Self::Changed => "~",
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create {
                reason: CreateReason::New,
            } => f.write_str("create"),
            Self::Create {
                reason: CreateReason::RemoteMissing,
            } => f.write_str("create (deleted outside of ksm)"),
            Self::Update { changes } => write!(f, "update ({} changed)", changes.len()),
            Self::NoOp => f.write_str("no changes"),
            Self::Adopt => f.write_str("import"),
        }
    }
}

/// Attribute paths that never take part in the comparison.
const IGNORED: &[&str] = &["uid", "type", "password.generate"];
const PASSWORD_VALUE: &str = "password.value";

/// Check declared constraints that can only fail at plan time.
pub fn validate_declared(declared: &SecretRecord) -> Result<()> {
    if let Some(pw) = declared.fields.password() {
        if pw.policy.wants_generation() || pw.policy.complexity.is_some() {
            generator::validate(&pw.policy.effective_complexity())?;
        }
    }
    Ok(())
}

/// Structural diff of a declared record against the remote one.
pub fn diff(declared: &SecretRecord, remote: &SecretRecord) -> Result<Vec<FieldChange>> {
    if declared.record_type() != remote.record_type() {
        return Err(ProviderError::validation(
            "type",
            format!(
                "record {} is '{}' in the vault; type cannot change from '{}'",
                remote.display_uid(),
                remote.record_type(),
                declared.record_type()
            ),
        ));
    }

    let wanted = flatten(&encode(declared));
    let actual = flatten(&encode(remote));

    let mut skip: BTreeSet<&str> = IGNORED.iter().copied().collect();
    if declared.folder_uid.is_none() {
        skip.insert("folder_uid");
    }
    let force_password = password_violates_policy(declared, remote);
    if !wanted.contains_key(PASSWORD_VALUE) {
        skip.insert(PASSWORD_VALUE);
    }

    let paths: BTreeSet<&String> = wanted.keys().chain(actual.keys()).collect();
    let mut changes: Vec<FieldChange> = paths
        .into_iter()
        .filter(|path| !skip.contains(path.as_str()))
        .filter_map(|path| {
            let kind = match (wanted.get(path), actual.get(path)) {
                (Some(w), Some(a)) if w == a => return None,
                (Some(_), Some(_)) => ChangeKind::Changed,
                (Some(_), None) => ChangeKind::Added,
                (None, Some(_)) => ChangeKind::Removed,
                (None, None) => return None,
            };
            Some(FieldChange {
                path: path.clone(),
                kind,
            })
        })
        .collect();

    if force_password && !changes.iter().any(|c| c.path == PASSWORD_VALUE) {
        changes.push(FieldChange {
            path: PASSWORD_VALUE.to_string(),
            kind: ChangeKind::Changed,
        });
    }
    Ok(changes)
}

/// Complexity an existing enforced value is held to: the declared one, else
/// the one stored with the remote field. `None` means no check applies.
fn enforced_complexity(declared: &PasswordField, remote: Option<&PasswordField>) -> Option<Complexity> {
    declared
        .policy
        .complexity
        .or_else(|| remote.and_then(|r| r.policy.complexity))
}

/// An enforced password whose remote value is missing or misses the complexity.
fn password_violates_policy(declared: &SecretRecord, remote: &SecretRecord) -> bool {
    let Some(pw) = declared.fields.password() else {
        return false;
    };
    if !pw.policy.enforce_generation {
        return false;
    }
    let remote_pw = remote.fields.password();
    match remote_pw.and_then(|r| r.value.as_deref()) {
        Some(value) => enforced_complexity(pw, remote_pw)
            .is_some_and(|complexity| !generator::satisfies(value, &complexity)),
        None => true,
    }
}

/// Decide the action from the declared record, the prior state's UID and
/// the freshly fetched remote record (`None` when the vault has none).
pub fn decide(
    declared: &SecretRecord,
    prior_uid: Option<&str>,
    remote: Option<&SecretRecord>,
) -> Result<Action> {
    match remote {
        Some(remote) => {
            let changes = diff(declared, remote)?;
            Ok(if changes.is_empty() {
                Action::NoOp
            } else {
                Action::Update { changes }
            })
        }
        None if prior_uid.is_some() => Ok(Action::Create {
            reason: CreateReason::RemoteMissing,
        }),
        None => Ok(Action::Create {
            reason: CreateReason::New,
        }),
    }
}

/// Declared-equivalent record for an existing remote one (import).
///
/// An enforced password cannot be declared with a value, so that value is
/// dropped; everything else is kept as fetched.
pub fn adopt(remote: &SecretRecord) -> SecretRecord {
    let mut adopted = remote.clone();
    if let Some(pw) = adopted.fields.password_mut() {
        if pw.policy.enforce_generation {
            pw.value = None;
        }
    }
    adopted
}

/// Fill in the password value to send to the vault.
///
/// Order: the declared literal; else the remote value unless enforcement
/// rejects it; else a fresh value when generation is requested; else empty.
pub fn resolve_passwords(declared: &SecretRecord, remote: Option<&SecretRecord>) -> Result<SecretRecord> {
    let mut resolved = declared.clone();
    let remote_pw = remote.and_then(|r| r.fields.password());

    if let Some(pw) = resolved.fields.password_mut() {
        if pw.value.is_none() {
            let required = enforced_complexity(pw, remote_pw);
            let keep_remote = remote_pw.and_then(|r| r.value.clone()).filter(|v| {
                !pw.policy.enforce_generation
                    || required.map_or(true, |c| generator::satisfies(v, &c))
            });
            pw.value = match keep_remote {
                Some(v) => Some(v),
                None if pw.policy.wants_generation() => {
                    tracing::debug!(uid = declared.display_uid(), "generating password");
                    let complexity = required.unwrap_or_else(|| pw.policy.effective_complexity());
                    let generated = generator::generate_password(&complexity)?;
                    Some(generated.as_str().to_owned())
                }
                None => None,
            };
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Field, GenerationPolicy, Host, RecordFields, RecordType};

    fn server(notes: &str) -> SecretRecord {
        let mut r = SecretRecord::new(RecordType::ServerCredentials, "srv");
        r.notes = notes.into();
        r.folder_uid = Some("folder".into());
        if let RecordFields::ServerCredentials(f) = &mut r.fields {
            f.host = Field::new(Host {
                host_name: "10.0.0.1".into(),
                port: "22".into(),
            });
            f.login = Field::new("root".to_string());
        }
        r
    }

    fn with_remote_identity(mut r: SecretRecord) -> SecretRecord {
        r.uid = Some("uid-1".into());
        r
    }

    fn enforced(complexity: Complexity) -> GenerationPolicy {
        GenerationPolicy {
            enforce_generation: true,
            generate: true,
            complexity: Some(complexity),
        }
    }

    #[test]
    fn identical_records_are_noop() {
        let action = decide(&server("a"), Some("uid-1"), Some(&with_remote_identity(server("a"))));
        assert_eq!(action.unwrap(), Action::NoOp);
    }

    #[test]
    fn notes_change_flags_only_notes() {
        let action = decide(&server("B"), Some("uid-1"), Some(&with_remote_identity(server("A"))))
            .unwrap();
        assert_eq!(action.changed_paths(), ["notes"]);
    }

    #[test]
    fn nested_sub_field_is_reported_by_path() {
        let mut declared = server("a");
        if let RecordFields::ServerCredentials(f) = &mut declared.fields {
            f.host.value.as_mut().unwrap().port = "2222".into();
        }
        let changes = diff(&declared, &server("a")).unwrap();
        assert_eq!(
            changes,
            [FieldChange {
                path: "host.value.port".into(),
                kind: ChangeKind::Changed
            }]
        );
    }

    #[test]
    fn missing_remote_depends_on_prior_state() {
        assert_eq!(
            decide(&server("a"), None, None).unwrap(),
            Action::Create {
                reason: CreateReason::New
            }
        );
        assert_eq!(
            decide(&server("a"), Some("uid-1"), None).unwrap(),
            Action::Create {
                reason: CreateReason::RemoteMissing
            }
        );
    }

    #[test]
    fn type_change_is_rejected() {
        let other = SecretRecord::new(RecordType::Login, "srv");
        let err = diff(&server("a"), &other).unwrap_err();
        assert!(matches!(err, ProviderError::Validation { ref field, .. } if field == "type"));
    }

    #[test]
    fn generated_password_is_not_a_difference() {
        let mut declared = server("a");
        declared.fields.password_mut().unwrap().policy = GenerationPolicy {
            generate: true,
            ..GenerationPolicy::default()
        };
        let mut remote = server("a");
        remote.fields.password_mut().unwrap().value = Some("whatever-was-generated".into());
        assert!(diff(&declared, &remote).unwrap().is_empty());
    }

    #[test]
    fn enforced_password_violating_complexity_is_a_difference() {
        let c = Complexity {
            length: 8,
            digits: 2,
            ..Complexity::default()
        };
        let mut declared = server("a");
        declared.fields.password_mut().unwrap().policy = enforced(c);

        let mut remote = declared.clone();
        remote.fields.password_mut().unwrap().value = Some("abcdefgh".into());
        assert_eq!(diff(&declared, &remote).unwrap()[0].path, "password.value");

        remote.fields.password_mut().unwrap().value = Some("abcdef12".into());
        assert!(diff(&declared, &remote).unwrap().is_empty());
    }

    #[test]
    fn absent_declared_folder_is_not_compared() {
        let mut declared = server("a");
        declared.folder_uid = None;
        assert!(diff(&declared, &server("a")).unwrap().is_empty());
    }

    #[test]
    fn resolve_keeps_literal_then_remote_then_generates() {
        let mut declared = server("a");
        declared.fields.password_mut().unwrap().value = Some("literal".into());
        let resolved = resolve_passwords(&declared, None).unwrap();
        assert_eq!(resolved.fields.password().unwrap().value.as_deref(), Some("literal"));

        let mut declared = server("a");
        declared.fields.password_mut().unwrap().policy.generate = true;
        let mut remote = server("a");
        remote.fields.password_mut().unwrap().value = Some("kept".into());
        let resolved = resolve_passwords(&declared, Some(&remote)).unwrap();
        assert_eq!(resolved.fields.password().unwrap().value.as_deref(), Some("kept"));

        let resolved = resolve_passwords(&declared, None).unwrap();
        assert_eq!(resolved.fields.password().unwrap().value.as_ref().unwrap().len(), 32);
    }

    #[test]
    fn resolve_regenerates_when_enforced_value_is_weak() {
        let c = Complexity {
            length: 20,
            caps: 5,
            lowercase: 5,
            digits: 5,
            special: 5,
        };
        let mut declared = server("a");
        declared.fields.password_mut().unwrap().policy = enforced(c);
        let mut remote = server("a");
        remote.fields.password_mut().unwrap().value = Some("weak".into());

        let resolved = resolve_passwords(&declared, Some(&remote)).unwrap();
        let value = resolved.fields.password().unwrap().value.clone().unwrap();
        assert!(generator::satisfies(&value, &c));
    }

    #[test]
    fn adopted_record_round_trips_without_diff() {
        let mut remote = with_remote_identity(server("a"));
        let pw = remote.fields.password_mut().unwrap();
        pw.policy = enforced(Complexity::default());
        pw.policy.generate = false;
        pw.value = Some("x".repeat(32));

        let attrs = encode(&adopt(&remote));
        let declared = crate::record::decode(RecordType::ServerCredentials, &attrs).unwrap();
        assert_eq!(decide(&declared, Some("uid-1"), Some(&remote)).unwrap(), Action::NoOp);
    }

    #[test]
    fn enforced_value_without_any_complexity_is_kept() {
        let mut remote = with_remote_identity(server("a"));
        let pw = remote.fields.password_mut().unwrap();
        pw.policy.enforce_generation = true;
        pw.value = Some("Existing-Password-1".into());

        let declared = adopt(&remote);
        assert_eq!(decide(&declared, Some("uid-1"), Some(&remote)).unwrap(), Action::NoOp);
        let resolved = resolve_passwords(&declared, Some(&remote)).unwrap();
        assert_eq!(
            resolved.fields.password().unwrap().value.as_deref(),
            Some("Existing-Password-1")
        );
    }

    #[test]
    fn remote_complexity_applies_when_none_is_declared() {
        let mut remote = with_remote_identity(server("a"));
        let pw = remote.fields.password_mut().unwrap();
        pw.policy = enforced(Complexity {
            length: 12,
            digits: 2,
            ..Complexity::default()
        });
        pw.policy.generate = false;
        pw.value = Some("no-digits-here".into());

        let mut declared = adopt(&remote);
        declared.fields.password_mut().unwrap().policy.complexity = None;
        let action = decide(&declared, Some("uid-1"), Some(&remote)).unwrap();
        assert!(action.changed_paths().contains(&PASSWORD_VALUE), "{action:?}");

        let resolved = resolve_passwords(&declared, Some(&remote)).unwrap();
        let value = resolved.fields.password().unwrap().value.clone().unwrap();
        assert_eq!(value.len(), 12);
        assert!(value.chars().filter(char::is_ascii_digit).count() >= 2);
    }

    #[test]
    fn no_generation_leaves_password_empty() {
        let resolved = resolve_passwords(&server("a"), None).unwrap();
        assert!(resolved.fields.password().unwrap().value.is_none());
    }

    #[test]
    fn impossible_complexity_fails_validation() {
        let mut declared = server("a");
        declared.fields.password_mut().unwrap().policy = enforced(Complexity {
            length: 3,
            caps: 2,
            digits: 2,
            ..Complexity::default()
        });
        assert!(matches!(
            validate_declared(&declared),
            Err(ProviderError::Constraint(_))
        ));
    }
}
