//! In-memory vault backend.
//!
//! Stores each record's wire JSON keyed by UID behind a mutex, so it
//! behaves like the remote vault (UIDs, folders, serialization) without
//! a network. Used by the test fixture context and the tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{select_by_title, CallContext, RecordClient};
use crate::crypto::generate_uid;
use crate::errors::{ProviderError, Result};
use crate::record::wire::{self, WireRecord};
use crate::record::SecretRecord;

struct StoredRecord {
    folder_uid: String,
    data: Vec<u8>,
}

/// Thread-safe in-memory `RecordClient`.
#[derive(Default)]
pub struct MemoryVault {
    records: Mutex<HashMap<String, StoredRecord>>,
    unavailable: AtomicBool,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails with `Transient` as if the vault were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.lock().contains_key(uid)
    }

    /// Stored wire form of a record, as the vault would return it.
    pub fn wire_record(&self, uid: &str) -> Option<WireRecord> {
        self.lock()
            .get(uid)
            .and_then(|stored| wire::parse(&stored.data).ok())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredRecord>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self, ctx: &CallContext, operation: &'static str) -> Result<()> {
        ctx.check(operation)?;
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProviderError::Transient {
                operation,
                message: "vault unavailable".into(),
            });
        }
        Ok(())
    }

    fn decode(uid: &str, stored: &StoredRecord) -> Result<SecretRecord> {
        wire::from_wire(uid, Some(&stored.folder_uid), &wire::parse(&stored.data)?)
    }
}

impl RecordClient for MemoryVault {
    fn fetch(&self, ctx: &CallContext, uid: &str) -> Result<SecretRecord> {
        self.begin(ctx, "fetch")?;
        let records = self.lock();
        let stored = records.get(uid).ok_or_else(|| ProviderError::NotFound {
            uid: uid.to_string(),
            operation: "fetch",
        })?;
        Self::decode(uid, stored)
    }

    fn fetch_by_title(
        &self,
        ctx: &CallContext,
        folder_uid: &str,
        title: &str,
    ) -> Result<SecretRecord> {
        self.begin(ctx, "fetch_by_title")?;
        let records = self.lock();
        let in_folder = records
            .iter()
            .filter(|(_, stored)| stored.folder_uid == folder_uid)
            .map(|(uid, stored)| Self::decode(uid, stored))
            .collect::<Result<Vec<_>>>()?;
        select_by_title(in_folder, folder_uid, title)
    }

    fn create(&self, ctx: &CallContext, folder_uid: &str, record: &SecretRecord) -> Result<String> {
        self.begin(ctx, "create")?;
        let uid = record.uid.clone().unwrap_or_else(generate_uid);
        let data = wire::serialize(&wire::to_wire(record))?;

        let mut records = self.lock();
        if records.contains_key(&uid) {
            return Err(ProviderError::UnexpectedResponse {
                operation: "create",
                message: format!("record '{uid}' already exists"),
            });
        }
        records.insert(
            uid.clone(),
            StoredRecord {
                folder_uid: folder_uid.to_string(),
                data,
            },
        );
        tracing::debug!(uid = %uid, folder_uid, "memory vault: created");
        Ok(uid)
    }

    fn update(&self, ctx: &CallContext, uid: &str, record: &SecretRecord) -> Result<()> {
        self.begin(ctx, "update")?;
        let data = wire::serialize(&wire::to_wire(record))?;

        let mut records = self.lock();
        let stored = records.get_mut(uid).ok_or_else(|| ProviderError::NotFound {
            uid: uid.to_string(),
            operation: "update",
        })?;
        if let Some(folder) = &record.folder_uid {
            stored.folder_uid = folder.clone();
        }
        stored.data = data;
        Ok(())
    }

    fn delete(&self, ctx: &CallContext, uid: &str) -> Result<()> {
        self.begin(ctx, "delete")?;
        self.lock()
            .remove(uid)
            .map(|_| ())
            .ok_or_else(|| ProviderError::NotFound {
                uid: uid.to_string(),
                operation: "delete",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordType;

    #[test]
    fn create_assigns_uid_and_fetch_returns_record() {
        let vault = MemoryVault::new();
        let ctx = CallContext::new();
        let record = SecretRecord::new(RecordType::Photo, "cat");

        let uid = vault.create(&ctx, "folder", &record).unwrap();
        let fetched = vault.fetch(&ctx, &uid).unwrap();
        assert_eq!(fetched.title, "cat");
        assert_eq!(fetched.uid.as_deref(), Some(uid.as_str()));
        assert_eq!(fetched.folder_uid.as_deref(), Some("folder"));
    }

    #[test]
    fn create_honours_chosen_uid_once() {
        let vault = MemoryVault::new();
        let ctx = CallContext::new();
        let mut record = SecretRecord::new(RecordType::Login, "l");
        record.uid = Some("chosen-uid".into());

        assert_eq!(vault.create(&ctx, "f", &record).unwrap(), "chosen-uid");
        assert!(vault.create(&ctx, "f", &record).is_err());
    }

    #[test]
    fn missing_records_are_not_found() {
        let vault = MemoryVault::new();
        let ctx = CallContext::new();
        let record = SecretRecord::new(RecordType::Login, "l");
        assert!(vault.fetch(&ctx, "nope").unwrap_err().is_not_found());
        assert!(vault.update(&ctx, "nope", &record).unwrap_err().is_not_found());
        assert!(vault.delete(&ctx, "nope").unwrap_err().is_not_found());
    }

    #[test]
    fn unavailable_vault_is_transient() {
        let vault = MemoryVault::new();
        vault.set_unavailable(true);
        let err = vault.fetch(&CallContext::new(), "x").unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn fetch_by_title_is_scoped_to_folder() {
        let vault = MemoryVault::new();
        let ctx = CallContext::new();
        let record = SecretRecord::new(RecordType::BankCard, "visa");
        vault.create(&ctx, "a", &record).unwrap();
        vault.create(&ctx, "b", &record).unwrap();

        assert_eq!(vault.fetch_by_title(&ctx, "a", "visa").unwrap().title, "visa");
        assert!(vault.fetch_by_title(&ctx, "c", "visa").unwrap_err().is_not_found());
    }
}
