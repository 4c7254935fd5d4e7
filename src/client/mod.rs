//! Remote record client.
//!
//! `RecordClient` is the capability set the provider needs from a vault:
//! fetch by UID or by folder + title, create, update and delete. Every call
//! takes a `CallContext` so the orchestrating layer can bound it with a
//! deadline or cancel it from another thread.

pub mod credential;
pub mod http;
pub mod memory;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use credential::Credential;
pub use http::HttpRecordClient;
pub use memory::MemoryVault;

use crate::errors::{ProviderError, Result};
use crate::record::SecretRecord;

/// Deadline and cancellation signal for one remote operation.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl CallContext {
    /// A context with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now; unbounded if that overflows.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            ..Self::default()
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Fail with `Cancelled` if the context is cancelled or past its deadline.
    pub fn check(&self, operation: &'static str) -> Result<()> {
        self.remaining(operation).map(|_| ())
    }

    /// Time left before the deadline (`None` when unbounded).
    pub fn remaining(&self, operation: &'static str) -> Result<Option<Duration>> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(ProviderError::Cancelled(operation));
        }
        match self.deadline {
            None => Ok(None),
            Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                Some(left) if !left.is_zero() => Ok(Some(left)),
                _ => Err(ProviderError::Cancelled(operation)),
            },
        }
    }
}

/// Authenticated CRUD access to vault records.
///
/// Implementations hold no mutable state beyond their credential and
/// connection pool, so one client can serve concurrent operations on
/// different UIDs.
pub trait RecordClient: Send + Sync {
    /// Fetch a record by UID. Missing records fail with `NotFound`.
    fn fetch(&self, ctx: &CallContext, uid: &str) -> Result<SecretRecord>;

    /// Fetch the single record titled `title` in `folder_uid`.
    ///
    /// No match fails with `NotFound`; several matches with `Validation`.
    fn fetch_by_title(&self, ctx: &CallContext, folder_uid: &str, title: &str)
        -> Result<SecretRecord>;

    /// Create a record in `folder_uid` and return its confirmed UID.
    ///
    /// A UID already set on `record` is used as the new record's UID.
    /// Never retried: a failed create may have reached the vault.
    fn create(&self, ctx: &CallContext, folder_uid: &str, record: &SecretRecord) -> Result<String>;

    /// Replace title, notes and fields of an existing record.
    fn update(&self, ctx: &CallContext, uid: &str, record: &SecretRecord) -> Result<()>;

    fn delete(&self, ctx: &CallContext, uid: &str) -> Result<()>;
}

impl<T> RecordClient for Box<T>
where
    T: RecordClient + ?Sized,
{
    fn fetch(&self, ctx: &CallContext, uid: &str) -> Result<SecretRecord> {
        (**self).fetch(ctx, uid)
    }

    fn fetch_by_title(
        &self,
        ctx: &CallContext,
        folder_uid: &str,
        title: &str,
    ) -> Result<SecretRecord> {
        (**self).fetch_by_title(ctx, folder_uid, title)
    }

    fn create(&self, ctx: &CallContext, folder_uid: &str, record: &SecretRecord) -> Result<String> {
        (**self).create(ctx, folder_uid, record)
    }

    fn update(&self, ctx: &CallContext, uid: &str, record: &SecretRecord) -> Result<()> {
        (**self).update(ctx, uid, record)
    }

    fn delete(&self, ctx: &CallContext, uid: &str) -> Result<()> {
        (**self).delete(ctx, uid)
    }
}

impl<T> RecordClient for Arc<T>
where
    T: RecordClient + ?Sized,
{
    fn fetch(&self, ctx: &CallContext, uid: &str) -> Result<SecretRecord> {
        (**self).fetch(ctx, uid)
    }

    fn fetch_by_title(
        &self,
        ctx: &CallContext,
        folder_uid: &str,
        title: &str,
    ) -> Result<SecretRecord> {
        (**self).fetch_by_title(ctx, folder_uid, title)
    }

    fn create(&self, ctx: &CallContext, folder_uid: &str, record: &SecretRecord) -> Result<String> {
        (**self).create(ctx, folder_uid, record)
    }

    fn update(&self, ctx: &CallContext, uid: &str, record: &SecretRecord) -> Result<()> {
        (**self).update(ctx, uid, record)
    }

    fn delete(&self, ctx: &CallContext, uid: &str) -> Result<()> {
        (**self).delete(ctx, uid)
    }
}

/// Pick the one record titled `title` out of a folder listing.
pub(crate) fn select_by_title(
    records: Vec<SecretRecord>,
    folder_uid: &str,
    title: &str,
) -> Result<SecretRecord> {
    let mut matches = records.into_iter().filter(|r| r.title == title);
    match (matches.next(), matches.next()) {
        (Some(record), None) => Ok(record),
        (None, _) => Err(ProviderError::NotFound {
            uid: format!("{folder_uid}/{title}"),
            operation: "fetch_by_title",
        }),
        (Some(_), Some(_)) => Err(ProviderError::validation(
            "title",
            format!("'{title}' matches more than one record in folder '{folder_uid}'"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordType;

    #[test]
    fn cancelled_context_fails_every_check() {
        let ctx = CallContext::new();
        assert!(ctx.check("fetch").is_ok());
        let clone = ctx.clone();
        ctx.cancel();
        assert!(matches!(clone.check("fetch"), Err(ProviderError::Cancelled("fetch"))));
    }

    #[test]
    fn expired_deadline_is_cancelled() {
        let ctx = CallContext::new().with_deadline(Instant::now());
        assert!(matches!(ctx.remaining("create"), Err(ProviderError::Cancelled(_))));
    }

    #[test]
    fn remaining_time_is_bounded_by_deadline() {
        let ctx = CallContext::with_timeout(Duration::from_secs(60));
        let left = ctx.remaining("fetch").unwrap().unwrap();
        assert!(left <= Duration::from_secs(60));
        assert_eq!(CallContext::new().remaining("fetch").unwrap(), None);
    }

    #[test]
    fn huge_timeout_does_not_overflow() {
        let ctx = CallContext::with_timeout(Duration::MAX);
        assert!(ctx.check("fetch").is_ok());
    }

    #[test]
    fn select_by_title_distinguishes_missing_and_ambiguous() {
        let a = SecretRecord::new(RecordType::Login, "a");
        let b = SecretRecord::new(RecordType::Login, "b");
        let found = select_by_title(vec![a.clone(), b.clone()], "f", "b").unwrap();
        assert_eq!(found.title, "b");

        let err = select_by_title(vec![a.clone()], "f", "zzz").unwrap_err();
        assert!(err.is_not_found());

        let err = select_by_title(vec![a.clone(), a], "f", "a").unwrap_err();
        assert!(matches!(err, ProviderError::Validation { .. }));
    }
}
