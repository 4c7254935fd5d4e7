//! OS keyring integration for credential caching.
//!
//! Stores and retrieves the vault credential blob from the operating
//! system's secure credential store:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring / KDE Wallet)
//!
//! All operations fail gracefully. If the keyring is unavailable the
//! error is returned and the caller reports that no credential was found.

use crate::errors::{ProviderError, Result};

/// Service name used in the OS keyring.
const SERVICE_NAME: &str = "ksm-records";

/// Build a keyring entry key from a project directory.
///
/// Callers pass the canonical path so that different relative paths to
/// the same project resolve to the same entry.
fn entry_key(project: &str) -> String {
    format!("credential:{project}")
}

fn entry(project: &str) -> Result<keyring::Entry> {
    keyring::Entry::new(SERVICE_NAME, &entry_key(project))
        .map_err(|e| ProviderError::KeyringError(format!("failed to create keyring entry: {e}")))
}

/// Store a credential in the OS keyring for a project.
pub fn store_credential(project: &str, credential: &str) -> Result<()> {
    entry(project)?.set_password(credential).map_err(|e| {
        ProviderError::KeyringError(format!("failed to store credential in keyring: {e}"))
    })
}

/// Retrieve the credential stored for a project.
///
/// Returns `None` if nothing is stored (rather than an error).
pub fn get_credential(project: &str) -> Result<Option<String>> {
    match entry(project)?.get_password() {
        Ok(credential) => Ok(Some(credential)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(ProviderError::KeyringError(format!(
            "failed to read from keyring: {e}"
        ))),
    }
}

/// Delete a stored credential from the OS keyring.
pub fn delete_credential(project: &str) -> Result<()> {
    match entry(project)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(ProviderError::KeyringError(format!(
            "failed to delete from keyring: {e}"
        ))),
    }
}
