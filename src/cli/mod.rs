//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;
use zeroize::Zeroizing;

use crate::client::{CallContext, Credential, HttpRecordClient};
use crate::config::Manifest;
use crate::errors::{ProviderError, Result};
use crate::provider::{StateFile, StateStore};

/// ksm: declarative Keeper Secrets Manager records.
#[derive(Parser)]
#[command(
    name = "ksm",
    about = "Declarative Keeper Secrets Manager records",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Declarative file (default: ksm.toml)
    #[arg(short, long, default_value = Manifest::FILE_NAME, global = true)]
    pub file: String,

    /// Base64 credential blob (overrides the file and the OS keyring)
    #[arg(long, env = "KSM_CREDENTIAL", hide_env_values = true, global = true)]
    pub credential: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Show what apply would change
    Plan,

    /// Create, update and delete records to match the declarative file
    Apply {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Adopt an existing record into local state
    Import {
        /// Resource name (the <name> in [resource.<type>.<name>])
        name: String,
        /// Record type, e.g. databaseCredentials or secretsmanager_login
        record_type: String,
        /// UID of the existing record
        uid: String,
    },

    /// Read every data source in the declarative file
    Read {
        /// Show secret values instead of masking them
        #[arg(long)]
        show_values: bool,
    },

    /// Fetch one record by UID
    Get {
        /// Record UID
        uid: String,
        /// Show secret values instead of masking them
        #[arg(long)]
        show_values: bool,
    },

    /// Delete a managed record and forget it
    Delete {
        /// Resource address (<type>.<name>) or bare name
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Print a random password
    Generate {
        #[arg(long, default_value = "32")]
        length: usize,
        /// Minimum uppercase letters
        #[arg(long, default_value = "0")]
        caps: usize,
        /// Minimum lowercase letters
        #[arg(long, default_value = "0")]
        lowercase: usize,
        /// Minimum digits
        #[arg(long, default_value = "0")]
        digits: usize,
        /// Minimum special characters
        #[arg(long, default_value = "0")]
        special: usize,
    },

    /// Manage the cached credential
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
}

/// Auth subcommands.
#[derive(clap::Subcommand)]
pub enum AuthAction {
    /// Save the credential to the OS keyring
    Keyring {
        /// Remove the credential from the keyring instead of saving
        #[arg(long)]
        delete: bool,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Path of the declarative file from the CLI arguments.
pub fn manifest_path(cli: &Cli) -> PathBuf {
    PathBuf::from(&cli.file)
}

pub fn load_manifest(cli: &Cli) -> Result<Manifest> {
    Manifest::load(&manifest_path(cli))
}

/// Stable identifier for keyring entries: the canonical project directory.
pub fn project_id(manifest_path: &Path) -> String {
    let dir = match manifest_path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
        _ => PathBuf::from("."),
    };
    dir.canonicalize()
        .unwrap_or(dir)
        .to_string_lossy()
        .to_string()
}

/// Get the credential blob, trying in order:
/// 1. `--credential` / `KSM_CREDENTIAL`
/// 2. `credential` in the `[provider]` table
/// 3. OS keyring (if compiled with `keyring-store` feature)
///
/// Returns `Zeroizing<String>` so the blob is wiped from memory on drop.
pub fn resolve_credential(cli: &Cli, manifest: Option<&Manifest>) -> Result<Zeroizing<String>> {
    if let Some(c) = cli.credential.as_deref().filter(|c| !c.is_empty()) {
        return Ok(Zeroizing::new(c.to_string()));
    }

    if let Some(c) = manifest
        .and_then(|m| m.provider.credential.as_deref())
        .filter(|c| !c.is_empty())
    {
        return Ok(Zeroizing::new(c.to_string()));
    }

    #[cfg(feature = "keyring-store")]
    match crate::keyring::get_credential(&project_id(&manifest_path(cli))) {
        Ok(Some(c)) => return Ok(Zeroizing::new(c)),
        Ok(None) => {}
        Err(e) => tracing::debug!("keyring unavailable: {e}"),
    }

    Err(ProviderError::Credential(
        "no credential found; pass --credential, set KSM_CREDENTIAL or run `ksm auth keyring`"
            .into(),
    ))
}

/// Build the HTTP client from the resolved credential and provider settings.
pub fn build_client(cli: &Cli, manifest: Option<&Manifest>) -> Result<HttpRecordClient> {
    let blob = resolve_credential(cli, manifest)?;
    let mut credential = Credential::parse(&blob)?;

    let settings = manifest.map(|m| m.provider.clone()).unwrap_or_default();
    if let Some(host) = settings.hostname.as_deref() {
        credential = credential.with_hostname(host);
    }
    tracing::debug!(hostname = credential.hostname(), "vault client ready");
    Ok(HttpRecordClient::new(credential, settings.timeout()))
}

/// A fresh context for one remote operation, bounded by the provider timeout.
pub fn call_context(manifest: Option<&Manifest>) -> CallContext {
    let settings = manifest.map(|m| m.provider.clone()).unwrap_or_default();
    // Fetch + write + confirming fetch.
    CallContext::with_timeout(settings.timeout().saturating_mul(3))
}

pub fn state_store(manifest: &Manifest) -> StateStore {
    StateStore::new(&manifest.state_dir())
}

/// Find a state entry by full address, or by bare name when unambiguous.
pub fn resolve_address(state: &StateFile, name: &str) -> Result<String> {
    if state.resources.contains_key(name) {
        return Ok(name.to_string());
    }
    let suffix = format!(".{name}");
    let mut matches = state.resources.keys().filter(|k| k.ends_with(&suffix));
    match (matches.next(), matches.next()) {
        (Some(address), None) => Ok(address.clone()),
        (None, _) => Err(ProviderError::CommandFailed(format!(
            "'{name}' is not in state"
        ))),
        (Some(_), Some(_)) => Err(ProviderError::CommandFailed(format!(
            "'{name}' matches several resources; use <type>.<name>"
        ))),
    }
}
