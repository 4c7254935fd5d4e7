use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{ProviderError, Result};

/// Largest accepted `timeout_secs` (one hour).
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Provider configuration, the `[provider]` table of the declarative file.
///
/// Every field has a sensible default so a file with only resources works;
/// the credential can come from the command line, the environment or the
/// OS keyring instead.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Base64 credential blob. Prefer `KSM_CREDENTIAL` over committing this.
    #[serde(default)]
    pub credential: Option<String>,

    /// Override the vault host named in the credential.
    #[serde(default)]
    pub hostname: Option<String>,

    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Directory (relative to the declarative file) holding local state.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_timeout_secs() -> u64 {
    30
}

fn default_state_dir() -> String {
    ".ksm".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            credential: None,
            hostname: None,
            timeout_secs: default_timeout_secs(),
            state_dir: default_state_dir(),
        }
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("hostname", &self.hostname)
            .field("timeout_secs", &self.timeout_secs)
            .field("state_dir", &self.state_dir)
            .finish()
    }
}

impl ProviderSettings {
    /// Reject values that would cancel every call or overflow a deadline.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_TIMEOUT_SECS).contains(&self.timeout_secs) {
            return Err(ProviderError::Config(format!(
                "provider.timeout_secs must be between 1 and {MAX_TIMEOUT_SECS}, got {}",
                self.timeout_secs
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full path to the state directory for a project.
    ///
    /// Example: `project_dir/.ksm`
    pub fn state_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.state_dir)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
