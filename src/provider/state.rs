//! Local state: what the last apply observed for each declared resource.
//!
//! Stored as JSON at `<state_dir>/state.json`. The file holds secret
//! values, so it is written atomically via temp file + rename and made
//! owner-only on Unix.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ProviderError, Result};
use crate::record::{encode, AttrMap, RecordType, SecretRecord};

/// Current state file format version.
pub const STATE_VERSION: u32 = 1;

/// Observed remote state of one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Vault type name, e.g. `databaseCredentials`.
    pub record_type: String,
    pub uid: String,
    /// Encoded attributes of the record as last fetched.
    pub attributes: AttrMap,
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    /// Snapshot a fetched record.
    pub fn from_record(record: &SecretRecord) -> Result<Self> {
        let uid = record.uid.clone().ok_or_else(|| ProviderError::UnexpectedResponse {
            operation: "fetch",
            message: "vault returned a record without a UID".into(),
        })?;
        Ok(Self {
            record_type: record.record_type().type_name().to_string(),
            uid,
            attributes: encode(record),
            updated_at: Utc::now(),
        })
    }

    pub fn record_type(&self) -> Result<RecordType> {
        RecordType::lookup(&self.record_type)
    }
}

/// Contents of `state.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    /// Keyed by `<resource type>.<name>`.
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            resources: BTreeMap::new(),
        }
    }
}

/// Reads and writes the state file in a state directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    const FILE_NAME: &'static str = "state.json";

    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state file; a missing file is empty state.
    pub fn load(&self) -> Result<StateFile> {
        if !self.path.exists() {
            return Ok(StateFile::default());
        }
        let contents = fs::read_to_string(&self.path)?;
        let state: StateFile = serde_json::from_str(&contents).map_err(|e| {
            ProviderError::Serialization(format!("Failed to parse {}: {e}", self.path.display()))
        })?;
        if state.version > STATE_VERSION {
            return Err(ProviderError::Config(format!(
                "{} was written by a newer version (format {})",
                self.path.display(),
                state.version
            )));
        }
        Ok(state)
    }

    /// Write the whole state file atomically.
    pub fn save(&self, state: &StateFile) -> Result<()> {
        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| ProviderError::Serialization(format!("state: {e}")))?;

        let parent = self.path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(parent)?;

        // Temp file in the same directory so the rename stays on one filesystem.
        let tmp_path = parent.join(format!(".{}.tmp", Self::FILE_NAME));
        fs::write(&tmp_path, &json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp_path, &self.path)?;
        tracing::debug!(path = %self.path.display(), resources = state.resources.len(), "state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_state() -> ResourceState {
        let mut record = SecretRecord::new(RecordType::Login, "web");
        record.uid = Some("uid-1".into());
        ResourceState::from_record(&record).unwrap()
    }

    #[test]
    fn missing_file_is_empty_state() {
        let tmp = TempDir::new().unwrap();
        let state = StateStore::new(tmp.path()).load().unwrap();
        assert_eq!(state, StateFile::default());
    }

    #[test]
    fn save_then_load() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(&tmp.path().join("nested"));

        let mut state = StateFile::default();
        state
            .resources
            .insert("secretsmanager_login.web".into(), sample_state());
        store.save(&state).unwrap();

        assert_eq!(store.load().unwrap(), state);
    }

    #[cfg(unix)]
    #[test]
    fn state_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path());
        store.save(&StateFile::default()).unwrap();

        let perms = fs::metadata(store.path()).unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o600);
    }

    #[test]
    fn newer_format_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path());
        fs::write(store.path(), r#"{"version": 99, "resources": {}}"#).unwrap();
        assert!(store.load().is_err());
    }

    #[test]
    fn record_without_uid_cannot_be_state() {
        let record = SecretRecord::new(RecordType::Photo, "p");
        assert!(ResourceState::from_record(&record).is_err());
    }
}
