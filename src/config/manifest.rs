//! Declarative file: provider settings, resources and data sources.
//!
//! ```toml
//! [provider]
//! timeout_secs = 10
//!
//! [resource.secretsmanager_database_credentials.db]
//! folder_uid = "..."
//! title = "db"
//!
//! [data.secretsmanager_bank_card.visa]
//! path = "<record uid>"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::settings::ProviderSettings;
use crate::errors::{ProviderError, Result};
use crate::record::{decode, AttrMap, RecordType, SecretRecord};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    provider: ProviderSettings,
    #[serde(default)]
    resource: BTreeMap<String, BTreeMap<String, AttrMap>>,
    #[serde(default)]
    data: BTreeMap<String, BTreeMap<String, AttrMap>>,
}

/// A decoded `[resource.<type>.<name>]` block.
#[derive(Debug, Clone)]
pub struct DeclaredResource {
    /// `<resource type>.<name>`, the state key.
    pub address: String,
    pub record: SecretRecord,
}

/// A `[data.<type>.<name>]` block; its query is decoded when read.
#[derive(Debug, Clone)]
pub struct DeclaredData {
    pub address: String,
    pub record_type: RecordType,
    pub attributes: AttrMap,
}

/// Parsed declarative file.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub path: PathBuf,
    pub provider: ProviderSettings,
    pub resources: Vec<DeclaredResource>,
    pub data: Vec<DeclaredData>,
}

/// Prefix a validation error with the block it came from.
fn in_block(address: &str, err: ProviderError) -> ProviderError {
    match err {
        ProviderError::Validation { field, message } => ProviderError::Validation {
            field: format!("{address}.{field}"),
            message,
        },
        other => other,
    }
}

/// Two type aliases (`login`, `secretsmanager_login`, ...) naming the same block.
fn duplicate(address: &str, type_name: &str) -> ProviderError {
    ProviderError::validation(
        address,
        format!("declared twice; '{type_name}' names the same record type as an earlier block"),
    )
}

impl Manifest {
    /// Default name of the declarative file.
    pub const FILE_NAME: &'static str = "ksm.toml";

    /// Load and decode a declarative file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ProviderError::ConfigNotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(path, &contents)
    }

    /// Decode declarative TOML; `path` is only used for messages and state location.
    pub fn parse(path: &Path, contents: &str) -> Result<Self> {
        let raw: RawManifest = toml::from_str(contents).map_err(|e| {
            ProviderError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        raw.provider.validate()?;

        let mut resources = Vec::new();
        for (type_name, blocks) in &raw.resource {
            let record_type = RecordType::lookup(type_name)?;
            for (name, attrs) in blocks {
                let address = format!("{}.{name}", record_type.resource_name());
                if resources.iter().any(|r: &DeclaredResource| r.address == address) {
                    return Err(duplicate(&address, type_name));
                }
                let record = decode(record_type, attrs).map_err(|e| in_block(&address, e))?;
                resources.push(DeclaredResource { address, record });
            }
        }

        let mut data = Vec::new();
        for (type_name, blocks) in &raw.data {
            let record_type = RecordType::lookup(type_name)?;
            for (name, attrs) in blocks {
                let address = format!("data.{}.{name}", record_type.resource_name());
                if data.iter().any(|d: &DeclaredData| d.address == address) {
                    return Err(duplicate(&address, type_name));
                }
                data.push(DeclaredData {
                    address,
                    record_type,
                    attributes: attrs.clone(),
                });
            }
        }

        tracing::debug!(
            path = %path.display(),
            resources = resources.len(),
            data = data.len(),
            "declarative file loaded"
        );

        Ok(Self {
            path: path.to_path_buf(),
            provider: raw.provider,
            resources,
            data,
        })
    }

    /// Directory containing the declarative file.
    pub fn project_dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    /// Where this project's state lives.
    pub fn state_dir(&self) -> PathBuf {
        self.provider.state_dir(self.project_dir())
    }

    pub fn resource(&self, address: &str) -> Option<&DeclaredResource> {
        self.resources.iter().find(|r| r.address == address)
    }
}
