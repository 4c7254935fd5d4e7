//! Shared fixture for the integration tests: an in-memory vault, a temp
//! project directory and helpers to write the declarative file.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use ksm_records::client::{CallContext, MemoryVault};
use ksm_records::config::Manifest;
use ksm_records::provider::StateStore;
use tempfile::TempDir;

pub const FOLDER: &str = "folder-test";

pub struct TestContext {
    pub vault: MemoryVault,
    pub dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            vault: MemoryVault::new(),
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn ctx(&self) -> CallContext {
        CallContext::new()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.path().join(Manifest::FILE_NAME)
    }

    /// Write the declarative file and load it back.
    pub fn manifest(&self, contents: &str) -> Manifest {
        fs::write(self.manifest_path(), contents).unwrap();
        Manifest::load(&self.manifest_path()).unwrap()
    }

    pub fn store(&self, manifest: &Manifest) -> StateStore {
        StateStore::new(&manifest.state_dir())
    }
}
