//! Configuration: provider settings and the declarative file.

pub mod manifest;
pub mod settings;

pub use manifest::{DeclaredData, DeclaredResource, Manifest};
pub use settings::ProviderSettings;
