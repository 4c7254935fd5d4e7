//! Provider operations on top of the client and reconciler.
//!
//! This module provides:
//! - Resource lifecycle: plan, apply, destroy, import (`resource`)
//! - Data-source reads by UID or folder + title (`data_source`)
//! - The local state file (`state`)

pub mod data_source;
pub mod resource;
pub mod state;

pub use data_source::{read_data_source, DataSourceQuery};
pub use resource::{apply, destroy, import, plan, Adopted, Plan};
pub use state::{ResourceState, StateFile, StateStore};
