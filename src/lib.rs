pub mod cli;
pub mod client;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod provider;
pub mod reconcile;
pub mod record;

#[cfg(feature = "keyring-store")]
pub mod keyring;
