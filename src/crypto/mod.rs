//! Cryptographic primitives for the records client.
//!
//! This module provides:
//! - Constrained password generation (`generator`)
//! - AES-256-GCM record payload encryption and decryption (`encryption`)
//! - HKDF per-record keys, request signing and UID generation (`keys`)

pub mod encryption;
pub mod generator;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, generate_password, ...};
pub use encryption::{decrypt, encrypt};
pub use generator::{generate_password, generate_password_with};
pub use keys::{generate_uid, AppKey};
