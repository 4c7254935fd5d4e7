//! Record module: typed vault records and their two representations.
//!
//! This module provides:
//! - The flat attribute model used by declarative files and state (`attrs`)
//! - The per-type schema catalog (`schema`)
//! - Typed field values and generation policy (`field`)
//! - Tagged record kinds and `SecretRecord` (`kind`)
//! - Attribute codec (`codec`) and vault JSON codec (`wire`)

pub mod attrs;
pub mod codec;
pub mod field;
pub mod kind;
pub mod schema;
pub mod wire;

// Re-export the most commonly used items.
pub use attrs::{AttrMap, AttrValue};
pub use codec::{decode, decode_typed, encode};
pub use field::{Complexity, Field, FieldMeta, GenerationPolicy, Host, PasswordField, PaymentCard};
pub use kind::{RecordFields, SecretRecord};
pub use schema::{FieldKind, FieldSpec, RecordType};
pub use wire::UnboundFields;
