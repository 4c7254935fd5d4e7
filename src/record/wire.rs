//! Vault JSON representation of a record.
//!
//! The vault stores record data as JSON with a `type`, `title`, `notes`
//! and an ordered `fields` array. Each schema field block binds to the
//! n-th wire field of its wire type, where n counts earlier schema blocks
//! of the same wire type. Wire fields without a binding are not decoded;
//! they ride along in `UnboundFields` and are written back after the schema fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::field::{Complexity, Field, FieldMeta, FieldValue, GenerationPolicy, PasswordField};
use super::kind::{FieldReader, FieldWriter, RecordFields, SecretRecord};
use super::schema::RecordType;
use crate::errors::{ProviderError, Result};

/// Record data as stored in the vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub title: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub fields: Vec<WireField>,
    #[serde(default)]
    pub custom: Vec<WireField>,
}

/// One entry of a record's `fields` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireField {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub privacy_screen: bool,
    #[serde(default)]
    pub value: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforce_generation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
}

/// Vault fields no schema block binds: extra typed fields (a login's
/// `oneTimeCode`, say) and the whole `custom` array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnboundFields {
    pub fields: Vec<WireField>,
    pub custom: Vec<WireField>,
}

impl WireField {
    fn meta(&self) -> FieldMeta {
        FieldMeta {
            label: self.label.clone(),
            required: self.required,
            privacy_screen: self.privacy_screen,
        }
    }

    fn with_meta(field_type: &str, meta: &FieldMeta) -> Self {
        Self {
            field_type: field_type.to_string(),
            label: meta.label.clone(),
            required: meta.required,
            privacy_screen: meta.privacy_screen,
            ..Self::default()
        }
    }
}

struct WireFieldReader<'a> {
    record_type: RecordType,
    fields: &'a [WireField],
}

impl<'a> WireFieldReader<'a> {
    /// Wire field bound to a schema block, by type occurrence.
    fn bound(&self, name: &str) -> Option<&'a WireField> {
        let schema = self.record_type.schema();
        let pos = schema.iter().position(|f| f.name == name)?;
        let wire_type = schema[pos].wire_type;
        let nth = schema[..pos]
            .iter()
            .filter(|f| f.wire_type == wire_type)
            .count();
        self.fields
            .iter()
            .filter(|f| f.field_type == wire_type)
            .nth(nth)
    }
}

impl FieldReader for WireFieldReader<'_> {
    fn field<V: FieldValue>(&mut self, name: &'static str) -> Result<Field<V>> {
        Ok(match self.bound(name) {
            Some(wf) => Field {
                meta: wf.meta(),
                value: V::from_wire(&wf.value, name)?,
            },
            None => Field::default(),
        })
    }

    fn password(&mut self, name: &'static str) -> Result<PasswordField> {
        let Some(wf) = self.bound(name) else {
            return Ok(PasswordField::default());
        };
        Ok(PasswordField {
            meta: wf.meta(),
            value: String::from_wire(&wf.value, name)?,
            policy: GenerationPolicy {
                enforce_generation: wf.enforce_generation.unwrap_or(false),
                // `generate` is a plan-time directive; the vault never stores it.
                generate: false,
                complexity: wf.complexity,
            },
        })
    }
}

struct WireFieldWriter<'a> {
    record_type: RecordType,
    out: &'a mut Vec<WireField>,
}

impl WireFieldWriter<'_> {
    fn wire_type(&self, name: &str) -> &'static str {
        self.record_type
            .field(name)
            .map(|f| f.wire_type)
            .unwrap_or("text")
    }
}

impl FieldWriter for WireFieldWriter<'_> {
    fn field<V: FieldValue>(&mut self, name: &'static str, field: &Field<V>) {
        let mut wf = WireField::with_meta(self.wire_type(name), &field.meta);
        wf.value = field.value.as_ref().map(V::to_wire).unwrap_or_default();
        self.out.push(wf);
    }

    fn password(&mut self, name: &'static str, field: &PasswordField) {
        let mut wf = WireField::with_meta(self.wire_type(name), &field.meta);
        wf.value = field.value.as_ref().map(|v| v.to_wire()).unwrap_or_default();
        wf.enforce_generation = field.policy.enforce_generation.then_some(true);
        wf.complexity = field.policy.complexity;
        self.out.push(wf);
    }
}

/// Serialize a record's data for the vault. Every schema block is written,
/// in schema order, so empty fields keep their slot.
pub fn to_wire(record: &SecretRecord) -> WireRecord {
    let record_type = record.record_type();
    let mut fields = Vec::with_capacity(record_type.schema().len());
    record.fields.write(&mut WireFieldWriter {
        record_type,
        out: &mut fields,
    });
    fields.extend(record.unbound.fields.iter().cloned());
    WireRecord {
        record_type: record_type.type_name().to_string(),
        title: record.title.clone(),
        notes: record.notes.clone(),
        fields,
        custom: record.unbound.custom.clone(),
    }
}

/// Rebuild a record from vault data plus its remote identity.
pub fn from_wire(uid: &str, folder_uid: Option<&str>, wire: &WireRecord) -> Result<SecretRecord> {
    let record_type = RecordType::lookup(&wire.record_type)?;

    let schema_types: HashMap<&str, usize> =
        record_type
            .schema()
            .iter()
            .fold(HashMap::new(), |mut acc, f| {
                *acc.entry(f.wire_type).or_default() += 1;
                acc
            });
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut unbound = UnboundFields {
        fields: Vec::new(),
        custom: wire.custom.clone(),
    };
    for wf in &wire.fields {
        let count = seen.entry(wf.field_type.as_str()).or_default();
        *count += 1;
        if *count > schema_types.get(wf.field_type.as_str()).copied().unwrap_or(0) {
            tracing::debug!(uid, field_type = %wf.field_type, "keeping unbound vault field");
            unbound.fields.push(wf.clone());
        }
    }

    let fields = RecordFields::read(
        record_type,
        &mut WireFieldReader {
            record_type,
            fields: &wire.fields,
        },
    )?;

    Ok(SecretRecord {
        uid: Some(uid.to_string()),
        folder_uid: folder_uid.map(str::to_string),
        title: wire.title.clone(),
        notes: wire.notes.clone(),
        fields,
        unbound,
    })
}

/// Parse vault JSON bytes.
pub fn parse(bytes: &[u8]) -> Result<WireRecord> {
    serde_json::from_slice(bytes).map_err(|e| ProviderError::UnexpectedResponse {
        operation: "decode",
        message: format!("invalid record JSON: {e}"),
    })
}

/// Serialize to vault JSON bytes.
pub fn serialize(wire: &WireRecord) -> Result<Vec<u8>> {
    serde_json::to_vec(wire).map_err(|e| ProviderError::Serialization(format!("record: {e}")))
}
