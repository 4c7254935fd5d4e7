//! Typed field values carried by vault records.
//!
//! A field is a block of display metadata (`label`, `required`,
//! `privacy_screen`) plus an optional value whose shape depends on the
//! field kind. `FieldValue` is the per-shape bridge to both the attribute
//! model and the vault's JSON `value` array.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::attrs::{join_path, AttrMap, AttrValue, BlockReader, BlockWriter};
use crate::errors::{ProviderError, Result};

/// Display metadata shared by every field block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMeta {
    pub label: Option<String>,
    pub required: bool,
    /// Display hint only; has no effect on how the value is stored.
    pub privacy_screen: bool,
}

impl FieldMeta {
    pub(crate) fn read(r: &mut BlockReader<'_>) -> Result<Self> {
        Ok(Self {
            label: r.string("label")?,
            required: r.bool("required")?.unwrap_or(false),
            privacy_screen: r.bool("privacy_screen")?.unwrap_or(false),
        })
    }

    pub(crate) fn write(&self, w: &mut BlockWriter) {
        w.put_opt("label", self.label.clone())
            .flag("required", self.required)
            .flag("privacy_screen", self.privacy_screen);
    }
}

/// A value shape that can live inside a field block.
pub trait FieldValue: Sized + Clone + PartialEq + fmt::Debug {
    /// Read the `value` attribute of a field block.
    fn read_attr(r: &mut BlockReader<'_>) -> Result<Option<Self>>;

    fn to_attr(&self) -> AttrValue;

    /// Entries of the vault's `value` array.
    fn to_wire(&self) -> Vec<serde_json::Value>;

    /// Rebuild from the vault's `value` array; empty means no value.
    fn from_wire(values: &[serde_json::Value], path: &str) -> Result<Option<Self>>;
}

fn wire_error(path: &str, e: impl fmt::Display) -> ProviderError {
    ProviderError::UnexpectedResponse {
        operation: "decode",
        message: format!("field '{path}': {e}"),
    }
}

/// Deserialize the first entry of a wire `value` array.
fn first_wire<T: serde::de::DeserializeOwned>(
    values: &[serde_json::Value],
    path: &str,
) -> Result<Option<T>> {
    values
        .first()
        .map(|v| serde_json::from_value(v.clone()).map_err(|e| wire_error(path, e)))
        .transpose()
}

fn to_wire_value<T: Serialize>(value: &T) -> Vec<serde_json::Value> {
    // Plain structs of strings always serialize.
    serde_json::to_value(value).map(|v| vec![v]).unwrap_or_default()
}

impl FieldValue for String {
    fn read_attr(r: &mut BlockReader<'_>) -> Result<Option<Self>> {
        r.string("value")
    }

    fn to_attr(&self) -> AttrValue {
        AttrValue::Str(self.clone())
    }

    fn to_wire(&self) -> Vec<serde_json::Value> {
        vec![serde_json::Value::String(self.clone())]
    }

    fn from_wire(values: &[serde_json::Value], path: &str) -> Result<Option<Self>> {
        first_wire(values, path)
    }
}

/// Dates are unix epoch milliseconds.
impl FieldValue for i64 {
    fn read_attr(r: &mut BlockReader<'_>) -> Result<Option<Self>> {
        r.int("value")
    }

    fn to_attr(&self) -> AttrValue {
        AttrValue::Int(*self)
    }

    fn to_wire(&self) -> Vec<serde_json::Value> {
        vec![serde_json::Value::from(*self)]
    }

    fn from_wire(values: &[serde_json::Value], path: &str) -> Result<Option<Self>> {
        first_wire(values, path)
    }
}

/// File references: every UID is one wire entry.
impl FieldValue for Vec<String> {
    fn read_attr(r: &mut BlockReader<'_>) -> Result<Option<Self>> {
        r.string_list("value")
    }

    fn to_attr(&self) -> AttrValue {
        AttrValue::List(self.iter().cloned().map(AttrValue::Str).collect())
    }

    fn to_wire(&self) -> Vec<serde_json::Value> {
        self.iter().cloned().map(serde_json::Value::String).collect()
    }

    fn from_wire(values: &[serde_json::Value], path: &str) -> Result<Option<Self>> {
        if values.is_empty() {
            return Ok(None);
        }
        values
            .iter()
            .map(|v| serde_json::from_value(v.clone()).map_err(|e| wire_error(path, e)))
            .collect::<Result<Vec<String>>>()
            .map(Some)
    }
}

/// Host name and port of a server or database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    #[serde(default)]
    pub host_name: String,
    #[serde(default)]
    pub port: String,
}

impl FieldValue for Host {
    fn read_attr(r: &mut BlockReader<'_>) -> Result<Option<Self>> {
        let Some(mut v) = r.block("value")? else {
            return Ok(None);
        };
        let host = Host {
            host_name: v.string("host_name")?.unwrap_or_default(),
            port: v.string("port")?.unwrap_or_default(),
        };
        v.finish()?;
        Ok(Some(host))
    }

    fn to_attr(&self) -> AttrValue {
        let mut m = AttrMap::new();
        m.insert("host_name".into(), self.host_name.as_str().into());
        m.insert("port".into(), self.port.as_str().into());
        AttrValue::Block(m)
    }

    fn to_wire(&self) -> Vec<serde_json::Value> {
        to_wire_value(self)
    }

    fn from_wire(values: &[serde_json::Value], path: &str) -> Result<Option<Self>> {
        first_wire(values, path)
    }
}

/// Card number, expiry (`MM/YYYY`) and security code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCard {
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub card_expiration_date: String,
    #[serde(default)]
    pub card_security_code: String,
}

impl FieldValue for PaymentCard {
    fn read_attr(r: &mut BlockReader<'_>) -> Result<Option<Self>> {
        let Some(mut v) = r.block("value")? else {
            return Ok(None);
        };
        let card = PaymentCard {
            card_number: v.string("card_number")?.unwrap_or_default(),
            card_expiration_date: v.string("card_expiration_date")?.unwrap_or_default(),
            card_security_code: v.string("card_security_code")?.unwrap_or_default(),
        };
        v.finish()?;
        Ok(Some(card))
    }

    fn to_attr(&self) -> AttrValue {
        let mut m = AttrMap::new();
        m.insert("card_number".into(), self.card_number.as_str().into());
        m.insert(
            "card_expiration_date".into(),
            self.card_expiration_date.as_str().into(),
        );
        m.insert(
            "card_security_code".into(),
            self.card_security_code.as_str().into(),
        );
        AttrValue::Block(m)
    }

    fn to_wire(&self) -> Vec<serde_json::Value> {
        to_wire_value(self)
    }

    fn from_wire(values: &[serde_json::Value], path: &str) -> Result<Option<Self>> {
        first_wire(values, path)
    }
}

/// A field block holding a value of shape `V`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field<V> {
    pub meta: FieldMeta,
    pub value: Option<V>,
}

impl<V> Default for Field<V> {
    fn default() -> Self {
        Self {
            meta: FieldMeta::default(),
            value: None,
        }
    }
}

impl<V> Field<V> {
    pub fn new(value: V) -> Self {
        Self {
            meta: FieldMeta::default(),
            value: Some(value),
        }
    }

    pub fn labelled(mut self, label: &str) -> Self {
        self.meta.label = Some(label.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// Password generation policy
// ---------------------------------------------------------------------------

/// Minimum character-category counts plus total length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complexity {
    pub length: usize,
    #[serde(default)]
    pub caps: usize,
    #[serde(default)]
    pub lowercase: usize,
    #[serde(default)]
    pub digits: usize,
    #[serde(default)]
    pub special: usize,
}

impl Default for Complexity {
    fn default() -> Self {
        Self {
            length: 32,
            caps: 0,
            lowercase: 0,
            digits: 0,
            special: 0,
        }
    }
}

impl Complexity {
    /// Sum of all category minimums.
    pub fn minimum_total(&self) -> usize {
        self.caps + self.lowercase + self.digits + self.special
    }

    fn read(mut r: BlockReader<'_>) -> Result<Self> {
        let defaults = Complexity::default();
        let complexity = Complexity {
            length: read_count(&mut r, "length")?.unwrap_or(defaults.length),
            caps: read_count(&mut r, "caps")?.unwrap_or(0),
            lowercase: read_count(&mut r, "lowercase")?.unwrap_or(0),
            digits: read_count(&mut r, "digits")?.unwrap_or(0),
            special: read_count(&mut r, "special")?.unwrap_or(0),
        };
        r.finish()?;
        Ok(complexity)
    }

    fn to_attrs(self) -> AttrMap {
        let as_attr = |n: usize| AttrValue::Int(i64::try_from(n).unwrap_or(i64::MAX));
        let mut m = AttrMap::new();
        m.insert("length".into(), as_attr(self.length));
        m.insert("caps".into(), as_attr(self.caps));
        m.insert("lowercase".into(), as_attr(self.lowercase));
        m.insert("digits".into(), as_attr(self.digits));
        m.insert("special".into(), as_attr(self.special));
        m
    }
}

fn read_count(r: &mut BlockReader<'_>, key: &str) -> Result<Option<usize>> {
    let path = join_path(r.path(), key);
    match r.int(key)? {
        None => Ok(None),
        Some(n) => usize::try_from(n)
            .map(Some)
            .map_err(|_| ProviderError::validation(path, "must not be negative")),
    }
}

/// How a password field's value is produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationPolicy {
    /// Caller-supplied values are rejected; the vault value must be generated.
    pub enforce_generation: bool,
    /// Request a generated value when none is supplied.
    pub generate: bool,
    pub complexity: Option<Complexity>,
}

impl GenerationPolicy {
    /// Whether a value should be generated when none exists yet.
    pub fn wants_generation(&self) -> bool {
        self.generate || self.enforce_generation
    }

    /// Complexity to generate with (explicit or default).
    pub fn effective_complexity(&self) -> Complexity {
        self.complexity.unwrap_or_default()
    }
}

/// Parse the `generate` directive (`"yes"`, `true`, ...).
fn read_generate(r: &mut BlockReader<'_>) -> Result<bool> {
    let path = join_path(r.path(), "generate");
    match r.string("generate") {
        Ok(None) => Ok(false),
        Ok(Some(s)) => match s.to_ascii_lowercase().as_str() {
            "yes" | "true" | "1" => Ok(true),
            "no" | "false" | "0" | "" => Ok(false),
            _ => Err(ProviderError::validation(
                path,
                format!("expected yes/no, got '{s}'"),
            )),
        },
        // Not a string: let the bool accessor explain the mismatch.
        Err(_) => Ok(r.bool("generate")?.unwrap_or(false)),
    }
}

/// Password field: value plus generation policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordField {
    pub meta: FieldMeta,
    pub value: Option<String>,
    pub policy: GenerationPolicy,
}

impl PasswordField {
    pub(crate) fn read(mut r: BlockReader<'_>) -> Result<Self> {
        let path = r.path().to_string();
        let meta = FieldMeta::read(&mut r)?;
        let value = r.string("value")?;
        let enforce_generation = r.bool("enforce_generation")?.unwrap_or(false);
        let generate = read_generate(&mut r)?;
        let complexity = r.block("complexity")?.map(Complexity::read).transpose()?;
        r.finish()?;

        if enforce_generation && value.is_some() {
            return Err(ProviderError::validation(
                format!("{path}.value"),
                "cannot be set when enforce_generation is true",
            ));
        }

        Ok(Self {
            meta,
            value,
            policy: GenerationPolicy {
                enforce_generation,
                generate,
                complexity,
            },
        })
    }

    pub(crate) fn write(&self) -> AttrMap {
        let mut w = BlockWriter::new();
        self.meta.write(&mut w);
        // An enforced value is never declared, so it is not part of the attribute form.
        if !self.policy.enforce_generation {
            w.put_opt("value", self.value.clone());
        }
        w.flag("enforce_generation", self.policy.enforce_generation);
        if self.policy.generate {
            w.put("generate", "yes");
        }
        if let Some(c) = self.policy.complexity {
            w.block("complexity", c.to_attrs());
        }
        w.finish()
    }
}

impl<V: FieldValue> Field<V> {
    pub(crate) fn read(mut r: BlockReader<'_>) -> Result<Self> {
        let meta = FieldMeta::read(&mut r)?;
        let value = V::read_attr(&mut r)?;
        r.finish()?;
        Ok(Self { meta, value })
    }

    pub(crate) fn write(&self) -> AttrMap {
        let mut w = BlockWriter::new();
        self.meta.write(&mut w);
        w.put_opt("value", self.value.as_ref().map(V::to_attr));
        w.finish()
    }
}
