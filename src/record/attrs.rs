//! Flat attribute model shared by declarative files, local state and the codec.
//!
//! An attribute map is what a declarative config block looks like after
//! parsing: scalar strings/ints/bools, lists of scalars, and nested blocks.
//! The enum is serde-untagged so TOML tables and JSON objects deserialize
//! into it without an intermediate format.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::errors::{ProviderError, Result};

/// Attribute name -> value, ordered so encoded output and diffs are stable.
pub type AttrMap = BTreeMap<String, AttrValue>;

/// One attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<AttrValue>),
    Block(AttrMap),
}

impl AttrValue {
    /// Human-readable kind name, used in validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "number",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Block(_) => "block",
        }
    }

    /// Render a scalar for display and leaf comparison.
    fn render(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Str(s) => s.clone(),
            Self::List(items) => items
                .iter()
                .map(AttrValue::render)
                .collect::<Vec<_>>()
                .join(","),
            Self::Block(_) => String::new(),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<AttrMap> for AttrValue {
    fn from(m: AttrMap) -> Self {
        Self::Block(m)
    }
}

/// Join a parent attribute path and a key with a dot.
pub fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Flatten nested blocks into `path -> rendered leaf` pairs.
///
/// Lists are rendered as one comma-joined leaf; they are values, not blocks.
pub fn flatten(map: &AttrMap) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    flatten_into(map, "", &mut out);
    out
}

fn flatten_into(map: &AttrMap, prefix: &str, out: &mut BTreeMap<String, String>) {
    for (key, value) in map {
        let path = join_path(prefix, key);
        match value {
            AttrValue::Block(inner) => flatten_into(inner, &path, out),
            other => {
                out.insert(path, other.render());
            }
        }
    }
}

/// Typed, strict reader over one attribute block.
///
/// Every accessor records the key as consumed; `finish` then rejects any
/// key the codec did not ask for, naming the full attribute path.
pub struct BlockReader<'a> {
    path: String,
    map: &'a AttrMap,
    seen: BTreeSet<&'a str>,
}

impl<'a> BlockReader<'a> {
    pub fn new(path: impl Into<String>, map: &'a AttrMap) -> Self {
        Self {
            path: path.into(),
            map,
            seen: BTreeSet::new(),
        }
    }

    /// Dotted path of this block (empty at the record root).
    pub fn path(&self) -> &str {
        &self.path
    }

    fn take(&mut self, key: &str) -> Option<&'a AttrValue> {
        let (k, v) = self.map.get_key_value(key)?;
        self.seen.insert(k.as_str());
        Some(v)
    }

    fn mismatch(&self, key: &str, expected: &str, got: &AttrValue) -> ProviderError {
        ProviderError::validation(
            join_path(&self.path, key),
            format!("expected {expected}, got {}", got.kind()),
        )
    }

    /// Optional string. Numbers are accepted and rendered as strings.
    pub fn string(&mut self, key: &str) -> Result<Option<String>> {
        match self.take(key) {
            None => Ok(None),
            Some(AttrValue::Str(s)) => Ok(Some(s.clone())),
            Some(AttrValue::Int(i)) => Ok(Some(i.to_string())),
            Some(other) => Err(self.mismatch(key, "string", other)),
        }
    }

    /// Required, non-empty string.
    pub fn required_string(&mut self, key: &str) -> Result<String> {
        match self.string(key)? {
            Some(s) if !s.is_empty() => Ok(s),
            _ => Err(ProviderError::validation(
                join_path(&self.path, key),
                "attribute is required",
            )),
        }
    }

    /// Optional bool, also accepting "true"/"false" strings.
    pub fn bool(&mut self, key: &str) -> Result<Option<bool>> {
        match self.take(key) {
            None => Ok(None),
            Some(AttrValue::Bool(b)) => Ok(Some(*b)),
            Some(AttrValue::Str(s)) => match s.as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(ProviderError::validation(
                    join_path(&self.path, key),
                    format!("expected bool, got '{s}'"),
                )),
            },
            Some(other) => Err(self.mismatch(key, "bool", other)),
        }
    }

    /// Optional integer, also accepting numeric strings.
    pub fn int(&mut self, key: &str) -> Result<Option<i64>> {
        match self.take(key) {
            None => Ok(None),
            Some(AttrValue::Int(i)) => Ok(Some(*i)),
            Some(AttrValue::Str(s)) => s.parse().map(Some).map_err(|_| {
                ProviderError::validation(
                    join_path(&self.path, key),
                    format!("expected number, got '{s}'"),
                )
            }),
            Some(other) => Err(self.mismatch(key, "number", other)),
        }
    }

    /// Optional list of strings.
    pub fn string_list(&mut self, key: &str) -> Result<Option<Vec<String>>> {
        match self.take(key) {
            None => Ok(None),
            Some(AttrValue::List(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item {
                        AttrValue::Str(s) => out.push(s.clone()),
                        other => {
                            return Err(ProviderError::validation(
                                format!("{}[{i}]", join_path(&self.path, key)),
                                format!("expected string, got {}", other.kind()),
                            ))
                        }
                    }
                }
                Ok(Some(out))
            }
            Some(other) => Err(self.mismatch(key, "list", other)),
        }
    }

    /// Optional nested block, returned as a reader scoped to its path.
    pub fn block(&mut self, key: &str) -> Result<Option<BlockReader<'a>>> {
        match self.take(key) {
            None => Ok(None),
            Some(AttrValue::Block(inner)) => {
                Ok(Some(BlockReader::new(join_path(&self.path, key), inner)))
            }
            Some(other) => Err(self.mismatch(key, "block", other)),
        }
    }

    /// Fail on the first attribute no accessor consumed.
    pub fn finish(self) -> Result<()> {
        match self.map.keys().find(|k| !self.seen.contains(k.as_str())) {
            Some(unknown) => Err(ProviderError::validation(
                join_path(&self.path, unknown),
                "unsupported attribute",
            )),
            None => Ok(()),
        }
    }
}

/// Small builder for encoded blocks that skips absent values.
#[derive(Default)]
pub struct BlockWriter {
    map: AttrMap,
}

impl BlockWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &str, value: impl Into<AttrValue>) -> &mut Self {
        self.map.insert(key.to_string(), value.into());
        self
    }

    pub fn put_opt<V: Into<AttrValue>>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        if let Some(v) = value {
            self.put(key, v);
        }
        self
    }

    /// Only write `true`; `false` is the decode default.
    pub fn flag(&mut self, key: &str, value: bool) -> &mut Self {
        if value {
            self.put(key, true);
        }
        self
    }

    /// Write a nested block unless it is empty.
    pub fn block(&mut self, key: &str, inner: AttrMap) -> &mut Self {
        if !inner.is_empty() {
            self.map.insert(key.to_string(), AttrValue::Block(inner));
        }
        self
    }

    pub fn finish(self) -> AttrMap {
        self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AttrMap {
        let mut host = AttrMap::new();
        host.insert("host_name".into(), "127.0.0.1".into());
        host.insert("port".into(), "3306".into());
        let mut block = AttrMap::new();
        block.insert("label".into(), "MyDBHost".into());
        block.insert("value".into(), AttrValue::Block(host));
        let mut root = AttrMap::new();
        root.insert("title".into(), "db".into());
        root.insert("host".into(), AttrValue::Block(block));
        root
    }

    #[test]
    fn flatten_produces_dotted_paths() {
        let flat = flatten(&sample());
        assert_eq!(flat["title"], "db");
        assert_eq!(flat["host.label"], "MyDBHost");
        assert_eq!(flat["host.value.port"], "3306");
        assert_eq!(flat.len(), 4);
    }

    #[test]
    fn reader_rejects_unconsumed_keys_with_full_path() {
        let map = sample();
        let mut root = BlockReader::new("", &map);
        root.string("title").unwrap();
        let mut host = root.block("host").unwrap().unwrap();
        host.string("label").unwrap();
        let err = host.finish().unwrap_err();
        assert!(
            matches!(err, ProviderError::Validation { ref field, .. } if field == "host.value")
        );
    }

    #[test]
    fn reader_reports_type_mismatch() {
        let map = sample();
        let mut root = BlockReader::new("", &map);
        let err = root.bool("title").unwrap_err();
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn reader_accepts_string_numbers_and_bools() {
        let mut map = AttrMap::new();
        map.insert("length".into(), "20".into());
        map.insert("required".into(), "true".into());
        let mut r = BlockReader::new("complexity", &map);
        assert_eq!(r.int("length").unwrap(), Some(20));
        assert_eq!(r.bool("required").unwrap(), Some(true));
        r.finish().unwrap();
    }

    #[test]
    fn untagged_values_load_from_toml_and_json() {
        let from_toml: AttrMap = toml::from_str(
            "title = \"t\"\nlength = 20\nflag = true\nrefs = [\"a\", \"b\"]\n[host]\nport = \"1\"\n",
        )
        .unwrap();
        assert_eq!(from_toml["length"], AttrValue::Int(20));
        assert_eq!(from_toml["flag"], AttrValue::Bool(true));
        assert!(matches!(from_toml["host"], AttrValue::Block(_)));

        let json = serde_json::to_string(&from_toml).unwrap();
        let from_json: AttrMap = serde_json::from_str(&json).unwrap();
        assert_eq!(from_toml, from_json);
    }

    #[test]
    fn writer_skips_empty_blocks_and_false_flags() {
        let mut w = BlockWriter::new();
        w.flag("required", false)
            .put_opt::<String>("label", None)
            .block("value", AttrMap::new());
        assert!(w.finish().is_empty());
    }
}
