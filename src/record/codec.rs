//! Field codec: declarative attribute map <-> `SecretRecord`.
//!
//! `decode` is strict: unknown attributes, wrong block shapes and type
//! mismatches fail with a `Validation` error naming the attribute path.
//! `encode` keeps structured values as nested blocks so the reconciler
//! can diff sub-fields independently. Both are pure.

use super::attrs::{AttrMap, BlockReader, BlockWriter};
use super::field::{Field, FieldValue, PasswordField};
use super::kind::{FieldReader, FieldWriter, RecordFields, SecretRecord};
use super::schema::{FieldKind, RecordType};
use super::wire::UnboundFields;
use crate::errors::{ProviderError, Result};

struct AttrFieldReader<'r, 'a> {
    record_type: RecordType,
    root: &'r mut BlockReader<'a>,
}

impl AttrFieldReader<'_, '_> {
    fn check_kind(&self, name: &str, password: bool) {
        debug_assert!(
            self.record_type
                .field(name)
                .is_some_and(|f| (f.kind == FieldKind::Password) == password),
            "{name} is not a declared {} field",
            self.record_type
        );
    }
}

impl FieldReader for AttrFieldReader<'_, '_> {
    fn field<V: FieldValue>(&mut self, name: &'static str) -> Result<Field<V>> {
        self.check_kind(name, false);
        match self.root.block(name)? {
            Some(block) => Field::read(block),
            None => Ok(Field::default()),
        }
    }

    fn password(&mut self, name: &'static str) -> Result<PasswordField> {
        self.check_kind(name, true);
        match self.root.block(name)? {
            Some(block) => PasswordField::read(block),
            None => Ok(PasswordField::default()),
        }
    }
}

struct AttrFieldWriter<'w> {
    out: &'w mut BlockWriter,
}

impl FieldWriter for AttrFieldWriter<'_> {
    fn field<V: FieldValue>(&mut self, name: &'static str, field: &Field<V>) {
        self.out.block(name, field.write());
    }

    fn password(&mut self, name: &'static str, field: &PasswordField) {
        self.out.block(name, field.write());
    }
}

/// Decode a declared attribute block of a known record type.
///
/// A `type` attribute, if present, must name the same type.
pub fn decode(record_type: RecordType, attrs: &AttrMap) -> Result<SecretRecord> {
    let mut root = BlockReader::new("", attrs);

    if let Some(declared) = root.string("type")? {
        if RecordType::lookup(&declared)? != record_type {
            return Err(ProviderError::validation(
                "type",
                format!("'{declared}' does not match resource type '{record_type}'"),
            ));
        }
    }

    let uid = root.string("uid")?.filter(|s| !s.is_empty());
    let folder_uid = root.string("folder_uid")?.filter(|s| !s.is_empty());
    let title = root.required_string("title")?;
    let notes = root.string("notes")?.unwrap_or_default();

    let fields = RecordFields::read(
        record_type,
        &mut AttrFieldReader {
            record_type,
            root: &mut root,
        },
    )?;
    root.finish()?;

    Ok(SecretRecord {
        uid,
        folder_uid,
        title,
        notes,
        fields,
        unbound: UnboundFields::default(),
    })
}

/// Decode an attribute block whose record type comes from its `type` attribute.
pub fn decode_typed(attrs: &AttrMap) -> Result<SecretRecord> {
    let mut header = BlockReader::new("", attrs);
    let type_name = header.required_string("type")?;
    decode(RecordType::lookup(&type_name)?, attrs)
}

/// Flatten a record into its attribute representation.
pub fn encode(record: &SecretRecord) -> AttrMap {
    let mut w = BlockWriter::new();
    w.put_opt("uid", record.uid.clone())
        .put_opt("folder_uid", record.folder_uid.clone())
        .put("type", record.record_type().type_name())
        .put("title", record.title.as_str())
        .put("notes", record.notes.as_str());
    record.fields.write(&mut AttrFieldWriter { out: &mut w });
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::attrs::AttrValue;
    use crate::record::field::{Complexity, GenerationPolicy, Host};
    use crate::record::kind::DatabaseCredentialsFields;

    fn parse(src: &str) -> AttrMap {
        toml::from_str(src).unwrap()
    }

    const DB_CONFIG: &str = r#"
folder_uid = "folder-1"
title = "db"
notes = "db"

[db_type]
label = "MyDB"
required = true
privacy_screen = true
value = "MySQL"

[password]
label = "MyDBPass"
enforce_generation = true
generate = "yes"
complexity = { length = 20, caps = 5, lowercase = 5, digits = 5, special = 5 }

[host]
label = "MyDBHost"
value = { host_name = "127.0.0.1", port = "3306" }
"#;

    #[test]
    fn decodes_database_credentials() {
        let record = decode(RecordType::DatabaseCredentials, &parse(DB_CONFIG)).unwrap();
        let RecordFields::DatabaseCredentials(f) = &record.fields else {
            panic!("wrong kind");
        };
        assert_eq!(f.db_type.value.as_deref(), Some("MySQL"));
        assert!(f.db_type.meta.required && f.db_type.meta.privacy_screen);
        assert_eq!(f.host.value.as_ref().unwrap().port, "3306");
        assert!(f.login.value.is_none());
        assert_eq!(f.password.policy.complexity.unwrap().length, 20);
        assert_eq!(record.folder_uid.as_deref(), Some("folder-1"));
        assert!(record.uid.is_none());
    }

    #[test]
    fn encode_keeps_nested_blocks() {
        let record = decode(RecordType::DatabaseCredentials, &parse(DB_CONFIG)).unwrap();
        let attrs = encode(&record);
        let AttrValue::Block(host) = &attrs["host"] else {
            panic!("host should be a block");
        };
        assert!(matches!(host["value"], AttrValue::Block(_)));
        assert_eq!(attrs["type"], AttrValue::from("databaseCredentials"));
        assert!(!attrs.contains_key("login"));
    }

    #[test]
    fn decode_encode_round_trip() {
        let record = decode(RecordType::DatabaseCredentials, &parse(DB_CONFIG)).unwrap();
        let again = decode(RecordType::DatabaseCredentials, &encode(&record)).unwrap();
        assert_eq!(record, again);
    }

    #[test]
    fn unknown_block_names_the_field() {
        let attrs = parse("title = \"t\"\n[pin_code]\nvalue = \"1234\"\n");
        let err = decode(RecordType::DatabaseCredentials, &attrs).unwrap_err();
        assert!(
            matches!(err, ProviderError::Validation { ref field, .. } if field == "pin_code")
        );
    }

    #[test]
    fn missing_title_is_rejected() {
        let err = decode(RecordType::Photo, &parse("notes = \"n\"\n")).unwrap_err();
        assert!(matches!(err, ProviderError::Validation { ref field, .. } if field == "title"));
    }

    #[test]
    fn mismatched_type_attribute_is_rejected() {
        let attrs = parse("title = \"t\"\ntype = \"bankCard\"\n");
        assert!(decode(RecordType::Photo, &attrs).is_err());
    }

    #[test]
    fn decode_typed_reports_unknown_type() {
        let attrs = parse("title = \"t\"\ntype = \"sshKeys\"\n");
        assert!(matches!(
            decode_typed(&attrs),
            Err(ProviderError::UnknownType(_))
        ));
    }

    #[test]
    fn wrong_block_shape_is_rejected() {
        let attrs = parse("title = \"t\"\nlogin = \"user\"\n");
        let err = decode(RecordType::Login, &attrs).unwrap_err();
        assert!(err.to_string().contains("'login'"));
    }

    #[test]
    fn absent_blocks_decode_to_empty_fields() {
        let record = decode(RecordType::DatabaseCredentials, &parse("title = \"t\"\n")).unwrap();
        assert_eq!(
            record.fields,
            RecordFields::DatabaseCredentials(DatabaseCredentialsFields::default())
        );
        assert_eq!(record.notes, "");
    }

    #[test]
    fn encoded_policy_survives() {
        let mut record = SecretRecord::new(RecordType::ServerCredentials, "srv");
        if let RecordFields::ServerCredentials(f) = &mut record.fields {
            f.host = Field::new(Host {
                host_name: "10.0.0.1".into(),
                port: "22".into(),
            });
            f.password.policy = GenerationPolicy {
                enforce_generation: false,
                generate: true,
                complexity: Some(Complexity {
                    length: 16,
                    digits: 4,
                    ..Complexity::default()
                }),
            };
        }
        let back = decode_typed(&encode(&record)).unwrap();
        assert_eq!(back, record);
    }
}
