//! Record schema catalog.
//!
//! Each supported vault record type declares the ordered list of field
//! blocks it carries: the declarative attribute name, the kind of value
//! the block holds, and the vault field type it maps to on the wire.
//! Adding a record type means adding a variant here and a per-kind codec
//! in `kind.rs`; the attribute and wire codecs need no changes.

use std::fmt;

use crate::errors::{ProviderError, Result};

/// Shape of the `value` inside a field block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain string value.
    Text,
    /// Password with an optional generation policy.
    Password,
    /// `{ host_name, port }`.
    Host,
    /// `{ card_number, card_expiration_date, card_security_code }`.
    PaymentCard,
    /// Unix epoch milliseconds.
    Date,
    /// List of file UIDs.
    FileRef,
}

/// One entry in a record type's ordered field list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Attribute block name in declarative config (e.g. `db_type`).
    pub name: &'static str,
    pub kind: FieldKind,
    /// Vault field type this block is stored as (e.g. `text`).
    pub wire_type: &'static str,
}

const fn spec(name: &'static str, kind: FieldKind, wire_type: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        wire_type,
    }
}

const LOGIN: &[FieldSpec] = &[
    spec("login", FieldKind::Text, "login"),
    spec("password", FieldKind::Password, "password"),
    spec("url", FieldKind::Text, "url"),
];

const DATABASE_CREDENTIALS: &[FieldSpec] = &[
    spec("db_type", FieldKind::Text, "text"),
    spec("host", FieldKind::Host, "host"),
    spec("login", FieldKind::Text, "login"),
    spec("password", FieldKind::Password, "password"),
];

const SERVER_CREDENTIALS: &[FieldSpec] = &[
    spec("host", FieldKind::Host, "host"),
    spec("login", FieldKind::Text, "login"),
    spec("password", FieldKind::Password, "password"),
];

const BANK_CARD: &[FieldSpec] = &[
    spec("payment_card", FieldKind::PaymentCard, "paymentCard"),
    spec("cardholder_name", FieldKind::Text, "text"),
    spec("pin_code", FieldKind::Text, "pinCode"),
];

const PHOTO: &[FieldSpec] = &[spec("file_ref", FieldKind::FileRef, "fileRef")];

const SOFTWARE_LICENSE: &[FieldSpec] = &[
    spec("license_number", FieldKind::Text, "licenseNumber"),
    spec("activation_date", FieldKind::Date, "date"),
    spec("expiration_date", FieldKind::Date, "expirationDate"),
];

/// Prefix of declarative resource and data-source names.
pub const RESOURCE_PREFIX: &str = "secretsmanager_";

/// Data-source prefix used by older provider releases.
const LEGACY_DATA_PREFIX: &str = "keeper_secret_";

/// Every record type the provider understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordType {
    Login,
    DatabaseCredentials,
    ServerCredentials,
    BankCard,
    Photo,
    SoftwareLicense,
}

impl RecordType {
    pub const ALL: [RecordType; 6] = [
        RecordType::Login,
        RecordType::DatabaseCredentials,
        RecordType::ServerCredentials,
        RecordType::BankCard,
        RecordType::Photo,
        RecordType::SoftwareLicense,
    ];

    /// Vault type name, as stored in the record's `type` attribute.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::DatabaseCredentials => "databaseCredentials",
            Self::ServerCredentials => "serverCredentials",
            Self::BankCard => "bankCard",
            Self::Photo => "photo",
            Self::SoftwareLicense => "softwareLicense",
        }
    }

    /// Snake-case suffix used in resource names.
    fn resource_suffix(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::DatabaseCredentials => "database_credentials",
            Self::ServerCredentials => "server_credentials",
            Self::BankCard => "bank_card",
            Self::Photo => "photo",
            Self::SoftwareLicense => "software_license",
        }
    }

    /// Declarative resource name, e.g. `secretsmanager_database_credentials`.
    pub fn resource_name(self) -> String {
        format!("{RESOURCE_PREFIX}{}", self.resource_suffix())
    }

    /// Ordered field blocks for this type.
    pub fn schema(self) -> &'static [FieldSpec] {
        match self {
            Self::Login => LOGIN,
            Self::DatabaseCredentials => DATABASE_CREDENTIALS,
            Self::ServerCredentials => SERVER_CREDENTIALS,
            Self::BankCard => BANK_CARD,
            Self::Photo => PHOTO,
            Self::SoftwareLicense => SOFTWARE_LICENSE,
        }
    }

    /// Look up a field block by attribute name.
    pub fn field(self, name: &str) -> Option<&'static FieldSpec> {
        self.schema().iter().find(|f| f.name == name)
    }

    /// Resolve a vault type name (`bankCard`) or a resource name
    /// (`secretsmanager_bank_card`, `keeper_secret_bank_card`).
    pub fn lookup(name: &str) -> Result<Self> {
        let suffix = name
            .strip_prefix(RESOURCE_PREFIX)
            .or_else(|| name.strip_prefix(LEGACY_DATA_PREFIX));

        Self::ALL
            .into_iter()
            .find(|t| match suffix {
                Some(s) => t.resource_suffix() == s,
                None => t.type_name() == name,
            })
            .ok_or_else(|| ProviderError::UnknownType(name.to_string()))
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}
