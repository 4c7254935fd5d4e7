//! Secret records as a tagged variant per record kind.
//!
//! Each kind owns its typed field set and an explicit codec: `read` pulls
//! named blocks from any `FieldReader`, `write` pushes them to any
//! `FieldWriter`. The attribute codec and the wire codec both implement
//! those traits, so each kind states its field mapping exactly once.

use super::field::{Field, FieldValue, Host, PasswordField, PaymentCard};
use super::schema::RecordType;
use super::wire::UnboundFields;
use crate::errors::Result;

/// Source of named field blocks (declarative attributes or vault JSON).
pub trait FieldReader {
    fn field<V: FieldValue>(&mut self, name: &'static str) -> Result<Field<V>>;
    fn password(&mut self, name: &'static str) -> Result<PasswordField>;
}

/// Sink for named field blocks.
pub trait FieldWriter {
    fn field<V: FieldValue>(&mut self, name: &'static str, field: &Field<V>);
    fn password(&mut self, name: &'static str, field: &PasswordField);
}

/// Explicit bidirectional mapping for one record kind.
pub trait KindCodec: Sized {
    const TYPE: RecordType;

    fn read<R: FieldReader>(r: &mut R) -> Result<Self>;
    fn write<W: FieldWriter>(&self, w: &mut W);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginFields {
    pub login: Field<String>,
    pub password: PasswordField,
    pub url: Field<String>,
}

impl KindCodec for LoginFields {
    const TYPE: RecordType = RecordType::Login;

    fn read<R: FieldReader>(r: &mut R) -> Result<Self> {
        Ok(Self {
            login: r.field("login")?,
            password: r.password("password")?,
            url: r.field("url")?,
        })
    }

    fn write<W: FieldWriter>(&self, w: &mut W) {
        w.field("login", &self.login);
        w.password("password", &self.password);
        w.field("url", &self.url);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseCredentialsFields {
    /// Database engine, e.g. `MySQL`.
    pub db_type: Field<String>,
    pub host: Field<Host>,
    pub login: Field<String>,
    pub password: PasswordField,
}

impl KindCodec for DatabaseCredentialsFields {
    const TYPE: RecordType = RecordType::DatabaseCredentials;

    fn read<R: FieldReader>(r: &mut R) -> Result<Self> {
        Ok(Self {
            db_type: r.field("db_type")?,
            host: r.field("host")?,
            login: r.field("login")?,
            password: r.password("password")?,
        })
    }

    fn write<W: FieldWriter>(&self, w: &mut W) {
        w.field("db_type", &self.db_type);
        w.field("host", &self.host);
        w.field("login", &self.login);
        w.password("password", &self.password);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerCredentialsFields {
    pub host: Field<Host>,
    pub login: Field<String>,
    pub password: PasswordField,
}

impl KindCodec for ServerCredentialsFields {
    const TYPE: RecordType = RecordType::ServerCredentials;

    fn read<R: FieldReader>(r: &mut R) -> Result<Self> {
        Ok(Self {
            host: r.field("host")?,
            login: r.field("login")?,
            password: r.password("password")?,
        })
    }

    fn write<W: FieldWriter>(&self, w: &mut W) {
        w.field("host", &self.host);
        w.field("login", &self.login);
        w.password("password", &self.password);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankCardFields {
    pub payment_card: Field<PaymentCard>,
    pub cardholder_name: Field<String>,
    pub pin_code: Field<String>,
}

impl KindCodec for BankCardFields {
    const TYPE: RecordType = RecordType::BankCard;

    fn read<R: FieldReader>(r: &mut R) -> Result<Self> {
        Ok(Self {
            payment_card: r.field("payment_card")?,
            cardholder_name: r.field("cardholder_name")?,
            pin_code: r.field("pin_code")?,
        })
    }

    fn write<W: FieldWriter>(&self, w: &mut W) {
        w.field("payment_card", &self.payment_card);
        w.field("cardholder_name", &self.cardholder_name);
        w.field("pin_code", &self.pin_code);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoFields {
    /// UIDs of the attached image files.
    pub file_ref: Field<Vec<String>>,
}

impl KindCodec for PhotoFields {
    const TYPE: RecordType = RecordType::Photo;

    fn read<R: FieldReader>(r: &mut R) -> Result<Self> {
        Ok(Self {
            file_ref: r.field("file_ref")?,
        })
    }

    fn write<W: FieldWriter>(&self, w: &mut W) {
        w.field("file_ref", &self.file_ref);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoftwareLicenseFields {
    pub license_number: Field<String>,
    pub activation_date: Field<i64>,
    pub expiration_date: Field<i64>,
}

impl KindCodec for SoftwareLicenseFields {
    const TYPE: RecordType = RecordType::SoftwareLicense;

    fn read<R: FieldReader>(r: &mut R) -> Result<Self> {
        Ok(Self {
            license_number: r.field("license_number")?,
            activation_date: r.field("activation_date")?,
            expiration_date: r.field("expiration_date")?,
        })
    }

    fn write<W: FieldWriter>(&self, w: &mut W) {
        w.field("license_number", &self.license_number);
        w.field("activation_date", &self.activation_date);
        w.field("expiration_date", &self.expiration_date);
    }
}

/// Typed field set of a record, one variant per record kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFields {
    Login(LoginFields),
    DatabaseCredentials(DatabaseCredentialsFields),
    ServerCredentials(ServerCredentialsFields),
    BankCard(BankCardFields),
    Photo(PhotoFields),
    SoftwareLicense(SoftwareLicenseFields),
}

impl RecordFields {
    /// Empty field set for a record type.
    pub fn empty(record_type: RecordType) -> Self {
        match record_type {
            RecordType::Login => Self::Login(LoginFields::default()),
            RecordType::DatabaseCredentials => {
                Self::DatabaseCredentials(DatabaseCredentialsFields::default())
            }
            RecordType::ServerCredentials => {
                Self::ServerCredentials(ServerCredentialsFields::default())
            }
            RecordType::BankCard => Self::BankCard(BankCardFields::default()),
            RecordType::Photo => Self::Photo(PhotoFields::default()),
            RecordType::SoftwareLicense => Self::SoftwareLicense(SoftwareLicenseFields::default()),
        }
    }

    pub fn record_type(&self) -> RecordType {
        match self {
            Self::Login(_) => LoginFields::TYPE,
            Self::DatabaseCredentials(_) => DatabaseCredentialsFields::TYPE,
            Self::ServerCredentials(_) => ServerCredentialsFields::TYPE,
            Self::BankCard(_) => BankCardFields::TYPE,
            Self::Photo(_) => PhotoFields::TYPE,
            Self::SoftwareLicense(_) => SoftwareLicenseFields::TYPE,
        }
    }

    pub fn read<R: FieldReader>(record_type: RecordType, r: &mut R) -> Result<Self> {
        Ok(match record_type {
            RecordType::Login => Self::Login(LoginFields::read(r)?),
            RecordType::DatabaseCredentials => {
                Self::DatabaseCredentials(DatabaseCredentialsFields::read(r)?)
            }
            RecordType::ServerCredentials => {
                Self::ServerCredentials(ServerCredentialsFields::read(r)?)
            }
            RecordType::BankCard => Self::BankCard(BankCardFields::read(r)?),
            RecordType::Photo => Self::Photo(PhotoFields::read(r)?),
            RecordType::SoftwareLicense => Self::SoftwareLicense(SoftwareLicenseFields::read(r)?),
        })
    }

    pub fn write<W: FieldWriter>(&self, w: &mut W) {
        match self {
            Self::Login(f) => f.write(w),
            Self::DatabaseCredentials(f) => f.write(w),
            Self::ServerCredentials(f) => f.write(w),
            Self::BankCard(f) => f.write(w),
            Self::Photo(f) => f.write(w),
            Self::SoftwareLicense(f) => f.write(w),
        }
    }

    /// The record's password field, for kinds that have one.
    pub fn password(&self) -> Option<&PasswordField> {
        match self {
            Self::Login(f) => Some(&f.password),
            Self::DatabaseCredentials(f) => Some(&f.password),
            Self::ServerCredentials(f) => Some(&f.password),
            Self::BankCard(_) | Self::Photo(_) | Self::SoftwareLicense(_) => None,
        }
    }

    pub fn password_mut(&mut self) -> Option<&mut PasswordField> {
        match self {
            Self::Login(f) => Some(&mut f.password),
            Self::DatabaseCredentials(f) => Some(&mut f.password),
            Self::ServerCredentials(f) => Some(&mut f.password),
            Self::BankCard(_) | Self::Photo(_) | Self::SoftwareLicense(_) => None,
        }
    }
}

/// A vault record: identity, placement, labels and typed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    /// Globally unique, immutable once created. `None` until assigned.
    pub uid: Option<String>,
    /// Placement folder; required to create.
    pub folder_uid: Option<String>,
    pub title: String,
    pub notes: String,
    pub fields: RecordFields,
    /// Vault fields outside the schema, written back unchanged on update.
    pub unbound: UnboundFields,
}

impl SecretRecord {
    /// New record of the given type with no fields set.
    pub fn new(record_type: RecordType, title: &str) -> Self {
        Self {
            uid: None,
            folder_uid: None,
            title: title.to_string(),
            notes: String::new(),
            fields: RecordFields::empty(record_type),
            unbound: UnboundFields::default(),
        }
    }

    pub fn record_type(&self) -> RecordType {
        self.fields.record_type()
    }

    /// UID for messages; `<new>` before creation.
    pub fn display_uid(&self) -> &str {
        self.uid.as_deref().unwrap_or("<new>")
    }
}
