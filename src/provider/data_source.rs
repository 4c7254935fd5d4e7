//! Read-only lookup of an existing record (declarative `data` blocks).

use crate::client::{CallContext, RecordClient};
use crate::errors::{ProviderError, Result};
use crate::record::attrs::BlockReader;
use crate::record::{AttrMap, RecordType, SecretRecord};

/// How a data source locates its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceQuery {
    /// By UID (`path`), optionally checking the expected title.
    Uid { uid: String, title: Option<String> },
    /// By title within a folder.
    Title { folder_uid: String, title: String },
}

impl DataSourceQuery {
    /// Read a query from a `data` block: `path` (+ optional `title`), or
    /// `folder_uid` + `title`.
    pub fn from_attrs(attrs: &AttrMap) -> Result<Self> {
        let mut r = BlockReader::new("", attrs);
        let path = r.string("path")?;
        let folder_uid = r.string("folder_uid")?;
        let title = r.string("title")?;
        r.finish()?;

        match (path, folder_uid, title) {
            (Some(uid), None, title) => Ok(Self::Uid { uid, title }),
            (None, Some(folder_uid), Some(title)) => Ok(Self::Title { folder_uid, title }),
            (Some(_), Some(_), _) => Err(ProviderError::validation(
                "path",
                "conflicts with folder_uid; use one lookup",
            )),
            (None, Some(_), None) => Err(ProviderError::validation(
                "title",
                "is required when looking up by folder_uid",
            )),
            (None, None, _) => Err(ProviderError::validation(
                "path",
                "either path or folder_uid + title is required",
            )),
        }
    }
}

/// Fetch the record a data source refers to and check its type.
pub fn read_data_source<C>(
    client: &C,
    ctx: &CallContext,
    record_type: RecordType,
    query: &DataSourceQuery,
) -> Result<SecretRecord>
where
    C: RecordClient + ?Sized,
{
    let record = match query {
        DataSourceQuery::Uid { uid, title } => {
            let record = client.fetch(ctx, uid)?;
            if let Some(expected) = title {
                if &record.title != expected {
                    return Err(ProviderError::validation(
                        "title",
                        format!("record {uid} is titled '{}', not '{expected}'", record.title),
                    ));
                }
            }
            record
        }
        DataSourceQuery::Title { folder_uid, title } => {
            client.fetch_by_title(ctx, folder_uid, title)?
        }
    };

    if record.record_type() != record_type {
        return Err(ProviderError::validation(
            "type",
            format!(
                "record {} is '{}', expected '{record_type}'",
                record.display_uid(),
                record.record_type()
            ),
        ));
    }
    tracing::debug!(uid = record.display_uid(), %record_type, "data source read");
    Ok(record)
}
