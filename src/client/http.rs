//! HTTP implementation of `RecordClient` over the vault REST API.
//!
//! Record data never leaves this process in the clear: the wire JSON of a
//! record is sealed with AES-256-GCM under a per-record key derived from
//! the app key and the record UID, and travels base64-encoded. Every
//! request is signed with HMAC-SHA256 over method, path, timestamp and body.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use ureq::http::Response;
use ureq::{Agent, Body, RequestBuilder};
use zeroize::Zeroizing;

use super::credential::Credential;
use super::{select_by_title, CallContext, RecordClient};
use crate::crypto::{self, generate_uid};
use crate::errors::{ProviderError, Result};
use crate::record::wire;
use crate::record::SecretRecord;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// An encrypted record as exchanged with the vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncryptedRecord {
    record_uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    folder_uid: Option<String>,
    /// base64(nonce || ciphertext) of the record's wire JSON.
    data: String,
}

#[derive(Debug, Deserialize)]
struct RecordList {
    #[serde(default)]
    records: Vec<EncryptedRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    record_uid: Option<String>,
}

/// Blocking vault client backed by a shared `ureq` agent.
pub struct HttpRecordClient {
    agent: Agent,
    base_url: String,
    credential: Credential,
    timeout: Duration,
}

impl HttpRecordClient {
    pub fn new(credential: Credential, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        let base_url = format!("https://{}/api/rest/sm/v1", credential.hostname());
        Self {
            agent,
            base_url,
            credential,
            timeout,
        }
    }

    /// Override the API base URL (e.g. a local test server).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn seal(&self, uid: &str, folder_uid: Option<&str>, record: &SecretRecord) -> Result<EncryptedRecord> {
        let plaintext = Zeroizing::new(wire::serialize(&wire::to_wire(record))?);
        let key = Zeroizing::new(self.credential.app_key().derive_record_key(uid)?);
        let sealed = crypto::encrypt(&*key, &plaintext, uid.as_bytes())?;
        Ok(EncryptedRecord {
            record_uid: uid.to_string(),
            folder_uid: folder_uid.map(str::to_string),
            data: BASE64.encode(sealed),
        })
    }

    fn open(&self, encrypted: &EncryptedRecord) -> Result<SecretRecord> {
        let uid = encrypted.record_uid.as_str();
        let sealed = BASE64.decode(&encrypted.data).map_err(|e| {
            ProviderError::UnexpectedResponse {
                operation: "decode",
                message: format!("record '{uid}' data is not base64: {e}"),
            }
        })?;
        let key = Zeroizing::new(self.credential.app_key().derive_record_key(uid)?);
        let plaintext = Zeroizing::new(crypto::decrypt(&*key, &sealed, uid.as_bytes())?);
        wire::from_wire(uid, encrypted.folder_uid.as_deref(), &wire::parse(&plaintext)?)
    }

    fn signed<B>(
        &self,
        request: RequestBuilder<B>,
        method: &str,
        path: &str,
        body: &[u8],
        timeout: Duration,
    ) -> Result<RequestBuilder<B>> {
        let timestamp = chrono::Utc::now().timestamp();
        let signature = self
            .credential
            .app_key()
            .sign_request(method, path, timestamp, body)?;
        Ok(request
            .header("X-Ksm-Client-Id", self.credential.client_id())
            .header("X-Ksm-Timestamp", timestamp.to_string())
            .header("X-Ksm-Signature", signature)
            .header("Content-Type", "application/json")
            .config()
            .timeout_global(Some(timeout))
            .build())
    }

    /// Send one signed request and map non-success statuses to errors.
    fn send(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        method: &str,
        path: &str,
        uid: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Response<Body>> {
        let timeout = ctx
            .remaining(operation)?
            .map_or(self.timeout, |left| left.min(self.timeout));
        let url = format!("{}/{}", self.base_url, path);
        let body = body.unwrap_or_default();

        tracing::debug!(operation, method, path, "vault request");

        let result = match method {
            "GET" => self
                .signed(self.agent.get(&url), method, path, &body, timeout)?
                .call(),
            "DELETE" => self
                .signed(self.agent.delete(&url), method, path, &body, timeout)?
                .call(),
            "POST" => self
                .signed(self.agent.post(&url), method, path, &body, timeout)?
                .send(&body[..]),
            "PUT" => self
                .signed(self.agent.put(&url), method, path, &body, timeout)?
                .send(&body[..]),
            other => {
                return Err(ProviderError::UnexpectedResponse {
                    operation,
                    message: format!("unsupported method {other}"),
                })
            }
        };

        let response = result.map_err(|e| transport_error(operation, e))?;
        let status = response.status().as_u16();
        if (200..300).contains(&status) {
            Ok(response)
        } else {
            Err(status_error(operation, status, uid))
        }
    }
}

/// Map an HTTP status outside 2xx to the error taxonomy.
fn status_error(operation: &'static str, status: u16, uid: &str) -> ProviderError {
    match status {
        401 | 403 => ProviderError::Auth {
            operation,
            message: format!("HTTP {status}"),
        },
        404 => ProviderError::NotFound {
            uid: uid.to_string(),
            operation,
        },
        408 | 429 | 500..=599 => ProviderError::Transient {
            operation,
            message: format!("HTTP {status}"),
        },
        _ => ProviderError::UnexpectedResponse {
            operation,
            message: format!("HTTP {status}"),
        },
    }
}

/// Map a transport failure; connection-level problems are retryable.
fn transport_error(operation: &'static str, err: ureq::Error) -> ProviderError {
    match err {
        ureq::Error::Timeout(_)
        | ureq::Error::Io(_)
        | ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound => ProviderError::Transient {
            operation,
            message: err.to_string(),
        },
        other => ProviderError::UnexpectedResponse {
            operation,
            message: other.to_string(),
        },
    }
}

fn read_json<T: serde::de::DeserializeOwned>(
    operation: &'static str,
    mut response: Response<Body>,
) -> Result<T> {
    response
        .body_mut()
        .read_json::<T>()
        .map_err(|e| ProviderError::UnexpectedResponse {
            operation,
            message: format!("invalid response body: {e}"),
        })
}

fn to_body(operation: &'static str, value: &impl Serialize) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| ProviderError::Serialization(format!("{operation}: {e}")))
}

impl RecordClient for HttpRecordClient {
    fn fetch(&self, ctx: &CallContext, uid: &str) -> Result<SecretRecord> {
        let path = format!("records/{uid}");
        let response = self.send(ctx, "fetch", "GET", &path, uid, None)?;
        let encrypted: EncryptedRecord = read_json("fetch", response)?;
        if encrypted.record_uid != uid {
            return Err(ProviderError::UnexpectedResponse {
                operation: "fetch",
                message: format!("asked for '{uid}', got '{}'", encrypted.record_uid),
            });
        }
        self.open(&encrypted)
    }

    fn fetch_by_title(
        &self,
        ctx: &CallContext,
        folder_uid: &str,
        title: &str,
    ) -> Result<SecretRecord> {
        let path = format!("folders/{folder_uid}/records");
        let response = self.send(ctx, "fetch_by_title", "GET", &path, folder_uid, None)?;
        let list: RecordList = read_json("fetch_by_title", response)?;
        let records = list
            .records
            .iter()
            .map(|r| self.open(r))
            .collect::<Result<Vec<_>>>()?;
        select_by_title(records, folder_uid, title)
    }

    fn create(&self, ctx: &CallContext, folder_uid: &str, record: &SecretRecord) -> Result<String> {
        let uid = record.uid.clone().unwrap_or_else(generate_uid);
        let body = to_body("create", &self.seal(&uid, Some(folder_uid), record)?)?;
        let path = format!("folders/{folder_uid}/records");

        tracing::info!(uid = %uid, folder_uid, "creating record");
        let response = self.send(ctx, "create", "POST", &path, &uid, Some(body))?;
        let confirmed: CreateResponse = read_json("create", response)?;
        match confirmed.record_uid {
            Some(returned) if returned == uid => Ok(returned),
            Some(returned) => Err(ProviderError::UnexpectedResponse {
                operation: "create",
                message: format!("vault confirmed '{returned}' instead of '{uid}'"),
            }),
            None => Err(ProviderError::UnexpectedResponse {
                operation: "create",
                message: format!("vault did not confirm record '{uid}'"),
            }),
        }
    }

    fn update(&self, ctx: &CallContext, uid: &str, record: &SecretRecord) -> Result<()> {
        let body = to_body("update", &self.seal(uid, record.folder_uid.as_deref(), record)?)?;
        let path = format!("records/{uid}");
        tracing::info!(uid, "updating record");
        self.send(ctx, "update", "PUT", &path, uid, Some(body))?;
        Ok(())
    }

    fn delete(&self, ctx: &CallContext, uid: &str) -> Result<()> {
        let path = format!("records/{uid}");
        tracing::info!(uid, "deleting record");
        self.send(ctx, "delete", "DELETE", &path, uid, None)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::KEY_LEN;
    use crate::record::{Field, RecordFields, RecordType};

    fn client() -> HttpRecordClient {
        let blob = Credential::encode("vault.example", "client-1", &[3u8; KEY_LEN]).unwrap();
        HttpRecordClient::new(Credential::parse(&blob).unwrap(), DEFAULT_TIMEOUT)
    }

    fn login_record() -> SecretRecord {
        let mut record = SecretRecord::new(RecordType::Login, "web");
        if let RecordFields::Login(f) = &mut record.fields {
            f.login = Field::new("admin".to_string());
        }
        record
    }

    #[test]
    fn base_url_uses_credential_host() {
        assert_eq!(client().base_url, "https://vault.example/api/rest/sm/v1");
        let local = client().with_base_url("http://127.0.0.1:8080/");
        assert_eq!(local.base_url, "http://127.0.0.1:8080");
    }

    #[test]
    fn sealed_record_opens_to_the_same_record() {
        let c = client();
        let sealed = c.seal("uid-1", Some("folder-1"), &login_record()).unwrap();
        assert!(!sealed.data.contains("admin"));

        let opened = c.open(&sealed).unwrap();
        let mut expected = login_record();
        expected.uid = Some("uid-1".into());
        expected.folder_uid = Some("folder-1".into());
        assert_eq!(opened, expected);
    }

    #[test]
    fn sealed_record_is_bound_to_its_uid() {
        let c = client();
        let mut sealed = c.seal("uid-1", None, &login_record()).unwrap();
        sealed.record_uid = "uid-2".into();
        assert!(matches!(c.open(&sealed), Err(ProviderError::Crypto(_))));
    }

    #[test]
    fn statuses_map_to_taxonomy() {
        assert!(matches!(status_error("fetch", 401, "u"), ProviderError::Auth { .. }));
        assert!(matches!(status_error("fetch", 403, "u"), ProviderError::Auth { .. }));
        assert!(status_error("fetch", 404, "u").is_not_found());
        assert!(status_error("fetch", 429, "u").is_retryable());
        assert!(status_error("fetch", 503, "u").is_retryable());
        assert!(matches!(
            status_error("fetch", 418, "u"),
            ProviderError::UnexpectedResponse { .. }
        ));
    }

    #[test]
    fn cancelled_context_sends_nothing() {
        let ctx = CallContext::new();
        ctx.cancel();
        let err = client().fetch(&ctx, "uid-1").unwrap_err();
        assert!(matches!(err, ProviderError::Cancelled("fetch")));
    }
}
