//! Vault credential blob.
//!
//! The credential is base64 of a small JSON object:
//! `{"hostname": "...", "clientId": "...", "appKey": "<base64 32 bytes>"}`.
//! It is parsed once when the client is built. The app key lives in a
//! zeroize-on-drop wrapper and `Debug` never prints it.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::keys::KEY_LEN;
use crate::crypto::AppKey;
use crate::errors::{ProviderError, Result};

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCredential {
    hostname: String,
    client_id: String,
    app_key: String,
}

/// Parsed credential: vault host, client id and app key.
#[derive(Clone)]
pub struct Credential {
    hostname: String,
    client_id: String,
    app_key: AppKey,
}

impl Credential {
    /// Parse a base64 credential blob.
    pub fn parse(blob: &str) -> Result<Self> {
        let json = Zeroizing::new(
            BASE64
                .decode(blob.trim())
                .map_err(|e| ProviderError::Credential(format!("not valid base64: {e}")))?,
        );
        let mut raw: RawCredential = serde_json::from_slice(&json)
            .map_err(|e| ProviderError::Credential(format!("not a credential object: {e}")))?;

        let app_key = AppKey::from_base64(&raw.app_key);
        raw.app_key.zeroize();

        if raw.hostname.trim().is_empty() {
            return Err(ProviderError::Credential("hostname is empty".into()));
        }
        if raw.client_id.trim().is_empty() {
            return Err(ProviderError::Credential("clientId is empty".into()));
        }

        Ok(Self {
            hostname: raw.hostname,
            client_id: raw.client_id,
            app_key: app_key?,
        })
    }

    /// Build the base64 blob for a host, client id and raw app key.
    pub fn encode(hostname: &str, client_id: &str, app_key: &[u8; KEY_LEN]) -> Result<String> {
        let raw = RawCredential {
            hostname: hostname.to_string(),
            client_id: client_id.to_string(),
            app_key: BASE64.encode(app_key),
        };
        let json = Zeroizing::new(
            serde_json::to_vec(&raw)
                .map_err(|e| ProviderError::Serialization(format!("credential: {e}")))?,
        );
        Ok(BASE64.encode(&*json))
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn app_key(&self) -> &AppKey {
        &self.app_key
    }

    /// Point the credential at a different vault host.
    pub fn with_hostname(mut self, hostname: &str) -> Self {
        self.hostname = hostname.to_string();
        self
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("hostname", &self.hostname)
            .field("client_id", &self.client_id)
            .field("app_key", &"<redacted>")
            .finish()
    }
}
