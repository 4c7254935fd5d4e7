//! Key handling derived from the application key in the credential.
//!
//! From the single app key we derive:
//! - A unique **per-record** encryption key for each record UID (HKDF).
//! - Request signatures over method, path, timestamp and body (HMAC).
//!
//! Record UIDs are also generated here: 16 random bytes, base64url
//! without padding, the format the vault uses.

use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD};
use base64::Engine;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::errors::{ProviderError, Result};

/// Length of the app key and derived sub-keys (256 bits).
pub const KEY_LEN: usize = 32;

/// Number of random bytes in a record UID.
const UID_BYTES: usize = 16;

/// The application key from the credential blob, zeroed on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct AppKey {
    bytes: [u8; KEY_LEN],
}

impl AppKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Parse a base64-encoded 32-byte key.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let mut raw = BASE64
            .decode(encoded.trim())
            .or_else(|_| URL_SAFE_NO_PAD.decode(encoded.trim()))
            .map_err(|e| ProviderError::Credential(format!("appKey is not base64: {e}")))?;

        let result = <[u8; KEY_LEN]>::try_from(raw.as_slice())
            .map(Self::new)
            .map_err(|_| {
                ProviderError::Credential(format!(
                    "appKey must be {KEY_LEN} bytes, got {}",
                    raw.len()
                ))
            });
        raw.zeroize();
        result
    }

    /// Derive the encryption key for one record.
    ///
    /// `info` is `"ksm-record:<uid>"` so every record gets its own key.
    pub fn derive_record_key(&self, uid: &str) -> Result<[u8; KEY_LEN]> {
        let info = format!("ksm-record:{uid}");
        let hk = Hkdf::<Sha256>::new(None, &self.bytes);

        let mut okm = [0u8; KEY_LEN];
        hk.expand(info.as_bytes(), &mut okm)
            .map_err(|e| ProviderError::Crypto(format!("HKDF expand failed: {e}")))?;
        Ok(okm)
    }

    /// Sign a request: base64 HMAC-SHA256 over `method \n path \n timestamp \n body`.
    pub fn sign_request(&self, method: &str, path: &str, timestamp: i64, body: &[u8]) -> Result<String> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.bytes)
            .map_err(|e| ProviderError::Crypto(format!("HMAC init failed: {e}")))?;
        mac.update(method.as_bytes());
        mac.update(b"\n");
        mac.update(path.as_bytes());
        mac.update(b"\n");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b"\n");
        mac.update(body);
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for AppKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AppKey(<redacted>)")
    }
}

/// Generate a fresh record UID.
pub fn generate_uid() -> String {
    let mut bytes = [0u8; UID_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
