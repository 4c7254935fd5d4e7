//! AES-256-GCM authenticated encryption of record payloads.
//!
//! Each call to `encrypt` generates a fresh random 12-byte nonce and
//! prepends it to the ciphertext.  `decrypt` splits the nonce back out
//! before decrypting. The record UID is bound as associated data so a
//! payload cannot be replayed under a different record.
//!
//! Layout of the returned byte buffer:
//!   [ 12-byte nonce | ciphertext + 16-byte auth tag ]

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::errors::{ProviderError, Result};

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Encrypt `plaintext` with a 32-byte `key`, authenticating `aad`.
///
/// Returns the nonce prepended to the ciphertext (nonce || ciphertext).
pub fn encrypt(key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    // Key must be exactly 32 bytes.
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| ProviderError::Crypto(format!("invalid key length: {e}")))?;

    // Fresh nonce per payload; never reuse one under the same key.
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    // Seal the payload; the tag also covers the associated data.
    let ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| ProviderError::Crypto(format!("encryption error: {e}")))?;

    // Single blob: nonce first, then ciphertext and tag.
    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt data that was produced by `encrypt` with the same `aad`.
pub fn decrypt(key: &[u8], ciphertext_with_nonce: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    // Anything shorter cannot even hold the nonce.
    if ciphertext_with_nonce.len() < NONCE_LEN {
        return Err(ProviderError::Crypto("ciphertext too short".into()));
    }

    let (nonce_bytes, ciphertext) = ciphertext_with_nonce.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| ProviderError::Crypto(format!("invalid key length: {e}")))?;

    // Fails if the tag, the payload or the associated data was altered.
    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| {
            ProviderError::Crypto("record payload failed authentication (wrong app key?)".into())
        })
}
