//! AES-256-GCM encryption for cookie jar blobs (§4.B): nonce || ciphertext ||
//! tag, hex-encoded on disk. Nonces are per-encryption and uniformly random.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use ytd_core::CoreError;

const NONCE_LEN: usize = 12;

pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<String, CoreError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CoreError::Internal(format!("invalid encryption key: {e}")))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CoreError::Internal(format!("encryption failed: {e}")))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);

    Ok(hex::encode(out))
}

pub fn decrypt(key: &[u8; 32], hex_blob: &str) -> Result<Vec<u8>, CoreError> {
    let raw = hex::decode(hex_blob.trim())
        .map_err(|_| CoreError::DecryptFailed)?;
    if raw.len() < NONCE_LEN {
        return Err(CoreError::DecryptFailed);
    }

    let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CoreError::DecryptFailed)?;
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CoreError::DecryptFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_plaintext() {
        let key = [7u8; 32];
        let blob = encrypt(&key, b"cookie jar contents").unwrap();
        let decrypted = decrypt(&key, &blob).unwrap();
        assert_eq!(decrypted, b"cookie jar contents");
    }

    #[test]
    fn nonces_differ_between_encryptions() {
        let key = [7u8; 32];
        let a = encrypt(&key, b"same plaintext").unwrap();
        let b = encrypt(&key, b"same plaintext").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn decrypt_fails_with_wrong_key() {
        let blob = encrypt(&[1u8; 32], b"secret").unwrap();
        assert!(matches!(decrypt(&[2u8; 32], &blob), Err(CoreError::DecryptFailed)));
    }

    #[test]
    fn decrypt_fails_on_truncated_blob() {
        assert!(matches!(decrypt(&[1u8; 32], "ab"), Err(CoreError::DecryptFailed)));
    }
}
