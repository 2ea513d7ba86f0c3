//! Encryption at rest for stored settings secrets (e.g. the SMTP password).
//!
//! AES-256-GCM with a random 12-byte nonce prepended to the ciphertext; the
//! result is stored as unpadded base64url text.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Nonce length for AES-GCM.
const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Encryption failed")]
    Encrypt,

    #[error("Decryption failed")]
    Decrypt,

    #[error("Ciphertext is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Ciphertext is too short")]
    Truncated,

    #[error("Decrypted value is not UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Symmetric cipher for settings values, keyed once at startup.
#[derive(Clone)]
pub struct SettingsCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SettingsCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SettingsCipher([REDACTED])")
    }
}

impl SettingsCipher {
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Encrypt a UTF-8 value into storable text.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        Ok(URL_SAFE_NO_PAD.encode([nonce_bytes.as_slice(), &ciphertext].concat()))
    }

    /// Reverse [`SettingsCipher::encrypt`].
    pub fn decrypt(&self, stored: &str) -> Result<String, CryptoError> {
        let data = URL_SAFE_NO_PAD.decode(stored)?;
        if data.len() <= NONCE_LEN {
            return Err(CryptoError::Truncated);
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Decrypt)?;
        Ok(String::from_utf8(plaintext)?)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const KEY: [u8; 32] = [7u8; 32];

    #[test]
    fn encrypt_then_decrypt_recovers_value() {
        let cipher = SettingsCipher::new(&KEY);
        let stored = cipher.encrypt("smtp-password").unwrap();
        assert_ne!(stored, "smtp-password");
        assert_eq!(cipher.decrypt(&stored).unwrap(), "smtp-password");
    }

    #[test]
    fn nonces_make_ciphertexts_differ() {
        let cipher = SettingsCipher::new(&KEY);
        assert_ne!(cipher.encrypt("same").unwrap(), cipher.encrypt("same").unwrap());
    }

    #[test]
    fn wrong_key_fails() {
        let stored = SettingsCipher::new(&KEY).encrypt("secret").unwrap();
        let other = SettingsCipher::new(&[9u8; 32]);
        assert_matches!(other.decrypt(&stored), Err(CryptoError::Decrypt));
    }

    #[test]
    fn garbage_input_is_rejected() {
        let cipher = SettingsCipher::new(&KEY);
        assert_matches!(cipher.decrypt("!!!"), Err(CryptoError::Encoding(_)));
        assert_matches!(cipher.decrypt("AAAA"), Err(CryptoError::Truncated));
    }
}
