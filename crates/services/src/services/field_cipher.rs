//! AES-256-GCM encryption of free-text fields.
//!
//! Wire format: `base64(IV[12] || ciphertext || tag[16])`, standard alphabet
//! with padding.

use std::fmt;

use aes_gcm::{
    Aes256Gcm, Key,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

pub const ENCRYPTION_KEY_ENV: &str = "ENCRYPTION_KEY";
pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecryptionFailure {
    #[error("payload is not valid base64")]
    MalformedBase64,
    #[error("payload too short to hold an IV and ciphertext")]
    PayloadTooShort,
    #[error("authentication failed")]
    Authentication,
    #[error("plaintext is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("encryption key not configured: {0} is not set")]
    Configuration(&'static str),
    #[error("decryption failed: {0}")]
    Decryption(#[from] DecryptionFailure),
    #[error("encryption failed")]
    Encryption,
}

/// Two fields encrypted independently, each with its own IV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPair {
    pub encrypted_title: String,
    pub encrypted_action_hint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PlainPair {
    pub title: String,
    pub action_hint: String,
}

pub struct FieldCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCipher").finish_non_exhaustive()
    }
}

impl FieldCipher {
    pub fn new(secret: &str) -> Self {
        let key = derive_key(secret);
        Self {
            cipher: Aes256Gcm::new(&Key::<Aes256Gcm>::from(key)),
        }
    }

    /// Build from `ENCRYPTION_KEY` as returned by `lookup`. An unset or blank
    /// value is a configuration error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CipherError>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(ENCRYPTION_KEY_ENV)
            .filter(|secret| !secret.trim().is_empty())
            .map(|secret| Self::new(&secret))
            .ok_or(CipherError::Configuration(ENCRYPTION_KEY_ENV))
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::Encryption)?;

        let mut payload = Vec::with_capacity(IV_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(payload))
    }

    pub fn decrypt(&self, field: &str) -> Result<String, CipherError> {
        let payload = STANDARD
            .decode(field)
            .map_err(|_| DecryptionFailure::MalformedBase64)?;
        if payload.len() <= IV_LEN {
            return Err(DecryptionFailure::PayloadTooShort.into());
        }

        let (iv, ciphertext) = payload.split_at(IV_LEN);
        let iv: [u8; IV_LEN] = iv
            .try_into()
            .map_err(|_| DecryptionFailure::PayloadTooShort)?;
        let plaintext = self
            .cipher
            .decrypt(&iv.into(), ciphertext)
            .map_err(|_| DecryptionFailure::Authentication)?;

        String::from_utf8(plaintext).map_err(|_| DecryptionFailure::InvalidUtf8.into())
    }

    pub fn encrypt_pair(&self, title: &str, action_hint: &str) -> Result<EncryptedPair, CipherError> {
        Ok(EncryptedPair {
            encrypted_title: self.encrypt(title)?,
            encrypted_action_hint: self.encrypt(action_hint)?,
        })
    }

    pub fn decrypt_pair(&self, pair: &EncryptedPair) -> Result<PlainPair, CipherError> {
        Ok(PlainPair {
            title: self.decrypt(&pair.encrypted_title)?,
            action_hint: self.decrypt(&pair.encrypted_action_hint)?,
        })
    }
}

/// Key bytes for `secret`: its UTF-8 bytes right-padded with ASCII `'0'` to 32
/// bytes, then cut to exactly 32. Existing ciphertext depends on this exact
/// scheme, so it must not be replaced by a real KDF without a migration.
pub fn derive_key(secret: &str) -> [u8; KEY_LEN] {
    let mut key = [b'0'; KEY_LEN];
    let bytes = secret.as_bytes();
    let len = bytes.len().min(KEY_LEN);
    key[..len].copy_from_slice(&bytes[..len]);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> FieldCipher {
        FieldCipher::new("correct horse battery staple")
    }

    #[test]
    fn unset_or_blank_key_is_a_configuration_error() {
        for value in [None, Some(""), Some("   ")] {
            let err = FieldCipher::from_lookup(|_| value.map(str::to_string)).unwrap_err();
            assert_eq!(err, CipherError::Configuration(ENCRYPTION_KEY_ENV));
        }

        let from_lookup = FieldCipher::from_lookup(|key| {
            (key == ENCRYPTION_KEY_ENV).then(|| "correct horse battery staple".to_string())
        })
        .unwrap();
        let field = from_lookup.encrypt("same key").unwrap();
        assert_eq!(cipher().decrypt(&field).unwrap(), "same key");
    }

    #[test]
    fn short_secrets_are_padded_with_ascii_zero() {
        let key = derive_key("abc");
        assert_eq!(&key[..3], b"abc");
        assert!(key[3..].iter().all(|b| *b == b'0'));
    }

    #[test]
    fn long_secrets_are_truncated() {
        let secret = "0123456789abcdefghijklmnopqrstuvwxyz";
        assert_eq!(&derive_key(secret), b"0123456789abcdefghijklmnopqrstuv");
        assert_eq!(derive_key(""), [b'0'; KEY_LEN]);
    }

    #[test]
    fn round_trips_assorted_text() {
        let cipher = cipher();
        let long = "quest ".repeat(400);
        for text in ["", "Slay the laundry dragon", "🐉 Drachen zähmen ✨", long.as_str()] {
            let field = cipher.encrypt(text).unwrap();
            assert_eq!(cipher.decrypt(&field).unwrap(), text);
        }
        assert!(long.len() > 1000);
    }

    #[test]
    fn payload_layout_is_iv_then_ciphertext_and_tag() {
        let field = cipher().encrypt("hello").unwrap();
        let payload = STANDARD.decode(field).unwrap();
        assert_eq!(payload.len(), IV_LEN + "hello".len() + 16);
    }

    #[test]
    fn encryption_is_randomised() {
        let cipher = cipher();
        let a = cipher.encrypt("same text").unwrap();
        let b = cipher.encrypt("same text").unwrap();
        assert_ne!(a, b);
        assert_eq!(cipher.decrypt(&a).unwrap(), "same text");
        assert_eq!(cipher.decrypt(&b).unwrap(), "same text");
    }

    #[test]
    fn any_flipped_bit_is_detected() {
        let cipher = cipher();
        let payload = STANDARD.decode(cipher.encrypt("tamper me").unwrap()).unwrap();
        for byte in 0..payload.len() {
            for bit in 0..8 {
                let mut tampered = payload.clone();
                tampered[byte] ^= 1 << bit;
                let err = cipher.decrypt(&STANDARD.encode(&tampered)).unwrap_err();
                assert_eq!(
                    err,
                    CipherError::Decryption(DecryptionFailure::Authentication),
                    "byte {byte} bit {bit}"
                );
            }
        }
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let field = cipher().encrypt("secret plans").unwrap();
        let other = FieldCipher::new("a different secret");
        assert_eq!(
            other.decrypt(&field).unwrap_err(),
            CipherError::Decryption(DecryptionFailure::Authentication)
        );
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        let cipher = cipher();
        assert_eq!(
            cipher.decrypt("not base64!!").unwrap_err(),
            CipherError::Decryption(DecryptionFailure::MalformedBase64)
        );
        assert_eq!(
            cipher.decrypt(&STANDARD.encode([7u8; IV_LEN])).unwrap_err(),
            CipherError::Decryption(DecryptionFailure::PayloadTooShort)
        );
        assert_eq!(
            cipher.decrypt("").unwrap_err(),
            CipherError::Decryption(DecryptionFailure::PayloadTooShort)
        );
        assert_eq!(
            cipher.decrypt(&STANDARD.encode([7u8; IV_LEN + 4])).unwrap_err(),
            CipherError::Decryption(DecryptionFailure::Authentication)
        );
    }

    #[test]
    fn pair_fields_use_independent_ivs() {
        let cipher = cipher();
        let pair = cipher.encrypt_pair("same", "same").unwrap();
        assert_ne!(pair.encrypted_title, pair.encrypted_action_hint);

        let iv = |field: &str| STANDARD.decode(field).unwrap()[..IV_LEN].to_vec();
        assert_ne!(iv(&pair.encrypted_title), iv(&pair.encrypted_action_hint));

        let plain = cipher.decrypt_pair(&pair).unwrap();
        assert_eq!(plain, PlainPair { title: "same".into(), action_hint: "same".into() });
    }

    #[test]
    fn pair_fails_if_either_field_fails() {
        let cipher = cipher();
        let mut pair = cipher.encrypt_pair("title", "hint").unwrap();
        pair.encrypted_action_hint = "garbage".to_string();
        assert!(matches!(
            cipher.decrypt_pair(&pair),
            Err(CipherError::Decryption(_))
        ));
    }

    #[test]
    fn debug_output_hides_key() {
        let rendered = format!("{:?}", FieldCipher::new("super-secret-value"));
        assert!(!rendered.contains("super-secret"));
    }
}
