//! [`FieldKey`]: the process-wide key protecting sensitive order fields.

use thiserror::Error;
use zeroize::Zeroizing;

use super::cipher::KEY_LEN;

/// Errors produced while loading key material.
#[derive(Debug, Error)]
pub enum KeyError {
    /// No key material was supplied.
    #[error("ENCRYPTION_KEY is required and must not be empty")]
    Missing,

    /// The key material decodes to the wrong number of bytes.
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// Fixed-size AES-256 key.
///
/// The buffer is zeroed when the last clone is dropped and is never printed,
/// not even through `Debug`.
#[derive(Clone)]
pub struct FieldKey(Zeroizing<[u8; KEY_LEN]>);

impl FieldKey {
    /// Build a key from exactly [`KEY_LEN`] raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] if the slice has the wrong length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != KEY_LEN {
            return Err(KeyError::InvalidLength(bytes.len()));
        }
        let mut buf = Zeroizing::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Parse key material as supplied through the environment.
    ///
    /// Accepts either exactly [`KEY_LEN`] raw bytes (a 32-character string used
    /// verbatim) or `2 * KEY_LEN` hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Missing`] for empty input and
    /// [`KeyError::InvalidLength`] for anything else that is not 32 bytes.
    pub fn parse(material: &str) -> Result<Self, KeyError> {
        if material.is_empty() {
            return Err(KeyError::Missing);
        }
        if material.len() == KEY_LEN {
            return Self::from_bytes(material.as_bytes());
        }
        if material.len() == KEY_LEN * 2 {
            if let Ok(decoded) = hex::decode(material) {
                let decoded = Zeroizing::new(decoded);
                return Self::from_bytes(&decoded);
            }
        }
        Err(KeyError::InvalidLength(material.len()))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl std::fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FieldKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_32_byte_string_accepted() {
        let key = FieldKey::parse("0123456789abcdefghijklmnopqrstuv").unwrap();
        assert_eq!(key.as_bytes(), b"0123456789abcdefghijklmnopqrstuv");
    }

    #[test]
    fn hex_64_char_string_accepted() {
        let key = FieldKey::parse(&"ab".repeat(KEY_LEN)).unwrap();
        assert!(key.as_bytes().iter().all(|b| *b == 0xab));
    }

    #[test]
    fn empty_is_missing() {
        assert!(matches!(FieldKey::parse(""), Err(KeyError::Missing)));
    }

    #[test]
    fn wrong_lengths_rejected() {
        assert!(matches!(
            FieldKey::parse("too-short"),
            Err(KeyError::InvalidLength(9))
        ));
        // 64 characters that are not hex.
        assert!(FieldKey::parse(&"zz".repeat(KEY_LEN)).is_err());
        assert!(FieldKey::from_bytes(&[0u8; 16]).is_err());
    }

    #[test]
    fn key_redacted_in_debug() {
        let key = FieldKey::from_bytes(&[0xFF; KEY_LEN]).unwrap();
        let printed = format!("{key:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("255"));
    }
}
