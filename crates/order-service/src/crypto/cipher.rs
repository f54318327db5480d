//! Encryption and decryption of individual sensitive string fields.
//!
//! Two schemes share one colon-joined, lowercase-hex wire shape:
//!
//! ```text
//! cbc   <hex(iv, 16 bytes)>:<hex(ciphertext)>
//! aead  <hex(nonce, 12 bytes)>:<hex(ciphertext)>:<hex(tag, 16 bytes)>
//! ```
//!
//! `cbc` is AES-256-CBC with PKCS#7 padding. It has no integrity: a tampered
//! value usually fails padding validation, but some decrypt to garbage
//! without any signal.
//!
//! `aead` is AES-256-GCM-SIV. The tag binds nonce and ciphertext, so every
//! modification is detected.
//!
//! Decryption accepts both shapes regardless of the scheme configured for
//! new writes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256GcmSiv, Nonce,
};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use serde::Deserialize;
use thiserror::Error;

use super::key::{FieldKey, KeyError};

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of a CBC initialisation vector (one AES block).
pub const IV_LEN: usize = 16;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of an AES-GCM-SIV authentication tag.
pub const TAG_LEN: usize = 16;

const BLOCK_LEN: usize = 16;
const DELIMITER: char = ':';

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Cipher scheme used when writing new values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// AES-256-GCM-SIV, tag as a third segment.
    #[default]
    Aead,
    /// AES-256-CBC with PKCS#7 padding.
    Cbc,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Aead => "aead",
            Scheme::Cbc => "cbc",
        }
    }
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key material is missing or has the wrong length.
    #[error("cipher configuration invalid: {0}")]
    Configuration(#[from] KeyError),

    /// The wire value is not `iv:ciphertext` or `nonce:ciphertext:tag` hex.
    #[error("malformed encrypted field: {0}")]
    MalformedInput(&'static str),

    /// Padding, authentication tag, or UTF-8 validation failed after decryption.
    #[error("encrypted field failed integrity check")]
    Integrity,

    /// The AEAD primitive refused to seal the plaintext.
    #[error("failed to seal field")]
    Seal,
}

impl CryptoError {
    /// Short label for logs and span fields.
    pub fn kind(&self) -> &'static str {
        match self {
            CryptoError::Configuration(_) => "configuration",
            CryptoError::MalformedInput(_) => "malformed_input",
            CryptoError::Integrity => "integrity",
            CryptoError::Seal => "seal",
        }
    }
}

/// A parsed encrypted field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptedField {
    Cbc {
        iv: [u8; IV_LEN],
        ciphertext: Vec<u8>,
    },
    Aead {
        nonce: [u8; NONCE_LEN],
        ciphertext: Vec<u8>,
        tag: [u8; TAG_LEN],
    },
}

impl EncryptedField {
    /// Encode this value to its wire representation.
    pub fn to_wire(&self) -> String {
        match self {
            EncryptedField::Cbc { iv, ciphertext } => {
                format!("{}{DELIMITER}{}", hex::encode(iv), hex::encode(ciphertext))
            }
            EncryptedField::Aead {
                nonce,
                ciphertext,
                tag,
            } => format!(
                "{}{DELIMITER}{}{DELIMITER}{}",
                hex::encode(nonce),
                hex::encode(ciphertext),
                hex::encode(tag)
            ),
        }
    }

    /// Parse a wire value.
    ///
    /// The first colon separates the IV/nonce from the rest. A rest with one
    /// more colon is the authenticated shape; anything else with a colon in
    /// it cannot be hex and is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MalformedInput`] for a missing delimiter, extra
    /// segments, non-hex segments, wrong IV/nonce/tag lengths, or a CBC
    /// ciphertext that is empty or not block aligned.
    pub fn parse(s: &str) -> Result<Self, CryptoError> {
        let (head, rest) = s
            .split_once(DELIMITER)
            .ok_or(CryptoError::MalformedInput("missing delimiter"))?;

        match rest.split_once(DELIMITER) {
            None => {
                let iv = decode_fixed::<IV_LEN>(head, "iv")?;
                let ciphertext = decode_hex(rest, "ciphertext")?;
                if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
                    return Err(CryptoError::MalformedInput(
                        "ciphertext is not a whole number of blocks",
                    ));
                }
                Ok(EncryptedField::Cbc { iv, ciphertext })
            }
            Some((body, tail)) => {
                if tail.contains(DELIMITER) {
                    return Err(CryptoError::MalformedInput("too many segments"));
                }
                Ok(EncryptedField::Aead {
                    nonce: decode_fixed::<NONCE_LEN>(head, "nonce")?,
                    ciphertext: decode_hex(body, "ciphertext")?,
                    tag: decode_fixed::<TAG_LEN>(tail, "tag")?,
                })
            }
        }
    }
}

impl fmt::Display for EncryptedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl FromStr for EncryptedField {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn decode_hex(segment: &str, what: &'static str) -> Result<Vec<u8>, CryptoError> {
    hex::decode(segment).map_err(|_| CryptoError::MalformedInput(what))
}

fn decode_fixed<const N: usize>(segment: &str, what: &'static str) -> Result<[u8; N], CryptoError> {
    decode_hex(segment, what)?
        .try_into()
        .map_err(|_| CryptoError::MalformedInput(what))
}

/// Encrypts and decrypts sensitive fields under one process-wide key.
///
/// Cheap to clone; every clone shares the same key buffer. Safe to call from
/// any number of concurrent requests: each call draws its own IV and owns its
/// buffers.
#[derive(Clone, Debug)]
pub struct FieldCipher {
    key: Arc<FieldKey>,
    scheme: Scheme,
}

impl FieldCipher {
    /// Create a cipher that writes new values with `scheme`.
    pub fn new(key: FieldKey, scheme: Scheme) -> Self {
        Self {
            key: Arc::new(key),
            scheme,
        }
    }

    /// Parse `material` as key material and build a cipher.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Configuration`] if the key is absent or not 32 bytes.
    pub fn from_key_material(material: &str, scheme: Scheme) -> Result<Self, CryptoError> {
        Ok(Self::new(FieldKey::parse(material)?, scheme))
    }

    /// Scheme used for new writes.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Encrypt `plaintext` with the configured scheme and return the wire string.
    ///
    /// A fresh IV or nonce is drawn from the OS CSPRNG on every call, so the
    /// same plaintext never yields the same output twice.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Seal`] if the AEAD primitive rejects the input.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        self.seal(self.scheme, plaintext.as_bytes())
            .map(|field| field.to_wire())
    }

    /// Decrypt a wire string produced by either scheme.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MalformedInput`] if the wire string cannot be
    /// parsed and [`CryptoError::Integrity`] if padding, tag, or UTF-8
    /// validation fails.
    pub fn decrypt(&self, wire: &str) -> Result<String, CryptoError> {
        let field = EncryptedField::parse(wire)?;
        let plaintext = self.open(&field)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Integrity)
    }

    /// Encrypt raw bytes under an explicit scheme.
    pub fn seal(&self, scheme: Scheme, plaintext: &[u8]) -> Result<EncryptedField, CryptoError> {
        match scheme {
            Scheme::Cbc => {
                let mut iv = [0u8; IV_LEN];
                OsRng.fill_bytes(&mut iv);
                let ciphertext = Aes256CbcEnc::new_from_slices(self.key.as_bytes(), &iv)
                    .map_err(|_| KeyError::InvalidLength(self.key.as_bytes().len()))?
                    .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
                Ok(EncryptedField::Cbc { iv, ciphertext })
            }
            Scheme::Aead => {
                let cipher = self.aead()?;
                let mut nonce = [0u8; NONCE_LEN];
                OsRng.fill_bytes(&mut nonce);
                let mut ciphertext = cipher
                    .encrypt(Nonce::from_slice(&nonce), plaintext)
                    .map_err(|_| CryptoError::Seal)?;
                let tag = ciphertext.split_off(ciphertext.len() - TAG_LEN);
                let tag: [u8; TAG_LEN] = tag.try_into().map_err(|_| CryptoError::Seal)?;
                Ok(EncryptedField::Aead {
                    nonce,
                    ciphertext,
                    tag,
                })
            }
        }
    }

    /// Decrypt a parsed field back to raw bytes.
    pub fn open(&self, field: &EncryptedField) -> Result<Vec<u8>, CryptoError> {
        match field {
            EncryptedField::Cbc { iv, ciphertext } => {
                Aes256CbcDec::new_from_slices(self.key.as_bytes(), iv)
                    .map_err(|_| KeyError::InvalidLength(self.key.as_bytes().len()))?
                    .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                    .map_err(|_| CryptoError::Integrity)
            }
            EncryptedField::Aead {
                nonce,
                ciphertext,
                tag,
            } => {
                let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
                sealed.extend_from_slice(ciphertext);
                sealed.extend_from_slice(tag);
                self.aead()?
                    .decrypt(Nonce::from_slice(nonce), sealed.as_slice())
                    .map_err(|_| CryptoError::Integrity)
            }
        }
    }

    fn aead(&self) -> Result<Aes256GcmSiv, CryptoError> {
        Aes256GcmSiv::new_from_slice(self.key.as_bytes())
            .map_err(|_| KeyError::InvalidLength(self.key.as_bytes().len()).into())
    }
}
