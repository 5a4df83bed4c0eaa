//! Photo Vault - AEAD Encryption
//!
//! Passphrase-sealed AES-256-GCM envelopes. Every seal draws a fresh salt and
//! IV, so two envelopes of the same plaintext never compare equal.
//!
//! Binary form (photo payloads):
//! ```text
//! [MAGIC 4B]["PVE1"]
//! [VERSION 1B][0x01]
//! [SALT 16B][random]
//! [IV 12B][random]
//! [CIPHERTEXT variable][AES-256-GCM encrypted]
//! [TAG 16B][GCM auth tag]
//! ```
//!
//! Text form (configuration, local storage):
//! `{"algorithm":"AES-256-GCM","ciphertext":"..","iv":"..","salt":".."}`
//! with standard base64 fields.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::keys::{derive_content_key, generate_salt, PBKDF2_ITERATIONS, SALT_LEN};
use crate::config::Configuration;
use crate::error::{VaultError, VaultResult};

/// IV length for AES-GCM
pub const IV_LEN: usize = 12;

/// GCM authentication tag length, carried at the end of the ciphertext
pub const TAG_LEN: usize = 16;

/// Magic bytes identifying a binary envelope
const MAGIC: &[u8; 4] = b"PVE1";

/// Current binary format version
const VERSION: u8 = 0x01;

/// MAGIC(4) + VERSION(1) + SALT(16) + IV(12)
const HEADER_LEN: usize = 4 + 1 + SALT_LEN + IV_LEN;

/// Envelope algorithm identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// AES-256-GCM keyed by PBKDF2-HMAC-SHA256
    Aes256Gcm,
}

impl Algorithm {
    /// Identifier persisted alongside the envelope
    pub fn id(&self) -> &'static str {
        match self {
            Algorithm::Aes256Gcm => "AES-256-GCM",
        }
    }

    /// Parse a persisted identifier
    pub fn from_id(id: &str) -> VaultResult<Self> {
        match id {
            "AES-256-GCM" => Ok(Algorithm::Aes256Gcm),
            other => Err(VaultError::UnsupportedPrimitive(format!(
                "envelope algorithm {}",
                other
            ))),
        }
    }
}

/// Self-describing encrypted payload.
///
/// Decryption needs only this value and the passphrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionEnvelope {
    pub algorithm: Algorithm,
    pub salt: [u8; SALT_LEN],
    pub iv: [u8; IV_LEN],
    /// Ciphertext with the 16-byte tag appended
    pub ciphertext: Vec<u8>,
}

/// Persisted text form
#[derive(Serialize, Deserialize)]
struct TextEnvelope {
    algorithm: String,
    ciphertext: String,
    iv: String,
    salt: String,
}

impl EncryptionEnvelope {
    /// Serialize to the binary form
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Parse the binary form
    pub fn from_bytes(data: &[u8]) -> VaultResult<Self> {
        if data.len() < 5 || &data[0..4] != MAGIC {
            return Err(VaultError::UnsupportedPrimitive("not a vault envelope".into()));
        }

        if data[4] != VERSION {
            return Err(VaultError::UnsupportedPrimitive(format!(
                "envelope version {}",
                data[4]
            )));
        }

        if data.len() < HEADER_LEN + TAG_LEN {
            return Err(VaultError::MalformedEnvelope(format!(
                "{} bytes is too short",
                data.len()
            )));
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&data[5..5 + SALT_LEN]);
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&data[5 + SALT_LEN..HEADER_LEN]);

        Ok(Self {
            algorithm: Algorithm::Aes256Gcm,
            salt,
            iv,
            ciphertext: data[HEADER_LEN..].to_vec(),
        })
    }

    /// Serialize to the text form
    pub fn to_text(&self) -> VaultResult<String> {
        let text = TextEnvelope {
            algorithm: self.algorithm.id().to_string(),
            ciphertext: STANDARD.encode(&self.ciphertext),
            iv: STANDARD.encode(self.iv),
            salt: STANDARD.encode(self.salt),
        };
        Ok(serde_json::to_string(&text)?)
    }

    /// Parse the text form
    pub fn from_text(text: &str) -> VaultResult<Self> {
        let parsed: TextEnvelope = serde_json::from_str(text)
            .map_err(|e| VaultError::MalformedEnvelope(e.to_string()))?;

        let algorithm = Algorithm::from_id(&parsed.algorithm)?;
        let salt = decode_fixed::<SALT_LEN>("salt", &parsed.salt)?;
        let iv = decode_fixed::<IV_LEN>("iv", &parsed.iv)?;
        let ciphertext = STANDARD.decode(parsed.ciphertext.as_bytes())?;

        if ciphertext.len() < TAG_LEN {
            return Err(VaultError::MalformedEnvelope("ciphertext shorter than tag".into()));
        }

        Ok(Self {
            algorithm,
            salt,
            iv,
            ciphertext,
        })
    }
}

fn decode_fixed<const N: usize>(field: &str, value: &str) -> VaultResult<[u8; N]> {
    let bytes = STANDARD.decode(value.as_bytes())?;
    bytes.as_slice().try_into().map_err(|_| {
        VaultError::MalformedEnvelope(format!(
            "{} must be {} bytes, got {}",
            field,
            N,
            bytes.len()
        ))
    })
}

/// Generate a random IV for AES-GCM
pub fn generate_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}

// ═══════════════════════════════════════════════════════════════════════════
// SEAL / OPEN
// ═══════════════════════════════════════════════════════════════════════════

/// Encrypt bytes under a passphrase with a fresh salt and IV
pub fn seal(plaintext: &[u8], passphrase: &str) -> VaultResult<EncryptionEnvelope> {
    let salt = generate_salt();
    let iv = generate_iv();
    let key = derive_content_key(passphrase, &salt, PBKDF2_ITERATIONS)?;

    let cipher = Aes256Gcm::new_from_slice(key.expose())
        .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

    Ok(EncryptionEnvelope {
        algorithm: Algorithm::Aes256Gcm,
        salt,
        iv,
        ciphertext,
    })
}

/// Decrypt an envelope.
///
/// Wrong passphrase and tampered data both yield [`VaultError::Authentication`].
pub fn open(envelope: &EncryptionEnvelope, passphrase: &str) -> VaultResult<Vec<u8>> {
    let key = derive_content_key(passphrase, &envelope.salt, PBKDF2_ITERATIONS)?;

    let cipher = Aes256Gcm::new_from_slice(key.expose())
        .map_err(|_| VaultError::Authentication)?;

    cipher
        .decrypt(Nonce::from_slice(&envelope.iv), envelope.ciphertext.as_slice())
        .map_err(|_| VaultError::Authentication)
}

/// Encrypt a string into the text envelope form
pub fn seal_str(plaintext: &str, passphrase: &str) -> VaultResult<String> {
    seal(plaintext.as_bytes(), passphrase)?.to_text()
}

/// Decrypt a text envelope back into a string
pub fn open_str(text: &str, passphrase: &str) -> VaultResult<String> {
    let envelope = EncryptionEnvelope::from_text(text)?;
    let plaintext = open(&envelope, passphrase)?;

    String::from_utf8(plaintext)
        .map_err(|_| VaultError::MalformedEnvelope("plaintext is not UTF-8".into()))
}

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURED CIPHER
// ═══════════════════════════════════════════════════════════════════════════

/// Seals and opens with the configuration's encryption passphrase
pub struct ContentCipher<'a> {
    config: &'a Configuration,
}

impl<'a> ContentCipher<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    fn passphrase(&self) -> &str {
        self.config.encryption_passphrase().expose_secret()
    }

    /// Seal a photo payload
    pub fn seal(&self, plaintext: &[u8]) -> VaultResult<EncryptionEnvelope> {
        seal(plaintext, self.passphrase())
    }

    /// Open a photo payload
    pub fn open(&self, envelope: &EncryptionEnvelope) -> VaultResult<Vec<u8>> {
        open(envelope, self.passphrase())
    }

    /// Seal to the binary form stored in the bucket
    pub fn seal_bytes(&self, plaintext: &[u8]) -> VaultResult<Vec<u8>> {
        Ok(self.seal(plaintext)?.to_bytes())
    }

    /// Open the binary form
    pub fn open_bytes(&self, data: &[u8]) -> VaultResult<Vec<u8>> {
        self.open(&EncryptionEnvelope::from_bytes(data)?)
    }

    pub fn seal_str(&self, plaintext: &str) -> VaultResult<String> {
        seal_str(plaintext, self.passphrase())
    }

    pub fn open_str(&self, text: &str) -> VaultResult<String> {
        open_str(text, self.passphrase())
    }
}
