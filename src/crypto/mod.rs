//! Photo Vault - Cryptographic Core
//!
//! Hashes, key derivation and passphrase-sealed AES-256-GCM envelopes.

pub mod hash;
pub mod md5;
pub mod keys;
pub mod aead;

pub use hash::*;
pub use self::md5::{md5, Md5, MD5_LEN};
pub use keys::*;
pub use aead::*;
