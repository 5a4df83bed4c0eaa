//! Photo Vault - Key Derivation
//!
//! Two derivation paths share the same passphrase:
//! - content keys: PBKDF2-HMAC-SHA256, salted, 100k iterations
//! - customer keys (SSE-C): one unsalted SHA-256 pass
//!
//! The customer-key path is much weaker against precomputation. The store
//! protocol takes exactly 32 raw key bytes with no salt field, so it stays
//! as is until a salted scheme is confirmed compatible.

use rand::RngCore;
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;
use zeroize::Zeroize;

use super::hash::sha256;
use crate::error::{VaultError, VaultResult};

/// Key length for AES-256
pub const KEY_LEN: usize = 32;

/// PBKDF2 salt length
pub const SALT_LEN: usize = 16;

/// PBKDF2 iteration floor. Existing envelopes depend on it.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Minimum passphrase length for the customer-key path
pub const MIN_PASSPHRASE_LEN: usize = 12;

/// Minimum passphrase length for content keys
pub const MIN_CONTENT_PASSPHRASE_LEN: usize = 16;

/// 256-bit content encryption key, zeroized on drop
pub struct ContentKey {
    inner: Secret<[u8; KEY_LEN]>,
}

impl ContentKey {
    fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            inner: Secret::new(bytes),
        }
    }

    /// Expose the key bytes (use with caution)
    pub fn expose(&self) -> &[u8; KEY_LEN] {
        self.inner.expose_secret()
    }
}

/// 256-bit customer-supplied key for SSE-C, zeroized on drop
pub struct CustomerKey {
    inner: Secret<[u8; KEY_LEN]>,
}

impl CustomerKey {
    fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            inner: Secret::new(bytes),
        }
    }

    /// Expose the key bytes (use with caution)
    pub fn expose(&self) -> &[u8; KEY_LEN] {
        self.inner.expose_secret()
    }
}

/// Check passphrase length in characters
pub fn check_passphrase(passphrase: &str, min: usize) -> VaultResult<()> {
    let actual = passphrase.chars().count();
    if actual < min {
        return Err(VaultError::InvalidPassphrase { min, actual });
    }
    Ok(())
}

/// Derive a content key with PBKDF2-HMAC-SHA256.
///
/// Deterministic in `(passphrase, salt, iterations)`. Iteration counts below
/// [`PBKDF2_ITERATIONS`] are rejected.
pub fn derive_content_key(
    passphrase: &str,
    salt: &[u8; SALT_LEN],
    iterations: u32,
) -> VaultResult<ContentKey> {
    check_passphrase(passphrase, MIN_CONTENT_PASSPHRASE_LEN)?;

    if iterations < PBKDF2_ITERATIONS {
        return Err(VaultError::WeakIterationCount {
            min: PBKDF2_ITERATIONS,
            actual: iterations,
        });
    }

    let mut okm = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, iterations, &mut okm);

    let key = ContentKey::new(okm);
    okm.zeroize();
    Ok(key)
}

/// Derive the SSE-C key: SHA-256 of the UTF-8 passphrase.
///
/// Unsalted and single-pass; see the module docs.
pub fn derive_customer_key(passphrase: &str) -> VaultResult<CustomerKey> {
    check_passphrase(passphrase, MIN_PASSPHRASE_LEN)?;

    let mut digest = sha256(passphrase.as_bytes());
    let key = CustomerKey::new(digest);
    digest.zeroize();

    log::debug!("derived customer key with unsalted SHA-256");
    Ok(key)
}

/// Generate a random PBKDF2 salt
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSPHRASE: &str = "correct horse battery staple";

    #[test]
    fn test_content_key_deterministic() {
        let salt = [7u8; SALT_LEN];

        let k1 = derive_content_key(PASSPHRASE, &salt, PBKDF2_ITERATIONS).unwrap();
        let k2 = derive_content_key(PASSPHRASE, &salt, PBKDF2_ITERATIONS).unwrap();
        assert_eq!(k1.expose(), k2.expose());

        let k3 = derive_content_key(PASSPHRASE, &[8u8; SALT_LEN], PBKDF2_ITERATIONS).unwrap();
        assert_ne!(k1.expose(), k3.expose());
    }

    #[test]
    fn test_content_key_matches_pbkdf2_reference() {
        // Independent single-block PBKDF2: U1 = HMAC(P, S || INT(1)), Ui = HMAC(P, Ui-1)
        use super::super::hash::hmac_sha256;

        let salt = [0x11u8; SALT_LEN];
        let mut block = salt.to_vec();
        block.extend_from_slice(&1u32.to_be_bytes());

        let mut u = hmac_sha256(PASSPHRASE.as_bytes(), &block);
        let mut t = u;
        for _ in 1..PBKDF2_ITERATIONS {
            u = hmac_sha256(PASSPHRASE.as_bytes(), &u);
            for (acc, byte) in t.iter_mut().zip(u.iter()) {
                *acc ^= byte;
            }
        }

        let key = derive_content_key(PASSPHRASE, &salt, PBKDF2_ITERATIONS).unwrap();
        assert_eq!(key.expose(), &t);
    }

    #[test]
    fn test_iteration_floor_enforced() {
        let err = derive_content_key(PASSPHRASE, &[0u8; SALT_LEN], 1_000).err().unwrap();
        assert!(matches!(
            err,
            VaultError::WeakIterationCount { min: 100_000, actual: 1_000 }
        ));
    }

    #[test]
    fn test_short_passphrase_rejected() {
        let err = derive_content_key("short", &[0u8; SALT_LEN], PBKDF2_ITERATIONS)
            .err()
            .unwrap();
        assert!(matches!(err, VaultError::InvalidPassphrase { min: 16, actual: 5 }));

        assert!(derive_customer_key("elevenchars").is_err());
        assert!(derive_customer_key("twelve chars").is_ok());
    }

    #[test]
    fn test_customer_key_is_sha256_of_passphrase() {
        let key = derive_customer_key(PASSPHRASE).unwrap();
        assert_eq!(key.expose(), &sha256(PASSPHRASE.as_bytes()));
    }

    #[test]
    fn test_salts_are_unique() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
