//! Photo Vault - SSE-C Key Headers
//!
//! Customer-supplied server-side encryption: the raw 32-byte key travels with
//! each object request together with the base64 MD5 of those same bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{derive_customer_key, md5, CustomerKey, MD5_LEN};
use crate::error::VaultResult;

/// Algorithm value the store expects
pub const SSE_C_ALGORITHM: &str = "AES256";

pub const HEADER_ALGORITHM: &str = "x-amz-server-side-encryption-customer-algorithm";
pub const HEADER_KEY: &str = "x-amz-server-side-encryption-customer-key";
pub const HEADER_KEY_MD5: &str = "x-amz-server-side-encryption-customer-key-MD5";

/// Raw customer key plus its MD5 fingerprint, wiped on drop
pub struct CustomerKeyMaterial {
    raw_key: CustomerKey,
    md5_fingerprint: [u8; MD5_LEN],
}

impl CustomerKeyMaterial {
    /// Derive from the encryption passphrase
    pub fn derive(passphrase: &str) -> VaultResult<Self> {
        Ok(Self::from_key(derive_customer_key(passphrase)?))
    }

    pub fn from_key(raw_key: CustomerKey) -> Self {
        let md5_fingerprint = md5(raw_key.expose());
        Self {
            raw_key,
            md5_fingerprint,
        }
    }

    pub fn raw_key(&self) -> &CustomerKey {
        &self.raw_key
    }

    pub fn md5_fingerprint(&self) -> &[u8; MD5_LEN] {
        &self.md5_fingerprint
    }
}

impl Drop for CustomerKeyMaterial {
    fn drop(&mut self) {
        self.md5_fingerprint.zeroize();
    }
}

/// The three SSE-C transport headers
pub struct CustomerKeyHeaders {
    pub algorithm: &'static str,
    /// base64 of the raw key
    pub key: Zeroizing<String>,
    /// base64 of MD5(raw key)
    pub key_md5: String,
}

impl CustomerKeyHeaders {
    /// Header name/value pairs ready to attach to a request
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        vec![
            (HEADER_ALGORITHM.to_string(), self.algorithm.to_string()),
            (HEADER_KEY.to_string(), self.key.to_string()),
            (HEADER_KEY_MD5.to_string(), self.key_md5.clone()),
        ]
    }
}

/// Build SSE-C headers from derived key material
pub fn build_headers(material: &CustomerKeyMaterial) -> CustomerKeyHeaders {
    CustomerKeyHeaders {
        algorithm: SSE_C_ALGORITHM,
        key: Zeroizing::new(STANDARD.encode(material.raw_key().expose())),
        key_md5: STANDARD.encode(material.md5_fingerprint()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256;

    const PASSPHRASE: &str = "correct horse battery staple";

    #[test]
    fn test_headers_carry_raw_key_and_md5() {
        let material = CustomerKeyMaterial::derive(PASSPHRASE).unwrap();
        let headers = build_headers(&material);

        let raw = sha256(PASSPHRASE.as_bytes());
        assert_eq!(headers.algorithm, "AES256");
        assert_eq!(headers.key.as_str(), STANDARD.encode(raw));
        assert_eq!(headers.key_md5, STANDARD.encode(md5(&raw)));
        assert_eq!(STANDARD.decode(headers.key.as_bytes()).unwrap().len(), 32);
    }

    #[test]
    fn test_md5_matches_reference_implementation() {
        use ::md5::{Digest, Md5 as ReferenceMd5};

        let material = CustomerKeyMaterial::derive(PASSPHRASE).unwrap();
        let headers = build_headers(&material);

        let expected = ReferenceMd5::digest(material.raw_key().expose());
        assert_eq!(headers.key_md5, STANDARD.encode(expected));
    }

    #[test]
    fn test_pairs_use_wire_header_names() {
        let material = CustomerKeyMaterial::derive(PASSPHRASE).unwrap();
        let pairs = build_headers(&material).to_pairs();

        let names: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "x-amz-server-side-encryption-customer-algorithm",
                "x-amz-server-side-encryption-customer-key",
                "x-amz-server-side-encryption-customer-key-MD5",
            ]
        );
    }
}
