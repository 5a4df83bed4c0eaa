//! # S3 Photo Vault
//!
//! Client-side photo encryption and request signing for S3-compatible stores.
//! No trusted backend: photos are sealed before upload and every request is
//! signed locally.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     S3 PHOTO VAULT                        │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────┐  │
//! │  │ CONFIGURATION│  │ OBJECT       │  │ SSE-C HEADERS  │  │
//! │  │ (validated)  │  │ REQUESTS     │  │ key + MD5      │  │
//! │  └──────┬───────┘  └──────┬───────┘  └───────┬────────┘  │
//! │         │                 │                  │           │
//! │  ┌──────┴───────┐  ┌──────┴──────────────────┴────────┐  │
//! │  │ CONTENT      │  │        SIGV4 REQUEST SIGNER      │  │
//! │  │ CIPHER       │  │ canonical → string-to-sign → HMAC│  │
//! │  └──────┬───────┘  └──────────────┬───────────────────┘  │
//! │         │                         │                      │
//! │  ┌──────┴─────────────────────────┴───────────────────┐  │
//! │  │   SHA-256 · HMAC-SHA-256 · MD5 · PBKDF2 · AES-GCM  │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Model
//!
//! - Payloads sealed with AES-256-GCM under a PBKDF2 key (100k iterations)
//! - Fresh salt and IV per seal
//! - One error for wrong passphrase and tampered data
//! - Store secret key and encryption passphrase never interchanged
//! - Key material zeroized on drop
//! - No I/O in the core; the transport is the caller's

pub mod config;
pub mod crypto;
pub mod error;
pub mod requests;
pub mod sigv4;
pub mod sse;

pub use config::{ConfigFile, Configuration, ConfigurationBuilder};
pub use crypto::{ContentCipher, EncryptionEnvelope};
pub use error::{VaultError, VaultResult};
pub use requests::{ObjectRequests, PreparedRequest};
pub use sigv4::{HttpMethod, PresignedUrl, RequestSigner, SignableRequest, SignedRequest};
pub use sse::{build_headers, CustomerKeyHeaders, CustomerKeyMaterial};

/// S3 Photo Vault version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
