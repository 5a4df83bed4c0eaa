//! Photo Vault - Error Types

use thiserror::Error;

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Vault error types
#[derive(Error, Debug)]
pub enum VaultError {
    // ═══════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Passphrase too short: need at least {min} characters, got {actual}")]
    InvalidPassphrase { min: usize, actual: usize },

    // ═══════════════════════════════════════════════════════════════
    // CRYPTO ERRORS
    // ═══════════════════════════════════════════════════════════════

    /// AEAD tag mismatch. Never says whether the key or the data was wrong.
    #[error("Incorrect passphrase or corrupted data")]
    Authentication,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Iteration count {actual} is below the minimum of {min}")]
    WeakIterationCount { min: u32, actual: u32 },

    #[error("Unsupported primitive: {0}")]
    UnsupportedPrimitive(String),

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    // ═══════════════════════════════════════════════════════════════
    // SIGNING ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Signing error: {0}")]
    Signing(String),

    // ═══════════════════════════════════════════════════════════════
    // SERIALIZATION / IO ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultError {
    /// Check if this is a security-critical error
    pub fn is_security_critical(&self) -> bool {
        matches!(
            self,
            VaultError::Authentication | VaultError::WeakIterationCount { .. }
        )
    }

    /// Check if the caller can fix this by correcting its input
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            VaultError::Configuration(_)
                | VaultError::InvalidPassphrase { .. }
                | VaultError::WeakIterationCount { .. }
                | VaultError::Signing(_)
        )
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::Serialization(e.to_string())
    }
}

impl From<base64::DecodeError> for VaultError {
    fn from(e: base64::DecodeError) -> Self {
        VaultError::MalformedEnvelope(format!("invalid base64: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_message_is_undifferentiated() {
        assert_eq!(
            VaultError::Authentication.to_string(),
            "Incorrect passphrase or corrupted data"
        );
        assert!(VaultError::Authentication.is_security_critical());
        assert!(!VaultError::Authentication.is_caller_error());
    }

    #[test]
    fn test_configuration_is_caller_error() {
        let err = VaultError::Configuration("bucket is empty".into());
        assert!(err.is_caller_error());
        assert_eq!(err.to_string(), "Configuration error: bucket is empty");
    }
}
