//! Photo Vault - Configuration
//!
//! Store credentials plus the encryption passphrase, validated once at
//! construction. Signing and encryption take a `&Configuration`; there is no
//! process-wide instance.

use std::fmt;
use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{check_passphrase, open_str, seal_str, MIN_CONTENT_PASSPHRASE_LEN};
use crate::error::{VaultError, VaultResult};

/// Default object key prefix
pub const DEFAULT_PATH_PREFIX: &str = "photos";

/// Default presigned URL lifetime (seconds)
pub const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 3600;

/// Longest presigned URL lifetime S3 accepts (7 days)
pub const MAX_PRESIGN_EXPIRY_SECS: u64 = 604_800;

/// Prefix for environment overrides
const ENV_PREFIX: &str = "PHOTO_VAULT_";

/// Validated store and encryption settings
#[derive(Debug)]
pub struct Configuration {
    endpoint: Url,
    region: String,
    bucket: String,
    access_key_id: String,
    secret_access_key: SecretString,
    encryption_passphrase: SecretString,
    path_prefix: String,
    path_style: bool,
    customer_key: bool,
    presign_expiry_secs: u64,
}

impl Configuration {
    /// Start building a configuration
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    /// Load from a JSON file, apply `PHOTO_VAULT_*` overrides, then validate
    pub fn from_file<P: AsRef<Path>>(path: P) -> VaultResult<Self> {
        let mut file = ConfigFile::load(path)?;
        file.apply_env();
        file.to_builder().build()
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Store secret key. Only the request signer should read this.
    pub fn secret_access_key(&self) -> &SecretString {
        &self.secret_access_key
    }

    /// Encryption passphrase. Never used for signing.
    pub fn encryption_passphrase(&self) -> &SecretString {
        &self.encryption_passphrase
    }

    /// Key prefix without leading or trailing `/`
    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    pub fn path_style(&self) -> bool {
        self.path_style
    }

    /// Whether SSE-C headers are attached to object requests
    pub fn customer_key(&self) -> bool {
        self.customer_key
    }

    pub fn presign_expiry_secs(&self) -> u64 {
        self.presign_expiry_secs
    }

    /// Full object key for a name under the configured prefix
    pub fn object_key(&self, name: &str) -> String {
        format!("{}/{}", self.path_prefix, name.trim_start_matches('/'))
    }

    /// Prefix used for listing, with a trailing `/`
    pub fn list_prefix(&self) -> String {
        format!("{}/", self.path_prefix)
    }

    /// Export to the file form. Contains secrets in the clear.
    pub fn to_config_file(&self) -> ConfigFile {
        ConfigFile {
            endpoint: Some(self.endpoint.to_string()),
            region: Some(self.region.clone()),
            bucket: Some(self.bucket.clone()),
            access_key_id: Some(self.access_key_id.clone()),
            secret_access_key: Some(self.secret_access_key.expose_secret().clone()),
            encryption_passphrase: Some(self.encryption_passphrase.expose_secret().clone()),
            path_prefix: Some(self.path_prefix.clone()),
            path_style: Some(self.path_style),
            customer_key: Some(self.customer_key),
            presign_expiry_secs: Some(self.presign_expiry_secs),
        }
    }

    /// Seal the whole configuration into a text envelope for text-only media
    pub fn seal(&self, passphrase: &str) -> VaultResult<String> {
        let json = Zeroizing::new(serde_json::to_string(&self.to_config_file())?);
        seal_str(&json, passphrase)
    }

    /// Open a sealed configuration and validate it
    pub fn open_sealed(text: &str, passphrase: &str) -> VaultResult<Self> {
        let json = Zeroizing::new(open_str(text, passphrase)?);
        let file: ConfigFile = serde_json::from_str(&json)?;
        file.to_builder().build()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// BUILDER
// ═══════════════════════════════════════════════════════════════════════════

/// Collects fields; defaults and validation happen in [`build`](Self::build)
#[derive(Debug, Default)]
pub struct ConfigurationBuilder {
    endpoint: Option<String>,
    region: Option<String>,
    bucket: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<SecretString>,
    encryption_passphrase: Option<SecretString>,
    path_prefix: Option<String>,
    path_style: Option<bool>,
    customer_key: Option<bool>,
    presign_expiry_secs: Option<u64>,
}

impl ConfigurationBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn access_key_id(mut self, access_key_id: impl Into<String>) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self
    }

    pub fn secret_access_key(mut self, secret: impl Into<String>) -> Self {
        self.secret_access_key = Some(SecretString::new(secret.into()));
        self
    }

    pub fn encryption_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.encryption_passphrase = Some(SecretString::new(passphrase.into()));
        self
    }

    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    pub fn path_style(mut self, path_style: bool) -> Self {
        self.path_style = Some(path_style);
        self
    }

    pub fn customer_key(mut self, enabled: bool) -> Self {
        self.customer_key = Some(enabled);
        self
    }

    pub fn presign_expiry_secs(mut self, secs: u64) -> Self {
        self.presign_expiry_secs = Some(secs);
        self
    }

    /// Apply defaults and validate every field
    pub fn build(self) -> VaultResult<Configuration> {
        let endpoint = parse_endpoint(&required("endpoint", self.endpoint)?)?;
        let region = required_token("region", self.region)?;
        let bucket = required_token("bucket", self.bucket)?;
        if bucket.contains('/') {
            return Err(VaultError::Configuration("bucket must not contain '/'".into()));
        }
        let access_key_id = required_token("accessKeyId", self.access_key_id)?;

        let secret_access_key = self
            .secret_access_key
            .filter(|s| !s.expose_secret().is_empty())
            .ok_or_else(|| missing("secretAccessKey"))?;
        let encryption_passphrase = self
            .encryption_passphrase
            .filter(|s| !s.expose_secret().is_empty())
            .ok_or_else(|| missing("encryptionPassphrase"))?;

        check_passphrase(encryption_passphrase.expose_secret(), MIN_CONTENT_PASSPHRASE_LEN)?;

        if secret_access_key.expose_secret() == encryption_passphrase.expose_secret() {
            return Err(VaultError::Configuration(
                "secretAccessKey and encryptionPassphrase must differ".into(),
            ));
        }

        let path_prefix = self
            .path_prefix
            .unwrap_or_else(|| DEFAULT_PATH_PREFIX.to_string())
            .trim()
            .trim_matches('/')
            .to_string();
        if path_prefix.is_empty() {
            return Err(missing("pathPrefix"));
        }

        let presign_expiry_secs = self
            .presign_expiry_secs
            .unwrap_or(DEFAULT_PRESIGN_EXPIRY_SECS);
        if presign_expiry_secs == 0 || presign_expiry_secs > MAX_PRESIGN_EXPIRY_SECS {
            return Err(VaultError::Configuration(format!(
                "presignExpirySecs must be within 1..={}",
                MAX_PRESIGN_EXPIRY_SECS
            )));
        }

        Ok(Configuration {
            endpoint,
            region,
            bucket,
            access_key_id,
            secret_access_key,
            encryption_passphrase,
            path_prefix,
            path_style: self.path_style.unwrap_or(true),
            customer_key: self.customer_key.unwrap_or(true),
            presign_expiry_secs,
        })
    }
}

fn missing(field: &str) -> VaultError {
    VaultError::Configuration(format!("{} is required", field))
}

fn required(field: &str, value: Option<String>) -> VaultResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| missing(field))
}

fn required_token(field: &str, value: Option<String>) -> VaultResult<String> {
    let value = required(field, value)?;
    if value.chars().any(char::is_whitespace) {
        return Err(VaultError::Configuration(format!(
            "{} must not contain whitespace",
            field
        )));
    }
    Ok(value)
}

fn parse_endpoint(raw: &str) -> VaultResult<Url> {
    let url = Url::parse(raw)
        .map_err(|e| VaultError::Configuration(format!("endpoint is not a valid URL: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(VaultError::Configuration(format!(
            "endpoint scheme must be http or https, got {}",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(VaultError::Configuration("endpoint has no host".into()));
    }
    if url.path().to_ascii_lowercase().contains("%2f") {
        return Err(VaultError::Configuration(
            "endpoint path must not contain an encoded '/'".into(),
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(VaultError::Configuration(
            "endpoint must not carry a query or fragment".into(),
        ));
    }

    Ok(url)
}

// ═══════════════════════════════════════════════════════════════════════════
// FILE FORM
// ═══════════════════════════════════════════════════════════════════════════

/// On-disk JSON form. Secret fields are wiped when dropped.
#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_passphrase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_style: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presign_expiry_secs: Option<u64>,
}

impl fmt::Debug for ConfigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigFile")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "[REDACTED]"))
            .field("encryption_passphrase", &self.encryption_passphrase.as_ref().map(|_| "[REDACTED]"))
            .field("path_prefix", &self.path_prefix)
            .finish_non_exhaustive()
    }
}

impl Drop for ConfigFile {
    fn drop(&mut self) {
        self.secret_access_key.zeroize();
        self.encryption_passphrase.zeroize();
    }
}

impl ConfigFile {
    /// Read and parse a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> VaultResult<Self> {
        let raw = Zeroizing::new(std::fs::read_to_string(path.as_ref())?);
        let file = serde_json::from_str(&raw)?;
        log::debug!("loaded configuration from {}", path.as_ref().display());
        Ok(file)
    }

    /// Write as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> VaultResult<()> {
        let json = Zeroizing::new(serde_json::to_string_pretty(self)?);
        std::fs::write(path.as_ref(), json.as_bytes())?;
        Ok(())
    }

    /// Apply `PHOTO_VAULT_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(format!("{}{}", ENV_PREFIX, name)).ok());
    }

    /// Apply overrides from a lookup keyed by the variable suffix (e.g. `REGION`)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut Option<String>); 7] = [
            ("ENDPOINT", &mut self.endpoint),
            ("REGION", &mut self.region),
            ("BUCKET", &mut self.bucket),
            ("ACCESS_KEY_ID", &mut self.access_key_id),
            ("SECRET_ACCESS_KEY", &mut self.secret_access_key),
            ("PASSPHRASE", &mut self.encryption_passphrase),
            ("PATH_PREFIX", &mut self.path_prefix),
        ];

        for (name, slot) in fields {
            if let Some(value) = lookup(name) {
                slot.zeroize();
                *slot = Some(value);
            }
        }
    }

    /// Copy into a builder for validation
    pub fn to_builder(&self) -> ConfigurationBuilder {
        ConfigurationBuilder {
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
            bucket: self.bucket.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone().map(SecretString::new),
            encryption_passphrase: self.encryption_passphrase.clone().map(SecretString::new),
            path_prefix: self.path_prefix.clone(),
            path_style: self.path_style,
            customer_key: self.customer_key,
            presign_expiry_secs: self.presign_expiry_secs,
        }
    }
}
