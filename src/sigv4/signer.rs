//! AWS Signature Version 4 request signer.
//!
//! Produces either an `Authorization` header set or a presigned URL for an
//! S3-compatible store. Each call reads the clock and builds a fresh
//! [`SigningContext`]; nothing is cached between requests.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use percent_encoding::percent_decode_str;
use secrecy::ExposeSecret;
use zeroize::{Zeroize, Zeroizing};

use super::canonical::{
    build_canonical_request, canonical_headers, canonical_query_string, canonical_uri,
};
use crate::config::{Configuration, MAX_PRESIGN_EXPIRY_SECS};
use crate::crypto::{hmac_sha256, sha256_hex};
use crate::error::{VaultError, VaultResult};
use crate::sse::{build_headers, CustomerKeyHeaders, CustomerKeyMaterial};

/// Signing algorithm identifier
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Service name in the credential scope
pub const SERVICE: &str = "s3";

/// Payload hash used by presigned URLs
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// SHA-256 of the empty string
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Headers the signer sets itself; callers may not supply them
const RESERVED_HEADERS: [&str; 4] = ["host", "x-amz-date", "x-amz-content-sha256", "authorization"];

/// `YYYYMMDD'T'HHMMSS'Z'`
const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

// ═══════════════════════════════════════════════════════════════════════════
// CLOCK
// ═══════════════════════════════════════════════════════════════════════════

/// Source of the signing time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, read on every signature
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Pinned time, for reproducing published vectors
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Parse an ISO 8601 basic timestamp such as `20130524T000000Z`
    pub fn from_amz_date(timestamp: &str) -> VaultResult<Self> {
        let naive = NaiveDateTime::parse_from_str(timestamp, AMZ_DATE_FORMAT)
            .map_err(|e| VaultError::Signing(format!("invalid timestamp {}: {}", timestamp, e)))?;
        Ok(Self(Utc.from_utc_datetime(&naive)))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// REQUEST DESCRIPTION
// ═══════════════════════════════════════════════════════════════════════════

/// HTTP methods used against the object store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
    Head,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Head => "HEAD",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "PUT" => Ok(HttpMethod::Put),
            "HEAD" => Ok(HttpMethod::Head),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(VaultError::Signing(format!("unsupported method {}", other))),
        }
    }
}

/// Payload hash placed in the canonical request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadHash {
    /// `UNSIGNED-PAYLOAD`
    Unsigned,
    /// Hash of an empty body
    Empty,
    /// Lowercase hex SHA-256 of the body
    Sha256(String),
}

impl PayloadHash {
    /// Hash a body up front
    pub fn of(body: &[u8]) -> Self {
        if body.is_empty() {
            PayloadHash::Empty
        } else {
            PayloadHash::Sha256(sha256_hex(body))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PayloadHash::Unsigned => UNSIGNED_PAYLOAD,
            PayloadHash::Empty => EMPTY_PAYLOAD_SHA256,
            PayloadHash::Sha256(hex) => hex,
        }
    }
}

/// What to sign: method, target, query, extra headers, payload hash
#[derive(Debug, Clone)]
pub struct SignableRequest {
    pub method: HttpMethod,
    /// Object key, or `None` for the bucket itself
    pub key: Option<String>,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub payload: PayloadHash,
}

impl SignableRequest {
    /// Request against a single object
    pub fn object(method: HttpMethod, key: impl Into<String>) -> Self {
        Self {
            method,
            key: Some(key.into()),
            query: Vec::new(),
            headers: Vec::new(),
            payload: PayloadHash::Empty,
        }
    }

    /// Request against the bucket (listing)
    pub fn bucket(method: HttpMethod) -> Self {
        Self {
            method,
            key: None,
            query: Vec::new(),
            headers: Vec::new(),
            payload: PayloadHash::Empty,
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_payload(mut self, payload: PayloadHash) -> Self {
        self.payload = payload;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SIGNED ARTIFACTS
// ═══════════════════════════════════════════════════════════════════════════

/// Intermediate values of one signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningContext {
    /// `YYYYMMDD'T'HHMMSS'Z'`
    pub timestamp: String,
    /// First 8 characters of the timestamp
    pub date_stamp: String,
    /// `date/region/s3/aws4_request`
    pub credential_scope: String,
    pub canonical_request: String,
    pub string_to_sign: String,
    /// Lowercase hex signature
    pub signature: String,
}

/// Header-authenticated request, ready for the transport
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Headers to send, `Authorization` included
    pub headers: Vec<(String, String)>,
    pub context: SigningContext,
}

impl SignedRequest {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Presigned URL plus any headers the caller must send with it
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    pub method: HttpMethod,
    pub url: String,
    pub expires_in: u64,
    /// Signed headers other than `host`
    pub required_headers: Vec<(String, String)>,
    pub context: SigningContext,
}

// ═══════════════════════════════════════════════════════════════════════════
// SIGNER
// ═══════════════════════════════════════════════════════════════════════════

/// SigV4 signer bound to one configuration.
///
/// SSE-C key material is derived once here, when enabled, and wiped when the
/// signer drops.
pub struct RequestSigner<'a> {
    config: &'a Configuration,
    clock: Box<dyn Clock>,
    customer_key: Option<CustomerKeyMaterial>,
}

impl<'a> RequestSigner<'a> {
    /// Signer using the wall clock
    pub fn new(config: &'a Configuration) -> VaultResult<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Signer with an explicit time source
    pub fn with_clock<C: Clock + 'static>(config: &'a Configuration, clock: C) -> VaultResult<Self> {
        let customer_key = if config.customer_key() {
            Some(CustomerKeyMaterial::derive(
                config.encryption_passphrase().expose_secret(),
            )?)
        } else {
            None
        };

        Ok(Self {
            config,
            clock: Box::new(clock),
            customer_key,
        })
    }

    pub fn config(&self) -> &Configuration {
        self.config
    }

    /// SSE-C headers, when customer keys are enabled
    pub fn customer_key_headers(&self) -> Option<CustomerKeyHeaders> {
        self.customer_key.as_ref().map(build_headers)
    }

    /// Sign with an `Authorization` header.
    ///
    /// Adds `host`, `x-amz-date` and `x-amz-content-sha256` to the signed set.
    pub fn sign(&self, request: &SignableRequest) -> VaultResult<SignedRequest> {
        check_caller_headers(&request.headers)?;

        let (timestamp, date_stamp) = self.timestamp();
        let host = self.host()?;
        let uri = canonical_uri(&self.raw_path(request.key.as_deref()));
        let query = canonical_query_string(&request.query);
        let payload_hash = request.payload.as_str();

        let mut headers = vec![
            ("Host".to_string(), host.clone()),
            ("X-Amz-Date".to_string(), timestamp.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.to_string()),
        ];
        headers.extend(request.headers.iter().cloned());

        let context = self.signing_context(
            request.method,
            &uri,
            &query,
            &headers,
            payload_hash,
            timestamp,
            date_stamp,
        )?;

        let (_, signed_headers) = canonical_headers(&headers);
        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            self.config.access_key_id(),
            context.credential_scope,
            signed_headers,
            context.signature
        );
        headers.push(("Authorization".to_string(), authorization));

        log::debug!(
            "signed {} {} scope={}",
            request.method,
            uri,
            context.credential_scope
        );

        Ok(SignedRequest {
            method: request.method,
            url: self.url(&host, &uri, &query),
            headers,
            context,
        })
    }

    /// Presign a request. The payload is always `UNSIGNED-PAYLOAD`.
    ///
    /// Expiry is checked against the store's 7-day limit here; enforcing it
    /// after issue is up to the store.
    pub fn presign(&self, request: &SignableRequest, expires_in: u64) -> VaultResult<PresignedUrl> {
        if expires_in == 0 || expires_in > MAX_PRESIGN_EXPIRY_SECS {
            return Err(VaultError::Signing(format!(
                "expiry must be within 1..={} seconds, got {}",
                MAX_PRESIGN_EXPIRY_SECS, expires_in
            )));
        }
        check_caller_headers(&request.headers)?;

        let (timestamp, date_stamp) = self.timestamp();
        let host = self.host()?;
        let uri = canonical_uri(&self.raw_path(request.key.as_deref()));

        let mut headers = vec![("host".to_string(), host.clone())];
        headers.extend(request.headers.iter().cloned());
        let (_, signed_headers) = canonical_headers(&headers);

        let scope = credential_scope(&date_stamp, self.config.region());
        let mut params = request.query.clone();
        params.extend([
            ("X-Amz-Algorithm".to_string(), ALGORITHM.to_string()),
            (
                "X-Amz-Credential".to_string(),
                format!("{}/{}", self.config.access_key_id(), scope),
            ),
            ("X-Amz-Date".to_string(), timestamp.clone()),
            ("X-Amz-Expires".to_string(), expires_in.to_string()),
            ("X-Amz-SignedHeaders".to_string(), signed_headers),
        ]);
        let query = canonical_query_string(&params);

        let context = self.signing_context(
            request.method,
            &uri,
            &query,
            &headers,
            UNSIGNED_PAYLOAD,
            timestamp,
            date_stamp,
        )?;

        let signed_query = format!("{}&X-Amz-Signature={}", query, context.signature);

        log::debug!(
            "presigned {} {} expires_in={}s",
            request.method,
            uri,
            expires_in
        );

        Ok(PresignedUrl {
            method: request.method,
            url: self.url(&host, &uri, &signed_query),
            expires_in,
            required_headers: request.headers.clone(),
            context,
        })
    }

    /// Presign an object URL with no extra headers
    pub fn presign_object(
        &self,
        method: HttpMethod,
        key: &str,
        expires_in: u64,
    ) -> VaultResult<PresignedUrl> {
        self.presign(&SignableRequest::object(method, key), expires_in)
    }

    #[allow(clippy::too_many_arguments)]
    fn signing_context(
        &self,
        method: HttpMethod,
        uri: &str,
        query: &str,
        headers: &[(String, String)],
        payload_hash: &str,
        timestamp: String,
        date_stamp: String,
    ) -> VaultResult<SigningContext> {
        let (header_block, signed_headers) = canonical_headers(headers);
        if !signed_headers.split(';').any(|h| h == "host") {
            return Err(VaultError::Signing("host header missing".into()));
        }

        let canonical_request = build_canonical_request(
            method.as_str(),
            uri,
            query,
            &header_block,
            &signed_headers,
            payload_hash,
        );
        let canonical_hash = sha256_hex(canonical_request.as_bytes());

        let scope = credential_scope(&date_stamp, self.config.region());
        let string_to_sign = build_string_to_sign(&timestamp, &scope, &canonical_hash);

        let mut signing_key = derive_signing_key(
            self.config.secret_access_key().expose_secret(),
            &date_stamp,
            self.config.region(),
        );
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));
        signing_key.zeroize();

        log::debug!("canonical request hash {}", canonical_hash);

        Ok(SigningContext {
            timestamp,
            date_stamp,
            credential_scope: scope,
            canonical_request,
            string_to_sign,
            signature,
        })
    }

    /// Fresh `(timestamp, date_stamp)` from the clock
    fn timestamp(&self) -> (String, String) {
        let timestamp = self.clock.now().format(AMZ_DATE_FORMAT).to_string();
        let date_stamp = timestamp[..8].to_string();
        (timestamp, date_stamp)
    }

    /// Host header value: endpoint host, non-default port, bucket for
    /// virtual-hosted addressing
    fn host(&self) -> VaultResult<String> {
        let endpoint = self.config.endpoint();
        let host = endpoint
            .host_str()
            .ok_or_else(|| VaultError::Signing("endpoint has no host".into()))?;

        let host = match endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        if self.config.path_style() {
            Ok(host)
        } else {
            Ok(format!("{}.{}", self.config.bucket(), host))
        }
    }

    /// Unencoded request path: endpoint base path, bucket (path style), key
    fn raw_path(&self, key: Option<&str>) -> String {
        let base = percent_decode_str(self.config.endpoint().path()).decode_utf8_lossy();
        let mut path = base.trim_end_matches('/').to_string();

        if self.config.path_style() {
            path.push('/');
            path.push_str(self.config.bucket());
        }

        match key {
            Some(key) => {
                path.push('/');
                path.push_str(key);
            }
            None if path.is_empty() => path.push('/'),
            None => {}
        }

        path
    }

    fn url(&self, host: &str, uri: &str, query: &str) -> String {
        let scheme = self.config.endpoint().scheme();
        if query.is_empty() {
            format!("{}://{}{}", scheme, host, uri)
        } else {
            format!("{}://{}{}?{}", scheme, host, uri, query)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SIGNATURE PRIMITIVES
// ═══════════════════════════════════════════════════════════════════════════

/// Reject caller headers that would collide with the signer's own
fn check_caller_headers(headers: &[(String, String)]) -> VaultResult<()> {
    for (name, _) in headers {
        let name = name.trim();
        if RESERVED_HEADERS.iter().any(|r| name.eq_ignore_ascii_case(r)) {
            return Err(VaultError::Signing(format!(
                "header {} is set by the signer",
                name
            )));
        }
    }
    Ok(())
}

/// `date/region/s3/aws4_request`
pub fn credential_scope(date_stamp: &str, region: &str) -> String {
    format!("{}/{}/{}/aws4_request", date_stamp, region, SERVICE)
}

/// `AWS4-HMAC-SHA256\n{timestamp}\n{scope}\n{hex(sha256(canonical request))}`
pub fn build_string_to_sign(timestamp: &str, scope: &str, canonical_request_hash: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM, timestamp, scope, canonical_request_hash
    )
}

/// HMAC cascade: date, region, service, `aws4_request`
pub fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str) -> [u8; 32] {
    let mut key = Vec::with_capacity(4 + secret_key.len());
    key.extend_from_slice(b"AWS4");
    key.extend_from_slice(secret_key.as_bytes());

    let date_key = Zeroizing::new(hmac_sha256(&key, date_stamp.as_bytes()));
    let date_region_key = Zeroizing::new(hmac_sha256(&*date_key, region.as_bytes()));
    let date_region_service_key =
        Zeroizing::new(hmac_sha256(&*date_region_key, SERVICE.as_bytes()));

    key.zeroize();
    hmac_sha256(&*date_region_service_key, b"aws4_request")
}
