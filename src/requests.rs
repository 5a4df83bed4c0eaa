//! Photo Vault - Object Requests
//!
//! Ready-to-send request descriptions for the transport layer. Nothing here
//! performs I/O; every value carries the URL and the full signed header set.
//! SSE-C headers ride on put/get/head when customer keys are enabled.

use crate::config::Configuration;
use crate::error::VaultResult;
use crate::sigv4::{
    HttpMethod, PayloadHash, PresignedUrl, RequestSigner, SignableRequest, SignedRequest,
};

/// A signed request the transport can send as-is
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl From<SignedRequest> for PreparedRequest {
    fn from(signed: SignedRequest) -> Self {
        Self {
            method: signed.method,
            url: signed.url,
            headers: signed.headers,
        }
    }
}

impl PreparedRequest {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Object operations under the configured prefix
pub struct ObjectRequests<'a> {
    signer: RequestSigner<'a>,
}

impl<'a> ObjectRequests<'a> {
    /// Requests signed with the wall clock
    pub fn new(config: &'a Configuration) -> VaultResult<Self> {
        Ok(Self {
            signer: RequestSigner::new(config)?,
        })
    }

    /// Wrap an existing signer (fixed clock in tests)
    pub fn with_signer(signer: RequestSigner<'a>) -> Self {
        Self { signer }
    }

    pub fn signer(&self) -> &RequestSigner<'a> {
        &self.signer
    }

    /// Upload. The body is hashed into `x-amz-content-sha256`.
    pub fn put_object(&self, name: &str, body: &[u8]) -> VaultResult<PreparedRequest> {
        let request = self
            .object(HttpMethod::Put, name)
            .with_header("Content-Length", body.len().to_string())
            .with_payload(PayloadHash::of(body));
        let request = self.with_customer_key(request);
        self.sign(request)
    }

    pub fn get_object(&self, name: &str) -> VaultResult<PreparedRequest> {
        let request = self.with_customer_key(self.object(HttpMethod::Get, name));
        self.sign(request)
    }

    pub fn head_object(&self, name: &str) -> VaultResult<PreparedRequest> {
        let request = self.with_customer_key(self.object(HttpMethod::Head, name));
        self.sign(request)
    }

    pub fn delete_object(&self, name: &str) -> VaultResult<PreparedRequest> {
        self.sign(self.object(HttpMethod::Delete, name))
    }

    /// ListObjectsV2 over the configured prefix
    pub fn list_objects(&self, continuation_token: Option<&str>) -> VaultResult<PreparedRequest> {
        let mut request = SignableRequest::bucket(HttpMethod::Get)
            .with_query("list-type", "2")
            .with_query("prefix", self.config().list_prefix());
        if let Some(token) = continuation_token {
            request = request.with_query("continuation-token", token);
        }
        self.sign(request)
    }

    /// Presigned download. `expires_in` falls back to the configured default.
    pub fn presign_get(&self, name: &str, expires_in: Option<u64>) -> VaultResult<PresignedUrl> {
        self.presign(HttpMethod::Get, name, expires_in)
    }

    /// Presigned upload
    pub fn presign_put(&self, name: &str, expires_in: Option<u64>) -> VaultResult<PresignedUrl> {
        self.presign(HttpMethod::Put, name, expires_in)
    }

    /// Presigned metadata lookup
    pub fn presign_head(&self, name: &str, expires_in: Option<u64>) -> VaultResult<PresignedUrl> {
        self.presign(HttpMethod::Head, name, expires_in)
    }

    /// Presigned delete. Never carries SSE-C headers.
    pub fn presign_delete(&self, name: &str, expires_in: Option<u64>) -> VaultResult<PresignedUrl> {
        self.presign(HttpMethod::Delete, name, expires_in)
    }

    fn presign(
        &self,
        method: HttpMethod,
        name: &str,
        expires_in: Option<u64>,
    ) -> VaultResult<PresignedUrl> {
        let expires_in = expires_in.unwrap_or_else(|| self.config().presign_expiry_secs());
        let request = match method {
            HttpMethod::Delete => self.object(method, name),
            _ => self.with_customer_key(self.object(method, name)),
        };
        self.signer.presign(&request, expires_in)
    }

    fn config(&self) -> &Configuration {
        self.signer.config()
    }

    fn object(&self, method: HttpMethod, name: &str) -> SignableRequest {
        SignableRequest::object(method, self.config().object_key(name))
    }

    fn with_customer_key(&self, request: SignableRequest) -> SignableRequest {
        match self.signer.customer_key_headers() {
            Some(headers) => request.with_headers(headers.to_pairs()),
            None => request,
        }
    }

    fn sign(&self, request: SignableRequest) -> VaultResult<PreparedRequest> {
        Ok(self.signer.sign(&request)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_builder;
    use crate::sigv4::FixedClock;
    use crate::sse::{HEADER_KEY, HEADER_KEY_MD5};

    fn requests(config: &Configuration) -> ObjectRequests<'_> {
        let clock = FixedClock::from_amz_date("20240301T120000Z").unwrap();
        ObjectRequests::with_signer(RequestSigner::with_clock(config, clock).unwrap())
    }

    #[test]
    fn test_put_carries_and_signs_customer_key() {
        let config = test_builder().build().unwrap();
        let prepared = requests(&config).put_object("2024/IMG_001.jpg", b"jpeg bytes").unwrap();

        assert_eq!(prepared.method, HttpMethod::Put);
        assert_eq!(
            prepared.url,
            "https://s3.example.com/family-photos/photos/2024/IMG_001.jpg"
        );
        assert_eq!(prepared.header("content-length"), Some("10"));
        assert!(prepared.header(HEADER_KEY).is_some());
        assert!(prepared.header(HEADER_KEY_MD5).is_some());

        let auth = prepared.header("Authorization").unwrap();
        assert!(auth.contains(
            "SignedHeaders=content-length;host;x-amz-content-sha256;x-amz-date;\
             x-amz-server-side-encryption-customer-algorithm;\
             x-amz-server-side-encryption-customer-key;\
             x-amz-server-side-encryption-customer-key-md5,"
        ));
    }

    #[test]
    fn test_put_hashes_body() {
        let config = test_builder().customer_key(false).build().unwrap();
        let prepared = requests(&config).put_object("a.jpg", b"Welcome to Amazon S3.").unwrap();

        assert_eq!(
            prepared.header("x-amz-content-sha256"),
            Some("44ce7dd67c959e0d3524ffac1771dfbba87d2b6b4b4e99e42034a8b803f8b072")
        );
    }

    #[test]
    fn test_get_and_head_carry_customer_key() {
        let config = test_builder().build().unwrap();
        let reqs = requests(&config);

        assert!(reqs.get_object("a.jpg").unwrap().header(HEADER_KEY).is_some());
        assert!(reqs.head_object("a.jpg").unwrap().header(HEADER_KEY).is_some());
    }

    #[test]
    fn test_delete_and_list_never_carry_customer_key() {
        let config = test_builder().build().unwrap();
        let reqs = requests(&config);

        let delete = reqs.delete_object("a.jpg").unwrap();
        assert_eq!(delete.method, HttpMethod::Delete);
        assert!(delete.header(HEADER_KEY).is_none());

        let list = reqs.list_objects(None).unwrap();
        assert!(list.header(HEADER_KEY).is_none());
    }

    #[test]
    fn test_customer_key_disabled() {
        let config = test_builder().customer_key(false).build().unwrap();
        let prepared = requests(&config).get_object("a.jpg").unwrap();
        assert!(prepared.header(HEADER_KEY).is_none());
    }

    #[test]
    fn test_list_objects_query() {
        let config = test_builder().build().unwrap();
        let reqs = requests(&config);

        let first = reqs.list_objects(None).unwrap();
        assert_eq!(
            first.url,
            "https://s3.example.com/family-photos?list-type=2&prefix=photos%2F"
        );

        let next = reqs.list_objects(Some("1ueGcxLPRx1Tr/XYExHnhbYLgveDs2J/wm36Hy4vbOwM=")).unwrap();
        assert_eq!(
            next.url,
            "https://s3.example.com/family-photos?continuation-token=\
             1ueGcxLPRx1Tr%2FXYExHnhbYLgveDs2J%2Fwm36Hy4vbOwM%3D&list-type=2&prefix=photos%2F"
        );
    }

    #[test]
    fn test_presign_uses_configured_default_expiry() {
        let config = test_builder()
            .customer_key(false)
            .presign_expiry_secs(900)
            .build()
            .unwrap();
        let reqs = requests(&config);

        let get = reqs.presign_get("a.jpg", None).unwrap();
        assert_eq!(get.expires_in, 900);
        assert!(get.url.contains("X-Amz-Expires=900"));
        assert!(get.url.contains("X-Amz-SignedHeaders=host&"));
        assert!(get.required_headers.is_empty());

        let put = reqs.presign_put("a.jpg", Some(60)).unwrap();
        assert!(put.url.contains("X-Amz-Expires=60"));
        assert_ne!(get.context.signature, put.context.signature);
    }

    #[test]
    fn test_presign_head_carries_customer_key_but_delete_does_not() {
        let config = test_builder().build().unwrap();
        let reqs = requests(&config);

        let head = reqs.presign_head("a.jpg", None).unwrap();
        assert_eq!(head.method, HttpMethod::Head);
        assert_eq!(head.required_headers.len(), 3);
        assert!(head.context.canonical_request.starts_with("HEAD\n"));
        assert!(head.context.canonical_request.contains(
            "x-amz-server-side-encryption-customer-key-md5:"
        ));

        let delete = reqs.presign_delete("a.jpg", Some(60)).unwrap();
        assert!(delete.required_headers.is_empty());
        assert!(delete.url.contains("X-Amz-SignedHeaders=host&"));
    }

    #[test]
    fn test_presign_with_customer_key_requires_headers() {
        let config = test_builder().build().unwrap();
        let url = requests(&config).presign_get("a.jpg", None).unwrap();

        assert_eq!(url.required_headers.len(), 3);
        assert!(url.url.contains(
            "X-Amz-SignedHeaders=host%3Bx-amz-server-side-encryption-customer-algorithm"
        ));
    }
}
