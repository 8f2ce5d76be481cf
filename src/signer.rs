//! Request signing for the notify.guru source API.
//!
//! A request is reduced to a canonical string, hashed, and bound to the request epoch in a
//! string-to-sign. That string is authenticated with a key derived from the shared secret:
//!
//! ```text
//! CanonicalRequest = METHOD \n URL \n CanonicalQuery \n CanonicalHeaders \n SignedHeaders
//! StringToSign     = "NOTIFYG-HMAC-SHA256" \n Epoch \n Hex(SHA256(CanonicalRequest))
//! SigningKey       = Hex(HMAC-SHA256(Secret, "NOTIFYG-202101"))
//! Signature        = Hex(HMAC-SHA256(SigningKey, StringToSign))
//! ```

use crate::{Error, LIB_LOG_TARGET};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use tracing::{debug, trace};

type HmacSha256 = Hmac<Sha256>;

/// Algorithm label that opens every string-to-sign.
pub const ALGORITHM: &str = "NOTIFYG-HMAC-SHA256";
/// Protocol version string the signing key is scoped to.
pub const KEY_SCOPE: &str = "NOTIFYG-202101";
/// Host header value sent with every signed request.
pub const SERVICE_HOST: &str = "notify.guru";
/// Header carrying the request time in epoch milliseconds.
pub const EPOCH_HEADER: &str = "x-notifyg-epoch";
/// Header carrying the hex encoded SHA-256 of the request body.
pub const CONTENT_SHA256_HEADER: &str = "x-notifyg-content-sha256";

const SIGNED_HEADERS: [&str; 4] = ["host", "content-type", EPOCH_HEADER, CONTENT_SHA256_HEADER];

// Unreserved characters plus '/' stay literal in query keys and values.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'.').remove(b'-').remove(b'~').remove(b'/');

/// Shared secret of a source.
///
/// The value is redacted from `Debug` output so it can not leak through logging.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Create a new `Secret`.
    pub fn new<S: AsRef<str>>(secret: S) -> Self {
        Self(secret.as_ref().to_string())
    }

    /// Return the raw secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Secret {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(**redacted**)")
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Secret::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Outgoing request as seen by the [`Signer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    method: String,
    url: String,
    query: BTreeMap<String, String>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl SignedRequest {
    /// Create a new `SignedRequest` without any query parameters or headers.
    pub fn new<M: AsRef<str>, U: AsRef<str>>(method: M, url: U, body: Vec<u8>) -> Self {
        Self {
            method: method.as_ref().to_string(),
            url: url.as_ref().to_string(),
            query: BTreeMap::new(),
            headers: Vec::new(),
            body,
        }
    }

    /// Create a `PUT` request carrying every header the protocol signs.
    ///
    /// The content hash is computed from `body`.
    pub fn put<U: AsRef<str>, C: AsRef<str>>(url: U, content_type: C, body: Vec<u8>, epoch_millis: u128) -> Self {
        let content_sha256 = content_sha256(&body);
        Self::new("PUT", url, body)
            .with_header("Content-Type", content_type)
            .with_header("Host", SERVICE_HOST)
            .with_header(EPOCH_HEADER, epoch_millis.to_string())
            .with_header(CONTENT_SHA256_HEADER, content_sha256)
    }

    /// Add a query parameter, replacing any previous value for the same key.
    pub fn with_query<K: AsRef<str>, V: AsRef<str>>(mut self, key: K, value: V) -> Self {
        self.query.insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Add a header, replacing any previous header with the same case-insensitive name.
    pub fn with_header<K: AsRef<str>, V: AsRef<str>>(mut self, name: K, value: V) -> Self {
        let name = name.as_ref();
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.as_ref().to_string()));
        self
    }

    /// Return the HTTP method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Return the target URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Return all headers in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Return the value of a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Return the request body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consume the request and return its body.
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Build the canonical representation of this request.
    pub fn canonical_request(&self) -> String {
        let canonical_query = self
            .query
            .iter()
            .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let mut selected: Vec<(String, &str)> = self
            .headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.trim()))
            .filter(|(name, _)| SIGNED_HEADERS.contains(&name.as_str()))
            .collect();
        selected.sort_by(|(a, _), (b, _)| a.cmp(b));

        let canonical_headers =
            selected.iter().map(|(name, value)| format!("{}:{}", name, value)).collect::<Vec<_>>().join("\n");
        let signed_headers = selected.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>().join(";");

        format!("{}\n{}\n{}\n{}\n{}", self.method, self.url, canonical_query, canonical_headers, signed_headers)
    }
}

/// Computes request signatures from a key derived from a source [`Secret`].
#[derive(Clone)]
pub struct Signer {
    signing_key: String,
}

impl Debug for Signer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

impl Signer {
    /// Create a new `Signer`, deriving the signing key from `secret`.
    pub fn new(secret: &Secret) -> Result<Self, Error> {
        let signing_key = hmac_sha256_hex(secret.expose().as_bytes(), KEY_SCOPE.as_bytes())?;
        Ok(Self { signing_key })
    }

    /// Compute the `Authorization` header value for `request`.
    ///
    /// The request must carry the epoch header.
    pub fn sign(&self, request: &SignedRequest) -> Result<String, Error> {
        let epoch = request
            .header(EPOCH_HEADER)
            .ok_or_else(|| Error::invalid_argument(format!("request is missing the {} header", EPOCH_HEADER)))?;

        let canonical_request = request.canonical_request();
        trace!(target: LIB_LOG_TARGET, "CanonicalRequest: {:?}", canonical_request);

        let string_to_sign = format!("{}\n{}\n{}", ALGORITHM, epoch, hex::encode(Sha256::digest(canonical_request)));
        trace!(target: LIB_LOG_TARGET, "StringToSign: {:?}", string_to_sign);

        // The hex form of the signing key is the HMAC key, not its decoded bytes.
        let signature = hmac_sha256_hex(self.signing_key.as_bytes(), string_to_sign.as_bytes())?;
        debug!(target: LIB_LOG_TARGET, "Signature: {}", signature);
        Ok(signature)
    }
}

/// Compute the signature for a request described by its parts.
pub fn compute_signature<Q, QK, QV, H, HK, HV>(
    method: &str,
    url: &str,
    query: Q,
    headers: H,
    body: &[u8],
    secret: &Secret,
) -> Result<String, Error>
where
    Q: IntoIterator<Item = (QK, QV)>,
    QK: AsRef<str>,
    QV: AsRef<str>,
    H: IntoIterator<Item = (HK, HV)>,
    HK: AsRef<str>,
    HV: AsRef<str>,
{
    let request = query.into_iter().fold(SignedRequest::new(method, url, body.to_vec()), |request, (key, value)| {
        request.with_query(key, value)
    });
    let request = headers.into_iter().fold(request, |request, (name, value)| request.with_header(name, value));
    Signer::new(secret)?.sign(&request)
}

/// Return the hex encoded SHA-256 of `body`.
pub fn content_sha256(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_ENCODE_SET).to_string()
}

fn hmac_sha256_hex(key: &[u8], message: &[u8]) -> Result<String, Error> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| Error::configuration(format!("unusable signing key: {}", e)))?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
