//! AWS Signature Version 4
//!
//! Produces the `Authorization`, `X-Amz-Date` and (for temporary
//! credentials) `X-Amz-Security-Token` headers for a fully formed request.

use super::types::Credentials;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Signing algorithm identifier
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Headers to attach to a signed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// `X-Amz-Date` value
    pub amz_date: String,
    /// `Authorization` value
    pub authorization: String,
    /// `X-Amz-Security-Token` value, for temporary credentials
    pub security_token: Option<String>,
    /// Hex signature (also embedded in `authorization`)
    pub signature: String,
}

impl SignedHeaders {
    /// Flatten into header name/value pairs
    pub fn into_pairs(self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("X-Amz-Date".to_string(), self.amz_date),
            ("Authorization".to_string(), self.authorization),
        ];
        if let Some(token) = self.security_token {
            pairs.push(("X-Amz-Security-Token".to_string(), token));
        }
        pairs
    }
}

/// Request signer bound to one service in one region
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    credentials: Credentials,
    region: String,
    service: String,
}

impl SigV4Signer {
    /// Create a signer
    pub fn new(
        credentials: Credentials,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            region: region.into(),
            service: service.into(),
        }
    }

    /// Signing service name (e.g. `logs`, `rds`)
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Signing region
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Sign a request
    ///
    /// `headers` are the extra headers that will be sent (content type,
    /// target, ...); `host` and the `x-amz-*` headers are added here.
    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        headers: &[(String, String)],
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<SignedHeaders> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();

        let mut all_headers: Vec<(String, String)> = headers.to_vec();
        all_headers.push(("host".to_string(), host_header(url)?));
        all_headers.push(("x-amz-date".to_string(), amz_date.clone()));
        if let Some(token) = &self.credentials.session_token {
            all_headers.push(("x-amz-security-token".to_string(), token.clone()));
        }

        let (canonical, signed_headers) = canonical_request(method, url, &all_headers, body);
        let scope = format!(
            "{date_stamp}/{}/{}/aws4_request",
            self.region, self.service
        );
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical.as_bytes()))
        );

        let key = self.signing_key(&date_stamp)?;
        let signature = hex::encode(hmac(&key, string_to_sign.as_bytes())?);

        Ok(SignedHeaders {
            authorization: format!(
                "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
                self.credentials.access_key_id
            ),
            amz_date,
            security_token: self.credentials.session_token.clone(),
            signature,
        })
    }

    /// Derive the signing key for a date (`YYYYMMDD`)
    pub fn signing_key(&self, date_stamp: &str) -> Result<Vec<u8>> {
        let secret = format!("AWS4{}", self.credentials.secret_access_key);
        let k_date = hmac(secret.as_bytes(), date_stamp.as_bytes())?;
        let k_region = hmac(&k_date, self.region.as_bytes())?;
        let k_service = hmac(&k_region, self.service.as_bytes())?;
        hmac(&k_service, b"aws4_request")
    }
}

/// Build the canonical request, returning it with the signed header list
pub fn canonical_request(
    method: &str,
    url: &Url,
    headers: &[(String, String)],
    body: &[u8],
) -> (String, String) {
    let path = match url.path() {
        "" => "/",
        p => p,
    };

    let mut query: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();
    query.sort();
    let canonical_query = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut canonical_headers: Vec<(String, String)> = headers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), collapse_whitespace(v)))
        .collect();
    canonical_headers.sort();

    let header_block: String = canonical_headers
        .iter()
        .map(|(k, v)| format!("{k}:{v}\n"))
        .collect();
    let signed_headers = canonical_headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let payload_hash = hex::encode(Sha256::digest(body));

    (
        format!(
            "{}\n{path}\n{canonical_query}\n{header_block}\n{signed_headers}\n{payload_hash}",
            method.to_ascii_uppercase()
        ),
        signed_headers,
    )
}

/// `Host` header value as reqwest will send it
fn host_header(url: &Url) -> Result<String> {
    let host = url.host_str().ok_or_else(|| Error::Signing {
        message: format!("URL has no host: {url}"),
    })?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| Error::Signing {
        message: e.to_string(),
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Percent-encode everything except RFC 3986 unreserved characters
fn uri_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
