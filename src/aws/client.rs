//! Signed AWS service client
//!
//! Three wire protocols are needed:
//! - JSON 1.1 (`X-Amz-Target` + JSON body) for CloudWatch Logs
//! - Query (form-encoded body, XML response) for RDS and STS
//! - REST (method + path, XML body) for S3 bucket setup
//!
//! Calls are sent once. A transient failure abandons the run and the next
//! invocation starts again from the stored checkpoint.

use super::xml;
use crate::auth::{Credentials, SigV4Signer};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RateLimiterConfig, RequestConfig};
use reqwest::Method;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Client for one AWS service endpoint
#[derive(Debug)]
pub struct AwsClient {
    http: HttpClient,
    signer: SigV4Signer,
    endpoint: Url,
}

impl AwsClient {
    /// Create a client from parts
    pub fn new(http: HttpClient, signer: SigV4Signer, endpoint: &str) -> Result<Self> {
        Ok(Self {
            http,
            signer,
            endpoint: Url::parse(endpoint)?,
        })
    }

    /// Create a client with its own HTTP pool and rate limiter
    pub fn connect(
        service: &str,
        region: &str,
        endpoint: &str,
        credentials: Credentials,
        rate_limit: RateLimiterConfig,
    ) -> Result<Self> {
        let http = HttpClient::with_config(
            HttpClientConfig::builder().rate_limit(rate_limit).build(),
        )?;
        Self::new(http, SigV4Signer::new(credentials, region, service), endpoint)
    }

    /// Signing service name
    pub fn service(&self) -> &str {
        self.signer.service()
    }

    /// Signing region
    pub fn region(&self) -> &str {
        self.signer.region()
    }

    /// Call a JSON 1.1 operation
    pub async fn json_call(&self, target: &str, body: &Value) -> Result<Value> {
        let payload = body.to_string();
        let headers = vec![
            ("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()),
            ("X-Amz-Target".to_string(), target.to_string()),
        ];

        debug!(service = self.service(), target, "AWS JSON call");
        let text = self
            .send(Method::POST, &self.endpoint, headers, payload)
            .await
            .map_err(|e| match e {
                Error::HttpStatus { status, body } => parse_json_error(self.service(), status, &body),
                other => other,
            })?;

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Call a Query operation and return the XML response document
    pub async fn query_call(
        &self,
        action: &str,
        version: &str,
        params: &[(&str, String)],
    ) -> Result<String> {
        // The serializer is not Send; finish it before awaiting
        let payload = {
            let mut form = url::form_urlencoded::Serializer::new(String::new());
            form.append_pair("Action", action);
            form.append_pair("Version", version);
            for (key, value) in params {
                form.append_pair(key, value);
            }
            form.finish()
        };

        let headers = vec![("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string())];

        debug!(service = self.service(), action, "AWS Query call");
        self.send(Method::POST, &self.endpoint, headers, payload)
            .await
            .map_err(|e| match e {
                Error::HttpStatus { status, body } => parse_xml_error(self.service(), status, &body),
                other => other,
            })
    }

    /// Call a REST operation on `/{path}` (path-style addressing)
    ///
    /// `subresource` is a bare query flag such as `versioning`.
    pub async fn rest_call(
        &self,
        method: Method,
        path: &str,
        subresource: Option<&str>,
        body: String,
    ) -> Result<String> {
        let mut url = self.endpoint.clone();
        url.set_path(&format!("/{}", path.trim_start_matches('/')));
        url.set_query(subresource);

        let headers = vec![(
            "x-amz-content-sha256".to_string(),
            hex::encode(Sha256::digest(body.as_bytes())),
        )];

        debug!(service = self.service(), %method, path, "AWS REST call");
        self.send(method, &url, headers, body)
            .await
            .map_err(|e| match e {
                Error::HttpStatus { status, body } => parse_xml_error(self.service(), status, &body),
                other => other,
            })
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        headers: Vec<(String, String)>,
        payload: String,
    ) -> Result<String> {
        let signed = self.signer.sign(
            method.as_str(),
            url,
            &headers,
            payload.as_bytes(),
            chrono::Utc::now(),
        )?;

        // A replayed append could duplicate events, and the other calls
        // are cheap to redo on the next run
        let config = RequestConfig::new()
            .headers(headers)
            .headers(signed.into_pairs())
            .body(payload)
            .retries(0);

        self.http.request_text(method, url.as_str(), config).await
    }
}

/// Turn a JSON protocol error body into a service error
pub fn parse_json_error(service: &str, status: u16, body: &str) -> Error {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Error::http_status(status, body);
    };

    let Some(kind) = value.get("__type").and_then(Value::as_str) else {
        return Error::http_status(status, body);
    };
    // "com.amazonaws.logs#ResourceNotFoundException" -> "ResourceNotFoundException"
    let code = kind.rsplit('#').next().unwrap_or(kind);
    let message = value
        .get("message")
        .or_else(|| value.get("Message"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    Error::aws(service, code, message)
}

/// Turn a Query protocol error document into a service error
pub fn parse_xml_error(service: &str, status: u16, body: &str) -> Error {
    match xml::element_text(body, "Code") {
        Some(code) => Error::aws(
            service,
            code,
            xml::element_text(body, "Message").unwrap_or_default(),
        ),
        None => Error::http_status(status, body),
    }
}
