//! Tests for the auth module

use super::signer::canonical_request;
use super::*;
use chrono::TimeZone;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use url::Url;

// Example credentials from the AWS documentation
const ACCESS_KEY: &str = "AKIDEXAMPLE";
const SECRET_KEY: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

fn iam_signer() -> SigV4Signer {
    SigV4Signer::new(Credentials::new(ACCESS_KEY, SECRET_KEY), "us-east-1", "iam")
}

fn iam_request() -> (Url, Vec<(String, String)>) {
    let url = Url::parse("https://iam.amazonaws.com/?Action=ListUsers&Version=2010-05-08").unwrap();
    let headers = vec![(
        "Content-Type".to_string(),
        "application/x-www-form-urlencoded; charset=utf-8".to_string(),
    )];
    (url, headers)
}

// ============================================================================
// Credentials
// ============================================================================

#[test]
fn test_credentials_from_env_map() {
    let vars: HashMap<String, String> = [
        ("AWS_ACCESS_KEY_ID", "AKID"),
        ("AWS_SECRET_ACCESS_KEY", "secret"),
        ("AWS_SESSION_TOKEN", "session"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let creds = Credentials::from_env_map(&vars).unwrap();
    assert_eq!(creds.access_key_id, "AKID");
    assert_eq!(creds.secret_access_key, "secret");
    assert_eq!(creds.session_token.as_deref(), Some("session"));
}

#[test]
fn test_credentials_missing_secret() {
    let vars: HashMap<String, String> = [("AWS_ACCESS_KEY_ID".to_string(), "AKID".to_string())]
        .into_iter()
        .collect();

    let err = Credentials::from_env_map(&vars).unwrap_err();
    assert!(err.to_string().contains("AWS_SECRET_ACCESS_KEY"));
}

#[test]
fn test_credentials_debug_redacts_secret() {
    let creds = Credentials::new(ACCESS_KEY, SECRET_KEY);
    let debug = format!("{creds:?}");
    assert!(debug.contains(ACCESS_KEY));
    assert!(!debug.contains(SECRET_KEY));
}

// ============================================================================
// Signature Version 4
// ============================================================================

#[test]
fn test_signing_key_derivation() {
    let key = iam_signer().signing_key("20150830").unwrap();
    assert_eq!(
        hex::encode(key),
        "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
    );
}

#[test]
fn test_canonical_request_layout() {
    let (url, mut headers) = iam_request();
    headers.push(("host".to_string(), "iam.amazonaws.com".to_string()));
    headers.push(("x-amz-date".to_string(), "20150830T123600Z".to_string()));

    let (canonical, signed) = canonical_request("GET", &url, &headers, b"");

    assert_eq!(signed, "content-type;host;x-amz-date");
    assert_eq!(
        canonical,
        "GET\n/\nAction=ListUsers&Version=2010-05-08\n\
         content-type:application/x-www-form-urlencoded; charset=utf-8\n\
         host:iam.amazonaws.com\n\
         x-amz-date:20150830T123600Z\n\n\
         content-type;host;x-amz-date\n\
         e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert_eq!(
        hex::encode(Sha256::digest(canonical.as_bytes())),
        "f536975d06c0309214f805bb90ccff089219ecd68b2577efef23edd43b7e1a59"
    );
}

#[test]
fn test_sign_known_request() {
    let (url, headers) = iam_request();
    let now = chrono::Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap();

    let signed = iam_signer().sign("GET", &url, &headers, b"", now).unwrap();

    assert_eq!(signed.amz_date, "20150830T123600Z");
    assert_eq!(
        signed.signature,
        "5d672d79c15b13162d9279b0855cfba6789a8edb4c82c400e06b5924a6f2b5d7"
    );
    assert_eq!(
        signed.authorization,
        "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/iam/aws4_request, \
         SignedHeaders=content-type;host;x-amz-date, \
         Signature=5d672d79c15b13162d9279b0855cfba6789a8edb4c82c400e06b5924a6f2b5d7"
    );
    assert!(signed.security_token.is_none());
}

#[test]
fn test_session_token_is_signed_and_sent() {
    let signer = SigV4Signer::new(
        Credentials::new(ACCESS_KEY, SECRET_KEY).with_session_token("tok"),
        "eu-west-1",
        "logs",
    );
    let url = Url::parse("http://127.0.0.1:4566/").unwrap();
    let now = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

    let signed = signer.sign("POST", &url, &[], b"{}", now).unwrap();
    assert!(signed
        .authorization
        .contains("SignedHeaders=host;x-amz-date;x-amz-security-token"));
    assert!(signed.authorization.contains("/20240102/eu-west-1/logs/aws4_request"));

    let pairs = signed.into_pairs();
    assert!(pairs
        .iter()
        .any(|(k, v)| k == "X-Amz-Security-Token" && v == "tok"));
}

#[test]
fn test_signature_depends_on_body() {
    let signer = SigV4Signer::new(Credentials::new(ACCESS_KEY, SECRET_KEY), "us-east-1", "rds");
    let url = Url::parse("https://rds.us-east-1.amazonaws.com/").unwrap();
    let now = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let a = signer.sign("POST", &url, &[], b"Action=A", now).unwrap();
    let b = signer.sign("POST", &url, &[], b"Action=B", now).unwrap();
    assert_ne!(a.signature, b.signature);
}
