//! AWS protocol plumbing
//!
//! Signed request transport for the JSON 1.1, Query and REST protocols, a
//! small XML reader for Query responses, the STS identity call and
//! checkpoint bucket setup.

mod client;
mod s3;
mod sts;
pub mod xml;

pub use client::{parse_json_error, parse_xml_error, AwsClient};
pub use s3::{create_bucket_body, S3BucketClient};
pub use sts::{CallerIdentity, StsClient};
