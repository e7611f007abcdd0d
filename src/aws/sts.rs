//! Caller identity lookup
//!
//! Only needed to derive the default checkpoint bucket name.

use super::{xml, AwsClient};
use crate::error::Result;

const STS_VERSION: &str = "2011-06-15";

/// Identity of the credentials in use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub account: String,
    pub arn: Option<String>,
    pub user_id: Option<String>,
}

/// STS client
#[derive(Debug)]
pub struct StsClient {
    aws: AwsClient,
}

impl StsClient {
    pub fn new(aws: AwsClient) -> Self {
        Self { aws }
    }

    /// `GetCallerIdentity`
    pub async fn caller_identity(&self) -> Result<CallerIdentity> {
        let doc = self
            .aws
            .query_call("GetCallerIdentity", STS_VERSION, &[])
            .await?;

        Ok(CallerIdentity {
            account: xml::required_text(&doc, "Account")?.trim().to_string(),
            arn: xml::element_text(&doc, "Arn"),
            user_id: xml::element_text(&doc, "UserId"),
        })
    }
}
