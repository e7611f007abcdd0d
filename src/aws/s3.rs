//! Checkpoint bucket setup
//!
//! The checkpoint store reads and writes objects through `object_store`,
//! which cannot create buckets. These REST calls make sure the bucket is
//! there, with versioning on, before a run reads its checkpoint.

use super::AwsClient;
use crate::error::Result;
use reqwest::Method;
use tracing::{debug, info};

const S3_XMLNS: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Region whose buckets take no `LocationConstraint`
const LEGACY_REGION: &str = "us-east-1";

/// S3 bucket-level client
#[derive(Debug)]
pub struct S3BucketClient {
    aws: AwsClient,
}

impl S3BucketClient {
    pub fn new(aws: AwsClient) -> Self {
        Self { aws }
    }

    /// `HeadBucket`; `false` when the bucket does not exist
    pub async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self
            .aws
            .rest_call(Method::HEAD, bucket, None, String::new())
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// `CreateBucket` in the client's region
    pub async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let body = create_bucket_body(self.aws.region());
        match self.aws.rest_call(Method::PUT, bucket, None, body).await {
            Ok(_) => {
                info!(bucket, region = self.aws.region(), "Created checkpoint bucket");
                Ok(())
            }
            Err(e) if e.aws_code() == Some("BucketAlreadyOwnedByYou") => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// `PutBucketVersioning` with status `Enabled`
    pub async fn enable_versioning(&self, bucket: &str) -> Result<()> {
        let body = format!(
            r#"<VersioningConfiguration xmlns="{S3_XMLNS}"><Status>Enabled</Status></VersioningConfiguration>"#
        );
        self.aws
            .rest_call(Method::PUT, bucket, Some("versioning"), body)
            .await?;
        debug!(bucket, "Bucket versioning enabled");
        Ok(())
    }

    /// Create the bucket if it is missing, then turn on versioning
    pub async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        if self.bucket_exists(bucket).await? {
            debug!(bucket, "Checkpoint bucket exists");
        } else {
            self.create_bucket(bucket).await?;
        }
        self.enable_versioning(bucket).await
    }
}

/// `CreateBucket` request body for a region
pub fn create_bucket_body(region: &str) -> String {
    if region == LEGACY_REGION {
        return String::new();
    }
    format!(
        r#"<CreateBucketConfiguration xmlns="{S3_XMLNS}"><LocationConstraint>{region}</LocationConstraint></CreateBucketConfiguration>"#
    )
}
