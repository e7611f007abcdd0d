//! CloudWatch Logs sink
//!
//! Uses the JSON 1.1 protocol: `DescribeLogGroups`, `CreateLogGroup`,
//! `DescribeLogStreams`, `CreateLogStream` and `PutLogEvents`.

use super::types::{LogEvent, LogSink};
use crate::aws::AwsClient;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

const TARGET_PREFIX: &str = "Logs_20140328";

/// Log sink backed by CloudWatch Logs
#[derive(Debug)]
pub struct CloudWatchLogSink {
    aws: AwsClient,
}

impl CloudWatchLogSink {
    pub fn new(aws: AwsClient) -> Self {
        Self { aws }
    }

    async fn call(&self, operation: &str, body: &Value) -> Result<Value> {
        self.aws
            .json_call(&format!("{TARGET_PREFIX}.{operation}"), body)
            .await
    }

    async fn group_exists(&self, group: &str) -> Result<bool> {
        let mut next_token: Option<String> = None;
        loop {
            let mut body = json!({ "logGroupNamePrefix": group });
            if let Some(token) = &next_token {
                body["nextToken"] = json!(token);
            }

            let response = self.call("DescribeLogGroups", &body).await?;
            let found = response["logGroups"]
                .as_array()
                .is_some_and(|groups| groups.iter().any(|g| g["logGroupName"] == group));
            if found {
                return Ok(true);
            }

            match response["nextToken"].as_str() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => return Ok(false),
            }
        }
    }

    /// `Some(token)` when the stream exists; the inner option is its upload token
    async fn find_stream(&self, group: &str, stream: &str) -> Result<Option<Option<String>>> {
        let mut next_token: Option<String> = None;
        loop {
            let mut body = json!({
                "logGroupName": group,
                "logStreamNamePrefix": stream,
            });
            if let Some(token) = &next_token {
                body["nextToken"] = json!(token);
            }

            let response = self.call("DescribeLogStreams", &body).await?;
            let found = response["logStreams"].as_array().and_then(|streams| {
                streams.iter().find(|s| s["logStreamName"] == stream)
            });
            if let Some(found) = found {
                let token = found["uploadSequenceToken"].as_str().map(str::to_string);
                return Ok(Some(token));
            }

            match response["nextToken"].as_str() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => return Ok(None),
            }
        }
    }
}

#[async_trait]
impl LogSink for CloudWatchLogSink {
    async fn ensure_group(&self, group: &str) -> Result<()> {
        if self.group_exists(group).await? {
            debug!(group, "Log group exists");
            return Ok(());
        }

        match self
            .call("CreateLogGroup", &json!({ "logGroupName": group }))
            .await
        {
            Ok(_) => {
                info!(group, "Created log group");
                Ok(())
            }
            Err(e) if e.is_already_exists() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn ensure_stream(&self, group: &str, stream: &str) -> Result<Option<String>> {
        if let Some(token) = self.find_stream(group, stream).await? {
            debug!(group, stream, has_token = token.is_some(), "Log stream exists");
            return Ok(token);
        }

        let body = json!({ "logGroupName": group, "logStreamName": stream });
        match self.call("CreateLogStream", &body).await {
            Ok(_) => {
                info!(group, stream, "Created log stream");
                Ok(None)
            }
            // Created concurrently; pick up whatever token it has now
            Err(e) if e.is_already_exists() => {
                Ok(self.find_stream(group, stream).await?.flatten())
            }
            Err(e) => Err(e),
        }
    }

    async fn append(
        &self,
        group: &str,
        stream: &str,
        events: &[LogEvent],
        token: Option<&str>,
    ) -> Result<Option<String>> {
        let log_events: Vec<Value> = events
            .iter()
            .map(|e| json!({ "timestamp": e.timestamp, "message": e.message }))
            .collect();
        let mut body = json!({
            "logGroupName": group,
            "logStreamName": stream,
            "logEvents": log_events,
        });
        if let Some(token) = token {
            body["sequenceToken"] = json!(token);
        }

        let response = self.call("PutLogEvents", &body).await?;

        if let Some(rejected) = response.get("rejectedLogEventsInfo").filter(|v| !v.is_null()) {
            warn!(group, stream, rejected = %rejected, "Some log events were rejected");
        }
        debug!(group, stream, events = events.len(), "Appended log events");

        Ok(response["nextSequenceToken"].as_str().map(str::to_string))
    }
}
