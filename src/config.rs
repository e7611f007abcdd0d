//! Runtime settings for one shipping run
//!
//! Settings are resolved from an environment-style string map so the
//! resolution logic can be tested without touching the process environment.

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

// ============================================================================
// Variable Names
// ============================================================================

pub const ENV_INSTANCE_IDENTIFIER: &str = "DB_INSTANCE_IDENTIFIER";
pub const ENV_INITIAL_DAYS: &str = "INITIAL_DAYS_TO_INGEST";
pub const ENV_LOG_GROUP: &str = "LOG_GROUP";
pub const ENV_BUCKET_NAME: &str = "BUCKET_NAME";
pub const ENV_CHECKPOINT_URL: &str = "CHECKPOINT_URL";
pub const ENV_REGION: &str = "AWS_REGION";
pub const ENV_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
pub const ENV_RDS_ENDPOINT: &str = "RDS_ENDPOINT_URL";
pub const ENV_LOGS_ENDPOINT: &str = "LOGS_ENDPOINT_URL";
pub const ENV_STS_ENDPOINT: &str = "STS_ENDPOINT_URL";
pub const ENV_S3_ENDPOINT: &str = "S3_ENDPOINT_URL";
pub const ENV_MALFORMED_LINE_POLICY: &str = "MALFORMED_LINE_POLICY";
pub const ENV_MAX_BATCH_EVENTS: &str = "MAX_BATCH_EVENTS";
pub const ENV_RUN_TIMEOUT: &str = "RUN_TIMEOUT_SECONDS";

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_INITIAL_DAYS: f64 = 1.0;
pub const DEFAULT_LOG_GROUP: &str = "rds_logs";
pub const DEFAULT_REGION: &str = "us-east-1";
/// CloudWatch Logs hard limit on events per `PutLogEvents` call
pub const MAX_EVENTS_PER_APPEND: usize = 10_000;

/// What to do with a line whose leading timestamp cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedLinePolicy {
    /// Abort the run; nothing is checkpointed
    #[default]
    Fail,
    /// Log a warning, drop the line and keep going
    Skip,
}

impl std::str::FromStr for MalformedLinePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" | "abort" => Ok(Self::Fail),
            "skip" => Ok(Self::Skip),
            other => Err(Error::invalid_value(
                ENV_MALFORMED_LINE_POLICY,
                format!("expected 'fail' or 'skip', got '{other}'"),
            )),
        }
    }
}

/// Service endpoint overrides (used for testing and VPC endpoints)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Endpoints {
    pub rds: Option<String>,
    pub logs: Option<String>,
    pub sts: Option<String>,
    pub s3: Option<String>,
}

impl Endpoints {
    /// RDS endpoint for a region
    pub fn rds_url(&self, region: &str) -> String {
        self.rds
            .clone()
            .unwrap_or_else(|| format!("https://rds.{region}.amazonaws.com"))
    }

    /// CloudWatch Logs endpoint for a region
    pub fn logs_url(&self, region: &str) -> String {
        self.logs
            .clone()
            .unwrap_or_else(|| format!("https://logs.{region}.amazonaws.com"))
    }

    /// STS endpoint for a region
    pub fn sts_url(&self, region: &str) -> String {
        self.sts
            .clone()
            .unwrap_or_else(|| format!("https://sts.{region}.amazonaws.com"))
    }

    /// S3 endpoint for a region (path-style bucket addressing)
    pub fn s3_url(&self, region: &str) -> String {
        self.s3
            .clone()
            .unwrap_or_else(|| format!("https://s3.{region}.amazonaws.com"))
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    /// Monitored DB instance; also the log stream name
    pub instance_identifier: String,
    /// Look-back window for the very first run, in days
    pub initial_days: f64,
    /// Destination log group
    pub log_group: String,
    /// Checkpoint bucket; `None` means derive from the account id
    pub bucket_name: Option<String>,
    /// Object-store URL overriding the bucket entirely
    pub checkpoint_url: Option<String>,
    /// AWS region
    pub region: String,
    /// Endpoint overrides
    pub endpoints: Endpoints,
    /// Policy for lines without a parseable timestamp
    pub malformed_line_policy: MalformedLinePolicy,
    /// Upper bound on events per append call
    pub max_batch_events: usize,
    /// Optional deadline for the whole run
    #[serde(skip)]
    pub run_timeout: Option<Duration>,
}

impl Settings {
    /// Resolve settings from the process environment
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_env_map(&vars)
    }

    /// Resolve settings from an environment-style map
    pub fn from_env_map(vars: &HashMap<String, String>) -> Result<Self> {
        let instance_identifier = lookup(vars, ENV_INSTANCE_IDENTIFIER)
            .ok_or_else(|| Error::missing_field(ENV_INSTANCE_IDENTIFIER))?
            .to_string();

        let initial_days = match lookup(vars, ENV_INITIAL_DAYS) {
            Some(raw) => {
                let days: f64 = raw.parse().map_err(|_| {
                    Error::invalid_value(ENV_INITIAL_DAYS, format!("'{raw}' is not a number"))
                })?;
                if !days.is_finite() || days < 0.0 {
                    return Err(Error::invalid_value(
                        ENV_INITIAL_DAYS,
                        "must be a non-negative number",
                    ));
                }
                days
            }
            None => DEFAULT_INITIAL_DAYS,
        };

        let max_batch_events = match lookup(vars, ENV_MAX_BATCH_EVENTS) {
            Some(raw) => {
                let n: usize = raw.parse().map_err(|_| {
                    Error::invalid_value(ENV_MAX_BATCH_EVENTS, format!("'{raw}' is not a count"))
                })?;
                if n == 0 || n > MAX_EVENTS_PER_APPEND {
                    return Err(Error::invalid_value(
                        ENV_MAX_BATCH_EVENTS,
                        format!("must be between 1 and {MAX_EVENTS_PER_APPEND}"),
                    ));
                }
                n
            }
            None => MAX_EVENTS_PER_APPEND,
        };

        let run_timeout = match lookup(vars, ENV_RUN_TIMEOUT) {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    Error::invalid_value(ENV_RUN_TIMEOUT, format!("'{raw}' is not whole seconds"))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let malformed_line_policy = match lookup(vars, ENV_MALFORMED_LINE_POLICY) {
            Some(raw) => raw.parse()?,
            None => MalformedLinePolicy::default(),
        };

        let region = lookup(vars, ENV_REGION)
            .or_else(|| lookup(vars, ENV_DEFAULT_REGION))
            .unwrap_or(DEFAULT_REGION)
            .to_string();

        Ok(Self {
            instance_identifier,
            initial_days,
            log_group: lookup(vars, ENV_LOG_GROUP)
                .unwrap_or(DEFAULT_LOG_GROUP)
                .to_string(),
            bucket_name: lookup(vars, ENV_BUCKET_NAME).map(String::from),
            checkpoint_url: lookup(vars, ENV_CHECKPOINT_URL).map(String::from),
            region,
            endpoints: Endpoints {
                rds: lookup(vars, ENV_RDS_ENDPOINT).map(String::from),
                logs: lookup(vars, ENV_LOGS_ENDPOINT).map(String::from),
                sts: lookup(vars, ENV_STS_ENDPOINT).map(String::from),
                s3: lookup(vars, ENV_S3_ENDPOINT).map(String::from),
            },
            malformed_line_policy,
            max_batch_events,
            run_timeout,
        })
    }

    /// Log stream name (one stream per instance)
    pub fn log_stream(&self) -> &str {
        &self.instance_identifier
    }

    /// Checkpoint object key
    pub fn checkpoint_key(&self) -> String {
        checkpoint_key(&self.instance_identifier)
    }

    /// Bucket name, falling back to the account-derived default
    pub fn bucket_or_default(&self, account_id: &str) -> String {
        self.bucket_name
            .clone()
            .unwrap_or_else(|| default_bucket_name(account_id))
    }

    /// Whether the checkpoint location still needs the account id to resolve
    pub fn needs_account_id(&self) -> bool {
        self.checkpoint_url.is_none() && self.bucket_name.is_none()
    }
}

/// Checkpoint object key for an instance
pub fn checkpoint_key(instance_identifier: &str) -> String {
    format!("{instance_identifier}_rds_log_state")
}

/// Default checkpoint bucket for an account
pub fn default_bucket_name(account_id: &str) -> String {
    format!("{account_id}-rds-logs-state")
}

/// Look up a variable, treating empty values as absent
fn lookup<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}
