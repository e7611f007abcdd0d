//! CLI runner - executes commands

use crate::auth::Credentials;
use crate::aws::{AwsClient, S3BucketClient, StsClient};
use crate::checkpoint::{CheckpointManager, CheckpointStore, ObjectCheckpointStore};
use crate::cli::commands::{Cli, Commands};
use crate::config::Settings;
use crate::engine::{EngineConfig, IngestionEngine, RunStats};
use crate::error::{Error, Result};
use crate::http::RateLimiterConfig;
use crate::sink::CloudWatchLogSink;
use crate::source::RdsLogSource;
use crate::types::{Clock, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
    vars: HashMap<String, String>,
}

impl Runner {
    /// Create a runner reading settings from the process environment
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            vars: std::env::vars().collect(),
        }
    }

    /// Replace the environment the settings are resolved from
    #[must_use]
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.vars = vars;
        self
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        // Resolve before anything touches the network
        let settings = Settings::from_env_map(&self.vars)?;

        match self.cli.command.unwrap_or(Commands::Run) {
            Commands::Run => {
                let stats = self.ship(&settings).await?;
                print_json(&stats)
            }
            Commands::ShowCheckpoint => self.show_checkpoint(&settings).await,
            Commands::Config => print_json(&settings),
        }
    }

    /// Build the engine and run one pass
    pub async fn ship(&self, settings: &Settings) -> Result<RunStats> {
        let engine = self.build_engine(settings).await?;
        engine.run().await
    }

    /// Wire the AWS adapters for the configured instance
    pub async fn build_engine(&self, settings: &Settings) -> Result<IngestionEngine> {
        let credentials = Credentials::from_env_map(&self.vars)?;
        let region = settings.region.as_str();

        let rds = AwsClient::connect(
            "rds",
            region,
            &settings.endpoints.rds_url(region),
            credentials.clone(),
            RateLimiterConfig::rds_api(),
        )?;
        let logs = AwsClient::connect(
            "logs",
            region,
            &settings.endpoints.logs_url(region),
            credentials.clone(),
            RateLimiterConfig::log_appends(),
        )?;
        let bucket = self.checkpoint_bucket(settings, &credentials).await?;
        if let Some(bucket) = &bucket {
            self.ensure_bucket(settings, &credentials, bucket).await?;
        }
        let checkpoints = self.checkpoint_manager(settings, &credentials, bucket.as_deref())?;

        Ok(IngestionEngine::new(
            Arc::new(RdsLogSource::new(rds)),
            Arc::new(CloudWatchLogSink::new(logs)),
            checkpoints,
            EngineConfig::from_settings(settings),
        ))
    }

    async fn show_checkpoint(&self, settings: &Settings) -> Result<()> {
        let credentials = Credentials::from_env_map(&self.vars)?;
        let bucket = self.checkpoint_bucket(settings, &credentials).await?;
        let manager = self.checkpoint_manager(settings, &credentials, bucket.as_deref())?;
        let checkpoint = manager
            .load(SystemClock.now_millis(), settings.initial_days)
            .await?;
        print_json(&checkpoint)
    }

    /// S3 bucket holding checkpoints, `None` when `CHECKPOINT_URL` is set
    ///
    /// `BUCKET_NAME` wins; otherwise the name is derived from the caller's
    /// account id.
    pub async fn checkpoint_bucket(
        &self,
        settings: &Settings,
        credentials: &Credentials,
    ) -> Result<Option<String>> {
        if settings.checkpoint_url.is_some() {
            return Ok(None);
        }
        let account = if settings.needs_account_id() {
            self.account_id(settings, credentials).await?
        } else {
            String::new()
        };
        Ok(Some(settings.bucket_or_default(&account)))
    }

    /// Create the checkpoint bucket if it is missing and enable versioning
    pub async fn ensure_bucket(
        &self,
        settings: &Settings,
        credentials: &Credentials,
        bucket: &str,
    ) -> Result<()> {
        let region = settings.region.as_str();
        let s3 = S3BucketClient::new(AwsClient::connect(
            "s3",
            region,
            &settings.endpoints.s3_url(region),
            credentials.clone(),
            RateLimiterConfig::default(),
        )?);
        s3.ensure_bucket(bucket).await
    }

    /// Checkpoint manager for `CHECKPOINT_URL` or the given bucket
    pub fn checkpoint_manager(
        &self,
        settings: &Settings,
        credentials: &Credentials,
        bucket: Option<&str>,
    ) -> Result<CheckpointManager> {
        let store = match (&settings.checkpoint_url, bucket) {
            (Some(url), _) => ObjectCheckpointStore::parse(url)?,
            (None, Some(bucket)) => ObjectCheckpointStore::s3(
                bucket,
                &settings.region,
                settings.endpoints.s3.as_deref(),
                credentials,
            )?,
            (None, None) => return Err(Error::config("no checkpoint bucket or URL resolved")),
        };

        info!(location = %store.location(), key = %settings.checkpoint_key(), "Using checkpoint store");
        Ok(CheckpointManager::new(
            Arc::new(store),
            settings.checkpoint_key(),
        ))
    }

    async fn account_id(&self, settings: &Settings, credentials: &Credentials) -> Result<String> {
        let region = settings.region.as_str();
        let sts = StsClient::new(AwsClient::connect(
            "sts",
            region,
            &settings.endpoints.sts_url(region),
            credentials.clone(),
            RateLimiterConfig::default(),
        )?);
        let identity = sts.caller_identity().await?;
        if identity.account.is_empty() {
            return Err(Error::config("caller identity has no account id"));
        }
        Ok(identity.account)
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
