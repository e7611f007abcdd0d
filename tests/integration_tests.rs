//! Integration tests using mock HTTP servers
//!
//! Tests the full end-to-end flow: RDS log listing and download → CloudWatch
//! Logs appends → checkpoint object on the local filesystem or a mocked
//! S3 bucket

use clap::Parser;
use rds_log_shipper::cli::{Cli, Runner};
use rds_log_shipper::config::Settings;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use wiremock::matchers::{
    body_partial_json, body_string, body_string_contains, header, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INSTANCE: &str = "db-1";
const KEY: &str = "db-1_rds_log_state";
const LOG_FILE: &str = "error/postgresql.log.2024-01-15-10";

struct Servers {
    rds: MockServer,
    logs: MockServer,
    state_dir: tempfile::TempDir,
}

impl Servers {
    async fn start() -> Self {
        Self {
            rds: MockServer::start().await,
            logs: MockServer::start().await,
            state_dir: tempfile::tempdir().unwrap(),
        }
    }

    fn env(&self) -> HashMap<String, String> {
        [
            ("DB_INSTANCE_IDENTIFIER", INSTANCE.to_string()),
            ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE".to_string()),
            ("AWS_SECRET_ACCESS_KEY", "secret".to_string()),
            ("AWS_REGION", "us-east-1".to_string()),
            ("RDS_ENDPOINT_URL", self.rds.uri()),
            ("LOGS_ENDPOINT_URL", self.logs.uri()),
            (
                "CHECKPOINT_URL",
                self.state_dir.path().to_str().unwrap().to_string(),
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    async fn ship(&self) -> rds_log_shipper::Result<rds_log_shipper::RunStats> {
        let vars = self.env();
        let settings = Settings::from_env_map(&vars).unwrap();
        let runner = Runner::new(Cli::parse_from(["rds-log-shipper"])).with_env(vars);
        runner.ship(&settings).await
    }

    fn checkpoint_path(&self) -> std::path::PathBuf {
        self.state_dir.path().join(KEY)
    }

    fn write_checkpoint(&self, value: &Value) {
        std::fs::write(self.checkpoint_path(), value.to_string()).unwrap();
    }

    fn read_checkpoint(&self) -> Option<Value> {
        read_json(&self.checkpoint_path())
    }
}

fn read_json(path: &Path) -> Option<Value> {
    let raw = std::fs::read(path).ok()?;
    Some(serde_json::from_slice(&raw).unwrap())
}

fn describe_files(files: &[&str]) -> String {
    let details: String = files
        .iter()
        .map(|name| {
            format!(
                "<DescribeDBLogFilesDetails><LastWritten>1705312800000</LastWritten>\
                 <LogFileName>{name}</LogFileName><Size>128</Size></DescribeDBLogFilesDetails>"
            )
        })
        .collect();
    format!(
        "<DescribeDBLogFilesResponse xmlns=\"http://rds.amazonaws.com/doc/2014-10-31/\">\
         <DescribeDBLogFilesResult><DescribeDBLogFiles>{details}</DescribeDBLogFiles>\
         </DescribeDBLogFilesResult></DescribeDBLogFilesResponse>"
    )
}

fn portion(data: &str, marker: &str, pending: bool) -> String {
    format!(
        "<DownloadDBLogFilePortionResponse><DownloadDBLogFilePortionResult>\
         <LogFileData>{data}</LogFileData><Marker>{marker}</Marker>\
         <AdditionalDataPending>{pending}</AdditionalDataPending>\
         </DownloadDBLogFilePortionResult></DownloadDBLogFilePortionResponse>"
    )
}

fn logs_target(operation: &str) -> wiremock::matchers::HeaderExactMatcher {
    header("X-Amz-Target", format!("Logs_20140328.{operation}").as_str())
}

async fn mount_existing_destination(logs: &MockServer, token: Option<&str>) {
    Mock::given(method("POST"))
        .and(logs_target("DescribeLogGroups"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"logGroups": [{"logGroupName": "rds_logs"}]})),
        )
        .mount(logs)
        .await;

    let mut stream = json!({"logStreamName": INSTANCE});
    if let Some(token) = token {
        stream["uploadSequenceToken"] = json!(token);
    }
    Mock::given(method("POST"))
        .and(logs_target("DescribeLogStreams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"logStreams": [stream]})))
        .mount(logs)
        .await;
}

// ============================================================================
// First Run
// ============================================================================

#[tokio::test]
async fn test_first_run_creates_destination_and_checkpoint() {
    let servers = Servers::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=DescribeDBLogFiles"))
        .and(body_string_contains("DBInstanceIdentifier=db-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(describe_files(&[LOG_FILE, "trace/x.trc"])),
        )
        .expect(1)
        .mount(&servers.rds)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("Action=DownloadDBLogFilePortion"))
        .and(body_string_contains(
            "LogFileName=error%2Fpostgresql.log.2024-01-15-10",
        ))
        .and(body_string_contains("Marker=0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(portion(
            "2024-01-15 10:00:01 UTC::@:[7]:LOG:  database system is ready\n\
             2024-01-15 10:00:02 UTC::@:[7]:LOG:  checkpoint starting: time\n",
            "1:200",
            false,
        )))
        .expect(1)
        .mount(&servers.rds)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("LogFileName=trace%2Fx.trc"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&servers.rds)
        .await;

    Mock::given(method("POST"))
        .and(logs_target("DescribeLogGroups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"logGroups": []})))
        .mount(&servers.logs)
        .await;
    Mock::given(method("POST"))
        .and(logs_target("CreateLogGroup"))
        .and(body_partial_json(json!({"logGroupName": "rds_logs"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&servers.logs)
        .await;
    Mock::given(method("POST"))
        .and(logs_target("DescribeLogStreams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"logStreams": []})))
        .mount(&servers.logs)
        .await;
    Mock::given(method("POST"))
        .and(logs_target("CreateLogStream"))
        .and(body_partial_json(json!({"logGroupName": "rds_logs", "logStreamName": INSTANCE})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&servers.logs)
        .await;
    Mock::given(method("POST"))
        .and(logs_target("PutLogEvents"))
        .and(body_partial_json(json!({
            "logGroupName": "rds_logs",
            "logStreamName": INSTANCE,
            "logEvents": [
                {
                    "timestamp": 1_705_312_801_000_i64,
                    "message": "2024-01-15 10:00:01 UTC::@:[7]:LOG:  database system is ready"
                },
                {
                    "timestamp": 1_705_312_802_000_i64,
                    "message": "2024-01-15 10:00:02 UTC::@:[7]:LOG:  checkpoint starting: time"
                }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nextSequenceToken": "t1"})))
        .expect(1)
        .mount(&servers.logs)
        .await;

    let stats = servers.ship().await.unwrap();

    assert_eq!(stats.files_listed, 2);
    assert_eq!(stats.files_skipped, 1);
    assert_eq!(stats.lines_emitted, 2);
    assert_eq!(stats.append_calls, 1);

    let checkpoint = servers.read_checkpoint().unwrap();
    assert_eq!(checkpoint["readState"], json!({ LOG_FILE: "1:200" }));
    assert_eq!(checkpoint["lastReadDate"], json!(stats.last_read_timestamp));
}

// ============================================================================
// Resumption
// ============================================================================

#[tokio::test]
async fn test_resume_with_no_new_data_only_advances_timestamp() {
    let servers = Servers::start().await;
    servers.write_checkpoint(&json!({"lastReadDate": 1000, "readState": {LOG_FILE: "1:200"}}));

    Mock::given(method("POST"))
        .and(body_string_contains("Action=DescribeDBLogFiles"))
        .and(body_string_contains("FileLastWritten=1000"))
        .respond_with(ResponseTemplate::new(200).set_body_string(describe_files(&[LOG_FILE])))
        .expect(1)
        .mount(&servers.rds)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("Action=DownloadDBLogFilePortion"))
        .and(body_string_contains("Marker=1%3A200"))
        .respond_with(ResponseTemplate::new(200).set_body_string(portion("", "1:200", false)))
        .expect(1)
        .mount(&servers.rds)
        .await;
    Mock::given(method("POST"))
        .and(logs_target("PutLogEvents"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&servers.logs)
        .await;

    let stats = servers.ship().await.unwrap();

    assert_eq!(stats.lines_emitted, 0);
    let checkpoint = servers.read_checkpoint().unwrap();
    assert_eq!(checkpoint["readState"], json!({ LOG_FILE: "1:200" }));
    assert!(checkpoint["lastReadDate"].as_i64().unwrap() > 1000);
}

#[tokio::test]
async fn test_resume_threads_existing_sequence_token() {
    let servers = Servers::start().await;
    servers.write_checkpoint(&json!({"lastReadDate": 1000, "readState": {LOG_FILE: "1:200"}}));

    Mock::given(method("POST"))
        .and(body_string_contains("Action=DescribeDBLogFiles"))
        .respond_with(ResponseTemplate::new(200).set_body_string(describe_files(&[LOG_FILE])))
        .mount(&servers.rds)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("Action=DownloadDBLogFilePortion"))
        .and(body_string_contains("Marker=1%3A200"))
        .respond_with(ResponseTemplate::new(200).set_body_string(portion(
            "2024-01-15 11:00:00 UTC::@:[7]:LOG:  new line\n",
            "1:260",
            false,
        )))
        .mount(&servers.rds)
        .await;

    mount_existing_destination(&servers.logs, Some("prior-token")).await;
    Mock::given(method("POST"))
        .and(logs_target("PutLogEvents"))
        .and(body_partial_json(json!({"sequenceToken": "prior-token"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nextSequenceToken": "t2"})))
        .expect(1)
        .mount(&servers.logs)
        .await;

    servers.ship().await.unwrap();

    let checkpoint = servers.read_checkpoint().unwrap();
    assert_eq!(checkpoint["readState"], json!({ LOG_FILE: "1:260" }));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_failed_append_leaves_checkpoint_untouched() {
    let servers = Servers::start().await;
    let prior = json!({"lastReadDate": 1000, "readState": {LOG_FILE: "1:200"}});
    servers.write_checkpoint(&prior);

    Mock::given(method("POST"))
        .and(body_string_contains("Action=DescribeDBLogFiles"))
        .respond_with(ResponseTemplate::new(200).set_body_string(describe_files(&[LOG_FILE])))
        .mount(&servers.rds)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("Action=DownloadDBLogFilePortion"))
        .respond_with(ResponseTemplate::new(200).set_body_string(portion(
            "2024-01-15 11:00:00 UTC::@:[7]:LOG:  new line\n",
            "1:260",
            false,
        )))
        .mount(&servers.rds)
        .await;

    mount_existing_destination(&servers.logs, None).await;
    Mock::given(method("POST"))
        .and(logs_target("PutLogEvents"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "__type": "com.amazonaws.logs#InvalidSequenceTokenException",
            "message": "The given sequenceToken is invalid",
            "expectedSequenceToken": "abc"
        })))
        .expect(1)
        .mount(&servers.logs)
        .await;

    let err = servers.ship().await.unwrap_err();

    assert_eq!(err.aws_code(), Some("InvalidSequenceTokenException"));
    assert_eq!(servers.read_checkpoint(), Some(prior));
}

#[tokio::test]
async fn test_listing_failure_writes_no_checkpoint() {
    let servers = Servers::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=DescribeDBLogFiles"))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            "<ErrorResponse><Error><Type>Sender</Type><Code>DBInstanceNotFound</Code>\
             <Message>DBInstance db-1 not found.</Message></Error></ErrorResponse>",
        ))
        .mount(&servers.rds)
        .await;

    let err = servers.ship().await.unwrap_err();

    assert_eq!(err.aws_code(), Some("DBInstanceNotFound"));
    assert_eq!(servers.read_checkpoint(), None);
}

// ============================================================================
// S3 Checkpoint Bucket
// ============================================================================

#[tokio::test]
async fn test_missing_bucket_is_created_and_checkpoint_saved() {
    let servers = Servers::start().await;
    let s3 = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/rds-state"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&s3)
        .await;
    Mock::given(method("PUT"))
        .and(path("/rds-state"))
        .and(query_param("versioning", ""))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&s3)
        .await;
    Mock::given(method("PUT"))
        .and(path("/rds-state"))
        .and(body_string(""))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&s3)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/rds-state/{KEY}")))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            "<Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message></Error>",
        ))
        .expect(1)
        .mount(&s3)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/rds-state/{KEY}")))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"e1\""))
        .expect(1)
        .mount(&s3)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("Action=DescribeDBLogFiles"))
        .respond_with(ResponseTemplate::new(200).set_body_string(describe_files(&[LOG_FILE])))
        .mount(&servers.rds)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("Action=DownloadDBLogFilePortion"))
        .respond_with(ResponseTemplate::new(200).set_body_string(portion(
            "2024-01-15 10:00:01 UTC::@:[7]:LOG:  database system is ready\n",
            "1:64",
            false,
        )))
        .mount(&servers.rds)
        .await;
    mount_existing_destination(&servers.logs, None).await;
    Mock::given(method("POST"))
        .and(logs_target("PutLogEvents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nextSequenceToken": "t1"})))
        .expect(1)
        .mount(&servers.logs)
        .await;

    let mut vars = servers.env();
    vars.remove("CHECKPOINT_URL");
    vars.insert("BUCKET_NAME".to_string(), "rds-state".to_string());
    vars.insert("S3_ENDPOINT_URL".to_string(), s3.uri());
    let settings = Settings::from_env_map(&vars).unwrap();
    let runner = Runner::new(Cli::parse_from(["rds-log-shipper"])).with_env(vars);

    let stats = runner.ship(&settings).await.unwrap();
    assert_eq!(stats.lines_emitted, 1);

    let requests = s3.received_requests().await.unwrap();
    assert_eq!(requests[0].method.as_str(), "HEAD");
    let saved = requests
        .iter()
        .find(|r| r.method.as_str() == "PUT" && r.url.path() == format!("/rds-state/{KEY}"))
        .expect("checkpoint object written");
    let checkpoint: Value = serde_json::from_slice(&saved.body).unwrap();
    assert_eq!(checkpoint["readState"][LOG_FILE], "1:64");
}
