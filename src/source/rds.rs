//! RDS log source
//!
//! `DescribeDBLogFiles` lists files written since a timestamp (following
//! the pagination marker); `DownloadDBLogFilePortion` returns text from a
//! marker onward plus the marker to continue from.

use super::types::{LogFileDescriptor, LogPortion, LogSource};
use crate::aws::{xml, AwsClient};
use crate::error::{Error, Result};
use crate::types::EpochMillis;
use async_trait::async_trait;
use tracing::debug;

const RDS_VERSION: &str = "2014-10-31";

/// Log source backed by the RDS API
#[derive(Debug)]
pub struct RdsLogSource {
    aws: AwsClient,
}

impl RdsLogSource {
    pub fn new(aws: AwsClient) -> Self {
        Self { aws }
    }
}

#[async_trait]
impl LogSource for RdsLogSource {
    async fn list_changed_files(
        &self,
        instance: &str,
        since: EpochMillis,
    ) -> Result<Vec<LogFileDescriptor>> {
        let mut files = Vec::new();
        let mut page_marker: Option<String> = None;

        loop {
            let mut params = vec![
                ("DBInstanceIdentifier", instance.to_string()),
                ("FileLastWritten", since.to_string()),
            ];
            if let Some(marker) = &page_marker {
                params.push(("Marker", marker.clone()));
            }

            let doc = self
                .aws
                .query_call("DescribeDBLogFiles", RDS_VERSION, &params)
                .await?;
            let page = parse_describe_log_files(&doc)?;
            debug!(instance, files = page.files.len(), "Listed log file page");
            files.extend(page.files);

            match page.next_page {
                Some(marker) => page_marker = Some(marker),
                None => break,
            }
        }

        Ok(files)
    }

    async fn fetch_portion(&self, instance: &str, file: &str, marker: &str) -> Result<LogPortion> {
        let doc = self
            .aws
            .query_call(
                "DownloadDBLogFilePortion",
                RDS_VERSION,
                &[
                    ("DBInstanceIdentifier", instance.to_string()),
                    ("LogFileName", file.to_string()),
                    ("Marker", marker.to_string()),
                ],
            )
            .await?;
        parse_download_portion(&doc, marker)
    }
}

/// One page of `DescribeDBLogFiles`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribePage {
    pub files: Vec<LogFileDescriptor>,
    pub next_page: Option<String>,
}

/// Parse a `DescribeDBLogFiles` response
pub fn parse_describe_log_files(doc: &str) -> Result<DescribePage> {
    let result = xml::element(doc, "DescribeDBLogFilesResult")
        .ok_or_else(|| Error::xml("missing <DescribeDBLogFilesResult>"))?;

    let mut files = Vec::new();
    if let Some(list) = xml::element(result, "DescribeDBLogFiles") {
        for details in xml::elements(list, "DescribeDBLogFilesDetails") {
            let name = xml::required_text(details, "LogFileName")?;
            let last_written = xml::required_text(details, "LastWritten")?;
            let last_written: EpochMillis = last_written.trim().parse().map_err(|_| {
                Error::xml(format!("LastWritten '{last_written}' of '{name}' is not a number"))
            })?;
            files.push(LogFileDescriptor { name, last_written });
        }
    }

    // The page marker sits after the file list, so look past it
    let after_list = result
        .rfind("</DescribeDBLogFiles>")
        .map_or(result, |pos| &result[pos..]);
    let next_page = xml::element_text(after_list, "Marker")
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());

    Ok(DescribePage { files, next_page })
}

/// Parse a `DownloadDBLogFilePortion` response
///
/// When the response carries no marker the requested one is kept, so a
/// file never rewinds.
pub fn parse_download_portion(doc: &str, requested_marker: &str) -> Result<LogPortion> {
    let result = xml::element(doc, "DownloadDBLogFilePortionResult")
        .ok_or_else(|| Error::xml("missing <DownloadDBLogFilePortionResult>"))?;

    let data = xml::element_text(result, "LogFileData").unwrap_or_default();
    let next_marker = xml::element_text(result, "Marker")
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| requested_marker.to_string());
    let additional_data_pending = xml::element_text(result, "AdditionalDataPending")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

    Ok(LogPortion {
        data,
        next_marker,
        additional_data_pending,
    })
}
