//! Error types for the log shipper
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for the log shipper
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // AWS Service Errors
    // ============================================================================
    #[error("{service} error {code}: {message}")]
    Aws {
        service: String,
        code: String,
        message: String,
    },

    #[error("XML parsing error: {message}")]
    XmlParse { message: String },

    #[error("Request signing failed: {message}")]
    Signing { message: String },

    // ============================================================================
    // Checkpoint Errors
    // ============================================================================
    #[error("Checkpoint error: {message}")]
    Checkpoint { message: String },

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    // ============================================================================
    // Data Errors
    // ============================================================================
    #[error("Unparseable timestamp in '{file}': {line}")]
    MalformedLine { file: String, line: String },

    // ============================================================================
    // Run Control
    // ============================================================================
    #[error("Run exceeded its deadline of {seconds}s")]
    Deadline { seconds: u64 },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create an AWS service error
    pub fn aws(
        service: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Aws {
            service: service.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create an XML parse error
    pub fn xml(message: impl Into<String>) -> Self {
        Self::XmlParse {
            message: message.into(),
        }
    }

    /// Create a checkpoint error
    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::Checkpoint {
            message: message.into(),
        }
    }

    /// Create a malformed line error
    pub fn malformed_line(file: impl Into<String>, line: impl Into<String>) -> Self {
        Self::MalformedLine {
            file: file.into(),
            line: line.into(),
        }
    }

    /// AWS error code, if this is a service error
    pub fn aws_code(&self) -> Option<&str> {
        match self {
            Error::Aws { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Check if this error means "the resource does not exist"
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::ObjectStore(object_store::Error::NotFound { .. }) => true,
            Error::Aws { code, .. } => {
                code == "ResourceNotFoundException"
                    || code == "NoSuchBucket"
                    || code.ends_with("NotFound")
            }
            Error::HttpStatus { status, .. } => *status == 404,
            _ => false,
        }
    }

    /// Check if a create call failed only because the resource already exists
    pub fn is_already_exists(&self) -> bool {
        self.aws_code() == Some("ResourceAlreadyExistsException")
    }
}

/// Result type alias for the log shipper
pub type Result<T> = std::result::Result<T, Error>;
