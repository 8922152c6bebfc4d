//! Error types for the agent gateway and catalog tooling.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the agent or the data catalog.
#[derive(Error, Debug)]
pub enum Error {
    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success HTTP response
    #[error("HTTP Error {status}: {body}")]
    Status { status: u16, body: String },

    /// Request signing error
    #[error("Signing error: {0}")]
    Signing(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Query did not reach a terminal state in time
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Query reached a terminal state other than success
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short name of the error kind, reported alongside the message in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Aws(_) => "AwsError",
            Error::Config(_) => "ConfigError",
            Error::Validation(_) => "ValidationError",
            Error::Http(_) | Error::Status { .. } => "HttpError",
            Error::Signing(_) => "SigningError",
            Error::Io(_) => "IoError",
            Error::Csv(_) => "CsvError",
            Error::Serialization(_) => "SerializationError",
            Error::Timeout(_) => "TimeoutError",
            Error::QueryFailed(_) => "QueryFailed",
            Error::Internal(_) => "InternalError",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message() {
        let err = Error::Status {
            status: 403,
            body: "Forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP Error 403: Forbidden");
        assert_eq!(err.kind(), "HttpError");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Error::Http("boom".into()).kind(), "HttpError");
        assert_eq!(Error::Config("x".into()).kind(), "ConfigError");
    }
}
