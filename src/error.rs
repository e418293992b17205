//! Error types for the page loader

use thiserror::Error;

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading page data
#[derive(Error, Debug)]
pub enum Error {
    /// The request URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A query value could not be decoded as superjson
    #[error("superjson decoding failed: {0}")]
    Superjson(String),

    /// The configs payload was not valid percent-encoded UTF-8
    #[error("Percent-decoding failed: {0}")]
    PercentDecode(String),

    /// The configs payload was not valid base64
    #[error("Invalid base64 input: {0}")]
    Base64(String),

    /// The decoded payload was not a readable zip archive
    #[error("Archive error: {0}")]
    Archive(String),

    /// The icon config entry did not hold a JSON list
    #[error("Malformed icon configs: {0}")]
    IconConfigs(String),

    /// I/O failure while reading or writing an archive
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking archive task was cancelled or panicked
    #[error("Archive task failed: {0}")]
    Task(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this failure came from the archive payload itself (bad
    /// base64, corrupt zip) rather than from the data inside it.
    pub fn is_archive_failure(&self) -> bool {
        matches!(
            self,
            Error::PercentDecode(_) | Error::Base64(_) | Error::Archive(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Superjson(err.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Archive(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::Base64(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_failures_are_classified() {
        assert!(Error::Base64("x".into()).is_archive_failure());
        assert!(Error::Archive("x".into()).is_archive_failure());
        assert!(!Error::IconConfigs("x".into()).is_archive_failure());
        assert!(!Error::Superjson("x".into()).is_archive_failure());
    }
}
