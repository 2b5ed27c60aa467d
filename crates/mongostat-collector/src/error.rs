//! Error types for mongostat-collector

use thiserror::Error;

/// Boxed error returned by a [`StatsSource`](crate::StatsSource) implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to obtain a snapshot from the database.
///
/// This is the only error a collector surfaces per cycle. The caller logs it
/// and skips the export for that (collector, collection) pair.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport or command error reported by the database client
    #[error("{command} failed: {source}")]
    Command {
        command: &'static str,
        #[source]
        source: BoxError,
    },

    /// The response did not have the expected shape
    #[error("failed to decode `{field}`: {reason}")]
    Decode { field: String, reason: String },
}

impl FetchError {
    pub(crate) fn command(command: &'static str, source: BoxError) -> Self {
        Self::Command { command, source }
    }

    pub(crate) fn decode(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while setting up or encoding metrics
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Descriptor creation, registration or text encoding failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Encoded exposition was not valid UTF-8
    #[error("Encoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Result type alias for collector setup operations
pub type Result<T> = std::result::Result<T, CollectorError>;
