//! Error types for offertory.
//!
//! This module defines all error types used throughout the offertory crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for offertory operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Insight Errors ===
    /// No credential is configured for the text-generation service.
    #[error("missing API key for the text-generation service")]
    MissingCredential,

    /// The text-generation request failed in transport.
    #[error("text-generation request failed: {0}")]
    InsightTransport(#[from] reqwest::Error),

    /// The text-generation service answered with a non-success status.
    #[error("text-generation service returned {status}: {body}")]
    InsightStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The text-generation response carried no usable text.
    #[error("text-generation response was empty or malformed: {0}")]
    InsightResponse(String),

    // === Ledger Errors ===
    /// A sum of amounts went past the largest representable value.
    #[error("sum of donation amounts is too large to represent")]
    AmountOverflow,

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write an output file.
    #[error("failed to write {path}: {source}")]
    FileWrite {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for offertory operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create an empty or malformed response error.
    #[must_use]
    pub fn insight_response(message: impl Into<String>) -> Self {
        Self::InsightResponse(message.into())
    }

    /// Check if this error came from the text-generation service call.
    #[must_use]
    pub fn is_insight_error(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential
                | Self::InsightTransport(_)
                | Self::InsightStatus { .. }
                | Self::InsightResponse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MissingCredential;
        assert_eq!(
            err.to_string(),
            "missing API key for the text-generation service"
        );

        let err = Error::AmountOverflow;
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_is_insight_error() {
        assert!(Error::MissingCredential.is_insight_error());
        assert!(Error::insight_response("no candidates").is_insight_error());
        assert!(Error::InsightStatus {
            status: 401,
            body: "unauthorized".to_string()
        }
        .is_insight_error());
        assert!(!Error::AmountOverflow.is_insight_error());
    }

    #[test]
    fn test_insight_status_display() {
        let err = Error::InsightStatus {
            status: 503,
            body: "overloaded".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("overloaded"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::config_validation("timeout_secs must be greater than 0");
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_file_write_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::FileWrite {
            path: PathBuf::from("/receipts/林志遠_2025年度奉獻收據.txt"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("林志遠_2025年度奉獻收據.txt"));
        assert!(msg.contains("access denied"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
