//! Error types for the migration engine.

use thiserror::Error;

use crate::settings::ValidationError;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (malformed settings file, missing extension, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// One or more settings failed validation; every offending property is named.
    #[error("Settings validation failed: {}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),

    /// An extension failed during read or write.
    #[error("Extension '{name}' failed in operation {operation}: {message}")]
    Extension {
        name: String,
        operation: usize,
        message: String,
    },

    /// Fewer records were written than read.
    #[error("Partial write: {written} of {total} records written")]
    PartialWrite { written: i64, total: i64 },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV encoding/decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Run was cancelled (SIGINT, etc.)
    #[error("Run cancelled")]
    Cancelled,
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl MigrateError {
    /// Create an Extension error with context about which operation failed.
    pub fn extension(
        name: impl Into<String>,
        operation: usize,
        message: impl Into<String>,
    ) -> Self {
        MigrateError::Extension {
            name: name.into(),
            operation,
            message: message.into(),
        }
    }

    /// Process exit code for this error class.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) => 2,
            MigrateError::Validation(_) => 3,
            MigrateError::PartialWrite { .. } => 4,
            MigrateError::Cancelled => 130,
            _ => 1,
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_every_property() {
        let err = MigrateError::Validation(vec![
            ValidationError::new("FilePath", "required setting is missing"),
            ValidationError::new("Mode", "value 'x' is not one of: insert, upsert"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("FilePath"));
        assert!(msg.contains("Mode"));
    }

    #[test]
    fn test_exit_codes_distinct_per_class() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), 2);
        assert_eq!(MigrateError::Validation(vec![]).exit_code(), 3);
        assert_eq!(
            MigrateError::PartialWrite {
                written: 3,
                total: 5
            }
            .exit_code(),
            4
        );
        assert_eq!(MigrateError::Cancelled.exit_code(), 130);
    }

    #[test]
    fn test_partial_write_reports_counts() {
        let err = MigrateError::PartialWrite {
            written: 3,
            total: 5,
        };
        assert_eq!(err.to_string(), "Partial write: 3 of 5 records written");
    }
}
