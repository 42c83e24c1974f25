//! Error types for the core library

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// On-disk format of a task file, used to label format errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Xml,
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("JSON"),
            Self::Xml => f.write_str("XML"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// One message per violated rule
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    /// Underlying I/O failure while touching the task file
    #[error("Storage error: failed to {operation} {}: {source}", .path.display())]
    Storage {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file content is not syntactically valid
    #[error("Invalid {format} format in {}: {message}", .path.display())]
    Format {
        format: FileFormat,
        path: PathBuf,
        message: String,
    },

    /// A stored record could not be mapped to a task
    #[error("Failed to convert record {record} to a task: {message}")]
    Conversion { record: String, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn storage(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Storage {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn conversion(record: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Conversion {
            record: record.into(),
            message: message.to_string(),
        }
    }

    /// Validation messages, empty for every other variant
    pub fn violations(&self) -> &[String] {
        match self {
            Self::Validation(messages) => messages,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_joins_every_message() {
        let err = Error::Validation(vec![
            "Title cannot be empty or whitespace only".to_string(),
            "Due date cannot be in the past".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: Title cannot be empty or whitespace only; Due date cannot be in the past"
        );
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_storage_keeps_source() {
        let err = Error::storage(
            "read",
            "/tmp/todos.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("failed to read /tmp/todos.json"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
