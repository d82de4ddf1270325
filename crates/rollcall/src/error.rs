//! Error types for rollcall.
//!
//! Every fallible operation in the crate returns [`Error`]. Variants are grouped
//! by the failure class the caller has to react to; [`Error::kind`] collapses
//! them into the coarse [`ErrorKind`] taxonomy used for user-facing messages.
//! None of these errors is fatal to the process.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::storage::StoreKey;

/// The main error type for rollcall operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Duplicate Keys ===
    /// A student with this roll number already exists.
    #[error("roll number '{roll_number}' already exists")]
    DuplicateRoll {
        /// The conflicting roll number.
        roll_number: String,
    },

    /// A faculty member with this code already exists.
    #[error("faculty code '{faculty_code}' already exists")]
    DuplicateFacultyCode {
        /// The conflicting faculty code.
        faculty_code: String,
    },

    /// Attendance was already recorded for this student, class and date.
    #[error("{student_name} already marked {status} for {class_section} on {date}")]
    DuplicateForDay {
        /// Name of the student, as recorded.
        student_name: String,
        /// Class section of the existing record.
        class_section: String,
        /// Calendar date of the existing record.
        date: NaiveDate,
        /// Status of the existing record.
        status: String,
    },

    // === Missing Entities ===
    /// No student with this id exists.
    #[error("student not found: {0}")]
    StudentNotFound(Uuid),

    /// No attendance record with this id exists.
    #[error("attendance record not found: {0}")]
    RecordNotFound(Uuid),

    // === Invalid Input ===
    /// A required field was empty or a value was out of range.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of what was wrong.
        message: String,
    },

    /// A backup document could not be restored. Nothing was changed.
    #[error("invalid backup document: {message}")]
    InvalidBackup {
        /// Description of what was wrong.
        message: String,
    },

    // === Persistence Errors ===
    /// Writing or reading a collection in the external store failed.
    #[error("failed to persist '{key}': {message}")]
    Persistence {
        /// The collection key involved.
        key: StoreKey,
        /// Description of what went wrong.
        message: String,
    },

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

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
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

/// A specialized Result type for rollcall operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A uniqueness rule rejected the operation; nothing was merged.
    DuplicateKey,
    /// The operation referred to a stale or missing id.
    NotFound,
    /// A required field was empty or a document was malformed.
    InvalidInput,
    /// The external store failed; in-memory state stays authoritative.
    PersistenceFailure,
    /// Process configuration could not be loaded.
    Configuration,
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new invalid input error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new invalid backup error.
    #[must_use]
    pub fn invalid_backup(message: impl Into<String>) -> Self {
        Self::InvalidBackup {
            message: message.into(),
        }
    }

    /// Create a new persistence error for the given collection.
    #[must_use]
    pub fn persistence(key: StoreKey, message: impl Into<String>) -> Self {
        Self::Persistence {
            key,
            message: message.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateRoll { .. }
            | Self::DuplicateFacultyCode { .. }
            | Self::DuplicateForDay { .. } => ErrorKind::DuplicateKey,
            Self::StudentNotFound(_) | Self::RecordNotFound(_) => ErrorKind::NotFound,
            Self::InvalidInput { .. } | Self::InvalidBackup { .. } | Self::Json(_) => {
                ErrorKind::InvalidInput
            }
            Self::Persistence { .. }
            | Self::DatabaseOpen { .. }
            | Self::DatabaseQuery(_)
            | Self::DatabaseMigration { .. }
            | Self::Io(_)
            | Self::DirectoryCreate { .. } => ErrorKind::PersistenceFailure,
            Self::ConfigLoad(_) | Self::ConfigValidation { .. } => ErrorKind::Configuration,
        }
    }

    /// Check if this error is a rejected duplicate.
    #[must_use]
    pub fn is_duplicate_key(&self) -> bool {
        self.kind() == ErrorKind::DuplicateKey
    }

    /// Check if this error refers to a missing entity.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_roll_display() {
        let err = Error::DuplicateRoll {
            roll_number: "CS-001".to_string(),
        };
        assert_eq!(err.to_string(), "roll number 'CS-001' already exists");
        assert!(err.is_duplicate_key());
    }

    #[test]
    fn test_duplicate_for_day_display() {
        let err = Error::DuplicateForDay {
            student_name: "Ada".to_string(),
            class_section: "CS-A".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            status: "Late".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Ada already marked Late for CS-A on 2024-01-15"
        );
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
    }

    #[test]
    fn test_not_found_kind() {
        let id = Uuid::new_v4();
        assert!(Error::StudentNotFound(id).is_not_found());
        assert!(Error::RecordNotFound(id).is_not_found());
        assert!(!Error::invalid_input("x").is_not_found());
    }

    #[test]
    fn test_invalid_input_display() {
        let err = Error::invalid_input("class section is required");
        assert_eq!(err.to_string(), "invalid input: class section is required");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_invalid_backup_kind() {
        let err = Error::invalid_backup("missing students");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("missing students"));
    }

    #[test]
    fn test_persistence_error_display() {
        let err = Error::persistence(StoreKey::Attendance, "disk full");
        let msg = err.to_string();
        assert!(msg.contains("attendance"));
        assert!(msg.contains("disk full"));
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
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
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "feed capacity must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("feed capacity"));
        assert_eq!(err.kind(), ErrorKind::Configuration);
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
