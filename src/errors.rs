//! Unified application error type.
//! All modules (backend, db, core, cli, utils) return AppError to keep the
//! error handling consistent and easy to manage.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Database / serialization
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ---------------------------
    // Parsing errors
    // ---------------------------
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Invalid time format: {0}")]
    InvalidTime(String),

    #[error("Invalid punch type: {0}")]
    InvalidPunchType(String),

    #[error("Invalid leave type: {0}")]
    InvalidLeaveType(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ---------------------------
    // Authentication
    // ---------------------------
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Not authenticated: run `rponto login` first")]
    NotAuthenticated,

    #[error("Session expired or revoked")]
    SessionExpired,

    #[error("Invalid or expired password reset link")]
    InvalidResetToken,

    // ---------------------------
    // Permissions (fail closed)
    // ---------------------------
    #[error("Biometric confirmation failed")]
    BiometricFailed,

    #[error("Location permission required")]
    LocationDenied,

    #[error("An attachment is required for {0}")]
    AttachmentRequired(String),

    #[error("Terms of use version {0} not accepted: run `rponto terms --accept`")]
    TermsNotAccepted(String),

    // ---------------------------
    // Backend
    // ---------------------------
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Unknown remote procedure: {0}")]
    UnknownRpc(String),

    #[error("Invalid record in {table}: {reason}")]
    InvalidRecord { table: String, reason: String },

    #[error("Object already exists: {0}")]
    ObjectExists(String),

    // ---------------------------
    // Lookups
    // ---------------------------
    #[error("Collaborator profile not found")]
    ProfileNotFound,

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration")]
    ConfigLoad,

    #[error("Export error: {0}")]
    Export(String),

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

/// How a failure has to be treated at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Surfaced to the user, never retried.
    Auth,
    /// Aborts the action before anything is persisted.
    Permission,
    /// Backend read failure: the caller falls back to an empty/default state.
    Read,
    /// Backend write failure: logged, not retried.
    Write,
    /// Bad user input.
    Input,
    Internal,
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::InvalidCredentials
            | AppError::NotAuthenticated
            | AppError::SessionExpired
            | AppError::InvalidResetToken => ErrorCategory::Auth,
            AppError::BiometricFailed
            | AppError::LocationDenied
            | AppError::AttachmentRequired(_)
            | AppError::TermsNotAccepted(_) => ErrorCategory::Permission,
            AppError::Db(_)
            | AppError::Backend(_)
            | AppError::UnknownRpc(_)
            | AppError::InvalidRecord { .. }
            | AppError::Json(_) => ErrorCategory::Read,
            AppError::ObjectExists(_) | AppError::Io(_) => ErrorCategory::Write,
            AppError::InvalidDate(_)
            | AppError::InvalidTime(_)
            | AppError::InvalidPunchType(_)
            | AppError::InvalidLeaveType(_)
            | AppError::InvalidStatus(_)
            | AppError::InvalidInput(_)
            | AppError::ProfileNotFound
            | AppError::DocumentNotFound(_)
            | AppError::NotFound(_) => ErrorCategory::Input,
            _ => ErrorCategory::Internal,
        }
    }

    pub fn invalid_record(table: &str, reason: impl Into<String>) -> Self {
        AppError::InvalidRecord {
            table: table.to_string(),
            reason: reason.into(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_errors_fail_closed() {
        assert_eq!(AppError::BiometricFailed.category(), ErrorCategory::Permission);
        assert_eq!(AppError::LocationDenied.category(), ErrorCategory::Permission);
        assert_eq!(
            AppError::AttachmentRequired("ATESTADO".into()).category(),
            ErrorCategory::Permission
        );
        assert_eq!(
            AppError::TermsNotAccepted("1.0".into()).category(),
            ErrorCategory::Permission
        );
    }

    #[test]
    fn auth_errors_are_surfaced() {
        assert_eq!(AppError::InvalidCredentials.category(), ErrorCategory::Auth);
        assert_eq!(AppError::SessionExpired.category(), ErrorCategory::Auth);
        assert_eq!(AppError::InvalidResetToken.category(), ErrorCategory::Auth);
    }
}
