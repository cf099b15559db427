//! Error types for domsync.
//!
//! This module provides a unified error type with explicit variants for
//! local storage, remote submission, and input validation errors.

use thiserror::Error;

/// The unified error type for domsync operations.
///
/// Every failure in the offline-sync subsystem is either retried on a later
/// drain or reported to the immediate caller; there is no fatal class.
#[derive(Debug, Error)]
pub enum Error {
    /// Local persistence errors (queue storage unavailable or write failed).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Remote submission errors (store unreachable or write rejected).
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Input validation errors (invalid table name, payload, URL).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

/// Local persistence errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The platform denied access to local storage (quota, permissions).
    #[error("storage unavailable: {message}")]
    Unavailable { message: String },

    /// A write to local storage failed; the operation was not queued.
    #[error("storage write failed: {message}")]
    Write { message: String },

    /// Reading local storage failed.
    #[error("storage read failed: {message}")]
    Read { message: String },
}

/// Errors from submitting an operation to the remote store.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// The remote store could not be reached. A drain pass stops here.
    #[error("remote unavailable: {message}")]
    Unavailable { message: String },

    /// The remote store refused the write (validation, constraint violation).
    #[error("{}", format_rejection(*status, code.as_deref(), message))]
    Rejected {
        /// HTTP-like status code, if the remote reported one.
        status: Option<u16>,
        /// Machine-readable error code from the remote.
        code: Option<String>,
        /// Human-readable reason.
        message: String,
    },
}

fn format_rejection(status: Option<u16>, code: Option<&str>, message: &str) -> String {
    let mut out = String::from("remote rejected write");
    if let Some(status) = status {
        out.push_str(&format!(" (HTTP {})", status));
    }
    if let Some(code) = code {
        out.push_str(&format!(" [{}]", code));
    }
    out.push_str(": ");
    out.push_str(message);
    out
}

impl RemoteError {
    /// Create a rejection with only a message.
    pub fn rejected(message: impl Into<String>) -> Self {
        RemoteError::Rejected {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// Create an unavailability error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        RemoteError::Unavailable {
            message: message.into(),
        }
    }

    /// Check if the remote could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RemoteError::Unavailable { .. })
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid remote table name.
    #[error("invalid table name '{value}': {reason}")]
    TableName { value: String, reason: String },

    /// Invalid record payload.
    #[error("invalid payload: {reason}")]
    Payload { reason: String },

    /// Invalid remote URL.
    #[error("invalid remote URL '{value}': {reason}")]
    RemoteUrl { value: String, reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}
