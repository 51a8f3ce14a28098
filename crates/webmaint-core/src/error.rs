//! Error types and error code constants for webmaint.
//!
//! This module provides a unified error type (`MaintError`) that bridges
//! domain-specific errors from the subsystems (config, migration, Supabase
//! client, guard patcher) into a common format suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments or configuration
//! - `3`: File not found
//! - `5`: External failures (MCP tool exited non-zero, remote service error,
//!   SQL file rejected)
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;
use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::migration::ToolOutput;
use crate::sql::SqlRunReport;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller or invalid configuration.
    InvalidArguments = 2,
    /// An input file does not exist.
    ResolutionError = 3,
    /// The external tool or the remote service reported a failure.
    ExternalFailure = 5,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum MaintError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Configuration could not be loaded or is incomplete.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// The external command-line tool failed or could not be started.
    ///
    /// `output` holds what the tool printed when it ran at all.
    #[error("{program} failed: {message}")]
    ToolFailed {
        program: String,
        message: String,
        exit_code: Option<i32>,
        output: Option<Box<ToolOutput>>,
    },

    /// One or more SQL files were rejected or could not be sent.
    #[error("{failed} of {attempted} SQL files failed", attempted = results.len())]
    SqlFailed {
        function: String,
        failed: usize,
        results: Vec<SqlRunReport>,
    },

    /// The remote service rejected a request or could not be reached.
    #[error("remote error: {message}")]
    Remote {
        message: String,
        status: Option<u16>,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

/// Result alias used throughout the crate.
pub type MaintResult<T> = Result<T, MaintError>;

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&MaintError> for OutputErrorCode {
    fn from(err: &MaintError) -> Self {
        match err {
            MaintError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            MaintError::Config { .. } => OutputErrorCode::InvalidArguments,
            MaintError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            MaintError::ToolFailed { .. } => OutputErrorCode::ExternalFailure,
            MaintError::SqlFailed { .. } => OutputErrorCode::ExternalFailure,
            MaintError::Remote { .. } => OutputErrorCode::ExternalFailure,
            MaintError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<MaintError> for OutputErrorCode {
    fn from(err: MaintError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<ConfigError> for MaintError {
    fn from(err: ConfigError) -> Self {
        MaintError::Config {
            message: err.to_string(),
        }
    }
}

impl From<io::Error> for MaintError {
    fn from(err: io::Error) -> Self {
        MaintError::InternalError {
            message: format!("IO error: {}", err),
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl MaintError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        MaintError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        MaintError::FileNotFound { path: path.into() }
    }

    /// Create a remote error.
    pub fn remote(message: impl Into<String>, status: Option<u16>) -> Self {
        MaintError::Remote {
            message: message.into(),
            status,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        MaintError::InternalError {
            message: message.into(),
        }
    }

    /// Map an error from reading an input file, keeping "not found" distinct.
    pub fn from_read(path: &std::path::Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            MaintError::file_not_found(path.display().to_string())
        } else {
            MaintError::internal(format!("failed to read {}: {}", path.display(), err))
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
