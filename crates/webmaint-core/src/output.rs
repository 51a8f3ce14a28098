//! JSON output types and serialization for CLI responses.
//!
//! Every response has `status` as its first field and carries
//! `schema_version`. Errors use [`ErrorResponse`]; each subcommand has its
//! own success response type.

use std::io::{self, Write};

use serde::Serialize;

use crate::categories::ActivationReport;
use crate::error::{MaintError, OutputErrorCode};
use crate::guard::PatchReport;
use crate::migration::{McpInvocation, MigrationRequest, ToolOutput};
use crate::sql::SqlRunReport;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Errors
// ============================================================================

/// Error details for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    /// Numeric error code, also the process exit code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    /// Create from a MaintError.
    pub fn from_error(err: &MaintError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let message = err.to_string();

        let details = match err {
            MaintError::FileNotFound { path } => Some(serde_json::json!({ "path": path })),
            MaintError::ToolFailed {
                program,
                exit_code,
                output,
                ..
            } => {
                let mut details = serde_json::json!({
                    "program": program,
                    "exit_code": exit_code
                });
                if let Some(output) = output {
                    details["stdout"] = output.stdout.clone().into();
                    details["stderr"] = output.stderr.clone().into();
                    details["timed_out"] = output.timed_out.into();
                }
                Some(details)
            }
            MaintError::SqlFailed {
                function, results, ..
            } => Some(serde_json::json!({
                "function": function,
                "results": results
            })),
            MaintError::Remote {
                status: Some(status),
                ..
            } => Some(serde_json::json!({ "status": status })),
            _ => None,
        };

        ErrorInfo {
            code,
            message,
            details,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from a MaintError.
    pub fn from_error(err: &MaintError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Command Responses
// ============================================================================

/// Response for `guard`.
#[derive(Debug, Clone, Serialize)]
pub struct GuardResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Root directory that was scanned.
    pub root: String,
    #[serde(flatten)]
    pub report: PatchReport,
}

impl GuardResponse {
    pub fn new(root: impl Into<String>, report: PatchReport) -> Self {
        GuardResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            root: root.into(),
            report,
        }
    }
}

/// Response for `migrate`.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    pub project_id: String,
    pub name: String,
    /// Program and arguments that were run.
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<ToolOutput>,
}

impl MigrationResponse {
    /// Response for a completed run.
    pub fn new(request: &MigrationRequest, invocation: &McpInvocation, output: ToolOutput) -> Self {
        MigrationResponse::build(request, invocation, Some(output))
    }

    /// Response for a dry run that only shows the command.
    pub fn planned(request: &MigrationRequest, invocation: &McpInvocation) -> Self {
        MigrationResponse::build(request, invocation, None)
    }

    fn build(
        request: &MigrationRequest,
        invocation: &McpInvocation,
        output: Option<ToolOutput>,
    ) -> Self {
        let mut command = vec![invocation.program().to_string()];
        command.extend(invocation.args());
        MigrationResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            project_id: request.project_id.clone(),
            name: request.name.clone(),
            command,
            output,
        }
    }
}

/// Response for `exec-sql` when every file succeeded.
///
/// Failures are reported through [`MaintError::SqlFailed`] instead.
#[derive(Debug, Clone, Serialize)]
pub struct ExecSqlResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Remote function that received the SQL.
    pub function: String,
    pub results: Vec<SqlRunReport>,
}

impl ExecSqlResponse {
    pub fn new(function: impl Into<String>, results: Vec<SqlRunReport>) -> Self {
        ExecSqlResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            function: function.into(),
            results,
        }
    }
}

/// Response for `categories activate`.
#[derive(Debug, Clone, Serialize)]
pub struct CategoriesResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    #[serde(flatten)]
    pub report: ActivationReport,
}

impl CategoriesResponse {
    pub fn new(report: ActivationReport) -> Self {
        CategoriesResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            report,
        }
    }
}

// ============================================================================
// Emit
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
