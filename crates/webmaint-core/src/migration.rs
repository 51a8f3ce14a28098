//! Migration applier.
//!
//! Applies a SQL migration by invoking an MCP command-line client:
//!
//! ```text
//! manus-mcp-cli tool call apply_migration --server supabase \
//!     --input '{"project_id":"...","name":"...","query":"..."}'
//! ```
//!
//! The client's stdout and stderr are captured and handed back to the caller
//! verbatim. The child is waited on with an OS-level timeout; its pipes are
//! drained on helper threads so a large response cannot fill a pipe buffer
//! while we wait. Once the child is gone the readers get [`PIPE_GRACE`] to
//! finish: a grandchild that inherited the pipes can keep them open long
//! after the child exits, and whatever was read by then is returned.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

use crate::config::MigrationConfig;
use crate::error::{MaintError, MaintResult};

// ============================================================================
// Request Payload
// ============================================================================

/// Input object of the `apply_migration` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRequest {
    /// Target project reference.
    pub project_id: String,
    /// Migration name recorded by the server.
    pub name: String,
    /// Full SQL text.
    pub query: String,
}

impl MigrationRequest {
    /// Build a request, rejecting empty identifiers.
    pub fn new(
        project_id: impl Into<String>,
        name: impl Into<String>,
        query: impl Into<String>,
    ) -> MaintResult<Self> {
        let request = MigrationRequest {
            project_id: project_id.into(),
            name: name.into(),
            query: query.into(),
        };
        if request.project_id.trim().is_empty() {
            return Err(MaintError::invalid_args("project id must not be empty"));
        }
        if request.name.trim().is_empty() {
            return Err(MaintError::invalid_args("migration name must not be empty"));
        }
        Ok(request)
    }

    /// Build a request whose query is the full text of `sql_file`.
    ///
    /// When `name` is `None` the file stem is used (`001_init.sql` -> `001_init`).
    pub fn from_file(project_id: &str, name: Option<&str>, sql_file: &Path) -> MaintResult<Self> {
        let query = std::fs::read_to_string(sql_file)
            .map_err(|e| MaintError::from_read(sql_file, e))?;
        let name = match name {
            Some(name) => name.to_string(),
            None => migration_name_from_path(sql_file).ok_or_else(|| {
                MaintError::invalid_args(format!(
                    "cannot derive a migration name from {}; pass --name",
                    sql_file.display()
                ))
            })?,
        };
        MigrationRequest::new(project_id, name, query)
    }

    /// Compact JSON passed as the tool's `--input`.
    pub fn to_json(&self) -> MaintResult<String> {
        serde_json::to_string(self)
            .map_err(|e| MaintError::internal(format!("failed to encode migration input: {}", e)))
    }
}

/// Derive a migration name from a SQL file path.
pub fn migration_name_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

// ============================================================================
// Tool Invocation
// ============================================================================

/// How long captured pipes may stay open after the child has exited.
pub const PIPE_GRACE: Duration = Duration::from_secs(2);

/// Captured result of running the MCP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// Whether the process was killed for exceeding the timeout.
    pub timed_out: bool,
    /// Wall-clock time spent waiting.
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl ToolOutput {
    /// True when the tool exited with status 0 within the timeout.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Serde helper for `Duration` as `f64` seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

/// A fully resolved `tool call` command line.
#[derive(Debug, Clone)]
pub struct McpInvocation {
    program: String,
    program_args: Vec<String>,
    tool: String,
    server: String,
    input: String,
    timeout: Option<Duration>,
}

impl McpInvocation {
    /// Build the invocation for `request` using the configured client.
    ///
    /// A `timeout_secs` of zero waits indefinitely.
    pub fn new(config: &MigrationConfig, request: &MigrationRequest) -> MaintResult<Self> {
        Ok(McpInvocation {
            program: config.program.clone(),
            program_args: config.program_args.clone(),
            tool: config.tool.clone(),
            server: config.server.clone(),
            input: request.to_json()?,
            timeout: (config.timeout_secs > 0).then(|| config.timeout()),
        })
    }

    /// Program that will be spawned.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// JSON passed via `--input`.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Arguments passed to the program.
    pub fn args(&self) -> Vec<String> {
        let mut args = self.program_args.clone();
        args.extend([
            "tool".to_string(),
            "call".to_string(),
            self.tool.clone(),
            "--server".to_string(),
            self.server.clone(),
            "--input".to_string(),
            self.input.clone(),
        ]);
        args
    }

    /// Spawn the client and wait for it.
    ///
    /// A non-zero exit is not an error here; callers inspect
    /// [`ToolOutput::success`] after relaying the output. Failing to start the
    /// program is an error.
    pub fn run(&self) -> MaintResult<ToolOutput> {
        let start = Instant::now();
        info!("Running {} tool call {}", self.program, self.tool);
        debug!("Input payload is {} bytes", self.input.len());

        let mut child = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let (status, timed_out) = match self.timeout {
            Some(timeout) => match child.wait_timeout(timeout)? {
                Some(status) => (Some(status), false),
                None => {
                    let _ = child.kill();
                    let _ = child.wait(); // Reap the zombie
                    warn!("{} timed out after {:?}", self.program, timeout);
                    (None, true)
                }
            },
            None => (Some(child.wait()?), false),
        };

        let deadline = Instant::now() + PIPE_GRACE;
        let output = ToolOutput {
            stdout: collect(stdout, deadline),
            stderr: collect(stderr, deadline),
            exit_code: status.and_then(|s| s.code()),
            timed_out,
            duration: start.elapsed(),
        };
        debug!(
            "{} finished: exit={:?} timed_out={} in {:?}",
            self.program, output.exit_code, output.timed_out, output.duration
        );
        Ok(output)
    }

    fn spawn_error(&self, err: io::Error) -> MaintError {
        let message = if err.kind() == io::ErrorKind::NotFound {
            "program not found on PATH".to_string()
        } else {
            format!("failed to start: {}", err)
        };
        MaintError::ToolFailed {
            program: self.program.clone(),
            message,
            exit_code: None,
            output: None,
        }
    }

    /// Error describing an unsuccessful run, carrying the captured output.
    pub fn failure(&self, output: &ToolOutput) -> MaintError {
        let message = if output.timed_out {
            match self.timeout {
                Some(t) => format!("timed out after {}s", t.as_secs()),
                None => "timed out".to_string(),
            }
        } else {
            match output.exit_code {
                Some(code) => format!("exited with status {}", code),
                None => "terminated by signal".to_string(),
            }
        };
        MaintError::ToolFailed {
            program: self.program.clone(),
            message,
            exit_code: output.exit_code,
            output: Some(Box::new(output.clone())),
        }
    }
}

/// A pipe being read on a helper thread.
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Drain> {
    pipe.map(|mut pipe| {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let (tx, done) = mpsc::channel();
        let sink = Arc::clone(&buf);
        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => match sink.lock() {
                        Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                        Err(_) => break,
                    },
                }
            }
            let _ = tx.send(());
        });
        Drain { buf, done }
    })
}

/// Wait until `deadline` for the reader to hit EOF, then take what it read.
///
/// A reader still blocked at the deadline is abandoned.
fn collect(drain: Option<Drain>, deadline: Instant) -> String {
    let Some(drain) = drain else {
        return String::new();
    };
    let wait = deadline.saturating_duration_since(Instant::now());
    if drain.done.recv_timeout(wait).is_err() {
        warn!("Output pipe still open after {:?}; keeping partial output", PIPE_GRACE);
    }
    let bytes = match drain.buf.lock() {
        Ok(buf) => buf.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };
    String::from_utf8_lossy(&bytes).into_owned()
}

/// A completed `apply_migration` run.
#[derive(Debug, Clone)]
pub struct MigrationRun {
    pub request: MigrationRequest,
    pub invocation: McpInvocation,
    pub output: ToolOutput,
}

/// Read `sql_file`, build the request and run the configured client.
///
/// The missing-file check happens before anything is spawned.
pub fn apply_migration(
    config: &MigrationConfig,
    project_id: &str,
    name: Option<&str>,
    sql_file: &Path,
) -> MaintResult<MigrationRun> {
    let request = MigrationRequest::from_file(project_id, name, sql_file)?;
    let invocation = McpInvocation::new(config, &request)?;
    let output = invocation.run()?;
    Ok(MigrationRun {
        request,
        invocation,
        output,
    })
}

// ============================================================================
// Tests
// ============================================================================
