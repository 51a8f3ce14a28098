//! CLI command implementations
//!
//! Each command writes its report to the given writer and returns
//! `Ok(())` or a `MaintError` whose code becomes the exit status.

pub mod categories;
pub mod exec_sql;
pub mod guard;
pub mod migrate;

pub use categories::run_categories_activate;
pub use exec_sql::{run_exec_sql, ExecSqlArgs};
pub use guard::{run_guard, GuardArgs};
pub use migrate::{run_migrate, MigrateArgs};

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use webmaint_core::config::Config;
use webmaint_core::error::{MaintError, MaintResult};

use crate::cli::GlobalArgs;

/// Environment file read when `--env-file` is not given.
pub const DEFAULT_ENV_FILE: &str = ".env.local";

/// Resolved workspace and configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Context {
    pub workspace: PathBuf,
    pub config: Config,
}

impl Context {
    /// Resolve the workspace, load the env file, then load configuration.
    pub fn load(global: &GlobalArgs) -> MaintResult<Self> {
        let workspace = resolve_workspace(global.workspace.as_deref())?;
        load_env_file(&workspace, global.env_file.as_deref())?;
        let config = match &global.config {
            Some(path) => Config::load(&resolve_path(&workspace, path))?,
            None => Config::load_from_project(&workspace)?,
        };
        Ok(Context { workspace, config })
    }

    /// Resolve a user-supplied path against the workspace.
    pub fn path(&self, path: &Path) -> PathBuf {
        resolve_path(&self.workspace, path)
    }
}

/// Workspace root: the given directory or the current directory.
pub fn resolve_workspace(workspace: Option<&Path>) -> MaintResult<PathBuf> {
    let root = match workspace {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()?,
    };
    if !root.is_dir() {
        return Err(MaintError::invalid_args(format!(
            "workspace is not a directory: {}",
            root.display()
        )));
    }
    Ok(root)
}

/// Join relative paths onto `base`; absolute paths pass through.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Load variables from an env file without overriding the process environment.
///
/// A missing default file is ignored; a missing explicit file is an error.
/// Returns the file that was loaded, if any.
pub fn load_env_file(workspace: &Path, explicit: Option<&Path>) -> MaintResult<Option<PathBuf>> {
    let path = match explicit {
        Some(path) => resolve_path(workspace, path),
        None => workspace.join(DEFAULT_ENV_FILE),
    };

    if !path.is_file() {
        if explicit.is_some() {
            return Err(MaintError::file_not_found(path.display().to_string()));
        }
        return Ok(None);
    }

    dotenv::from_path(&path).map_err(|e| MaintError::Config {
        message: format!("failed to load {}: {}", path.display(), e),
    })?;
    debug!("Loaded environment from {}", path.display());
    Ok(Some(path))
}

/// Map a failed write to the command's output stream.
pub(crate) fn write_failed(err: io::Error) -> MaintError {
    MaintError::internal(format!("failed to write output: {}", err))
}
