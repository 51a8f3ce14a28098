//! Configuration handling for webmaint.
//!
//! Settings come from an optional `.webmaint/config.toml` in the workspace
//! root. Secrets never live in the file: the Supabase service key is read
//! from the environment only, and has no fallback value.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Directory holding the project configuration file.
pub const CONFIG_DIR: &str = ".webmaint";

/// Configuration file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Errors raised while loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {}", path.display(), source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {}", path.display(), source)]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("environment variable {var} is not set")]
    MissingEnv { var: String },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub migration: MigrationConfig,

    #[serde(default)]
    pub supabase: SupabaseConfig,

    #[serde(default)]
    pub guard: GuardConfig,
}

/// Settings for the MCP migration client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Program to invoke.
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before `tool call ...` (e.g. when run through `npx`).
    #[serde(default)]
    pub program_args: Vec<String>,

    /// MCP server name passed via `--server`.
    #[serde(default = "default_server")]
    pub server: String,

    /// Tool name passed to `tool call`.
    #[serde(default = "default_tool")]
    pub tool: String,

    /// Seconds to wait for the tool before killing it.
    #[serde(default = "default_migration_timeout")]
    pub timeout_secs: u64,
}

/// Settings for the Supabase REST client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL used when the URL environment variable is unset.
    #[serde(default)]
    pub url: Option<String>,

    /// Environment variable holding the project URL.
    #[serde(default = "default_url_env")]
    pub url_env: String,

    /// Environment variable holding the service role key.
    #[serde(default = "default_key_env")]
    pub key_env: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    /// Remote procedure that executes raw SQL.
    #[serde(default = "default_sql_function")]
    pub sql_function: String,

    /// Name of the SQL text parameter of `sql_function`.
    #[serde(default = "default_sql_param")]
    pub sql_param: String,
}

/// Settings for the SSR guard patcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// File extensions to patch, without the leading dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Names that prune any directory path containing them.
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
}

fn default_program() -> String {
    "manus-mcp-cli".to_string()
}

fn default_server() -> String {
    "supabase".to_string()
}

fn default_tool() -> String {
    "apply_migration".to_string()
}

fn default_migration_timeout() -> u64 {
    300
}

fn default_url_env() -> String {
    "NEXT_PUBLIC_SUPABASE_URL".to_string()
}

fn default_key_env() -> String {
    "SUPABASE_SERVICE_ROLE_KEY".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_sql_function() -> String {
    "exec_sql".to_string()
}

fn default_sql_param() -> String {
    "query".to_string()
}

fn default_extensions() -> Vec<String> {
    ["ts", "tsx", "js", "jsx"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_exclude_dirs() -> Vec<String> {
    [".git", "node_modules"].iter().map(|s| s.to_string()).collect()
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            program_args: Vec::new(),
            server: default_server(),
            tool: default_tool(),
            timeout_secs: default_migration_timeout(),
        }
    }
}

impl MigrationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            url_env: default_url_env(),
            key_env: default_key_env(),
            timeout_secs: default_http_timeout(),
            sql_function: default_sql_function(),
            sql_param: default_sql_param(),
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude_dirs: default_exclude_dirs(),
        }
    }
}

/// Resolved Supabase endpoint and service key.
#[derive(Clone)]
pub struct SupabaseCredentials {
    pub url: String,
    pub key: String,
}

impl fmt::Debug for SupabaseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseCredentials")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl SupabaseConfig {
    /// Resolve credentials from the process environment.
    pub fn credentials(&self) -> Result<SupabaseCredentials, ConfigError> {
        self.credentials_with(|var| std::env::var(var).ok())
    }

    /// Resolve credentials through an arbitrary variable lookup.
    ///
    /// The URL comes from `url_env`, then from `url`. The key comes from
    /// `key_env` only.
    pub fn credentials_with<F>(&self, lookup: F) -> Result<SupabaseCredentials, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let url = non_empty(&self.url_env)
            .or_else(|| self.url.clone())
            .ok_or_else(|| ConfigError::MissingEnv {
                var: self.url_env.clone(),
            })?;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                field: "supabase.url".to_string(),
                reason: format!("expected an http(s) URL, got '{}'", url),
            });
        }

        let key = non_empty(&self.key_env).ok_or_else(|| ConfigError::MissingEnv {
            var: self.key_env.clone(),
        })?;

        Ok(SupabaseCredentials {
            url: url.trim_end_matches('/').to_string(),
            key,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `.webmaint/config.toml` from the given workspace root, or defaults.
    pub fn load_from_project(workspace_root: &Path) -> Result<Self, ConfigError> {
        let config_path = workspace_root.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.migration.program, "manus-mcp-cli");
        assert_eq!(config.migration.server, "supabase");
        assert_eq!(config.migration.tool, "apply_migration");
        assert_eq!(config.supabase.sql_function, "exec_sql");
        assert_eq!(config.supabase.sql_param, "query");
        assert_eq!(config.guard.extensions, vec!["ts", "tsx", "js", "jsx"]);
        assert_eq!(config.guard.exclude_dirs, vec![".git", "node_modules"]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(CONFIG_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(CONFIG_FILE),
            "[migration]\ntimeout_secs = 12\n\n[supabase]\nsql_param = \"sql_query\"\n",
        )
        .unwrap();

        let config = Config::load_from_project(tmp.path()).unwrap();
        assert_eq!(config.migration.timeout(), Duration::from_secs(12));
        assert_eq!(config.migration.program, "manus-mcp-cli");
        assert_eq!(config.supabase.sql_param, "sql_query");
        assert_eq!(config.supabase.sql_function, "exec_sql");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_from_project(tmp.path()).unwrap();
        assert_eq!(config.supabase.timeout_secs, 30);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[migration\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_credentials_require_key() {
        let config = SupabaseConfig::default();
        let err = config
            .credentials_with(lookup(&[(
                "NEXT_PUBLIC_SUPABASE_URL",
                "https://abc.supabase.co",
            )]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv { ref var } if var == "SUPABASE_SERVICE_ROLE_KEY"));
    }

    #[test]
    fn test_credentials_empty_key_is_missing() {
        let config = SupabaseConfig::default();
        let err = config
            .credentials_with(lookup(&[
                ("NEXT_PUBLIC_SUPABASE_URL", "https://abc.supabase.co"),
                ("SUPABASE_SERVICE_ROLE_KEY", "  "),
            ]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv { .. }));
    }

    #[test]
    fn test_credentials_url_falls_back_to_config() {
        let config = SupabaseConfig {
            url: Some("https://abc.supabase.co/".to_string()),
            ..SupabaseConfig::default()
        };
        let creds = config
            .credentials_with(lookup(&[("SUPABASE_SERVICE_ROLE_KEY", "secret")]))
            .unwrap();
        assert_eq!(creds.url, "https://abc.supabase.co");
        assert_eq!(creds.key, "secret");
    }

    #[test]
    fn test_credentials_env_url_wins() {
        let config = SupabaseConfig {
            url: Some("https://file.supabase.co".to_string()),
            ..SupabaseConfig::default()
        };
        let creds = config
            .credentials_with(lookup(&[
                ("NEXT_PUBLIC_SUPABASE_URL", "https://env.supabase.co"),
                ("SUPABASE_SERVICE_ROLE_KEY", "secret"),
            ]))
            .unwrap();
        assert_eq!(creds.url, "https://env.supabase.co");
    }

    #[test]
    fn test_credentials_reject_non_http_url() {
        let config = SupabaseConfig::default();
        let err = config
            .credentials_with(lookup(&[
                ("NEXT_PUBLIC_SUPABASE_URL", "abc.supabase.co"),
                ("SUPABASE_SERVICE_ROLE_KEY", "secret"),
            ]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_credentials_debug_redacts_key() {
        let creds = SupabaseCredentials {
            url: "https://abc.supabase.co".to_string(),
            key: "super-secret".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
