//! CLI argument parsing with clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Maintenance tools for the storefront web app.
#[derive(Parser, Debug)]
#[command(name = "webmaint", version, about = "Maintenance tools for the storefront web app")]
#[command(
    long_about = "Maintenance tools for the storefront web app.\n\nSubcommands:\n  guard       Wrap browser-only calls in `typeof window` checks\n  migrate     Apply a SQL migration through the MCP client\n  exec-sql    Run SQL files through the exec_sql remote procedure\n  categories  Bulk operations on the categories table"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Workspace root directory (default: current directory).
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Configuration file (default: .webmaint/config.toml in workspace).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Environment file loaded before reading variables (default: .env.local in workspace).
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    pub log_level: LogLevel,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Output format for most commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default).
    #[default]
    Text,
    /// Full JSON response.
    Json,
}

/// Output format for the guard command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum GuardFormat {
    /// Summary line plus one line per patched file (default).
    #[default]
    Text,
    /// Full JSON response.
    Json,
    /// Unified diff of every patched file.
    Diff,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wrap browser-only calls in `typeof window` checks.
    ///
    /// Scans .ts/.tsx/.js/.jsx files under PATH (default: workspace root),
    /// skipping .git and node_modules, and rewrites them in place.
    Guard {
        /// Directory to scan.
        path: Option<PathBuf>,
        /// Compute edits without writing files.
        #[arg(long)]
        dry_run: bool,
        /// File extensions to scan (repeatable; replaces the configured list).
        #[arg(long = "ext", value_name = "EXT")]
        extensions: Vec<String>,
        /// Extra names that prune any directory path containing them (repeatable).
        #[arg(long = "exclude", value_name = "DIR")]
        exclude_dirs: Vec<String>,
        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: GuardFormat,
    },
    /// Apply a SQL migration through the MCP client.
    ///
    /// Runs `<program> tool call apply_migration --server supabase --input <json>`
    /// and relays the tool's stdout and stderr.
    Migrate {
        /// SQL file to apply.
        file: PathBuf,
        /// Target project reference.
        #[arg(long)]
        project_id: String,
        /// Migration name (default: the file stem).
        #[arg(long)]
        name: Option<String>,
        /// MCP client program (overrides config).
        #[arg(long)]
        program: Option<String>,
        /// MCP server name (overrides config).
        #[arg(long)]
        server: Option<String>,
        /// Seconds to wait for the tool; 0 waits forever (overrides config).
        #[arg(long)]
        timeout: Option<u64>,
        /// Print the command without running it.
        #[arg(long)]
        dry_run: bool,
        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Run SQL files through the exec_sql remote procedure.
    ExecSql {
        /// SQL files to run, in order.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Remote function name (overrides config).
        #[arg(long)]
        function: Option<String>,
        /// Parameter name that receives the SQL (overrides config).
        #[arg(long)]
        param: Option<String>,
        /// Stop at the first failing file.
        #[arg(long)]
        fail_fast: bool,
        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Bulk operations on the categories table.
    Categories {
        #[command(subcommand)]
        action: CategoriesAction,
    },
}

/// Categories subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum CategoriesAction {
    /// Mark every inactive category active.
    Activate {
        /// Count inactive rows without updating them.
        #[arg(long)]
        dry_run: bool,
        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}
