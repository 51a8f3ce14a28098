//! webmaint - maintenance tools for the storefront web app.
//!
//! This crate provides the `webmaint` binary:
//!
//! - `cli` - clap argument definitions
//! - `commands` - one module per subcommand
//!
//! The heavy lifting lives in `webmaint-core`.

pub mod cli;
pub mod commands;

// Re-export core types for convenience
pub use webmaint_core::error::{MaintError, MaintResult, OutputErrorCode};
pub use webmaint_core::output::{ErrorInfo, ErrorResponse, SCHEMA_VERSION};
