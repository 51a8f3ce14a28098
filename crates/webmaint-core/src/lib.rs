//! Core infrastructure for webmaint.
//!
//! This crate provides the pieces behind each `webmaint` subcommand:
//! - SSR guard patcher for browser-only globals (`guard`, `walk`, `diff`)
//! - Migration applier that drives an MCP command-line client (`migration`)
//! - Supabase REST/RPC client and the SQL file runner (`supabase`, `sql`)
//! - Category activation against the `categories` table (`categories`)
//! - Error types, JSON output types and configuration

pub mod categories;
pub mod config;
pub mod diff;
pub mod error;
pub mod guard;
pub mod migration;
pub mod output;
pub mod sql;
pub mod supabase;
pub mod walk;
