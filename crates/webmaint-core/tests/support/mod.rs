//! Shared test support utilities.
//!
//! - `http` - a loopback server that answers a fixed list of requests
//! - `tree` - scratch project trees for the guard patcher

#![allow(dead_code)]

pub mod http;
pub mod tree;
