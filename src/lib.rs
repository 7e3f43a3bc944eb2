//! P2P monitor: Bybit P2P price watcher.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod clock;
pub mod retry;
pub mod quotes;
pub mod notify;
pub mod display;
pub mod monitor;
