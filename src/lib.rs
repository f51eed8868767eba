// ABOUTME: Library root for slipway - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod cutover;
pub mod deploy;
pub mod diagnostics;
pub mod error;
mod fsutil;
pub mod health;
pub mod hooks;
pub mod output;
pub mod preserve;
pub mod registry;
pub mod release;
pub mod runner;
pub mod types;
