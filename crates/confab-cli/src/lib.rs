//! confab-cli library root.
//!
//! Exposes the config and REPL modules so that examples and integration
//! tests can exercise them directly.

pub mod config;
pub mod repl;
