//! confab-core
//!
//! Pure domain types shared across the Confab crates. No HTTP or filesystem
//! dependency lives here, only the shared vocabulary of the system.

pub mod models;
