//! confab-auth
//!
//! Sign-up, sign-in, and token refresh against the Confab auth endpoints,
//! plus durable storage of the signed-in session.

pub mod client;
pub mod error;
pub mod manager;
pub mod persistence;
