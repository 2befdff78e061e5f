//! confab-sync
//!
//! The conversation engine: a single-writer cache of the chats and messages
//! on screen, a cancellable poller that keeps the active chat fresh, and the
//! send pipeline that turns one user message into one persisted user/bot pair.

pub mod authed;
pub mod controller;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod scheduler;
pub mod state;
