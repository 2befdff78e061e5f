//! confab-reply
//!
//! Client for the bot reply webhook, plus the fixed fallback text used when
//! the webhook cannot produce a reply.

pub mod error;
pub mod webhook;

/// Bot message persisted in place of a reply when the webhook fails, times
/// out, or answers with something unusable.
pub const FALLBACK_REPLY: &str =
    "The reply service is currently unavailable. Please try again in a moment.";
