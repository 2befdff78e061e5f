//! Errors surfaced by the send pipeline.

use thiserror::Error;

use confab_store::error::StoreError;

/// Why a send was refused or abandoned.
///
/// Only failures before the user's message is persisted surface here; after
/// that point the pipeline degrades to the fallback reply instead of failing.
#[derive(Debug, Error)]
pub enum SendError {
    /// The content was empty or whitespace-only.
    #[error("message is empty")]
    Empty,

    /// Another send for the same chat has not finished yet.
    #[error("a send for this chat is already in flight")]
    InFlight,

    /// The user's message could not be persisted.
    #[error("failed to save the message: {0}")]
    Mutation(#[from] StoreError),
}
