//! confab-store
//!
//! HTTP client for the remote conversation store: chats, messages, and the
//! chat recency bump. Every call is authenticated with a caller-supplied
//! bearer token; token lifecycle lives in `confab-auth`.

pub mod client;
pub mod error;
