//! The send pipeline: persist, echo, nudge recency, fetch the bot reply.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{error, warn};

use confab_core::models::chat::Sender;
use confab_reply::FALLBACK_REPLY;

use crate::error::SendError;
use crate::ports::{ChatStore, ReplyService};
use crate::state::SharedConversationState;

/// Runs the user-visible send flow for one message.
///
/// At most one send is in flight per chat; a second is refused, not queued.
/// Once the user's message is persisted the pipeline no longer fails: a
/// missing bot reply becomes the fixed fallback message, and a failure to
/// persist even that is logged and swallowed.
pub struct ReplyOrchestrator {
    store: Arc<dyn ChatStore>,
    replies: Arc<dyn ReplyService>,
    state: SharedConversationState,
    in_flight: Mutex<HashSet<String>>,
}

impl ReplyOrchestrator {
    pub fn new(
        store: Arc<dyn ChatStore>,
        replies: Arc<dyn ReplyService>,
        state: SharedConversationState,
    ) -> Self {
        Self {
            store,
            replies,
            state,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub async fn send(&self, chat_id: &str, user_id: &str, content: &str) -> Result<(), SendError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SendError::Empty);
        }

        let _slot = FlightSlot::claim(&self.in_flight, chat_id).ok_or(SendError::InFlight)?;

        // The user's message. A failure here aborts the send.
        let user_message = self.store.create_message(chat_id, content, Sender::User).await?;
        self.state.append_message(user_message).await;

        // Best-effort recency bump.
        match self.store.touch_chat(chat_id).await {
            Ok(ack) => self.state.bump_chat(&ack.id, jiff::Timestamp::now()).await,
            Err(e) => warn!(chat_id = %chat_id, error = %e, "recency bump failed; continuing"),
        }

        // The bot's reply, or the fallback.
        match self.replies.request_reply(chat_id, content, user_id).await {
            Ok(reply) => {
                if !self.persist_bot_message(chat_id, &reply).await {
                    self.persist_bot_message(chat_id, FALLBACK_REPLY).await;
                }
            }
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "reply webhook failed; using fallback");
                self.persist_bot_message(chat_id, FALLBACK_REPLY).await;
            }
        }
        Ok(())
    }

    /// Persist and append one bot message. Returns whether it stuck.
    async fn persist_bot_message(&self, chat_id: &str, content: &str) -> bool {
        match self.store.create_message(chat_id, content, Sender::Bot).await {
            Ok(message) => {
                self.state.append_message(message).await;
                true
            }
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "failed to persist bot message");
                false
            }
        }
    }
}

/// Marks a chat as having a send in flight; dropping it releases the slot,
/// so an early return frees the chat.
struct FlightSlot<'a> {
    chats: &'a Mutex<HashSet<String>>,
    chat_id: String,
}

impl<'a> FlightSlot<'a> {
    fn claim(chats: &'a Mutex<HashSet<String>>, chat_id: &str) -> Option<Self> {
        let mut held = chats.lock().unwrap_or_else(|e| e.into_inner());
        if !held.insert(chat_id.to_string()) {
            return None;
        }
        Some(Self {
            chats,
            chat_id: chat_id.to_string(),
        })
    }
}

impl Drop for FlightSlot<'_> {
    fn drop(&mut self) {
        self.chats
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.chat_id);
    }
}
