//! Single-writer cache of the conversation the user is looking at.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use confab_core::models::chat::{Chat, Message};

/// Point-in-time copy of the cache for rendering.
#[derive(Debug, Clone, Default)]
pub struct ConversationSnapshot {
    pub chats: Vec<Chat>,
    pub active_chat_id: Option<String>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Default)]
struct ConversationState {
    chats: Vec<Chat>,
    active_chat_id: Option<String>,
    messages: Vec<Message>,
    poll_generation: u64,
}

/// Shared handle to the conversation cache.
///
/// Every mutation takes the one internal lock, so checks and writes are
/// atomic: a fetch tagged with an old poll generation can never overwrite
/// the view of a chat selected after it started.
#[derive(Clone, Default)]
pub struct SharedConversationState {
    inner: Arc<Mutex<ConversationState>>,
}

impl SharedConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> ConversationSnapshot {
        let state = self.inner.lock().await;
        ConversationSnapshot {
            chats: state.chats.clone(),
            active_chat_id: state.active_chat_id.clone(),
            messages: state.messages.clone(),
        }
    }

    pub async fn active_chat_id(&self) -> Option<String> {
        self.inner.lock().await.active_chat_id.clone()
    }

    pub async fn poll_generation(&self) -> u64 {
        self.inner.lock().await.poll_generation
    }

    /// Replace the chat list wholesale, restoring recency order.
    pub async fn replace_chats(&self, chats: Vec<Chat>) {
        let mut state = self.inner.lock().await;
        state.chats = sorted_chats(chats);
    }

    /// Add a freshly created chat at the front of the list.
    pub async fn upsert_chat(&self, chat: Chat) {
        let mut state = self.inner.lock().await;
        state.chats.retain(|c| c.id != chat.id);
        state.chats.insert(0, chat);
        let chats = std::mem::take(&mut state.chats);
        state.chats = sorted_chats(chats);
    }

    /// Record a recency bump locally so the list reorders without waiting
    /// for the next fetch.
    pub async fn bump_chat(&self, chat_id: &str, at: jiff::Timestamp) {
        let mut state = self.inner.lock().await;
        if let Some(chat) = state.chats.iter_mut().find(|c| c.id == chat_id) {
            chat.updated_at = at;
        }
        let chats = std::mem::take(&mut state.chats);
        state.chats = sorted_chats(chats);
    }

    /// Make `chat_id` the active chat and invalidate older poll results.
    /// Returns the generation tag a poll must carry for its result to apply.
    pub async fn activate_chat(&self, chat_id: &str) -> u64 {
        let mut state = self.inner.lock().await;
        state.active_chat_id = Some(chat_id.to_string());
        state.messages.clear();
        state.poll_generation += 1;
        state.poll_generation
    }

    /// Deselect the active chat. Results of polls already in flight are
    /// discarded by their stale generation tag.
    pub async fn deactivate_chat(&self) {
        let mut state = self.inner.lock().await;
        state.active_chat_id = None;
        state.messages.clear();
        state.poll_generation += 1;
    }

    /// Forget everything. Sign-out teardown.
    pub async fn clear(&self) {
        let mut state = self.inner.lock().await;
        state.chats.clear();
        state.active_chat_id = None;
        state.messages.clear();
        state.poll_generation += 1;
    }

    /// Apply a full set of messages fetched for `chat_id` under `generation`.
    ///
    /// Returns false, leaving the cache untouched, when the generation is
    /// stale or the chat is no longer the active one.
    pub async fn apply_poll(&self, generation: u64, chat_id: &str, messages: Vec<Message>) -> bool {
        let mut state = self.inner.lock().await;
        if state.poll_generation != generation || state.active_chat_id.as_deref() != Some(chat_id) {
            debug!(chat_id = %chat_id, "discarding stale poll result");
            return false;
        }
        state.messages = normalized_messages(messages);
        true
    }

    /// Append one message to the active chat, keeping order and uniqueness.
    /// A message for any other chat is dropped.
    pub async fn append_message(&self, message: Message) -> bool {
        let mut state = self.inner.lock().await;
        if state.active_chat_id.as_deref() != Some(message.chat_id.as_str()) {
            return false;
        }
        insert_message(&mut state.messages, message);
        true
    }
}

/// Most recently updated first, duplicate ids dropped. Stable, so ties keep
/// their relative order.
fn sorted_chats(mut chats: Vec<Chat>) -> Vec<Chat> {
    chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    let mut seen = HashSet::new();
    chats.retain(|c| seen.insert(c.id.clone()));
    chats
}

/// Oldest first, duplicate ids dropped (first occurrence wins).
fn normalized_messages(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    let mut seen = HashSet::new();
    messages.retain(|m| seen.insert(m.id.clone()));
    messages
}

fn insert_message(messages: &mut Vec<Message>, message: Message) {
    if messages.iter().any(|m| m.id == message.id) {
        return;
    }
    let at = messages.partition_point(|m| m.created_at <= message.created_at);
    messages.insert(at, message);
}
