//! Ties the cache, the poller, and the send pipeline together.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use confab_core::models::chat::Chat;
use confab_store::error::StoreError;

use crate::error::SendError;
use crate::pipeline::ReplyOrchestrator;
use crate::ports::{ChatStore, ReplyService};
use crate::scheduler::{POLL_INTERVAL, PollScheduler};
use crate::state::{ConversationSnapshot, SharedConversationState};

/// One conversation surface's worth of behavior: the chat list, the active
/// chat's live view, and sending.
pub struct Controller {
    store: Arc<dyn ChatStore>,
    state: SharedConversationState,
    scheduler: PollScheduler,
    orchestrator: ReplyOrchestrator,
}

impl Controller {
    pub fn new(store: Arc<dyn ChatStore>, replies: Arc<dyn ReplyService>) -> Self {
        Self::with_poll_interval(store, replies, POLL_INTERVAL)
    }

    pub fn with_poll_interval(
        store: Arc<dyn ChatStore>,
        replies: Arc<dyn ReplyService>,
        poll_interval: Duration,
    ) -> Self {
        let state = SharedConversationState::new();
        let scheduler = PollScheduler::new(Arc::clone(&store), state.clone(), poll_interval);
        let orchestrator = ReplyOrchestrator::new(Arc::clone(&store), replies, state.clone());
        Self {
            store,
            state,
            scheduler,
            orchestrator,
        }
    }

    pub async fn snapshot(&self) -> ConversationSnapshot {
        self.state.snapshot().await
    }

    /// Re-fetch the chat list and replace the cached one.
    pub async fn refresh_chats(&self) -> Result<Vec<Chat>, StoreError> {
        let chats = self.store.list_chats().await?;
        self.state.replace_chats(chats.clone()).await;
        Ok(chats)
    }

    /// Create a chat, put it at the top of the list, and open it.
    pub async fn create_chat(&self, title: &str) -> Result<Chat, StoreError> {
        let chat = self.store.create_chat(title).await?;
        self.state.upsert_chat(chat.clone()).await;
        self.open_chat(&chat.id).await?;
        Ok(chat)
    }

    /// Make `chat_id` the active chat: load its messages once, then keep it
    /// fresh with the poller. Re-opening the active chat is a no-op.
    ///
    /// When the initial fetch fails the error surfaces but the chat stays
    /// open; the poller retries on its own cadence.
    pub async fn open_chat(&self, chat_id: &str) -> Result<(), StoreError> {
        if self.state.active_chat_id().await.as_deref() == Some(chat_id) {
            return Ok(());
        }
        let generation = self.state.activate_chat(chat_id).await;
        self.scheduler.start(chat_id, generation);
        info!(chat_id = %chat_id, "chat opened");

        let messages = self.store.list_messages(chat_id).await?;
        self.state.apply_poll(generation, chat_id, messages).await;
        Ok(())
    }

    /// Leave the active chat and stop its poller.
    pub async fn close_chat(&self) {
        self.state.deactivate_chat().await;
        self.scheduler.cancel();
    }

    /// Send `content` to `chat_id` on behalf of `user_id`.
    pub async fn send(&self, chat_id: &str, user_id: &str, content: &str) -> Result<(), SendError> {
        self.orchestrator.send(chat_id, user_id, content).await
    }

    /// Sign-out teardown: stop polling and drop all cached conversation
    /// state.
    pub async fn teardown(&self) {
        self.scheduler.cancel();
        self.state.clear().await;
        info!("conversation state cleared");
    }
}
