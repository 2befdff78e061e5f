//! Bearer-token plumbing between the session manager and the store.

use std::sync::Arc;

use tracing::debug;

use confab_auth::manager::SessionManager;
use confab_core::models::chat::{Chat, Message, Sender};
use confab_store::client::TouchAck;
use confab_store::error::StoreError;

use crate::ports::{BoxFuture, ChatStore, TokenStore};

/// A [`ChatStore`] that signs every call with the current session's access
/// token and, when the store answers unauthorized anyway, forces one refresh
/// and retries exactly once.
pub struct AuthedStore {
    store: Arc<dyn TokenStore>,
    sessions: Arc<SessionManager>,
}

impl AuthedStore {
    pub fn new(store: Arc<dyn TokenStore>, sessions: Arc<SessionManager>) -> Self {
        Self { store, sessions }
    }

    async fn token(&self) -> Result<String, StoreError> {
        self.sessions
            .current_session()
            .await
            .map(|s| s.access_token)
            .ok_or(StoreError::Unauthorized)
    }

    /// A fresh token for the one retry allowed after an unauthorized answer.
    async fn retry_token(&self) -> Result<String, StoreError> {
        debug!("store refused the token; refreshing and retrying once");
        self.sessions
            .refresh()
            .await
            .map(|s| s.access_token)
            .ok_or(StoreError::Unauthorized)
    }

    async fn list_chats_authed(&self) -> Result<Vec<Chat>, StoreError> {
        let token = self.token().await?;
        match self.store.list_chats(&token).await {
            Err(StoreError::Unauthorized) => {
                let token = self.retry_token().await?;
                self.store.list_chats(&token).await
            }
            other => other,
        }
    }

    async fn create_chat_authed(&self, title: &str) -> Result<Chat, StoreError> {
        let token = self.token().await?;
        match self.store.create_chat(&token, title).await {
            Err(StoreError::Unauthorized) => {
                let token = self.retry_token().await?;
                self.store.create_chat(&token, title).await
            }
            other => other,
        }
    }

    async fn list_messages_authed(&self, chat_id: &str) -> Result<Vec<Message>, StoreError> {
        let token = self.token().await?;
        match self.store.list_messages(&token, chat_id).await {
            Err(StoreError::Unauthorized) => {
                let token = self.retry_token().await?;
                self.store.list_messages(&token, chat_id).await
            }
            other => other,
        }
    }

    async fn create_message_authed(
        &self,
        chat_id: &str,
        content: &str,
        sender_type: Sender,
    ) -> Result<Message, StoreError> {
        let token = self.token().await?;
        match self
            .store
            .create_message(&token, chat_id, content, sender_type)
            .await
        {
            Err(StoreError::Unauthorized) => {
                let token = self.retry_token().await?;
                self.store
                    .create_message(&token, chat_id, content, sender_type)
                    .await
            }
            other => other,
        }
    }

    async fn touch_chat_authed(&self, chat_id: &str) -> Result<TouchAck, StoreError> {
        let token = self.token().await?;
        match self.store.touch_chat(&token, chat_id).await {
            Err(StoreError::Unauthorized) => {
                let token = self.retry_token().await?;
                self.store.touch_chat(&token, chat_id).await
            }
            other => other,
        }
    }
}

impl ChatStore for AuthedStore {
    fn list_chats(&self) -> BoxFuture<'_, Result<Vec<Chat>, StoreError>> {
        Box::pin(self.list_chats_authed())
    }

    fn create_chat(&self, title: &str) -> BoxFuture<'_, Result<Chat, StoreError>> {
        let title = title.to_string();
        Box::pin(async move { self.create_chat_authed(&title).await })
    }

    fn list_messages(&self, chat_id: &str) -> BoxFuture<'_, Result<Vec<Message>, StoreError>> {
        let chat_id = chat_id.to_string();
        Box::pin(async move { self.list_messages_authed(&chat_id).await })
    }

    fn create_message(
        &self,
        chat_id: &str,
        content: &str,
        sender_type: Sender,
    ) -> BoxFuture<'_, Result<Message, StoreError>> {
        let chat_id = chat_id.to_string();
        let content = content.to_string();
        Box::pin(async move {
            self.create_message_authed(&chat_id, &content, sender_type)
                .await
        })
    }

    fn touch_chat(&self, chat_id: &str) -> BoxFuture<'_, Result<TouchAck, StoreError>> {
        let chat_id = chat_id.to_string();
        Box::pin(async move { self.touch_chat_authed(&chat_id).await })
    }
}
