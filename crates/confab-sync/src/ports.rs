//! Service traits the engine drives, with impls for the production clients.
//!
//! Methods return boxed futures for dyn compatibility.

use std::future::Future;
use std::pin::Pin;

use confab_core::models::chat::{Chat, Message, Sender};
use confab_reply::error::ReplyError;
use confab_reply::webhook::ReplyClient;
use confab_store::client::{StoreClient, TouchAck};
use confab_store::error::StoreError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Chat and message storage with the bearer token already taken care of.
pub trait ChatStore: Send + Sync {
    fn list_chats(&self) -> BoxFuture<'_, Result<Vec<Chat>, StoreError>>;

    fn create_chat(&self, title: &str) -> BoxFuture<'_, Result<Chat, StoreError>>;

    fn list_messages(&self, chat_id: &str) -> BoxFuture<'_, Result<Vec<Message>, StoreError>>;

    fn create_message(
        &self,
        chat_id: &str,
        content: &str,
        sender_type: Sender,
    ) -> BoxFuture<'_, Result<Message, StoreError>>;

    fn touch_chat(&self, chat_id: &str) -> BoxFuture<'_, Result<TouchAck, StoreError>>;
}

/// Raw storage operations that take an explicit bearer token.
///
/// [`AuthedStore`](crate::authed::AuthedStore) layers session handling on top
/// of this to produce a [`ChatStore`].
pub trait TokenStore: Send + Sync {
    fn list_chats(&self, token: &str) -> BoxFuture<'_, Result<Vec<Chat>, StoreError>>;

    fn create_chat(&self, token: &str, title: &str) -> BoxFuture<'_, Result<Chat, StoreError>>;

    fn list_messages(
        &self,
        token: &str,
        chat_id: &str,
    ) -> BoxFuture<'_, Result<Vec<Message>, StoreError>>;

    fn create_message(
        &self,
        token: &str,
        chat_id: &str,
        content: &str,
        sender_type: Sender,
    ) -> BoxFuture<'_, Result<Message, StoreError>>;

    fn touch_chat(&self, token: &str, chat_id: &str) -> BoxFuture<'_, Result<TouchAck, StoreError>>;
}

impl TokenStore for StoreClient {
    fn list_chats(&self, token: &str) -> BoxFuture<'_, Result<Vec<Chat>, StoreError>> {
        let token = token.to_string();
        Box::pin(async move { StoreClient::list_chats(self, &token).await })
    }

    fn create_chat(&self, token: &str, title: &str) -> BoxFuture<'_, Result<Chat, StoreError>> {
        let token = token.to_string();
        let title = title.to_string();
        Box::pin(async move { StoreClient::create_chat(self, &token, &title).await })
    }

    fn list_messages(
        &self,
        token: &str,
        chat_id: &str,
    ) -> BoxFuture<'_, Result<Vec<Message>, StoreError>> {
        let token = token.to_string();
        let chat_id = chat_id.to_string();
        Box::pin(async move { StoreClient::list_messages(self, &token, &chat_id).await })
    }

    fn create_message(
        &self,
        token: &str,
        chat_id: &str,
        content: &str,
        sender_type: Sender,
    ) -> BoxFuture<'_, Result<Message, StoreError>> {
        let token = token.to_string();
        let chat_id = chat_id.to_string();
        let content = content.to_string();
        Box::pin(async move {
            StoreClient::create_message(self, &token, &chat_id, &content, sender_type).await
        })
    }

    fn touch_chat(&self, token: &str, chat_id: &str) -> BoxFuture<'_, Result<TouchAck, StoreError>> {
        let token = token.to_string();
        let chat_id = chat_id.to_string();
        Box::pin(async move { StoreClient::touch_chat(self, &token, &chat_id).await })
    }
}

/// The bot reply webhook.
pub trait ReplyService: Send + Sync {
    fn request_reply(
        &self,
        chat_id: &str,
        message: &str,
        user_id: &str,
    ) -> BoxFuture<'_, Result<String, ReplyError>>;
}

impl ReplyService for ReplyClient {
    fn request_reply(
        &self,
        chat_id: &str,
        message: &str,
        user_id: &str,
    ) -> BoxFuture<'_, Result<String, ReplyError>> {
        let chat_id = chat_id.to_string();
        let message = message.to_string();
        let user_id = user_id.to_string();
        Box::pin(async move { ReplyClient::request_reply(self, &chat_id, &message, &user_id).await })
    }
}
