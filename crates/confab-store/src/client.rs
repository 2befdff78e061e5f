//! HTTP client for the remote store endpoints.
//!
//! One thin wrapper per endpoint. Responses are deserialized straight into
//! the `confab-core` domain types; error bodies are reduced to the
//! platform's `{"message": ...}` shape when present.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use confab_core::models::chat::{Chat, Message, Sender};

use crate::error::StoreError;

/// Acknowledgement of a chat recency bump: the id and nothing else.
#[derive(Debug, Clone, Deserialize)]
pub struct TouchAck {
    pub id: String,
}

#[derive(Serialize)]
struct CreateChatBody<'a> {
    title: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateMessageBody<'a> {
    content: &'a str,
    sender_type: Sender,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Map a non-2xx response to an error. 401/403 mean the token was refused.
fn error_from_response(status: u16, body: &[u8]) -> StoreError {
    if status == 401 || status == 403 {
        return StoreError::Unauthorized;
    }
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.trim().is_empty());

    if (400..500).contains(&status) {
        StoreError::Rejected(message.unwrap_or_else(|| format!("request rejected (HTTP {status})")))
    } else {
        StoreError::Service(message.unwrap_or_else(|| format!("HTTP {status}")))
    }
}

async fn read_json<T: DeserializeOwned>(req: reqwest::RequestBuilder) -> Result<T, StoreError> {
    let res = req
        .send()
        .await
        .map_err(|e| StoreError::Network(e.to_string()))?;

    let status = res.status();
    let bytes = res
        .bytes()
        .await
        .map_err(|e| StoreError::Network(e.to_string()))?;

    if !status.is_success() {
        return Err(error_from_response(status.as_u16(), &bytes));
    }
    serde_json::from_slice(&bytes).map_err(|e| StoreError::MalformedResponse(e.to_string()))
}

pub struct StoreClient {
    http: reqwest::Client,
    base_url: String,
}

impl StoreClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, StoreError> {
        let base_url = base_url.into();
        Ok(Self {
            http: reqwest::Client::builder()
                .build()
                .map_err(|e| StoreError::Network(e.to_string()))?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// All chats visible to the token's user, most recently updated first.
    pub async fn list_chats(&self, token: &str) -> Result<Vec<Chat>, StoreError> {
        let url = format!("{}/chats", self.base_url);
        read_json(self.http.get(url).bearer_auth(token)).await
    }

    /// Create a chat and return it as the store recorded it.
    pub async fn create_chat(&self, token: &str, title: &str) -> Result<Chat, StoreError> {
        let url = format!("{}/chats", self.base_url);
        let chat: Chat = read_json(
            self.http
                .post(url)
                .bearer_auth(token)
                .json(&CreateChatBody { title }),
        )
        .await?;
        debug!(chat_id = %chat.id, "chat created");
        Ok(chat)
    }

    /// All messages in a chat, oldest first.
    pub async fn list_messages(
        &self,
        token: &str,
        chat_id: &str,
    ) -> Result<Vec<Message>, StoreError> {
        let url = format!(
            "{}/chats/{}/messages",
            self.base_url,
            urlencoding::encode(chat_id)
        );
        read_json(self.http.get(url).bearer_auth(token)).await
    }

    /// Persist one message and return it as the store recorded it.
    pub async fn create_message(
        &self,
        token: &str,
        chat_id: &str,
        content: &str,
        sender_type: Sender,
    ) -> Result<Message, StoreError> {
        let url = format!(
            "{}/chats/{}/messages",
            self.base_url,
            urlencoding::encode(chat_id)
        );
        read_json(
            self.http
                .post(url)
                .bearer_auth(token)
                .json(&CreateMessageBody {
                    content,
                    sender_type,
                }),
        )
        .await
    }

    /// Bump a chat's `updatedAt` to now. The store answers with the id only.
    pub async fn touch_chat(&self, token: &str, chat_id: &str) -> Result<TouchAck, StoreError> {
        let url = format!(
            "{}/chats/{}/touch",
            self.base_url,
            urlencoding::encode(chat_id)
        );
        read_json(self.http.post(url).bearer_auth(token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_statuses_map_to_unauthorized() {
        assert!(matches!(
            error_from_response(401, b""),
            StoreError::Unauthorized
        ));
        assert!(matches!(
            error_from_response(403, b"{}"),
            StoreError::Unauthorized
        ));
    }

    #[test]
    fn client_errors_surface_the_server_message() {
        let err = error_from_response(404, br#"{"message":"chat not found"}"#);
        match err {
            StoreError::Rejected(msg) => assert_eq!(msg, "chat not found"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn server_errors_map_to_service() {
        let err = error_from_response(500, b"oops");
        match err {
            StoreError::Service(msg) => assert!(msg.contains("500"), "got: {msg}"),
            other => panic!("expected Service, got {other:?}"),
        }
    }

    #[test]
    fn create_message_body_uses_the_wire_field_names() {
        let body = CreateMessageBody {
            content: "hi",
            sender_type: Sender::User,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"content": "hi", "senderType": "user"})
        );
    }

    #[test]
    fn touch_ack_parses_an_id_only_body() {
        let ack: TouchAck = serde_json::from_str(r#"{"id":"chat-9"}"#).unwrap();
        assert_eq!(ack.id, "chat-9");
    }

    #[test]
    fn chats_parse_from_the_wire_shape() {
        let body = r#"[
            {"id":"c2","title":"Later","ownerId":"u1","createdAt":"2024-05-02T10:00:00Z","updatedAt":"2024-05-02T12:00:00Z"},
            {"id":"c1","title":"Earlier","ownerId":"u1","createdAt":"2024-05-01T10:00:00Z","updatedAt":"2024-05-01T12:00:00Z"}
        ]"#;
        let chats: Vec<Chat> = serde_json::from_str(body).unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].id, "c2");
        assert_eq!(chats[0].owner_id, "u1");
        assert!(chats[0].updated_at > chats[1].updated_at);
    }

    #[test]
    fn messages_parse_from_the_wire_shape() {
        let body = r#"{
            "id": "m1",
            "chatId": "c1",
            "content": "hello",
            "senderType": "bot",
            "ownerId": "u1",
            "createdAt": "2024-05-01T10:00:00Z"
        }"#;
        let message: Message = serde_json::from_str(body).unwrap();
        assert_eq!(message.chat_id, "c1");
        assert_eq!(message.sender_type, Sender::Bot);
    }
}
