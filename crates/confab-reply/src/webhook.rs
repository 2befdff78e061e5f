//! Client for the reply webhook.
//!
//! The webhook is operated outside this codebase, so its response is
//! treated as untrusted: the shape is validated explicitly instead of
//! deserialized into a struct, and every call carries a hard timeout.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ReplyError;

/// Maximum time to wait for the webhook before giving up.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct WebhookPayload<'a> {
    action: Action<'a>,
    input: Input<'a>,
    session_variables: SessionVariables<'a>,
}

#[derive(Serialize)]
struct Action<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct Input<'a> {
    chat_id: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct SessionVariables<'a> {
    role: &'a str,
    user_id: &'a str,
}

/// Pull the reply text out of the webhook's response body.
///
/// A missing, non-string, or blank `response` field is malformed.
fn reply_from_json(json: &Value) -> Result<String, ReplyError> {
    let reply = json
        .get("response")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ReplyError::MalformedResponse("no usable `response` field".to_string())
        })?;
    Ok(reply.to_string())
}

pub struct ReplyClient {
    http: reqwest::Client,
    webhook_url: String,
    timeout: Duration,
}

impl ReplyClient {
    pub fn new(webhook_url: impl Into<String>) -> Result<Self, ReplyError> {
        Self::with_timeout(webhook_url, REPLY_TIMEOUT)
    }

    pub fn with_timeout(
        webhook_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ReplyError> {
        Ok(Self {
            http: reqwest::Client::builder()
                .build()
                .map_err(|e| ReplyError::Network(e.to_string()))?,
            webhook_url: webhook_url.into(),
            timeout,
        })
    }

    /// Ask the webhook for a reply to `message` in `chat_id`.
    pub async fn request_reply(
        &self,
        chat_id: &str,
        message: &str,
        user_id: &str,
    ) -> Result<String, ReplyError> {
        let payload = WebhookPayload {
            action: Action {
                name: "sendMessage",
            },
            input: Input { chat_id, message },
            session_variables: SessionVariables {
                role: "user",
                user_id,
            },
        };

        let res = self
            .http
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReplyError::Timeout
                } else {
                    ReplyError::Network(e.to_string())
                }
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(ReplyError::Service(format!(
                "webhook returned HTTP {}",
                status.as_u16()
            )));
        }

        let json: Value = res.json().await.map_err(|e| {
            if e.is_timeout() {
                ReplyError::Timeout
            } else {
                ReplyError::MalformedResponse(e.to_string())
            }
        })?;

        let reply = reply_from_json(&json)?;
        debug!(chat_id = %chat_id, chars = reply.len(), "reply received");
        Ok(reply)
    }
}
