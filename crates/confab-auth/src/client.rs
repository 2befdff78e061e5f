//! HTTP client for the Confab auth endpoints.
//!
//! All three endpoints (`/signup`, `/signin`, `/token`) accept a JSON body
//! and answer with the same session envelope, so the transport lives in one
//! helper and the public operations stay thin.

use std::future::Future;
use std::pin::Pin;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::info;

use confab_core::models::session::{Session, SessionUser};

use crate::error::AuthError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Credential and token exchange operations.
///
/// Methods return boxed futures for dyn compatibility.
pub trait AuthApi: Send + Sync {
    fn sign_up(&self, email: &str, password: &str) -> BoxFuture<'_, Result<Session, AuthError>>;
    fn sign_in(&self, email: &str, password: &str) -> BoxFuture<'_, Result<Session, AuthError>>;
    fn refresh(&self, refresh_token: &str) -> BoxFuture<'_, Result<Session, AuthError>>;
}

#[derive(Serialize)]
struct CredentialsBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct SessionEnvelope {
    session: WireSession,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSession {
    access_token: String,
    /// May be omitted on a refresh grant; the prior token stays valid.
    refresh_token: Option<String>,
    user: SessionUser,
    /// Access token lifetime in seconds, relative to the response.
    access_token_expires_in: i64,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Convert a session envelope into a [`Session`] with an absolute expiry.
///
/// `prior_refresh_token` fills the gap when a refresh grant omits the
/// refresh token from its response.
fn session_from_wire(
    wire: WireSession,
    prior_refresh_token: Option<&str>,
    now: Timestamp,
) -> Result<Session, AuthError> {
    let refresh_token = wire
        .refresh_token
        .filter(|t| !t.is_empty())
        .or_else(|| prior_refresh_token.map(str::to_string))
        .ok_or_else(|| {
            AuthError::MalformedResponse("session envelope is missing a refresh token".to_string())
        })?;
    if wire.access_token.is_empty() {
        return Err(AuthError::MalformedResponse(
            "session envelope is missing an access token".to_string(),
        ));
    }
    // The lifetime is remote-supplied; an absurd value must not overflow.
    let expires_ms = wire
        .access_token_expires_in
        .checked_mul(1000)
        .and_then(|lifetime_ms| now.as_millisecond().checked_add(lifetime_ms))
        .ok_or_else(|| {
            AuthError::MalformedResponse("accessTokenExpiresIn is out of range".to_string())
        })?;
    let expires_at = Timestamp::from_millisecond(expires_ms)
        .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

    Ok(Session {
        access_token: wire.access_token,
        refresh_token,
        user: wire.user,
        expires_at,
    })
}

/// Map a non-2xx response to an error. 4xx means the platform refused the
/// request; anything else is a service fault.
fn rejection_from_body(status: u16, body: &[u8]) -> AuthError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.trim().is_empty());

    if (400..500).contains(&status) {
        AuthError::Rejected(message.unwrap_or_else(|| format!("request rejected (HTTP {status})")))
    } else {
        AuthError::Service(message.unwrap_or_else(|| format!("HTTP {status}")))
    }
}

pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AuthError> {
        let base_url = base_url.into();
        Ok(Self {
            http: reqwest::Client::builder()
                .build()
                .map_err(|e| AuthError::Network(e.to_string()))?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        info!(email = email, "signing up");
        self.post_session("/signup", &CredentialsBody { email, password }, None)
            .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        info!(email = email, "signing in");
        self.post_session("/signin", &CredentialsBody { email, password }, None)
            .await
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.post_session("/token", &RefreshBody { refresh_token }, Some(refresh_token))
            .await
    }

    async fn post_session(
        &self,
        path: &str,
        body: &impl Serialize,
        prior_refresh_token: Option<&str>,
    ) -> Result<Session, AuthError> {
        let url = format!("{}{path}", self.base_url);
        let res = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(rejection_from_body(status.as_u16(), &bytes));
        }

        let envelope: SessionEnvelope = serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        session_from_wire(envelope.session, prior_refresh_token, Timestamp::now())
    }
}

impl AuthApi for AuthClient {
    fn sign_up(&self, email: &str, password: &str) -> BoxFuture<'_, Result<Session, AuthError>> {
        let email = email.to_string();
        let password = password.to_string();
        Box::pin(async move { AuthClient::sign_up(self, &email, &password).await })
    }

    fn sign_in(&self, email: &str, password: &str) -> BoxFuture<'_, Result<Session, AuthError>> {
        let email = email.to_string();
        let password = password.to_string();
        Box::pin(async move { AuthClient::sign_in(self, &email, &password).await })
    }

    fn refresh(&self, refresh_token: &str) -> BoxFuture<'_, Result<Session, AuthError>> {
        let refresh_token = refresh_token.to_string();
        Box::pin(async move { self.refresh_session(&refresh_token).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(expires_in: i64) -> WireSession {
        WireSession {
            access_token: "at".to_string(),
            refresh_token: Some("rt".to_string()),
            user: SessionUser {
                id: "u1".to_string(),
                email: "u@example.com".to_string(),
                display_name: None,
            },
            access_token_expires_in: expires_in,
        }
    }

    #[test]
    fn expiry_is_anchored_to_the_response_time() {
        let now = Timestamp::from_millisecond(1_700_000_000_000).unwrap();
        let session = session_from_wire(wire(900), None, now).unwrap();
        assert_eq!(session.expires_at.as_millisecond(), 1_700_000_900_000);
    }

    /// A service answering with an absurd lifetime must get a malformed
    /// error, not an arithmetic overflow.
    #[test]
    fn an_out_of_range_expires_in_is_rejected_as_malformed() {
        let now = Timestamp::from_millisecond(1_700_000_000_000).unwrap();
        // Overflows the seconds-to-ms conversion, the expiry sum, and the
        // negative range respectively.
        for expires_in in [i64::MAX, i64::MAX / 1000, i64::MIN] {
            assert!(matches!(
                session_from_wire(wire(expires_in), None, now),
                Err(AuthError::MalformedResponse(_))
            ));
        }
    }

    #[test]
    fn empty_tokens_are_rejected_as_malformed() {
        let now = Timestamp::from_millisecond(0).unwrap();
        let mut w = wire(900);
        w.access_token.clear();
        assert!(matches!(
            session_from_wire(w, None, now),
            Err(AuthError::MalformedResponse(_))
        ));
    }

    #[test]
    fn a_refresh_grant_may_omit_the_refresh_token() {
        let now = Timestamp::from_millisecond(0).unwrap();
        let mut w = wire(900);
        w.refresh_token = None;

        let session = session_from_wire(w, Some("old-rt"), now).unwrap();
        assert_eq!(session.refresh_token, "old-rt");

        // Without a prior token there is nothing to fall back to.
        let mut w = wire(900);
        w.refresh_token = None;
        assert!(matches!(
            session_from_wire(w, None, now),
            Err(AuthError::MalformedResponse(_))
        ));
    }

    #[test]
    fn client_errors_surface_the_server_message() {
        let err = rejection_from_body(401, br#"{"message":"Invalid credentials"}"#);
        match err {
            AuthError::Rejected(msg) => assert_eq!(msg, "Invalid credentials"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn unreadable_error_bodies_fall_back_to_the_status() {
        let err = rejection_from_body(401, b"<html>nope</html>");
        match err {
            AuthError::Rejected(msg) => assert!(msg.contains("401"), "got: {msg}"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn server_faults_are_not_rejections() {
        let err = rejection_from_body(503, br#"{"message":"maintenance"}"#);
        assert!(matches!(err, AuthError::Service(_)));
    }

    #[test]
    fn session_envelope_parses_the_documented_shape() {
        let body = br#"{
            "session": {
                "accessToken": "at",
                "refreshToken": "rt",
                "user": {"id": "u1", "email": "u@example.com", "displayName": "U"},
                "accessTokenExpiresIn": 900
            }
        }"#;
        let envelope: SessionEnvelope = serde_json::from_slice(body).unwrap();
        assert_eq!(envelope.session.access_token, "at");
        assert_eq!(envelope.session.refresh_token.as_deref(), Some("rt"));
        assert_eq!(envelope.session.user.display_name.as_deref(), Some("U"));
        assert_eq!(envelope.session.access_token_expires_in, 900);
    }
}
