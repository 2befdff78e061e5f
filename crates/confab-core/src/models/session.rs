use serde::{Deserialize, Serialize};

/// Time-to-expiry threshold, in milliseconds, below which a session is due
/// for a refresh. An already expired session is also considered due.
pub const REFRESH_WINDOW_MS: i64 = 5 * 60 * 1000;

/// An authenticated session: the token pair, the user it belongs to, and
/// the absolute expiry of the access token.
///
/// This is also the persisted on-disk shape, so the field names and the
/// epoch-millisecond expiry encoding are part of the storage format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: SessionUser,
    #[serde(with = "jiff::fmt::serde::timestamp::millisecond::required")]
    pub expires_at: jiff::Timestamp,
}

/// The user a session belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub display_name: Option<String>,
}

impl Session {
    /// Whether the access token is still usable at `now`.
    pub fn is_valid_at(&self, now: jiff::Timestamp) -> bool {
        self.expires_at > now
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(jiff::Timestamp::now())
    }

    /// Whether the session has entered the refresh window at `now`.
    pub fn needs_refresh_at(&self, now: jiff::Timestamp) -> bool {
        self.expires_at.as_millisecond() - now.as_millisecond() < REFRESH_WINDOW_MS
    }

    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh_at(jiff::Timestamp::now())
    }
}
