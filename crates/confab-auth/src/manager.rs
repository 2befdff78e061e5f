//! Session lifecycle: sign-in state, proactive refresh, persistence.

use std::sync::Arc;

use jiff::Timestamp;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use confab_core::models::session::Session;

use crate::client::AuthApi;
use crate::error::AuthError;
use crate::persistence::CredentialPersistence;

/// Owns the signed-in session and keeps it fresh.
///
/// All session reads and refresh traffic go through one internal lock, so
/// concurrent callers of [`SessionManager::current_session`] share a single
/// refresh round trip instead of racing the token endpoint.
pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    persistence: Arc<dyn CredentialPersistence>,
    session: Mutex<Option<Session>>,
}

impl SessionManager {
    /// Build a manager, restoring any previously persisted session.
    pub async fn new(api: Arc<dyn AuthApi>, persistence: Arc<dyn CredentialPersistence>) -> Self {
        let session = persistence.load().await;
        if let Some(s) = &session {
            debug!(user_id = %s.user.id, "restored persisted session");
        }
        Self {
            api,
            persistence,
            session: Mutex::new(session),
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.api.sign_up(email, password).await?;
        self.install(session.clone()).await;
        info!(user_id = %session.user.id, "signed up");
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.api.sign_in(email, password).await?;
        self.install(session.clone()).await;
        info!(user_id = %session.user.id, "signed in");
        Ok(session)
    }

    /// Forget the signed-in session. Safe to call when already signed out.
    pub async fn sign_out(&self) {
        let mut slot = self.session.lock().await;
        let was_signed_in = slot.take().is_some();
        if let Err(e) = self.persistence.clear().await {
            warn!(error = %e, "failed to clear persisted session");
        }
        if was_signed_in {
            info!("signed out");
        }
    }

    /// The session to use right now, refreshed first if it is inside the
    /// refresh window.
    ///
    /// Returns `None` when signed out, or when a due refresh was rejected
    /// by the platform (in which case the stored session is discarded).
    pub async fn current_session(&self) -> Option<Session> {
        let mut slot = self.session.lock().await;
        let now = Timestamp::now();
        match slot.as_ref() {
            None => None,
            Some(s) if !s.needs_refresh_at(now) => Some(s.clone()),
            Some(_) => self.refresh_locked(&mut slot).await,
        }
    }

    /// The session as currently held, with no refresh attempt and with
    /// expired sessions filtered out.
    pub async fn peek_session(&self) -> Option<Session> {
        let slot = self.session.lock().await;
        slot.as_ref().filter(|s| s.is_valid()).cloned()
    }

    /// Force one refresh round trip with the stored refresh token.
    ///
    /// Used when the remote store answers 401 despite a seemingly fresh
    /// access token.
    pub async fn refresh(&self) -> Option<Session> {
        let mut slot = self.session.lock().await;
        self.refresh_locked(&mut slot).await
    }

    async fn refresh_locked(&self, slot: &mut Option<Session>) -> Option<Session> {
        let current = slot.clone()?;
        match self.api.refresh(&current.refresh_token).await {
            Ok(refreshed) => {
                if let Err(e) = self.persistence.store(&refreshed).await {
                    warn!(error = %e, "failed to persist refreshed session");
                }
                debug!(user_id = %refreshed.user.id, "session refreshed");
                *slot = Some(refreshed.clone());
                Some(refreshed)
            }
            Err(AuthError::Rejected(reason)) => {
                warn!(reason = %reason, "refresh token rejected; signing out");
                *slot = None;
                if let Err(e) = self.persistence.clear().await {
                    warn!(error = %e, "failed to clear persisted session");
                }
                None
            }
            Err(e) => {
                // Transient fault: keep the stored session while the access
                // token is still usable and try again on the next call.
                warn!(error = %e, "session refresh failed; will retry");
                current.is_valid().then_some(current)
            }
        }
    }

    async fn install(&self, session: Session) {
        let mut slot = self.session.lock().await;
        if let Err(e) = self.persistence.store(&session).await {
            warn!(error = %e, "failed to persist session");
        }
        *slot = Some(session);
    }
}
