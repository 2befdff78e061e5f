//! Durable storage for the signed-in session.
//!
//! The on-disk format is the JSON serialization of
//! [`confab_core::models::session::Session`]. A record that cannot be read
//! or parsed is treated as absent, never as an error: the worst outcome of
//! a corrupt file is that the user signs in again.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use confab_core::models::session::Session;

use crate::client::BoxFuture;
use crate::error::StorageError;

/// Where the signed-in session lives between launches.
///
/// Methods return boxed futures for dyn compatibility.
pub trait CredentialPersistence: Send + Sync {
    /// Load the persisted session, if a readable one exists.
    fn load(&self) -> BoxFuture<'_, Option<Session>>;

    /// Replace the persisted session.
    fn store(&self, session: &Session) -> BoxFuture<'_, Result<(), StorageError>>;

    /// Remove the persisted session. Removing an absent record succeeds.
    fn clear(&self) -> BoxFuture<'_, Result<(), StorageError>>;
}

/// JSON-file persistence at an explicit path.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_session(&self) -> Option<Session> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read session file");
                return None;
            }
        };
        match serde_json::from_str::<Session>(&contents) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "session file is corrupt; ignoring it");
                None
            }
        }
    }

    fn write_session(&self, session: &Session) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(session)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write to a temp file then rename for atomicity
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json)?;

        // Set restrictive permissions on Unix before renaming
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp_path, &self.path)?;
        debug!(path = %self.path.display(), "session persisted");
        Ok(())
    }

    fn remove_session(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "session file removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

impl CredentialPersistence for FileCredentialStore {
    fn load(&self) -> BoxFuture<'_, Option<Session>> {
        Box::pin(async move { self.read_session() })
    }

    fn store(&self, session: &Session) -> BoxFuture<'_, Result<(), StorageError>> {
        let session = session.clone();
        Box::pin(async move { self.write_session(&session) })
    }

    fn clear(&self) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async move { self.remove_session() })
    }
}

/// In-memory persistence for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: std::sync::Mutex<Option<Session>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            slot: std::sync::Mutex::new(Some(session)),
        }
    }
}

impl CredentialPersistence for MemoryCredentialStore {
    fn load(&self) -> BoxFuture<'_, Option<Session>> {
        Box::pin(async move { self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone() })
    }

    fn store(&self, session: &Session) -> BoxFuture<'_, Result<(), StorageError>> {
        let session = session.clone();
        Box::pin(async move {
            *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(session);
            Ok(())
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
            Ok(())
        })
    }
}
