//! Session persistence.
//!
//! The auth layer keeps the current session in memory and mirrors it to a
//! [`SessionStore`] when persistence is enabled, so a restarted process can
//! resume a signed-in state without a fresh password grant.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::auth::Session;
use crate::error::{BackendError, BackendResult};

/// Where sessions live between sign-ins.
pub trait SessionStore: Send + Sync {
    fn save(&self, session: &Session) -> BackendResult<()>;
    fn load(&self) -> BackendResult<Option<Session>>;
    fn clear(&self) -> BackendResult<()>;
}

/// In-memory store; sessions last as long as the client.
#[derive(Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &Session) -> BackendResult<()> {
        *self.slot.lock() = Some(session.clone());
        Ok(())
    }

    fn load(&self) -> BackendResult<Option<Session>> {
        Ok(self.slot.lock().clone())
    }

    fn clear(&self) -> BackendResult<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}

/// JSON file store with owner-only permissions.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, session: &Session) -> BackendResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BackendError::Store(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(session)
            .map_err(|e| BackendError::Store(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| BackendError::Store(e.to_string()))?;

        set_restrictive_permissions(&self.path)?;
        Ok(())
    }

    fn load(&self) -> BackendResult<Option<Session>> {
        match std::fs::read_to_string(&self.path) {
            Ok(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| BackendError::Store(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BackendError::Store(e.to_string())),
        }
    }

    fn clear(&self) -> BackendResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BackendError::Store(e.to_string())),
        }
    }
}

fn set_restrictive_permissions(path: &Path) -> BackendResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms).map_err(|e| BackendError::Store(e.to_string()))?;
    }
    let _ = path; // Silence unused warning on non-Unix
    Ok(())
}
