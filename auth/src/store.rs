//! Persistence for the provider client's current session.
//!
//! Storage is synchronous: a session is a few hundred bytes of JSON and the
//! store is only touched when the session slot changes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::provider::RawSession;

#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("session encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait SessionStore: Send + Sync {
    /// Stored session, `None` when nothing has been saved.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backing storage cannot be read.
    fn load(&self) -> Result<Option<RawSession>, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError`] when the session cannot be written.
    fn save(&self, session: &RawSession) -> Result<(), StoreError>;

    /// Remove the stored session. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backing storage cannot be modified.
    fn clear(&self) -> Result<(), StoreError>;
}

// =============================================================================
// MEMORY
// =============================================================================

/// Process-local store. Sessions do not survive a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<RawSession>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<RawSession>, StoreError> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, session: &RawSession) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// Single JSON file holding the session, owner-readable only on Unix.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), source }
    }

    fn ensure_parent(&self) -> Result<(), StoreError> {
        let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
            return Ok(());
        };
        if dir.exists() {
            return Ok(());
        }
        std::fs::create_dir_all(dir).map_err(|source| self.io_error(source))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(dir, std::fs::Permissions::from_mode(DIR_MODE))
                .map_err(|source| self.io_error(source))?;
        }
        Ok(())
    }

    fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(FILE_MODE)
                .open(path)?;
            file.write_all(content)?;
            file.sync_all()
        }
        #[cfg(not(unix))]
        {
            std::fs::write(path, content)
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<RawSession>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        let session = serde_json::from_str(&content)
            .map_err(|source| StoreError::Corrupt { path: self.path.clone(), source })?;
        debug!(path = %self.path.display(), "session restored from file");
        Ok(Some(session))
    }

    fn save(&self, session: &RawSession) -> Result<(), StoreError> {
        self.ensure_parent()?;
        let content = serde_json::to_vec_pretty(session)?;

        // Temp file then rename, so a crash never leaves a half-written session.
        let temp = self.path.with_extension("tmp");
        if let Err(err) = Self::write_private(&temp, &content) {
            let _ = std::fs::remove_file(&temp);
            return Err(self.io_error(err));
        }
        if let Err(err) = std::fs::rename(&temp, &self.path) {
            let _ = std::fs::remove_file(&temp);
            return Err(self.io_error(err));
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err)),
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
