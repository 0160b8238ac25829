//! File-based session storage.
//!
//! Stores sessions as JSON files in a directory.

use std::fs::DirEntry;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use super::SessionRecord;
use super::repository::SessionRepository;
use crate::SessionError;
use crate::crypto::{generate_token, is_valid_session_id};

/// File-based session storage.
///
/// Each session is stored as a JSON file named `{session_id}.json`
/// in the configured directory. Writes go to a temporary file that is
/// renamed into place, so readers never observe a half-written record.
///
/// # Example
///
/// ```rust,ignore
/// use inn_session::FileSessionRepository;
///
/// let repo = FileSessionRepository::new("/var/lib/myapp/sessions")?;
/// ```
#[derive(Debug, Clone)]
pub struct FileSessionRepository {
    directory: PathBuf,
}

impl FileSessionRepository {
    /// Creates a new file session repository.
    ///
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let dir = directory.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            SessionError::StorageError(format!("Failed to create session directory: {e}"))
        })?;
        Ok(Self { directory: dir })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.directory.join(format!("{session_id}.json"))
    }

    fn read_record(path: &Path) -> Result<Option<SessionRecord>, SessionError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SessionError::StorageError(format!(
                    "Failed to read session file: {e}"
                )));
            }
        };

        let record = serde_json::from_str(&content)?;
        Ok(Some(record))
    }
}

/// Temp files younger than this may still belong to an in-flight `save`.
const STALE_TEMP_AGE: Duration = Duration::from_secs(60);

fn is_stale(entry: &DirEntry) -> bool {
    entry
        .metadata()
        .and_then(|meta| meta.modified())
        .is_ok_and(|modified| modified.elapsed().is_ok_and(|age| age > STALE_TEMP_AGE))
}

#[async_trait]
impl SessionRepository for FileSessionRepository {
    async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, SessionError> {
        // Validate session_id to prevent path traversal
        if !is_valid_session_id(session_id) {
            return Ok(None);
        }

        Self::read_record(&self.session_path(session_id))
    }

    async fn save(&self, session_id: &str, record: &SessionRecord) -> Result<(), SessionError> {
        if !is_valid_session_id(session_id) {
            return Err(SessionError::InvalidSessionId);
        }

        let content = serde_json::to_string(record)?;
        let path = self.session_path(session_id);
        let tmp = self
            .directory
            .join(format!(".{session_id}.{}.tmp", generate_token(8)));

        std::fs::write(&tmp, content).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            SessionError::StorageError(format!("Failed to write session file: {e}"))
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            SessionError::StorageError(format!("Failed to write session file: {e}"))
        })?;

        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<(), SessionError> {
        if !is_valid_session_id(session_id) {
            return Ok(());
        }

        match std::fs::remove_file(self.session_path(session_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::StorageError(format!(
                "Failed to delete session file: {e}"
            ))),
        }
    }

    async fn prune_expired(&self) -> Result<u64, SessionError> {
        let entries = std::fs::read_dir(&self.directory).map_err(|e| {
            SessionError::StorageError(format!("Failed to read session directory: {e}"))
        })?;

        let mut pruned = 0u64;

        for entry in entries.flatten() {
            let path = entry.path();

            match path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => {
                    if let Ok(Some(record)) = Self::read_record(&path)
                        && record.is_expired()
                        && std::fs::remove_file(&path).is_ok()
                    {
                        pruned += 1;
                    }
                }
                // leftovers of writes that never reached the rename
                Some("tmp") if is_stale(&entry) => {
                    let _ = std::fs::remove_file(&path);
                }
                _ => {}
            }
        }

        if pruned > 0 {
            log::info!(target: "inn_session", "msg=\"pruned expired sessions\" count={pruned}");
        }

        Ok(pruned)
    }
}
