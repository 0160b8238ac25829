//! In-memory session storage.
//!
//! Suitable for development, testing, and single-instance deployments.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::SessionRecord;
use super::repository::SessionRepository;
use crate::SessionError;

/// In-memory session storage.
///
/// Stores records in a `HashMap` protected by a `RwLock`. Clones share the
/// same map, so one repository can be handed to every request.
///
/// # Note
///
/// Sessions are lost when the process restarts.
/// For persistent storage, use [`FileSessionRepository`](super::FileSessionRepository).
#[derive(Clone, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl InMemorySessionRepository {
    /// Creates a new in-memory session repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of sessions currently stored.
    pub fn len(&self) -> usize {
        self.sessions.read().map(|guard| guard.len()).unwrap_or(0)
    }

    /// Returns true if there are no sessions stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> SessionError {
    SessionError::StorageError("Lock poisoned".to_owned())
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, SessionError> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(session_id).cloned())
    }

    async fn save(&self, session_id: &str, record: &SessionRecord) -> Result<(), SessionError> {
        self.sessions
            .write()
            .map_err(poisoned)?
            .insert(session_id.to_owned(), record.clone());

        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<(), SessionError> {
        self.sessions.write().map_err(poisoned)?.remove(session_id);

        Ok(())
    }

    #[allow(clippy::significant_drop_tightening)]
    async fn prune_expired(&self) -> Result<u64, SessionError> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;

        let before_count = sessions.len();
        sessions.retain(|_, record| !record.is_expired());

        let pruned = before_count.saturating_sub(sessions.len());
        Ok(u64::try_from(pruned).unwrap_or(u64::MAX))
    }
}
