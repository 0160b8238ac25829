//! Session repository trait.

use async_trait::async_trait;

use super::SessionRecord;
use crate::SessionError;

/// Persistence backend for session records, keyed by session identifier.
///
/// Implementations provide different storage backends:
/// - [`InMemorySessionRepository`](super::InMemorySessionRepository): In-memory storage for testing
/// - [`FileSessionRepository`](super::FileSessionRepository): One JSON file per session
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Loads the record stored under `session_id`, expired or not.
    async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, SessionError>;

    /// Stores `record` under `session_id`, replacing any previous record.
    async fn save(&self, session_id: &str, record: &SessionRecord) -> Result<(), SessionError>;

    /// Deletes the record. Missing records are not an error.
    async fn destroy(&self, session_id: &str) -> Result<(), SessionError>;

    /// Removes expired records.
    ///
    /// Returns the number of records pruned.
    async fn prune_expired(&self) -> Result<u64, SessionError>;
}
