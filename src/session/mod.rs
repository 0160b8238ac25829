mod config;
mod context;
pub mod cookie;
mod file_store;
mod memory_store;
mod repository;
mod store;

use chrono::{DateTime, Duration, Utc};
pub use config::{SameSite, SessionConfig, SigningKey};
pub use context::{SessionContext, with_session};
pub use self::cookie::CookieParams;
pub use file_store::FileSessionRepository;
pub use memory_store::InMemorySessionRepository;
pub use repository::SessionRepository;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
pub use store::{SessionStatus, SessionStore};

/// What a repository persists for one session identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    /// `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn new(expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            data: Map::new(),
            created_at: Utc::now(),
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() > at)
    }
}

/// Expiry for a record touched at `now` with `idle_timeout` seconds of allowed inactivity.
///
/// Zero, or a timeout too large to represent, never expires.
pub(crate) fn expiry_after(now: DateTime<Utc>, idle_timeout: u64) -> Option<DateTime<Utc>> {
    if idle_timeout == 0 {
        return None;
    }
    let secs = i64::try_from(idle_timeout).ok()?;
    now.checked_add_signed(Duration::try_seconds(secs)?)
}
