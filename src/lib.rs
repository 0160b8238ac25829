//! Cookie-keyed session storage for request handlers.
//!
//! A [`SessionStore`] is opened at the start of a request, read and written
//! like a map, and ended before the response goes out. Persistence sits
//! behind the [`SessionRepository`] trait.
//!
//! ```rust
//! use inn_session::{InMemorySessionRepository, SessionConfig, SessionContext};
//!
//! # async fn run() -> Result<(), inn_session::SessionError> {
//! let repo = InMemorySessionRepository::new();
//! let mut ctx = SessionContext::new(repo, None);
//!
//! let store = ctx
//!     .instance(SessionConfig {
//!         id: Some("izisaurio".to_owned()),
//!         secure: false,
//!         ..Default::default()
//!     })
//!     .await?;
//! store.set("name", "isaac");
//! assert_eq!(store["name"], "isaac");
//!
//! let set_cookie = ctx.finish().await?;
//! assert!(set_cookie.is_some());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod crypto;
pub mod session;

use std::fmt;

pub use session::{
    CookieParams, FileSessionRepository, InMemorySessionRepository, SameSite, SessionConfig,
    SessionContext, SessionRecord, SessionRepository, SessionStatus, SessionStore, SigningKey,
    with_session,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A forced or stored identifier is outside `[A-Za-z0-9,-]{1,256}`.
    InvalidSessionId,
    ConfigurationError(String),
    StorageError(String),
    SerializationError(String),
}

impl std::error::Error for SessionError {}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidSessionId => write!(f, "Invalid session identifier"),
            SessionError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
            SessionError::StorageError(msg) => write!(f, "Storage error: {msg}"),
            SessionError::SerializationError(msg) => write!(f, "Serialization error: {msg}"),
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::SerializationError(err.to_string())
    }
}
