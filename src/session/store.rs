//! The open session for one request.

use std::ops::Index;

use chrono::{DateTime, Utc};
use cookie::Cookie;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::config::{SessionConfig, SigningKey};
use super::cookie::{
    CookieParams, removal_cookie, session_cookie, sign_session_id, verify_signed_cookie,
};
use super::repository::SessionRepository;
use super::{SessionRecord, expiry_after};
use crate::SessionError;
use crate::crypto::{generate_session_id, is_valid_session_id};

static NULL: Value = Value::Null;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    /// [`SessionStore::destroy`] ran; reads see nothing and writes are dropped.
    Destroyed,
}

/// Key-value session data for a single request/response cycle.
///
/// Opened with [`SessionStore::begin`] and closed with [`SessionStore::end`],
/// which writes the data back to the repository. Dropping an active store
/// without ending it loses its writes.
pub struct SessionStore<R: SessionRepository> {
    repository: R,
    id: String,
    data: Map<String, Value>,
    created_at: DateTime<Utc>,
    cookie: CookieParams,
    secret_key: Option<SigningKey>,
    idle_timeout: u64,
    status: SessionStatus,
    /// The client does not hold a cookie for `id` yet.
    issued: bool,
    closed: bool,
}

fn client_session_id(value: &str, key: Option<&SigningKey>) -> Option<String> {
    let id = match key {
        Some(key) => verify_signed_cookie(value, key)?,
        None => value.to_owned(),
    };
    is_valid_session_id(&id).then_some(id)
}

fn id_prefix(id: &str) -> String {
    id.chars().take(8).collect()
}

impl<R: SessionRepository> SessionStore<R> {
    /// Starts a session.
    ///
    /// `incoming_cookie` is the raw value of the session cookie sent by the
    /// client, if any. A forced `config.id` takes precedence over it; with
    /// neither, a fresh identifier is generated. Expired or undecodable
    /// records are deleted and the session starts empty.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError` - `config` fails [`SessionConfig::validate`]
    /// - `InvalidSessionId` - the forced id is outside `[A-Za-z0-9,-]{1,256}`
    /// - `StorageError` - the repository failed
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_begin", skip_all, err)
    )]
    pub async fn begin(
        repository: R,
        mut config: SessionConfig,
        incoming_cookie: Option<&str>,
    ) -> Result<Self, SessionError> {
        config.validate()?;

        let forced = config.take_id();
        let client_id =
            incoming_cookie.and_then(|value| client_session_id(value, config.secret_key.as_ref()));

        let from_client = forced.is_none() && client_id.is_some();
        let mut id = match forced {
            Some(id) if is_valid_session_id(&id) => id,
            Some(_) => return Err(SessionError::InvalidSessionId),
            None => client_id.clone().unwrap_or_else(generate_session_id),
        };

        let record = match repository.load(&id).await {
            Ok(Some(record)) if record.is_expired() => {
                repository.destroy(&id).await?;
                None
            }
            Ok(record) => record,
            Err(SessionError::SerializationError(e)) => {
                log::warn!(target: "inn_session", "msg=\"undecodable session discarded\" id_prefix=\"{}\" error=\"{e}\"", id_prefix(&id));
                repository.destroy(&id).await?;
                None
            }
            Err(e) => return Err(e),
        };

        if from_client && record.is_none() && config.strict_mode {
            log::info!(target: "inn_session", "msg=\"unknown session id replaced\" id_prefix=\"{}\"", id_prefix(&id));
            id = generate_session_id();
        }

        let issued = client_id.as_deref() != Some(id.as_str()) || config.lifetime > 0;
        let (data, created_at) = record.map_or_else(
            || (Map::new(), Utc::now()),
            |record| (record.data, record.created_at),
        );

        log::info!(
            target: "inn_session",
            "msg=\"session started\" id_prefix=\"{}\" keys={} issued={}",
            id_prefix(&id),
            data.len(),
            issued
        );

        Ok(Self {
            repository,
            id,
            data,
            created_at,
            cookie: config.cookie_params(),
            secret_key: config.secret_key,
            idle_timeout: config.idle_timeout,
            status: SessionStatus::Active,
            issued,
            closed: false,
        })
    }

    /// Writes the data back to the repository and closes the store.
    ///
    /// Returns the cookie the response must set, if it changed: the session
    /// cookie for a newly issued identifier, or a removal cookie after
    /// [`destroy`](Self::destroy). The identifier stays valid for later requests.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_end", skip_all, err)
    )]
    pub async fn end(mut self) -> Result<Option<Cookie<'static>>, SessionError> {
        self.closed = true;
        let cookie = self.set_cookie();

        if self.status == SessionStatus::Active {
            let record = SessionRecord {
                data: std::mem::take(&mut self.data),
                created_at: self.created_at,
                expires_at: expiry_after(Utc::now(), self.idle_timeout),
            };
            self.repository.save(&self.id, &record).await?;

            log::info!(
                target: "inn_session",
                "msg=\"session written\" id_prefix=\"{}\" keys={}",
                id_prefix(&self.id),
                record.data.len()
            );
        }

        Ok(cookie)
    }

    /// Clears every key and deletes the stored record.
    ///
    /// The identifier is no longer valid afterwards. Calling this twice is a no-op.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_destroy", skip_all, err)
    )]
    pub async fn destroy(&mut self) -> Result<(), SessionError> {
        self.data.clear();
        if self.status == SessionStatus::Destroyed {
            return Ok(());
        }

        self.repository.destroy(&self.id).await?;

        log::info!(target: "inn_session", "msg=\"session destroyed\" id_prefix=\"{}\"", id_prefix(&self.id));

        self.status = SessionStatus::Destroyed;
        self.id.clear();
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Current session identifier; empty after [`destroy`](Self::destroy).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The cookie [`end`](Self::end) would return right now.
    pub fn set_cookie(&self) -> Option<Cookie<'static>> {
        match self.status {
            SessionStatus::Destroyed => Some(removal_cookie(&self.cookie)),
            SessionStatus::Active if self.issued => {
                let value = match &self.secret_key {
                    Some(key) => sign_session_id(&self.id, key),
                    None => self.id.clone(),
                };
                Some(session_cookie(&self.cookie, value))
            }
            SessionStatus::Active => None,
        }
    }

    fn writable(&self, key: &str) -> bool {
        if self.status == SessionStatus::Destroyed {
            log::warn!(target: "inn_session", "msg=\"write to destroyed session ignored\" key=\"{key}\"");
            return false;
        }
        true
    }

    /// Inserts or overwrites `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        if self.writable(&key) {
            self.data.insert(key, value.into());
        }
    }

    /// Inserts every pair, overwriting existing keys. Values are not deep-merged.
    pub fn set_many<K, V>(&mut self, entries: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.set(key, value);
        }
    }

    /// True if `key` is present, whatever its value.
    pub fn has(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.data
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.into())
    }

    /// Deserializes the value under `key`; `None` if absent or of another shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data.get(key).and_then(|value| T::deserialize(value).ok())
    }

    /// Removes `key`. Absent keys are ignored.
    pub fn unset(&mut self, key: &str) {
        self.data.remove(key);
    }

    /// Removes `key` and returns what it held.
    pub fn flash(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn flash_or(&mut self, key: &str, default: impl Into<Value>) -> Value {
        self.flash(key).unwrap_or_else(|| default.into())
    }

    /// Removes every key but keeps the session alive.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.data.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<R: SessionRepository> Index<&str> for SessionStore<R> {
    type Output = Value;

    /// Missing keys read as `Value::Null`.
    fn index(&self, key: &str) -> &Value {
        self.data.get(key).unwrap_or(&NULL)
    }
}

impl<R, K, V> Extend<(K, V)> for SessionStore<R>
where
    R: SessionRepository,
    K: Into<String>,
    V: Into<Value>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.set_many(iter);
    }
}

impl<R: SessionRepository> Drop for SessionStore<R> {
    fn drop(&mut self) {
        if !self.closed && self.status == SessionStatus::Active {
            log::warn!(target: "inn_session", "msg=\"session dropped without end, writes lost\" id_prefix=\"{}\"", id_prefix(&self.id));
        }
    }
}
