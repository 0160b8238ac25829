//! Per-request session ownership.

use cookie::Cookie;
use futures::future::BoxFuture;

use super::config::SessionConfig;
use super::cookie::cookie_value;
use super::repository::SessionRepository;
use super::store::SessionStore;
use crate::SessionError;

/// Holds at most one [`SessionStore`] for one in-flight request.
///
/// The store is opened lazily by the first [`instance`](Self::instance)
/// call. Later calls return the same store and ignore their `config`.
pub struct SessionContext<R>
where
    R: SessionRepository + Clone,
{
    repository: R,
    incoming_cookie: Option<String>,
    store: Option<SessionStore<R>>,
}

impl<R> SessionContext<R>
where
    R: SessionRepository + Clone,
{
    /// `incoming_cookie` is the raw session cookie value from the request, if any.
    pub fn new(repository: R, incoming_cookie: Option<String>) -> Self {
        Self {
            repository,
            incoming_cookie,
            store: None,
        }
    }

    /// Returns the request's store, opening it with `config` on first use.
    pub async fn instance(
        &mut self,
        config: SessionConfig,
    ) -> Result<&mut SessionStore<R>, SessionError> {
        let store = match self.store.take() {
            Some(store) => {
                log::debug!(target: "inn_session", "msg=\"session already open, config ignored\"");
                store
            }
            None => {
                SessionStore::begin(
                    self.repository.clone(),
                    config,
                    self.incoming_cookie.as_deref(),
                )
                .await?
            }
        };

        Ok(self.store.insert(store))
    }

    /// Builds a context from the request's raw `Cookie` header, picking out
    /// the `cookie_name` pair.
    ///
    /// ```rust
    /// use inn_session::{InMemorySessionRepository, SessionConfig, SessionContext};
    ///
    /// # async fn run() -> Result<(), inn_session::SessionError> {
    /// let config = SessionConfig::development();
    /// let header = Some("theme=dark; INNSESSID=abc123");
    /// let mut ctx = SessionContext::from_cookie_header(
    ///     InMemorySessionRepository::new(),
    ///     header,
    ///     &config.cookie_name,
    /// );
    /// ctx.instance(config).await?.set("visits", 1);
    /// let set_cookie = ctx.finish().await?;
    /// # assert!(set_cookie.is_some());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_cookie_header(repository: R, header: Option<&str>, cookie_name: &str) -> Self {
        Self::new(
            repository,
            header.and_then(|header| cookie_value(header, cookie_name)),
        )
    }

    pub fn is_open(&self) -> bool {
        self.store.is_some()
    }

    /// The open store, if [`instance`](Self::instance) has been called.
    pub fn store(&mut self) -> Option<&mut SessionStore<R>> {
        self.store.as_mut()
    }

    /// Ends the store if one was opened and returns the cookie to set.
    pub async fn finish(mut self) -> Result<Option<Cookie<'static>>, SessionError> {
        match self.store.take() {
            Some(store) => store.end().await,
            None => Ok(None),
        }
    }
}

/// Opens a session, runs `f` with it, and always ends it afterwards.
///
/// The store is written back whether `f` succeeds or fails. An error from
/// `f` takes precedence over one from ending the store.
///
/// ```rust
/// use inn_session::{InMemorySessionRepository, SessionConfig, SessionError, with_session};
///
/// # async fn run() -> Result<(), SessionError> {
/// let (visits, cookie) = with_session(
///     InMemorySessionRepository::new(),
///     SessionConfig::development(),
///     None,
///     |store| {
///         Box::pin(async move {
///             let visits = store.get_as::<u64>("visits").unwrap_or(0) + 1;
///             store.set("visits", visits);
///             Ok::<_, SessionError>(visits)
///         })
///     },
/// )
/// .await?;
/// assert_eq!(visits, 1);
/// assert!(cookie.is_some());
/// # Ok(())
/// # }
/// ```
pub async fn with_session<R, T, E, F>(
    repository: R,
    config: SessionConfig,
    incoming_cookie: Option<&str>,
    f: F,
) -> Result<(T, Option<Cookie<'static>>), E>
where
    R: SessionRepository,
    E: From<SessionError>,
    F: for<'a> FnOnce(&'a mut SessionStore<R>) -> BoxFuture<'a, Result<T, E>>,
{
    let mut store = SessionStore::begin(repository, config, incoming_cookie).await?;
    let result = f(&mut store).await;
    let ended = store.end().await;

    match (result, ended) {
        (Ok(value), Ok(cookie)) => Ok((value, cookie)),
        (Err(e), Ok(_)) => Err(e),
        (Err(e), Err(end_err)) => {
            log::warn!(target: "inn_session", "msg=\"failed to end session after handler error\" error=\"{end_err}\"");
            Err(e)
        }
        (Ok(_), Err(e)) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use serde_json::json;

    use super::*;
    use crate::InMemorySessionRepository;

    #[tokio::test]
    async fn test_instance_is_lazy() {
        let mut ctx = SessionContext::new(InMemorySessionRepository::new(), None);
        assert!(!ctx.is_open());
        assert!(ctx.store().is_none());

        ctx.instance(SessionConfig::development()).await.unwrap();
        assert!(ctx.is_open());
        ctx.finish().await.unwrap();
    }

    #[tokio::test]
    async fn test_instance_returns_same_store_and_ignores_later_config() {
        let mut ctx = SessionContext::new(InMemorySessionRepository::new(), None);

        let first = ctx
            .instance(SessionConfig {
                id: Some("izisaurio".to_owned()),
                secure: false,
                ..Default::default()
            })
            .await
            .unwrap();
        first.set("name", "isaac");
        let first_ptr: *const SessionStore<_> = first;

        let second = ctx
            .instance(SessionConfig {
                id: Some("someoneelse".to_owned()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(ptr::eq(first_ptr, second));
        assert_eq!(second.id(), "izisaurio");
        assert_eq!(second["name"], "isaac");

        let cookie = ctx.finish().await.unwrap().unwrap();
        assert_eq!(cookie.value(), "izisaurio");
        assert_eq!(cookie.secure(), Some(false));
    }

    #[tokio::test]
    async fn test_from_cookie_header_resumes_session() {
        let repo = InMemorySessionRepository::new();
        let mut ctx = SessionContext::new(repo.clone(), None);
        ctx.instance(SessionConfig::development())
            .await
            .unwrap()
            .set("name", "isaac");
        let cookie = ctx.finish().await.unwrap().unwrap();

        let header = format!("theme=dark; INNSESSID={}; lang=es", cookie.value());
        let mut ctx = SessionContext::from_cookie_header(repo.clone(), Some(header.as_str()), "INNSESSID");
        let store = ctx.instance(SessionConfig::development()).await.unwrap();
        assert_eq!(store.id(), cookie.value());
        assert_eq!(store["name"], "isaac");
        assert!(ctx.finish().await.unwrap().is_none());

        let mut ctx = SessionContext::from_cookie_header(repo, None, "INNSESSID");
        let store = ctx.instance(SessionConfig::development()).await.unwrap();
        assert_ne!(store.id(), cookie.value());
        ctx.finish().await.unwrap();
    }

    #[tokio::test]
    async fn test_finish_without_instance() {
        let repo = InMemorySessionRepository::new();
        let ctx = SessionContext::new(repo.clone(), None);

        assert!(ctx.finish().await.unwrap().is_none());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_with_session_persists() {
        let repo = InMemorySessionRepository::new();

        let (id, cookie) = with_session(
            repo.clone(),
            SessionConfig::development(),
            None,
            |store| {
                Box::pin(async move {
                    store.set("name", "isaac");
                    Ok::<_, SessionError>(store.id().to_owned())
                })
            },
        )
        .await
        .unwrap();

        assert_eq!(cookie.unwrap().value(), id);
        let record = repo.load(&id).await.unwrap().unwrap();
        assert_eq!(record.data["name"], json!("isaac"));
    }

    #[derive(Debug, PartialEq)]
    enum HandlerError {
        Rejected,
        Session(SessionError),
    }

    impl From<SessionError> for HandlerError {
        fn from(err: SessionError) -> Self {
            HandlerError::Session(err)
        }
    }

    #[tokio::test]
    async fn test_with_session_ends_store_on_error() {
        let repo = InMemorySessionRepository::new();
        let config = SessionConfig {
            id: Some("failing".to_owned()),
            ..SessionConfig::development()
        };

        let result = with_session(repo.clone(), config, None, |store| {
            Box::pin(async move {
                store.set("attempt", 1);
                Err::<(), _>(HandlerError::Rejected)
            })
        })
        .await;

        assert_eq!(result.unwrap_err(), HandlerError::Rejected);
        let record = repo.load("failing").await.unwrap().unwrap();
        assert_eq!(record.data["attempt"], json!(1));
    }

    #[tokio::test]
    async fn test_with_session_begin_error_converts() {
        let config = SessionConfig {
            id: Some("not valid".to_owned()),
            ..SessionConfig::development()
        };

        let result = with_session(InMemorySessionRepository::new(), config, None, |_store| {
            Box::pin(async move { Ok::<_, HandlerError>(()) })
        })
        .await;

        assert_eq!(
            result.unwrap_err(),
            HandlerError::Session(SessionError::InvalidSessionId)
        );
    }
}
