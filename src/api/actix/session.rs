use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};

use crate::api::ErrorResponse;
use crate::{SessionConfig, SessionContext, SessionError, SessionRepository, SessionStore};

impl ResponseError for SessionError {
    fn status_code(&self) -> StatusCode {
        match self {
            SessionError::InvalidSessionId => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::from(self))
    }
}

fn request_cookie(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    req.cookie(cookie_name).map(|c| c.value().to_owned())
}

/// Starts the session for `req`, reading the identifier from its session cookie.
pub async fn open_session<R>(
    req: &HttpRequest,
    repository: R,
    config: SessionConfig,
) -> Result<SessionStore<R>, SessionError>
where
    R: SessionRepository,
{
    let incoming = request_cookie(req, &config.cookie_name);
    SessionStore::begin(repository, config, incoming.as_deref()).await
}

/// Builds a lazily-opened [`SessionContext`] for `req`.
pub fn session_context<R>(req: &HttpRequest, repository: R, cookie_name: &str) -> SessionContext<R>
where
    R: SessionRepository + Clone,
{
    SessionContext::new(repository, request_cookie(req, cookie_name))
}

/// Ends the session and adds its cookie, if any, to `response`.
pub async fn close_session<R>(
    store: SessionStore<R>,
    response: &mut HttpResponse,
) -> Result<(), SessionError>
where
    R: SessionRepository,
{
    if let Some(cookie) = store.end().await? {
        response.add_cookie(&cookie).map_err(|e| {
            SessionError::ConfigurationError(format!("Failed to set session cookie: {e}"))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            SessionError::InvalidSessionId.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SessionError::StorageError("down".to_owned()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_session_context_reads_cookie() {
        use actix_web::cookie::Cookie;
        use actix_web::test::TestRequest;

        use crate::InMemorySessionRepository;

        let req = TestRequest::default()
            .cookie(Cookie::new("INNSESSID", "abc123"))
            .to_http_request();

        assert_eq!(request_cookie(&req, "INNSESSID"), Some("abc123".to_owned()));
        assert_eq!(request_cookie(&req, "other"), None);

        let ctx = session_context(&req, InMemorySessionRepository::new(), "INNSESSID");
        assert!(!ctx.is_open());
    }
}
