//! actix-web helpers for opening and closing sessions.
//!
//! ```rust,ignore
//! use inn_session::api::actix::{close_session, open_session};
//!
//! async fn handler(
//!     req: HttpRequest,
//!     repo: web::Data<InMemorySessionRepository>,
//!     config: web::Data<SessionConfig>,
//! ) -> Result<HttpResponse, SessionError> {
//!     let mut store = open_session(&req, repo.get_ref().clone(), config.get_ref().clone()).await?;
//!     store.set("seen", true);
//!
//!     let mut response = HttpResponse::Ok().finish();
//!     close_session(store, &mut response).await?;
//!     Ok(response)
//! }
//! ```

mod session;

pub use session::{close_session, open_session, session_context};
