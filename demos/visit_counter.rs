#![allow(clippy::print_stdout, clippy::unwrap_used, clippy::expect_used)]

//! Visit Counter Example
//!
//! Counts visits per browser using a cookie-keyed session stored on disk.
//!
//! Run with: `cargo run --example visit_counter --features actix`
//!
//!   curl -c cookies.txt -b cookies.txt http://localhost:8080/
//!   curl -c cookies.txt -b cookies.txt -X POST http://localhost:8080/reset

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use inn_session::api::actix::{close_session, open_session};
use inn_session::{FileSessionRepository, SessionConfig, SessionError, SigningKey};

async fn count(
    req: HttpRequest,
    repo: web::Data<FileSessionRepository>,
    config: web::Data<SessionConfig>,
) -> Result<HttpResponse, SessionError> {
    let mut store = open_session(&req, repo.get_ref().clone(), config.get_ref().clone()).await?;

    let visits = store.get_as::<u64>("visits").unwrap_or(0) + 1;
    store.set("visits", visits);

    let mut response = HttpResponse::Ok().body(format!("visit #{visits}\n"));
    close_session(store, &mut response).await?;
    Ok(response)
}

async fn reset(
    req: HttpRequest,
    repo: web::Data<FileSessionRepository>,
    config: web::Data<SessionConfig>,
) -> Result<HttpResponse, SessionError> {
    let mut store = open_session(&req, repo.get_ref().clone(), config.get_ref().clone()).await?;
    store.destroy().await?;

    let mut response = HttpResponse::Ok().body("session destroyed\n");
    close_session(store, &mut response).await?;
    Ok(response)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // In production, load secret from environment variable
    let secret = std::env::var("SESSION_SECRET")
        .unwrap_or_else(|_| "your-super-secret-key-at-least-32-bytes!".to_owned());

    let config = SessionConfig {
        lifetime: 3600,
        secret_key: Some(SigningKey::new(secret)),
        // Set to true in production with HTTPS
        ..SessionConfig::development()
    };
    config.validate().expect("valid session config");

    let dir = std::env::temp_dir().join("inn_session_demo");
    let repo = FileSessionRepository::new(&dir).expect("session directory");

    println!("Storing sessions in {}", dir.display());
    println!("Starting visit counter on http://localhost:8080");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(repo.clone()))
            .app_data(web::Data::new(config.clone()))
            .route("/", web::get().to(count))
            .route("/reset", web::post().to(reset))
    })
    .bind("127.0.0.1:8080")?
    .run()
    .await
}
