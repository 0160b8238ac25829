//! Session cookie construction, parsing and signing.
//!
//! Signed values use HMAC-SHA256 in the form `{session_id}.{hex_signature}`.

use cookie::time::Duration as CookieDuration;
use cookie::{Cookie, SameSite as CookieSameSite};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::config::{SameSite, SigningKey};
use crate::crypto::constant_time_eq;

type HmacSha256 = Hmac<Sha256>;

/// Attributes applied to the outgoing session cookie.
///
/// Built from [`SessionConfig::cookie_params`](super::SessionConfig::cookie_params).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieParams {
    pub name: String,
    /// Seconds; `0` produces a cookie without `Max-Age`.
    pub lifetime: u64,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
}

fn cookie_same_site(same_site: SameSite) -> CookieSameSite {
    match same_site {
        SameSite::None => CookieSameSite::None,
        SameSite::Lax => CookieSameSite::Lax,
        SameSite::Strict => CookieSameSite::Strict,
    }
}

/// Builds the `Set-Cookie` cookie carrying `value`.
pub fn session_cookie(params: &CookieParams, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::build(params.name.clone(), value)
        .path(params.path.clone())
        .secure(params.secure)
        .http_only(params.http_only)
        .same_site(cookie_same_site(params.same_site))
        .finish();

    if params.lifetime > 0 {
        let secs = i64::try_from(params.lifetime).unwrap_or(i64::MAX);
        cookie.set_max_age(CookieDuration::seconds(secs));
    }

    if let Some(ref domain) = params.domain {
        cookie.set_domain(domain.clone());
    }

    cookie
}

/// Builds a cookie that makes the client drop the session cookie.
pub fn removal_cookie(params: &CookieParams) -> Cookie<'static> {
    let mut cookie = Cookie::build(params.name.clone(), String::new())
        .path(params.path.clone())
        .max_age(CookieDuration::ZERO)
        .finish();

    if let Some(ref domain) = params.domain {
        cookie.set_domain(domain.clone());
    }

    cookie
}

/// Extracts the value of cookie `name` from a request `Cookie` header.
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| Cookie::parse(pair.trim()).ok())
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_owned())
}

/// Signs a session ID with HMAC-SHA256.
pub fn sign_session_id(session_id: &str, key: &SigningKey) -> String {
    let signature = compute_hmac(session_id.as_bytes(), key.as_bytes());
    format!("{}.{}", session_id, hex::encode(signature))
}

/// Verifies a signed cookie value and extracts the session ID.
///
/// Returns `None` if the signature is missing or does not match.
pub fn verify_signed_cookie(cookie_value: &str, key: &SigningKey) -> Option<String> {
    let (session_id, signature_hex) = cookie_value.rsplit_once('.')?;

    let actual_sig = hex::decode(signature_hex).ok()?;
    let expected_sig = compute_hmac(session_id.as_bytes(), key.as_bytes());

    if constant_time_eq(&expected_sig, &actual_sig) {
        Some(session_id.to_owned())
    } else {
        log::warn!(target: "inn_session", "msg=\"session cookie tampered\" cookie_prefix=\"{}...\"", &cookie_value.chars().take(8).collect::<String>());
        None
    }
}

fn compute_hmac(message: &[u8], key: &[u8]) -> Vec<u8> {
    // HMAC-SHA256 accepts keys of any length.
    #[allow(clippy::expect_used)]
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}
