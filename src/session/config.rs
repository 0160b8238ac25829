use std::fmt;

use serde::{Deserialize, Deserializer};

use super::cookie::CookieParams;
use crate::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    None,
    #[default]
    Lax,
    Strict,
}

/// HMAC key used to sign session cookies.
///
/// `Debug` output never shows the key.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(String);

impl SigningKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}

impl<'de> Deserialize<'de> for SigningKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SigningKey)
    }
}

/// Session cookie and storage settings.
///
/// Every field has a default, so both struct-update syntax and partial
/// JSON documents merge over [`SessionConfig::default`]:
///
/// ```rust
/// use inn_session::SessionConfig;
///
/// let config: SessionConfig = serde_json::from_str(r#"{"secure": false}"#).unwrap();
/// assert!(!config.secure);
/// assert_eq!(config.path, "/");
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie lifetime in seconds. `0` keeps the cookie until the client closes.
    pub lifetime: u64,
    pub path: String,
    /// Empty means the current host.
    pub domain: String,
    pub secure: bool,
    #[serde(alias = "httponly")]
    pub http_only: bool,
    /// Forces this identifier instead of reading or generating one.
    pub id: Option<String>,
    pub cookie_name: String,
    pub same_site: SameSite,
    /// Seconds of inactivity after which the stored record expires. `0` disables expiry.
    pub idle_timeout: u64,
    /// Replace cookie identifiers that have no stored record with a fresh one.
    pub strict_mode: bool,
    /// When set, cookie values are `{id}.{hmac}` and unsigned values are rejected.
    pub secret_key: Option<SigningKey>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime: 0,
            path: "/".to_owned(),
            domain: String::new(),
            secure: true,
            http_only: true,
            id: None,
            cookie_name: "INNSESSID".to_owned(),
            same_site: SameSite::Lax,
            idle_timeout: 1440,
            strict_mode: true,
            secret_key: None,
        }
    }
}

impl SessionConfig {
    /// Settings for plain-HTTP local development: the cookie is not marked `Secure`.
    pub fn development() -> Self {
        Self {
            secure: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.cookie_name.is_empty()
            || !self
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?={}".contains(c))
        {
            return Err(SessionError::ConfigurationError(format!(
                "cookie_name {:?} is not a valid cookie token",
                self.cookie_name
            )));
        }
        if self.same_site == SameSite::None && !self.secure {
            return Err(SessionError::ConfigurationError(
                "same_site=none requires secure cookies".to_owned(),
            ));
        }
        if let Some(key) = &self.secret_key
            && key.len() < 32
        {
            return Err(SessionError::ConfigurationError(
                "secret_key should be at least 32 bytes".to_owned(),
            ));
        }
        Ok(())
    }

    /// Removes the forced identifier so it never reaches the cookie attributes.
    pub fn take_id(&mut self) -> Option<String> {
        self.id.take()
    }

    pub fn cookie_params(&self) -> CookieParams {
        CookieParams {
            name: self.cookie_name.clone(),
            lifetime: self.lifetime,
            path: self.path.clone(),
            domain: (!self.domain.is_empty()).then(|| self.domain.clone()),
            secure: self.secure,
            http_only: self.http_only,
            same_site: self.same_site,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.lifetime, 0);
        assert_eq!(config.path, "/");
        assert_eq!(config.domain, "");
        assert!(config.secure);
        assert!(config.http_only);
        assert!(config.id.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document_merges_over_defaults() {
        let config: SessionConfig = serde_json::from_str(
            r#"{"id": "izisaurio", "secure": false, "httponly": false, "same_site": "strict"}"#,
        )
        .unwrap();

        assert_eq!(config.id.as_deref(), Some("izisaurio"));
        assert!(!config.secure);
        assert!(!config.http_only);
        assert_eq!(config.same_site, SameSite::Strict);
        assert_eq!(config.path, "/");
        assert_eq!(config.cookie_name, "INNSESSID");
    }

    #[test]
    fn test_take_id_strips_id_from_config() {
        let mut config = SessionConfig {
            id: Some("forced".to_owned()),
            ..Default::default()
        };
        assert_eq!(config.take_id(), Some("forced".to_owned()));
        assert!(config.id.is_none());
        assert_eq!(config.take_id(), None);
    }

    #[test]
    fn test_cookie_params_empty_domain_is_none() {
        let params = SessionConfig::default().cookie_params();
        assert!(params.domain.is_none());

        let params = SessionConfig {
            domain: "example.com".to_owned(),
            ..Default::default()
        }
        .cookie_params();
        assert_eq!(params.domain.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_validate_short_secret() {
        let config = SessionConfig {
            secret_key: Some(SigningKey::new("short")),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_cookie_name() {
        let config = SessionConfig {
            cookie_name: "bad name;".to_owned(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_same_site_none_requires_secure() {
        let config = SessionConfig {
            same_site: SameSite::None,
            ..SessionConfig::development()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_signing_key_debug_redacted() {
        let key = SigningKey::new("this-is-a-very-long-secret-key-for-testing");
        assert_eq!(format!("{key:?}"), "SigningKey([REDACTED])");
    }
}
