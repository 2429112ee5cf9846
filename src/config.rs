//! Client configuration.
//!
//! `ClientConfig` controls where the client talks to and how requests are
//! issued. It provides sensible defaults via [`Default`] and a fluent
//! [`ClientConfig::builder()`] for customization with validation.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use hbdl::ClientConfig;
//! let cfg = ClientConfig::default();
//! assert_eq!(cfg.base_url.as_str(), "https://www.humblebundle.com/");
//! assert_eq!(cfg.second_factor_field, "code");
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use std::time::Duration;
//! use hbdl::ClientConfig;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = ClientConfig::builder()
//!     .base_url("http://127.0.0.1:8080")
//!     .timeout(Duration::from_secs(10))
//!     .second_factor_field("totp")
//!     .build()?; // returns Result<ClientConfig, ClientConfigError>
//! # Ok(()) }
//! ```
//!
//! # Fields (summary)
//! - `base_url`: Site root every endpoint path is joined onto.
//! - `user_agent`: UA string sent with every request.
//! - `timeout`: Per-request timeout. This is the only cancellation mechanism.
//! - `max_redirects`: Redirect hops followed before giving up (default: 10).
//! - `second_factor_field`: Form field carrying the authenticator code on login.
//!   Observed server versions disagree on its name; the default is `code`.

use std::fmt;
use std::time::Duration;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://www.humblebundle.com/";
const DEFAULT_USER_AGENT: &str = concat!("hbdl/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub user_agent: String,
    pub timeout: Duration,
    pub max_redirects: usize,
    pub second_factor_field: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            max_redirects: 10,
            second_factor_field: "code".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Resolves an endpoint path against `base_url`.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    inner: ClientConfig,
    base_url: Option<String>,
}

impl ClientConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut ClientConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.base_url = Some(url.into());
        self
    }
    pub fn user_agent<S: Into<String>>(self, ua: S) -> Self { self.map(|c| c.user_agent = ua.into()) }
    pub fn timeout(self, timeout: Duration) -> Self { self.map(|c| c.timeout = timeout) }
    pub fn max_redirects(self, n: usize) -> Self { self.map(|c| c.max_redirects = n) }
    pub fn second_factor_field<S: Into<String>>(self, name: S) -> Self { self.map(|c| c.second_factor_field = name.into()) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut ClientConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(mut self) -> Result<ClientConfig, ClientConfigError> {
        if let Some(raw) = self.base_url.take() {
            let mut url = Url::parse(&raw).map_err(|e| ClientConfigError::InvalidBaseUrl(format!("{raw}: {e}")))?;
            // Endpoint paths are joined relative to the base, which needs a trailing slash.
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            self.inner.base_url = url;
        }
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientConfigError {
    InvalidBaseUrl(String),
    UnsupportedScheme(String),
    ZeroTimeout,
    EmptySecondFactorField,
}

impl fmt::Display for ClientConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientConfigError::InvalidBaseUrl(u) =>
                write!(f, "base_url is not a valid url ({u})"),
            ClientConfigError::UnsupportedScheme(s) =>
                write!(f, "base_url scheme {s:?} is not supported (expected http or https)"),
            ClientConfigError::ZeroTimeout =>
                write!(f, "timeout must be greater than zero"),
            ClientConfigError::EmptySecondFactorField =>
                write!(f, "second_factor_field must not be empty"),
        }
    }
}
impl std::error::Error for ClientConfigError {}

fn validate(c: &ClientConfig) -> Result<(), ClientConfigError> {
    if !matches!(c.base_url.scheme(), "http" | "https") {
        return Err(ClientConfigError::UnsupportedScheme(c.base_url.scheme().to_string()));
    }
    if c.base_url.host_str().is_none() {
        return Err(ClientConfigError::InvalidBaseUrl(c.base_url.to_string()));
    }
    if c.timeout.is_zero() {
        return Err(ClientConfigError::ZeroTimeout);
    }
    if c.second_factor_field.trim().is_empty() {
        return Err(ClientConfigError::EmptySecondFactorField);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_appends_trailing_slash_to_base() {
        let cfg = ClientConfig::builder().base_url("http://127.0.0.1:9000/shop").build().unwrap();
        assert_eq!(cfg.base_url.as_str(), "http://127.0.0.1:9000/shop/");
        assert_eq!(cfg.endpoint("login").unwrap().as_str(), "http://127.0.0.1:9000/shop/login");
    }

    #[test]
    fn endpoint_joins_against_default_site() {
        let cfg = ClientConfig::default();
        assert_eq!(
            cfg.endpoint("processlogin").unwrap().as_str(),
            "https://www.humblebundle.com/processlogin"
        );
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            ClientConfig::builder().base_url("not a url").build(),
            Err(ClientConfigError::InvalidBaseUrl(_))
        ));
        assert_eq!(
            ClientConfig::builder().base_url("ftp://example.com").build().unwrap_err(),
            ClientConfigError::UnsupportedScheme("ftp".into())
        );
        assert_eq!(
            ClientConfig::builder().timeout(Duration::ZERO).build().unwrap_err(),
            ClientConfigError::ZeroTimeout
        );
        assert_eq!(
            ClientConfig::builder().second_factor_field(" ").build().unwrap_err(),
            ClientConfigError::EmptySecondFactorField
        );
    }
}
