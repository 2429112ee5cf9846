use http::HeaderMap;
use url::Url;

use crate::session::cookie::Cookie;
use crate::session::cookie_jar::CookieJar;

/// Authenticated HTTP session state: the cookie jar plus the cached CSRF token.
///
/// A store is a plain value. It does no I/O of its own; the transport feeds it
/// response cookies and reads request cookies from it, and the persistence codec
/// snapshots / restores it. Several stores can live side by side in one process.
///
/// Not internally synchronized: one logical session per store.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    jar: CookieJar,
    csrf_token: Option<String>,
}

impl SessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cookies applicable to `url`.
    pub fn cookies(&self, url: &Url) -> Vec<Cookie> {
        self.jar.cookies(url)
    }

    /// Merges `cookies` as if received from `url`. Returns how many were stored.
    pub fn set_cookies(&mut self, url: &Url, cookies: impl IntoIterator<Item = Cookie>) -> usize {
        self.jar.set_cookies(url, cookies)
    }

    pub fn store_response_cookies(&mut self, url: &Url, headers: &HeaderMap) {
        self.jar.store_response_cookies(url, headers);
    }

    pub fn request_header(&self, url: &Url) -> Option<String> {
        self.jar.request_header(url)
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    /// Caches the CSRF token. The first token wins; later calls are ignored
    /// until [`reset`](Self::reset).
    pub fn set_csrf_token(&mut self, token: impl Into<String>) {
        if self.csrf_token.is_none() {
            self.csrf_token = Some(token.into());
        }
    }

    /// Drops all cookies and the cached token.
    pub fn reset(&mut self) {
        self.jar.clear();
        self.csrf_token = None;
    }

    /// Number of live cookies.
    pub fn len(&self) -> usize {
        self.jar.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jar.is_empty()
    }
}
