//! Anti-CSRF token acquisition.
//!
//! The login endpoint wants the value of the `csrf_cookie` cookie echoed back in
//! a request header. The cookie is handed out by the login page, so the first
//! acquisition visits that page; afterwards the token cached in the
//! [`SessionStore`] is reused.

use crate::errors::ClientError;
use crate::net::Transport;
use crate::session::SessionStore;

/// Page visited to obtain the `csrf_cookie`.
pub const BOOTSTRAP_PATH: &str = "login";

/// Name of the cookie carrying the token.
pub const CSRF_COOKIE: &str = "csrf_cookie";

/// Returns the store's CSRF token, fetching the bootstrap page on first use.
pub async fn acquire_token(transport: &Transport, store: &mut SessionStore) -> Result<String, ClientError> {
    if let Some(token) = store.csrf_token() {
        return Ok(token.to_string());
    }

    let url = transport.endpoint(BOOTSTRAP_PATH)?;
    transport.get(store, url).await?.error_for_status("csrf")?;

    let token = store
        .cookies(transport.base_url())
        .into_iter()
        .find(|c| c.name == CSRF_COOKIE)
        .map(|c| c.value)
        .ok_or(ClientError::NoCsrfCookie)?;

    log::debug!("acquired csrf token");
    store.set_csrf_token(token.clone());
    Ok(token)
}
