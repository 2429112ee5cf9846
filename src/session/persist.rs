//! JSON-backed session file.
//!
//! The session file is a JSON array of [`Cookie`] records holding every cookie
//! of the site's registrable domain. Loading it into a fresh
//! [`SessionStore`] reproduces the authenticated session without running the
//! login handshake again, as long as the cookies have not expired.
//!
//! ### I/O characteristics
//! - `save` writes to a temporary file in the destination directory and renames
//!   it over the target, so a failed write leaves the previous file untouched.
//! - `load` reads the whole file; records are installed through
//!   [`SessionStore::set_cookies`], so expired records are dropped and domain
//!   validation applies exactly as for live responses. Records outside the
//!   site's registrable domain are skipped.
//!
//! ### Example
//! ```ignore
//! let site = Url::parse("https://www.humblebundle.com/")?;
//! persist::save(&store, &site, "cookies.json")?;
//!
//! let mut restored = SessionStore::new();
//! persist::load(&mut restored, &site, "cookies.json")?;
//! ```

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use url::Url;

use crate::errors::ClientError;
use crate::session::cookie::Cookie;
use crate::session::cookie_jar::host_partition_key;
use crate::session::SessionStore;

/// Writes every cookie of `site`'s registrable domain to `path`.
pub fn save(store: &SessionStore, site: &Url, path: impl AsRef<Path>) -> Result<(), ClientError> {
    let path = path.as_ref();
    let host = site.host_str().unwrap_or_default();
    let cookies = store.jar().cookies_for_registrable_domain(host);

    let contents = serde_json::to_vec_pretty(&cookies)?;
    write_atomic(path, &contents)?;

    log::info!("saved {} cookie(s) to {}", cookies.len(), path.display());
    Ok(())
}

/// Reads a session file written by [`save`] and installs its cookies into `store`.
///
/// Returns the number of cookies installed.
pub fn load(store: &mut SessionStore, site: &Url, path: impl AsRef<Path>) -> Result<usize, ClientError> {
    let path = path.as_ref();
    let contents = fs::read(path)?;
    let cookies: Vec<Cookie> = serde_json::from_slice(&contents)?;
    let site_key = host_partition_key(site.host_str().unwrap_or_default());
    let read = cookies.len();
    let mut installed = 0;

    for cookie in cookies {
        let origin = record_origin(&cookie, site)?;
        if host_partition_key(origin.host_str().unwrap_or_default()) != site_key {
            log::debug!("skipping cookie {:?}: domain {:?} is not part of {site_key}", cookie.name, cookie.domain);
            continue;
        }
        installed += store.set_cookies(&origin, [cookie]);
    }

    log::info!("loaded {installed} of {read} cookie(s) from {}", path.display());
    Ok(installed)
}

/// The URL a record is re-installed against: its own domain when it has one,
/// otherwise the site.
fn record_origin(cookie: &Cookie, site: &Url) -> Result<Url, ClientError> {
    let Some(domain) = cookie.domain.as_deref().map(|d| d.trim_start_matches('.')).filter(|d| !d.is_empty()) else {
        return Ok(site.clone());
    };

    let mut origin = site.clone();
    origin.set_host(Some(domain))?;
    origin.set_path(cookie.path.as_deref().unwrap_or("/"));
    Ok(origin)
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ClientError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| ClientError::Io(e.error))?;
    Ok(())
}
