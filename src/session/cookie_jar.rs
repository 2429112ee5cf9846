//! In-memory cookie jar.
//!
//! The jar receives request/response metadata from the transport so it can
//! update and query cookies. It implements the subset of RFC 6265 a single-site
//! API client needs:
//!
//! - `Set-Cookie` parsing with `Path`, `Domain`, `Expires`, `Max-Age`, `Secure`,
//!   `HttpOnly` and `SameSite`. Anything else is kept verbatim in
//!   [`Cookie::unparsed`].
//! - Cookies are bucketed by **registrable domain** (public suffix + one label,
//!   via `psl`), so `www.example.com` and `api.example.com` share a bucket while
//!   `example.org` never sees them. IP hosts are their own bucket.
//! - `Domain` attributes that name a public suffix, or a domain the request host
//!   does not belong to, are rejected.
//! - Entries are keyed by `(name, domain, path)`; a later cookie with the same
//!   key replaces the earlier one in place. An expiry in the past or a
//!   non-positive `Max-Age` deletes the entry.
//!
//! The jar is **not** internally synchronized.
//!
//! See also: RFC 6265 (HTTP State Management Mechanism).

use std::collections::BTreeMap;

use http::HeaderMap;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};
use url::{Host, Url};

use crate::session::cookie::{Cookie, SameSite};

/// Stored form of a cookie: normalized domain/path, absolute expiry.
#[derive(Debug, Clone)]
struct Entry {
    cookie: Cookie,
    domain: String,
    path: String,
    host_only: bool,
}

impl Entry {
    fn same_key(&self, other: &Entry) -> bool {
        self.cookie.name == other.cookie.name && self.domain == other.domain && self.path == other.path
    }

    fn domain_matches(&self, host: &str) -> bool {
        if self.host_only {
            return host == self.domain;
        }
        host == self.domain || host.strip_suffix(self.domain.as_str()).is_some_and(|rest| rest.ends_with('.'))
    }

    fn path_matches(&self, request_path: &str) -> bool {
        if request_path == self.path {
            return true;
        }
        request_path.starts_with(self.path.as_str())
            && (self.path.ends_with('/') || request_path[self.path.len()..].starts_with('/'))
    }

    /// The cookie as handed back to callers: dotted domain for domain cookies.
    fn export(&self) -> Cookie {
        let mut c = self.cookie.clone();
        c.domain = Some(if self.host_only {
            self.domain.clone()
        } else {
            format!(".{}", self.domain)
        });
        c.path = Some(self.path.clone());
        c.max_age = 0;
        c
    }
}

/// Cookie jar for a single session.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    /// Key: registrable domain (or the literal host for IPs / single-label hosts).
    /// Value: entries in creation order.
    entries: BTreeMap<String, Vec<Entry>>,
}

impl CookieJar {
    /// Creates an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores cookies found in `Set-Cookie` response `headers` received from `url`.
    pub fn store_response_cookies(&mut self, url: &Url, headers: &HeaderMap) {
        let cookies: Vec<Cookie> = headers
            .get_all(http::header::SET_COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .filter_map(parse_set_cookie)
            .collect();

        if !cookies.is_empty() {
            log::trace!("storing {} cookie(s) from {}", cookies.len(), url);
            self.set_cookies(url, cookies);
        }
    }

    /// Merges `cookies` as if they had been received from `url`.
    ///
    /// A cookie's `domain` follows the convention in [`Cookie`]: a leading dot
    /// (or any domain other than the request host) is a `Domain` attribute, a
    /// domain equal to the request host or no domain at all makes it host-only.
    ///
    /// Returns how many cookies were stored; rejected, expired and deleting
    /// cookies are not counted.
    pub fn set_cookies(&mut self, url: &Url, cookies: impl IntoIterator<Item = Cookie>) -> usize {
        self.set_cookies_at(url, cookies, OffsetDateTime::now_utc())
    }

    pub(crate) fn set_cookies_at(
        &mut self,
        url: &Url,
        cookies: impl IntoIterator<Item = Cookie>,
        now: OffsetDateTime,
    ) -> usize {
        let Some((host, is_ip)) = request_host(url) else {
            return 0;
        };
        let bucket_key = partition_key(&host, is_ip);
        let mut stored = 0;

        for cookie in cookies {
            let Some((entry, alive)) = new_entry(url, &host, is_ip, cookie, now) else {
                continue;
            };

            let bucket = self.entries.entry(bucket_key.clone()).or_default();
            let existing = bucket.iter().position(|e| e.same_key(&entry));

            match (existing, alive) {
                (Some(i), true) => {
                    bucket[i] = entry;
                    stored += 1;
                }
                (Some(i), false) => {
                    bucket.remove(i);
                }
                (None, true) => {
                    bucket.push(entry);
                    stored += 1;
                }
                (None, false) => {}
            }
        }

        self.remove_expired(now);
        stored
    }

    /// Returns the cookies to send to `url`: longest path first, then creation order.
    pub fn cookies(&self, url: &Url) -> Vec<Cookie> {
        self.cookies_at(url, OffsetDateTime::now_utc())
    }

    pub(crate) fn cookies_at(&self, url: &Url, now: OffsetDateTime) -> Vec<Cookie> {
        let Some((host, is_ip)) = request_host(url) else {
            return Vec::new();
        };
        let Some(bucket) = self.entries.get(&partition_key(&host, is_ip)) else {
            return Vec::new();
        };
        let https = url.scheme() == "https";

        let mut matching: Vec<&Entry> = bucket
            .iter()
            .filter(|e| !e.cookie.is_expired_at(now))
            .filter(|e| e.domain_matches(&host))
            .filter(|e| e.path_matches(url.path()))
            .filter(|e| !e.cookie.secure || https)
            .collect();

        // Stable sort keeps creation order among equal path lengths.
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        matching.into_iter().map(Entry::export).collect()
    }

    /// Returns the `Cookie` request header value to send for `url`, if any.
    pub fn request_header(&self, url: &Url) -> Option<String> {
        let header = self
            .cookies(url)
            .iter()
            .map(Cookie::pair)
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            None
        } else {
            Some(header)
        }
    }

    /// Every live cookie sharing `host`'s registrable domain, regardless of
    /// path, host or scheme.
    pub fn cookies_for_registrable_domain(&self, host: &str) -> Vec<Cookie> {
        let now = OffsetDateTime::now_utc();

        self.entries
            .get(&host_partition_key(host))
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|e| !e.cookie.is_expired_at(now))
                    .map(Entry::export)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All live cookies in the jar, grouped by registrable domain.
    pub fn all_cookies(&self) -> Vec<Cookie> {
        let now = OffsetDateTime::now_utc();
        self.entries
            .values()
            .flatten()
            .filter(|e| !e.cookie.is_expired_at(now))
            .map(Entry::export)
            .collect()
    }

    /// Number of live cookies.
    pub fn len(&self) -> usize {
        self.all_cookies().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all cookies from the jar.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn remove_expired(&mut self, now: OffsetDateTime) {
        for bucket in self.entries.values_mut() {
            bucket.retain(|e| !e.cookie.is_expired_at(now));
        }
        self.entries.retain(|_, bucket| !bucket.is_empty());
    }
}

/// Normalizes `cookie` against the request it arrived on.
///
/// Returns `None` when the cookie must be ignored, otherwise the entry and
/// whether it is still alive (a dead entry deletes its key).
fn new_entry(url: &Url, host: &str, is_ip: bool, mut cookie: Cookie, now: OffsetDateTime) -> Option<(Entry, bool)> {
    if cookie.name.is_empty() {
        return None;
    }

    let (domain, host_only) = match cookie.domain.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        None => (host.to_string(), true),
        Some(raw) => {
            let dotted = raw.starts_with('.');
            let d = raw.trim_start_matches('.').to_ascii_lowercase();

            if d == host && (!dotted || is_ip) {
                (d, true)
            } else if is_ip {
                log::debug!("rejecting cookie {:?}: domain {raw:?} set from ip host {host}", cookie.name);
                return None;
            } else if is_public_suffix(&d) {
                if d != host {
                    log::debug!("rejecting cookie {:?}: domain {raw:?} is a public suffix", cookie.name);
                    return None;
                }
                (d, true)
            } else if host == d || host.ends_with(&format!(".{d}")) {
                (d, false)
            } else {
                log::debug!("rejecting cookie {:?}: domain {raw:?} does not match host {host}", cookie.name);
                return None;
            }
        }
    };

    let path = match cookie.path.as_deref() {
        Some(p) if p.starts_with('/') => p.to_string(),
        _ => default_path(url),
    };

    let alive = if cookie.max_age < 0 {
        false
    } else if cookie.max_age > 0 {
        let expires = now
            .checked_add(Duration::seconds(cookie.max_age))
            .unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc());
        cookie.expires = Some(expires);
        true
    } else {
        !cookie.is_expired_at(now)
    };

    cookie.max_age = 0;
    cookie.domain = Some(domain.clone());
    cookie.path = Some(path.clone());

    Some((
        Entry {
            cookie,
            domain,
            path,
            host_only,
        },
        alive,
    ))
}

/// Lower-cased host of `url` and whether it is an IP literal.
fn request_host(url: &Url) -> Option<(String, bool)> {
    match url.host()? {
        Host::Domain(d) => Some((d.trim_end_matches('.').to_ascii_lowercase(), false)),
        Host::Ipv4(ip) => Some((ip.to_string(), true)),
        Host::Ipv6(ip) => Some((ip.to_string(), true)),
    }
}

fn is_public_suffix(domain: &str) -> bool {
    psl::suffix_str(domain).is_some_and(|s| s.eq_ignore_ascii_case(domain))
}

/// Bucket key for a host: its registrable domain when there is one.
pub(crate) fn partition_key(host: &str, is_ip: bool) -> String {
    if is_ip {
        return host.to_string();
    }
    psl::domain_str(host).unwrap_or(host).to_ascii_lowercase()
}

/// [`partition_key`] for a bare host name as found in a URL or a cookie's
/// `domain`: leading dots and IPv6 brackets are ignored.
pub(crate) fn host_partition_key(host: &str) -> String {
    let host = host
        .trim_start_matches('.')
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase();
    let is_ip = host.parse::<std::net::IpAddr>().is_ok();
    partition_key(&host, is_ip)
}

/// RFC 6265 default-path: the request path up to, not including, its last `/`.
fn default_path(url: &Url) -> String {
    let path = url.path();
    if !path.starts_with('/') {
        return "/".to_string();
    }
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => path[..i].to_string(),
    }
}

/// Parses one `Set-Cookie` header line.
pub(crate) fn parse_set_cookie(line: &str) -> Option<Cookie> {
    let mut parts = line.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);

    let mut cookie = Cookie::new(name, value);
    cookie.raw = Some(line.to_string());

    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (key, val) = match part.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (part, ""),
        };

        match key.to_ascii_lowercase().as_str() {
            "path" => cookie.path = Some(val.to_string()),
            // A Domain attribute always makes a domain cookie, dot or not.
            "domain" if !val.is_empty() => cookie.domain = Some(format!(".{}", val.trim_start_matches('.'))),
            "expires" => {
                cookie.raw_expires = Some(val.to_string());
                cookie.expires = parse_cookie_date(val);
            }
            "max-age" => match val.parse::<i64>() {
                Ok(secs) if secs <= 0 => cookie.max_age = -1,
                Ok(secs) => cookie.max_age = secs,
                Err(_) => cookie.unparsed.push(part.to_string()),
            },
            "secure" => cookie.secure = true,
            "httponly" => cookie.http_only = true,
            "samesite" => cookie.same_site = Some(SameSite::parse(val)),
            _ => cookie.unparsed.push(part.to_string()),
        }
    }

    Some(cookie)
}

/// Parses an `Expires` attribute in RFC 1123 or Netscape (dashed) form.
fn parse_cookie_date(value: &str) -> Option<OffsetDateTime> {
    let rfc1123: &[BorrowedFormatItem<'_>] = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    let netscape: &[BorrowedFormatItem<'_>] = format_description!(
        "[weekday repr:short], [day]-[month repr:short]-[year] [hour]:[minute]:[second] GMT"
    );

    [rfc1123, netscape]
        .iter()
        .find_map(|fmt| PrimitiveDateTime::parse(value, *fmt).ok())
        .map(PrimitiveDateTime::assume_utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use time::macros::datetime;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn headers(lines: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for line in lines {
            map.append(http::header::SET_COOKIE, HeaderValue::from_str(line).unwrap());
        }
        map
    }

    fn names(cookies: &[Cookie]) -> Vec<&str> {
        cookies.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn parses_all_supported_attributes() {
        let c = parse_set_cookie(
            "sess=abc; Path=/account; Domain=.Example.com; Expires=Wed, 21 Oct 2037 07:28:00 GMT; \
             Max-Age=60; Secure; HttpOnly; SameSite=strict; Priority=High",
        )
        .unwrap();

        assert_eq!(c.name, "sess");
        assert_eq!(c.value, "abc");
        assert_eq!(c.path.as_deref(), Some("/account"));
        assert_eq!(c.domain.as_deref(), Some(".Example.com"));
        assert_eq!(c.expires, Some(datetime!(2037-10-21 07:28:00 UTC)));
        assert_eq!(c.raw_expires.as_deref(), Some("Wed, 21 Oct 2037 07:28:00 GMT"));
        assert_eq!(c.max_age, 60);
        assert!(c.secure && c.http_only);
        assert_eq!(c.same_site, Some(SameSite::Strict));
        assert_eq!(c.unparsed, vec!["Priority=High".to_string()]);
        assert!(c.raw.as_deref().unwrap().starts_with("sess=abc;"));
    }

    #[test]
    fn parses_netscape_dates_and_quoted_values() {
        let c = parse_set_cookie(r#"a="quoted"; expires=Thu, 01-Jan-2037 00:00:00 GMT"#).unwrap();
        assert_eq!(c.value, "quoted");
        assert_eq!(c.expires, Some(datetime!(2037-01-01 00:00 UTC)));
    }

    #[test]
    fn rejects_nameless_lines() {
        assert!(parse_set_cookie("=value").is_none());
        assert!(parse_set_cookie("no-equals-sign").is_none());
    }

    #[test]
    fn host_only_cookie_is_not_sent_to_subdomains() {
        let mut jar = CookieJar::new();
        jar.store_response_cookies(&url("https://www.example.com/login"), &headers(&["a=1; Path=/"]));

        assert_eq!(names(&jar.cookies(&url("https://www.example.com/"))), vec!["a"]);
        assert!(jar.cookies(&url("https://api.www.example.com/")).is_empty());
        assert!(jar.cookies(&url("https://example.com/")).is_empty());
    }

    #[test]
    fn domain_cookie_is_shared_across_subdomains() {
        let mut jar = CookieJar::new();
        jar.store_response_cookies(
            &url("https://www.example.com/"),
            &headers(&["a=1; Domain=example.com; Path=/"]),
        );

        assert_eq!(names(&jar.cookies(&url("https://example.com/"))), vec!["a"]);
        assert_eq!(names(&jar.cookies(&url("https://shop.example.com/x"))), vec!["a"]);
        assert!(jar.cookies(&url("https://example.org/")).is_empty());
        assert!(jar.cookies(&url("https://badexample.com/")).is_empty());
    }

    #[test]
    fn public_suffix_and_foreign_domains_are_rejected() {
        let mut jar = CookieJar::new();
        jar.store_response_cookies(
            &url("https://www.example.co.uk/"),
            &headers(&["a=1; Domain=co.uk", "b=2; Domain=other.co.uk", "c=3"]),
        );

        assert_eq!(names(&jar.all_cookies()), vec!["c"]);
    }

    #[test]
    fn replaces_by_name_domain_and_path() {
        let mut jar = CookieJar::new();
        let u = url("https://www.example.com/");
        jar.store_response_cookies(&u, &headers(&["a=1; Path=/", "b=1; Path=/"]));
        jar.store_response_cookies(&u, &headers(&["a=2; Path=/", "a=3; Path=/deep"]));

        let all = jar.all_cookies();
        assert_eq!(names(&all), vec!["a", "b", "a"]);
        assert_eq!(all[0].value, "2");
        assert_eq!(all[2].path.as_deref(), Some("/deep"));
    }

    #[test]
    fn max_age_zero_and_past_expiry_delete() {
        let mut jar = CookieJar::new();
        let u = url("https://www.example.com/");
        jar.store_response_cookies(&u, &headers(&["a=1; Path=/", "b=1; Path=/"]));
        jar.store_response_cookies(
            &u,
            &headers(&["a=; Path=/; Max-Age=0", "b=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT"]),
        );

        assert!(jar.is_empty());
    }

    #[test]
    fn max_age_becomes_absolute_expiry() {
        let mut jar = CookieJar::new();
        let now = datetime!(2030-01-01 00:00 UTC);
        let u = url("https://www.example.com/");
        let mut c = Cookie::new("a", "1");
        c.max_age = 3600;
        jar.set_cookies_at(&u, [c], now);

        let got = jar.cookies_at(&u, now);
        assert_eq!(got[0].expires, Some(datetime!(2030-01-01 01:00 UTC)));
        assert_eq!(got[0].max_age, 0);
        assert!(jar.cookies_at(&u, datetime!(2030-01-01 01:00 UTC)).is_empty());
    }

    #[test]
    fn huge_max_age_saturates_instead_of_overflowing() {
        let mut jar = CookieJar::new();
        let u = url("https://www.example.com/");
        jar.store_response_cookies(&u, &headers(&["a=1; Path=/; Max-Age=9223372036854775807"]));

        let got = jar.cookies(&u);
        assert_eq!(names(&got), vec!["a"]);
        assert_eq!(got[0].expires, Some(PrimitiveDateTime::MAX.assume_utc()));
    }

    #[test]
    fn set_cookies_counts_only_stored_cookies() {
        let mut jar = CookieJar::new();
        let u = url("https://www.example.com/");
        let mut gone = Cookie::new("gone", "1");
        gone.max_age = -1;

        let stored = jar.set_cookies(
            &u,
            [
                Cookie::new("a", "1").with_path("/"),
                Cookie::new("foreign", "1").with_domain(".other.org"),
                Cookie::new("old", "1").with_expires(datetime!(2001-01-01 00:00 UTC)),
                gone,
            ],
        );
        assert_eq!(stored, 1);
        assert_eq!(jar.set_cookies(&u, [Cookie::new("a", "2").with_path("/")]), 1);
        assert_eq!(jar.len(), 1);
    }

    #[test]
    fn host_partition_key_ignores_dots_and_brackets() {
        assert_eq!(host_partition_key(".WWW.Example.com"), "example.com");
        assert_eq!(host_partition_key("api.example.com."), "example.com");
        assert_eq!(host_partition_key("[::1]"), "::1");
        assert_eq!(host_partition_key("127.0.0.1"), "127.0.0.1");
    }

    #[test]
    fn path_matching_and_ordering() {
        let mut jar = CookieJar::new();
        let u = url("https://www.example.com/");
        jar.set_cookies(
            &u,
            [
                Cookie::new("root", "1").with_path("/"),
                Cookie::new("acct", "1").with_path("/account"),
                Cookie::new("acct_settings", "1").with_path("/account/settings"),
            ],
        );

        assert_eq!(
            names(&jar.cookies(&url("https://www.example.com/account/settings/x"))),
            vec!["acct_settings", "acct", "root"]
        );
        assert_eq!(names(&jar.cookies(&url("https://www.example.com/accounting"))), vec!["root"]);
    }

    #[test]
    fn default_path_comes_from_request() {
        let mut jar = CookieJar::new();
        jar.store_response_cookies(&url("https://www.example.com/home/purchases"), &headers(&["a=1"]));
        assert_eq!(jar.all_cookies()[0].path.as_deref(), Some("/home"));
    }

    #[test]
    fn secure_cookies_only_over_https() {
        let mut jar = CookieJar::new();
        jar.store_response_cookies(&url("https://www.example.com/"), &headers(&["s=1; Path=/; Secure", "p=1; Path=/"]));

        assert_eq!(jar.request_header(&url("https://www.example.com/")).as_deref(), Some("s=1; p=1"));
        assert_eq!(jar.request_header(&url("http://www.example.com/")).as_deref(), Some("p=1"));
    }

    #[test]
    fn ip_hosts_only_get_host_only_cookies() {
        let mut jar = CookieJar::new();
        jar.store_response_cookies(
            &url("http://127.0.0.1:8080/login"),
            &headers(&["a=1; Path=/", "b=2; Domain=0.0.1; Path=/", "c=3; Domain=127.0.0.1; Path=/"]),
        );

        assert_eq!(names(&jar.cookies(&url("http://127.0.0.1:9999/"))), vec!["a", "c"]);
    }

    #[test]
    fn exported_domain_marks_domain_cookies_with_a_dot() {
        let mut jar = CookieJar::new();
        jar.store_response_cookies(
            &url("https://www.example.com/"),
            &headers(&["host=1; Path=/", "dom=1; Domain=example.com; Path=/"]),
        );

        let all = jar.cookies_for_registrable_domain("www.example.com");
        assert_eq!(all[0].domain.as_deref(), Some("www.example.com"));
        assert_eq!(all[1].domain.as_deref(), Some(".example.com"));
    }
}
