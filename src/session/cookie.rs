//! Cookie record type.
//!
//! [`Cookie`] is both the unit handed to / returned from the
//! [`SessionStore`](crate::session::SessionStore) and the record written to the
//! session file. Its serde shape is the on-disk format:
//!
//! ```json
//! {
//!   "name": "_simpleauth_sess",
//!   "value": "eyJ1c2VyX2lkIjo...",
//!   "path": "/",
//!   "domain": ".humblebundle.com",
//!   "expires": "2026-11-17T10:00:00Z",
//!   "secure": true,
//!   "http_only": true,
//!   "same_site": "Lax"
//! }
//! ```
//!
//! Empty fields are elided on write and default on read.
//!
//! ## Domain convention
//! A domain with a leading dot (`.example.com`) denotes a *domain cookie*, sent to
//! the domain and every subdomain. A bare domain (`www.example.com`) denotes a
//! *host-only* cookie. A missing domain means "host-only for whatever URL the
//! cookie is installed against".

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;

/// A cookie with the attributes needed to reproduce its transmission behavior.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    #[serde(default)]
    pub name: String,

    /// Raw cookie value (not URL-decoded).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// See the module docs for the leading-dot convention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Absolute expiry; `None` for session cookies.
    #[serde(default, with = "expiry", skip_serializing_if = "Option::is_none")]
    pub expires: Option<OffsetDateTime>,

    /// `Expires` attribute exactly as the server sent it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_expires: Option<String>,

    /// `0` = unspecified, negative = delete now, positive = lifetime in seconds.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_age: i64,

    #[serde(default, skip_serializing_if = "is_false")]
    pub secure: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub http_only: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,

    /// Full `Set-Cookie` header line this cookie was parsed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,

    /// Attributes that were not understood.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unparsed: Vec<String>,
}

impl Cookie {
    /// A session cookie with only a name and a value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_expires(mut self, expires: OffsetDateTime) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// True when the cookie has an expiry at or before `now`.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires.is_some_and(|e| e <= now)
    }

    /// `name=value` pair as sent in a `Cookie` request header.
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// SameSite policy.
///
/// Serialized as a string. Integer codes (`1` = Default, `2` = Lax,
/// `3` = Strict, `4` = None) are accepted on read for older session files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SameSite {
    Default,
    Lax,
    Strict,
    None,
}

impl SameSite {
    /// Parses an attribute value, case-insensitively.
    pub fn parse(value: &str) -> Self {
        let v = value.trim();
        if v.eq_ignore_ascii_case("lax") {
            SameSite::Lax
        } else if v.eq_ignore_ascii_case("strict") {
            SameSite::Strict
        } else if v.eq_ignore_ascii_case("none") {
            SameSite::None
        } else {
            SameSite::Default
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Default => "Default",
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }
}

impl Serialize for SameSite {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SameSite {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(u8),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Name(name) => Ok(SameSite::parse(&name)),
            Repr::Code(2) => Ok(SameSite::Lax),
            Repr::Code(3) => Ok(SameSite::Strict),
            Repr::Code(4) => Ok(SameSite::None),
            Repr::Code(0..=1) => Ok(SameSite::Default),
            Repr::Code(n) => Err(serde::de::Error::custom(format!("unknown same_site code {n}"))),
        }
    }
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// RFC 3339 expiry timestamps. The zero time (year 1) reads as "no expiry".
mod expiry {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::format_description::well_known::Rfc3339;
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => {
                let s = dt.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(&s)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        let dt = OffsetDateTime::parse(&raw, &Rfc3339).map_err(serde::de::Error::custom)?;
        if dt.year() <= 1 {
            return Ok(None);
        }
        Ok(Some(dt))
    }
}
