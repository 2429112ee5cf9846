use url::Url;

/// Errors surfaced by the client.
///
/// Login challenges (guard / two-factor) are not errors; they are reported as
/// [`LoginOutcome`](crate::auth::LoginOutcome) variants.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Non-2xx status or connection-level failure.
    #[error("transport failure{}: {detail}", status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Transport { status: Option<u16>, detail: String },

    #[error("site response changed: csrf_cookie not found")]
    NoCsrfCookie,

    #[error("site response changed: {0} not found")]
    DataNotFound(&'static str),

    #[error("too many redirects (last location: {0})")]
    TooManyRedirects(Url),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Builds a transport failure for a response that came back with a non-2xx status.
    pub(crate) fn status(context: &str, status: u16, status_text: &str) -> Self {
        ClientError::Transport {
            status: Some(status),
            detail: format!("{context}: status {status} {status_text}"),
        }
    }

    /// True for errors meaning the site no longer answers in the expected shape.
    pub fn is_protocol_shape(&self) -> bool {
        matches!(self, ClientError::NoCsrfCookie | ClientError::DataNotFound(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport {
            status: e.status().map(|s| s.as_u16()),
            detail: e.to_string(),
        }
    }
}
