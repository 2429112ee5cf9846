//! Minimal HTTP response model.
//!
//! This struct represents a **fully buffered** HTTP response returned by the
//! network layer. It contains the final URL (after redirects), status code +
//! reason, response headers, and the raw body bytes.
//!
//! ## Notes
//! - `headers` is an `http::HeaderMap`, which is **case-insensitive** for
//!   header names.
//! - `status_text` is derived from the status code's canonical reason phrase
//!   and may be `"Unknown"` for non-standard codes.
//!
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use serde::de::DeserializeOwned;

use crate::errors::ClientError;

/// Simple structure for HTTP responses.
#[derive(Debug)]
pub struct Response {
    /// Final URL of the response (after redirects, if any).
    pub url: url::Url,

    /// Numeric HTTP status code (e.g., `200`, `404`).
    pub status: u16,

    /// Human-readable reason phrase (e.g., `"OK"`, `"Not Found"`).
    pub status_text: String,

    /// Response headers as a case-insensitive map.
    pub headers: HeaderMap,

    /// Raw response body bytes.
    pub body: Vec<u8>,
}

impl Response {
    /// Buffers a `reqwest` response.
    pub(crate) async fn read(res: reqwest::Response) -> Result<Self, ClientError> {
        let url = res.url().clone();
        let status = res.status().as_u16();
        let status_text = res.status().canonical_reason().unwrap_or("Unknown").to_string();
        let headers = res.headers().clone();

        // Note: does not deal with streaming
        let body = res.bytes().await?.to_vec();

        Ok(Response {
            url,
            status,
            status_text,
            headers,
            body,
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fails with a transport error unless the status is 2xx.
    pub fn error_for_status(self, context: &str) -> Result<Self, ClientError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::status(context, self.status, &self.status_text))
        }
    }

    /// Body decoded as lossy UTF-8.
    ///
    /// The site serves UTF-8; any other declared `charset` is logged and the
    /// body is still read as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        if let Some(charset) = self.charset() {
            if !charset.eq_ignore_ascii_case("utf-8") && !charset.eq_ignore_ascii_case("utf8") {
                log::debug!("decoding {charset} body from {} as utf-8", self.url);
            }
        }
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    fn charset(&self) -> Option<String> {
        let ct = self.headers.get(CONTENT_TYPE)?.to_str().ok()?;
        let idx = ct.to_ascii_lowercase().find("charset=")?;
        let after = &ct[idx + "charset=".len()..];
        let end = after.find([';', ' ', '\t']).unwrap_or(after.len());
        Some(after[..end].trim_matches('"').to_string())
    }
}
