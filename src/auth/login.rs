//! The login handshake.
//!
//! One call walks `Idle → CsrfPending → AwaitingServerDecision` and ends in a
//! single [`LoginOutcome`]. Nothing is resumable and nothing is retried: a
//! challenge outcome means "call again with the code".
//!
//! Non-2xx answers carry a JSON body whose shape drifted across server
//! versions. It is decoded best-effort into [`LoginErrorBody`] and classified
//! with a fixed precedence: guard, then two-factor, then field errors, then the
//! `success` flag. A body that matches none of them is reported as a transport
//! failure with the raw status.

use std::collections::BTreeMap;
use std::fmt;

use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;

use crate::auth::credentials::Credentials;
use crate::auth::outcome::{FieldErrors, LoginOutcome};
use crate::csrf;
use crate::errors::ClientError;
use crate::net::Transport;
use crate::session::SessionStore;

pub const LOGIN_PATH: &str = "processlogin";

/// Header carrying the CSRF token on the login POST.
pub const CSRF_HEADER: &str = "CSRF-Prevention-Token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginState {
    Idle,
    CsrfPending,
    AwaitingServerDecision,
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoginState::Idle => "idle",
            LoginState::CsrfPending => "csrf-pending",
            LoginState::AwaitingServerDecision => "awaiting-server-decision",
        };
        f.write_str(name)
    }
}

/// Error body of a rejected login. Every field is optional.
#[derive(Debug, Default, Deserialize)]
struct LoginErrorBody {
    #[serde(default)]
    humble_guard_required: Option<bool>,
    #[serde(default)]
    two_factor_required: Option<bool>,
    #[serde(default)]
    twofactor_type: Option<String>,
    #[serde(default)]
    errors: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    success: Option<bool>,
}

/// Runs one login attempt against `store`.
///
/// `second_factor_field` names the form field the authenticator code is sent in.
pub async fn attempt_login(
    transport: &Transport,
    store: &mut SessionStore,
    credentials: &Credentials,
    second_factor_field: &str,
) -> Result<LoginOutcome, ClientError> {
    let mut state = LoginState::Idle;
    log::debug!("login: {state}");

    state = LoginState::CsrfPending;
    log::debug!("login: {state}");
    let token = csrf::acquire_token(transport, store).await?;

    let form = [
        ("username", credentials.username.as_str()),
        ("password", credentials.password.as_str()),
        ("guard", credentials.guard_code()),
        (second_factor_field, credentials.second_factor_code()),
        ("access_token", ""),
        ("access_token_provider_id", ""),
        ("goto", "/"),
        ("qs", ""),
    ];

    let mut headers = HeaderMap::new();
    let token = HeaderValue::from_str(&token).map_err(|e| ClientError::Transport {
        status: None,
        detail: format!("csrf token is not a valid header value: {e}"),
    })?;
    headers.insert(HeaderName::from_static("csrf-prevention-token"), token);

    state = LoginState::AwaitingServerDecision;
    log::debug!("login: {state}");
    let url = transport.endpoint(LOGIN_PATH)?;
    let res = transport.post_form(store, url, headers, &form).await?;

    let outcome = if res.is_success() {
        LoginOutcome::Success
    } else {
        classify_rejection(res.status, &res.status_text, &res.body, credentials)?
    };

    log::info!("login: {}", describe(&outcome));
    Ok(outcome)
}

/// Maps a non-2xx login answer to an outcome.
fn classify_rejection(
    status: u16,
    status_text: &str,
    body: &[u8],
    credentials: &Credentials,
) -> Result<LoginOutcome, ClientError> {
    let drift = || ClientError::status("login", status, status_text);

    let data: LoginErrorBody = match serde_json::from_slice(body) {
        Ok(data) => data,
        Err(e) => {
            log::warn!("login: undecodable {status} response: {e}");
            return Err(drift());
        }
    };

    if data.humble_guard_required == Some(true) {
        return Ok(if credentials.guard_code().is_empty() {
            LoginOutcome::GuardRequired
        } else {
            LoginOutcome::GuardInvalid
        });
    }

    if data.two_factor_required == Some(true) {
        let kind = data.twofactor_type;
        return Ok(if credentials.second_factor_code().is_empty() {
            LoginOutcome::TwoFactorRequired { kind }
        } else {
            LoginOutcome::TwoFactorInvalid { kind }
        });
    }

    if let Some(errors) = data.errors.map(FieldErrors::from).filter(|e| !e.is_empty()) {
        return Ok(LoginOutcome::FieldErrors(errors));
    }

    if data.success == Some(false) {
        return Ok(LoginOutcome::LoginFailed);
    }

    log::warn!("login: {status} response without a recognized flag");
    Err(drift())
}

fn describe(outcome: &LoginOutcome) -> &'static str {
    match outcome {
        LoginOutcome::Success => "success",
        LoginOutcome::GuardRequired => "guard required",
        LoginOutcome::GuardInvalid => "guard invalid",
        LoginOutcome::TwoFactorRequired { .. } => "two-factor required",
        LoginOutcome::TwoFactorInvalid { .. } => "two-factor invalid",
        LoginOutcome::FieldErrors(_) => "field errors",
        LoginOutcome::LoginFailed => "failed",
    }
}
