use std::collections::BTreeMap;
use std::fmt;

/// Result of one login attempt. Exactly one variant per attempt.
///
/// The challenge variants are expected protocol states, not failures: the
/// caller obtains the requested code and calls again with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The session cookies are in the store.
    Success,
    /// A guard code was emailed; call again with it.
    GuardRequired,
    /// The supplied guard code was rejected; ask for it again.
    GuardInvalid,
    /// An authenticator code is needed. `kind` is the server's hint (e.g. `google`).
    TwoFactorRequired { kind: Option<String> },
    /// The supplied authenticator code was rejected.
    TwoFactorInvalid { kind: Option<String> },
    /// Validation errors per form field category, e.g. a bad username/password.
    FieldErrors(FieldErrors),
    /// Rejected without any detail.
    LoginFailed,
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoginOutcome::Success)
    }

    /// True when another attempt with an additional code can succeed.
    pub fn is_challenge(&self) -> bool {
        matches!(
            self,
            LoginOutcome::GuardRequired
                | LoginOutcome::GuardInvalid
                | LoginOutcome::TwoFactorRequired { .. }
                | LoginOutcome::TwoFactorInvalid { .. }
        )
    }

    /// Converts every non-success outcome into a [`LoginError`].
    pub fn into_result(self) -> Result<(), LoginError> {
        match self {
            LoginOutcome::Success => Ok(()),
            LoginOutcome::GuardRequired => Err(LoginError::GuardRequired),
            LoginOutcome::GuardInvalid => Err(LoginError::GuardInvalid),
            LoginOutcome::TwoFactorRequired { .. } => Err(LoginError::TwoFactorRequired),
            LoginOutcome::TwoFactorInvalid { .. } => Err(LoginError::TwoFactorInvalid),
            LoginOutcome::FieldErrors(errors) => Err(LoginError::FieldErrors(errors)),
            LoginOutcome::LoginFailed => Err(LoginError::LoginFailed),
        }
    }
}

/// [`LoginOutcome`] failures for callers that prefer `?`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("guard required: enter the code sent to your email address to verify your account")]
    GuardRequired,
    #[error("guard invalid: the provided code is invalid")]
    GuardInvalid,
    #[error("code required: enter the code from your two-factor authenticator to verify your account")]
    TwoFactorRequired,
    #[error("code invalid: the provided two-factor code is invalid")]
    TwoFactorInvalid,
    #[error("{0}")]
    FieldErrors(FieldErrors),
    #[error("login failed")]
    LoginFailed,
}

/// Server-side validation messages keyed by field category.
///
/// Categories are kept sorted so rendering is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new(errors: impl IntoIterator<Item = (String, Vec<String>)>) -> Self {
        Self(errors.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.0.get(category).map(Vec::as_slice)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<BTreeMap<String, Vec<String>>> for FieldErrors {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Self(map)
    }
}

/// One `category: message` line per single-message category; multi-message
/// categories list their messages indented below the category.
impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (category, messages) in self.0.iter().filter(|(_, m)| !m.is_empty()) {
            if !first {
                writeln!(f)?;
            }
            first = false;

            match messages.as_slice() {
                [single] => write!(f, "{category}: {single}")?,
                many => {
                    write!(f, "{category}:")?;
                    for m in many {
                        write!(f, "\n  {m}")?;
                    }
                }
            }
        }
        Ok(())
    }
}
