//! Authentication: credentials in, [`LoginOutcome`] out.

mod credentials;
mod login;
mod outcome;

pub use credentials::{ChallengeAnswer, Credentials};
pub use login::{attempt_login, CSRF_HEADER, LOGIN_PATH};
pub use outcome::{FieldErrors, LoginError, LoginOutcome};
