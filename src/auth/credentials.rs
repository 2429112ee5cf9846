use std::fmt;

/// The one extra code a login attempt may carry.
#[derive(Clone, PartialEq, Eq)]
pub enum ChallengeAnswer {
    /// Code from the guard email.
    Guard(String),
    /// Code from an authenticator app.
    SecondFactor(String),
}

/// Input for one login attempt. Never persisted.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub answer: Option<ChallengeAnswer>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            answer: None,
        }
    }

    pub fn with_guard(mut self, code: impl Into<String>) -> Self {
        self.answer = Some(ChallengeAnswer::Guard(code.into()));
        self
    }

    pub fn with_second_factor(mut self, code: impl Into<String>) -> Self {
        self.answer = Some(ChallengeAnswer::SecondFactor(code.into()));
        self
    }

    /// Guard code to submit; empty when none was given.
    pub fn guard_code(&self) -> &str {
        match &self.answer {
            Some(ChallengeAnswer::Guard(code)) => code.trim(),
            _ => "",
        }
    }

    /// Authenticator code to submit; empty when none was given.
    pub fn second_factor_code(&self) -> &str {
        match &self.answer {
            Some(ChallengeAnswer::SecondFactor(code)) => code.trim(),
            _ => "",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let answer = match &self.answer {
            None => "none",
            Some(ChallengeAnswer::Guard(_)) => "guard(***)",
            Some(ChallengeAnswer::SecondFactor(_)) => "second_factor(***)",
        };
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("answer", &answer)
            .finish()
    }
}
