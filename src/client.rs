use std::path::Path;

use crate::auth::{self, Credentials, LoginOutcome};
use crate::config::ClientConfig;
use crate::csrf;
use crate::errors::ClientError;
use crate::library;
use crate::net::Transport;
use crate::order::{self, Order};
use crate::session::{persist, SessionStore};

/// One logical session against the site.
///
/// Owns its [`SessionStore`]; every operation that may touch cookies takes
/// `&mut self`, so operations on one client never overlap. Independent clients
/// share nothing.
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    transport: Transport,
    session: SessionStore,
}

impl Client {
    /// Creates a client with an empty session.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_session(config, SessionStore::new())
    }

    /// Creates a client around an existing session.
    pub fn with_session(config: ClientConfig, session: SessionStore) -> Result<Self, ClientError> {
        let transport = Transport::new(&config)?;
        Ok(Self {
            config,
            transport,
            session,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionStore {
        &mut self.session
    }

    pub fn into_session(self) -> SessionStore {
        self.session
    }

    /// Returns the anti-CSRF token, fetching it on first use.
    pub async fn csrf_token(&mut self) -> Result<String, ClientError> {
        csrf::acquire_token(&self.transport, &mut self.session).await
    }

    /// Runs one login attempt. Challenge outcomes are returned, not raised.
    pub async fn attempt_login(&mut self, credentials: &Credentials) -> Result<LoginOutcome, ClientError> {
        auth::attempt_login(
            &self.transport,
            &mut self.session,
            credentials,
            &self.config.second_factor_field,
        )
        .await
    }

    /// Writes the site's cookies to `path`, replacing any previous file atomically.
    pub fn save_session(&self, path: impl AsRef<Path>) -> Result<(), ClientError> {
        persist::save(&self.session, &self.config.base_url, path)
    }

    /// Merges the cookies saved at `path` into the session. Returns how many were installed.
    pub fn load_session(&mut self, path: impl AsRef<Path>) -> Result<usize, ClientError> {
        persist::load(&mut self.session, &self.config.base_url, path)
    }

    /// Gamekeys of every purchase on the account.
    pub async fn gamekeys(&mut self) -> Result<Vec<String>, ClientError> {
        library::gamekeys(&self.transport, &mut self.session).await
    }

    pub async fn order(&mut self, gamekey: &str) -> Result<Order, ClientError> {
        order::order(&self.transport, &mut self.session, gamekey).await
    }
}
