pub mod auth;
pub mod client;
pub mod config;
pub mod csrf;
pub mod errors;
pub mod library;
pub mod net;
pub mod order;
pub mod session;

pub use auth::{ChallengeAnswer, Credentials, FieldErrors, LoginError, LoginOutcome};
pub use client::Client;
pub use config::{ClientConfig, ClientConfigError};
pub use errors::ClientError;
pub use order::Order;
pub use session::{Cookie, SameSite, SessionStore};
