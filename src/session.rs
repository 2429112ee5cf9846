//! Session state: [`SessionStore`], [`CookieJar`], [`Cookie`] and the session file codec.

mod cookie;
mod cookie_jar;
mod store;
pub mod persist;

pub use cookie::Cookie;
pub use cookie::SameSite;
pub use cookie_jar::CookieJar;
pub use store::SessionStore;
