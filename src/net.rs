//! Network layer: a cookie-aware [`Transport`] over `reqwest` and the buffered [`Response`].

mod response;
mod transport;

pub use response::Response;
pub use transport::Transport;
