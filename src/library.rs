//! Purchase list.
//!
//! The purchases page embeds the user's library as JSON in
//! `<script id="user-home-json-data">`; only its `gamekeys` array is read.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::errors::ClientError;
use crate::net::Transport;
use crate::session::SessionStore;

pub const PURCHASES_PATH: &str = "home/purchases";

#[derive(Debug, Deserialize)]
struct HomeData {
    #[serde(default)]
    gamekeys: Vec<String>,
}

static HOME_DATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script\b[^>]*?\sid\s*=\s*["']?user-home-json-data["']?[^>]*>(.*?)</script\s*>"#)
        .expect("home data pattern is a valid regex")
});

/// Fetches the gamekey of every purchase, in page order.
pub async fn gamekeys(transport: &Transport, store: &mut SessionStore) -> Result<Vec<String>, ClientError> {
    let url = transport.endpoint(PURCHASES_PATH)?;
    let res = transport.get(store, url).await?.error_for_status("gamekeys")?;
    let keys = parse_gamekeys(&res.text())?;
    log::debug!("found {} gamekeys", keys.len());
    Ok(keys)
}

fn parse_gamekeys(html: &str) -> Result<Vec<String>, ClientError> {
    let script = HOME_DATA
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or(ClientError::DataNotFound("home json data"))?;

    let data: HomeData = serde_json::from_str(script.as_str().trim())?;
    Ok(data.gamekeys)
}
