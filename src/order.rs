//! Order detail.
//!
//! [`Order`] models the part of the order document that is stable enough to
//! type. Unknown fields are ignored, loosely-typed ones are kept as
//! [`serde_json::Value`], and `null` reads as the field's default.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::errors::ClientError;
use crate::net::Transport;
use crate::session::SessionStore;

pub const ORDER_PATH: &str = "api/v1/order/";

/// Fetches the order identified by `gamekey`.
pub async fn order(transport: &Transport, store: &mut SessionStore, gamekey: &str) -> Result<Order, ClientError> {
    let url = order_url(transport, gamekey)?;
    let res = transport.get(store, url).await?.error_for_status("order")?;
    let order: Order = res.json()?;
    log::debug!("order {gamekey}: {} subproducts", order.subproducts.len());
    Ok(order)
}

fn order_url(transport: &Transport, gamekey: &str) -> Result<url::Url, ClientError> {
    let mut url = transport.endpoint(ORDER_PATH)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .push(gamekey);
    url.query_pairs_mut()
        .append_pair("all_tpkds", "true")
        .append_pair("wallet_data", "true");
    Ok(url)
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    #[serde(deserialize_with = "nullable")]
    pub gamekey: String,
    #[serde(deserialize_with = "nullable")]
    pub uid: String,
    #[serde(deserialize_with = "nullable")]
    pub product: Product,
    #[serde(deserialize_with = "nullable")]
    pub subproducts: Vec<Subproduct>,
    #[serde(deserialize_with = "nullable")]
    pub tpkd_dict: TpkdDict,
    #[serde(deserialize_with = "nullable")]
    pub amount_spent: f64,
    #[serde(deserialize_with = "nullable")]
    pub total: f64,
    #[serde(deserialize_with = "nullable")]
    pub currency: String,
    /// Creation time as sent by the server (no zone designator).
    #[serde(deserialize_with = "nullable")]
    pub created: String,
    #[serde(deserialize_with = "nullable")]
    pub claimed: bool,
    #[serde(deserialize_with = "nullable")]
    pub is_giftee: bool,
    #[serde(deserialize_with = "nullable")]
    pub has_wallet: bool,
    pub wallet_credit: Option<WalletCredit>,
    #[serde(deserialize_with = "nullable")]
    pub total_choices: i64,
    #[serde(deserialize_with = "nullable")]
    pub choices_remaining: i64,
    #[serde(deserialize_with = "nullable")]
    pub path_ids: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub all_coupon_data: Vec<Value>,
    pub missed_credit: Value,
}

impl Order {
    /// Every file download across all subproducts.
    pub fn downloads(&self) -> impl Iterator<Item = &Download> {
        self.subproducts
            .iter()
            .flat_map(|s| &s.downloads)
            .flat_map(|p| &p.download_struct)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    /// `bundle`, `storefront`, ...
    #[serde(deserialize_with = "nullable")]
    pub category: String,
    #[serde(deserialize_with = "nullable")]
    pub machine_name: String,
    #[serde(deserialize_with = "nullable")]
    pub human_name: String,
    #[serde(deserialize_with = "nullable")]
    pub post_purchase_text: String,
    #[serde(deserialize_with = "nullable")]
    pub partial_gift_enabled: bool,
    pub empty_tpkds: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subproduct {
    #[serde(deserialize_with = "nullable")]
    pub machine_name: String,
    #[serde(deserialize_with = "nullable")]
    pub human_name: String,
    #[serde(deserialize_with = "nullable")]
    pub url: String,
    #[serde(deserialize_with = "nullable")]
    pub icon: String,
    #[serde(deserialize_with = "nullable")]
    pub library_family_name: String,
    #[serde(deserialize_with = "nullable")]
    pub payee: Payee,
    #[serde(deserialize_with = "nullable")]
    pub downloads: Vec<PlatformDownload>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payee {
    #[serde(deserialize_with = "nullable")]
    pub human_name: String,
    #[serde(deserialize_with = "nullable")]
    pub machine_name: String,
}

/// Downloads of one subproduct for one platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformDownload {
    #[serde(deserialize_with = "nullable")]
    pub machine_name: String,
    /// `windows`, `mac`, `linux`, `ebook`, `audio`, ...
    #[serde(deserialize_with = "nullable")]
    pub platform: String,
    #[serde(deserialize_with = "nullable")]
    pub download_struct: Vec<Download>,
    #[serde(deserialize_with = "nullable")]
    pub download_identifier: String,
    #[serde(deserialize_with = "nullable")]
    pub android_app_only: bool,
    pub options_dict: Value,
    pub download_version_number: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Download {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub url: DownloadUrl,
    #[serde(deserialize_with = "nullable")]
    pub human_size: String,
    #[serde(deserialize_with = "nullable")]
    pub file_size: i64,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub md5: String,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub sha1: String,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub uploaded_at: String,
    #[serde(with = "time::serde::timestamp::option", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<OffsetDateTime>,
    #[serde(deserialize_with = "nullable")]
    pub uses_kindle_sender: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadUrl {
    #[serde(deserialize_with = "nullable")]
    pub web: String,
    #[serde(deserialize_with = "nullable")]
    pub bittorrent: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TpkdDict {
    #[serde(deserialize_with = "nullable")]
    pub all_tpks: Vec<Tpk>,
}

/// A third-party key (Steam key and the like).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tpk {
    #[serde(deserialize_with = "nullable")]
    pub machine_name: String,
    #[serde(deserialize_with = "nullable")]
    pub human_name: String,
    #[serde(deserialize_with = "nullable")]
    pub gamekey: String,
    #[serde(deserialize_with = "nullable")]
    pub key_type: String,
    #[serde(deserialize_with = "nullable")]
    pub key_type_human_name: String,
    #[serde(deserialize_with = "nullable")]
    pub redeemed_key_val: String,
    #[serde(deserialize_with = "nullable")]
    pub keyindex: i64,
    #[serde(deserialize_with = "nullable")]
    pub is_gift: bool,
    #[serde(deserialize_with = "nullable")]
    pub is_expired: bool,
    #[serde(deserialize_with = "nullable")]
    pub visible: bool,
    #[serde(deserialize_with = "nullable")]
    pub num_days_until_expired: i64,
    pub steam_app_id: Option<i64>,
    #[serde(deserialize_with = "nullable")]
    pub disallowed_countries: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub exclusive_countries: Vec<Value>,
    #[serde(deserialize_with = "nullable")]
    pub instructions_html: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletCredit {
    #[serde(deserialize_with = "nullable")]
    pub gamekey: String,
    #[serde(deserialize_with = "nullable")]
    pub amount: f64,
    #[serde(deserialize_with = "nullable")]
    pub currency: String,
    #[serde(deserialize_with = "nullable")]
    pub settled: bool,
    #[serde(deserialize_with = "nullable")]
    pub expirable_credit: bool,
    pub expiry: Value,
}
