use crate::decode;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One held asset as aggregated by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetItem {
    #[serde(default, deserialize_with = "decode::lenient_string")]
    pub broker: Option<String>,
    #[serde(default, deserialize_with = "decode::lenient_string")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub balance: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub locked: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub avg_buy_price: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub current_price: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub total_value: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub pnl_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub total_net_worth: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub total_pnl: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_list")]
    pub items: Vec<AssetItem>,
}

impl PortfolioSummary {
    pub fn decode(value: Value) -> Result<Self, CoreError> {
        decode::decode_object("portfolio summary", value)
    }
}

/// A recent fill from `/orders/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderHistoryItem {
    #[serde(default, deserialize_with = "decode::lenient_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "decode::lenient_i64")]
    pub position_id: Option<i64>,
    #[serde(default, deserialize_with = "decode::lenient_string")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "decode::lenient_string")]
    pub side: Option<String>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub qty: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_string")]
    pub broker: Option<String>,
    #[serde(default, deserialize_with = "decode::lenient_string")]
    pub executed_at: Option<String>,
}

impl OrderHistoryItem {
    pub fn decode_list(value: Value) -> Result<Vec<Self>, CoreError> {
        decode::decode_list("order history", value)
    }
}
