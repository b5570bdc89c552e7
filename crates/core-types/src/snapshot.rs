use crate::bot::BotStatus;
use crate::decode;
use crate::enums::AlertLevel;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One complete read of bot and portfolio state, as served by the dashboard
/// endpoint. A snapshot is never patched: the next poll replaces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, deserialize_with = "decode::lenient_string")]
    pub synced_at: Option<String>,
    #[serde(default, deserialize_with = "decode::lenient_string")]
    pub strategy_text: Option<String>,
    #[serde(default, deserialize_with = "decode::lenient_string")]
    pub schedule_text: Option<String>,
    #[serde(default, deserialize_with = "decode::lenient_object")]
    pub metrics: Metrics,
    #[serde(default, deserialize_with = "decode::lenient_object")]
    pub status: BotStatus,
    #[serde(default, deserialize_with = "decode::lenient_object")]
    pub risk: Risk,
    #[serde(default, deserialize_with = "decode::lenient_list")]
    pub symbols: Vec<SymbolPulse>,
    #[serde(default, deserialize_with = "decode::lenient_numbers")]
    pub throughput: Vec<f64>,
    #[serde(default, deserialize_with = "decode::lenient_list")]
    pub alerts: Vec<AlertItem>,
    #[serde(default, deserialize_with = "decode::lenient_list")]
    pub positions: Vec<PositionRow>,
    #[serde(default, deserialize_with = "decode::lenient_strings")]
    pub warnings: Vec<String>,
}

impl Snapshot {
    pub fn decode(value: Value) -> Result<Self, CoreError> {
        decode::decode_object("snapshot", value)
    }
}

/// Headline numbers. All amounts are in KRW.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub total_asset_krw: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub unrealized_pnl_krw: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub daily_realized_pnl_krw: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub wins: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub losses: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub capital_usage_pct: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub capital_limit_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub capital_usage_pct: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub capital_limit_pct: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub floating_loss_pct: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub max_daily_loss_pct: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub used_positions: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub max_positions: Option<f64>,
}

/// Short-term momentum of one market.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolPulse {
    #[serde(default, deserialize_with = "decode::lenient_string")]
    pub market: Option<String>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub intensity_pct: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub change_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertItem {
    #[serde(default)]
    pub level: AlertLevel,
    #[serde(default, deserialize_with = "decode::lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "decode::lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub minutes_ago: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionRow {
    #[serde(default, deserialize_with = "decode::lenient_string")]
    pub market: Option<String>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub qty: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub avg_price: Option<f64>,
    #[serde(default, alias = "current_price", deserialize_with = "decode::lenient_f64")]
    pub now_price: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub pnl_pct: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub pnl_krw: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub value_krw: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_snapshot_degrades_field_by_field() {
        let snapshot = Snapshot::decode(json!({
            "synced_at": "12:00:01 KST",
            "metrics": { "total_asset_krw": "1500000", "unrealized_pnl_krw": null, "wins": 3 },
            "status": { "running": true, "heartbeat_age_sec": 4 },
            "risk": "not-an-object",
            "symbols": [{ "market": "KRW-BTC", "intensity_pct": 140, "change_pct": -1.2 }, 7],
            "throughput": [1, "2", null, "x"],
            "alerts": [{ "level": "critical", "title": "Odd" }],
            "positions": [{ "market": "KRW-ETH", "qty": 0.5, "current_price": 4100000 }]
        }))
        .unwrap();

        assert_eq!(snapshot.synced_at.as_deref(), Some("12:00:01 KST"));
        assert_eq!(snapshot.metrics.total_asset_krw, Some(1_500_000.0));
        assert_eq!(snapshot.metrics.unrealized_pnl_krw, None);
        assert_eq!(snapshot.metrics.wins, Some(3.0));
        assert!(snapshot.status.running);
        assert_eq!(snapshot.status.heartbeat_age_sec, Some(4.0));
        assert_eq!(snapshot.risk, Risk::default());
        assert_eq!(snapshot.symbols.len(), 1);
        assert_eq!(snapshot.throughput, vec![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(snapshot.alerts[0].level, AlertLevel::Ok);
        assert_eq!(snapshot.positions[0].now_price, Some(4_100_000.0));
        assert!(snapshot.strategy_text.is_none());
    }

    #[test]
    fn empty_object_is_a_valid_snapshot() {
        let snapshot = Snapshot::decode(json!({})).unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(Snapshot::decode(json!("oops")).is_err());
    }
}
