use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Severity of a dashboard alert row.
///
/// The backend is free to send any string; only the three known levels are
/// kept and everything else collapses to `Ok`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    #[default]
    Ok,
    Warn,
    Danger,
}

impl AlertLevel {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "warn" => AlertLevel::Warn,
            "danger" => AlertLevel::Danger,
            _ => AlertLevel::Ok,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Ok => "ok",
            AlertLevel::Warn => "warn",
            AlertLevel::Danger => "danger",
        }
    }
}

impl<'de> Deserialize<'de> for AlertLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value.as_str().map(AlertLevel::parse).unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
    /// A side label the console does not recognise, upper-cased for display.
    Other(String),
}

impl OrderSide {
    /// Maps the exchange's side vocabulary (`buy`/`bid`, `sell`/`ask`) onto
    /// the two known sides.
    pub fn resolve(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "buy" | "bid" => OrderSide::Buy,
            "sell" | "ask" => OrderSide::Sell,
            _ => OrderSide::Other(raw.to_uppercase()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            OrderSide::Buy => "Buy",
            OrderSide::Sell => "Sell",
            OrderSide::Other(label) => label,
        }
    }
}
