use crate::decode;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The trade mode tag the console always submits.
pub const GRID_TRADE_MODE: &str = "grid";

pub const DEFAULT_TARGET_COIN: &str = "BTC";
pub const DEFAULT_GRID_UPPER_BOUND: f64 = 100_000_000.0;
pub const DEFAULT_GRID_LOWER_BOUND: f64 = 80_000_000.0;
pub const DEFAULT_GRID_ORDER_KRW: f64 = 10_000.0;
pub const DEFAULT_GRID_SELL_PCT: f64 = 100.0;
pub const DEFAULT_GRID_COOLDOWN_SECONDS: u64 = 60;

/// Run state of the bot, as reported by `/status`, the start/stop endpoints
/// and the `status` section of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotStatus {
    #[serde(default, deserialize_with = "decode::lenient_bool")]
    pub running: bool,
    #[serde(default, deserialize_with = "decode::lenient_string")]
    pub last_heartbeat: Option<String>,
    #[serde(default, deserialize_with = "decode::lenient_string")]
    pub last_error: Option<String>,
    #[serde(default, deserialize_with = "decode::lenient_f64")]
    pub heartbeat_age_sec: Option<f64>,
}

impl BotStatus {
    pub fn decode(value: Value) -> Result<Self, CoreError> {
        decode::decode_object("bot status", value)
    }
}

/// A complete, canonical set of grid parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridParams {
    pub target_coin: String,
    pub grid_upper_bound: f64,
    pub grid_lower_bound: f64,
    pub grid_order_krw: f64,
    pub grid_sell_pct: f64,
    pub grid_cooldown_seconds: u64,
    pub trade_mode: String,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            target_coin: DEFAULT_TARGET_COIN.to_string(),
            grid_upper_bound: DEFAULT_GRID_UPPER_BOUND,
            grid_lower_bound: DEFAULT_GRID_LOWER_BOUND,
            grid_order_krw: DEFAULT_GRID_ORDER_KRW,
            grid_sell_pct: DEFAULT_GRID_SELL_PCT,
            grid_cooldown_seconds: DEFAULT_GRID_COOLDOWN_SECONDS,
            trade_mode: GRID_TRADE_MODE.to_string(),
        }
    }
}

/// The `grid` section exactly as the backend sent it. Any field may be
/// missing or malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialGrid {
    #[serde(default, deserialize_with = "decode::lenient_string", skip_serializing_if = "Option::is_none")]
    pub target_coin: Option<String>,
    #[serde(default, deserialize_with = "decode::lenient_f64", skip_serializing_if = "Option::is_none")]
    pub grid_upper_bound: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64", skip_serializing_if = "Option::is_none")]
    pub grid_lower_bound: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64", skip_serializing_if = "Option::is_none")]
    pub grid_order_krw: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_f64", skip_serializing_if = "Option::is_none")]
    pub grid_sell_pct: Option<f64>,
    #[serde(
        default,
        deserialize_with = "decode::lenient_f64",
        serialize_with = "decode::integral_as_integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub grid_cooldown_seconds: Option<f64>,
    #[serde(default, deserialize_with = "decode::lenient_string", skip_serializing_if = "Option::is_none")]
    pub trade_mode: Option<String>,
}

impl From<&GridParams> for PartialGrid {
    fn from(grid: &GridParams) -> Self {
        Self {
            target_coin: Some(grid.target_coin.clone()),
            grid_upper_bound: Some(grid.grid_upper_bound),
            grid_lower_bound: Some(grid.grid_lower_bound),
            grid_order_krw: Some(grid.grid_order_krw),
            grid_sell_pct: Some(grid.grid_sell_pct),
            grid_cooldown_seconds: Some(grid.grid_cooldown_seconds as f64),
            trade_mode: Some(grid.trade_mode.clone()),
        }
    }
}

/// The bot configuration document.
///
/// Only the `grid` section is edited by the console. Every other section
/// (symbols, strategy, risk, schedule, ...) is carried in `extra` untouched so
/// that a save never drops settings the console does not understand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(
        default,
        deserialize_with = "decode::lenient_optional_object",
        skip_serializing_if = "Option::is_none"
    )]
    pub grid: Option<PartialGrid>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BotConfig {
    pub fn decode(value: Value) -> Result<Self, CoreError> {
        decode::decode_object("bot config", value)
    }

    /// Returns a copy of this config with its grid section replaced.
    /// The trade mode is always forced to [`GRID_TRADE_MODE`].
    pub fn with_grid(&self, grid: &GridParams) -> BotConfig {
        let mut section = PartialGrid::from(grid);
        section.trade_mode = Some(GRID_TRADE_MODE.to_string());
        BotConfig {
            grid: Some(section),
            extra: self.extra.clone(),
        }
    }
}
