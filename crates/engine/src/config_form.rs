use crate::error::SyncError;
use crate::surface::ErrorSurface;
use api_client::DashboardApi;
use core_types::bot::{
    DEFAULT_GRID_COOLDOWN_SECONDS, DEFAULT_GRID_LOWER_BOUND, DEFAULT_GRID_ORDER_KRW, DEFAULT_GRID_SELL_PCT,
    DEFAULT_GRID_UPPER_BOUND, DEFAULT_TARGET_COIN,
};
use core_types::{BotConfig, GridParams, GRID_TRADE_MODE};
use events::Section;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

const SAVE_FALLBACK: &str = "Failed to save the configuration. Please try again later.";
const SAVED: &str = "Grid configuration saved.";

/// Why a staged grid edit was refused. Checked in declaration order; the
/// first failing rule wins.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Enter a target coin.")]
    MissingTargetCoin,

    #[error("Lower bound must be less than upper bound.")]
    InvalidBounds,

    #[error("Order amount must be greater than 0.")]
    InvalidOrderSize,

    #[error("Sell percentage must be between 0 and 100.")]
    InvalidSellPct,

    #[error("Cooldown must be at least 1 second.")]
    InvalidCooldown,
}

/// Strips a `KRW-` market prefix (any case), then trims and upper-cases.
pub fn normalize_coin(raw: &str) -> String {
    let stripped = match raw.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("KRW-") => &raw[4..],
        _ => raw,
    };
    stripped.trim().to_uppercase()
}

/// Reads operator text the way a browser number field does: surrounding
/// whitespace is ignored, empty text is zero and anything else that does
/// not parse is NaN.
pub fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

fn finite_or(value: Option<f64>, fallback: f64) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(fallback)
}

/// Builds a complete grid record from whatever the backend sent, filling
/// gaps with the defaults.
pub fn normalize_grid(config: Option<&BotConfig>) -> GridParams {
    let Some(raw) = config.and_then(|c| c.grid.as_ref()) else {
        return GridParams::default();
    };

    let coin = normalize_coin(raw.target_coin.as_deref().unwrap_or(DEFAULT_TARGET_COIN));
    let cooldown = finite_or(raw.grid_cooldown_seconds, DEFAULT_GRID_COOLDOWN_SECONDS as f64)
        .trunc()
        .max(1.0);
    let trade_mode = raw
        .trade_mode
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or(GRID_TRADE_MODE);

    GridParams {
        target_coin: if coin.is_empty() { DEFAULT_TARGET_COIN.to_string() } else { coin },
        grid_upper_bound: finite_or(raw.grid_upper_bound, DEFAULT_GRID_UPPER_BOUND),
        grid_lower_bound: finite_or(raw.grid_lower_bound, DEFAULT_GRID_LOWER_BOUND),
        grid_order_krw: finite_or(raw.grid_order_krw, DEFAULT_GRID_ORDER_KRW),
        grid_sell_pct: finite_or(raw.grid_sell_pct, DEFAULT_GRID_SELL_PCT),
        grid_cooldown_seconds: cooldown as u64,
        trade_mode: trade_mode.to_string(),
    }
}

fn number_text(value: f64) -> String {
    format!("{value}")
}

/// The editable grid fields as the operator typed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridForm {
    pub target_coin: String,
    pub lower_bound: String,
    pub upper_bound: String,
    pub order_krw: String,
    pub sell_pct: String,
    pub cooldown_seconds: String,
}

impl Default for GridForm {
    fn default() -> Self {
        Self::from_params(&GridParams::default())
    }
}

impl GridForm {
    pub fn from_params(grid: &GridParams) -> Self {
        Self {
            target_coin: grid.target_coin.clone(),
            lower_bound: number_text(grid.grid_lower_bound),
            upper_bound: number_text(grid.grid_upper_bound),
            order_krw: number_text(grid.grid_order_krw),
            sell_pct: number_text(grid.grid_sell_pct),
            cooldown_seconds: grid.grid_cooldown_seconds.to_string(),
        }
    }

    /// Checks the staged values and returns the canonical grid to submit.
    pub fn validate(&self) -> Result<GridParams, ValidationError> {
        let coin = normalize_coin(&self.target_coin);
        let lower = parse_number(&self.lower_bound);
        let upper = parse_number(&self.upper_bound);
        let order = parse_number(&self.order_krw);
        let sell_pct = parse_number(&self.sell_pct);
        let cooldown = parse_number(&self.cooldown_seconds);

        if coin.is_empty() {
            return Err(ValidationError::MissingTargetCoin);
        }
        if !lower.is_finite() || !upper.is_finite() || lower >= upper {
            return Err(ValidationError::InvalidBounds);
        }
        if !order.is_finite() || order <= 0.0 {
            return Err(ValidationError::InvalidOrderSize);
        }
        if !sell_pct.is_finite() || !(0.0..=100.0).contains(&sell_pct) {
            return Err(ValidationError::InvalidSellPct);
        }
        if !cooldown.is_finite() || cooldown < 1.0 {
            return Err(ValidationError::InvalidCooldown);
        }

        Ok(GridParams {
            target_coin: coin,
            grid_upper_bound: upper,
            grid_lower_bound: lower,
            grid_order_krw: order,
            grid_sell_pct: sell_pct,
            grid_cooldown_seconds: cooldown.trunc() as u64,
            trade_mode: GRID_TRADE_MODE.to_string(),
        })
    }
}

/// Staged grid edits on top of the last configuration the backend accepted.
pub struct ConfigFormModel {
    api: Arc<dyn DashboardApi>,
    surface: ErrorSurface,
    last_good: Option<BotConfig>,
    form: GridForm,
}

impl ConfigFormModel {
    pub fn new(api: Arc<dyn DashboardApi>, surface: ErrorSurface) -> Self {
        Self {
            api,
            surface,
            last_good: None,
            form: GridForm::default(),
        }
    }

    /// Replaces the last-known-good config and resets the form from it.
    /// `None` keeps the defaults on screen.
    pub fn load(&mut self, config: Option<BotConfig>) {
        self.form = GridForm::from_params(&normalize_grid(config.as_ref()));
        self.last_good = config;
    }

    pub fn form(&self) -> &GridForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut GridForm {
        &mut self.form
    }

    pub fn last_good(&self) -> Option<&BotConfig> {
        self.last_good.as_ref()
    }

    /// The grid the form started from, before any edit.
    pub fn current_grid(&self) -> GridParams {
        normalize_grid(self.last_good.as_ref())
    }

    /// Validates and submits the staged grid.
    ///
    /// Every section of the last-known-good config other than `grid` is sent
    /// back unchanged. On failure the form keeps the operator's values.
    pub async fn save(&mut self) -> Result<BotConfig, SyncError> {
        let grid = match self.form.validate() {
            Ok(grid) => grid,
            Err(err) => {
                self.surface.error(Section::Config, err.to_string());
                return Err(err.into());
            }
        };

        let payload = self.last_good.clone().unwrap_or_default().with_grid(&grid);
        info!(coin = %grid.target_coin, "Saving grid configuration");

        match self.api.update_config(&payload).await {
            Ok(saved) => {
                self.load(Some(saved.clone()));
                self.surface.success(Section::Config, SAVED);
                Ok(saved)
            }
            Err(source) => {
                let message = source
                    .detail()
                    .map(str::to_string)
                    .unwrap_or_else(|| SAVE_FALLBACK.to_string());
                let err = SyncError::Command {
                    action: "save config",
                    source,
                };
                warn!(error = %err, "Grid configuration save failed");
                self.surface.error(Section::Config, message);
                Err(err)
            }
        }
    }
}
