use crate::format::{
    format_grouped, format_krw, format_pct_unsigned, format_qty, plain_number, TrendText, PLACEHOLDER,
};
use core_types::{AlertItem, AlertLevel, Metrics, PositionRow, Risk, Snapshot, SymbolPulse};

pub const THROUGHPUT_BUCKETS: usize = 12;
/// Bars never shrink below this height, so an idle bucket stays visible.
pub const THROUGHPUT_MIN_HEIGHT: f64 = 12.0;
pub const DEFAULT_SCHEDULE: &str = "KST 24H";
/// Share of the capital limit at which usage is flagged as a warning.
const CAPITAL_WARNING_RATIO: f64 = 0.8;

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Width of a gauge in percent of its track. A zero denominator draws an
/// empty gauge.
fn gauge_ratio(value: f64, max: f64) -> f64 {
    if max > 0.0 { clamp(value / max * 100.0, 0.0, 100.0) } else { 0.0 }
}

fn text_or(value: &Option<String>, fallback: &str) -> String {
    match value.as_deref() {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => fallback.to_string(),
    }
}

/// Everything the dashboard renders for one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub header: HeaderView,
    pub headline: HeadlineView,
    pub bot: BotStateView,
    pub pulse: PulseView,
    pub throughput: Vec<ThroughputBar>,
    pub alerts: Vec<AlertView>,
    pub positions: PositionsView,
    pub risk: RiskView,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderView {
    pub strategy: String,
    pub schedule: String,
    pub sync: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapitalState {
    Safe,
    Warning,
    Over,
}

impl CapitalState {
    /// Classifies usage against the limit. Without a positive limit there is
    /// nothing to exceed.
    pub fn classify(usage: f64, limit: f64) -> Self {
        if limit > 0.0 && usage >= limit {
            CapitalState::Over
        } else if limit > 0.0 && usage >= limit * CAPITAL_WARNING_RATIO {
            CapitalState::Warning
        } else {
            CapitalState::Safe
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CapitalState::Safe => "Safe",
            CapitalState::Warning => "Warning",
            CapitalState::Over => "Over",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlineView {
    pub total_asset: String,
    pub unrealized_pnl: TrendText,
    pub daily_realized_pnl: TrendText,
    pub wins: String,
    pub losses: String,
    pub capital_usage: String,
    pub capital_limit: String,
    pub capital_state: CapitalState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BotStateView {
    pub running: bool,
    pub state: String,
    pub heartbeat: String,
    /// Label of the primary run/pause control.
    pub action_label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PulseRow {
    pub market: String,
    pub width_pct: f64,
    pub change: TrendText,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PulseView {
    pub rows: Vec<PulseRow>,
    pub meta: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputBar {
    pub height_pct: u32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertView {
    pub level: AlertLevel,
    pub title: String,
    pub message: String,
    pub age: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionView {
    pub market: String,
    pub qty: String,
    pub avg_price: String,
    pub now_price: String,
    pub pnl: TrendText,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionsView {
    pub rows: Vec<PositionView>,
    /// Set instead of rows when there is nothing to show.
    pub placeholder: Option<String>,
    pub meta: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gauge {
    pub text: String,
    pub width_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskView {
    pub capital: Gauge,
    pub daily_loss: Gauge,
    pub positions: Gauge,
}

/// Projects decoded snapshots into [`DashboardView`]s.
#[derive(Debug, Clone)]
pub struct ViewModelBuilder {
    snapshot_path: String,
}

impl ViewModelBuilder {
    /// `snapshot_path` is the path named in the load-failure alert.
    pub fn new(snapshot_path: impl Into<String>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
        }
    }

    pub fn build(&self, snapshot: &Snapshot) -> DashboardView {
        DashboardView {
            header: HeaderView {
                strategy: text_or(&snapshot.strategy_text, PLACEHOLDER),
                schedule: text_or(&snapshot.schedule_text, DEFAULT_SCHEDULE),
                sync: format!("Last Sync {}", text_or(&snapshot.synced_at, PLACEHOLDER)),
            },
            headline: headline(&snapshot.metrics),
            bot: bot_state(snapshot.status.running, snapshot.status.heartbeat_age_sec),
            pulse: pulse(&snapshot.symbols),
            throughput: throughput(&snapshot.throughput),
            alerts: alerts(&snapshot.alerts),
            positions: positions(&snapshot.positions, snapshot.risk.max_positions),
            risk: risk(&snapshot.risk),
        }
    }

    /// The view shown after a failed poll.
    ///
    /// Widgets keep the last good values; only the sync label and the alert
    /// list change.
    pub fn load_failed(&self, previous: Option<&DashboardView>) -> DashboardView {
        let mut view = match previous {
            Some(view) => view.clone(),
            None => self.build(&Snapshot::default()),
        };
        view.header.sync = "Last Sync failed".to_string();
        view.alerts = vec![AlertView {
            level: AlertLevel::Danger,
            title: "Dashboard API Error".to_string(),
            message: format!("Failed to fetch {}", self.snapshot_path),
            age: "now".to_string(),
        }];
        view
    }
}

fn headline(metrics: &Metrics) -> HeadlineView {
    let usage = metrics.capital_usage_pct.unwrap_or(0.0);
    let limit = metrics.capital_limit_pct.unwrap_or(0.0);
    HeadlineView {
        total_asset: format_krw(metrics.total_asset_krw),
        unrealized_pnl: TrendText::signed_krw(metrics.unrealized_pnl_krw),
        daily_realized_pnl: TrendText::signed_krw(metrics.daily_realized_pnl_krw),
        wins: format!("{} Wins", plain_number(metrics.wins.unwrap_or(0.0))),
        losses: format!("{} Loss", plain_number(metrics.losses.unwrap_or(0.0))),
        capital_usage: format_pct_unsigned(Some(usage)),
        capital_limit: format!("Limit {}", format_pct_unsigned(Some(limit))),
        capital_state: CapitalState::classify(usage, limit),
    }
}

pub fn bot_state(running: bool, heartbeat_age_sec: Option<f64>) -> BotStateView {
    BotStateView {
        running,
        state: if running { "Running" } else { "Stopped" }.to_string(),
        heartbeat: match heartbeat_age_sec.filter(|age| age.is_finite()) {
            Some(age) => format!("Heartbeat {}s", plain_number(age)),
            None => "Heartbeat -".to_string(),
        },
        action_label: if running { "Pause" } else { "Run" }.to_string(),
    }
}

fn pulse(symbols: &[SymbolPulse]) -> PulseView {
    if symbols.is_empty() {
        return PulseView {
            rows: vec![PulseRow {
                market: PLACEHOLDER.to_string(),
                width_pct: 0.0,
                change: TrendText::pct(None),
            }],
            meta: "Top 0".to_string(),
        };
    }

    let rows = symbols
        .iter()
        .map(|item| PulseRow {
            market: text_or(&item.market, PLACEHOLDER),
            width_pct: clamp(item.intensity_pct.unwrap_or(0.0), 0.0, 100.0),
            change: TrendText::pct(item.change_pct),
        })
        .collect();
    PulseView {
        rows,
        meta: format!("Top {}", symbols.len()),
    }
}

fn throughput(values: &[f64]) -> Vec<ThroughputBar> {
    let mut buckets: Vec<f64> = values.iter().take(THROUGHPUT_BUCKETS).copied().collect();
    buckets.resize(THROUGHPUT_BUCKETS, 0.0);

    let max = buckets.iter().copied().fold(1.0_f64, f64::max);
    buckets
        .into_iter()
        .map(|value| {
            let height = if value > 0.0 {
                clamp(value / max * 100.0, THROUGHPUT_MIN_HEIGHT, 100.0)
            } else {
                THROUGHPUT_MIN_HEIGHT
            };
            ThroughputBar {
                height_pct: height.round() as u32,
                title: format!("{} orders", plain_number(value)),
            }
        })
        .collect()
}

fn alerts(items: &[AlertItem]) -> Vec<AlertView> {
    if items.is_empty() {
        return vec![AlertView {
            level: AlertLevel::Ok,
            title: "Stable".to_string(),
            message: "No critical alerts.".to_string(),
            age: "now".to_string(),
        }];
    }

    items
        .iter()
        .map(|item| AlertView {
            level: item.level,
            title: text_or(&item.title, "Alert"),
            message: text_or(&item.message, PLACEHOLDER),
            age: match item.minutes_ago.filter(|m| m.is_finite()) {
                Some(minutes) => format!("{}m", plain_number(minutes.max(0.0))),
                None => "now".to_string(),
            },
        })
        .collect()
}

fn positions(rows: &[PositionRow], max_positions: Option<f64>) -> PositionsView {
    let max = max_positions.filter(|m| m.is_finite()).unwrap_or(0.0);
    let meta = format!("{} / {}", rows.len(), plain_number(max));

    if rows.is_empty() {
        return PositionsView {
            rows: Vec::new(),
            placeholder: Some("No open positions.".to_string()),
            meta,
        };
    }

    PositionsView {
        rows: rows
            .iter()
            .map(|row| PositionView {
                market: text_or(&row.market, PLACEHOLDER),
                qty: format_qty(row.qty),
                avg_price: format_grouped(row.avg_price),
                now_price: format_grouped(row.now_price),
                pnl: TrendText::pct(row.pnl_pct),
            })
            .collect(),
        placeholder: None,
        meta,
    }
}

fn risk(risk: &Risk) -> RiskView {
    let usage = risk.capital_usage_pct.unwrap_or(0.0);
    let limit = risk.capital_limit_pct.unwrap_or(0.0);
    let floating_loss = risk.floating_loss_pct.unwrap_or(0.0);
    let max_daily_loss = risk.max_daily_loss_pct.unwrap_or(0.0);
    let used = risk.used_positions.unwrap_or(0.0);
    let max = risk.max_positions.unwrap_or(0.0);

    RiskView {
        capital: Gauge {
            text: format!("{} / {}", format_pct_unsigned(Some(usage)), format_pct_unsigned(Some(limit))),
            width_pct: gauge_ratio(usage, limit),
        },
        daily_loss: Gauge {
            text: format!(
                "{} / {}",
                format_pct_unsigned(Some(floating_loss)),
                format_pct_unsigned(Some(max_daily_loss))
            ),
            width_pct: gauge_ratio(floating_loss, max_daily_loss),
        },
        positions: Gauge {
            text: format!("{} / {}", plain_number(used), plain_number(max)),
            width_pct: gauge_ratio(used, max),
        },
    }
}
