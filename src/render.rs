//! Terminal rendering of the dashboard views.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use core_types::{AlertLevel, BotStatus, GridParams, OrderHistoryItem, OrderSide, PortfolioSummary};
use engine::{DashboardFrame, SyncStatus};
use events::{Banner, BannerLevel};
use view_model::format::format_grouped;
use view_model::{portfolio, CapitalState, DashboardView, Gauge, Trend, TrendText};

const BAR_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn trend_cell(value: &TrendText) -> Cell {
    let cell = Cell::new(&value.text);
    match value.trend {
        Trend::Up => cell.fg(Color::Green),
        Trend::Down => cell.fg(Color::Red),
        Trend::Neutral => cell,
    }
}

fn gauge_bar(gauge: &Gauge) -> String {
    let filled = (gauge.width_pct / 5.0).round().clamp(0.0, 20.0) as usize;
    format!("[{}{}] {}", "#".repeat(filled), "-".repeat(20 - filled), gauge.text)
}

pub fn banner_line(banner: &Banner) -> String {
    let level = match banner.level {
        BannerLevel::Success => "ok",
        BannerLevel::Warning => "warning",
        BannerLevel::Error => "error",
    };
    format!("[{}] {}: {}", banner.section, level, banner.message)
}

pub fn banners(banners: &[Banner]) -> String {
    banners.iter().map(banner_line).collect::<Vec<_>>().join("\n")
}

pub fn frame(frame: &DashboardFrame) -> String {
    let mut out = dashboard(&frame.view);
    if let SyncStatus::Failed(reason) = &frame.sync {
        out.push_str(&format!("\nSync failed: {reason}"));
    }
    for warning in frame.warnings() {
        out.push_str(&format!("\nwarning: {warning}"));
    }
    out
}

pub fn dashboard(view: &DashboardView) -> String {
    let mut sections = Vec::new();

    sections.push(format!(
        "{} | {} | {}",
        view.header.strategy, view.header.schedule, view.header.sync
    ));

    let headline = &view.headline;
    let mut metrics = table();
    metrics.set_header(vec![
        "Total Asset",
        "Unrealized PnL",
        "Daily Realized",
        "W / L",
        "Capital",
    ]);
    let capital = Cell::new(format!(
        "{} / {} ({})",
        headline.capital_usage,
        headline.capital_limit,
        headline.capital_state.label()
    ));
    metrics.add_row(vec![
        Cell::new(&headline.total_asset),
        trend_cell(&headline.unrealized_pnl),
        trend_cell(&headline.daily_realized_pnl),
        Cell::new(format!("{} / {}", headline.wins, headline.losses)),
        match headline.capital_state {
            CapitalState::Safe => capital,
            CapitalState::Warning => capital.fg(Color::Yellow),
            CapitalState::Over => capital.fg(Color::Red),
        },
    ]);
    sections.push(metrics.to_string());

    sections.push(format!(
        "Bot {} | heartbeat {} | next action: {}",
        view.bot.state, view.bot.heartbeat, view.bot.action_label
    ));

    let mut pulse = table();
    pulse.set_header(vec!["Market", "Intensity", "Change"]);
    for row in &view.pulse.rows {
        pulse.add_row(vec![
            Cell::new(&row.market),
            Cell::new(format!("{:.0}%", row.width_pct)),
            trend_cell(&row.change),
        ]);
    }
    sections.push(format!("Market Pulse ({})\n{pulse}", view.pulse.meta));

    let bars: String = view
        .throughput
        .iter()
        .map(|bar| {
            let index = ((f64::from(bar.height_pct) / 100.0) * (BAR_LEVELS.len() - 1) as f64).round() as usize;
            BAR_LEVELS[index.min(BAR_LEVELS.len() - 1)]
        })
        .collect();
    sections.push(format!("Throughput {bars}"));

    let mut alerts = table();
    alerts.set_header(vec!["Level", "Title", "Message", "Age"]);
    for alert in &view.alerts {
        let level = Cell::new(alert.level.as_str());
        alerts.add_row(vec![
            match alert.level {
                AlertLevel::Ok => level.fg(Color::Green),
                AlertLevel::Warn => level.fg(Color::Yellow),
                AlertLevel::Danger => level.fg(Color::Red),
            },
            Cell::new(&alert.title),
            Cell::new(&alert.message),
            Cell::new(&alert.age),
        ]);
    }
    sections.push(alerts.to_string());

    let positions = &view.positions;
    match &positions.placeholder {
        Some(placeholder) => sections.push(format!("Positions ({})\n{placeholder}", positions.meta)),
        None => {
            let mut rows = table();
            rows.set_header(vec!["Market", "Qty", "Avg", "Now", "PnL"]);
            for row in &positions.rows {
                rows.add_row(vec![
                    Cell::new(&row.market),
                    Cell::new(&row.qty),
                    Cell::new(&row.avg_price),
                    Cell::new(&row.now_price),
                    trend_cell(&row.pnl),
                ]);
            }
            sections.push(format!("Positions ({})\n{rows}", positions.meta));
        }
    }

    sections.push(format!(
        "Capital    {}\nDaily loss {}\nPositions  {}",
        gauge_bar(&view.risk.capital),
        gauge_bar(&view.risk.daily_loss),
        gauge_bar(&view.risk.positions)
    ));

    sections.join("\n\n")
}

pub fn portfolio(summary: &PortfolioSummary) -> String {
    let headline = portfolio::headline(summary);
    let mut out = format!("Net worth {} | Total PnL {}", headline.net_worth, headline.total_pnl.text);

    let slices = portfolio::allocation(&summary.items);
    if !slices.is_empty() {
        let mut allocation = table();
        allocation.set_header(vec!["Currency", "Value", "Share"]);
        for slice in &slices {
            allocation.add_row(vec![
                Cell::new(&slice.name),
                Cell::new(format_grouped(Some(slice.value))),
                Cell::new(format!("{:.1}%", slice.percent)),
            ]);
        }
        out.push_str(&format!("\n{allocation}"));
    }

    let assets = portfolio::asset_table(&summary.items);
    match assets.placeholder {
        Some(placeholder) => out.push_str(&format!("\n{placeholder}")),
        None => {
            let mut rows = table();
            rows.set_header(vec!["Currency", "Broker", "Price", "Avg Buy", "PnL", "Value"]);
            for row in &assets.rows {
                rows.add_row(vec![
                    Cell::new(&row.currency),
                    Cell::new(&row.broker),
                    Cell::new(&row.current_price),
                    Cell::new(&row.avg_buy_price),
                    trend_cell(&row.pnl),
                    Cell::new(&row.total_value),
                ]);
            }
            out.push_str(&format!("\n{rows}"));
        }
    }
    out
}

pub fn status(status: &BotStatus) -> String {
    let bot = view_model::builder::bot_state(status.running, status.heartbeat_age_sec);
    let mut out = format!("Bot {} | heartbeat {}", bot.state, bot.heartbeat);
    if let Some(error) = &status.last_error {
        out.push_str(&format!("\nlast error: {error}"));
    }
    out
}

pub fn grid(grid: &GridParams) -> String {
    let mut rows = table();
    rows.set_header(vec!["Setting", "Value"]);
    rows.add_row(vec!["Target coin".to_string(), grid.target_coin.clone()]);
    rows.add_row(vec!["Lower bound".to_string(), format_grouped(Some(grid.grid_lower_bound))]);
    rows.add_row(vec!["Upper bound".to_string(), format_grouped(Some(grid.grid_upper_bound))]);
    rows.add_row(vec!["Order (KRW)".to_string(), format_grouped(Some(grid.grid_order_krw))]);
    rows.add_row(vec!["Sell %".to_string(), format!("{}", grid.grid_sell_pct)]);
    rows.add_row(vec!["Cooldown (s)".to_string(), grid.grid_cooldown_seconds.to_string()]);
    rows.add_row(vec!["Trade mode".to_string(), grid.trade_mode.clone()]);
    rows.to_string()
}

pub fn orders(orders: &[OrderHistoryItem]) -> String {
    let orders = portfolio::order_table(orders);
    if let Some(placeholder) = orders.placeholder {
        return placeholder;
    }
    let mut rows = table();
    rows.set_header(vec!["Executed", "Symbol", "Side", "Price", "Qty", "Broker"]);
    for row in &orders.rows {
        let side = Cell::new(row.side.label());
        rows.add_row(vec![
            Cell::new(&row.executed_at),
            Cell::new(&row.symbol),
            match row.side {
                OrderSide::Buy => side.fg(Color::Green),
                OrderSide::Sell => side.fg(Color::Red),
                OrderSide::Other(_) => side,
            },
            Cell::new(&row.price),
            Cell::new(&row.qty),
            Cell::new(&row.broker),
        ]);
    }
    rows.to_string()
}
