use crate::format::{format_executed_at, format_krw, format_qty, TrendText, PLACEHOLDER};
use core_types::{AssetItem, OrderHistoryItem, OrderSide, PortfolioSummary};
use std::collections::HashMap;

/// Slice colours, assigned by rank and reused past the tenth currency.
pub const ALLOCATION_PALETTE: [&str; 10] = [
    "#0f172a", "#1d4ed8", "#0f766e", "#16a34a", "#d97706", "#dc2626", "#9333ea", "#0891b2", "#4f46e5",
    "#475569",
];

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationSlice {
    pub name: String,
    pub value: f64,
    pub percent: f64,
    pub color: &'static str,
}

/// Groups holdings by currency and sizes each group against the total.
///
/// Holdings without a positive value are left out. Slices are ordered from
/// largest to smallest; an empty result means there is nothing to chart.
pub fn allocation(items: &[AssetItem]) -> Vec<AllocationSlice> {
    let mut grouped: HashMap<String, f64> = HashMap::new();
    for item in items {
        let value = match item.total_value {
            Some(v) if v.is_finite() && v > 0.0 => v,
            _ => continue,
        };
        let currency = item
            .currency
            .as_deref()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "UNKNOWN".to_string());
        *grouped.entry(currency).or_insert(0.0) += value;
    }

    let mut sorted: Vec<(String, f64)> = grouped.into_iter().collect();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let total: f64 = sorted.iter().map(|(_, v)| v).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    sorted
        .into_iter()
        .enumerate()
        .map(|(index, (name, value))| AllocationSlice {
            name,
            value,
            percent: value / total * 100.0,
            color: ALLOCATION_PALETTE[index % ALLOCATION_PALETTE.len()],
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioHeadline {
    pub net_worth: String,
    pub total_pnl: TrendText,
}

pub fn headline(summary: &PortfolioSummary) -> PortfolioHeadline {
    PortfolioHeadline {
        net_worth: format_krw(Some(summary.total_net_worth.unwrap_or(0.0))),
        total_pnl: TrendText::signed_krw(Some(summary.total_pnl.unwrap_or(0.0))),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetRow {
    pub currency: String,
    pub broker: String,
    pub current_price: String,
    pub avg_buy_price: String,
    pub pnl: TrendText,
    pub total_value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetTable {
    pub rows: Vec<AssetRow>,
    pub placeholder: Option<String>,
}

pub fn asset_table(items: &[AssetItem]) -> AssetTable {
    if items.is_empty() {
        return AssetTable {
            rows: Vec::new(),
            placeholder: Some("No assets held.".to_string()),
        };
    }
    AssetTable {
        rows: items
            .iter()
            .map(|item| AssetRow {
                currency: item.currency.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
                broker: item.broker.clone().unwrap_or_default(),
                current_price: format_krw(item.current_price),
                avg_buy_price: format_krw(item.avg_buy_price),
                pnl: TrendText::pct(item.pnl_percentage),
                total_value: format_krw(item.total_value),
            })
            .collect(),
        placeholder: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRow {
    pub executed_at: String,
    pub symbol: String,
    pub side: OrderSide,
    pub price: String,
    pub qty: String,
    pub broker: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTable {
    pub rows: Vec<OrderRow>,
    pub placeholder: Option<String>,
}

pub fn order_table(orders: &[OrderHistoryItem]) -> OrderTable {
    if orders.is_empty() {
        return OrderTable {
            rows: Vec::new(),
            placeholder: Some("No recent orders.".to_string()),
        };
    }
    OrderTable {
        rows: orders
            .iter()
            .map(|order| OrderRow {
                executed_at: order
                    .executed_at
                    .as_deref()
                    .map(format_executed_at)
                    .unwrap_or_else(|| PLACEHOLDER.to_string()),
                symbol: order.symbol.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
                side: OrderSide::resolve(order.side.as_deref().unwrap_or(PLACEHOLDER)),
                price: format_krw(order.price),
                qty: format_qty(order.qty),
                broker: order.broker.clone().unwrap_or_default(),
            })
            .collect(),
        placeholder: None,
    }
}
