//! Projection of decoded backend payloads into render-ready view data.
//!
//! Nothing here touches the network or a terminal. Renderers consume the
//! plain structs this crate produces.

pub mod builder;
pub mod format;
pub mod portfolio;

pub use builder::{
    AlertView, BotStateView, CapitalState, DashboardView, Gauge, HeaderView, HeadlineView, PositionView,
    PositionsView, PulseRow, PulseView, RiskView, ThroughputBar, ViewModelBuilder,
};
pub use format::{Trend, TrendText};
pub use portfolio::{AllocationSlice, AssetRow, AssetTable, OrderRow, OrderTable, PortfolioHeadline};
