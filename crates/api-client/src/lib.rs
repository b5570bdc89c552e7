use crate::error::ApiError;
use async_trait::async_trait;
use core_types::{BotConfig, BotStatus, OrderHistoryItem, PortfolioSummary, Snapshot};

pub mod client;
pub mod error;
pub mod responses;

// --- Public API ---
pub use client::HttpDashboardClient;
pub use responses::ApiErrorResponse;

/// The interface to the bot backend.
///
/// The engine only ever talks to this trait, so the HTTP implementation can
/// be swapped for a scripted one in tests.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// Fetches the live dashboard snapshot.
    async fn fetch_snapshot(&self) -> Result<Snapshot, ApiError>;

    /// Fetches the portfolio summary (net worth, total P&L and holdings).
    async fn get_portfolio_summary(&self) -> Result<PortfolioSummary, ApiError>;

    async fn get_status(&self) -> Result<BotStatus, ApiError>;

    async fn fetch_config(&self) -> Result<BotConfig, ApiError>;

    /// Replaces the backend configuration and returns what the backend stored.
    async fn update_config(&self, config: &BotConfig) -> Result<BotConfig, ApiError>;

    async fn start_bot(&self) -> Result<BotStatus, ApiError>;

    async fn stop_bot(&self) -> Result<BotStatus, ApiError>;

    /// Requests an emergency liquidation. The response body carries nothing
    /// the client uses.
    async fn liquidate(&self) -> Result<(), ApiError>;

    async fn fetch_orders(&self) -> Result<Vec<OrderHistoryItem>, ApiError>;
}
