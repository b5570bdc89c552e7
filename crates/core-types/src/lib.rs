pub mod bot;
pub mod decode;
pub mod enums;
pub mod error;
pub mod portfolio;
pub mod snapshot;

// Re-export the core types to provide a clean public API.
pub use bot::{BotConfig, BotStatus, GridParams, PartialGrid, GRID_TRADE_MODE};
pub use enums::{AlertLevel, OrderSide};
pub use error::CoreError;
pub use portfolio::{AssetItem, OrderHistoryItem, PortfolioSummary};
pub use snapshot::{AlertItem, Metrics, PositionRow, Risk, Snapshot, SymbolPulse};
