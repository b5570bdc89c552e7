//! # Dashboard Events
//!
//! The notifications the engine broadcasts while the dashboard is mounted:
//! banners raised and cleared per page section, and the outcome of every
//! snapshot poll. Renderers and loggers subscribe to these instead of
//! reaching into engine state.

// Declare the modules that make up this crate.
pub mod error;
pub mod messages;

// Re-export the core types to provide a clean public API.
pub use error::EventsError;
pub use messages::{Banner, BannerLevel, DashboardEvent, Section, SyncNotice};
