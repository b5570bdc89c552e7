//! Live state of the dashboard page: snapshot polling, gated bot controls,
//! the grid configuration form and per-section error banners.

pub mod config_form;
pub mod control;
pub mod error;
pub mod page;
pub mod poller;
pub mod surface;

#[cfg(test)]
mod testing;

pub use config_form::{ConfigFormModel, GridForm, ValidationError};
pub use control::{
    ActiveAction, Confirmation, ControlAction, ControlActionGate, FixedConfirmation, GateOutcome, LIQUIDATE_PROMPT,
};
pub use error::{EngineError, SyncError};
pub use page::{DashboardPage, PageOptions};
pub use poller::{DashboardFrame, FrameReceiver, PollState, PollerHandle, SnapshotPoller, SyncStatus};
pub use surface::ErrorSurface;
