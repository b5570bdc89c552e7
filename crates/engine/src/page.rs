//! The dashboard page: every piece of live state, created on mount and
//! dropped on unmount.

use crate::config_form::ConfigFormModel;
use crate::control::{Confirmation, ControlAction, ControlActionGate, GateOutcome};
use crate::error::{EngineError, SyncError};
use crate::poller::{FrameReceiver, PollerHandle, SnapshotPoller};
use crate::surface::ErrorSurface;
use api_client::{DashboardApi, HttpDashboardClient};
use configuration::Settings;
use core_types::{BotConfig, BotStatus, OrderHistoryItem, PortfolioSummary};
use events::{DashboardEvent, Section};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

const PORTFOLIO_LOAD_FAILED: &str = "Failed to load dashboard data.";
const CONFIG_LOAD_FAILED: &str = "Failed to load grid configuration. Showing defaults.";
const ORDERS_LOAD_FAILED: &str = "Failed to load recent orders.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOptions {
    pub poll_interval: Duration,
    /// Full path of the snapshot endpoint, as named in failure messages.
    pub snapshot_path: String,
}

impl PageOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            poll_interval: settings.polling.interval(),
            snapshot_path: format!("{}{}", settings.api.prefix, settings.api.endpoints.snapshot),
        }
    }
}

pub struct DashboardPage {
    api: Arc<dyn DashboardApi>,
    surface: ErrorSurface,
    poller: SnapshotPoller,
    handle: Option<PollerHandle>,
    gate: ControlActionGate,
    config_form: ConfigFormModel,
    portfolio: Option<PortfolioSummary>,
    status: Option<BotStatus>,
    orders: Vec<OrderHistoryItem>,
}

impl DashboardPage {
    pub fn new(api: Arc<dyn DashboardApi>, confirmation: Arc<dyn Confirmation>, options: PageOptions) -> Self {
        let surface = ErrorSurface::new();
        let poller = SnapshotPoller::new(
            Arc::clone(&api),
            surface.clone(),
            options.snapshot_path,
            options.poll_interval,
        );
        let gate = ControlActionGate::new(Arc::clone(&api), poller.clone(), surface.clone(), confirmation);
        let config_form = ConfigFormModel::new(Arc::clone(&api), surface.clone());
        Self {
            api,
            surface,
            poller,
            handle: None,
            gate,
            config_form,
            portfolio: None,
            status: None,
            orders: Vec::new(),
        }
    }

    /// Builds a page talking to the backend described by `settings`.
    pub fn connect(settings: &Settings, confirmation: Arc<dyn Confirmation>) -> Result<Self, EngineError> {
        let client = HttpDashboardClient::new(&settings.api)?;
        Ok(Self::new(Arc::new(client), confirmation, PageOptions::from_settings(settings)))
    }

    /// Runs the initial loads, then starts polling. Load failures are
    /// returned for logging; each one is already on its section's banner.
    pub async fn mount(&mut self) -> Vec<SyncError> {
        info!("Mounting dashboard page");
        let failures = self.load_all().await;
        if self.handle.is_none() {
            self.handle = Some(self.poller.start());
        }
        failures
    }

    /// Issues the portfolio, status, config and orders reads together. Each
    /// section succeeds or fails on its own.
    pub async fn load_all(&mut self) -> Vec<SyncError> {
        let (portfolio, status, config, orders) = tokio::join!(
            self.api.get_portfolio_summary(),
            self.api.get_status(),
            self.api.fetch_config(),
            self.api.fetch_orders(),
        );

        let mut failures = Vec::new();
        let mut portfolio_ok = true;

        match portfolio {
            Ok(summary) => self.portfolio = Some(summary),
            Err(source) => {
                portfolio_ok = false;
                failures.push(SyncError::PartialLoad {
                    section: Section::Portfolio,
                    source,
                });
            }
        }
        match status {
            Ok(status) => self.status = Some(status),
            Err(source) => {
                portfolio_ok = false;
                failures.push(SyncError::PartialLoad {
                    section: Section::Portfolio,
                    source,
                });
            }
        }
        if portfolio_ok {
            self.surface.clear(Section::Portfolio);
        } else {
            self.surface.error(Section::Portfolio, PORTFOLIO_LOAD_FAILED);
        }

        match config {
            Ok(config) => {
                self.config_form.load(Some(config));
                self.surface.clear(Section::Config);
            }
            Err(source) => {
                self.surface.warning(Section::Config, CONFIG_LOAD_FAILED);
                failures.push(SyncError::PartialLoad {
                    section: Section::Config,
                    source,
                });
            }
        }

        match orders {
            Ok(orders) => {
                self.orders = orders;
                self.surface.clear(Section::Orders);
            }
            Err(source) => {
                self.surface.warning(Section::Orders, ORDERS_LOAD_FAILED);
                failures.push(SyncError::PartialLoad {
                    section: Section::Orders,
                    source,
                });
            }
        }

        for failure in &failures {
            warn!(error = %failure, "Initial load failed");
        }
        failures
    }

    /// The bot's run state: the latest good snapshot wins, then the last
    /// status read. Unknown counts as stopped.
    pub fn running(&self) -> bool {
        self.poller
            .running()
            .or_else(|| self.status.as_ref().map(|s| s.running))
            .unwrap_or(false)
    }

    pub fn is_enabled(&self, action: ControlAction) -> bool {
        self.gate.is_enabled(action, self.running())
    }

    pub async fn control(&mut self, action: ControlAction) -> GateOutcome {
        let outcome = self.gate.invoke(action, self.running()).await;
        if let GateOutcome::Completed(Some(status)) = &outcome {
            self.status = Some(status.clone());
        }
        outcome
    }

    pub async fn save_config(&mut self) -> Result<BotConfig, SyncError> {
        self.config_form.save().await
    }

    pub fn config_form(&self) -> &ConfigFormModel {
        &self.config_form
    }

    pub fn config_form_mut(&mut self) -> &mut ConfigFormModel {
        &mut self.config_form
    }

    pub fn portfolio(&self) -> Option<&PortfolioSummary> {
        self.portfolio.as_ref()
    }

    pub fn status(&self) -> Option<&BotStatus> {
        self.status.as_ref()
    }

    pub fn orders(&self) -> &[OrderHistoryItem] {
        &self.orders
    }

    pub fn poller(&self) -> &SnapshotPoller {
        &self.poller
    }

    pub fn gate(&self) -> &ControlActionGate {
        &self.gate
    }

    pub fn surface(&self) -> &ErrorSurface {
        &self.surface
    }

    pub fn subscribe_frames(&self) -> FrameReceiver {
        self.poller.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DashboardEvent> {
        self.surface.subscribe()
    }

    /// Stops polling and waits for the poll task to finish. Nothing is
    /// published afterwards.
    pub async fn unmount(mut self) {
        match self.handle.take() {
            Some(handle) => handle.stop().await,
            None => self.poller.stop(),
        }
        info!("Dashboard page unmounted");
    }
}
