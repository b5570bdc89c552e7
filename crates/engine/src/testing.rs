//! A scripted `DashboardApi` for engine tests.

use api_client::error::ApiError;
use api_client::DashboardApi;
use async_trait::async_trait;
use core_types::{BotConfig, BotStatus, OrderHistoryItem, PortfolioSummary, Snapshot};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) enum Outcome {
    Snapshot(Snapshot),
    Status(BotStatus),
    Config(BotConfig),
    Portfolio(PortfolioSummary),
    Orders(Vec<OrderHistoryItem>),
    Fail { status: u16, detail: Option<&'static str> },
}

struct Script {
    delay: Duration,
    outcome: Outcome,
}

/// Each endpoint pops its own queue of scripted replies and falls back to a
/// default success when the queue is empty. `update_config` echoes its input.
#[derive(Default)]
pub(crate) struct MockApi {
    scripts: Mutex<HashMap<&'static str, VecDeque<Script>>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    saved: Mutex<Vec<BotConfig>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, method: &'static str, delay: Duration, outcome: Outcome) {
        self.scripts
            .lock()
            .unwrap()
            .entry(method)
            .or_default()
            .push_back(Script { delay, outcome });
    }

    pub fn reply(&self, method: &'static str, outcome: Outcome) {
        self.script(method, Duration::ZERO, outcome);
    }

    pub fn fail(&self, method: &'static str, status: u16, detail: Option<&'static str>) {
        self.reply(method, Outcome::Fail { status, detail });
    }

    pub fn calls(&self, method: &'static str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    pub fn saved(&self) -> Vec<BotConfig> {
        self.saved.lock().unwrap().clone()
    }

    async fn next(&self, method: &'static str) -> Option<Outcome> {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(|queue| queue.pop_front());
        match script {
            Some(script) => {
                if !script.delay.is_zero() {
                    tokio::time::sleep(script.delay).await;
                }
                Some(script.outcome)
            }
            None => None,
        }
    }
}

fn failure(status: u16, detail: Option<&'static str>) -> ApiError {
    ApiError::Status {
        status,
        detail: detail.map(str::to_string),
    }
}

macro_rules! unexpected {
    ($method:expr) => {
        panic!("scripted outcome does not match {}", $method)
    };
}

#[async_trait]
impl DashboardApi for MockApi {
    async fn fetch_snapshot(&self) -> Result<Snapshot, ApiError> {
        match self.next("fetch_snapshot").await {
            None => Ok(Snapshot::default()),
            Some(Outcome::Snapshot(s)) => Ok(s),
            Some(Outcome::Fail { status, detail }) => Err(failure(status, detail)),
            Some(_) => unexpected!("fetch_snapshot"),
        }
    }

    async fn get_portfolio_summary(&self) -> Result<PortfolioSummary, ApiError> {
        match self.next("get_portfolio_summary").await {
            None => Ok(PortfolioSummary::default()),
            Some(Outcome::Portfolio(p)) => Ok(p),
            Some(Outcome::Fail { status, detail }) => Err(failure(status, detail)),
            Some(_) => unexpected!("get_portfolio_summary"),
        }
    }

    async fn get_status(&self) -> Result<BotStatus, ApiError> {
        match self.next("get_status").await {
            None => Ok(BotStatus::default()),
            Some(Outcome::Status(s)) => Ok(s),
            Some(Outcome::Fail { status, detail }) => Err(failure(status, detail)),
            Some(_) => unexpected!("get_status"),
        }
    }

    async fn fetch_config(&self) -> Result<BotConfig, ApiError> {
        match self.next("fetch_config").await {
            None => Ok(BotConfig::default()),
            Some(Outcome::Config(c)) => Ok(c),
            Some(Outcome::Fail { status, detail }) => Err(failure(status, detail)),
            Some(_) => unexpected!("fetch_config"),
        }
    }

    async fn update_config(&self, config: &BotConfig) -> Result<BotConfig, ApiError> {
        self.saved.lock().unwrap().push(config.clone());
        match self.next("update_config").await {
            None => Ok(config.clone()),
            Some(Outcome::Config(c)) => Ok(c),
            Some(Outcome::Fail { status, detail }) => Err(failure(status, detail)),
            Some(_) => unexpected!("update_config"),
        }
    }

    async fn start_bot(&self) -> Result<BotStatus, ApiError> {
        match self.next("start_bot").await {
            None => Ok(BotStatus {
                running: true,
                ..BotStatus::default()
            }),
            Some(Outcome::Status(s)) => Ok(s),
            Some(Outcome::Fail { status, detail }) => Err(failure(status, detail)),
            Some(_) => unexpected!("start_bot"),
        }
    }

    async fn stop_bot(&self) -> Result<BotStatus, ApiError> {
        match self.next("stop_bot").await {
            None => Ok(BotStatus::default()),
            Some(Outcome::Status(s)) => Ok(s),
            Some(Outcome::Fail { status, detail }) => Err(failure(status, detail)),
            Some(_) => unexpected!("stop_bot"),
        }
    }

    async fn liquidate(&self) -> Result<(), ApiError> {
        match self.next("liquidate").await {
            None => Ok(()),
            Some(Outcome::Fail { status, detail }) => Err(failure(status, detail)),
            Some(_) => unexpected!("liquidate"),
        }
    }

    async fn fetch_orders(&self) -> Result<Vec<OrderHistoryItem>, ApiError> {
        match self.next("fetch_orders").await {
            None => Ok(Vec::new()),
            Some(Outcome::Orders(o)) => Ok(o),
            Some(Outcome::Fail { status, detail }) => Err(failure(status, detail)),
            Some(_) => unexpected!("fetch_orders"),
        }
    }
}

pub(crate) fn running_snapshot(running: bool, synced_at: &str) -> Snapshot {
    Snapshot {
        synced_at: Some(synced_at.to_string()),
        status: BotStatus {
            running,
            ..BotStatus::default()
        },
        ..Snapshot::default()
    }
}
