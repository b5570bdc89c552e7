use crate::error::SyncError;
use crate::poller::SnapshotPoller;
use crate::surface::ErrorSurface;
use api_client::DashboardApi;
use async_trait::async_trait;
use core_types::BotStatus;
use events::Section;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub const LIQUIDATE_PROMPT: &str = "Liquidate every holding at market price?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Start,
    Stop,
    Liquidate,
}

impl ControlAction {
    pub fn label(&self) -> &'static str {
        match self {
            ControlAction::Start => "start",
            ControlAction::Stop => "stop",
            ControlAction::Liquidate => "liquidate",
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            ControlAction::Start => "Start command sent.",
            ControlAction::Stop => "Stop command sent.",
            ControlAction::Liquidate => "Liquidation request sent.",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            ControlAction::Start => "Failed to start the bot.",
            ControlAction::Stop => "Failed to stop the bot.",
            ControlAction::Liquidate => "Liquidation request failed.",
        }
    }

    /// Whether the control is offered in the given run state. Liquidation is
    /// always offered.
    pub fn allowed_when(&self, running: bool) -> bool {
        match self {
            ControlAction::Start => !running,
            ControlAction::Stop => running,
            ControlAction::Liquidate => true,
        }
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The action currently holding the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveAction {
    #[default]
    None,
    Start,
    Stop,
    Liquidate,
}

impl From<ControlAction> for ActiveAction {
    fn from(action: ControlAction) -> Self {
        match action {
            ControlAction::Start => ActiveAction::Start,
            ControlAction::Stop => ActiveAction::Stop,
            ControlAction::Liquidate => ActiveAction::Liquidate,
        }
    }
}

#[derive(Debug)]
pub enum GateOutcome {
    /// Another action was in flight; nothing was sent.
    Ignored,
    /// The control is not offered in the current run state.
    Disabled,
    /// The operator declined the confirmation; nothing was sent.
    Declined,
    /// The backend accepted the command. Start and stop carry the status the
    /// backend reported.
    Completed(Option<BotStatus>),
    Failed(SyncError),
}

/// Asks the operator to confirm a destructive action.
#[async_trait]
pub trait Confirmation: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// A confirmation with a predetermined answer.
pub struct FixedConfirmation(pub bool);

#[async_trait]
impl Confirmation for FixedConfirmation {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

/// Holds the gate for one action and releases it on drop, whichever way the
/// action ends.
struct ActionGuard {
    slot: Arc<Mutex<ActiveAction>>,
}

impl Drop for ActionGuard {
    fn drop(&mut self) {
        *lock(&self.slot) = ActiveAction::None;
    }
}

fn lock(slot: &Mutex<ActiveAction>) -> MutexGuard<'_, ActiveAction> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Single-flight guard over start, stop and liquidate.
///
/// At most one of the three is in flight at any time. A successful command
/// triggers exactly one snapshot refresh.
#[derive(Clone)]
pub struct ControlActionGate {
    api: Arc<dyn DashboardApi>,
    poller: SnapshotPoller,
    surface: ErrorSurface,
    confirmation: Arc<dyn Confirmation>,
    active: Arc<Mutex<ActiveAction>>,
}

impl ControlActionGate {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        poller: SnapshotPoller,
        surface: ErrorSurface,
        confirmation: Arc<dyn Confirmation>,
    ) -> Self {
        Self {
            api,
            poller,
            surface,
            confirmation,
            active: Arc::new(Mutex::new(ActiveAction::None)),
        }
    }

    pub fn active(&self) -> ActiveAction {
        *lock(&self.active)
    }

    /// Whether the control for `action` would currently accept input.
    pub fn is_enabled(&self, action: ControlAction, running: bool) -> bool {
        self.active() == ActiveAction::None && action.allowed_when(running)
    }

    fn try_claim(&self, action: ControlAction) -> Option<ActionGuard> {
        let mut active = lock(&self.active);
        if *active != ActiveAction::None {
            return None;
        }
        *active = action.into();
        Some(ActionGuard {
            slot: Arc::clone(&self.active),
        })
    }

    pub async fn invoke(&self, action: ControlAction, running: bool) -> GateOutcome {
        if self.active() != ActiveAction::None {
            debug!(%action, active = ?self.active(), "Control busy, ignoring");
            return GateOutcome::Ignored;
        }
        if !action.allowed_when(running) {
            debug!(%action, running, "Control disabled in current run state");
            return GateOutcome::Disabled;
        }

        if action == ControlAction::Liquidate && !self.confirmation.confirm(LIQUIDATE_PROMPT).await {
            info!("Liquidation declined by operator");
            return GateOutcome::Declined;
        }

        // Another action may have claimed the gate while confirmation was pending.
        let Some(_guard) = self.try_claim(action) else {
            debug!(%action, "Control busy, ignoring");
            return GateOutcome::Ignored;
        };
        self.surface.clear(Section::Control);
        info!(%action, "Sending bot command");

        let result = match action {
            ControlAction::Start => self.api.start_bot().await.map(Some),
            ControlAction::Stop => self.api.stop_bot().await.map(Some),
            ControlAction::Liquidate => self.api.liquidate().await.map(|()| None),
        };

        match result {
            Ok(status) => {
                self.surface.success(Section::Control, action.success_message());
                self.poller.refresh().await;
                GateOutcome::Completed(status)
            }
            Err(source) => {
                let message = source
                    .detail()
                    .map(str::to_string)
                    .unwrap_or_else(|| action.failure_message().to_string());
                let err = SyncError::Command {
                    action: action.label(),
                    source,
                };
                warn!(error = %err, "Bot command failed");
                self.surface.error(Section::Control, message);
                GateOutcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{running_snapshot, MockApi, Outcome};
    use events::BannerLevel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingConfirmation {
        answer: bool,
        asked: AtomicUsize,
    }

    #[async_trait]
    impl Confirmation for CountingConfirmation {
        async fn confirm(&self, _prompt: &str) -> bool {
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    fn gate(api: &Arc<MockApi>, surface: &ErrorSurface, confirm: Arc<dyn Confirmation>) -> ControlActionGate {
        let poller = SnapshotPoller::new(api.clone(), surface.clone(), "/api/dashboard", Duration::from_secs(15));
        ControlActionGate::new(api.clone(), poller, surface.clone(), confirm)
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_starts_send_one_request() {
        let api = Arc::new(MockApi::new());
        api.script(
            "start_bot",
            Duration::from_secs(1),
            Outcome::Status(BotStatus {
                running: true,
                ..BotStatus::default()
            }),
        );
        let surface = ErrorSurface::new();
        let gate = gate(&api, &surface, Arc::new(FixedConfirmation(true)));

        let (first, second) = tokio::join!(
            gate.invoke(ControlAction::Start, false),
            gate.invoke(ControlAction::Start, false)
        );

        assert!(matches!(first, GateOutcome::Completed(Some(ref s)) if s.running));
        assert!(matches!(second, GateOutcome::Ignored));
        assert_eq!(api.calls("start_bot"), 1);
        assert_eq!(gate.active(), ActiveAction::None);
    }

    #[tokio::test(start_paused = true)]
    async fn every_control_is_disabled_while_one_is_in_flight() {
        let api = Arc::new(MockApi::new());
        api.script("stop_bot", Duration::from_secs(1), Outcome::Status(BotStatus::default()));
        let gate = gate(&api, &ErrorSurface::new(), Arc::new(FixedConfirmation(true)));

        let (_, ()) = tokio::join!(gate.invoke(ControlAction::Stop, true), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(gate.active(), ActiveAction::Stop);
            assert!(!gate.is_enabled(ControlAction::Start, false));
            assert!(!gate.is_enabled(ControlAction::Stop, true));
            assert!(!gate.is_enabled(ControlAction::Liquidate, true));
            assert!(matches!(
                gate.invoke(ControlAction::Liquidate, true).await,
                GateOutcome::Ignored
            ));
        });

        assert!(gate.is_enabled(ControlAction::Start, false));
        assert_eq!(api.calls("liquidate"), 0);
    }

    #[tokio::test]
    async fn run_state_disables_start_and_stop() {
        let api = Arc::new(MockApi::new());
        let gate = gate(&api, &ErrorSurface::new(), Arc::new(FixedConfirmation(true)));

        assert!(matches!(gate.invoke(ControlAction::Start, true).await, GateOutcome::Disabled));
        assert!(matches!(gate.invoke(ControlAction::Stop, false).await, GateOutcome::Disabled));
        assert_eq!(api.calls("start_bot") + api.calls("stop_bot"), 0);
    }

    #[tokio::test]
    async fn declined_liquidation_sends_nothing() {
        let api = Arc::new(MockApi::new());
        let surface = ErrorSurface::new();
        let confirm = Arc::new(CountingConfirmation {
            answer: false,
            asked: AtomicUsize::new(0),
        });
        let gate = gate(&api, &surface, confirm.clone());

        let outcome = gate.invoke(ControlAction::Liquidate, true).await;

        assert!(matches!(outcome, GateOutcome::Declined));
        assert_eq!(confirm.asked.load(Ordering::SeqCst), 1);
        assert_eq!(api.calls("liquidate"), 0);
        assert_eq!(gate.active(), ActiveAction::None);
        assert!(surface.banner(Section::Control).is_none());
    }

    #[tokio::test]
    async fn success_acknowledges_and_refreshes_once() {
        let api = Arc::new(MockApi::new());
        api.reply("fetch_snapshot", Outcome::Snapshot(running_snapshot(false, "after")));
        let surface = ErrorSurface::new();
        let gate = gate(&api, &surface, Arc::new(FixedConfirmation(true)));

        let outcome = gate.invoke(ControlAction::Liquidate, false).await;

        assert!(matches!(outcome, GateOutcome::Completed(None)));
        assert_eq!(api.calls("liquidate"), 1);
        assert_eq!(api.calls("fetch_snapshot"), 1);
        let banner = surface.banner(Section::Control).unwrap();
        assert_eq!(banner.level, BannerLevel::Success);
        assert_eq!(banner.message, "Liquidation request sent.");
    }

    #[tokio::test]
    async fn failure_releases_the_gate_and_prefers_backend_detail() {
        let api = Arc::new(MockApi::new());
        api.fail("start_bot", 409, Some("Bot is already running."));
        api.fail("start_bot", 500, None);
        let surface = ErrorSurface::new();
        let gate = gate(&api, &surface, Arc::new(FixedConfirmation(true)));

        let outcome = gate.invoke(ControlAction::Start, false).await;
        assert!(matches!(outcome, GateOutcome::Failed(SyncError::Command { action: "start", .. })));
        assert_eq!(gate.active(), ActiveAction::None);
        assert_eq!(surface.banner(Section::Control).unwrap().message, "Bot is already running.");

        gate.invoke(ControlAction::Start, false).await;
        assert_eq!(surface.banner(Section::Control).unwrap().message, "Failed to start the bot.");
        assert_eq!(api.calls("fetch_snapshot"), 0);
    }
}
