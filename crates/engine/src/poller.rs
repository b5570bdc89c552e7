use crate::error::SyncError;
use crate::surface::ErrorSurface;
use api_client::error::ApiError;
use api_client::DashboardApi;
use chrono::Utc;
use core_types::Snapshot;
use events::{DashboardEvent, Section, SyncNotice};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use view_model::{DashboardView, ViewModelBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Fetching,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncStatus {
    Synced,
    Failed(String),
}

/// One published result of a snapshot read.
#[derive(Debug, Clone)]
pub struct DashboardFrame {
    pub request_id: u64,
    /// The last good snapshot. After a failed read this is the one the
    /// widgets still show, or `None` if no read has succeeded yet.
    pub snapshot: Option<Arc<Snapshot>>,
    pub view: DashboardView,
    pub sync: SyncStatus,
}

impl DashboardFrame {
    pub fn is_synced(&self) -> bool {
        self.sync == SyncStatus::Synced
    }

    pub fn warnings(&self) -> &[String] {
        self.snapshot.as_deref().map(|s| s.warnings.as_slice()).unwrap_or(&[])
    }
}

pub type FrameReceiver = watch::Receiver<Option<Arc<DashboardFrame>>>;

struct Published {
    last_id: u64,
    stopped: bool,
    last_good: Option<Arc<Snapshot>>,
}

struct Inner {
    api: Arc<dyn DashboardApi>,
    builder: ViewModelBuilder,
    surface: ErrorSurface,
    failure_message: String,
    next_id: AtomicU64,
    in_flight: AtomicUsize,
    published: Mutex<Published>,
    frames: watch::Sender<Option<Arc<DashboardFrame>>>,
    cancel: CancellationToken,
}

/// Counts a fetch as in flight for as long as it lives, including when the
/// fetch future is dropped mid-request.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Periodically reads the dashboard snapshot and publishes a frame per read.
///
/// Every read takes a request id when it is issued. A result is published
/// only if its id is newer than the last published one, so a slow scheduled
/// poll can never overwrite a faster manual refresh. Once [`stop`] returns,
/// nothing is published again.
///
/// [`stop`]: SnapshotPoller::stop
#[derive(Clone)]
pub struct SnapshotPoller {
    inner: Arc<Inner>,
    interval: Duration,
}

impl SnapshotPoller {
    /// `snapshot_path` is the path named in load-failure messages.
    pub fn new(
        api: Arc<dyn DashboardApi>,
        surface: ErrorSurface,
        snapshot_path: impl Into<String>,
        interval: Duration,
    ) -> Self {
        let snapshot_path = snapshot_path.into();
        let (frames, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                api,
                builder: ViewModelBuilder::new(snapshot_path.clone()),
                surface,
                failure_message: format!("Failed to fetch {snapshot_path}"),
                next_id: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                published: Mutex::new(Published {
                    last_id: 0,
                    stopped: false,
                    last_good: None,
                }),
                frames,
                cancel: CancellationToken::new(),
            }),
            interval,
        }
    }

    /// Spawns the poll loop. The first read happens immediately.
    pub fn start(&self) -> PollerHandle {
        info!(interval_ms = self.interval.as_millis() as u64, "Starting snapshot poller");
        let poller = self.clone();
        let cancel = self.inner.cancel.clone();
        let task = tokio::spawn(async move { poller.run(cancel).await });
        PollerHandle {
            poller: self.clone(),
            task: Some(task),
        }
    }

    async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.poll_once() => {}
            }
        }
        debug!("Snapshot poll loop exited");
    }

    /// Reads the snapshot now, outside the schedule. Returns the published
    /// frame, or `None` if the result was stale or the poller is stopped.
    pub async fn refresh(&self) -> Option<Arc<DashboardFrame>> {
        self.poll_once().await
    }

    async fn poll_once(&self) -> Option<Arc<DashboardFrame>> {
        if self.is_stopped() {
            return None;
        }
        let request_id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let result = {
            let _in_flight = InFlight::enter(&self.inner.in_flight);
            debug!(request_id, "Fetching snapshot");
            self.inner.api.fetch_snapshot().await
        };
        self.inner.publish(request_id, result)
    }

    /// Stops the schedule and blocks every later publish, including those of
    /// reads already in flight.
    pub fn stop(&self) {
        {
            let mut published = self.inner.lock_published();
            if published.stopped {
                return;
            }
            published.stopped = true;
        }
        self.inner.cancel.cancel();
        info!("Snapshot poller stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.lock_published().stopped
    }

    pub fn subscribe(&self) -> FrameReceiver {
        self.inner.frames.subscribe()
    }

    pub fn latest(&self) -> Option<Arc<DashboardFrame>> {
        self.inner.frames.borrow().clone()
    }

    pub fn state(&self) -> PollState {
        if self.inner.in_flight.load(Ordering::SeqCst) > 0 {
            PollState::Fetching
        } else {
            PollState::Idle
        }
    }

    pub fn last_good(&self) -> Option<Arc<Snapshot>> {
        self.inner.lock_published().last_good.clone()
    }

    /// Run state from the last good snapshot, if any read has succeeded.
    pub fn running(&self) -> Option<bool> {
        self.last_good().map(|s| s.status.running)
    }
}

impl Inner {
    fn lock_published(&self) -> MutexGuard<'_, Published> {
        self.published.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, request_id: u64, result: Result<Snapshot, ApiError>) -> Option<Arc<DashboardFrame>> {
        let mut published = self.lock_published();
        if published.stopped {
            debug!(request_id, "Poller stopped, dropping snapshot result");
            return None;
        }
        if request_id <= published.last_id {
            debug!(request_id, last_id = published.last_id, "Dropping stale snapshot result");
            return None;
        }
        published.last_id = request_id;

        let (frame, notice) = match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                published.last_good = Some(Arc::clone(&snapshot));
                for warning in &snapshot.warnings {
                    debug!(%warning, "Backend reported a warning");
                }
                self.surface.clear(Section::Snapshot);
                let notice = SyncNotice {
                    request_id,
                    ok: true,
                    synced_at: snapshot.synced_at.clone(),
                    at: Utc::now(),
                };
                let frame = DashboardFrame {
                    request_id,
                    view: self.builder.build(&snapshot),
                    snapshot: Some(snapshot),
                    sync: SyncStatus::Synced,
                };
                (frame, notice)
            }
            Err(source) => {
                let err = SyncError::TransientFetch(source);
                warn!(request_id, error = %err, "Snapshot poll failed");
                let previous = self.frames.borrow().as_ref().map(|frame| frame.view.clone());
                self.surface.error(Section::Snapshot, self.failure_message.clone());
                let notice = SyncNotice {
                    request_id,
                    ok: false,
                    synced_at: None,
                    at: Utc::now(),
                };
                let frame = DashboardFrame {
                    request_id,
                    view: self.builder.load_failed(previous.as_ref()),
                    snapshot: published.last_good.clone(),
                    sync: SyncStatus::Failed(err.to_string()),
                };
                (frame, notice)
            }
        };

        let frame = Arc::new(frame);
        self.frames.send_replace(Some(Arc::clone(&frame)));
        self.surface.emit(DashboardEvent::Synced(notice));
        Some(frame)
    }
}

/// Owns the spawned poll loop.
pub struct PollerHandle {
    poller: SnapshotPoller,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn poller(&self) -> &SnapshotPoller {
        &self.poller
    }

    /// Stops the poller and waits for the loop to exit.
    pub async fn stop(mut self) {
        self.poller.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!("Snapshot poll loop panicked: {e}");
                }
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.poller.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{running_snapshot, MockApi, Outcome};
    use core_types::AlertLevel;

    const INTERVAL: Duration = Duration::from_secs(15);

    fn poller(api: &Arc<MockApi>, surface: &ErrorSurface) -> SnapshotPoller {
        SnapshotPoller::new(api.clone(), surface.clone(), "/api/dashboard", INTERVAL)
    }

    #[tokio::test(start_paused = true)]
    async fn first_read_is_immediate_then_once_per_interval() {
        let api = Arc::new(MockApi::new());
        let poller = poller(&api, &ErrorSurface::new());
        let mut frames = poller.subscribe();

        let handle = poller.start();
        frames.changed().await.unwrap();
        assert_eq!(api.calls("fetch_snapshot"), 1);

        tokio::time::sleep(Duration::from_secs(14)).await;
        assert_eq!(api.calls("fetch_snapshot"), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(api.calls("fetch_snapshot"), 2);
        assert_eq!(poller.latest().unwrap().request_id, 2);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failures_degrade_the_frame_and_polling_continues() {
        let api = Arc::new(MockApi::new());
        let surface = ErrorSurface::new();
        api.fail("fetch_snapshot", 503, None);
        api.fail("fetch_snapshot", 500, Some("database locked"));
        api.reply("fetch_snapshot", Outcome::Snapshot(running_snapshot(true, "10:00:30 KST")));

        let poller = poller(&api, &surface);
        let mut frames = poller.subscribe();
        let handle = poller.start();

        frames.changed().await.unwrap();
        let first = frames.borrow_and_update().clone().unwrap();
        assert!(!first.is_synced());
        assert!(first.snapshot.is_none());
        assert_eq!(first.view.header.sync, "Last Sync failed");
        assert_eq!(first.view.alerts.len(), 1);
        assert_eq!(first.view.alerts[0].level, AlertLevel::Danger);
        assert_eq!(first.view.alerts[0].message, "Failed to fetch /api/dashboard");
        assert!(surface.banner(Section::Snapshot).is_some());

        frames.changed().await.unwrap();
        let second = frames.borrow_and_update().clone().unwrap();
        assert_eq!(second.request_id, 2);
        assert!(!second.is_synced());

        frames.changed().await.unwrap();
        let third = frames.borrow_and_update().clone().unwrap();
        assert!(third.is_synced());
        assert_eq!(third.view.header.sync, "Last Sync 10:00:30 KST");
        assert_eq!(third.view.alerts[0].title, "Stable");
        assert!(surface.banner(Section::Snapshot).is_none());
        assert_eq!(poller.running(), Some(true));

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_read_keeps_last_good_widgets() {
        let api = Arc::new(MockApi::new());
        let mut good = running_snapshot(true, "09:00:00 KST");
        good.metrics.total_asset_krw = Some(2_000_000.0);
        api.reply("fetch_snapshot", Outcome::Snapshot(good));
        api.fail("fetch_snapshot", 502, None);

        let poller = poller(&api, &ErrorSurface::new());
        poller.refresh().await.unwrap();
        let failed = poller.refresh().await.unwrap();

        assert_eq!(failed.view.headline.total_asset, "KRW 2,000,000");
        assert_eq!(failed.view.header.sync, "Last Sync failed");
        assert_eq!(
            failed.snapshot.as_ref().and_then(|s| s.synced_at.clone()).as_deref(),
            Some("09:00:00 KST")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn a_slow_read_never_overwrites_a_newer_one() {
        let api = Arc::new(MockApi::new());
        api.script(
            "fetch_snapshot",
            Duration::from_secs(5),
            Outcome::Snapshot(running_snapshot(false, "slow")),
        );
        api.reply("fetch_snapshot", Outcome::Snapshot(running_snapshot(true, "fast")));
        let poller = poller(&api, &ErrorSurface::new());

        let (slow, fast) = tokio::join!(poller.refresh(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            poller.refresh().await
        });

        assert!(slow.is_none());
        assert_eq!(fast.unwrap().request_id, 2);
        let latest = poller.latest().unwrap();
        assert_eq!(latest.view.header.sync, "Last Sync fast");
        assert_eq!(poller.running(), Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_published_after_stop() {
        let api = Arc::new(MockApi::new());
        api.script(
            "fetch_snapshot",
            Duration::from_secs(5),
            Outcome::Snapshot(running_snapshot(true, "late")),
        );
        let poller = poller(&api, &ErrorSurface::new());

        let (late, ()) = tokio::join!(poller.refresh(), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert_eq!(poller.state(), PollState::Fetching);
            poller.stop();
        });

        assert!(late.is_none());
        assert!(poller.latest().is_none());
        assert_eq!(poller.state(), PollState::Idle);
        assert!(poller.refresh().await.is_none());
        assert_eq!(api.calls("fetch_snapshot"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_the_handle_ends_the_schedule() {
        let api = Arc::new(MockApi::new());
        let poller = poller(&api, &ErrorSurface::new());
        let mut frames = poller.subscribe();

        let handle = poller.start();
        frames.changed().await.unwrap();
        handle.stop().await;

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.calls("fetch_snapshot"), 1);
        assert!(poller.is_stopped());
    }
}
