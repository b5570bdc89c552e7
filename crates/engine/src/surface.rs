use events::{Banner, BannerLevel, DashboardEvent, Section};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{info, warn};

const EVENT_CAPACITY: usize = 64;

/// Per-section banners for the whole page.
///
/// Each section holds at most one banner. Raising a banner in one section
/// never touches another, and every change is broadcast as a
/// [`DashboardEvent`].
#[derive(Clone)]
pub struct ErrorSurface {
    banners: Arc<Mutex<HashMap<Section, Banner>>>,
    events: broadcast::Sender<DashboardEvent>,
}

impl Default for ErrorSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorSurface {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            banners: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Section, Banner>> {
        // A panicking renderer must not take the banners down with it.
        self.banners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces the banner of `section`.
    pub fn raise(&self, section: Section, level: BannerLevel, message: impl Into<String>) {
        let banner = Banner::new(section, level, message);
        match level {
            BannerLevel::Success => info!(%section, message = %banner.message, "Banner raised"),
            BannerLevel::Warning | BannerLevel::Error => {
                warn!(%section, message = %banner.message, "Banner raised")
            }
        }
        self.lock().insert(section, banner.clone());
        self.emit(DashboardEvent::BannerRaised(banner));
    }

    pub fn error(&self, section: Section, message: impl Into<String>) {
        self.raise(section, BannerLevel::Error, message);
    }

    pub fn warning(&self, section: Section, message: impl Into<String>) {
        self.raise(section, BannerLevel::Warning, message);
    }

    pub fn success(&self, section: Section, message: impl Into<String>) {
        self.raise(section, BannerLevel::Success, message);
    }

    /// Removes the banner of `section`, if any. Clearing an empty section
    /// broadcasts nothing.
    pub fn clear(&self, section: Section) {
        let removed = self.lock().remove(&section);
        if removed.is_some() {
            self.emit(DashboardEvent::BannerCleared(section));
        }
    }

    pub fn banner(&self, section: Section) -> Option<Banner> {
        self.lock().get(&section).cloned()
    }

    /// All current banners in page order.
    pub fn banners(&self) -> Vec<Banner> {
        let banners = self.lock();
        Section::ALL
            .iter()
            .filter_map(|section| banners.get(section).cloned())
            .collect()
    }

    /// Broadcasts an event. Having no subscribers is not an error.
    pub fn emit(&self, event: DashboardEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_fail_and_recover_independently() {
        let surface = ErrorSurface::new();
        surface.warning(Section::Orders, "Failed to load recent orders.");
        surface.error(Section::Portfolio, "Failed to load dashboard data.");

        surface.clear(Section::Orders);
        assert!(surface.banner(Section::Orders).is_none());
        assert_eq!(
            surface.banner(Section::Portfolio).map(|b| b.message),
            Some("Failed to load dashboard data.".to_string())
        );
    }

    #[test]
    fn a_new_banner_replaces_the_old_one() {
        let surface = ErrorSurface::new();
        surface.error(Section::Control, "Failed to start the bot.");
        surface.success(Section::Control, "Start command sent.");

        let banners = surface.banners();
        assert_eq!(banners.len(), 1);
        assert_eq!(banners[0].level, BannerLevel::Success);
    }

    #[test]
    fn banners_are_listed_in_page_order() {
        let surface = ErrorSurface::new();
        surface.error(Section::Control, "c");
        surface.error(Section::Portfolio, "p");
        surface.warning(Section::Config, "f");

        let order: Vec<Section> = surface.banners().into_iter().map(|b| b.section).collect();
        assert_eq!(order, vec![Section::Portfolio, Section::Config, Section::Control]);
    }

    #[tokio::test]
    async fn changes_are_broadcast() {
        let surface = ErrorSurface::new();
        let mut rx = surface.subscribe();

        surface.error(Section::Orders, "Failed to load recent orders.");
        surface.clear(Section::Orders);
        surface.clear(Section::Orders);

        match rx.recv().await.unwrap() {
            DashboardEvent::BannerRaised(banner) => assert_eq!(banner.section, Section::Orders),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(rx.recv().await.unwrap(), DashboardEvent::BannerCleared(Section::Orders));
        assert!(rx.try_recv().is_err());
    }
}
