use crate::error::EventsError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An independently loaded and independently failing part of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    Portfolio,
    Config,
    Orders,
    Snapshot,
    Control,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Portfolio,
        Section::Config,
        Section::Orders,
        Section::Snapshot,
        Section::Control,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Section::Portfolio => "portfolio",
            Section::Config => "config",
            Section::Orders => "orders",
            Section::Snapshot => "snapshot",
            Section::Control => "control",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BannerLevel {
    Success,
    Warning,
    Error,
}

/// A message pinned to one section until that section next succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub section: Section,
    pub level: BannerLevel,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

impl Banner {
    pub fn new(section: Section, level: BannerLevel, message: impl Into<String>) -> Self {
        Self {
            section,
            level,
            message: message.into(),
            raised_at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.level, BannerLevel::Error | BannerLevel::Warning)
    }
}

/// The outcome of one snapshot read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncNotice {
    pub request_id: u64,
    pub ok: bool,
    /// The backend's own sync label, when the read succeeded.
    pub synced_at: Option<String>,
    pub at: DateTime<Utc>,
}

/// The top-level event enum.
///
/// Serialized adjacently tagged, e.g.
/// `{"type":"BannerCleared","payload":"Orders"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum DashboardEvent {
    BannerRaised(Banner),
    BannerCleared(Section),
    Synced(SyncNotice),
}

impl DashboardEvent {
    pub fn to_json(&self) -> Result<String, EventsError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn events_serialize_with_type_and_payload() {
        let cleared = DashboardEvent::BannerCleared(Section::Orders).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&cleared).unwrap();
        assert_eq!(value, json!({"type": "BannerCleared", "payload": "Orders"}));

        let raised = DashboardEvent::BannerRaised(Banner::new(
            Section::Control,
            BannerLevel::Error,
            "Failed to start the bot.",
        ));
        let value: serde_json::Value = serde_json::from_str(&raised.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "BannerRaised");
        assert_eq!(value["payload"]["section"], "Control");
        assert_eq!(value["payload"]["level"], "Error");
        assert_eq!(value["payload"]["message"], "Failed to start the bot.");
    }

    #[test]
    fn success_banners_are_not_errors() {
        assert!(!Banner::new(Section::Config, BannerLevel::Success, "saved").is_error());
        assert!(Banner::new(Section::Orders, BannerLevel::Warning, "x").is_error());
    }
}
