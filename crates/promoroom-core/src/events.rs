//! Reporting event records.
//!
//! Every lifecycle transition produces one record on the analytics stream.
//! The wire shape is `{"data":{"type":...,"stamp":...,...}}`; field names
//! are camelCase. Field order follows declaration order and is not
//! significant.

use serde::Serialize;

use crate::host::NotificationResult;

/// How a tab load was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TabType {
    Search,
    Click,
}

/// Notification lifecycle stage carried in `sustain` and `notify` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationEventType {
    Generated,
    Clicked,
    Dismissed,
    Timeout,
    Viewed,
}

impl From<NotificationResult> for NotificationEventType {
    fn from(result: NotificationResult) -> Self {
        match result {
            NotificationResult::Clicked => NotificationEventType::Clicked,
            NotificationResult::Dismissed => NotificationEventType::Dismissed,
            NotificationResult::Timeout => NotificationEventType::Timeout,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationsSettings {
    pub available: bool,
}

/// Body of the `settings` record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsBody {
    pub notifications: NotificationsSettings,
    pub place: String,
    pub locale: String,
    pub ads_per_day: u64,
    pub ads_per_hour: u64,
}

/// One record on the analytics stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventRecord {
    #[serde(rename_all = "camelCase")]
    Restart { stamp: String, place: String },

    #[serde(rename_all = "camelCase")]
    Foreground { stamp: String, place: String },

    #[serde(rename_all = "camelCase")]
    Background { stamp: String, place: String },

    #[serde(rename_all = "camelCase")]
    Focus { stamp: String, tab_id: i32 },

    #[serde(rename_all = "camelCase")]
    Blur { stamp: String, tab_id: i32 },

    #[serde(rename_all = "camelCase")]
    Destroy { stamp: String, tab_id: i32 },

    #[serde(rename_all = "camelCase")]
    Load {
        stamp: String,
        tab_id: i32,
        tab_type: TabType,
        tab_url: String,
        /// Hyphen-split segments of the last page classification.
        tab_classification: Vec<String>,
        /// Present only when the URL's score vector is cached.
        #[serde(skip_serializing_if = "Option::is_none")]
        page_score: Option<Vec<f64>>,
    },

    #[serde(rename_all = "camelCase")]
    Sustain {
        stamp: String,
        notification_id: String,
        notification_type: NotificationEventType,
    },

    #[serde(rename_all = "camelCase")]
    Notify {
        stamp: String,
        notification_type: NotificationEventType,
        notification_classification: Vec<String>,
        notification_catalog: String,
        notification_url: String,
    },

    #[serde(rename_all = "camelCase")]
    Settings { stamp: String, settings: SettingsBody },
}

impl EventRecord {
    /// Serialize to the canonical `{"data":{...}}` envelope.
    pub fn to_wire_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Envelope<'a> {
            data: &'a EventRecord,
        }

        serde_json::to_string(&Envelope { data: self })
    }
}
