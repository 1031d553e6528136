//! Record emission on the analytics stream.
//!
//! The reporter owns the first-run flag: the first `notify` record of a run
//! (shown or result) is preceded by a `restart` record. Other record types
//! never trigger the prefix. Emission order matches call order; nothing is
//! buffered or reordered here.

use chrono::SecondsFormat;
use tracing::warn;

use crate::ad::NotificationInfo;
use crate::category;
use crate::events::{
    EventRecord, NotificationEventType, NotificationsSettings, SettingsBody, TabType,
};
use crate::host::{AdsHost, NotificationResult};

/// Catalog label carried by `notify` records.
fn catalog_label(info: &NotificationInfo) -> String {
    if info.creative_set_id.is_empty() {
        "sample-catalog".to_string()
    } else {
        info.creative_set_id.clone()
    }
}

#[derive(Debug)]
pub struct Reporter {
    is_first_run: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    pub fn new() -> Self {
        Self { is_first_run: true }
    }

    /// Restore first-run semantics (used on deinitialization).
    pub fn reset(&mut self) {
        self.is_first_run = true;
    }

    pub fn is_first_run(&self) -> bool {
        self.is_first_run
    }

    fn stamp(host: &dyn AdsHost) -> String {
        host.now().to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn emit(host: &dyn AdsHost, record: &EventRecord) {
        match record.to_wire_json() {
            Ok(json) => host.event_log(&json),
            Err(err) => warn!("failed to serialize reporting event: {err}"),
        }
    }

    fn prefix_restart_on_first_run(&mut self, host: &dyn AdsHost, place: &str) {
        if !self.is_first_run {
            return;
        }
        self.is_first_run = false;
        self.restart(host, place);
    }

    pub fn restart(&self, host: &dyn AdsHost, place: &str) {
        Self::emit(
            host,
            &EventRecord::Restart {
                stamp: Self::stamp(host),
                place: place.to_string(),
            },
        );
    }

    pub fn foreground(&self, host: &dyn AdsHost, place: &str) {
        Self::emit(
            host,
            &EventRecord::Foreground {
                stamp: Self::stamp(host),
                place: place.to_string(),
            },
        );
    }

    pub fn background(&self, host: &dyn AdsHost, place: &str) {
        Self::emit(
            host,
            &EventRecord::Background {
                stamp: Self::stamp(host),
                place: place.to_string(),
            },
        );
    }

    pub fn focus(&self, host: &dyn AdsHost, tab_id: i32) {
        Self::emit(
            host,
            &EventRecord::Focus {
                stamp: Self::stamp(host),
                tab_id,
            },
        );
    }

    pub fn blur(&self, host: &dyn AdsHost, tab_id: i32) {
        Self::emit(
            host,
            &EventRecord::Blur {
                stamp: Self::stamp(host),
                tab_id,
            },
        );
    }

    pub fn destroy(&self, host: &dyn AdsHost, tab_id: i32) {
        Self::emit(
            host,
            &EventRecord::Destroy {
                stamp: Self::stamp(host),
                tab_id,
            },
        );
    }

    pub fn load(
        &self,
        host: &dyn AdsHost,
        tab_id: i32,
        tab_type: TabType,
        tab_url: &str,
        tab_classification: Vec<String>,
        page_score: Option<Vec<f64>>,
    ) {
        Self::emit(
            host,
            &EventRecord::Load {
                stamp: Self::stamp(host),
                tab_id,
                tab_type,
                tab_url: tab_url.to_string(),
                tab_classification,
                page_score,
            },
        );
    }

    pub fn sustain(&self, host: &dyn AdsHost, info: &NotificationInfo) {
        Self::emit(
            host,
            &EventRecord::Sustain {
                stamp: Self::stamp(host),
                notification_id: info.uuid.clone(),
                notification_type: NotificationEventType::Viewed,
            },
        );
    }

    /// The host displayed a notification.
    pub fn notification_shown(&mut self, host: &dyn AdsHost, info: &NotificationInfo, place: &str) {
        self.prefix_restart_on_first_run(host, place);
        Self::emit(
            host,
            &EventRecord::Notify {
                stamp: Self::stamp(host),
                notification_type: NotificationEventType::Generated,
                notification_classification: category::split_segments(&info.category),
                notification_catalog: catalog_label(info),
                notification_url: info.url.clone(),
            },
        );
    }

    /// The user resolved a notification.
    pub fn notification_result(
        &mut self,
        host: &dyn AdsHost,
        info: &NotificationInfo,
        result: NotificationResult,
        place: &str,
    ) {
        self.prefix_restart_on_first_run(host, place);
        Self::emit(
            host,
            &EventRecord::Notify {
                stamp: Self::stamp(host),
                notification_type: result.into(),
                notification_classification: category::split_segments(&info.category),
                notification_catalog: catalog_label(info),
                notification_url: info.url.clone(),
            },
        );
    }

    pub fn settings(&self, host: &dyn AdsHost, place: &str, locale: &str) {
        Self::emit(
            host,
            &EventRecord::Settings {
                stamp: Self::stamp(host),
                settings: SettingsBody {
                    notifications: NotificationsSettings {
                        available: host.is_notifications_available(),
                    },
                    place: place.to_string(),
                    locale: locale.to_string(),
                    ads_per_day: host.get_ads_per_day(),
                    ads_per_hour: host.get_ads_per_hour(),
                },
            },
        );
    }
}
