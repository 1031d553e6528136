//! Host capability seam.
//!
//! The engine owns decisioning policy only; every side effect goes through
//! [`AdsHost`], implemented by the embedding application. Calls that
//! complete asynchronously are requests: the host answers each one exactly
//! once, on the engine thread, by invoking the matching completion entry
//! point on [`AdsEngine`](crate::engine::AdsEngine):
//!
//! | request                          | completion                        |
//! |----------------------------------|-----------------------------------|
//! | `load_client_state`              | `on_client_state_loaded`          |
//! | `load_user_model_for_locale`     | `on_user_model_loaded`            |
//! | `download_catalog`               | `on_catalog_downloaded`           |
//! | `get_ads`                        | `on_ads_fetched`                  |
//! | `load_sample_bundle`             | `on_sample_bundle_loaded`         |
//! | `show_notification`              | `on_notification_shown` /         |
//! |                                  | `on_notification_result`          |
//!
//! Diagnostics go through `tracing`; the host installs the subscriber that
//! acts as the log sink. The analytics stream is separate and flows through
//! [`AdsHost::event_log`].

use chrono::{DateTime, Utc};

use crate::ad::NotificationInfo;

/// Outcome of an asynchronous host request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostResult {
    Ok,
    Failed,
}

/// Parsed pieces of a URL, as reported by the host's parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlComponents {
    pub url: String,
    pub scheme: String,
    pub user: String,
    pub hostname: String,
    pub port: String,
    pub query: String,
    pub fragment: String,
}

/// How the user resolved a surfaced notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationResult {
    Clicked,
    Dismissed,
    Timeout,
}

/// Everything the embedding application provides to the engine.
pub trait AdsHost {
    /// Whether the user has ads enabled at all.
    fn is_ads_enabled(&self) -> bool;

    /// Whether native notifications can currently be displayed.
    fn is_notifications_available(&self) -> bool;

    /// Locales the host ships user models for.
    fn get_locales(&self) -> Vec<String>;

    /// Locale the ad catalog is keyed by.
    fn get_ads_locale(&self) -> String;

    /// Country/region code for a locale (e.g. `en_US` -> `US`).
    fn get_country_code(&self, locale: &str) -> String;

    /// Request the persisted client-state blob.
    fn load_client_state(&self);

    /// Persist the client-state blob. The host may batch writes.
    fn save_client_state(&self, json: &str);

    /// Request the page-classifier model for a locale.
    fn load_user_model_for_locale(&self, locale: &str);

    /// Kick off a catalog refresh.
    fn download_catalog(&self);

    /// Request ads for a region and category.
    fn get_ads(&self, region: &str, category: &str);

    /// Request the built-in sample bundle.
    fn load_sample_bundle(&self);

    /// Surface a notification. Ownership of the payload passes to the host.
    fn show_notification(&self, info: NotificationInfo);

    /// Parse a URL. `None` means the URL was not parseable.
    fn get_url_components(&self, url: &str) -> Option<UrlComponents>;

    /// Whether the components identify a known search provider.
    fn is_search_provider(&self, components: &UrlComponents) -> bool;

    /// Current network SSID; empty when unknown.
    fn get_ssid(&self) -> String;

    /// Schedule a one-shot timer. Returns an opaque nonzero id, or 0 on
    /// failure. Fires arrive via `AdsEngine::on_timer`.
    fn set_timer(&self, delay_secs: u64) -> u32;

    /// Cancel a previously scheduled timer.
    fn kill_timer(&self, id: u32);

    /// Configure how long before the host reports the user as idle.
    fn set_idle_threshold(&self, seconds: u64);

    /// Hourly ad cap configured on the host.
    fn get_ads_per_hour(&self) -> u64;

    /// Daily ad cap configured on the host.
    fn get_ads_per_day(&self) -> u64;

    /// Append a record to the analytics event stream.
    fn event_log(&self, json: &str);

    /// Host wall clock. Event stamps and history timestamps derive from it.
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
