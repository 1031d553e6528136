//! Persisted client state.
//!
//! One blob per profile, round-tripped through the host as opaque JSON.
//! Mutations happen through the engine, which persists after every
//! mutating step; the host batches the actual writes.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ad::AdInfo;
use crate::config::{
    DEFAULT_LANGUAGE, MAX_PAGE_SCORE_HISTORY_ENTRIES, ONE_DAY_SECONDS, UNDISCLOSED_PLACE,
};
use crate::error::AdsError;
use crate::user_model::PageScore;

fn default_locale() -> String {
    DEFAULT_LANGUAGE.to_string()
}

/// Everything the engine remembers across sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientState {
    /// Stable per-profile identifier, generated once.
    #[serde(default)]
    pub ad_uuid: String,

    /// Wall-clock seconds at which ads were shown, oldest first.
    #[serde(default)]
    pub ads_shown_history: Vec<u64>,

    /// Times each ad uuid has been surfaced to the user. Presence of a key
    /// marks the ad as seen.
    #[serde(default)]
    pub ads_uuid_seen: HashMap<String, u64>,

    /// Last observed notification availability.
    #[serde(default)]
    pub available: bool,

    #[serde(default)]
    pub current_ssid: String,

    #[serde(default = "default_locale")]
    pub locale: String,

    /// Locales the host reported user models for.
    #[serde(default)]
    pub locales: Vec<String>,

    /// Per-visit classification vectors, newest first.
    #[serde(default)]
    pub page_score_history: VecDeque<PageScore>,

    /// Coarse location labels keyed by SSID.
    #[serde(default)]
    pub places: HashMap<String, String>,

    #[serde(default)]
    pub score: f64,

    #[serde(default)]
    pub search_activity: bool,
    #[serde(default)]
    pub search_url: String,
    #[serde(default)]
    pub last_search_time: u64,

    #[serde(default)]
    pub shop_activity: bool,
    #[serde(default)]
    pub shop_url: String,
    #[serde(default)]
    pub last_shop_time: u64,

    #[serde(default)]
    pub last_user_activity: u64,
    #[serde(default)]
    pub last_user_idle_stop_time: u64,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            ad_uuid: String::new(),
            ads_shown_history: Vec::new(),
            ads_uuid_seen: HashMap::new(),
            available: false,
            current_ssid: String::new(),
            locale: default_locale(),
            locales: Vec::new(),
            page_score_history: VecDeque::new(),
            places: HashMap::new(),
            score: 0.0,
            search_activity: false,
            search_url: String::new(),
            last_search_time: 0,
            shop_activity: false,
            shop_url: String::new(),
            last_shop_time: 0,
            last_user_activity: 0,
            last_user_idle_stop_time: 0,
        }
    }
}

impl ClientState {
    pub fn from_json(json: &str) -> Result<Self, AdsError> {
        serde_json::from_str(json).map_err(AdsError::ClientState)
    }

    pub fn to_json(&self) -> Result<String, AdsError> {
        serde_json::to_string(self).map_err(AdsError::ClientState)
    }

    /// Place label for the current SSID.
    pub fn current_place(&self) -> String {
        self.places
            .get(&self.current_ssid)
            .cloned()
            .unwrap_or_else(|| UNDISCLOSED_PLACE.to_string())
    }

    /// Prepend a score vector, dropping the oldest past capacity.
    pub fn append_page_score(&mut self, page_score: PageScore) {
        self.page_score_history.push_front(page_score);
        self.page_score_history
            .truncate(MAX_PAGE_SCORE_HISTORY_ENTRIES);
    }

    /// Record an ad show at `now`, purging entries past the retention
    /// window.
    pub fn append_ads_shown(&mut self, now: u64) {
        self.ads_shown_history.push(now);
        self.ads_shown_history
            .retain(|&shown| now.saturating_sub(shown) < ONE_DAY_SECONDS);
    }

    /// Bump the seen count for an ad uuid.
    pub fn update_ads_uuid_seen(&mut self, uuid: &str, count: u64) {
        *self.ads_uuid_seen.entry(uuid.to_string()).or_insert(0) += count;
    }

    /// Clear the seen marks for exactly the given ads.
    pub fn reset_ads_uuid_seen(&mut self, ads: &[AdInfo]) {
        for ad in ads {
            self.ads_uuid_seen.remove(&ad.uuid);
        }
    }

    /// Generate the per-profile identifier if it does not exist yet.
    pub fn update_ad_uuid(&mut self) {
        if !self.ad_uuid.is_empty() {
            return;
        }
        self.ad_uuid = Uuid::new_v4().to_string();
    }

    pub fn set_locale(&mut self, locale: &str) {
        self.locale = locale.to_string();
    }

    pub fn set_locales(&mut self, locales: Vec<String>) {
        self.locales = locales;
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    pub fn set_current_ssid(&mut self, ssid: &str) {
        self.current_ssid = ssid.to_string();
    }

    pub fn flag_shopping_state(&mut self, url: &str, score: f64, now: u64) {
        self.shop_activity = true;
        self.shop_url = url.to_string();
        self.score = score;
        self.last_shop_time = now;
    }

    pub fn unflag_shopping_state(&mut self) {
        self.shop_activity = false;
    }

    pub fn flag_search_state(&mut self, url: &str, score: f64, now: u64) {
        self.search_activity = true;
        self.search_url = url.to_string();
        self.score = score;
        self.last_search_time = now;
    }

    pub fn unflag_search_state(&mut self, url: &str) {
        self.search_activity = false;
        self.search_url = url.to_string();
    }

    pub fn update_last_user_activity(&mut self, now: u64) {
        self.last_user_activity = now;
    }

    pub fn update_last_user_idle_stop_time(&mut self, now: u64) {
        self.last_user_idle_stop_time = now;
    }

    /// Reset to a fresh state, dropping every history and flag.
    pub fn remove_all_history(&mut self) {
        *self = ClientState::default();
    }
}
