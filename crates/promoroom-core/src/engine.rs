//! The decisioning engine.
//!
//! The engine is driven entirely by the host: browser events, timer fires
//! and request completions all arrive as method calls on [`AdsEngine`], on
//! one thread, and run to completion. The engine never blocks; anything
//! asynchronous is a request on [`AdsHost`] answered later through a
//! completion entry point.
//!
//! ## Initialization
//!
//! Initialization is staged across host callbacks because client state and
//! the user model load asynchronously:
//!
//! ```text
//! initialize -> on_client_state_loaded -> on_user_model_loaded -> (step 3)
//! ```
//!
//! Step 3 marks the engine initialized, configures the idle threshold,
//! reports settings, confirms the profile ad-UUID (which arms the activity
//! timer) and requests the initial catalog download.
//!
//! ## Serving
//!
//! A qualifying transition runs the serve gate: foreground, no media, and
//! the rate limits of [`eligibility`]. The winner-over-time category is
//! aggregated from the page-score history, ads are fetched per (region,
//! category) with parent-category fallback, and an unseen ad is picked
//! uniformly at random.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use tracing::{debug, error, info, warn};

use crate::ad::{AdInfo, NotificationInfo};
use crate::bundle::{Bundle, SampleBundle};
use crate::category;
use crate::config::{
    AdsConfig, EASTER_EGG_URL, IDLE_THRESHOLD_SECONDS, NEXT_EASTER_EGG_STARTS_IN_SECONDS,
    SHOPPING_HOSTNAME, SUSTAIN_AD_INTERACTION_AFTER_SECONDS, UNKNOWN_SSID,
};
use crate::eligibility;
use crate::events::TabType;
use crate::host::{AdsHost, HostResult, NotificationResult};
use crate::reporting::Reporter;
use crate::state::ClientState;
use crate::user_model::{PageScore, UserModel};

/// Embedded ad-decisioning engine.
pub struct AdsEngine {
    config: AdsConfig,
    host: Rc<dyn AdsHost>,
    user_model: Box<dyn UserModel>,
    client: ClientState,
    bundle: Bundle,
    reporter: Reporter,
    rng: Mcg128Xsl64,

    is_initialized: bool,
    is_foreground: bool,
    last_shown_tab_url: String,
    last_shown_notification: NotificationInfo,
    last_page_classification: String,
    page_score_cache: HashMap<String, PageScore>,
    media_playing: HashSet<i32>,
    collect_activity_timer_id: u32,
    sustain_ad_interaction_timer_id: u32,
    next_easter_egg: u64,
}

impl AdsEngine {
    pub fn new(config: AdsConfig, host: Rc<dyn AdsHost>, user_model: Box<dyn UserModel>) -> Self {
        let rng = match config.seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };

        Self {
            config,
            host,
            user_model,
            client: ClientState::default(),
            bundle: Bundle::new(),
            reporter: Reporter::new(),
            rng,
            is_initialized: false,
            is_foreground: false,
            last_shown_tab_url: String::new(),
            last_shown_notification: NotificationInfo::default(),
            last_page_classification: String::new(),
            page_score_cache: HashMap::new(),
            media_playing: HashSet::new(),
            collect_activity_timer_id: 0,
            sustain_ad_interaction_timer_id: 0,
            next_easter_egg: 0,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Stage 1: request the client state from the host. Stage 2 runs from
    /// [`Self::on_client_state_loaded`].
    pub fn initialize(&mut self) {
        if self.is_initialized() {
            warn!("already initialized");
            return;
        }

        if !self.host.is_ads_enabled() {
            info!("deinitializing as ads are disabled");
            self.deinitialize();
            return;
        }

        self.host.load_client_state();
    }

    /// Completion of `load_client_state`. A missing or unreadable blob
    /// starts a fresh profile; either way the chain continues.
    pub fn on_client_state_loaded(&mut self, result: HostResult, json: &str) {
        match result {
            HostResult::Ok => match ClientState::from_json(json) {
                Ok(state) => self.client = state,
                Err(err) => {
                    error!("{err}, starting from a fresh client state");
                    self.client = ClientState::default();
                }
            },
            HostResult::Failed => {
                info!("no client state to restore, starting fresh");
                self.client = ClientState::default();
            }
        }

        self.initialize_step2();
    }

    /// Stage 2: record the host's locale list and request the user model.
    fn initialize_step2(&mut self) {
        self.process_locales(self.host.get_locales());
        self.load_user_model();
    }

    /// Completion of `load_user_model_for_locale`.
    pub fn on_user_model_loaded(&mut self, result: HostResult, json: &str) {
        if result == HostResult::Failed {
            error!("failed to load user model");
            return;
        }

        info!("successfully loaded user model");

        self.initialize_user_model(json);

        if !self.is_initialized() {
            self.initialize_step3();
        }
    }

    fn initialize_step3(&mut self) {
        self.is_initialized = true;

        info!("successfully initialized");

        self.host.set_idle_threshold(IDLE_THRESHOLD_SECONDS);

        self.notification_allowed_check(false);

        self.retrieve_ssid();

        self.confirm_ad_uuid_if_enabled();

        self.host.download_catalog();
    }

    /// Fully initialized means the staged setup finished, the host still
    /// reports ads enabled, and a user model is loaded.
    pub fn is_initialized(&self) -> bool {
        self.is_initialized && self.host.is_ads_enabled() && self.user_model.is_initialized()
    }

    /// Tear down all mutable state. Both timer slots are 0 afterwards and
    /// the next `notify` record will again carry the restart prefix.
    pub fn deinitialize(&mut self) {
        if !self.is_initialized() {
            warn!("failed to deinitialize as not initialized");
            return;
        }

        self.stop_collecting_activity();
        self.stop_sustaining_ad_interaction();

        self.client.remove_all_history();
        self.persist_client_state();

        self.bundle.reset();
        self.user_model.reset();

        self.last_shown_notification = NotificationInfo::default();
        self.last_shown_tab_url.clear();
        self.last_page_classification.clear();
        self.page_score_cache.clear();
        self.media_playing.clear();

        self.reporter.reset();
        self.is_initialized = false;
        self.is_foreground = false;
    }

    /// Switch to the closest available locale and reload the user model.
    /// Falls back to the language prefix, then to the default language.
    pub fn change_locale(&mut self, locale: &str) {
        if !self.is_initialized() {
            return;
        }

        let locales = self.host.get_locales();

        if locales.iter().any(|known| known == locale) {
            self.client.set_locale(locale);
        } else {
            let language_code = locale.split('_').next().unwrap_or_default();
            let closest_match = if locales.iter().any(|known| known == language_code) {
                language_code
            } else {
                crate::config::DEFAULT_LANGUAGE
            };
            self.client.set_locale(closest_match);
        }
        self.persist_client_state();

        self.load_user_model();
    }

    // ── Browser events ───────────────────────────────────────────────

    pub fn on_foreground(&mut self) {
        self.is_foreground = true;
        let place = self.client.current_place();
        self.reporter.foreground(self.host.as_ref(), &place);
    }

    pub fn on_background(&mut self) {
        self.is_foreground = false;
        let place = self.client.current_place();
        self.reporter.background(self.host.as_ref(), &place);
    }

    pub fn is_foreground(&self) -> bool {
        self.is_foreground
    }

    pub fn on_idle(&mut self) {
        debug!("idle state entered");
    }

    /// Returning from idle refreshes the idle-stop time and runs the
    /// notification-allowed check with serving enabled.
    pub fn on_un_idle(&mut self) {
        if !self.is_initialized() {
            return;
        }

        self.client.update_last_user_idle_stop_time(self.now_secs());
        self.persist_client_state();

        self.notification_allowed_check(true);
    }

    pub fn on_media_playing(&mut self, tab_id: i32) {
        self.media_playing.insert(tab_id);
    }

    pub fn on_media_stopped(&mut self, tab_id: i32) {
        self.media_playing.remove(&tab_id);
    }

    pub fn is_media_playing(&self) -> bool {
        !self.media_playing.is_empty()
    }

    /// A tab navigated or changed focus. Incognito tabs are invisible to
    /// the engine.
    pub fn tab_updated(&mut self, tab_id: i32, url: &str, is_active: bool, is_incognito: bool) {
        if is_incognito {
            return;
        }

        if !self.is_initialized() {
            return;
        }

        self.client.update_last_user_activity(self.now_secs());
        self.persist_client_state();

        self.report_load_event(tab_id, url);

        if is_active {
            self.last_shown_tab_url = url.to_string();

            self.test_shopping_data(url);
            self.test_search_state(url);

            self.reporter.focus(self.host.as_ref(), tab_id);
        } else {
            self.reporter.blur(self.host.as_ref(), tab_id);
        }
    }

    pub fn tab_closed(&mut self, tab_id: i32) {
        self.on_media_stopped(tab_id);
        self.reporter.destroy(self.host.as_ref(), tab_id);
    }

    // ── Classification ───────────────────────────────────────────────

    /// Classify a visited page, record the score in the history ring and
    /// cache it for load-event enrichment.
    pub fn classify_page(&mut self, url: &str, html: &str) {
        if !self.is_initialized() {
            return;
        }

        self.test_shopping_data(url);
        self.test_search_state(url);

        let page_score = self.user_model.classify(html);
        self.client.append_page_score(page_score.clone());
        self.persist_client_state();

        self.last_page_classification = self.user_model.winning_category(&page_score);

        self.page_score_cache.insert(url.to_string(), page_score);
    }

    /// Immediate winner of the most recent page visit.
    pub fn last_page_classification(&self) -> &str {
        &self.last_page_classification
    }

    /// Category with the highest summed score across the history window,
    /// or empty when the history is empty or length-inconsistent.
    pub fn winner_over_time_category(&self) -> String {
        match category::sum_page_scores(&self.client.page_score_history) {
            Some(summed) => self.user_model.winning_category(&summed),
            None => String::new(),
        }
    }

    // ── Serving ──────────────────────────────────────────────────────

    /// Run the serve gate and, if it passes (or `forced` skips it), serve
    /// from the winner-over-time category.
    pub fn check_ready_ad_serve(&mut self, forced: bool) {
        if !self.is_initialized() {
            return;
        }

        if !forced {
            if !self.is_foreground() {
                debug!("notification not made: not in foreground");
                return;
            }

            if self.is_media_playing() {
                debug!("notification not made: media playing in browser");
                return;
            }

            if !self.is_allowed_to_show_ads() {
                debug!("notification not made: not allowed based on history");
                return;
            }
        }

        let category = self.winner_over_time_category();
        self.serve_ad_from_category(&category);
    }

    fn is_allowed_to_show_ads(&self) -> bool {
        eligibility::is_allowed_to_show_ads(
            &self.client.ads_shown_history,
            self.now_secs(),
            self.host.get_ads_per_hour(),
            self.host.get_ads_per_day(),
        )
    }

    fn serve_ad_from_category(&mut self, category: &str) {
        if self.bundle.catalog_id().is_empty() {
            info!("notification not made: no ad catalog");
            return;
        }

        if category.is_empty() {
            info!("notification not made: no winning category");
            return;
        }

        let locale = self.host.get_ads_locale();
        let region = self.host.get_country_code(&locale);

        self.host.get_ads(&region, category);
    }

    /// Completion of `get_ads`. A failed lookup falls back one category
    /// level and retries until the hierarchy root.
    pub fn on_ads_fetched(
        &mut self,
        result: HostResult,
        region: &str,
        category: &str,
        ads: &[AdInfo],
    ) {
        if !self.is_initialized() {
            return;
        }

        if result == HostResult::Failed {
            if let Some(parent) = category::parent(category) {
                warn!("no ads found for {category:?} category, trying again with {parent:?}");
                self.host.get_ads(region, parent);
                return;
            }

            if ads.is_empty() {
                warn!("no ads found for {category:?} category");
                return;
            }
        }

        let mut ads_unseen = self.unseen_ads(ads);
        if ads_unseen.is_empty() {
            // Round-robin restart: the whole result set has been seen.
            self.client.reset_ads_uuid_seen(ads);
            self.persist_client_state();

            ads_unseen = self.unseen_ads(ads);
            if ads_unseen.is_empty() {
                debug!("notification not made: no eligible ads for {category:?}");
                return;
            }
        }

        let index = self.rng.gen_range(0..ads_unseen.len());
        let ad = ads_unseen.swap_remove(index);
        self.show_ad(&ad, category);
    }

    fn unseen_ads(&self, ads: &[AdInfo]) -> Vec<AdInfo> {
        ads.iter()
            .filter(|ad| !self.client.ads_uuid_seen.contains_key(&ad.uuid))
            .cloned()
            .collect()
    }

    /// Validate and surface an ad, recording it in the shown history.
    /// Returns whether the ad was shown.
    fn show_ad(&mut self, ad: &AdInfo, category: &str) -> bool {
        if !ad.is_valid() {
            warn!("notification not made: incomplete ad information");
            return false;
        }

        let info = NotificationInfo::from_ad(ad, category);
        self.last_shown_notification = info.clone();

        self.host.show_notification(info);

        self.client.append_ads_shown(self.now_secs());
        self.persist_client_state();

        true
    }

    /// Diagnostic path: serve from the built-in sample bundle, skipping
    /// every gate.
    pub fn serve_sample_ad(&mut self) {
        if !self.is_initialized() {
            return;
        }

        self.host.load_sample_bundle();
    }

    /// Completion of `load_sample_bundle`.
    pub fn on_sample_bundle_loaded(&mut self, result: HostResult, json: &str) {
        if !self.is_initialized() {
            return;
        }

        if result == HostResult::Failed {
            error!("failed to load sample bundle");
            return;
        }

        let bundle = match SampleBundle::from_json(json) {
            Ok(bundle) => bundle,
            Err(err) => {
                error!("failed to parse sample bundle: {err}");
                return;
            }
        };

        let populated: Vec<(&String, &Vec<AdInfo>)> = bundle
            .categories
            .iter()
            .filter(|(_, ads)| !ads.is_empty())
            .collect();
        if populated.is_empty() {
            warn!("sample bundle does not contain any ads");
            return;
        }

        let (category, ads) = populated[self.rng.gen_range(0..populated.len())];
        let ad = ads[self.rng.gen_range(0..ads.len())].clone();
        let category = category.clone();

        self.show_ad(&ad, &category);
    }

    /// Completion of `download_catalog`.
    pub fn on_catalog_downloaded(&mut self, result: HostResult, catalog_id: &str) {
        if !self.is_initialized() {
            return;
        }

        match result {
            HostResult::Ok => {
                info!("catalog {catalog_id:?} applied");
                self.bundle.set_catalog_id(catalog_id);
            }
            HostResult::Failed => warn!("failed to download catalog"),
        }
    }

    // ── Notification ingress ─────────────────────────────────────────

    /// The host displayed a notification.
    pub fn on_notification_shown(&mut self, info: &NotificationInfo) {
        if !self.is_initialized() {
            return;
        }

        let place = self.client.current_place();
        self.reporter
            .notification_shown(self.host.as_ref(), info, &place);
    }

    /// The user resolved a notification. A click marks the ad as seen and
    /// starts the sustain chain; a dismissal only marks it as seen.
    pub fn on_notification_result(&mut self, info: &NotificationInfo, result: NotificationResult) {
        if !self.is_initialized() {
            return;
        }

        let place = self.client.current_place();
        self.reporter
            .notification_result(self.host.as_ref(), info, result, &place);

        match result {
            NotificationResult::Clicked => {
                self.client.update_ads_uuid_seen(&info.uuid, 1);
                self.persist_client_state();
                self.start_sustaining_ad_interaction(SUSTAIN_AD_INTERACTION_AFTER_SECONDS);
            }
            NotificationResult::Dismissed => {
                self.client.update_ads_uuid_seen(&info.uuid, 1);
                self.persist_client_state();
            }
            NotificationResult::Timeout => {}
        }
    }

    // ── Timers ───────────────────────────────────────────────────────

    /// Route a timer fire to its slot.
    pub fn on_timer(&mut self, timer_id: u32) {
        if timer_id == self.collect_activity_timer_id {
            self.collect_activity();
        } else if timer_id == self.sustain_ad_interaction_timer_id {
            self.sustain_ad_interaction();
        }
    }

    fn start_collecting_activity(&mut self, delay_secs: u64) {
        self.stop_collecting_activity();

        self.collect_activity_timer_id = self.host.set_timer(delay_secs);
        if self.collect_activity_timer_id == 0 {
            error!("failed to start collecting activity due to an invalid timer");
            return;
        }

        info!("start collecting activity in {delay_secs} seconds");
    }

    fn stop_collecting_activity(&mut self) {
        if !self.is_collecting_activity() {
            return;
        }

        info!("stopped collecting activity");

        self.host.kill_timer(self.collect_activity_timer_id);
        self.collect_activity_timer_id = 0;
    }

    pub fn is_collecting_activity(&self) -> bool {
        self.collect_activity_timer_id != 0
    }

    /// Activity-timer fire: refresh the catalog. The slot is not re-armed
    /// here; arming is owned by [`Self::confirm_ad_uuid_if_enabled`].
    fn collect_activity(&mut self) {
        if !self.is_initialized() {
            return;
        }

        info!("collect activity");

        self.host.download_catalog();
    }

    fn start_sustaining_ad_interaction(&mut self, delay_secs: u64) {
        self.stop_sustaining_ad_interaction();

        self.sustain_ad_interaction_timer_id = self.host.set_timer(delay_secs);
        if self.sustain_ad_interaction_timer_id == 0 {
            error!("failed to start sustaining ad interaction due to an invalid timer");
            return;
        }

        info!("start sustaining ad interaction in {delay_secs} seconds");
    }

    fn stop_sustaining_ad_interaction(&mut self) {
        if !self.is_sustaining_ad_interaction() {
            return;
        }

        info!("stopped sustaining ad interaction");

        self.host.kill_timer(self.sustain_ad_interaction_timer_id);
        self.sustain_ad_interaction_timer_id = 0;
    }

    pub fn is_sustaining_ad_interaction(&self) -> bool {
        self.sustain_ad_interaction_timer_id != 0
    }

    /// Sustain-timer fire: if the user is still on the ad's landing page,
    /// report it and re-arm; otherwise the chain ends.
    fn sustain_ad_interaction(&mut self) {
        if !self.is_still_viewing_ad() {
            return;
        }

        self.reporter
            .sustain(self.host.as_ref(), &self.last_shown_notification);

        self.start_sustaining_ad_interaction(SUSTAIN_AD_INTERACTION_AFTER_SECONDS);
    }

    fn is_still_viewing_ad(&self) -> bool {
        self.last_shown_notification.url == self.last_shown_tab_url
    }

    // ── Housekeeping ─────────────────────────────────────────────────

    /// Drop every client history, then confirm the profile ad-UUID (which
    /// re-arms or stops the activity timer).
    pub fn remove_all_history(&mut self) {
        self.client.remove_all_history();
        self.persist_client_state();

        self.confirm_ad_uuid_if_enabled();
    }

    /// Persist the client state, clearing histories first when ads were
    /// disabled in the meantime.
    pub fn save_cached_state(&mut self) {
        if !self.host.is_ads_enabled() {
            self.client.remove_all_history();
        }

        self.persist_client_state();
    }

    fn confirm_ad_uuid_if_enabled(&mut self) {
        if !self.host.is_ads_enabled() {
            self.stop_collecting_activity();
            return;
        }

        self.client.update_ad_uuid();
        self.persist_client_state();

        self.start_collecting_activity(self.config.collect_activity_interval());
    }

    fn retrieve_ssid(&mut self) {
        let mut ssid = self.host.get_ssid();
        if ssid.is_empty() {
            ssid = UNKNOWN_SSID.to_string();
        }

        self.client.set_current_ssid(&ssid);
        self.persist_client_state();
    }

    fn notification_allowed_check(&mut self, serve: bool) {
        let available = self.host.is_notifications_available();

        let previous = self.client.available;
        if available != previous {
            self.client.set_available(available);
            self.persist_client_state();
        }

        if !serve || available != previous {
            let place = self.client.current_place();
            self.reporter
                .settings(self.host.as_ref(), &place, &self.client.locale);
        }

        if !serve {
            return;
        }

        if !available {
            debug!("ad not served: notifications not presently allowed");
            return;
        }

        self.check_ready_ad_serve(false);
    }

    fn process_locales(&mut self, locales: Vec<String>) {
        if locales.is_empty() {
            return;
        }

        self.client.set_locales(locales);
        self.persist_client_state();
    }

    fn load_user_model(&mut self) {
        let locale = self.client.locale.clone();
        self.host.load_user_model_for_locale(&locale);
    }

    fn initialize_user_model(&mut self, json: &str) {
        info!("initializing user model");

        self.user_model.reset();
        if !self.user_model.initialize(json) {
            error!("failed to initialize user model");
        }
    }

    // ── Shopping & search state ──────────────────────────────────────

    fn test_shopping_data(&mut self, url: &str) {
        if !self.is_initialized() {
            return;
        }

        let Some(components) = self.host.get_url_components(url) else {
            return;
        };

        if components.hostname == SHOPPING_HOSTNAME {
            self.client.flag_shopping_state(url, 1.0, self.now_secs());
        } else {
            self.client.unflag_shopping_state();
        }
        self.persist_client_state();
    }

    fn test_search_state(&mut self, url: &str) {
        if !self.is_initialized() {
            return;
        }

        let Some(components) = self.host.get_url_components(url) else {
            return;
        };

        if self.host.is_search_provider(&components) {
            self.client.flag_search_state(url, 1.0, self.now_secs());
        } else {
            self.client.unflag_search_state(url);
        }
        self.persist_client_state();
    }

    // ── Reporting ────────────────────────────────────────────────────

    fn report_load_event(&mut self, tab_id: i32, url: &str) {
        let now = self.now_secs();
        if self.config.is_testing && url == EASTER_EGG_URL && self.next_easter_egg < now {
            self.next_easter_egg = now + NEXT_EASTER_EGG_STARTS_IN_SECONDS;

            self.check_ready_ad_serve(true);
        }

        let components = self.host.get_url_components(url);
        let has_http_scheme = components
            .as_ref()
            .is_some_and(|c| c.scheme == "http" || c.scheme == "https");
        // A load record only ships when the parse failed but an http(s)
        // scheme was still reported; a successful parse never passes this
        // guard.
        if components.is_some() || !has_http_scheme {
            return;
        }

        let tab_type = if self.client.search_activity {
            TabType::Search
        } else {
            TabType::Click
        };
        let tab_classification = category::split_segments(&self.last_page_classification);
        let page_score = self.page_score_cache.get(url).cloned();

        self.reporter.load(
            self.host.as_ref(),
            tab_id,
            tab_type,
            url,
            tab_classification,
            page_score,
        );
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn persist_client_state(&self) {
        match self.client.to_json() {
            Ok(json) => self.host.save_client_state(&json),
            Err(err) => error!("{err}"),
        }
    }

    fn now_secs(&self) -> u64 {
        self.host.now().timestamp().max(0) as u64
    }

    /// Read-only view of the client state, for the embedding host's UI.
    pub fn client(&self) -> &ClientState {
        &self.client
    }
}
