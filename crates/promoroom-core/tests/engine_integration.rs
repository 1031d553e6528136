//! End-to-end scenarios driving the engine through a recording mock host.
//!
//! The mock host answers synchronous queries directly and records every
//! request; the tests play the role of the host's async plumbing by calling
//! the completion entry points themselves.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};
use promoroom_core::{
    AdInfo, AdsConfig, AdsEngine, AdsHost, ClientState, HostResult, NotificationInfo,
    NotificationResult, PageScore, UrlComponents, UserModel,
};

const NOW: i64 = 1_760_000_000;

struct MockHost {
    ads_enabled: Cell<bool>,
    notifications_available: Cell<bool>,
    locales: RefCell<Vec<String>>,
    ads_locale: RefCell<String>,
    ads_per_hour: Cell<u64>,
    ads_per_day: Cell<u64>,
    ssid: RefCell<String>,
    now_secs: Cell<i64>,
    next_timer_id: Cell<u32>,
    search_hostnames: RefCell<HashSet<String>>,

    state_loads: Cell<u32>,
    saved_state: RefCell<Option<String>>,
    user_model_requests: RefCell<Vec<String>>,
    catalog_downloads: Cell<u32>,
    get_ads_requests: RefCell<Vec<(String, String)>>,
    sample_bundle_requests: Cell<u32>,
    shown: RefCell<Vec<NotificationInfo>>,
    set_timers: RefCell<Vec<(u32, u64)>>,
    killed_timers: RefCell<Vec<u32>>,
    idle_threshold: Cell<u64>,
    events: RefCell<Vec<serde_json::Value>>,
}

impl MockHost {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            ads_enabled: Cell::new(true),
            notifications_available: Cell::new(true),
            locales: RefCell::new(vec!["en".to_string(), "fr_FR".to_string()]),
            ads_locale: RefCell::new("en_US".to_string()),
            ads_per_hour: Cell::new(2),
            ads_per_day: Cell::new(20),
            ssid: RefCell::new(String::new()),
            now_secs: Cell::new(NOW),
            next_timer_id: Cell::new(1),
            search_hostnames: RefCell::new(HashSet::from(["www.google.com".to_string()])),
            state_loads: Cell::new(0),
            saved_state: RefCell::new(None),
            user_model_requests: RefCell::new(Vec::new()),
            catalog_downloads: Cell::new(0),
            get_ads_requests: RefCell::new(Vec::new()),
            sample_bundle_requests: Cell::new(0),
            shown: RefCell::new(Vec::new()),
            set_timers: RefCell::new(Vec::new()),
            killed_timers: RefCell::new(Vec::new()),
            idle_threshold: Cell::new(0),
            events: RefCell::new(Vec::new()),
        })
    }

    fn event_types(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .map(|event| event["data"]["type"].as_str().unwrap().to_string())
            .collect()
    }

    fn count_events(&self, event_type: &str) -> usize {
        self.event_types()
            .iter()
            .filter(|t| t.as_str() == event_type)
            .count()
    }

    fn last_saved_state(&self) -> ClientState {
        ClientState::from_json(self.saved_state.borrow().as_ref().unwrap()).unwrap()
    }

    fn get_ads_count(&self) -> usize {
        self.get_ads_requests.borrow().len()
    }

    fn last_get_ads(&self) -> (String, String) {
        self.get_ads_requests.borrow().last().unwrap().clone()
    }

    fn last_timer(&self) -> (u32, u64) {
        *self.set_timers.borrow().last().unwrap()
    }

    fn shown_count(&self) -> usize {
        self.shown.borrow().len()
    }
}

impl AdsHost for MockHost {
    fn is_ads_enabled(&self) -> bool {
        self.ads_enabled.get()
    }

    fn is_notifications_available(&self) -> bool {
        self.notifications_available.get()
    }

    fn get_locales(&self) -> Vec<String> {
        self.locales.borrow().clone()
    }

    fn get_ads_locale(&self) -> String {
        self.ads_locale.borrow().clone()
    }

    fn get_country_code(&self, locale: &str) -> String {
        locale
            .split('_')
            .nth(1)
            .unwrap_or("US")
            .to_string()
    }

    fn load_client_state(&self) {
        self.state_loads.set(self.state_loads.get() + 1);
    }

    fn save_client_state(&self, json: &str) {
        *self.saved_state.borrow_mut() = Some(json.to_string());
    }

    fn load_user_model_for_locale(&self, locale: &str) {
        self.user_model_requests.borrow_mut().push(locale.to_string());
    }

    fn download_catalog(&self) {
        self.catalog_downloads.set(self.catalog_downloads.get() + 1);
    }

    fn get_ads(&self, region: &str, category: &str) {
        self.get_ads_requests
            .borrow_mut()
            .push((region.to_string(), category.to_string()));
    }

    fn load_sample_bundle(&self) {
        self.sample_bundle_requests
            .set(self.sample_bundle_requests.get() + 1);
    }

    fn show_notification(&self, info: NotificationInfo) {
        self.shown.borrow_mut().push(info);
    }

    fn get_url_components(&self, url: &str) -> Option<UrlComponents> {
        let (scheme, rest) = url.split_once("://")?;
        let hostname = rest.split(['/', '?', '#']).next().unwrap_or("");
        Some(UrlComponents {
            url: url.to_string(),
            scheme: scheme.to_string(),
            hostname: hostname.to_string(),
            ..UrlComponents::default()
        })
    }

    fn is_search_provider(&self, components: &UrlComponents) -> bool {
        self.search_hostnames.borrow().contains(&components.hostname)
    }

    fn get_ssid(&self) -> String {
        self.ssid.borrow().clone()
    }

    fn set_timer(&self, delay_secs: u64) -> u32 {
        let id = self.next_timer_id.get();
        self.next_timer_id.set(id + 1);
        self.set_timers.borrow_mut().push((id, delay_secs));
        id
    }

    fn kill_timer(&self, id: u32) {
        self.killed_timers.borrow_mut().push(id);
    }

    fn set_idle_threshold(&self, seconds: u64) {
        self.idle_threshold.set(seconds);
    }

    fn get_ads_per_hour(&self) -> u64 {
        self.ads_per_hour.get()
    }

    fn get_ads_per_day(&self) -> u64 {
        self.ads_per_day.get()
    }

    fn event_log(&self, json: &str) {
        self.events
            .borrow_mut()
            .push(serde_json::from_str(json).unwrap());
    }

    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.now_secs.get(), 0).unwrap()
    }
}

/// Classifier stub: one-hot match on category substrings in the HTML.
struct StubModel {
    categories: Vec<&'static str>,
    initialized: bool,
}

impl StubModel {
    fn new(categories: Vec<&'static str>) -> Self {
        Self {
            categories,
            initialized: false,
        }
    }
}

impl UserModel for StubModel {
    fn initialize(&mut self, _model_json: &str) -> bool {
        self.initialized = true;
        true
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn reset(&mut self) {
        self.initialized = false;
    }

    fn classify(&self, html: &str) -> PageScore {
        self.categories
            .iter()
            .map(|category| if html.contains(category) { 1.0 } else { 0.0 })
            .collect()
    }

    fn winning_category(&self, scores: &[f64]) -> String {
        let mut winner = 0;
        let mut best = f64::NEG_INFINITY;
        for (index, &score) in scores.iter().enumerate() {
            if score > best {
                winner = index;
                best = score;
            }
        }
        self.categories
            .get(winner)
            .map(|category| category.to_string())
            .unwrap_or_default()
    }
}

fn test_config() -> AdsConfig {
    AdsConfig {
        seed: Some(7),
        ..AdsConfig::default()
    }
}

fn ad(uuid: &str, url: &str) -> AdInfo {
    AdInfo {
        uuid: uuid.to_string(),
        creative_set_id: "cs-1".to_string(),
        advertiser: "Example Co".to_string(),
        notification_text: "Check this out".to_string(),
        notification_url: url.to_string(),
        ..AdInfo::default()
    }
}

/// Run the full three-stage initialization against the mock and apply a
/// catalog so the serve gate is open.
fn initialized_engine(
    host: &Rc<MockHost>,
    categories: Vec<&'static str>,
    config: AdsConfig,
) -> AdsEngine {
    let mut engine = AdsEngine::new(config, host.clone(), Box::new(StubModel::new(categories)));
    engine.initialize();
    assert_eq!(host.state_loads.get(), 1);
    engine.on_client_state_loaded(HostResult::Failed, "");
    engine.on_user_model_loaded(HostResult::Ok, "{}");
    assert!(engine.is_initialized());
    engine.on_catalog_downloaded(HostResult::Ok, "a1b2c3");
    engine.on_foreground();
    engine
}

#[test]
fn initialization_configures_host_and_reports_settings() {
    let host = MockHost::new();
    let engine = initialized_engine(&host, vec!["sports"], test_config());

    assert_eq!(host.idle_threshold.get(), 15);
    assert_eq!(host.user_model_requests.borrow().as_slice(), ["en"]);
    assert_eq!(host.catalog_downloads.get(), 1);

    // Activity timer armed for an hour.
    assert!(engine.is_collecting_activity());
    assert_eq!(host.set_timers.borrow()[0].1, 3600);

    // Settings record carries the host caps and the locale.
    let events = host.events.borrow();
    let settings = events
        .iter()
        .find(|e| e["data"]["type"] == "settings")
        .expect("settings record");
    assert_eq!(settings["data"]["settings"]["notifications"]["available"], true);
    assert_eq!(settings["data"]["settings"]["adsPerHour"], 2);
    assert_eq!(settings["data"]["settings"]["adsPerDay"], 20);
    assert_eq!(settings["data"]["settings"]["locale"], "en");

    // SSID was empty, so the stored value is the unknown marker.
    assert_eq!(host.last_saved_state().current_ssid, "unknown");
    assert!(!host.last_saved_state().ad_uuid.is_empty());
}

#[test]
fn category_fallback_walks_to_the_hierarchy_root() {
    let host = MockHost::new();
    let mut engine = initialized_engine(&host, vec!["sports-tennis-doubles"], test_config());

    engine.classify_page("https://tennis.example/", "sports-tennis-doubles coverage");
    engine.check_ready_ad_serve(false);
    assert_eq!(
        host.last_get_ads(),
        ("US".to_string(), "sports-tennis-doubles".to_string())
    );

    engine.on_ads_fetched(HostResult::Failed, "US", "sports-tennis-doubles", &[]);
    assert_eq!(
        host.last_get_ads(),
        ("US".to_string(), "sports-tennis".to_string())
    );

    engine.on_ads_fetched(HostResult::Failed, "US", "sports-tennis", &[]);
    assert_eq!(host.last_get_ads(), ("US".to_string(), "sports".to_string()));

    let ads = vec![ad("u1", "https://example.com/a")];
    engine.on_ads_fetched(HostResult::Ok, "US", "sports", &ads);

    assert_eq!(host.shown_count(), 1);
    let shown = host.shown.borrow()[0].clone();
    assert_eq!(shown.category, "sports");
    assert_eq!(shown.uuid, "u1");
}

#[test]
fn fallback_gives_up_at_the_root() {
    let host = MockHost::new();
    let mut engine = initialized_engine(&host, vec!["sports"], test_config());

    engine.on_ads_fetched(HostResult::Failed, "US", "sports", &[]);
    assert_eq!(host.get_ads_count(), 0);
    assert_eq!(host.shown_count(), 0);
}

#[test]
fn fully_seen_result_set_is_reshuffled() {
    let host = MockHost::new();
    let mut engine = initialized_engine(&host, vec!["sports"], test_config());

    let ads = vec![
        ad("u1", "https://example.com/a"),
        ad("u2", "https://example.com/b"),
        ad("u3", "https://example.com/c"),
    ];

    // Mark every ad in the set as seen.
    for entry in &ads {
        let info = NotificationInfo::from_ad(entry, "sports");
        engine.on_notification_result(&info, NotificationResult::Dismissed);
    }
    assert_eq!(host.last_saved_state().ads_uuid_seen.len(), 3);

    engine.on_ads_fetched(HostResult::Ok, "US", "sports", &ads);

    // The seen set was cleared for exactly this result set and one ad was
    // picked from the reshuffled pool.
    assert_eq!(host.shown_count(), 1);
    assert!(host.last_saved_state().ads_uuid_seen.is_empty());

    // The pick becomes seen again once the user resolves it.
    let picked = host.shown.borrow()[0].clone();
    engine.on_notification_result(&picked, NotificationResult::Clicked);
    let seen = host.last_saved_state().ads_uuid_seen;
    assert_eq!(seen.len(), 1);
    assert!(seen.contains_key(&picked.uuid));
}

#[test]
fn rate_limit_denies_until_the_spacing_window_clears() {
    let host = MockHost::new();
    let mut engine = initialized_engine(&host, vec!["sports"], test_config());
    engine.classify_page("https://sports.example/", "sports coverage");

    // Two ads shown 10 s apart (completions bypass the gate).
    engine.on_ads_fetched(HostResult::Ok, "US", "sports", &[ad("u1", "https://example.com/a")]);
    host.now_secs.set(NOW + 10);
    engine.on_ads_fetched(HostResult::Ok, "US", "sports", &[ad("u2", "https://example.com/b")]);
    assert_eq!(host.shown_count(), 2);

    // With ads_per_hour = 2 the minimum spacing window is 1800 s, so an
    // unforced serve is denied.
    host.now_secs.set(NOW + 20);
    let requests_before = host.get_ads_count();
    engine.check_ready_ad_serve(false);
    assert_eq!(host.get_ads_count(), requests_before);
    assert_eq!(host.shown_count(), 2);

    // Once both shows age past the hour the gate opens again.
    host.now_secs.set(NOW + 3700);
    engine.check_ready_ad_serve(false);
    assert_eq!(host.get_ads_count(), requests_before + 1);
}

#[test]
fn foreground_and_media_gate_unforced_serves() {
    let host = MockHost::new();
    let mut engine = initialized_engine(&host, vec!["sports"], test_config());
    engine.classify_page("https://sports.example/", "sports coverage");

    engine.on_background();
    engine.check_ready_ad_serve(false);
    assert_eq!(host.get_ads_count(), 0);

    engine.on_foreground();
    engine.on_media_playing(4);
    engine.on_media_playing(4); // duplicate insert is a no-op
    engine.check_ready_ad_serve(false);
    assert_eq!(host.get_ads_count(), 0);

    engine.on_media_stopped(4);
    engine.check_ready_ad_serve(false);
    assert_eq!(host.get_ads_count(), 1);
}

#[test]
fn serve_without_catalog_is_refused() {
    let host = MockHost::new();
    let mut engine = AdsEngine::new(
        test_config(),
        host.clone(),
        Box::new(StubModel::new(vec!["sports"])),
    );
    engine.initialize();
    engine.on_client_state_loaded(HostResult::Failed, "");
    engine.on_user_model_loaded(HostResult::Ok, "{}");
    engine.on_foreground();
    // No on_catalog_downloaded: the catalog id is still empty.

    engine.classify_page("https://sports.example/", "sports coverage");
    engine.check_ready_ad_serve(false);
    assert_eq!(host.get_ads_count(), 0);
}

#[test]
fn sustain_chain_reports_while_the_ad_tab_stays_focused() {
    let host = MockHost::new();
    let mut engine = initialized_engine(&host, vec!["sports"], test_config());

    let landing = "https://brand.example/landing";
    engine.on_ads_fetched(HostResult::Ok, "US", "sports", &[ad("u1", landing)]);
    let info = host.shown.borrow()[0].clone();

    // The click opens the landing tab and starts the sustain timer.
    engine.tab_updated(1, landing, true, false);
    engine.on_notification_result(&info, NotificationResult::Clicked);
    assert!(engine.is_sustaining_ad_interaction());
    let (first_timer, delay) = host.last_timer();
    assert_eq!(delay, 10);

    // Still on the landing page: a sustain record is emitted and the timer
    // re-arms.
    engine.on_timer(first_timer);
    assert_eq!(host.count_events("sustain"), 1);
    let (second_timer, _) = host.last_timer();
    assert_ne!(second_timer, first_timer);
    assert!(engine.is_sustaining_ad_interaction());

    // Navigating away ends the chain: no record, no re-arm.
    engine.tab_updated(1, "https://elsewhere.example/", true, false);
    let timers_before = host.set_timers.borrow().len();
    engine.on_timer(second_timer);
    assert_eq!(host.count_events("sustain"), 1);
    assert_eq!(host.set_timers.borrow().len(), timers_before);
}

#[test]
fn locale_change_falls_back_to_language_then_default() {
    let host = MockHost::new();
    let mut engine = initialized_engine(&host, vec!["sports"], test_config());

    // Exact match.
    engine.change_locale("fr_FR");
    assert_eq!(host.last_saved_state().locale, "fr_FR");
    assert_eq!(host.user_model_requests.borrow().last().unwrap(), "fr_FR");
    engine.on_user_model_loaded(HostResult::Ok, "{}");

    // Language-prefix match: en_US -> en.
    engine.change_locale("en_US");
    assert_eq!(host.last_saved_state().locale, "en");
    engine.on_user_model_loaded(HostResult::Ok, "{}");

    // No match at all -> default language.
    engine.change_locale("es_MX");
    assert_eq!(host.last_saved_state().locale, "en");
    assert_eq!(host.user_model_requests.borrow().last().unwrap(), "en");
}

#[test]
fn testing_url_forces_a_serve_with_cooldown() {
    let host = MockHost::new();
    let config = AdsConfig {
        is_testing: true,
        ..test_config()
    };
    let mut engine = initialized_engine(&host, vec!["sports"], config);
    engine.classify_page("https://sports.example/", "sports coverage");

    // Media would normally gate the serve; the forced path skips it.
    engine.on_media_playing(9);

    engine.tab_updated(1, "https://www.iab.com/", true, false);
    assert_eq!(host.get_ads_count(), 1);
    engine.on_ads_fetched(HostResult::Ok, "US", "sports", &[ad("u1", "https://example.com/a")]);
    assert_eq!(host.shown_count(), 1);

    // Within the cooldown the same URL does not force again.
    host.now_secs.set(NOW + 10);
    engine.tab_updated(1, "https://www.iab.com/", true, false);
    assert_eq!(host.get_ads_count(), 1);

    // Past the cooldown it does.
    host.now_secs.set(NOW + 40);
    engine.tab_updated(1, "https://www.iab.com/", true, false);
    assert_eq!(host.get_ads_count(), 2);
}

#[test]
fn activity_timer_refreshes_the_catalog_once_per_arming() {
    let host = MockHost::new();
    let mut engine = initialized_engine(&host, vec!["sports"], test_config());
    assert_eq!(host.catalog_downloads.get(), 1);

    let (activity_timer, _) = host.set_timers.borrow()[0];
    engine.on_timer(activity_timer);
    assert_eq!(host.catalog_downloads.get(), 2);
    // The fire itself does not re-arm the slot.
    assert_eq!(host.set_timers.borrow().len(), 1);

    // Clearing history confirms the ad uuid, which re-arms the slot.
    engine.remove_all_history();
    assert_eq!(host.set_timers.borrow().len(), 2);
    assert!(engine.is_collecting_activity());
    assert!(!host.last_saved_state().ad_uuid.is_empty());
}

#[test]
fn first_notify_record_is_prefixed_with_restart() {
    let host = MockHost::new();
    let mut engine = initialized_engine(&host, vec!["sports"], test_config());

    engine.on_ads_fetched(HostResult::Ok, "US", "sports", &[ad("u1", "https://example.com/a")]);
    let info = host.shown.borrow()[0].clone();

    engine.on_notification_shown(&info);
    let types = host.event_types();
    assert_eq!(&types[types.len() - 2..], ["restart", "notify"]);

    engine.on_notification_shown(&info);
    engine.on_notification_result(&info, NotificationResult::Timeout);
    assert_eq!(host.count_events("restart"), 1);
}

#[test]
fn tab_events_are_reported_but_load_records_never_ship() {
    let host = MockHost::new();
    let mut engine = initialized_engine(&host, vec!["sports"], test_config());

    engine.tab_updated(1, "https://example.com/", true, false);
    engine.tab_updated(2, "https://example.org/", false, false);
    engine.tab_updated(3, "https://secret.example/", true, true); // incognito
    engine.tab_closed(2);

    assert_eq!(host.count_events("focus"), 1);
    assert_eq!(host.count_events("blur"), 1);
    assert_eq!(host.count_events("destroy"), 1);
    assert_eq!(host.count_events("load"), 0);
}

#[test]
fn search_and_shopping_flags_follow_the_visited_url() {
    let host = MockHost::new();
    let mut engine = initialized_engine(&host, vec!["sports"], test_config());

    engine.tab_updated(1, "https://www.google.com/search?q=tennis", true, false);
    let state = host.last_saved_state();
    assert!(state.search_activity);
    assert!(!state.shop_activity);

    engine.tab_updated(1, "https://www.amazon.com/gp/cart", true, false);
    let state = host.last_saved_state();
    assert!(!state.search_activity);
    assert!(state.shop_activity);
    assert_eq!(state.shop_url, "https://www.amazon.com/gp/cart");
}

#[test]
fn unidle_runs_the_allowed_check_with_serving() {
    let host = MockHost::new();
    let mut engine = initialized_engine(&host, vec!["sports"], test_config());
    engine.classify_page("https://sports.example/", "sports coverage");

    host.now_secs.set(NOW + 50);
    engine.on_un_idle();

    assert_eq!(host.last_saved_state().last_user_idle_stop_time, (NOW + 50) as u64);
    assert_eq!(host.get_ads_count(), 1);

    // When notifications are unavailable the serve is skipped but the
    // settings change is reported.
    host.notifications_available.set(false);
    let settings_before = host.count_events("settings");
    engine.on_un_idle();
    assert_eq!(host.get_ads_count(), 1);
    assert_eq!(host.count_events("settings"), settings_before + 1);
}

#[test]
fn sample_bundle_serves_without_any_gate() {
    let host = MockHost::new();
    let mut engine = initialized_engine(&host, vec!["sports"], test_config());
    engine.on_background(); // gates do not apply to the sample path

    engine.serve_sample_ad();
    assert_eq!(host.sample_bundle_requests.get(), 1);

    let json = r#"{
        "categories": {
            "drained": [],
            "technology": [
                {
                    "uuid": "s1",
                    "creativeSetId": "",
                    "advertiser": "Sample Co",
                    "notificationText": "Sample",
                    "notificationUrl": "https://sample.example/"
                }
            ]
        }
    }"#;
    engine.on_sample_bundle_loaded(HostResult::Ok, json);

    assert_eq!(host.shown_count(), 1);
    let shown = host.shown.borrow()[0].clone();
    assert_eq!(shown.category, "technology");

    // An empty creative set id is reported as the sample catalog.
    engine.on_notification_shown(&shown);
    let events = host.events.borrow();
    let notify = events
        .iter()
        .find(|e| e["data"]["type"] == "notify")
        .unwrap();
    assert_eq!(notify["data"]["notificationCatalog"], "sample-catalog");
}

#[test]
fn deinitialize_clears_state_and_kills_both_timers() {
    let host = MockHost::new();
    let mut engine = initialized_engine(&host, vec!["sports"], test_config());
    engine.classify_page("https://sports.example/", "sports coverage");

    // Arm the sustain slot too.
    engine.on_ads_fetched(HostResult::Ok, "US", "sports", &[ad("u1", "https://example.com/a")]);
    let info = host.shown.borrow()[0].clone();
    engine.on_notification_result(&info, NotificationResult::Clicked);
    assert!(engine.is_collecting_activity());
    assert!(engine.is_sustaining_ad_interaction());

    engine.deinitialize();

    assert!(!engine.is_initialized());
    assert!(!engine.is_collecting_activity());
    assert!(!engine.is_sustaining_ad_interaction());
    assert!(engine.client().page_score_history.is_empty());
    assert!(engine.client().ads_uuid_seen.is_empty());
    assert_eq!(engine.last_page_classification(), "");

    // Completions arriving late are tolerated and do nothing.
    let requests_before = host.get_ads_count();
    let shown_before = host.shown_count();
    engine.on_ads_fetched(HostResult::Ok, "US", "sports", &[ad("u2", "https://example.com/b")]);
    engine.check_ready_ad_serve(false);
    assert_eq!(host.get_ads_count(), requests_before);
    assert_eq!(host.shown_count(), shown_before);
}

#[test]
fn disabled_ads_deinitialize_on_initialize() {
    let host = MockHost::new();
    host.ads_enabled.set(false);
    let mut engine = AdsEngine::new(
        test_config(),
        host.clone(),
        Box::new(StubModel::new(vec!["sports"])),
    );

    engine.initialize();
    assert_eq!(host.state_loads.get(), 0);
    assert!(!engine.is_initialized());
}

#[test]
fn user_model_failure_leaves_the_engine_uninitialized() {
    let host = MockHost::new();
    let mut engine = AdsEngine::new(
        test_config(),
        host.clone(),
        Box::new(StubModel::new(vec!["sports"])),
    );
    engine.initialize();
    engine.on_client_state_loaded(HostResult::Failed, "");
    engine.on_user_model_loaded(HostResult::Failed, "");

    assert!(!engine.is_initialized());
    engine.classify_page("https://sports.example/", "sports coverage");
    engine.check_ready_ad_serve(false);
    assert_eq!(host.get_ads_count(), 0);
    assert!(host.last_saved_state().page_score_history.is_empty());
}

#[test]
fn save_cached_state_clears_history_when_ads_are_disabled() {
    let host = MockHost::new();
    let mut engine = initialized_engine(&host, vec!["sports"], test_config());
    engine.classify_page("https://sports.example/", "sports coverage");
    assert!(!host.last_saved_state().page_score_history.is_empty());

    host.ads_enabled.set(false);
    engine.save_cached_state();
    assert!(host.last_saved_state().page_score_history.is_empty());
}

#[test]
fn invalid_ads_are_not_surfaced() {
    let host = MockHost::new();
    let mut engine = initialized_engine(&host, vec!["sports"], test_config());

    let mut incomplete = ad("u1", "https://example.com/a");
    incomplete.advertiser.clear();
    engine.on_ads_fetched(HostResult::Ok, "US", "sports", &[incomplete]);
    assert_eq!(host.shown_count(), 0);
    assert!(host.last_saved_state().ads_shown_history.is_empty());
}
