//! Engine configuration and timing constants.
//!
//! All windows are expressed in wall-clock seconds as reported by the host
//! clock. Debug builds shorten the activity interval so catalog refreshes
//! can be observed without waiting a full hour.

use serde::{Deserialize, Serialize};

/// Rolling window for the hourly ad cap. Also used as the minimum-spacing
/// numerator: two ads are never shown closer together than
/// `ONE_HOUR_SECONDS / ads_per_hour`.
pub const ONE_HOUR_SECONDS: u64 = 60 * 60;

/// Shortened activity interval used when [`AdsConfig::is_debug`] is set.
pub const DEBUG_ONE_HOUR_SECONDS: u64 = 25 * 60;

/// Retention window for the ads-shown history.
pub const ONE_DAY_SECONDS: u64 = 24 * 60 * 60;

/// Delay between confirmations that the user is still viewing an ad's
/// landing page.
pub const SUSTAIN_AD_INTERACTION_AFTER_SECONDS: u64 = 10;

/// Idle threshold handed to the host during initialization.
pub const IDLE_THRESHOLD_SECONDS: u64 = 15;

/// Cooldown between forced serves triggered from the testing URL.
pub const NEXT_EASTER_EGG_STARTS_IN_SECONDS: u64 = 30;

/// Page-score history ring capacity.
pub const MAX_PAGE_SCORE_HISTORY_ENTRIES: usize = 5;

/// Locale language used when neither the requested locale nor its language
/// prefix is available on the host.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Stored in place of an empty SSID.
pub const UNKNOWN_SSID: &str = "unknown";

/// Place reported when the current SSID has no known place.
pub const UNDISCLOSED_PLACE: &str = "UNDISCLOSED";

/// Name of the JSON schema resource describing bundle payloads; resolved by
/// hosts that validate bundles before handing them over.
pub const BUNDLE_SCHEMA_NAME: &str = "bundle-schema.json";

/// Visiting this URL in a testing build forces an ad-serve attempt.
pub const EASTER_EGG_URL: &str = "https://www.iab.com/";

/// Hostname that flags shopping activity.
pub const SHOPPING_HOSTNAME: &str = "www.amazon.com";

/// Build-level switches for the engine.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AdsConfig {
    /// Use [`DEBUG_ONE_HOUR_SECONDS`] for the activity timer.
    #[serde(default)]
    pub is_debug: bool,

    /// Enable the testing-URL forced serve.
    #[serde(default)]
    pub is_testing: bool,

    /// Seed for ad selection (None = random).
    #[serde(default)]
    pub seed: Option<u64>,
}

impl AdsConfig {
    /// Interval for the catalog-refresh activity timer.
    pub fn collect_activity_interval(&self) -> u64 {
        if self.is_debug {
            DEBUG_ONE_HOUR_SECONDS
        } else {
            ONE_HOUR_SECONDS
        }
    }
}
