//! Ad payloads.

use serde::{Deserialize, Serialize};

/// One catalog row: a creative with its targeting metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdInfo {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub creative_set_id: String,
    #[serde(default)]
    pub advertiser: String,
    #[serde(default)]
    pub notification_text: String,
    #[serde(default)]
    pub notification_url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub region: String,
}

impl AdInfo {
    /// An ad can be surfaced only when it has an advertiser, text and a
    /// landing URL.
    pub fn is_valid(&self) -> bool {
        !self.advertiser.is_empty()
            && !self.notification_text.is_empty()
            && !self.notification_url.is_empty()
    }
}

/// The subset of an ad handed to the host for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationInfo {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub creative_set_id: String,
    #[serde(default)]
    pub advertiser: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub url: String,
}

impl NotificationInfo {
    /// Build the host-facing payload for an ad served under `category`.
    /// The serving category may be an ancestor of the ad's own category
    /// after fallback.
    pub fn from_ad(ad: &AdInfo, category: &str) -> Self {
        Self {
            uuid: ad.uuid.clone(),
            creative_set_id: ad.creative_set_id.clone(),
            advertiser: ad.advertiser.clone(),
            category: category.to_string(),
            text: ad.notification_text.clone(),
            url: ad.notification_url.clone(),
        }
    }
}
