//! Feature flags consulted by the item workflow.

use std::collections::HashSet;
use std::str::FromStr;

use strum::{Display, EnumIter, EnumString};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum FeatureName {
    /// Emote thumbnail editor and emote play modes.
    #[strum(serialize = "emotes-2.0")]
    EmotesV2,
    /// Exposes the `hands_wear` wearable category.
    #[strum(serialize = "hands-category")]
    HandsCategory,
}

/// The set of enabled flags. Lookups never fail; anything unknown reads as off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    enabled: HashSet<FeatureName>,
}

impl FeatureFlags {
    pub fn new(enabled: impl IntoIterator<Item = FeatureName>) -> Self {
        Self {
            enabled: enabled.into_iter().collect(),
        }
    }

    /// Parse a comma separated list such as `"emotes-2.0, hands-category"`.
    ///
    /// Unknown names are logged and skipped.
    pub fn parse_list(list: &str) -> Self {
        let enabled = list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter_map(|name| match FeatureName::from_str(name) {
                Ok(feature) => Some(feature),
                Err(_) => {
                    warn!(feature = %name, "ignoring unknown feature flag");
                    None
                }
            })
            .collect();
        Self { enabled }
    }

    pub fn is_enabled(&self, feature: FeatureName) -> bool {
        self.enabled.contains(&feature)
    }

    pub fn enable(&mut self, feature: FeatureName) {
        self.enabled.insert(feature);
    }
}
