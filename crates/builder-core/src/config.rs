//! Workflow configuration, loaded from environment variables.

use builder_item_pack::DEFAULT_MAX_FILE_SIZE;

use crate::features::FeatureFlags;

/// Runtime configuration for the item workflow.
///
/// Every field has a default so an import works without any environment
/// variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// Ceiling for every archive entry and single-file drop, in bytes
    /// (default: 20 MiB).
    pub max_file_size: u64,

    /// Network segment of generated third-party URNs (default: `"mumbai"`).
    pub network: String,

    /// Edge of the square thumbnail requested from the renderer, in pixels
    /// (at least 1).
    pub thumbnail_size: u32,

    pub features: FeatureFlags,

    /// `tracing` filter string, e.g. `"info"` or `"debug,builder_core=trace"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            max_file_size: parse_env("BUILDER_MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE),
            network: env_or("BUILDER_NETWORK", DEFAULT_NETWORK),
            thumbnail_size: parse_env("BUILDER_THUMBNAIL_SIZE", DEFAULT_THUMBNAIL_SIZE).max(1),
            features: FeatureFlags::parse_list(&env_or("BUILDER_FEATURES", "")),
            log_level: env_or("BUILDER_LOG", "info"),
            log_json: std::env::var("BUILDER_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            network: DEFAULT_NETWORK.to_owned(),
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            features: FeatureFlags::default(),
            log_level: "info".to_owned(),
            log_json: false,
        }
    }
}

const DEFAULT_NETWORK: &str = "mumbai";
const DEFAULT_THUMBNAIL_SIZE: u32 = 1024;

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    parse_or(std::env::var(key).ok().as_deref(), default)
}

fn parse_or<T: std::str::FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upload_ceiling() {
        let cfg = Config::default();
        assert_eq!(cfg.max_file_size, 20 * 1024 * 1024);
        assert_eq!(cfg.network, "mumbai");
        assert_eq!(cfg.thumbnail_size, 1024);
        assert!(!cfg.log_json);
    }

    #[test]
    fn parse_falls_back_on_garbage() {
        assert_eq!(parse_env("BUILDER_TEST_UNSET_KEY", 7u32), 7);
        assert_eq!(parse_or(None, 7u32), 7);
        assert_eq!(parse_or(Some("not-a-number"), 7u32), 7);
        assert_eq!(parse_or(Some("-3"), 7u32), 7);
        assert_eq!(parse_or(Some(" 512 "), 7u32), 512);
    }

    #[test]
    fn zero_thumbnail_size_is_clamped() {
        // SAFETY: no other test reads or writes this variable.
        unsafe { std::env::set_var("BUILDER_THUMBNAIL_SIZE", "0") };
        let cfg = Config::from_env();
        unsafe { std::env::remove_var("BUILDER_THUMBNAIL_SIZE") };
        assert_eq!(cfg.thumbnail_size, 1);
    }
}
