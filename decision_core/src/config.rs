// decision_core/src/config.rs

use crate::invariants::ensure_range_usize;
use std::env;
use std::path::PathBuf;

const DEFAULT_REQUEST_BUDGET_MS: u64 = 120_000;
const DEFAULT_CAPTURE_CACHE_TTL_SECS: u64 = 1_800;
const DEFAULT_MEMORY_RING_SIZE: usize = 50;

/// # NDOC
/// component: `config`
/// purpose: Environment-derived runtime configuration, constructed once and
///          threaded through the orchestrator.
/// invariants:
///   - Missing variables fall back to the documented defaults; no panics.
///   - `artifact_dir = None` means "OS temp dir + artifacts" (resolved by the store).
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Public base URL used to mint absolute artifact URLs. `None` means the
    /// caller-supplied inbound base is used instead.
    pub public_base_url: Option<String>,
    pub artifact_dir: Option<PathBuf>,
    pub request_budget_ms: u64,
    pub capture_cache_ttl_secs: u64,
    pub memory_ring_size: usize,
    pub locales: Vec<String>,
    /// Recognizable brand tokens that mark enterprise/established presence.
    pub enterprise_brands: Vec<String>,
    /// Full-page screenshots are attempted in addition to above-the-fold
    /// when set (60s budget, ATF fallback on timeout).
    pub full_page_screenshots: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            public_base_url: None,
            artifact_dir: None,
            request_budget_ms: DEFAULT_REQUEST_BUDGET_MS,
            capture_cache_ttl_secs: DEFAULT_CAPTURE_CACHE_TTL_SECS,
            memory_ring_size: DEFAULT_MEMORY_RING_SIZE,
            locales: vec!["en".to_string(), "fa".to_string(), "tr".to_string()],
            enterprise_brands: default_enterprise_brands(),
            full_page_screenshots: cfg!(feature = "full_page_capture"),
        }
    }
}

impl ScanConfig {
    /// Loads configuration from the process environment (after a best-effort
    /// `.env` load, as elsewhere in this workspace).
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();

        let mut config = ScanConfig::default();

        if let Ok(base) = env::var("DSCAN_PUBLIC_BASE_URL") {
            let trimmed = base.trim_end_matches('/').to_string();
            if !trimmed.is_empty() {
                config.public_base_url = Some(trimmed);
            }
        }
        if let Ok(dir) = env::var("DSCAN_ARTIFACT_DIR") {
            if !dir.trim().is_empty() {
                config.artifact_dir = Some(PathBuf::from(dir));
            }
        }
        if let Some(ms) = parse_env_u64("DSCAN_REQUEST_BUDGET_MS") {
            config.request_budget_ms = ms;
        }
        if let Some(secs) = parse_env_u64("DSCAN_CAPTURE_CACHE_TTL_SECS") {
            config.capture_cache_ttl_secs = secs;
        }
        if let Some(size) = parse_env_u64("DSCAN_MEMORY_RING_SIZE") {
            let size = size as usize;
            if ensure_range_usize(size, 1, 500, "DSCAN_MEMORY_RING_SIZE").is_ok() {
                config.memory_ring_size = size;
            } else {
                log::warn!(target: "config", "DSCAN_MEMORY_RING_SIZE out of range; keeping default");
            }
        }

        config
    }

    pub fn supports_locale(&self, locale: &str) -> bool {
        self.locales.iter().any(|l| l == locale)
    }
}

fn parse_env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|v| v.trim().parse::<u64>().ok())
}

fn default_enterprise_brands() -> Vec<String> {
    [
        "stripe",
        "salesforce",
        "microsoft",
        "google",
        "amazon",
        "aws",
        "oracle",
        "sap",
        "adobe",
        "ibm",
        "shopify",
        "atlassian",
        "hubspot",
        "intuit",
        "zendesk",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ScanConfig::default();
        assert_eq!(config.request_budget_ms, 120_000);
        assert_eq!(config.capture_cache_ttl_secs, 1_800);
        assert_eq!(config.memory_ring_size, 50);
        assert!(config.supports_locale("en"));
        assert!(config.supports_locale("fa"));
        assert!(config.supports_locale("tr"));
        assert!(!config.supports_locale("de"));
    }

    #[test]
    fn enterprise_brand_dictionary_is_lowercase() {
        let config = ScanConfig::default();
        assert!(config
            .enterprise_brands
            .iter()
            .all(|b| b.chars().all(|c| !c.is_uppercase())));
    }
}
