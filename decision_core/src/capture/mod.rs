// decision_core/src/capture/mod.rs

pub mod browser;
pub mod cache;
pub mod text;

use crate::artifact_store::{ArtifactRef, ArtifactStore};
use crate::capture::browser::BrowserRunner;
use crate::capture::cache::CaptureCache;
use crate::contracts::AnalysisError;
use crate::utils::logger::log_capture_event;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Viewport {
    Desktop,
    Mobile,
}

impl Viewport {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Viewport::Desktop => (1365, 768),
            Viewport::Mobile => (390, 844),
        }
    }

    pub fn user_agent(&self) -> &'static str {
        match self {
            Viewport::Desktop => DESKTOP_USER_AGENT,
            Viewport::Mobile => MOBILE_USER_AGENT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Viewport::Desktop => "desktop",
            Viewport::Mobile => "mobile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStatus {
    Ok,
    Degraded,
    Error,
}

/// Per-viewport capture result. `error` is one of the machine-stable tags
/// from `BrowserError::tag()` plus `artifact_write_failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportCapture {
    pub viewport: Viewport,
    pub artifact: Option<ArtifactRef>,
    pub width: u32,
    pub height: u32,
    pub error: Option<String>,
}

impl ViewportCapture {
    pub fn missing_viewport(viewport: Viewport) -> Self {
        let (width, height) = viewport.dimensions();
        ViewportCapture {
            viewport,
            artifact: None,
            width,
            height,
            error: None,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.artifact.as_ref().map_or(false, |a| a.is_usable())
    }
}

/// # NDOC
/// component: `capture`
/// purpose: Result of headless rendering. Created once, never mutated;
///          consumed by the feature extractor and report composer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    pub status: CaptureStatus,
    pub url: String,
    pub desktop: ViewportCapture,
    pub mobile: ViewportCapture,
    pub extracted_text: String,
}

/// Normalized form of a requested URL: scheme defaulted to https, fragment
/// stripped. This is also the capture cache key and the memory context id.
pub fn normalize_url(raw: &str) -> Result<String, AnalysisError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AnalysisError::validation("'url' cannot be empty"));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let mut parsed = url::Url::parse(&with_scheme)
        .map_err(|e| AnalysisError::validation(format!("invalid url '{}': {}", raw, e)))?;
    parsed.set_fragment(None);
    Ok(parsed.to_string())
}

/// # NDOC
/// component: `capture`
/// purpose: Drive the browser runner across both viewports, persist the
///          screenshots, and cache the result per normalized URL.
/// invariants:
///   - The orchestrator always gets a `Capture`; nothing raises past here.
///   - Exactly one capture runs per normalized URL at a time (single-flight).
pub struct CaptureService {
    runner: Arc<dyn BrowserRunner>,
    store: Arc<ArtifactStore>,
    cache: CaptureCache,
    full_page: bool,
}

impl CaptureService {
    pub fn new(
        runner: Arc<dyn BrowserRunner>,
        store: Arc<ArtifactStore>,
        cache_ttl: Duration,
        full_page: bool,
    ) -> Self {
        CaptureService {
            runner,
            store,
            cache: CaptureCache::new(cache_ttl),
            full_page,
        }
    }

    pub async fn capture(
        &self,
        url: &str,
        refresh: bool,
        inbound_base: Option<&str>,
    ) -> Result<Capture, AnalysisError> {
        let normalized = normalize_url(url)?;
        let base = inbound_base.map(str::to_string);

        let capture = self
            .cache
            .get_or_capture(&normalized, refresh, || {
                self.capture_uncached(normalized.clone(), base)
            })
            .await;

        Ok(capture)
    }

    async fn capture_uncached(&self, normalized: String, inbound_base: Option<String>) -> Capture {
        let desktop = self
            .capture_viewport(&normalized, Viewport::Desktop, inbound_base.as_deref())
            .await;
        let mobile = self
            .capture_viewport(&normalized, Viewport::Mobile, inbound_base.as_deref())
            .await;

        let status = match (desktop.0.is_usable(), mobile.0.is_usable()) {
            (true, true) => CaptureStatus::Ok,
            (false, false) => CaptureStatus::Error,
            _ => CaptureStatus::Degraded,
        };

        // Desktop text preferred; mobile text is the fallback.
        let raw_text = if !desktop.1.is_empty() {
            desktop.1
        } else {
            mobile.1
        };

        Capture {
            status,
            url: normalized,
            desktop: desktop.0,
            mobile: mobile.0,
            extracted_text: text::normalize_rendered_text(&raw_text),
        }
    }

    async fn capture_viewport(
        &self,
        url: &str,
        viewport: Viewport,
        inbound_base: Option<&str>,
    ) -> (ViewportCapture, String) {
        let (vw, vh) = viewport.dimensions();

        match self.runner.render(url, viewport, self.full_page).await {
            Ok(rendered) => {
                log_capture_event(url, viewport.as_str(), "rendered");
                let mut artifact =
                    self.store
                        .put(&rendered.screenshot, "screenshot", viewport.as_str(), inbound_base, false);

                let error = if artifact.error.is_some() {
                    // The bytes are still in hand; inline them so the viewport
                    // stays usable even though the disk write failed.
                    artifact.data_uri = Some(format!(
                        "data:image/png;base64,{}",
                        base64::engine::general_purpose::STANDARD.encode(&rendered.screenshot)
                    ));
                    Some("artifact_write_failed".to_string())
                } else {
                    None
                };

                let width = if artifact.width > 0 { artifact.width } else { vw };
                let height = if artifact.height > 0 { artifact.height } else { vh };

                (
                    ViewportCapture {
                        viewport,
                        artifact: Some(artifact),
                        width,
                        height,
                        error,
                    },
                    rendered.body_text,
                )
            }
            Err(e) => {
                log_capture_event(url, viewport.as_str(), e.tag());
                (
                    ViewportCapture {
                        viewport,
                        artifact: None,
                        width: vw,
                        height: vh,
                        error: Some(e.tag().to_string()),
                    },
                    String::new(),
                )
            }
        }
    }
}
