// decision_core/src/orchestrator.rs

use crate::artifact_store::{ArtifactHealth, ArtifactStore};
use crate::capture::browser::BrowserRunner;
use crate::capture::{normalize_url, Capture, CaptureService, CaptureStatus, ViewportCapture};
use crate::config::ScanConfig;
use crate::context::{assess_stage, classify_brand};
use crate::contracts::AnalysisResult;
use crate::data_models::features::PageFeatures;
use crate::data_models::report::{
    AnalysisResponse, AnalysisStatus, AnalysisSummary, DebugInfo, PageTypeSummary,
    ResponseStatus, ScreenshotSet, ViewportShot, PIPELINE_VERSION,
};
use crate::data_models::request::{AnalysisRequest, InputMode};
use crate::engine;
use crate::evidence::{ad, landing, merge_signals, pricing};
use crate::features::vision::{features_from_elements, VisionRunner};
use crate::features::extract_from_text;
use crate::llm_client::ProseGenerator;
use crate::memory::{context_id_for_bytes, DecisionMemory, InProcessMemoryBackend};
use crate::report::{compose, ComposeInput};
use crate::utils::logger::{clear_current_request_id, log_stage_event, set_current_request_id};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};

const CAPTURE_STAGE_BUDGET: Duration = Duration::from_secs(90);
const VISION_STAGE_BUDGET: Duration = Duration::from_secs(30);
const COMPOSE_STAGE_BUDGET: Duration = Duration::from_secs(20);

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// # NDOC
/// component: `orchestrator`
/// purpose: Sequence capture → features → context → evidence → decision →
///          memory → composition with per-stage deadlines and
///          degrade-and-continue semantics.
/// invariants:
///   - Only validation produces a caller-visible error; every other failure
///     degrades its stage and the pipeline continues.
///   - Dropping the returned future cancels any suspended stage (browser
///     navigation, LLM call); artifacts already written are retained.
///   - Collaborators are constructed once and threaded through; no
///     module-level singletons.
pub struct Orchestrator {
    config: ScanConfig,
    store: Arc<ArtifactStore>,
    capture_service: CaptureService,
    memory: DecisionMemory,
    prose: Arc<dyn ProseGenerator>,
    vision: Arc<dyn VisionRunner>,
}

impl Orchestrator {
    pub fn new(
        config: ScanConfig,
        browser: Arc<dyn BrowserRunner>,
        prose: Arc<dyn ProseGenerator>,
        vision: Arc<dyn VisionRunner>,
    ) -> AnalysisResult<Self> {
        let store = Arc::new(ArtifactStore::new(
            config.artifact_dir.clone(),
            config.public_base_url.clone(),
        )?);

        let capture_service = CaptureService::new(
            browser,
            store.clone(),
            Duration::from_secs(config.capture_cache_ttl_secs),
            config.full_page_screenshots,
        );

        let memory = DecisionMemory::new(Arc::new(InProcessMemoryBackend::new(
            config.memory_ring_size,
        )));

        Ok(Orchestrator {
            config,
            store,
            capture_service,
            memory,
            prose,
            vision,
        })
    }

    /// Readiness probe: `{"status":"ok"}` once collaborators exist.
    pub fn health(&self) -> serde_json::Value {
        json!({ "status": "ok" })
    }

    pub fn artifact_health(&self) -> ArtifactHealth {
        self.store.health()
    }

    pub fn artifact_bytes(&self, filename: &str) -> AnalysisResult<Vec<u8>> {
        self.store.get(filename)
    }

    /// One request, one report. `inbound_base` is the transport's request
    /// base, used for artifact URL minting when no public base is configured.
    pub async fn analyze(
        &self,
        request: AnalysisRequest,
        inbound_base: Option<&str>,
    ) -> AnalysisResult<AnalysisResponse> {
        let request_id = format!(
            "scan_{}_{}",
            chrono::Utc::now().timestamp_millis(),
            REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        set_current_request_id(request_id);
        let result = self.run_pipeline(request, inbound_base).await;
        clear_current_request_id();
        result
    }

    async fn run_pipeline(
        &self,
        request: AnalysisRequest,
        inbound_base: Option<&str>,
    ) -> AnalysisResult<AnalysisResponse> {
        let started = Instant::now();
        let deadline = started + Duration::from_millis(self.config.request_budget_ms);
        let mut debug = DebugInfo::default();
        let mut degraded = false;

        // RECEIVED → VALIDATED | REJECTED
        request.validate_payload()?;
        debug.steps.push("validated".to_string());
        log_stage_event("validate", "ok", &json!({ "mode": request.mode.as_str() }));

        // CAPTURING (URL mode only)
        let capture: Option<Capture> = match request.mode {
            InputMode::Url => {
                let url = request.url.as_deref().expect("validated url");
                let budget = remaining_budget(deadline, CAPTURE_STAGE_BUDGET);
                let captured = match timeout(
                    budget,
                    self.capture_service
                        .capture(url, request.refresh, inbound_base),
                )
                .await
                {
                    Ok(Ok(capture)) => capture,
                    Ok(Err(e)) => return Err(e), // URL failed normalization: validation-class
                    Err(_) => {
                        debug.errors.push("capture_timeout".to_string());
                        timed_out_capture(url)
                    }
                };

                match captured.status {
                    CaptureStatus::Ok => {}
                    CaptureStatus::Degraded | CaptureStatus::Error => {
                        degraded = true;
                        for viewport in [&captured.desktop, &captured.mobile] {
                            if let Some(error) = &viewport.error {
                                let tag = capture_error_kind(error);
                                if !debug.errors.contains(&tag) {
                                    debug.errors.push(tag);
                                }
                            }
                        }
                    }
                }
                debug.steps.push("captured".to_string());
                log_stage_event(
                    "capture",
                    match captured.status {
                        CaptureStatus::Ok => "ok",
                        CaptureStatus::Degraded => "degraded",
                        CaptureStatus::Error => "error",
                    },
                    &json!({ "url": captured.url }),
                );
                Some(captured)
            }
            _ => None,
        };

        // FEATURING
        let page_text: String = match request.mode {
            InputMode::Url => capture
                .as_ref()
                .map(|c| c.extracted_text.clone())
                .unwrap_or_default(),
            InputMode::Text => request.text.clone().unwrap_or_default(),
            InputMode::Image => String::new(),
        };

        let features: PageFeatures = match request.mode {
            InputMode::Image => {
                let image = request.image.as_deref().expect("validated image");
                let budget = remaining_budget(deadline, VISION_STAGE_BUDGET);
                match timeout(budget, self.vision.detect(image)).await {
                    Ok(Ok(elements)) => features_from_elements(&elements),
                    Ok(Err(e)) => {
                        degraded = true;
                        debug.errors.push(e.tag().to_string());
                        PageFeatures::empty()
                    }
                    Err(_) => {
                        degraded = true;
                        debug.errors.push("llm_timeout".to_string());
                        PageFeatures::empty()
                    }
                }
            }
            _ => extract_from_text(&page_text, request.url.as_deref()),
        };
        debug.steps.push("features_extracted".to_string());

        // CONTEXTING
        let brand = classify_brand(
            &features,
            &page_text,
            request.url.as_deref(),
            &self.config.enterprise_brands,
        );
        let stage_assessment = assess_stage(&features, &page_text);
        debug.steps.push("context_classified".to_string());

        // EVIDENCING: ad and pricing sources are optional; absent sources
        // are simply skipped.
        let landing_signals = landing::extract(&features);
        let ad_signals = request.ad_text.as_deref().map(ad::extract);
        let pricing_source = request
            .pricing_text
            .clone()
            .or_else(|| (features.has_pricing && !page_text.is_empty()).then(|| page_text.clone()));
        let pricing_signals = pricing_source.as_deref().map(pricing::extract);
        let merged = merge_signals(&landing_signals, ad_signals.as_ref(), pricing_signals.as_ref());
        debug.steps.push("evidence_merged".to_string());

        // DECIDING (consults memory for confidence and fix suppression)
        let context_id = self.context_id(&request, capture.as_ref());
        let verdict = engine::decide(
            &merged,
            &features,
            &brand,
            &stage_assessment,
            &self.memory,
            &context_id,
        );
        debug.steps.push("decision_ranked".to_string());

        // History insight reflects prior analyses only.
        let insight = match self.memory.insight(&context_id) {
            Ok(insight) => insight,
            Err(e) => {
                degraded = true;
                debug.errors.push(e.tag().to_string());
                None
            }
        };

        // MEMORIZING
        match self.memory.record(
            &context_id,
            verdict.primary.clone(),
            stage_assessment.clone(),
        ) {
            Ok(()) => debug.steps.push("memory_recorded".to_string()),
            Err(e) => {
                degraded = true;
                if !debug.errors.contains(&e.tag().to_string()) {
                    debug.errors.push(e.tag().to_string());
                }
            }
        }

        // COMPOSING
        let compose_budget = remaining_budget(deadline, COMPOSE_STAGE_BUDGET);
        let composed = compose(
            ComposeInput {
                verdict: &verdict,
                features: &features,
                brand: &brand,
                stage: &stage_assessment,
                insight: insight.as_ref(),
                goal: request.goal,
                locale: request.locale,
            },
            self.prose.as_ref(),
            compose_budget,
        )
        .await;
        for error in &composed.errors {
            degraded = true;
            debug.errors.push(error.tag().to_string());
        }
        debug.steps.push("composed".to_string());
        if composed.used_fallback {
            debug.steps.push("compose_fallback".to_string());
        }

        if started.elapsed() > Duration::from_millis(self.config.request_budget_ms) {
            degraded = true;
        }

        // DONE: assemble the response envelope.
        let analysis_status = match (&request.mode, capture.as_ref()) {
            (InputMode::Url, Some(c)) if c.status == CaptureStatus::Error => AnalysisStatus::Error,
            _ if degraded => AnalysisStatus::Degraded,
            _ => AnalysisStatus::Ok,
        };

        let screenshots = capture.as_ref().map(|c| ScreenshotSet {
            desktop: viewport_shot(&c.desktop),
            mobile: viewport_shot(&c.mobile),
        });

        let summary = AnalysisSummary {
            url: capture.as_ref().map(|c| c.url.clone()),
            goal: request.goal.as_str().to_string(),
            locale: request.locale.as_str().to_string(),
            issues_count: 1 + verdict.secondary.iter().count(),
            quick_wins_count: composed
                .sections
                .actionable_recommendations
                .message_level
                .len(),
        };

        debug.pipeline_version = PIPELINE_VERSION.to_string();

        Ok(AnalysisResponse {
            status: ResponseStatus::Ok,
            mode: request.mode.as_str().to_string(),
            analysis_status,
            summary,
            human_report: composed.human_report,
            report_sections: composed.sections,
            primary_outcome: verdict.primary,
            secondary_outcome: verdict.secondary,
            stage_assessment,
            brand_context: brand,
            page_type: PageTypeSummary {
                r#type: features.page_type.as_str().to_string(),
                confidence: features.page_type_confidence,
            },
            decision_history_insight: insight,
            screenshots,
            debug,
        })
    }

    /// Context id: normalized URL for URL mode, payload hash otherwise.
    fn context_id(&self, request: &AnalysisRequest, capture: Option<&Capture>) -> String {
        match request.mode {
            InputMode::Url => capture
                .map(|c| c.url.clone())
                .or_else(|| request.url.as_deref().and_then(|u| normalize_url(u).ok()))
                .unwrap_or_else(|| "unknown_url".to_string()),
            InputMode::Text => {
                context_id_for_bytes(request.text.as_deref().unwrap_or_default().as_bytes())
            }
            InputMode::Image => context_id_for_bytes(request.image.as_deref().unwrap_or_default()),
        }
    }
}

fn remaining_budget(deadline: Instant, stage_budget: Duration) -> Duration {
    let remaining = deadline.saturating_duration_since(Instant::now());
    remaining.min(stage_budget).max(Duration::from_millis(1))
}

fn capture_error_kind(viewport_tag: &str) -> String {
    match viewport_tag {
        "timeout_domcontentloaded" | "screenshot_timeout" => "capture_timeout".to_string(),
        "engine_crash" => "capture_engine_crash".to_string(),
        "navigation_error" => "capture_navigation_error".to_string(),
        other => other.to_string(),
    }
}

fn timed_out_capture(url: &str) -> Capture {
    let normalized = normalize_url(url).unwrap_or_else(|_| url.to_string());
    let mut desktop = ViewportCapture::missing_viewport(crate::capture::Viewport::Desktop);
    desktop.error = Some("timeout_domcontentloaded".to_string());
    let mut mobile = ViewportCapture::missing_viewport(crate::capture::Viewport::Mobile);
    mobile.error = Some("timeout_domcontentloaded".to_string());
    Capture {
        status: CaptureStatus::Error,
        url: normalized,
        desktop,
        mobile,
        extracted_text: String::new(),
    }
}

fn viewport_shot(viewport: &ViewportCapture) -> ViewportShot {
    match &viewport.artifact {
        Some(artifact) if artifact.is_usable() => ViewportShot {
            status: if viewport.error.is_some() {
                "degraded".to_string()
            } else {
                "ok".to_string()
            },
            filename: Some(artifact.filename.clone()),
            url: artifact.url.clone(),
            data_uri: artifact.data_uri.clone(),
            width: viewport.width,
            height: viewport.height,
            error: viewport.error.clone(),
        },
        _ => ViewportShot {
            status: "error".to_string(),
            filename: None,
            url: None,
            data_uri: None,
            width: viewport.width,
            height: viewport.height,
            error: viewport
                .error
                .clone()
                .or_else(|| Some("navigation_error".to_string())),
        },
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{MockProse, MockVision};
    use super::*;
    use crate::capture::browser::BrowserError;
    use crate::capture::test_support::MockBrowserRunner;
    use tempfile::tempdir;

    fn orchestrator_with(
        runner: MockBrowserRunner,
        dir: &tempfile::TempDir,
    ) -> Orchestrator {
        let config = ScanConfig {
            artifact_dir: Some(dir.path().to_path_buf()),
            public_base_url: Some("https://scan.example.com".to_string()),
            ..ScanConfig::default()
        };
        Orchestrator::new(
            config,
            Arc::new(runner),
            Arc::new(MockProse { fail: false }),
            Arc::new(MockVision {
                elements: Vec::new(),
                fail: false,
            }),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn url_mode_produces_full_response() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator_with(
            MockBrowserRunner::ok(
                "Ship Faster With Acme\nAcme helps you close the books faster.\nStart your free trial",
            ),
            &dir,
        );

        let response = orchestrator
            .analyze(AnalysisRequest::for_url("https://acme.example.com"), None)
            .await
            .unwrap();

        assert_eq!(response.analysis_status, AnalysisStatus::Ok);
        assert_eq!(response.mode, "url");
        let screenshots = response.screenshots.expect("never null in URL mode");
        assert_eq!(screenshots.desktop.status, "ok");
        assert!(screenshots.desktop.url.is_some());
        assert!(response.debug.steps.contains(&"captured".to_string()));
        assert_eq!(response.debug.pipeline_version, "human_report_v2");
    }

    #[tokio::test]
    async fn text_mode_skips_capture() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator_with(MockBrowserRunner::ok("unused"), &dir);

        let response = orchestrator
            .analyze(
                AnalysisRequest::for_text("A plain marketing paragraph with a Sign up button."),
                None,
            )
            .await
            .unwrap();

        assert!(response.screenshots.is_none());
        assert!(!response.debug.steps.contains(&"captured".to_string()));
        assert!(response.debug.steps.contains(&"features_extracted".to_string()));
    }

    #[tokio::test]
    async fn empty_text_is_rejected_with_validation_error() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator_with(MockBrowserRunner::ok("unused"), &dir);

        let err = orchestrator
            .analyze(AnalysisRequest::for_text("   "), None)
            .await
            .expect_err("must reject");
        assert_eq!(err.tag(), "validation_error");
    }

    #[tokio::test]
    async fn total_capture_failure_still_yields_primary_outcome() {
        let dir = tempdir().unwrap();
        let mut runner = MockBrowserRunner::ok("");
        runner.fail_desktop = Some(|| BrowserError::Navigation("dns".to_string()));
        runner.fail_mobile = Some(|| BrowserError::Navigation("dns".to_string()));
        let orchestrator = orchestrator_with(runner, &dir);

        let response = orchestrator
            .analyze(
                AnalysisRequest::for_url("https://no-such-host.invalid"),
                None,
            )
            .await
            .unwrap();

        assert_eq!(response.analysis_status, AnalysisStatus::Error);
        assert_eq!(response.page_type.r#type, "other");
        assert!(response.primary_outcome.confidence <= 35);
        assert!(response
            .debug
            .errors
            .contains(&"capture_navigation_error".to_string()));
        // All seven sections still present in the report body.
        assert!(response.human_report.contains("Next Diagnostic Step"));
    }

    #[tokio::test]
    async fn partial_capture_failure_degrades_with_mobile_error_shape() {
        let dir = tempdir().unwrap();
        let mut runner = MockBrowserRunner::ok("Some Landing Page\nSign up");
        runner.fail_mobile = Some(|| BrowserError::ScreenshotTimeout);
        let orchestrator = orchestrator_with(runner, &dir);

        let response = orchestrator
            .analyze(AnalysisRequest::for_url("https://example.com"), None)
            .await
            .unwrap();

        assert_eq!(response.analysis_status, AnalysisStatus::Degraded);
        let screenshots = response.screenshots.unwrap();
        assert_eq!(screenshots.desktop.status, "ok");
        assert_eq!(screenshots.mobile.status, "error");
        assert_eq!(screenshots.mobile.error.as_deref(), Some("screenshot_timeout"));
        assert!(screenshots.mobile.url.is_none());
        assert!(screenshots.mobile.data_uri.is_none());
        assert!(response
            .debug
            .errors
            .contains(&"capture_timeout".to_string()));
    }

    #[tokio::test]
    async fn repeated_url_reuses_cached_screenshot_filenames() {
        let dir = tempdir().unwrap();
        let orchestrator =
            orchestrator_with(MockBrowserRunner::ok("Cached Landing\nSign up"), &dir);

        let first = orchestrator
            .analyze(AnalysisRequest::for_url("https://example.com"), None)
            .await
            .unwrap();
        let second = orchestrator
            .analyze(AnalysisRequest::for_url("https://example.com"), None)
            .await
            .unwrap();

        assert_eq!(
            first.screenshots.unwrap().desktop.filename,
            second.screenshots.unwrap().desktop.filename
        );
    }

    #[tokio::test]
    async fn history_insight_appears_from_second_analysis_on() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator_with(MockBrowserRunner::ok("unused"), &dir);
        let request = AnalysisRequest::for_text("A page with a Sign up form and email address.");

        let first = orchestrator.analyze(request.clone(), None).await.unwrap();
        assert!(first.decision_history_insight.is_none());

        let second = orchestrator.analyze(request, None).await.unwrap();
        assert!(second.decision_history_insight.is_some());
    }

    #[tokio::test]
    async fn llm_outage_degrades_but_completes() {
        let dir = tempdir().unwrap();
        let config = ScanConfig {
            artifact_dir: Some(dir.path().to_path_buf()),
            ..ScanConfig::default()
        };
        let orchestrator = Orchestrator::new(
            config,
            Arc::new(MockBrowserRunner::ok("unused")),
            Arc::new(MockProse { fail: true }),
            Arc::new(MockVision {
                elements: Vec::new(),
                fail: false,
            }),
        )
        .unwrap();

        let response = orchestrator
            .analyze(AnalysisRequest::for_text("Plain text payload."), None)
            .await
            .unwrap();

        assert_eq!(response.analysis_status, AnalysisStatus::Degraded);
        assert!(response.debug.errors.contains(&"llm_timeout".to_string()));
        assert!(response
            .debug
            .steps
            .contains(&"compose_fallback".to_string()));
        assert!(!response.human_report.is_empty());
    }

    #[tokio::test]
    async fn image_mode_uses_vision_elements() {
        use crate::features::vision::{DetectedElement, ElementLabel};
        let dir = tempdir().unwrap();
        let config = ScanConfig {
            artifact_dir: Some(dir.path().to_path_buf()),
            ..ScanConfig::default()
        };
        let orchestrator = Orchestrator::new(
            config,
            Arc::new(MockBrowserRunner::ok("unused")),
            Arc::new(MockProse { fail: false }),
            Arc::new(MockVision {
                elements: vec![
                    DetectedElement {
                        label: ElementLabel::Headline,
                        text: "Fresh Meals Delivered".to_string(),
                        top_fraction: 0.1,
                    },
                    DetectedElement {
                        label: ElementLabel::Cta,
                        text: "Order now".to_string(),
                        top_fraction: 0.4,
                    },
                ],
                fail: false,
            }),
        )
        .unwrap();

        let response = orchestrator
            .analyze(AnalysisRequest::for_image(vec![0u8; 16]), None)
            .await
            .unwrap();

        assert_eq!(response.mode, "image");
        assert!(response.screenshots.is_none());
        assert_eq!(response.analysis_status, AnalysisStatus::Ok);
    }

    #[tokio::test]
    async fn vision_outage_degrades_image_mode() {
        let dir = tempdir().unwrap();
        let config = ScanConfig {
            artifact_dir: Some(dir.path().to_path_buf()),
            ..ScanConfig::default()
        };
        let orchestrator = Orchestrator::new(
            config,
            Arc::new(MockBrowserRunner::ok("unused")),
            Arc::new(MockProse { fail: false }),
            Arc::new(MockVision {
                elements: Vec::new(),
                fail: true,
            }),
        )
        .unwrap();

        let response = orchestrator
            .analyze(AnalysisRequest::for_image(vec![0u8; 16]), None)
            .await
            .unwrap();

        assert_eq!(response.analysis_status, AnalysisStatus::Degraded);
        assert!(response
            .debug
            .errors
            .contains(&"llm_transport_error".to_string()));
        // The engine still produced a primary outcome from empty features.
        assert!(response.primary_outcome.confidence <= 35);
    }
}
