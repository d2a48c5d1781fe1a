// decision_core/src/integration_tests.rs

#[cfg(test)]
mod integration_tests {
    use crate::capture::browser::BrowserError;
    use crate::capture::test_support::MockBrowserRunner;
    use crate::config::ScanConfig;
    use crate::data_models::report::AnalysisStatus;
    use crate::data_models::request::{AnalysisRequest, Goal};
    use crate::engine::severity_for;
    use crate::orchestrator::test_support::{MockProse, MockVision};
    use crate::orchestrator::Orchestrator;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn orchestrator(runner: MockBrowserRunner, dir: &tempfile::TempDir) -> Orchestrator {
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
        .expect("orchestrator must construct")
    }

    // Rendered text resembling an enterprise pricing page.
    const ENTERPRISE_PRICING_TEXT: &str = "\
        Pricing built for businesses of all sizes\n\
        Pay as you go. Always know what you'll pay.\n\
        Starter $0/mo plus transaction fees. Scale plans per user.\n\
        Compare plans and start today\n\
        GDPR compliant. PCI-DSS certified. SOC 2 reports available.\n\
        Trusted by millions of businesses worldwide\n\
        English Deutsch Français\n\
        Careers Investors Newsroom\n\
        Sign up to create an account";

    #[tokio::test]
    async fn scenario_enterprise_pricing_page() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(MockBrowserRunner::ok(ENTERPRISE_PRICING_TEXT), &dir);

        let mut request = AnalysisRequest::for_url("https://stripe.com/pricing");
        request.goal = Goal::Leads;
        let response = orchestrator.analyze(request, None).await.unwrap();

        assert_eq!(response.brand_context.brand_maturity.as_str(), "enterprise");
        assert!(response.brand_context.is_enterprise_aware());
        assert!(matches!(
            response.stage_assessment.stage.as_str(),
            "evaluation" | "commitment"
        ));

        // Either the engine avoided Trust Gap, or it reframed it: the
        // generic verdict phrase must not appear anywhere.
        let full_prose = format!(
            "{} {}",
            response.human_report,
            serde_json::to_string(&response.report_sections).unwrap()
        )
        .to_lowercase();
        assert!(!full_prose.contains("lacks trust signals"));
    }

    const NEW_BRAND_SAAS_TEXT: &str = "\
        Ship Faster With Acme\n\
        Acme helps you automate the busywork so you can focus on customers.\n\
        Get started\n\
        Connect your workspace in minutes.";

    #[tokio::test]
    async fn scenario_new_brand_saas_landing() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(MockBrowserRunner::ok("unused"), &dir);

        let mut request = AnalysisRequest::for_text(NEW_BRAND_SAAS_TEXT);
        request.goal = Goal::Leads;
        let response = orchestrator.analyze(request, None).await.unwrap();

        assert_eq!(response.page_type.r#type, "landing_generic");
        assert!(matches!(
            response.stage_assessment.stage.as_str(),
            "sense_making" | "orientation"
        ));
        assert!(matches!(
            response.primary_outcome.blocker.label(),
            "Outcome Unclear" | "Trust Gap" | "Effort Too High"
        ));

        // The severity the engine used matches the fixed matrix for the
        // assessed stage.
        let expected_severity = severity_for(
            response.primary_outcome.blocker,
            response.stage_assessment.stage,
        );
        assert_eq!(
            crate::engine::expected_lift_for(expected_severity, response.primary_outcome.category),
            response.primary_outcome.expected_lift
        );
    }

    const CLINIC_TEXT: &str = "\
        Riverside Family Clinic\n\
        Same-day care for your whole family.\n\
        Book an appointment\n\
        Call now: (555) 123-4567\n\
        Visit us at 42 Harbor Street, Suite 3";

    #[tokio::test]
    async fn scenario_local_clinic_page() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(MockBrowserRunner::ok("unused"), &dir);

        let mut request = AnalysisRequest::for_text(CLINIC_TEXT);
        request.goal = Goal::Booking;
        let response = orchestrator.analyze(request, None).await.unwrap();

        assert_eq!(response.page_type.r#type, "local_service");

        // Recommendations speak appointment/call language, not SaaS trials.
        let recommendations =
            serde_json::to_string(&response.report_sections.actionable_recommendations)
                .unwrap()
                .to_lowercase();
        assert!(recommendations.contains("appointment") || recommendations.contains("call"));
        assert!(!recommendations.contains("trial"));
    }

    #[tokio::test]
    async fn scenario_cached_repeat() {
        let dir = tempdir().unwrap();
        let runner = MockBrowserRunner::ok("Cached Landing Page\nSign up");
        let orchestrator = orchestrator(runner, &dir);

        let first = orchestrator
            .analyze(AnalysisRequest::for_url("https://example.com"), None)
            .await
            .unwrap();
        let second = orchestrator
            .analyze(AnalysisRequest::for_url("https://example.com"), None)
            .await
            .unwrap();

        let first_shots = first.screenshots.unwrap();
        let second_shots = second.screenshots.unwrap();
        assert_eq!(first_shots.desktop.filename, second_shots.desktop.filename);
        assert_eq!(first_shots.mobile.filename, second_shots.mobile.filename);
    }

    // One long paragraph: no headline, no CTA, no reassurance. The engine
    // lands on Outcome Unclear every time.
    const UNSTRUCTURED_TEXT: &str = "this page is a single run-on paragraph of copy that \
        never states an outcome, never asks the visitor to do anything in particular, and \
        offers no reason to believe any of it, which makes every visit end the same way it \
        began, with the reader unsure of what was on offer or why it mattered to them at all.";

    #[tokio::test]
    async fn scenario_memory_aware_repeat() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(MockBrowserRunner::ok("unused"), &dir);
        let request = AnalysisRequest::for_text(UNSTRUCTURED_TEXT);

        let first = orchestrator.analyze(request.clone(), None).await.unwrap();
        assert_eq!(first.primary_outcome.blocker.label(), "Outcome Unclear");

        for _ in 0..3 {
            orchestrator.analyze(request.clone(), None).await.unwrap();
        }

        let fifth = orchestrator.analyze(request, None).await.unwrap();
        assert_eq!(fifth.primary_outcome.blocker.label(), "Outcome Unclear");

        let insight = fifth
            .decision_history_insight
            .expect("history insight present after prior records");
        assert!(matches!(
            insight.fatigue.level.as_str(),
            "medium" | "high" | "critical"
        ));

        // The recommendation pivoted away from the first-run surface fix.
        assert_ne!(
            fifth.primary_outcome.what_to_change_first,
            first.primary_outcome.what_to_change_first
        );
        // Persistent pattern: confidence is not dampened relative to run one.
        assert!(fifth.primary_outcome.confidence >= first.primary_outcome.confidence);
    }

    #[tokio::test]
    async fn scenario_capture_partial_failure() {
        let dir = tempdir().unwrap();
        let mut runner = MockBrowserRunner::ok("A Landing Page\nSign up now");
        runner.fail_mobile = Some(|| BrowserError::ScreenshotTimeout);
        let orchestrator = orchestrator(runner, &dir);

        let response = orchestrator
            .analyze(AnalysisRequest::for_url("https://example.com"), None)
            .await
            .unwrap();

        assert_eq!(response.analysis_status, AnalysisStatus::Degraded);

        let screenshots = response.screenshots.unwrap();
        assert_eq!(screenshots.desktop.status, "ok");
        assert!(screenshots.desktop.url.is_some() || screenshots.desktop.data_uri.is_some());
        assert_eq!(screenshots.mobile.status, "error");
        assert_eq!(
            screenshots.mobile.error.as_deref(),
            Some("screenshot_timeout")
        );
        assert!(screenshots.mobile.url.is_none());
        assert!(screenshots.mobile.data_uri.is_none());

        assert!(response
            .debug
            .errors
            .contains(&"capture_timeout".to_string()));

        // All seven sections survive the degradation.
        for heading in [
            "Executive Decision Summary",
            "Context Snapshot",
            "Decision Failure Breakdown",
            "What to Fix First",
            "Actionable Recommendations",
            "What This Will Improve",
            "Next Diagnostic Step",
        ] {
            assert!(
                response.human_report.contains(heading),
                "missing section: {}",
                heading
            );
        }
    }

    #[tokio::test]
    async fn response_serializes_to_wire_contract() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator(MockBrowserRunner::ok("Landing\nSign up"), &dir);

        let response = orchestrator
            .analyze(AnalysisRequest::for_url("https://example.com"), None)
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["status"], "ok");
        assert_eq!(value["analysisStatus"], "ok");
        assert!(value["summary"]["issues_count"].as_u64().unwrap() >= 1);
        assert!(value["report_sections"]["executive_decision_summary"].is_object());
        assert!(value["primary_outcome"]["whatToChangeFirst"].is_string());
        assert!(value["screenshots"]["desktop"]["url"].is_string());
        assert_eq!(value["debug"]["pipeline_version"], "human_report_v2");
    }
}
