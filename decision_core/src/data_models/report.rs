// decision_core/src/data_models/report.rs

use crate::data_models::memory::DecisionHistoryInsight;
use crate::data_models::outcome::{
    BrandContext, DecisionOutcome, ExpectedLift, StageAssessment,
};
use serde::{Deserialize, Serialize};

pub const PIPELINE_VERSION: &str = "human_report_v2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Ok,
    Degraded,
    Error,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Ok => "ok",
            AnalysisStatus::Degraded => "degraded",
            AnalysisStatus::Error => "error",
        }
    }
}

/// Per-viewport screenshot surface in the response. `filename` is the
/// artifact-store key; stable across cache hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportShot {
    pub status: String,
    pub filename: Option<String>,
    pub url: Option<String>,
    pub data_uri: Option<String>,
    pub width: u32,
    pub height: u32,
    pub error: Option<String>,
}

impl ViewportShot {
    pub fn failed(width: u32, height: u32, error: impl Into<String>) -> Self {
        ViewportShot {
            status: "error".to_string(),
            filename: None,
            url: None,
            data_uri: None,
            width,
            height,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotSet {
    pub desktop: ViewportShot,
    pub mobile: ViewportShot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub url: Option<String>,
    pub goal: String,
    pub locale: String,
    pub issues_count: usize,
    pub quick_wins_count: usize,
}

// --- Structured twin of the seven prose sections ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveDecisionSummary {
    pub primary_blocker: String,
    pub category: String,
    pub confidence: u8,
    pub findings_limited: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub business_type: String,
    pub business_type_confidence: f64,
    pub page_intent: String,
    pub decision_stage: String,
    pub decision_stage_confidence: f64,
    pub brand_maturity: String,
    pub brand_maturity_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionFailureBreakdown {
    pub primary: String,
    pub secondary: Option<String>,
    /// Present only when a secondary outcome exists.
    pub interaction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhatToFixFirst {
    pub intervention: String,
    pub rationale: String,
    pub cost_of_inaction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub text: String,
    /// Blocker label this item addresses.
    pub addresses: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionableRecommendations {
    pub message_level: Vec<RecommendationItem>,
    pub structure_level: Vec<RecommendationItem>,
    pub timing_flow: Vec<RecommendationItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhatThisWillImprove {
    pub expected_lift: ExpectedLift,
    pub expected_lift_label: String,
    pub behavioral_change: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextDiagnosticStep {
    /// Deeper-analysis suggestion; replaced by `redesign_call` at critical fatigue.
    pub suggestion: Option<String>,
    pub redesign_call: Option<String>,
    pub psychology_note: String,
}

/// # NDOC
/// component: `data_models::report`
/// purpose: Machine-readable twin of the prose report. If this validates,
///          the prose layer is allowed to run.
/// invariants:
///   - Exactly seven sections, fixed order, all always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSections {
    pub executive_decision_summary: ExecutiveDecisionSummary,
    pub context_snapshot: ContextSnapshot,
    pub decision_failure_breakdown: DecisionFailureBreakdown,
    pub what_to_fix_first: WhatToFixFirst,
    pub actionable_recommendations: ActionableRecommendations,
    pub what_this_will_improve: WhatThisWillImprove,
    pub next_diagnostic_step: NextDiagnosticStep,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageTypeSummary {
    pub r#type: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub pipeline_version: String,
    pub steps: Vec<String>,
    pub errors: Vec<String>,
}

impl Default for DebugInfo {
    fn default() -> Self {
        DebugInfo {
            pipeline_version: PIPELINE_VERSION.to_string(),
            steps: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// # NDOC
/// component: `data_models::report`
/// purpose: Final response envelope; serializes to the external JSON contract.
/// invariants:
///   - `screenshots` is never `None` in URL mode.
///   - `primary_outcome` is always present; the engine never returns "no finding".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub status: ResponseStatus,
    pub mode: String,
    #[serde(rename = "analysisStatus")]
    pub analysis_status: AnalysisStatus,
    pub summary: AnalysisSummary,
    pub human_report: String,
    pub report_sections: ReportSections,
    pub primary_outcome: DecisionOutcome,
    pub secondary_outcome: Option<DecisionOutcome>,
    pub stage_assessment: StageAssessment,
    pub brand_context: BrandContext,
    pub page_type: PageTypeSummary,
    pub decision_history_insight: Option<DecisionHistoryInsight>,
    pub screenshots: Option<ScreenshotSet>,
    pub debug: DebugInfo,
}
