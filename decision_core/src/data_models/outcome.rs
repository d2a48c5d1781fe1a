// decision_core/src/data_models/outcome.rs

use serde::{Deserialize, Serialize};

/// # NDOC
/// component: `data_models::outcome`
/// purpose: The seven named psychological decision blockers.
/// invariants:
///   - Wire names are the human-facing labels ("Outcome Unclear", ...); frozen.
///   - Declaration order is the deterministic tie-break order in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionBlocker {
    #[serde(rename = "Outcome Unclear")]
    OutcomeUnclear,
    #[serde(rename = "Trust Gap")]
    TrustGap,
    #[serde(rename = "Risk Not Addressed")]
    RiskNotAddressed,
    #[serde(rename = "Effort Too High")]
    EffortTooHigh,
    #[serde(rename = "Commitment Anxiety")]
    CommitmentAnxiety,
    #[serde(rename = "Motivation Mismatch")]
    MotivationMismatch,
    #[serde(rename = "Identity Misfit")]
    IdentityMisfit,
}

pub const ALL_BLOCKERS: [DecisionBlocker; 7] = [
    DecisionBlocker::OutcomeUnclear,
    DecisionBlocker::TrustGap,
    DecisionBlocker::RiskNotAddressed,
    DecisionBlocker::EffortTooHigh,
    DecisionBlocker::CommitmentAnxiety,
    DecisionBlocker::MotivationMismatch,
    DecisionBlocker::IdentityMisfit,
];

impl DecisionBlocker {
    pub fn label(&self) -> &'static str {
        match self {
            DecisionBlocker::OutcomeUnclear => "Outcome Unclear",
            DecisionBlocker::TrustGap => "Trust Gap",
            DecisionBlocker::RiskNotAddressed => "Risk Not Addressed",
            DecisionBlocker::EffortTooHigh => "Effort Too High",
            DecisionBlocker::CommitmentAnxiety => "Commitment Anxiety",
            DecisionBlocker::MotivationMismatch => "Motivation Mismatch",
            DecisionBlocker::IdentityMisfit => "Identity Misfit",
        }
    }

    /// Fixed category mapping; not configurable.
    pub fn category(&self) -> BlockerCategory {
        match self {
            DecisionBlocker::OutcomeUnclear | DecisionBlocker::EffortTooHigh => {
                BlockerCategory::Cognitive
            }
            DecisionBlocker::TrustGap => BlockerCategory::Trust,
            DecisionBlocker::RiskNotAddressed | DecisionBlocker::CommitmentAnxiety => {
                BlockerCategory::Risk
            }
            DecisionBlocker::MotivationMismatch | DecisionBlocker::IdentityMisfit => {
                BlockerCategory::Identity
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockerCategory {
    Cognitive,
    Trust,
    Risk,
    Identity,
}

impl BlockerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockerCategory::Cognitive => "cognitive",
            BlockerCategory::Trust => "trust",
            BlockerCategory::Risk => "risk",
            BlockerCategory::Identity => "identity",
        }
    }
}

/// Directional expected-lift tier. Never a numeric guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedLift {
    Low,
    Medium,
    High,
}

impl ExpectedLift {
    pub fn label(&self) -> &'static str {
        match self {
            ExpectedLift::Low => "Low (+0-10%)",
            ExpectedLift::Medium => "Medium (+10-25%)",
            ExpectedLift::High => "High (+25%+)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrictionSeverity {
    Natural,
    Acceptable,
    Warning,
    Critical,
    HighRisk,
}

impl FrictionSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrictionSeverity::Natural => "natural",
            FrictionSeverity::Acceptable => "acceptable",
            FrictionSeverity::Warning => "warning",
            FrictionSeverity::Critical => "critical",
            FrictionSeverity::HighRisk => "high_risk",
        }
    }
}

/// # NDOC
/// component: `data_models::outcome`
/// purpose: One ranked blocker with its diagnosis and first fix.
/// invariants:
///   - `confidence` is 0..=100.
///   - Free-text fields are bounded (single paragraph, no markup).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    pub blocker: DecisionBlocker,
    pub category: BlockerCategory,
    pub why: String,
    pub r#where: String,
    pub what_to_change_first: String,
    pub confidence: u8,
    pub expected_lift: ExpectedLift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStage {
    Orientation,
    SenseMaking,
    Evaluation,
    Commitment,
    PostDecision,
}

pub const ALL_STAGES: [DecisionStage; 5] = [
    DecisionStage::Orientation,
    DecisionStage::SenseMaking,
    DecisionStage::Evaluation,
    DecisionStage::Commitment,
    DecisionStage::PostDecision,
];

impl DecisionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStage::Orientation => "orientation",
            DecisionStage::SenseMaking => "sense_making",
            DecisionStage::Evaluation => "evaluation",
            DecisionStage::Commitment => "commitment",
            DecisionStage::PostDecision => "post_decision",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageAssessment {
    pub stage: DecisionStage,
    pub confidence: f64,
    /// Names of the cues that forced the classification.
    pub signals: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrandMaturity {
    New,
    Growing,
    Established,
    Enterprise,
}

impl BrandMaturity {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrandMaturity::New => "new",
            BrandMaturity::Growing => "growing",
            BrandMaturity::Established => "established",
            BrandMaturity::Enterprise => "enterprise",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisModeContext {
    Generic,
    EnterpriseContextAware,
}

/// Classifier output; `analysis_mode` is chosen automatically from maturity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandContext {
    pub brand_maturity: BrandMaturity,
    pub confidence: f64,
    pub analysis_mode: AnalysisModeContext,
}

impl BrandContext {
    pub fn is_enterprise_aware(&self) -> bool {
        self.analysis_mode == AnalysisModeContext::EnterpriseContextAware
    }
}
