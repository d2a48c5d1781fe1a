// decision_core/src/data_models/memory.rs

use crate::data_models::outcome::{DecisionBlocker, DecisionOutcome, StageAssessment};
use serde::{Deserialize, Serialize};

/// One remembered analysis for a context. Records are identifiers-only with
/// respect to each other; no back-pointers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalOutcome {
    pub context_id: String,
    pub outcome: DecisionOutcome,
    pub stage: StageAssessment,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

/// Classification of one observed blocker across a context's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryClass {
    /// Seen in ≥70% of analyses.
    Persistent,
    /// Seen in 40–70% of analyses.
    Weakening,
    /// Last seen three or more analyses ago.
    Resolved,
    /// First seen within the last two analyses.
    Emerging,
    Shifting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeTrajectory {
    pub blocker: DecisionBlocker,
    pub class: TrajectoryClass,
    pub occurrences: usize,
    pub analyses_total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FatigueLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl FatigueLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FatigueLevel::None => "none",
            FatigueLevel::Low => "low",
            FatigueLevel::Medium => "medium",
            FatigueLevel::High => "high",
            FatigueLevel::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionFatigueAnalysis {
    pub level: FatigueLevel,
    pub indicators: Vec<String>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustTrend {
    Improving,
    Stable,
    Worsening,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustConsistency {
    Consistent,
    Inconsistent,
    Improving,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustDynamics {
    pub trend: TrustTrend,
    pub consistency: TrustConsistency,
    pub recommendation: String,
}

/// # NDOC
/// component: `data_models::memory`
/// purpose: Memory layer output surfaced in section 7 of the report when the
///          context has at least one prior record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionHistoryInsight {
    pub what_failed: Vec<String>,
    pub what_improved: Vec<String>,
    pub what_remains_unresolved: Vec<String>,
    pub fatigue: DecisionFatigueAnalysis,
    pub trust_dynamics: TrustDynamics,
    pub trajectory_summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatigue_levels_order_by_severity() {
        assert!(FatigueLevel::None < FatigueLevel::Low);
        assert!(FatigueLevel::High < FatigueLevel::Critical);
    }

    #[test]
    fn insight_serializes_camel_case() {
        let insight = DecisionHistoryInsight {
            what_failed: vec!["Outcome Unclear persisted".to_string()],
            what_improved: vec![],
            what_remains_unresolved: vec![],
            fatigue: DecisionFatigueAnalysis {
                level: FatigueLevel::Medium,
                indicators: vec![],
                recommendation: "vary the intervention family".to_string(),
            },
            trust_dynamics: TrustDynamics {
                trend: TrustTrend::Stable,
                consistency: TrustConsistency::Consistent,
                recommendation: "keep reassurance placement".to_string(),
            },
            trajectory_summary: "one persistent cognitive blocker".to_string(),
        };
        let value = serde_json::to_value(&insight).unwrap();
        assert!(value.get("whatFailed").is_some());
        assert!(value.get("trustDynamics").is_some());
        assert_eq!(value["fatigue"]["level"], "medium");
    }
}
