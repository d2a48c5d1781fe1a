// decision_core/src/memory.rs

use crate::contracts::{AnalysisError, AnalysisResult};
use crate::data_models::memory::{
    DecisionFatigueAnalysis, DecisionHistoryInsight, FatigueLevel, HistoricalOutcome,
    OutcomeTrajectory, TrajectoryClass, TrustConsistency, TrustDynamics, TrustTrend,
};
use crate::data_models::outcome::{
    BlockerCategory, DecisionBlocker, DecisionOutcome, StageAssessment, ALL_BLOCKERS,
};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

pub const DEFAULT_RING_SIZE: usize = 50;
const SUPPRESSION_WINDOW: usize = 5;
const SUPPRESSION_SIMILARITY: f64 = 0.6;

/// Context id for non-URL inputs: content hash, so the same text payload
/// accumulates history the same way a URL does.
pub fn context_id_for_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// # NDOC
/// component: `memory`
/// purpose: Storage seam for the per-context history ring. A persistent
///          store slots in by replacing this one collaborator.
/// invariants:
///   - `append` evicts the oldest record once the ring is full.
///   - `load` returns records in chronological order.
pub trait MemoryBackend: Send + Sync {
    fn append(&self, context_id: &str, record: HistoricalOutcome) -> AnalysisResult<()>;
    fn load(&self, context_id: &str) -> AnalysisResult<Vec<HistoricalOutcome>>;
}

/// In-process default backend. The outer map takes a read lock on the hot
/// path; each context carries its own mutex so appends scale per context id.
pub struct InProcessMemoryBackend {
    ring_size: usize,
    contexts: RwLock<HashMap<String, Arc<Mutex<VecDeque<HistoricalOutcome>>>>>,
}

impl InProcessMemoryBackend {
    pub fn new(ring_size: usize) -> Self {
        InProcessMemoryBackend {
            ring_size: ring_size.max(1),
            contexts: RwLock::new(HashMap::new()),
        }
    }

    fn ring_for(&self, context_id: &str) -> Arc<Mutex<VecDeque<HistoricalOutcome>>> {
        if let Some(ring) = self
            .contexts
            .read()
            .expect("memory context map poisoned")
            .get(context_id)
        {
            return ring.clone();
        }
        self.contexts
            .write()
            .expect("memory context map poisoned")
            .entry(context_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(VecDeque::new())))
            .clone()
    }
}

impl MemoryBackend for InProcessMemoryBackend {
    fn append(&self, context_id: &str, record: HistoricalOutcome) -> AnalysisResult<()> {
        let ring = self.ring_for(context_id);
        let mut guard = ring
            .lock()
            .map_err(|_| AnalysisError::memory_unavailable("memory ring poisoned"))?;
        if guard.len() >= self.ring_size {
            guard.pop_front();
        }
        guard.push_back(record);
        Ok(())
    }

    fn load(&self, context_id: &str) -> AnalysisResult<Vec<HistoricalOutcome>> {
        let ring = self.ring_for(context_id);
        let guard = ring
            .lock()
            .map_err(|_| AnalysisError::memory_unavailable("memory ring poisoned"))?;
        Ok(guard.iter().cloned().collect())
    }
}

/// # NDOC
/// component: `memory`
/// purpose: Per-context history of prior outcomes plus the derivations the
///          engine and composer consult: trajectory, fatigue, trust
///          dynamics, confidence adjustment, repeated-fix suppression.
pub struct DecisionMemory {
    backend: Arc<dyn MemoryBackend>,
}

impl DecisionMemory {
    pub fn new(backend: Arc<dyn MemoryBackend>) -> Self {
        DecisionMemory { backend }
    }

    pub fn in_process(ring_size: usize) -> Self {
        DecisionMemory::new(Arc::new(InProcessMemoryBackend::new(ring_size)))
    }

    pub fn record(
        &self,
        context_id: &str,
        outcome: DecisionOutcome,
        stage: StageAssessment,
    ) -> AnalysisResult<()> {
        self.backend.append(
            context_id,
            HistoricalOutcome {
                context_id: context_id.to_string(),
                outcome,
                stage,
                recorded_at: chrono::Utc::now(),
            },
        )
    }

    pub fn history(&self, context_id: &str) -> AnalysisResult<Vec<HistoricalOutcome>> {
        self.backend.load(context_id)
    }

    /// Classifies every blocker observed for the context.
    pub fn trajectory(&self, context_id: &str) -> AnalysisResult<Vec<OutcomeTrajectory>> {
        let history = self.history(context_id)?;
        let total = history.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let mut trajectories = Vec::new();
        for blocker in ALL_BLOCKERS {
            let indices: Vec<usize> = history
                .iter()
                .enumerate()
                .filter(|(_, r)| r.outcome.blocker == blocker)
                .map(|(i, _)| i)
                .collect();
            if indices.is_empty() {
                continue;
            }

            let occurrences = indices.len();
            let share = occurrences as f64 / total as f64;
            let first = indices[0];
            let last = *indices.last().expect("non-empty indices");

            let class = if share >= 0.7 {
                TrajectoryClass::Persistent
            } else if share >= 0.4 {
                TrajectoryClass::Weakening
            } else if total - 1 - last >= 3 {
                TrajectoryClass::Resolved
            } else if first + 2 >= total {
                TrajectoryClass::Emerging
            } else {
                TrajectoryClass::Shifting
            };

            trajectories.push(OutcomeTrajectory {
                blocker,
                class,
                occurrences,
                analyses_total: total,
            });
        }
        Ok(trajectories)
    }

    /// Fatigue rises with repeats of the same cognitive-category blocker:
    /// 2 → low, 3 → medium, 4–5 → high, ≥6 → critical.
    pub fn fatigue(&self, context_id: &str) -> AnalysisResult<DecisionFatigueAnalysis> {
        let history = self.history(context_id)?;

        let mut counts: HashMap<DecisionBlocker, usize> = HashMap::new();
        for record in &history {
            if record.outcome.category == BlockerCategory::Cognitive {
                *counts.entry(record.outcome.blocker).or_default() += 1;
            }
        }

        let dominant = ALL_BLOCKERS
            .iter()
            .filter_map(|b| counts.get(b).map(|c| (*b, *c)))
            .max_by_key(|(_, c)| *c);

        let (level, indicators) = match dominant {
            None => (FatigueLevel::None, Vec::new()),
            Some((blocker, count)) => {
                let level = match count {
                    0..=1 => FatigueLevel::None,
                    2 => FatigueLevel::Low,
                    3 => FatigueLevel::Medium,
                    4..=5 => FatigueLevel::High,
                    _ => FatigueLevel::Critical,
                };
                let indicators = if count >= 2 {
                    vec![format!(
                        "{} diagnosed {} times across {} analyses",
                        blocker.label(),
                        count,
                        history.len()
                    )]
                } else {
                    Vec::new()
                };
                (level, indicators)
            }
        };

        let recommendation = match level {
            FatigueLevel::None | FatigueLevel::Low => {
                "Continue iterating on the current intervention.".to_string()
            }
            FatigueLevel::Medium => {
                "Vary the intervention family; surface-level edits are repeating.".to_string()
            }
            FatigueLevel::High => {
                "Move to a structural intervention; repeated copy changes have not shifted the blocker."
                    .to_string()
            }
            FatigueLevel::Critical => {
                "Stop iterating. The page needs a redesign of its decision flow.".to_string()
            }
        };

        Ok(DecisionFatigueAnalysis {
            level,
            indicators,
            recommendation,
        })
    }

    /// Trust-category trend by time-windowed majority: the older half of the
    /// history is compared against the recent half.
    pub fn trust_dynamics(&self, context_id: &str) -> AnalysisResult<TrustDynamics> {
        let history = self.history(context_id)?;
        let total = history.len();

        let is_trust = |r: &HistoricalOutcome| r.outcome.category == BlockerCategory::Trust;
        let midpoint = total / 2;
        let older = history[..midpoint].iter().filter(|r| is_trust(r)).count();
        let recent = history[midpoint..].iter().filter(|r| is_trust(r)).count();

        let trend = if total < 2 || older == recent {
            TrustTrend::Stable
        } else if recent > older {
            TrustTrend::Worsening
        } else {
            TrustTrend::Improving
        };

        let distinct_blockers: std::collections::HashSet<DecisionBlocker> =
            history.iter().map(|r| r.outcome.blocker).collect();
        let consistency = if distinct_blockers.len() <= 1 {
            TrustConsistency::Consistent
        } else if trend == TrustTrend::Improving {
            TrustConsistency::Improving
        } else {
            TrustConsistency::Inconsistent
        };

        let recommendation = match trend {
            TrustTrend::Worsening => {
                "Reassurance is slipping; prioritize trust repairs before conversion work."
                    .to_string()
            }
            TrustTrend::Improving => {
                "Trust interventions are landing; keep the current reassurance placement."
                    .to_string()
            }
            TrustTrend::Stable => "No trust movement either way; monitor.".to_string(),
        };

        Ok(TrustDynamics {
            trend,
            consistency,
            recommendation,
        })
    }

    /// Confidence modulation for a proposed outcome: ×0.9 with sparse
    /// history, ×1.1 with a consistent persistent pattern, ×0.85 with
    /// conflicting history; 1.0 with no history at all.
    pub fn adjust_confidence(
        &self,
        proposed: &DecisionOutcome,
        context_id: &str,
    ) -> AnalysisResult<(f64, String)> {
        let history = self.history(context_id)?;
        let total = history.len();

        if total == 0 {
            return Ok((1.0, "no prior history for this context".to_string()));
        }
        if total < 3 {
            return Ok((0.9, "sparse history; pattern not yet established".to_string()));
        }

        let trajectories = self.trajectory(context_id)?;
        let proposed_trajectory = trajectories
            .iter()
            .find(|t| t.blocker == proposed.blocker);

        match proposed_trajectory {
            Some(t) if t.class == TrajectoryClass::Persistent => Ok((
                1.1,
                format!(
                    "{} is persistent across {} of {} analyses",
                    proposed.blocker.label(),
                    t.occurrences,
                    t.analyses_total
                ),
            )),
            Some(t) if t.class == TrajectoryClass::Shifting => Ok((
                0.85,
                "history conflicts with this diagnosis; blocker keeps shifting".to_string(),
            )),
            None => Ok((
                0.85,
                "this blocker has never been observed for the context before".to_string(),
            )),
            Some(_) => Ok((1.0, "history neither confirms nor conflicts".to_string())),
        }
    }

    /// Near-duplicate check against the fixes suggested in the last
    /// `SUPPRESSION_WINDOW` records. A hit signals the engine to recommend a
    /// deeper intervention family instead.
    pub fn suppress_repeated_fix(
        &self,
        proposed_fix: &str,
        context_id: &str,
    ) -> AnalysisResult<bool> {
        let history = self.history(context_id)?;
        let proposed_tokens = normalize_fix(proposed_fix);
        if proposed_tokens.is_empty() {
            return Ok(false);
        }

        let suppressed = history
            .iter()
            .rev()
            .take(SUPPRESSION_WINDOW)
            .any(|record| {
                let prior_tokens = normalize_fix(&record.outcome.what_to_change_first);
                jaccard(&proposed_tokens, &prior_tokens) >= SUPPRESSION_SIMILARITY
            });
        Ok(suppressed)
    }

    /// Section-7 history insight; `None` when the context has no prior record.
    pub fn insight(&self, context_id: &str) -> AnalysisResult<Option<DecisionHistoryInsight>> {
        let history = self.history(context_id)?;
        if history.is_empty() {
            return Ok(None);
        }

        let trajectories = self.trajectory(context_id)?;
        let mut what_failed = Vec::new();
        let mut what_improved = Vec::new();
        let mut what_remains_unresolved = Vec::new();

        for t in &trajectories {
            let line = format!(
                "{} ({} of {} analyses)",
                t.blocker.label(),
                t.occurrences,
                t.analyses_total
            );
            match t.class {
                TrajectoryClass::Persistent => {
                    what_failed.push(line.clone());
                    what_remains_unresolved.push(line);
                }
                TrajectoryClass::Weakening => what_failed.push(line),
                TrajectoryClass::Resolved => what_improved.push(line),
                TrajectoryClass::Emerging | TrajectoryClass::Shifting => {
                    what_remains_unresolved.push(line)
                }
            }
        }

        let trajectory_summary = if what_remains_unresolved.is_empty() {
            format!("{} analyses recorded; no open blocker pattern.", history.len())
        } else {
            format!(
                "{} analyses recorded; unresolved: {}.",
                history.len(),
                what_remains_unresolved.join(", ")
            )
        };

        Ok(Some(DecisionHistoryInsight {
            what_failed,
            what_improved,
            what_remains_unresolved,
            fatigue: self.fatigue(context_id)?,
            trust_dynamics: self.trust_dynamics(context_id)?,
            trajectory_summary,
        }))
    }
}

// Lowercased, punctuation-stripped, crudely stemmed token set.
fn normalize_fix(text: &str) -> std::collections::HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(stem)
        .collect()
}

fn stem(word: &str) -> String {
    for suffix in ["ing", "ed", "es", "s"] {
        if word.len() > suffix.len() + 2 {
            if let Some(stripped) = word.strip_suffix(suffix) {
                return stripped.to_string();
            }
        }
    }
    word.to_string()
}

fn jaccard(a: &std::collections::HashSet<String>, b: &std::collections::HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::outcome::{DecisionStage, ExpectedLift};
    use approx::assert_relative_eq;

    fn outcome(blocker: DecisionBlocker, fix: &str) -> DecisionOutcome {
        DecisionOutcome {
            blocker,
            category: blocker.category(),
            why: "test diagnosis".to_string(),
            r#where: "hero".to_string(),
            what_to_change_first: fix.to_string(),
            confidence: 70,
            expected_lift: ExpectedLift::Medium,
        }
    }

    fn stage() -> StageAssessment {
        StageAssessment {
            stage: DecisionStage::Evaluation,
            confidence: 0.7,
            signals: vec!["pricing_visible".to_string()],
        }
    }

    fn memory() -> DecisionMemory {
        DecisionMemory::in_process(DEFAULT_RING_SIZE)
    }

    #[test]
    fn record_appends_exactly_one_per_call() {
        let memory = memory();
        memory
            .record("ctx", outcome(DecisionBlocker::TrustGap, "add guarantee"), stage())
            .unwrap();
        memory
            .record("ctx", outcome(DecisionBlocker::TrustGap, "add guarantee"), stage())
            .unwrap();

        let trajectories = memory.trajectory("ctx").unwrap();
        assert_eq!(trajectories[0].occurrences, 2);
        assert_eq!(trajectories[0].analyses_total, 2);
    }

    #[test]
    fn ring_evicts_oldest_on_overflow() {
        let memory = DecisionMemory::in_process(3);
        for i in 0..5 {
            memory
                .record(
                    "ctx",
                    outcome(DecisionBlocker::OutcomeUnclear, &format!("fix {}", i)),
                    stage(),
                )
                .unwrap();
        }
        let history = memory.history("ctx").unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].outcome.what_to_change_first, "fix 2");
    }

    #[test]
    fn persistent_blocker_is_classified() {
        let memory = memory();
        for _ in 0..4 {
            memory
                .record("ctx", outcome(DecisionBlocker::OutcomeUnclear, "clarify"), stage())
                .unwrap();
        }
        memory
            .record("ctx", outcome(DecisionBlocker::TrustGap, "reassure"), stage())
            .unwrap();

        let trajectories = memory.trajectory("ctx").unwrap();
        let unclear = trajectories
            .iter()
            .find(|t| t.blocker == DecisionBlocker::OutcomeUnclear)
            .unwrap();
        assert_eq!(unclear.class, TrajectoryClass::Persistent);
    }

    #[test]
    fn resolved_blocker_is_classified() {
        let memory = memory();
        memory
            .record("ctx", outcome(DecisionBlocker::TrustGap, "reassure"), stage())
            .unwrap();
        for _ in 0..9 {
            memory
                .record("ctx", outcome(DecisionBlocker::EffortTooHigh, "simplify"), stage())
                .unwrap();
        }

        let trajectories = memory.trajectory("ctx").unwrap();
        let trust = trajectories
            .iter()
            .find(|t| t.blocker == DecisionBlocker::TrustGap)
            .unwrap();
        assert_eq!(trust.class, TrajectoryClass::Resolved);
    }

    #[test]
    fn emerging_blocker_is_classified() {
        let memory = memory();
        for _ in 0..6 {
            memory
                .record("ctx", outcome(DecisionBlocker::EffortTooHigh, "simplify"), stage())
                .unwrap();
        }
        memory
            .record("ctx", outcome(DecisionBlocker::IdentityMisfit, "reframe"), stage())
            .unwrap();

        let trajectories = memory.trajectory("ctx").unwrap();
        let identity = trajectories
            .iter()
            .find(|t| t.blocker == DecisionBlocker::IdentityMisfit)
            .unwrap();
        assert_eq!(identity.class, TrajectoryClass::Emerging);
    }

    #[test]
    fn fatigue_is_high_after_four_cognitive_repeats() {
        let memory = memory();
        for _ in 0..4 {
            memory
                .record("ctx", outcome(DecisionBlocker::OutcomeUnclear, "clarify"), stage())
                .unwrap();
        }

        let fatigue = memory.fatigue("ctx").unwrap();
        assert_eq!(fatigue.level, FatigueLevel::High);
        assert!(!fatigue.indicators.is_empty());
    }

    #[test]
    fn fatigue_is_critical_after_six_repeats() {
        let memory = memory();
        for _ in 0..6 {
            memory
                .record("ctx", outcome(DecisionBlocker::EffortTooHigh, "simplify"), stage())
                .unwrap();
        }
        assert_eq!(memory.fatigue("ctx").unwrap().level, FatigueLevel::Critical);
    }

    #[test]
    fn trust_category_repeats_do_not_fatigue() {
        let memory = memory();
        for _ in 0..6 {
            memory
                .record("ctx", outcome(DecisionBlocker::TrustGap, "reassure"), stage())
                .unwrap();
        }
        assert_eq!(memory.fatigue("ctx").unwrap().level, FatigueLevel::None);
    }

    #[test]
    fn trust_trend_worsens_when_recent_half_is_heavier() {
        let memory = memory();
        for _ in 0..3 {
            memory
                .record("ctx", outcome(DecisionBlocker::OutcomeUnclear, "clarify"), stage())
                .unwrap();
        }
        for _ in 0..3 {
            memory
                .record("ctx", outcome(DecisionBlocker::TrustGap, "reassure"), stage())
                .unwrap();
        }

        let dynamics = memory.trust_dynamics("ctx").unwrap();
        assert_eq!(dynamics.trend, TrustTrend::Worsening);
    }

    #[test]
    fn confidence_rules_follow_history_depth() {
        let memory = memory();
        let proposed = outcome(DecisionBlocker::OutcomeUnclear, "clarify the promise");

        let (multiplier, _) = memory.adjust_confidence(&proposed, "ctx").unwrap();
        assert_relative_eq!(multiplier, 1.0);

        memory.record("ctx", proposed.clone(), stage()).unwrap();
        let (multiplier, _) = memory.adjust_confidence(&proposed, "ctx").unwrap();
        assert_relative_eq!(multiplier, 0.9);

        for _ in 0..3 {
            memory.record("ctx", proposed.clone(), stage()).unwrap();
        }
        let (multiplier, note) = memory.adjust_confidence(&proposed, "ctx").unwrap();
        assert_relative_eq!(multiplier, 1.1);
        assert!(note.contains("persistent"));
    }

    #[test]
    fn conflicting_history_dampens_confidence() {
        let memory = memory();
        for blocker in [
            DecisionBlocker::TrustGap,
            DecisionBlocker::EffortTooHigh,
            DecisionBlocker::IdentityMisfit,
            DecisionBlocker::CommitmentAnxiety,
        ] {
            memory.record("ctx", outcome(blocker, "fix"), stage()).unwrap();
        }

        let proposed = outcome(DecisionBlocker::MotivationMismatch, "motivate");
        let (multiplier, _) = memory.adjust_confidence(&proposed, "ctx").unwrap();
        assert_relative_eq!(multiplier, 0.85);
    }

    #[test]
    fn near_duplicate_fix_is_suppressed() {
        let memory = memory();
        memory
            .record(
                "ctx",
                outcome(
                    DecisionBlocker::OutcomeUnclear,
                    "Rewrite the hero headline to state the concrete outcome",
                ),
                stage(),
            )
            .unwrap();

        let suppressed = memory
            .suppress_repeated_fix(
                "Rewrite the hero headline stating the concrete outcome",
                "ctx",
            )
            .unwrap();
        assert!(suppressed);

        let different = memory
            .suppress_repeated_fix("Add a money-back guarantee near the checkout button", "ctx")
            .unwrap();
        assert!(!different);
    }

    #[test]
    fn insight_is_none_without_history() {
        let memory = memory();
        assert!(memory.insight("ctx").unwrap().is_none());
    }

    #[test]
    fn insight_summarizes_trajectories() {
        let memory = memory();
        for _ in 0..4 {
            memory
                .record("ctx", outcome(DecisionBlocker::OutcomeUnclear, "clarify"), stage())
                .unwrap();
        }

        let insight = memory.insight("ctx").unwrap().unwrap();
        assert!(insight
            .what_remains_unresolved
            .iter()
            .any(|l| l.contains("Outcome Unclear")));
        assert_eq!(insight.fatigue.level, FatigueLevel::High);
    }

    #[test]
    fn context_id_for_bytes_is_stable() {
        assert_eq!(
            context_id_for_bytes(b"same payload"),
            context_id_for_bytes(b"same payload")
        );
        assert_ne!(
            context_id_for_bytes(b"payload a"),
            context_id_for_bytes(b"payload b")
        );
    }
}
