// decision_core/src/engine.rs

use crate::data_models::features::{PageFeatures, PageType};
use crate::data_models::outcome::{
    BlockerCategory, BrandContext, DecisionBlocker, DecisionOutcome, DecisionStage, ExpectedLift,
    FrictionSeverity, StageAssessment, ALL_BLOCKERS,
};
use crate::data_models::signals::MergedSignals;
use crate::memory::DecisionMemory;

/// Secondary outcome must score within 15% of the primary.
const SECONDARY_SCORE_RATIO: f64 = 0.85;
/// Fixed penalty applied to Trust Gap scoring in enterprise-aware mode.
const ENTERPRISE_TRUST_PENALTY: f64 = 0.75;

/// Engine output: the ranked diagnosis plus its stage-conditional severity
/// and the memory layer's modulation notes.
#[derive(Debug, Clone)]
pub struct EngineVerdict {
    pub primary: DecisionOutcome,
    pub secondary: Option<DecisionOutcome>,
    pub severity: FrictionSeverity,
    pub findings_limited: bool,
    pub memory_note: String,
    pub fix_suppressed: bool,
}

/// # NDOC
/// component: `engine`
/// purpose: Deterministic blocker ranking with stage-conditional severity,
///          brand-aware reframing, and memory-modulated confidence.
/// invariants:
///   - Never fails: zero usable signal still yields an Outcome Unclear
///     primary at low confidence with `findings_limited` set.
///   - Secondary requires a different category and a score within 15% of
///     the primary.
pub fn decide(
    merged: &MergedSignals,
    features: &PageFeatures,
    brand: &BrandContext,
    stage_assessment: &StageAssessment,
    memory: &DecisionMemory,
    context_id: &str,
) -> EngineVerdict {
    let findings_limited = features.headlines.is_empty()
        && features.ctas.is_empty()
        && features.trust_signals.is_empty()
        && !features.has_pricing
        && !features.has_checkout_or_form;

    let mut scores: Vec<(DecisionBlocker, f64)> = ALL_BLOCKERS
        .iter()
        .map(|blocker| (*blocker, blocker_score(*blocker, &merged.signals)))
        .collect();

    if brand.is_enterprise_aware() {
        for (blocker, score) in scores.iter_mut() {
            if *blocker == DecisionBlocker::TrustGap {
                *score *= ENTERPRISE_TRUST_PENALTY;
            }
        }
    }

    // Stable ranking: sort by score descending, declaration order breaks ties.
    let order_of = |b: DecisionBlocker| ALL_BLOCKERS.iter().position(|x| *x == b).unwrap_or(0);
    scores.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| order_of(a.0).cmp(&order_of(b.0)))
    });

    let (primary_blocker, primary_score) = scores[0];
    let runner_up_score = scores.get(1).map(|(_, s)| *s).unwrap_or(0.0);

    let secondary_pick = scores
        .iter()
        .skip(1)
        .find(|(blocker, score)| {
            primary_score > 0.0
                && *score >= primary_score * SECONDARY_SCORE_RATIO
                && blocker.category() != primary_blocker.category()
        })
        .map(|(blocker, _)| *blocker);

    let stage = stage_assessment.stage;
    let severity = severity_for(primary_blocker, stage);

    // Confidence from the gap between primary and runner-up, seeded by the
    // merger's own confidence.
    let gap_ratio = if primary_score > 0.0 {
        ((primary_score - runner_up_score) / primary_score).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut confidence = 45.0 + merged.confidence * 25.0 + gap_ratio * 30.0;

    let (multiplier, memory_note) = match memory.adjust_confidence(
        &draft_outcome(primary_blocker, severity, features, brand, stage, 0, false),
        context_id,
    ) {
        Ok(adjusted) => adjusted,
        Err(e) => (1.0, format!("memory unavailable: {}", e.tag())),
    };
    confidence *= multiplier;

    if findings_limited {
        confidence = confidence.min(35.0);
    }
    let confidence = confidence.clamp(5.0, 100.0) as u8;

    // Repeated-fix suppression: swap in the deeper intervention family when
    // the proposed first fix near-duplicates a recent one.
    let proposed_fix = fix_text(primary_blocker, stage, features, brand, false);
    let fix_suppressed = memory
        .suppress_repeated_fix(&proposed_fix, context_id)
        .unwrap_or(false);

    let primary = draft_outcome(
        primary_blocker,
        severity,
        features,
        brand,
        stage,
        confidence,
        fix_suppressed,
    );

    let secondary = secondary_pick.map(|blocker| {
        let secondary_severity = severity_for(blocker, stage);
        let secondary_confidence = confidence.saturating_sub(10).max(5);
        draft_outcome(
            blocker,
            secondary_severity,
            features,
            brand,
            stage,
            secondary_confidence,
            false,
        )
    });

    EngineVerdict {
        primary,
        secondary,
        severity,
        findings_limited,
        memory_note,
        fix_suppressed,
    }
}

// Fixed signal→blocker weight matrix. `inv` reads the level inverted; the
// expectation gap contributes 0 when absent.
fn blocker_score(blocker: DecisionBlocker, signals: &crate::data_models::signals::DecisionSignals) -> f64 {
    let p = signals.promise_strength.ordinal() as f64;
    let e = signals.emotional_tone.ordinal() as f64;
    let r = signals.reassurance_level.ordinal() as f64;
    let k = signals.risk_exposure.ordinal() as f64;
    let c = signals.cognitive_load.ordinal() as f64;
    let u = signals.pressure_level.ordinal() as f64;
    let g = signals.expectation_gap.map(|l| l.ordinal() as f64).unwrap_or(0.0);
    let inv = |x: f64| 2.0 - x;

    match blocker {
        DecisionBlocker::OutcomeUnclear => 30.0 * inv(p) + 20.0 * c + 10.0 * g,
        DecisionBlocker::TrustGap => 30.0 * inv(r) + 25.0 * k,
        DecisionBlocker::RiskNotAddressed => 20.0 * k + 15.0 * inv(r) + 10.0 * u,
        DecisionBlocker::EffortTooHigh => 35.0 * c + 10.0 * inv(p),
        DecisionBlocker::CommitmentAnxiety => 25.0 * u + 20.0 * inv(r) + 10.0 * k,
        DecisionBlocker::MotivationMismatch => 15.0 * inv(e) + 10.0 * inv(p) + 10.0 * g,
        DecisionBlocker::IdentityMisfit => 15.0 * inv(e) + 10.0 * g + 10.0 * inv(r),
    }
}

/// Fixed 7×5 (blocker, stage) severity matrix.
pub fn severity_for(blocker: DecisionBlocker, stage: DecisionStage) -> FrictionSeverity {
    use DecisionStage::*;
    use FrictionSeverity::*;

    match blocker {
        DecisionBlocker::OutcomeUnclear => match stage {
            Orientation | SenseMaking => Warning,
            Evaluation | Commitment => Critical,
            PostDecision => Warning,
        },
        DecisionBlocker::TrustGap => match stage {
            Orientation => Natural,
            SenseMaking => Acceptable,
            Evaluation => Warning,
            Commitment => Critical,
            PostDecision => Warning,
        },
        DecisionBlocker::RiskNotAddressed => match stage {
            Orientation => Acceptable,
            SenseMaking | Evaluation => Warning,
            Commitment => Critical,
            PostDecision => Warning,
        },
        DecisionBlocker::EffortTooHigh => match stage {
            Orientation | SenseMaking => Acceptable,
            Evaluation => Warning,
            Commitment => HighRisk,
            PostDecision => Warning,
        },
        DecisionBlocker::CommitmentAnxiety => match stage {
            Orientation => Natural,
            SenseMaking => Acceptable,
            Evaluation => Warning,
            Commitment => HighRisk,
            PostDecision => Critical,
        },
        DecisionBlocker::MotivationMismatch => match stage {
            Orientation => Warning,
            SenseMaking => Critical,
            Evaluation | Commitment => Warning,
            PostDecision => Acceptable,
        },
        DecisionBlocker::IdentityMisfit => match stage {
            Orientation => Acceptable,
            SenseMaking | Evaluation | Commitment => Warning,
            PostDecision => Critical,
        },
    }
}

/// Expected lift from (severity, category); directional tiers only.
pub fn expected_lift_for(severity: FrictionSeverity, category: BlockerCategory) -> ExpectedLift {
    match severity {
        FrictionSeverity::Natural | FrictionSeverity::Acceptable => ExpectedLift::Low,
        FrictionSeverity::Warning => ExpectedLift::Medium,
        FrictionSeverity::Critical | FrictionSeverity::HighRisk => match category {
            BlockerCategory::Cognitive | BlockerCategory::Trust => ExpectedLift::High,
            BlockerCategory::Risk | BlockerCategory::Identity => ExpectedLift::Medium,
        },
    }
}

fn draft_outcome(
    blocker: DecisionBlocker,
    severity: FrictionSeverity,
    features: &PageFeatures,
    brand: &BrandContext,
    stage: DecisionStage,
    confidence: u8,
    deeper_fix: bool,
) -> DecisionOutcome {
    let category = blocker.category();
    DecisionOutcome {
        blocker,
        category,
        why: why_text(blocker, brand),
        r#where: where_text(blocker, features),
        what_to_change_first: fix_text(blocker, stage, features, brand, deeper_fix),
        confidence,
        expected_lift: expected_lift_for(severity, category),
    }
}

fn why_text(blocker: DecisionBlocker, brand: &BrandContext) -> String {
    match blocker {
        DecisionBlocker::OutcomeUnclear => {
            "Visitors cannot tell what outcome they get or what happens after they act.".to_string()
        }
        DecisionBlocker::TrustGap => {
            if brand.is_enterprise_aware() {
                // Enterprise reframing: informed-buyer friction, not brand doubt.
                "First-time buyers have fewer cues than returning customers; the page assumes familiarity it has not yet earned with them."
                    .to_string()
            } else {
                "The page asks for action before it has given visitors a reason to feel safe acting."
                    .to_string()
            }
        }
        DecisionBlocker::RiskNotAddressed => {
            "The cost of a wrong decision is left entirely with the visitor; nothing on the page absorbs it."
                .to_string()
        }
        DecisionBlocker::EffortTooHigh => {
            "The path to acting demands more reading, choosing and form-filling than the motivation on offer supports."
                .to_string()
        }
        DecisionBlocker::CommitmentAnxiety => {
            "Pressure to commit outpaces the reassurance available at the moment of commitment."
                .to_string()
        }
        DecisionBlocker::MotivationMismatch => {
            "The copy argues for the product, not for the visitor's situation; the emotional register is flat where it should connect."
                .to_string()
        }
        DecisionBlocker::IdentityMisfit => {
            "Visitors cannot see themselves in the page; who it is for is never made explicit."
                .to_string()
        }
    }
}

fn where_text(blocker: DecisionBlocker, features: &PageFeatures) -> String {
    match blocker {
        DecisionBlocker::OutcomeUnclear | DecisionBlocker::MotivationMismatch => {
            if features.headlines.is_empty() {
                "the missing or buried primary headline".to_string()
            } else {
                "the hero headline and the copy directly beneath it".to_string()
            }
        }
        DecisionBlocker::TrustGap | DecisionBlocker::RiskNotAddressed => {
            if features.has_checkout_or_form {
                "around the form and the point of commitment".to_string()
            } else {
                "near the primary call to action".to_string()
            }
        }
        DecisionBlocker::EffortTooHigh => {
            if features.has_checkout_or_form {
                "the form length and the steps before it".to_string()
            } else {
                "the density of choices ahead of the call to action".to_string()
            }
        }
        DecisionBlocker::CommitmentAnxiety => {
            if features.has_pricing {
                "the pricing terms at the moment of commitment".to_string()
            } else {
                "the commitment step and what surrounds it".to_string()
            }
        }
        DecisionBlocker::IdentityMisfit => "the audience framing across the page".to_string(),
    }
}

/// First-fix templates keyed by (blocker, stage), worded for the page type.
/// `deeper` swaps to the structural intervention family after suppression.
fn fix_text(
    blocker: DecisionBlocker,
    stage: DecisionStage,
    features: &PageFeatures,
    brand: &BrandContext,
    deeper: bool,
) -> String {
    let cta_phrase = match features.page_type {
        PageType::LocalService => "the booking or call request",
        PageType::EcommerceProduct => "the add-to-cart step",
        PageType::SaasPricing => "the trial or demo step",
        _ => "the primary call to action",
    };

    if deeper {
        return match blocker.category() {
            BlockerCategory::Cognitive => format!(
                "Surface edits have repeated without movement; restructure the page so one outcome statement leads directly into {}.",
                cta_phrase
            ),
            BlockerCategory::Trust => format!(
                "Go beyond copy: add verifiable proof (named customers, published terms) adjacent to {}.",
                cta_phrase
            ),
            BlockerCategory::Risk => format!(
                "Change the offer structure itself: remove or stage the commitment that {} currently demands.",
                cta_phrase
            ),
            BlockerCategory::Identity =>
                "Rebuild the audience framing: segment the page by who it serves and route each segment separately."
                    .to_string(),
        };
    }

    match blocker {
        DecisionBlocker::OutcomeUnclear => match stage {
            DecisionStage::Orientation | DecisionStage::SenseMaking => format!(
                "Rewrite the headline to name the concrete outcome a visitor gets, then point it at {}.",
                cta_phrase
            ),
            _ => format!(
                "State what happens immediately after {} — timeline, deliverable, first step.",
                cta_phrase
            ),
        },
        DecisionBlocker::TrustGap => {
            if brand.is_enterprise_aware() {
                format!(
                    "Add first-time-buyer clarity next to {}: what the terms are and how to evaluate fit without a sales call.",
                    cta_phrase
                )
            } else {
                format!(
                    "Place one concrete reassurance (guarantee, named customer, or security mark) directly beside {}.",
                    cta_phrase
                )
            }
        }
        DecisionBlocker::RiskNotAddressed => format!(
            "Name the visitor's downside and absorb it explicitly — refund terms or an exit path stated at {}.",
            cta_phrase
        ),
        DecisionBlocker::EffortTooHigh => match stage {
            DecisionStage::Commitment => {
                "Cut the commitment step to its minimum fields and defer everything else until after the decision."
                    .to_string()
            }
            _ => format!(
                "Remove one decision from the path: collapse the options ahead of {} into a single recommended next step.",
                cta_phrase
            ),
        },
        DecisionBlocker::CommitmentAnxiety => format!(
            "Lower the stakes at {}: show the exit (cancel terms, trial length) before asking for the decision.",
            cta_phrase
        ),
        DecisionBlocker::MotivationMismatch => {
            "Lead with the visitor's situation, not the product: open the page with the problem in their words."
                .to_string()
        }
        DecisionBlocker::IdentityMisfit => {
            "Name the audience explicitly in the headline zone so the right visitor recognizes the page is for them."
                .to_string()
        }
    }
}
