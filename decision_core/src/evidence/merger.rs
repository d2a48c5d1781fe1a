// decision_core/src/evidence/merger.rs

use crate::data_models::signals::{DecisionSignals, MergedSignals, SignalLevel};
use itertools::Itertools;

const LANDING_WEIGHT: f64 = 0.6;
const AD_WEIGHT: f64 = 0.2;
const PRICING_WEIGHT: f64 = 0.2;

const BASE_CONFIDENCE: f64 = 0.7;
const AGREEMENT_STEP: f64 = 0.05;
const CONFIDENCE_FLOOR: f64 = 0.4;
const CONFIDENCE_CEILING: f64 = 0.95;

/// # NDOC
/// component: `evidence::merger`
/// purpose: Weighted ordinal merge of the present evidence sources.
/// invariants:
///   - Weights 0.6/0.2/0.2 (landing/ad/pricing), normalized over present sources.
///   - Each field merges by weighted mean on low=0/medium=1/high=2, rounded
///     to nearest.
///   - Confidence starts at 0.7, ±0.05 per agreeing/disagreeing source pair
///     per field, clamped to [0.4, 0.95].
pub fn merge_signals(
    landing: &DecisionSignals,
    ad: Option<&DecisionSignals>,
    pricing: Option<&DecisionSignals>,
) -> MergedSignals {
    let mut sources: Vec<(&DecisionSignals, f64)> = vec![(landing, LANDING_WEIGHT)];
    if let Some(ad) = ad {
        sources.push((ad, AD_WEIGHT));
    }
    if let Some(pricing) = pricing {
        sources.push((pricing, PRICING_WEIGHT));
    }

    let total_weight: f64 = sources.iter().map(|(_, w)| w).sum();

    let mut merged_fields = [SignalLevel::Medium; 6];
    for (index, slot) in merged_fields.iter_mut().enumerate() {
        let weighted: f64 = sources
            .iter()
            .map(|(signals, weight)| signals.core_fields()[index].ordinal() as f64 * weight)
            .sum::<f64>()
            / total_weight;
        *slot = SignalLevel::from_ordinal(weighted.round().min(2.0) as u8);
    }

    let expectation_gap = merge_expectation_gap(&sources);

    let mut confidence = BASE_CONFIDENCE;
    for index in 0..6 {
        for (a, b) in sources.iter().tuple_combinations() {
            let left = a.0.core_fields()[index];
            let right = b.0.core_fields()[index];
            if left == right {
                confidence += AGREEMENT_STEP;
            } else {
                confidence -= AGREEMENT_STEP;
            }
        }
    }

    MergedSignals {
        signals: DecisionSignals {
            promise_strength: merged_fields[0],
            emotional_tone: merged_fields[1],
            reassurance_level: merged_fields[2],
            risk_exposure: merged_fields[3],
            cognitive_load: merged_fields[4],
            pressure_level: merged_fields[5],
            expectation_gap,
        },
        confidence: confidence.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING),
        source_count: sources.len(),
    }
}

fn merge_expectation_gap(sources: &[(&DecisionSignals, f64)]) -> Option<SignalLevel> {
    let present: Vec<(SignalLevel, f64)> = sources
        .iter()
        .filter_map(|(signals, weight)| signals.expectation_gap.map(|gap| (gap, *weight)))
        .collect();
    if present.is_empty() {
        return None;
    }
    let total: f64 = present.iter().map(|(_, w)| w).sum();
    let weighted: f64 = present
        .iter()
        .map(|(gap, weight)| gap.ordinal() as f64 * weight)
        .sum::<f64>()
        / total;
    Some(SignalLevel::from_ordinal(weighted.round().min(2.0) as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn signals(levels: [SignalLevel; 6]) -> DecisionSignals {
        DecisionSignals {
            promise_strength: levels[0],
            emotional_tone: levels[1],
            reassurance_level: levels[2],
            risk_exposure: levels[3],
            cognitive_load: levels[4],
            pressure_level: levels[5],
            expectation_gap: None,
        }
    }

    #[test]
    fn single_source_passes_through_at_base_confidence() {
        let landing = signals([SignalLevel::High; 6]);
        let merged = merge_signals(&landing, None, None);

        assert_eq!(merged.signals.promise_strength, SignalLevel::High);
        assert_eq!(merged.source_count, 1);
        assert_relative_eq!(merged.confidence, 0.7, epsilon = 1e-9);
    }

    #[test]
    fn landing_dominates_a_disagreeing_ad() {
        // landing high (0.6), ad low (0.2): weighted mean = (2*0.6)/0.8 = 1.5 → rounds to high.
        let landing = signals([SignalLevel::High; 6]);
        let ad = signals([SignalLevel::Low; 6]);
        let merged = merge_signals(&landing, Some(&ad), None);

        assert_eq!(merged.signals.promise_strength, SignalLevel::High);
    }

    #[test]
    fn full_agreement_raises_confidence() {
        let landing = signals([SignalLevel::Medium; 6]);
        let ad = signals([SignalLevel::Medium; 6]);
        let pricing = signals([SignalLevel::Medium; 6]);
        let merged = merge_signals(&landing, Some(&ad), Some(&pricing));

        // 6 fields x 3 agreeing pairs x 0.05 = +0.9, clamped to the ceiling.
        assert_relative_eq!(merged.confidence, 0.95, epsilon = 1e-9);
        assert_eq!(merged.source_count, 3);
    }

    #[test]
    fn full_disagreement_hits_the_floor() {
        let landing = signals([SignalLevel::High; 6]);
        let ad = signals([SignalLevel::Low; 6]);
        let pricing = signals([SignalLevel::Medium; 6]);
        let merged = merge_signals(&landing, Some(&ad), Some(&pricing));

        assert_relative_eq!(merged.confidence, 0.4, epsilon = 1e-9);
    }

    #[test]
    fn expectation_gap_merges_only_present_sources() {
        let mut landing = signals([SignalLevel::Medium; 6]);
        landing.expectation_gap = Some(SignalLevel::High);
        let ad = signals([SignalLevel::Medium; 6]);

        let merged = merge_signals(&landing, Some(&ad), None);
        assert_eq!(merged.signals.expectation_gap, Some(SignalLevel::High));
    }

    #[test]
    fn absent_gap_everywhere_stays_absent() {
        let landing = signals([SignalLevel::Medium; 6]);
        let merged = merge_signals(&landing, None, None);
        assert_eq!(merged.signals.expectation_gap, None);
    }
}
