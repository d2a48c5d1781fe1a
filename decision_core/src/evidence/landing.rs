// decision_core/src/evidence/landing.rs

use crate::data_models::features::PageFeatures;
use crate::data_models::signals::{DecisionSignals, EmotionalTone, SignalLevel};
use crate::evidence::level_from_score;
use once_cell::sync::Lazy;
use regex::Regex;

static URGENCY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(limited(?: time)?|only \d+ left|expires?|ends? (?:today|soon|tonight)|act now|hurry|last chance|don't miss)\b")
        .expect("urgency pattern must compile")
});

static ASPIRATIONAL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(imagine|transform|unlock|elevate|dream|future|effortless(?:ly)?)\b")
        .expect("aspirational pattern must compile")
});

static CALM_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(at your (?:own )?pace|no pressure|whenever you(?:'re)? ready|take your time)\b")
        .expect("calm pattern must compile")
});

/// # NDOC
/// component: `evidence::landing`
/// purpose: Primary evidence source; maps the structured page features onto
///          the uniform signal record.
pub fn extract(features: &PageFeatures) -> DecisionSignals {
    let corpus = features
        .headlines
        .iter()
        .map(|h| h.text.as_str())
        .chain(features.ctas.iter().map(|c| c.text.as_str()))
        .collect::<Vec<_>>()
        .join(" ");

    let tone = detect_tone(&corpus);
    let pressure_level = if URGENCY_PATTERN.is_match(&corpus) {
        SignalLevel::High
    } else if tone == EmotionalTone::Urgent {
        SignalLevel::Medium
    } else {
        SignalLevel::Low
    };

    let promise_strength = level_from_score(features.clarity_score);
    let reassurance_level = level_from_score(features.trust_score);

    let risk_exposure = match features.trust_signals.len() {
        0 => SignalLevel::High,
        1 => SignalLevel::Medium,
        _ => SignalLevel::Low,
    };

    // High friction is high load; the score already inverts clarity.
    let cognitive_load = level_from_score(features.friction_score);

    // A strong promise without the reassurance to back it opens a gap.
    let expectation_gap = if promise_strength == SignalLevel::High {
        Some(reassurance_level.inverted())
    } else {
        None
    };

    DecisionSignals {
        promise_strength,
        emotional_tone: tone.intensity(),
        reassurance_level,
        risk_exposure,
        cognitive_load,
        pressure_level,
        expectation_gap,
    }
}

fn detect_tone(corpus: &str) -> EmotionalTone {
    if URGENCY_PATTERN.is_match(corpus) {
        EmotionalTone::Urgent
    } else if ASPIRATIONAL_PATTERN.is_match(corpus) {
        EmotionalTone::Aspirational
    } else if CALM_PATTERN.is_match(corpus) {
        EmotionalTone::Calm
    } else {
        EmotionalTone::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extract_from_text;

    #[test]
    fn trustless_page_has_high_risk_exposure() {
        let features = extract_from_text("Great Product\nSign up\nEmail address", None);
        let signals = extract(&features);

        assert_eq!(signals.risk_exposure, SignalLevel::High);
        assert!(signals.reassurance_level <= SignalLevel::Medium);
    }

    #[test]
    fn guaranteed_page_has_low_risk_exposure() {
        let features = extract_from_text(
            "Great Product\nMoney-back guarantee. SSL secure checkout. 4.8 stars from reviews.",
            None,
        );
        let signals = extract(&features);

        assert_eq!(signals.risk_exposure, SignalLevel::Low);
        assert_eq!(signals.reassurance_level, SignalLevel::High);
    }

    #[test]
    fn urgency_copy_raises_pressure() {
        let features = extract_from_text(
            "Limited time offer — ends tonight\nBuy now",
            None,
        );
        let signals = extract(&features);

        assert_eq!(signals.pressure_level, SignalLevel::High);
        assert_eq!(signals.emotional_tone, SignalLevel::High);
    }

    #[test]
    fn neutral_copy_keeps_pressure_low() {
        let features = extract_from_text("Our Product\nIt does things.\nLearn more", None);
        let signals = extract(&features);

        assert_eq!(signals.pressure_level, SignalLevel::Low);
    }

    #[test]
    fn expectation_gap_only_with_strong_promise() {
        let clear = extract_from_text(
            "One Clear Headline Here\nStart your free trial\nEmail address",
            None,
        );
        let clear_signals = extract(&clear);
        if clear_signals.promise_strength == SignalLevel::High {
            assert!(clear_signals.expectation_gap.is_some());
        } else {
            assert!(clear_signals.expectation_gap.is_none());
        }
    }
}
