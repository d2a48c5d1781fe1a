// decision_core/src/evidence/ad.rs

use crate::data_models::signals::{DecisionSignals, EmotionalTone, SignalLevel};
use once_cell::sync::Lazy;
use regex::Regex;

static PROMISE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(get|grow|double|save|boost|increase|cut|reduce|win|fix)\b")
        .expect("ad promise pattern must compile")
});

static URGENCY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(now|today|limited|last chance|ends?|hurry|instant(?:ly)?)\b")
        .expect("ad urgency pattern must compile")
});

static REASSURANCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(free|no (?:card|credit card|commitment|obligation)|guarantee[d]?|cancel anytime|trusted)\b")
        .expect("ad reassurance pattern must compile")
});

/// # NDOC
/// component: `evidence::ad`
/// purpose: Lexical analysis of an optional ad headline/text for promise,
///          urgency and reassurance.
pub fn extract(ad_text: &str) -> DecisionSignals {
    let promise_hits = PROMISE_PATTERN.find_iter(ad_text).count();
    let urgency_hits = URGENCY_PATTERN.find_iter(ad_text).count();
    let reassurance_hits = REASSURANCE_PATTERN.find_iter(ad_text).count();

    let promise_strength = count_to_level(promise_hits);
    let pressure_level = count_to_level(urgency_hits);
    let reassurance_level = count_to_level(reassurance_hits);

    let tone = if urgency_hits > 0 {
        EmotionalTone::Urgent
    } else if promise_hits > 0 {
        EmotionalTone::Aspirational
    } else {
        EmotionalTone::Neutral
    };

    // Dense, claim-heavy ad copy is itself load.
    let word_count = ad_text.split_whitespace().count();
    let cognitive_load = if word_count > 40 || promise_hits >= 4 {
        SignalLevel::High
    } else if word_count > 20 {
        SignalLevel::Medium
    } else {
        SignalLevel::Low
    };

    DecisionSignals {
        promise_strength,
        emotional_tone: tone.intensity(),
        reassurance_level,
        risk_exposure: reassurance_level.inverted(),
        cognitive_load,
        pressure_level,
        expectation_gap: None,
    }
}

fn count_to_level(hits: usize) -> SignalLevel {
    match hits {
        0 => SignalLevel::Low,
        1 => SignalLevel::Medium,
        _ => SignalLevel::High,
    }
}
