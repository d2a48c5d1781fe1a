// decision_core/src/evidence/pricing.rs

use crate::data_models::signals::{DecisionSignals, EmotionalTone, SignalLevel};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

static PLAN_LABEL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(free|starter|basic|standard|plus|pro|professional|business|team|premium|growth|scale|enterprise)\b")
        .expect("plan label pattern must compile")
});

static VISIBLE_PRICE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[$€£₺]\s?\d|(?i)\d+\s?(?:USD|EUR|TRY)\b").expect("price pattern must compile")
});

static FEATURE_LIST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(includes?|unlimited|per (?:user|seat|month)|features?|everything in)\b")
        .expect("feature list pattern must compile")
});

static COMMITMENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(annual(?:ly)?|billed yearly|per year|12.?month|contract|minimum (?:term|commitment)|non.?refundable)\b")
        .expect("commitment pattern must compile")
});

/// # NDOC
/// component: `evidence::pricing`
/// purpose: Signals from an optional pricing HTML/text snippet. Markup is
///          stripped first; the analysis is plain-text.
pub fn extract(pricing_input: &str) -> DecisionSignals {
    let text = strip_markup(pricing_input);

    let plan_count = count_plans(&text);
    let cognitive_load = match plan_count {
        0..=2 => SignalLevel::Low,
        3..=4 => SignalLevel::Medium,
        _ => SignalLevel::High,
    };

    let visible_price = VISIBLE_PRICE_PATTERN.is_match(&text);
    let visible_features = FEATURE_LIST_PATTERN.is_match(&text);
    let reassurance_level = match (visible_price, visible_features) {
        (true, true) => SignalLevel::High,
        (true, false) | (false, true) => SignalLevel::Medium,
        (false, false) => SignalLevel::Low,
    };

    let pressure_level = if COMMITMENT_PATTERN.is_match(&text) {
        SignalLevel::High
    } else {
        SignalLevel::Low
    };

    DecisionSignals {
        // Pricing copy itself promises little; transparency is the message.
        promise_strength: reassurance_level,
        emotional_tone: EmotionalTone::Neutral.intensity(),
        reassurance_level,
        risk_exposure: reassurance_level.inverted(),
        cognitive_load,
        pressure_level,
        expectation_gap: None,
    }
}

fn strip_markup(input: &str) -> String {
    if !input.contains('<') {
        return input.to_string();
    }
    let fragment = Html::parse_fragment(input);
    fragment.root_element().text().collect::<Vec<_>>().join(" ")
}

fn count_plans(text: &str) -> usize {
    let mut seen = std::collections::HashSet::new();
    for hit in PLAN_LABEL_PATTERN.find_iter(text) {
        seen.insert(hit.as_str().to_lowercase());
    }
    seen.len()
}
