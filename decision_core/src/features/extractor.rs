// decision_core/src/features/extractor.rs

use crate::data_models::features::{
    BlockKind, BlockLocation, CtaRef, HeadlineRef, PageFeatures, PageIntent, PageType,
    TrustSignalKind,
};
use once_cell::sync::Lazy;
use regex::Regex;

// --- Compiled pattern sets ---

static CTA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(buy now|add to cart|order now|shop now|checkout|start (?:your |a )?free trial|start trial|try (?:it )?free|get (?:a )?demo|book (?:a )?demo|sign up|subscribe|get started|book (?:an )?appointment|book now|schedule (?:a )?(?:call|visit|consultation)|call now|call us|contact us|request (?:a )?quote|get (?:a )?quote|download|join now|apply now|reserve)\b",
    )
    .expect("CTA pattern must compile")
});

static GUARANTEE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(money.?back|guaranteed?|free returns?|no.?risk|risk.?free|cancel anytime|full refund)\b")
        .expect("guarantee pattern must compile")
});

static SECURITY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(ssl|secure (?:checkout|payment)|encrypted|pci[- ]dss|soc ?2|iso ?27001|gdpr|hipaa|verified)\b")
        .expect("security pattern must compile")
});

static TESTIMONIAL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(testimonials?|reviews?|rated \d|[45](?:\.\d)? stars|what our (?:customers|clients) say|\d[\d,]* (?:happy )?(?:customers|clients|users|teams))\b"#)
        .expect("testimonial pattern must compile")
});

static LOGO_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(trusted by|as seen (?:in|on)|featured (?:in|on)|used by|loved by)\b")
        .expect("logo pattern must compile")
});

static PRICING_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([$€£₺]\s?\d|\d+\s?(?:USD|EUR|TRY|IRR)\b|/\s?mo\b|per (?:month|year|user|seat)|\bpricing\b|\bprice\b|\bplans?\b\s*(?:&|and)?\s*(?:pricing)?)")
        .expect("pricing pattern must compile")
});

static PLAN_LABEL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(starter|basic|pro|professional|business|premium|enterprise)\b.{0,40}([$€£₺]\s?\d|/\s?mo|per (?:month|user))")
        .expect("plan label pattern must compile")
});

static FORM_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(email(?: address)?|work email|password|card number|credit card|billing|checkout|your name|first name|last name|phone number|sign up|create (?:an )?account)\b")
        .expect("form pattern must compile")
});

static EDUCATIONAL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(what is|how (?:it|to) works?|how to|step.?by.?step|learn more|guide|tutorial|faq|frequently asked)\b")
        .expect("educational pattern must compile")
});

static ADDRESS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,5}\s+\w+(?:\s\w+)?\s(?:street|st\.?|avenue|ave\.?|road|rd\.?|boulevard|blvd\.?|lane|ln\.?|drive|dr\.?)\b|\(\d{3}\)\s?\d{3}[- ]?\d{4}|\b\d{3}[- ]\d{3}[- ]\d{4}\b)")
        .expect("address pattern must compile")
});

static NAV_WORDS: &[&str] = &[
    "home", "about", "contact", "blog", "login", "log in", "sign in", "features", "pricing",
    "careers", "support", "docs",
];

static FOOTER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(©|\(c\)\s?\d{4}|all rights reserved|privacy policy|terms of (?:service|use))")
        .expect("footer pattern must compile")
});

static ECOMMERCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(add to cart|free shipping|in stock|out of stock|order now|shop now|cart)\b")
        .expect("ecommerce pattern must compile")
});

static LOCAL_SERVICE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(book (?:an )?appointment|call now|call us|visit us|our (?:clinic|office|location)|opening hours|walk.?ins?)\b")
        .expect("local service pattern must compile")
});

static SAAS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(free trial|get (?:a )?demo|per (?:user|seat)|integrations?|dashboard|api|workspace)\b")
        .expect("saas pattern must compile")
});

#[derive(Debug)]
struct Block {
    text: String,
    kind: BlockKind,
    location: BlockLocation,
}

/// # NDOC
/// component: `features::extractor`
/// purpose: Deterministic text + URL → `PageFeatures`. No LLM involvement;
///          identical input text yields byte-identical output.
pub fn extract_from_text(text: &str, url: Option<&str>) -> PageFeatures {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return url_only_features(url);
    }

    let blocks = classify_blocks(trimmed);

    let headlines: Vec<HeadlineRef> = blocks
        .iter()
        .filter(|b| b.kind == BlockKind::Headline)
        .map(|b| HeadlineRef {
            text: b.text.clone(),
            location: b.location,
        })
        .collect();

    let ctas: Vec<CtaRef> = blocks
        .iter()
        .filter(|b| b.kind != BlockKind::Footer && b.kind != BlockKind::Nav)
        .flat_map(|b| {
            CTA_PATTERN
                .find_iter(&b.text)
                .map(|m| CtaRef {
                    text: m.as_str().to_string(),
                    location: b.location,
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let trust_signals = detect_trust_signals(trimmed);
    let has_pricing = PRICING_PATTERN.is_match(trimmed);
    let has_checkout_or_form = FORM_PATTERN.is_match(trimmed);

    let paragraph_blocks = blocks
        .iter()
        .filter(|b| b.kind == BlockKind::Paragraph)
        .count();
    let has_educational_copy = EDUCATIONAL_PATTERN.is_match(trimmed)
        || (paragraph_blocks * 10 >= blocks.len() * 6 && word_count(trimmed) > 300);

    assemble_features(
        headlines,
        ctas,
        trust_signals,
        has_pricing,
        has_checkout_or_form,
        has_educational_copy,
        trimmed,
    )
}

/// Shared assembly used by the text path and the vision path: scores, page
/// type and intent all derive from the collected parts the same way.
pub(crate) fn assemble_features(
    headlines: Vec<HeadlineRef>,
    ctas: Vec<CtaRef>,
    trust_signals: Vec<TrustSignalKind>,
    has_pricing: bool,
    has_checkout_or_form: bool,
    has_educational_copy: bool,
    corpus: &str,
) -> PageFeatures {
    let trust_score = compute_trust_score(&trust_signals, has_checkout_or_form);
    let clarity_score = compute_clarity_score(&headlines, &ctas);
    let friction_score = compute_friction_score(clarity_score, has_checkout_or_form, has_pricing);

    let (page_type, page_type_confidence) = decide_page_type(
        corpus,
        &ctas,
        has_pricing,
        has_checkout_or_form,
        has_educational_copy,
        !headlines.is_empty(),
    );
    let page_intent = decide_page_intent(
        corpus,
        has_pricing,
        has_checkout_or_form,
        has_educational_copy,
    );

    PageFeatures {
        trust_score,
        friction_score,
        clarity_score,
        page_type,
        page_type_confidence,
        page_intent,
        headlines,
        ctas,
        trust_signals,
        has_pricing,
        has_checkout_or_form,
        has_educational_copy,
    }
}

fn url_only_features(url: Option<&str>) -> PageFeatures {
    let mut features = PageFeatures::empty();
    // A bare URL still carries a weak hint or two.
    if let Some(url) = url {
        let lower = url.to_lowercase();
        if lower.contains("pricing") || lower.contains("plans") {
            features.has_pricing = true;
            features.page_intent = PageIntent::PricingComparison;
        }
        if lower.contains("shop") || lower.contains("product") {
            features.page_intent = PageIntent::Purchase;
        }
    }
    features
}

fn classify_blocks(text: &str) -> Vec<Block> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let total = lines.len().max(1);

    lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let location = if index * 3 < total {
                BlockLocation::Top
            } else if index * 3 < total * 2 {
                BlockLocation::Middle
            } else {
                BlockLocation::Bottom
            };

            Block {
                text: line.to_string(),
                kind: classify_line(line, index, total),
                location,
            }
        })
        .collect()
}

fn classify_line(line: &str, index: usize, total: usize) -> BlockKind {
    let words = word_count(line);

    if index + 5 >= total && FOOTER_PATTERN.is_match(line) {
        return BlockKind::Footer;
    }

    if index < 5 && words <= 8 {
        let lower = line.to_lowercase();
        let nav_hits = NAV_WORDS.iter().filter(|w| lower.contains(*w)).count();
        if nav_hits >= 2 {
            return BlockKind::Nav;
        }
    }

    if line.trim_start().starts_with(['-', '•', '*', '·']) {
        return BlockKind::List;
    }

    if words <= 3 && CTA_PATTERN.is_match(line) {
        return BlockKind::CtaCandidate;
    }

    // Headline: short, appears early or title-case-ish, no terminal punctuation.
    let ends_without_punctuation = !line.trim_end().ends_with(['.', '!', '?', ';', ':']);
    let early = index * 3 < total;
    if words <= 12 && ends_without_punctuation && (early || is_title_case(line)) {
        return BlockKind::Headline;
    }

    BlockKind::Paragraph
}

fn is_title_case(line: &str) -> bool {
    let significant: Vec<&str> = line.split_whitespace().filter(|w| w.len() > 3).collect();
    if significant.is_empty() {
        return false;
    }
    let capitalized = significant
        .iter()
        .filter(|w| w.chars().next().map_or(false, char::is_uppercase))
        .count();
    capitalized * 2 > significant.len()
}

fn detect_trust_signals(text: &str) -> Vec<TrustSignalKind> {
    let mut signals = Vec::new();
    if GUARANTEE_PATTERN.is_match(text) {
        signals.push(TrustSignalKind::Guarantee);
    }
    if SECURITY_PATTERN.is_match(text) {
        signals.push(TrustSignalKind::Security);
    }
    if TESTIMONIAL_PATTERN.is_match(text) {
        signals.push(TrustSignalKind::Testimonial);
    }
    if LOGO_PATTERN.is_match(text) {
        signals.push(TrustSignalKind::Logo);
    }
    signals
}

fn compute_trust_score(signals: &[TrustSignalKind], has_checkout_or_form: bool) -> u8 {
    let mut score: i32 = 50;
    for signal in signals {
        score += match signal {
            TrustSignalKind::Guarantee => 15,
            TrustSignalKind::Security => 10,
            TrustSignalKind::Testimonial => 12,
            TrustSignalKind::Logo => 8,
        };
    }
    // Asking for commitment with nothing reassuring on the page reads worse
    // than a page that asks for nothing.
    if has_checkout_or_form && signals.is_empty() {
        score -= 15;
    }
    score.clamp(0, 100) as u8
}

fn compute_clarity_score(headlines: &[HeadlineRef], ctas: &[CtaRef]) -> u8 {
    let mut score: i32 = 50;

    match headlines.len() {
        0 => score -= 20,
        1..=3 => score += 15,
        4..=6 => score += 5,
        _ => score -= 10,
    }

    if !headlines.is_empty() {
        let mean_len = headlines.iter().map(|h| h.text.chars().count()).sum::<usize>()
            / headlines.len();
        if (20..=70).contains(&mean_len) {
            score += 10;
        } else if mean_len > 100 {
            score -= 15;
        }
    }

    if !ctas.is_empty() {
        score += 15;
        let ratio = ctas.len() as f64 / headlines.len().max(1) as f64;
        if ratio > 3.0 {
            score -= 10;
        }
    }

    score.clamp(0, 100) as u8
}

fn compute_friction_score(clarity: u8, has_checkout_or_form: bool, has_pricing: bool) -> u8 {
    let mut score: i32 = 100 - clarity as i32;
    if has_checkout_or_form && !has_pricing {
        score += 15;
    }
    score.clamp(0, 100) as u8
}

/// Decision tree over presence flags. Tie order is fixed:
/// ecommerce_product > saas_pricing > local_service > content_informational
/// > landing_generic > other. Confidence is the fraction of satisfied
/// discriminating signals for the chosen branch.
fn decide_page_type(
    corpus: &str,
    ctas: &[CtaRef],
    has_pricing: bool,
    has_checkout_or_form: bool,
    has_educational_copy: bool,
    has_headlines: bool,
) -> (PageType, f64) {
    let ecommerce_hit = ECOMMERCE_PATTERN.is_match(corpus);
    let saas_hit = SAAS_PATTERN.is_match(corpus);
    let plan_hit = PLAN_LABEL_PATTERN.is_match(corpus);
    let local_hit = LOCAL_SERVICE_PATTERN.is_match(corpus);
    let address_hit = ADDRESS_PATTERN.is_match(corpus);
    let strong_cta = !ctas.is_empty();

    if ecommerce_hit && has_pricing {
        let satisfied = [true, has_pricing, has_checkout_or_form]
            .iter()
            .filter(|s| **s)
            .count();
        return (PageType::EcommerceProduct, satisfied as f64 / 3.0);
    }

    if saas_hit && has_pricing {
        let satisfied = [true, has_pricing, plan_hit].iter().filter(|s| **s).count();
        return (PageType::SaasPricing, satisfied as f64 / 3.0);
    }

    if local_hit {
        let satisfied = [true, address_hit, !has_pricing].iter().filter(|s| **s).count();
        return (PageType::LocalService, satisfied as f64 / 3.0);
    }

    if has_educational_copy && !strong_cta {
        return (PageType::ContentInformational, 2.0 / 3.0);
    }

    if strong_cta || has_headlines {
        let satisfied = [strong_cta, has_headlines].iter().filter(|s| **s).count();
        return (PageType::LandingGeneric, satisfied as f64 / 2.0);
    }

    (PageType::Other, 0.0)
}

fn decide_page_intent(
    corpus: &str,
    has_pricing: bool,
    has_checkout_or_form: bool,
    has_educational_copy: bool,
) -> PageIntent {
    let lower = corpus.to_lowercase();
    if has_checkout_or_form && (lower.contains("cart") || lower.contains("checkout")) {
        return PageIntent::Purchase;
    }
    if lower.contains("free trial") || lower.contains("create an account") || lower.contains("sign up")
    {
        return PageIntent::Signup;
    }
    if has_pricing && (lower.contains("plan") || lower.contains("compare")) {
        return PageIntent::PricingComparison;
    }
    if has_checkout_or_form {
        return PageIntent::LeadCapture;
    }
    if has_educational_copy {
        return PageIntent::Inform;
    }
    PageIntent::Other
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAAS_LANDING: &str = "Ship Faster With Acme\n\
        Acme helps growing teams automate their busywork.\n\
        Start your free trial\n\
        Connect your workspace and dashboard in minutes with our API and integrations.\n\
        Learn more";

    const CLINIC_PAGE: &str = "Riverside Family Clinic\n\
        Same-day visits for your whole family.\n\
        Book an appointment\n\
        Call now: (555) 123-4567\n\
        Visit us at 42 Harbor Street, Suite 3\n\
        Opening hours: Mon-Sat 8am-6pm";

    const PRICING_PAGE: &str = "Simple, transparent pricing\n\
        Starter $19/mo for individuals\n\
        Pro $49/mo per user for growing teams\n\
        Enterprise — talk to us\n\
        Start your free trial\n\
        30-day money-back guarantee. SOC 2 certified.";

    #[test]
    fn saas_text_without_pricing_is_landing_generic() {
        let features = extract_from_text(SAAS_LANDING, None);
        assert_eq!(features.page_type, PageType::LandingGeneric);
        assert!(!features.has_pricing);
        assert!(!features.ctas.is_empty());
    }

    #[test]
    fn clinic_text_is_local_service() {
        let features = extract_from_text(CLINIC_PAGE, None);
        assert_eq!(features.page_type, PageType::LocalService);
        assert!(features
            .ctas
            .iter()
            .any(|c| c.text.to_lowercase().contains("appointment")));
        assert!(features
            .ctas
            .iter()
            .any(|c| c.text.to_lowercase().contains("call now")));
    }

    #[test]
    fn pricing_page_is_saas_pricing_with_trust_signals() {
        let features = extract_from_text(PRICING_PAGE, None);
        assert_eq!(features.page_type, PageType::SaasPricing);
        assert!(features.has_pricing);
        assert!(features.trust_signals.contains(&TrustSignalKind::Guarantee));
        assert!(features.trust_signals.contains(&TrustSignalKind::Security));
        assert!(features.trust_score > 50);
    }

    #[test]
    fn ecommerce_beats_saas_in_tie_order() {
        let text = "Add to cart — $29.99, free shipping.\nStart your free trial of our dashboard.";
        let features = extract_from_text(text, None);
        assert_eq!(features.page_type, PageType::EcommerceProduct);
    }

    #[test]
    fn form_without_pricing_raises_friction() {
        let with_form = extract_from_text(
            "Great Product\nEnter your email address and credit card to continue",
            None,
        );
        let without_form = extract_from_text("Great Product\nJust words here", None);
        assert!(with_form.friction_score > without_form.friction_score);
    }

    #[test]
    fn form_without_trust_signals_lowers_trust_score() {
        let features = extract_from_text(
            "Checkout\nCard number\nBilling address\nEmail address",
            None,
        );
        assert!(features.trust_score < 50);
    }

    #[test]
    fn empty_text_with_pricing_url_hints() {
        let features = extract_from_text("", Some("https://stripe.com/pricing"));
        assert_eq!(features.page_type, PageType::Other);
        assert!(features.has_pricing);
        assert_eq!(features.page_intent, PageIntent::PricingComparison);
    }

    #[test]
    fn headline_locations_are_tagged() {
        let features = extract_from_text(SAAS_LANDING, None);
        assert!(features
            .headlines
            .iter()
            .any(|h| h.location == BlockLocation::Top));
    }

    #[test]
    fn extraction_is_deterministic_for_fixture() {
        let a = extract_from_text(PRICING_PAGE, Some("https://example.com"));
        let b = extract_from_text(PRICING_PAGE, Some("https://example.com"));
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }

    proptest! {
        #[test]
        fn extraction_is_deterministic_and_clamped(text in ".{0,600}") {
            let a = extract_from_text(&text, None);
            let b = extract_from_text(&text, None);
            prop_assert_eq!(&a, &b);
            prop_assert!(a.trust_score <= 100);
            prop_assert!(a.clarity_score <= 100);
            prop_assert!(a.friction_score <= 100);
            prop_assert!((0.0..=1.0).contains(&a.page_type_confidence));
        }
    }
}
