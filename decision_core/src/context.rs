// decision_core/src/context.rs

use crate::data_models::features::PageFeatures;
use crate::data_models::outcome::{
    AnalysisModeContext, BrandContext, BrandMaturity, DecisionStage, StageAssessment,
};
use once_cell::sync::Lazy;
use regex::Regex;

static COMPLIANCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(soc ?2|iso ?27001|gdpr|hipaa|pci[- ]dss|ccpa|fedramp)\b")
        .expect("compliance pattern must compile")
});

static LANGUAGE_SWITCHER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(english|deutsch|français|español|日本語|türkçe|فارسی)\b.*\b(english|deutsch|français|español|日本語|türkçe|فارسی)\b")
        .expect("language switcher pattern must compile")
});

static CORPORATE_LINKS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(careers|investors?|investor relations|press(?: room)?|newsroom|leadership)\b")
        .expect("corporate links pattern must compile")
});

static CONFIRMATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(thank you for|order confirmed|you're all set|welcome aboard|your account is ready|check your (?:inbox|email) to)\b")
        .expect("confirmation pattern must compile")
});

static BENEFIT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(helps? you|so you can|save[sd]? (?:time|money)|built for|designed for|without the)\b")
        .expect("benefit pattern must compile")
});

/// # NDOC
/// component: `context`
/// purpose: Infer brand maturity from lexical/structural markers only.
///          No tracking, no user data.
/// invariants:
///   - A recognizable brand token alone never yields less than `established`.
///   - `analysis_mode` is `enterprise_context_aware` for enterprise and
///     established brands, `generic` otherwise.
pub fn classify_brand(
    features: &PageFeatures,
    text: &str,
    url: Option<&str>,
    enterprise_brands: &[String],
) -> BrandContext {
    let host = url
        .and_then(|u| url::Url::parse(u).ok())
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_default();
    let lower_text = text.to_lowercase();

    let brand_token_hit = enterprise_brands
        .iter()
        .any(|brand| host.contains(brand.as_str()) || lower_text.contains(brand.as_str()));
    let compliance_hit = COMPLIANCE_PATTERN.is_match(text);
    let switcher_hit = LANGUAGE_SWITCHER_PATTERN.is_match(text);
    let corporate_hit = CORPORATE_LINKS_PATTERN.is_match(text);

    // Recognizable brand tokens weigh double: an unknown site with a
    // compliance badge is not a household name with one.
    let mut marker_score = 0;
    if brand_token_hit {
        marker_score += 2;
    }
    for hit in [compliance_hit, switcher_hit, corporate_hit] {
        if hit {
            marker_score += 1;
        }
    }

    // A mature trust-signal footprint nudges borderline cases upward.
    if features.trust_signals.len() >= 3 && marker_score > 0 {
        marker_score += 1;
    }

    let brand_maturity = match marker_score {
        0 => BrandMaturity::New,
        1 => BrandMaturity::Growing,
        2 => BrandMaturity::Established,
        _ => BrandMaturity::Enterprise,
    };

    let confidence = (0.4 + 0.15 * marker_score as f64).min(0.95);

    let analysis_mode = match brand_maturity {
        BrandMaturity::Enterprise | BrandMaturity::Established => {
            AnalysisModeContext::EnterpriseContextAware
        }
        _ => AnalysisModeContext::Generic,
    };

    BrandContext {
        brand_maturity,
        confidence,
        analysis_mode,
    }
}

/// # NDOC
/// component: `context`
/// purpose: Ordered rule ladder over the feature set; first matching rule wins.
/// invariants:
///   - Confidence = 0.5 + 0.1 × confirming signals, capped at 0.95.
///   - `signals` names every cue that fired for the chosen stage.
pub fn assess_stage(features: &PageFeatures, text: &str) -> StageAssessment {
    let strong_cta = !features.ctas.is_empty();

    // 1. Form/checkout present and pricing visible.
    if features.has_checkout_or_form && features.has_pricing {
        let mut signals = vec![
            "checkout_or_form_present".to_string(),
            "pricing_visible".to_string(),
        ];
        if strong_cta {
            signals.push("direct_cta".to_string());
        }
        return build_assessment(DecisionStage::Commitment, signals);
    }

    // 2. Comparison table or pricing visible.
    if features.has_pricing {
        let mut signals = vec!["pricing_visible".to_string()];
        if text.to_lowercase().contains("compare") {
            signals.push("comparison_language".to_string());
        }
        return build_assessment(DecisionStage::Evaluation, signals);
    }

    // 3. Educational cues dominate and no strong CTA.
    if features.has_educational_copy && !strong_cta {
        return build_assessment(
            DecisionStage::Orientation,
            vec!["educational_copy_dominant".to_string(), "no_strong_cta".to_string()],
        );
    }

    // 4. Benefit/relevance copy with a soft CTA.
    if BENEFIT_PATTERN.is_match(text) && strong_cta {
        return build_assessment(
            DecisionStage::SenseMaking,
            vec!["benefit_copy".to_string(), "soft_cta".to_string()],
        );
    }

    // 5. Confirmation/onboarding cues.
    if CONFIRMATION_PATTERN.is_match(text) {
        return build_assessment(
            DecisionStage::PostDecision,
            vec!["confirmation_cues".to_string()],
        );
    }

    build_assessment(DecisionStage::SenseMaking, Vec::new())
}

fn build_assessment(stage: DecisionStage, signals: Vec<String>) -> StageAssessment {
    let confidence = (0.5 + 0.1 * signals.len() as f64).min(0.95);
    StageAssessment {
        stage,
        confidence,
        signals,
    }
}
