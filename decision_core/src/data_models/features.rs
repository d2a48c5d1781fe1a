// decision_core/src/data_models/features.rs

use serde::{Deserialize, Serialize};

/// Coarse classification of a text block within the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Headline,
    Paragraph,
    CtaCandidate,
    List,
    Nav,
    Footer,
}

/// Coarse location tag for headlines and CTA hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockLocation {
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadlineRef {
    pub text: String,
    pub location: BlockLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtaRef {
    pub text: String,
    pub location: BlockLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustSignalKind {
    Guarantee,
    Security,
    Testimonial,
    Logo,
}

/// # NDOC
/// component: `data_models::features`
/// purpose: Page type classification with the fixed tie-break order used by
///          the extractor's decision tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    EcommerceProduct,
    SaasPricing,
    LocalService,
    ContentInformational,
    LandingGeneric,
    Other,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::EcommerceProduct => "ecommerce_product",
            PageType::SaasPricing => "saas_pricing",
            PageType::LocalService => "local_service",
            PageType::ContentInformational => "content_informational",
            PageType::LandingGeneric => "landing_generic",
            PageType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageIntent {
    Purchase,
    Signup,
    PricingComparison,
    LeadCapture,
    Inform,
    Other,
}

impl PageIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageIntent::Purchase => "purchase",
            PageIntent::Signup => "signup",
            PageIntent::PricingComparison => "pricing_comparison",
            PageIntent::LeadCapture => "lead_capture",
            PageIntent::Inform => "inform",
            PageIntent::Other => "other",
        }
    }
}

/// # NDOC
/// component: `data_models::features`
/// purpose: Structured derivation from text + URL; the extractor's only output.
/// invariants:
///   - Scores are clamped to 0..=100; `page_type_confidence` to [0,1].
///   - Byte-identical input text yields byte-identical `PageFeatures`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFeatures {
    pub trust_score: u8,
    pub friction_score: u8,
    pub clarity_score: u8,
    pub page_type: PageType,
    pub page_type_confidence: f64,
    pub page_intent: PageIntent,
    pub headlines: Vec<HeadlineRef>,
    pub ctas: Vec<CtaRef>,
    pub trust_signals: Vec<TrustSignalKind>,
    pub has_pricing: bool,
    pub has_checkout_or_form: bool,
    pub has_educational_copy: bool,
}

impl PageFeatures {
    /// Neutral features used when no artifact content is available at all
    /// (e.g. both capture viewports failed and only the URL string remains).
    pub fn empty() -> Self {
        PageFeatures {
            trust_score: 50,
            friction_score: 50,
            clarity_score: 50,
            page_type: PageType::Other,
            page_type_confidence: 0.0,
            page_intent: PageIntent::Other,
            headlines: Vec::new(),
            ctas: Vec::new(),
            trust_signals: Vec::new(),
            has_pricing: false,
            has_checkout_or_form: false,
            has_educational_copy: false,
        }
    }

    pub fn has_trust_signal(&self, kind: TrustSignalKind) -> bool {
        self.trust_signals.contains(&kind)
    }
}
