// decision_core/src/features/vision.rs

use crate::contracts::AnalysisError;
use crate::data_models::features::{
    BlockLocation, CtaRef, HeadlineRef, PageFeatures, TrustSignalKind,
};
use crate::features::extractor::assemble_features;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Element classes a vision/OCR collaborator can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementLabel {
    Headline,
    Cta,
    TrustBadge,
    PriceTag,
    FormField,
    Paragraph,
    Logo,
    Other,
}

/// One detected element box with its textual label. `top_fraction` is the
/// box's vertical position on the image, 0.0 = top edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedElement {
    pub label: ElementLabel,
    pub text: String,
    pub top_fraction: f64,
}

/// # NDOC
/// component: `features::vision`
/// purpose: Mockable seam over the vision/OCR collaborator used for image
///          inputs. The extractor consumes its detections; it never sees
///          raw pixels.
#[async_trait]
pub trait VisionRunner: Send + Sync {
    async fn detect(&self, image: &[u8]) -> Result<Vec<DetectedElement>, AnalysisError>;
}

fn location_of(element: &DetectedElement) -> BlockLocation {
    if element.top_fraction < 1.0 / 3.0 {
        BlockLocation::Top
    } else if element.top_fraction < 2.0 / 3.0 {
        BlockLocation::Middle
    } else {
        BlockLocation::Bottom
    }
}

/// Builds `PageFeatures` from detected elements using the same score
/// formulas as the text path; detected elements stand in for text blocks.
pub fn features_from_elements(elements: &[DetectedElement]) -> PageFeatures {
    let headlines: Vec<HeadlineRef> = elements
        .iter()
        .filter(|e| e.label == ElementLabel::Headline)
        .map(|e| HeadlineRef {
            text: e.text.clone(),
            location: location_of(e),
        })
        .collect();

    let ctas: Vec<CtaRef> = elements
        .iter()
        .filter(|e| e.label == ElementLabel::Cta)
        .map(|e| CtaRef {
            text: e.text.clone(),
            location: location_of(e),
        })
        .collect();

    let mut trust_signals = Vec::new();
    for element in elements {
        let kind = match element.label {
            ElementLabel::TrustBadge => Some(classify_badge(&element.text)),
            ElementLabel::Logo => Some(TrustSignalKind::Logo),
            _ => None,
        };
        if let Some(kind) = kind {
            if !trust_signals.contains(&kind) {
                trust_signals.push(kind);
            }
        }
    }

    let has_pricing = elements.iter().any(|e| e.label == ElementLabel::PriceTag);
    let has_checkout_or_form = elements.iter().any(|e| e.label == ElementLabel::FormField);

    let paragraphs = elements
        .iter()
        .filter(|e| e.label == ElementLabel::Paragraph)
        .count();
    let has_educational_copy = !elements.is_empty() && paragraphs * 10 >= elements.len() * 6;

    let corpus = elements
        .iter()
        .map(|e| e.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    assemble_features(
        headlines,
        ctas,
        trust_signals,
        has_pricing,
        has_checkout_or_form,
        has_educational_copy,
        &corpus,
    )
}

fn classify_badge(text: &str) -> TrustSignalKind {
    let lower = text.to_lowercase();
    if lower.contains("guarantee") || lower.contains("money back") || lower.contains("refund") {
        TrustSignalKind::Guarantee
    } else if lower.contains("review") || lower.contains("star") || lower.contains("rated") {
        TrustSignalKind::Testimonial
    } else {
        TrustSignalKind::Security
    }
}
