// decision_core/src/data_models/request.rs

use crate::contracts::AnalysisError;
use crate::invariants::ensure_non_empty_trimmed;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// # NDOC
/// component: `data_models::request`
/// purpose: Input envelope for one analysis run.
/// invariants:
///   - Exactly one of url/text/image is populated, consistent with `mode`.
///   - `validate_payload` is the single gate; the orchestrator rejects on its error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    Url,
    Text,
    Image,
}

impl InputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::Url => "url",
            InputMode::Text => "text",
            InputMode::Image => "image",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Goal {
    Leads,
    Sales,
    Booking,
    Contact,
    Subscribe,
    Other,
}

impl Default for Goal {
    fn default() -> Self {
        Goal::Leads
    }
}

impl Goal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Goal::Leads => "leads",
            Goal::Sales => "sales",
            Goal::Booking => "booking",
            Goal::Contact => "contact",
            Goal::Subscribe => "subscribe",
            Goal::Other => "other",
        }
    }
}

/// Governs report language only; the pipeline itself is locale-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Fa,
    Tr,
}

impl Default for Locale {
    fn default() -> Self {
        Locale::En
    }
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Fa => "fa",
            Locale::Tr => "tr",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnalysisRequest {
    pub mode: InputMode,
    #[validate(url(message = "'url' must be an absolute URL"))]
    pub url: Option<String>,
    pub text: Option<String>,
    /// Raw image bytes for image mode. Carried out-of-band by the transport
    /// (multipart); never serialized back out.
    #[serde(default, skip)]
    pub image: Option<Vec<u8>>,
    /// Optional ad headline/text; feeds the ad evidence extractor.
    #[serde(default)]
    pub ad_text: Option<String>,
    /// Optional pricing HTML/text; feeds the pricing evidence extractor.
    #[serde(default)]
    pub pricing_text: Option<String>,
    #[serde(default)]
    pub goal: Goal,
    #[serde(default)]
    pub locale: Locale,
    #[serde(default)]
    pub refresh: bool,
}

impl AnalysisRequest {
    pub fn for_url(url: impl Into<String>) -> Self {
        AnalysisRequest {
            mode: InputMode::Url,
            url: Some(url.into()),
            text: None,
            image: None,
            ad_text: None,
            pricing_text: None,
            goal: Goal::default(),
            locale: Locale::default(),
            refresh: false,
        }
    }

    pub fn for_text(text: impl Into<String>) -> Self {
        AnalysisRequest {
            mode: InputMode::Text,
            url: None,
            text: Some(text.into()),
            image: None,
            ad_text: None,
            pricing_text: None,
            goal: Goal::default(),
            locale: Locale::default(),
            refresh: false,
        }
    }

    pub fn for_image(image: Vec<u8>) -> Self {
        AnalysisRequest {
            mode: InputMode::Image,
            url: None,
            text: None,
            image: Some(image),
            ad_text: None,
            pricing_text: None,
            goal: Goal::default(),
            locale: Locale::default(),
            refresh: false,
        }
    }

    /// Mode/payload consistency check. Derive-level rules cover URL syntax;
    /// this covers the exactly-one-payload invariant.
    pub fn validate_payload(&self) -> Result<(), AnalysisError> {
        self.validate()
            .map_err(|e| AnalysisError::validation(e.to_string()))?;

        let populated = [
            self.url.as_deref().map_or(false, |u| !u.trim().is_empty()),
            self.text.as_deref().map_or(false, |t| !t.trim().is_empty()),
            self.image.as_deref().map_or(false, |i| !i.is_empty()),
        ]
        .iter()
        .filter(|p| **p)
        .count();

        if populated != 1 {
            return Err(AnalysisError::validation(
                "exactly one of url/text/image must be provided",
            ));
        }

        match self.mode {
            InputMode::Url => {
                let url = self.url.as_deref().unwrap_or("");
                ensure_non_empty_trimmed(url, "url")
            }
            InputMode::Text => {
                let text = self.text.as_deref().unwrap_or("");
                ensure_non_empty_trimmed(text, "text")
            }
            InputMode::Image => {
                if self.image.as_deref().map_or(true, |i| i.is_empty()) {
                    return Err(AnalysisError::validation("'image' cannot be empty"));
                }
                Ok(())
            }
        }
    }
}
