// decision_core/src/data_models/signals.rs

use serde::{Deserialize, Serialize};

/// Ordinal level shared by every evidence field. The merger arithmetic
/// works on the fixed scale low=0, medium=1, high=2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalLevel {
    Low,
    Medium,
    High,
}

impl SignalLevel {
    pub fn ordinal(&self) -> u8 {
        match self {
            SignalLevel::Low => 0,
            SignalLevel::Medium => 1,
            SignalLevel::High => 2,
        }
    }

    pub fn from_ordinal(value: u8) -> Self {
        match value {
            0 => SignalLevel::Low,
            1 => SignalLevel::Medium,
            _ => SignalLevel::High,
        }
    }

    /// Inverted reading (high risk exposure ⇔ low reassurance and so on).
    pub fn inverted(&self) -> Self {
        match self {
            SignalLevel::Low => SignalLevel::High,
            SignalLevel::Medium => SignalLevel::Medium,
            SignalLevel::High => SignalLevel::Low,
        }
    }
}

/// Surface emotional register of the copy. Mapped ordinally onto
/// `SignalLevel` for merging: calm → low, neutral → medium,
/// urgent/aspirational → high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionalTone {
    Neutral,
    Urgent,
    Calm,
    Aspirational,
}

impl EmotionalTone {
    pub fn intensity(&self) -> SignalLevel {
        match self {
            EmotionalTone::Calm => SignalLevel::Low,
            EmotionalTone::Neutral => SignalLevel::Medium,
            EmotionalTone::Urgent | EmotionalTone::Aspirational => SignalLevel::High,
        }
    }
}

/// # NDOC
/// component: `data_models::signals`
/// purpose: Uniform evidence record emitted by every evidence extractor.
/// invariants:
///   - All six core fields are always populated; only `expectation_gap` is optional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionSignals {
    pub promise_strength: SignalLevel,
    pub emotional_tone: SignalLevel,
    pub reassurance_level: SignalLevel,
    pub risk_exposure: SignalLevel,
    pub cognitive_load: SignalLevel,
    pub pressure_level: SignalLevel,
    pub expectation_gap: Option<SignalLevel>,
}

impl DecisionSignals {
    pub fn neutral() -> Self {
        DecisionSignals {
            promise_strength: SignalLevel::Medium,
            emotional_tone: SignalLevel::Medium,
            reassurance_level: SignalLevel::Medium,
            risk_exposure: SignalLevel::Medium,
            cognitive_load: SignalLevel::Medium,
            pressure_level: SignalLevel::Medium,
            expectation_gap: None,
        }
    }

    /// Field accessors used by the merger; order is fixed and part of the
    /// merge semantics (pairwise agreement is counted per field).
    pub fn core_fields(&self) -> [SignalLevel; 6] {
        [
            self.promise_strength,
            self.emotional_tone,
            self.reassurance_level,
            self.risk_exposure,
            self.cognitive_load,
            self.pressure_level,
        ]
    }
}

/// Merged evidence plus the merger's own confidence in it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergedSignals {
    pub signals: DecisionSignals,
    pub confidence: f64,
    pub source_count: usize,
}
