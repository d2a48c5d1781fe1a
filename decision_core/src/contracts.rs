use serde::{Deserialize, Serialize};
use serde_json::Value;

/// # NDOC
/// component: `contracts`
/// purpose: Standard result alias for typed analysis contracts.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// # NDOC
/// component: `contracts`
/// purpose: Stable machine-readable analysis error category.
/// invariants:
///   - Variants are part of external API surface; changes require compatibility review.
///   - `tag()` strings are frozen; they appear verbatim in `debug.errors`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisErrorKind {
    ValidationError,
    CaptureTimeout,
    CaptureEngineCrash,
    CaptureNavigationError,
    ArtifactWriteFailed,
    LlmTimeout,
    LlmTransportError,
    MemoryStoreUnavailable,
    InternalInvariantViolation,
}

impl AnalysisErrorKind {
    pub fn tag(&self) -> &'static str {
        match self {
            AnalysisErrorKind::ValidationError => "validation_error",
            AnalysisErrorKind::CaptureTimeout => "capture_timeout",
            AnalysisErrorKind::CaptureEngineCrash => "capture_engine_crash",
            AnalysisErrorKind::CaptureNavigationError => "capture_navigation_error",
            AnalysisErrorKind::ArtifactWriteFailed => "artifact_write_failed",
            AnalysisErrorKind::LlmTimeout => "llm_timeout",
            AnalysisErrorKind::LlmTransportError => "llm_transport_error",
            AnalysisErrorKind::MemoryStoreUnavailable => "memory_store_unavailable",
            AnalysisErrorKind::InternalInvariantViolation => "internal_invariant_violation",
        }
    }
}

/// # NDOC
/// component: `contracts`
/// purpose: Canonical error payload used across all pipeline stages.
/// invariants:
///   - `message` is user-safe: one line, no stack traces.
///   - `retryable` indicates whether automated retry is acceptable.
///   - Only `ValidationError` may surface to the caller as a failed response;
///     every other kind degrades the stage that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisError {
    pub kind: AnalysisErrorKind,
    pub message: String,
    pub retryable: bool,
    pub details: Option<Value>,
}

impl AnalysisError {
    pub fn new(
        kind: AnalysisErrorKind,
        message: impl Into<String>,
        retryable: bool,
        details: Option<Value>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            details,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(AnalysisErrorKind::ValidationError, message, false, None)
    }

    pub fn capture_timeout(message: impl Into<String>) -> Self {
        Self::new(AnalysisErrorKind::CaptureTimeout, message, true, None)
    }

    pub fn capture_engine_crash(message: impl Into<String>) -> Self {
        Self::new(AnalysisErrorKind::CaptureEngineCrash, message, true, None)
    }

    pub fn capture_navigation(message: impl Into<String>) -> Self {
        Self::new(AnalysisErrorKind::CaptureNavigationError, message, false, None)
    }

    pub fn artifact_write(message: impl Into<String>) -> Self {
        Self::new(AnalysisErrorKind::ArtifactWriteFailed, message, true, None)
    }

    pub fn llm_timeout(message: impl Into<String>) -> Self {
        Self::new(AnalysisErrorKind::LlmTimeout, message, true, None)
    }

    pub fn llm_transport(message: impl Into<String>) -> Self {
        Self::new(AnalysisErrorKind::LlmTransportError, message, true, None)
    }

    pub fn memory_unavailable(message: impl Into<String>) -> Self {
        Self::new(AnalysisErrorKind::MemoryStoreUnavailable, message, false, None)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            AnalysisErrorKind::InternalInvariantViolation,
            message,
            false,
            None,
        )
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Machine-stable tag for `debug.errors`.
    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.tag(), self.message)
    }
}

impl std::error::Error for AnalysisError {}

impl From<std::io::Error> for AnalysisError {
    fn from(value: std::io::Error) -> Self {
        AnalysisError::artifact_write(value.to_string())
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(value: serde_json::Error) -> Self {
        AnalysisError::validation(value.to_string())
    }
}
