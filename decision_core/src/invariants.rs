use crate::contracts::AnalysisError;

/// # NDOC
/// component: `decision_core::invariants`
/// purpose: Shared invariant checks used by multiple subsystems.
/// invariants:
///   - Validation helpers must return `AnalysisError::validation` for caller-safe failures.
///   - Helpers must not perform I/O or mutate external state.
pub fn ensure_non_empty_trimmed(value: &str, field: &str) -> Result<(), AnalysisError> {
    if value.trim().is_empty() {
        return Err(AnalysisError::validation(format!(
            "'{}' cannot be empty",
            field
        )));
    }
    Ok(())
}

/// # NDOC
/// component: `decision_core::invariants`
/// purpose: Enforce an inclusive numeric bound with a user-safe error.
/// invariants:
///   - `name` is used directly in error messages and should be stable.
pub fn ensure_range_usize(
    value: usize,
    min: usize,
    max: usize,
    name: &str,
) -> Result<(), AnalysisError> {
    if value < min || value > max {
        return Err(AnalysisError::validation(format!(
            "'{}' must be in range {}..={}",
            name, min, max
        )));
    }
    Ok(())
}

/// # NDOC
/// component: `decision_core::invariants`
/// purpose: Ensure a confidence value sits on the unit interval.
pub fn ensure_unit_interval(value: f64, name: &str) -> Result<(), AnalysisError> {
    if !(0.0..=1.0).contains(&value) || value.is_nan() {
        return Err(AnalysisError::validation(format!(
            "'{}' must be in [0.0, 1.0]",
            name
        )));
    }
    Ok(())
}

/// # NDOC
/// component: `decision_core::invariants`
/// purpose: Ensure a score sits on the 0..=100 scale used by feature scores and confidence.
pub fn ensure_score_scale(value: u8, name: &str) -> Result<(), AnalysisError> {
    if value > 100 {
        return Err(AnalysisError::validation(format!(
            "'{}' must be in 0..=100",
            name
        )));
    }
    Ok(())
}
