//! Data Sanitization
//!
//! Guards for values read back from storage before they enter the scheduler.
//!
//! Functions:
//! - Easiness factor repair
//! - Interval / counter clamping
//! - State health check

use crate::types::{MemoryState, MAX_INTERVAL_DAYS};

/// Whether any field of the state is outside its legal domain
pub fn has_invalid_values(state: &MemoryState, min_easiness: f64) -> bool {
    !state.easiness_factor.is_finite()
        || state.easiness_factor < min_easiness
        || state.interval_days > MAX_INTERVAL_DAYS
        || (state.repetitions == 0 && state.interval_days > 1)
}

/// Repair a stored easiness factor; NaN/inf fall back to `fallback`
pub fn sanitize_easiness(value: f64, min_easiness: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.max(min_easiness)
    } else {
        fallback.max(min_easiness)
    }
}

/// Clamp a signed storage column into an unsigned day count
pub fn sanitize_interval(value: i64) -> u32 {
    value.clamp(0, i64::from(MAX_INTERVAL_DAYS)) as u32
}

/// Clamp a signed storage counter
pub fn sanitize_count(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

/// Bring a state back inside its invariants
pub fn sanitize_state(state: &mut MemoryState, min_easiness: f64, fallback_easiness: f64) {
    state.easiness_factor = sanitize_easiness(state.easiness_factor, min_easiness, fallback_easiness);
    state.interval_days = state.interval_days.min(MAX_INTERVAL_DAYS);
    // 未复习或刚遗忘的词必须很快再次出现
    if state.repetitions == 0 && state.interval_days > 1 {
        state.interval_days = 1;
    }
}
