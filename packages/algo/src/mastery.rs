//! Mastery Classification
//!
//! A word is mastered once it has graduated out of short-interval review:
//! enough consecutive successes, a healthy easiness factor and a long interval.

use serde::{Deserialize, Serialize};

use crate::types::{MemoryState, PolicyError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MasteryPolicy {
    pub min_repetitions: u32,
    pub min_easiness: f64,
    pub min_interval_days: u32,
}

impl Default for MasteryPolicy {
    fn default() -> Self {
        Self {
            min_repetitions: 5,
            min_easiness: 2.5,
            min_interval_days: 30,
        }
    }
}

/// Change in mastery caused by one review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryTransition {
    Gained,
    Lost,
    Unchanged,
}

impl MasteryPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if !self.min_easiness.is_finite() || self.min_easiness <= 0.0 {
            return Err(PolicyError::invalid("minEasiness", "must be a positive number"));
        }
        if self.min_repetitions == 0 {
            return Err(PolicyError::invalid("minRepetitions", "must be at least 1"));
        }
        Ok(())
    }

    pub fn is_mastered(&self, state: &MemoryState) -> bool {
        state.repetitions >= self.min_repetitions
            && state.easiness_factor >= self.min_easiness
            && state.interval_days >= self.min_interval_days
    }

    pub fn transition(&self, before: &MemoryState, after: &MemoryState) -> MasteryTransition {
        match (self.is_mastered(before), self.is_mastered(after)) {
            (false, true) => MasteryTransition::Gained,
            (true, false) => MasteryTransition::Lost,
            _ => MasteryTransition::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(reps: u32, ef: f64, interval: u32) -> MemoryState {
        MemoryState {
            easiness_factor: ef,
            interval_days: interval,
            repetitions: reps,
            lapse_count: 0,
        }
    }

    #[test]
    fn test_mastery_thresholds() {
        let policy = MasteryPolicy::default();
        assert!(policy.is_mastered(&state(5, 2.5, 30)));
        assert!(!policy.is_mastered(&state(4, 2.9, 90)));
        assert!(!policy.is_mastered(&state(6, 2.4, 90)));
        assert!(!policy.is_mastered(&state(6, 2.7, 29)));
    }

    #[test]
    fn test_transition_detection() {
        let policy = MasteryPolicy::default();
        let before = state(4, 2.7, 16);
        let after = state(5, 2.8, 45);
        assert_eq!(policy.transition(&before, &after), MasteryTransition::Gained);
        assert_eq!(policy.transition(&after, &after), MasteryTransition::Unchanged);
        assert_eq!(
            policy.transition(&after, &state(0, 2.3, 1)),
            MasteryTransition::Lost
        );
    }
}
