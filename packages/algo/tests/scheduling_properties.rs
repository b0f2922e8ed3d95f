//! Property-Based Tests for the scheduling core
//!
//! Invariants:
//! - EF never drops below the floor, for any quality and history
//! - A lapse always resets repetitions to 0 and interval to 1
//! - A successful review always schedules at least one day ahead
//! - `repetitions == 0` implies `interval_days <= 1`
//! - Queue selection never returns future entries and is order independent

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use recall_algo::{
    apply_review, select_due, MemoryState, Quality, QueueEntry, SchedulingPolicy, MIN_EASINESS,
};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_quality() -> impl Strategy<Value = Quality> {
    (0i64..=5).prop_map(|q| Quality::new(q).unwrap())
}

fn arb_state() -> impl Strategy<Value = MemoryState> {
    (1.3f64..=4.0, 0u32..=2000, 0u32..=40, 0u32..=50).prop_map(
        |(easiness_factor, interval_days, repetitions, lapse_count)| MemoryState {
            easiness_factor,
            interval_days: if repetitions == 0 { interval_days.min(1) } else { interval_days },
            repetitions,
            lapse_count,
        },
    )
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 1, 8, 30, 0).unwrap()
}

#[derive(Debug, Clone)]
struct Candidate {
    id: String,
    due: DateTime<Utc>,
    ef: f64,
    created: DateTime<Utc>,
    fresh: bool,
}

impl QueueEntry for Candidate {
    fn entry_id(&self) -> &str {
        &self.id
    }
    fn due_at(&self) -> DateTime<Utc> {
        self.due
    }
    fn easiness(&self) -> f64 {
        self.ef
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created
    }
    fn is_unreviewed(&self) -> bool {
        self.fresh
    }
}

fn arb_candidates() -> impl Strategy<Value = Vec<Candidate>> {
    prop::collection::vec(
        (-500i64..500, 13u32..40, -500i64..0, any::<bool>()),
        0..40,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (due_min, ef_tenths, created_min, fresh))| Candidate {
                id: format!("uw-{i:03}"),
                due: base_time() + Duration::minutes(due_min),
                ef: f64::from(ef_tenths) / 10.0,
                created: base_time() + Duration::minutes(created_min),
                fresh,
            })
            .collect()
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_easiness_never_below_floor(state in arb_state(), quality in arb_quality()) {
        let policy = SchedulingPolicy::default();
        let next = apply_review(&state, quality, &policy, base_time());
        prop_assert!(next.state.easiness_factor >= MIN_EASINESS);
    }

    #[test]
    fn prop_lapse_resets(state in arb_state(), q in 0i64..3) {
        let policy = SchedulingPolicy::default();
        let next = apply_review(&state, Quality::new(q).unwrap(), &policy, base_time());
        prop_assert_eq!(next.state.repetitions, 0);
        prop_assert_eq!(next.state.interval_days, 1);
        prop_assert_eq!(next.state.lapse_count, state.lapse_count + 1);
    }

    #[test]
    fn prop_success_schedules_forward(state in arb_state(), q in 3i64..=5) {
        let policy = SchedulingPolicy::default();
        let next = apply_review(&state, Quality::new(q).unwrap(), &policy, base_time());
        prop_assert_eq!(next.state.repetitions, state.repetitions + 1);
        prop_assert!(next.state.interval_days >= 1);
        prop_assert_eq!(
            next.due_at,
            base_time() + Duration::days(i64::from(next.state.interval_days))
        );
    }

    #[test]
    fn prop_history_keeps_invariants(
        qualities in prop::collection::vec(arb_quality(), 1..60)
    ) {
        let policy = SchedulingPolicy::default();
        let mut state = MemoryState::default();
        for q in qualities {
            state = apply_review(&state, q, &policy, base_time()).state;
            prop_assert!(state.easiness_factor >= MIN_EASINESS);
            if state.repetitions == 0 {
                prop_assert!(state.interval_days <= 1);
            }
        }
    }

    #[test]
    fn prop_queue_never_returns_future(
        candidates in arb_candidates(),
        limit in 0usize..30,
        budget in 0usize..10,
    ) {
        let picked = select_due(candidates, base_time(), limit, budget);
        prop_assert!(picked.len() <= limit);
        prop_assert!(picked.iter().all(|c| c.due <= base_time()));
        prop_assert!(picked.iter().filter(|c| c.fresh).count() <= budget);
    }

    #[test]
    fn prop_queue_is_order_independent(candidates in arb_candidates()) {
        let mut reversed = candidates.clone();
        reversed.reverse();

        let a: Vec<String> = select_due(candidates, base_time(), 15, 5)
            .into_iter()
            .map(|c| c.id)
            .collect();
        let b: Vec<String> = select_due(reversed, base_time(), 15, 5)
            .into_iter()
            .map(|c| c.id)
            .collect();
        prop_assert_eq!(a, b);
    }
}
