//! # recall-algo - vocabulary review core algorithms
//!
//! Pure Rust, I/O-free building blocks of the review scheduler:
//!
//! - **SM-2 scheduling** - easiness factor update, interval growth, lapses
//! - **Due queue** - deterministic ordering and new-word blending
//! - **Mastery** - graduation predicate and transition detection
//! - **Streak** - consecutive active days and per-day activity buckets
//!
//! ## Module layout
//!
//! - [`sm2`] - [`SchedulingPolicy`] and [`apply_review`]
//! - [`queue`] - [`QueueEntry`] and [`select_due`]
//! - [`mastery`] - [`MasteryPolicy`]
//! - [`streak`] - [`streak_days`], [`weekly_counts`]
//! - [`sanitize`] - repair of values read back from storage
//! - [`types`] - shared types and constants
//!
//! ## Example
//!
//! ```rust
//! use chrono::Utc;
//! use recall_algo::{apply_review, MemoryState, Quality, SchedulingPolicy};
//!
//! let policy = SchedulingPolicy::default();
//! let state = MemoryState { easiness_factor: 2.5, interval_days: 6, repetitions: 2, lapse_count: 0 };
//! let next = apply_review(&state, Quality::EASY, &policy, Utc::now());
//! assert_eq!(next.state.interval_days, 16);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod mastery;
pub mod queue;
pub mod sanitize;
pub mod sm2;
pub mod streak;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use mastery::{MasteryPolicy, MasteryTransition};

pub use queue::{compare_due, compare_new, new_word_budget, select_due, QueueEntry};

pub use sm2::{apply_review, preview_intervals, IntervalPreview, ReviewTransition, SchedulingPolicy};

pub use streak::{daily_counts, streak_days, weekly_counts, DEFAULT_STREAK_LOOKBACK_DAYS};
