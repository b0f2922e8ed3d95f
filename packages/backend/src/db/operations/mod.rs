pub mod catalog;
pub mod events;
pub mod memory;
pub mod settings;

use chrono::{DateTime, TimeZone, Utc};

pub use catalog::*;
pub use events::*;
pub use memory::*;
pub use settings::*;

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Drop sub-millisecond precision so values survive a store round trip unchanged.
pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    from_millis(to_millis(at))
}
