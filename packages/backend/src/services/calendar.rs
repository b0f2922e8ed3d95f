use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Maps instants onto a learner's local calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserCalendar {
    tz: Tz,
}

impl UserCalendar {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn utc() -> Self {
        Self { tz: Tz::UTC }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.tz).date_naive()
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local_date(now)
    }

    /// Half-open UTC range `[start, end)` covering the local day.
    pub fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let next = date.succ_opt().unwrap_or(NaiveDate::MAX);
        (self.start_of_day(date), self.start_of_day(next))
    }

    /// UTC range from the start of `first` to the end of `last`.
    pub fn span_bounds(&self, first: NaiveDate, last: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let (start, _) = self.day_bounds(first);
        let (_, end) = self.day_bounds(last);
        (start, end)
    }

    fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        if let Some(at) = self.tz.from_local_datetime(&midnight).earliest() {
            return at.with_timezone(&Utc);
        }
        // Midnight falls inside a DST gap: the day starts when the gap ends.
        self.tz
            .from_local_datetime(&(midnight - Duration::hours(1)))
            .earliest()
            .map(|before| before.with_timezone(&Utc) + Duration::hours(1))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }
}
