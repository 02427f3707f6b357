//! Wall clock and calendar-day windows used to partition queue tickets.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Source of "now"; injected so tests can pin time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A calendar day in the clinic's time zone, as a half-open UTC range
/// `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// The local day that contains `instant`
    pub fn containing(instant: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local_date = instant.with_timezone(&offset).date_naive();
        Self::for_date(local_date, offset)
    }

    /// The window of a given local calendar date
    pub fn for_date(date: NaiveDate, offset: FixedOffset) -> Self {
        let local_midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        // A fixed offset has no gaps or folds, so the mapping is always single
        let start = offset
            .from_local_datetime(&local_midnight)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&local_midnight));

        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    #[allow(dead_code)]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}
