//! Injectable wall clock.
//!
//! Everything that needs "now" (the current hour, today's date, the age of
//! an event) takes a [`Clock`] so the analytic functions stay deterministic.
//! Calendar buckets (date, hour, weekday) are computed in the clock's UTC
//! offset.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, Timelike, Utc};

pub const MS_PER_MINUTE: i64 = 60 * 1000;
pub const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// Hour of day (0-23) in the clock's offset.
    fn hour(&self) -> u32 {
        self.now().hour()
    }

    /// Day of week (0-6, Sunday=0) in the clock's offset.
    fn day_of_week(&self) -> u32 {
        self.now().weekday().num_days_from_sunday()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn offset(&self) -> FixedOffset {
        *self.now().offset()
    }
}

/// The machine's local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A manually driven clock. Clones share the same instant, so a test can
/// keep a handle and advance the time seen by an engine that owns a clone.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<FixedOffset>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// A UTC clock at the given calendar position.
    ///
    /// Falls back to the Unix epoch if the components are out of range.
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        let now = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .map(|dt| dt.and_utc())
            .unwrap_or_default();
        Self::new(now.fixed_offset())
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Convert an epoch-millisecond timestamp into the given offset.
pub fn local_datetime(timestamp_ms: i64, offset: FixedOffset) -> DateTime<FixedOffset> {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .unwrap_or_default()
        .with_timezone(&offset)
}

/// Calendar date of a timestamp in the given offset.
pub fn date_of(timestamp_ms: i64, offset: FixedOffset) -> NaiveDate {
    local_datetime(timestamp_ms, offset).date_naive()
}

/// Hour of day (0-23) of a timestamp in the given offset.
pub fn hour_of(timestamp_ms: i64, offset: FixedOffset) -> u32 {
    local_datetime(timestamp_ms, offset).hour()
}

/// Day of week (0-6, Sunday=0) of a timestamp in the given offset.
pub fn weekday_of(timestamp_ms: i64, offset: FixedOffset) -> u32 {
    local_datetime(timestamp_ms, offset)
        .weekday()
        .num_days_from_sunday()
}
