//! Booking schedule: which hourly slots a service offers today, which of
//! them are still free, and what a selection costs.
//!
//! All instants are UTC. The policy's UTC offset decides what "today" and
//! "10:00" mean for the hotel.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use thiserror::Error;

use innkeep_core::Money;

use crate::hotel::Service;

/// Wire format of a requested slot, in hotel-local time.
pub const REQUEST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SHORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub const NO_TIMES_MESSAGE: &str = "All available times for today are reserved.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingPolicy {
    /// Local hour of the first slot of the day.
    pub first_hour: u32,
    /// Local hour of the last slot of the day (inclusive).
    pub last_hour: u32,
    pub slot_minutes: i64,
    /// Share of the list price actually charged.
    pub discount_percent: u64,
    /// Hotel-local offset from UTC.
    pub utc_offset_minutes: i32,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            first_hour: 10,
            last_hour: 21,
            slot_minutes: 60,
            discount_percent: 80,
            utc_offset_minutes: 0,
        }
    }
}

/// Why a selection of times cannot be booked. `Display` is the user-facing
/// message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BookingRejection {
    #[error("'{0}' is not a valid time; expected YYYY-MM-DD HH:MM:SS.")]
    Unparsable(String),

    #[error("This service is not currently available.")]
    Unavailable,

    #[error("Select at least one time.")]
    Empty,

    #[error("The following times are already reserved: {}. Please choose different times.", .0.join(", "))]
    Conflicts(Vec<String>),

    #[error("Some of the selected times are in the past. Please choose future times.")]
    Past,

    #[error("The following times are not offered today: {}.", .0.join(", "))]
    NotOffered(Vec<String>),
}

/// An accepted selection, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingPlan {
    /// Distinct slot starts, ascending.
    pub starts: Vec<DateTime<Utc>>,
    pub slot_length: Duration,
    pub total: Money,
    pub discounted: Money,
}

impl BookingPlan {
    pub fn hours(&self) -> usize {
        self.starts.len()
    }

    pub fn success_message(&self) -> String {
        format!(
            "Service reserved successfully. Total cost: {}",
            self.discounted.display_usd()
        )
    }
}

impl BookingPolicy {
    pub fn slot_length(&self) -> Duration {
        Duration::minutes(self.slot_minutes.max(1))
    }

    fn offset(&self) -> Duration {
        Duration::minutes(i64::from(self.utc_offset_minutes))
    }

    fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        Utc.from_utc_datetime(&(local - self.offset()))
    }

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.naive_utc() + self.offset()
    }

    /// The hotel-local calendar day containing `now`.
    pub fn local_day(&self, now: DateTime<Utc>) -> NaiveDate {
        self.to_local(now).date()
    }

    fn local_hour(&self, day: NaiveDate, hour: u32) -> DateTime<Utc> {
        self.to_utc(day.and_time(NaiveTime::default())) + Duration::hours(i64::from(hour))
    }

    /// Every slot start offered on `day`, first to last inclusive.
    pub fn offered_slots(&self, day: NaiveDate) -> Vec<DateTime<Utc>> {
        let step = self.slot_length();
        let last = self.local_hour(day, self.last_hour);
        let mut current = self.local_hour(day, self.first_hour);

        let mut slots = Vec::new();
        while current <= last {
            slots.push(current);
            current += step;
        }
        slots
    }

    /// `[first slot start, last slot end)` for `day`: the range in which
    /// existing reservations can collide with offered slots.
    pub fn day_window(&self, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.local_hour(day, self.first_hour),
            self.local_hour(day, self.last_hour) + self.slot_length(),
        )
    }

    /// Offered slots for today that are neither reserved nor started yet.
    pub fn available_times(
        &self,
        now: DateTime<Utc>,
        reserved: &HashSet<DateTime<Utc>>,
    ) -> Vec<DateTime<Utc>> {
        let mut free: Vec<_> = self
            .offered_slots(self.local_day(now))
            .into_iter()
            .filter(|slot| !reserved.contains(slot) && *slot > now)
            .collect();
        free.sort();
        free
    }

    pub fn parse_local(&self, raw: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(raw.trim(), REQUEST_TIME_FORMAT)
            .ok()
            .map(|local| self.to_utc(local))
    }

    /// Render an instant the way clients submit it back.
    pub fn format_local(&self, instant: DateTime<Utc>) -> String {
        self.to_local(instant).format(REQUEST_TIME_FORMAT).to_string()
    }

    pub fn format_short(&self, instant: DateTime<Utc>) -> String {
        self.to_local(instant).format(SHORT_TIME_FORMAT).to_string()
    }

    /// Check a requested selection and price it.
    ///
    /// `reserved` holds the starts already booked for this service today.
    pub fn plan_booking(
        &self,
        service: &Service,
        requested: &[String],
        reserved: &HashSet<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<BookingPlan, BookingRejection> {
        let mut starts = BTreeSet::new();
        for raw in requested {
            let start = self
                .parse_local(raw)
                .ok_or_else(|| BookingRejection::Unparsable(raw.clone()))?;
            starts.insert(start);
        }

        if !service.available {
            return Err(BookingRejection::Unavailable);
        }
        if starts.is_empty() {
            return Err(BookingRejection::Empty);
        }

        let conflicts: Vec<String> = starts
            .iter()
            .filter(|s| reserved.contains(*s))
            .map(|s| self.format_short(*s))
            .collect();
        if !conflicts.is_empty() {
            return Err(BookingRejection::Conflicts(conflicts));
        }

        if starts.iter().any(|s| *s <= now) {
            return Err(BookingRejection::Past);
        }

        let offered: HashSet<DateTime<Utc>> =
            self.offered_slots(self.local_day(now)).into_iter().collect();
        let not_offered: Vec<String> = starts
            .iter()
            .filter(|s| !offered.contains(*s))
            .map(|s| self.format_short(*s))
            .collect();
        if !not_offered.is_empty() {
            return Err(BookingRejection::NotOffered(not_offered));
        }

        let starts: Vec<_> = starts.into_iter().collect();
        let total = service.price.times(starts.len() as u64);
        Ok(BookingPlan {
            discounted: total.percent(self.discount_percent),
            total,
            slot_length: self.slot_length(),
            starts,
        })
    }
}
