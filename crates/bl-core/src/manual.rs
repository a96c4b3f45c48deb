//! Manual feed entry: a feed logged after the fact from a date and two clock times.

use chrono::{NaiveDate, NaiveTime, TimeZone};

use crate::calendar::local_timestamp_ms;
use crate::event::{FeedSide, NewEvent};
use crate::event_type::EventType;
use crate::types::ValidationError;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Notes attached to manual entries unless the user supplies their own.
pub const DEFAULT_MANUAL_NOTES: &str = "manual";

/// A feed entered by hand with a start and end time on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualFeed {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub side: Option<FeedSide>,
    pub notes: String,
}

impl ManualFeed {
    /// Resolves the wall-clock times in `tz` into a complete feed event.
    ///
    /// An end time earlier than the start time is taken to cross midnight and
    /// is moved 24 hours forward.
    pub fn resolve<Tz: TimeZone>(&self, tz: &Tz) -> Result<NewEvent, ValidationError> {
        let start_ts = local_timestamp_ms(self.date.and_time(self.start), tz)?;
        let mut end_ts = local_timestamp_ms(self.date.and_time(self.end), tz)?;
        if end_ts < start_ts {
            end_ts += DAY_MS;
        }

        let event = NewEvent {
            kind: EventType::Feed,
            start_ts,
            end_ts: Some(end_ts),
            side: self.side,
            notes: self.notes.clone(),
        };
        event.validate()?;
        Ok(event)
    }
}

/// Parses a `HH:MM` clock time.
pub fn parse_clock_time(s: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| ValidationError::Unparseable {
        field: "time",
        value: s.to_string(),
    })
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| ValidationError::Unparseable {
        field: "date",
        value: s.to_string(),
    })
}
