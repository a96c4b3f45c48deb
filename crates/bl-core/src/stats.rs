//! Statistics aggregation.
//!
//! Raw events are folded into one [`DayBucket`] per local calendar day. Week and
//! month views are folded from those day buckets rather than from the raw
//! events, so every view agrees with the daily one. Nothing is cached: callers
//! rebuild [`DailyStats`] from the full event list whenever they need a view.

use std::collections::BTreeMap;

use chrono::{NaiveDate, TimeZone};
use serde::Serialize;

use crate::calendar::{MonthKey, WeekKey, local_date};
use crate::event::{Event, FeedSide, MS_PER_MINUTE};
use crate::event_type::EventType;
use crate::types::EventId;

/// One feed as seen by the daily view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub id: EventId,
    pub start_ts: i64,
    pub end_ts: Option<i64>,
    pub minutes: f64,
    pub side: Option<FeedSide>,
}

/// Diaper events by type; `both` is kept separate here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiaperCounts {
    pub wet: usize,
    pub soiled: usize,
    pub both: usize,
}

impl DiaperCounts {
    fn record(&mut self, kind: EventType) {
        match kind {
            EventType::Wet => self.wet += 1,
            EventType::Soiled => self.soiled += 1,
            EventType::Both => self.both += 1,
            EventType::Feed => {}
        }
    }

    fn absorb(&mut self, other: Self) {
        self.wet += other.wet;
        self.soiled += other.soiled;
        self.both += other.both;
    }

    /// Wet diapers, counting `both` as wet.
    #[must_use]
    pub const fn wet_total(&self) -> usize {
        self.wet + self.both
    }

    /// Soiled diapers, counting `both` as soiled.
    #[must_use]
    pub const fn soiled_total(&self) -> usize {
        self.soiled + self.both
    }
}

/// The at-a-glance counters shown for a single day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DailyCounts {
    pub feeds: usize,
    pub wet: usize,
    pub soiled: usize,
}

/// Everything logged on one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub feeds: Vec<FeedEntry>,
    pub diapers: DiaperCounts,
    pub feed_minutes: f64,
}

impl DayBucket {
    const fn new(date: NaiveDate) -> Self {
        Self {
            date,
            feeds: Vec::new(),
            diapers: DiaperCounts {
                wet: 0,
                soiled: 0,
                both: 0,
            },
            feed_minutes: 0.0,
        }
    }

    fn record(&mut self, event: &Event) {
        if event.kind == EventType::Feed {
            let minutes = event.feed_minutes();
            self.feeds.push(FeedEntry {
                id: event.id,
                start_ts: event.start_ts,
                end_ts: event.end_ts,
                minutes,
                side: event.side,
            });
            self.feed_minutes += minutes;
        } else {
            self.diapers.record(event.kind);
        }
    }

    pub fn counts(&self) -> DailyCounts {
        DailyCounts {
            feeds: self.feeds.len(),
            wet: self.diapers.wet_total(),
            soiled: self.diapers.soiled_total(),
        }
    }
}

/// A week or month folded from day buckets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodBucket<K> {
    pub key: K,
    pub feeds: usize,
    pub diapers: DiaperCounts,
    pub minutes: f64,
    /// Days in the period that have at least one event.
    pub days: usize,
}

impl<K> PeriodBucket<K> {
    const fn new(key: K) -> Self {
        Self {
            key,
            feeds: 0,
            diapers: DiaperCounts {
                wet: 0,
                soiled: 0,
                both: 0,
            },
            minutes: 0.0,
            days: 0,
        }
    }

    fn absorb(&mut self, day: &DayBucket) {
        self.feeds += day.feeds.len();
        self.diapers.absorb(day.diapers);
        self.minutes += day.feed_minutes;
        self.days += 1;
    }

    /// Average feeds per active day.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn feeds_per_day(&self) -> f64 {
        if self.days == 0 {
            return 0.0;
        }
        self.feeds as f64 / self.days as f64
    }

    /// Average feed minutes per active day.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn minutes_per_day(&self) -> f64 {
        if self.days == 0 {
            return 0.0;
        }
        self.minutes / self.days as f64
    }
}

/// Day buckets keyed by local date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyStats {
    days: BTreeMap<NaiveDate, DayBucket>,
}

impl DailyStats {
    /// Buckets every event by the local date of its start time.
    ///
    /// A feed that runs past midnight counts entirely towards the day it started.
    pub fn from_events<Tz: TimeZone>(events: &[Event], tz: &Tz) -> Self {
        let mut days: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();
        for event in events {
            let Some(date) = local_date(event.start_ts, tz) else {
                tracing::warn!(id = %event.id, start_ts = event.start_ts, "timestamp out of range, skipping");
                continue;
            };
            days.entry(date)
                .or_insert_with(|| DayBucket::new(date))
                .record(event);
        }
        Self { days }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DayBucket> {
        self.days.get(&date)
    }

    /// Counters for `date`, all zero if nothing was logged.
    pub fn counts_for(&self, date: NaiveDate) -> DailyCounts {
        self.get(date).map(DayBucket::counts).unwrap_or_default()
    }

    /// Day buckets, most recent first.
    pub fn newest_first(&self) -> impl Iterator<Item = &DayBucket> {
        self.days.values().rev()
    }

    /// ISO week buckets, most recent first.
    pub fn weekly(&self) -> Vec<PeriodBucket<WeekKey>> {
        self.fold(WeekKey::from_date)
    }

    /// Calendar month buckets, most recent first.
    pub fn monthly(&self) -> Vec<PeriodBucket<MonthKey>> {
        self.fold(MonthKey::from_date)
    }

    fn fold<K, F>(&self, key_of: F) -> Vec<PeriodBucket<K>>
    where
        K: Ord + Copy,
        F: Fn(NaiveDate) -> K,
    {
        let mut periods: BTreeMap<K, PeriodBucket<K>> = BTreeMap::new();
        for (date, day) in &self.days {
            let key = key_of(*date);
            periods
                .entry(key)
                .or_insert_with(|| PeriodBucket::new(key))
                .absorb(day);
        }
        periods.into_values().rev().collect()
    }
}

/// Counters for `today`, computed from the full event list.
pub fn today_counts<Tz: TimeZone>(events: &[Event], today: NaiveDate, tz: &Tz) -> DailyCounts {
    DailyStats::from_events(events, tz).counts_for(today)
}

/// Formats a duration for display.
///
/// Rounds to whole minutes; under an hour shows `N min`, otherwise `Hh Mm`.
/// Negative durations show as `0 min`.
pub fn format_duration(ms: i64) -> String {
    let minutes = (ms.max(0) + MS_PER_MINUTE / 2) / MS_PER_MINUTE;
    if minutes < 60 {
        return format!("{minutes} min");
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}
