//! Shared utilities for CLI commands.

use std::fmt::Display;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};

use bl_core::calendar::{local_date, local_timestamp_ms};
use bl_core::{Event, EventType, format_duration};

/// Human-readable label for an event type.
pub const fn type_label(kind: EventType) -> &'static str {
    match kind {
        EventType::Feed => "Feed",
        EventType::Wet => "Wet diaper",
        EventType::Soiled => "Soiled diaper",
        EventType::Both => "Wet + soiled",
    }
}

/// The local date of `now_ms`.
pub fn local_today<Tz: TimeZone>(now_ms: i64, tz: &Tz) -> anyhow::Result<NaiveDate> {
    local_date(now_ms, tz).context("current time is out of range")
}

/// `HH:MM` in `tz`.
pub fn format_clock<Tz>(ts_ms: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    DateTime::from_timestamp_millis(ts_ms).map_or_else(
        || "--:--".to_string(),
        |dt| dt.with_timezone(tz).format("%H:%M").to_string(),
    )
}

/// `HH:MM` when `ts_ms` falls on `today`, otherwise `Mon D HH:MM`.
pub fn format_when<Tz>(ts_ms: i64, today: NaiveDate, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match DateTime::from_timestamp_millis(ts_ms).map(|dt| dt.with_timezone(tz)) {
        Some(local) if local.date_naive() == today => local.format("%H:%M").to_string(),
        Some(local) => local.format("%b %-d %H:%M").to_string(),
        None => "--:--".to_string(),
    }
}

/// Day header used by history and the daily view, e.g. `Sun Oct 18, 2026`.
pub fn format_day(date: NaiveDate) -> String {
    date.format("%a %b %-d, %Y").to_string()
}

/// Duration, side and notes of an event, comma separated.
///
/// Open feeds report the time elapsed since their start.
pub fn event_details(event: &Event, now_ms: i64) -> String {
    let mut parts = Vec::new();
    if event.kind == EventType::Feed {
        match event.duration_ms() {
            Some(ms) => parts.push(format_duration(ms)),
            None => parts.push(format!(
                "in progress, {} so far",
                format_duration(now_ms - event.start_ts)
            )),
        }
        if let Some(side) = event.side {
            parts.push(side.to_string());
        }
    }
    if !event.notes.is_empty() {
        parts.push(event.notes.clone());
    }
    parts.join(", ")
}

/// Parses a point in time given as RFC 3339 or as local `YYYY-MM-DD HH:MM`.
pub fn parse_local_datetime<Tz: TimeZone>(s: &str, tz: &Tz) -> anyhow::Result<i64> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }

    let naive = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .with_context(|| {
            format!("invalid time: {s}. Use YYYY-MM-DD HH:MM or RFC 3339 (e.g. 2026-10-18T09:30:00Z)")
        })?;
    Ok(local_timestamp_ms(naive, tz)?)
}
