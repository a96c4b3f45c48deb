//! Feed commands: start, stop, toggle and manual entry.

use std::fmt::Display;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::TimeZone;

use bl_core::manual::{parse_clock_time, parse_date};
use bl_core::{FeedSide, ManualFeed, format_duration};
use bl_db::{Database, DbError};

use super::util::{event_details, format_clock, local_today};

pub fn start<W, Tz>(
    writer: &mut W,
    db: &mut Database,
    side: Option<FeedSide>,
    now_ms: i64,
    tz: &Tz,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let id = db
        .start_feed_at(now_ms, side)
        .context("failed to start feed")?;
    let side = side.map(|s| format!(" ({s})")).unwrap_or_default();
    writeln!(
        writer,
        "Started feed #{id} at {}{side}.",
        format_clock(now_ms, tz)
    )?;
    Ok(())
}

pub fn stop<W: Write>(writer: &mut W, db: &mut Database, now_ms: i64) -> Result<()> {
    match db.stop_feed_at(now_ms) {
        Ok(Some(event)) => {
            writeln!(
                writer,
                "Stopped feed #{}: {}.",
                event.id,
                event_details(&event, now_ms)
            )?;
        }
        Ok(None) => writeln!(writer, "No feed in progress.")?,
        Err(DbError::NotFound { id }) => {
            tracing::warn!(%id, "active feed no longer exists, clearing pointer");
            db.set_active_feed(None)
                .context("failed to clear active feed")?;
            writeln!(
                writer,
                "Feed #{id} no longer exists; nothing is in progress now."
            )?;
        }
        Err(err) => return Err(err).context("failed to stop feed"),
    }
    Ok(())
}

/// Stops the feed in progress, or starts a new one.
pub fn toggle<W, Tz>(
    writer: &mut W,
    db: &mut Database,
    side: Option<FeedSide>,
    now_ms: i64,
    tz: &Tz,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if db.active_feed()?.is_some() {
        stop(writer, db, now_ms)
    } else {
        start(writer, db, side, now_ms, tz)
    }
}

/// Raw `manual` arguments.
#[derive(Debug, Clone)]
pub struct ManualArgs<'a> {
    pub date: Option<&'a str>,
    pub start: &'a str,
    pub end: &'a str,
    pub side: Option<FeedSide>,
    pub notes: &'a str,
}

pub fn manual<W, Tz>(
    writer: &mut W,
    db: &mut Database,
    args: &ManualArgs<'_>,
    now_ms: i64,
    tz: &Tz,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let date = match args.date {
        Some(date) => parse_date(date)?,
        None => local_today(now_ms, tz)?,
    };
    let entry = ManualFeed {
        date,
        start: parse_clock_time(args.start)?,
        end: parse_clock_time(args.end)?,
        side: args.side,
        notes: args.notes.to_string(),
    };
    let event = entry.resolve(tz).context("invalid manual entry")?;
    let id = db.add(&event).context("failed to save manual feed")?;

    let end_ts = event.end_ts.unwrap_or(event.start_ts);
    writeln!(
        writer,
        "Logged feed #{id}: {}-{} ({}).",
        format_clock(event.start_ts, tz),
        format_clock(end_ts, tz),
        format_duration(end_ts - event.start_ts)
    )?;
    Ok(())
}
