//! Status command: last feed, last diaper, active feed and today's counts.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::TimeZone;

use bl_core::{DailyStats, Event, format_duration};
use bl_db::Database;

use super::util::{event_details, format_when, local_today};

pub fn run<W, Tz>(writer: &mut W, db: &Database, now_ms: i64, tz: &Tz) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let status = db.status()?;
    let today = local_today(now_ms, tz)?;
    let counts = DailyStats::from_events(&db.list_all_ascending()?, tz).counts_for(today);

    let describe = |event: &Event, details: String| {
        let when = format_when(event.start_ts, today, tz);
        if details.is_empty() {
            when
        } else {
            format!("{when}, {details}")
        }
    };

    let last_feed = status.last_feed.as_ref().map_or_else(
        || "none yet".to_string(),
        |feed| describe(feed, event_details(feed, now_ms)),
    );
    let last_diaper = status.last_diaper.as_ref().map_or_else(
        || "none yet".to_string(),
        |diaper| describe(diaper, diaper.kind.to_string()),
    );
    let feeding = match (status.current_feed(), status.active_feed) {
        (Some(feed), _) => format!(
            "yes, #{} for {}",
            feed.id,
            format_duration(now_ms - feed.start_ts)
        ),
        (None, Some(id)) => format!("yes, #{id}"),
        (None, None) => "no".to_string(),
    };

    writeln!(writer, "Last feed:   {last_feed}")?;
    writeln!(writer, "Last diaper: {last_diaper}")?;
    writeln!(writer, "Feeding:     {feeding}")?;
    writeln!(
        writer,
        "Today:       {} feeds, {} wet, {} soiled",
        counts.feeds, counts.wet, counts.soiled
    )?;

    Ok(())
}
