//! History command: recent events grouped under local day headers.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::TimeZone;

use bl_core::Event;
use bl_core::calendar::local_date;
use bl_db::Database;

use super::util::{event_details, format_clock, format_day, type_label};

pub fn run<W, Tz>(
    writer: &mut W,
    db: &Database,
    limit: usize,
    json: bool,
    now_ms: i64,
    tz: &Tz,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let events = db.list(limit)?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&events)?)?;
        return Ok(());
    }
    write!(writer, "{}", format_history(&events, now_ms, tz))?;
    Ok(())
}

/// Renders events, which must already be in list order.
pub fn format_history<Tz>(events: &[Event], now_ms: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    use std::fmt::Write as _;

    if events.is_empty() {
        return "No events logged yet.\n".to_string();
    }

    let mut output = String::new();
    let mut current_day = None;
    for event in events {
        let day = local_date(event.start_ts, tz);
        if day != current_day {
            if current_day.is_some() {
                output.push('\n');
            }
            let header = day.map_or_else(|| "Unknown date".to_string(), format_day);
            let _ = writeln!(output, "{header}");
            current_day = day;
        }

        let line = format!(
            "  {}  #{:<4} {:<13}  {}",
            format_clock(event.start_ts, tz),
            event.id.to_string(),
            type_label(event.kind),
            event_details(event, now_ms)
        );
        let _ = writeln!(output, "{}", line.trim_end());
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    use bl_core::{EventType, FeedSide, NewEvent};
    use chrono::Utc;
    use insta::assert_snapshot;

    /// 2026-10-18T00:00:00Z
    const DAY: i64 = 1_792_281_600_000;
    const MINUTE: i64 = 60_000;

    #[test]
    fn history_groups_by_day() {
        let mut db = Database::open_in_memory().unwrap();
        db.add(&NewEvent::new(EventType::Soiled, DAY - 2 * 60 * MINUTE))
            .unwrap();
        db.start_feed_at(DAY + 8 * 60 * MINUTE, Some(FeedSide::Left))
            .unwrap();
        db.stop_feed_at(DAY + 8 * 60 * MINUTE + 95 * MINUTE).unwrap();
        db.add(&NewEvent::new(EventType::Wet, DAY + 10 * 60 * MINUTE).with_notes("after bath"))
            .unwrap();
        db.start_feed_at(DAY + 11 * 60 * MINUTE, None).unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, 300, false, DAY + 11 * 60 * MINUTE + 7 * MINUTE, &Utc).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Sun Oct 18, 2026
          11:00  #4    Feed           in progress, 7 min so far
          10:00  #3    Wet diaper     after bath
          08:00  #2    Feed           1h 35m, left

        Sat Oct 17, 2026
          22:00  #1    Soiled diaper
        ");
    }

    #[test]
    fn history_respects_limit() {
        let mut db = Database::open_in_memory().unwrap();
        for i in 1..=5 {
            db.add(&NewEvent::new(EventType::Wet, DAY + i * MINUTE))
                .unwrap();
        }
        let events = db.list(2).unwrap();
        let rendered = format_history(&events, DAY, &Utc);
        assert_eq!(rendered.lines().count(), 3);
        assert!(rendered.contains("#5"));
        assert!(!rendered.contains("#3"));
    }

    #[test]
    fn history_of_empty_log() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        run(&mut output, &db, 300, false, DAY, &Utc).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "No events logged yet.\n");
    }

    #[test]
    fn history_json_lists_events() {
        let mut db = Database::open_in_memory().unwrap();
        db.add(&NewEvent::new(EventType::Wet, DAY)).unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, 300, true, DAY, &Utc).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value[0]["id"], 1);
        assert_eq!(value[0]["type"], "wet");
        assert_eq!(value[0]["start_ts"], DAY);
    }
}
