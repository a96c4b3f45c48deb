//! Event commands: log a diaper, undo, delete, edit and clear.

use std::fmt::Display;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::TimeZone;

use bl_core::{Event, EventId, EventPatch, EventType, NewEvent};
use bl_db::Database;

use super::util::{event_details, format_clock, parse_local_datetime, type_label};
use crate::EditArgs;

pub fn log<W, Tz>(
    writer: &mut W,
    db: &mut Database,
    kind: EventType,
    notes: &str,
    now_ms: i64,
    tz: &Tz,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let id = db
        .add(&NewEvent::new(kind, now_ms).with_notes(notes))
        .context("failed to log event")?;
    writeln!(
        writer,
        "Logged {} #{id} at {}.",
        type_label(kind).to_lowercase(),
        format_clock(now_ms, tz)
    )?;
    Ok(())
}

pub fn undo<W, Tz>(writer: &mut W, db: &mut Database, tz: &Tz) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match db.undo_last().context("failed to undo")? {
        Some(event) => writeln!(writer, "Removed {}.", summary(&event, tz))?,
        None => writeln!(writer, "Nothing to undo.")?,
    }
    Ok(())
}

pub fn delete<W: Write>(writer: &mut W, db: &mut Database, id: EventId) -> Result<()> {
    if db.delete(id).context("failed to delete event")? {
        writeln!(writer, "Deleted event #{id}.")?;
    } else {
        writeln!(writer, "No event #{id}.")?;
    }
    Ok(())
}

/// Builds the patch described by `edit` flags.
pub fn build_patch<Tz: TimeZone>(args: &EditArgs, tz: &Tz) -> Result<EventPatch> {
    let end_ts = if args.clear_end {
        Some(None)
    } else {
        args.end
            .as_deref()
            .map(|end| parse_local_datetime(end, tz))
            .transpose()?
            .map(Some)
    };
    Ok(EventPatch {
        kind: args.kind,
        start_ts: args
            .start
            .as_deref()
            .map(|start| parse_local_datetime(start, tz))
            .transpose()?,
        end_ts,
        side: args.side.map(crate::SideArg::side),
        notes: args.notes.clone(),
    })
}

pub fn edit<W, Tz>(writer: &mut W, db: &mut Database, args: &EditArgs, now_ms: i64, tz: &Tz) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let patch = build_patch(args, tz)?;
    if patch.is_empty() {
        anyhow::bail!("nothing to change; pass at least one field to edit");
    }
    let event = db
        .update(args.id, &patch)
        .with_context(|| format!("failed to edit event #{}", args.id))?;

    let details = event_details(&event, now_ms);
    if details.is_empty() {
        writeln!(writer, "Updated {}.", summary(&event, tz))?;
    } else {
        writeln!(writer, "Updated {}: {details}.", summary(&event, tz))?;
    }
    Ok(())
}

pub fn clear<W: Write>(writer: &mut W, db: &mut Database, confirmed: bool) -> Result<()> {
    if !confirmed {
        anyhow::bail!("refusing to delete every event without --yes");
    }
    let removed = db.clear().context("failed to clear events")?;
    writeln!(writer, "Deleted {removed} events.")?;
    Ok(())
}

fn summary<Tz>(event: &Event, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{} #{} at {}",
        type_label(event.kind).to_lowercase(),
        event.id,
        format_clock(event.start_ts, tz)
    )
}
