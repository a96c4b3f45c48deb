//! Storage layer for babylog.
//!
//! Provides persistence for events and the active-feed pointer using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. The CLI opens one per
//! process and issues operations sequentially.
//!
//! # Schema
//!
//! - `events`: one row per logged event. `id` is `AUTOINCREMENT`, so ids are
//!   never reused, even after [`Database::clear`]. Indexed by `start_ts` for
//!   the recent-first listing and by `type` for type-filtered lookups.
//! - `app_state`: small key/value table holding the active-feed pointer,
//!   deliberately outside the `events` table.
//!
//! Timestamps are epoch milliseconds stored as INTEGER.
//!
//! Every mutating operation runs in a single transaction. The active-feed
//! pointer is only ever written inside the same transaction as the event
//! change it reflects, so a failed operation leaves both untouched.

mod active;
mod backup;

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use thiserror::Error;

use bl_core::{
    CodecError, Event, EventId, EventPatch, EventType, FeedSide, NewEvent, StatusSnapshot,
    ValidationError,
};

pub use backup::ImportSummary;

/// Schema version written to `PRAGMA user_version`.
const SCHEMA_VERSION: i64 = 1;

const EVENT_COLUMNS: &str = "id, type, start_ts, end_ts, side, notes";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// The database could not be opened or a statement failed.
    #[error("storage unavailable: {0}")]
    Storage(#[from] rusqlite::Error),
    /// The targeted event does not exist.
    #[error("event {id} not found")]
    NotFound { id: EventId },
    /// A feed was started while another one is still running.
    #[error("feed {id} is already in progress")]
    FeedInProgress { id: EventId },
    /// The event or patch violates the data model.
    #[error("invalid event: {0}")]
    Invalid(#[from] ValidationError),
    /// A stored row could not be decoded.
    #[error("unreadable event row {id}: {message}")]
    Corrupt { id: i64, message: String },
    /// The file was written by a newer version of the schema.
    #[error("database schema version {found} is newer than this build supports")]
    UnsupportedSchema { found: i64 },
    /// A backup document could not be read or written.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        let found: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if found > SCHEMA_VERSION {
            return Err(DbError::UnsupportedSchema { found });
        }

        self.conn.execute_batch(
            "
            -- Events table: one row per logged feed or diaper
            -- start_ts/end_ts: epoch milliseconds
            -- type: feed | wet | soiled | both
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                type TEXT NOT NULL,
                start_ts INTEGER NOT NULL CHECK (start_ts > 0),
                end_ts INTEGER,
                side TEXT,
                notes TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_events_start_ts ON events(start_ts);
            CREATE INDEX IF NOT EXISTS idx_events_type ON events(type);

            CREATE TABLE IF NOT EXISTS app_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        if found < SCHEMA_VERSION {
            self.conn
                .execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
        }
        Ok(())
    }

    /// Appends an event and returns its newly assigned id.
    pub fn add(&mut self, event: &NewEvent) -> Result<EventId, DbError> {
        event.validate()?;
        let tx = self.conn.transaction()?;
        let id = insert_event(&tx, event)?;
        tx.commit()?;
        tracing::debug!(%id, kind = %event.kind, "event added");
        Ok(id)
    }

    /// Inserts an event under an explicit id.
    ///
    /// Returns `false`, leaving the stored event untouched, if the id is taken.
    pub fn insert_with_id(&mut self, id: EventId, event: &NewEvent) -> Result<bool, DbError> {
        event.validate()?;
        let tx = self.conn.transaction()?;
        let inserted = insert_event_with_id(&tx, id, event)?;
        tx.commit()?;
        Ok(inserted)
    }

    /// Fetches a single event.
    pub fn get(&self, id: EventId) -> Result<Option<Event>, DbError> {
        read_event(&self.conn, id)
    }

    /// Merges `patch` into an existing event and returns the result.
    ///
    /// If the patch completes the active feed (or turns it into something that
    /// is no longer an open feed), the active pointer is cleared as well.
    pub fn update(&mut self, id: EventId, patch: &EventPatch) -> Result<Event, DbError> {
        let tx = self.conn.transaction()?;
        let mut event = read_event(&tx, id)?.ok_or(DbError::NotFound { id })?;
        patch.apply(&mut event)?;
        write_event(&tx, &event)?;
        if !event.is_open_feed() && active::read_active(&tx)? == Some(id) {
            active::write_active(&tx, None)?;
            tracing::debug!(%id, "active feed completed by edit");
        }
        tx.commit()?;
        tracing::debug!(%id, "event updated");
        Ok(event)
    }

    /// Deletes an event, clearing the active pointer if it referenced it.
    ///
    /// Deleting a missing id is not an error; returns whether a row was removed.
    pub fn delete(&mut self, id: EventId) -> Result<bool, DbError> {
        let tx = self.conn.transaction()?;
        let removed = delete_event(&tx, id)?;
        tx.commit()?;
        if removed {
            tracing::debug!(%id, "event deleted");
        }
        Ok(removed)
    }

    /// Removes every event and the active pointer. Returns the number removed.
    ///
    /// The id sequence is not reset.
    pub fn clear(&mut self) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM events", [])?;
        active::write_active(&tx, None)?;
        tx.commit()?;
        tracing::debug!(removed, "all events cleared");
        Ok(removed)
    }

    /// Lists up to `limit` events, most recent start first.
    ///
    /// Ties on `start_ts` are broken by id, higher (later inserted) first.
    pub fn list(&self, limit: usize) -> Result<Vec<Event>, DbError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {EVENT_COLUMNS}
            FROM events
            ORDER BY start_ts DESC, id DESC
            LIMIT ?
            "
        ))?;
        let rows = stmt.query_map([limit], EventRow::from_row)?;
        collect_events(rows)
    }

    /// Lists every event, oldest first: the exact reverse of [`Self::list`].
    pub fn list_all_ascending(&self) -> Result<Vec<Event>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {EVENT_COLUMNS}
            FROM events
            ORDER BY start_ts ASC, id ASC
            "
        ))?;
        let rows = stmt.query_map([], EventRow::from_row)?;
        collect_events(rows)
    }

    /// The most recent event whose type is one of `kinds`.
    pub fn latest_of(&self, kinds: &[EventType]) -> Result<Option<Event>, DbError> {
        if kinds.is_empty() {
            return Ok(None);
        }
        let placeholders = vec!["?"; kinds.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE type IN ({placeholders})
            ORDER BY start_ts DESC, id DESC
            LIMIT 1
            "
        ))?;
        let row = stmt
            .query_row(params_from_iter(kinds.iter().map(EventType::as_str)), |row| {
                EventRow::from_row(row)
            })
            .optional()?;
        row.map(EventRow::into_event).transpose()
    }

    /// Latest feed, latest diaper and the active pointer.
    pub fn status(&self) -> Result<StatusSnapshot, DbError> {
        Ok(StatusSnapshot {
            last_feed: self.latest_of(&[EventType::Feed])?,
            last_diaper: self.latest_of(&EventType::DIAPERS)?,
            active_feed: self.active_feed()?,
        })
    }

    /// Number of stored events.
    pub fn count(&self) -> Result<usize, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

/// Current wall-clock time in epoch milliseconds.
fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// An `events` row before its text columns are validated.
#[derive(Debug)]
struct EventRow {
    id: i64,
    kind: String,
    start_ts: i64,
    end_ts: Option<i64>,
    side: Option<String>,
    notes: String,
}

impl EventRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            start_ts: row.get(2)?,
            end_ts: row.get(3)?,
            side: row.get(4)?,
            notes: row.get(5)?,
        })
    }

    fn into_event(self) -> Result<Event, DbError> {
        let row_id = self.id;
        let corrupt = move |message: String| DbError::Corrupt {
            id: row_id,
            message,
        };
        let id = EventId::new(self.id).map_err(|err| corrupt(err.to_string()))?;
        let kind: EventType = self
            .kind
            .parse()
            .map_err(|err: bl_core::UnknownEventType| corrupt(err.to_string()))?;
        let side = FeedSide::parse_optional(self.side.as_deref().unwrap_or(""))
            .map_err(|err| corrupt(err.to_string()))?;
        Ok(Event {
            id,
            kind,
            start_ts: self.start_ts,
            end_ts: self.end_ts,
            side,
            notes: self.notes,
        })
    }
}

fn collect_events<I>(rows: I) -> Result<Vec<Event>, DbError>
where
    I: Iterator<Item = rusqlite::Result<EventRow>>,
{
    let mut events = Vec::new();
    for row in rows {
        events.push(row?.into_event()?);
    }
    Ok(events)
}

fn read_event(conn: &Connection, id: EventId) -> Result<Option<Event>, DbError> {
    let row = conn
        .query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"),
            [id.get()],
            EventRow::from_row,
        )
        .optional()?;
    row.map(EventRow::into_event).transpose()
}

fn insert_event(conn: &Connection, event: &NewEvent) -> Result<EventId, DbError> {
    conn.execute(
        "INSERT INTO events (type, start_ts, end_ts, side, notes) VALUES (?, ?, ?, ?, ?)",
        params![
            event.kind.as_str(),
            event.start_ts,
            event.end_ts,
            event.side.map(|s| s.as_str()),
            event.notes,
        ],
    )?;
    Ok(EventId::new(conn.last_insert_rowid())?)
}

fn insert_event_with_id(conn: &Connection, id: EventId, event: &NewEvent) -> Result<bool, DbError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO events (id, type, start_ts, end_ts, side, notes) VALUES (?, ?, ?, ?, ?, ?)",
        params![
            id.get(),
            event.kind.as_str(),
            event.start_ts,
            event.end_ts,
            event.side.map(|s| s.as_str()),
            event.notes,
        ],
    )?;
    Ok(inserted == 1)
}

fn write_event(conn: &Connection, event: &Event) -> Result<(), DbError> {
    conn.execute(
        "UPDATE events SET type = ?, start_ts = ?, end_ts = ?, side = ?, notes = ? WHERE id = ?",
        params![
            event.kind.as_str(),
            event.start_ts,
            event.end_ts,
            event.side.map(|s| s.as_str()),
            event.notes,
            event.id.get(),
        ],
    )?;
    Ok(())
}

fn delete_event(conn: &Connection, id: EventId) -> Result<bool, DbError> {
    let removed = conn.execute("DELETE FROM events WHERE id = ?", [id.get()])? > 0;
    if active::read_active(conn)? == Some(id) {
        active::write_active(conn, None)?;
        tracing::debug!(%id, "active feed deleted, pointer cleared");
    }
    Ok(removed)
}
