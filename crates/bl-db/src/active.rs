//! Active-feed tracking.
//!
//! At most one feed is in progress at a time. Its id lives in `app_state`
//! under [`ACTIVE_FEED_KEY`] and changes only together with the event it
//! points at.

use rusqlite::{Connection, OptionalExtension};

use bl_core::{Event, EventId, EventPatch, FeedSide, NewEvent};

use crate::{Database, DbError, delete_event, insert_event, now_ms, read_event, write_event};

pub(crate) const ACTIVE_FEED_KEY: &str = "active_feed_id";

impl Database {
    /// Id of the feed currently in progress, if any.
    pub fn active_feed(&self) -> Result<Option<EventId>, DbError> {
        read_active(&self.conn)
    }

    /// Overwrites the active pointer without touching any event.
    ///
    /// Used to recover from a pointer that references a deleted event.
    pub fn set_active_feed(&mut self, id: Option<EventId>) -> Result<(), DbError> {
        write_active(&self.conn, id)
    }

    /// Starts a feed now. See [`Self::start_feed_at`].
    pub fn start_feed(&mut self, side: Option<FeedSide>) -> Result<EventId, DbError> {
        self.start_feed_at(now_ms(), side)
    }

    /// Creates an open feed starting at `now_ms` and marks it active.
    ///
    /// Fails with [`DbError::FeedInProgress`] if another feed is still open.
    /// A pointer left behind by a missing or completed event is replaced.
    pub fn start_feed_at(
        &mut self,
        now_ms: i64,
        side: Option<FeedSide>,
    ) -> Result<EventId, DbError> {
        let event = NewEvent::feed_start(now_ms, side);
        event.validate()?;

        let tx = self.conn.transaction()?;
        if let Some(current) = read_active(&tx)? {
            let still_open = read_event(&tx, current)?.is_some_and(|e| e.is_open_feed());
            if still_open {
                return Err(DbError::FeedInProgress { id: current });
            }
            tracing::warn!(id = %current, "replacing stale active feed pointer");
        }

        let id = insert_event(&tx, &event)?;
        write_active(&tx, Some(id))?;
        tx.commit()?;
        tracing::info!(%id, side = ?side, "feed started");
        Ok(id)
    }

    /// Stops the active feed now. See [`Self::stop_feed_at`].
    pub fn stop_feed(&mut self) -> Result<Option<Event>, DbError> {
        self.stop_feed_at(now_ms())
    }

    /// Sets `end_ts = now_ms` on the active feed and clears the pointer.
    ///
    /// Returns `None` when no feed is active. If the pointer references an
    /// event that no longer exists, fails with [`DbError::NotFound`] and leaves
    /// the pointer as it was.
    pub fn stop_feed_at(&mut self, now_ms: i64) -> Result<Option<Event>, DbError> {
        let tx = self.conn.transaction()?;
        let Some(id) = read_active(&tx)? else {
            return Ok(None);
        };
        let mut event = read_event(&tx, id)?.ok_or(DbError::NotFound { id })?;
        EventPatch::stop(now_ms).apply(&mut event)?;
        write_event(&tx, &event)?;
        write_active(&tx, None)?;
        tx.commit()?;
        tracing::info!(%id, duration_ms = ?event.duration_ms(), "feed stopped");
        Ok(Some(event))
    }

    /// Deletes the most recent event (first in list order).
    ///
    /// Clears the active pointer if it referenced that event. Returns the
    /// removed event, or `None` when the log is empty.
    pub fn undo_last(&mut self) -> Result<Option<Event>, DbError> {
        let tx = self.conn.transaction()?;
        let latest: Option<i64> = tx
            .query_row(
                "SELECT id FROM events ORDER BY start_ts DESC, id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let Some(raw_id) = latest else {
            return Ok(None);
        };
        let id = EventId::new(raw_id)?;
        let event = read_event(&tx, id)?;
        delete_event(&tx, id)?;
        tx.commit()?;
        tracing::debug!(%id, "undid latest event");
        Ok(event)
    }
}

pub(crate) fn read_active(conn: &Connection) -> Result<Option<EventId>, DbError> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM app_state WHERE key = ?",
            [ACTIVE_FEED_KEY],
            |row| row.get(0),
        )
        .optional()?;
    let Some(value) = value else {
        return Ok(None);
    };

    match value.parse::<i64>().ok().and_then(|raw| EventId::new(raw).ok()) {
        Some(id) => Ok(Some(id)),
        None => {
            tracing::warn!(value = %value, "ignoring unreadable active feed pointer");
            Ok(None)
        }
    }
}

pub(crate) fn write_active(conn: &Connection, id: Option<EventId>) -> Result<(), DbError> {
    match id {
        Some(id) => {
            conn.execute(
                "INSERT INTO app_state (key, value) VALUES (?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                [ACTIVE_FEED_KEY, id.to_string().as_str()],
            )?;
        }
        None => {
            conn.execute("DELETE FROM app_state WHERE key = ?", [ACTIVE_FEED_KEY])?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{id, wet};
    use bl_core::EventType;

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn start_then_stop_completes_feed() {
        let mut db = Database::open_in_memory().unwrap();
        let feed_id = db.start_feed_at(T0, Some(FeedSide::Right)).unwrap();
        assert_eq!(db.active_feed().unwrap(), Some(feed_id));

        let open = db.get(feed_id).unwrap().unwrap();
        assert!(open.is_open_feed());

        let stopped = db.stop_feed_at(T0 + 15 * 60_000).unwrap().unwrap();
        assert_eq!(stopped.id, feed_id);
        assert_eq!(stopped.end_ts, Some(T0 + 15 * 60_000));
        assert_eq!(stopped.side, Some(FeedSide::Right));
        assert_eq!(db.active_feed().unwrap(), None);
        assert_eq!(db.get(feed_id).unwrap().unwrap(), stopped);
    }

    #[test]
    fn stop_without_active_feed_is_a_no_op() {
        let mut db = Database::open_in_memory().unwrap();
        db.add(&wet(T0)).unwrap();
        assert!(db.stop_feed_at(T0 + 1).unwrap().is_none());
        assert_eq!(db.list(10).unwrap()[0].end_ts, None);
    }

    #[test]
    fn start_while_feeding_is_rejected() {
        let mut db = Database::open_in_memory().unwrap();
        let first = db.start_feed_at(T0, None).unwrap();

        let err = db.start_feed_at(T0 + 1_000, None).unwrap_err();
        assert!(matches!(err, DbError::FeedInProgress { id } if id == first));
        assert_eq!(db.count().unwrap(), 1);
        assert_eq!(db.active_feed().unwrap(), Some(first));
    }

    #[test]
    fn stale_pointer_does_not_block_start() {
        let mut db = Database::open_in_memory().unwrap();
        db.set_active_feed(Some(id(99))).unwrap();

        let started = db.start_feed_at(T0, None).unwrap();
        assert_eq!(db.active_feed().unwrap(), Some(started));
    }

    #[test]
    fn stop_with_missing_event_keeps_pointer() {
        let mut db = Database::open_in_memory().unwrap();
        db.set_active_feed(Some(id(99))).unwrap();

        let err = db.stop_feed_at(T0).unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(db.active_feed().unwrap(), Some(id(99)));
    }

    #[test]
    fn deleting_active_feed_clears_pointer() {
        let mut db = Database::open_in_memory().unwrap();
        let feed_id = db.start_feed_at(T0, None).unwrap();
        db.delete(feed_id).unwrap();
        assert_eq!(db.active_feed().unwrap(), None);
    }

    #[test]
    fn deleting_other_event_keeps_pointer() {
        let mut db = Database::open_in_memory().unwrap();
        let diaper = db.add(&wet(T0)).unwrap();
        let feed_id = db.start_feed_at(T0 + 1, None).unwrap();
        db.delete(diaper).unwrap();
        assert_eq!(db.active_feed().unwrap(), Some(feed_id));
    }

    #[test]
    fn undo_removes_latest_and_clears_pointer() {
        let mut db = Database::open_in_memory().unwrap();
        db.add(&wet(T0)).unwrap();
        let feed_id = db.start_feed_at(T0 + 60_000, None).unwrap();

        let undone = db.undo_last().unwrap().unwrap();
        assert_eq!(undone.id, feed_id);
        assert_eq!(db.active_feed().unwrap(), None);
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn undo_picks_latest_start_not_latest_insert() {
        let mut db = Database::open_in_memory().unwrap();
        let later = db.add(&wet(T0 + 10)).unwrap();
        db.add(&wet(T0)).unwrap();

        assert_eq!(db.undo_last().unwrap().unwrap().id, later);
    }

    #[test]
    fn undo_on_empty_log_is_a_no_op() {
        let mut db = Database::open_in_memory().unwrap();
        assert!(db.undo_last().unwrap().is_none());
    }

    #[test]
    fn editing_end_of_active_feed_clears_pointer() {
        let mut db = Database::open_in_memory().unwrap();
        let feed_id = db.start_feed_at(T0, None).unwrap();

        db.update(feed_id, &EventPatch::stop(T0 + 5_000)).unwrap();
        assert_eq!(db.active_feed().unwrap(), None);
        assert!(db.stop_feed_at(T0 + 10_000).unwrap().is_none());
    }

    #[test]
    fn editing_notes_of_active_feed_keeps_pointer() {
        let mut db = Database::open_in_memory().unwrap();
        let feed_id = db.start_feed_at(T0, None).unwrap();
        let patch = EventPatch {
            notes: Some("cluster feeding".to_string()),
            ..EventPatch::default()
        };
        db.update(feed_id, &patch).unwrap();
        assert_eq!(db.active_feed().unwrap(), Some(feed_id));
    }

    #[test]
    fn adding_open_feed_does_not_mark_it_active() {
        let mut db = Database::open_in_memory().unwrap();
        db.add(&NewEvent::new(EventType::Feed, T0)).unwrap();
        assert_eq!(db.active_feed().unwrap(), None);
    }

    #[test]
    fn clear_resets_pointer() {
        let mut db = Database::open_in_memory().unwrap();
        db.start_feed_at(T0, None).unwrap();
        db.clear().unwrap();
        assert_eq!(db.active_feed().unwrap(), None);
    }

    #[test]
    fn pointer_survives_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("babylog.db");
        let feed_id = {
            let mut db = Database::open(&path).unwrap();
            db.start_feed_at(T0, Some(FeedSide::Left)).unwrap()
        };

        let mut db = Database::open(&path).unwrap();
        assert_eq!(db.active_feed().unwrap(), Some(feed_id));
        assert!(db.stop_feed_at(T0 + 1_000).unwrap().is_some());
    }
}
