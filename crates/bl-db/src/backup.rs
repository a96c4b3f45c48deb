//! CSV export and import against the store.

use serde::Serialize;

use bl_core::backup as codec;

use crate::{Database, DbError, insert_event, insert_event_with_id};

/// Outcome of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Rows stored.
    pub imported: usize,
    /// Rows whose id already existed.
    pub skipped: usize,
    /// Rows rejected by validation.
    pub failed: usize,
}

impl Database {
    /// Serializes every event, oldest first.
    pub fn export_csv(&self) -> Result<String, DbError> {
        let events = self.list_all_ascending()?;
        let text = codec::encode(&events)?;
        tracing::debug!(events = events.len(), "exported events");
        Ok(text)
    }

    /// Restores events from a CSV backup.
    ///
    /// Rows carrying an id already in the store are skipped, leaving the
    /// stored event unchanged. Rows without a usable id get a fresh one.
    /// Invalid rows are counted and logged; the rest of the file still
    /// imports, including rows after one with a broken quote or invalid
    /// UTF-8. All accepted rows are written in one transaction.
    pub fn import_csv(&mut self, data: &[u8]) -> Result<ImportSummary, DbError> {
        let rows = codec::decode(data)?;
        let mut summary = ImportSummary::default();

        let tx = self.conn.transaction()?;
        for row in rows {
            let candidate = match row {
                Ok(candidate) => candidate,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping invalid backup row");
                    summary.failed += 1;
                    continue;
                }
            };

            match candidate.id {
                Some(id) => {
                    if insert_event_with_id(&tx, id, &candidate.event)? {
                        summary.imported += 1;
                    } else {
                        tracing::debug!(%id, "event already present, skipping");
                        summary.skipped += 1;
                    }
                }
                None => {
                    insert_event(&tx, &candidate.event)?;
                    summary.imported += 1;
                }
            }
        }
        tx.commit()?;

        tracing::info!(
            imported = summary.imported,
            skipped = summary.skipped,
            failed = summary.failed,
            "import finished"
        );
        Ok(summary)
    }
}
