//! Backup commands: CSV export and import.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;

use bl_core::backup::export_file_name;
use bl_db::Database;

use crate::Config;

/// Writes every event to `output`, `-` for the given writer, or a dated file
/// in the configured export directory.
pub fn export<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    output: Option<&Path>,
    today: NaiveDate,
) -> Result<()> {
    let csv = db.export_csv().context("failed to export events")?;

    if output == Some(Path::new("-")) {
        write!(writer, "{csv}")?;
        return Ok(());
    }

    let path: PathBuf = output.map_or_else(
        || config.export_path(&export_file_name(today)),
        Path::to_path_buf,
    );
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, csv).with_context(|| format!("failed to write {}", path.display()))?;

    let count = db.count()?;
    tracing::info!(path = %path.display(), count, "export written");
    writeln!(writer, "Exported {count} events to {}.", path.display())?;
    Ok(())
}

pub fn import<W: Write>(writer: &mut W, db: &mut Database, path: &Path) -> Result<()> {
    let data = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let summary = db
        .import_csv(&data)
        .with_context(|| format!("failed to import {}", path.display()))?;

    writeln!(
        writer,
        "Imported {} events, skipped {} already present, {} invalid.",
        summary.imported, summary.skipped, summary.failed
    )?;
    Ok(())
}
