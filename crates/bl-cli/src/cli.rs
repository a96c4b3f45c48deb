//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use bl_core::{EventId, EventType, FeedSide};

use crate::commands::stats::View;

/// Feeding and diaper log.
///
/// Records feeds and diaper changes locally and summarizes them by day, week
/// and month.
#[derive(Debug, Parser)]
#[command(name = "babylog", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the last feed, last diaper and today's counts.
    Status,

    /// Start a feed now.
    Start {
        /// Side the feed starts on.
        #[arg(long, value_enum)]
        side: Option<SideArg>,
    },

    /// Stop the feed in progress.
    Stop,

    /// Stop the feed in progress, or start one if none is running.
    Feed {
        /// Side used when a new feed is started.
        #[arg(long, value_enum)]
        side: Option<SideArg>,
    },

    /// Log a diaper change now.
    Log {
        #[arg(value_enum)]
        kind: DiaperKind,

        /// Free-text notes.
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Log a finished feed from clock times.
    ///
    /// An end time before the start time is taken to cross midnight.
    Manual {
        /// Start time (HH:MM).
        #[arg(long)]
        start: String,

        /// End time (HH:MM).
        #[arg(long)]
        end: String,

        /// Date of the start time (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,

        #[arg(long, value_enum)]
        side: Option<SideArg>,

        #[arg(long, default_value = bl_core::manual::DEFAULT_MANUAL_NOTES)]
        notes: String,
    },

    /// Delete the most recent event.
    Undo,

    /// Delete an event by id.
    Delete {
        #[arg(value_parser = parse_event_id)]
        id: EventId,
    },

    /// Change fields of an existing event.
    Edit(EditArgs),

    /// Show recent events grouped by day.
    History {
        /// Maximum number of events. Defaults to the configured history limit.
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show daily, weekly or monthly statistics.
    Stats {
        #[arg(long, value_enum, default_value_t = View::Daily)]
        view: View,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Write all events to a CSV backup.
    Export {
        /// Output file, or `-` for stdout. Defaults to `babylog_<date>.csv`
        /// in the configured export directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Restore events from a CSV backup.
    Import {
        /// Backup file to read.
        file: PathBuf,
    },

    /// Delete every event.
    Clear {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

/// Fields accepted by `edit`; anything omitted is left unchanged.
#[derive(Debug, Args)]
pub struct EditArgs {
    #[arg(value_parser = parse_event_id)]
    pub id: EventId,

    /// New event type.
    #[arg(long = "type")]
    pub kind: Option<EventType>,

    /// New start (YYYY-MM-DD HH:MM local, or RFC 3339).
    #[arg(long)]
    pub start: Option<String>,

    /// New end (YYYY-MM-DD HH:MM local, or RFC 3339).
    #[arg(long, conflicts_with = "clear_end")]
    pub end: Option<String>,

    /// Remove the end time.
    #[arg(long)]
    pub clear_end: bool,

    #[arg(long, value_enum)]
    pub side: Option<SideArg>,

    #[arg(long)]
    pub notes: Option<String>,
}

/// Feed side as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SideArg {
    Left,
    Right,
    None,
}

impl SideArg {
    pub const fn side(self) -> Option<FeedSide> {
        match self {
            Self::Left => Some(FeedSide::Left),
            Self::Right => Some(FeedSide::Right),
            Self::None => None,
        }
    }
}

/// Diaper event types accepted by `log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DiaperKind {
    Wet,
    Soiled,
    Both,
}

impl From<DiaperKind> for EventType {
    fn from(kind: DiaperKind) -> Self {
        match kind {
            DiaperKind::Wet => Self::Wet,
            DiaperKind::Soiled => Self::Soiled,
            DiaperKind::Both => Self::Both,
        }
    }
}

fn parse_event_id(s: &str) -> Result<EventId, String> {
    let raw: i64 = s
        .parse()
        .map_err(|_| format!("invalid event id: {s}"))?;
    EventId::new(raw).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_manual_entry_with_default_notes() {
        let cli = Cli::try_parse_from([
            "babylog", "manual", "--start", "23:50", "--end", "00:10", "--side", "left",
        ])
        .unwrap();
        let Some(Commands::Manual {
            start,
            end,
            date,
            side,
            notes,
        }) = cli.command
        else {
            panic!("expected manual command");
        };
        assert_eq!(start, "23:50");
        assert_eq!(end, "00:10");
        assert_eq!(date, None);
        assert_eq!(side, Some(SideArg::Left));
        assert_eq!(notes, "manual");
    }

    #[test]
    fn edit_rejects_end_with_clear_end() {
        let result = Cli::try_parse_from([
            "babylog",
            "edit",
            "3",
            "--end",
            "2026-10-18 10:00",
            "--clear-end",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn event_ids_must_be_positive() {
        assert!(Cli::try_parse_from(["babylog", "delete", "0"]).is_err());
        assert!(Cli::try_parse_from(["babylog", "delete", "abc"]).is_err());
        assert!(Cli::try_parse_from(["babylog", "delete", "7"]).is_ok());
    }

    #[test]
    fn log_only_accepts_diaper_types() {
        assert!(Cli::try_parse_from(["babylog", "log", "feed"]).is_err());
        let cli = Cli::try_parse_from(["babylog", "log", "both"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Log {
                kind: DiaperKind::Both,
                ..
            })
        ));
    }
}
