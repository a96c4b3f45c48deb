//! Core domain logic for babylog.
//!
//! This crate contains the fundamental types and logic for:
//! - Events: feeds and diapers, plus the values used to create and patch them
//! - Statistics: day buckets folded into ISO week and month views
//! - Backup: the CSV export/import format
//!
//! Nothing here performs I/O; storage lives in `bl-db`.

pub mod backup;
pub mod calendar;
pub mod event;
pub mod event_type;
pub mod manual;
pub mod stats;
pub mod status;
pub mod types;

pub use backup::{CodecError, ImportCandidate, RowError};
pub use calendar::{MonthKey, WeekKey};
pub use event::{Event, EventPatch, FeedSide, NewEvent};
pub use event_type::{EventType, UnknownEventType};
pub use manual::ManualFeed;
pub use stats::{DailyCounts, DailyStats, DayBucket, PeriodBucket, format_duration, today_counts};
pub use status::StatusSnapshot;
pub use types::{EventId, ValidationError};
