//! CLI subcommand implementations.
//!
//! Commands write to any `Write` and take the current time and time zone as
//! arguments; `main` passes stdout, the system clock and the local zone.

pub mod backup;
pub mod events;
pub mod feed;
pub mod history;
pub mod stats;
pub mod status;
pub mod util;
