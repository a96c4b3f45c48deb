//! Current-status summary: the latest feed, the latest diaper and the active feed.

use serde::Serialize;

use crate::event::Event;
use crate::types::EventId;

/// What the status view shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub last_feed: Option<Event>,
    pub last_diaper: Option<Event>,
    pub active_feed: Option<EventId>,
}

impl StatusSnapshot {
    /// The feed in progress, when it is also the latest feed.
    ///
    /// An active pointer to an older feed (one logged manually later with an
    /// earlier start) still counts as feeding but is not returned here.
    pub fn current_feed(&self) -> Option<&Event> {
        let active = self.active_feed?;
        self.last_feed
            .as_ref()
            .filter(|feed| feed.id == active && feed.is_open_feed())
    }

    pub const fn is_feeding(&self) -> bool {
        self.active_feed.is_some()
    }
}
