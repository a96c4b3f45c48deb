//! Logged events and the values used to create and modify them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::event_type::EventType;
use crate::types::{EventId, ValidationError};

/// Milliseconds per minute.
pub const MS_PER_MINUTE: i64 = 60_000;

/// Which side a feed was given on.
///
/// "No side" is represented as `Option::<FeedSide>::None`; the strings
/// `none` and the empty string both parse to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSide {
    Left,
    Right,
}

impl FeedSide {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Parses an optional side, accepting `""` and `none` as "no side".
    pub fn parse_optional(s: &str) -> Result<Option<Self>, ValidationError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(None),
            other => other.parse().map(Some),
        }
    }
}

impl fmt::Display for FeedSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FeedSide {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Self::Left),
            "right" | "r" => Ok(Self::Right),
            _ => Err(ValidationError::Unparseable {
                field: "side",
                value: s.to_string(),
            }),
        }
    }
}

/// A persisted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    #[serde(rename = "type")]
    pub kind: EventType,
    /// Epoch milliseconds.
    pub start_ts: i64,
    /// Epoch milliseconds; only meaningful for feeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ts: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<FeedSide>,
    #[serde(default)]
    pub notes: String,
}

impl Event {
    /// Builds a persisted event from a stored or imported candidate.
    pub fn from_new(id: EventId, event: NewEvent) -> Self {
        Self {
            id,
            kind: event.kind,
            start_ts: event.start_ts,
            end_ts: event.end_ts,
            side: event.side,
            notes: event.notes,
        }
    }

    /// A feed that has been started but not stopped.
    #[must_use]
    pub const fn is_open_feed(&self) -> bool {
        matches!(self.kind, EventType::Feed) && self.end_ts.is_none()
    }

    /// Feed duration in milliseconds, clamped at zero.
    ///
    /// `None` for diaper events and for feeds still in progress.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        if self.kind != EventType::Feed {
            return None;
        }
        self.end_ts.map(|end| (end - self.start_ts).max(0))
    }

    /// Feed minutes as counted by the statistics views.
    ///
    /// Fractional; zero unless the feed has an end strictly after its start.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn feed_minutes(&self) -> f64 {
        match self.end_ts {
            Some(end) if self.kind == EventType::Feed && end > self.start_ts => {
                (end - self.start_ts) as f64 / MS_PER_MINUTE as f64
            }
            _ => 0.0,
        }
    }
}

/// An event that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub kind: EventType,
    pub start_ts: i64,
    pub end_ts: Option<i64>,
    pub side: Option<FeedSide>,
    pub notes: String,
}

impl NewEvent {
    /// An instantaneous event with no end, side or notes.
    pub const fn new(kind: EventType, start_ts: i64) -> Self {
        Self {
            kind,
            start_ts,
            end_ts: None,
            side: None,
            notes: String::new(),
        }
    }

    /// A feed that starts now and is completed later by a stop.
    pub const fn feed_start(start_ts: i64, side: Option<FeedSide>) -> Self {
        Self {
            kind: EventType::Feed,
            start_ts,
            end_ts: None,
            side,
            notes: String::new(),
        }
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Checks the data model constraints the store relies on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start_ts <= 0 {
            return Err(ValidationError::NotPositive {
                field: "startTs",
                value: self.start_ts.to_string(),
            });
        }
        Ok(())
    }
}

/// A partial update; `None` fields are left untouched.
///
/// `end_ts` and `side` are doubly optional so a patch can clear them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub kind: Option<EventType>,
    pub start_ts: Option<i64>,
    pub end_ts: Option<Option<i64>>,
    pub side: Option<Option<FeedSide>>,
    pub notes: Option<String>,
}

impl EventPatch {
    /// The patch applied when a feed is stopped.
    pub const fn stop(end_ts: i64) -> Self {
        Self {
            kind: None,
            start_ts: None,
            end_ts: Some(Some(end_ts)),
            side: None,
            notes: None,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.start_ts.is_none()
            && self.end_ts.is_none()
            && self.side.is_none()
            && self.notes.is_none()
    }

    /// Whether applying this patch gives the event an end time.
    #[must_use]
    pub const fn sets_end(&self) -> bool {
        matches!(self.end_ts, Some(Some(_)))
    }

    /// Merges the patch into `event`, rejecting a non-positive start.
    pub fn apply(&self, event: &mut Event) -> Result<(), ValidationError> {
        if let Some(start_ts) = self.start_ts {
            if start_ts <= 0 {
                return Err(ValidationError::NotPositive {
                    field: "startTs",
                    value: start_ts.to_string(),
                });
            }
            event.start_ts = start_ts;
        }
        if let Some(kind) = self.kind {
            event.kind = kind;
        }
        if let Some(end_ts) = self.end_ts {
            event.end_ts = end_ts;
        }
        if let Some(side) = self.side {
            event.side = side;
        }
        if let Some(notes) = &self.notes {
            event.notes.clone_from(notes);
        }
        Ok(())
    }
}
