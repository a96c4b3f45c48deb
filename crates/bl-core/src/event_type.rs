//! Event type enum as the single source of truth for event type strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kinds of events that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    Feed,
    Wet,
    Soiled,
    Both,
}

impl EventType {
    /// All variants, in display order.
    pub const ALL: [Self; 4] = [Self::Feed, Self::Wet, Self::Soiled, Self::Both];

    /// The diaper variants.
    pub const DIAPERS: [Self; 3] = [Self::Wet, Self::Soiled, Self::Both];

    /// String representation for storage and CSV.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Wet => "wet",
            Self::Soiled => "soiled",
            Self::Both => "both",
        }
    }

    #[must_use]
    pub const fn is_diaper(&self) -> bool {
        !matches!(self, Self::Feed)
    }

    /// Whether this event counts towards the wet diaper total.
    #[must_use]
    pub const fn counts_wet(&self) -> bool {
        matches!(self, Self::Wet | Self::Both)
    }

    /// Whether this event counts towards the soiled diaper total.
    #[must_use]
    pub const fn counts_soiled(&self) -> bool {
        matches!(self, Self::Soiled | Self::Both)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "feed" => Ok(Self::Feed),
            "wet" => Ok(Self::Wet),
            "soiled" => Ok(Self::Soiled),
            "both" => Ok(Self::Both),
            _ => Err(UnknownEventType(s.to_string())),
        }
    }
}

impl Serialize for EventType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown event type strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType(String);

impl UnknownEventType {
    /// The rejected input.
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event type: {}", self.0)
    }
}

impl std::error::Error for UnknownEventType {}
