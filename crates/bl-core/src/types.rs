//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An event type string did not match any known variant.
    #[error("unknown event type: {value}")]
    UnknownType { value: String },

    /// A timestamp or id was missing, non-numeric, or not positive.
    #[error("{field} must be a positive number, got {value:?}")]
    NotPositive { field: &'static str, value: String },

    /// A manual entry resolved to a local time that does not exist (DST gap).
    #[error("local time {value} does not exist in this time zone")]
    NonexistentLocalTime { value: String },

    /// A date or time string could not be parsed.
    #[error("invalid {field}: {value}")]
    Unparseable { field: &'static str, value: String },
}

/// A store-assigned event identifier.
///
/// Ids are positive and never reused within a store's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct EventId(i64);

impl EventId {
    /// Creates a new ID after validation.
    pub fn new(id: i64) -> Result<Self, ValidationError> {
        if id <= 0 {
            return Err(ValidationError::NotPositive {
                field: "id",
                value: id.to_string(),
            });
        }
        Ok(Self(id))
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for EventId {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EventId> for i64 {
    fn from(id: EventId) -> Self {
        id.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
