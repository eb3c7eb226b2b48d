//! Fine-grained input movement samples.
//!
//! These are the sub-events batched by the ingestion buffer before being
//! committed to the store; they are never queried individually by the
//! aggregation logic.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of input signal a movement sample records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementKind {
    KeyPress,
    MouseMove,
    MouseClick,
}

impl MovementKind {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::KeyPress => "key_press",
            Self::MouseMove => "mouse_move",
            Self::MouseClick => "mouse_click",
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = UnknownMovementKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "key_press" => Ok(Self::KeyPress),
            "mouse_move" => Ok(Self::MouseMove),
            "mouse_click" => Ok(Self::MouseClick),
            _ => Err(UnknownMovementKind(s.to_string())),
        }
    }
}

impl Serialize for MovementKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MovementKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown movement kind strings.
#[derive(Debug, Clone)]
pub struct UnknownMovementKind(String);

impl fmt::Display for UnknownMovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown movement kind: {}", self.0)
    }
}

impl std::error::Error for UnknownMovementKind {}

/// One buffered input sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementSample {
    pub timestamp: DateTime<Utc>,
    pub kind: MovementKind,
    /// Key name, button name, or cursor position, depending on `kind`.
    pub detail: String,
    /// Pointer travel in pixels; zero for key presses and clicks.
    pub distance_px: f64,
}

impl MovementSample {
    #[must_use]
    pub fn new(
        timestamp: DateTime<Utc>,
        kind: MovementKind,
        detail: impl Into<String>,
        distance_px: f64,
    ) -> Self {
        Self {
            timestamp,
            kind,
            detail: detail.into(),
            distance_px,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_kind_roundtrip() {
        for kind in [
            MovementKind::KeyPress,
            MovementKind::MouseMove,
            MovementKind::MouseClick,
        ] {
            let parsed: MovementKind = kind.as_str().parse().expect("should parse");
            assert_eq!(parsed, kind);
        }
        assert!("mouse_wheel".parse::<MovementKind>().is_err());
    }
}
