//! Typed activity events and their classification.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical transition-event kinds.
///
/// This enum is the single source of truth for kind strings; unknown strings
/// are rejected at the ingestion boundary rather than carried through the
/// aggregation logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Input activity observed while the focused window is unchanged.
    Active,
    /// No input activity past the idle threshold.
    Idle,
    /// The focused window or process changed.
    WindowChange,
    /// The focused context matched a non-work pattern.
    NonWorkDetected,
    /// A webcam photo was captured after a sustained idle period.
    IdlePhoto,
}

impl EventKind {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Idle => "idle",
            Self::WindowChange => "window_change",
            Self::NonWorkDetected => "non_work_detected",
            Self::IdlePhoto => "idle_photo",
        }
    }

    /// How this kind reclassifies the subject's ongoing state.
    #[must_use]
    pub const fn class(&self) -> ActivityClass {
        match self {
            Self::Active | Self::WindowChange | Self::NonWorkDetected => ActivityClass::Active,
            Self::Idle | Self::IdlePhoto => ActivityClass::Idle,
        }
    }

    /// Whether this kind opens a work session.
    ///
    /// Narrower than [`ActivityClass::Active`]: a `non_work_detected` event
    /// keeps the subject in the active state for time accounting but does not
    /// open a session, and closes any session already open.
    #[must_use]
    pub const fn opens_session(&self) -> bool {
        matches!(self, Self::Active | Self::WindowChange)
    }

    /// Whether this kind closes an open work session.
    #[must_use]
    pub const fn closes_session(&self) -> bool {
        matches!(self, Self::Idle | Self::IdlePhoto | Self::NonWorkDetected)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "idle" => Ok(Self::Idle),
            "window_change" => Ok(Self::WindowChange),
            "non_work_detected" => Ok(Self::NonWorkDetected),
            "idle_photo" => Ok(Self::IdlePhoto),
            _ => Err(UnknownEventKind(s.to_string())),
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown event kind strings.
#[derive(Debug, Clone)]
pub struct UnknownEventKind(String);

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event kind: {}", self.0)
    }
}

impl std::error::Error for UnknownEventKind {}

/// The two states a subject can be in between events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityClass {
    Active,
    Idle,
}

/// Best-effort CPU/memory readings attached to a recorded event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub cpu_percent: Option<f32>,
    pub mem_percent: Option<f32>,
}

/// The projection of a stored event consumed by the pure algorithms.
///
/// The segmenter only reads `timestamp` and `kind`; the usage aggregator
/// additionally reads the raw window/process identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySample {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,
}

impl ActivitySample {
    /// Convenience constructor for a sample without window context.
    #[must_use]
    pub const fn bare(timestamp: DateTime<Utc>, kind: EventKind) -> Self {
        Self {
            timestamp,
            kind,
            window_title: None,
            process_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_variants() {
        let variants = [
            EventKind::Active,
            EventKind::Idle,
            EventKind::WindowChange,
            EventKind::NonWorkDetected,
            EventKind::IdlePhoto,
        ];

        for variant in &variants {
            let s = variant.to_string();
            let parsed: EventKind = s.parse().expect("should parse");
            assert_eq!(parsed, *variant, "roundtrip failed for {variant:?}");
        }
    }

    #[test]
    fn unknown_kind_errors() {
        let result: Result<EventKind, _> = "coffee_break".parse();
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "unknown event kind: coffee_break");
    }

    #[test]
    fn classification_matches_kind_sets() {
        assert_eq!(EventKind::Active.class(), ActivityClass::Active);
        assert_eq!(EventKind::WindowChange.class(), ActivityClass::Active);
        assert_eq!(EventKind::NonWorkDetected.class(), ActivityClass::Active);
        assert_eq!(EventKind::Idle.class(), ActivityClass::Idle);
        assert_eq!(EventKind::IdlePhoto.class(), ActivityClass::Idle);
    }

    #[test]
    fn non_work_closes_but_never_opens_sessions() {
        assert!(!EventKind::NonWorkDetected.opens_session());
        assert!(EventKind::NonWorkDetected.closes_session());
        assert!(EventKind::WindowChange.opens_session());
        assert!(EventKind::IdlePhoto.closes_session());
        assert!(!EventKind::Active.closes_session());
    }

    #[test]
    fn kind_serde_uses_snake_case_strings() {
        let json = serde_json::to_string(&EventKind::NonWorkDetected).unwrap();
        assert_eq!(json, "\"non_work_detected\"");
        let parsed: EventKind = serde_json::from_str("\"idle_photo\"").unwrap();
        assert_eq!(parsed, EventKind::IdlePhoto);
    }

    #[test]
    fn kind_serde_rejects_unknown() {
        let result: Result<EventKind, _> = serde_json::from_str("\"screensaver\"");
        assert!(result.is_err());
    }
}
