//! Timeline segmentation.
//!
//! Reconstructs continuous active/idle durations from a sparse stream of
//! transition events: each event implicitly extends the previous state until
//! the next event, and the last known state is carried to the query boundary
//! ("tail-closing"). Sessions are derived on demand and never persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event::{ActivityClass, ActivitySample};

/// One contiguous active period bounded by an opening and a closing event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkSession {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_seconds: i64,
}

impl WorkSession {
    fn closed(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            duration_seconds: (end - start).num_seconds(),
        }
    }
}

/// Active/idle totals and reconstructed sessions for one subject and window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimelineSummary {
    pub active_minutes: f64,
    pub idle_minutes: f64,
    pub sessions: Vec<WorkSession>,
}

/// Segments an event stream into active/idle minutes and sessions.
///
/// Events are sorted by timestamp before the sweep regardless of input
/// order. The sweep starts in the idle state at the first event's timestamp,
/// so gaps before the first event are never counted. When `window_end` is
/// given and lies past the last event, the elapsed tail is credited to the
/// last known state, and a still-open session is closed synthetically at the
/// boundary.
///
/// An empty stream yields all-zero totals and no sessions.
#[must_use]
pub fn summarize(samples: &[ActivitySample], window_end: Option<DateTime<Utc>>) -> TimelineSummary {
    let mut ordered: Vec<&ActivitySample> = samples.iter().collect();
    ordered.sort_by_key(|sample| sample.timestamp);

    let Some(first) = ordered.first() else {
        return TimelineSummary::default();
    };

    let mut active_minutes = 0.0;
    let mut idle_minutes = 0.0;
    let mut sessions = Vec::new();
    let mut open_session: Option<DateTime<Utc>> = None;

    let mut prev_ts = first.timestamp;
    let mut prev_state = ActivityClass::Idle;

    for sample in ordered {
        let delta = minutes_between(prev_ts, sample.timestamp);
        match prev_state {
            ActivityClass::Active => active_minutes += delta,
            ActivityClass::Idle => idle_minutes += delta,
        }
        prev_ts = sample.timestamp;
        prev_state = sample.kind.class();

        if sample.kind.opens_session() && open_session.is_none() {
            open_session = Some(sample.timestamp);
        } else if sample.kind.closes_session() {
            if let Some(start) = open_session.take() {
                sessions.push(WorkSession::closed(start, sample.timestamp));
            }
        }
    }

    if let Some(end) = window_end {
        if end > prev_ts {
            let delta = minutes_between(prev_ts, end);
            match prev_state {
                ActivityClass::Active => active_minutes += delta,
                ActivityClass::Idle => idle_minutes += delta,
            }
        }
        // A run still open at the boundary gets a synthetic end there.
        if let Some(start) = open_session.take() {
            if end > start {
                sessions.push(WorkSession::closed(start, end));
            }
        }
    }

    TimelineSummary {
        active_minutes,
        idle_minutes,
        sessions,
    }
}

/// Minutes from `from` to `to`, clamped to zero for regressed timestamps.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let millis = (to - from).num_milliseconds();
    if millis < 0 {
        tracing::warn!(%from, %to, "event timestamp regressed; clamping interval to zero");
        return 0.0;
    }
    millis as f64 / 60_000.0
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::event::EventKind;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    fn sample(offset_min: i64, kind: EventKind, title: &str) -> ActivitySample {
        ActivitySample {
            timestamp: t0() + Duration::minutes(offset_min),
            kind,
            window_title: Some(title.to_string()),
            process_name: None,
        }
    }

    #[test]
    fn empty_stream_yields_zeroes() {
        let summary = summarize(&[], Some(t0() + Duration::minutes(20)));
        assert_eq!(summary.active_minutes, 0.0);
        assert_eq!(summary.idle_minutes, 0.0);
        assert!(summary.sessions.is_empty());
    }

    #[test]
    fn alternating_stream_splits_active_and_idle() {
        // Ends idle, so the tail past the last event accrues as idle.
        let events = [
            sample(0, EventKind::WindowChange, "Chrome"),
            sample(5, EventKind::Idle, "Chrome"),
            sample(5, EventKind::WindowChange, "Word"),
            sample(15, EventKind::IdlePhoto, "Word"),
        ];
        let summary = summarize(&events, Some(t0() + Duration::minutes(20)));

        assert!((summary.active_minutes - 15.0).abs() < 1e-9);
        assert!((summary.idle_minutes - 5.0).abs() < 1e-9);
        assert_eq!(summary.sessions.len(), 2);
        assert_eq!(summary.sessions[0].start, t0());
        assert_eq!(summary.sessions[0].end, t0() + Duration::minutes(5));
        assert_eq!(summary.sessions[0].duration_seconds, 300);
        assert_eq!(summary.sessions[1].start, t0() + Duration::minutes(5));
        assert_eq!(summary.sessions[1].end, t0() + Duration::minutes(15));
    }

    #[test]
    fn tail_closing_credits_open_state_and_session() {
        // Ends active: the tail counts as active time and the open session
        // is closed synthetically at the window boundary.
        let events = [
            sample(0, EventKind::WindowChange, "Chrome"),
            sample(5, EventKind::Idle, "Chrome"),
            sample(5, EventKind::WindowChange, "Word"),
            sample(15, EventKind::WindowChange, "Word"),
        ];
        let summary = summarize(&events, Some(t0() + Duration::minutes(25)));

        assert!((summary.active_minutes - 25.0).abs() < 1e-9);
        assert!((summary.idle_minutes - 0.0).abs() < 1e-9);
        assert_eq!(summary.sessions.len(), 2);
        assert_eq!(summary.sessions[1].start, t0() + Duration::minutes(5));
        assert_eq!(summary.sessions[1].end, t0() + Duration::minutes(25));
    }

    #[test]
    fn non_work_event_counts_active_but_closes_session() {
        let events = [
            sample(0, EventKind::WindowChange, "Editor"),
            sample(10, EventKind::NonWorkDetected, "YouTube"),
            sample(12, EventKind::Idle, "YouTube"),
        ];
        let summary = summarize(&events, None);

        // 0..10 active (session), 10..12 active (non-work, no session).
        assert!((summary.active_minutes - 12.0).abs() < 1e-9);
        assert_eq!(summary.sessions.len(), 1);
        assert_eq!(summary.sessions[0].end, t0() + Duration::minutes(10));
    }

    #[test]
    fn out_of_order_input_matches_sorted_input() {
        let ordered = [
            sample(0, EventKind::WindowChange, "A"),
            sample(3, EventKind::Idle, "A"),
            sample(7, EventKind::Active, "B"),
        ];
        let shuffled = [ordered[2].clone(), ordered[0].clone(), ordered[1].clone()];

        let end = Some(t0() + Duration::minutes(10));
        assert_eq!(summarize(&ordered, end), summarize(&shuffled, end));
    }

    #[test]
    fn totals_conserve_window_from_first_event() {
        let events = [
            sample(2, EventKind::Active, "A"),
            sample(9, EventKind::Idle, "A"),
            sample(13, EventKind::WindowChange, "B"),
            sample(21, EventKind::IdlePhoto, "B"),
        ];
        let end = t0() + Duration::minutes(30);
        let summary = summarize(&events, Some(end));

        // Gaps before the first event are not counted, so the buckets sum to
        // end minus the first event's timestamp.
        let expected = 28.0;
        assert!((summary.active_minutes + summary.idle_minutes - expected).abs() < 1e-9);
    }

    #[test]
    fn first_event_idle_accrues_nothing_before_it() {
        let events = [
            sample(0, EventKind::Idle, "A"),
            sample(4, EventKind::Active, "A"),
        ];
        let summary = summarize(&events, Some(t0() + Duration::minutes(6)));

        assert!((summary.idle_minutes - 4.0).abs() < 1e-9);
        assert!((summary.active_minutes - 2.0).abs() < 1e-9);
        assert_eq!(summary.sessions.len(), 1);
    }

    #[test]
    fn window_end_before_last_event_adds_no_tail() {
        let events = [
            sample(0, EventKind::Active, "A"),
            sample(10, EventKind::Idle, "A"),
        ];
        let summary = summarize(&events, Some(t0() + Duration::minutes(10)));

        assert!((summary.active_minutes - 10.0).abs() < 1e-9);
        assert!((summary.idle_minutes - 0.0).abs() < 1e-9);
    }

    #[test]
    fn consecutive_same_class_events_accrue_correctly() {
        let events = [
            sample(0, EventKind::Active, "A"),
            sample(5, EventKind::Active, "A"),
            sample(9, EventKind::WindowChange, "B"),
            sample(14, EventKind::Idle, "B"),
            sample(20, EventKind::IdlePhoto, "B"),
        ];
        let summary = summarize(&events, None);

        assert!((summary.active_minutes - 14.0).abs() < 1e-9);
        assert!((summary.idle_minutes - 6.0).abs() < 1e-9);
        // One session spanning the whole active run.
        assert_eq!(summary.sessions.len(), 1);
        assert_eq!(summary.sessions[0].start, t0());
        assert_eq!(summary.sessions[0].end, t0() + Duration::minutes(14));
    }
}
