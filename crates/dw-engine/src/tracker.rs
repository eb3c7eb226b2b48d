//! The query and ingestion facade consumed by dashboards, reports, and the
//! CLI.
//!
//! Every aggregation recomputes from the event store; no derived state is
//! cached, so a read has no side effects and two identical reads return
//! identical results. Writes from all call sites serialize on one shared
//! lock; reads for different subjects touch disjoint rows and are combined
//! in parallel for the company rollup.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

use dw_core::{
    ActivityClass, ActivitySample, AppUsage, EventKind, Measurements, SubjectId, TimelineSummary,
    aggregate, merge_usage, summarize,
};
use dw_db::{Database, MovementStats, NewEvent, StoredEvent, SubjectRecord};

use crate::traits::{Clock, SystemClock};
use crate::{EngineError, MovementBuffer, SharedDb, lock};

/// UTC day boundaries `[midnight, next midnight)` for a calendar date.
#[must_use]
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    (start, start + chrono::Duration::days(1))
}

/// Optional fields attached to a recorded event.
#[derive(Debug, Clone, Default)]
pub struct EventDetails {
    pub window_title: Option<String>,
    pub process_name: Option<String>,
    pub measurements: Measurements,
    pub artifact_path: Option<String>,
    pub note: Option<String>,
}

/// A subject's most recent known state.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectStatus {
    pub subject: SubjectId,
    pub name: Option<String>,
    pub team: Option<String>,
    /// `None` when the subject has no events yet.
    pub state: Option<ActivityClass>,
    pub last_activity: Option<DateTime<Utc>>,
    pub current_app: Option<String>,
}

/// Active minutes for one subject over a range, for rankings.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectActivity {
    pub subject: SubjectId,
    pub active_minutes: f64,
}

/// Shared handle to the engine.
///
/// Cheap to clone; all clones share the same store lock and clock.
#[derive(Clone)]
pub struct Tracker {
    store: SharedDb,
    clock: Arc<dyn Clock>,
}

impl Tracker {
    /// Wraps a database with the system clock.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    /// Wraps a database with an injected clock (used by tests and the
    /// monitor).
    #[must_use]
    pub fn with_clock(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(Mutex::new(db)),
            clock,
        }
    }

    pub(crate) fn store(&self) -> SharedDb {
        Arc::clone(&self.store)
    }

    pub(crate) fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Creates a movement buffer for one subject, sharing this tracker's
    /// store lock.
    #[must_use]
    pub fn movement_buffer(&self, subject: SubjectId, threshold: usize) -> MovementBuffer {
        MovementBuffer::new(self.store(), subject, threshold)
    }

    /// Registers a subject, keeping already-set fields.
    pub fn ensure_subject(
        &self,
        subject: &SubjectId,
        name: Option<&str>,
        team: Option<&str>,
    ) -> Result<(), EngineError> {
        lock(&self.store).upsert_subject(subject, name, team)?;
        Ok(())
    }

    /// Lists registered subjects.
    pub fn subjects(&self) -> Result<Vec<SubjectRecord>, EngineError> {
        Ok(lock(&self.store).list_subjects()?)
    }

    /// Deletes a subject and everything recorded for it.
    pub fn remove_subject(&self, subject: &SubjectId) -> Result<(), EngineError> {
        lock(&self.store).delete_subject(subject)?;
        Ok(())
    }

    /// Appends one transition event, timestamped by the injected clock, and
    /// returns the store-assigned event id.
    pub fn record_event(
        &self,
        subject: &SubjectId,
        kind: EventKind,
        details: EventDetails,
    ) -> Result<i64, EngineError> {
        let event = NewEvent {
            subject: subject.clone(),
            timestamp: self.clock.now(),
            kind,
            window_title: details.window_title,
            process_name: details.process_name,
            measurements: details.measurements,
            artifact_path: details.artifact_path,
            note: details.note,
        };
        let id = lock(&self.store).insert_event(&event)?;
        tracing::debug!(event_id = id, subject = %subject, kind = %kind, "event recorded");
        Ok(id)
    }

    /// Active/idle totals and sessions for one subject over `[start, end)`.
    ///
    /// The tail past the last event is closed at `end`, so for a window
    /// covering at least one event the two buckets sum to the span from the
    /// first event to `end`.
    pub fn get_timeline(
        &self,
        subject: &SubjectId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<TimelineSummary, EngineError> {
        let samples = self.subject_samples(subject, start, end)?;
        Ok(summarize(&samples, Some(end)))
    }

    /// Ranked per-application minutes for one subject and day.
    ///
    /// The tail is closed at `min(now, day end)`, crediting a
    /// still-active subject up to the moment of the query.
    pub fn get_app_usage(
        &self,
        subject: &SubjectId,
        day: NaiveDate,
    ) -> Result<Vec<AppUsage>, EngineError> {
        let (start, end) = day_bounds(day);
        let cap = self.clock.now().min(end);
        let samples = self.subject_samples(subject, start, end)?;
        Ok(aggregate(&samples, Some(cap)))
    }

    /// Company-wide per-application minutes for a day, merged across all
    /// subjects by normalized key.
    pub fn get_company_app_usage(&self, day: NaiveDate) -> Result<Vec<AppUsage>, EngineError> {
        let (start, end) = day_bounds(day);
        let cap = self.clock.now().min(end);
        let per_subject = self.samples_per_subject(start, end)?;

        let usages: Vec<Vec<AppUsage>> = per_subject
            .into_par_iter()
            .map(|(_, samples)| aggregate(&samples, Some(cap)))
            .collect();
        Ok(merge_usage(usages))
    }

    /// A subject's last known state, from its most recent event.
    pub fn subject_status(&self, record: &SubjectRecord) -> Result<SubjectStatus, EngineError> {
        let latest = lock(&self.store).latest_event(&record.id)?;
        Ok(status_from_latest(record, latest))
    }

    /// Last known state for every registered subject.
    pub fn all_subject_statuses(&self) -> Result<Vec<SubjectStatus>, EngineError> {
        let db = lock(&self.store);
        let mut statuses = Vec::new();
        for record in db.list_subjects()? {
            let latest = db.latest_event(&record.id)?;
            statuses.push(status_from_latest(&record, latest));
        }
        Ok(statuses)
    }

    /// Subjects ranked descending by active minutes over `[start, end)`.
    pub fn rank_subjects(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SubjectActivity>, EngineError> {
        let per_subject = self.samples_per_subject(start, end)?;

        let mut ranked: Vec<SubjectActivity> = per_subject
            .into_par_iter()
            .map(|(record, samples)| SubjectActivity {
                subject: record.id,
                active_minutes: summarize(&samples, Some(end)).active_minutes,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.active_minutes
                .partial_cmp(&a.active_minutes)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.subject.cmp(&b.subject))
        });
        Ok(ranked)
    }

    /// Movement totals across all subjects for a day.
    pub fn movement_stats(&self, day: NaiveDate) -> Result<MovementStats, EngineError> {
        let (start, end) = day_bounds(day);
        Ok(lock(&self.store).movement_stats(start, end)?)
    }

    /// Deletes one subject's events and movement samples for a day.
    pub fn clear_day(&self, subject: &SubjectId, day: NaiveDate) -> Result<(), EngineError> {
        let (start, end) = day_bounds(day);
        lock(&self.store).clear_subject_range(subject, start, end)?;
        Ok(())
    }

    fn subject_samples(
        &self,
        subject: &SubjectId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActivitySample>, EngineError> {
        let events = lock(&self.store).events_in_range(subject, start, end)?;
        Ok(events.iter().map(StoredEvent::sample).collect())
    }

    /// Fetches each subject's samples serially under the store lock; the
    /// per-subject aggregation itself runs in parallel at the call sites.
    fn samples_per_subject(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<(SubjectRecord, Vec<ActivitySample>)>, EngineError> {
        let db = lock(&self.store);
        let mut out = Vec::new();
        for record in db.list_subjects()? {
            let events = db.events_in_range(&record.id, start, end)?;
            let samples = events.iter().map(StoredEvent::sample).collect();
            out.push((record, samples));
        }
        Ok(out)
    }
}

fn status_from_latest(record: &SubjectRecord, latest: Option<StoredEvent>) -> SubjectStatus {
    let state = latest.as_ref().map(|event| event.kind.class());
    let last_activity = latest.as_ref().map(|event| event.timestamp);
    let current_app = latest.as_ref().map(|event| {
        dw_core::normalize::display_label(
            event
                .window_title
                .as_deref()
                .or(event.process_name.as_deref()),
        )
    });
    SubjectStatus {
        subject: record.id.clone(),
        name: record.name.clone(),
        team: record.team.clone(),
        state,
        last_activity,
        current_app,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use chrono::{Duration, TimeZone};
    use dw_core::EventKind;

    use super::*;

    struct FakeClock(StdMutex<DateTime<Utc>>);

    impl FakeClock {
        fn at(start: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(StdMutex::new(start)))
        }

        fn set(&self, now: DateTime<Utc>) {
            *lock(&self.0) = now;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> DateTime<Utc> {
            *lock(&self.0)
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    fn tracker_at(now: DateTime<Utc>) -> (Tracker, Arc<FakeClock>) {
        let clock = FakeClock::at(now);
        let db = Database::open_in_memory().expect("open in-memory db");
        let tracker = Tracker::with_clock(db, Arc::clone(&clock) as Arc<dyn Clock>);
        (tracker, clock)
    }

    fn window_change(title: &str) -> EventDetails {
        EventDetails {
            window_title: Some(title.to_string()),
            ..EventDetails::default()
        }
    }

    fn record_stream(tracker: &Tracker, clock: &FakeClock, subject: &SubjectId) {
        clock.set(t0());
        tracker
            .record_event(subject, EventKind::WindowChange, window_change("Chrome"))
            .unwrap();
        clock.set(t0() + Duration::minutes(5));
        tracker
            .record_event(subject, EventKind::Idle, EventDetails::default())
            .unwrap();
        clock.set(t0() + Duration::minutes(5));
        tracker
            .record_event(subject, EventKind::WindowChange, window_change("Word"))
            .unwrap();
        clock.set(t0() + Duration::minutes(15));
        tracker
            .record_event(subject, EventKind::IdlePhoto, EventDetails::default())
            .unwrap();
    }

    #[test]
    fn record_and_timeline_roundtrip() {
        let (tracker, clock) = tracker_at(t0());
        let emp = SubjectId::new("emp-001").unwrap();
        tracker.ensure_subject(&emp, Some("Dana"), None).unwrap();
        record_stream(&tracker, &clock, &emp);

        let timeline = tracker
            .get_timeline(&emp, t0(), t0() + Duration::minutes(20))
            .unwrap();
        assert!((timeline.active_minutes - 15.0).abs() < 1e-9);
        assert!((timeline.idle_minutes - 5.0).abs() < 1e-9);
        assert_eq!(timeline.sessions.len(), 2);
    }

    #[test]
    fn timeline_on_empty_window_is_all_zero() {
        let (tracker, _clock) = tracker_at(t0());
        let emp = SubjectId::new("emp-001").unwrap();
        tracker.ensure_subject(&emp, None, None).unwrap();

        let timeline = tracker
            .get_timeline(&emp, t0(), t0() + Duration::hours(1))
            .unwrap();
        assert_eq!(timeline, TimelineSummary::default());
    }

    #[test]
    fn app_usage_caps_the_tail_at_now() {
        let (tracker, clock) = tracker_at(t0());
        let emp = SubjectId::new("emp-001").unwrap();
        tracker.ensure_subject(&emp, None, None).unwrap();

        clock.set(t0());
        tracker
            .record_event(&emp, EventKind::WindowChange, window_change("Chrome"))
            .unwrap();

        // Still active at query time: credit runs up to "now", not day end.
        clock.set(t0() + Duration::minutes(8));
        let usage = tracker.get_app_usage(&emp, t0().date_naive()).unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].key, "chrome");
        assert!((usage[0].minutes - 8.0).abs() < 1e-9);
    }

    #[test]
    fn app_usage_reads_are_idempotent() {
        let (tracker, clock) = tracker_at(t0());
        let emp = SubjectId::new("emp-001").unwrap();
        tracker.ensure_subject(&emp, None, None).unwrap();
        record_stream(&tracker, &clock, &emp);

        clock.set(t0() + Duration::minutes(30));
        let first = tracker.get_app_usage(&emp, t0().date_naive()).unwrap();
        let second = tracker.get_app_usage(&emp, t0().date_naive()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].key, "word");
        assert!((first[0].minutes - 10.0).abs() < 1e-9);
        assert!((first[1].minutes - 5.0).abs() < 1e-9);
    }

    #[test]
    fn company_usage_merges_subjects_on_key() {
        let (tracker, clock) = tracker_at(t0());
        let a = SubjectId::new("emp-001").unwrap();
        let b = SubjectId::new("emp-002").unwrap();
        tracker.ensure_subject(&a, None, None).unwrap();
        tracker.ensure_subject(&b, None, None).unwrap();

        clock.set(t0());
        tracker
            .record_event(&a, EventKind::WindowChange, window_change("Chrome"))
            .unwrap();
        tracker
            .record_event(
                &b,
                EventKind::WindowChange,
                EventDetails {
                    process_name: Some("chrome.exe".to_string()),
                    ..EventDetails::default()
                },
            )
            .unwrap();
        clock.set(t0() + Duration::minutes(10));
        tracker
            .record_event(&a, EventKind::Idle, EventDetails::default())
            .unwrap();
        clock.set(t0() + Duration::minutes(5));
        // Out-of-order wall clock across subjects is fine; each subject's
        // stream is independent.
        tracker
            .record_event(&b, EventKind::Idle, EventDetails::default())
            .unwrap();

        clock.set(t0() + Duration::hours(1));
        let company = tracker.get_company_app_usage(t0().date_naive()).unwrap();
        assert_eq!(company.len(), 1);
        assert_eq!(company[0].key, "chrome");
        assert!((company[0].minutes - 15.0).abs() < 1e-9);
    }

    #[test]
    fn rank_subjects_orders_by_active_minutes() {
        let (tracker, clock) = tracker_at(t0());
        let a = SubjectId::new("emp-001").unwrap();
        let b = SubjectId::new("emp-002").unwrap();
        tracker.ensure_subject(&a, None, None).unwrap();
        tracker.ensure_subject(&b, None, None).unwrap();

        clock.set(t0());
        tracker
            .record_event(&a, EventKind::Active, EventDetails::default())
            .unwrap();
        tracker
            .record_event(&b, EventKind::Active, EventDetails::default())
            .unwrap();
        clock.set(t0() + Duration::minutes(10));
        tracker
            .record_event(&a, EventKind::Idle, EventDetails::default())
            .unwrap();
        clock.set(t0() + Duration::minutes(4));
        tracker
            .record_event(&b, EventKind::Idle, EventDetails::default())
            .unwrap();

        let ranked = tracker
            .rank_subjects(t0(), t0() + Duration::minutes(20))
            .unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].subject.as_str(), "emp-001");
        assert!((ranked[0].active_minutes - 10.0).abs() < 1e-9);
        assert!((ranked[1].active_minutes - 4.0).abs() < 1e-9);
    }

    #[test]
    fn status_reflects_latest_event() {
        let (tracker, clock) = tracker_at(t0());
        let emp = SubjectId::new("emp-001").unwrap();
        tracker.ensure_subject(&emp, Some("Dana"), None).unwrap();

        let statuses = tracker.all_subject_statuses().unwrap();
        assert_eq!(statuses.len(), 1);
        assert!(statuses[0].state.is_none());

        clock.set(t0());
        tracker
            .record_event(&emp, EventKind::WindowChange, window_change("Chrome"))
            .unwrap();
        clock.set(t0() + Duration::minutes(3));
        tracker
            .record_event(&emp, EventKind::Idle, EventDetails::default())
            .unwrap();

        let statuses = tracker.all_subject_statuses().unwrap();
        assert_eq!(statuses[0].state, Some(ActivityClass::Idle));
        assert_eq!(
            statuses[0].last_activity,
            Some(t0() + Duration::minutes(3))
        );
    }

    #[test]
    fn clear_day_removes_only_that_day() {
        let (tracker, clock) = tracker_at(t0());
        let emp = SubjectId::new("emp-001").unwrap();
        tracker.ensure_subject(&emp, None, None).unwrap();

        clock.set(t0());
        tracker
            .record_event(&emp, EventKind::Active, EventDetails::default())
            .unwrap();
        clock.set(t0() + Duration::days(1));
        tracker
            .record_event(&emp, EventKind::Active, EventDetails::default())
            .unwrap();

        tracker.clear_day(&emp, t0().date_naive()).unwrap();

        let next_day = (t0() + Duration::days(1)).date_naive();
        let (start, end) = day_bounds(next_day);
        let timeline = tracker.get_timeline(&emp, start, end).unwrap();
        assert_eq!(timeline.sessions.len(), 1);
    }
}
