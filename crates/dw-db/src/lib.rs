//! Storage layer for the deskwatch activity engine.
//!
//! Provides persistence for subjects, transition events, and movement
//! samples using `rusqlite`. The events table is append-only and is the
//! single durable source of truth; derived views (timelines, app usage)
//! are always recomputed from it.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. For multi-threaded access wrap it in a `Mutex<Database>`;
//! `dw-engine` does exactly that, sharing one writer lock across all write
//! paths. The database itself runs in WAL journal mode so readers on
//! separate connections are never blocked by an in-progress writer and
//! crash recovery replays the log.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in RFC 3339 format (e.g.
//! `2025-01-15T10:30:00.000Z`), so lexicographic ordering matches
//! chronological ordering and range scans can use plain string comparison.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use dw_core::{
    EventKind, Measurements, MovementKind, MovementSample, SubjectId, UnknownEventKind,
};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for row {row_id}: {timestamp}")]
    TimestampParse {
        row_id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored event kind string is not part of the closed kind set.
    #[error("invalid event kind for row {row_id}")]
    InvalidEventKind {
        row_id: i64,
        #[source]
        source: UnknownEventKind,
    },
    /// A stored event row carries an empty subject id.
    #[error("empty subject id for row {row_id}")]
    EmptySubjectId { row_id: i64 },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A transition event ready to be appended to the store.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub subject: SubjectId,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub window_title: Option<String>,
    pub process_name: Option<String>,
    pub measurements: Measurements,
    /// Path to a screenshot or idle photo produced by external capture.
    pub artifact_path: Option<String>,
    pub note: Option<String>,
}

impl NewEvent {
    /// A minimal event with just a subject, timestamp, and kind.
    #[must_use]
    pub const fn bare(subject: SubjectId, timestamp: DateTime<Utc>, kind: EventKind) -> Self {
        Self {
            subject,
            timestamp,
            kind,
            window_title: None,
            process_name: None,
            measurements: Measurements {
                cpu_percent: None,
                mem_percent: None,
            },
            artifact_path: None,
            note: None,
        }
    }
}

/// A stored transition event with its store-assigned id.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    pub id: i64,
    pub subject: SubjectId,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub window_title: Option<String>,
    pub process_name: Option<String>,
    pub measurements: Measurements,
    pub artifact_path: Option<String>,
    pub note: Option<String>,
}

impl StoredEvent {
    /// Projects this event into the form consumed by the pure algorithms.
    #[must_use]
    pub fn sample(&self) -> dw_core::ActivitySample {
        dw_core::ActivitySample {
            timestamp: self.timestamp,
            kind: self.kind,
            window_title: self.window_title.clone(),
            process_name: self.process_name.clone(),
        }
    }
}

/// A registered subject.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SubjectRecord {
    pub id: SubjectId,
    pub name: Option<String>,
    pub team: Option<String>,
}

/// Movement totals for a time range.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct MovementStats {
    pub keys_pressed: i64,
    pub clicks: i64,
    pub mouse_distance_px: f64,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is initialized on first open and the connection is put in
    /// WAL journal mode so concurrent readers are never blocked by writes.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection
    /// closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes pragmas and the schema.
    ///
    /// Idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS subjects (
                id TEXT PRIMARY KEY,
                name TEXT,
                team TEXT
            );

            -- Events table: append-only log of transition events.
            -- timestamp: RFC 3339 text; ordering for aggregation is by
            -- timestamp, not id.
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                kind TEXT NOT NULL,
                window_title TEXT,
                process_name TEXT,
                cpu_percent REAL,
                mem_percent REAL,
                artifact_path TEXT,
                note TEXT,
                FOREIGN KEY (subject_id) REFERENCES subjects(id)
            );

            CREATE INDEX IF NOT EXISTS idx_events_subject_ts ON events(subject_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_events_kind ON events(kind);

            CREATE TABLE IF NOT EXISTS movement_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                kind TEXT NOT NULL,
                detail TEXT,
                distance_px REAL DEFAULT 0,
                FOREIGN KEY (subject_id) REFERENCES subjects(id)
            );

            CREATE INDEX IF NOT EXISTS idx_movement_subject_ts ON movement_samples(subject_id, timestamp);
            ",
        )?;
        Ok(())
    }

    /// Registers a subject, keeping already-set fields on conflict.
    pub fn upsert_subject(
        &mut self,
        subject: &SubjectId,
        name: Option<&str>,
        team: Option<&str>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO subjects (id, name, team)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = COALESCE(excluded.name, subjects.name),
                team = COALESCE(excluded.team, subjects.team)
            ",
            params![subject.as_str(), name, team],
        )?;
        Ok(())
    }

    /// Lists subjects ordered by id.
    pub fn list_subjects(&self) -> Result<Vec<SubjectRecord>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, team FROM subjects ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;
        let mut subjects = Vec::new();
        for row in rows {
            let (id, name, team) = row?;
            // Ids were validated on insert; an empty id cannot round-trip.
            if let Ok(id) = SubjectId::new(id) {
                subjects.push(SubjectRecord { id, name, team });
            }
        }
        Ok(subjects)
    }

    /// Deletes a subject and all of its events and movement samples.
    pub fn delete_subject(&mut self, subject: &SubjectId) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM events WHERE subject_id = ?",
            [subject.as_str()],
        )?;
        tx.execute(
            "DELETE FROM movement_samples WHERE subject_id = ?",
            [subject.as_str()],
        )?;
        tx.execute("DELETE FROM subjects WHERE id = ?", [subject.as_str()])?;
        tx.commit()?;
        Ok(())
    }

    /// Appends one event and returns its store-assigned id.
    pub fn insert_event(&mut self, event: &NewEvent) -> Result<i64, DbError> {
        self.conn.execute(
            "
            INSERT INTO events (
                subject_id, timestamp, kind, window_title, process_name,
                cpu_percent, mem_percent, artifact_path, note
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                event.subject.as_str(),
                format_timestamp(event.timestamp),
                event.kind.as_str(),
                event.window_title,
                event.process_name,
                event.measurements.cpu_percent.map(f64::from),
                event.measurements.mem_percent.map(f64::from),
                event.artifact_path,
                event.note,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Lists a subject's events within `[start, end)`, ordered by timestamp
    /// then id.
    pub fn events_in_range(
        &self,
        subject: &SubjectId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StoredEvent>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT id, subject_id, timestamp, kind, window_title, process_name,
                   cpu_percent, mem_percent, artifact_path, note
            FROM events
            WHERE subject_id = ? AND timestamp >= ? AND timestamp < ?
            ORDER BY timestamp ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![
                subject.as_str(),
                format_timestamp(start),
                format_timestamp(end)
            ],
            event_row,
        )?;
        let mut events = Vec::new();
        for row in rows {
            events.push(stored_event(row?)?);
        }
        Ok(events)
    }

    /// Returns a subject's most recent event, if any.
    pub fn latest_event(&self, subject: &SubjectId) -> Result<Option<StoredEvent>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, subject_id, timestamp, kind, window_title, process_name,
                       cpu_percent, mem_percent, artifact_path, note
                FROM events
                WHERE subject_id = ?
                ORDER BY timestamp DESC, id DESC
                LIMIT 1
                ",
                [subject.as_str()],
                event_row,
            )
            .optional()?;
        row.map(stored_event).transpose()
    }

    /// Inserts a batch of movement samples in one transaction.
    ///
    /// Returns the number of rows written. An empty batch is a no-op.
    pub fn insert_movement_samples(
        &mut self,
        subject: &SubjectId,
        samples: &[MovementSample],
    ) -> Result<usize, DbError> {
        if samples.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO movement_samples (subject_id, timestamp, kind, detail, distance_px)
                VALUES (?, ?, ?, ?, ?)
                ",
            )?;
            for sample in samples {
                stmt.execute(params![
                    subject.as_str(),
                    format_timestamp(sample.timestamp),
                    sample.kind.as_str(),
                    sample.detail,
                    sample.distance_px,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(rows = samples.len(), subject = %subject, "movement batch committed");
        Ok(samples.len())
    }

    /// Movement totals across all subjects within `[start, end)`.
    pub fn movement_stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<MovementStats, DbError> {
        let start = format_timestamp(start);
        let end = format_timestamp(end);
        let keys_pressed = self.conn.query_row(
            "SELECT COUNT(*) FROM movement_samples WHERE timestamp >= ? AND timestamp < ? AND kind = ?",
            params![start, end, MovementKind::KeyPress.as_str()],
            |row| row.get(0),
        )?;
        let clicks = self.conn.query_row(
            "SELECT COUNT(*) FROM movement_samples WHERE timestamp >= ? AND timestamp < ? AND kind = ?",
            params![start, end, MovementKind::MouseClick.as_str()],
            |row| row.get(0),
        )?;
        let mouse_distance_px = self.conn.query_row(
            "SELECT COALESCE(SUM(distance_px), 0) FROM movement_samples WHERE timestamp >= ? AND timestamp < ? AND kind = ?",
            params![start, end, MovementKind::MouseMove.as_str()],
            |row| row.get(0),
        )?;
        Ok(MovementStats {
            keys_pressed,
            clicks,
            mouse_distance_px,
        })
    }

    /// Deletes a subject's events and movement samples within `[start, end)`.
    pub fn clear_subject_range(
        &mut self,
        subject: &SubjectId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let start = format_timestamp(start);
        let end = format_timestamp(end);
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM events WHERE subject_id = ? AND timestamp >= ? AND timestamp < ?",
            params![subject.as_str(), start, end],
        )?;
        tx.execute(
            "DELETE FROM movement_samples WHERE subject_id = ? AND timestamp >= ? AND timestamp < ?",
            params![subject.as_str(), start, end],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Total number of stored events.
    pub fn event_count(&self) -> Result<i64, DbError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?)
    }

    /// Total number of stored movement samples.
    pub fn movement_count(&self) -> Result<i64, DbError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM movement_samples", [], |row| {
                row.get(0)
            })?)
    }
}

/// Raw event row before timestamp/kind parsing.
type EventRow = (
    i64,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<f64>,
    Option<f64>,
    Option<String>,
    Option<String>,
);

fn event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

#[allow(clippy::cast_possible_truncation)]
fn stored_event(row: EventRow) -> Result<StoredEvent, DbError> {
    let (id, subject, timestamp, kind, window_title, process_name, cpu, mem, artifact_path, note) =
        row;
    let timestamp = parse_timestamp(&timestamp, id)?;
    let kind: EventKind = kind
        .parse()
        .map_err(|source| DbError::InvalidEventKind { row_id: id, source })?;
    // Subject ids are validated on the write path.
    let subject = SubjectId::new(subject).map_err(|_| DbError::EmptySubjectId { row_id: id })?;
    Ok(StoredEvent {
        id,
        subject,
        timestamp,
        kind,
        window_title,
        process_name,
        measurements: Measurements {
            cpu_percent: cpu.map(|v| v as f32),
            mem_percent: mem.map(|v| v as f32),
        },
        artifact_path,
        note,
    })
}

fn parse_timestamp(timestamp: &str, row_id: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            row_id,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
