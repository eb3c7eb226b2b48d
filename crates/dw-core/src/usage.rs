//! Per-application usage aggregation and cross-subject rollups.
//!
//! Applies the same active/idle sweep as the timeline segmenter, but
//! attributes each active interval to the application that opened it. The
//! rollup fold merges per-subject results on the normalized key, which is
//! what lets differently-cased or differently-pathed references to the same
//! application collapse into one line item.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event::{ActivityClass, ActivitySample};
use crate::normalize::{display_label, normalize_key};
use crate::timeline::minutes_between;

/// Minutes attributed to one normalized application key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppUsage {
    pub key: String,
    pub label: String,
    pub minutes: f64,
}

/// The raw identity carried by the event that most recently opened an
/// active period.
#[derive(Debug, Clone)]
struct Identity {
    title: Option<String>,
    process: Option<String>,
}

impl Identity {
    fn of(sample: &ActivitySample) -> Self {
        Self {
            title: sample.window_title.clone(),
            process: sample.process_name.clone(),
        }
    }

    fn is_present(&self) -> bool {
        let non_blank = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());
        non_blank(&self.process) || non_blank(&self.title)
    }

    fn key(&self) -> String {
        normalize_key(self.title.as_deref(), self.process.as_deref())
    }

    fn label(&self) -> String {
        let title = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        display_label(title.or(self.process.as_deref()))
    }
}

/// Aggregates active time per application for one subject.
///
/// Events are sorted by timestamp before the sweep. Active-classified deltas
/// accrue to the key current when the interval opened; an active-class event
/// with a window/process identity replaces the current key, one without
/// keeps it. Idle-class events stop accrual. When `window_end` lies past the
/// last event and the subject ended the window active, the tail is credited
/// to the last-current key.
///
/// The display label for a key is decided on first accrual and kept for the
/// rest of the pass. The result is sorted descending by minutes and filtered
/// to strictly positive durations; an empty stream yields an empty list.
#[must_use]
pub fn aggregate(samples: &[ActivitySample], window_end: Option<DateTime<Utc>>) -> Vec<AppUsage> {
    let mut ordered: Vec<&ActivitySample> = samples.iter().collect();
    ordered.sort_by_key(|sample| sample.timestamp);

    let Some(&first) = ordered.first() else {
        return Vec::new();
    };

    let mut minutes_by_key: HashMap<String, f64> = HashMap::new();
    let mut label_by_key: HashMap<String, String> = HashMap::new();

    let mut current = Identity::of(first);
    let mut current_key = current.key();
    let mut prev_ts = first.timestamp;
    let mut prev_state = ActivityClass::Idle;

    let mut accrue = |key: &str, identity: &Identity, delta: f64| {
        if delta > 0.0 {
            *minutes_by_key.entry(key.to_string()).or_insert(0.0) += delta;
            label_by_key
                .entry(key.to_string())
                .or_insert_with(|| identity.label());
        }
    };

    for sample in ordered {
        let delta = minutes_between(prev_ts, sample.timestamp);
        if prev_state == ActivityClass::Active {
            accrue(&current_key, &current, delta);
        }
        prev_ts = sample.timestamp;
        match sample.kind.class() {
            ActivityClass::Active => {
                prev_state = ActivityClass::Active;
                let identity = Identity::of(sample);
                if identity.is_present() {
                    current = identity;
                    current_key = current.key();
                }
            }
            ActivityClass::Idle => prev_state = ActivityClass::Idle,
        }
    }

    if prev_state == ActivityClass::Active {
        if let Some(end) = window_end {
            accrue(&current_key, &current, minutes_between(prev_ts, end));
        }
    }

    ranked(minutes_by_key, &label_by_key)
}

/// Folds per-subject usage lists into one company-wide ranking.
///
/// Minutes sum on the normalized key; the first-seen display label per key
/// is kept. Output is sorted descending and positive-only, exactly like
/// [`aggregate`].
#[must_use]
pub fn merge_usage<I>(groups: I) -> Vec<AppUsage>
where
    I: IntoIterator<Item = Vec<AppUsage>>,
{
    let mut minutes_by_key: HashMap<String, f64> = HashMap::new();
    let mut label_by_key: HashMap<String, String> = HashMap::new();

    for group in groups {
        for usage in group {
            *minutes_by_key.entry(usage.key.clone()).or_insert(0.0) += usage.minutes;
            label_by_key.entry(usage.key).or_insert(usage.label);
        }
    }

    ranked(minutes_by_key, &label_by_key)
}

/// Sorts descending by minutes (key ascending on ties) and drops
/// non-positive entries.
fn ranked(minutes_by_key: HashMap<String, f64>, label_by_key: &HashMap<String, String>) -> Vec<AppUsage> {
    let mut out: Vec<AppUsage> = minutes_by_key
        .into_iter()
        .filter(|(_, minutes)| *minutes > 0.0)
        .map(|(key, minutes)| {
            let label = label_by_key
                .get(&key)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());
            AppUsage { key, label, minutes }
        })
        .collect();
    out.sort_by(|a, b| {
        b.minutes
            .partial_cmp(&a.minutes)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });
    out
}
