//! Sequential checkpoint profiler
//!
//! One profiler belongs to one request. A session runs from `start()` to
//! `end()`; each `add()` records the time since the previous checkpoint and
//! moves the checkpoint forward. `end()` also accounts for the time spent
//! before the session began (measured from the profiler's origin, normally
//! process or request start) as a synthetic "Starting Autoloader" entry.
//!
//! Every method has an `_at(now)` variant taking an explicit instant.

use serde::Serialize;
use std::time::Instant;

use crate::timing::{elapsed_between, Elapsed};

/// Kind used when a checkpoint does not name one.
pub const DEFAULT_KIND: &str = "others";

/// Name of the synthetic entry covering the time before the session.
pub const AUTOLOADER_ENTRY: &str = "Starting Autoloader";

/// Kind of the synthetic entry.
pub const SYSTEM_KIND: &str = "system";

pub const UNIT_MS: &str = "ms";

/// A single named interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileEntry {
    pub name: String,
    #[serde(rename = "time")]
    pub elapsed_ms: f64,
    pub unit: &'static str,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ProfileEntry {
    fn new(name: impl Into<String>, elapsed: Elapsed, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elapsed_ms: elapsed.as_millis(),
            unit: UNIT_MS,
            kind: kind.into(),
        }
    }
}

/// Result of ending a profiling session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileReport {
    #[serde(rename = "Total Time")]
    pub total_time_ms: f64,
    pub unit: &'static str,
    pub profiles: Vec<ProfileEntry>,
}

impl ProfileReport {
    /// Sum of all entry times, in milliseconds.
    pub fn entries_total_ms(&self) -> f64 {
        self.profiles.iter().map(|p| p.elapsed_ms).sum()
    }
}

#[derive(Debug, Clone)]
pub struct Profiler {
    origin: Instant,
    entries: Vec<ProfileEntry>,
    last_checkpoint: Option<Instant>,
    session_start: Option<Instant>,
}

impl Profiler {
    /// Create an idle profiler. `origin` is the permanent start the
    /// autoloader entry is measured from.
    pub fn new(origin: Instant) -> Self {
        Self {
            origin,
            entries: Vec::new(),
            last_checkpoint: None,
            session_start: None,
        }
    }

    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// True between `start()` and `end()`.
    pub fn is_active(&self) -> bool {
        self.session_start.is_some()
    }

    pub fn session_start(&self) -> Option<Instant> {
        self.session_start
    }

    pub fn last_checkpoint(&self) -> Option<Instant> {
        self.last_checkpoint
    }

    /// Entries recorded so far in the current session.
    pub fn entries(&self) -> &[ProfileEntry] {
        &self.entries
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    /// Begin a session if none is active, and reset the checkpoint either way.
    pub fn start_at(&mut self, now: Instant) {
        if self.session_start.is_none() {
            self.session_start = Some(now);
        }
        self.last_checkpoint = Some(now);
    }

    pub fn add(&mut self, name: &str, kind: &str) -> ProfileEntry {
        self.add_at(name, kind, Instant::now())
    }

    /// Record the interval since the last checkpoint. Without a checkpoint
    /// the interval is measured from the origin.
    pub fn add_at(&mut self, name: &str, kind: &str, now: Instant) -> ProfileEntry {
        let since = self.last_checkpoint.unwrap_or(self.origin);
        let entry = ProfileEntry::new(name, elapsed_between(since, now), kind);
        log::debug!("profile {} [{}]: {} ms", entry.name, entry.kind, entry.elapsed_ms);
        self.entries.push(entry.clone());
        self.last_checkpoint = Some(now);
        entry
    }

    pub fn end(&mut self) -> ProfileReport {
        self.end_at(Instant::now())
    }

    /// Close the session and hand the recorded entries to the caller,
    /// preceded by the autoloader entry.
    pub fn end_at(&mut self, now: Instant) -> ProfileReport {
        let total = elapsed_between(self.origin, now);
        let session = self
            .session_start
            .map_or(Elapsed::ZERO, |start| elapsed_between(start, now));

        let mut profiles = Vec::with_capacity(self.entries.len() + 1);
        profiles.push(ProfileEntry::new(
            AUTOLOADER_ENTRY,
            total.saturating_sub(session),
            SYSTEM_KIND,
        ));
        profiles.append(&mut self.entries);

        self.session_start = None;
        self.last_checkpoint = None;

        ProfileReport {
            total_time_ms: total.as_millis(),
            unit: UNIT_MS,
            profiles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn start_add_add_end_yields_three_entries() {
        let origin = Instant::now();
        let mut p = Profiler::new(origin);
        p.start_at(origin + ms(10));
        let a = p.add_at("A", DEFAULT_KIND, origin + ms(15));
        let b = p.add_at("B", "db", origin + ms(22));
        let report = p.end_at(origin + ms(30));

        assert_eq!(a.elapsed_ms, 5.0);
        assert_eq!(b.elapsed_ms, 7.0);
        assert_eq!(b.kind, "db");

        assert_eq!(report.profiles.len(), 3);
        assert_eq!(report.profiles[0].name, AUTOLOADER_ENTRY);
        assert_eq!(report.profiles[0].kind, SYSTEM_KIND);
        assert_eq!(report.profiles[0].elapsed_ms, 10.0);
        assert_eq!(report.profiles[1].name, "A");
        assert_eq!(report.profiles[2].name, "B");
        assert_eq!(report.total_time_ms, 30.0);
        assert_eq!(report.unit, "ms");
        assert!(report.total_time_ms >= report.entries_total_ms());
    }

    #[test]
    fn second_start_keeps_session_but_resets_checkpoint() {
        let origin = Instant::now();
        let mut p = Profiler::new(origin);
        p.start_at(origin + ms(1));
        p.start_at(origin + ms(4));

        assert_eq!(p.session_start(), Some(origin + ms(1)));
        assert_eq!(p.last_checkpoint(), Some(origin + ms(4)));

        let entry = p.add_at("after restart", DEFAULT_KIND, origin + ms(6));
        assert_eq!(entry.elapsed_ms, 2.0);
    }

    #[test]
    fn end_resets_state_and_drains_entries() {
        let origin = Instant::now();
        let mut p = Profiler::new(origin);
        p.start_at(origin);
        p.add_at("x", DEFAULT_KIND, origin + ms(1));
        let _ = p.end_at(origin + ms(2));

        assert!(!p.is_active());
        assert!(p.last_checkpoint().is_none());
        assert!(p.entries().is_empty());

        p.start_at(origin + ms(5));
        assert_eq!(p.session_start(), Some(origin + ms(5)));
    }

    #[test]
    fn end_without_session_counts_everything_as_autoloader() {
        let origin = Instant::now();
        let mut p = Profiler::new(origin);
        let report = p.end_at(origin + ms(3));
        assert_eq!(report.profiles.len(), 1);
        assert_eq!(report.profiles[0].elapsed_ms, 3.0);
    }

    #[test]
    fn add_before_start_measures_from_origin() {
        let origin = Instant::now();
        let mut p = Profiler::new(origin);
        let entry = p.add_at("early", DEFAULT_KIND, origin + ms(8));
        assert_eq!(entry.elapsed_ms, 8.0);
    }

    #[test]
    fn sub_tick_intervals_never_push_entries_past_total() {
        let origin = Instant::now();
        let mut p = Profiler::new(origin);
        let t0 = origin + Duration::from_nanos(3_333);
        p.start_at(t0);
        p.add_at("a", DEFAULT_KIND, t0 + Duration::from_nanos(19_999));
        p.add_at("b", DEFAULT_KIND, t0 + Duration::from_nanos(39_998));
        let report = p.end_at(t0 + Duration::from_nanos(40_001));
        assert!(report.total_time_ms >= report.entries_total_ms());
    }

    #[test]
    fn report_serializes_with_wire_field_names() {
        let origin = Instant::now();
        let mut p = Profiler::new(origin);
        p.start_at(origin);
        p.add_at("q", "sql", origin + ms(1));
        let json = serde_json::to_value(p.end_at(origin + ms(1))).unwrap();
        assert_eq!(json["unit"], "ms");
        assert_eq!(json["Total Time"], 1.0);
        assert_eq!(json["profiles"][1]["type"], "sql");
        assert_eq!(json["profiles"][1]["time"], 1.0);
    }
}
