use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

/// Entries kept in the activity log
pub const MAX_LOG_ENTRIES: usize = 50;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

/// Append-only activity log with a fixed capacity
///
/// When full, the oldest entry is evicted. Purely observational: nothing in
/// the evaluation reads it back.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    max_entries: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(MAX_LOG_ENTRIES)
    }
}

impl ActivityLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries),
            max_entries,
        }
    }

    /// Append a message, removing the oldest entries beyond capacity
    pub fn push(&mut self, at: DateTime<Utc>, message: impl Into<String>) {
        self.entries.push_back(LogEntry {
            at,
            message: message.into(),
        });

        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    /// The `n` newest entries, newest first
    pub fn recent(&self, n: usize) -> Vec<&LogEntry> {
        self.entries.iter().rev().take(n).collect()
    }

    /// All entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// State carried across evaluations by the host
///
/// Owned by whoever drives the evaluations and passed in explicitly; two
/// evaluations never share one concurrently.
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    pub log: ActivityLog,
    pub last_update: Option<DateTime<Utc>>,
}

impl AnalysisContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, at: DateTime<Utc>, message: impl Into<String>) {
        self.log.push(at, message);
    }

    pub fn mark_updated(&mut self, at: DateTime<Utc>) {
        self.last_update = Some(at);
    }
}
