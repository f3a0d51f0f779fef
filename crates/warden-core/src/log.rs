//! In-memory event log shared by the terminal and web front ends.
//!
//! The log is append-mostly: streaming token accumulation mutates the most
//! recent entry in place instead of appending one entry per token. Readers
//! detect both cases through the `version` counter, which increases on every
//! append and every in-place mutation. The `guid` is generated once per
//! process so a remote client can tell a restart apart from ordinary
//! progress.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

/// Category of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A message typed or sent by the human.
    User,
    /// Agent output, including streamed partial responses.
    Agent,
    /// Framework notices (interventions, lifecycle).
    System,
    /// Tool invocations and their results.
    Tool,
    /// Failures surfaced to the operator.
    Error,
}

/// A single entry in the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Zero-based position, assigned at append and never reassigned.
    pub sequence: u64,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub heading: String,
    pub content: String,
}

/// Result of a [`EventLog::get_range`] call: the requested tail of the log
/// plus the metadata a poller needs to interpret it.
#[derive(Debug, Clone)]
pub struct LogSlice {
    pub entries: Vec<LogEntry>,
    pub version: u64,
    pub guid: String,
}

#[derive(Debug, Default)]
struct LogInner {
    entries: Vec<LogEntry>,
    version: u64,
}

/// Process-lifetime event log.
///
/// All methods take `&self`; interior mutability keeps the critical sections
/// short (no I/O under the lock). Concurrent readers may observe entries
/// appearing or changing between calls; `sequence` order is the only
/// ordering guarantee.
#[derive(Debug)]
pub struct EventLog {
    guid: String,
    inner: Mutex<LogInner>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            guid: Uuid::new_v4().to_string(),
            inner: Mutex::new(LogInner::default()),
        }
    }

    /// Returns the process-instance identifier. Stable for the lifetime of
    /// this log; a different value signals a restart to remote clients.
    pub fn guid(&self) -> &str {
        &self.guid
    }

    /// Current mutation counter.
    pub fn version(&self) -> u64 {
        self.inner.lock().unwrap().version
    }

    /// Number of appended entries.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a new entry and returns its assigned sequence number.
    pub fn append(
        &self,
        kind: EntryKind,
        heading: impl Into<String>,
        content: impl Into<String>,
    ) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        let sequence = inner.entries.len() as u64;
        inner.entries.push(LogEntry {
            sequence,
            kind,
            heading: heading.into(),
            content: content.into(),
        });
        inner.version += 1;
        tracing::trace!(sequence, ?kind, "log entry appended");
        sequence
    }

    /// Returns all entries at or after `from` in append order.
    ///
    /// Negative cursors clamp to zero. A cursor past the end yields an empty
    /// slice rather than an error: the caller is merely ahead of us.
    pub fn get_range(&self, from: i64) -> LogSlice {
        let inner = self.inner.lock().unwrap();
        let start = usize::try_from(from.max(0)).unwrap_or(usize::MAX);
        let start = start.min(inner.entries.len());
        LogSlice {
            entries: inner.entries[start..].to_vec(),
            version: inner.version,
            guid: self.guid.clone(),
        }
    }

    /// Applies an in-place update to the most recently appended entry.
    ///
    /// Used for streaming token accumulation; bumps `version` without
    /// changing the entry count. Returns `false` when the log is empty, in
    /// which case nothing changes.
    pub fn mutate_last(&self, updater: impl FnOnce(&mut LogEntry)) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.entries.last_mut() {
            Some(entry) => {
                updater(entry);
                inner.version += 1;
                true
            }
            None => false,
        }
    }
}
