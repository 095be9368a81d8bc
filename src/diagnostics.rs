//! Bounded in-memory log of recent generation failures.
//!
//! [`ErrorLog`] is a cloneable handle over a fixed-capacity FIFO ring: every
//! failure (retried or final) gets appended, and once the cap is reached the
//! oldest entry is evicted. Aggregates are computed on read rather than
//! maintained incrementally; at 100 entries the recompute cost is negligible.
//!
//! The log is explicitly constructed and injected into clients rather than
//! living in module-level state, so tests never share a hidden buffer.

use crate::error::{ErrorCode, GenError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Maximum number of entries retained before FIFO eviction kicks in.
pub const LOG_CAPACITY: usize = 100;

/// How many of the newest entries [`ErrorStats`] carries.
const RECENT_WINDOW: usize = 10;

/// One recorded failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    /// The classified failure.
    pub error: GenError,
    /// When the entry was appended.
    pub logged_at: DateTime<Utc>,
}

/// Aggregate view over the log, computed on read.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorStats {
    /// Entries currently retained (after eviction).
    pub total_errors: usize,
    /// Count per taxonomy code.
    pub errors_by_code: HashMap<ErrorCode, usize>,
    /// Count per originating service.
    pub errors_by_service: HashMap<String, usize>,
    /// The newest entries, oldest first, at most ten.
    pub recent_errors: Vec<ErrorLogEntry>,
}

/// Cloneable handle to a shared, capacity-bounded error log.
///
/// Appends from concurrent calls interleave by completion time; each append is
/// atomic under the inner lock, and ordering across calls carries no meaning
/// beyond that.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    entries: Arc<Mutex<VecDeque<ErrorLogEntry>>>,
}

impl ErrorLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a failure, evicting the oldest entry when over capacity.
    pub fn record(&self, error: &GenError) {
        let entry = ErrorLogEntry {
            error: error.clone(),
            logged_at: Utc::now(),
        };
        let mut entries = self.lock();
        entries.push_back(entry);
        if entries.len() > LOG_CAPACITY {
            entries.pop_front();
        }
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the log holds no entries.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Snapshot of every retained entry, oldest first.
    pub fn entries(&self) -> Vec<ErrorLogEntry> {
        self.lock().iter().cloned().collect()
    }

    /// Aggregate counts plus the most recent entries.
    pub fn stats(&self) -> ErrorStats {
        let entries = self.lock();
        let mut errors_by_code: HashMap<ErrorCode, usize> = HashMap::new();
        let mut errors_by_service: HashMap<String, usize> = HashMap::new();

        for entry in entries.iter() {
            *errors_by_code.entry(entry.error.code).or_default() += 1;
            *errors_by_service
                .entry(entry.error.context.service.clone())
                .or_default() += 1;
        }

        let recent_errors = entries
            .iter()
            .skip(entries.len().saturating_sub(RECENT_WINDOW))
            .cloned()
            .collect();

        ErrorStats {
            total_errors: entries.len(),
            errors_by_code,
            errors_by_service,
            recent_errors,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ErrorLogEntry>> {
        // Entries are plain data; a poisoned lock only means another thread
        // panicked mid-append, so the buffer is still usable.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
