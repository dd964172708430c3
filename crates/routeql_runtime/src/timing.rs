//! Per-field resolver timings collected while tracing is enabled.

use parking_lot::Mutex;
use std::time::Duration;

/// One timed field resolution.
#[derive(Debug, Clone)]
pub struct FieldTiming {
    pub path: String,
    pub parent_type: String,
    pub field_name: String,
    pub return_type: String,
    pub duration: Duration,
}

/// Timings for one request. Inserted into the request context when tracing
/// is on; the field wrapper records into it.
#[derive(Debug, Default)]
pub struct FieldTimings {
    entries: Mutex<Vec<FieldTiming>>,
}

impl FieldTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, timing: FieldTiming) {
        self.entries.lock().push(timing);
    }

    pub fn snapshot(&self) -> Vec<FieldTiming> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// The slowest recorded field, if any.
    pub fn slowest(&self) -> Option<FieldTiming> {
        self.entries
            .lock()
            .iter()
            .max_by_key(|t| t.duration)
            .cloned()
    }

    /// Sum of all recorded durations. Sibling fields may overlap, so this can
    /// exceed wall-clock time.
    pub fn total(&self) -> Duration {
        self.entries.lock().iter().map(|t| t.duration).sum()
    }
}
