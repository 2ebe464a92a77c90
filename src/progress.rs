//! Progress reporting for archive packing.
//!
//! The packer calls a user-supplied callback once per finished entry with a
//! [`PackProgress`] snapshot. Packing is single-threaded, so the tracker is a
//! plain struct with no atomics.

use std::time::{Duration, Instant};

/// Snapshot of packing progress after an entry was finished.
#[derive(Debug, Clone)]
pub struct PackProgress {
    pub total_entries: u64,
    pub processed_entries: u64,
    pub total_bytes: u64,
    pub processed_bytes: u64,
    /// Name of the entry that was just finished.
    pub current: String,
    pub elapsed_time: Duration,
}

impl PackProgress {
    /// Completion in percent, by bytes when sizes are known and by entries otherwise.
    pub fn progress_percent(&self) -> f32 {
        if self.total_bytes > 0 {
            (self.processed_bytes as f64 / self.total_bytes as f64 * 100.0).min(100.0) as f32
        } else if self.total_entries > 0 {
            (self.processed_entries as f64 / self.total_entries as f64 * 100.0).min(100.0) as f32
        } else {
            100.0
        }
    }

    pub fn speed_mbps(&self) -> f32 {
        let secs = self.elapsed_time.as_secs_f32();
        if secs <= 0.0 {
            return 0.0;
        }
        (self.processed_bytes as f32 / (1024.0 * 1024.0)) / secs
    }

    /// Estimated time remaining based on current speed.
    pub fn estimated_time_remaining(&self) -> Duration {
        let speed = self.speed_mbps();
        if speed <= 0.0 {
            return Duration::from_secs(0);
        }
        let remaining_bytes = self.total_bytes.saturating_sub(self.processed_bytes);
        let remaining_mb = remaining_bytes as f32 / (1024.0 * 1024.0);
        Duration::from_secs_f32((remaining_mb / speed).max(0.0))
    }

    pub fn is_complete(&self) -> bool {
        self.processed_entries >= self.total_entries
    }
}

/// Progress callback type accepted by the packer.
pub type ProgressCallback<'a> = Box<dyn FnMut(&PackProgress) + 'a>;

/// Accumulates per-entry counters for one packing run.
#[derive(Debug)]
pub struct ProgressTracker {
    total_entries: u64,
    total_bytes: u64,
    processed_entries: u64,
    processed_bytes: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(total_entries: u64, total_bytes: u64) -> Self {
        Self {
            total_entries,
            total_bytes,
            processed_entries: 0,
            processed_bytes: 0,
            start_time: Instant::now(),
        }
    }

    /// Records a finished entry and returns the new snapshot.
    pub fn record_entry(&mut self, name: &str, bytes: u64) -> PackProgress {
        self.processed_entries += 1;
        self.processed_bytes += bytes;
        PackProgress {
            total_entries: self.total_entries,
            processed_entries: self.processed_entries,
            total_bytes: self.total_bytes,
            processed_bytes: self.processed_bytes,
            current: name.to_string(),
            elapsed_time: self.start_time.elapsed(),
        }
    }
}
