// Test utilities shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tideq::queue::{DirLease, ManualClock};
use tideq::{FileQueueService, MemoryQueueService};

/// Arbitrary fixed start so deadlines are easy to read in failures.
pub const START_MS: u64 = 1_700_000_000_000;

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(START_MS))
}

pub fn memory_service(timeout: Duration, clock: Arc<ManualClock>) -> MemoryQueueService {
    MemoryQueueService::with_clock(timeout, clock)
}

/// File service over a fresh temp root. Keep the `TempDir` alive for the
/// duration of the test.
pub fn file_service(timeout: Duration, clock: Arc<ManualClock>) -> (FileQueueService, TempDir) {
    let root = tempfile::tempdir().unwrap();
    let service = FileQueueService::with_parts(
        root.path(),
        timeout,
        Arc::new(DirLease::new(Duration::from_millis(5))),
        clock,
    )
    .unwrap();
    (service, root)
}
