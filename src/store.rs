//! Latest-value store shared between the MQTT subscriber and the HTTP API.
//!
//! Holds exactly one [`Reading`] plus a version counter. The subscriber task is
//! the single writer; request handlers are concurrent readers. Both sides only
//! ever hold the lock long enough to copy three floats and a counter, so the
//! critical section is bounded and neither side can stall the other.

use tokio::sync::RwLock;
use tracing::trace;

use crate::telemetry::Reading;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    reading: Reading,
    version: u64,
}

/// Concurrency-safe holder for the most recent reading.
///
/// Starts out with a zero-valued reading at version 0 so queries can be
/// answered before the first message arrives. Readers always observe a
/// consistent snapshot: either the reading from write N or from write N+1,
/// never a mix.
#[derive(Debug, Default)]
pub struct LatestStore {
    slot: RwLock<Slot>,
}

impl LatestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replaces the stored reading and bumps the version counter.
    /// Returns the version assigned to this write.
    pub async fn write(&self, reading: Reading) -> u64 {
        let mut slot = self.slot.write().await;
        slot.reading = reading;
        slot.version += 1;
        trace!(version = slot.version, ?reading, "stored reading");
        slot.version
    }

    /// Returns a consistent snapshot of the latest reading and its version.
    pub async fn read(&self) -> (Reading, u64) {
        let slot = self.slot.read().await;
        (slot.reading, slot.version)
    }
}
