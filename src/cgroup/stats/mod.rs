//! Value types for per-container CPU accounting.
//!
//! A [`CpuUsage`] is one snapshot of a container's cumulative counters as
//! read from the `cpuacct` control files. Two consecutive snapshots give a
//! [`CpuDelta`], and a delta stamped with its collection time and
//! container becomes a [`CpuSampleEntry`], the unit the agent emits.

mod cpu;
mod error;

pub use cpu::{CpuAcctStat, CpuDelta, CpuUsage, read_u64, read_u64_list};
pub use error::StatParseError;

use serde::Serialize;

use crate::container::ContainerID;

/// One emitted sample: a container's CPU delta at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct CpuSampleEntry {
    /// Timestamp (in UNIX epoch seconds)
    timestamp: u64,
    container_id: ContainerID,
    delta: CpuDelta,
}

impl CpuSampleEntry {
    pub fn new(timestamp: u64, container_id: ContainerID, delta: CpuDelta) -> Self {
        Self {
            timestamp,
            container_id,
            delta,
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn container_id(&self) -> &ContainerID {
        &self.container_id
    }

    pub fn delta(&self) -> &CpuDelta {
        &self.delta
    }
}
