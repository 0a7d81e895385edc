use super::CgroupPaths;
use super::collector::Collector;
use super::stats::{CpuDelta, CpuUsage};

/// Tracks one container's CPU counters across poll cycles.
///
/// The sampler keeps the two most recent snapshots. Each successful
/// [`CpuSampler::update`] rotates the pair and reports the counter
/// increase between them; the first successful update only establishes
/// the baseline and reports nothing.
#[derive(Debug)]
pub struct CpuSampler {
    paths: CgroupPaths,
    collector: Collector,
    previous: Option<CpuUsage>,
    current: Option<CpuUsage>,
}

impl CpuSampler {
    /// Builds a sampler over a container's resolved cgroup directories.
    pub fn new(paths: CgroupPaths) -> Self {
        let collector = Collector::for_paths(&paths);
        Self {
            paths,
            collector,
            previous: None,
            current: None,
        }
    }

    /// Takes a fresh snapshot and returns the delta against the previous
    /// one.
    ///
    /// Returns `Ok(None)` on the first successful sample.
    ///
    /// # Errors
    ///
    /// Propagates the collector's I/O error. The stored snapshots are left
    /// untouched on failure, so the existing baseline still serves the
    /// next update.
    pub fn update(&mut self) -> std::io::Result<Option<CpuDelta>> {
        let fresh = self.collector.refresh()?;
        self.previous = self.current.take();
        let delta = self
            .previous
            .as_ref()
            .map(|previous| fresh.delta_since(previous));
        self.current = Some(fresh);

        Ok(delta)
    }

    /// The most recent snapshot, if any sample has succeeded yet.
    pub fn current(&self) -> Option<&CpuUsage> {
        self.current.as_ref()
    }

    /// The snapshot before [`CpuSampler::current`], the delta baseline.
    pub fn previous(&self) -> Option<&CpuUsage> {
        self.previous.as_ref()
    }

    /// The container's per-subsystem cgroup directories.
    pub fn paths(&self) -> &CgroupPaths {
        &self.paths
    }
}
