use dashmap::DashMap;

use crate::container::ContainerID;

use super::sampler::CpuSampler;
use super::stats::CpuSampleEntry;

/// Holds the per-container samplers that survive across poll cycles.
#[derive(Debug, Default)]
pub struct Monitor {
    containers: DashMap<ContainerID, CpuSampler>,
}

impl Monitor {
    /// Registers a sampler for a newly discovered container.
    ///
    /// An existing sampler for the same container is replaced, dropping
    /// its accumulated baseline.
    pub fn register(&self, container_id: ContainerID, sampler: CpuSampler) {
        self.containers.insert(container_id, sampler);
    }

    /// Returns `true` if the container is already tracked.
    pub fn contains(&self, container_id: &ContainerID) -> bool {
        self.containers.contains_key(container_id)
    }

    /// Drops the samplers of containers absent from the current
    /// discovery result.
    pub fn retain_discovered(&self, discovered: &[ContainerID]) {
        self.containers
            .retain(|container_id, _| discovered.contains(container_id));
    }

    /// Samples every tracked container, appending one entry per computed
    /// delta to `out`.
    ///
    /// A container's first successful sample only establishes its
    /// baseline and emits nothing. A failing sampler is logged and kept;
    /// its stored baseline still serves the next cycle.
    pub fn sample_all(&self, timestamp: u64, out: &mut Vec<CpuSampleEntry>) {
        for mut entry in self.containers.iter_mut() {
            let container_id = entry.key().clone();
            match entry.value_mut().update() {
                Ok(Some(delta)) => {
                    out.push(CpuSampleEntry::new(timestamp, container_id, delta));
                }
                Ok(None) => {
                    log::debug!(
                        target: "container monitor",
                        "established CPU baseline: container_id={container_id}"
                    );
                }
                Err(err) => {
                    log::error!(
                        target: "container monitor",
                        "failed reading container stats: container_id={container_id}, error={err}"
                    );
                }
            }
        }
    }

    pub fn size(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}
