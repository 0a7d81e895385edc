//! Container CPU accounting through the cgroup v1 filesystem.
//!
//! This module turns the kernel's view of Docker containers into
//! per-container CPU usage deltas. It resolves where each cgroup v1
//! subsystem is mounted, maps containers onto their per-subsystem
//! accounting directories, and samples the `cpuacct` counters found
//! there.
//!
//! # Key Components
//!
//! - [`registry`] — Parses the kernel's subsystem table (`/proc/cgroups`).
//! - [`resolver`] — Cross-references subsystem table and mount table into
//!   subsystem mount paths, cached across poll cycles.
//! - [`CgroupPaths`] — One container's accounting directories, one per
//!   resolved subsystem.
//! - [`Collector`] — Holds the open `cpuacct` file handles of one
//!   container and reads counter snapshots from them.
//! - [`CpuSampler`] — Rotates a container's two most recent snapshots
//!   into deltas.
//! - [`Monitor`] — The sampler registry that survives across poll cycles.
//!
//! # Platform Requirements
//!
//! - Linux with the cgroup v1 `cpuacct` subsystem mounted.
//! - Read access to the cgroup filesystem and to `/proc`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

mod collector;
mod monitor;
pub mod registry;
pub mod resolver;
mod sampler;
pub mod stats;

pub use collector::{CPUACCT_SUBSYSTEM, Collector};
pub use monitor::Monitor;
pub use registry::{SubsystemInfo, SubsystemRegistry};
pub use resolver::{Resolver, SubsystemPaths, resolve_subsystem_paths};
pub use sampler::CpuSampler;

use crate::container::ContainerID;
use crate::discovery::DOCKER_DIR;

/// One container's cgroup accounting directories, keyed by subsystem
/// name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CgroupPaths {
    paths: HashMap<String, PathBuf>,
}

impl CgroupPaths {
    /// Builds the directory map for one container: every resolved
    /// subsystem mount joined with the `docker` segment and the container
    /// ID.
    pub fn for_container(resolved: &SubsystemPaths, container_id: &ContainerID) -> Self {
        let paths = resolved
            .iter()
            .map(|(subsystem, mount)| {
                (
                    subsystem.clone(),
                    mount.join(DOCKER_DIR).join(container_id.as_str()),
                )
            })
            .collect();
        Self { paths }
    }

    /// The container's directory for `subsystem`, if that subsystem
    /// resolved.
    pub fn get(&self, subsystem: &str) -> Option<&Path> {
        self.paths.get(subsystem).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.paths
            .iter()
            .map(|(subsystem, path)| (subsystem.as_str(), path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FromIterator<(String, PathBuf)> for CgroupPaths {
    fn from_iter<I: IntoIterator<Item = (String, PathBuf)>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_container_joins_docker_segment_and_id() {
        let raw_id = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
        let container_id = ContainerID::new(raw_id).unwrap();
        let resolved = SubsystemPaths::from([
            ("cpuacct".to_owned(), PathBuf::from("/sys/fs/cgroup/cpuacct")),
            ("memory".to_owned(), PathBuf::from("/sys/fs/cgroup/memory")),
        ]);

        let paths = CgroupPaths::for_container(&resolved, &container_id);

        assert_eq!(paths.len(), 2);
        let expected_cpuacct = PathBuf::from(format!("/sys/fs/cgroup/cpuacct/docker/{raw_id}"));
        let expected_memory = PathBuf::from(format!("/sys/fs/cgroup/memory/docker/{raw_id}"));
        assert_eq!(paths.get("cpuacct"), Some(expected_cpuacct.as_path()));
        assert_eq!(paths.get("memory"), Some(expected_memory.as_path()));
        assert_eq!(paths.get("blkio"), None);
    }
}
