//! Container discovery through the docker layout of the cgroup
//! filesystem.
//!
//! Each cgroup v1 subsystem mount carries a `docker` subdirectory with
//! one child directory per running container, named by the container's
//! full 64-character identifier:
//!
//! ```text
//! /sys/fs/cgroup/cpuacct/docker/<64-hex-id>/
//! ```
//!
//! Any single enabled subsystem accounts every running container, so one
//! readable `docker` directory is enough to list them all.

use std::path::PathBuf;

use crate::cgroup::SubsystemPaths;
use crate::container::{CONTAINER_ID_LEN, ContainerID};
use crate::fsutil;

/// Directory beneath each subsystem mount holding per-container cgroups.
pub const DOCKER_DIR: &str = "docker";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    ListDir(#[from] fsutil::ReadDirError),
    #[error("failed to read entry of directory `{path}`: {source}")]
    ReadEntry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Lists the containers accounted under the resolved subsystem mounts.
///
/// Subsystems are scanned one at a time; the first whose `docker`
/// directory yields at least one container provides the full result and
/// the remaining subsystems are not touched. A subsystem without a
/// `docker` directory is skipped. Any other listing failure aborts the
/// call; no partial result is returned.
///
/// A qualifying entry is a directory whose name is a full 64-character
/// container ID. Entries of the right length that fail ID validation are
/// logged at debug level and skipped.
///
/// # Errors
///
/// - [`Error::ListDir`] if a present `docker` directory can't be listed.
/// - [`Error::ReadEntry`] if reading one of its entries fails.
pub fn list_containers(resolved: &SubsystemPaths) -> Result<Vec<ContainerID>> {
    let mut containers = Vec::new();
    for mount in resolved.values() {
        let docker_dir = mount.join(DOCKER_DIR);
        let entries = match fsutil::read_dir(&docker_dir) {
            Ok(entries) => entries,
            Err(err) if err.is_not_found() => continue,
            Err(err) => return Err(err.into()),
        };

        for entry in entries {
            let entry = entry.map_err(|source| Error::ReadEntry {
                path: docker_dir.clone(),
                source,
            })?;
            let file_type = entry.file_type().map_err(|source| Error::ReadEntry {
                path: docker_dir.clone(),
                source,
            })?;
            if !file_type.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.len() != CONTAINER_ID_LEN {
                continue;
            }
            match ContainerID::new(name) {
                Ok(container_id) => containers.push(container_id),
                Err(err) => log::debug!(
                    target: "container discovery",
                    "skipping cgroup entry that is not a container id: {err}"
                ),
            }
        }

        if !containers.is_empty() {
            break;
        }
    }

    Ok(containers)
}
