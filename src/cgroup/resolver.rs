//! Resolution of cgroup v1 subsystem mount paths.
//!
//! Cross-references the kernel's subsystem table with the process's mount
//! table: a mount qualifies when its filesystem type is `cgroup` and its
//! mount-point leaf names an enabled subsystem. [`Resolver`] adds a cache
//! so the proc tables are only re-read after [`Resolver::invalidate`].

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::mountinfo::{self, MountRecord};

use super::registry::{self, SubsystemRegistry};

/// Filesystem type of cgroup v1 subsystem mounts.
const CGROUP_FS_TYPE: &str = "cgroup";

/// Mapping from subsystem name to the mount path serving it.
pub type SubsystemPaths = HashMap<String, PathBuf>;

/// Maps every enabled, mounted subsystem to its mount path.
///
/// The key of each entry is the final segment of the mount point, which
/// for expanded cgroup mounts is the subsystem name. Subsystems that are
/// enabled but not mounted are absent from the result, as are mounts of
/// other filesystem types and mounts whose leaf names no enabled
/// subsystem.
pub fn resolve_subsystem_paths(
    registry: &SubsystemRegistry,
    mounts: &[MountRecord],
) -> SubsystemPaths {
    let mut paths = SubsystemPaths::new();
    for mount in mounts {
        if mount.fs_type != CGROUP_FS_TYPE {
            continue;
        }
        let Some(name) = mount.mount_point.file_name().and_then(OsStr::to_str) else {
            continue;
        };
        if registry.is_enabled(name) {
            paths.insert(name.to_owned(), mount.mount_point.clone());
        }
    }

    paths
}

/// Errors from loading the two proc tables behind a resolution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Subsystems(#[from] registry::Error),
    #[error(transparent)]
    MountTable(#[from] mountinfo::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Resolves subsystem mount paths from the proc filesystem, caching the
/// result across poll cycles.
///
/// A successful resolution is reused until [`Resolver::invalidate`] is
/// called; the poll loop invalidates after any cycle that failed, so a
/// remounted or newly enabled subsystem is picked up on the next attempt.
#[derive(Debug)]
pub struct Resolver {
    proc_cgroups: PathBuf,
    proc_mountinfo: PathBuf,
    cached: Mutex<Option<Arc<SubsystemPaths>>>,
}

impl Resolver {
    /// Creates a resolver reading the given subsystem and mount table
    /// locations.
    pub fn new(proc_cgroups: impl Into<PathBuf>, proc_mountinfo: impl Into<PathBuf>) -> Self {
        Self {
            proc_cgroups: proc_cgroups.into(),
            proc_mountinfo: proc_mountinfo.into(),
            cached: Mutex::new(None),
        }
    }

    /// Returns the subsystem mount mapping, reusing the cached copy from
    /// an earlier cycle when one exists.
    ///
    /// Both proc tables are loaded eagerly before either result is
    /// inspected; when both fail, the mount table error is the one
    /// reported.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`registry::Error`] or [`mountinfo::Error`]
    /// when reading or parsing a table fails. Nothing is cached on error.
    pub fn subsystem_paths(&self) -> Result<Arc<SubsystemPaths>> {
        {
            let cached = self.cached.lock().expect("resolver cache lock poisoned");
            if let Some(paths) = cached.as_ref() {
                return Ok(Arc::clone(paths));
            }
        }

        let registry = registry::load_subsystems(&self.proc_cgroups);
        let mounts = mountinfo::load_mount_table(&self.proc_mountinfo);
        let (registry, mounts) = match (registry, mounts) {
            (Ok(registry), Ok(mounts)) => (registry, mounts),
            (_, Err(err)) => return Err(err.into()),
            (Err(err), Ok(_)) => return Err(err.into()),
        };

        let paths = Arc::new(resolve_subsystem_paths(&registry, &mounts));
        *self.cached.lock().expect("resolver cache lock poisoned") = Some(Arc::clone(&paths));
        Ok(paths)
    }

    /// Drops the cached mapping; the next call re-reads both proc tables.
    pub fn invalidate(&self) {
        self.cached
            .lock()
            .expect("resolver cache lock poisoned")
            .take();
    }
}
