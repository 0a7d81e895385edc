use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;

use super::CgroupPaths;
use super::stats::{self, CpuUsage};

/// Subsystem whose control files carry the CPU accounting counters.
pub const CPUACCT_SUBSYSTEM: &str = "cpuacct";

const CPUACCT_USAGE: &str = "cpuacct.usage";
const CPUACCT_USAGE_PERCPU: &str = "cpuacct.usage_percpu";
const CPUACCT_STAT: &str = "cpuacct.stat";

/// Reads a container's cumulative CPU counters from its `cpuacct` cgroup
/// directory.
///
/// Control files are opened once and every handle is rewound after each
/// read, so a long-lived collector samples the same container without
/// re-opening files on every cycle. Files that could not be opened stay
/// `None` and surface as an error on [`Collector::refresh`].
#[derive(Debug)]
pub struct Collector {
    usage_file: Option<BufReader<File>>,
    percpu_file: Option<BufReader<File>>,
    stat_file: Option<BufReader<File>>,
}

impl Collector {
    /// Opens the cpuacct control files beneath the given directory.
    ///
    /// Never fails; missing or unreadable files surface on
    /// [`Collector::refresh`].
    pub fn open(cpuacct_dir: impl AsRef<Path>) -> Self {
        let dir = cpuacct_dir.as_ref();
        Self {
            usage_file: open_file(dir.join(CPUACCT_USAGE)),
            percpu_file: open_file(dir.join(CPUACCT_USAGE_PERCPU)),
            stat_file: open_file(dir.join(CPUACCT_STAT)),
        }
    }

    /// Builds a collector for a container's resolved cgroup directories.
    ///
    /// Containers without a resolved `cpuacct` subsystem get a collector
    /// whose every refresh fails.
    pub fn for_paths(paths: &CgroupPaths) -> Self {
        match paths.get(CPUACCT_SUBSYSTEM) {
            Some(dir) => Self::open(dir),
            None => Self {
                usage_file: None,
                percpu_file: None,
                stat_file: None,
            },
        }
    }

    /// Reads a fresh [`CpuUsage`] snapshot.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if any control file is absent, unreadable or
    /// malformed. No partial snapshot is returned.
    pub fn refresh(&mut self) -> std::io::Result<CpuUsage> {
        let total_usage =
            read_and_rewind(self.usage_file.as_mut(), CPUACCT_USAGE, stats::read_u64)?;
        let percpu_usage = read_and_rewind(
            self.percpu_file.as_mut(),
            CPUACCT_USAGE_PERCPU,
            stats::read_u64_list,
        )?;
        let acct = read_and_rewind(
            self.stat_file.as_mut(),
            CPUACCT_STAT,
            stats::CpuAcctStat::from_reader,
        )?;

        Ok(CpuUsage {
            total_usage,
            percpu_usage,
            user_usage: acct.user,
            system_usage: acct.system,
        })
    }
}

/// Applies `read` to the handle, then rewinds it even when the read
/// failed. A missing handle is an error naming the absent file.
fn read_and_rewind<T>(
    file: Option<&mut BufReader<File>>,
    name: &'static str,
    read: impl FnOnce(&mut BufReader<File>) -> std::io::Result<T>,
) -> std::io::Result<T> {
    let Some(file) = file else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("control file `{name}` is not available"),
        ));
    };
    let value = read(&mut *file);
    file.seek(SeekFrom::Start(0))?;
    value
}

#[inline]
fn open_file(path: impl AsRef<Path>) -> Option<BufReader<File>> {
    Some(BufReader::new(File::open(path).ok()?))
}
