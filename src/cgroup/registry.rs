//! Parser for the kernel's cgroup subsystem table.
//!
//! `/proc/cgroups` lists every subsystem compiled into the kernel, one
//! per line after a header line:
//!
//! ```text
//! #subsys_name	hierarchy	num_cgroups	enabled
//! cpu	3	64	1
//! cpuacct	3	64	1
//! memory	6	104	1
//! ```

use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::fsutil;

/// One row of the kernel's subsystem table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsystemInfo {
    /// Subsystem name, e.g. `cpuacct` or `memory`.
    pub name: String,
    /// Hierarchy ID shared by co-mounted subsystems.
    pub hierarchy_id: u32,
    /// Number of cgroups in this subsystem's hierarchy.
    pub num_cgroups: u32,
    /// Whether the subsystem is enabled.
    pub enabled: bool,
}

/// The parsed subsystem table, keyed by subsystem name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubsystemRegistry {
    subsystems: HashMap<String, SubsystemInfo>,
}

impl SubsystemRegistry {
    /// Looks up a subsystem by name.
    pub fn get(&self, name: &str) -> Option<&SubsystemInfo> {
        self.subsystems.get(name)
    }

    /// Returns `true` if `name` is a known, enabled subsystem.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.subsystems.get(name).is_some_and(|info| info.enabled)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubsystemInfo> {
        self.subsystems.values()
    }

    pub fn len(&self) -> usize {
        self.subsystems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsystems.is_empty()
    }
}

/// Errors that may occur when parsing a subsystem table line.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(
        "expected 4 fields `<name> <hierarchy> <num_cgroups> <enabled>`, got {count} in line: `{line}`"
    )]
    FieldCount { count: usize, line: String },

    #[error("invalid `{field}` value `{value}` in line: `{line}`")]
    InvalidInteger {
        field: &'static str,
        value: String,
        line: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    FileOpen(#[from] fsutil::FileOpenError),
    #[error("failed to read line for file `{path}`: {source}")]
    ReadLine {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse line in file `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Loads the subsystem table from the given file.
///
/// # Arguments
///
/// * `path` - Path to a subsystem table file (e.g., `/proc/cgroups`).
///
/// # Errors
///
/// - [`Error::FileOpen`] if the file can't be opened.
/// - [`Error::ReadLine`] if reading from the file fails.
/// - [`Error::Parse`] if parsing any line fails.
///
/// # Example
///
/// ```no_run
/// use dockmon::cgroup::registry::load_subsystems;
///
/// let registry = load_subsystems("/proc/cgroups").unwrap();
/// println!("cpuacct enabled: {}", registry.is_enabled("cpuacct"));
/// ```
pub fn load_subsystems(path: impl AsRef<Path>) -> Result<SubsystemRegistry> {
    let path = path.as_ref();
    let buf = fsutil::open_file_reader(path)?;

    parse_subsystems(buf, path)
}

/// Parses subsystem-table content from a reader.
///
/// The first line is the table header and is skipped unconditionally;
/// blank lines are ignored. Every other line must decode into exactly
/// four fields or the whole call fails. A name appearing twice keeps the
/// later row.
///
/// # Arguments
///
/// * `reader` - Buffered reader over the subsystem table content.
/// * `origin` - Logical origin of the data, used in error messages.
pub fn parse_subsystems<R: BufRead>(mut reader: R, origin: &Path) -> Result<SubsystemRegistry> {
    let mut subsystems = HashMap::new();
    let mut line = String::with_capacity(64);
    let mut lineno = 0usize;

    while reader
        .read_line(&mut line)
        .map_err(|source| Error::ReadLine {
            path: origin.to_path_buf(),
            source,
        })?
        != 0
    {
        lineno += 1;
        if lineno > 1 && !line.trim().is_empty() {
            let info = parse_subsystem_line(line.trim_end()).map_err(|source| Error::Parse {
                path: origin.to_path_buf(),
                source,
            })?;
            subsystems.insert(info.name.clone(), info);
        }

        line.clear();
    }

    Ok(SubsystemRegistry { subsystems })
}

/// Parses one `name hierarchy num_cgroups enabled` row.
///
/// The `enabled` flag follows the kernel's convention: `1` means enabled,
/// any other integer means disabled.
fn parse_subsystem_line(line: &str) -> std::result::Result<SubsystemInfo, ParseError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 4 {
        return Err(ParseError::FieldCount {
            count: fields.len(),
            line: line.to_owned(),
        });
    }

    let hierarchy_id = parse_field(fields[1], "hierarchy", line)?;
    let num_cgroups = parse_field(fields[2], "num_cgroups", line)?;
    let enabled_raw: u32 = parse_field(fields[3], "enabled", line)?;

    Ok(SubsystemInfo {
        name: fields[0].to_owned(),
        hierarchy_id,
        num_cgroups,
        enabled: enabled_raw == 1,
    })
}

fn parse_field(raw: &str, field: &'static str, line: &str) -> std::result::Result<u32, ParseError> {
    raw.parse().map_err(|source| ParseError::InvalidInteger {
        field,
        value: raw.to_owned(),
        line: line.to_owned(),
        source,
    })
}
