//! Mountinfo line parser for Linux systems.
//!
//! Parses lines in `/proc/[pid]/mountinfo` format. See
//! [`proc_pid_mountinfo(5)`](https://man7.org/linux/man-pages/man5/proc_pid_mountinfo.5.html)
//! for details on the structure.
//!
//! Co-mounted cgroup v1 subsystems share a single mount whose mount-point
//! leaf joins their names with commas (`/sys/fs/cgroup/net_cls,net_prio`).
//! [`expand_mount_point`] turns such a record into one record per name.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Represents a parsed mountinfo line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRecord {
    /// Unique ID of the mount; may be reused after `umount(2)`.
    pub mount_id: u32,
    /// ID of the parent mount, or of self for the root of the tree.
    pub parent_id: u32,
    /// Major half of the `st_dev` value for files on this filesystem.
    pub dev_major: u32,
    /// Minor half of the `st_dev` value.
    pub dev_minor: u32,
    /// Directory in the mounted filesystem forming the root of this
    /// mount.
    pub root: String,
    /// Where the mount is attached, relative to the process's root
    /// directory.
    pub mount_point: PathBuf,
    /// Per-mount options.
    pub mount_options: String,
    /// Optional `tag[:value]` fields (can be empty).
    pub optional_fields: Vec<String>,
    /// Filesystem type (e.g., `ext4`, `cgroup`).
    pub fs_type: String,
    /// Filesystem-specific source, typically a device path.
    pub mount_source: String,
    /// Per-superblock options.
    pub super_options: String,
}

/// Named fields in a mountinfo line.
#[derive(Debug, Clone, Copy)]
pub enum MountField {
    MountId,
    ParentId,
    DevMajorMinor,
    Root,
    MountPoint,
    MountOptions,
    FsType,
    MountSource,
    SuperOptions,
}

impl std::fmt::Display for MountField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MountField::MountId => "mount_id",
            MountField::ParentId => "parent_id",
            MountField::DevMajorMinor => "major:minor",
            MountField::Root => "root",
            MountField::MountPoint => "mount_point",
            MountField::MountOptions => "mount_options",
            MountField::FsType => "fs_type",
            MountField::MountSource => "mount_source",
            MountField::SuperOptions => "super_options",
        };
        write!(f, "{name}")
    }
}

/// Errors that may occur when parsing a mountinfo line.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("missing separator ` - ` in line: `{0}`")]
    MissingSeparator(String),

    #[error("missing `{field}` in pre-separator section of line: `{line}`")]
    MissingPreSeparatorField { field: MountField, line: String },

    #[error("missing `{field}` in post-separator section of line: `{line}`")]
    MissingPostSeparatorField { field: MountField, line: String },

    #[error("invalid `{field}` value `{value}` in line: `{line}`")]
    InvalidInteger {
        field: MountField,
        value: String,
        line: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("malformed `major:minor` pair `{value}` in line: `{line}`")]
    MalformedDevicePair { value: String, line: String },
}

/// Parses a single line of mountinfo data.
///
/// The line must follow the Linux kernel format described in
/// [`proc_pid_mountinfo(5)`](https://man7.org/linux/man-pages/man5/proc_pid_mountinfo.5.html):
/// seven mandatory leading fields (the `major:minor` pair counts as two),
/// zero or more optional fields, the ` - ` separator, then filesystem
/// type, mount source and superblock options. Tokens past the third
/// post-separator field are ignored.
///
/// The returned record is raw: a comma-joined mount-point leaf is kept
/// as-is. Use [`expand_mount_point`] to split it.
///
/// # Errors
///
/// Returns [`ParseError`] variants for a missing separator, missing
/// mandatory fields, or fields that fail to decode.
pub fn parse_mount_record(line: &str) -> Result<MountRecord, ParseError> {
    let (pre, post) = line
        .split_once(" - ")
        .ok_or_else(|| ParseError::MissingSeparator(line.to_owned()))?;

    let mut pre_fields = pre.split_whitespace();
    let mut next_pre = |field: MountField| {
        pre_fields
            .next()
            .ok_or_else(|| ParseError::MissingPreSeparatorField {
                field,
                line: line.to_owned(),
            })
    };

    let mount_id = parse_u32(next_pre(MountField::MountId)?, MountField::MountId, line)?;
    let parent_id = parse_u32(next_pre(MountField::ParentId)?, MountField::ParentId, line)?;
    let device_pair = next_pre(MountField::DevMajorMinor)?;
    let (dev_major, dev_minor) = parse_device_pair(device_pair, line)?;
    let root = next_pre(MountField::Root)?.to_owned();
    let mount_point = PathBuf::from(next_pre(MountField::MountPoint)?);
    let mount_options = next_pre(MountField::MountOptions)?.to_owned();

    let optional_fields: Vec<String> = pre_fields.map(str::to_owned).collect();

    let mut post_fields = post.split_whitespace();
    let mut next_post = |field: MountField| {
        post_fields
            .next()
            .ok_or_else(|| ParseError::MissingPostSeparatorField {
                field,
                line: line.to_owned(),
            })
    };

    let fs_type = next_post(MountField::FsType)?.to_owned();
    let mount_source = next_post(MountField::MountSource)?.to_owned();
    let super_options = next_post(MountField::SuperOptions)?.to_owned();

    Ok(MountRecord {
        mount_id,
        parent_id,
        dev_major,
        dev_minor,
        root,
        mount_point,
        mount_options,
        optional_fields,
        fs_type,
        mount_source,
        super_options,
    })
}

/// Splits a record whose mount-point leaf is a comma-joined name list
/// into one record per name.
///
/// Each produced record keeps every field of the input except the mount
/// point, which becomes `<parent>/<name>`. The order of names in the leaf
/// is preserved. A record without a comma in its leaf is returned
/// unchanged as the only element.
pub fn expand_mount_point(record: MountRecord) -> Vec<MountRecord> {
    let leaf = match record.mount_point.file_name().and_then(OsStr::to_str) {
        Some(leaf) if leaf.contains(',') => leaf.to_owned(),
        _ => return vec![record],
    };
    let parent = record
        .mount_point
        .parent()
        .map_or_else(PathBuf::new, Path::to_path_buf);

    leaf.split(',')
        .map(|name| {
            let mut expanded = record.clone();
            expanded.mount_point = parent.join(name);
            expanded
        })
        .collect()
}

fn parse_u32(raw: &str, field: MountField, line: &str) -> Result<u32, ParseError> {
    raw.parse().map_err(|source| ParseError::InvalidInteger {
        field,
        value: raw.to_owned(),
        line: line.to_owned(),
        source,
    })
}

fn parse_device_pair(raw: &str, line: &str) -> Result<(u32, u32), ParseError> {
    let (major, minor) = raw
        .split_once(':')
        .ok_or_else(|| ParseError::MalformedDevicePair {
            value: raw.to_owned(),
            line: line.to_owned(),
        })?;
    Ok((
        parse_u32(major, MountField::DevMajorMinor, line)?,
        parse_u32(minor, MountField::DevMajorMinor, line)?,
    ))
}
