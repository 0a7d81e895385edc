use std::io::BufRead;
use std::path::Path;

use crate::fsutil;

use super::parser::{MountRecord, expand_mount_point, parse_mount_record};
use super::{Error, Result};

/// Loads the mount table from the given `mountinfo` file.
///
/// # Arguments
///
/// * `path` - Path to a Linux mountinfo file (e.g., `/proc/self/mountinfo`).
///
/// # Returns
///
/// The expanded [`MountRecord`]s of every entry after the first line.
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
/// use dockmon::mountinfo::load_mount_table;
///
/// let records = load_mount_table("/proc/self/mountinfo").unwrap();
/// println!("{} mounts", records.len());
/// ```
pub fn load_mount_table(path: impl AsRef<Path>) -> Result<Vec<MountRecord>> {
    let path = path.as_ref();
    let buf = fsutil::open_file_reader(path)?;

    parse_mount_table(buf, path)
}

/// Parses mount-table content from a reader.
///
/// The first line is skipped unconditionally and blank lines are ignored.
/// Records with a comma-joined mount-point leaf are expanded, so the
/// result may hold more records than the input has lines. A single
/// malformed line fails the whole call; no partial table is returned.
///
/// # Arguments
///
/// * `reader` - Buffered reader over the mountinfo content.
/// * `origin` - Logical origin of the data, used in error messages.
pub fn parse_mount_table<R: BufRead>(mut reader: R, origin: &Path) -> Result<Vec<MountRecord>> {
    let mut records = Vec::new();
    let mut line = String::with_capacity(256);
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
            let record =
                parse_mount_record(line.trim_end()).map_err(|source| Error::Parse {
                    path: origin.to_path_buf(),
                    source,
                })?;
            records.extend(expand_mount_point(record));
        }

        line.clear();
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn new_cursor_from_contents(contents: &str) -> Cursor<Vec<u8>> {
        Cursor::new(contents.as_bytes().to_vec())
    }

    #[test]
    fn test_skips_first_line() {
        let input = "\
22 1 0:21 / / rw shared:1 - ext4 /dev/sda1 rw
33 29 0:27 / /sys/fs/cgroup/memory rw - cgroup cgroup rw,memory
34 29 0:28 / /sys/fs/cgroup/cpuacct rw - cgroup cgroup rw,cpuacct
";
        let records = parse_mount_table(new_cursor_from_contents(input), Path::new("/dummy"))
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].mount_point,
            PathBuf::from("/sys/fs/cgroup/memory")
        );
        assert_eq!(
            records[1].mount_point,
            PathBuf::from("/sys/fs/cgroup/cpuacct")
        );
    }

    #[test]
    fn test_first_line_skipped_even_if_malformed() {
        let input = "\
this line is not a mount record
33 29 0:27 / /sys/fs/cgroup/memory rw - cgroup cgroup rw,memory
";
        let records = parse_mount_table(new_cursor_from_contents(input), Path::new("/dummy"))
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_skips_blank_lines() {
        let input = "\
22 1 0:21 / / rw - ext4 /dev/sda1 rw

33 29 0:27 / /sys/fs/cgroup/memory rw - cgroup cgroup rw,memory

";
        let records = parse_mount_table(new_cursor_from_contents(input), Path::new("/dummy"))
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_expands_co_mounted_subsystems() {
        let input = "\
22 1 0:21 / / rw - ext4 /dev/sda1 rw
30 29 0:24 / /sys/fs/cgroup/net_cls,net_prio rw - cgroup cgroup rw,net_cls,net_prio
33 29 0:27 / /sys/fs/cgroup/memory rw - cgroup cgroup rw,memory
";
        let records = parse_mount_table(new_cursor_from_contents(input), Path::new("/dummy"))
            .unwrap();

        let points: Vec<_> = records
            .iter()
            .map(|record| record.mount_point.clone())
            .collect();
        assert_eq!(
            points,
            vec![
                PathBuf::from("/sys/fs/cgroup/net_cls"),
                PathBuf::from("/sys/fs/cgroup/net_prio"),
                PathBuf::from("/sys/fs/cgroup/memory"),
            ]
        );
    }

    #[test]
    fn test_malformed_line_fails_whole_table() {
        let input = "\
22 1 0:21 / / rw - ext4 /dev/sda1 rw
33 29 0:27 / /sys/fs/cgroup/memory rw - cgroup cgroup rw,memory
badline without separator
";
        let err = parse_mount_table(new_cursor_from_contents(input), Path::new("/dummy"))
            .unwrap_err();
        match err {
            Error::Parse { path, .. } => assert_eq!(path, PathBuf::from("/dummy")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_from_tempfile() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "22 1 0:21 / / rw - ext4 /dev/sda1 rw").unwrap();
        writeln!(
            tmp,
            "33 29 0:27 / /sys/fs/cgroup/memory rw - cgroup cgroup rw,memory"
        )
        .unwrap();

        let records = load_mount_table(tmp.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fs_type, "cgroup");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_mount_table("/definitely/does/not/exist").unwrap_err();
        assert!(matches!(err, Error::FileOpen(_)));
    }
}
