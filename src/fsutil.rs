use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Failure to open a file for reading; carries the attempted path.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Opens the file at `path` into a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileOpenError`] naming `path` when the open fails.
///
/// # Example
/// ```no_run
/// # use dockmon::fsutil;
/// let mounts = fsutil::open_file_reader("/proc/self/mountinfo")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Failure to list a directory; carries the attempted path.
#[derive(Debug, thiserror::Error)]
#[error("failed to list directory `{path}`: {source}")]
pub struct ReadDirError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl ReadDirError {
    /// Returns `true` if the directory simply does not exist.
    pub fn is_not_found(&self) -> bool {
        self.source.kind() == io::ErrorKind::NotFound
    }
}

/// Starts listing the entries of the directory at the given path.
///
/// # Errors
///
/// Returns a [`ReadDirError`] if the directory cannot be opened for
/// listing; errors on individual entries surface while iterating.
pub fn read_dir(path: impl AsRef<Path>) -> Result<fs::ReadDir, ReadDirError> {
    let path = path.as_ref();
    fs::read_dir(path).map_err(|source| ReadDirError {
        path: path.to_path_buf(),
        source,
    })
}
