//! Parsing of the process's mount table.
//!
//! The mount table at `/proc/self/mountinfo` is where cgroup v1 subsystem
//! mounts are found; [`load_mount_table`] reads it into typed
//! [`MountRecord`]s with co-mounted subsystem entries already expanded.

mod error;
mod parser;
mod table;

pub use error::{Error, Result};
pub use parser::{MountField, MountRecord, ParseError, expand_mount_point, parse_mount_record};
pub use table::{load_mount_table, parse_mount_table};
