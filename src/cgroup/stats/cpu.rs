//! Parsing utilities for the cgroup v1 `cpuacct` accounting files.
//!
//! Three files describe a container's cumulative CPU consumption:
//!
//! - **`cpuacct.usage`** — a single line holding the total CPU time
//!   consumed by the cgroup, in nanoseconds.
//! - **`cpuacct.usage_percpu`** — a single line of whitespace-separated
//!   totals, one per logical CPU, in nanoseconds, in the kernel's own
//!   reporting order.
//! - **`cpuacct.stat`** — `user` and `system` key-value lines, both in
//!   USER_HZ ticks.
//!
//! All counters are cumulative since cgroup creation; [`CpuUsage`] holds
//! one snapshot of them and [`CpuUsage::delta_since`] turns two snapshots
//! into a [`CpuDelta`].
//!
//! # Examples
//!
//! ```rust
//! use dockmon::cgroup::stats::{CpuAcctStat, read_u64, read_u64_list};
//!
//! let total = read_u64(&mut "623932088000\n".as_bytes()).unwrap();
//! assert_eq!(total, 623_932_088_000);
//!
//! let percpu = read_u64_list(&mut "100 200 300\n".as_bytes()).unwrap();
//! assert_eq!(percpu, vec![100, 200, 300]);
//!
//! let acct = CpuAcctStat::from_reader(&mut "user 419\nsystem 201\n".as_bytes()).unwrap();
//! assert_eq!(acct.user, 419);
//! assert_eq!(acct.system, 201);
//! ```

use std::io::BufRead;

use serde::Serialize;

use super::error::StatParseError;

/// A snapshot of a container's cumulative CPU counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CpuUsage {
    /// Total CPU time consumed, in nanoseconds (`cpuacct.usage`).
    pub total_usage: u64,
    /// CPU time consumed per logical CPU, in nanoseconds, in the kernel's
    /// reporting order (`cpuacct.usage_percpu`).
    pub percpu_usage: Vec<u64>,
    /// Time spent in user mode, in USER_HZ ticks (`cpuacct.stat`).
    pub user_usage: u64,
    /// Time spent in kernel mode, in USER_HZ ticks (`cpuacct.stat`).
    pub system_usage: u64,
}

/// The increase of every CPU counter between two consecutive snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CpuDelta {
    /// Increase in total CPU time, in nanoseconds.
    pub total_usage: u64,
    /// Increase per logical CPU, in nanoseconds, in the kernel's
    /// reporting order.
    pub percpu_usage: Vec<u64>,
    /// Increase in user-mode time, in USER_HZ ticks.
    pub user_usage: u64,
    /// Increase in kernel-mode time, in USER_HZ ticks.
    pub system_usage: u64,
}

impl CpuUsage {
    /// Computes the counter increase from `previous` to `self`.
    ///
    /// Per-CPU counters are subtracted index-wise in reporting order. The
    /// per-CPU list may grow between snapshots when CPUs come online; an
    /// index absent from `previous` counts as zero there, so a new CPU
    /// contributes its full value. Every subtraction saturates at zero.
    pub fn delta_since(&self, previous: &CpuUsage) -> CpuDelta {
        let percpu_usage = self
            .percpu_usage
            .iter()
            .enumerate()
            .map(|(cpu, &current)| {
                current.saturating_sub(previous.percpu_usage.get(cpu).copied().unwrap_or(0))
            })
            .collect();

        CpuDelta {
            total_usage: self.total_usage.saturating_sub(previous.total_usage),
            percpu_usage,
            user_usage: self.user_usage.saturating_sub(previous.user_usage),
            system_usage: self.system_usage.saturating_sub(previous.system_usage),
        }
    }
}

/// Parsed contents of a `cpuacct.stat` file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuAcctStat {
    /// Time spent in user mode, in USER_HZ ticks.
    pub user: u64,
    /// Time spent in kernel mode, in USER_HZ ticks.
    pub system: u64,
}

impl CpuAcctStat {
    /// Parses `cpuacct.stat`-style key-value lines.
    ///
    /// Recognized keys are `user` and `system`; unknown keys and lines
    /// without a value are ignored. A recognized key appearing twice is an
    /// error. Missing keys keep their default of zero.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidData` I/O error wrapping a [`StatParseError`]
    /// for duplicate keys or values that fail to parse.
    pub fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut stat = Self::default();
        let mut seen_user = false;
        let mut seen_system = false;
        let mut line = String::new();
        let mut lineno = 0usize;

        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            stat.apply_line(&line, lineno, &mut seen_user, &mut seen_system)?;
            line.clear();
        }

        Ok(stat)
    }

    fn apply_line(
        &mut self,
        line: &str,
        lineno: usize,
        seen_user: &mut bool,
        seen_system: &mut bool,
    ) -> std::io::Result<()> {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            return Ok(());
        };

        let (slot, seen) = match key {
            "user" => (&mut self.user, seen_user),
            "system" => (&mut self.system, seen_system),
            _ => return Ok(()),
        };
        if std::mem::replace(seen, true) {
            return Err(StatParseError::DuplicateField {
                field: key.to_owned(),
                line: lineno,
            }
            .into());
        }
        *slot = value.parse::<u64>().map_err(|source| {
            std::io::Error::from(StatParseError::InvalidKeyValue {
                key: key.to_owned(),
                value: value.to_owned(),
                line: lineno,
                source,
            })
        })?;

        Ok(())
    }
}

/// Reads a single-line unsigned counter, as in `cpuacct.usage`.
///
/// # Errors
///
/// Returns an `InvalidData` I/O error wrapping a [`StatParseError`] if the
/// line does not hold exactly one unsigned integer.
pub fn read_u64<R: BufRead>(buf: &mut R) -> std::io::Result<u64> {
    let mut line = String::new();
    buf.read_line(&mut line)?;
    let value = line.trim();
    value.parse::<u64>().map_err(|source| {
        std::io::Error::from(StatParseError::InvalidValue {
            value: value.to_owned(),
            line: 1,
            source,
        })
    })
}

/// Reads a single line of whitespace-separated unsigned counters, as in
/// `cpuacct.usage_percpu`, preserving their order.
///
/// An empty line yields an empty list.
///
/// # Errors
///
/// Returns an `InvalidData` I/O error wrapping a [`StatParseError`] if any
/// value fails to parse.
pub fn read_u64_list<R: BufRead>(buf: &mut R) -> std::io::Result<Vec<u64>> {
    let mut line = String::new();
    buf.read_line(&mut line)?;
    line.split_whitespace()
        .map(|raw| {
            raw.parse::<u64>().map_err(|source| {
                std::io::Error::from(StatParseError::InvalidValue {
                    value: raw.to_owned(),
                    line: 1,
                    source,
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::stats::error::extract_stat_parse_error;

    #[test]
    fn test_read_u64() {
        let total = read_u64(&mut "623932088000\n".as_bytes()).unwrap();
        assert_eq!(total, 623_932_088_000);
    }

    #[test]
    fn test_read_u64_without_newline() {
        assert_eq!(read_u64(&mut "42".as_bytes()).unwrap(), 42);
    }

    #[test]
    fn test_read_u64_invalid() {
        let err = read_u64(&mut "abc\n".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        match extract_stat_parse_error(&err) {
            StatParseError::InvalidValue { value, .. } => assert_eq!(value, "abc"),
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_read_u64_empty() {
        assert!(read_u64(&mut "".as_bytes()).is_err());
    }

    #[test]
    fn test_read_u64_list_preserves_order() {
        let values = read_u64_list(&mut "300 100 200\n".as_bytes()).unwrap();
        assert_eq!(values, vec![300, 100, 200]);
    }

    #[test]
    fn test_read_u64_list_empty_line() {
        let values = read_u64_list(&mut "\n".as_bytes()).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn test_read_u64_list_invalid_value() {
        let err = read_u64_list(&mut "100 x 200\n".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_parse_empty_cpuacct_stat() {
        let stat = CpuAcctStat::from_reader(&mut "".as_bytes()).unwrap();
        assert_eq!(stat, CpuAcctStat::default());
    }

    #[test]
    fn test_parse_complete_cpuacct_stat() {
        let data = "\
user 419230
system 202701
";
        let stat = CpuAcctStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat.user, 419_230);
        assert_eq!(stat.system, 202_701);
    }

    #[test]
    fn test_parse_cpuacct_stat_ignores_unknown_keys() {
        let data = "\
nice 5
user 100
steal 7
system 50
";
        let stat = CpuAcctStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat.user, 100);
        assert_eq!(stat.system, 50);
    }

    #[test]
    fn test_parse_cpuacct_stat_duplicate_key_errors() {
        let data = "\
user 100
user 200
";
        let err = CpuAcctStat::from_reader(&mut data.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        match extract_stat_parse_error(&err) {
            StatParseError::DuplicateField { field, line } => {
                assert_eq!(field, "user");
                assert_eq!(*line, 2);
            }
            other => panic!("expected DuplicateField, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_cpuacct_stat_invalid_value() {
        let data = "\
user abc
system 50
";
        let err = CpuAcctStat::from_reader(&mut data.as_bytes()).unwrap_err();
        match extract_stat_parse_error(&err) {
            StatParseError::InvalidKeyValue {
                key, value, line, ..
            } => {
                assert_eq!(key, "user");
                assert_eq!(value, "abc");
                assert_eq!(*line, 1);
            }
            other => panic!("expected InvalidKeyValue, got {other:?}"),
        }
    }

    #[test]
    fn test_delta_since_totals() {
        let previous = CpuUsage {
            total_usage: 1000,
            percpu_usage: vec![600, 400],
            user_usage: 70,
            system_usage: 30,
        };
        let current = CpuUsage {
            total_usage: 1500,
            percpu_usage: vec![900, 600],
            user_usage: 105,
            system_usage: 45,
        };

        let delta = current.delta_since(&previous);
        assert_eq!(delta.total_usage, 500);
        assert_eq!(delta.percpu_usage, vec![300, 200]);
        assert_eq!(delta.user_usage, 35);
        assert_eq!(delta.system_usage, 15);
    }

    #[test]
    fn test_delta_since_preserves_percpu_order() {
        let previous = CpuUsage {
            percpu_usage: vec![100, 500],
            ..CpuUsage::default()
        };
        let current = CpuUsage {
            percpu_usage: vec![400, 505],
            ..CpuUsage::default()
        };

        let delta = current.delta_since(&previous);
        assert_eq!(delta.percpu_usage, vec![300, 5]);
    }

    #[test]
    fn test_delta_since_grown_percpu_list() {
        let previous = CpuUsage {
            percpu_usage: vec![100],
            ..CpuUsage::default()
        };
        let current = CpuUsage {
            percpu_usage: vec![150, 70],
            ..CpuUsage::default()
        };

        let delta = current.delta_since(&previous);
        assert_eq!(delta.percpu_usage, vec![50, 70]);
    }

    #[test]
    fn test_delta_since_saturates_at_zero() {
        let previous = CpuUsage {
            total_usage: 1000,
            percpu_usage: vec![1000],
            user_usage: 100,
            system_usage: 100,
        };
        let current = CpuUsage {
            total_usage: 900,
            percpu_usage: vec![800],
            user_usage: 90,
            system_usage: 110,
        };

        let delta = current.delta_since(&previous);
        assert_eq!(delta.total_usage, 0);
        assert_eq!(delta.percpu_usage, vec![0]);
        assert_eq!(delta.user_usage, 0);
        assert_eq!(delta.system_usage, 10);
    }
}
