//! dockmon: a host agent reporting per-container CPU usage deltas.
//!
//! The agent discovers running Docker containers purely through the
//! Linux cgroup v1 filesystem, with no container runtime API involved,
//! and samples each container's cumulative CPU counters on a fixed
//! cadence. Every sample past a container's first yields the counter
//! increase since the previous one, emitted as a JSON line on stdout.
//!
//! The discovery chain: the kernel's subsystem table (`/proc/cgroups`)
//! and the process's mount table (`/proc/self/mountinfo`) resolve into
//! per-subsystem cgroup mount paths; the `docker` directory beneath any
//! enabled subsystem names the running containers; and each container's
//! `cpuacct` control files provide the counters.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub mod cgroup;
pub mod container;
pub mod discovery;
pub mod fsutil;
pub mod mountinfo;
pub mod poller;

use poller::Poller;

/// Default location of the kernel's cgroup subsystem table.
pub const PROC_CGROUPS: &str = "/proc/cgroups";
/// Default location of the calling process's mount table.
pub const PROC_SELF_MOUNTINFO: &str = "/proc/self/mountinfo";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
const DEFAULT_CYCLE_TIMEOUT_SECS: u64 = 10;

/// Runs the dockmon agent until interrupted.
///
/// Wires the poll loop to a consumer task that serializes each sample
/// entry to one JSON line on stdout. Configuration comes from the
/// environment:
///
/// - `DOCKMON_PROC_CGROUPS` — subsystem table path (default
///   `/proc/cgroups`).
/// - `DOCKMON_PROC_MOUNTINFO` — mount table path (default
///   `/proc/self/mountinfo`).
/// - `DOCKMON_POLL_INTERVAL_SECS` — sampling cadence in seconds
///   (default 3, minimum 1).
/// - `DOCKMON_CYCLE_TIMEOUT_SECS` — per-cycle budget in seconds
///   (default 10, minimum 1).
///
/// # Errors
///
/// Returns an error if the interrupt handler cannot be installed or the
/// poll task panics. Poll cycle failures are not fatal; they are logged
/// and retried on the next tick.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let proc_cgroups = std::env::var_os("DOCKMON_PROC_CGROUPS")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(PROC_CGROUPS));
    let proc_mountinfo = std::env::var_os("DOCKMON_PROC_MOUNTINFO")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(PROC_SELF_MOUNTINFO));
    let interval = Duration::from_secs(
        env_u64("DOCKMON_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS).max(1),
    );
    let cycle_timeout = Duration::from_secs(
        env_u64("DOCKMON_CYCLE_TIMEOUT_SECS", DEFAULT_CYCLE_TIMEOUT_SECS).max(1),
    );
    log::debug!("Subsystem table: {}", proc_cgroups.display());
    log::debug!("Mount table: {}", proc_mountinfo.display());
    log::debug!("Polling every {interval:?} with a {cycle_timeout:?} cycle budget");

    let resolver = Arc::new(cgroup::Resolver::new(proc_cgroups, proc_mountinfo));
    let monitor = Arc::new(cgroup::Monitor::default());

    let (tx, mut rx) = tokio::sync::mpsc::channel::<Vec<cgroup::stats::CpuSampleEntry>>(10);
    tokio::spawn(async move {
        use std::io::Write;
        while let Some(entries) = rx.recv().await {
            let stdout = std::io::stdout();
            let mut stdout = stdout.lock();
            for entry in &entries {
                match serde_json::to_string(entry) {
                    Ok(json) => {
                        if let Err(err) = writeln!(stdout, "{json}") {
                            log::error!("failed to write sample entry: {}", err);
                        }
                    }
                    Err(err) => log::error!("failed to serialize sample entry: {}", err),
                }
            }
        }
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let poll_task = tokio::spawn(
        Poller::new(resolver, monitor, interval, cycle_timeout).run(tx, shutdown_rx),
    );

    let signal = tokio::signal::ctrl_c().await;
    match &signal {
        Ok(()) => log::info!("Received interrupt, shutting down"),
        Err(err) => log::error!("Failed to listen for shutdown signal: {}", err),
    }
    let _ = shutdown_tx.send(true);
    poll_task.await?;
    signal?;

    Ok(())
}

fn env_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid `{key}` value `{raw}`, using {default}");
            default
        }),
        Err(_) => default,
    }
}
