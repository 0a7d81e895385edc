//! The poll loop driving discovery and sampling.
//!
//! Every tick runs one cycle: resolve subsystem mounts (cached), list the
//! running containers, reconcile the sampler registry, then sample every
//! container. Cycles run on a blocking thread and are bounded by a
//! timeout; a failed or expired cycle is logged and the loop carries on
//! with the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::cgroup::stats::CpuSampleEntry;
use crate::cgroup::{CgroupPaths, CpuSampler, Monitor, Resolver, resolver};
use crate::container::ContainerID;
use crate::discovery;

/// Errors that abort a single poll cycle.
///
/// None of them is fatal to the agent: the loop logs the error,
/// invalidates the resolver cache and retries on the next tick.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Resolve(#[from] resolver::Error),
    #[error(transparent)]
    Discovery(#[from] discovery::Error),
}

/// Runs one full discovery-and-sampling cycle.
///
/// Newly discovered containers get a sampler registered; samplers of
/// vanished containers are dropped; every remaining sampler is updated
/// and each computed delta becomes one entry of the result. The first
/// cycle after a container appears only establishes its baseline, so the
/// container contributes no entry yet.
///
/// # Errors
///
/// Returns a [`CycleError`] when path resolution or container discovery
/// fails. The resolver cache is invalidated first, so the next cycle
/// re-reads the proc tables. Per-container sampling failures are not
/// cycle errors; they are logged and the container stays tracked.
pub fn run_cycle(
    resolver: &Resolver,
    monitor: &Monitor,
    timestamp: u64,
) -> Result<Vec<CpuSampleEntry>, CycleError> {
    let containers = discover(resolver, monitor).inspect_err(|_| resolver.invalidate())?;
    monitor.retain_discovered(&containers);

    let mut entries = Vec::with_capacity(monitor.size());
    monitor.sample_all(timestamp, &mut entries);
    Ok(entries)
}

/// Brings the monitor's registry up to date with the discovered
/// container set.
fn discover(resolver: &Resolver, monitor: &Monitor) -> Result<Vec<ContainerID>, CycleError> {
    let resolved = resolver.subsystem_paths()?;
    let containers = discovery::list_containers(&resolved)?;
    for container_id in &containers {
        if !monitor.contains(container_id) {
            log::debug!(
                target: "poller",
                "tracking new container: container_id={container_id}"
            );
            let paths = CgroupPaths::for_container(&resolved, container_id);
            monitor.register(container_id.clone(), CpuSampler::new(paths));
        }
    }

    Ok(containers)
}

/// Drives [`run_cycle`] on a fixed cadence until shut down.
pub struct Poller {
    resolver: Arc<Resolver>,
    monitor: Arc<Monitor>,
    interval: Duration,
    cycle_timeout: Duration,
}

impl Poller {
    pub fn new(
        resolver: Arc<Resolver>,
        monitor: Arc<Monitor>,
        interval: Duration,
        cycle_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            monitor,
            interval,
            cycle_timeout,
        }
    }

    /// Runs the poll loop until the shutdown signal fires or the entry
    /// consumer goes away.
    ///
    /// Each cycle executes on a blocking thread via
    /// [`tokio::task::spawn_blocking`] and is bounded by the cycle
    /// timeout; an expired cycle is abandoned with a warning. Non-empty
    /// entry batches are sent through `tx`.
    pub async fn run(
        self,
        tx: mpsc::Sender<Vec<CpuSampleEntry>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(self.interval);
        // A cycle may outlast the interval; missed ticks must not burst.
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => {
                    log::info!("poll loop stopping");
                    return;
                }
            }

            let timestamp = unix_timestamp();
            let resolver = Arc::clone(&self.resolver);
            let monitor = Arc::clone(&self.monitor);
            let cycle =
                tokio::task::spawn_blocking(move || run_cycle(&resolver, &monitor, timestamp));

            let entries = match tokio::time::timeout(self.cycle_timeout, cycle).await {
                Ok(Ok(Ok(entries))) => entries,
                Ok(Ok(Err(err))) => {
                    log::error!("poll cycle failed: {err}");
                    continue;
                }
                Ok(Err(join_err)) => {
                    log::error!("poll cycle panicked: {join_err}");
                    continue;
                }
                Err(_) => {
                    log::warn!(
                        "poll cycle exceeded its {:?} budget, skipping",
                        self.cycle_timeout
                    );
                    continue;
                }
            };

            if entries.is_empty() {
                continue;
            }
            if tx.send(entries).await.is_err() {
                log::info!("sample consumer dropped, poll loop stopping");
                return;
            }
        }
    }
}

fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const RAW_ID: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    /// A fake host: one cpuacct subsystem mount with a docker directory,
    /// plus matching proc tables.
    struct World {
        dir: TempDir,
        proc_cgroups: PathBuf,
        proc_mountinfo: PathBuf,
    }

    impl World {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mount = dir.path().join("cgroup").join("cpuacct");
            std::fs::create_dir_all(mount.join("docker")).unwrap();

            let proc_cgroups = dir.path().join("cgroups");
            std::fs::write(
                &proc_cgroups,
                "#subsys_name hierarchy num_cgroups enabled\ncpuacct 1 3 1\n",
            )
            .unwrap();

            let proc_mountinfo = dir.path().join("mountinfo");
            std::fs::write(
                &proc_mountinfo,
                format!(
                    "22 1 0:21 / / rw - ext4 /dev/sda1 rw\n\
                     30 22 0:26 / {} rw - cgroup cgroup rw,cpuacct\n",
                    mount.display()
                ),
            )
            .unwrap();

            Self {
                dir,
                proc_cgroups,
                proc_mountinfo,
            }
        }

        fn resolver(&self) -> Resolver {
            Resolver::new(&self.proc_cgroups, &self.proc_mountinfo)
        }

        fn container_dir(&self) -> PathBuf {
            self.dir
                .path()
                .join("cgroup")
                .join("cpuacct")
                .join("docker")
                .join(RAW_ID)
        }

        fn spawn_container(&self, usage: &str, percpu: &str, stat: &str) {
            std::fs::create_dir_all(self.container_dir()).unwrap();
            self.write_counters(usage, percpu, stat);
        }

        fn write_counters(&self, usage: &str, percpu: &str, stat: &str) {
            let dir = self.container_dir();
            write_counter_files(&dir, usage, percpu, stat);
        }

        fn remove_container(&self) {
            std::fs::remove_dir_all(self.container_dir()).unwrap();
        }
    }

    fn write_counter_files(dir: &Path, usage: &str, percpu: &str, stat: &str) {
        std::fs::write(dir.join("cpuacct.usage"), usage).unwrap();
        std::fs::write(dir.join("cpuacct.usage_percpu"), percpu).unwrap();
        std::fs::write(dir.join("cpuacct.stat"), stat).unwrap();
    }

    #[test]
    fn test_cycle_tracks_samples_and_forgets_containers() {
        let world = World::new();
        world.spawn_container("1000\n", "600 400\n", "user 70\nsystem 30\n");
        let resolver = world.resolver();
        let monitor = Monitor::default();

        // First cycle discovers the container and establishes a baseline.
        let entries = run_cycle(&resolver, &monitor, 100).unwrap();
        assert!(entries.is_empty());
        assert_eq!(monitor.size(), 1);

        // Second cycle reports the counter increase.
        world.write_counters("1500\n", "900 600\n", "user 105\nsystem 45\n");
        let entries = run_cycle(&resolver, &monitor, 103).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].timestamp(), 103);
        assert_eq!(entries[0].container_id().as_str(), RAW_ID);
        assert_eq!(entries[0].delta().total_usage, 500);
        assert_eq!(entries[0].delta().percpu_usage, vec![300, 200]);

        // Removing the container drops its sampler on the next cycle.
        world.remove_container();
        let entries = run_cycle(&resolver, &monitor, 106).unwrap();
        assert!(entries.is_empty());
        assert!(monitor.is_empty());
    }

    #[test]
    fn test_cycle_with_no_containers_is_ok() {
        let world = World::new();
        let resolver = world.resolver();
        let monitor = Monitor::default();

        let entries = run_cycle(&resolver, &monitor, 100).unwrap();
        assert!(entries.is_empty());
        assert!(monitor.is_empty());
    }

    #[test]
    fn test_cycle_error_when_proc_tables_missing() {
        let resolver = Resolver::new("/definitely/missing/cgroups", "/definitely/missing/mountinfo");
        let monitor = Monitor::default();

        let err = run_cycle(&resolver, &monitor, 100).unwrap_err();
        assert!(matches!(err, CycleError::Resolve(_)));
    }

    #[test]
    fn test_failing_container_keeps_baseline_across_cycles() {
        let world = World::new();
        world.spawn_container("1000\n", "1000\n", "user 70\nsystem 30\n");
        let resolver = world.resolver();
        let monitor = Monitor::default();
        run_cycle(&resolver, &monitor, 100).unwrap();

        // A malformed counter fails this container's sample; the cycle
        // itself still succeeds and the container stays tracked.
        std::fs::write(world.container_dir().join("cpuacct.usage"), "garbage\n").unwrap();
        let entries = run_cycle(&resolver, &monitor, 103).unwrap();
        assert!(entries.is_empty());
        assert_eq!(monitor.size(), 1);

        // Recovery produces a delta spanning back to the retained
        // baseline.
        world.write_counters("1800\n", "1800\n", "user 130\nsystem 50\n");
        let entries = run_cycle(&resolver, &monitor, 106).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].delta().total_usage, 800);
    }

    #[tokio::test]
    async fn test_poller_stops_on_shutdown_signal() {
        let world = World::new();
        let resolver = Arc::new(world.resolver());
        let monitor = Arc::new(Monitor::default());
        let poller = Poller::new(
            resolver,
            monitor,
            Duration::from_millis(10),
            Duration::from_secs(1),
        );

        let (tx, _rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(poller.run(tx, shutdown_rx));

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("poll loop should stop promptly")
            .unwrap();
    }
}
