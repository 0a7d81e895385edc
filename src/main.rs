/// Entry point for the dockmon container CPU monitoring agent.
///
/// This binary discovers running Docker containers through the cgroup v1
/// filesystem, samples their CPU accounting counters on a fixed cadence,
/// and emits per-container usage deltas as JSON lines on stdout.
///
/// # Errors
///
/// Returns an error if the shutdown signal handler cannot be installed.
/// Monitoring failures never abort the process; they are logged and
/// retried.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=info DOCKMON_POLL_INTERVAL_SECS=3 cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    dockmon::run().await
}
