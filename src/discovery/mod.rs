//! Container discovery mechanisms.
//!
//! The agent never talks to a container runtime API; [`docker`] finds
//! running containers purely through the cgroup filesystem.

pub mod docker;

pub use docker::{DOCKER_DIR, Error, Result, list_containers};
