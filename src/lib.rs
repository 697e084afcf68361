//! Disposable Redis clusters for integration tests.
//!
//! Describe replication groups with [`ClusterSpec::builder`], hand the spec to
//! [`RedisCluster`], and `start` it: the harness allocates ports, launches one
//! `redis-server` per node, joins them into a cluster, assigns hash slots,
//! configures replication and waits until the cluster reports itself healthy.
//! `stop` kills every node and removes all files the cluster created.
mod cluster;
mod config;
mod errors;
mod platform;
mod ports;
mod process;
mod protocol;
mod spec;
mod topology;
mod verifier;

pub mod constants;
pub mod utils;

pub use cluster::*;
pub use config::*;
pub use errors::*;
pub use platform::*;
pub use ports::*;
pub use process::*;
pub use protocol::*;
pub use spec::*;
pub use topology::*;
pub use verifier::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
