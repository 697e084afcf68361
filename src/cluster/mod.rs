//! Cluster lifecycle: bring a formation plan to life, watch it converge, tear
//! it down.
mod redis_cluster;
pub use redis_cluster::*;


use std::fmt;

/// Lifecycle of a [`RedisCluster`]. A handle only moves forward; a stopped
/// cluster is never restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    NotStarted,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl ClusterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterState::NotStarted => "NotStarted",
            ClusterState::Starting => "Starting",
            ClusterState::Running => "Running",
            ClusterState::Stopping => "Stopping",
            ClusterState::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for ClusterState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time health summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterStatus {
    pub state: ClusterState,
    /// Node processes still running
    pub alive_nodes: usize,
    /// Masters answering `PING`
    pub reachable_masters: usize,
    pub quorum: usize,
    pub has_quorum: bool,
}
