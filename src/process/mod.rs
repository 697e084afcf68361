//! Launching and supervising single server processes.
//!
//! The orchestrator only sees the [`ProcessLauncher`] and [`ProcessHandle`]
//! traits; [`RedisServerLauncher`] is the implementation that spawns real
//! `redis-server` binaries.
mod node_config;
mod redis_server;
pub use node_config::*;
pub use redis_server::*;


use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Writes the node configuration and starts one server bound to `node.port`.
    async fn launch(
        &self,
        node: &NodeLaunchConfig,
    ) -> Result<Box<dyn ProcessHandle>>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProcessHandle: Send {
    fn port(&self) -> u16;

    fn pid(&self) -> Option<u32>;

    /// False once the process exited, whatever the reason.
    fn is_alive(&mut self) -> bool;

    /// Kills the process and reaps it. Stopping an already dead process is
    /// not an error.
    async fn stop(&mut self) -> Result<()>;
}
