use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Child;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::NodeLaunchConfig;
use super::ProcessHandle;
use super::ProcessLauncher;
use crate::ClusterConfig;
use crate::LifecycleError;
use crate::Platform;
use crate::Result;

/// How long `stop` waits for a killed process to be reaped
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Spawns `redis-server <work_dir>/redis.conf` with stdout and stderr
/// captured into `<work_dir>/server.log`.
#[derive(Debug, Clone)]
pub struct RedisServerLauncher {
    binary: PathBuf,
}

impl RedisServerLauncher {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Binary named by the config, adjusted to the platform's executable naming
    pub fn from_config(
        config: &ClusterConfig,
        platform: &Platform,
    ) -> Self {
        Self::new(platform.executable_name(&config.server_binary))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl ProcessLauncher for RedisServerLauncher {
    async fn launch(
        &self,
        node: &NodeLaunchConfig,
    ) -> Result<Box<dyn ProcessHandle>> {
        fs::create_dir_all(&node.work_dir).await?;
        fs::write(node.config_path(), node.render()).await?;

        let log = std::fs::File::create(node.log_path())?;
        let log_err = log.try_clone()?;

        let child = Command::new(&self.binary)
            .arg(node.config_path())
            .current_dir(&node.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LifecycleError::Launch {
                port: node.port,
                source,
            })?;

        info!(port = node.port, pid = ?child.id(), binary = %self.binary.display(), "server launched");
        Ok(Box::new(RedisServerProcess {
            port: node.port,
            child,
        }))
    }
}

/// A running `redis-server`. Dropping the handle kills the process.
#[derive(Debug)]
pub struct RedisServerProcess {
    port: u16,
    child: Child,
}

#[async_trait]
impl ProcessHandle for RedisServerProcess {
    fn port(&self) -> u16 {
        self.port
    }

    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    async fn stop(&mut self) -> Result<()> {
        if let Ok(Some(status)) = self.child.try_wait() {
            debug!(port = self.port, %status, "server already exited");
            return Ok(());
        }

        if let Err(e) = self.child.start_kill() {
            // InvalidInput: the process was already reaped
            if e.kind() != ErrorKind::InvalidInput {
                return Err(e.into());
            }
        }

        match timeout(REAP_TIMEOUT, self.child.wait()).await {
            Ok(Ok(status)) => debug!(port = self.port, %status, "server stopped"),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => warn!(port = self.port, "server did not exit within {:?}", REAP_TIMEOUT),
        }
        Ok(())
    }
}

/// Last `lines` lines of a node log, for error reports. Missing files read as empty.
pub async fn read_log_tail(
    path: &Path,
    lines: usize,
) -> String {
    match fs::read_to_string(path).await {
        Ok(content) => {
            let all: Vec<&str> = content.lines().collect();
            all[all.len().saturating_sub(lines)..].join("\n")
        }
        Err(_) => String::new(),
    }
}
