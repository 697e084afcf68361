use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use crate::Result;

/// Settings shared by every node the harness launches
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClusterConfig {
    /// Server executable name or path. A bare name is resolved through `PATH`;
    /// `.exe` is appended on Windows.
    #[serde(default = "default_server_binary")]
    pub server_binary: String,

    /// Address every node binds to and announces in `CLUSTER MEET`
    #[serde(default = "default_bind_host")]
    pub bind_host: IpAddr,

    /// Parent of the per-cluster temporary working directory
    #[serde(default = "default_work_root")]
    pub work_root: PathBuf,

    /// `cluster-node-timeout` written into every node config (milliseconds)
    #[serde(default = "default_node_timeout_ms")]
    pub node_timeout_ms: u64,

    /// Extra `redis.conf` directives appended verbatim to every node config
    #[serde(default)]
    pub extra_directives: Vec<String>,

    /// Upper bound on ephemeral port discovery rounds
    #[serde(default = "default_max_ephemeral_attempts")]
    pub max_ephemeral_attempts: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            server_binary: default_server_binary(),
            bind_host: default_bind_host(),
            work_root: default_work_root(),
            node_timeout_ms: default_node_timeout_ms(),
            extra_directives: vec![],
            max_ephemeral_attempts: default_max_ephemeral_attempts(),
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.server_binary.trim().is_empty() {
            return Err(invalid("server_binary cannot be empty".into()));
        }

        if self.bind_host.is_unspecified() {
            return Err(invalid(format!(
                "bind_host {} cannot be announced to peers; use a concrete address",
                self.bind_host
            )));
        }

        if self.work_root.as_os_str().is_empty() {
            return Err(invalid("work_root path cannot be empty".into()));
        }

        if self.node_timeout_ms == 0 {
            return Err(invalid("node_timeout_ms must be greater than 0".into()));
        }

        if self.max_ephemeral_attempts == 0 {
            return Err(invalid(
                "max_ephemeral_attempts must be greater than 0".into(),
            ));
        }

        if let Some(d) = self.extra_directives.iter().find(|d| d.contains('\n')) {
            return Err(invalid(format!(
                "extra directive {d:?} must be a single line"
            )));
        }

        Ok(())
    }
}

fn default_server_binary() -> String {
    "redis-server".to_string()
}
fn default_bind_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}
fn default_work_root() -> PathBuf {
    std::env::temp_dir()
}
fn default_node_timeout_ms() -> u64 {
    5000
}
fn default_max_ephemeral_attempts() -> usize {
    64
}
