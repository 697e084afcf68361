use std::fmt::Write;
use std::net::IpAddr;
use std::path::Path;
use std::path::PathBuf;

use crate::constants::SERVER_CONFIG_FILE;
use crate::constants::SERVER_LOG_FILE;
use crate::ClusterConfig;

/// Everything needed to start one cluster node. Each node gets its own
/// working directory so config, log and cluster state files never collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLaunchConfig {
    pub port: u16,
    pub bind_host: IpAddr,
    pub work_dir: PathBuf,
    pub node_timeout_ms: u64,
    pub extra_directives: Vec<String>,
}

impl NodeLaunchConfig {
    /// Node on `port` living in `<cluster_dir>/node-<port>`
    pub fn for_port(
        port: u16,
        cluster_dir: &Path,
        config: &ClusterConfig,
    ) -> Self {
        Self {
            port,
            bind_host: config.bind_host,
            work_dir: cluster_dir.join(format!("node-{port}")),
            node_timeout_ms: config.node_timeout_ms,
            extra_directives: config.extra_directives.clone(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.work_dir.join(SERVER_CONFIG_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.work_dir.join(SERVER_LOG_FILE)
    }

    pub fn cluster_config_file(&self) -> String {
        format!("nodes-{}.conf", self.port)
    }

    /// `redis.conf` contents. Paths are relative: the server runs with
    /// `work_dir` as its current directory.
    pub fn render(&self) -> String {
        let mut conf = String::new();
        // writing into a String cannot fail
        let _ = writeln!(conf, "port {}", self.port);
        let _ = writeln!(conf, "bind {}", self.bind_host);
        let _ = writeln!(conf, "protected-mode no");
        let _ = writeln!(conf, "daemonize no");
        let _ = writeln!(conf, "dir ./");
        let _ = writeln!(conf, "cluster-enabled yes");
        let _ = writeln!(conf, "cluster-config-file {}", self.cluster_config_file());
        let _ = writeln!(conf, "cluster-node-timeout {}", self.node_timeout_ms);
        let _ = writeln!(conf, "appendonly no");
        let _ = writeln!(conf, "save \"\"");
        for directive in &self.extra_directives {
            let _ = writeln!(conf, "{directive}");
        }
        conf
    }
}
