use std::path::Path;

use embedded_redis_cluster::ClusterSpec;
use embedded_redis_cluster::Error;
use embedded_redis_cluster::HarnessConfig;
use embedded_redis_cluster::ProtocolError;
use embedded_redis_cluster::RedisCluster;
use embedded_redis_cluster::RespValue;
use tracing::debug;
use tracing::warn;

/// Redirects followed by [`set_and_get`] before giving up
const MAX_REDIRECTS: usize = 5;

/// Harness config from the environment, or `None` when the configured server
/// binary is not installed.
pub fn config_if_server_installed() -> Option<HarnessConfig> {
    let config = match HarnessConfig::new() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "cannot load harness config");
            return None;
        }
    };

    if binary_exists(&config.cluster.server_binary) {
        Some(config)
    } else {
        warn!(binary = %config.cluster.server_binary, "server binary not found; skipping");
        None
    }
}

fn binary_exists(binary: &str) -> bool {
    let path = Path::new(binary);
    if path.components().count() > 1 {
        return path.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(binary).is_file()))
        .unwrap_or(false)
}

/// 7001/8001, 7002/8002, 7003/8003
pub fn fixed_three_group_spec() -> ClusterSpec {
    ClusterSpec::builder()
        .server_ports([7001, 8001])
        .replication_group("master1", 1)
        .server_ports([7002, 8002])
        .replication_group("master2", 1)
        .server_ports([7003, 8003])
        .replication_group("master3", 1)
        .build()
        .expect("valid spec")
}

pub fn ephemeral_three_group_spec() -> ClusterSpec {
    ClusterSpec::builder()
        .ephemeral()
        .replication_group("master1", 1)
        .replication_group("master2", 1)
        .replication_group("master3", 1)
        .build()
        .expect("valid spec")
}

/// Sends `args` to `port`, following `MOVED` redirects to the slot owner.
pub async fn execute_following_redirects(
    cluster: &RedisCluster,
    mut port: u16,
    args: Vec<String>,
) -> Result<RespValue, Error> {
    for _ in 0..MAX_REDIRECTS {
        match cluster.execute(port, args.clone()).await {
            Err(Error::Protocol(ProtocolError::ErrorReply { message, .. })) if message.starts_with("MOVED") => {
                port = moved_target(&message).expect("MOVED reply names a target");
                debug!(port, "following redirect");
            }
            other => return other,
        }
    }
    panic!("too many redirects for {args:?}");
}

/// `MOVED 12182 127.0.0.1:7002` -> 7002
fn moved_target(message: &str) -> Option<u16> {
    message.split_whitespace().nth(2)?.rsplit_once(':')?.1.parse().ok()
}

/// SET then GET through the cluster, returning what GET read back.
pub async fn set_and_get(
    cluster: &RedisCluster,
    key: &str,
    value: &str,
) -> Option<String> {
    let entry = cluster.ports()[0];
    let set = execute_following_redirects(cluster, entry, vec!["SET".into(), key.into(), value.into()])
        .await
        .expect("SET succeeds");
    assert_eq!(set, RespValue::Simple("OK".into()));

    execute_following_redirects(cluster, entry, vec!["GET".into(), key.into()])
        .await
        .expect("GET succeeds")
        .as_text()
}

#[test]
fn test_moved_target() {
    assert_eq!(moved_target("MOVED 12182 127.0.0.1:7002"), Some(7002));
    assert_eq!(moved_target("MOVED 12182"), None);
}
