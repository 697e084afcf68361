use std::collections::HashSet;

use embedded_redis_cluster::constants::DEFAULT_REPLICA_PORT_OFFSET;
use embedded_redis_cluster::ClusterState;
use embedded_redis_cluster::RedisCluster;
use serial_test::serial;

use crate::common::config_if_server_installed;
use crate::common::ephemeral_three_group_spec;
use crate::common::set_and_get;

#[tokio::test]
#[serial]
async fn test_ephemeral_cluster_converges() {
    crate::enable_logger();
    let Some(config) = config_if_server_installed() else {
        return;
    };

    let mut cluster = RedisCluster::new(ephemeral_three_group_spec(), config).unwrap();
    cluster.start().await.expect("cluster should start");

    let ports = cluster.ephemeral_ports().expect("ephemeral mode");
    assert_eq!(ports.len(), 6);
    assert_eq!(ports.iter().collect::<HashSet<_>>().len(), 6);
    for pair in ports.chunks(2) {
        assert_eq!(pair[1], pair[0] + DEFAULT_REPLICA_PORT_OFFSET);
    }

    cluster.verify_topology(None).await.expect("converged as planned");
    assert_eq!(set_and_get(&cluster, "foo", "bar").await.as_deref(), Some("bar"));

    cluster.stop().await;
    assert_eq!(cluster.state(), ClusterState::Stopped);
}

#[tokio::test]
#[serial]
async fn test_two_ephemeral_clusters_side_by_side() {
    crate::enable_logger();
    let Some(config) = config_if_server_installed() else {
        return;
    };

    let mut first = RedisCluster::new(ephemeral_three_group_spec(), config.clone()).unwrap();
    let mut second = RedisCluster::new(ephemeral_three_group_spec(), config).unwrap();
    first.start().await.expect("first cluster");
    second.start().await.expect("second cluster");

    let a: HashSet<u16> = first.ports().iter().copied().collect();
    assert!(second.ports().iter().all(|p| !a.contains(p)));

    first.stop().await;
    second.stop().await;
}
