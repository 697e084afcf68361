use embedded_redis_cluster::constants::DEFAULT_REPLICA_PORT_OFFSET;
use embedded_redis_cluster::constants::DEFAULT_ROLE_PORT_BOUNDARY;
use embedded_redis_cluster::ClusterSpec;
use embedded_redis_cluster::ClusterState;
use embedded_redis_cluster::RedisCluster;
use serial_test::serial;

use crate::common::config_if_server_installed;
use crate::common::fixed_three_group_spec;
use crate::common::set_and_get;

/// Three masters on 7001-7003, one replica each on 8001-8003
#[tokio::test]
#[serial]
async fn test_fixed_port_cluster_set_and_get() {
    crate::enable_logger();
    let Some(config) = config_if_server_installed() else {
        return;
    };

    let mut cluster = RedisCluster::new(fixed_three_group_spec(), config).unwrap();
    cluster.start().await.expect("cluster should start");

    assert_eq!(cluster.state(), ClusterState::Running);
    assert_eq!(cluster.ports(), &[7001, 8001, 7002, 8002, 7003, 8003]);
    assert_eq!(cluster.ephemeral_ports(), None);

    for i in 0..10 {
        let key = format!("key-{i}");
        let value = format!("value-{i}");
        assert_eq!(set_and_get(&cluster, &key, &value).await.as_deref(), Some(value.as_str()));
    }

    cluster.stop().await;
}

#[tokio::test]
#[serial]
async fn test_roles_follow_port_magnitude() {
    crate::enable_logger();
    let Some(config) = config_if_server_installed() else {
        return;
    };

    let mut cluster = RedisCluster::new(fixed_three_group_spec(), config).unwrap();
    cluster.start().await.expect("cluster should start");

    cluster
        .verify_topology(Some(DEFAULT_ROLE_PORT_BOUNDARY))
        .await
        .expect("ports above 8000 are replicas");

    let nodes = cluster.node_table().await.unwrap();
    let ids = embedded_redis_cluster::node_id_to_port(&nodes);
    assert_eq!(nodes.len(), 6);
    for node in &nodes {
        if node.port > DEFAULT_ROLE_PORT_BOUNDARY {
            assert!(node.is_replica(), "{node:?}");
            let master_id = node.master_id.as_ref().expect("replica has a master");
            assert_eq!(ids[master_id], node.port - DEFAULT_REPLICA_PORT_OFFSET);
        } else {
            assert!(node.is_master(), "{node:?}");
            assert!(!node.slot_ranges.is_empty());
        }
    }

    let status = cluster.status().await;
    assert_eq!(status.alive_nodes, 6);
    assert_eq!(status.reachable_masters, 3);
    assert!(status.has_quorum);

    cluster.stop().await;
}

#[tokio::test]
#[serial]
async fn test_stop_twice_leaves_nothing_running() {
    crate::enable_logger();
    let Some(config) = config_if_server_installed() else {
        return;
    };

    let mut cluster = RedisCluster::new(fixed_three_group_spec(), config.clone()).unwrap();
    cluster.start().await.expect("cluster should start");
    let work_dir = cluster.work_dir().unwrap().to_path_buf();

    cluster.stop().await;
    cluster.stop().await;

    assert_eq!(cluster.state(), ClusterState::Stopped);
    assert!(!work_dir.exists());
    assert_eq!(cluster.status().await.alive_nodes, 0);

    // every port is free again: a second cluster can take them over
    let mut again = RedisCluster::new(fixed_three_group_spec(), config).unwrap();
    again.start().await.expect("ports were released");
    again.stop().await;
}

#[test]
fn test_short_port_list_is_invalid_spec() {
    let err = ClusterSpec::builder()
        .server_ports([7001])
        .replication_group("master1", 1)
        .build()
        .unwrap_err();

    assert!(err.is_invalid_spec(), "{err}");
}
