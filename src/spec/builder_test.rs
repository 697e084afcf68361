use super::*;
use crate::Error;

fn invalid_spec_message(result: crate::Result<ClusterSpec>) -> String {
    match result {
        Err(Error::InvalidSpec(message)) => message,
        other => panic!("expected InvalidSpec, got {other:?}"),
    }
}

#[test]
fn test_fixed_spec_with_three_groups() {
    let spec = ClusterSpec::builder()
        .server_ports([7001, 8001])
        .replication_group("master1", 1)
        .server_ports([7002, 8002])
        .replication_group("master2", 1)
        .server_ports([7003, 8003])
        .replication_group("master3", 1)
        .build()
        .expect("valid spec");

    assert_eq!(spec.mode(), PortMode::Fixed);
    assert_eq!(spec.master_count(), 3);
    assert_eq!(spec.replica_count(), 3);
    assert_eq!(spec.node_count(), 6);
    assert_eq!(spec.quorum(), 2);
    assert_eq!(
        spec.fixed_ports(),
        Some(vec![7001, 8001, 7002, 8002, 7003, 8003])
    );
    assert_eq!(spec.groups()[1].name(), "master2");
    assert_eq!(spec.groups()[1].fixed_ports(), Some(&[7002, 8002][..]));
}

#[test]
fn test_ephemeral_spec() {
    let spec = ClusterSpec::builder()
        .ephemeral()
        .replication_group("master1", 1)
        .replication_group("master2", 1)
        .replication_group("master3", 1)
        .build()
        .expect("valid spec");

    assert!(spec.is_ephemeral());
    assert_eq!(spec.node_count(), 6);
    assert_eq!(spec.fixed_ports(), None);
    assert!(spec.groups().iter().all(|g| g.fixed_ports().is_none()));
}

#[test]
fn test_quorum_is_majority_of_masters() {
    let mut builder = ClusterSpec::builder().ephemeral();
    for i in 0..5 {
        builder = builder.replication_group(format!("m{i}"), 0);
    }
    let spec = builder.build().unwrap();
    assert_eq!(spec.quorum(), 3);

    let single = ClusterSpec::builder()
        .server_ports([7001])
        .replication_group("solo", 0)
        .build()
        .unwrap();
    assert_eq!(single.quorum(), 1);
    assert_eq!(single.replica_count(), 0);
}

#[test]
fn test_port_list_shorter_than_group_needs() {
    let message = invalid_spec_message(
        ClusterSpec::builder()
            .server_ports([7001])
            .replication_group("master1", 1)
            .build(),
    );
    assert!(message.contains("needs 2 ports, got 1"), "{message}");
}

#[test]
fn test_empty_port_list() {
    let message = invalid_spec_message(
        ClusterSpec::builder()
            .server_ports(Vec::<u16>::new())
            .replication_group("master1", 0)
            .build(),
    );
    assert!(message.contains("zero ports"), "{message}");
}

#[test]
fn test_no_groups() {
    let message = invalid_spec_message(ClusterSpec::builder().build());
    assert!(message.contains("at least one replication group"));
}

#[test]
fn test_group_without_ports_in_fixed_mode() {
    let message = invalid_spec_message(
        ClusterSpec::builder().replication_group("master1", 1).build(),
    );
    assert!(message.contains("has no ports"));
}

#[test]
fn test_mixing_fixed_and_ephemeral() {
    let message = invalid_spec_message(
        ClusterSpec::builder()
            .server_ports([7001, 8001])
            .replication_group("master1", 1)
            .ephemeral()
            .replication_group("master2", 1)
            .build(),
    );
    assert!(message.contains("cannot be mixed"));
}

#[test]
fn test_dangling_server_ports() {
    let message = invalid_spec_message(
        ClusterSpec::builder()
            .server_ports([7001, 8001])
            .replication_group("master1", 1)
            .server_ports([7002, 8002])
            .build(),
    );
    assert!(message.contains("not followed by a replication_group"));
}

#[test]
fn test_server_ports_twice() {
    let message = invalid_spec_message(
        ClusterSpec::builder()
            .server_ports([7001, 8001])
            .server_ports([7002, 8002])
            .replication_group("master1", 1)
            .build(),
    );
    assert!(message.contains("called twice"));
}

#[test]
fn test_port_collision_across_groups() {
    let message = invalid_spec_message(
        ClusterSpec::builder()
            .server_ports([7001, 8001])
            .replication_group("master1", 1)
            .server_ports([7002, 8001])
            .replication_group("master2", 1)
            .build(),
    );
    assert!(message.contains("port 8001 is declared by both master1 and master2"));
}

#[test]
fn test_duplicate_group_names() {
    let message = invalid_spec_message(
        ClusterSpec::builder()
            .server_ports([7001])
            .replication_group("master", 0)
            .server_ports([7002])
            .replication_group("master", 0)
            .build(),
    );
    assert!(message.contains("duplicate replication group name master"));
}

#[test]
fn test_port_zero_is_rejected_in_fixed_mode() {
    let message = invalid_spec_message(
        ClusterSpec::builder()
            .server_ports([0, 8001])
            .replication_group("master1", 1)
            .build(),
    );
    assert!(message.contains("port 0"));
}

#[test]
fn test_strict_port_convention() {
    let ok = ClusterSpec::builder()
        .strict_port_convention()
        .server_ports([7001, 8001, 9001])
        .replication_group("master1", 2)
        .build();
    assert!(ok.is_ok());

    let message = invalid_spec_message(
        ClusterSpec::builder()
            .strict_port_convention()
            .server_ports([7001, 7501])
            .replication_group("master1", 1)
            .build(),
    );
    assert!(message.contains("7501"));
}

#[test]
fn test_custom_offset_is_kept() {
    let spec = ClusterSpec::builder()
        .replica_port_offset(100)
        .strict_port_convention()
        .server_ports([7001, 7101])
        .replication_group("master1", 1)
        .build()
        .unwrap();
    assert_eq!(spec.replica_port_offset(), 100);
    assert!(spec.strict_port_convention());
}

#[test]
fn test_fixed_port_without_room_for_cluster_bus_is_rejected() {
    let message = invalid_spec_message(
        ClusterSpec::builder()
            .server_ports([60001, 61001])
            .replication_group("master1", 1)
            .build(),
    );
    assert!(message.contains("port 60001 of master1 is above 55535"));
    assert!(message.contains("port 61001 of master1 is above 55535"));

    assert!(ClusterSpec::builder()
        .server_ports([54535, 55535])
        .replication_group("master1", 1)
        .build()
        .is_ok());
}

#[test]
fn test_ephemeral_offset_overflow() {
    let message = invalid_spec_message(
        ClusterSpec::builder()
            .ephemeral()
            .replica_port_offset(30000)
            .replication_group("master1", 3)
            .build(),
    );
    assert!(message.contains("exceed the port range"));

    let message = invalid_spec_message(
        ClusterSpec::builder()
            .ephemeral()
            .replica_port_offset(0)
            .replication_group("master1", 1)
            .build(),
    );
    assert!(message.contains("non-zero"));

    // fits in u16 but leaves no room for the cluster bus
    let message = invalid_spec_message(
        ClusterSpec::builder()
            .ephemeral()
            .replica_port_offset(28000)
            .replication_group("master1", 2)
            .build(),
    );
    assert!(message.contains("exceed the port range"));
}

#[test]
fn test_violations_are_reported_together() {
    let message = invalid_spec_message(
        ClusterSpec::builder()
            .server_ports([7001])
            .replication_group("", 1)
            .server_ports([7002, 8002])
            .build(),
    );
    assert!(message.contains("name cannot be empty"));
    assert!(message.contains("needs 2 ports"));
    assert!(message.contains("not followed"));
}

#[test]
fn test_replication_group_port_convention() {
    let group = ReplicationGroup::new("g", 7001, vec![8001, 9001]);
    assert!(group.follows_port_convention(1000));
    assert!(!group.follows_port_convention(500));
    assert_eq!(group.ports().collect::<Vec<_>>(), vec![7001, 8001, 9001]);
    assert_eq!(group.node_count(), 3);

    let near_top = ReplicationGroup::new("g", 65000, vec![65535]);
    assert!(!near_top.follows_port_convention(1000));
}
