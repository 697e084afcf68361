use crate::ClusterSpec;
use crate::FormationPlan;
use crate::NodeRole;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = env_logger::builder().is_test(true).try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
}

/// 7001/8001, 7002/8002, 7003/8003
pub fn three_group_spec() -> ClusterSpec {
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

pub fn three_group_plan() -> FormationPlan {
    let spec = three_group_spec();
    FormationPlan::build(&spec, &spec.fixed_ports().unwrap()).expect("valid plan")
}

/// Deterministic 40 character node id for a port
pub fn node_id_for(port: u16) -> String {
    format!("{port:040x}")
}

/// `CLUSTER NODES` report of a healthy cluster formed exactly as `plan`
/// describes, seen from the node on `myself`.
pub fn converged_node_table(
    plan: &FormationPlan,
    myself: u16,
) -> String {
    plan.nodes()
        .iter()
        .map(|node| {
            let mut flags = String::new();
            if node.port == myself {
                flags.push_str("myself,");
            }
            flags.push_str(node.role.tag());

            let master = node.master_port.map(node_id_for).unwrap_or_else(|| "-".to_string());
            let slots = match node.role {
                NodeRole::Master => plan.slots_of(node.port).map(|r| r.to_string()).unwrap_or_default(),
                NodeRole::Replica => String::new(),
            };
            format!(
                "{} 127.0.0.1:{}@{} {} {} 0 1700000000000 1 connected {}",
                node_id_for(node.port),
                node.port,
                node.port.saturating_add(10000),
                flags,
                master,
                slots
            )
            .trim_end()
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `CLUSTER INFO` report of a healthy cluster with `nodes` members
pub fn ok_cluster_info_report(
    masters: usize,
    nodes: usize,
) -> String {
    format!(
        "cluster_state:ok\r\ncluster_slots_assigned:16384\r\ncluster_slots_ok:16384\r\n\
         cluster_slots_pfail:0\r\ncluster_slots_fail:0\r\ncluster_known_nodes:{nodes}\r\n\
         cluster_size:{masters}\r\n"
    )
}
