use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::converged_node_table;
use super::node_id_for;
use super::ok_cluster_info_report;
use crate::ClusterInfo;
use crate::ClusterSpec;
use crate::FormationPlan;
use crate::HarnessConfig;
use crate::MockClusterControl;
use crate::MockProcessHandle;
use crate::MockProcessLauncher;
use crate::PollPolicy;
use crate::PortAllocator;
use crate::ProcessHandle;

/// Fixed-port spec of `groups` one-replica groups on ports that were free a
/// moment ago, so the formation plan is known before `start`.
pub fn free_port_spec(groups: usize) -> ClusterSpec {
    let mut draft = ClusterSpec::builder().ephemeral();
    for i in 0..groups {
        draft = draft.replication_group(format!("draft{i}"), 1);
    }
    let ports = PortAllocator::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 64)
        .allocate(&draft.build().unwrap())
        .unwrap();

    let mut builder = ClusterSpec::builder();
    for (i, pair) in ports.chunks(2).enumerate() {
        builder = builder
            .server_ports(pair.iter().copied())
            .replication_group(format!("master{}", i + 1), 1);
    }
    builder.build().unwrap()
}

/// Listener occupying a port that would otherwise be a valid node port
pub fn busy_node_port() -> (std::net::TcpListener, u16) {
    let port = PortAllocator::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 64)
        .allocate_ephemeral(1)
        .unwrap()[0];
    let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, port)).unwrap();
    (listener, port)
}

pub fn plan_of(spec: &ClusterSpec) -> FormationPlan {
    FormationPlan::build(spec, &spec.fixed_ports().unwrap()).unwrap()
}

/// Defaults with short polls and `work_root` inside `dir`
pub fn fast_config(work_root: &std::path::Path) -> HarnessConfig {
    let fast = PollPolicy {
        max_attempts: 5,
        interval_ms: 10,
        attempt_timeout_ms: 200,
        timeout_ms: 2000,
    };
    let mut config = HarnessConfig::default();
    config.cluster.work_root = work_root.to_path_buf();
    config.retry.readiness = fast;
    config.retry.replication = fast;
    config.retry.convergence = fast;
    config
}

/// Handle whose process reports `alive` and counts `stop` calls
pub fn mock_handle(
    port: u16,
    alive: bool,
    stops: Arc<AtomicUsize>,
) -> MockProcessHandle {
    let mut handle = MockProcessHandle::new();
    handle.expect_port().return_const(port);
    handle.expect_pid().return_const(Some(4242u32));
    handle.expect_is_alive().return_const(alive);
    handle.expect_stop().returning(move || {
        stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    handle
}

/// Launcher handing out [`mock_handle`]s. Nodes listed in `dead_ports`
/// exit right away.
pub fn mock_launcher(
    dead_ports: Vec<u16>,
    stops: Arc<AtomicUsize>,
) -> MockProcessLauncher {
    let mut launcher = MockProcessLauncher::new();
    launcher.expect_launch().returning(move |node| {
        let alive = !dead_ports.contains(&node.port);
        Ok(Box::new(mock_handle(node.port, alive, stops.clone())) as Box<dyn ProcessHandle>)
    });
    launcher
}

/// Control client of a cluster that forms exactly as `plan` describes.
pub fn healthy_control(plan: &FormationPlan) -> MockClusterControl {
    let table = converged_node_table(plan, plan.anchor_port());
    let info = ClusterInfo::parse(&ok_cluster_info_report(plan.masters().count(), plan.nodes().len())).unwrap();

    let mut control = MockClusterControl::new();
    control.expect_ping().returning(|_| Ok(()));
    control.expect_node_id().returning(|addr| Ok(node_id_for(addr.port())));
    control.expect_meet().returning(|_, _| Ok(()));
    control.expect_add_slots().returning(|_, _| Ok(()));
    control.expect_replicate().returning(|_, _| Ok(()));
    control.expect_cluster_info().returning(move |_| Ok(info.clone()));
    control.expect_cluster_nodes().returning(move |_| Ok(table.clone()));
    control
}
