use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use nanoid::nanoid;
use tempfile::TempDir;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::ClusterState;
use super::ClusterStatus;
use crate::constants::CLUSTER_SLOT_COUNT;
use crate::constants::WORK_DIR_PREFIX;
use crate::parse_node_table;
use crate::read_log_tail;
use crate::utils::async_task::poll_until;
use crate::utils::async_task::Probe;
use crate::utils::net::socket_addr;
use crate::ClusterControl;
use crate::ClusterSpec;
use crate::Error;
use crate::FormationPlan;
use crate::HarnessConfig;
use crate::LifecycleError;
use crate::NodeDescriptor;
use crate::NodeLaunchConfig;
use crate::Platform;
use crate::PortAllocator;
use crate::ProcessHandle;
use crate::ProcessLauncher;
use crate::RedisControlClient;
use crate::RedisServerLauncher;
use crate::RespValue;
use crate::Result;
use crate::TopologyError;
use crate::TopologyVerifier;

/// Lines of a node log attached to a startup failure
const LOG_TAIL_LINES: usize = 20;

/// What a readiness probe saw on one node
enum Readiness {
    Accepting,
    /// The process was gone at this attempt
    Exited { attempt: usize },
}

/// A disposable cluster owned by one test.
///
/// ```ignore
/// let spec = ClusterSpec::builder()
///     .ephemeral()
///     .replication_group("master1", 1)
///     .replication_group("master2", 1)
///     .replication_group("master3", 1)
///     .build()?;
/// let mut cluster = RedisCluster::new(spec, HarnessConfig::new()?)?;
/// cluster.start().await?;
/// let ports = cluster.ports();
/// // ...
/// cluster.stop().await;
/// ```
///
/// Dropping the handle kills every node and removes the working directory,
/// but only `stop` waits for the processes to exit.
pub struct RedisCluster {
    spec: ClusterSpec,
    config: HarnessConfig,
    launcher: Arc<dyn ProcessLauncher>,
    control: Arc<dyn ClusterControl>,
    /// Short random id tagging the work dir and log events
    label: String,

    state: ClusterState,
    ports: Vec<u16>,
    plan: Option<FormationPlan>,
    processes: BTreeMap<u16, Box<dyn ProcessHandle>>,
    node_ids: BTreeMap<u16, String>,
    work_dir: Option<TempDir>,
}

impl RedisCluster {
    /// Cluster backed by real `redis-server` processes.
    pub fn new(
        spec: ClusterSpec,
        config: HarnessConfig,
    ) -> Result<Self> {
        let config = config.validate()?;
        let platform = Platform::current()?;
        debug!(%platform, binary = %config.cluster.server_binary, "resolving server binary");

        let launcher = Arc::new(RedisServerLauncher::from_config(&config.cluster, &platform));
        let control = Arc::new(RedisControlClient::new(&config.network));
        Ok(Self::with_components(spec, config, launcher, control))
    }

    /// Cluster using the given process launcher and control client.
    /// `config` is used as is.
    pub fn with_components(
        spec: ClusterSpec,
        config: HarnessConfig,
        launcher: Arc<dyn ProcessLauncher>,
        control: Arc<dyn ClusterControl>,
    ) -> Self {
        Self {
            spec,
            config,
            launcher,
            control,
            label: nanoid!(8),
            state: ClusterState::NotStarted,
            ports: Vec::new(),
            plan: None,
            processes: BTreeMap::new(),
            node_ids: BTreeMap::new(),
            work_dir: None,
        }
    }

    /// Launches every node, forms the cluster and waits until it converges.
    ///
    /// On failure every launched process is stopped before the error is
    /// returned, and the handle ends in [`ClusterState::Stopped`].
    pub async fn start(&mut self) -> Result<()> {
        if self.state != ClusterState::NotStarted {
            return Err(LifecycleError::InvalidState {
                operation: "start",
                state: self.state.as_str(),
            }
            .into());
        }

        self.state = ClusterState::Starting;
        info!(
            cluster = %self.label,
            masters = self.spec.master_count(),
            replicas = self.spec.replica_count(),
            mode = ?self.spec.mode(),
            "starting cluster"
        );

        match self.bring_up().await {
            Ok(()) => {
                self.state = ClusterState::Running;
                info!(cluster = %self.label, ports = ?self.ports, "cluster is running");
                Ok(())
            }
            Err(e) => {
                error!(cluster = %self.label, error = %e, "cluster failed to start");
                self.teardown().await;
                Err(e)
            }
        }
    }

    /// Stops every node and removes the working directory. Never fails and
    /// may be called any number of times, in any state.
    pub async fn stop(&mut self) {
        if self.state == ClusterState::Stopped {
            debug!(cluster = %self.label, "cluster already stopped");
            return;
        }
        self.teardown().await;
    }

    /// Every allocated port in assignment order: per group the master first,
    /// then its replicas. Empty before `start`.
    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    /// Ports discovered at startup; `None` for a fixed-port cluster.
    pub fn ephemeral_ports(&self) -> Option<Vec<u16>> {
        self.spec.is_ephemeral().then(|| self.ports.clone())
    }

    pub fn state(&self) -> ClusterState {
        self.state
    }

    pub fn spec(&self) -> &ClusterSpec {
        &self.spec
    }

    pub fn plan(&self) -> Option<&FormationPlan> {
        self.plan.as_ref()
    }

    pub fn node_id(
        &self,
        port: u16,
    ) -> Option<&str> {
        self.node_ids.get(&port).map(String::as_str)
    }

    /// Per-cluster working directory, while it exists
    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_ref().map(TempDir::path)
    }

    /// Live processes and reachable masters measured against the quorum.
    pub async fn status(&mut self) -> ClusterStatus {
        let alive_nodes = self.processes.values_mut().map(|h| h.is_alive()).filter(|alive| *alive).count();

        let mut reachable_masters = 0;
        if let (Some(plan), ClusterState::Running) = (&self.plan, self.state) {
            for master in plan.masters() {
                if self.control.ping(self.addr(master.port)).await.is_ok() {
                    reachable_masters += 1;
                }
            }
        }

        let quorum = self.spec.quorum();
        ClusterStatus {
            state: self.state,
            alive_nodes,
            reachable_masters,
            quorum,
            has_quorum: reachable_masters >= quorum,
        }
    }

    /// Node table as reported by the anchor node.
    pub async fn node_table(&self) -> Result<Vec<NodeDescriptor>> {
        let plan = self.running_plan("inspect")?;
        let report = self.control.cluster_nodes(self.addr(plan.anchor_port())).await?;
        parse_node_table(&report)
    }

    /// Compares the live node table with the formation plan. With a
    /// `role_boundary`, ports above it must also report as replicas and the
    /// others as masters.
    pub async fn verify_topology(
        &self,
        role_boundary: Option<u16>,
    ) -> Result<()> {
        let nodes = self.node_table().await?;
        let plan = self.running_plan("verify")?;
        TopologyVerifier::new(plan).with_role_boundary(role_boundary).verify(&nodes)
    }

    /// Sends a raw command to the node on `port`.
    pub async fn execute(
        &self,
        port: u16,
        args: Vec<String>,
    ) -> Result<RespValue> {
        let plan = self.running_plan("execute on")?;
        if plan.node(port).is_none() {
            return Err(TopologyError::MissingNode { port }.into());
        }
        self.control.execute(self.addr(port), args).await
    }

    fn running_plan(
        &self,
        operation: &'static str,
    ) -> Result<&FormationPlan> {
        match (&self.plan, self.state) {
            (Some(plan), ClusterState::Running) => Ok(plan),
            _ => Err(LifecycleError::InvalidState {
                operation,
                state: self.state.as_str(),
            }
            .into()),
        }
    }

    fn addr(
        &self,
        port: u16,
    ) -> SocketAddr {
        socket_addr(self.config.cluster.bind_host, port)
    }

    async fn bring_up(&mut self) -> Result<()> {
        let allocator = PortAllocator::new(
            self.config.cluster.bind_host,
            self.config.cluster.max_ephemeral_attempts,
        );
        self.ports = allocator.allocate(&self.spec)?;
        let plan = FormationPlan::build(&self.spec, &self.ports)?;
        self.plan = Some(plan.clone());

        let work_dir = tempfile::Builder::new()
            .prefix(&format!("{WORK_DIR_PREFIX}{}-", self.label))
            .tempdir_in(&self.config.cluster.work_root)?;
        let cluster_dir = work_dir.path().to_path_buf();
        self.work_dir = Some(work_dir);
        debug!(cluster = %self.label, dir = %cluster_dir.display(), "created working directory");

        self.launch_all(&allocator, &cluster_dir).await?;
        self.wait_until_ready(&cluster_dir).await?;
        self.collect_node_ids().await?;
        self.form_cluster(&plan).await?;
        self.wait_until_converged(&plan).await
    }

    async fn launch_all(
        &mut self,
        allocator: &PortAllocator,
        cluster_dir: &Path,
    ) -> Result<()> {
        let launches = self.ports.iter().map(|&port| {
            let node = NodeLaunchConfig::for_port(port, cluster_dir, &self.config.cluster);
            let launcher = self.launcher.clone();
            async move {
                allocator.ensure_available(port)?;
                launcher.launch(&node).await
            }
        });
        let results = join_all(launches).await;

        // Keep every handle that did launch so teardown can stop it.
        let mut first_error = None;
        for result in results {
            match result {
                Ok(handle) => {
                    self.processes.insert(handle.port(), handle);
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn wait_until_ready(
        &mut self,
        cluster_dir: &Path,
    ) -> Result<()> {
        let policy = self.config.retry.readiness;
        for port in self.ports.clone() {
            let addr = self.addr(port);
            let control = self.control.clone();
            let handle = self
                .processes
                .get_mut(&port)
                .ok_or(TopologyError::MissingNode { port })?;

            let outcome = poll_until(&policy, |attempt| {
                let alive = handle.is_alive();
                let control = control.clone();
                async move {
                    if !alive {
                        return Ok::<_, Error>(Probe::Ready(Readiness::Exited { attempt }));
                    }
                    Ok(match control.ping(addr).await {
                        Ok(()) => Probe::Ready(Readiness::Accepting),
                        Err(e) => Probe::Pending(e.to_string()),
                    })
                }
            })
            .await;

            let (attempts, reason) = match outcome {
                Ok(Readiness::Accepting) => {
                    debug!(port, "node is accepting commands");
                    continue;
                }
                Ok(Readiness::Exited { attempt }) => (attempt, "process exited".to_string()),
                Err(exhausted) => (exhausted.attempts, exhausted.last_observation),
            };

            let log = NodeLaunchConfig::for_port(port, cluster_dir, &self.config.cluster).log_path();
            let tail = read_log_tail(&log, LOG_TAIL_LINES).await;
            return Err(LifecycleError::StartupFailure {
                port,
                attempts,
                reason: with_log_tail(reason, &log, &tail),
            }
            .into());
        }
        Ok(())
    }

    async fn collect_node_ids(&mut self) -> Result<()> {
        for port in self.ports.clone() {
            let node_id = self.control.node_id(self.addr(port)).await?;
            debug!(port, %node_id, "node id");
            self.node_ids.insert(port, node_id);
        }
        Ok(())
    }

    /// Meet, slot assignment and replication, in that order.
    async fn form_cluster(
        &self,
        plan: &FormationPlan,
    ) -> Result<()> {
        for (from, to) in plan.meet_plan() {
            self.control.meet(self.addr(from), self.addr(to)).await?;
        }
        debug!(cluster = %self.label, meets = plan.nodes().len() - 1, "meet issued");

        for assignment in plan.slot_assignments() {
            self.control
                .add_slots(self.addr(assignment.master_port), assignment.range)
                .await?;
            debug!(port = assignment.master_port, slots = %assignment.range, "slots assigned");
        }

        let policy = self.config.retry.replication;
        for (replica, master) in plan.replication_bindings() {
            let master_id = self
                .node_ids
                .get(&master)
                .ok_or(TopologyError::MissingNode { port: master })?;
            let addr = self.addr(replica);

            // The replica only accepts a master it already learned through gossip.
            poll_until(&policy, |_| async move {
                Ok::<_, Error>(match self.control.replicate(addr, master_id).await {
                    Ok(()) => Probe::Ready(()),
                    Err(e) => Probe::Pending(e.to_string()),
                })
            })
            .await
            .map_err(|exhausted| LifecycleError::ConvergenceTimeout {
                elapsed: exhausted.elapsed,
                last_observation: format!(
                    "replica {replica} could not follow master {master}: {}",
                    exhausted.last_observation
                ),
            })?;
            debug!(replica, master, "replication configured");
        }
        Ok(())
    }

    async fn wait_until_converged(
        &self,
        plan: &FormationPlan,
    ) -> Result<()> {
        let policy = self.config.retry.convergence;
        poll_until(&policy, |_| self.probe_convergence(plan))
            .await
            .map_err(|exhausted| {
                Error::from(LifecycleError::ConvergenceTimeout {
                    elapsed: exhausted.elapsed,
                    last_observation: exhausted.last_observation,
                })
            })
    }

    async fn probe_convergence(
        &self,
        plan: &FormationPlan,
    ) -> Result<Probe<()>> {
        let expected_nodes = plan.nodes().len();
        for port in plan.ports() {
            let info = self.control.cluster_info(self.addr(port)).await?;
            if !info.is_ok() {
                return Ok(Probe::Pending(format!("node {port} reports cluster_state:{}", info.state)));
            }
            if info.slots_assigned != CLUSTER_SLOT_COUNT {
                return Ok(Probe::Pending(format!(
                    "node {port} sees {} of {CLUSTER_SLOT_COUNT} slots assigned",
                    info.slots_assigned
                )));
            }
            if info.known_nodes != expected_nodes {
                return Ok(Probe::Pending(format!(
                    "node {port} knows {} of {expected_nodes} nodes",
                    info.known_nodes
                )));
            }
        }

        let report = self.control.cluster_nodes(self.addr(plan.anchor_port())).await?;
        let nodes = parse_node_table(&report)?;
        Ok(match TopologyVerifier::new(plan).verify(&nodes) {
            Ok(()) => Probe::Ready(()),
            Err(e) => Probe::Pending(e.to_string()),
        })
    }

    async fn teardown(&mut self) {
        self.state = ClusterState::Stopping;

        let stops = std::mem::take(&mut self.processes)
            .into_iter()
            .map(|(port, mut handle)| async move {
                if let Err(e) = handle.stop().await {
                    warn!(port, error = %e, "failed to stop node");
                }
            });
        join_all(stops).await;

        if let Some(dir) = self.work_dir.take() {
            let path: PathBuf = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(dir = %path.display(), error = %e, "failed to remove working directory");
            }
        }

        self.state = ClusterState::Stopped;
        info!(cluster = %self.label, "cluster stopped");
    }
}

fn with_log_tail(
    reason: String,
    log: &Path,
    tail: &str,
) -> String {
    if tail.is_empty() {
        return reason;
    }
    format!("{reason}; last lines of {}:\n{tail}", log.display())
}
