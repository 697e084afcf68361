use std::collections::HashMap;
use std::collections::HashSet;

use super::replication_group::conventional_replica_port;
use super::ClusterSpec;
use super::GroupSpec;
use super::PortMode;
use crate::constants::DEFAULT_REPLICA_PORT_OFFSET;
use crate::constants::MAX_NODE_PORT;
use crate::Error;
use crate::Result;

/// Accumulates replication group declarations; all cross-group validation
/// happens once in [`ClusterSpecBuilder::build`].
///
/// ```ignore
/// let spec = ClusterSpec::builder()
///     .server_ports([7001, 8001]).replication_group("master1", 1)
///     .server_ports([7002, 8002]).replication_group("master2", 1)
///     .build()?;
/// ```
#[derive(Debug)]
pub struct ClusterSpecBuilder {
    ephemeral: bool,
    fixed_seen: bool,
    pending_ports: Option<Vec<u16>>,
    groups: Vec<GroupSpec>,
    replica_port_offset: u16,
    strict_port_convention: bool,
    violations: Vec<String>,
}

impl Default for ClusterSpecBuilder {
    fn default() -> Self {
        Self {
            ephemeral: false,
            fixed_seen: false,
            pending_ports: None,
            groups: Vec::new(),
            replica_port_offset: DEFAULT_REPLICA_PORT_OFFSET,
            strict_port_convention: false,
            violations: Vec::new(),
        }
    }
}

impl ClusterSpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ports for the next `replication_group` call: master first, then replicas.
    pub fn server_ports<I>(
        mut self,
        ports: I,
    ) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        if self.pending_ports.is_some() {
            self.violations
                .push("server_ports() called twice without a replication_group() in between".into());
        }
        self.fixed_seen = true;
        self.pending_ports = Some(ports.into_iter().collect());
        self
    }

    /// Let the harness pick free ports for every group at start time.
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Declares a group consuming the ports given by the preceding
    /// `server_ports` call (fixed mode) or no ports at all (ephemeral mode).
    pub fn replication_group(
        mut self,
        name: impl Into<String>,
        replicas: usize,
    ) -> Self {
        let name = name.into();
        if name.trim().is_empty() {
            self.violations.push("replication group name cannot be empty".into());
        }

        match self.pending_ports.take() {
            Some(ports) if ports.is_empty() => {
                self.violations.push(format!("replication group {name} has zero ports"));
            }
            Some(ports) if ports.len() != replicas + 1 => {
                self.violations.push(format!(
                    "replication group {name} with {replicas} replica(s) needs {} ports, got {}",
                    replicas + 1,
                    ports.len()
                ));
            }
            Some(ports) => self.groups.push(GroupSpec::new(name, replicas, Some(ports))),
            None if self.ephemeral => self.groups.push(GroupSpec::new(name, replicas, None)),
            None => {
                self.violations.push(format!(
                    "replication group {name} has no ports; call server_ports() first or use ephemeral()"
                ));
            }
        }
        self
    }

    /// Distance between a master port and its first replica port; replica `i`
    /// sits on `master + offset * i`. Ephemeral allocation always honours it.
    pub fn replica_port_offset(
        mut self,
        offset: u16,
    ) -> Self {
        self.replica_port_offset = offset;
        self
    }

    /// Reject fixed port lists that do not follow the replica port offset.
    pub fn strict_port_convention(mut self) -> Self {
        self.strict_port_convention = true;
        self
    }

    /// Freezes the declarations. Pure: no sockets are touched.
    pub fn build(mut self) -> Result<ClusterSpec> {
        if self.pending_ports.is_some() {
            self.violations
                .push("server_ports() was not followed by a replication_group()".into());
        }
        if self.ephemeral && self.fixed_seen {
            self.violations
                .push("fixed server_ports() cannot be mixed with ephemeral()".into());
        }
        if self.groups.is_empty() && self.violations.is_empty() {
            self.violations
                .push("at least one replication group must be declared".into());
        }

        self.check_names();
        if self.ephemeral {
            self.check_ephemeral_offset();
        } else {
            self.check_fixed_ports();
        }

        if !self.violations.is_empty() {
            return Err(Error::InvalidSpec(self.violations.join("; ")));
        }

        let mode = if self.ephemeral {
            PortMode::Ephemeral
        } else {
            PortMode::Fixed
        };

        Ok(ClusterSpec {
            groups: self.groups,
            mode,
            replica_port_offset: self.replica_port_offset,
            strict_port_convention: self.strict_port_convention,
        })
    }

    fn check_names(&mut self) {
        let mut seen = HashSet::new();
        for group in &self.groups {
            if !seen.insert(group.name()) {
                self.violations
                    .push(format!("duplicate replication group name {}", group.name()));
            }
        }
    }

    fn check_fixed_ports(&mut self) {
        let mut owners: HashMap<u16, &str> = HashMap::new();
        for group in &self.groups {
            let ports = group.fixed_ports().unwrap_or_default();
            for &port in ports {
                if port == 0 {
                    self.violations.push(format!(
                        "replication group {} uses port 0; use ephemeral() for OS-assigned ports",
                        group.name()
                    ));
                    continue;
                }
                if port > MAX_NODE_PORT {
                    self.violations.push(format!(
                        "port {port} of {} is above {MAX_NODE_PORT}; its cluster bus port would exceed 65535",
                        group.name()
                    ));
                }
                if let Some(owner) = owners.insert(port, group.name()) {
                    self.violations.push(format!(
                        "port {port} is declared by both {owner} and {}",
                        group.name()
                    ));
                }
            }

            if self.strict_port_convention {
                if let Some((&master, replicas)) = ports.split_first() {
                    for (i, &replica) in replicas.iter().enumerate() {
                        let expected = conventional_replica_port(master, self.replica_port_offset, i + 1);
                        if expected != Some(replica) {
                            self.violations.push(format!(
                                "replica port {replica} of {} does not equal {master} + {} * {}",
                                group.name(),
                                self.replica_port_offset,
                                i + 1
                            ));
                        }
                    }
                }
            }
        }
    }

    fn check_ephemeral_offset(&mut self) {
        let max_replicas = self.groups.iter().map(GroupSpec::replicas).max().unwrap_or(0);
        if max_replicas == 0 {
            return;
        }
        if self.replica_port_offset == 0 {
            self.violations
                .push("replica_port_offset must be non-zero for ephemeral groups with replicas".into());
        } else if self.replica_port_offset as usize * max_replicas >= MAX_NODE_PORT as usize {
            self.violations.push(format!(
                "{max_replicas} replicas with offset {} exceed the port range",
                self.replica_port_offset
            ));
        }
    }
}
