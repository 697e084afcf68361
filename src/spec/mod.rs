//! Declarative cluster description: replication groups and how their ports
//! are obtained.
mod builder;
mod replication_group;
pub use builder::*;
pub use replication_group::*;

#[cfg(test)]
mod builder_test;

/// Where node ports come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortMode {
    /// Caller listed every port
    Fixed,
    /// Free ports are discovered when the cluster starts
    Ephemeral,
}

/// Immutable cluster description produced by [`ClusterSpecBuilder::build`]
#[derive(Debug, Clone)]
pub struct ClusterSpec {
    groups: Vec<GroupSpec>,
    mode: PortMode,
    replica_port_offset: u16,
    strict_port_convention: bool,
}

impl ClusterSpec {
    pub fn builder() -> ClusterSpecBuilder {
        ClusterSpecBuilder::new()
    }

    pub fn groups(&self) -> &[GroupSpec] {
        &self.groups
    }

    pub fn mode(&self) -> PortMode {
        self.mode
    }

    pub fn is_ephemeral(&self) -> bool {
        self.mode == PortMode::Ephemeral
    }

    pub fn replica_port_offset(&self) -> u16 {
        self.replica_port_offset
    }

    pub fn strict_port_convention(&self) -> bool {
        self.strict_port_convention
    }

    /// One master per replication group
    pub fn master_count(&self) -> usize {
        self.groups.len()
    }

    pub fn replica_count(&self) -> usize {
        self.groups.iter().map(GroupSpec::replicas).sum()
    }

    pub fn node_count(&self) -> usize {
        self.master_count() + self.replica_count()
    }

    /// Minimum number of masters that must be healthy: `floor(masters / 2) + 1`
    pub fn quorum(&self) -> usize {
        self.master_count() / 2 + 1
    }

    /// Every caller-supplied port in declaration order; `None` in ephemeral mode.
    pub fn fixed_ports(&self) -> Option<Vec<u16>> {
        match self.mode {
            PortMode::Ephemeral => None,
            PortMode::Fixed => Some(
                self.groups
                    .iter()
                    .filter_map(GroupSpec::fixed_ports)
                    .flatten()
                    .copied()
                    .collect(),
            ),
        }
    }
}
