use std::collections::HashSet;
use std::fmt;

use super::partition_slots;
use super::SlotRange;
use crate::constants::MASTER_TAG;
use crate::constants::REPLICA_TAG;
use crate::ClusterSpec;
use crate::Error;
use crate::ReplicationGroup;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    Master,
    Replica,
}

impl NodeRole {
    /// Flag the server reports for this role in its node table
    pub fn tag(&self) -> &'static str {
        match self {
            NodeRole::Master => MASTER_TAG,
            NodeRole::Replica => REPLICA_TAG,
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNode {
    pub group: String,
    pub port: u16,
    pub role: NodeRole,
    /// 0 for the master, 1.. for replicas in declaration order
    pub replica_index: usize,
    /// Port of the master this node replicates; `None` for masters
    pub master_port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAssignment {
    pub master_port: u16,
    pub range: SlotRange,
}

/// Concrete formation plan: which port plays which role, who owns which
/// slots, and which commands bring the nodes together.
#[derive(Debug, Clone)]
pub struct FormationPlan {
    groups: Vec<ReplicationGroup>,
    nodes: Vec<PlannedNode>,
    slot_assignments: Vec<SlotAssignment>,
    replica_port_offset: u16,
    quorum: usize,
}

impl FormationPlan {
    /// Resolves `spec` against allocated `ports` (declaration order, master
    /// first in each group).
    pub fn build(
        spec: &ClusterSpec,
        ports: &[u16],
    ) -> Result<Self> {
        if ports.len() != spec.node_count() {
            return Err(Error::InvalidSpec(format!(
                "spec declares {} nodes but {} ports were allocated",
                spec.node_count(),
                ports.len()
            )));
        }

        let mut seen = HashSet::with_capacity(ports.len());
        if let Some(dup) = ports.iter().find(|p| !seen.insert(**p)) {
            return Err(Error::InvalidSpec(format!("port {dup} allocated twice")));
        }

        let mut remaining = ports;
        let mut groups = Vec::with_capacity(spec.master_count());
        let mut nodes = Vec::with_capacity(ports.len());
        for group_spec in spec.groups() {
            let (group_ports, rest) = remaining.split_at(group_spec.node_count());
            remaining = rest;

            let master_port = group_ports[0];
            let group = ReplicationGroup::new(group_spec.name(), master_port, group_ports[1..].to_vec());
            for (replica_index, port) in group.ports().enumerate() {
                let (role, master) = if replica_index == 0 {
                    (NodeRole::Master, None)
                } else {
                    (NodeRole::Replica, Some(master_port))
                };
                nodes.push(PlannedNode {
                    group: group.name().to_string(),
                    port,
                    role,
                    replica_index,
                    master_port: master,
                });
            }
            groups.push(group);
        }

        let slot_assignments = partition_slots(groups.len())?
            .into_iter()
            .zip(&groups)
            .map(|(range, group)| SlotAssignment {
                master_port: group.master_port(),
                range,
            })
            .collect();

        Ok(Self {
            groups,
            nodes,
            slot_assignments,
            replica_port_offset: spec.replica_port_offset(),
            quorum: spec.quorum(),
        })
    }

    pub fn groups(&self) -> &[ReplicationGroup] {
        &self.groups
    }

    pub fn nodes(&self) -> &[PlannedNode] {
        &self.nodes
    }

    /// All ports in assignment order
    pub fn ports(&self) -> Vec<u16> {
        self.nodes.iter().map(|n| n.port).collect()
    }

    pub fn masters(&self) -> impl Iterator<Item = &PlannedNode> {
        self.nodes.iter().filter(|n| n.role == NodeRole::Master)
    }

    pub fn replicas(&self) -> impl Iterator<Item = &PlannedNode> {
        self.nodes.iter().filter(|n| n.role == NodeRole::Replica)
    }

    pub fn node(
        &self,
        port: u16,
    ) -> Option<&PlannedNode> {
        self.nodes.iter().find(|n| n.port == port)
    }

    pub fn role_of(
        &self,
        port: u16,
    ) -> Option<NodeRole> {
        self.node(port).map(|n| n.role)
    }

    pub fn slot_assignments(&self) -> &[SlotAssignment] {
        &self.slot_assignments
    }

    pub fn slots_of(
        &self,
        master_port: u16,
    ) -> Option<SlotRange> {
        self.slot_assignments
            .iter()
            .find(|a| a.master_port == master_port)
            .map(|a| a.range)
    }

    /// First master; every other node is introduced to it.
    pub fn anchor_port(&self) -> u16 {
        self.groups[0].master_port()
    }

    /// `(from, to)` meet instructions forming a star around the anchor,
    /// which is enough for gossip to connect every pair.
    pub fn meet_plan(&self) -> Vec<(u16, u16)> {
        let anchor = self.anchor_port();
        self.nodes.iter().filter(|n| n.port != anchor).map(|n| (anchor, n.port)).collect()
    }

    /// `(replica_port, master_port)` pairs
    pub fn replication_bindings(&self) -> Vec<(u16, u16)> {
        self.replicas().filter_map(|n| n.master_port.map(|m| (n.port, m))).collect()
    }

    pub fn replica_port_offset(&self) -> u16 {
        self.replica_port_offset
    }

    /// True when every group places replica `i` on `master + offset * i`.
    pub fn follows_port_convention(&self) -> bool {
        self.groups.iter().all(|g| g.follows_port_convention(self.replica_port_offset))
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }
}
