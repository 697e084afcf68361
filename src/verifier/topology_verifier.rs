use std::collections::HashMap;

use tracing::debug;

use super::node_id_to_port;
use super::NodeDescriptor;
use crate::constants::MASTER_TAG;
use crate::constants::REPLICA_TAG;
use crate::FormationPlan;
use crate::NodeRole;
use crate::PlannedNode;
use crate::Result;
use crate::SlotRange;
use crate::TopologyError;

/// Checks a parsed node table against a [`FormationPlan`].
///
/// Roles come from the plan. The port-magnitude rule (ports above a boundary
/// are replicas) is only applied when a boundary is set.
#[derive(Debug, Clone)]
pub struct TopologyVerifier<'a> {
    plan: &'a FormationPlan,
    role_boundary: Option<u16>,
}

impl<'a> TopologyVerifier<'a> {
    pub fn new(plan: &'a FormationPlan) -> Self {
        Self {
            plan,
            role_boundary: None,
        }
    }

    pub fn with_role_boundary(
        mut self,
        boundary: Option<u16>,
    ) -> Self {
        self.role_boundary = boundary;
        self
    }

    /// First violation wins.
    pub fn verify(
        &self,
        nodes: &[NodeDescriptor],
    ) -> Result<()> {
        let by_port: HashMap<u16, &NodeDescriptor> = nodes.iter().map(|n| (n.port, n)).collect();
        let id_to_port = node_id_to_port(nodes);

        for planned in self.plan.nodes() {
            let node = by_port
                .get(&planned.port)
                .ok_or(TopologyError::MissingNode { port: planned.port })?;

            check_tag(node, planned.role.tag())?;
            if let Some(boundary) = self.role_boundary {
                let expected = if node.port > boundary { REPLICA_TAG } else { MASTER_TAG };
                check_tag(node, expected)?;
            }

            match planned.role {
                NodeRole::Master => self.check_slots(planned, node)?,
                NodeRole::Replica => self.check_master(planned, node, &id_to_port)?,
            }
        }

        debug!(nodes = nodes.len(), "topology matches plan");
        Ok(())
    }

    fn check_master(
        &self,
        planned: &PlannedNode,
        node: &NodeDescriptor,
        id_to_port: &HashMap<String, u16>,
    ) -> Result<()> {
        let master_id = node.master_id.clone().unwrap_or_default();
        let actual = *id_to_port.get(&master_id).ok_or_else(|| TopologyError::UnknownMaster {
            replica_port: planned.port,
            master_id: master_id.clone(),
        })?;

        if let Some(expected) = planned.master_port {
            if actual != expected {
                return Err(TopologyError::WrongMaster {
                    replica_port: planned.port,
                    expected,
                    actual,
                }
                .into());
            }
        }

        if self.plan.follows_port_convention() {
            let step = u32::from(self.plan.replica_port_offset()) * planned.replica_index as u32;
            let expected = u32::from(planned.port).saturating_sub(step);
            if u32::from(actual) != expected {
                return Err(TopologyError::WrongMaster {
                    replica_port: planned.port,
                    expected: expected as u16,
                    actual,
                }
                .into());
            }
        }
        Ok(())
    }

    fn check_slots(
        &self,
        planned: &PlannedNode,
        node: &NodeDescriptor,
    ) -> Result<()> {
        let expected: Vec<SlotRange> = self.plan.slots_of(planned.port).into_iter().collect();
        let actual = merge_ranges(&node.slot_ranges);
        if actual != expected {
            return Err(TopologyError::SlotMismatch {
                port: planned.port,
                expected: join(&expected),
                actual: join(&actual),
            }
            .into());
        }
        Ok(())
    }
}

fn check_tag(
    node: &NodeDescriptor,
    expected: &'static str,
) -> Result<()> {
    if node.role_tags.contains(expected) {
        return Ok(());
    }
    Err(TopologyError::RoleMismatch {
        port: node.port,
        expected,
        tags: node.role_tags.iter().cloned().collect(),
    }
    .into())
}

/// Sorted, with adjacent ranges joined: `0-9 10-20` becomes `0-20`.
fn merge_ranges(ranges: &[SlotRange]) -> Vec<SlotRange> {
    let mut sorted = ranges.to_vec();
    sorted.sort();

    let mut merged: Vec<SlotRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if u32::from(range.start) <= u32::from(last.end) + 1 => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}

fn join(ranges: &[SlotRange]) -> String {
    if ranges.is_empty() {
        return "no slots".to_string();
    }
    ranges.iter().map(SlotRange::to_string).collect::<Vec<_>>().join(" ")
}
