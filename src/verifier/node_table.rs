use std::collections::BTreeSet;
use std::collections::HashMap;

use crate::constants::MASTER_TAG;
use crate::constants::MYSELF_TAG;
use crate::constants::NO_MASTER_SENTINEL;
use crate::constants::REPLICA_TAG;
use crate::ProtocolError;
use crate::Result;
use crate::SlotRange;

/// One line of `CLUSTER NODES`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub node_id: String,
    pub host: String,
    pub port: u16,
    pub bus_port: Option<u16>,
    pub role_tags: BTreeSet<String>,
    /// `None` when the report carries `-`
    pub master_id: Option<String>,
    pub link_state: Option<String>,
    pub slot_ranges: Vec<SlotRange>,
}

impl NodeDescriptor {
    pub fn is_master(&self) -> bool {
        self.role_tags.contains(MASTER_TAG)
    }

    pub fn is_replica(&self) -> bool {
        self.role_tags.contains(REPLICA_TAG)
    }

    pub fn is_myself(&self) -> bool {
        self.role_tags.contains(MYSELF_TAG)
    }
}

/// Parses a `CLUSTER NODES` report.
///
/// Line layout: `<id> <host:port@bus[,hostname]> <flags> <master> <ping-sent>
/// <pong-recv> <config-epoch> <link-state> <slot> ...`. Lines with fewer than
/// three fields are skipped. Migrating and importing entries (`[...]`) are
/// ignored.
pub fn parse_node_table(report: &str) -> Result<Vec<NodeDescriptor>> {
    let mut nodes = Vec::new();
    for line in report.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            continue;
        }

        let (host, port, bus_port) = parse_address(fields[1])?;
        let master_id = fields
            .get(3)
            .filter(|id| **id != NO_MASTER_SENTINEL)
            .map(|id| id.to_string());
        let slot_ranges = fields
            .iter()
            .skip(8)
            .filter(|entry| !entry.starts_with('['))
            .map(|entry| entry.parse())
            .collect::<Result<Vec<SlotRange>>>()?;

        nodes.push(NodeDescriptor {
            node_id: fields[0].to_string(),
            host,
            port,
            bus_port,
            role_tags: fields[2].split(',').map(str::to_string).collect(),
            master_id,
            link_state: fields.get(7).map(|s| s.to_string()),
            slot_ranges,
        });
    }
    Ok(nodes)
}

/// `node_id -> port` for every described node
pub fn node_id_to_port(nodes: &[NodeDescriptor]) -> HashMap<String, u16> {
    nodes.iter().map(|n| (n.node_id.clone(), n.port)).collect()
}

fn parse_address(field: &str) -> Result<(String, u16, Option<u16>)> {
    let malformed = || ProtocolError::Malformed(format!("invalid node address {field:?}"));

    let address = field.split(',').next().unwrap_or(field);
    let (endpoint, bus) = match address.split_once('@') {
        Some((endpoint, bus)) => (endpoint, Some(bus.parse::<u16>().map_err(|_| malformed())?)),
        None => (address, None),
    };
    let (host, port) = endpoint.rsplit_once(':').ok_or_else(malformed)?;
    let port = port.parse::<u16>().map_err(|_| malformed())?;
    Ok((host.to_string(), port, bus))
}
