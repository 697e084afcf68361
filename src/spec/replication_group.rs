use std::fmt;

/// One master and its replicas, with concrete ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationGroup {
    name: String,
    master_port: u16,
    replica_ports: Vec<u16>,
}

impl ReplicationGroup {
    pub fn new(
        name: impl Into<String>,
        master_port: u16,
        replica_ports: Vec<u16>,
    ) -> Self {
        Self {
            name: name.into(),
            master_port,
            replica_ports,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn master_port(&self) -> u16 {
        self.master_port
    }

    pub fn replica_ports(&self) -> &[u16] {
        &self.replica_ports
    }

    /// Master first, then replicas in declaration order
    pub fn ports(&self) -> impl Iterator<Item = u16> + '_ {
        std::iter::once(self.master_port).chain(self.replica_ports.iter().copied())
    }

    pub fn node_count(&self) -> usize {
        1 + self.replica_ports.len()
    }

    /// True when replica `i` (1-based) sits on `master_port + offset * i`.
    pub fn follows_port_convention(
        &self,
        offset: u16,
    ) -> bool {
        self.replica_ports.iter().enumerate().all(|(i, &port)| {
            conventional_replica_port(self.master_port, offset, i + 1) == Some(port)
        })
    }
}

impl fmt::Display for ReplicationGroup {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}(master={}, replicas={:?})", self.name, self.master_port, self.replica_ports)
    }
}

/// Declared, not yet resolved, replication group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    name: String,
    replicas: usize,
    fixed_ports: Option<Vec<u16>>,
}

impl GroupSpec {
    pub(crate) fn new(
        name: String,
        replicas: usize,
        fixed_ports: Option<Vec<u16>>,
    ) -> Self {
        Self {
            name,
            replicas,
            fixed_ports,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Caller-supplied ports; `None` in ephemeral mode
    pub fn fixed_ports(&self) -> Option<&[u16]> {
        self.fixed_ports.as_deref()
    }

    pub fn node_count(&self) -> usize {
        1 + self.replicas
    }
}

/// `master_port + offset * replica_index`, or `None` past the last port
pub(crate) fn conventional_replica_port(
    master_port: u16,
    offset: u16,
    replica_index: usize,
) -> Option<u16> {
    let port = master_port as usize + offset as usize * replica_index;
    u16::try_from(port).ok()
}
