use std::collections::HashSet;
use std::net::IpAddr;
use std::net::SocketAddr;
use std::net::TcpListener;

use tracing::debug;
use tracing::warn;

use crate::constants::CLUSTER_BUS_PORT_OFFSET;
use crate::spec::conventional_replica_port;
use crate::ClusterSpec;
use crate::PortError;
use crate::Result;

/// Hands out node ports, either the caller's fixed list or free ports
/// discovered from the operating system.
#[derive(Debug, Clone)]
pub struct PortAllocator {
    host: IpAddr,
    max_attempts: usize,
}

impl PortAllocator {
    pub fn new(
        host: IpAddr,
        max_attempts: usize,
    ) -> Self {
        Self { host, max_attempts }
    }

    /// Ports for every node of `spec` in declaration order: per group the
    /// master first, then its replicas.
    pub fn allocate(
        &self,
        spec: &ClusterSpec,
    ) -> Result<Vec<u16>> {
        match spec.fixed_ports() {
            Some(ports) => {
                for &port in &ports {
                    self.ensure_available(port)?;
                }
                Ok(ports)
            }
            None => {
                let shapes: Vec<usize> = spec.groups().iter().map(|g| g.replicas()).collect();
                self.allocate_groups(&shapes, spec.replica_port_offset())
            }
        }
    }

    /// `n` distinct free ports with no port convention.
    pub fn allocate_ephemeral(
        &self,
        n: usize,
    ) -> Result<Vec<u16>> {
        self.allocate_groups(&vec![0; n], 0)
    }

    /// Checks that nothing listens on `port` or on its cluster bus port right
    /// now. Called again just before a process is launched on it; another
    /// process can still grab the port in between.
    pub fn ensure_available(
        &self,
        port: u16,
    ) -> Result<()> {
        let Some(bus) = cluster_bus_port(port) else {
            return Err(PortError::Unavailable {
                port,
                reason: format!("cluster bus port {port} + {CLUSTER_BUS_PORT_OFFSET} exceeds 65535"),
            }
            .into());
        };
        for candidate in [port, bus] {
            TcpListener::bind(SocketAddr::new(self.host, candidate)).map_err(|e| PortError::Unavailable {
                port,
                reason: if candidate == port {
                    e.to_string()
                } else {
                    format!("cluster bus port {bus}: {e}")
                },
            })?;
        }
        Ok(())
    }

    /// One master port per entry of `replicas_per_group`, each followed by
    /// `master + offset * i` replica ports.
    ///
    /// Every listener, bus ports included, stays bound until the whole
    /// allocation is done so the operating system cannot hand the same port
    /// out twice.
    fn allocate_groups(
        &self,
        replicas_per_group: &[usize],
        offset: u16,
    ) -> Result<Vec<u16>> {
        let requested: usize = replicas_per_group.iter().map(|r| r + 1).sum();
        let mut held: Vec<TcpListener> = Vec::with_capacity(requested);
        let mut taken: HashSet<u16> = HashSet::with_capacity(requested);
        let mut ports = Vec::with_capacity(requested);
        let mut attempts = 0;

        for &replicas in replicas_per_group {
            loop {
                if attempts >= self.max_attempts {
                    warn!(requested, attempts, "ephemeral port allocation exhausted");
                    return Err(PortError::Exhausted {
                        requested,
                        attempts,
                    }
                    .into());
                }
                attempts += 1;

                if let Some((group_ports, listeners)) = self.try_group(replicas, offset, &taken) {
                    debug!(?group_ports, attempt = attempts, "allocated ephemeral ports");
                    taken.extend(group_ports.iter().copied());
                    ports.extend(group_ports);
                    held.extend(listeners);
                    break;
                }
            }
        }

        drop(held);
        Ok(ports)
    }

    fn try_group(
        &self,
        replicas: usize,
        offset: u16,
        taken: &HashSet<u16>,
    ) -> Option<(Vec<u16>, Vec<TcpListener>)> {
        let master = TcpListener::bind(SocketAddr::new(self.host, 0)).ok()?;
        let master_port = master.local_addr().ok()?.port();
        if taken.contains(&master_port) {
            return None;
        }

        let mut ports = vec![master_port];
        let mut listeners = vec![master, self.bind_bus(master_port)?];
        for i in 1..=replicas {
            let port = conventional_replica_port(master_port, offset, i)?;
            if taken.contains(&port) || ports.contains(&port) {
                return None;
            }
            listeners.push(TcpListener::bind(SocketAddr::new(self.host, port)).ok()?);
            listeners.push(self.bind_bus(port)?);
            ports.push(port);
        }
        Some((ports, listeners))
    }

    fn bind_bus(
        &self,
        port: u16,
    ) -> Option<TcpListener> {
        let bus = cluster_bus_port(port)?;
        TcpListener::bind(SocketAddr::new(self.host, bus)).ok()
    }
}

/// Cluster bus port of a node listening on `port`, `None` when it would not
/// fit in `u16`.
pub fn cluster_bus_port(port: u16) -> Option<u16> {
    port.checked_add(CLUSTER_BUS_PORT_OFFSET)
}
