use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use futures::SinkExt;
use futures::StreamExt;
#[cfg(test)]
use mockall::automock;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::trace;

use super::RespCodec;
use super::RespValue;
use crate::constants::CLUSTER_STATE_OK;
use crate::NetworkConfig;
use crate::ProtocolError;
use crate::Result;
use crate::SlotRange;

/// Cluster control commands issued to running nodes.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterControl: Send + Sync {
    /// Raw command; an error reply becomes `ProtocolError::ErrorReply`.
    async fn execute(
        &self,
        node: SocketAddr,
        args: Vec<String>,
    ) -> Result<RespValue>;

    /// `PING`, expecting `PONG`
    async fn ping(
        &self,
        node: SocketAddr,
    ) -> Result<()>;

    /// `CLUSTER MYID`
    async fn node_id(
        &self,
        node: SocketAddr,
    ) -> Result<String>;

    /// `CLUSTER MEET` sent to `node`, introducing `peer`
    async fn meet(
        &self,
        node: SocketAddr,
        peer: SocketAddr,
    ) -> Result<()>;

    /// `CLUSTER ADDSLOTS` for every slot of `range`
    async fn add_slots(
        &self,
        node: SocketAddr,
        range: SlotRange,
    ) -> Result<()>;

    /// `CLUSTER REPLICATE`: `node` becomes a replica of `master_id`
    async fn replicate(
        &self,
        node: SocketAddr,
        master_id: &str,
    ) -> Result<()>;

    /// `CLUSTER NODES` text report
    async fn cluster_nodes(
        &self,
        node: SocketAddr,
    ) -> Result<String>;

    /// `CLUSTER INFO`, parsed
    async fn cluster_info(
        &self,
        node: SocketAddr,
    ) -> Result<ClusterInfo>;
}

/// Subset of `CLUSTER INFO` the harness looks at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterInfo {
    pub state: String,
    pub slots_assigned: u32,
    pub slots_ok: u32,
    pub known_nodes: usize,
    pub size: usize,
}

impl ClusterInfo {
    pub fn parse(report: &str) -> Result<Self> {
        let mut info = ClusterInfo::default();
        let mut has_state = false;
        for line in report.lines() {
            let Some((key, value)) = line.trim().split_once(':') else {
                continue;
            };
            let number = || {
                value
                    .parse::<u64>()
                    .map_err(|_| ProtocolError::Malformed(format!("invalid CLUSTER INFO field {line:?}")))
            };
            match key {
                "cluster_state" => {
                    info.state = value.to_string();
                    has_state = true;
                }
                "cluster_slots_assigned" => info.slots_assigned = number()? as u32,
                "cluster_slots_ok" => info.slots_ok = number()? as u32,
                "cluster_known_nodes" => info.known_nodes = number()? as usize,
                "cluster_size" => info.size = number()? as usize,
                _ => {}
            }
        }

        if !has_state {
            return Err(ProtocolError::Malformed("CLUSTER INFO has no cluster_state".into()).into());
        }
        Ok(info)
    }

    pub fn is_ok(&self) -> bool {
        self.state == CLUSTER_STATE_OK
    }
}

/// One short-lived TCP connection per command.
#[derive(Debug, Clone)]
pub struct RedisControlClient {
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl RedisControlClient {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
        }
    }

    async fn request(
        &self,
        node: SocketAddr,
        args: Vec<String>,
    ) -> Result<RespValue> {
        let command = describe(&args);
        let stream = timeout(self.connect_timeout, TcpStream::connect(node))
            .await
            .map_err(|_| ProtocolError::Timeout {
                addr: node.to_string(),
                command: command.clone(),
                timeout: self.connect_timeout,
            })?
            .map_err(|source| ProtocolError::Connect {
                addr: node.to_string(),
                source,
            })?;

        let mut framed = Framed::new(stream, RespCodec);
        let exchange = async {
            framed.send(args).await?;
            match framed.next().await {
                Some(reply) => reply,
                None => Err(ProtocolError::ConnectionClosed(node.to_string())),
            }
        };
        let reply = timeout(self.request_timeout, exchange)
            .await
            .map_err(|_| ProtocolError::Timeout {
                addr: node.to_string(),
                command: command.clone(),
                timeout: self.request_timeout,
            })??;

        trace!(%node, %command, %reply, "control reply");
        match reply {
            RespValue::Error(message) => Err(ProtocolError::ErrorReply { command, message }.into()),
            other => Ok(other),
        }
    }

    async fn expect_ok(
        &self,
        node: SocketAddr,
        args: Vec<String>,
    ) -> Result<()> {
        let command = describe(&args);
        match self.request(node, args).await? {
            RespValue::Simple(s) if s == "OK" => Ok(()),
            other => Err(unexpected(command, &other)),
        }
    }

    async fn expect_text(
        &self,
        node: SocketAddr,
        args: Vec<String>,
    ) -> Result<String> {
        let command = describe(&args);
        let reply = self.request(node, args).await?;
        reply.as_text().ok_or_else(|| unexpected(command, &reply))
    }
}

#[async_trait]
impl ClusterControl for RedisControlClient {
    async fn execute(
        &self,
        node: SocketAddr,
        args: Vec<String>,
    ) -> Result<RespValue> {
        self.request(node, args).await
    }

    async fn ping(
        &self,
        node: SocketAddr,
    ) -> Result<()> {
        match self.request(node, cmd(&["PING"])).await? {
            RespValue::Simple(s) if s == "PONG" => Ok(()),
            other => Err(unexpected("PING".into(), &other)),
        }
    }

    async fn node_id(
        &self,
        node: SocketAddr,
    ) -> Result<String> {
        self.expect_text(node, cmd(&["CLUSTER", "MYID"])).await
    }

    async fn meet(
        &self,
        node: SocketAddr,
        peer: SocketAddr,
    ) -> Result<()> {
        let args = vec![
            "CLUSTER".to_string(),
            "MEET".to_string(),
            peer.ip().to_string(),
            peer.port().to_string(),
        ];
        self.expect_ok(node, args).await
    }

    async fn add_slots(
        &self,
        node: SocketAddr,
        range: SlotRange,
    ) -> Result<()> {
        let mut args = cmd(&["CLUSTER", "ADDSLOTS"]);
        args.extend(range.slots().map(|s| s.to_string()));
        self.expect_ok(node, args).await
    }

    async fn replicate(
        &self,
        node: SocketAddr,
        master_id: &str,
    ) -> Result<()> {
        self.expect_ok(node, cmd(&["CLUSTER", "REPLICATE", master_id])).await
    }

    async fn cluster_nodes(
        &self,
        node: SocketAddr,
    ) -> Result<String> {
        self.expect_text(node, cmd(&["CLUSTER", "NODES"])).await
    }

    async fn cluster_info(
        &self,
        node: SocketAddr,
    ) -> Result<ClusterInfo> {
        let report = self.expect_text(node, cmd(&["CLUSTER", "INFO"])).await?;
        ClusterInfo::parse(&report)
    }
}

pub(crate) fn cmd(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

/// Command name for messages: `CLUSTER ADDSLOTS`, not its thousands of arguments
fn describe(args: &[String]) -> String {
    match args {
        [first, second, ..] if first.eq_ignore_ascii_case("CLUSTER") => format!("{first} {second}"),
        [first, ..] => first.clone(),
        [] => String::new(),
    }
}

fn unexpected(
    command: String,
    reply: &RespValue,
) -> crate::Error {
    ProtocolError::UnexpectedReply {
        command,
        reply: reply.to_string(),
    }
    .into()
}
