//! Cluster Harness Error Hierarchy
//!
//! Errors are grouped by the lifecycle phase that produces them: spec
//! construction, port allocation, process startup and convergence, the
//! control protocol spoken to running nodes, and topology verification.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Builder-time caller error. Nothing was started.
    #[error("Invalid cluster spec: {0}")]
    InvalidSpec(String),

    /// Port allocation failures (before any process exists)
    #[error(transparent)]
    Port(#[from] PortError),

    /// Startup, convergence and state machine failures
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Failures talking RESP to a running node
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Self-reported cluster state disagrees with the formation plan
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// Host platform could not be recognised
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// Harness configuration loading/validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// A caller-supplied port is already bound
    #[error("Port {port} is unavailable: {reason}")]
    Unavailable { port: u16, reason: String },

    /// Ephemeral allocation gave up
    #[error("Could not find {requested} free ports after {attempts} attempts")]
    Exhausted { requested: usize, attempts: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// A node never started accepting connections
    #[error("Node on port {port} did not become reachable after {attempts} attempts: {reason}")]
    StartupFailure {
        port: u16,
        attempts: usize,
        reason: String,
    },

    /// The server binary could not be spawned
    #[error("Failed to launch server on port {port}")]
    Launch {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Nodes are up but the cluster never reported a healthy state
    #[error("Cluster did not converge within {elapsed:?}: {last_observation}")]
    ConvergenceTimeout {
        elapsed: Duration,
        last_observation: String,
    },

    /// Operation not permitted in the current lifecycle state
    #[error("Cannot {operation} a cluster in state {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Request {command} to {addr} timed out after {timeout:?}")]
    Timeout {
        addr: String,
        command: String,
        timeout: Duration,
    },

    /// Server answered with a RESP error (`-ERR ...`)
    #[error("Server error reply to {command}: {message}")]
    ErrorReply { command: String, message: String },

    #[error("Unexpected reply to {command}: {reply}")]
    UnexpectedReply { command: String, reply: String },

    /// Bytes on the wire or a textual report could not be parsed
    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Connection closed by {0}")]
    ConnectionClosed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("Node on port {port} is missing from the node table")]
    MissingNode { port: u16 },

    #[error("Node on port {port} should be {expected} but reports flags {tags:?}")]
    RoleMismatch {
        port: u16,
        expected: &'static str,
        tags: Vec<String>,
    },

    #[error("Replica on port {replica_port} follows unknown node {master_id}")]
    UnknownMaster { replica_port: u16, master_id: String },

    #[error("Replica on port {replica_port} follows port {actual} instead of {expected}")]
    WrongMaster {
        replica_port: u16,
        expected: u16,
        actual: u16,
    },

    #[error("Master on port {port} owns {actual} instead of {expected}")]
    SlotMismatch {
        port: u16,
        expected: String,
        actual: String,
    },

    #[error("Slot coverage violated: {0}")]
    SlotCoverage(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Unrecognized OS: {0}")]
    UnrecognizedOs(String),
}

impl Error {
    /// True when a node never became reachable, whether its process could
    /// not be spawned or it never answered.
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            Error::Lifecycle(LifecycleError::StartupFailure { .. } | LifecycleError::Launch { .. })
        )
    }

    pub fn is_convergence_timeout(&self) -> bool {
        matches!(self, Error::Lifecycle(LifecycleError::ConvergenceTimeout { .. }))
    }

    pub fn is_invalid_spec(&self) -> bool {
        matches!(self, Error::InvalidSpec(_))
    }
}
