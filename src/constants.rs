// -
// Cluster slot space

/// Number of hash slots in a Redis cluster; slots are numbered `0..CLUSTER_SLOT_COUNT`.
pub const CLUSTER_SLOT_COUNT: u32 = 16384;

/// Highest valid slot number
pub const MAX_SLOT: u16 = (CLUSTER_SLOT_COUNT - 1) as u16;

// -
// Port conventions

/// Default distance between a master port and its first replica port
pub const DEFAULT_REPLICA_PORT_OFFSET: u16 = 1000;

/// Conventional boundary used by the magnitude heuristic: ports above it are replicas
pub const DEFAULT_ROLE_PORT_BOUNDARY: u16 = 8000;

/// A node also listens on its cluster bus at `port + CLUSTER_BUS_PORT_OFFSET`
pub const CLUSTER_BUS_PORT_OFFSET: u16 = 10000;

/// Highest client port whose bus port still fits in `u16`; `redis-server`
/// refuses to start above it
pub const MAX_NODE_PORT: u16 = u16::MAX - CLUSTER_BUS_PORT_OFFSET;

// -
// Node table flags

pub const MASTER_TAG: &str = "master";
pub const REPLICA_TAG: &str = "slave";
pub const MYSELF_TAG: &str = "myself";

/// Placeholder in the master-id column for nodes that replicate nobody
pub const NO_MASTER_SENTINEL: &str = "-";

/// `CLUSTER INFO` value reported once every slot is served
pub const CLUSTER_STATE_OK: &str = "ok";

// -
// Server process files

pub(crate) const SERVER_CONFIG_FILE: &str = "redis.conf";
pub(crate) const SERVER_LOG_FILE: &str = "server.log";
pub(crate) const WORK_DIR_PREFIX: &str = "redis-cluster-";
