use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use crate::Result;

/// Bounded polling template. Every field must be non-zero: the harness never
/// waits without a limit.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum number of probes
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Pause between two probes (unit: milliseconds)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Timeout of a single probe (unit: milliseconds)
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,

    /// Overall deadline across all probes (unit: milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl PollPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(
        &self,
        name: &str,
    ) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(invalid(format!(
                "retry.{name}.max_attempts must be greater than 0"
            )));
        }
        if self.attempt_timeout_ms == 0 {
            return Err(invalid(format!(
                "retry.{name}.attempt_timeout_ms must be greater than 0"
            )));
        }
        if self.timeout_ms == 0 {
            return Err(invalid(format!(
                "retry.{name}.timeout_ms must be greater than 0"
            )));
        }
        if self.attempt_timeout_ms > self.timeout_ms {
            return Err(invalid(format!(
                "retry.{name}.attempt_timeout_ms ({}) exceeds timeout_ms ({})",
                self.attempt_timeout_ms, self.timeout_ms
            )));
        }
        Ok(())
    }
}

/// Divide polling by startup phase
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetryPolicies {
    // Waiting for each process to answer PING
    #[serde(default = "default_readiness")]
    pub readiness: PollPolicy,

    // CLUSTER REPLICATE, retried until the master is known through gossip
    #[serde(default = "default_replication")]
    pub replication: PollPolicy,

    // Waiting for cluster_state:ok on every node
    #[serde(default = "default_convergence")]
    pub convergence: PollPolicy,
}

impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            readiness: default_readiness(),
            replication: default_replication(),
            convergence: default_convergence(),
        }
    }
}

impl RetryPolicies {
    pub fn validate(&self) -> Result<()> {
        self.readiness.validate("readiness")?;
        self.replication.validate("replication")?;
        self.convergence.validate("convergence")?;
        Ok(())
    }
}

fn default_readiness() -> PollPolicy {
    PollPolicy {
        max_attempts: 100,
        interval_ms: 100,
        attempt_timeout_ms: 500,
        timeout_ms: 10_000,
    }
}
fn default_replication() -> PollPolicy {
    PollPolicy {
        max_attempts: 50,
        interval_ms: 200,
        attempt_timeout_ms: 1000,
        timeout_ms: 10_000,
    }
}
fn default_convergence() -> PollPolicy {
    PollPolicy {
        max_attempts: 120,
        interval_ms: 250,
        attempt_timeout_ms: 2000,
        timeout_ms: 30_000,
    }
}
fn default_max_attempts() -> usize {
    10
}
fn default_interval_ms() -> u64 {
    100
}
fn default_attempt_timeout_ms() -> u64 {
    500
}
fn default_timeout_ms() -> u64 {
    5000
}
