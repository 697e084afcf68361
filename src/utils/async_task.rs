use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tokio::time::timeout;
use tokio::time::Instant;
use tracing::debug;

use crate::PollPolicy;
use crate::Result;

/// Outcome of a single probe
#[derive(Debug, PartialEq, Eq)]
pub enum Probe<T> {
    Ready(T),
    /// Not there yet; the string describes what was observed.
    Pending(String),
}

/// Returned when a policy runs out of attempts or time
#[derive(Debug, Clone)]
pub struct PollExhausted {
    pub attempts: usize,
    pub elapsed: Duration,
    /// Last pending observation, probe error or probe timeout
    pub last_observation: String,
}

/// Runs `probe` until it reports `Probe::Ready`, bounded by the policy's
/// attempt count, per-attempt timeout and overall deadline.
///
/// A probe error counts as a failed attempt, it does not abort the loop.
/// The attempt number (starting at 1) is passed to the probe.
pub(crate) async fn poll_until<F, Fut, T>(
    policy: &PollPolicy,
    mut probe: F,
) -> std::result::Result<T, PollExhausted>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Probe<T>>>,
{
    let started = Instant::now();
    let deadline = started + policy.timeout();
    let mut attempts = 0;
    let mut last_observation = String::from("no attempt made");

    while attempts < policy.max_attempts {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        attempts += 1;

        let budget = policy.attempt_timeout().min(remaining);
        match timeout(budget, probe(attempts)).await {
            Ok(Ok(Probe::Ready(value))) => return Ok(value),
            Ok(Ok(Probe::Pending(observation))) => {
                debug!(attempt = attempts, %observation, "condition not met yet");
                last_observation = observation;
            }
            Ok(Err(e)) => {
                debug!(attempt = attempts, error = %e, "probe failed");
                last_observation = e.to_string();
            }
            Err(_) => {
                debug!(attempt = attempts, ?budget, "probe timed out");
                last_observation = format!("probe timed out after {budget:?}");
            }
        }

        if attempts < policy.max_attempts {
            let pause = policy.interval().min(deadline.saturating_duration_since(Instant::now()));
            sleep(pause).await;
        }
    }

    Err(PollExhausted {
        attempts,
        elapsed: started.elapsed(),
        last_observation,
    })
}
