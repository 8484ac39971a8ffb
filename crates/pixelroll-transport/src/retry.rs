//! Bounded connect-with-retry.
//!
//! Dice drop advertisements and GATT discovery fails intermittently, so
//! every open goes through [`connect_with_retry`]: up to
//! [`RetryPolicy::attempts`] tries with a fixed pause between them.

use std::time::Duration;

use tracing::{info, warn};

use crate::{Peripheral, TransportError};

/// How many times to try opening a die, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub attempts: u32,
    /// Fixed pause after each failed attempt.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            backoff: Duration::from_secs(2),
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Sleep for the given duration, then try again.
    Backoff(Duration),
    /// No attempts left.
    Exhausted,
}

/// Attempt counter driven by [`connect_with_retry`].
///
/// Kept separate from the async loop so the counting rules can be tested
/// without a clock.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Starts the next attempt, returning its 1-based number, or `None`
    /// once the policy is used up.
    pub fn begin_attempt(&mut self) -> Option<u32> {
        if self.attempt >= self.policy.attempts {
            return None;
        }
        self.attempt += 1;
        Some(self.attempt)
    }

    /// Records a failure of the current attempt.
    pub fn on_failure(&self) -> RetryStep {
        if self.attempt >= self.policy.attempts {
            RetryStep::Exhausted
        } else {
            RetryStep::Backoff(self.policy.backoff)
        }
    }

    /// Attempts made so far.
    pub fn attempts_made(&self) -> u32 {
        self.attempt
    }
}

/// Opens `peripheral`, retrying according to `policy`.
///
/// # Errors
/// Returns `TransportError::ConnectionFailed` carrying the last error once
/// every attempt has failed.
pub async fn connect_with_retry<P: Peripheral>(
    peripheral: &P,
    policy: &RetryPolicy,
) -> Result<P::Link, TransportError> {
    let mut state = RetryState::new(*policy);
    let mut last = String::from("no attempt made");

    while let Some(attempt) = state.begin_attempt() {
        match peripheral.open().await {
            Ok(link) => {
                info!(die = peripheral.name(), attempt, "die link open");
                return Ok(link);
            }
            Err(e) => {
                warn!(
                    die = peripheral.name(),
                    attempt,
                    max = policy.attempts,
                    error = %e,
                    "connection attempt failed"
                );
                last = e.to_string();
                match state.on_failure() {
                    RetryStep::Backoff(pause) => tokio::time::sleep(pause).await,
                    RetryStep::Exhausted => break,
                }
            }
        }
    }

    Err(TransportError::ConnectionFailed {
        name: peripheral.name().to_owned(),
        attempts: state.attempts_made(),
        last,
    })
}
