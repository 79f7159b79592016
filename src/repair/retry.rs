//! Bounded retry controller
//!
//! Runs an [`Attempt`] until it succeeds, fails fatally, or the budget is
//! spent. Exactly one delay separates consecutive attempts; there is no
//! delay after the last one.

use crate::error::{MendError, MendResult};
use std::time::Duration;
use tracing::{debug, info, warn};

/// One unit of retryable work
#[allow(async_fn_in_trait)]
pub trait Attempt {
    type Output;

    async fn attempt(&mut self) -> MendResult<Self::Output>;
}

/// Maximum attempts and the pause between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A single attempt, no waiting
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

/// Remaining attempts, never below zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    remaining: u32,
}

impl RetryBudget {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            remaining: max_attempts,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Spend one unit after a failed attempt
    pub fn consume(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Where the controller is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPhase {
    Idle,
    Attempting { attempt: u32 },
    Succeeded { attempts: u32 },
    Exhausted { attempts: u32 },
    /// Stopped on an error that retrying cannot fix
    Failed { attempts: u32 },
}

/// Drives attempts against a budget
#[derive(Debug)]
pub struct RetryController {
    policy: RetryPolicy,
    budget: RetryBudget,
    phase: RetryPhase,
    attempts: u32,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            budget: RetryBudget::new(policy.max_attempts),
            phase: RetryPhase::Idle,
            attempts: 0,
        }
    }

    pub fn phase(&self) -> RetryPhase {
        self.phase
    }

    pub fn budget(&self) -> RetryBudget {
        self.budget
    }

    /// Run `op` under this controller's budget
    pub async fn run<A: Attempt>(&mut self, op: &mut A) -> MendResult<A::Output> {
        if self.budget.is_exhausted() {
            return Err(MendError::InvalidArgument(
                "retry budget must allow at least one attempt".into(),
            ));
        }

        loop {
            self.attempts += 1;
            self.phase = RetryPhase::Attempting {
                attempt: self.attempts,
            };
            debug!(
                "Attempt {}/{}",
                self.attempts, self.policy.max_attempts
            );

            let err = match op.attempt().await {
                Ok(output) => {
                    self.phase = RetryPhase::Succeeded {
                        attempts: self.attempts,
                    };
                    return Ok(output);
                },
                Err(e) => e,
            };

            if !err.is_retryable() {
                self.phase = RetryPhase::Failed {
                    attempts: self.attempts,
                };
                return Err(err);
            }

            self.budget.consume();
            if self.budget.is_exhausted() {
                self.phase = RetryPhase::Exhausted {
                    attempts: self.attempts,
                };
                warn!("Attempt {} failed: {}; no retries left", self.attempts, err);
                return Err(MendError::RetryExhausted {
                    attempts: self.attempts,
                    last: Box::new(err),
                });
            }

            info!(
                "Attempt {} failed: {}; retrying in {:?} ({} left)",
                self.attempts,
                err,
                self.policy.delay,
                self.budget.remaining()
            );
            tokio::time::sleep(self.policy.delay).await;
        }
    }
}

/// Run `op` with a fresh controller
pub async fn with_retry<A: Attempt>(op: &mut A, policy: RetryPolicy) -> MendResult<A::Output> {
    RetryController::new(policy).run(op).await
}
