//! Bounded convergence polling with exponential backoff
//!
//! Turns a predicate over eventually-consistent remote state into a single
//! blocking answer: it became true, or it did not within the budget.

use crate::context::{Interrupt, WaitContext};
use crate::error::{CloudError, PollError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Timing budget for one convergence wait
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Wall-clock budget for the whole wait
    pub timeout: Duration,

    /// Delay before the second probe
    pub initial_interval: Duration,

    /// Upper bound for the delay between probes
    pub max_interval: Duration,

    /// Growth factor applied to the delay after each unsuccessful probe
    pub multiplier: f64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            multiplier: 1.5,
        }
    }
}

impl PollConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Delay slept after the `attempt`-th unsuccessful probe (0-indexed)
    ///
    /// A multiplier below 1.0 is treated as 1.0, so delays never shrink.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let initial = self.initial_interval.as_secs_f64();
        let max = self.max_interval.as_secs_f64();
        let multiplier = self.multiplier.max(1.0);
        let delay = initial * multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        if !delay.is_finite() || delay >= max {
            self.max_interval
        } else {
            Duration::from_secs_f64(delay)
        }
    }
}

/// What a finished wait observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Whether the predicate returned true before the deadline
    pub converged: bool,
    /// Number of predicate invocations
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Repeatedly probes a predicate until it holds or the budget runs out
#[derive(Debug, Clone, Default)]
pub struct ConvergencePoller {
    config: PollConfig,
}

impl ConvergencePoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Wait until `predicate` returns true
    ///
    /// Returns `Ok(false)` when the timeout elapses with the predicate still
    /// false. Errors only for a fault raised by the predicate or when `ctx`
    /// is cancelled or passes its deadline.
    pub async fn await_until<F, Fut>(
        &self,
        predicate: F,
        ctx: &WaitContext,
    ) -> std::result::Result<bool, PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        Ok(self.run(predicate, ctx).await?.converged)
    }

    /// Same as [`ConvergencePoller::await_until`], reporting attempt accounting
    pub async fn run<F, Fut>(
        &self,
        mut predicate: F,
        ctx: &WaitContext,
    ) -> std::result::Result<PollOutcome, PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let (_, outcome) = self
            .poll(
                || {
                    let converged = predicate();
                    async move { Ok::<_, CloudError>(converged.await?.then_some(())) }
                },
                ctx,
            )
            .await?;
        Ok(outcome)
    }

    /// Wait until `probe` yields a value, returning it
    ///
    /// `Ok(None)` means the timeout elapsed without one.
    pub async fn await_value<T, F, Fut>(
        &self,
        probe: F,
        ctx: &WaitContext,
    ) -> std::result::Result<Option<T>, PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        Ok(self.poll(probe, ctx).await?.0)
    }

    async fn poll<T, F, Fut>(
        &self,
        mut probe: F,
        ctx: &WaitContext,
    ) -> std::result::Result<(Option<T>, PollOutcome), PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let started = Instant::now();
        // A timeout too large to represent is no deadline at all.
        let deadline = started.checked_add(self.config.timeout);
        let mut attempts: u32 = 0;

        loop {
            ctx.check().map_err(interrupted)?;

            attempts = attempts.saturating_add(1);
            if let Some(value) = probe().await? {
                tracing::debug!("Converged after {} probe(s)", attempts);
                let outcome = PollOutcome {
                    converged: true,
                    attempts,
                    elapsed: started.elapsed(),
                };
                return Ok((Some(value), outcome));
            }

            let now = Instant::now();
            let mut delay = self.config.delay_for_attempt(attempts - 1);
            if let Some(deadline) = deadline {
                if now >= deadline {
                    tracing::debug!(
                        "Not converged after {} probe(s) within {:?}",
                        attempts,
                        self.config.timeout
                    );
                    let outcome = PollOutcome {
                        converged: false,
                        attempts,
                        elapsed: started.elapsed(),
                    };
                    return Ok((None, outcome));
                }
                // The last sleep is clamped so the final probe lands on the deadline.
                delay = delay.min(deadline - now);
            }
            tracing::debug!("Probe {} not converged, retrying in {:?}", attempts, delay);
            ctx.sleep(delay).await.map_err(interrupted)?;
        }
    }
}

fn interrupted(interrupt: Interrupt) -> PollError {
    match interrupt {
        Interrupt::Cancelled => PollError::Cancelled,
        Interrupt::DeadlineExceeded => PollError::DeadlineExceeded,
    }
}

/// Free-standing form of [`ConvergencePoller::await_until`]
pub async fn await_until<F, Fut>(
    predicate: F,
    config: &PollConfig,
    ctx: &WaitContext,
) -> std::result::Result<bool, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    ConvergencePoller::new(config.clone())
        .await_until(predicate, ctx)
        .await
}
