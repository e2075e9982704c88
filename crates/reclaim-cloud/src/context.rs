//! Cancellation and parent-deadline context threaded through every wait
//!
//! A [`WaitContext`] never extends a wait. It can only end one early, either
//! because an outer deadline passed or because a [`CancelHandle`] fired.
//! Each wait still owns its own timeout budget on top of this.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a context interrupted a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Cancelled,
    DeadlineExceeded,
}

/// Deadline and cancellation shared by a tree of waits
#[derive(Debug, Clone, Default)]
pub struct WaitContext {
    deadline: Option<Instant>,
    cancelled: Option<watch::Receiver<bool>>,
}

/// Cancels every wait that shares the paired context
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl WaitContext {
    /// No parent deadline and no cancellation: every wait runs its own budget
    pub fn background() -> Self {
        Self::default()
    }

    /// Tighten the parent deadline; a later deadline than the current one is ignored
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Tighten the parent deadline to `timeout` from now
    ///
    /// A timeout too large to represent leaves the context unchanged.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Attach a fresh cancellation signal
    ///
    /// Waits already holding a clone of the previous context keep their old
    /// signal; only clones of the returned context observe the new handle.
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.cancelled = Some(rx);
        (self, CancelHandle { tx })
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Fails if the context is already cancelled or past its deadline
    pub fn check(&self) -> Result<(), Interrupt> {
        if self.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Interrupt::DeadlineExceeded);
            }
        }
        Ok(())
    }

    /// Sleep for `duration` unless cancelled or cut short by the deadline
    pub async fn sleep(&self, duration: Duration) -> Result<(), Interrupt> {
        self.check()?;

        let wake_at = Instant::now().checked_add(duration);
        let (timer, outcome) = match (self.deadline, wake_at) {
            (Some(deadline), Some(wake_at)) if deadline > wake_at => {
                (tokio::time::sleep_until(wake_at), Ok(()))
            }
            (Some(deadline), _) => (
                tokio::time::sleep_until(deadline),
                Err(Interrupt::DeadlineExceeded),
            ),
            // tokio clamps an oversized sleep to its far future
            (None, _) => (tokio::time::sleep(duration), Ok(())),
        };

        match self.cancelled.clone() {
            Some(mut rx) => {
                tokio::select! {
                    _ = timer => outcome,
                    _ = wait_cancelled(&mut rx) => Err(Interrupt::Cancelled),
                }
            }
            None => {
                timer.await;
                outcome
            }
        }
    }
}

async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        // Handle dropped without cancelling: this wait can no longer be cancelled.
        std::future::pending::<()>().await;
    }
}
