//! Cancellable single-shot hold timers.
//!
//! The session arms one timer when a stroke ends and cancels it whenever a
//! newer action supersedes it. Hosts pick a backend:
//!
//! - [`TokioScheduler`] sleeps on the Tokio runtime and delivers the fired
//!   [`TimerTicket`] over a channel.
//! - [`ManualScheduler`] is a virtual clock the host advances itself, for
//!   frame-driven hosts and tests.
//!
//! Either way the host hands fired tickets back to
//! [`SessionController::on_timer`](crate::SessionController::on_timer),
//! which ignores any ticket that is no longer the armed one.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Identifies one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerTicket(u64);

impl TimerTicket {
    /// Create a ticket from a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to an armed timer.
pub trait ScheduledTask: Send {
    /// Stop the timer from firing. Cancelling twice is harmless.
    fn cancel(&mut self);
}

/// Arms hold timers for a session.
pub trait HoldScheduler: Send {
    /// Arrange for `ticket` to be delivered after `delay`.
    fn schedule(&mut self, delay: Duration, ticket: TimerTicket) -> Box<dyn ScheduledTask>;
}

/// Timer backend on the Tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    fired: mpsc::UnboundedSender<TimerTicket>,
}

impl TokioScheduler {
    /// Create a scheduler and the receiver fired tickets arrive on.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TimerTicket>) {
        let (fired, rx) = mpsc::unbounded_channel();
        (Self { fired }, rx)
    }
}

impl HoldScheduler for TokioScheduler {
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    fn schedule(&mut self, delay: Duration, ticket: TimerTicket) -> Box<dyn ScheduledTask> {
        let fired = self.fired.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the host shut down
            let _ = fired.send(ticket);
        });
        Box::new(TokioTask { handle })
    }
}

struct TokioTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask for TokioTask {
    fn cancel(&mut self) {
        self.handle.abort();
    }
}

impl Drop for TokioTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Debug, Default)]
struct ManualClock {
    now: Duration,
    next_id: u64,
    pending: Vec<PendingTimer>,
}

#[derive(Debug)]
struct PendingTimer {
    id: u64,
    due: Duration,
    ticket: TimerTicket,
}

/// Virtual-clock timer backend driven by [`ManualScheduler::advance`].
///
/// Clones share the same clock, so the host keeps one clone and gives
/// another to the session.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    clock: Arc<Mutex<ManualClock>>,
}

impl ManualScheduler {
    /// Create a clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner).now
    }

    /// Number of armed, uncancelled timers.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }

    /// Move the clock forward and return the tickets that fired, earliest first.
    pub fn advance(&self, by: Duration) -> Vec<TimerTicket> {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        clock.now += by;
        let now = clock.now;
        let (mut due, pending): (Vec<PendingTimer>, Vec<PendingTimer>) =
            clock.pending.drain(..).partition(|t| t.due <= now);
        clock.pending = pending;
        due.sort_by_key(|t| (t.due, t.id));
        due.into_iter().map(|t| t.ticket).collect()
    }
}

impl HoldScheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration, ticket: TimerTicket) -> Box<dyn ScheduledTask> {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        let id = clock.next_id;
        clock.next_id += 1;
        let due = clock.now + delay;
        clock.pending.push(PendingTimer { id, due, ticket });
        Box::new(ManualTask {
            id,
            clock: Arc::clone(&self.clock),
        })
    }
}

struct ManualTask {
    id: u64,
    clock: Arc<Mutex<ManualClock>>,
}

impl ScheduledTask for ManualTask {
    fn cancel(&mut self) {
        self.clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .retain(|t| t.id != self.id);
    }
}

impl Drop for ManualTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
