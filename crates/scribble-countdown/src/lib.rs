//! Cancellable round countdowns for Scribble.
//!
//! A [`Countdown`] is an owned handle to one pending expiry. When the
//! duration elapses, the countdown delivers a caller-chosen message on an
//! mpsc channel; it never runs caller code itself. That keeps expiries on
//! the same queue as every other event the owner processes.
//!
//! # Cancellation
//!
//! Dropping a `Countdown` or calling [`Countdown::cancel`] aborts the
//! sleeping task. Cancellation is idempotent. An expiry message that was
//! already queued before the cancel cannot be recalled, so owners tag
//! each countdown with a [`CountdownId`] and ignore expiries whose id is no
//! longer current:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* may replace room.countdown */ }
//!         Some(expiry) = expiry_rx.recv() => {
//!             if room.countdown.as_ref().map(Countdown::id) == Some(expiry.id) {
//!                 /* round over */
//!             }
//!         }
//!     }
//! }
//! ```

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identifies one scheduled countdown.
///
/// Ids come from a [`CountdownSequence`] and are never reused within it,
/// so a stale expiry can always be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CountdownId(u64);

impl CountdownId {
    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CountdownId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "countdown-{}", self.0)
    }
}

/// Monotonic source of [`CountdownId`]s. One per owner.
#[derive(Debug)]
pub struct CountdownSequence {
    next: u64,
}

impl CountdownSequence {
    /// Creates a sequence starting at 1.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Hands out the next id.
    pub fn next_id(&mut self) -> CountdownId {
        let id = CountdownId(self.next);
        self.next += 1;
        id
    }
}

impl Default for CountdownSequence {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Bounds applied to requested countdown durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownLimits {
    /// Longest countdown that will be scheduled.
    pub max_duration: Duration,
}

impl Default for CountdownLimits {
    fn default() -> Self {
        Self {
            max_duration: Self::DEFAULT_MAX_DURATION,
        }
    }
}

impl CountdownLimits {
    /// One hour.
    pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(60 * 60);

    /// Caps `requested` to [`max_duration`](Self::max_duration).
    pub fn clamp(&self, requested: Duration) -> Duration {
        if requested > self.max_duration {
            warn!(
                requested_secs = requested.as_secs(),
                max_secs = self.max_duration.as_secs(),
                "countdown duration exceeds maximum, clamping"
            );
            self.max_duration
        } else {
            requested
        }
    }
}

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// An owned, cancellable pending expiry.
///
/// Must be created inside a Tokio runtime.
#[derive(Debug)]
pub struct Countdown {
    id: CountdownId,
    duration: Duration,
    deadline: Instant,
    task: JoinHandle<()>,
    cancelled: bool,
}

impl Countdown {
    /// Starts a countdown that sends `message` on `notify` once `duration`
    /// has elapsed.
    ///
    /// If the receiver is gone by then, the message is dropped silently.
    pub fn start<T>(
        id: CountdownId,
        duration: Duration,
        notify: mpsc::UnboundedSender<T>,
        message: T,
    ) -> Self
    where
        T: Send + 'static,
    {
        let deadline = Instant::now() + duration;
        let task = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            trace!(%id, "countdown expired");
            let _ = notify.send(message);
        });
        debug!(%id, secs = duration.as_secs(), "countdown started");

        Self {
            id,
            duration,
            deadline,
            task,
            cancelled: false,
        }
    }

    /// This countdown's id.
    pub fn id(&self) -> CountdownId {
        self.id
    }

    /// The duration the countdown was started with.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// When the countdown expires.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left until expiry; zero once the deadline has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Whether the background task is done, either because the expiry
    /// message was sent or because it was cancelled.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the countdown. Safe to call any number of times.
    pub fn cancel(&mut self) {
        if !self.cancelled {
            self.cancelled = true;
            self.task.abort();
            debug!(id = %self.id, "countdown cancelled");
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}
