//! Cancellable one-shot timers for Retroboard rooms.
//!
//! Every timed step of a game (dice settle, duel words, quiz rounds, the
//! reconnect grace window) is a one-shot timer owned by the room it
//! belongs to. A [`TimerSet`] spawns one Tokio sleep task per timer; when
//! the sleep ends the task sends a [`Fired`] event into the channel the
//! engine loop listens on.
//!
//! Cancelling aborts the task, but an event that already sits in the
//! channel cannot be taken back. Receivers therefore call
//! [`TimerSet::complete`] first, which only reports `true` for timers that
//! are still live, and then re-check the game state the event targets.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands, schedule timers */ }
//!         Some(fired) = timer_rx.recv() => {
//!             let room = rooms.get_mut(&fired.event.code);
//!             if room.timers.complete(fired.id) { /* re-validate and apply */ }
//!         }
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Milliseconds since the server started.
///
/// Built on Tokio's clock, so paused-time tests move it with
/// `tokio::time::advance`.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Current time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Timer identity
// ---------------------------------------------------------------------------

/// Global counter so a stale event can never match a timer of another set.
static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one scheduled timer. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    fn next() -> Self {
        Self(NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// A timer that ran out, as delivered to the engine loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<E> {
    pub id: TimerId,
    pub event: E,
}

// ---------------------------------------------------------------------------
// TimerSet
// ---------------------------------------------------------------------------

/// The live timers of one room.
///
/// Dropping the set aborts every task it still owns, so a torn-down room
/// leaves nothing behind that could fire.
pub struct TimerSet<E> {
    tx: mpsc::UnboundedSender<Fired<E>>,
    live: HashMap<TimerId, JoinHandle<()>>,
}

impl<E: Send + 'static> TimerSet<E> {
    /// Creates an empty set delivering into `tx`.
    pub fn new(tx: mpsc::UnboundedSender<Fired<E>>) -> Self {
        Self {
            tx,
            live: HashMap::new(),
        }
    }

    /// Delivers `event` after `delay`.
    pub fn schedule(&mut self, delay: Duration, event: E) -> TimerId {
        let id = TimerId::next();
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            if tx.send(Fired { id, event }).is_err() {
                trace!(%id, "timer fired after its receiver closed");
            }
        });
        self.live.insert(id, handle);
        trace!(%id, delay_ms = delay.as_millis() as u64, "timer scheduled");
        id
    }

    /// Cancels a pending timer. Returns `false` if it was not live.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.live.remove(&id) {
            Some(handle) => {
                handle.abort();
                trace!(%id, "timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancels every pending timer and returns how many there were.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.live.len();
        for (_, handle) in self.live.drain() {
            handle.abort();
        }
        if count > 0 {
            debug!(count, "timers cancelled");
        }
        count
    }

    /// Retires a fired timer. Returns `false` for a timer that was
    /// cancelled (or already retired), whose event must be ignored.
    pub fn complete(&mut self, id: TimerId) -> bool {
        self.live.remove(&id).is_some()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.live.contains_key(&id)
    }

    /// Number of timers not yet fired or cancelled.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl<E> Drop for TimerSet<E> {
    fn drop(&mut self) {
        for (_, handle) in self.live.drain() {
            handle.abort();
        }
    }
}

impl<E> fmt::Debug for TimerSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerSet").field("live", &self.live.len()).finish()
    }
}
