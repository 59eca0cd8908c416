//! Simulation clock and pending-action queue.
//!
//! The clock owns the current simulation time and a min-heap of one-shot
//! actions. Actions run in `(due_at, seq)` order, where `seq` is the
//! insertion counter, so actions due at the same instant run in the order
//! they were scheduled.
//!
//! The clock is generic over the context its actions receive. The
//! simulation uses `Clock<Simulation>`; the tests below drive it with a
//! plain `Vec`.
//!
//! # Example
//!
//! ```
//! use combatsim_core::clock::Clock;
//! use combatsim_core::time::SimTime;
//!
//! let mut clock: Clock<Vec<&str>> = Clock::new();
//! let mut log = Vec::new();
//!
//! clock.schedule(SimTime::from_secs(2), |log| { log.push("late"); Ok(()) }).unwrap();
//! clock.schedule(SimTime::from_secs(1), |log| { log.push("early"); Ok(()) }).unwrap();
//!
//! while let Some(action) = clock.pop_due(SimTime::from_secs(5)) {
//!     action.run(&mut log).unwrap();
//! }
//! clock.advance_to(SimTime::from_secs(5));
//!
//! assert_eq!(log, vec!["early", "late"]);
//! assert_eq!(clock.now(), SimTime::from_secs(5));
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use crate::error::{SimError, SimResult};
use crate::time::SimTime;

/// Boxed one-shot action run against the clock's context.
pub type ActionFn<C> = Box<dyn FnOnce(&mut C) -> SimResult<()> + Send>;

// =============================================================================
// PendingAction
// =============================================================================

/// A scheduled one-shot action.
pub struct PendingAction<C> {
    due_at: SimTime,
    seq: u64,
    action: ActionFn<C>,
}

impl<C> PendingAction<C> {
    /// Time at which the action is due.
    #[must_use]
    pub fn due_at(&self) -> SimTime {
        self.due_at
    }

    /// Insertion sequence number.
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Consume the action and run it.
    ///
    /// # Errors
    ///
    /// Returns whatever error the action itself produces.
    pub fn run(self, ctx: &mut C) -> SimResult<()> {
        (self.action)(ctx)
    }
}

impl<C> fmt::Debug for PendingAction<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingAction")
            .field("due_at", &self.due_at)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

impl<C> PartialEq for PendingAction<C> {
    fn eq(&self, other: &Self) -> bool {
        self.due_at == other.due_at && self.seq == other.seq
    }
}

impl<C> Eq for PendingAction<C> {}

impl<C> PartialOrd for PendingAction<C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<C> Ord for PendingAction<C> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior
        other
            .due_at
            .cmp(&self.due_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

// =============================================================================
// Clock
// =============================================================================

/// Monotonic simulation clock with a queue of pending actions.
pub struct Clock<C> {
    now: SimTime,
    next_seq: u64,
    queue: BinaryHeap<PendingAction<C>>,
}

impl<C> Clock<C> {
    /// Create a clock at time zero with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            next_seq: 0,
            queue: BinaryHeap::new(),
        }
    }

    /// Current simulation time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Number of actions still queued.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Due time of the earliest queued action.
    #[must_use]
    pub fn next_due(&self) -> Option<SimTime> {
        self.queue.peek().map(PendingAction::due_at)
    }

    /// Queue `action` to run at `due_at`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ScheduleInPast`] if `due_at` is before [`Clock::now`].
    pub fn schedule<F>(&mut self, due_at: SimTime, action: F) -> SimResult<()>
    where
        F: FnOnce(&mut C) -> SimResult<()> + Send + 'static,
    {
        if due_at < self.now {
            return Err(SimError::ScheduleInPast {
                due_at,
                now: self.now,
            });
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(PendingAction {
            due_at,
            seq,
            action: Box::new(action),
        });
        Ok(())
    }

    /// Pop the earliest action if it is due at or before `until`.
    ///
    /// The clock moves to the action's due time before it is returned.
    pub fn pop_due(&mut self, until: SimTime) -> Option<PendingAction<C>> {
        if self.next_due()? > until {
            return None;
        }
        let action = self.queue.pop()?;
        self.now = action.due_at;
        Some(action)
    }

    /// Move the clock forward to `time`. Never moves backwards.
    pub fn advance_to(&mut self, time: SimTime) {
        if time > self.now {
            self.now = time;
        }
    }

    /// Back to time zero, dropping every pending action.
    pub fn reset(&mut self) {
        self.now = SimTime::ZERO;
        self.next_seq = 0;
        self.queue.clear();
    }
}

impl<C> Default for Clock<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Clock<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock")
            .field("now", &self.now)
            .field("pending", &self.queue.len())
            .field("next_seq", &self.next_seq)
            .finish()
    }
}
