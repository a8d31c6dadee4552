//! Debounced build scheduling.
//!
//! A state machine with no timer of its own. The event loop asks for the
//! current [`deadline`](BuildScheduler::deadline), waits on its message
//! channel until then, and calls [`begin_due`](BuildScheduler::begin_due)
//! when the wait times out.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Where the scheduler is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Nothing to do.
    Idle,
    /// A build will run once `deadline` passes.
    Pending {
        /// When the build becomes due.
        deadline: Instant,
    },
    /// A build is in progress.
    Running {
        /// Deadline for the trailing build, if anything changed during this one.
        rearmed: Option<Instant>,
    },
}

/// Coalesces change notifications into build cycles.
pub struct BuildScheduler {
    clock: Arc<dyn Clock>,
    delay: Duration,
    state: SchedulerState,
    generation: u64,
}

impl std::fmt::Debug for BuildScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildScheduler")
            .field("delay", &self.delay)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl BuildScheduler {
    /// Create an idle scheduler.
    pub fn new(clock: Arc<dyn Clock>, delay: Duration) -> Self {
        Self {
            clock,
            delay,
            state: SchedulerState::Idle,
            generation: 0,
        }
    }

    /// Current state.
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    /// Generation of the most recently started build (0 before the first).
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Arm (or re-arm) the debounce timer.
    ///
    /// A pending build is replaced, never stacked. During a running build the
    /// request is remembered and becomes one trailing build.
    pub fn schedule(&mut self) {
        let deadline = self.clock.now() + self.delay;
        self.state = match self.state {
            SchedulerState::Idle | SchedulerState::Pending { .. } => {
                SchedulerState::Pending { deadline }
            }
            SchedulerState::Running { .. } => SchedulerState::Running {
                rearmed: Some(deadline),
            },
        };
    }

    /// When the pending build becomes due, if one is pending.
    pub const fn deadline(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::Pending { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Start the pending build if its deadline has passed.
    ///
    /// Returns the new build generation.
    pub fn begin_due(&mut self) -> Option<u64> {
        match self.state {
            SchedulerState::Pending { deadline } if self.clock.now() >= deadline => {
                self.state = SchedulerState::Running { rearmed: None };
                self.generation += 1;
                Some(self.generation)
            }
            _ => None,
        }
    }

    /// Mark the running build as finished, successful or not.
    pub fn finish(&mut self) {
        self.state = match self.state {
            SchedulerState::Running {
                rearmed: Some(deadline),
            } => SchedulerState::Pending { deadline },
            SchedulerState::Running { rearmed: None } => SchedulerState::Idle,
            other => other,
        };
    }
}
