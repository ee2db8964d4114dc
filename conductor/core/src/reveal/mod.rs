//! Reveal Scheduler
//!
//! Paces already-received story text onto the screen at a fixed cadence,
//! independent of how fast the backend produces it.
//!
//! # Model
//!
//! ```text
//! backend deltas ──push_fragment──► queue of display units ──tick──► Presentation
//!                                    "Hello" " world" "\n"      one unit per
//!                                                               elapsed interval
//! ```
//!
//! The scheduler is single-threaded and cooperative: it never sleeps. The
//! owner calls [`RevealScheduler::tick`] from its frame loop and the scheduler
//! reveals at most one unit per call, once the interval has elapsed on its
//! [`Clock`].

mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::messages::MessageRole;
use crate::presentation::Presentation;

/// Default delay between revealed units
pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_millis(150);

/// Default delay before the first unit of a turn
pub const DEFAULT_FIRST_UNIT_DELAY: Duration = Duration::from_millis(500);

/// Reveal cadence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealConfig {
    /// Delay between consecutive units
    pub interval: Duration,
    /// Delay before the first unit of a turn
    pub first_unit_delay: Duration,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REVEAL_INTERVAL,
            first_unit_delay: DEFAULT_FIRST_UNIT_DELAY,
        }
    }
}

impl RevealConfig {
    /// No pacing: every tick reveals a unit
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            interval: Duration::ZERO,
            first_unit_delay: Duration::ZERO,
        }
    }
}

/// Result of one scheduler tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do yet
    Idle,
    /// One unit was forwarded
    Revealed,
    /// The turn finished revealing; `on_turn_complete` was fired
    Completed,
}

/// Split a content delta into display units
///
/// Leading blanks attach to the word that follows them, and every `\n` is a
/// unit of its own. Concatenating the units reproduces `fragment` exactly.
#[must_use]
pub fn split_units(fragment: &str) -> Vec<String> {
    let mut units = Vec::new();
    let mut current = String::new();
    let mut in_word = false;

    for ch in fragment.chars() {
        if ch == '\n' {
            if !current.is_empty() {
                units.push(std::mem::take(&mut current));
            }
            units.push("\n".to_string());
            in_word = false;
        } else if ch.is_whitespace() {
            if in_word {
                units.push(std::mem::take(&mut current));
                in_word = false;
            }
            current.push(ch);
        } else {
            current.push(ch);
            in_word = true;
        }
    }

    if !current.is_empty() {
        units.push(current);
    }
    units
}

/// Cooperative typewriter for one turn at a time
#[derive(Debug)]
pub struct RevealScheduler<C: Clock = SystemClock> {
    config: RevealConfig,
    clock: C,
    queue: VecDeque<String>,
    role: MessageRole,
    /// A turn has begun and `on_turn_complete` has not fired yet
    active: bool,
    /// No more fragments will arrive for the current turn
    stream_ended: bool,
    /// Clock reading at which the next unit may be revealed
    next_due: Duration,
}

impl RevealScheduler<SystemClock> {
    /// Create a scheduler on the wall clock
    #[must_use]
    pub fn new(config: RevealConfig) -> Self {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> RevealScheduler<C> {
    /// Create a scheduler on a specific clock
    pub fn with_clock(config: RevealConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            queue: VecDeque::new(),
            role: MessageRole::Assistant,
            active: false,
            stream_ended: false,
            next_due: Duration::ZERO,
        }
    }

    /// Start revealing a new turn authored by `role`
    pub fn begin_turn(&mut self, role: MessageRole) {
        self.queue.clear();
        self.role = role;
        self.active = true;
        self.stream_ended = false;
        self.next_due = self.clock.now() + self.config.first_unit_delay;
    }

    /// Queue a received content delta
    pub fn push_fragment(&mut self, fragment: &str) {
        self.queue.extend(split_units(fragment));
    }

    /// Mark the current turn's stream as finished
    pub fn end_stream(&mut self) {
        self.stream_ended = true;
    }

    /// Discard the current turn without completing it
    pub fn abort(&mut self) {
        if self.active {
            tracing::debug!(dropped = self.queue.len(), "Aborted reveal");
        }
        self.queue.clear();
        self.active = false;
        self.stream_ended = false;
    }

    /// Reveal at most one unit if its time has come
    pub fn tick(&mut self, ui: &mut dyn Presentation) -> TickOutcome {
        if !self.active {
            return TickOutcome::Idle;
        }

        if !self.queue.is_empty() {
            let now = self.clock.now();
            if now < self.next_due {
                return TickOutcome::Idle;
            }
            if let Some(unit) = self.queue.pop_front() {
                ui.on_fragment(self.role, &unit);
                self.next_due = now + self.config.interval;
                return TickOutcome::Revealed;
            }
        }

        if self.stream_ended {
            self.active = false;
            self.stream_ended = false;
            ui.on_turn_complete();
            return TickOutcome::Completed;
        }

        TickOutcome::Idle
    }

    /// Reveal everything queued right now, ignoring the cadence
    ///
    /// Completes the turn if its stream has already ended.
    pub fn drain(&mut self, ui: &mut dyn Presentation) -> TickOutcome {
        if !self.active {
            return TickOutcome::Idle;
        }
        let mut outcome = TickOutcome::Idle;
        while let Some(unit) = self.queue.pop_front() {
            ui.on_fragment(self.role, &unit);
            outcome = TickOutcome::Revealed;
        }
        self.next_due = self.clock.now() + self.config.interval;

        if self.stream_ended {
            self.active = false;
            self.stream_ended = false;
            ui.on_turn_complete();
            return TickOutcome::Completed;
        }
        outcome
    }

    /// Whether a turn is still being revealed
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.active
    }

    /// Units waiting to be revealed
    #[must_use]
    pub fn pending_units(&self) -> usize {
        self.queue.len()
    }

    /// Current cadence
    #[must_use]
    pub fn config(&self) -> RevealConfig {
        self.config
    }
}
