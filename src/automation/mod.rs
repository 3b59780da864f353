//! Interval-gated reward upkeep.
//!
//! The trigger never polls on its own. An external keeper asks
//! [`UpkeepTrigger::check_upkeep`] on its own cadence and calls
//! [`UpkeepTrigger::perform_if_due`] when it wants the cycle run.

use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::BadgeEvent;

pub type Timestamp = u64;

/// Interval the deploy step configures when nothing else is given: one hour.
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 60 * 60;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AutomationState {
    pub interval_secs: u64,
    pub last_run_timestamp: Timestamp,
    pub upkeeps_performed: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpkeepOutcome {
    Performed { events: Vec<BadgeEvent> },
    Skipped,
}

impl UpkeepOutcome {
    pub fn performed(&self) -> bool {
        matches!(self, UpkeepOutcome::Performed { .. })
    }

    pub fn events(&self) -> &[BadgeEvent] {
        match self {
            UpkeepOutcome::Performed { events } => events,
            UpkeepOutcome::Skipped => &[],
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpkeepTrigger {
    state: AutomationState,
}

impl UpkeepTrigger {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            state: AutomationState {
                interval_secs,
                ..AutomationState::default()
            },
        }
    }

    pub fn state(&self) -> &AutomationState {
        &self.state
    }

    /// Does not run a cycle; the next check uses the new interval.
    pub fn set_update_timer(&mut self, interval_secs: u64) {
        self.state.interval_secs = interval_secs;
    }

    /// Due once `interval_secs` have passed since the last cycle. A timestamp
    /// at or before the last cycle is never due again.
    pub fn check_upkeep(&self, now: Timestamp) -> bool {
        let state = &self.state;
        if state.upkeeps_performed > 0 && now <= state.last_run_timestamp {
            return false;
        }
        now.saturating_sub(state.last_run_timestamp) >= state.interval_secs
    }

    /// Runs `cycle` when due and records `now` as the last run. A failing
    /// cycle leaves the trigger untouched so the next poll retries.
    pub fn perform_if_due<E>(
        &mut self,
        now: Timestamp,
        cycle: impl FnOnce() -> Result<Vec<BadgeEvent>, E>,
    ) -> Result<UpkeepOutcome, E> {
        if !self.check_upkeep(now) {
            debug!(
                now,
                last_run = self.state.last_run_timestamp,
                interval = self.state.interval_secs,
                "upkeep not due"
            );
            return Ok(UpkeepOutcome::Skipped);
        }
        let events = cycle()?;
        self.state.last_run_timestamp = now;
        self.state.upkeeps_performed += 1;
        Ok(UpkeepOutcome::Performed { events })
    }
}

/// Source of the current time, in whole UNIX seconds.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

/// A deterministic clock. Time only advances when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    current: Cell<Timestamp>,
}

impl ManualClock {
    pub fn new(initial_secs: Timestamp) -> Self {
        Self {
            current: Cell::new(initial_secs),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.current.set(self.current.get().saturating_add(secs));
    }

    pub fn set(&self, secs: Timestamp) {
        self.current.set(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.current.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Something a keeper can poll.
pub trait Upkeep {
    type Error;

    fn check_upkeep(&self, now: Timestamp) -> bool;

    fn perform_upkeep(&mut self, now: Timestamp) -> Result<UpkeepOutcome, Self::Error>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeeperStats {
    pub polls: u64,
    pub performed: u64,
    pub failed: u64,
}

/// Polls an [`Upkeep`] target once per tick using its clock.
#[derive(Debug)]
pub struct Keeper<C> {
    clock: C,
    stats: KeeperStats,
}

impl<C: Clock> Keeper<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            stats: KeeperStats::default(),
        }
    }

    pub fn stats(&self) -> KeeperStats {
        self.stats
    }

    pub fn tick<U: Upkeep>(&mut self, target: &mut U) -> Result<UpkeepOutcome, U::Error> {
        let now = self.clock.now();
        self.stats.polls += 1;
        if !target.check_upkeep(now) {
            return Ok(UpkeepOutcome::Skipped);
        }
        match target.perform_upkeep(now) {
            Ok(outcome) => {
                if outcome.performed() {
                    self.stats.performed += 1;
                }
                Ok(outcome)
            }
            Err(err) => {
                self.stats.failed += 1;
                Err(err)
            }
        }
    }
}
