//! Tick sources for the timer manager.
//!
//! The manager never sleeps. It asks a [`Clock`] to deliver a [`TickHandle`]
//! back to it, either periodically or once, and ignores any delivery whose
//! handle is no longer the active one. Cancellation therefore always wins
//! over a tick that was already in flight.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Opaque identifier of one tick source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TickHandle(u64);

impl TickHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Capability to schedule ticks.
pub trait Clock: Send {
    /// Deliver `handle` every `period`, the first delivery one period from
    /// now. Implementations must schedule against the start instant so long
    /// brews do not drift.
    fn start_ticks(&mut self, handle: TickHandle, period: Duration);

    /// Deliver `handle` once after `delay`.
    fn fire_once(&mut self, handle: TickHandle, delay: Duration);

    /// Stop delivering `handle`.
    fn cancel(&mut self, handle: TickHandle);
}

/// What a [`ManualClock`] was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduled {
    Ticks { handle: TickHandle, period: Duration },
    Once { handle: TickHandle, delay: Duration },
}

impl Scheduled {
    pub fn handle(&self) -> TickHandle {
        match *self {
            Scheduled::Ticks { handle, .. } | Scheduled::Once { handle, .. } => handle,
        }
    }
}

/// A clock that only records requests; ticks are injected by hand.
///
/// Used to drive the manager deterministically in tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    scheduled: Vec<Scheduled>,
    cancelled: Vec<TickHandle>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled(&self) -> &[Scheduled] {
        &self.scheduled
    }

    pub fn cancelled(&self) -> &[TickHandle] {
        &self.cancelled
    }

    /// Scheduled and not yet cancelled.
    pub fn is_live(&self, handle: TickHandle) -> bool {
        self.scheduled.iter().any(|s| s.handle() == handle) && !self.cancelled.contains(&handle)
    }

    pub fn live_handles(&self) -> Vec<TickHandle> {
        self.scheduled
            .iter()
            .map(Scheduled::handle)
            .filter(|h| !self.cancelled.contains(h))
            .collect()
    }
}

impl Clock for ManualClock {
    fn start_ticks(&mut self, handle: TickHandle, period: Duration) {
        self.scheduled.push(Scheduled::Ticks { handle, period });
    }

    fn fire_once(&mut self, handle: TickHandle, delay: Duration) {
        self.scheduled.push(Scheduled::Once { handle, delay });
    }

    fn cancel(&mut self, handle: TickHandle) {
        self.cancelled.push(handle);
    }
}
