// src/sequencer.rs
//! Stale-response guard for view-scoped requests.
//!
//! Each outgoing request takes a ticket. A completed response may be applied
//! only if its ticket is still the latest one issued and the view is alive.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: u64,
    torn_down: bool,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    pub fn accept(&self, ticket: Ticket) -> bool {
        let ok = !self.torn_down && ticket.0 == self.latest;
        if !ok {
            debug!(ticket = ticket.0, latest = self.latest, torn_down = self.torn_down, "discarding stale response");
        }
        ok
    }

    /// After teardown every ticket, current or future, is rejected.
    pub fn teardown(&mut self) {
        self.torn_down = true;
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}
