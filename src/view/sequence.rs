//! Request sequencing for table renders.

use std::collections::BTreeSet;

/// Ticket identifying one table request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Ticket(u64);

/// Hands out increasing tickets. A response renders only while its ticket
/// is the newest outstanding one and nothing newer has rendered.
#[derive(Debug, Default)]
pub(crate) struct RequestSequence {
    /// Last ticket issued.
    latest: u64,
    /// Tickets whose requests have not resolved yet.
    outstanding: BTreeSet<u64>,
    /// Newest ticket that rendered.
    rendered: u64,
}

impl RequestSequence {
    /// Issues a ticket newer than every previous one.
    pub(crate) fn issue(&mut self) -> Ticket {
        self.latest = self.latest.saturating_add(1);
        let _inserted = self.outstanding.insert(self.latest);
        Ticket(self.latest)
    }

    /// Whether `ticket` may still render.
    pub(crate) fn is_latest(&self, ticket: Ticket) -> bool {
        ticket.0 > self.rendered && self.outstanding.last() == Some(&ticket.0)
    }

    /// Drops a request that failed or was discarded.
    pub(crate) fn retire(&mut self, ticket: Ticket) {
        let _removed = self.outstanding.remove(&ticket.0);
    }

    /// Resolves `ticket`, returning whether it renders. Older tickets can
    /// no longer render afterwards.
    pub(crate) fn complete(&mut self, ticket: Ticket) -> bool {
        let latest = self.is_latest(ticket);
        self.retire(ticket);
        if latest {
            self.rendered = ticket.0;
        }
        latest
    }
}
