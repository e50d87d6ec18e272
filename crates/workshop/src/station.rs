// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handoff wrapper around one physical workplace
//!
//! A `Station` sequences successive occupants of a workplace through a pair
//! of one-shot gates so that a successor's action cannot begin before its
//! predecessor has signalled vacancy, including successors that change seats
//! as part of a simultaneous rotation.

use crate::gate::Gate;
use crate::id::WorkplaceId;
use crate::workplace::Workplace;
use std::sync::Arc;

/// One workplace plus its identity. Immutable after construction; all
/// transition state lives in the coordinator.
pub(crate) struct Station {
    pub(crate) id: WorkplaceId,
    pub(crate) workplace: Box<dyn Workplace>,
}

/// An exclusive grant of one workplace.
///
/// Returned by [`crate::Workshop::enter`] and [`crate::Workshop::switch_to`].
/// `perform` consumes the seat, so the protected action runs at most once per
/// grant and never through a stale handle.
#[must_use]
pub struct Seat {
    pub(crate) station: Arc<Station>,
    /// Opens once this seat's previous occupant has begun its own transition.
    pub(crate) ready: Gate,
    /// Gate armed on the seat the occupant vacated, if it held one.
    pub(crate) vacated: Option<Gate>,
}

impl Seat {
    /// The workplace this seat grants.
    pub fn workplace_id(&self) -> &WorkplaceId {
        &self.station.id
    }

    /// Run the workplace's protected action.
    ///
    /// First announces that the caller has left its previous seat, then waits
    /// until the previous occupant of this seat has done the same, then runs
    /// the action. Must be invoked before any further coordinator call by the
    /// same user; dropping a seat unperformed stalls its successors.
    pub async fn perform(self) {
        if let Some(gate) = &self.vacated {
            gate.arrive();
        }
        self.ready.wait().await;
        tracing::trace!(workplace = %self.station.id, "handoff complete, running action");
        self.station.workplace.run().await;
    }
}

#[cfg(test)]
#[path = "station_tests.rs"]
mod tests;
