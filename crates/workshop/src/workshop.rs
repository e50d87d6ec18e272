// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workshop coordinator
//!
//! Owns all occupancy bookkeeping behind a single lock and implements the
//! three caller operations:
//! - **enter** - block until granted exclusive occupancy of a workplace
//! - **switch_to** - exchange the current workplace for another, resolving
//!   closed wait-for cycles by simultaneous rotation instead of deadlocking
//! - **leave** - release occupancy and pulse the admission throttle
//!
//! Waiters park on a private oneshot and are woken with a fully prepared
//! [`Seat`]; all chain and rotation bookkeeping happens under the lock in the
//! resolver's critical section, so a woken task never reacquires the lock.

use crate::error::WorkshopError;
use crate::gate::Gate;
use crate::id::{UserId, WorkplaceId};
use crate::station::{Seat, Station};
use crate::workplace::Workplace;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{oneshot, Semaphore};

/// Coordinates exclusive occupancy of a fixed set of workplaces.
///
/// At most one user is active in a workplace at any time. Admission is
/// bounded to the workplace count and replenished only in full batches once a
/// complete generation of residents has departed, which bounds how long any
/// waiter can be overtaken by newcomers.
pub struct Workshop {
    /// Fixed at construction, never mutated afterwards.
    stations: HashMap<WorkplaceId, Arc<Station>>,
    /// Admission throttle: one permit per concurrently resident user.
    admission: Semaphore,
    state: Mutex<CoreState>,
}

/// All mutable bookkeeping, guarded by one lock. Never held across an await.
struct CoreState {
    /// Workplace -> current occupant; free iff absent.
    occupant: HashMap<WorkplaceId, UserId>,
    /// Occupant -> its workplace.
    seat_of: HashMap<UserId, WorkplaceId>,
    /// Waiting user -> desired workplace; present iff the user is blocked.
    desire: HashMap<UserId, WorkplaceId>,
    /// Workplace -> number of users desiring it; contested iff present.
    waiters: HashMap<WorkplaceId, usize>,
    /// Arrival order among parked waiters.
    queue: VecDeque<UserId>,
    /// Parked waiters, each woken with a fully prepared seat.
    parked: HashMap<UserId, oneshot::Sender<Seat>>,
    /// Per-workplace gate the next occupant must wait on before acting.
    vacancy: HashMap<WorkplaceId, Gate>,
    /// Residents departed since the last admission refill.
    departures: usize,
}

impl Workshop {
    /// Build a workshop from a non-empty collection of workplaces with
    /// unique ids. The set is immutable for the workshop's lifetime.
    pub fn new(
        workplaces: impl IntoIterator<Item = (WorkplaceId, Box<dyn Workplace>)>,
    ) -> Result<Self, WorkshopError> {
        let mut stations = HashMap::new();
        let mut vacancy = HashMap::new();
        for (id, workplace) in workplaces {
            if stations.contains_key(&id) {
                return Err(WorkshopError::DuplicateWorkplace(id));
            }
            vacancy.insert(id.clone(), Gate::open());
            stations.insert(id.clone(), Arc::new(Station { id, workplace }));
        }
        if stations.is_empty() {
            return Err(WorkshopError::NoWorkplaces);
        }
        let seats = stations.len();
        Ok(Self {
            stations,
            admission: Semaphore::new(seats),
            state: Mutex::new(CoreState {
                occupant: HashMap::new(),
                seat_of: HashMap::new(),
                desire: HashMap::new(),
                waiters: HashMap::new(),
                queue: VecDeque::new(),
                parked: HashMap::new(),
                vacancy,
                departures: 0,
            }),
        })
    }

    /// Number of workplaces, which is also the admission bound.
    pub fn capacity(&self) -> usize {
        self.stations.len()
    }

    /// Current occupant of a workplace, if any.
    pub fn occupant(&self, id: &WorkplaceId) -> Option<UserId> {
        self.lock_state().occupant.get(id).cloned()
    }

    /// Number of users currently occupying a workplace.
    pub fn resident_count(&self) -> usize {
        self.lock_state().seat_of.len()
    }

    /// Number of users parked waiting for a workplace.
    pub fn waiting_count(&self) -> usize {
        self.lock_state().parked.len()
    }

    /// Block until `user` is granted exclusive occupancy of `target`.
    ///
    /// Returns a one-use [`Seat`] whose `perform` must be invoked before the
    /// user's next coordinator call. A free workplace with registered waiters
    /// counts as contested and is never claimed over their heads.
    pub async fn enter(&self, user: UserId, target: WorkplaceId) -> Result<Seat, WorkshopError> {
        let station = Arc::clone(self.station(&target)?);
        let permit = self
            .admission
            .acquire()
            .await
            .map_err(|_| WorkshopError::Interrupted(user.clone()))?;
        // Held for the whole residency; repaid in full batches by leave().
        permit.forget();

        let rx = {
            let mut state = self.lock_state();
            if state.seat_of.contains_key(&user) {
                self.admission.add_permits(1);
                return Err(WorkshopError::AlreadyResident(user));
            }
            if state.desire.contains_key(&user) {
                self.admission.add_permits(1);
                return Err(WorkshopError::AlreadyWaiting(user));
            }
            if !state.occupant.contains_key(&target) && !state.waiters.contains_key(&target) {
                tracing::debug!(user = %user, workplace = %target, "workplace free, entering");
                return Ok(state.grant(&station, user, None));
            }
            tracing::debug!(user = %user, workplace = %target, "workplace contested, queueing");
            state.enqueue(user.clone(), target)
        };
        rx.await.map_err(|_| WorkshopError::Interrupted(user))
    }

    /// Exchange the caller's current workplace for `target` without first
    /// releasing it to the general pool.
    ///
    /// Grants immediately when `target` is free and uncontested, by rotation
    /// when the caller closes a wait-for cycle, and by queued waiting
    /// otherwise. While waiting, the caller's current workplace remains
    /// occupied by it.
    pub async fn switch_to(
        &self,
        user: UserId,
        target: WorkplaceId,
    ) -> Result<Seat, WorkshopError> {
        let station = Arc::clone(self.station(&target)?);
        let rx = {
            let mut state = self.lock_state();
            let Some(current) = state.seat_of.get(&user).cloned() else {
                return Err(WorkshopError::NotResident(user));
            };
            if state.desire.contains_key(&user) {
                return Err(WorkshopError::AlreadyWaiting(user));
            }
            if !state.occupant.contains_key(&target) && !state.waiters.contains_key(&target) {
                let departed = Gate::new(1);
                state.vacate(&user, &current, departed.clone());
                let seat = state.grant(&station, user.clone(), Some(departed));
                tracing::debug!(user = %user, from = %current, to = %target, "switched directly");
                // The old seat just became free; the head chain may resolve.
                state.advance_queue(&self.stations);
                return Ok(seat);
            }

            // Try cycle, else queue.
            state.desire.insert(user.clone(), target.clone());
            if let Some(ring) = state.find_cycle(&user) {
                tracing::debug!(user = %user, len = ring.len(), "rotation detected");
                let seat = state.rotate(&ring, &self.stations);
                state.advance_queue(&self.stations);
                return seat.ok_or(WorkshopError::Interrupted(user));
            }
            tracing::debug!(user = %user, from = %current, to = %target, "workplace contested, queueing");
            let rx = state.enqueue(user.clone(), target);
            // The caller is now an occupant with a desire, which may have
            // completed the queue head's chain.
            state.advance_queue(&self.stations);
            rx
        };
        rx.await.map_err(|_| WorkshopError::Interrupted(user))
    }

    /// Release the caller's occupancy.
    ///
    /// Every full generation of departures refills the admission throttle in
    /// one batch. Calling without occupancy is a precondition violation and
    /// leaves shared state untouched.
    pub fn leave(&self, user: &UserId) -> Result<(), WorkshopError> {
        let mut state = self.lock_state();
        let Some(seat) = state.seat_of.remove(user) else {
            return Err(WorkshopError::NotResident(user.clone()));
        };
        state.occupant.remove(&seat);
        state.departures += 1;
        tracing::debug!(user = %user, workplace = %seat, "left workplace");
        if state.departures == self.stations.len() {
            state.departures = 0;
            self.admission.add_permits(self.stations.len());
            tracing::debug!(
                permits = self.stations.len(),
                "admission generation complete, refilling"
            );
        }
        state.advance_queue(&self.stations);
        Ok(())
    }

    fn station(&self, id: &WorkplaceId) -> Result<&Arc<Station>, WorkshopError> {
        self.stations
            .get(id)
            .ok_or_else(|| WorkshopError::UnknownWorkplace(id.clone()))
    }

    fn lock_state(&self) -> MutexGuard<'_, CoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CoreState {
    /// Record occupancy and build the seat for a grant. The seat's ready gate
    /// is whatever gate the workplace's previous departure armed.
    fn grant(&mut self, station: &Arc<Station>, user: UserId, vacated: Option<Gate>) -> Seat {
        self.occupant.insert(station.id.clone(), user.clone());
        self.seat_of.insert(user, station.id.clone());
        let ready = self
            .vacancy
            .get(&station.id)
            .cloned()
            .unwrap_or_else(Gate::open);
        Seat {
            station: Arc::clone(station),
            ready,
            vacated,
        }
    }

    /// Clear `user`'s occupancy of `seat` and arm the gate its successor
    /// must wait on.
    fn vacate(&mut self, user: &UserId, seat: &WorkplaceId, departed: Gate) {
        self.occupant.remove(seat);
        self.seat_of.remove(user);
        self.vacancy.insert(seat.clone(), departed);
    }

    /// Register `user` as a waiter for `target` and park it.
    fn enqueue(&mut self, user: UserId, target: WorkplaceId) -> oneshot::Receiver<Seat> {
        self.desire.insert(user.clone(), target.clone());
        *self.waiters.entry(target).or_insert(0) += 1;
        self.queue.push_back(user.clone());
        let (tx, rx) = oneshot::channel();
        self.parked.insert(user, tx);
        rx
    }

    /// Drop one registered waiter for `target`; the entry disappears at zero
    /// so absence keeps meaning "uncontested".
    fn drop_waiter(&mut self, target: &WorkplaceId) {
        if let Some(count) = self.waiters.get_mut(target) {
            *count -= 1;
            if *count == 0 {
                self.waiters.remove(target);
            }
        }
    }

    /// Chase "who occupies the workplace I desire" starting from `user`.
    ///
    /// Returns the ring of participants in chase order when the chase comes
    /// back to `user`. Outside of this registration moment the wait-for graph
    /// is acyclic (rings are resolved the instant they close), but the chase
    /// is bounded by the resident count regardless.
    fn find_cycle(&self, user: &UserId) -> Option<Vec<UserId>> {
        let mut ring = vec![user.clone()];
        loop {
            if ring.len() > self.seat_of.len() {
                return None;
            }
            let cur = ring.last()?;
            let wanted = self.desire.get(cur)?;
            let next = self.occupant.get(wanted)?;
            if next == user {
                return Some(ring);
            }
            ring.push(next.clone());
        }
    }

    /// Resolve a detected rotation: every participant vacates and occupies in
    /// one critical section, sharing a single gate so their actions proceed
    /// together. Returns the initiating caller's seat; parked participants
    /// receive theirs through their resume channels.
    fn rotate(
        &mut self,
        ring: &[UserId],
        stations: &HashMap<WorkplaceId, Arc<Station>>,
    ) -> Option<Seat> {
        let gate = Gate::new(ring.len());
        // Everyone vacates first so each grant picks up the gate armed by its
        // predecessor around the ring.
        for user in ring {
            if let Some(seat) = self.seat_of.get(user).cloned() {
                self.vacate(user, &seat, gate.clone());
            }
        }
        let mut own_seat = None;
        for user in ring {
            let Some(target) = self.desire.remove(user) else {
                continue;
            };
            self.queue.retain(|queued| queued != user);
            let Some(station) = stations.get(&target) else {
                continue;
            };
            let seat = self.grant(station, user.clone(), Some(gate.clone()));
            if let Some(tx) = self.parked.remove(user) {
                // Only parked participants were counted as waiters; the
                // initiating caller had not registered yet.
                self.drop_waiter(&target);
                let _ = tx.send(seat);
            } else {
                own_seat = Some(seat);
            }
        }
        own_seat
    }

    /// Grant as many head-of-queue chains as currently resolve. Each resolved
    /// chain can free a switcher head's old seat, so keep re-examining the
    /// new head until it is blocked.
    fn advance_queue(&mut self, stations: &HashMap<WorkplaceId, Arc<Station>>) {
        while self.advance_head(stations) {}
    }

    /// Try to resolve the chain starting at the queue head.
    ///
    /// Follows each link's desired workplace to its occupant. A chain
    /// resolves only when it ends at a desired workplace that is actually
    /// free; a link whose occupant desires nothing is a dead end and nobody
    /// is woken. Only the head is ever examined: FIFO order decides who may
    /// claim a newly freed workplace first.
    fn advance_head(&mut self, stations: &HashMap<WorkplaceId, Arc<Station>>) -> bool {
        let Some(head) = self.queue.front().cloned() else {
            return false;
        };
        let mut chain = vec![head];
        loop {
            if chain.len() > self.seat_of.len() + 1 {
                return false;
            }
            let Some(cur) = chain.last() else {
                return false;
            };
            let Some(wanted) = self.desire.get(cur) else {
                return false;
            };
            match self.occupant.get(wanted) {
                Some(next) => chain.push(next.clone()),
                None => break,
            }
        }
        tracing::debug!(len = chain.len(), "advancing waiter chain");

        // Arm every departure first, exactly as in a rotation, so each grant
        // below picks up its predecessor's gate.
        let mut departed: HashMap<UserId, Gate> = HashMap::new();
        for user in &chain {
            if let Some(seat) = self.seat_of.get(user).cloned() {
                let gate = Gate::new(1);
                self.vacate(user, &seat, gate.clone());
                departed.insert(user.clone(), gate);
            }
        }
        for user in &chain {
            let Some(target) = self.desire.remove(user) else {
                continue;
            };
            self.drop_waiter(&target);
            self.queue.retain(|queued| queued != user);
            let Some(station) = stations.get(&target) else {
                continue;
            };
            let seat = self.grant(station, user.clone(), departed.remove(user));
            if let Some(tx) = self.parked.remove(user) {
                let _ = tx.send(seat);
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "workshop_tests.rs"]
mod tests;
