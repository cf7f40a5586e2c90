// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! At most one sign session at a time.

use crate::{
    errors::{ProtocolError, Result},
    protocol::SessionId,
};
use lazy_static::lazy_static;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{trace, warn};

lazy_static! {
    static ref PROCESS_FLIGHT: SingleFlight = SingleFlight::new();
}

/// Lifecycle of the most recent sign session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No session has run yet.
    Idle,
    #[allow(missing_docs)]
    Running,
    /// Finished with a signature.
    Completed,
    /// The peer said no.
    Rejected,
    /// Any other failure, including timeout and cancellation.
    Failed,
}

/// A point-in-time view of a [`SingleFlight`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlightSnapshot {
    #[allow(missing_docs)]
    pub state: SessionState,
    /// Id of the running session.
    pub session_id: Option<SessionId>,
    /// Round of the running session, zero when none is running.
    pub round: u32,
}

#[derive(Debug)]
struct FlightState {
    state: SessionState,
    session_id: Option<SessionId>,
    round: u32,
}

/// A lock admitting one running sign session. Clones share the same lock.
#[derive(Clone, Debug)]
pub struct SingleFlight {
    inner: Arc<Mutex<FlightState>>,
}

impl Default for SingleFlight {
    fn default() -> Self {
        Self::new()
    }
}

impl SingleFlight {
    /// A lock independent of every other.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FlightState {
                state: SessionState::Idle,
                session_id: None,
                round: 0,
            })),
        }
    }

    /// The lock shared by every session in this process that was not given
    /// its own.
    pub fn process_wide() -> Self {
        PROCESS_FLIGHT.clone()
    }

    #[allow(missing_docs)]
    pub fn snapshot(&self) -> FlightSnapshot {
        let inner = lock(&self.inner);
        FlightSnapshot {
            state: inner.state,
            session_id: inner.session_id.clone(),
            round: inner.round,
        }
    }

    #[allow(missing_docs)]
    pub fn is_running(&self) -> bool {
        lock(&self.inner).state == SessionState::Running
    }

    /// Takes the lock, or fails with [`ProtocolError::ResourceBusy`] without
    /// touching the running session.
    pub(crate) fn try_acquire(&self) -> Result<FlightGuard> {
        let mut inner = lock(&self.inner);
        if inner.state == SessionState::Running {
            warn!(
                "Refusing to start a sign session while round {} is running",
                inner.round
            );
            return Err(ProtocolError::ResourceBusy);
        }
        inner.state = SessionState::Running;
        inner.session_id = None;
        inner.round = 0;
        Ok(FlightGuard {
            inner: self.inner.clone(),
            outcome: SessionState::Failed,
        })
    }
}

/// Held for the lifetime of a running session. Dropping it releases the lock
/// with whatever outcome was last recorded, `Failed` by default.
#[derive(Debug)]
pub(crate) struct FlightGuard {
    inner: Arc<Mutex<FlightState>>,
    outcome: SessionState,
}

impl FlightGuard {
    pub(crate) fn begin(&self, session_id: &SessionId) {
        lock(&self.inner).session_id = Some(session_id.clone());
    }

    pub(crate) fn set_round(&self, round: u32) {
        trace!("Entering round {}", round);
        lock(&self.inner).round = round;
    }

    pub(crate) fn record(&mut self, outcome: SessionState) {
        self.outcome = outcome;
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut inner = lock(&self.inner);
        inner.state = self.outcome;
        inner.session_id = None;
        inner.round = 0;
    }
}

fn lock(inner: &Mutex<FlightState>) -> MutexGuard<'_, FlightState> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn second_acquire_is_busy_until_release() {
        let flight = SingleFlight::new();
        let mut guard = flight.try_acquire().unwrap();
        let session_id = SessionId::random(&mut OsRng);
        guard.begin(&session_id);
        guard.set_round(3);

        assert_eq!(flight.try_acquire().unwrap_err(), ProtocolError::ResourceBusy);
        let snapshot = flight.snapshot();
        assert_eq!(snapshot.state, SessionState::Running);
        assert_eq!(snapshot.round, 3);
        assert_eq!(snapshot.session_id, Some(session_id));

        guard.record(SessionState::Completed);
        drop(guard);
        assert_eq!(flight.snapshot().state, SessionState::Completed);
        assert_eq!(flight.snapshot().session_id, None);
        assert!(flight.try_acquire().is_ok());
    }

    #[test]
    fn dropped_guard_defaults_to_failed() {
        let flight = SingleFlight::new();
        drop(flight.try_acquire().unwrap());
        assert_eq!(flight.snapshot().state, SessionState::Failed);
        assert!(!flight.is_running());
    }

    #[test]
    fn independent_flights_do_not_contend() {
        let a = SingleFlight::new();
        let b = SingleFlight::new();
        let _held = a.try_acquire().unwrap();
        assert!(b.try_acquire().is_ok());
        assert!(a.clone().try_acquire().is_err());
    }
}
