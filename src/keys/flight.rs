//! Single-flight execution: overlapping callers share one run and its outcome.
//!
//! The first caller to arrive becomes the leader and runs the work on its own calling
//! thread; nothing is spawned. Callers that arrive while the run is in progress block
//! on the same [`Flight`] and receive a clone of whatever the leader produced. The
//! in-flight slot is cleared before the outcome is published, so a caller woken by the
//! leader that immediately asks again starts a new run instead of re-joining the
//! finished one.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

enum State<T> {
    Pending,
    Done(T),
    Abandoned,
}

struct Flight<T> {
    state: Mutex<State<T>>,
    done: Condvar,
}

impl<T: Clone> Flight<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(State::Pending),
            done: Condvar::new(),
        }
    }

    fn publish(&self, next: State<T>) {
        *lock(&self.state) = next;
        self.done.notify_all();
    }

    fn wait(&self) -> Option<T> {
        let state = self
            .done
            .wait_while(lock(&self.state), |s| matches!(s, State::Pending))
            .unwrap_or_else(PoisonError::into_inner);
        match &*state {
            State::Done(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }
}

/// Coalesces concurrent invocations of the same operation.
pub struct SingleFlight<T> {
    slot: Mutex<Option<Arc<Flight<T>>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work`, or join the run already in progress.
    ///
    /// Returns `None` only when the leader of the joined run unwound before producing
    /// an outcome.
    pub fn run<F>(&self, work: F) -> Option<T>
    where
        F: FnOnce() -> T,
    {
        let (flight, leader) = {
            let mut slot = lock(&self.slot);
            match slot.as_ref() {
                Some(flight) => (Arc::clone(flight), false),
                None => {
                    let flight = Arc::new(Flight::new());
                    *slot = Some(Arc::clone(&flight));
                    (flight, true)
                }
            }
        };

        if !leader {
            return flight.wait();
        }

        let mut lead = Lead {
            owner: self,
            flight: &flight,
            finished: false,
        };
        let outcome = work();
        lead.finish(State::Done(outcome.clone()));
        Some(outcome)
    }

    /// `true` while a run is in progress.
    pub fn in_flight(&self) -> bool {
        lock(&self.slot).is_some()
    }

    fn clear(&self, flight: &Arc<Flight<T>>) {
        let mut slot = lock(&self.slot);
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, flight)) {
            *slot = None;
        }
    }
}

/// Leader-side handle. Dropping it without finishing (the work panicked) still clears
/// the slot and wakes every waiter.
struct Lead<'a, T: Clone> {
    owner: &'a SingleFlight<T>,
    flight: &'a Arc<Flight<T>>,
    finished: bool,
}

impl<T: Clone> Lead<'_, T> {
    fn finish(&mut self, state: State<T>) {
        self.finished = true;
        self.owner.clear(self.flight);
        self.flight.publish(state);
    }
}

impl<T: Clone> Drop for Lead<'_, T> {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(State::Abandoned);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
