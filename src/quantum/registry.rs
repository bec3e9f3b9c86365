//! Reverse index from a quantum state to the qubits positioned in it.

use std::cell::RefCell;
use std::collections::HashMap;

use log::debug;

use super::qubit::{Qubit, WeakQubit};
use super::state::StateId;
use crate::error::{QnetError, QnetResult};

thread_local! {
    static REGISTRY: RefCell<StateRegistry> = RefCell::new(StateRegistry::default());
}

/// Maps each state to the qubits currently positioned in it.
///
/// Holds only weak references: it never keeps a qubit (and through it a
/// state) alive. A dropped qubit sweeps its own bucket; references missed
/// while the registry was borrowed are pruned on the next read.
#[derive(Default)]
pub struct StateRegistry {
    buckets: HashMap<StateId, Vec<WeakQubit>>,
}

impl StateRegistry {
    /// Runs `f` against the registry of the current thread.
    ///
    /// Must not be nested: `f` may not create qubits or call `with` again.
    pub(crate) fn with<R>(f: impl FnOnce(&mut StateRegistry) -> R) -> R {
        REGISTRY.with(|registry| f(&mut registry.borrow_mut()))
    }

    /// Adds `qubit` under its current state; no-op when already present
    pub(crate) fn register(&mut self, qubit: &Qubit) {
        let bucket = self.buckets.entry(qubit.state_id()).or_default();
        if !bucket.iter().any(|w| w.points_to(qubit)) {
            bucket.push(qubit.downgrade());
        }
    }

    /// Removes `qubit` from its current state's bucket, dropping the bucket
    /// once it holds no live qubits
    pub(crate) fn unregister(&mut self, qubit: &Qubit) {
        let state_id = qubit.state_id();
        if let Some(bucket) = self.buckets.get_mut(&state_id) {
            bucket.retain(|w| w.is_alive() && !w.points_to(qubit));
            if bucket.is_empty() {
                self.buckets.remove(&state_id);
                debug!("registry dropped {}", state_id);
            }
        }
    }

    /// Every live qubit positioned in `state`, in registration order
    pub fn related_to(&mut self, state: StateId) -> Vec<Qubit> {
        let Some(bucket) = self.buckets.get_mut(&state) else {
            return Vec::new();
        };
        let mut live = Vec::with_capacity(bucket.len());
        bucket.retain(|w| match w.upgrade() {
            Some(q) => {
                live.push(q);
                true
            }
            None => false,
        });
        if bucket.is_empty() {
            self.buckets.remove(&state);
        }
        live
    }

    /// Drops dead references under `state`, and the bucket once it is empty
    fn sweep(&mut self, state: StateId) {
        if let Some(bucket) = self.buckets.get_mut(&state) {
            bucket.retain(WeakQubit::is_alive);
            if bucket.is_empty() {
                self.buckets.remove(&state);
                debug!("registry dropped {}", state);
            }
        }
    }

    pub fn contains(&self, qubit: &Qubit) -> bool {
        self.buckets
            .get(&qubit.state_id())
            .map_or(false, |bucket| bucket.iter().any(|w| w.points_to(qubit)))
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Sweeps dead references from every bucket; returns how many were removed
    pub fn prune(&mut self) -> usize {
        let mut removed = 0;
        self.buckets.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(WeakQubit::is_alive);
            removed += before - bucket.len();
            !bucket.is_empty()
        });
        removed
    }

    /// Checks that every live qubit is filed under the state it points at
    pub fn verify(&self) -> QnetResult<()> {
        for (state_id, bucket) in &self.buckets {
            for qubit in bucket.iter().filter_map(WeakQubit::upgrade) {
                if qubit.state_id() != *state_id {
                    return Err(QnetError::InconsistentRegistry(format!(
                        "{:?} is filed under {} but points at {}",
                        qubit,
                        state_id,
                        qubit.state_id()
                    )));
                }
                if qubit.index() >= qubit.state().borrow().num_qubits() {
                    return Err(QnetError::InconsistentRegistry(format!(
                        "{:?} has an index outside its state",
                        qubit
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Shorthand for [`StateRegistry::related_to`] on the thread's registry
pub fn related_to(state: StateId) -> Vec<Qubit> {
    StateRegistry::with(|registry| registry.related_to(state))
}

/// Shorthand for [`StateRegistry::contains`] on the thread's registry
pub fn is_registered(qubit: &Qubit) -> bool {
    StateRegistry::with(|registry| registry.contains(qubit))
}

/// Number of states with at least one registered qubit on this thread
pub fn bucket_count() -> usize {
    StateRegistry::with(|registry| registry.bucket_count())
}

/// Shorthand for [`StateRegistry::prune`] on the thread's registry
pub fn prune() -> usize {
    StateRegistry::with(StateRegistry::prune)
}

/// Shorthand for [`StateRegistry::verify`] on the thread's registry
pub fn verify() -> QnetResult<()> {
    StateRegistry::with(|registry| registry.verify())
}

/// Called when a qubit is dropped while positioned in `state`.
///
/// Skipped when the registry is already borrowed or torn down; the dead
/// reference is then pruned on the next read of that bucket.
pub(crate) fn release(state: StateId) {
    let _ = REGISTRY.try_with(|registry| {
        if let Ok(mut registry) = registry.try_borrow_mut() {
            registry.sweep(state);
        }
    });
}
