//! Entanglement-aware quantum state management: shared states, qubit
//! handles and the registry linking them.

pub mod backend;
pub mod gates;
pub mod qubit;
pub mod registry;
pub mod state;

pub use backend::{Amplitudes, Operator};
pub use qubit::{Qubit, WeakQubit};
pub use registry::StateRegistry;
pub use state::{QuantumState, SharedState, StateId, StateSnapshot};

#[cfg(test)]
mod tests;
