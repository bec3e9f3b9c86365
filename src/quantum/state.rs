use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::backend::{self, Amplitudes, Operator, EPSILON};
use crate::error::{QnetError, QnetResult};

// Creation sequence shared by every state in the process
static NEXT_STATE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a quantum state, ordered by creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(u64);

impl StateId {
    fn next() -> Self {
        StateId(NEXT_STATE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state#{}", self.0)
    }
}

/// State shared by every qubit positioned in it
pub type SharedState = Rc<RefCell<QuantumState>>;

/// Normalized amplitude vector over `num_qubits` qubits
#[derive(Debug)]
pub struct QuantumState {
    id: StateId,
    amplitudes: Amplitudes,
    num_qubits: usize,
}

/// Serializable dump of a state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub id: StateId,
    pub num_qubits: usize,
    /// (re, im) per basis state
    pub amplitudes: Vec<(f64, f64)>,
}

impl QuantumState {
    /// |0...0> over `num_qubits` qubits
    pub fn new(num_qubits: usize) -> Self {
        Self {
            id: StateId::next(),
            amplitudes: backend::zero_state(num_qubits),
            num_qubits,
        }
    }

    /// Post-measurement singleton |0> or |1>
    pub fn basis(outcome: u8) -> Self {
        Self {
            id: StateId::next(),
            amplitudes: backend::basis_state(&[outcome]),
            num_qubits: 1,
        }
    }

    /// Wraps an amplitude vector, normalizing it
    pub fn from_amplitudes(mut amplitudes: Amplitudes) -> QnetResult<Self> {
        let num_qubits = backend::qubit_count(amplitudes.len())
            .ok_or(QnetError::InvalidAmplitudes(amplitudes.len()))?;
        backend::normalize(&mut amplitudes)?;
        Ok(Self {
            id: StateId::next(),
            amplitudes,
            num_qubits,
        })
    }

    pub fn into_shared(self) -> SharedState {
        Rc::new(RefCell::new(self))
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn amplitudes(&self) -> &Amplitudes {
        &self.amplitudes
    }

    pub fn norm(&self) -> f64 {
        backend::norm(&self.amplitudes)
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|a| a.norm_sqr()).collect()
    }

    fn check_target(&self, index: usize) -> QnetResult<()> {
        if index >= self.num_qubits {
            return Err(QnetError::InvalidTarget {
                index,
                qubits: self.num_qubits,
            });
        }
        Ok(())
    }

    /// Applies `unitary` at `targets` (positions within this state)
    pub fn apply(&mut self, unitary: &Operator, targets: &[usize]) -> QnetResult<()> {
        for (i, &t) in targets.iter().enumerate() {
            self.check_target(t)?;
            if targets[..i].contains(&t) {
                return Err(QnetError::DuplicateTarget(t));
            }
        }
        check_gate(unitary, targets.len())?;

        self.amplitudes = backend::apply_unitary(&self.amplitudes, self.num_qubits, unitary, targets);
        backend::normalize(&mut self.amplitudes)?;
        Ok(())
    }

    /// Measures `target`, returning the outcome and the collapsed vector of
    /// the remaining qubits. The state itself is left untouched.
    pub fn measure<R: Rng + ?Sized>(&self, target: usize, rng: &mut R) -> QnetResult<(u8, Amplitudes)> {
        self.check_target(target)?;
        let (outcome, collapsed) = backend::project_measure(&self.amplitudes, self.num_qubits, target, rng);
        debug!("{} measured at {} -> {}", self.id, target, outcome);
        Ok((outcome, collapsed))
    }

    /// `self ⊗ other`: this state's qubits first, then `other`'s
    pub fn combine(&self, other: &QuantumState) -> QuantumState {
        QuantumState {
            id: StateId::next(),
            amplitudes: backend::tensor(&self.amplitudes, &other.amplitudes),
            num_qubits: self.num_qubits + other.num_qubits,
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            id: self.id,
            num_qubits: self.num_qubits,
            amplitudes: self.amplitudes.iter().map(|a| (a.re, a.im)).collect(),
        }
    }
}

/// Checks that `unitary` is a 2^k x 2^k unitary for `targets` qubits
pub fn check_gate(unitary: &Operator, targets: usize) -> QnetResult<()> {
    let expected = 1usize << targets;
    if unitary.nrows() != expected || unitary.ncols() != expected {
        return Err(QnetError::GateDimension {
            rows: unitary.nrows(),
            cols: unitary.ncols(),
            expected,
            targets,
        });
    }
    let deviation = backend::unitarity_deviation(unitary);
    if deviation > EPSILON.sqrt() {
        return Err(QnetError::NonUnitary(deviation));
    }
    Ok(())
}
