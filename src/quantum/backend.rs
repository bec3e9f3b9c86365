//! Linear-algebra primitives over amplitude vectors.
//!
//! Qubit 0 is the most significant bit of a basis index, so `tensor(a, b)`
//! places the qubits of `a` before the qubits of `b`.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rand::Rng;

use crate::error::{QnetError, QnetResult};

pub type Amplitudes = DVector<Complex64>;
pub type Operator = DMatrix<Complex64>;

/// Tolerance for normalization and unitarity checks
pub const EPSILON: f64 = 1e-9;

/// Number of qubits described by a vector of `len` amplitudes
pub fn qubit_count(len: usize) -> Option<usize> {
    if len.is_power_of_two() {
        Some(len.trailing_zeros() as usize)
    } else {
        None
    }
}

/// |0...0> over `num_qubits` qubits
pub fn zero_state(num_qubits: usize) -> Amplitudes {
    let mut v = Amplitudes::from_element(1 << num_qubits, Complex64::new(0.0, 0.0));
    v[0] = Complex64::new(1.0, 0.0);
    v
}

/// Computational basis state, bits listed from qubit 0
pub fn basis_state(bits: &[u8]) -> Amplitudes {
    let index = bits
        .iter()
        .fold(0usize, |acc, &b| (acc << 1) | usize::from(b & 1));
    let mut v = Amplitudes::from_element(1 << bits.len(), Complex64::new(0.0, 0.0));
    v[index] = Complex64::new(1.0, 0.0);
    v
}

pub fn norm(v: &Amplitudes) -> f64 {
    v.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt()
}

pub fn normalize(v: &mut Amplitudes) -> QnetResult<()> {
    let n = norm(v);
    if n < EPSILON {
        return Err(QnetError::InvalidAmplitudes(v.len()));
    }
    if (n - 1.0).abs() > f64::EPSILON {
        *v /= Complex64::new(n, 0.0);
    }
    Ok(())
}

/// Largest entry of |U^H U - I|, 0 for an exactly unitary matrix
pub fn unitarity_deviation(u: &Operator) -> f64 {
    let product = u.adjoint() * u;
    let identity = Operator::identity(u.nrows(), u.ncols());
    (product - identity)
        .iter()
        .map(|z| z.norm())
        .fold(0.0_f64, f64::max)
}

/// Kronecker product `a ⊗ b`
pub fn tensor(a: &Amplitudes, b: &Amplitudes) -> Amplitudes {
    let inner = b.len();
    Amplitudes::from_fn(a.len() * inner, |i, _| a[i / inner] * b[i % inner])
}

fn bit_position(num_qubits: usize, qubit: usize) -> usize {
    num_qubits - 1 - qubit
}

/// Applies `unitary` to `targets` of an `num_qubits`-qubit vector.
///
/// `targets[0]` is the most significant qubit of the gate, matching the usual
/// matrix layout of CNOT(control, target). Inputs must already be validated.
pub fn apply_unitary(
    state: &Amplitudes,
    num_qubits: usize,
    unitary: &Operator,
    targets: &[usize],
) -> Amplitudes {
    let k = targets.len();
    let dim = 1usize << k;
    let positions: Vec<usize> = targets
        .iter()
        .map(|&t| bit_position(num_qubits, t))
        .collect();
    let mask = positions.iter().fold(0usize, |m, &p| m | (1 << p));

    // offsets[j] spreads the bits of local index j onto the target positions
    let offsets: Vec<usize> = (0..dim)
        .map(|local| {
            positions.iter().enumerate().fold(0usize, |acc, (m, &p)| {
                if (local >> (k - 1 - m)) & 1 == 1 {
                    acc | (1 << p)
                } else {
                    acc
                }
            })
        })
        .collect();

    let mut out = state.clone();
    let mut scratch = vec![Complex64::new(0.0, 0.0); dim];
    for base in (0..state.len()).filter(|i| i & mask == 0) {
        for (slot, offset) in scratch.iter_mut().zip(&offsets) {
            *slot = state[base | offset];
        }
        for (row, offset) in offsets.iter().enumerate() {
            let mut acc = Complex64::new(0.0, 0.0);
            for (col, amp) in scratch.iter().enumerate() {
                acc += unitary[(row, col)] * amp;
            }
            out[base | offset] = acc;
        }
    }
    out
}

/// Probability that `target` reads 1
pub fn probability_of_one(state: &Amplitudes, num_qubits: usize, target: usize) -> f64 {
    let pos = bit_position(num_qubits, target);
    let total: f64 = state.iter().map(|a| a.norm_sqr()).sum();
    let ones: f64 = state
        .iter()
        .enumerate()
        .filter(|(i, _)| (i >> pos) & 1 == 1)
        .map(|(_, a)| a.norm_sqr())
        .sum();
    if total < EPSILON {
        0.0
    } else {
        (ones / total).clamp(0.0, 1.0)
    }
}

/// Measures `target` in the Z basis.
///
/// Returns the outcome and the renormalized vector of the other
/// `num_qubits - 1` qubits, in their original order.
pub fn project_measure<R: Rng + ?Sized>(
    state: &Amplitudes,
    num_qubits: usize,
    target: usize,
    rng: &mut R,
) -> (u8, Amplitudes) {
    // snap numerically certain outcomes so a basis state never flips
    let p1 = match probability_of_one(state, num_qubits, target) {
        p if p < EPSILON => 0.0,
        p if p > 1.0 - EPSILON => 1.0,
        p => p,
    };
    let outcome: u8 = if rng.gen::<f64>() < p1 { 1 } else { 0 };
    let probability = if outcome == 1 { p1 } else { 1.0 - p1 };
    let scale = Complex64::new(probability.sqrt().max(EPSILON), 0.0);

    let pos = bit_position(num_qubits, target);
    let low_mask = (1usize << pos) - 1;
    let collapsed = Amplitudes::from_fn(state.len() / 2, |i, _| {
        let full = ((i >> pos) << (pos + 1)) | (usize::from(outcome) << pos) | (i & low_mask);
        state[full] / scale
    });
    (outcome, collapsed)
}
