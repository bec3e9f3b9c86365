//! Standard gate matrices.

use num_complex::Complex64;
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_4};

use super::backend::Operator;
use crate::error::{QnetError, QnetResult};

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn operator(dim: usize, entries: &[Complex64]) -> Operator {
    Operator::from_row_slice(dim, dim, entries)
}

pub fn identity() -> Operator {
    Operator::identity(2, 2)
}

pub fn pauli_x() -> Operator {
    operator(2, &[c(0.0, 0.0), c(1.0, 0.0), c(1.0, 0.0), c(0.0, 0.0)])
}

pub fn pauli_y() -> Operator {
    operator(2, &[c(0.0, 0.0), c(0.0, -1.0), c(0.0, 1.0), c(0.0, 0.0)])
}

pub fn pauli_z() -> Operator {
    operator(2, &[c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(-1.0, 0.0)])
}

pub fn hadamard() -> Operator {
    let h = FRAC_1_SQRT_2;
    operator(2, &[c(h, 0.0), c(h, 0.0), c(h, 0.0), c(-h, 0.0)])
}

/// Phase gate S = diag(1, i)
pub fn phase_s() -> Operator {
    operator(2, &[c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(0.0, 1.0)])
}

/// T = diag(1, e^{iπ/4})
pub fn phase_t() -> Operator {
    let t = Complex64::from_polar(1.0, FRAC_PI_4);
    operator(2, &[c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), t])
}

/// Controlled NOT; the first target is the control
pub fn cnot() -> Operator {
    let mut m = Operator::identity(4, 4);
    m.swap_rows(2, 3);
    m
}

pub fn cz() -> Operator {
    let mut m = Operator::identity(4, 4);
    m[(3, 3)] = c(-1.0, 0.0);
    m
}

pub fn swap() -> Operator {
    let mut m = Operator::identity(4, 4);
    m.swap_rows(1, 2);
    m
}

/// Looks a gate up by its lowercase name
pub fn by_name(name: &str) -> QnetResult<Operator> {
    match name.to_ascii_lowercase().as_str() {
        "i" | "id" => Ok(identity()),
        "x" => Ok(pauli_x()),
        "y" => Ok(pauli_y()),
        "z" => Ok(pauli_z()),
        "h" => Ok(hadamard()),
        "s" => Ok(phase_s()),
        "t" => Ok(phase_t()),
        "cnot" | "cx" => Ok(cnot()),
        "cz" => Ok(cz()),
        "swap" => Ok(swap()),
        _ => Err(QnetError::UnknownGate(name.to_string())),
    }
}
