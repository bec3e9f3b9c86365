use super::backend::{self, EPSILON};
use super::registry::{self, StateRegistry};
use super::*;
use crate::error::QnetError;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

fn shared(num_qubits: usize) -> SharedState {
    QuantumState::new(num_qubits).into_shared()
}

#[test]
fn test_state_ids_follow_creation_order() {
    let a = QuantumState::new(1);
    let b = QuantumState::new(1);
    let c = a.combine(&b);
    assert!(a.id() < b.id());
    assert!(b.id() < c.id());
}

#[test]
fn test_apply_rejects_bad_targets() {
    let mut state = QuantumState::new(2);
    assert!(matches!(
        state.apply(&gates::hadamard(), &[2]),
        Err(QnetError::InvalidTarget { index: 2, qubits: 2 })
    ));
    assert!(matches!(
        state.apply(&gates::cnot(), &[1, 1]),
        Err(QnetError::DuplicateTarget(1))
    ));
    assert!(matches!(
        state.apply(&gates::cnot(), &[0]),
        Err(QnetError::GateDimension { expected: 2, .. })
    ));
    let scaled = gates::hadamard() * Complex64::new(2.0, 0.0);
    assert!(matches!(state.apply(&scaled, &[0]), Err(QnetError::NonUnitary(_))));
    // failed calls leave the vector untouched
    assert!((state.amplitudes()[0] - Complex64::new(1.0, 0.0)).norm() < EPSILON);
}

#[test]
fn test_gates_on_one_state_keep_size_and_norm() {
    let mut state = QuantumState::new(3);
    let sequence = [
        (gates::hadamard(), vec![0]),
        (gates::cnot(), vec![0, 2]),
        (gates::phase_t(), vec![2]),
        (gates::swap(), vec![1, 2]),
        (gates::pauli_y(), vec![1]),
        (gates::cz(), vec![2, 0]),
    ];
    for (gate, targets) in &sequence {
        state.apply(gate, targets).unwrap();
        assert_eq!(state.num_qubits(), 3);
        assert!((state.norm() - 1.0).abs() < EPSILON);
    }
}

#[test]
fn test_measure_returns_remaining_qubits() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut state = QuantumState::new(3);
    state.apply(&gates::pauli_x(), &[1]).unwrap();
    let (outcome, collapsed) = state.measure(1, &mut rng).unwrap();
    assert_eq!(outcome, 1);
    assert_eq!(collapsed.len(), 4);
    assert!((backend::norm(&collapsed) - 1.0).abs() < EPSILON);
    // the state itself is not collapsed in place
    assert_eq!(state.num_qubits(), 3);
    assert!(matches!(state.measure(3, &mut rng), Err(QnetError::InvalidTarget { .. })));
}

#[test]
fn test_combine_block_order() {
    let mut left = QuantumState::new(1);
    left.apply(&gates::pauli_x(), &[0]).unwrap();
    let right = QuantumState::new(2);
    let joint = left.combine(&right);
    assert_eq!(joint.num_qubits(), 3);
    // |1>|00> = |100>
    assert!((joint.amplitudes()[4] - Complex64::new(1.0, 0.0)).norm() < EPSILON);
}

#[test]
fn test_from_amplitudes_validation() {
    assert!(matches!(
        QuantumState::from_amplitudes(Amplitudes::from_element(3, Complex64::new(1.0, 0.0))),
        Err(QnetError::InvalidAmplitudes(3))
    ));
    assert!(matches!(
        QuantumState::from_amplitudes(Amplitudes::from_element(2, Complex64::new(0.0, 0.0))),
        Err(QnetError::InvalidAmplitudes(2))
    ));
    let state = QuantumState::from_amplitudes(Amplitudes::from_element(4, Complex64::new(3.0, 0.0))).unwrap();
    assert_eq!(state.num_qubits(), 2);
    assert!((state.norm() - 1.0).abs() < EPSILON);
}

#[test]
fn test_snapshot_serializes() {
    let snapshot = QuantumState::basis(1).snapshot();
    let json = serde_json::to_string(&snapshot).unwrap();
    let back: StateSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back.amplitudes, vec![(0.0, 0.0), (1.0, 0.0)]);
}

#[test]
fn test_attach_registers_qubit() {
    let state = shared(2);
    let a = Qubit::attach(state.clone(), 0);
    let b = Qubit::attach(state.clone(), 1);
    assert!(registry::is_registered(&a));
    let related: HashSet<Qubit> = registry::related_to(state.borrow().id()).into_iter().collect();
    assert_eq!(related, HashSet::from([a, b]));
}

#[test]
fn test_register_is_idempotent() {
    let q = Qubit::attach(shared(1), 0);
    StateRegistry::with(|r| {
        r.register(&q);
        r.register(&q);
    });
    assert_eq!(registry::related_to(q.state_id()).len(), 1);
}

#[test]
fn test_unregister_drops_empty_bucket() {
    let q = Qubit::attach(shared(1), 0);
    let before = registry::bucket_count();
    StateRegistry::with(|r| r.unregister(&q));
    assert!(!registry::is_registered(&q));
    assert_eq!(registry::bucket_count(), before - 1);
    assert!(registry::related_to(q.state_id()).is_empty());
}

#[test]
fn test_related_to_ignores_insertion_order() {
    let state = shared(3);
    let qubits: Vec<Qubit> = (0..3).map(|i| Qubit::attach(state.clone(), i)).collect();
    let id = state.borrow().id();

    let forward: HashSet<Qubit> = registry::related_to(id).into_iter().collect();
    StateRegistry::with(|r| {
        for q in &qubits {
            r.unregister(q);
        }
        for q in qubits.iter().rev() {
            r.register(q);
        }
    });
    let reversed: HashSet<Qubit> = registry::related_to(id).into_iter().collect();
    assert_eq!(forward, reversed);
    assert_eq!(forward.len(), 3);
}

#[test]
fn test_dropped_qubit_leaves_no_bucket() {
    let baseline = registry::bucket_count();
    let state = shared(2);
    let keep = Qubit::attach(state.clone(), 0);
    let dropped = Qubit::attach(state.clone(), 1);
    assert_eq!(registry::bucket_count(), baseline + 1);

    drop(dropped);
    assert_eq!(registry::related_to(state.borrow().id()), vec![keep.clone()]);
    drop(keep);
    assert_eq!(registry::bucket_count(), baseline);
}

#[test]
fn test_registry_does_not_keep_states_alive() {
    let q = Qubit::attach(shared(1), 0);
    let state = std::rc::Rc::downgrade(&q.state());
    let id = q.state_id();
    drop(q);
    assert!(state.upgrade().is_none());
    assert!(registry::related_to(id).is_empty());
}

#[test]
fn test_drop_during_borrow_is_pruned_later() {
    let state = shared(2);
    let keep = Qubit::attach(state.clone(), 0);
    let a = Qubit::attach(shared(1), 0);
    let b = Qubit::attach(state.clone(), 1);
    let weak = b.downgrade();
    // the registry is busy, so neither drop can sweep its bucket
    StateRegistry::with(|_| {
        drop(a);
        drop(b);
    });
    assert!(!weak.is_alive());
    assert!(registry::prune() >= 2);
    assert_eq!(registry::related_to(keep.state_id()), vec![keep.clone()]);
    assert!(registry::verify().is_ok());
}

#[test]
fn test_relocate_moves_bucket() {
    let q = Qubit::attach(shared(1), 0);
    let old = q.state_id();
    let target = shared(2);
    StateRegistry::with(|r| q.relocate_in(r, target.clone(), 1));
    assert_eq!(q.state_id(), target.borrow().id());
    assert_eq!(q.index(), 1);
    assert!(registry::related_to(old).is_empty());
    assert_eq!(registry::related_to(q.state_id()), vec![q.clone()]);
    assert!(registry::verify().is_ok());
}
