//! Quantum component: the set of qubits local to one network node and the
//! orchestration of gates, measurements and entangled pairs over them.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::error::{QnetError, QnetResult};
use crate::quantum::backend::Operator;
use crate::quantum::gates;
use crate::quantum::registry::{self, StateRegistry};
use crate::quantum::state::{check_gate, QuantumState, SharedState, StateId, StateSnapshot};
use crate::quantum::Qubit;

/// Invoked with every qubit stored in the component
pub type QubitReceiveCallback = Rc<dyn Fn(&Qubit)>;

/// Report line for one local qubit
#[derive(Debug, Clone, Serialize)]
pub struct QubitReport {
    pub id: Option<String>,
    pub index: usize,
    pub state: StateSnapshot,
}

pub struct QuantumComponent {
    name: String,
    qubits: RefCell<Vec<Qubit>>,
    rng: RefCell<StdRng>,
    receive_callback: RefCell<Option<QubitReceiveCallback>>,
}

impl QuantumComponent {
    /// Component measuring with entropy-seeded randomness
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_rng(name, StdRng::from_entropy())
    }

    /// Component with reproducible measurement outcomes
    pub fn with_seed(name: impl Into<String>, seed: u64) -> Self {
        Self::with_rng(name, StdRng::seed_from_u64(seed))
    }

    /// Seeded when `seed` is given, entropy otherwise
    pub fn with_optional_seed(name: impl Into<String>, seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(name, seed),
            None => Self::new(name),
        }
    }

    fn with_rng(name: impl Into<String>, rng: StdRng) -> Self {
        Self {
            name: name.into(),
            qubits: RefCell::new(Vec::new()),
            rng: RefCell::new(rng),
            receive_callback: RefCell::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates a qubit in |0> with its own singleton state and stores it
    pub fn create_qubit(&self, id: Option<&str>) -> Qubit {
        let qubit = Qubit::attach(QuantumState::new(1).into_shared(), 0);
        if let Some(id) = id {
            qubit.set_id(id);
        }
        self.store_qubit(qubit.clone());
        qubit
    }

    pub fn get_qubit_by_id(&self, id: &str) -> Option<Qubit> {
        self.qubits.borrow().iter().find(|q| q.has_id(id)).cloned()
    }

    /// Arrival entry point, for created and delivered qubits alike
    pub fn store_qubit(&self, qubit: Qubit) {
        StateRegistry::with(|registry| registry.register(&qubit));
        {
            let mut qubits = self.qubits.borrow_mut();
            if !qubits.contains(&qubit) {
                qubits.push(qubit.clone());
            }
        }
        // released before the call so the callback may replace itself
        let callback = self.receive_callback.borrow().clone();
        if let Some(callback) = callback {
            callback(&qubit);
        }
    }

    /// Departure entry point.
    ///
    /// The qubit stays registered: while in flight it must still follow
    /// merges and collapses of the state it shares with local qubits.
    pub fn remove_qubit(&self, qubit: &Qubit) -> bool {
        let mut qubits = self.qubits.borrow_mut();
        let before = qubits.len();
        qubits.retain(|q| q != qubit);
        before != qubits.len()
    }

    pub fn set_receive_callback(&self, callback: QubitReceiveCallback) {
        *self.receive_callback.borrow_mut() = Some(callback);
    }

    pub fn qubits(&self) -> Vec<Qubit> {
        self.qubits.borrow().clone()
    }

    pub fn qubit_count(&self) -> usize {
        self.qubits.borrow().len()
    }

    pub fn contains(&self, qubit: &Qubit) -> bool {
        self.qubits.borrow().contains(qubit)
    }

    /// Creates a Bell pair (|00> + |11>)/√2.
    ///
    /// The first half is stored locally; both are returned.
    pub fn create_entangled_pair(&self) -> QnetResult<(Qubit, Qubit)> {
        let mut state = QuantumState::new(2);
        state.apply(&gates::hadamard(), &[0])?;
        state.apply(&gates::cnot(), &[0, 1])?;
        let state = state.into_shared();

        let first = Qubit::attach(state.clone(), 0);
        let second = Qubit::attach(state, 1);
        self.store_qubit(first.clone());
        debug!("{}: entangled pair in {}", self.name, first.state_id());
        Ok((first, second))
    }

    pub fn apply_single(&self, gate: &Operator, qubit: &Qubit) -> QnetResult<()> {
        self.apply_gate(gate, &[qubit])
    }

    /// Applies `gate` to `targets`, merging their states first when they
    /// live in different subsystems.
    pub fn apply_gate(&self, gate: &Operator, targets: &[&Qubit]) -> QnetResult<()> {
        if targets.is_empty() {
            return Ok(());
        }
        check_gate(gate, targets.len())?;
        for (i, target) in targets.iter().enumerate() {
            if targets[..i].iter().any(|t| t.ptr_eq(target)) {
                return Err(QnetError::DuplicateTarget(target.index()));
            }
        }

        let mut groups: BTreeMap<StateId, SharedState> = BTreeMap::new();
        for target in targets {
            groups.entry(target.state_id()).or_insert_with(|| target.state());
        }

        let state = if groups.len() == 1 {
            targets[0].state()
        } else {
            merge_states(targets, groups)?
        };

        let indices: Vec<usize> = targets.iter().map(|q| q.index()).collect();
        state.borrow_mut().apply(gate, &indices)?;
        self.debug_check_registry();
        Ok(())
    }

    /// Measures `qubit` in the Z basis and returns the outcome.
    ///
    /// Qubits entangled with it move to the collapsed state of the
    /// survivors; the measured qubit is left alone in |outcome>.
    pub fn measure(&self, qubit: &Qubit) -> QnetResult<u8> {
        let state = qubit.state();
        let measured = qubit.index();
        let siblings = registry::related_to(qubit.state_id());
        if !siblings.contains(qubit) {
            return Err(QnetError::InconsistentRegistry(format!(
                "{:?} is missing from its state's bucket",
                qubit
            )));
        }

        let (outcome, collapsed) = state.borrow().measure(measured, &mut *self.rng.borrow_mut())?;
        let survivors = QuantumState::from_amplitudes(collapsed)?.into_shared();
        let detached = QuantumState::basis(outcome).into_shared();
        debug!(
            "{}: collapse of {} -> {} for {} sibling(s)",
            self.name,
            qubit.state_id(),
            survivors.borrow().id(),
            siblings.len() - 1
        );

        StateRegistry::with(|registry| {
            for sibling in siblings.iter().filter(|s| *s != qubit) {
                let old = sibling.index();
                let new = if old > measured { old - 1 } else { old };
                sibling.relocate_in(registry, survivors.clone(), new);
            }
            qubit.relocate_in(registry, detached, 0);
        });

        self.debug_check_registry();
        Ok(outcome)
    }

    /// Index and state of every local qubit
    pub fn state_report(&self) -> Vec<QubitReport> {
        self.qubits
            .borrow()
            .iter()
            .map(|q| QubitReport {
                id: q.id(),
                index: q.index(),
                state: q.state().borrow().snapshot(),
            })
            .collect()
    }

    /// Logs every local qubit's state as JSON
    pub fn log_states(&self) -> QnetResult<()> {
        let report = self.state_report();
        info!("{}: {} qubit(s)", self.name, report.len());
        for (i, entry) in report.iter().enumerate() {
            info!("{}: qubit {} {}", self.name, i, serde_json::to_string(entry)?);
        }
        Ok(())
    }

    /// Verifies every local qubit against the registry
    pub fn check_registry(&self) -> QnetResult<()> {
        StateRegistry::with(|registry| {
            for qubit in self.qubits.borrow().iter() {
                if !registry.contains(qubit) {
                    return Err(QnetError::InconsistentRegistry(format!(
                        "{}: {:?} is not registered",
                        self.name, qubit
                    )));
                }
            }
            registry.verify()
        })
    }

    fn debug_check_registry(&self) {
        if cfg!(debug_assertions) {
            if let Err(err) = self.check_registry() {
                panic!("{}", err);
            }
        }
    }
}

/// Folds the states of `targets` into one, ordered by creation, and repoints
/// every qubit of those states at its block offset in the result.
fn merge_states(targets: &[&Qubit], groups: BTreeMap<StateId, SharedState>) -> QnetResult<SharedState> {
    let mut blocks = Vec::with_capacity(groups.len());
    let mut combined = QuantumState::new(0);
    let mut offset = 0;
    for (state_id, state) in &groups {
        let members = registry::related_to(*state_id);
        if let Some(missing) = targets
            .iter()
            .find(|t| t.state_id() == *state_id && !members.contains(t))
        {
            return Err(QnetError::InconsistentRegistry(format!(
                "{:?} is missing from the bucket of {}",
                missing, state_id
            )));
        }
        let state = state.borrow();
        combined = combined.combine(&state);
        blocks.push((offset, members));
        offset += state.num_qubits();
    }

    let combined = combined.into_shared();
    debug!(
        "merged {} state(s) into {} ({} qubits)",
        groups.len(),
        combined.borrow().id(),
        offset
    );
    StateRegistry::with(|registry| {
        for (offset, members) in &blocks {
            for qubit in members {
                qubit.relocate_in(registry, combined.clone(), offset + qubit.index());
            }
        }
    });
    Ok(combined)
}
