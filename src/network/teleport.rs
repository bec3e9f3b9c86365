//! Teleportation between two components over a quantum channel and a
//! classical correction link.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use log::{error, info};
use num_complex::Complex64;
use serde::Serialize;

use super::channel::QuantumChannel;
use super::classical::{ClassicalLink, CorrectionBits};
use super::component::QuantumComponent;
use super::device::QuantumNetDevice;
use crate::config::SimulationConfig;
use crate::error::{QnetError, QnetResult};
use crate::quantum::backend::{self, Amplitudes};
use crate::quantum::state::StateSnapshot;
use crate::quantum::{gates, Qubit};
use crate::scheduler::EventScheduler;

/// Id given to the pair half that travels to the receiver
pub const TELEPORT_TARGET: &str = "teleport_target";

/// Result of one teleportation run
#[derive(Debug, Clone, Serialize)]
pub struct TeleportationReport {
    pub corrections: CorrectionBits,
    /// Receiver qubit after corrections
    pub received: StateSnapshot,
    /// |<expected|received>|^2
    pub fidelity: f64,
    pub finished_at_ns: u128,
}

/// State produced by applying `preparation` to |0>
pub fn prepared_state(preparation: &[String]) -> QnetResult<Amplitudes> {
    let mut amplitudes = backend::zero_state(1);
    for name in preparation {
        amplitudes = backend::apply_unitary(&amplitudes, 1, &gates::by_name(name)?, &[0]);
    }
    Ok(amplitudes)
}

fn fidelity(expected: &Amplitudes, actual: &Amplitudes) -> f64 {
    expected
        .iter()
        .zip(actual.iter())
        .map(|(e, a)| e.conj() * a)
        .sum::<Complex64>()
        .norm_sqr()
}

/// Alice's side once the pair half has left: prepare, entangle, measure
fn prepare_and_measure(
    alice: &QuantumComponent,
    half: &Qubit,
    preparation: &[String],
) -> QnetResult<CorrectionBits> {
    let input = alice.create_qubit(Some("psi"));
    for name in preparation {
        alice.apply_single(&gates::by_name(name)?, &input)?;
    }
    alice.apply_gate(&gates::cnot(), &[&input, half])?;
    alice.apply_single(&gates::hadamard(), &input)?;
    let m1 = alice.measure(&input)?;
    let m2 = alice.measure(half)?;
    Ok(CorrectionBits::new(m1, m2))
}

/// Bob's side: decode, look up the arrived qubit, correct it
fn receive_corrections(
    bob: &QuantumComponent,
    payload: &[u8],
    expected: &Amplitudes,
) -> QnetResult<(CorrectionBits, StateSnapshot, f64)> {
    let bits = CorrectionBits::from_bytes(payload)?;
    let target = bob
        .get_qubit_by_id(TELEPORT_TARGET)
        .ok_or_else(|| QnetError::UnknownQubit(TELEPORT_TARGET.to_string()))?;
    bits.apply(bob, &target)?;

    let state = target.state();
    let state = state.borrow();
    if state.num_qubits() != 1 {
        return Err(QnetError::Incomplete(format!(
            "received qubit still shares a {}-qubit state",
            state.num_qubits()
        )));
    }
    let fidelity = fidelity(expected, state.amplitudes());
    Ok((bits, state.snapshot(), fidelity))
}

/// Runs the full protocol on a fresh scheduler.
///
/// t = 0: Alice creates a pair and sends one half to Bob. After the quantum
/// delay she teleports the prepared input through her half and sends the
/// correction bits, which Bob applies on arrival.
pub fn run_teleportation(config: &SimulationConfig) -> QnetResult<TeleportationReport> {
    config.validate()?;
    let expected = prepared_state(&config.preparation)?;

    let scheduler = EventScheduler::new();
    let alice = Rc::new(QuantumComponent::with_optional_seed("alice", config.component_seed(1)));
    let bob = Rc::new(QuantumComponent::with_optional_seed("bob", config.component_seed(2)));

    let mut channel = QuantumChannel::new(config.quantum_delay());
    channel.set_loss_probability(config.loss_probability);
    channel.connect(Rc::clone(&alice), Rc::clone(&bob));
    let device = Rc::new(QuantumNetDevice::new(Rc::clone(&alice)));
    device.attach(Rc::new(channel));

    let link = Rc::new(ClassicalLink::new(config.classical_delay()));
    let outcome: Rc<RefCell<Option<QnetResult<TeleportationReport>>>> = Rc::new(RefCell::new(None));
    {
        let bob = Rc::clone(&bob);
        let outcome = Rc::clone(&outcome);
        link.set_receive_callback(Rc::new(move |scheduler: &EventScheduler, payload: &[u8]| {
            info!(
                "[teleport] t = {}us: bob receives corrections",
                scheduler.now().as_micros()
            );
            let result = receive_corrections(&bob, payload, &expected).map(|(corrections, received, fidelity)| {
                TeleportationReport {
                    corrections,
                    received,
                    fidelity,
                    finished_at_ns: scheduler.now().as_nanos(),
                }
            });
            if let Err(err) = &result {
                error!("[teleport] correction failed: {}", err);
            }
            *outcome.borrow_mut() = Some(result);
        }));
    }

    let setup_error: Rc<RefCell<Option<QnetError>>> = Rc::new(RefCell::new(None));
    {
        let preparation = config.preparation.clone();
        let quantum_delay = config.quantum_delay();
        let setup_error = Rc::clone(&setup_error);
        scheduler.schedule(Duration::ZERO, move |scheduler| {
            info!("[teleport] t = {}us: alice creates a pair and sends half to bob", scheduler.now().as_micros());
            let sent = alice.create_entangled_pair().and_then(|(local, remote)| {
                remote.set_id(TELEPORT_TARGET);
                device.send_qubit(scheduler, remote)?;
                Ok(local)
            });
            let local = match sent {
                Ok(local) => local,
                Err(err) => {
                    *setup_error.borrow_mut() = Some(err);
                    return;
                }
            };

            scheduler.schedule(quantum_delay, move |scheduler| {
                info!("[teleport] t = {}us: alice prepares and measures psi", scheduler.now().as_micros());
                let sent = prepare_and_measure(&alice, &local, &preparation)
                    .and_then(|bits| link.send(scheduler, bits.to_bytes().to_vec()));
                if let Err(err) = sent {
                    *setup_error.borrow_mut() = Some(err);
                }
            });
        });
    }

    scheduler.run();
    bob.log_states()?;

    if let Some(err) = setup_error.borrow_mut().take() {
        return Err(err);
    }
    let result = outcome.borrow_mut().take();
    result.unwrap_or_else(|| Err(QnetError::Incomplete("corrections never arrived".to_string())))
}
