use std::rc::Rc;
use std::time::Duration;

use log::{info, warn};

use super::component::QuantumComponent;
use crate::error::{QnetError, QnetResult};
use crate::quantum::Qubit;
use crate::scheduler::EventScheduler;

/// Point-to-point quantum link delivering qubits after a fixed delay
pub struct QuantumChannel {
    delay: Duration,
    loss_probability: f64,
    sender: Option<Rc<QuantumComponent>>,
    receiver: Option<Rc<QuantumComponent>>,
}

impl QuantumChannel {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            loss_probability: 0.0,
            sender: None,
            receiver: None,
        }
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Recorded only; delivery is unconditional
    pub fn set_loss_probability(&mut self, loss: f64) {
        if loss > 0.0 {
            warn!("loss probability {} is recorded but not applied", loss);
        }
        self.loss_probability = loss;
    }

    pub fn loss_probability(&self) -> f64 {
        self.loss_probability
    }

    pub fn connect(&mut self, sender: Rc<QuantumComponent>, receiver: Rc<QuantumComponent>) {
        self.sender = Some(sender);
        self.receiver = Some(receiver);
    }

    pub fn sender(&self) -> Option<&Rc<QuantumComponent>> {
        self.sender.as_ref()
    }

    pub fn receiver(&self) -> Option<&Rc<QuantumComponent>> {
        self.receiver.as_ref()
    }

    /// Schedules delivery of `qubit` to the receiver after the channel delay.
    ///
    /// The qubit keeps its state reference in flight, so entanglement with
    /// the qubits left behind is preserved.
    pub fn transmit(&self, scheduler: &EventScheduler, qubit: Qubit) -> QnetResult<()> {
        let receiver = Rc::clone(self.receiver.as_ref().ok_or(QnetError::NotConnected)?);
        scheduler.schedule(self.delay, move |scheduler| {
            info!(
                "[QuantumChannel] t = {}us: delivering {:?} to {}",
                scheduler.now().as_micros(),
                qubit,
                receiver.name()
            );
            receiver.store_qubit(qubit);
        });
        Ok(())
    }
}
