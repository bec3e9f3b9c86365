use std::cell::RefCell;
use std::rc::Rc;

use log::info;

use super::channel::QuantumChannel;
use super::component::QuantumComponent;
use crate::error::{QnetError, QnetResult};
use crate::quantum::Qubit;
use crate::scheduler::EventScheduler;

/// Attachment point between a component and a quantum channel
pub struct QuantumNetDevice {
    component: Rc<QuantumComponent>,
    channel: RefCell<Option<Rc<QuantumChannel>>>,
}

impl QuantumNetDevice {
    pub fn new(component: Rc<QuantumComponent>) -> Self {
        Self {
            component,
            channel: RefCell::new(None),
        }
    }

    pub fn attach(&self, channel: Rc<QuantumChannel>) {
        *self.channel.borrow_mut() = Some(channel);
    }

    pub fn channel(&self) -> Option<Rc<QuantumChannel>> {
        self.channel.borrow().clone()
    }

    pub fn component(&self) -> &Rc<QuantumComponent> {
        &self.component
    }

    /// Hands `qubit` to the channel; it leaves the component immediately
    pub fn send_qubit(&self, scheduler: &EventScheduler, qubit: Qubit) -> QnetResult<()> {
        let channel = self.channel().ok_or(QnetError::NotAttached)?;
        if channel.receiver().is_none() {
            return Err(QnetError::NotConnected);
        }
        self.component.remove_qubit(&qubit);
        info!(
            "[QuantumNetDevice] t = {}us: {} sends {:?}",
            scheduler.now().as_micros(),
            self.component.name(),
            qubit
        );
        channel.transmit(scheduler, qubit)
    }
}
