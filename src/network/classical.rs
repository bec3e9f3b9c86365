//! Classical side channel carrying teleportation corrections.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use super::component::QuantumComponent;
use crate::error::{QnetError, QnetResult};
use crate::quantum::{gates, Qubit};
use crate::scheduler::EventScheduler;

/// Measurement outcomes sent to the receiving side.
///
/// Encoded as two bytes `[m1, m2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionBits {
    /// Outcome of the input qubit; selects Z
    pub m1: u8,
    /// Outcome of the local pair half; selects X
    pub m2: u8,
}

impl CorrectionBits {
    pub fn new(m1: u8, m2: u8) -> Self {
        Self { m1, m2 }
    }

    pub fn to_bytes(&self) -> [u8; 2] {
        [self.m1, self.m2]
    }

    pub fn from_bytes(payload: &[u8]) -> QnetResult<Self> {
        match payload {
            [m1 @ 0..=1, m2 @ 0..=1] => Ok(Self::new(*m1, *m2)),
            [_, _] => Err(QnetError::MalformedPayload(format!("bits must be 0 or 1, got {:?}", payload))),
            _ => Err(QnetError::MalformedPayload(format!(
                "expected 2 bytes, got {}",
                payload.len()
            ))),
        }
    }

    /// X if `m2` is set, then Z if `m1` is set
    pub fn apply(&self, component: &QuantumComponent, qubit: &Qubit) -> QnetResult<()> {
        if self.m2 == 1 {
            component.apply_single(&gates::pauli_x(), qubit)?;
        }
        if self.m1 == 1 {
            component.apply_single(&gates::pauli_z(), qubit)?;
        }
        Ok(())
    }
}

pub type PayloadHandler = Rc<dyn Fn(&EventScheduler, &[u8])>;

/// Delayed byte-message link between two nodes
pub struct ClassicalLink {
    delay: Duration,
    handler: RefCell<Option<PayloadHandler>>,
}

impl ClassicalLink {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            handler: RefCell::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn set_receive_callback(&self, handler: PayloadHandler) {
        *self.handler.borrow_mut() = Some(handler);
    }

    /// Delivers `payload` to the receive callback after the link delay
    pub fn send(&self, scheduler: &EventScheduler, payload: Vec<u8>) -> QnetResult<()> {
        let handler = self.handler.borrow().clone().ok_or(QnetError::NotConnected)?;
        info!(
            "[ClassicalLink] t = {}us: sending {} byte(s)",
            scheduler.now().as_micros(),
            payload.len()
        );
        scheduler.schedule(self.delay, move |scheduler| handler(scheduler, &payload));
        Ok(())
    }
}
