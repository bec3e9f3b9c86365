//! Network side of the simulation: components owning qubits, quantum
//! channels and devices moving them, and the classical correction link.

pub mod channel;
pub mod classical;
pub mod component;
pub mod device;
pub mod teleport;

pub use channel::QuantumChannel;
pub use classical::{ClassicalLink, CorrectionBits};
pub use component::{QuantumComponent, QubitReceiveCallback, QubitReport};
pub use device::QuantumNetDevice;
pub use teleport::{run_teleportation, TeleportationReport, TELEPORT_TARGET};
