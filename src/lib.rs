pub mod config;
pub mod error;
pub mod experiments;
pub mod network;
pub mod quantum;
pub mod scheduler;

pub use config::SimulationConfig;
pub use error::{QnetError, QnetResult};
pub use network::{QuantumChannel, QuantumComponent, QuantumNetDevice};
pub use quantum::{QuantumState, Qubit, StateRegistry};
pub use scheduler::EventScheduler;
