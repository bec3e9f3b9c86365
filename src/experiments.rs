//! Repeated-trial experiments. Trials are independent and run in parallel;
//! every worker thread keeps its own state registry.

use std::rc::Rc;
use std::time::Duration;

use rayon::prelude::*;
use serde::Serialize;

use crate::error::{QnetError, QnetResult};
use crate::network::{QuantumChannel, QuantumComponent, QuantumNetDevice};
use crate::quantum::gates;
use crate::scheduler::EventScheduler;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub zeros: usize,
    pub ones: usize,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: u8) {
        if outcome == 0 {
            self.zeros += 1;
        } else {
            self.ones += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.zeros + self.ones
    }

    /// Distance of the ones count from n/2, in standard deviations of a fair coin
    pub fn deviation_sigmas(&self) -> f64 {
        let n = self.total() as f64;
        if n == 0.0 {
            return 0.0;
        }
        let sigma = (n * 0.25).sqrt();
        (self.ones as f64 - n / 2.0).abs() / sigma
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BellStatistics {
    pub trials: usize,
    /// Trials where both halves gave the same outcome
    pub agreements: usize,
    /// Outcomes of the half that stayed local
    pub local: OutcomeCounts,
}

fn trial_seed(seed: Option<u64>, trial: usize) -> Option<u64> {
    seed.map(|s| s.wrapping_add(trial as u64))
}

/// Prepares |0>, applies H and measures, once per trial
pub fn hadamard_statistics(trials: usize, seed: Option<u64>) -> QnetResult<OutcomeCounts> {
    let outcomes = (0..trials)
        .into_par_iter()
        .map(|trial| {
            let component = QuantumComponent::with_optional_seed(format!("trial-{}", trial), trial_seed(seed, trial));
            let qubit = component.create_qubit(None);
            component.apply_single(&gates::hadamard(), &qubit)?;
            component.measure(&qubit)
        })
        .collect::<QnetResult<Vec<u8>>>()?;

    let mut counts = OutcomeCounts::default();
    for outcome in outcomes {
        counts.record(outcome);
    }
    Ok(counts)
}

fn bell_trial(trial: usize, seed: Option<u64>) -> QnetResult<(u8, u8)> {
    let scheduler = EventScheduler::new();
    let alice = Rc::new(QuantumComponent::with_optional_seed("alice", trial_seed(seed, 2 * trial)));
    let bob = Rc::new(QuantumComponent::with_optional_seed("bob", trial_seed(seed, 2 * trial + 1)));

    let mut channel = QuantumChannel::new(Duration::ZERO);
    channel.connect(Rc::clone(&alice), Rc::clone(&bob));
    let device = QuantumNetDevice::new(Rc::clone(&alice));
    device.attach(Rc::new(channel));

    let (local, remote) = alice.create_entangled_pair()?;
    remote.set_id("remote");
    device.send_qubit(&scheduler, remote)?;
    scheduler.run();

    let arrived = bob
        .get_qubit_by_id("remote")
        .ok_or_else(|| QnetError::UnknownQubit("remote".to_string()))?;
    let a = alice.measure(&local)?;
    let b = bob.measure(&arrived)?;
    Ok((a, b))
}

/// Creates a pair, ships one half and measures both halves, once per trial
pub fn bell_correlation(trials: usize, seed: Option<u64>) -> QnetResult<BellStatistics> {
    let pairs = (0..trials)
        .into_par_iter()
        .map(|trial| bell_trial(trial, seed))
        .collect::<QnetResult<Vec<(u8, u8)>>>()?;

    let mut stats = BellStatistics {
        trials,
        ..BellStatistics::default()
    };
    for (a, b) in pairs {
        stats.local.record(a);
        if a == b {
            stats.agreements += 1;
        }
    }
    Ok(stats)
}
