//! Learning rules and learning methods.
//!
//! A [`LearningRule`] computes one weight update from a set of targets and
//! applies it to the network. A [`LearningMethod`] decides how often and on
//! which targets the rule is applied.
//!
//! ## Rules
//!
//! ```text
//! Hebbian:       ΔW = Σ_s φ(s) ⊗ φ(s)            Δb = Σ_s φ(s)
//! Delta:         p  = sweep(activation(noise(s)))
//!                ΔW = Σ_s (s - p) ⊗ s            Δb = Σ_s (s - p)
//! ThermalDelta:  Delta, each term scaled by exp(-‖W s‖₂ / T)
//! ```
//!
//! Every update is scaled by the learning rate, added to `W` and `b`, and the
//! structural constraints are re-applied. Delta probes take a single update
//! sweep, not a full relaxation, so the rule corrects the network's own
//! one-step dynamics.

pub mod noise;

pub use noise::NoiseMethod;

use crate::core::{ConfigError, Dynamics, Network, Scratch, State};
use crate::pool;
use crate::utils::{l2_norm, outer};
use ndarray::{Array1, Array2};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Per-target learning data recorded after every epoch (intensive collection only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnStateRecord {
    /// Cumulative epoch index, starting at 0.
    pub epoch: usize,
    /// Index into the targets passed to `learn_states`.
    pub target_index: usize,
    /// Unit energies of the target after the epoch's update.
    pub energy_profile: Vec<f64>,
    /// Whether the target was stable after the epoch's update.
    pub stable: bool,
}

/// How one weight update is computed from a set of targets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningRule {
    /// Outer-product rule. Needs no probing.
    #[default]
    Hebbian,
    /// Error-correcting rule driven by one update sweep of a noisy probe.
    Delta,
    /// Delta with each term damped by `exp(-‖W s‖₂ / T)`.
    ThermalDelta { temperature: f64 },
}

impl fmt::Display for LearningRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearningRule::Hebbian => write!(f, "hebbian"),
            LearningRule::Delta => write!(f, "delta"),
            LearningRule::ThermalDelta { temperature } => write!(f, "thermal_delta(T={temperature})"),
        }
    }
}

impl LearningRule {
    /// # Errors
    /// Rejects a non-positive or non-finite thermal temperature.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            LearningRule::ThermalDelta { temperature } if !(temperature.is_finite() && *temperature > 0.0) => {
                Err(ConfigError::invalid_value(
                    "temperature",
                    format!("must be positive and finite, got {temperature}"),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Compute one update from `targets` and apply it to `network`.
    pub fn apply(&self, network: &mut Network, targets: &[State]) {
        match self {
            LearningRule::Hebbian => hebbian(network, targets),
            LearningRule::Delta => delta(network, targets, None),
            LearningRule::ThermalDelta { temperature } => delta(network, targets, Some(*temperature)),
        }
    }
}

/// Schedule on which a [`LearningRule`] is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningMethod {
    /// Present every target on every epoch.
    #[default]
    FullSet,
    /// On iteration `k` present the first `k` batches as a full set. The last
    /// batch may be short.
    IterativeBatch { batch_size: usize },
}

impl LearningMethod {
    /// # Errors
    /// Rejects a zero batch size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            LearningMethod::IterativeBatch { batch_size: 0 } => {
                Err(ConfigError::invalid_value("batch_size", "must be positive"))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn run(&self, network: &mut Network, targets: &[State]) -> Vec<LearnStateRecord> {
        let mut records = Vec::new();
        if targets.is_empty() {
            return records;
        }
        match *self {
            LearningMethod::FullSet => {
                full_set(network, targets, 0, &mut records);
            }
            LearningMethod::IterativeBatch { batch_size } => {
                let num_batches = targets.len().div_ceil(batch_size);
                let mut epochs_passed = 0;
                for iteration in 1..=num_batches {
                    let end = (iteration * batch_size).min(targets.len());
                    epochs_passed += full_set(network, &targets[..end], epochs_passed, &mut records);
                }
            }
        }
        records
    }
}

/// Apply the rule until every target is stable or the epoch cap is hit.
///
/// Returns the number of epochs used.
fn full_set(
    network: &mut Network,
    targets: &[State],
    epoch_offset: usize,
    records: &mut Vec<LearnStateRecord>,
) -> usize {
    let rule = network.config.learning_rule;
    let epochs = network.config.epochs;

    for epoch in 0..epochs {
        rule.apply(network, targets);

        if network.config.intensive_collection {
            let dynamics = network.dynamics();
            records.extend(targets.iter().enumerate().map(|(target_index, target)| {
                LearnStateRecord {
                    epoch: epoch_offset + epoch,
                    target_index,
                    energy_profile: dynamics.all_unit_energies(target.view()).to_vec(),
                    stable: dynamics.state_is_stable(target.view()),
                }
            }));
        }

        if network.all_states_are_stable(targets) {
            debug!(epoch, targets = targets.len(), "all targets stable");
            return epoch + 1;
        }
    }

    warn!(
        epochs,
        targets = targets.len(),
        rule = %rule,
        "epoch cap reached before all targets were stable"
    );
    epochs
}

fn hebbian(network: &mut Network, targets: &[State]) {
    let n = network.dimension();
    let domain = network.domain();
    let (delta_w, delta_b) = targets
        .par_iter()
        .map(|state| {
            let mapped = domain.learning_map(state.view());
            (outer(mapped.view(), mapped.view()), mapped)
        })
        .reduce(
            || (Array2::zeros((n, n)), Array1::zeros(n)),
            |(mut acc_w, mut acc_b), (w, b)| {
                acc_w += &w;
                acc_b += &b;
                (acc_w, acc_b)
            },
        );
    network.apply_update(&delta_w, &delta_b);
}

fn delta(network: &mut Network, targets: &[State], temperature: Option<f64>) {
    let n = network.dimension();
    let workers = network.config.learning_workers;
    let noise = network.config.noise_method;
    let scale = network.config.noise_scale;

    let differences: Vec<Array1<f64>> = if workers > 1 {
        let master_seed: u64 = network.rng.gen();
        let dynamics = network.dynamics();
        pool::dispatch(targets.to_vec(), workers, master_seed, n, |ctx, probe| {
            probe_difference(&dynamics, &mut ctx.rng, &mut ctx.scratch, noise, scale, probe)
        })
        .into_iter()
        .map(|(_, difference)| difference)
        .collect()
    } else {
        let (dynamics, rng, scratch) = network.parts();
        targets
            .iter()
            .map(|target| {
                let mut probe = target.clone();
                probe_difference(&dynamics, &mut *rng, &mut *scratch, noise, scale, &mut probe)
            })
            .collect()
    };

    let mut delta_w = Array2::zeros((n, n));
    let mut delta_b = Array1::zeros(n);
    for (target, difference) in targets.iter().zip(&differences) {
        let weight = match temperature {
            // W here is the matrix before this epoch's update.
            Some(t) => (-l2_norm(network.weights.dot(target).view()) / t).exp(),
            None => 1.0,
        };
        delta_w.scaled_add(weight, &outer(difference.view(), target.view()));
        delta_b.scaled_add(weight, difference);
    }
    network.apply_update(&delta_w, &delta_b);
}

/// Corrupt `probe` (a copy of a target), sweep it once, and return `target - probe`.
fn probe_difference<R: Rng + ?Sized>(
    dynamics: &Dynamics<'_>,
    rng: &mut R,
    scratch: &mut Scratch,
    noise: NoiseMethod,
    scale: f64,
    probe: &mut State,
) -> Array1<f64> {
    let target = probe.clone();
    noise.apply(rng, probe, scale, dynamics.domain);
    dynamics.domain.activation(probe.view_mut());
    dynamics.update_state(rng, scratch, probe);
    target - &*probe
}
