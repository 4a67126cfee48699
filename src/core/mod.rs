//! Core Hopfield network implementation.
//!
//! This module provides the network itself and the operations every other
//! component builds on:
//! - Weight matrix and bias with structural constraints
//! - Per-unit and whole-state energies and the stability verdict
//! - Single-state update sweeps and bounded relaxation
//! - Concurrent batch relaxation
//! - Learning entry point
//!
//! ## Structural constraints
//!
//! After every change to `W` or `b` the network re-applies, in order:
//! ```text
//! W[i,i] = 0                (force_zero_diagonal)
//! W = (W + Wᵀ) / 2          (force_symmetric)
//! b = 0                     (force_zero_bias)
//! ```
//! No energy or relaxation query can observe an unconstrained matrix.

pub mod builder;
pub mod dynamics;

pub use builder::{NetworkBuilder, NetworkConfig};
pub use dynamics::{Dynamics, RelaxationResult, Scratch};

use crate::data;
use crate::domain::Domain;
use crate::pool;
use crate::training::LearnStateRecord;
use ndarray::{Array1, Array2};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// A state vector. Components lie in the network's [`Domain`].
pub type State = Array1<f64>;

/// Invalid configuration detected before a network or generator is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Error type for fallible network operations.
#[derive(Debug, Error)]
pub enum HopfieldError {
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A stored vector collection whose members differ in length.
    #[error("Ragged collection: vector {index} has length {actual}, expected {expected}")]
    RaggedCollection {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type HopfieldResult<T> = Result<T, HopfieldError>;

/// A Hopfield network over a fixed [`Domain`].
///
/// Built with [`NetworkBuilder`] or [`NetworkConfig::build`]. The weights are
/// changed only by [`Network::learn_states`] (and by [`Network::load_weights`]
/// when restoring a checkpoint); every probing operation reads them.
pub struct Network {
    pub(crate) config: NetworkConfig,
    pub(crate) weights: Array2<f64>,
    pub(crate) bias: Array1<f64>,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) scratch: Scratch,
    pub(crate) learned_states: Vec<State>,
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("dimension", &self.dimension())
            .field("domain", &self.domain())
            .field("learning_rule", &self.config.learning_rule)
            .field("learned_states", &self.learned_states.len())
            .finish()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Hopfield Network")?;
        writeln!(f, "\tDimension: {}", self.dimension())?;
        writeln!(f, "\tDomain: {}", self.domain())?;
        writeln!(f, "\tLearning rule: {}", self.config.learning_rule)?;
        write!(f, "\tLearned states: {}", self.learned_states.len())
    }
}

impl Network {
    /// Start a [`NetworkBuilder`] with default settings.
    pub fn builder() -> NetworkBuilder {
        NetworkBuilder::new()
    }

    /// Number of units.
    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Domain every state of this network lives in.
    pub fn domain(&self) -> Domain {
        self.config.domain
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Weight matrix `W`.
    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    /// Bias vector `b`.
    pub fn bias(&self) -> &Array1<f64> {
        &self.bias
    }

    /// Every state passed to [`Network::learn_states`], in order.
    pub fn learned_states(&self) -> &[State] {
        &self.learned_states
    }

    /// Read-only view used by relaxation, stability checks and workers.
    pub fn dynamics(&self) -> Dynamics<'_> {
        self.config
            .dynamics(&self.weights, &self.bias, &self.learned_states)
    }

    /// Split into the read-only dynamics and the network's own RNG and scratch.
    pub(crate) fn parts(&mut self) -> (Dynamics<'_>, &mut ChaCha8Rng, &mut Scratch) {
        let dynamics = self
            .config
            .dynamics(&self.weights, &self.bias, &self.learned_states);
        (dynamics, &mut self.rng, &mut self.scratch)
    }

    // ------------------------------------------------------------------
    // Energies and stability
    // ------------------------------------------------------------------

    /// Energy of unit `i` in `state`. Positive means the unit wants to flip.
    pub fn unit_energy(&self, state: &State, i: usize) -> f64 {
        self.domain()
            .unit_energy(&self.weights, &self.bias, state.view(), i)
    }

    /// Energy of every unit in `state`.
    pub fn all_unit_energies(&self, state: &State) -> Array1<f64> {
        self.dynamics().all_unit_energies(state.view())
    }

    /// Energy of a state. Lower is more stable, but a negative total does not
    /// imply every unit is stable.
    pub fn state_energy(&self, state: &State) -> f64 {
        self.domain()
            .state_energy(&self.weights, &self.bias, state.view())
    }

    /// A state is stable when at most `max_unstable_units` units have `E_i > 0`.
    pub fn state_is_stable(&self, state: &State) -> bool {
        self.dynamics().state_is_stable(state.view())
    }

    pub fn all_states_are_stable(&self, states: &[State]) -> bool {
        let dynamics = self.dynamics();
        states
            .par_iter()
            .all(|state| dynamics.state_is_stable(state.view()))
    }

    // ------------------------------------------------------------------
    // Update and relaxation
    // ------------------------------------------------------------------

    /// One asynchronous sweep using the network's generator. Mutates `state`.
    pub fn update_state(&mut self, state: &mut State) {
        let (dynamics, rng, scratch) = self.parts();
        dynamics.update_state(rng, scratch, state);
    }

    /// Relax `state` in place until stable or the iteration cap is reached.
    ///
    /// Copy the state first if the original is still needed.
    pub fn relax_state(&mut self, state: &mut State) -> RelaxationResult {
        let (dynamics, rng, scratch) = self.parts();
        dynamics.relax_state(rng, scratch, state)
    }

    /// Relax a batch of states across `num_workers` threads.
    ///
    /// `result[i]` always belongs to `states[i]`, and the relaxed state is
    /// written back into `states[i]`. Each worker draws from its own generator
    /// seeded from a master seed taken from the network generator, so results
    /// depend on the network seed, the worker count and thread scheduling.
    ///
    /// # Panics
    /// If `num_workers` is zero.
    pub fn relax_batch(&mut self, states: &mut [State], num_workers: usize) -> Vec<RelaxationResult> {
        let master_seed: u64 = self.rng.gen();
        let dynamics = self.dynamics();
        debug!(
            states = states.len(),
            workers = num_workers,
            "relaxing batch"
        );

        let jobs: Vec<State> = states.iter_mut().map(std::mem::take).collect();
        let outputs = pool::dispatch(
            jobs,
            num_workers,
            master_seed,
            self.dimension(),
            |ctx, state| dynamics.relax_state(&mut ctx.rng, &mut ctx.scratch, state),
        );

        let mut results = Vec::with_capacity(outputs.len());
        for (slot, (state, result)) in states.iter_mut().zip(outputs) {
            *slot = state;
            results.push(result);
        }
        results
    }

    // ------------------------------------------------------------------
    // Learning
    // ------------------------------------------------------------------

    /// Train the network to stabilise `states`.
    ///
    /// The states are appended to [`Network::learned_states`]; repeated calls
    /// accumulate rather than replace. Returns per-epoch records when intensive
    /// collection is enabled, otherwise an empty vector.
    ///
    /// # Panics
    /// If any state does not match the network dimension.
    pub fn learn_states(&mut self, states: &[State]) -> Vec<LearnStateRecord> {
        data::assert_uniform_length(states, self.dimension());
        self.learned_states.extend(states.iter().cloned());

        let method = self.config.learning_method;
        let records = method.run(self, states);
        info!(
            targets = states.len(),
            total_learned = self.learned_states.len(),
            rule = %self.config.learning_rule,
            "learning complete"
        );
        records
    }

    /// Add a scaled update to `W` and `b`, then re-apply the constraints.
    pub(crate) fn apply_update(&mut self, delta_w: &Array2<f64>, delta_b: &Array1<f64>) {
        let eta = self.config.learning_rate;
        self.weights.scaled_add(eta, delta_w);
        self.bias.scaled_add(eta, delta_b);
        self.enforce_constraints();
    }

    /// Replace `W` and `b`, e.g. from a checkpoint. Constraints are re-applied.
    pub fn load_weights(&mut self, weights: Array2<f64>, bias: Array1<f64>) -> HopfieldResult<()> {
        let n = self.dimension();
        if weights.dim() != (n, n) {
            return Err(HopfieldError::ShapeMismatch {
                expected: vec![n, n],
                actual: weights.shape().to_vec(),
            });
        }
        if bias.len() != n {
            return Err(HopfieldError::ShapeMismatch {
                expected: vec![n],
                actual: vec![bias.len()],
            });
        }
        self.weights = weights;
        self.bias = bias;
        self.enforce_constraints();
        Ok(())
    }

    pub(crate) fn restore_learned_states(&mut self, states: Vec<State>) {
        self.learned_states = states;
    }

    pub(crate) fn enforce_constraints(&mut self) {
        if self.config.force_zero_diagonal {
            self.weights.diag_mut().fill(0.0);
        }
        if self.config.force_symmetric {
            let symmetric = (&self.weights + &self.weights.t()) * 0.5;
            self.weights = symmetric;
        }
        if self.config.force_zero_bias {
            self.bias.fill(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    fn bipolar(n: usize) -> Network {
        Network::builder()
            .dimension(n)
            .seed(42)
            .build()
            .expect("valid config")
    }

    #[test]
    fn test_network_init() {
        let network = bipolar(5);
        assert_eq!(network.dimension(), 5);
        assert_eq!(network.domain(), Domain::Bipolar);
        assert_eq!(network.weights().dim(), (5, 5));
        assert!(network.weights().iter().all(|&w| w == 0.0));
        assert!(network.learned_states().is_empty());
    }

    #[test]
    fn test_constraints_after_load() {
        let mut network = bipolar(2);
        network
            .load_weights(arr2(&[[3.0, 1.0], [0.0, 5.0]]), arr1(&[1.0, 1.0]))
            .unwrap();
        assert_eq!(network.weights(), &arr2(&[[0.0, 0.5], [0.5, 0.0]]));
        assert_eq!(network.bias(), &arr1(&[0.0, 0.0]));
    }

    #[test]
    fn test_constraints_can_be_disabled() {
        let mut network = Network::builder()
            .dimension(2)
            .force_symmetric(false)
            .force_zero_diagonal(false)
            .force_zero_bias(false)
            .build()
            .unwrap();
        let w = arr2(&[[3.0, 1.0], [0.0, 5.0]]);
        network.load_weights(w.clone(), arr1(&[1.0, 2.0])).unwrap();
        assert_eq!(network.weights(), &w);
        assert_eq!(network.bias(), &arr1(&[1.0, 2.0]));
    }

    #[test]
    fn test_load_weights_shape_mismatch() {
        let mut network = bipolar(3);
        let err = network
            .load_weights(Array2::zeros((2, 3)), Array1::zeros(3))
            .unwrap_err();
        assert!(matches!(err, HopfieldError::ShapeMismatch { .. }));
        let err = network
            .load_weights(Array2::zeros((3, 3)), Array1::zeros(4))
            .unwrap_err();
        assert!(matches!(err, HopfieldError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_energy_accessors_agree() {
        let mut network = bipolar(3);
        network
            .load_weights(arr2(&[[0.0, 1.0, -2.0], [1.0, 0.0, 0.5], [-2.0, 0.5, 0.0]]), Array1::zeros(3))
            .unwrap();
        let state = arr1(&[1.0, -1.0, 1.0]);
        let per_unit: f64 = (0..3).map(|i| network.unit_energy(&state, i)).sum();
        assert!((per_unit - network.state_energy(&state)).abs() < 1e-12);
        assert_eq!(network.all_unit_energies(&state).len(), 3);
    }

    #[test]
    fn test_display() {
        let network = bipolar(4);
        let text = network.to_string();
        assert!(text.contains("Dimension: 4"));
        assert!(text.contains("Domain: bipolar"));
    }

    #[test]
    fn test_relax_batch_empty() {
        let mut network = bipolar(4);
        let mut states: Vec<State> = Vec::new();
        assert!(network.relax_batch(&mut states, 3).is_empty());
    }

    #[test]
    #[should_panic(expected = "state 0 has length 2")]
    fn test_learn_wrong_length_panics() {
        let mut network = bipolar(4);
        network.learn_states(&[arr1(&[1.0, 1.0])]);
    }
}
