//! The relaxation engine.
//!
//! [`Dynamics`] is a read-only view of everything a sweep needs: the weight
//! matrix, bias, domain and relaxation parameters. It never owns a random
//! generator or scratch memory; callers pass their own, so the same `Dynamics`
//! can be shared by every worker of a concurrent batch.
//!
//! ## Update sweep
//!
//! ```text
//! order  = shuffle([0..n))
//! for chunk in order.chunks(units_updated_per_step):
//!     h_i = Σ_j W[i,j] s[j] + b[i]     for i in chunk (current s)
//!     s[i] = h_i                       for i in chunk
//!     s = activation(s)
//! ```
//!
//! Chunks of size 1 give the classic strictly asynchronous Hopfield update;
//! a single chunk of size `n` is a fully synchronous update.

use crate::core::State;
use crate::domain::{DistanceMeasure, Domain};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::Rng;

/// Outcome of relaxing one state.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxationResult {
    /// Whether the final state had no more than the tolerated unstable units.
    pub stable: bool,
    /// Sweeps performed: the first stable sweep, or the iteration cap.
    pub num_steps: usize,
    /// Distance from the final state to every learned target, in target order.
    pub distances_to_targets: Vec<f64>,
    /// Unit energies of the final state.
    pub energy_profile: Vec<f64>,
    /// Every visited state, starting with the initial one (intensive only).
    pub state_history: Option<Vec<State>>,
    /// Unit energies of every visited state (intensive only).
    pub energy_history: Option<Vec<Vec<f64>>>,
}

/// Per-relaxation scratch memory.
///
/// Holds the unit permutation and the pending pre-activations of a chunk.
/// Each worker owns exactly one; it is never shared.
#[derive(Debug, Clone)]
pub struct Scratch {
    indices: Vec<usize>,
    pending: Vec<f64>,
}

impl Scratch {
    /// Scratch sized for a network of `dimension` units.
    pub fn new(dimension: usize) -> Self {
        Self {
            indices: (0..dimension).collect(),
            pending: Vec::with_capacity(dimension),
        }
    }

    pub fn dimension(&self) -> usize {
        self.indices.len()
    }
}

/// Borrowed view of a network used to update, relax and judge states.
#[derive(Debug, Clone, Copy)]
pub struct Dynamics<'a> {
    pub weights: &'a Array2<f64>,
    pub bias: &'a Array1<f64>,
    pub domain: Domain,
    pub units_updated_per_step: usize,
    pub max_relaxation_iterations: usize,
    pub max_unstable_units: usize,
    pub targets: &'a [State],
    pub distance_measure: DistanceMeasure,
    /// Record the full state and energy trajectory of each relaxation.
    pub intensive: bool,
}

impl<'a> Dynamics<'a> {
    pub fn dimension(&self) -> usize {
        self.weights.nrows()
    }

    pub fn all_unit_energies(&self, state: ArrayView1<'_, f64>) -> Array1<f64> {
        self.domain.all_unit_energies(self.weights, self.bias, state)
    }

    /// Number of units with strictly positive energy.
    pub fn unstable_units(&self, state: ArrayView1<'_, f64>) -> usize {
        count_unstable(&self.all_unit_energies(state))
    }

    pub fn state_is_stable(&self, state: ArrayView1<'_, f64>) -> bool {
        self.unstable_units(state) <= self.max_unstable_units
    }

    /// One asynchronous sweep over every unit, mutating `state` in place.
    ///
    /// # Panics
    /// If `state` or `scratch` do not match the network dimension, or the chunk
    /// size is zero. These are broken invariants, not bad input.
    pub fn update_state<R: Rng + ?Sized>(&self, rng: &mut R, scratch: &mut Scratch, state: &mut State) {
        let n = self.dimension();
        assert_eq!(state.len(), n, "state length must equal the network dimension");
        assert_eq!(scratch.dimension(), n, "scratch buffer sized for another network");
        assert!(self.units_updated_per_step > 0, "units updated per step must be positive");

        scratch.indices.shuffle(rng);
        for chunk in scratch.indices.chunks(self.units_updated_per_step) {
            scratch.pending.clear();
            for &i in chunk {
                let field = self.weights.row(i).dot(&*state) + self.bias[i];
                scratch.pending.push(field);
            }
            for (&i, &field) in chunk.iter().zip(scratch.pending.iter()) {
                state[i] = field;
            }
            self.domain.activation(state.view_mut());
        }
    }

    /// Sweep until stable or until the iteration cap is exhausted.
    ///
    /// `state` is left holding the final state.
    pub fn relax_state<R: Rng + ?Sized>(&self, rng: &mut R, scratch: &mut Scratch, state: &mut State) -> RelaxationResult {
        let mut state_history = self.intensive.then(|| vec![state.clone()]);
        let mut energy_history = self
            .intensive
            .then(|| vec![self.all_unit_energies(state.view()).to_vec()]);

        for step in 1..=self.max_relaxation_iterations {
            self.update_state(rng, scratch, state);
            let energies = self.all_unit_energies(state.view());

            if let Some(history) = state_history.as_mut() {
                history.push(state.clone());
            }
            if let Some(history) = energy_history.as_mut() {
                history.push(energies.to_vec());
            }

            if count_unstable(&energies) <= self.max_unstable_units {
                return self.finish(true, step, state, energies, state_history, energy_history);
            }
        }

        let energies = self.all_unit_energies(state.view());
        self.finish(
            false,
            self.max_relaxation_iterations,
            state,
            energies,
            state_history,
            energy_history,
        )
    }

    fn finish(
        &self,
        stable: bool,
        num_steps: usize,
        state: &State,
        energies: Array1<f64>,
        state_history: Option<Vec<State>>,
        energy_history: Option<Vec<Vec<f64>>>,
    ) -> RelaxationResult {
        RelaxationResult {
            stable,
            num_steps,
            distances_to_targets: self
                .distance_measure
                .to_collection(self.domain, self.targets, state.view()),
            energy_profile: energies.to_vec(),
            state_history,
            energy_history,
        }
    }
}

fn count_unstable(energies: &Array1<f64>) -> usize {
    energies.iter().filter(|&&e| e > 0.0).count()
}
