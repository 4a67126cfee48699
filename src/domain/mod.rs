//! State domains: activation, inversion and the energy model.
//!
//! A [`Domain`] fixes which values a state component may take and how the
//! energy of a unit is measured. Every operation here is a pure function of its
//! inputs, so a single `Domain` value is shared freely between networks and
//! worker threads.
//!
//! ## Energy
//!
//! ```text
//! E_i = -0.5 * Σ_j W[i,j] s[i] φ(s[j]) - b[i] s[i]
//! E   = Σ_i E_i
//! ```
//!
//! where `φ` is the identity for bipolar states and `2x - 1` for binary states,
//! so binary networks share the bipolar Hebbian energy semantics. A unit with
//! `E_i > 0` is *unstable*.

pub mod distance;

pub use distance::DistanceMeasure;

use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The set of values a state component may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Components in `{-1, +1}`.
    Bipolar,
    /// Components in `{0, 1}`.
    Binary,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Bipolar => write!(f, "bipolar"),
            Domain::Binary => write!(f, "binary"),
        }
    }
}

impl std::str::FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bipolar" => Ok(Domain::Bipolar),
            "binary" => Ok(Domain::Binary),
            other => Err(format!("unknown domain: {other}")),
        }
    }
}

impl Domain {
    /// Map a single real value to the nearest valid domain value.
    ///
    /// Bipolar ties (exactly zero) resolve to `+1`; binary maps `x <= 0` to `0`.
    #[inline]
    pub fn activation_unit(&self, x: f64) -> f64 {
        match self {
            Domain::Bipolar => {
                if x < 0.0 {
                    -1.0
                } else {
                    1.0
                }
            }
            Domain::Binary => {
                if x <= 0.0 {
                    0.0
                } else {
                    1.0
                }
            }
        }
    }

    /// Apply [`Domain::activation_unit`] to every component in place.
    pub fn activation(&self, mut state: ArrayViewMut1<'_, f64>) {
        state.mapv_inplace(|x| self.activation_unit(x));
    }

    /// Antipodal value of a single component, re-activated.
    #[inline]
    pub fn invert_unit(&self, x: f64) -> f64 {
        match self {
            Domain::Bipolar => self.activation_unit(-x),
            Domain::Binary => self.activation_unit(1.0 - x),
        }
    }

    /// Replace `state` with its logical complement in place.
    pub fn invert(&self, mut state: ArrayViewMut1<'_, f64>) {
        state.mapv_inplace(|x| self.invert_unit(x));
    }

    /// Return the logical complement of `state` without touching it.
    pub fn inverted(&self, state: ArrayView1<'_, f64>) -> Array1<f64> {
        state.mapv(|x| self.invert_unit(x))
    }

    /// The bipolar remap `φ` used by the energy model and the Hebbian rule.
    #[inline]
    pub fn learning_map_unit(&self, x: f64) -> f64 {
        match self {
            Domain::Bipolar => x,
            Domain::Binary => 2.0 * x - 1.0,
        }
    }

    /// Apply `φ` to a whole state, returning a new vector.
    pub fn learning_map(&self, state: ArrayView1<'_, f64>) -> Array1<f64> {
        state.mapv(|x| self.learning_map_unit(x))
    }

    /// Mapper used for freshly generated *target* states.
    ///
    /// Bipolar and binary targets live in the same representation at training
    /// and relaxation time, so this is the plain activation.
    pub fn learned_activation(&self, state: ArrayViewMut1<'_, f64>) {
        self.activation(state);
    }

    /// Energy contribution of unit `i`.
    pub fn unit_energy(
        &self,
        w: &Array2<f64>,
        b: &Array1<f64>,
        state: ArrayView1<'_, f64>,
        i: usize,
    ) -> f64 {
        let s_i = state[i];
        let coupling: f64 = w
            .row(i)
            .iter()
            .zip(state.iter())
            .map(|(&w_ij, &s_j)| w_ij * self.learning_map_unit(s_j))
            .sum();
        -0.5 * s_i * coupling - b[i] * s_i
    }

    /// Energy of every unit at once: `-0.5 * s ⊙ (W φ(s)) - b ⊙ s`.
    pub fn all_unit_energies(
        &self,
        w: &Array2<f64>,
        b: &Array1<f64>,
        state: ArrayView1<'_, f64>,
    ) -> Array1<f64> {
        let mapped = self.learning_map(state);
        let coupling = w.dot(&mapped);
        let mut energies = &coupling * &state * -0.5;
        energies -= &(b * &state);
        energies
    }

    /// Total energy of a state.
    pub fn state_energy(
        &self,
        w: &Array2<f64>,
        b: &Array1<f64>,
        state: ArrayView1<'_, f64>,
    ) -> f64 {
        self.all_unit_energies(w, b, state).sum()
    }
}
