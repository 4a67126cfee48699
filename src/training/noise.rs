//! Perturbations applied to Delta-rule probes before their update sweep.

use crate::core::State;
use crate::domain::Domain;
use rand::seq::index;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a probe is corrupted before it is swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseMethod {
    #[default]
    None,
    /// Invert exactly `round(scale * n)` distinct units.
    ExactInversion,
    /// Invert a uniformly drawn count in `[0, round(scale * n)]` of distinct units.
    SubMaximalInversion,
    /// Add `N(0, scale)` to every unit. The caller re-activates.
    Gaussian,
}

impl fmt::Display for NoiseMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NoiseMethod::None => "none",
            NoiseMethod::ExactInversion => "exact_inversion",
            NoiseMethod::SubMaximalInversion => "sub_maximal_inversion",
            NoiseMethod::Gaussian => "gaussian",
        };
        f.write_str(name)
    }
}

impl NoiseMethod {
    /// Corrupt `state` in place.
    ///
    /// `scale` is the inversion ratio for the inversion methods and the standard
    /// deviation for [`NoiseMethod::Gaussian`].
    ///
    /// # Panics
    /// If `scale` is outside `[0, 1]` or NaN. Network configs reject such
    /// values before they reach here.
    pub fn apply<R: Rng + ?Sized>(&self, rng: &mut R, state: &mut State, scale: f64, domain: Domain) {
        assert!((0.0..=1.0).contains(&scale), "noise scale must lie in [0, 1], got {scale}");
        let n = state.len();
        match self {
            NoiseMethod::None => {}
            NoiseMethod::ExactInversion => {
                invert_random_units(rng, state, max_inversions(n, scale), domain);
            }
            NoiseMethod::SubMaximalInversion => {
                let count = rng.gen_range(0..=max_inversions(n, scale));
                invert_random_units(rng, state, count, domain);
            }
            NoiseMethod::Gaussian => {
                state.mapv_inplace(|x| {
                    let z: f64 = StandardNormal.sample(&mut *rng);
                    x + scale * z
                });
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn max_inversions(n: usize, scale: f64) -> usize {
    ((scale * n as f64).round() as usize).min(n)
}

fn invert_random_units<R: Rng + ?Sized>(rng: &mut R, state: &mut State, count: usize, domain: Domain) {
    for i in index::sample(rng, state.len(), count).iter() {
        state[i] = domain.invert_unit(state[i]);
    }
}
