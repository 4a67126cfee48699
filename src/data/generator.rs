//! Random state generation.
//!
//! A [`StateGenerator`] draws `n` independent uniform samples and activates
//! them into the configured [`Domain`]. With the default range `[-1, 1)` every
//! domain value is equally likely.

use crate::core::{ConfigError, State};
use crate::domain::Domain;
use ndarray::Array1;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Builder for [`StateGenerator`].
#[derive(Debug, Clone)]
pub struct StateGeneratorBuilder {
    rand_min: f64,
    rand_max: f64,
    seed: Option<u64>,
    dimension: usize,
    domain: Domain,
}

impl Default for StateGeneratorBuilder {
    fn default() -> Self {
        Self {
            rand_min: -1.0,
            rand_max: 1.0,
            seed: None,
            dimension: 0,
            domain: Domain::Bipolar,
        }
    }
}

impl StateGeneratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn rand_min(mut self, rand_min: f64) -> Self {
        self.rand_min = rand_min;
        self
    }

    #[must_use]
    pub fn rand_max(mut self, rand_max: f64) -> Self {
        self.rand_max = rand_max;
        self
    }

    /// Fix the seed. Without one the generator seeds from OS entropy.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    #[must_use]
    pub fn domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    /// # Errors
    /// Fails if the dimension is zero, a bound is not finite, or
    /// `rand_min >= rand_max`.
    pub fn build(self) -> Result<StateGenerator, ConfigError> {
        if self.dimension == 0 {
            return Err(ConfigError::invalid_value("dimension", "must be positive"));
        }
        if !self.rand_min.is_finite() || !self.rand_max.is_finite() {
            return Err(ConfigError::invalid_value(
                "rand_min",
                format!("bounds must be finite, got [{}, {})", self.rand_min, self.rand_max),
            ));
        }
        if self.rand_min >= self.rand_max {
            return Err(ConfigError::invalid_value(
                "rand_min",
                format!("must be below rand_max ({} >= {})", self.rand_min, self.rand_max),
            ));
        }
        let rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Ok(StateGenerator {
            distribution: Uniform::new(self.rand_min, self.rand_max),
            rng,
            dimension: self.dimension,
            domain: self.domain,
        })
    }
}

/// Seeded source of random domain states.
pub struct StateGenerator {
    distribution: Uniform<f64>,
    rng: ChaCha8Rng,
    dimension: usize,
    domain: Domain,
}

impl StateGenerator {
    pub fn builder() -> StateGeneratorBuilder {
        StateGeneratorBuilder::new()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Draw one state uniformly from `[rand_min, rand_max)` and activate it.
    pub fn next_state(&mut self) -> State {
        let mut state = self.sample();
        self.domain.activation(state.view_mut());
        state
    }

    /// `count` independent states from [`StateGenerator::next_state`].
    pub fn create_collection(&mut self, count: usize) -> Vec<State> {
        (0..count).map(|_| self.next_state()).collect()
    }

    /// Target states, mapped by the domain's learned-state activation.
    pub fn create_learned_collection(&mut self, count: usize) -> Vec<State> {
        (0..count)
            .map(|_| {
                let mut state = self.sample();
                self.domain.learned_activation(state.view_mut());
                state
            })
            .collect()
    }

    fn sample(&mut self) -> Array1<f64> {
        Array1::random_using(self.dimension, self.distribution, &mut self.rng)
    }
}
