//! Network configuration and construction.
//!
//! [`NetworkConfig`] is plain data: serde-loadable, `Default`, validated by
//! [`NetworkConfig::validate`]. [`NetworkBuilder`] is a fluent front end over
//! the same struct.

use super::{ConfigError, Dynamics, Network, Scratch, State};
use crate::domain::{DistanceMeasure, Domain};
use crate::training::{LearningMethod, LearningRule, NoiseMethod};
use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Standard deviation of the optional Gaussian weight initialisation.
const RANDOM_INIT_STD: f64 = 0.01;

/// Every parameter of a [`Network`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Number of units. Must be set; zero is rejected.
    pub dimension: usize,
    pub domain: Domain,
    pub force_symmetric: bool,
    pub force_zero_diagonal: bool,
    pub force_zero_bias: bool,
    /// Start from `N(0, 0.01)` weights instead of zeros.
    pub random_matrix_init: bool,
    pub learning_rule: LearningRule,
    pub learning_method: LearningMethod,
    /// Maximum rule applications per learning call (per prefix for iterative batches).
    pub epochs: usize,
    pub learning_rate: f64,
    /// Units updated together in one chunk of a sweep, in `[1, dimension]`.
    pub units_updated_per_step: usize,
    pub max_relaxation_iterations: usize,
    /// Units allowed to have positive energy in a state still called stable.
    pub max_unstable_units: usize,
    /// Noise applied to Delta-rule probes.
    pub noise_method: NoiseMethod,
    pub noise_scale: f64,
    pub distance_measure: DistanceMeasure,
    /// Threads used for Delta-rule probe sweeps.
    pub learning_workers: usize,
    /// Record full relaxation histories and per-epoch learning data.
    pub intensive_collection: bool,
    /// `None` seeds from the OS entropy source.
    pub seed: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            dimension: 0,
            domain: Domain::Bipolar,
            force_symmetric: true,
            force_zero_diagonal: true,
            force_zero_bias: true,
            random_matrix_init: false,
            learning_rule: LearningRule::Hebbian,
            learning_method: LearningMethod::FullSet,
            epochs: 100,
            learning_rate: 1.0,
            units_updated_per_step: 1,
            max_relaxation_iterations: 100,
            max_unstable_units: 0,
            noise_method: NoiseMethod::None,
            noise_scale: 0.0,
            distance_measure: DistanceMeasure::ManhattanWithInversion,
            learning_workers: 1,
            intensive_collection: false,
            seed: None,
        }
    }
}

impl NetworkConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed. The result is not
    /// validated; call [`NetworkConfig::validate`] or [`NetworkConfig::build`].
    pub fn from_json_file(path: &Path) -> super::HopfieldResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Check every field against its allowed range.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found. Values are never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = self.dimension;
        if n == 0 {
            return Err(ConfigError::invalid_value("dimension", "must be positive"));
        }
        if self.epochs == 0 {
            return Err(ConfigError::invalid_value("epochs", "must be positive"));
        }
        if !self.learning_rate.is_finite() {
            return Err(ConfigError::invalid_value(
                "learning_rate",
                format!("must be finite, got {}", self.learning_rate),
            ));
        }
        if self.units_updated_per_step == 0 || self.units_updated_per_step > n {
            return Err(ConfigError::invalid_value(
                "units_updated_per_step",
                format!("must be in [1, {n}], got {}", self.units_updated_per_step),
            ));
        }
        if self.max_relaxation_iterations == 0 {
            return Err(ConfigError::invalid_value(
                "max_relaxation_iterations",
                "must be positive",
            ));
        }
        if !self.noise_scale.is_finite() || !(0.0..=1.0).contains(&self.noise_scale) {
            return Err(ConfigError::invalid_value(
                "noise_scale",
                format!("must be in [0, 1], got {}", self.noise_scale),
            ));
        }
        if self.learning_workers == 0 {
            return Err(ConfigError::invalid_value("learning_workers", "must be positive"));
        }
        self.learning_rule.validate()?;
        self.learning_method.validate()?;
        Ok(())
    }

    pub(crate) fn dynamics<'a>(
        &self,
        weights: &'a Array2<f64>,
        bias: &'a Array1<f64>,
        targets: &'a [State],
    ) -> Dynamics<'a> {
        Dynamics {
            weights,
            bias,
            domain: self.domain,
            units_updated_per_step: self.units_updated_per_step,
            max_relaxation_iterations: self.max_relaxation_iterations,
            max_unstable_units: self.max_unstable_units,
            targets,
            distance_measure: self.distance_measure,
            intensive: self.intensive_collection,
        }
    }

    /// Validate and construct a [`Network`].
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if validation fails.
    pub fn build(self) -> Result<Network, ConfigError> {
        self.validate()?;
        let n = self.dimension;

        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let weights = if self.random_matrix_init {
            let normal = Normal::new(0.0, RANDOM_INIT_STD)
                .map_err(|e| ConfigError::invalid_value("random_matrix_init", e.to_string()))?;
            Array2::random_using((n, n), normal, &mut rng)
        } else {
            Array2::zeros((n, n))
        };

        let mut network = Network {
            config: self,
            weights,
            bias: Array1::zeros(n),
            rng,
            scratch: Scratch::new(n),
            learned_states: Vec::new(),
        };
        network.enforce_constraints();
        Ok(network)
    }
}

/// Fluent builder for [`Network`].
///
/// ```
/// use hopfield::{Domain, LearningRule, Network};
///
/// let network = Network::builder()
///     .dimension(16)
///     .domain(Domain::Bipolar)
///     .learning_rule(LearningRule::Delta)
///     .seed(7)
///     .build()
///     .unwrap();
/// assert_eq!(network.dimension(), 16);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NetworkBuilder {
    config: NetworkConfig,
}

macro_rules! setter {
    ($(#[$doc:meta])* $name:ident: $ty:ty) => {
        $(#[$doc])*
        #[must_use]
        pub fn $name(mut self, $name: $ty) -> Self {
            self.config.$name = $name;
            self
        }
    };
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing config, e.g. one loaded from JSON.
    pub fn from_config(config: NetworkConfig) -> Self {
        Self { config }
    }

    setter!(dimension: usize);
    setter!(domain: Domain);
    setter!(force_symmetric: bool);
    setter!(force_zero_diagonal: bool);
    setter!(force_zero_bias: bool);
    setter!(random_matrix_init: bool);
    setter!(learning_rule: LearningRule);
    setter!(learning_method: LearningMethod);
    setter!(epochs: usize);
    setter!(learning_rate: f64);
    setter!(units_updated_per_step: usize);
    setter!(max_relaxation_iterations: usize);
    setter!(max_unstable_units: usize);
    setter!(noise_method: NoiseMethod);
    setter!(noise_scale: f64);
    setter!(distance_measure: DistanceMeasure);
    setter!(learning_workers: usize);
    setter!(intensive_collection: bool);

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// # Errors
    /// See [`NetworkConfig::validate`].
    pub fn build(self) -> Result<Network, ConfigError> {
        self.config.build()
    }
}
