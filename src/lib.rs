//! # Hopfield
//!
//! Hopfield associative-memory networks: train a weight matrix so that target
//! patterns become stable attractors, then probe it by relaxing noisy or random
//! states toward those attractors.
//!
//! ## Overview
//!
//! Stability is defined by a per-unit energy. A unit with positive energy would
//! flip on its next update; a state is stable when no more than a tolerated
//! number of units are unstable. Relaxation repeatedly sweeps the units in a
//! random order until the state is stable or an iteration cap is reached.
//!
//! Learning rules range from the closed-form Hebbian rule to the Delta and
//! Thermal-Delta rules, which use one step of the network's own dynamics as
//! their error signal.
//!
//! ## Structure
//!
//! - [`core`] — Network, configuration, relaxation dynamics, errors
//! - [`domain`] — Bipolar/binary activation, inversion, energies, distances
//! - [`training`] — Learning rules, learning methods, probe noise
//! - [`pool`] — Scoped worker pool for concurrent relaxation
//! - [`data`] — Seeded random state generation
//! - [`metrics`] — Per-trial result collection
//! - [`checkpoint`] — JSON persistence of matrices, states and networks
//! - [`utils`] — Vector helpers
//!
//! ## Example
//!
//! ```
//! use hopfield::{Network, StateGenerator};
//!
//! let mut network = Network::builder().dimension(64).seed(1).build().unwrap();
//! let mut generator = StateGenerator::builder().dimension(64).seed(2).build().unwrap();
//!
//! let targets = generator.create_learned_collection(3);
//! network.learn_states(&targets);
//! assert!(network.all_states_are_stable(&targets));
//!
//! let mut probes = generator.create_collection(8);
//! let results = network.relax_batch(&mut probes, 4);
//! assert_eq!(results.len(), 8);
//! ```

pub mod checkpoint;
pub mod core;
pub mod data;
pub mod domain;
pub mod metrics;
pub mod pool;
pub mod training;
pub mod utils;

pub use crate::core::{
    ConfigError, Dynamics, HopfieldError, HopfieldResult, Network, NetworkBuilder, NetworkConfig,
    RelaxationResult, Scratch, State,
};
pub use data::{StateGenerator, StateGeneratorBuilder};
pub use domain::{DistanceMeasure, Domain};
pub use metrics::{RelaxationRecord, TrialAccumulator, TrialSummary};
pub use training::{LearnStateRecord, LearningMethod, LearningRule, NoiseMethod};
