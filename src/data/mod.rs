//! Target and probe state sources.
//!
//! ## Submodules
//!
//! - [`generator`] — Seeded uniform state generation

pub mod generator;

pub use generator::{StateGenerator, StateGeneratorBuilder};

use crate::core::State;

/// Assert that every state in a collection has length `dimension`.
///
/// # Panics
/// On the first mismatching state. A ragged in-memory collection is a broken
/// invariant.
pub fn assert_uniform_length(states: &[State], dimension: usize) {
    for (index, state) in states.iter().enumerate() {
        assert_eq!(
            state.len(),
            dimension,
            "state {index} has length {}, expected {dimension}",
            state.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn test_uniform_length_ok() {
        assert_uniform_length(&[Array1::zeros(3), Array1::zeros(3)], 3);
        assert_uniform_length(&[], 7);
    }

    #[test]
    #[should_panic(expected = "state 1 has length 2")]
    fn test_ragged_panics() {
        assert_uniform_length(&[Array1::zeros(3), Array1::zeros(2)], 3);
    }
}
