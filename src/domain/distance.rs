//! Distances between a relaxed state and the learned targets.

use super::Domain;
use crate::utils::{euclidean, manhattan};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// How to measure the distance from a state to a target.
///
/// The `*WithInversion` variants take the smaller of the distance to the target
/// and the distance to its domain inverse, since Hebbian-style training makes a
/// pattern and its complement equally stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMeasure {
    Manhattan,
    Euclidean,
    #[default]
    ManhattanWithInversion,
    EuclideanWithInversion,
}

impl DistanceMeasure {
    /// Distance from `state` to `target`.
    pub fn measure(&self, domain: Domain, target: ArrayView1<'_, f64>, state: ArrayView1<'_, f64>) -> f64 {
        match self {
            DistanceMeasure::Manhattan => manhattan(target, state),
            DistanceMeasure::Euclidean => euclidean(target, state),
            DistanceMeasure::ManhattanWithInversion => {
                let inverse = domain.inverted(target);
                manhattan(target, state).min(manhattan(inverse.view(), state))
            }
            DistanceMeasure::EuclideanWithInversion => {
                let inverse = domain.inverted(target);
                euclidean(target, state).min(euclidean(inverse.view(), state))
            }
        }
    }

    /// Distance from `state` to every target, in target order.
    pub fn to_collection(&self, domain: Domain, targets: &[Array1<f64>], state: ArrayView1<'_, f64>) -> Vec<f64> {
        targets
            .iter()
            .map(|target| self.measure(domain, target.view(), state))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_inversion_distance_is_symmetric_for_complement() {
        let target = arr1(&[1.0, -1.0, 1.0, -1.0]);
        let complement = arr1(&[-1.0, 1.0, -1.0, 1.0]);
        let plain = DistanceMeasure::Manhattan.measure(Domain::Bipolar, target.view(), complement.view());
        assert_eq!(plain, 8.0);
        let inv = DistanceMeasure::ManhattanWithInversion.measure(Domain::Bipolar, target.view(), complement.view());
        assert_eq!(inv, 0.0);
    }

    #[test]
    fn test_binary_inversion_distance() {
        let target = arr1(&[1.0, 0.0, 0.0]);
        let state = arr1(&[0.0, 1.0, 0.0]);
        // inverse = [0, 1, 1]; distances 2 and 1
        let d = DistanceMeasure::EuclideanWithInversion.measure(Domain::Binary, target.view(), state.view());
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_to_collection_keeps_order() {
        let targets = vec![arr1(&[1.0, 1.0]), arr1(&[1.0, -1.0])];
        let state = arr1(&[1.0, 1.0]);
        let d = DistanceMeasure::Manhattan.to_collection(Domain::Bipolar, &targets, state.view());
        assert_eq!(d, vec![0.0, 2.0]);
    }
}
