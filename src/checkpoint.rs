//! Checkpoint save/load for Hopfield networks.
//!
//! Matrices and vector collections are stored as nested JSON arrays. A loaded
//! collection is checked for equal lengths; a ragged file is an error, not a
//! panic, because it is outside data.

use crate::core::{HopfieldError, HopfieldResult, Network, NetworkConfig, State};
use crate::domain::Domain;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Serializable network snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointData {
    pub dimension: usize,
    pub domain: Domain,
    /// Weight matrix rows.
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub learned_states: Vec<Vec<f64>>,
}

fn array2_to_vecs(arr: &Array2<f64>) -> Vec<Vec<f64>> {
    arr.rows().into_iter().map(|row| row.to_vec()).collect()
}

fn check_uniform(vecs: &[Vec<f64>]) -> HopfieldResult<usize> {
    let expected = vecs.first().map_or(0, Vec::len);
    match vecs.iter().position(|v| v.len() != expected) {
        Some(index) => Err(HopfieldError::RaggedCollection {
            index,
            expected,
            actual: vecs[index].len(),
        }),
        None => Ok(expected),
    }
}

fn vecs_to_array2(vecs: &[Vec<f64>]) -> HopfieldResult<Array2<f64>> {
    let ncols = check_uniform(vecs)?;
    let flat: Vec<f64> = vecs.iter().flat_map(|r| r.iter().copied()).collect();
    Array2::from_shape_vec((vecs.len(), ncols), flat).map_err(|_| HopfieldError::ShapeMismatch {
        expected: vec![vecs.len(), ncols],
        actual: vec![vecs.iter().map(Vec::len).sum()],
    })
}

fn vecs_to_states(vecs: Vec<Vec<f64>>) -> HopfieldResult<Vec<State>> {
    check_uniform(&vecs)?;
    Ok(vecs.into_iter().map(Array1::from).collect())
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> HopfieldResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> HopfieldResult<T> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Save a dense matrix as a JSON array of rows.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn save_matrix(matrix: &Array2<f64>, path: &Path) -> HopfieldResult<()> {
    write_json(&array2_to_vecs(matrix), path)
}

/// # Errors
/// Returns an error if the file cannot be read or parsed, or if its rows differ
/// in length.
pub fn load_matrix(path: &Path) -> HopfieldResult<Array2<f64>> {
    let rows: Vec<Vec<f64>> = read_json(path)?;
    vecs_to_array2(&rows)
}

/// Save a collection of equal-length states.
///
/// # Errors
/// Returns an error if the file cannot be written.
///
/// # Panics
/// If the in-memory collection is ragged.
pub fn save_states(states: &[State], path: &Path) -> HopfieldResult<()> {
    if let Some(first) = states.first() {
        crate::data::assert_uniform_length(states, first.len());
    }
    let vecs: Vec<Vec<f64>> = states.iter().map(State::to_vec).collect();
    write_json(&vecs, path)
}

/// # Errors
/// Returns an error if the file cannot be read or parsed, or if the stored
/// vectors differ in length.
pub fn load_states(path: &Path) -> HopfieldResult<Vec<State>> {
    vecs_to_states(read_json(path)?)
}

/// Save the trained state of `network`: weights, bias and learned targets.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn save_checkpoint(network: &Network, path: &Path) -> HopfieldResult<()> {
    let data = CheckpointData {
        dimension: network.dimension(),
        domain: network.domain(),
        weights: array2_to_vecs(network.weights()),
        bias: network.bias().to_vec(),
        learned_states: network.learned_states().iter().map(State::to_vec).collect(),
    };
    write_json(&data, path)?;
    info!(path = %path.display(), dimension = data.dimension, "checkpoint saved");
    Ok(())
}

/// Rebuild a network from a checkpoint.
///
/// `config` supplies every hyperparameter; its dimension and domain are
/// replaced by the stored ones. The structural constraints of `config` are
/// applied to the restored weights.
///
/// # Errors
/// Returns an error if the file cannot be read, the config is invalid, or the
/// stored shapes disagree with the stored dimension.
pub fn load_checkpoint(path: &Path, mut config: NetworkConfig) -> HopfieldResult<Network> {
    let data: CheckpointData = read_json(path)?;
    config.dimension = data.dimension;
    config.domain = data.domain;

    let weights = vecs_to_array2(&data.weights)?;
    let bias = Array1::from(data.bias);
    let learned_states = vecs_to_states(data.learned_states)?;
    if let Some(state) = learned_states.first() {
        if state.len() != data.dimension {
            return Err(HopfieldError::ShapeMismatch {
                expected: vec![data.dimension],
                actual: vec![state.len()],
            });
        }
    }

    let mut network = config.build()?;
    network.load_weights(weights, bias)?;
    network.restore_learned_states(learned_states);
    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};
    use tempfile::tempdir;

    fn trained() -> Network {
        let mut network = Network::builder().dimension(4).seed(5).build().unwrap();
        network.learn_states(&[arr1(&[1.0, 1.0, -1.0, -1.0])]);
        network
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("net.json");
        let network = trained();
        save_checkpoint(&network, &path).unwrap();

        let loaded = load_checkpoint(&path, NetworkConfig::default()).unwrap();
        assert_eq!(loaded.dimension(), 4);
        assert_eq!(loaded.domain(), Domain::Bipolar);
        assert_eq!(loaded.weights(), network.weights());
        assert_eq!(loaded.bias(), network.bias());
        assert_eq!(loaded.learned_states(), network.learned_states());
    }

    #[test]
    fn test_matrix_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("w.json");
        let w = arr2(&[[0.0, 0.5, -1.25], [2.0, 0.0, 3.0]]);
        save_matrix(&w, &path).unwrap();
        assert_eq!(load_matrix(&path).unwrap(), w);
    }

    #[test]
    fn test_ragged_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ragged.json");
        std::fs::write(&path, "[[1.0, -1.0], [1.0]]").unwrap();
        let err = load_states(&path).unwrap_err();
        assert!(matches!(
            err,
            HopfieldError::RaggedCollection { index: 1, expected: 2, actual: 1 }
        ));
        assert!(load_matrix(&path).is_err());
    }

    #[test]
    fn test_states_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("states.json");
        let states = vec![arr1(&[1.0, 0.0, 1.0]), arr1(&[0.0, 0.0, 1.0])];
        save_states(&states, &path).unwrap();
        assert_eq!(load_states(&path).unwrap(), states);
    }

    #[test]
    fn test_load_nonexistent_checkpoint() {
        let result = load_checkpoint(Path::new("/nonexistent/path.json"), NetworkConfig::default());
        assert!(matches!(result, Err(HopfieldError::Io(_))));
    }

    #[test]
    fn test_bad_json_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_matrix(&path), Err(HopfieldError::Json(_))));
    }
}
