//! End-to-end tests for learning and relaxation.
//!
//! These tests verify:
//! - Hebbian targets become stable attractors and learning accumulates
//! - Relaxation recovers corrupted targets
//! - Batch relaxation keeps results aligned with their inputs for any worker count
//! - Non-converging relaxations report the iteration cap

use approx::assert_abs_diff_eq;
use hopfield::pool::default_workers;
use hopfield::{DistanceMeasure, Domain, Network, State, StateGenerator};
use ndarray::{arr1, arr2, Array1};

/// Four mutually orthogonal rows of the 8×8 Sylvester-Hadamard matrix.
///
/// Hebbian training on them gives `W ξ = (n - p) ξ = 4 ξ` for every pattern,
/// so each is a strict fixed point.
fn hadamard_targets() -> Vec<State> {
    vec![
        arr1(&[1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0]),
        arr1(&[1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0]),
        arr1(&[1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0]),
        arr1(&[1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0]),
    ]
}

fn hadamard_network(units_updated_per_step: usize) -> Network {
    let mut network = Network::builder()
        .dimension(8)
        .units_updated_per_step(units_updated_per_step)
        .seed(21)
        .build()
        .expect("valid network");
    network.learn_states(&hadamard_targets());
    network
}

#[test]
fn test_hebbian_single_target_is_stable() {
    let mut network = Network::builder().dimension(4).seed(1).build().unwrap();
    let target = arr1(&[1.0, 1.0, -1.0, -1.0]);
    network.learn_states(std::slice::from_ref(&target));

    assert!(network.state_is_stable(&target));
    assert!(network.all_states_are_stable(std::slice::from_ref(&target)));
    assert_eq!(network.learned_states(), std::slice::from_ref(&target));
}

#[test]
fn test_hebbian_learning_accumulates() {
    let mut network = Network::builder().dimension(4).seed(1).build().unwrap();
    let target = arr1(&[1.0, 1.0, -1.0, -1.0]);

    network.learn_states(std::slice::from_ref(&target));
    let after_one = network.weights().clone();
    network.learn_states(std::slice::from_ref(&target));

    assert_ne!(network.weights(), &after_one);
    assert_eq!(network.weights(), &(&after_one * 2.0));
    assert_eq!(network.learned_states().len(), 2);
}

#[test]
fn test_hadamard_targets_are_fixed_points() {
    let network = hadamard_network(1);
    let targets = hadamard_targets();
    assert!(network.all_states_are_stable(&targets));
    for target in &targets {
        for &e in network.all_unit_energies(target).iter() {
            assert_abs_diff_eq!(e, -2.0, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_synchronous_sweep_keeps_fixed_point() {
    let mut network = hadamard_network(8);
    for target in hadamard_targets() {
        let mut state = target.clone();
        network.update_state(&mut state);
        assert_eq!(state, target);
    }
}

#[test]
fn test_relax_recovers_corrupted_target() {
    let mut network = Network::builder()
        .dimension(16)
        .distance_measure(DistanceMeasure::Manhattan)
        .seed(8)
        .build()
        .unwrap();
    let target: State = (0..16).map(|i| if i % 3 == 0 { 1.0 } else { -1.0 }).collect();
    network.learn_states(std::slice::from_ref(&target));

    let mut probe = target.clone();
    for i in [1, 6, 11] {
        probe[i] = -probe[i];
    }
    let result = network.relax_state(&mut probe);

    assert!(result.stable);
    assert_eq!(probe, target);
    assert_eq!(result.distances_to_targets, vec![0.0]);
    assert_eq!(result.energy_profile.len(), 16);
    assert!(result.num_steps <= network.config().max_relaxation_iterations);
}

#[test]
fn test_relax_batch_keeps_index_correspondence() {
    let targets = hadamard_targets();
    let order = [2, 0, 3, 1, 1, 3, 0, 2, 2, 2, 0];

    for workers in [1, default_workers(), order.len()] {
        let mut network = hadamard_network(1);
        let mut probes: Vec<State> = order.iter().map(|&k| targets[k].clone()).collect();
        let results = network.relax_batch(&mut probes, workers);

        assert_eq!(results.len(), order.len());
        for (i, &k) in order.iter().enumerate() {
            let result = &results[i];
            assert!(result.stable, "probe {i} should be stable");
            assert_eq!(result.num_steps, 1);
            assert_eq!(result.distances_to_targets.len(), targets.len());
            assert_eq!(result.distances_to_targets[k], 0.0);
            for (j, &d) in result.distances_to_targets.iter().enumerate() {
                if j != k {
                    assert_eq!(d, 8.0);
                }
            }
            assert_eq!(probes[i], targets[k]);
        }
    }
}

#[test]
fn test_relax_batch_random_probes_all_settle_or_cap() {
    let mut network = Network::builder()
        .dimension(32)
        .max_relaxation_iterations(50)
        .seed(4)
        .build()
        .unwrap();
    let mut generator = StateGenerator::builder().dimension(32).seed(5).build().unwrap();
    network.learn_states(&generator.create_learned_collection(3));

    let mut probes = generator.create_collection(40);
    let originals = probes.clone();
    let results = network.relax_batch(&mut probes, 4);

    for ((probe, original), result) in probes.iter().zip(&originals).zip(&results) {
        assert_eq!(probe.len(), original.len());
        if result.stable {
            assert!(network.state_is_stable(probe));
        } else {
            assert_eq!(result.num_steps, 50);
        }
    }
}

#[test]
fn test_unstable_relaxation_reports_cap() {
    let mut network = Network::builder()
        .dimension(2)
        .force_symmetric(false)
        .max_relaxation_iterations(7)
        .seed(3)
        .build()
        .unwrap();
    network
        .load_weights(arr2(&[[0.0, 1.0], [-1.0, 0.0]]), Array1::zeros(2))
        .unwrap();

    let mut state = arr1(&[1.0, -1.0]);
    let result = network.relax_state(&mut state);
    assert!(!result.stable);
    assert_eq!(result.num_steps, 7);

    let mut batch = vec![arr1(&[1.0, 1.0]), arr1(&[-1.0, 1.0]), arr1(&[-1.0, -1.0])];
    for result in network.relax_batch(&mut batch, 2) {
        assert!(!result.stable);
        assert_eq!(result.num_steps, 7);
    }
}

#[test]
fn test_intensive_relaxation_history() {
    let mut network = Network::builder()
        .dimension(8)
        .intensive_collection(true)
        .seed(9)
        .build()
        .unwrap();
    let targets = hadamard_targets();
    network.learn_states(&targets);

    let mut probe = targets[0].clone();
    probe[3] = -probe[3];
    let initial = probe.clone();
    let result = network.relax_state(&mut probe);

    let states = result.state_history.expect("state history recorded");
    let energies = result.energy_history.expect("energy history recorded");
    assert_eq!(states.len(), result.num_steps + 1);
    assert_eq!(energies.len(), states.len());
    assert_eq!(states[0], initial);
    assert_eq!(states.last(), Some(&probe));
    assert_eq!(energies.last(), Some(&result.energy_profile));
}

#[test]
fn test_binary_hebbian_target_is_stable() {
    let mut network = Network::builder()
        .dimension(4)
        .domain(Domain::Binary)
        .seed(2)
        .build()
        .unwrap();
    let target = arr1(&[1.0, 0.0, 1.0, 0.0]);
    network.learn_states(std::slice::from_ref(&target));

    assert!(network.state_is_stable(&target));
    let energies = network.all_unit_energies(&target);
    assert_abs_diff_eq!(energies[0], -1.5, epsilon = 1e-12);
    assert_abs_diff_eq!(energies[1], 0.0, epsilon = 1e-12);

    let mut state = target.clone();
    network.update_state(&mut state);
    assert_eq!(state, target);
}

#[test]
fn test_seeded_networks_relax_identically() {
    let run = || {
        let mut network = Network::builder().dimension(24).seed(77).build().unwrap();
        let mut generator = StateGenerator::builder().dimension(24).seed(78).build().unwrap();
        network.learn_states(&generator.create_learned_collection(4));
        let mut probes = generator.create_collection(10);
        let results = network.relax_batch(&mut probes, 1);
        (probes, results)
    };
    assert_eq!(run(), run());
}
