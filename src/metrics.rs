//! Per-trial result collection.
//!
//! A [`TrialAccumulator`] is owned by whoever runs the trial; there is no
//! process-wide collector. Records and summaries are serde types so they can be
//! written straight to JSONL.

use crate::core::{RelaxationResult, State};
use crate::utils::mean;
use serde::{Deserialize, Serialize};

/// One relaxed probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelaxationRecord {
    pub trial_index: usize,
    pub probe_index: usize,
    pub stable: bool,
    pub num_steps: usize,
    pub final_state: Vec<f64>,
    pub energy_profile: Vec<f64>,
    pub distances_to_targets: Vec<f64>,
}

/// Aggregate over every probe of a trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSummary {
    pub trial_index: usize,
    pub num_targets: usize,
    pub num_probes: usize,
    pub num_stable: usize,
    /// Mean steps over stable probes; `None` when no probe was stable.
    pub mean_steps_stable: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct TrialAccumulator {
    trial_index: usize,
    num_targets: usize,
    records: Vec<RelaxationRecord>,
}

impl TrialAccumulator {
    pub fn new(trial_index: usize, num_targets: usize) -> Self {
        Self {
            trial_index,
            num_targets,
            records: Vec::new(),
        }
    }

    /// Store the outcome of relaxing probe `probe_index` to `final_state`.
    pub fn record(&mut self, probe_index: usize, final_state: &State, result: &RelaxationResult) -> &RelaxationRecord {
        self.records.push(RelaxationRecord {
            trial_index: self.trial_index,
            probe_index,
            stable: result.stable,
            num_steps: result.num_steps,
            final_state: final_state.to_vec(),
            energy_profile: result.energy_profile.clone(),
            distances_to_targets: result.distances_to_targets.clone(),
        });
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[RelaxationRecord] {
        &self.records
    }

    pub fn summary(&self) -> TrialSummary {
        let stable_steps: Vec<f64> = self
            .records
            .iter()
            .filter(|r| r.stable)
            .map(|r| r.num_steps as f64)
            .collect();
        TrialSummary {
            trial_index: self.trial_index,
            num_targets: self.num_targets,
            num_probes: self.records.len(),
            num_stable: stable_steps.len(),
            mean_steps_stable: mean(&stable_steps),
        }
    }
}
