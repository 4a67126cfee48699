//! Worker pool for concurrent per-state work.
//!
//! # Model
//!
//! ```text
//! dispatcher ──(index, State)──▶ bounded queue (cap = workers) ──▶ worker k
//! dispatcher ◀──(index, State, T)── unbounded result queue ◀───── worker k
//! ```
//!
//! Workers are scoped threads that live for one [`dispatch`] call. Each owns a
//! [`WorkerContext`]: a private generator and scratch buffers, so nothing
//! mutable is shared between threads. States move through the channels by
//! value and results are placed by index, so the output order always matches
//! the input order whatever order the workers finish in.
//!
//! # Determinism
//!
//! Worker `k` draws from a ChaCha stream `k` of the master seed. Which worker
//! claims which state is up to the scheduler, so with more than one worker the
//! random update orders, and therefore the results, are not reproducible run to
//! run. One worker is fully reproducible.

use crate::core::{Scratch, State};
use crossbeam::channel::{bounded, unbounded};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::num::NonZeroUsize;
use std::thread;
use tracing::debug;

/// Private per-worker resources.
pub struct WorkerContext {
    /// Stream `worker_index` of the batch's master seed.
    pub rng: ChaCha8Rng,
    pub scratch: Scratch,
    /// Position of this worker in the pool, from 0.
    pub worker_index: usize,
}

impl WorkerContext {
    pub fn new(master_seed: u64, worker_index: usize, dimension: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(master_seed);
        rng.set_stream(worker_index as u64);
        Self {
            rng,
            scratch: Scratch::new(dimension),
            worker_index,
        }
    }
}

/// Number of workers to use when the caller has no preference.
pub fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Run `work` on every state across `num_workers` threads.
///
/// Returns `(state, output)` pairs in input order; each state is handed back
/// after `work` has mutated it.
///
/// # Panics
/// If `num_workers` is zero, or if a worker panics.
pub fn dispatch<T, F>(
    states: Vec<State>,
    num_workers: usize,
    master_seed: u64,
    dimension: usize,
    work: F,
) -> Vec<(State, T)>
where
    T: Send,
    F: Fn(&mut WorkerContext, &mut State) -> T + Sync,
{
    assert!(num_workers > 0, "worker count must be positive");
    let total = states.len();
    if total == 0 {
        return Vec::new();
    }

    let (job_tx, job_rx) = bounded::<(usize, State)>(num_workers);
    let (result_tx, result_rx) = unbounded::<(usize, State, T)>();
    let mut slots: Vec<Option<(State, T)>> = (0..total).map(|_| None).collect();
    let work = &work;

    thread::scope(|scope| {
        for worker_index in 0..num_workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                let mut ctx = WorkerContext::new(master_seed, worker_index, dimension);
                let mut processed = 0usize;
                for (index, mut state) in job_rx.iter() {
                    let output = work(&mut ctx, &mut state);
                    processed += 1;
                    if result_tx.send((index, state, output)).is_err() {
                        break;
                    }
                }
                debug!(worker_index, processed, "worker drained");
            });
        }
        drop(job_rx);
        drop(result_tx);

        for job in states.into_iter().enumerate() {
            // Fails only when every worker has died; the scope re-raises the panic.
            if job_tx.send(job).is_err() {
                break;
            }
        }
        drop(job_tx);

        for (index, state, output) in result_rx.iter().take(total) {
            slots[index] = Some((state, output));
        }
    });

    let results: Vec<(State, T)> = slots.into_iter().flatten().collect();
    assert_eq!(results.len(), total, "every dispatched state must produce one result");
    results
}
