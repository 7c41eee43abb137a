//! Evaluation backends.
//!
//! A sampling pass is split into independent slices (z-slices of a volume,
//! rows of a floor heat map). An `Evaluator` decides where those slices run;
//! results always come back ordered by slice index.

use std::thread;
use wavemap_core::propagation::FieldSample;

/// Computes the samples of one slice given its index.
pub type SliceFn<'a> = dyn Fn(usize) -> Vec<FieldSample> + Sync + 'a;

/// Returns true once the pass should stop.
pub type CancelCheck<'a> = dyn Fn() -> bool + Sync + 'a;

/// Runs slice functions.
pub trait Evaluator: Send + Sync {
    /// Returns a short name for log messages.
    fn name(&self) -> &'static str;

    /// Evaluates slices `0..n_slices` and returns them in index order, or
    /// `None` if `cancel` returned true before every slice was done.
    ///
    /// * `n_slices` - Number of slices.
    /// * `slice`    - Computes one slice.
    /// * `cancel`   - Cancellation check polled between slices.
    fn evaluate(
        &self,
        n_slices: usize,
        slice: &SliceFn,
        cancel: &CancelCheck,
    ) -> Option<Vec<Vec<FieldSample>>>;
}

/// Evaluates slices one after another on the calling thread.
#[derive(Copy, Clone, Debug, Default)]
pub struct SerialEvaluator;

impl Evaluator for SerialEvaluator {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn evaluate(
        &self,
        n_slices: usize,
        slice: &SliceFn,
        cancel: &CancelCheck,
    ) -> Option<Vec<Vec<FieldSample>>> {
        let mut slices = Vec::with_capacity(n_slices);
        for i in 0..n_slices {
            if cancel() {
                debug!("Serial pass cancelled at slice {}/{}", i, n_slices);
                return None;
            }
            slices.push(slice(i));
        }
        Some(slices)
    }
}

/// Evaluates slices on a pool of scoped worker threads fed through a bounded
/// work queue. A collector thread gathers finished slices.
#[derive(Copy, Clone, Debug)]
pub struct ThreadPoolEvaluator {
    /// Number of worker threads.
    n_threads: usize,
}

impl ThreadPoolEvaluator {
    /// Create a new `ThreadPoolEvaluator`.
    ///
    /// * `n_threads` - Number of worker threads; zero is treated as one.
    pub fn new(n_threads: usize) -> Self {
        Self {
            n_threads: n_threads.max(1),
        }
    }

    /// Returns the number of worker threads.
    pub fn threads(&self) -> usize {
        self.n_threads
    }
}

impl Evaluator for ThreadPoolEvaluator {
    fn name(&self) -> &'static str {
        "thread pool"
    }

    fn evaluate(
        &self,
        n_slices: usize,
        slice: &SliceFn,
        cancel: &CancelCheck,
    ) -> Option<Vec<Vec<FieldSample>>> {
        let n_threads = self.n_threads;

        let slices = thread::scope(|scope| {
            let (tx_collector, rx_collector) =
                crossbeam_channel::bounded::<(usize, Vec<FieldSample>)>(n_threads);
            let (tx_worker, rx_worker) = crossbeam_channel::bounded::<usize>(n_threads);

            // Spawn collector thread.
            let collector = scope.spawn(move || {
                let mut slices: Vec<Option<Vec<FieldSample>>> = vec![None; n_slices];
                for (i, samples) in rx_collector.iter() {
                    slices[i] = Some(samples);
                }
                slices
            });

            // Spawn worker threads.
            for _ in 0..n_threads {
                let rx_worker = rx_worker.clone();
                let tx_collector = tx_collector.clone();
                scope.spawn(move || {
                    for i in rx_worker.iter() {
                        if cancel() {
                            break;
                        }
                        if tx_collector.send((i, slice(i))).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(rx_worker); // Drop extra since we've cloned one for each worker.
            drop(tx_collector);

            // Send work.
            for i in 0..n_slices {
                if cancel() {
                    debug!("Thread pool pass cancelled at slice {}/{}", i, n_slices);
                    break;
                }
                if tx_worker.send(i).is_err() {
                    break;
                }
            }
            drop(tx_worker);

            match collector.join() {
                Ok(slices) => slices,
                Err(e) => std::panic::resume_unwind(e),
            }
        });

        slices.into_iter().collect()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
