//! Fan-out / fan-in of independent trajectories over a fixed worker pool.
//!
//! A run splits `total` trajectories into one chunk per worker (the last chunk takes
//! the remainder), gives every chunk its own [`StreamRng`], and blocks until all chunks
//! are done. Results are concatenated chunk by chunk.
//!
//! # Progress contract
//!
//! Progress callbacks are invoked directly from worker threads, possibly from several
//! workers at once, and must therefore be `Send + Sync`. Callers that need
//! single-consumer delivery (a UI thread, an async task) should register a channel
//! with [`SimulationControl::with_progress_channel`] and drain it themselves.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use tracing::{debug, warn};

use super::error::EngineError;
use super::sampling::{StreamRng, clock_seed, derive_chunk_seed, stream_for_seed};

pub const MIN_PARALLELISM: usize = 2;
pub const MAX_PARALLELISM: usize = 8;
/// Upper bound on trajectories per run; larger requests are rejected before allocating.
pub const MAX_SIMULATION_COUNT: usize = 1_000_000;

/// Snapshot of the shared completion counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }
}

pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Shared flag checked by workers before each trajectory.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Optional hooks observed by a run: progress reporting and cancellation.
#[derive(Clone, Default)]
pub struct SimulationControl {
    progress: Option<ProgressCallback>,
    cancel: Option<CancelFlag>,
}

impl SimulationControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Delivers progress through a channel instead of calling back on workers.
    ///
    /// Send errors (receiver dropped) are ignored.
    pub fn with_progress_channel(self, sender: Sender<Progress>) -> Self {
        self.with_progress(move |progress| {
            let _ = sender.send(progress);
        })
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    fn report(&self, completed: usize, total: usize, every: usize) {
        if every == 0 || completed % every != 0 {
            return;
        }
        if let Some(callback) = &self.progress {
            callback(Progress { completed, total });
        }
    }
}

impl std::fmt::Debug for SimulationControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationControl")
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Where chunk seeds come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSource {
    /// Nanosecond clock at the start of each run.
    Clock,
    /// Fixed base seed, for reproducible runs.
    Fixed(u64),
}

/// Worker pool plus seeding policy. Clones share the same pool.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    parallelism: usize,
    seed: SeedSource,
    pool: Arc<ThreadPool>,
}

impl Dispatcher {
    pub fn new(parallelism: usize) -> Result<Self, EngineError> {
        if parallelism == 0 {
            return Err(EngineError::InvalidParallelism(parallelism));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .thread_name(|i| format!("nestegg-worker-{i}"))
            .build()
            .map_err(|e| EngineError::WorkerPool(e.to_string()))?;
        Ok(Self {
            parallelism,
            seed: SeedSource::Clock,
            pool: Arc::new(pool),
        })
    }

    /// One worker per available core, kept within `MIN_PARALLELISM..=MAX_PARALLELISM`.
    pub fn from_available_cores() -> Result<Self, EngineError> {
        Self::new(num_cpus::get().clamp(MIN_PARALLELISM, MAX_PARALLELISM))
    }

    pub fn configured(parallelism: Option<usize>, seed: Option<u64>) -> Result<Self, EngineError> {
        let dispatcher = match parallelism {
            Some(n) => Self::new(n)?,
            None => Self::from_available_cores()?,
        };
        Ok(dispatcher.with_seed(seed))
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed.map_or(SeedSource::Clock, SeedSource::Fixed);
        self
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn seed_source(&self) -> SeedSource {
        self.seed
    }

    /// Chunk sizes for `total` trajectories; the last chunk absorbs the remainder.
    pub fn chunk_sizes(&self, total: usize) -> Vec<usize> {
        let base = total / self.parallelism;
        let remainder = total % self.parallelism;
        let mut sizes = vec![base; self.parallelism];
        if let Some(last) = sizes.last_mut() {
            *last += remainder;
        }
        sizes
    }

    /// Runs `trajectory` `total` times across the pool and concatenates the results.
    ///
    /// `trajectory` receives the chunk's random stream and the trajectory's index
    /// within its chunk. `report_every` is the progress interval in trajectories.
    /// Runs above [`MAX_SIMULATION_COUNT`] fail with `InvalidSimulationCount`.
    pub fn run<T, F>(
        &self,
        total: usize,
        report_every: usize,
        control: &SimulationControl,
        trajectory: F,
    ) -> Result<Vec<T>, EngineError>
    where
        T: Send,
        F: Fn(&mut StreamRng, usize) -> T + Sync,
    {
        if total > MAX_SIMULATION_COUNT {
            return Err(EngineError::InvalidSimulationCount(
                i64::try_from(total).unwrap_or(i64::MAX),
            ));
        }
        let base_seed = match self.seed {
            SeedSource::Clock => clock_seed(),
            SeedSource::Fixed(seed) => seed,
        };
        let sizes = self.chunk_sizes(total);
        let completed = AtomicUsize::new(0);

        let chunks: Vec<Result<Vec<T>, EngineError>> = self.pool.install(|| {
            sizes
                .par_iter()
                .enumerate()
                .map(|(chunk_index, &size)| {
                    let started = Instant::now();
                    let mut rng = stream_for_seed(derive_chunk_seed(base_seed, chunk_index));
                    let mut results = Vec::with_capacity(size);
                    for local_index in 0..size {
                        if control.is_cancelled() {
                            return Err(EngineError::Cancelled {
                                completed: completed.load(Ordering::Relaxed),
                                total,
                            });
                        }
                        results.push(trajectory(&mut rng, local_index));
                        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                        control.report(done, total, report_every);
                    }
                    debug!(
                        chunk_index,
                        trajectories = size,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "chunk finished"
                    );
                    Ok(results)
                })
                .collect()
        });

        let mut merged = Vec::with_capacity(total);
        for chunk in chunks {
            match chunk {
                Ok(results) => merged.extend(results),
                Err(err) => {
                    warn!(%err, "simulation run stopped");
                    return Err(err);
                }
            }
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::sync::Mutex;
    use std::sync::mpsc;

    #[test]
    fn zero_parallelism_is_rejected() {
        assert_eq!(
            Dispatcher::new(0).expect_err("must reject"),
            EngineError::InvalidParallelism(0)
        );
    }

    #[test]
    fn available_cores_are_clamped() {
        let dispatcher = Dispatcher::from_available_cores().expect("pool");
        assert!((MIN_PARALLELISM..=MAX_PARALLELISM).contains(&dispatcher.parallelism()));
    }

    #[test]
    fn last_chunk_absorbs_remainder() {
        let dispatcher = Dispatcher::new(4).expect("valid");
        assert_eq!(dispatcher.chunk_sizes(10), vec![2, 2, 2, 4]);
        assert_eq!(dispatcher.chunk_sizes(3), vec![0, 0, 0, 3]);
        assert_eq!(dispatcher.chunk_sizes(8).iter().sum::<usize>(), 8);
    }

    #[test]
    fn run_returns_one_result_per_trajectory() {
        let dispatcher = Dispatcher::new(3).expect("valid").with_seed(Some(1));
        let results = dispatcher
            .run(1001, 0, &SimulationControl::new(), |_, local| local)
            .expect("run");
        assert_eq!(results.len(), 1001);
    }

    #[test]
    fn fixed_seed_runs_are_reproducible() {
        let dispatcher = Dispatcher::new(4).expect("valid").with_seed(Some(99));
        let draw = |rng: &mut StreamRng, _: usize| rng.random::<u64>();
        let a = dispatcher
            .run(200, 0, &SimulationControl::new(), draw)
            .expect("run");
        let b = dispatcher
            .run(200, 0, &SimulationControl::new(), draw)
            .expect("run");
        assert_eq!(a, b);
    }

    #[test]
    fn chunks_draw_from_distinct_streams() {
        let dispatcher = Dispatcher::new(2).expect("valid").with_seed(Some(5));
        let results = dispatcher
            .run(2, 0, &SimulationControl::new(), |rng, _| rng.random::<u64>())
            .expect("run");
        assert_ne!(results[0], results[1]);
    }

    #[test]
    fn progress_fires_on_every_interval() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let control = SimulationControl::new().with_progress(move |p| {
            sink.lock().expect("lock").push(p.completed);
        });
        let dispatcher = Dispatcher::new(4).expect("valid");
        dispatcher.run(1000, 100, &control, |_, _| ()).expect("run");

        let mut seen = seen.lock().expect("lock").clone();
        seen.sort_unstable();
        assert_eq!(seen, (1..=10).map(|i| i * 100).collect::<Vec<_>>());
    }

    #[test]
    fn progress_channel_delivers_to_one_consumer() {
        let (tx, rx) = mpsc::channel();
        let control = SimulationControl::new().with_progress_channel(tx);
        let dispatcher = Dispatcher::new(2).expect("valid");
        dispatcher.run(600, 300, &control, |_, _| ()).expect("run");
        drop(control);

        let reports: Vec<Progress> = rx.iter().collect();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|p| p.total == 600));
        assert!(reports.iter().any(|p| p.completed == 600));
    }

    #[test]
    fn cancelled_run_returns_error() {
        let flag = CancelFlag::new();
        flag.cancel();
        let control = SimulationControl::new().with_cancel_flag(flag);
        let dispatcher = Dispatcher::new(2).expect("valid");
        let err = dispatcher
            .run(100, 0, &control, |_, _| ())
            .expect_err("cancelled");
        assert!(matches!(err, EngineError::Cancelled { total: 100, .. }));
    }

    #[test]
    fn cancelling_mid_run_stops_workers() {
        let flag = CancelFlag::new();
        let trigger = flag.clone();
        let control = SimulationControl::new()
            .with_cancel_flag(flag)
            .with_progress(move |p| {
                if p.completed >= 50 {
                    trigger.cancel();
                }
            });
        let dispatcher = Dispatcher::new(2).expect("valid");
        let err = dispatcher
            .run(100_000, 10, &control, |_, _| ())
            .expect_err("cancelled");
        match err {
            EngineError::Cancelled { completed, total } => {
                assert_eq!(total, 100_000);
                assert!(completed < total);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn oversized_runs_are_rejected_before_allocating() {
        let dispatcher = Dispatcher::new(2).expect("valid");
        let err = dispatcher
            .run(
                MAX_SIMULATION_COUNT + 1,
                0,
                &SimulationControl::new(),
                |_, _| (),
            )
            .expect_err("too large");
        assert_eq!(
            err,
            EngineError::InvalidSimulationCount(MAX_SIMULATION_COUNT as i64 + 1)
        );

        let err = dispatcher
            .run(usize::MAX, 0, &SimulationControl::new(), |_, _| ())
            .expect_err("too large");
        assert_eq!(err, EngineError::InvalidSimulationCount(i64::MAX));
    }

    #[test]
    fn clones_share_one_pool_across_runs() {
        let dispatcher = Dispatcher::new(3).expect("valid");
        let reseeded = dispatcher.clone().with_seed(Some(4));
        assert!(Arc::ptr_eq(&dispatcher.pool, &reseeded.pool));

        let names = |d: &Dispatcher| {
            d.run(6, 0, &SimulationControl::new(), |_, _| {
                std::thread::current().name().map(str::to_string)
            })
            .expect("run")
        };
        for name in names(&dispatcher).into_iter().chain(names(&reseeded)) {
            assert!(name.expect("named worker").starts_with("nestegg-worker-"));
        }
    }

    #[test]
    fn progress_fraction_handles_empty_runs() {
        let p = Progress {
            completed: 0,
            total: 0,
        };
        assert_eq!(p.fraction(), 1.0);
        let p = Progress {
            completed: 25,
            total: 100,
        };
        assert_eq!(p.fraction(), 0.25);
    }
}
