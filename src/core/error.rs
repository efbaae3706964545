use thiserror::Error;

use super::dispatch::MAX_SIMULATION_COUNT;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid simulation count {0}: must be between 1 and {max}", max = MAX_SIMULATION_COUNT)]
    InvalidSimulationCount(i64),

    #[error("Invalid parallelism {0}: must be > 0")]
    InvalidParallelism(usize),

    /// A zero target with a positive starting asset is a degenerate request.
    #[error("Invalid target asset {target}: must be > 0 when current asset is {current}")]
    InvalidTarget { target: f64, current: f64 },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Simulation cancelled after {completed} of {total} trajectories")]
    Cancelled { completed: usize, total: usize },

    #[error("Worker pool unavailable: {0}")]
    WorkerPool(String),
}

impl EngineError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub(crate) fn ensure_finite(name: &'static str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::invalid(name, format!("must be finite, got {value}")))
    }
}
