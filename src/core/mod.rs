pub mod accumulation;
pub mod calculator;
pub mod decumulation;
pub mod dispatch;
mod engine;
mod error;
pub mod percentile;
pub mod sampling;
mod solver;
mod types;

pub use accumulation::AccumulationParams;
pub use calculator::{
    FailureThreshold, MAX_HORIZON_MONTHS, max_months_for_threshold, months_to_target,
    required_return_rate, target_assets, volatility_for_return,
};
pub use decumulation::{DecumulationParams, MAX_YEARS};
pub use dispatch::{
    CancelFlag, Dispatcher, MAX_SIMULATION_COUNT, Progress, SeedSource, SimulationControl,
};
pub use engine::{ProjectionOptions, run_projection};
pub use error::EngineError;
pub use solver::{GoalSolveConfig, GoalSolveIteration, GoalSolveResult, GoalType, solve_goal};
pub use types::{
    AccumulationResult, DecumulationResult, PercentilePath, ProfileParameters, ProjectionReport,
    RepresentativePaths, ScenarioLabel, SimulationPath,
};
