use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::calculator::MAX_HORIZON_MONTHS;
use super::dispatch::{Dispatcher, MAX_SIMULATION_COUNT, SimulationControl};
use super::error::{EngineError, ensure_finite};
use super::percentile::select_representative;
use super::sampling::{MonthlyDrift, StreamRng};
use super::types::{AccumulationResult, RepresentativePaths, SimulationPath};

pub const DEFAULT_SIMULATION_COUNT: usize = 30_000;
/// Keep the monthly history of one trajectory in this many.
pub const PATH_SAMPLE_INTERVAL: usize = 100;
pub const PROGRESS_INTERVAL: usize = 1000;

const BEST_PERCENTILE: u32 = 10;
const MEDIAN_PERCENTILE: u32 = 50;
const WORST_PERCENTILE: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulationParams {
    pub initial_asset: f64,
    pub monthly_investment: f64,
    pub target_asset: f64,
    /// Expected annual return, %.
    pub mean_return: f64,
    /// Annual volatility, %.
    pub volatility: f64,
    pub simulation_count: usize,
    pub max_months: u32,
    pub track_paths: bool,
}

impl Default for AccumulationParams {
    fn default() -> Self {
        Self {
            initial_asset: 0.0,
            monthly_investment: 0.0,
            target_asset: 0.0,
            mean_return: 0.0,
            volatility: 0.0,
            simulation_count: DEFAULT_SIMULATION_COUNT,
            max_months: MAX_HORIZON_MONTHS,
            track_paths: false,
        }
    }
}

impl AccumulationParams {
    fn validate(&self) -> Result<(), EngineError> {
        if self.simulation_count == 0 || self.simulation_count > MAX_SIMULATION_COUNT {
            return Err(EngineError::InvalidSimulationCount(
                i64::try_from(self.simulation_count).unwrap_or(i64::MAX),
            ));
        }
        ensure_finite("initialAsset", self.initial_asset)?;
        ensure_finite("monthlyInvestment", self.monthly_investment)?;
        ensure_finite("targetAsset", self.target_asset)?;
        ensure_finite("meanReturn", self.mean_return)?;
        ensure_finite("volatility", self.volatility)?;
        if self.max_months > MAX_HORIZON_MONTHS {
            return Err(EngineError::invalid(
                "maxMonths",
                format!("must be <= {MAX_HORIZON_MONTHS}"),
            ));
        }
        if self.target_asset == 0.0 && self.initial_asset > 0.0 {
            return Err(EngineError::InvalidTarget {
                target: self.target_asset,
                current: self.initial_asset,
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Trajectory {
    months_to_target: Option<u32>,
    path: Option<SimulationPath>,
}

pub fn simulate(
    params: &AccumulationParams,
    dispatcher: &Dispatcher,
    control: &SimulationControl,
) -> Result<AccumulationResult, EngineError> {
    params.validate()?;

    let started = Instant::now();
    let drift = MonthlyDrift::from_annual(params.mean_return, params.volatility);
    info!(
        simulations = params.simulation_count,
        max_months = params.max_months,
        parallelism = dispatcher.parallelism(),
        "accumulation run started"
    );

    let trajectories = dispatcher.run(
        params.simulation_count,
        PROGRESS_INTERVAL,
        control,
        |rng, local_index| {
            let keep_path = params.track_paths && local_index % PATH_SAMPLE_INTERVAL == 0;
            run_trajectory(params, drift, rng, keep_path)
        },
    )?;

    let result = aggregate(params, trajectories);
    info!(
        success_rate = result.success_rate,
        successes = result.success_count,
        failures = result.failure_count,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "accumulation run finished"
    );
    Ok(result)
}

fn run_trajectory(
    params: &AccumulationParams,
    drift: MonthlyDrift,
    rng: &mut StreamRng,
    keep_path: bool,
) -> Trajectory {
    let mut asset = params.initial_asset;
    let mut history = keep_path.then(|| vec![asset]);

    if asset >= params.target_asset {
        return Trajectory {
            months_to_target: Some(0),
            path: history.map(|assets| SimulationPath {
                assets,
                terminal_period: Some(0),
            }),
        };
    }

    let mut months_to_target = None;
    for month in 1..=params.max_months {
        asset += params.monthly_investment;
        asset *= drift.sample_factor(rng);
        // A ruined balance restarts from zero; later contributions may still recover it.
        if !asset.is_finite() || asset < 0.0 {
            asset = 0.0;
        }
        if let Some(history) = history.as_mut() {
            history.push(asset);
        }
        if asset >= params.target_asset {
            months_to_target = Some(month);
            break;
        }
    }

    Trajectory {
        months_to_target,
        path: history.map(|assets| SimulationPath {
            assets,
            terminal_period: months_to_target,
        }),
    }
}

fn aggregate(params: &AccumulationParams, trajectories: Vec<Trajectory>) -> AccumulationResult {
    let total = trajectories.len();
    let mut success_months = Vec::with_capacity(total);
    let mut sampled = Vec::new();
    let mut sampled_path_count = 0;

    for trajectory in trajectories {
        if let Some(month) = trajectory.months_to_target {
            success_months.push(month);
        }
        if let Some(path) = trajectory.path {
            sampled_path_count += 1;
            if path.months_to_target().is_some() {
                sampled.push(path);
            }
        }
    }
    success_months.sort_unstable();
    // Stable, so equal months keep merge order.
    sampled.sort_by_key(SimulationPath::months_to_target);

    let representative_paths = RepresentativePaths {
        best: select_representative(&success_months, &sampled, BEST_PERCENTILE).cloned(),
        median: select_representative(&success_months, &sampled, MEDIAN_PERCENTILE).cloned(),
        worst: select_representative(&success_months, &sampled, WORST_PERCENTILE).cloned(),
    };

    let success_count = success_months.len();
    AccumulationResult {
        success_rate: success_count as f64 / params.simulation_count as f64,
        success_months,
        success_count,
        failure_count: total - success_count,
        total_simulations: total,
        max_months: params.max_months,
        sampled_path_count,
        representative_paths,
    }
}
