//! Drawdown-to-depletion Monte Carlo.
//!
//! Each trajectory compounds a starting balance month by month and subtracts spending
//! after the return is applied. Year-end balances are floored at zero and the first
//! year that ends a month at or below zero is the depletion year.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::accumulation::DEFAULT_SIMULATION_COUNT;
use super::dispatch::{Dispatcher, MAX_SIMULATION_COUNT, SimulationControl};
use super::error::{EngineError, ensure_finite};
use super::percentile::{percentile_index, rank_by_balance};
use super::sampling::{MonthlyDrift, StreamRng};
use super::types::{DecumulationResult, PercentilePath, ScenarioLabel, SimulationPath};

pub const DEFAULT_YEARS: u32 = 40;
pub const MAX_YEARS: u32 = 100;
pub const SHORT_HORIZON_YEARS: u32 = 10;
pub const PROGRESS_INTERVAL: usize = 300;
pub const PERCENTILES: [u32; 5] = [10, 30, 50, 70, 90];

const MONTHS_PER_YEAR: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecumulationParams {
    pub initial_asset: f64,
    pub monthly_spending: f64,
    /// Expected annual return, %.
    pub annual_return: f64,
    /// Annual volatility, %.
    pub volatility: f64,
    pub years: u32,
    pub simulation_count: usize,
}

impl Default for DecumulationParams {
    fn default() -> Self {
        Self {
            initial_asset: 0.0,
            monthly_spending: 0.0,
            annual_return: 0.0,
            volatility: 0.0,
            years: DEFAULT_YEARS,
            simulation_count: DEFAULT_SIMULATION_COUNT,
        }
    }
}

impl DecumulationParams {
    fn validate(&self) -> Result<(), EngineError> {
        if self.simulation_count == 0 || self.simulation_count > MAX_SIMULATION_COUNT {
            return Err(EngineError::InvalidSimulationCount(
                i64::try_from(self.simulation_count).unwrap_or(i64::MAX),
            ));
        }
        if self.years == 0 || self.years > MAX_YEARS {
            return Err(EngineError::invalid(
                "years",
                format!("must be in 1..={MAX_YEARS}"),
            ));
        }
        ensure_finite("initialAsset", self.initial_asset)?;
        ensure_finite("monthlySpending", self.monthly_spending)?;
        ensure_finite("annualReturn", self.annual_return)?;
        ensure_finite("volatility", self.volatility)?;
        Ok(())
    }
}

pub fn simulate(
    params: &DecumulationParams,
    dispatcher: &Dispatcher,
    control: &SimulationControl,
) -> Result<DecumulationResult, EngineError> {
    params.validate()?;

    let started = Instant::now();
    let drift = MonthlyDrift::from_annual(params.annual_return, params.volatility);
    info!(
        simulations = params.simulation_count,
        years = params.years,
        parallelism = dispatcher.parallelism(),
        "decumulation run started"
    );

    let paths = dispatcher.run(
        params.simulation_count,
        PROGRESS_INTERVAL,
        control,
        |rng, _| run_trajectory(params, drift, rng),
    )?;

    let depletion_count = paths.iter().filter(|p| p.depletion_year().is_some()).count();
    let final_year = params.years as usize;
    let short_year = params.years.min(SHORT_HORIZON_YEARS) as usize;

    let long_horizon = percentile_paths(&paths, final_year, None);
    let short_horizon = percentile_paths(&paths, short_year, Some(short_year));

    let result = DecumulationResult {
        years: params.years,
        total_simulations: paths.len(),
        depletion_count,
        depletion_probability: depletion_count as f64 / params.simulation_count as f64,
        long_horizon,
        short_horizon,
        reference: reference_path(params),
    };
    info!(
        depletion_probability = result.depletion_probability,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "decumulation run finished"
    );
    Ok(result)
}

/// The same drawdown with a fixed monthly factor `1 + r/12` and no random term.
pub fn reference_path(params: &DecumulationParams) -> SimulationPath {
    let factor = 1.0 + params.annual_return / 100.0 / 12.0;
    drawdown(params, || factor)
}

fn run_trajectory(
    params: &DecumulationParams,
    drift: MonthlyDrift,
    rng: &mut StreamRng,
) -> SimulationPath {
    drawdown(params, || drift.sample_factor(rng))
}

fn drawdown(params: &DecumulationParams, mut monthly_factor: impl FnMut() -> f64) -> SimulationPath {
    let mut asset = params.initial_asset;
    let mut assets = Vec::with_capacity(params.years as usize + 1);
    assets.push(asset.max(0.0));
    let mut depletion_year = None;

    for year in 1..=params.years {
        for _ in 0..MONTHS_PER_YEAR {
            asset = asset * monthly_factor() - params.monthly_spending;
            if asset <= 0.0 && depletion_year.is_none() {
                depletion_year = Some(year);
            }
        }
        asset = asset.max(0.0);
        assets.push(asset);
    }

    SimulationPath {
        assets,
        terminal_period: depletion_year,
    }
}

/// Five percentile paths ranked by the balance at `rank_year`.
///
/// `truncate_to` trims each chosen path to that many years for display.
fn percentile_paths(
    paths: &[SimulationPath],
    rank_year: usize,
    truncate_to: Option<usize>,
) -> Vec<PercentilePath> {
    if paths.is_empty() {
        return Vec::new();
    }
    let order = rank_by_balance(paths, rank_year);
    PERCENTILES
        .iter()
        .map(|&percentile| {
            let chosen = &paths[order[percentile_index(order.len(), percentile)]];
            PercentilePath {
                percentile,
                label: ScenarioLabel::for_percentile(percentile),
                path: match truncate_to {
                    Some(years) => chosen.truncated(years),
                    None => chosen.clone(),
                },
            }
        })
        .collect()
}
