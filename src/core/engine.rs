use serde::{Deserialize, Serialize};
use tracing::info;

use super::accumulation::{self, AccumulationParams, DEFAULT_SIMULATION_COUNT};
use super::calculator::{
    FailureThreshold, max_months_for_threshold, months_to_target, required_return_rate,
    target_assets, volatility_for_return,
};
use super::decumulation::{self, DEFAULT_YEARS, DecumulationParams};
use super::dispatch::{Dispatcher, SimulationControl};
use super::error::{EngineError, ensure_finite};
use super::types::{ProfileParameters, ProjectionReport};

/// Offsets the decumulation base seed so both phases draw from distinct streams.
const DECUMULATION_SEED_OFFSET: u64 = 0xD1B5_4A32_D192_ED03;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectionOptions {
    pub simulation_count: usize,
    pub failure_threshold: FailureThreshold,
    pub decumulation_years: u32,
    pub track_paths: bool,
    /// Overrides the volatility table, %.
    pub pre_retirement_volatility: Option<f64>,
    pub post_retirement_volatility: Option<f64>,
    pub seed: Option<u64>,
    pub parallelism: Option<usize>,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            simulation_count: DEFAULT_SIMULATION_COUNT,
            failure_threshold: FailureThreshold::default(),
            decumulation_years: DEFAULT_YEARS,
            track_paths: true,
            pre_retirement_volatility: None,
            post_retirement_volatility: None,
            seed: None,
            parallelism: None,
        }
    }
}

impl ProjectionOptions {
    pub(crate) fn dispatchers(&self) -> Result<(Dispatcher, Dispatcher), EngineError> {
        let accumulation = Dispatcher::configured(self.parallelism, self.seed)?;
        let decumulation = accumulation
            .clone()
            .with_seed(self.seed.map(|s| s.wrapping_add(DECUMULATION_SEED_OFFSET)));
        Ok((accumulation, decumulation))
    }

    pub(crate) fn volatilities(&self, profile: &ProfileParameters) -> (f64, f64) {
        (
            self.pre_retirement_volatility
                .unwrap_or_else(|| volatility_for_return(profile.pre_retirement_return_rate)),
            self.post_retirement_volatility
                .unwrap_or_else(|| volatility_for_return(profile.post_retirement_return_rate)),
        )
    }
}

pub(crate) fn validate_profile(profile: &ProfileParameters) -> Result<(), EngineError> {
    ensure_finite("desiredMonthlyIncome", profile.desired_monthly_income)?;
    ensure_finite("currentNetAssets", profile.current_net_assets)?;
    ensure_finite("monthlyInvestment", profile.monthly_investment)?;
    ensure_finite("preRetirementReturnRate", profile.pre_retirement_return_rate)?;
    ensure_finite("postRetirementReturnRate", profile.post_retirement_return_rate)?;
    if profile.desired_monthly_income < 0.0 {
        return Err(EngineError::invalid("desiredMonthlyIncome", "must be >= 0"));
    }
    Ok(())
}

pub fn run_projection(
    profile: &ProfileParameters,
    options: &ProjectionOptions,
    control: &SimulationControl,
) -> Result<ProjectionReport, EngineError> {
    validate_profile(profile)?;

    let target = target_assets(
        profile.desired_monthly_income,
        profile.post_retirement_return_rate,
    );
    let baseline_months = months_to_target(
        profile.current_net_assets,
        target,
        profile.monthly_investment,
        profile.pre_retirement_return_rate,
    );
    let already_at_target = profile.current_net_assets >= target;
    let max_months =
        max_months_for_threshold(baseline_months, options.failure_threshold.multiplier());
    let (pre_volatility, post_volatility) = options.volatilities(profile);
    let (accumulation_dispatcher, decumulation_dispatcher) = options.dispatchers()?;

    info!(
        target_assets = target,
        baseline_months, max_months, already_at_target, "projection started"
    );

    let accumulation = accumulation::simulate(
        &AccumulationParams {
            initial_asset: profile.current_net_assets,
            monthly_investment: profile.monthly_investment,
            target_asset: target,
            mean_return: profile.pre_retirement_return_rate,
            volatility: pre_volatility,
            simulation_count: options.simulation_count,
            max_months,
            track_paths: options.track_paths,
        },
        &accumulation_dispatcher,
        control,
    )?;

    let decumulation = decumulation::simulate(
        &DecumulationParams {
            initial_asset: target,
            monthly_spending: profile.desired_monthly_income,
            annual_return: profile.post_retirement_return_rate,
            volatility: post_volatility,
            years: options.decumulation_years,
            simulation_count: options.simulation_count,
        },
        &decumulation_dispatcher,
        control,
    )?;

    Ok(ProjectionReport {
        profile: *profile,
        target_assets: target,
        baseline_months,
        already_at_target,
        required_return_rate: already_at_target.then(|| {
            required_return_rate(profile.current_net_assets, profile.desired_monthly_income)
        }),
        pre_retirement_volatility: pre_volatility,
        post_retirement_volatility: post_volatility,
        max_months,
        accumulation,
        decumulation,
    })
}
