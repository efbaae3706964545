use serde::{Deserialize, Serialize};
use tracing::debug;

use super::accumulation::{self, AccumulationParams};
use super::calculator::{max_months_for_threshold, months_to_target, target_assets};
use super::decumulation::{self, DecumulationParams};
use super::dispatch::{Dispatcher, SimulationControl};
use super::engine::{ProjectionOptions, validate_profile};
use super::error::EngineError;
use super::types::ProfileParameters;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalType {
    /// Smallest monthly investment whose accumulation success rate meets the threshold.
    RequiredInvestment,
    /// Largest monthly spending whose drawdown survival rate meets the threshold.
    MaxSpending,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveConfig {
    pub goal_type: GoalType,
    pub target_success_rate: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub simulations_per_iteration: usize,
    pub final_simulations: usize,
    /// Accumulation horizon; derived from the profile's baseline when absent.
    pub horizon_months: Option<u32>,
    /// Every candidate reuses this seed so candidates face the same markets.
    pub seed: u64,
}

impl Default for GoalSolveConfig {
    fn default() -> Self {
        Self {
            goal_type: GoalType::RequiredInvestment,
            target_success_rate: 0.9,
            search_min: 0.0,
            search_max: 10_000_000.0,
            tolerance: 1_000.0,
            max_iterations: 32,
            simulations_per_iteration: 2_000,
            final_simulations: 10_000,
            horizon_months: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub success_rate: f64,
    pub success_ci_half_width: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveResult {
    pub goal_type: GoalType,
    pub target_success_rate: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub horizon_months: u32,
    pub starting_balance: f64,
    pub solved_value: Option<f64>,
    pub achieved_success_rate: Option<f64>,
    pub achieved_success_ci_half_width: Option<f64>,
    pub iterations: Vec<GoalSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
struct CandidateEval {
    success_rate: f64,
    success_ci_half_width: f64,
}

/// Fixed inputs shared by every candidate evaluation.
struct SolveContext<'a> {
    profile: &'a ProfileParameters,
    options: &'a ProjectionOptions,
    control: &'a SimulationControl,
    dispatcher: Dispatcher,
    target: f64,
    horizon_months: u32,
}

impl SolveContext<'_> {
    fn evaluate(
        &self,
        goal_type: GoalType,
        candidate: f64,
        simulations: usize,
    ) -> Result<CandidateEval, EngineError> {
        let (pre_volatility, post_volatility) = self.options.volatilities(self.profile);
        let success_rate = match goal_type {
            GoalType::RequiredInvestment => {
                accumulation::simulate(
                    &AccumulationParams {
                        initial_asset: self.profile.current_net_assets,
                        monthly_investment: candidate.max(0.0),
                        target_asset: self.target,
                        mean_return: self.profile.pre_retirement_return_rate,
                        volatility: pre_volatility,
                        simulation_count: simulations,
                        max_months: self.horizon_months,
                        track_paths: false,
                    },
                    &self.dispatcher,
                    self.control,
                )?
                .success_rate
            }
            GoalType::MaxSpending => decumulation::simulate(
                &DecumulationParams {
                    initial_asset: self.target,
                    monthly_spending: candidate.max(0.0),
                    annual_return: self.profile.post_retirement_return_rate,
                    volatility: post_volatility,
                    years: self.options.decumulation_years,
                    simulation_count: simulations,
                },
                &self.dispatcher,
                self.control,
            )?
            .survival_rate(),
        };
        Ok(CandidateEval {
            success_rate,
            success_ci_half_width: binomial_ci_half_width(success_rate, simulations),
        })
    }
}

pub fn solve_goal(
    profile: &ProfileParameters,
    options: &ProjectionOptions,
    config: GoalSolveConfig,
    control: &SimulationControl,
) -> Result<GoalSolveResult, EngineError> {
    validate_profile(profile)?;
    validate_config(config)?;

    let target = target_assets(
        profile.desired_monthly_income,
        profile.post_retirement_return_rate,
    );
    let horizon_months = config.horizon_months.unwrap_or_else(|| {
        let baseline = months_to_target(
            profile.current_net_assets,
            target,
            profile.monthly_investment,
            profile.pre_retirement_return_rate,
        );
        max_months_for_threshold(baseline, options.failure_threshold.multiplier())
    });
    let ctx = SolveContext {
        profile,
        options,
        control,
        dispatcher: Dispatcher::configured(options.parallelism, Some(config.seed))?,
        target,
        horizon_months,
    };

    let sims = config.simulations_per_iteration;
    let meets = |eval: CandidateEval| eval.success_rate + 1e-12 >= config.target_success_rate;
    let low_eval = ctx.evaluate(config.goal_type, config.search_min, sims)?;
    let high_eval = ctx.evaluate(config.goal_type, config.search_max, sims)?;

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let mut solved_value = None;
    let mut converged = false;
    let feasible;
    let message;

    // RequiredInvestment: success rises with the candidate, so keep the feasible upper
    // bound. MaxSpending: success falls with it, so keep the feasible lower bound.
    let rising = config.goal_type == GoalType::RequiredInvestment;
    let (already_solved, unreachable) = if rising {
        (meets(low_eval), !meets(high_eval))
    } else {
        (meets(high_eval), !meets(low_eval))
    };

    if already_solved {
        solved_value = Some(if rising {
            config.search_min
        } else {
            config.search_max
        });
        converged = true;
        feasible = true;
        message = if rising {
            "Already meets target at lower investment bound.".to_string()
        } else {
            "Upper spending bound is still feasible; increase search max for a higher target."
                .to_string()
        };
    } else if unreachable {
        feasible = false;
        message = if rising {
            "No feasible investment found within the search bounds.".to_string()
        } else {
            "No feasible spending found within the search bounds.".to_string()
        };
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let eval = ctx.evaluate(config.goal_type, mid, sims)?;
            iterations.push(GoalSolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_value: mid,
                success_rate: eval.success_rate,
                success_ci_half_width: eval.success_ci_half_width,
            });
            debug!(
                iteration = it,
                candidate = mid,
                success_rate = eval.success_rate,
                "solver step"
            );

            match (meets(eval), rising) {
                (true, true) | (false, false) => hi = mid,
                (false, true) | (true, false) => lo = mid,
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                break;
            }
        }
        solved_value = Some(if rising { hi } else { lo });
        feasible = true;
        message = match (converged, rising) {
            (true, true) => "Solved required monthly investment.".to_string(),
            (true, false) => "Solved maximum sustainable monthly spending.".to_string(),
            (false, _) => {
                "Reached max iterations before tolerance was met; returning best estimate."
                    .to_string()
            }
        };
    }

    let mut achieved_success_rate = None;
    let mut achieved_success_ci_half_width = None;
    if let Some(value) = solved_value {
        let final_eval = ctx.evaluate(config.goal_type, value, config.final_simulations)?;
        achieved_success_rate = Some(final_eval.success_rate);
        achieved_success_ci_half_width = Some(final_eval.success_ci_half_width);
    }

    Ok(GoalSolveResult {
        goal_type: config.goal_type,
        target_success_rate: config.target_success_rate,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        horizon_months,
        starting_balance: target,
        solved_value,
        achieved_success_rate,
        achieved_success_ci_half_width,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn binomial_ci_half_width(p: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = p.clamp(0.0, 1.0);
    1.96 * (p * (1.0 - p) / n as f64).sqrt()
}

fn validate_config(config: GoalSolveConfig) -> Result<(), EngineError> {
    if !(0.0..=1.0).contains(&config.target_success_rate) {
        return Err(EngineError::invalid(
            "targetSuccessRate",
            "must be between 0 and 1",
        ));
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err(EngineError::invalid("searchBounds", "must be finite"));
    }
    if config.search_min < 0.0 {
        return Err(EngineError::invalid("searchMin", "must be >= 0"));
    }
    if config.search_max <= config.search_min {
        return Err(EngineError::invalid(
            "searchMax",
            "must be greater than searchMin",
        ));
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(EngineError::invalid("tolerance", "must be > 0"));
    }
    if config.max_iterations == 0 {
        return Err(EngineError::invalid("maxIterations", "must be > 0"));
    }
    if config.simulations_per_iteration == 0 || config.final_simulations == 0 {
        return Err(EngineError::InvalidSimulationCount(0));
    }
    if config.horizon_months == Some(0) {
        return Err(EngineError::invalid("horizonMonths", "must be > 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    /// No growth, no volatility: outcomes are pure arithmetic.
    fn deterministic_profile() -> ProfileParameters {
        ProfileParameters {
            desired_monthly_income: 100.0,
            current_net_assets: 0.0,
            monthly_investment: 100.0,
            pre_retirement_return_rate: 0.0,
            post_retirement_return_rate: 0.0,
        }
    }

    fn deterministic_options() -> ProjectionOptions {
        ProjectionOptions {
            decumulation_years: 5,
            pre_retirement_volatility: Some(0.0),
            post_retirement_volatility: Some(0.0),
            parallelism: Some(2),
            ..ProjectionOptions::default()
        }
    }

    fn config(goal_type: GoalType, search_max: f64) -> GoalSolveConfig {
        GoalSolveConfig {
            goal_type,
            target_success_rate: 1.0,
            search_min: 0.0,
            search_max,
            tolerance: 0.5,
            max_iterations: 40,
            simulations_per_iteration: 4,
            final_simulations: 4,
            horizon_months: Some(100),
            seed: 7,
        }
    }

    #[test]
    fn required_investment_solver_finds_deterministic_solution() {
        // Target falls back to 50 years of spending: 100 * 12 * 50 = 60_000.
        let cfg = config(GoalType::RequiredInvestment, 2_000.0);
        let result = solve_goal(
            &deterministic_profile(),
            &deterministic_options(),
            cfg,
            &SimulationControl::new(),
        )
        .expect("must solve");

        assert!(result.feasible);
        assert!(result.converged);
        assert_eq!(result.horizon_months, 100);
        assert_close(result.starting_balance, 60_000.0, 1e-9);
        assert_close(
            result.solved_value.expect("value expected"),
            600.0,
            cfg.tolerance + 0.5,
        );
        assert_close(result.achieved_success_rate.expect("rate expected"), 1.0, 1e-9);
    }

    #[test]
    fn max_spending_solver_finds_deterministic_solution() {
        // 60_000 over 60 months lasts while spending stays below 1_000 a month.
        let cfg = config(GoalType::MaxSpending, 5_000.0);
        let result = solve_goal(
            &deterministic_profile(),
            &deterministic_options(),
            cfg,
            &SimulationControl::new(),
        )
        .expect("must solve");

        assert!(result.feasible);
        let solved = result.solved_value.expect("value expected");
        assert!(solved < 1_000.0);
        assert_close(solved, 1_000.0, cfg.tolerance + 0.5);
        assert!(!result.iterations.is_empty());
    }

    #[test]
    fn required_investment_solver_reports_infeasible_when_bounds_too_low() {
        let cfg = config(GoalType::RequiredInvestment, 50.0);
        let result = solve_goal(
            &deterministic_profile(),
            &deterministic_options(),
            cfg,
            &SimulationControl::new(),
        )
        .expect("must return result");
        assert!(!result.feasible);
        assert!(result.solved_value.is_none());
        assert!(result.achieved_success_rate.is_none());
    }

    #[test]
    fn solver_short_circuits_when_lower_bound_already_succeeds() {
        let cfg = GoalSolveConfig {
            search_min: 1_000.0,
            ..config(GoalType::RequiredInvestment, 2_000.0)
        };
        let result = solve_goal(
            &deterministic_profile(),
            &deterministic_options(),
            cfg,
            &SimulationControl::new(),
        )
        .expect("must solve");
        assert_eq!(result.solved_value, Some(1_000.0));
        assert!(result.iterations.is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad_bounds = GoalSolveConfig {
            search_min: 10.0,
            search_max: 5.0,
            ..config(GoalType::MaxSpending, 5.0)
        };
        assert!(
            solve_goal(
                &deterministic_profile(),
                &deterministic_options(),
                bad_bounds,
                &SimulationControl::new(),
            )
            .is_err()
        );

        let bad_rate = GoalSolveConfig {
            target_success_rate: 1.5,
            ..config(GoalType::MaxSpending, 5_000.0)
        };
        assert!(matches!(
            solve_goal(
                &deterministic_profile(),
                &deterministic_options(),
                bad_rate,
                &SimulationControl::new(),
            ),
            Err(EngineError::InvalidParameter {
                name: "targetSuccessRate",
                ..
            })
        ));
    }

    #[test]
    fn ci_half_width_shrinks_with_more_samples() {
        assert_eq!(binomial_ci_half_width(0.5, 0), 0.0);
        assert_eq!(binomial_ci_half_width(1.0, 100), 0.0);
        assert!(binomial_ci_half_width(0.5, 10_000) < binomial_ci_half_width(0.5, 100));
    }
}
