use serde::{Deserialize, Serialize};

use super::percentile::{average_of, percentile_value};

/// Caller-owned snapshot of a saver's plan. Rates are annual percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileParameters {
    pub desired_monthly_income: f64,
    pub current_net_assets: f64,
    pub monthly_investment: f64,
    pub pre_retirement_return_rate: f64,
    pub post_retirement_return_rate: f64,
}

/// Asset values sampled once per period, plus the period at which the run ended.
///
/// For accumulation the marker is the month the target was reached; for
/// decumulation it is the first year the balance hit zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationPath {
    pub assets: Vec<f64>,
    pub terminal_period: Option<u32>,
}

impl SimulationPath {
    pub fn months_to_target(&self) -> Option<u32> {
        self.terminal_period
    }

    pub fn depletion_year(&self) -> Option<u32> {
        self.terminal_period
    }

    /// Value at `period`, or the last value when the path is shorter.
    pub fn value_at(&self, period: usize) -> f64 {
        self.assets
            .get(period)
            .or_else(|| self.assets.last())
            .copied()
            .unwrap_or(0.0)
    }

    pub fn final_value(&self) -> f64 {
        self.assets.last().copied().unwrap_or(0.0)
    }

    pub(crate) fn truncated(&self, periods: usize) -> SimulationPath {
        let end = (periods + 1).min(self.assets.len());
        SimulationPath {
            assets: self.assets[..end].to_vec(),
            terminal_period: self
                .terminal_period
                .filter(|p| (*p as usize) <= periods),
        }
    }
}

/// Best (10th), median (50th) and worst (90th percentile) months-to-target paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentativePaths {
    pub best: Option<SimulationPath>,
    pub median: Option<SimulationPath>,
    pub worst: Option<SimulationPath>,
}

impl RepresentativePaths {
    pub fn is_complete(&self) -> bool {
        self.best.is_some() && self.median.is_some() && self.worst.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulationResult {
    pub success_rate: f64,
    /// Months-to-target of every successful trajectory, ascending.
    pub success_months: Vec<u32>,
    pub success_count: usize,
    pub failure_count: usize,
    pub total_simulations: usize,
    pub max_months: u32,
    pub sampled_path_count: usize,
    pub representative_paths: RepresentativePaths,
}

impl AccumulationResult {
    /// Months-to-target at `percent` (0..=100); 0 without successes.
    pub fn percentile_months(&self, percent: u32) -> u32 {
        percentile_value(&self.success_months, percent)
    }

    pub fn average_months_to_success(&self) -> f64 {
        average_of(&self.success_months)
    }

    pub fn median_months_to_success(&self) -> u32 {
        self.percentile_months(50)
    }

    pub fn best_case_months(&self) -> u32 {
        self.percentile_months(10)
    }

    pub fn worst_case_months(&self) -> u32 {
        self.percentile_months(90)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioLabel {
    VeryBest,
    Best,
    Median,
    Worst,
    VeryWorst,
}

impl ScenarioLabel {
    pub fn for_percentile(percent: u32) -> Self {
        match percent {
            0..=19 => ScenarioLabel::VeryBest,
            20..=39 => ScenarioLabel::Best,
            40..=59 => ScenarioLabel::Median,
            60..=79 => ScenarioLabel::Worst,
            _ => ScenarioLabel::VeryWorst,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentilePath {
    pub percentile: u32,
    pub label: ScenarioLabel,
    pub path: SimulationPath,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecumulationResult {
    pub years: u32,
    pub total_simulations: usize,
    pub depletion_count: usize,
    pub depletion_probability: f64,
    /// Ranked by final-year balance.
    pub long_horizon: Vec<PercentilePath>,
    /// Ranked by year-10 balance, truncated to the short horizon.
    pub short_horizon: Vec<PercentilePath>,
    /// No-volatility baseline.
    pub reference: SimulationPath,
}

impl DecumulationResult {
    pub fn survival_rate(&self) -> f64 {
        1.0 - self.depletion_probability
    }

    pub fn long_horizon_path(&self, label: ScenarioLabel) -> Option<&SimulationPath> {
        self.long_horizon
            .iter()
            .find(|p| p.label == label)
            .map(|p| &p.path)
    }

    pub fn short_horizon_path(&self, label: ScenarioLabel) -> Option<&SimulationPath> {
        self.short_horizon
            .iter()
            .find(|p| p.label == label)
            .map(|p| &p.path)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionReport {
    pub profile: ProfileParameters,
    pub target_assets: f64,
    pub baseline_months: u32,
    pub already_at_target: bool,
    /// Set only when current assets already meet the target.
    pub required_return_rate: Option<f64>,
    pub pre_retirement_volatility: f64,
    pub post_retirement_volatility: f64,
    pub max_months: u32,
    pub accumulation: AccumulationResult,
    pub decumulation: DecumulationResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(assets: &[f64], terminal: Option<u32>) -> SimulationPath {
        SimulationPath {
            assets: assets.to_vec(),
            terminal_period: terminal,
        }
    }

    #[test]
    fn value_at_clamps_to_last_sample() {
        let p = path(&[10.0, 20.0, 30.0], None);
        assert_eq!(p.value_at(1), 20.0);
        assert_eq!(p.value_at(99), 30.0);
        assert_eq!(path(&[], None).value_at(0), 0.0);
    }

    #[test]
    fn truncated_drops_markers_beyond_the_window() {
        let p = path(&[5.0, 4.0, 3.0, 0.0, 0.0], Some(3));
        let short = p.truncated(2);
        assert_eq!(short.assets, vec![5.0, 4.0, 3.0]);
        assert_eq!(short.terminal_period, None);
        assert_eq!(p.truncated(3).terminal_period, Some(3));
    }

    #[test]
    fn empty_accumulation_accessors_are_zero() {
        let result = AccumulationResult {
            success_rate: 0.0,
            success_months: Vec::new(),
            success_count: 0,
            failure_count: 10,
            total_simulations: 10,
            max_months: 12,
            sampled_path_count: 0,
            representative_paths: RepresentativePaths::default(),
        };
        assert_eq!(result.median_months_to_success(), 0);
        assert_eq!(result.best_case_months(), 0);
        assert_eq!(result.worst_case_months(), 0);
        assert_eq!(result.average_months_to_success(), 0.0);
        assert!(!result.representative_paths.is_complete());
    }

    #[test]
    fn labels_follow_percentile_bands() {
        assert_eq!(ScenarioLabel::for_percentile(10), ScenarioLabel::VeryBest);
        assert_eq!(ScenarioLabel::for_percentile(30), ScenarioLabel::Best);
        assert_eq!(ScenarioLabel::for_percentile(50), ScenarioLabel::Median);
        assert_eq!(ScenarioLabel::for_percentile(70), ScenarioLabel::Worst);
        assert_eq!(ScenarioLabel::for_percentile(90), ScenarioLabel::VeryWorst);
    }

    #[test]
    fn profile_round_trips_camel_case_keys() {
        let json = r#"{
          "desiredMonthlyIncome": 3000000,
          "currentNetAssets": 0,
          "monthlyInvestment": 500000,
          "preRetirementReturnRate": 6.5,
          "postRetirementReturnRate": 4
        }"#;
        let profile: ProfileParameters = serde_json::from_str(json).expect("profile json");
        assert_eq!(profile.monthly_investment, 500_000.0);
        assert_eq!(profile.post_retirement_return_rate, 4.0);
    }
}
