use serde::{Deserialize, Serialize};

/// Hard cap on any horizon measured in months (100 years).
pub const MAX_HORIZON_MONTHS: u32 = 1200;

/// Years of spending used as the target when the post-retirement return is not positive.
const FALLBACK_EXPENDITURE_YEARS: f64 = 50.0;

/// Annual-return thresholds (exclusive upper bound, %) and their volatility (%).
const VOLATILITY_TABLE: [(f64, f64); 10] = [
    (2.5, 1.0),
    (4.0, 4.5),
    (6.0, 7.0),
    (7.0, 11.0),
    (8.0, 13.0),
    (9.0, 15.0),
    (10.0, 17.0),
    (12.0, 21.0),
    (15.0, 27.0),
    (20.0, 30.0),
];
const VOLATILITY_CEILING: f64 = 35.0;

/// Assets needed so that `post_retirement_rate` alone pays `desired_monthly_income`.
///
/// Falls back to fifty years of spending when the rate is zero or negative.
pub fn target_assets(desired_monthly_income: f64, post_retirement_rate: f64) -> f64 {
    let annual_income = desired_monthly_income * 12.0;
    if post_retirement_rate <= 0.0 {
        return annual_income * FALLBACK_EXPENDITURE_YEARS;
    }
    annual_income / (post_retirement_rate / 100.0)
}

/// Months of steady contributions and compounding needed to reach `target_assets`.
///
/// Returns [`MAX_HORIZON_MONTHS`] if the target is never reached.
pub fn months_to_target(
    current_assets: f64,
    target_assets: f64,
    monthly_investment: f64,
    annual_return_rate: f64,
) -> u32 {
    if current_assets >= target_assets {
        return 0;
    }

    let monthly_rate = monthly_rate_from_annual(annual_return_rate);
    let mut asset = current_assets;
    for month in 1..=MAX_HORIZON_MONTHS {
        asset += monthly_investment;
        asset *= 1.0 + monthly_rate;
        if asset >= target_assets {
            return month;
        }
    }
    MAX_HORIZON_MONTHS
}

/// Annual return (%) that would sustain the desired income from `current_assets`.
pub fn required_return_rate(current_assets: f64, desired_monthly_income: f64) -> f64 {
    if current_assets <= 0.0 {
        return 0.0;
    }
    desired_monthly_income * 12.0 / current_assets * 100.0
}

/// Volatility (%) implied by an expected annual return (%).
pub fn volatility_for_return(annual_return_rate: f64) -> f64 {
    VOLATILITY_TABLE
        .iter()
        .find(|(upper, _)| annual_return_rate < *upper)
        .map(|(_, vol)| *vol)
        .unwrap_or(VOLATILITY_CEILING)
}

/// Geometric monthly equivalent of an annual percentage rate.
pub fn monthly_rate_from_annual(annual_return_rate: f64) -> f64 {
    (1.0 + annual_return_rate / 100.0).powf(1.0 / 12.0) - 1.0
}

/// How much slower than the deterministic baseline a trajectory may be before it
/// counts as a failure.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureThreshold {
    Strict,
    #[default]
    Standard,
    Relaxed,
    Lenient,
    #[serde(untagged)]
    Custom(f64),
}

impl FailureThreshold {
    pub fn multiplier(self) -> f64 {
        match self {
            FailureThreshold::Strict => 1.0,
            FailureThreshold::Standard => 1.1,
            FailureThreshold::Relaxed => 1.3,
            FailureThreshold::Lenient => 1.5,
            FailureThreshold::Custom(m) => m,
        }
    }
}

/// Accumulation horizon cap derived from the deterministic baseline.
pub fn max_months_for_threshold(baseline_months: u32, multiplier: f64) -> u32 {
    // Absorb representation error so 100 * 1.1 stays 110.
    let scaled = (baseline_months as f64 * multiplier.max(0.0) - 1e-9).ceil();
    if !scaled.is_finite() {
        return MAX_HORIZON_MONTHS;
    }
    (scaled as u32).clamp(1, MAX_HORIZON_MONTHS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn target_assets_divides_annual_income_by_rate() {
        assert_approx(target_assets(3_000_000.0, 4.0), 900_000_000.0);
    }

    #[test]
    fn target_assets_uses_fifty_year_fallback_for_non_positive_rates() {
        assert_approx(target_assets(1_000.0, 0.0), 600_000.0);
        assert_approx(target_assets(1_000.0, -2.0), 600_000.0);
    }

    #[test]
    fn months_to_target_counts_contributions_without_growth() {
        assert_eq!(months_to_target(0.0, 1_000.0, 100.0, 0.0), 10);
    }

    #[test]
    fn months_to_target_caps_at_hundred_years() {
        assert_eq!(months_to_target(0.0, 1.0e12, 1.0, 0.0), MAX_HORIZON_MONTHS);
        assert_eq!(months_to_target(0.0, 1.0, 0.0, 0.0), MAX_HORIZON_MONTHS);
    }

    #[test]
    fn monthly_rate_compounds_back_to_annual() {
        let monthly = monthly_rate_from_annual(6.0);
        assert_approx((1.0 + monthly).powi(12), 1.06);
    }

    #[test]
    fn required_return_rate_is_zero_without_assets() {
        assert_approx(required_return_rate(0.0, 1_000.0), 0.0);
        assert_approx(required_return_rate(-5.0, 1_000.0), 0.0);
        assert_approx(required_return_rate(1_200_000.0, 1_000.0), 1.0);
    }

    #[test]
    fn volatility_table_boundaries_are_exclusive() {
        let cases = [
            (0.0, 1.0),
            (2.49, 1.0),
            (2.5, 4.5),
            (3.99, 4.5),
            (4.0, 7.0),
            (6.0, 11.0),
            (6.5, 11.0),
            (7.0, 13.0),
            (8.0, 15.0),
            (9.0, 17.0),
            (10.0, 21.0),
            (12.0, 27.0),
            (15.0, 30.0),
            (19.99, 30.0),
            (20.0, 35.0),
            (80.0, 35.0),
            (-3.0, 1.0),
        ];
        for (rate, expected) in cases {
            assert_approx(volatility_for_return(rate), expected);
        }
    }

    #[test]
    fn failure_threshold_scales_baseline() {
        assert_eq!(max_months_for_threshold(100, 1.0), 100);
        assert_eq!(
            max_months_for_threshold(100, FailureThreshold::Standard.multiplier()),
            110
        );
        assert_eq!(max_months_for_threshold(1000, 1.5), MAX_HORIZON_MONTHS);
        assert_eq!(max_months_for_threshold(0, 1.3), 1);
    }

    #[test]
    fn failure_threshold_deserializes_presets_and_custom_values() {
        let preset: FailureThreshold = serde_json::from_str("\"relaxed\"").expect("preset");
        assert_eq!(preset, FailureThreshold::Relaxed);
        let custom: FailureThreshold = serde_json::from_str("1.25").expect("custom");
        assert_eq!(custom, FailureThreshold::Custom(1.25));
    }

    proptest! {
        #[test]
        fn months_to_target_is_zero_once_target_is_reached(
            target in 0.0f64..1.0e9,
            surplus in 0.0f64..1.0e9,
            investment in 0.0f64..1.0e6,
            rate in -10.0f64..20.0,
        ) {
            prop_assert_eq!(months_to_target(target + surplus, target, investment, rate), 0);
        }

        #[test]
        fn months_to_target_non_increasing_in_investment(
            current in 0.0f64..1.0e6,
            target in 1.0e6f64..1.0e8,
            investment in 0.0f64..1.0e5,
            extra in 0.0f64..1.0e5,
            rate in 0.0f64..15.0,
        ) {
            let slower = months_to_target(current, target, investment, rate);
            let faster = months_to_target(current, target, investment + extra, rate);
            prop_assert!(faster <= slower);
        }

        #[test]
        fn months_to_target_non_increasing_in_return_rate(
            current in 0.0f64..1.0e6,
            target in 1.0e6f64..1.0e8,
            investment in 0.0f64..1.0e5,
            rate in 0.0f64..15.0,
            extra in 0.0f64..10.0,
        ) {
            let slower = months_to_target(current, target, investment, rate);
            let faster = months_to_target(current, target, investment, rate + extra);
            prop_assert!(faster <= slower);
        }
    }
}
