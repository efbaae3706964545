use std::cmp::Ordering;

use super::types::SimulationPath;

/// Nearest rank on the floor, `floor(len * p / 100)` clamped to the last index.
pub fn percentile_index(len: usize, percent: u32) -> usize {
    if len == 0 {
        return 0;
    }
    (len * percent as usize / 100).min(len - 1)
}

pub fn percentile_value(sorted: &[u32], percent: u32) -> u32 {
    if sorted.is_empty() {
        return 0;
    }
    sorted[percentile_index(sorted.len(), percent)]
}

pub fn average_of(values: &[u32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64
}

/// Picks the sampled path shown for the `percent` rank of `sorted_months`.
///
/// `pool` must be sorted ascending by months-to-target, like `sorted_months`.
/// Order of preference:
/// 1. a pooled path whose months-to-target equals the percentile value,
/// 2. the pooled path at the same percentile index,
/// 3. the first pooled path.
///
/// With a sparse pool (1% sampling) steps 2 and 3 can show a scenario that does not
/// sit at the requested rank.
pub fn select_representative<'a>(
    sorted_months: &[u32],
    pool: &'a [SimulationPath],
    percent: u32,
) -> Option<&'a SimulationPath> {
    if sorted_months.is_empty() {
        return None;
    }
    let wanted = percentile_value(sorted_months, percent);

    pool.iter()
        .find(|path| path.months_to_target() == Some(wanted))
        .or_else(|| pool.get(percentile_index(pool.len(), percent)))
        .or_else(|| pool.first())
}

/// Trajectory indices ranked by their balance at `period`, highest first.
///
/// Equal balances are ordered by ascending depletion year, with trajectories that
/// never depleted last.
pub fn rank_by_balance(paths: &[SimulationPath], period: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..paths.len()).collect();
    order.sort_by(|&a, &b| compare_for_rank(&paths[a], &paths[b], period));
    order
}

fn compare_for_rank(a: &SimulationPath, b: &SimulationPath, period: usize) -> Ordering {
    b.value_at(period)
        .total_cmp(&a.value_at(period))
        .then_with(|| depletion_key(a).cmp(&depletion_key(b)))
}

fn depletion_key(path: &SimulationPath) -> u32 {
    path.depletion_year().unwrap_or(u32::MAX)
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
    fn percentile_index_floors_and_clamps() {
        assert_eq!(percentile_index(10, 10), 1);
        assert_eq!(percentile_index(10, 50), 5);
        assert_eq!(percentile_index(10, 90), 9);
        assert_eq!(percentile_index(10, 100), 9);
        assert_eq!(percentile_index(3, 50), 1);
        assert_eq!(percentile_index(1, 90), 0);
        assert_eq!(percentile_index(0, 50), 0);
    }

    #[test]
    fn percentile_value_of_empty_slice_is_zero() {
        assert_eq!(percentile_value(&[], 50), 0);
        assert_eq!(average_of(&[]), 0.0);
        assert_eq!(average_of(&[10, 20]), 15.0);
    }

    #[test]
    fn representative_prefers_exact_month_match() {
        let sorted = [10, 20, 30, 40, 50, 60, 70, 80, 90, 100];
        let pool = vec![
            path(&[0.0], Some(100)),
            path(&[1.0], Some(60)),
            path(&[2.0], Some(20)),
        ];
        let chosen = select_representative(&sorted, &pool, 50).expect("path");
        assert_eq!(chosen.months_to_target(), Some(60));
        let chosen = select_representative(&sorted, &pool, 10).expect("path");
        assert_eq!(chosen.months_to_target(), Some(20));
    }

    #[test]
    fn representative_falls_back_to_pool_index() {
        let sorted = [10, 20, 30, 40, 50, 60, 70, 80, 90, 100];
        let pool = vec![
            path(&[0.0], Some(11)),
            path(&[1.0], Some(12)),
            path(&[2.0], Some(13)),
        ];
        let chosen = select_representative(&sorted, &pool, 50).expect("path");
        assert_eq!(chosen.months_to_target(), Some(12));
        let chosen = select_representative(&sorted, &pool, 90).expect("path");
        assert_eq!(chosen.months_to_target(), Some(13));
    }

    #[test]
    fn representative_is_none_without_successes_or_pool() {
        let pool = vec![path(&[0.0], Some(5))];
        assert!(select_representative(&[], &pool, 50).is_none());
        assert!(select_representative(&[5, 6], &[], 50).is_none());
    }

    #[test]
    fn rank_orders_by_balance_then_depletion_year() {
        let paths = vec![
            path(&[100.0, 0.0], Some(1)),
            path(&[100.0, 50.0], None),
            path(&[100.0, 0.0], Some(3)),
            path(&[100.0, 80.0], None),
            path(&[100.0, 0.0], None),
        ];
        assert_eq!(rank_by_balance(&paths, 1), vec![3, 1, 0, 2, 4]);
    }
}
