use serde::Serialize;

/// Order statistics and spread for one group's response times.
/// Serialized straight into the report next to the group's counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileSet {
    pub median: u64,
    #[serde(rename = "percentil90")]
    pub p90: u64,
    /// Population standard deviation, one decimal.
    #[serde(rename = "stddev")]
    pub std_dev: f64,
}

impl PercentileSet {
    /// Sorts a copy of `times` and derives all three statistics.
    /// `mean` must be the already rounded mean response time.
    pub fn from_times(times: &[u64], mean: f64) -> Self {
        let mut sorted = times.to_vec();
        sorted.sort_unstable();

        Self {
            median: median(&sorted),
            p90: percentile_90(&sorted),
            std_dev: round_to(std_dev(&sorted, mean), 1),
        }
    }

    /// All-zero placeholder for a group without observations.
    pub fn empty() -> Self {
        Self {
            median: 0,
            p90: 0,
            std_dev: 0.0,
        }
    }
}

/// Median of an ascending list; even lengths average the two middle
/// values and truncate. Empty input yields 0.
pub fn median(sorted: &[u64]) -> u64 {
    let n = sorted.len();
    if n == 0 {
        return 0;
    }
    let mid = n / 2;
    if n % 2 == 0 {
        ((u128::from(sorted[mid]) + u128::from(sorted[mid - 1])) / 2) as u64
    } else {
        sorted[mid]
    }
}

/// 90th percentile of an ascending list.
///
/// Index is `0.9 * n + 0.5` rounded half-to-even, pulled back by one when
/// it lands exactly on the length. Anything still out of range gives 0.
pub fn percentile_90(sorted: &[u64]) -> u64 {
    let n = sorted.len();
    let mut index = (0.9 * n as f64 + 0.5).round_ties_even() as usize;
    if index == n && index > 0 {
        index -= 1;
    }
    sorted.get(index).copied().unwrap_or(0)
}

/// Population standard deviation around `mean`. Empty input yields 0.
pub fn std_dev(times: &[u64], mean: f64) -> f64 {
    if times.is_empty() {
        return 0.0;
    }
    let squares: f64 = times.iter().map(|&t| (t as f64 - mean).powi(2)).sum();
    (squares / times.len() as f64).sqrt()
}

/// Rounds to a fixed number of decimal places the way `%.Nf` does: the
/// exact binary value is rounded, not a rescaled approximation of it.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{value:.decimals$}").parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn median_odd_even_and_single() {
        assert_eq!(median(&[100, 200, 300]), 200);
        assert_eq!(median(&[100, 200, 301, 400]), 250);
        assert_eq!(median(&[1, 2]), 1);
        assert_eq!(median(&[42]), 42);
        assert_eq!(median(&[]), 0);
    }

    #[test]
    fn percentile_90_index_rule() {
        // n=1: round(1.4)=1 == len -> 0
        assert_eq!(percentile_90(&[7]), 7);
        // n=3: round(3.2)=3 == len -> 2
        assert_eq!(percentile_90(&[1, 2, 3]), 3);
        // n=10: round(9.5)=10 (ties to even) == len -> 9
        let ten: Vec<u64> = (1..=10).collect();
        assert_eq!(percentile_90(&ten), 10);
        // n=20: round(18.5)=18 -> element 18
        let twenty: Vec<u64> = (1..=20).collect();
        assert_eq!(percentile_90(&twenty), 19);
        // n=30: round(27.5)=28 -> element 28
        let thirty: Vec<u64> = (1..=30).collect();
        assert_eq!(percentile_90(&thirty), 29);
        assert_eq!(percentile_90(&[]), 0);
    }

    #[test]
    fn std_dev_uses_population_formula() {
        let sd = std_dev(&[100, 200, 300], 200.0);
        assert!((sd - 81.649_658).abs() < 1e-5);
        assert_eq!(round_to(sd, 1), 81.6);
    }

    #[test]
    fn from_times_sorts_its_own_copy() {
        let set = PercentileSet::from_times(&[300, 100, 200], 200.0);
        assert_eq!(set.median, 200);
        assert_eq!(set.p90, 300);
        assert_eq!(set.std_dev, 81.6);
    }

    #[test]
    fn rounding_follows_the_stored_binary_value() {
        assert_eq!(round_to(66.666_666, 2), 66.67);
        assert_eq!(round_to(12.0, 2), 12.0);
        // 8001/40 is stored slightly above 200.025
        assert_eq!(round_to(8001.0 / 40.0, 2), 200.03);
        assert_eq!(round_to(1.0 / 40.0, 2), 0.03);
        // 0.15 is stored slightly below 0.15
        assert_eq!(round_to(0.15, 1), 0.1);
        assert_eq!(round_to(f64::INFINITY, 2), f64::INFINITY);
    }

    #[test]
    fn median_of_huge_values_does_not_overflow() {
        assert_eq!(median(&[u64::MAX - 1, u64::MAX]), u64::MAX - 1);
    }

    proptest! {
        #[test]
        fn statistics_ignore_input_order(mut times in proptest::collection::vec(0u64..10_000, 1..200)) {
            let before = PercentileSet::from_times(&times, 50.0);
            times.reverse();
            let after = PercentileSet::from_times(&times, 50.0);
            prop_assert_eq!(before, after);
        }

        #[test]
        fn constant_times_have_zero_spread(value in 0u64..100_000, n in 1usize..100) {
            let times = vec![value; n];
            let set = PercentileSet::from_times(&times, value as f64);
            prop_assert_eq!(set.std_dev, 0.0);
            prop_assert_eq!(set.median, value);
            prop_assert_eq!(set.p90, value);
        }

        #[test]
        fn odd_length_median_is_middle_element(mut times in proptest::collection::vec(0u64..10_000, 1..100)) {
            if times.len() % 2 == 0 {
                times.pop();
            }
            times.sort_unstable();
            prop_assert_eq!(median(&times), times[times.len() / 2]);
        }
    }
}
