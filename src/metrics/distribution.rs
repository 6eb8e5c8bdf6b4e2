use serde::Serialize;

/// Bucket boundaries (ms) for the response-time view. A bucket holds the
/// values above the previous boundary up to and including its own. Values
/// above the last boundary land in an overflow bucket ending at the
/// observed max.
const DIST_BOUNDARIES: &[u64] = &[
    10, 25, 50, 100, 200, 300, 500, 750, 1_000, 1_500, 2_000, 3_000, 5_000, 10_000, 30_000,
];

/// A bucket in the response-time distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistBucket {
    pub range_start_ms: u64,
    pub range_end_ms: u64,
    pub count: u64,
}

/// Buckets one group's response times, skipping empty buckets.
pub fn compute_distribution(times: &[u64]) -> Vec<DistBucket> {
    let bounds = DIST_BOUNDARIES;
    let num_buckets = bounds.len() + 1; // +1 for overflow
    let mut counts = vec![0u64; num_buckets];
    let mut max = 0u64;

    for &t in times {
        // first boundary >= t
        let idx = match bounds.binary_search(&t) {
            Ok(i) | Err(i) => i,
        };
        counts[idx] += 1;
        max = max.max(t);
    }

    let mut result = Vec::with_capacity(num_buckets);
    let mut prev = 0u64;
    for (i, &boundary) in bounds.iter().enumerate() {
        if counts[i] > 0 {
            result.push(DistBucket {
                range_start_ms: prev,
                range_end_ms: boundary,
                count: counts[i],
            });
        }
        prev = boundary;
    }
    if counts[bounds.len()] > 0 {
        result.push(DistBucket {
            range_start_ms: prev,
            range_end_ms: max,
            count: counts[bounds.len()],
        });
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_buckets() {
        assert!(compute_distribution(&[]).is_empty());
    }

    #[test]
    fn counts_land_in_first_boundary_at_or_above_value() {
        let buckets = compute_distribution(&[0, 5, 10, 120, 180, 250]);
        assert_eq!(
            buckets,
            vec![
                DistBucket { range_start_ms: 0, range_end_ms: 10, count: 3 },
                DistBucket { range_start_ms: 100, range_end_ms: 200, count: 2 },
                DistBucket { range_start_ms: 200, range_end_ms: 300, count: 1 },
            ]
        );
    }

    #[test]
    fn slow_samples_go_to_overflow() {
        let buckets = compute_distribution(&[45_000]);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].range_start_ms, 30_000);
        assert_eq!(buckets[0].count, 1);
        assert_eq!(buckets[0].range_end_ms, 45_000);
    }

    #[test]
    fn boundary_values_stay_in_their_own_bucket() {
        for &boundary in DIST_BOUNDARIES {
            let buckets = compute_distribution(&[boundary]);
            assert_eq!(buckets.len(), 1);
            assert_eq!(buckets[0].range_end_ms, boundary, "value {boundary}");
        }
        assert_eq!(
            compute_distribution(&[10_000, 10_001]),
            vec![
                DistBucket { range_start_ms: 5_000, range_end_ms: 10_000, count: 1 },
                DistBucket { range_start_ms: 10_000, range_end_ms: 30_000, count: 1 },
            ]
        );
    }

    #[test]
    fn total_count_is_preserved() {
        let times: Vec<u64> = (0..500).map(|i| i * 37).collect();
        let total: u64 = compute_distribution(&times).iter().map(|b| b.count).sum();
        assert_eq!(total, 500);
    }
}
