//! Percentile and throughput aggregation over the ok-record sample series.

use std::time::Duration;

use qlat_schemas::{PercentileStats, StatsFile};

/// Floor for elapsed time so sub-millisecond runs do not divide by zero.
pub const MIN_ELAPSED_SECS: f64 = 1e-9;

/// Nearest-rank percentile of an ascending slice: index `ceil(q*n) - 1`,
/// clamped to `[0, n-1]`. Returns 0 for an empty slice.
pub fn percentile(sorted: &[i64], q: f64) -> i64 {
    let n = sorted.len();
    if n == 0 {
        return 0;
    }
    let rank = (q * n as f64).ceil() as i64 - 1;
    let idx = rank.clamp(0, n as i64 - 1) as usize;
    sorted[idx]
}

/// p50/p90/p95/p99/max of a series. Sorts `samples` in place.
/// `None` for an empty series.
pub fn series_stats(samples: &mut [i64]) -> Option<PercentileStats> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_unstable();
    Some(PercentileStats {
        p50_us: percentile(samples, 0.50),
        p90_us: percentile(samples, 0.90),
        p95_us: percentile(samples, 0.95),
        p99_us: percentile(samples, 0.99),
        max_us: samples[samples.len() - 1],
    })
}

pub fn elapsed_secs(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64().max(MIN_ELAPSED_SECS)
}

pub fn throughput(ok: u64, elapsed: Duration) -> f64 {
    ok as f64 / elapsed_secs(elapsed)
}

/// Counters and samples collected by one loop run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSeries {
    pub serve_us: Vec<i64>,
    pub latency_us: Vec<i64>,
}

impl SampleSeries {
    pub fn push(&mut self, serve_us: i64, latency_us: i64) {
        self.serve_us.push(serve_us);
        self.latency_us.push(latency_us);
    }

    pub fn len(&self) -> usize {
        self.serve_us.len()
    }

    pub fn is_empty(&self) -> bool {
        self.serve_us.is_empty()
    }
}

/// Build the stats file body. Percentile blocks are omitted when `ok == 0`.
pub fn build_stats_file(
    total_read: u64,
    ok: u64,
    bad: u64,
    elapsed: Duration,
    mut samples: SampleSeries,
) -> StatsFile {
    let (serve_us, latency_us) = if ok > 0 {
        (
            series_stats(&mut samples.serve_us),
            series_stats(&mut samples.latency_us),
        )
    } else {
        (None, None)
    };
    StatsFile {
        total_read,
        ok,
        bad,
        duration_sec: elapsed_secs(elapsed),
        ok_throughput_msg_s: throughput(ok, elapsed),
        serve_us,
        latency_us,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_rank_indices() {
        let v: Vec<i64> = (1..=100).collect();
        assert_eq!(percentile(&v, 0.50), 50);
        assert_eq!(percentile(&v, 0.90), 90);
        assert_eq!(percentile(&v, 0.99), 99);
        assert_eq!(percentile(&v, 1.0), 100);
    }

    #[test]
    fn single_sample_is_every_percentile() {
        let mut v = vec![5000];
        let s = series_stats(&mut v).unwrap();
        assert_eq!((s.p50_us, s.p90_us, s.p95_us, s.p99_us, s.max_us), (5000, 5000, 5000, 5000, 5000));
    }

    #[test]
    fn tiny_quantile_clamps_to_first() {
        assert_eq!(percentile(&[3, 4, 5], 0.0001), 3);
        assert_eq!(percentile(&[], 0.5), 0);
    }

    #[test]
    fn percentiles_are_monotone() {
        let mut v = vec![9, 1, 7, 3, 3, 100, 42, 0, 18, 5, 5, 77];
        let s = series_stats(&mut v).unwrap();
        assert!(s.p50_us <= s.p90_us);
        assert!(s.p90_us <= s.p95_us);
        assert!(s.p95_us <= s.p99_us);
        assert!(s.p99_us <= s.max_us);
        assert_eq!(s.max_us, 100);
    }

    #[test]
    fn zero_elapsed_does_not_divide_by_zero() {
        let t = throughput(3, Duration::ZERO);
        assert!(t.is_finite());
        assert!(t > 0.0);
    }

    #[test]
    fn stats_file_omits_blocks_without_ok_records() {
        let f = build_stats_file(4, 0, 4, Duration::from_secs(2), SampleSeries::default());
        assert!(f.serve_us.is_none());
        assert!(f.latency_us.is_none());
        assert_eq!(f.ok_throughput_msg_s, 0.0);
        assert_eq!(f.duration_sec, 2.0);
    }
}
