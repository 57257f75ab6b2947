//! Per-writer latency histogram: min/avg/p90/p95/p99/max over write-call
//! durations, sampled in microseconds (`spec.md` §4.9).

use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencySummary {
    pub count: usize,
    pub min_us: u64,
    pub avg_us: u64,
    pub p90_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

#[derive(Default)]
pub struct LatencyHistogram {
    samples: Mutex<Vec<u64>>,
}

impl LatencyHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, elapsed: Duration) {
        self.samples.lock().unwrap().push(elapsed.as_micros() as u64);
    }

    pub fn summary(&self) -> LatencySummary {
        let mut samples = self.samples.lock().unwrap().clone();
        if samples.is_empty() {
            return LatencySummary::default();
        }
        samples.sort_unstable();
        let percentile = |p: f64| -> u64 {
            let idx = ((samples.len() as f64 - 1.0) * p).round() as usize;
            samples[idx.min(samples.len() - 1)]
        };
        let sum: u64 = samples.iter().sum();
        LatencySummary {
            count: samples.len(),
            min_us: samples[0],
            avg_us: sum / samples.len() as u64,
            p90_us: percentile(0.90),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: *samples.last().unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_summarizes_to_zero() {
        let hist = LatencyHistogram::new();
        assert_eq!(hist.summary(), LatencySummary::default());
    }

    #[test]
    fn percentiles_are_monotonic() {
        let hist = LatencyHistogram::new();
        for us in [10, 20, 30, 40, 50, 100, 200, 300, 400, 1000] {
            hist.record(Duration::from_micros(us));
        }
        let summary = hist.summary();
        assert_eq!(summary.count, 10);
        assert_eq!(summary.min_us, 10);
        assert_eq!(summary.max_us, 1000);
        assert!(summary.p90_us <= summary.p95_us);
        assert!(summary.p95_us <= summary.p99_us);
    }
}
