//! Descriptive statistics over raw latency samples (milliseconds).

use serde::{Deserialize, Serialize};

/// Summary of one (backend, operation) sample set. All-zero when empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Metrics shown in the per-operation comparison tables, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Mean,
    Median,
    Min,
    Max,
    P95,
    P99,
}

impl Metric {
    pub const TABLE: [Metric; 6] = [
        Metric::Mean,
        Metric::Median,
        Metric::Min,
        Metric::Max,
        Metric::P95,
        Metric::P99,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Metric::Mean => "MEAN",
            Metric::Median => "MEDIAN",
            Metric::Min => "MIN",
            Metric::Max => "MAX",
            Metric::P95 => "P95",
            Metric::P99 => "P99",
        }
    }
}

impl LatencyStats {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let n = samples.len();
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = sorted.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };
        let std_dev = if n > 1 {
            let ss: f64 = sorted.iter().map(|x| (x - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        } else {
            0.0
        };

        Self {
            count: n,
            mean,
            median,
            min: sorted[0],
            max: sorted[n - 1],
            std_dev,
            p95: percentile(&sorted, 0.95),
            p99: percentile(&sorted, 0.99),
        }
    }

    pub fn metric(&self, m: Metric) -> f64 {
        match m {
            Metric::Mean => self.mean,
            Metric::Median => self.median,
            Metric::Min => self.min,
            Metric::Max => self.max,
            Metric::P95 => self.p95,
            Metric::P99 => self.p99,
        }
    }
}

/// Nearest-rank percentile over ascending `sorted` data: the element at
/// `floor(n * p)`, clamped to the last index. No interpolation.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (sorted.len() as f64 * p).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
