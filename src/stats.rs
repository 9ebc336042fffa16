use serde::Serialize;

/// Online count/mean/variance/min/max over a stream of observations.
///
/// Uses Welford's update so the mean and the sum of squared deviations stay
/// accurate over long streams; no observation is retained.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

/// Point-in-time view of a [`RunningStat`]. Variance is the population
/// variance (M2 / n).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatSummary {
    pub count: u64,
    pub sum: f64,
    pub mean: Option<f64>,
    pub variance: Option<f64>,
    pub stddev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl StatSummary {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl RunningStat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, x: f64) {
        if self.count == 0 {
            self.min = x;
            self.max = x;
        } else {
            self.min = self.min.min(x);
            self.max = self.max.max(x);
        }
        self.count += 1;
        self.sum += x;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// Combines two accumulators as if every observation of `other` had been
    /// written to `self`.
    pub fn merge(&self, other: &RunningStat) -> RunningStat {
        if self.count == 0 {
            return *other;
        }
        if other.count == 0 {
            return *self;
        }
        let n1 = self.count as f64;
        let n2 = other.count as f64;
        let count = self.count + other.count;
        let n = count as f64;
        let delta = other.mean - self.mean;
        RunningStat {
            count,
            sum: self.sum + other.sum,
            mean: self.mean + delta * n2 / n,
            m2: self.m2 + other.m2 + delta * delta * n1 * n2 / n,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn snapshot(&self) -> StatSummary {
        if self.count == 0 {
            return StatSummary {
                count: 0,
                sum: 0.0,
                mean: None,
                variance: None,
                stddev: None,
                min: None,
                max: None,
            };
        }
        let variance = (self.m2 / self.count as f64).max(0.0);
        StatSummary {
            count: self.count,
            sum: self.sum,
            mean: Some(self.mean),
            variance: Some(variance),
            stddev: Some(variance.sqrt()),
            min: Some(self.min),
            max: Some(self.max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pass(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        (mean, variance)
    }

    fn assert_close(actual: f64, expected: f64) {
        let scale = expected.abs().max(1.0);
        assert!(
            (actual - expected).abs() <= 1e-9 * scale,
            "{actual} != {expected}"
        );
    }

    #[test]
    fn empty_snapshot_has_no_moments() {
        let summary = RunningStat::new().snapshot();
        assert!(summary.is_empty());
        assert_eq!(summary.mean, None);
        assert_eq!(summary.variance, None);
        assert_eq!(summary.min, None);
        assert_eq!(summary.max, None);
    }

    #[test]
    fn single_observation_has_zero_variance() {
        let mut stat = RunningStat::new();
        stat.write(42.0);
        let summary = stat.snapshot();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.mean, Some(42.0));
        assert_eq!(summary.variance, Some(0.0));
        assert_eq!(summary.stddev, Some(0.0));
        assert_eq!(summary.min, Some(42.0));
        assert_eq!(summary.max, Some(42.0));
    }

    #[test]
    fn matches_two_pass_formula() {
        let sequences: Vec<Vec<f64>> = vec![
            vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0],
            vec![1e6 + 4.0, 1e6 + 7.0, 1e6 + 13.0, 1e6 + 16.0],
            vec![-3.5, 0.0, 0.25, 1e-6, 12_345.678],
            (0..1000).map(|i| (i as f64).sin() * 1000.0).collect(),
        ];
        for values in sequences {
            let mut stat = RunningStat::new();
            for v in values.iter() {
                stat.write(*v);
            }
            let (mean, variance) = two_pass(&values);
            let summary = stat.snapshot();
            assert_eq!(summary.count, values.len() as u64);
            assert_close(summary.mean.expect("mean"), mean);
            assert_close(summary.variance.expect("variance"), variance);
        }
    }

    #[test]
    fn tracks_min_and_max() {
        let mut stat = RunningStat::new();
        for v in [3.0, -1.0, 8.0, 2.0] {
            stat.write(v);
        }
        let summary = stat.snapshot();
        assert_eq!(summary.min, Some(-1.0));
        assert_eq!(summary.max, Some(8.0));
        assert_eq!(summary.sum, 12.0);
    }

    #[test]
    fn merge_equals_sequential_writes() {
        let left = [1.0, 2.0, 3.0];
        let right = [10.0, 20.0];
        let mut a = RunningStat::new();
        let mut b = RunningStat::new();
        let mut all = RunningStat::new();
        for v in left {
            a.write(v);
            all.write(v);
        }
        for v in right {
            b.write(v);
            all.write(v);
        }
        let merged = a.merge(&b).snapshot();
        let expected = all.snapshot();
        assert_eq!(merged.count, expected.count);
        assert_close(merged.mean.expect("mean"), expected.mean.expect("mean"));
        assert_close(
            merged.variance.expect("variance"),
            expected.variance.expect("variance"),
        );
        assert_eq!(merged.min, expected.min);
        assert_eq!(merged.max, expected.max);
        assert_eq!(RunningStat::new().merge(&b), b);
    }
}
