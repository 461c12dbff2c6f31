// SUE-Perf: Offline Analysis of SUE-Sim Network Simulator Performance Logs
// Copyright (C) 2025 SUE-Sim Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//! Descriptive statistics shared by all analyses.
use std::collections::BTreeMap;

use serde::Serialize;
use statrs::statistics::Statistics;

/// Collect values grouped by key, keys in ascending order and values in input order.
pub fn group_values<K: Ord>(items: impl IntoIterator<Item = (K, f64)>) -> BTreeMap<K, Vec<f64>> {
    let mut groups: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for (k, v) in items {
        groups.entry(k).or_default().push(v);
    }
    groups
}

/// Sort values in ascending order. NaN values are placed last.
pub fn sorted(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<f64> = values.into_iter().collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

/// Percentile `p` (in `0..=100`) of the already sorted `values`, linearly interpolated between
/// the closest ranks. Returns NaN for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// `n` evenly spaced values from `start` to `end` (both inclusive).
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Biased sample skewness `m3 / m2^1.5`. Zero for constant data.
pub fn skewness(values: &[f64]) -> f64 {
    let (m2, m3, _) = central_moments(values);
    if m2 > 0.0 {
        m3 / m2.powf(1.5)
    } else {
        0.0
    }
}

/// Biased excess kurtosis `m4 / m2^2 - 3`. Zero for constant data.
pub fn kurtosis(values: &[f64]) -> f64 {
    let (m2, _, m4) = central_moments(values);
    if m2 > 0.0 {
        m4 / (m2 * m2) - 3.0
    } else {
        0.0
    }
}

fn central_moments(values: &[f64]) -> (f64, f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = Statistics::mean(values);
    let (m2, m3, m4) = values.iter().fold((0.0, 0.0, 0.0), |(m2, m3, m4), x| {
        let d = x - mean;
        (m2 + d * d, m3 + d * d * d, m4 + d * d * d * d)
    });
    (m2 / n, m3 / n, m4 / n)
}

/// Full description of a distribution of samples, such as delays or wait times. Standard
/// deviation and variance are population values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistributionSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub variance: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    #[serde(rename = "95th")]
    pub p95: f64,
    #[serde(rename = "99th")]
    pub p99: f64,
    #[serde(rename = "99.9th")]
    pub p999: f64,
    #[serde(rename = "99.99th")]
    pub p9999: f64,
    pub total: f64,
    /// Set when the summary describes a single XPU.
    #[serde(rename = "XpuId", skip_serializing_if = "Option::is_none")]
    pub xpu_id: Option<u32>,
}

impl DistributionSummary {
    /// Summarize `values`. Returns `None` if there are no values.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sorted = sorted(values.iter().copied());
        Some(Self {
            count: values.len(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean: Statistics::mean(values),
            median: percentile(&sorted, 50.0),
            std: Statistics::population_std_dev(values),
            variance: Statistics::population_variance(values),
            skewness: skewness(values),
            kurtosis: kurtosis(values),
            p95: percentile(&sorted, 95.0),
            p99: percentile(&sorted, 99.0),
            p999: percentile(&sorted, 99.9),
            p9999: percentile(&sorted, 99.99),
            total: values.iter().sum(),
            xpu_id: None,
        })
    }

    pub fn for_xpu(mut self, xpu_id: u32) -> Self {
        self.xpu_id = Some(xpu_id);
        self
    }
}

/// Compact statistics of a group of samples, with the sample standard deviation. The standard
/// deviation of a single sample is reported as zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupStats {
    #[serde(rename = "Mean")]
    pub mean: f64,
    #[serde(rename = "Median")]
    pub median: f64,
    #[serde(rename = "Std Dev")]
    pub std_dev: f64,
    #[serde(rename = "Min")]
    pub min: f64,
    #[serde(rename = "Max")]
    pub max: f64,
    #[serde(rename = "Count")]
    pub count: usize,
}

impl GroupStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sorted = sorted(values.iter().copied());
        Some(Self {
            mean: Statistics::mean(values),
            median: percentile(&sorted, 50.0),
            std_dev: sample_std_dev(values),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            count: values.len(),
        })
    }
}

/// Sample standard deviation, zero if there are less than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        0.0
    } else {
        Statistics::std_dev(values)
    }
}

/// Round to two decimals, as used in the summary tables.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod test {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn interpolated_percentiles() {
        let values = sorted([4.0, 1.0, 3.0, 2.0]);
        assert!(close(percentile(&values, 0.0), 1.0));
        assert!(close(percentile(&values, 50.0), 2.5));
        assert!(close(percentile(&values, 100.0), 4.0));
        assert!(close(percentile(&values, 25.0), 1.75));
        assert!(close(percentile(&values, 95.0), 3.85));
        assert!(percentile(&[], 50.0).is_nan());
        assert!(close(percentile(&[7.0], 99.0), 7.0));
    }

    #[test]
    fn moments() {
        // symmetric data has no skew
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(close(skewness(&values), 0.0));
        // biased excess kurtosis of 1..5 is -1.3
        assert!(close(kurtosis(&values), -1.3));
        assert!(skewness(&[1.0, 1.0, 1.0, 10.0]) > 0.0);
        assert_eq!(kurtosis(&[2.0, 2.0]), 0.0);
    }

    #[test]
    fn distribution_summary() {
        let s = DistributionSummary::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0])
            .unwrap()
            .for_xpu(3);
        assert_eq!(s.count, 8);
        assert!(close(s.mean, 5.0));
        assert!(close(s.std, 2.0));
        assert!(close(s.variance, 4.0));
        assert!(close(s.median, 4.5));
        assert!(close(s.total, 40.0));
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 9.0);
        assert_eq!(s.xpu_id, Some(3));
        assert!(s.p95 <= s.p99 && s.p99 <= s.p999 && s.p999 <= s.p9999);
        assert!(DistributionSummary::from_values(&[]).is_none());
    }

    #[test]
    fn group_stats() {
        let s = GroupStats::from_values(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(close(s.mean, 2.5));
        assert!(close(s.median, 2.5));
        assert!(close(s.std_dev, (5.0f64 / 3.0).sqrt()));
        assert_eq!(s.count, 4);
        assert_eq!(GroupStats::from_values(&[3.0]).unwrap().std_dev, 0.0);
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(linspace(90.0, 99.99, 100).len(), 100);
        assert!(close(*linspace(90.0, 99.99, 100).last().unwrap(), 99.99));
    }

    #[test]
    fn grouping() {
        let groups = group_values([(2, 1.0), (1, 5.0), (2, 3.0)]);
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(groups[&2], vec![1.0, 3.0]);
    }
}
