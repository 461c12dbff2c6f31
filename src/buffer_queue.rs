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
//! Occupancy of the SUE buffer queue.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use plotly::{
    common::{Fill, Mode},
    histogram::HistNorm,
    BoxPlot, HeatMap, Histogram, Plot, Scatter,
};
use serde::Serialize;
use statrs::statistics::Statistics;

use crate::{
    chart::ChartWriter,
    records::BufferQueueRecord,
    report::{self, ReportError, TextReport},
    stats::{linspace, percentile, sorted},
    util::{fmt_ids, PathBufExt},
};

/// Number of time bins of the usage heatmap.
const HEATMAP_TIME_BINS: usize = 49;
/// Approximate number of buffer size bins of the usage heatmap.
const HEATMAP_SIZE_BINS: f64 = 20.0;

/// The XPUs covered by the analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Xpu(u32),
    /// Several XPUs, used when the focus XPU has no data.
    All(Vec<u32>),
}

impl Scope {
    /// Suffix of the output file names.
    pub fn suffix(&self) -> String {
        match self {
            Self::Xpu(id) => format!("xpu_{id}"),
            Self::All(_) => "all_xpus".to_string(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xpu(id) => write!(f, "XPU {id}"),
            Self::All(ids) => write!(f, "All XPUs {}", fmt_ids(ids)),
        }
    }
}

/// Records of `focus_xpu`, or all records if that XPU never logged its buffer.
pub fn select(
    records: &[BufferQueueRecord],
    focus_xpu: u32,
) -> (Scope, Vec<&BufferQueueRecord>) {
    let mut selected = records
        .iter()
        .filter(|r| r.xpu_id == focus_xpu)
        .collect_vec();
    let available = records.iter().map(|r| r.xpu_id).sorted().dedup().collect_vec();
    if selected.is_empty() {
        log::warn!(
            "No data found for XPU {focus_xpu}, available XPU IDs: {}. Using all XPUs",
            fmt_ids(&available)
        );
        selected = records.iter().collect();
    } else {
        log::info!("Loaded {} records of XPU {focus_xpu}", selected.len());
    }
    selected.sort_by(|a, b| a.time_ns.total_cmp(&b.time_ns));
    let ids = selected.iter().map(|r| r.xpu_id).sorted().dedup().collect_vec();
    let scope = match ids.as_slice() {
        [id] => Scope::Xpu(*id),
        _ => Scope::All(ids),
    };
    (scope, selected)
}

/// Summary of the buffer sizes. Times are in microseconds, the standard deviation is the
/// population value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferSummary {
    pub total_records: usize,
    pub time_min_us: f64,
    pub time_max_us: f64,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub q25: f64,
    pub q75: f64,
    pub q95: f64,
    /// Share of samples with an empty buffer, in percent.
    pub zero_ratio: f64,
    /// Sum of the absolute size changes between consecutive samples.
    pub total_changes: f64,
}

impl BufferSummary {
    /// Summarize records sorted by time.
    pub fn new(records: &[&BufferQueueRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        let sizes = records.iter().map(|r| r.buffer_size).collect_vec();
        let times = records.iter().map(|r| r.time_ns / 1000.0).collect_vec();
        let s = sorted(sizes.iter().copied());
        let zeros = sizes.iter().filter(|v| **v == 0.0).count();
        Some(Self {
            total_records: records.len(),
            time_min_us: Statistics::min(&times),
            time_max_us: Statistics::max(&times),
            mean: Statistics::mean(&sizes),
            std: Statistics::population_std_dev(&sizes),
            min: s[0],
            max: s[s.len() - 1],
            median: percentile(&s, 50.0),
            q25: percentile(&s, 25.0),
            q75: percentile(&s, 75.0),
            q95: percentile(&s, 95.0),
            zero_ratio: zeros as f64 / sizes.len() as f64 * 100.0,
            total_changes: sizes.iter().tuple_windows().map(|(a, b)| (b - a).abs()).sum(),
        })
    }

    pub fn duration_us(&self) -> f64 {
        self.time_max_us - self.time_min_us
    }

    pub fn non_zero_ratio(&self) -> f64 {
        100.0 - self.zero_ratio
    }

    /// Size changes per second, if any time has passed.
    pub fn change_rate(&self) -> Option<f64> {
        let duration = self.duration_us();
        (self.total_changes > 0.0 && duration > 0.0).then(|| self.total_changes / duration * 1e6)
    }

    pub fn rows(&self) -> Vec<MetricRow> {
        vec![
            MetricRow::new("TotalRecords", self.total_records as f64),
            MetricRow::new("TimeRange_Us_Min", self.time_min_us),
            MetricRow::new("TimeRange_Us_Max", self.time_max_us),
            MetricRow::new("TimeRange_Us_Duration", self.duration_us()),
            MetricRow::new("BufferSize_Mean", self.mean),
            MetricRow::new("BufferSize_Std", self.std),
            MetricRow::new("BufferSize_Min", self.min),
            MetricRow::new("BufferSize_Max", self.max),
            MetricRow::new("BufferSize_Median", self.median),
            MetricRow::new("BufferSize_Q25", self.q25),
            MetricRow::new("BufferSize_Q75", self.q75),
            MetricRow::new("BufferSize_Q95", self.q95),
            MetricRow::new("ZeroBufferRatio", self.zero_ratio),
            MetricRow::new("NonZeroBufferRatio", self.non_zero_ratio()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricRow {
    #[serde(rename = "Metric")]
    pub metric: &'static str,
    #[serde(rename = "Value")]
    pub value: f64,
}

impl MetricRow {
    fn new(metric: &'static str, value: f64) -> Self {
        Self { metric, value }
    }
}

fn build_report(scope: &Scope, summary: &BufferSummary) -> TextReport {
    let title = format!("SUE Buffer Queue Analysis Report - {scope}");
    let mut report = TextReport::default();
    report
        .line(&title)
        .line("=".repeat(title.len()))
        .blank()
        .field(0, "Analysis Time", sue_perf_utils::other::get_report_timestamp())
        .field(0, "Total Records", summary.total_records)
        .line(format!(
            "Time Range: {:.2} - {:.2} us (Duration: {:.2} us)",
            summary.time_min_us,
            summary.time_max_us,
            summary.duration_us()
        ))
        .blank()
        .section("Buffer Queue Size Statistics:")
        .field(0, "Mean", format!("{:.2} packets", summary.mean))
        .field(0, "Standard Deviation", format!("{:.2} packets", summary.std))
        .field(0, "Minimum", format!("{} packets", summary.min))
        .field(0, "Maximum", format!("{} packets", summary.max))
        .field(0, "Median", format!("{:.2} packets", summary.median))
        .field(0, "25th Percentile", format!("{:.2} packets", summary.q25))
        .field(0, "75th Percentile", format!("{:.2} packets", summary.q75))
        .field(0, "95th Percentile", format!("{:.2} packets", summary.q95))
        .blank()
        .section("Queue Usage Patterns:")
        .field(0, "Time with Empty Queue", format!("{:.2}%", summary.zero_ratio))
        .field(0, "Time with Non-Empty Queue", format!("{:.2}%", summary.non_zero_ratio()))
        .field(0, "Total Queue Changes", summary.total_changes as u64);
    if let Some(rate) = summary.change_rate() {
        report.field(0, "Average Change Rate", format!("{rate:.4} packets/s"));
    }
    report
}

/// Count the samples per `(time bin, size bin)`. Returns the bin centers of both axes and the
/// counts indexed by size bin first, as expected by a heatmap.
pub fn usage_histogram(records: &[&BufferQueueRecord]) -> (Vec<f64>, Vec<f64>, Vec<Vec<f64>>) {
    let times = records.iter().map(|r| r.time_ns / 1e6).collect_vec();
    let (t_min, t_max) = (Statistics::min(&times), Statistics::max(&times));
    let max_size = records.iter().map(|r| r.buffer_size).fold(0.0, f64::max);
    let step = (max_size / HEATMAP_SIZE_BINS).floor().max(1.0);
    let size_bins = (max_size / step).floor() as usize + 1;
    let time_bins = if t_max > t_min { HEATMAP_TIME_BINS } else { 1 };
    let width = (t_max - t_min) / time_bins as f64;

    let mut z = vec![vec![0.0; time_bins]; size_bins];
    for (t, r) in times.iter().zip(records) {
        let ti = if width > 0.0 {
            (((t - t_min) / width) as usize).min(time_bins - 1)
        } else {
            0
        };
        let si = ((r.buffer_size.max(0.0) / step) as usize).min(size_bins - 1);
        z[si][ti] += 1.0;
    }
    let time_centers = linspace(t_min, t_max, time_bins + 1)
        .iter()
        .tuple_windows()
        .map(|(a, b)| (a + b) / 2.0)
        .collect_vec();
    let size_centers = (0..size_bins).map(|i| (i as f64 + 0.5) * step).collect_vec();
    (time_centers, size_centers, z)
}

fn render_charts(
    scope: &Scope,
    records: &[&BufferQueueRecord],
    summary: &BufferSummary,
    charts: &mut ChartWriter,
) {
    let suffix = scope.suffix();
    let mut plot = Plot::new();
    match scope {
        Scope::Xpu(_) => {
            let (xs, ys): (Vec<f64>, Vec<f64>) = records
                .iter()
                .map(|r| (r.time_ns / 1000.0, r.buffer_size))
                .unzip();
            plot.add_trace(
                Scatter::new(xs, ys)
                    .name("Buffer Queue Size")
                    .mode(Mode::Lines)
                    .fill(Fill::ToZeroY),
            );
        }
        Scope::All(_) => {
            let groups = records.iter().into_group_map_by(|r| r.xpu_id);
            for (xpu_id, group) in groups.into_iter().sorted_by_key(|(k, _)| *k) {
                let (xs, ys): (Vec<f64>, Vec<f64>) = group
                    .into_iter()
                    .map(|r| (r.time_ns / 1000.0, r.buffer_size))
                    .unzip();
                plot.add_trace(
                    Scatter::new(xs, ys)
                        .name(&format!("XPU {xpu_id}"))
                        .mode(Mode::Lines),
                );
            }
        }
    }
    charts.write(
        &format!("sue_buffer_queue_{suffix}_timeseries.html"),
        plot,
        &format!(
            "SUE Buffer Queue Size Over Time - {scope} (Max: {}, Avg: {:.2}, Std: {:.2})",
            summary.max, summary.mean, summary.std
        ),
        "Time (us)",
        "Buffer Queue Size (packets)",
    );

    let sizes = records.iter().map(|r| r.buffer_size).collect_vec();
    let mut plot = Plot::new();
    plot.add_trace(
        Histogram::new(sizes.clone())
            .name("Buffer Size")
            .n_bins_x(50)
            .hist_norm(HistNorm::ProbabilityDensity),
    );
    charts.write(
        &format!("sue_buffer_queue_{suffix}_distribution.html"),
        plot,
        &format!("Buffer Queue Size Distribution - {scope}"),
        "Buffer Queue Size (packets)",
        "Density",
    );

    let mut plot = Plot::new();
    plot.add_trace(BoxPlot::<f64, f64>::new(sizes).name(&scope.to_string()));
    charts.write(
        &format!("sue_buffer_queue_{suffix}_boxplot.html"),
        plot,
        &format!("Buffer Queue Size Box Plot - {scope}"),
        "",
        "Buffer Queue Size (packets)",
    );

    let (xs, ys, z) = usage_histogram(records);
    let mut plot = Plot::new();
    plot.add_trace(HeatMap::new(xs, ys, z).name("Frequency"));
    charts.write(
        &format!("sue_buffer_queue_{suffix}_heatmap.html"),
        plot,
        &format!("Buffer Queue Usage Heatmap - {scope}"),
        "Time (ms)",
        "Buffer Queue Size (packets)",
    );
}

#[derive(Debug, Clone)]
pub struct BufferQueueOutcome {
    pub scope: Scope,
    pub summary: BufferSummary,
    pub files: Vec<PathBuf>,
}

/// Analyze the buffer of `focus_xpu`. Returns `Ok(None)` if there are no records.
pub fn analyze(
    records: &[BufferQueueRecord],
    focus_xpu: u32,
    output_dir: &Path,
    charts: &mut ChartWriter,
) -> Result<Option<BufferQueueOutcome>, ReportError> {
    let (scope, selected) = select(records, focus_xpu);
    let Some(summary) = BufferSummary::new(&selected) else {
        log::warn!("SUE buffer queue data is empty");
        return Ok(None);
    };
    let suffix = scope.suffix();
    let mut files = Vec::new();

    let path = output_dir.then(format!("sue_buffer_queue_{suffix}_statistics.csv"));
    report::write_csv(&path, summary.rows())?;
    files.push(path);
    let path = output_dir.then(format!("sue_buffer_queue_{suffix}_analysis_report.txt"));
    build_report(&scope, &summary).write(&path)?;
    files.push(path);

    render_charts(&scope, &selected, &summary, charts);
    Ok(Some(BufferQueueOutcome {
        scope,
        summary,
        files,
    }))
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;
    use crate::chart::ChartStyle;

    fn rec(xpu_id: u32, time_ns: f64, buffer_size: f64) -> BufferQueueRecord {
        BufferQueueRecord {
            time_ns,
            xpu_id,
            buffer_size,
        }
    }

    #[test]
    fn focus_and_fallback() {
        let records = vec![rec(2, 1.0, 1.0), rec(1, 2.0, 3.0), rec(1, 0.0, 0.0)];
        let (scope, selected) = select(&records, 1);
        assert_eq!(scope, Scope::Xpu(1));
        assert_eq!(scope.suffix(), "xpu_1");
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].time_ns, 0.0);

        let (scope, selected) = select(&records, 7);
        assert_eq!(scope, Scope::All(vec![1, 2]));
        assert_eq!(scope.suffix(), "all_xpus");
        assert_eq!(scope.to_string(), "All XPUs [1, 2]");
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn summary() {
        let records = vec![
            rec(1, 0.0, 0.0),
            rec(1, 1000.0, 4.0),
            rec(1, 2000.0, 2.0),
            rec(1, 3000.0, 0.0),
        ];
        let refs = records.iter().collect_vec();
        let s = BufferSummary::new(&refs).unwrap();
        assert_eq!(s.total_records, 4);
        assert_eq!(s.duration_us(), 3.0);
        assert_eq!(s.mean, 1.5);
        assert!((s.std - 2.75f64.sqrt()).abs() < 1e-9);
        assert_eq!(s.median, 1.0);
        assert_eq!(s.q25, 0.0);
        assert_eq!(s.q75, 2.5);
        assert_eq!(s.zero_ratio, 50.0);
        assert_eq!(s.non_zero_ratio(), 50.0);
        assert_eq!(s.total_changes, 8.0);
        assert!((s.change_rate().unwrap() - 8.0 / 3.0 * 1e6).abs() < 1e-3);

        let rows = s.rows();
        assert_eq!(rows.len(), 14);
        assert_eq!(rows[0], MetricRow::new("TotalRecords", 4.0));
        assert_eq!(rows[13].metric, "NonZeroBufferRatio");
        assert!(BufferSummary::new(&[]).is_none());
    }

    #[test]
    fn constant_buffer_has_no_change_rate() {
        let records = vec![rec(1, 0.0, 3.0), rec(1, 0.0, 3.0)];
        let refs = records.iter().collect_vec();
        let s = BufferSummary::new(&refs).unwrap();
        assert_eq!(s.total_changes, 0.0);
        assert!(s.change_rate().is_none());
        let (xs, ys, z) = usage_histogram(&refs);
        assert_eq!(xs.len(), 1);
        assert_eq!(ys.len(), 4);
        assert_eq!(z[3][0], 2.0);
    }

    #[test]
    fn heatmap_counts_every_sample() {
        let records = (0..100)
            .map(|i| rec(1, i as f64 * 1e4, (i % 41) as f64))
            .collect_vec();
        let refs = records.iter().collect_vec();
        let (xs, ys, z) = usage_histogram(&refs);
        assert_eq!(xs.len(), HEATMAP_TIME_BINS);
        assert_eq!(ys.len(), 21);
        let total: f64 = z.iter().flatten().sum();
        assert_eq!(total, 100.0);
    }

    #[test]
    fn writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut charts = ChartWriter::new(dir.path(), ChartStyle::default());
        let records = vec![rec(1, 0.0, 0.0), rec(1, 1000.0, 5.0), rec(2, 500.0, 1.0)];
        let outcome = analyze(&records, 1, dir.path(), &mut charts)
            .unwrap()
            .unwrap();
        assert_eq!(outcome.scope, Scope::Xpu(1));
        assert_eq!(outcome.files.len(), 2);
        let csv = fs::read_to_string(dir.path().join("sue_buffer_queue_xpu_1_statistics.csv"))
            .unwrap();
        assert!(csv.starts_with("Metric,Value\nTotalRecords,2"));
        assert!(csv.contains("ZeroBufferRatio,50"));
        assert_eq!(charts.written().len(), 4);

        assert!(analyze(&[], 1, dir.path(), &mut charts).unwrap().is_none());
    }
}
