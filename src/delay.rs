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
//! End-to-end delay of the packets delivered to each XPU.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use plotly::{
    common::{Marker, Mode, Title},
    layout::{Axis, AxisType},
    BoxPlot, HeatMap, Histogram, Plot, Scatter,
};

use crate::{
    chart::{self, ChartWriter},
    records::DelayRecord,
    report::{self, ReportError, TextReport},
    stats::{self, DistributionSummary},
    util::{fmt_ids, PathBufExt},
};

/// Percentiles marked on the tail latency curve.
pub const KEY_PERCENTILES: [f64; 4] = [95.0, 99.0, 99.9, 99.99];
/// Maximum number of points drawn for a CDF.
const MAX_CDF_POINTS: usize = 5000;

/// Overall and per-XPU delay summaries, in ns.
#[derive(Debug, Clone, PartialEq)]
pub struct DelaySummary {
    pub overall: DistributionSummary,
    pub per_xpu: Vec<DistributionSummary>,
}

impl DelaySummary {
    pub fn new(records: &[DelayRecord]) -> Option<Self> {
        let delays = records.iter().map(|r| r.delay_ns).collect_vec();
        let overall = DistributionSummary::from_values(&delays)?;
        let per_xpu = stats::group_values(records.iter().map(|r| (r.xpu_id, r.delay_ns)))
            .into_iter()
            .filter_map(|(xpu, values)| {
                DistributionSummary::from_values(&values).map(|s| s.for_xpu(xpu))
            })
            .collect();
        Some(Self { overall, per_xpu })
    }
}

/// Mean delay per `(xpu_id, port_id)`.
pub fn mean_delay_by_port(records: &[DelayRecord]) -> BTreeMap<(u32, u32), f64> {
    stats::group_values(records.iter().map(|r| ((r.xpu_id, r.port_id), r.delay_ns)))
        .into_iter()
        .map(|(k, v)| (k, v.iter().sum::<f64>() / v.len() as f64))
        .collect()
}

/// Delay at 100 percentiles evenly spaced between 90 and 99.99.
pub fn tail_curve(sorted: &[f64]) -> Vec<(f64, f64)> {
    stats::linspace(90.0, 99.99, 100)
        .into_iter()
        .map(|p| (p, stats::percentile(sorted, p)))
        .collect()
}

fn render_charts(records: &[DelayRecord], sorted: &[f64], charts: &mut ChartWriter) {
    let mut plot = Plot::new();
    plot.add_trace(Histogram::new(sorted.to_vec()).name("Delay"));
    charts.write(
        "overview_delay_histogram.html",
        plot,
        "Histogram of End-to-End Delay",
        "End-to-End Delay (ns)",
        "Count",
    );

    let mut plot = Plot::new();
    plot.add_trace(BoxPlot::<f64, f64>::new(sorted.to_vec()).name("All XPUs"));
    for (xpu, values) in stats::group_values(records.iter().map(|r| (r.xpu_id, r.delay_ns))) {
        plot.add_trace(BoxPlot::<f64, f64>::new(values).name(&format!("XPU {xpu}")));
    }
    charts.write(
        "overview_delay_boxplot.html",
        plot,
        "Boxplot of End-to-End Delay",
        "",
        "End-to-End Delay (ns)",
    );

    // CDF, thinned out for large logs
    let n = sorted.len();
    let step = (n / MAX_CDF_POINTS).max(1);
    let (xs, ys): (Vec<f64>, Vec<f64>) = sorted
        .iter()
        .enumerate()
        .filter(|(i, _)| i % step == 0 || *i == n - 1)
        .map(|(i, x)| (*x, (i + 1) as f64 / n as f64))
        .unzip();
    let (x0, x1) = (sorted[0], sorted[n - 1]);
    let mut plot = Plot::new();
    plot.add_trace(Scatter::new(xs, ys).name("CDF").mode(Mode::Lines));
    for (name, y, color) in [
        ("95%", 0.95, chart::COLOR_POOR),
        ("99%", 0.99, chart::COLOR_FAIR),
        ("99.9%", 0.999, chart::COLOR_GOOD),
    ] {
        plot.add_trace(chart::threshold_line(name, x0, x1, y, color));
    }
    charts.write(
        "overview_delay_cdf.html",
        plot,
        "Cumulative Distribution Function",
        "End-to-End Delay (ns)",
        "Cumulative Probability",
    );

    let means = mean_delay_by_port(records);
    let xpus = means.keys().map(|(x, _)| *x).unique().sorted().collect_vec();
    let ports = means.keys().map(|(_, p)| *p).unique().sorted().collect_vec();
    let z = xpus
        .iter()
        .map(|x| {
            ports
                .iter()
                .map(|p| means.get(&(*x, *p)).copied())
                .collect_vec()
        })
        .collect_vec();
    let mut plot = Plot::new();
    plot.add_trace(HeatMap::new(
        ports.iter().map(|p| format!("Port {p}")).collect_vec(),
        xpus.iter().map(|x| format!("XPU {x}")).collect_vec(),
        z,
    ));
    charts.write(
        "xpu_port_delay_heatmap.html",
        plot,
        "Average End-to-End Delay by XPU and Port",
        "Port ID",
        "XPU ID",
    );

    let (ps, vs): (Vec<f64>, Vec<f64>) = tail_curve(sorted).into_iter().unzip();
    let mut plot = Plot::new();
    plot.add_trace(Scatter::new(ps, vs).name("Tail latency").mode(Mode::Lines));
    for p in KEY_PERCENTILES {
        let v = stats::percentile(sorted, p);
        plot.add_trace(
            Scatter::new(vec![p], vec![v])
                .name(&format!("{p}%: {v:.0}ns"))
                .mode(Mode::Markers)
                .marker(Marker::new().size(10)),
        );
    }
    let layout = charts
        .style()
        .layout("Tail Latency Curve", "Percentile", "End-to-End Delay (ns)")
        .y_axis(
            Axis::new()
                .title(Title::with_text("End-to-End Delay (ns)"))
                .type_(AxisType::Log),
        );
    charts.write_with_layout("tail_latency.html", plot, layout);
}

fn build_report(source: &Path, records: &[DelayRecord], summary: &DelaySummary) -> TextReport {
    let mut report = TextReport::default();
    report
        .line(format!(
            "XPU End-to-End Delay Analysis Report - {}",
            sue_perf_utils::other::get_report_timestamp()
        ))
        .line("=".repeat(50))
        .blank()
        .line(format!("Data source: {}", source.display()))
        .line(format!(
            "XPU IDs: {}",
            fmt_ids(records.iter().map(|r| r.xpu_id).unique().sorted())
        ))
        .line(format!(
            "Port IDs: {}",
            fmt_ids(records.iter().map(|r| r.port_id).unique().sorted())
        ))
        .blank()
        .line("Overall Delay Statistics")
        .line("-".repeat(40));
    let o = &summary.overall;
    report
        .line(format!("Total packets: {}", o.count))
        .line(format!("Mean Delay: {:.2} ns", o.mean))
        .line(format!("95th Percentile: {:.2} ns", o.p95))
        .line(format!("99th Percentile: {:.2} ns", o.p99))
        .line(format!("99.9th Percentile: {:.2} ns", o.p999))
        .blank()
        .line("Delay Analysis by XPU ID")
        .line("-".repeat(40));
    for s in &summary.per_xpu {
        report
            .line(format!("XPU {}:", s.xpu_id.unwrap_or_default()))
            .field(1, "Packets", s.count)
            .field(1, "Mean Delay", format!("{:.2} ns", s.mean))
            .field(1, "99.9th Percentile", format!("{:.2} ns", s.p999));
    }
    report
}

#[derive(Debug, Clone)]
pub struct DelayOutcome {
    pub summary: DelaySummary,
    pub files: Vec<PathBuf>,
}

/// Analyze the delay log loaded from `source` and write all artifacts into `output_dir`.
/// Returns `Ok(None)` if there are no records.
pub fn analyze(
    source: &Path,
    records: &[DelayRecord],
    output_dir: &Path,
    charts: &mut ChartWriter,
) -> Result<Option<DelayOutcome>, ReportError> {
    let Some(summary) = DelaySummary::new(records) else {
        log::warn!("No XPU delay data available");
        return Ok(None);
    };
    log::info!(
        "Loaded {} delay records, mean delay {:.2} ns",
        summary.overall.count,
        summary.overall.mean
    );

    let mut files = Vec::new();
    let path = output_dir.then("overall_delay_stats.csv");
    report::write_csv(&path, [summary.overall])?;
    files.push(path);
    for s in &summary.per_xpu {
        let xpu = s.xpu_id.unwrap_or_default();
        let path = output_dir.then(format!("xpu_{xpu}_delay_stats.csv"));
        report::write_csv(&path, [*s])?;
        files.push(path);
    }
    let path = output_dir.then("all_xpu_delay_stats.csv");
    report::write_csv(&path, &summary.per_xpu)?;
    files.push(path);

    let sorted = stats::sorted(records.iter().map(|r| r.delay_ns));
    render_charts(records, &sorted, charts);

    let path = output_dir.then("analysis_summary.txt");
    build_report(source, records, &summary).write(&path)?;
    files.push(path);

    Ok(Some(DelayOutcome { summary, files }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chart::ChartStyle;

    fn record(xpu_id: u32, port_id: u32, delay_ns: f64) -> DelayRecord {
        DelayRecord {
            time_ns: 0.0,
            xpu_id,
            port_id,
            delay_ns,
        }
    }

    fn records() -> Vec<DelayRecord> {
        (1..=100)
            .map(|i| record(1 + i % 2, i % 3, i as f64 * 10.0))
            .collect()
    }

    #[test]
    fn summaries() {
        let summary = DelaySummary::new(&records()).unwrap();
        assert_eq!(summary.overall.count, 100);
        assert_eq!(summary.overall.min, 10.0);
        assert_eq!(summary.overall.max, 1000.0);
        assert!((summary.overall.mean - 505.0).abs() < 1e-9);
        assert_eq!(summary.per_xpu.len(), 2);
        assert_eq!(summary.per_xpu[0].xpu_id, Some(1));
        assert_eq!(
            summary.per_xpu.iter().map(|s| s.count).sum::<usize>(),
            summary.overall.count
        );
        assert!(DelaySummary::new(&[]).is_none());
    }

    #[test]
    fn port_means_and_tail() {
        let recs = vec![record(1, 1, 10.0), record(1, 1, 30.0), record(2, 4, 5.0)];
        let means = mean_delay_by_port(&recs);
        assert_eq!(means[&(1, 1)], 20.0);
        assert_eq!(means[&(2, 4)], 5.0);

        let sorted = stats::sorted((1..=1000).map(|x| x as f64));
        let curve = tail_curve(&sorted);
        assert_eq!(curve.len(), 100);
        assert_eq!(curve[0].0, 90.0);
        assert!(curve.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut charts = ChartWriter::new(dir.path(), ChartStyle::default());
        let out = analyze(Path::new("xpu_delay_1.csv"), &records(), dir.path(), &mut charts)
            .unwrap()
            .unwrap();
        assert_eq!(charts.written().len(), 5);
        for f in &out.files {
            assert!(f.exists(), "{f:?}");
        }
        let all = std::fs::read_to_string(dir.path().join("all_xpu_delay_stats.csv")).unwrap();
        assert!(all.starts_with("count,min,max,mean,median,std,variance,skewness,kurtosis,95th"));
        assert!(all.lines().next().unwrap().ends_with("XpuId"));
        assert_eq!(all.lines().count(), 3);

        let empty = tempfile::tempdir().unwrap();
        let mut charts = ChartWriter::new(empty.path(), ChartStyle::default());
        assert!(analyze(Path::new("x.csv"), &[], empty.path(), &mut charts)
            .unwrap()
            .is_none());
    }
}
