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
//! Transaction wait time before packing, and the number of transactions per packet.

use std::path::{Path, PathBuf};

use itertools::Itertools;
use plotly::{
    common::{Mode, Title},
    layout::{Axis, AxisType, BarMode},
    Bar, Histogram, Plot, Scatter,
};

use crate::{
    chart::ChartWriter,
    records::{PackNumRecord, WaitTimeRecord},
    report::{self, ReportError, TextReport},
    stats::{self, DistributionSummary},
    util::PathBufExt,
};

/// Per-XPU summaries of a single metric, ordered by XPU id.
fn per_xpu(items: impl IntoIterator<Item = (u32, f64)>) -> Vec<(DistributionSummary, Vec<f64>)> {
    stats::group_values(items)
        .into_iter()
        .filter_map(|(xpu, values)| {
            DistributionSummary::from_values(&values).map(|s| (s.for_xpu(xpu), values))
        })
        .collect()
}

fn xpu_labels(summaries: &[DistributionSummary]) -> Vec<String> {
    summaries
        .iter()
        .map(|s| format!("XPU {}", s.xpu_id.unwrap_or_default()))
        .collect()
}

/// Grouped bar chart with one series per `(name, metric)` over all XPUs.
fn comparison(
    charts: &mut ChartWriter,
    file_name: &str,
    title: &str,
    y_label: &str,
    summaries: &[DistributionSummary],
    series: &[(&str, fn(&DistributionSummary) -> f64)],
) {
    let labels = xpu_labels(summaries);
    let mut plot = Plot::new();
    for (name, metric) in series {
        plot.add_trace(
            Bar::new(labels.clone(), summaries.iter().map(|s| metric(s)).collect_vec()).name(name),
        );
    }
    let layout = charts
        .style()
        .layout(title, "XPU ID", y_label)
        .bar_mode(BarMode::Group);
    charts.write_with_layout(file_name, plot, layout);
}

#[derive(Debug, Clone, Default)]
pub struct WaitTimeOutcome {
    pub wait_time: Vec<DistributionSummary>,
    pub pack: Vec<DistributionSummary>,
    pub files: Vec<PathBuf>,
}

/// Analyze the wait time log and the pack number log. Either may be absent or empty. Returns
/// `Ok(None)` if neither holds any record.
pub fn analyze(
    wait_time: Option<(&Path, &[WaitTimeRecord])>,
    pack: Option<(&Path, &[PackNumRecord])>,
    output_dir: &Path,
    charts: &mut ChartWriter,
) -> Result<Option<WaitTimeOutcome>, ReportError> {
    let wait_groups = per_xpu(
        wait_time
            .into_iter()
            .flat_map(|(_, r)| r.iter().map(|r| (r.xpu_id, r.wait_time_ns))),
    );
    let pack_groups = per_xpu(
        pack.into_iter()
            .flat_map(|(_, r)| r.iter().map(|r| (r.xpu_id, r.pack_nums))),
    );
    if wait_groups.is_empty() && pack_groups.is_empty() {
        log::warn!("No wait time or pack number data available");
        return Ok(None);
    }

    let mut outcome = WaitTimeOutcome::default();
    let mut report = TextReport::default();
    report
        .line(format!(
            "SUE Performance Analysis Report - {}",
            sue_perf_utils::other::get_report_timestamp()
        ))
        .line("=".repeat(50))
        .blank();
    for (kind, source) in [
        ("Wait time", wait_time.map(|(p, _)| p)),
        ("Pack number", pack.map(|(p, _)| p)),
    ] {
        match source {
            Some(p) => report.line(format!("{kind} source: {}", p.display())),
            None => report.line(format!("{kind} file not found")),
        };
    }

    report.blank().section("Wait Time Analysis");
    if wait_groups.is_empty() {
        report.line("No wait time data available");
    }
    for (summary, values) in &wait_groups {
        let xpu = summary.xpu_id.unwrap_or_default();
        log::info!("Analyzing queueing delay for XPU {xpu}");
        let path = output_dir.then(format!("xpu_{xpu}_wait_time_stats.csv"));
        report::write_csv(&path, [summary])?;
        outcome.files.push(path);

        let mut plot = Plot::new();
        plot.add_trace(Histogram::new(values.clone()).name(&format!("XPU {xpu}")));
        charts.write(
            &format!("xpu_{xpu}_wait_time_histogram.html"),
            plot,
            &format!("Queueing Delay Distribution of XPU {xpu}"),
            "Queueing Delay (ns)",
            "Count",
        );

        let sorted = stats::sorted(values.iter().copied());
        let (ps, vs): (Vec<f64>, Vec<f64>) = stats::linspace(90.0, 99.99, 100)
            .into_iter()
            .map(|p| (p, stats::percentile(&sorted, p)))
            .unzip();
        let mut plot = Plot::new();
        plot.add_trace(Scatter::new(ps, vs).mode(Mode::Lines).name("Tail latency"));
        let layout = charts
            .style()
            .layout(
                &format!("Tail Latency Analysis of XPU {xpu}"),
                "Percentile",
                "Queueing Delay (ns)",
            )
            .y_axis(
                Axis::new()
                    .title(Title::with_text("Queueing Delay (ns)"))
                    .type_(AxisType::Log),
            );
        charts.write_with_layout(&format!("xpu_{xpu}_wait_time_tail.html"), plot, layout);

        report
            .blank()
            .line(format!("XPU {xpu} Analysis:"))
            .line("-".repeat(30))
            .line(format!("Mean Delay: {:.2} ns", summary.mean))
            .line(format!("99.9th Percentile: {:.2} ns", summary.p999));
    }

    report.blank().section("Pack Number Analysis");
    if pack_groups.is_empty() {
        report.line("No pack number data available");
    }
    for (summary, values) in &pack_groups {
        let xpu = summary.xpu_id.unwrap_or_default();
        log::info!("Analyzing pack numbers for XPU {xpu}");
        let path = output_dir.then(format!("xpu_{xpu}_pack_stats.csv"));
        report::write_csv(&path, [summary])?;
        outcome.files.push(path);

        let mut plot = Plot::new();
        plot.add_trace(Histogram::new(values.clone()).name(&format!("XPU {xpu}")));
        charts.write(
            &format!("xpu_{xpu}_pack_histogram.html"),
            plot,
            &format!("Pack Number Distribution of XPU {xpu}"),
            "Pack Number",
            "Count",
        );

        report
            .blank()
            .line(format!("XPU {xpu} Pack Analysis:"))
            .line("-".repeat(30))
            .line(format!("Mean Pack Number: {:.2}", summary.mean))
            .line(format!("Total Packets: {}", summary.total));
    }

    outcome.wait_time = wait_groups.into_iter().map(|(s, _)| s).collect();
    outcome.pack = pack_groups.into_iter().map(|(s, _)| s).collect();

    if !outcome.wait_time.is_empty() {
        let path = output_dir.then("all_wait_time_stats.csv");
        report::write_csv(&path, &outcome.wait_time)?;
        outcome.files.push(path);
        comparison(
            charts,
            "xpu_wait_time_comparison.html",
            "Queueing Delay Comparison",
            "Delay (ns)",
            &outcome.wait_time,
            &[("Mean", |s| s.mean), ("99.9th Percentile", |s| s.p999)],
        );
    }
    if !outcome.pack.is_empty() {
        let path = output_dir.then("all_pack_stats.csv");
        report::write_csv(&path, &outcome.pack)?;
        outcome.files.push(path);
        comparison(
            charts,
            "xpu_pack_comparison.html",
            "Pack Number Comparison",
            "Pack Number",
            &outcome.pack,
            &[
                ("Mean", |s| s.mean),
                ("99th Percentile", |s| s.p99),
                ("Total Packets", |s| s.total),
            ],
        );
    }

    let path = output_dir.then("analysis_summary.txt");
    report.write(&path)?;
    outcome.files.push(path);
    Ok(Some(outcome))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chart::ChartStyle;

    #[test]
    fn both_logs() {
        let dir = tempfile::tempdir().unwrap();
        let wait = (0..50)
            .map(|i| WaitTimeRecord {
                xpu_id: i % 2,
                wait_time_ns: i as f64,
            })
            .collect_vec();
        let pack = (0..10)
            .map(|i| PackNumRecord {
                xpu_id: 3,
                pack_nums: (i % 4) as f64,
            })
            .collect_vec();
        let mut charts = ChartWriter::new(dir.path(), ChartStyle::default());
        let out = analyze(
            Some((Path::new("wait.csv"), wait.as_slice())),
            Some((Path::new("pack.csv"), pack.as_slice())),
            dir.path(),
            &mut charts,
        )
        .unwrap()
        .unwrap();

        assert_eq!(out.wait_time.len(), 2);
        assert_eq!(out.wait_time[1].xpu_id, Some(1));
        assert_eq!(out.wait_time[0].count, 25);
        assert_eq!(out.pack.len(), 1);
        assert_eq!(out.pack[0].total, 13.0);
        // 2 x (histogram + tail) + 1 pack histogram + 2 comparisons
        assert_eq!(charts.written().len(), 7);
        assert!(dir.path().join("xpu_3_pack_stats.csv").exists());
        let summary = std::fs::read_to_string(dir.path().join("analysis_summary.txt")).unwrap();
        assert!(summary.contains("XPU 3 Pack Analysis:"));
        assert!(summary.contains("Total Packets: 13"));
    }

    #[test]
    fn missing_pack_log() {
        let dir = tempfile::tempdir().unwrap();
        let wait = [WaitTimeRecord {
            xpu_id: 1,
            wait_time_ns: 5.0,
        }];
        let mut charts = ChartWriter::new(dir.path(), ChartStyle::default());
        let out = analyze(Some((Path::new("w.csv"), &wait[..])), None, dir.path(), &mut charts)
            .unwrap()
            .unwrap();
        assert!(out.pack.is_empty());
        assert!(!dir.path().join("all_pack_stats.csv").exists());
        let summary = std::fs::read_to_string(dir.path().join("analysis_summary.txt")).unwrap();
        assert!(summary.contains("Pack number file not found"));

        assert!(analyze(None, None, dir.path(), &mut charts).unwrap().is_none());
    }
}
