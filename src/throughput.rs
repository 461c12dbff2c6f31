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
//! Device throughput and packet drop events from the performance log.
//!
//! Rows with an `XpuId` up to `xpu_count` belong to XPUs, all others to switches. Switches are
//! labelled by their offset `XpuId - xpu_count`. Times are logged in nanoseconds and plotted in
//! seconds.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use plotly::{
    common::{DashType, Line, Mode},
    BoxPlot, Plot, Scatter,
};
use serde::Serialize;

use crate::{
    chart::ChartWriter,
    records::{Direction, PerformanceRecord},
    report::{self, ReportError},
    stats::GroupStats,
    util::PathBufExt,
};

/// Selection of devices whose per-VC throughput is plotted individually.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThroughputConfig {
    pub xpu_count: u32,
    /// Node ids (as logged in `XpuId`) of the switches to plot.
    pub switch_ids: Vec<u32>,
    pub device_ids: Vec<u32>,
    pub vc_ids: Vec<u32>,
}

impl Default for ThroughputConfig {
    fn default() -> Self {
        Self {
            xpu_count: 4,
            switch_ids: vec![6],
            device_ids: vec![1],
            vc_ids: vec![0],
        }
    }
}

/// A node of the simulated network, derived from the logged `XpuId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Node {
    Xpu(u32),
    /// Switch, numbered by its offset after the last XPU.
    Switch(u32),
}

impl Node {
    pub fn new(xpu_id: u32, xpu_count: u32) -> Self {
        if xpu_id <= xpu_count {
            Self::Xpu(xpu_id)
        } else {
            Self::Switch(xpu_id - xpu_count)
        }
    }

    pub fn is_xpu(&self) -> bool {
        matches!(self, Self::Xpu(_))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xpu(id) => write!(f, "XPU {id}"),
            Self::Switch(id) => write!(f, "Switch {id}"),
        }
    }
}

/// Time series `(time_ns, value)`, sorted by time.
pub type Series = Vec<(f64, f64)>;

/// Sort the points by time and add up the values logged at the same time.
pub fn sum_by_time(mut points: Series) -> Series {
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    points
        .into_iter()
        .coalesce(|a, b| {
            if a.0 == b.0 {
                Ok((a.0, a.1 + b.1))
            } else {
                Err((a, b))
            }
        })
        .collect()
}

/// Positive link throughput (Tx and Rx added up) per `(xpu_id, device_id)`.
pub fn device_throughput(
    records: &[PerformanceRecord],
    direction: Option<Direction>,
) -> BTreeMap<(u32, u32), Series> {
    let mut points: BTreeMap<(u32, u32), Series> = BTreeMap::new();
    for r in records.iter().filter(|r| {
        r.direction.is_link() && r.rate > 0.0 && direction.map_or(true, |d| d == r.direction)
    }) {
        points
            .entry((r.xpu_id, r.device_id))
            .or_default()
            .push((r.time, r.rate));
    }
    points
        .into_iter()
        .map(|(k, v)| (k, sum_by_time(v)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviceStatsRow {
    #[serde(rename = "XpuId")]
    pub xpu_id: u32,
    #[serde(rename = "DeviceId")]
    pub device_id: u32,
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

/// Throughput statistics per device over the time series of [`device_throughput`].
pub fn device_stats(throughput: &BTreeMap<(u32, u32), Series>) -> Vec<DeviceStatsRow> {
    throughput
        .iter()
        .filter_map(|((xpu_id, device_id), series)| {
            let values = series.iter().map(|(_, v)| *v).collect_vec();
            GroupStats::from_values(&values).map(|s| DeviceStatsRow {
                xpu_id: *xpu_id,
                device_id: *device_id,
                mean: s.mean,
                median: s.median,
                std_dev: s.std_dev,
                min: s.min,
                max: s.max,
                count: s.count,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AppStatsRow {
    #[serde(rename = "XpuId")]
    pub xpu_id: u32,
    #[serde(rename = "Mean (Gbps)")]
    pub mean: f64,
    #[serde(rename = "Median (Gbps)")]
    pub median: f64,
    #[serde(rename = "Std Dev")]
    pub std_dev: f64,
    #[serde(rename = "Min (Gbps)")]
    pub min: f64,
    #[serde(rename = "Max (Gbps)")]
    pub max: f64,
    #[serde(rename = "Count")]
    pub count: usize,
}

/// Application rates of the XPUs in Gbps (the log reports Mbps).
pub fn app_rates(records: &[PerformanceRecord], xpu_count: u32) -> BTreeMap<u32, Vec<f64>> {
    crate::stats::group_values(
        records
            .iter()
            .filter(|r| r.direction == Direction::App && r.rate > 0.0 && r.xpu_id <= xpu_count)
            .map(|r| (r.xpu_id, r.rate / 1000.0)),
    )
}

pub fn app_stats(rates: &BTreeMap<u32, Vec<f64>>) -> Vec<AppStatsRow> {
    rates
        .iter()
        .filter_map(|(xpu_id, values)| {
            GroupStats::from_values(values).map(|s| AppStatsRow {
                xpu_id: *xpu_id,
                mean: s.mean,
                median: s.median,
                std_dev: s.std_dev,
                min: s.min,
                max: s.max,
                count: s.count,
            })
        })
        .collect()
}

/// Latest state of a drop counter of one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropSummaryRow {
    #[serde(rename = "Direction")]
    pub direction: Direction,
    #[serde(rename = "XpuId")]
    pub xpu_id: u32,
    #[serde(rename = "DeviceId")]
    pub device_id: u32,
    #[serde(rename = "Node")]
    pub node: String,
    #[serde(rename = "Events")]
    pub events: usize,
    #[serde(rename = "LatestCount")]
    pub latest_count: f64,
}

/// Drop counter time series per `(direction, xpu_id, device_id)`.
pub fn drop_series(records: &[PerformanceRecord]) -> BTreeMap<(Direction, u32, u32), Series> {
    let mut series: BTreeMap<(Direction, u32, u32), Series> = BTreeMap::new();
    for r in records
        .iter()
        .filter(|r| Direction::DROPS.contains(&r.direction))
    {
        series
            .entry((r.direction, r.xpu_id, r.device_id))
            .or_default()
            .push((r.time, r.rate));
    }
    for s in series.values_mut() {
        s.sort_by(|a, b| a.0.total_cmp(&b.0));
    }
    series
}

pub fn drop_summary(
    drops: &BTreeMap<(Direction, u32, u32), Series>,
    xpu_count: u32,
) -> Vec<DropSummaryRow> {
    drops
        .iter()
        .filter_map(|((direction, xpu_id, device_id), series)| {
            series.last().map(|(_, latest)| DropSummaryRow {
                direction: *direction,
                xpu_id: *xpu_id,
                device_id: *device_id,
                node: Node::new(*xpu_id, xpu_count).to_string(),
                events: series.len(),
                latest_count: *latest,
            })
        })
        .collect()
}

fn line_trace(
    name: String,
    series: &[(f64, f64)],
    dash: Option<DashType>,
) -> Box<Scatter<f64, f64>> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = series.iter().map(|(t, v)| (t / 1e9, *v)).unzip();
    let mut line = Line::new().width(1.5);
    if let Some(dash) = dash {
        line = line.dash(dash);
    }
    Scatter::new(xs, ys).name(&name).mode(Mode::Lines).line(line)
}

fn render_charts(
    records: &[PerformanceRecord],
    config: &ThroughputConfig,
    app: &BTreeMap<u32, Vec<f64>>,
    drops: &BTreeMap<(Direction, u32, u32), Series>,
    charts: &mut ChartWriter,
) {
    let xpu_count = config.xpu_count;
    let label = |xpu_id: u32, device_id: u32| {
        format!("{} Dev{device_id}", Node::new(xpu_id, xpu_count))
    };

    // per-device throughput, once for both directions and once per direction
    for (file, title, direction) in [
        ("device_throughput_comparison.html", "Device Throughput Comparison", None),
        ("device_throughput_tx.html", "Device Tx Throughput", Some(Direction::Tx)),
        ("device_throughput_rx.html", "Device Rx Throughput", Some(Direction::Rx)),
    ] {
        let throughput = device_throughput(records, direction);
        if throughput.is_empty() {
            continue;
        }
        let mut plot = Plot::new();
        for ((xpu_id, device_id), series) in &throughput {
            let dash = (!Node::new(*xpu_id, xpu_count).is_xpu()).then_some(DashType::Dash);
            plot.add_trace(line_trace(label(*xpu_id, *device_id), series, dash));
        }
        charts.write(file, plot, title, "Time (seconds)", "Throughput (Gbps)");
    }

    // total per node, all devices added up
    let mut totals: BTreeMap<(Node, Direction), Series> = BTreeMap::new();
    for r in records.iter().filter(|r| r.direction.is_link() && r.rate > 0.0) {
        totals
            .entry((Node::new(r.xpu_id, xpu_count), r.direction))
            .or_default()
            .push((r.time, r.rate));
    }
    if !totals.is_empty() {
        let mut plot = Plot::new();
        for ((node, direction), series) in totals {
            let dash = (direction == Direction::Rx).then_some(DashType::Dash);
            plot.add_trace(line_trace(
                format!("{node} {direction}"),
                &sum_by_time(series),
                dash,
            ));
        }
        charts.write(
            "total_throughput_per_xpu_switch.html",
            plot,
            "Total Throughput per XPU/Switch (Sum of All Devices)",
            "Time (seconds)",
            "Throughput (Gbps)",
        );
    }

    let summed = device_throughput(records, None);
    if !summed.is_empty() {
        let mut plot = Plot::new();
        for ((xpu_id, device_id), series) in &summed {
            plot.add_trace(
                BoxPlot::<f64, f64>::new(series.iter().map(|(_, v)| *v).collect())
                    .name(&label(*xpu_id, *device_id)),
            );
        }
        charts.write(
            "device_throughput_distribution_comparison.html",
            plot,
            "Device Throughput Distribution Comparison",
            "Device",
            "Throughput (Gbps)",
        );
    }

    if !app.is_empty() {
        let mut plot = Plot::new();
        for (xpu_id, rates) in app {
            plot.add_trace(
                BoxPlot::<f64, f64>::new(rates.clone()).name(&format!("XPU {xpu_id}")),
            );
        }
        charts.write(
            "xpu_app_boxplot.html",
            plot,
            "XPU APP Throughput",
            "XPU ID",
            "Throughput (Gbps)",
        );
    }

    for direction in Direction::DROPS {
        let mut plot = Plot::new();
        let mut any = false;
        let range = (direction, 0, 0)..=(direction, u32::MAX, u32::MAX);
        for ((_, xpu_id, device_id), series) in drops.range(range) {
            any = true;
            let dash = (!Node::new(*xpu_id, xpu_count).is_xpu()).then_some(DashType::Dash);
            plot.add_trace(line_trace(label(*xpu_id, *device_id), series, dash));
        }
        if !any {
            log::info!("No {direction} data available");
            continue;
        }
        charts.write(
            &format!("packet_drop_{}.html", direction.to_string().to_lowercase()),
            plot,
            &format!("{direction} Events"),
            "Time (seconds)",
            "Drop Count",
        );
    }

    // selected switch devices, one line per VC and direction
    let mut selected: BTreeMap<(u32, u32, u32, Direction), Series> = BTreeMap::new();
    for r in records.iter().filter(|r| {
        r.direction.is_link()
            && config.switch_ids.contains(&r.xpu_id)
            && config.device_ids.contains(&r.device_id)
            && config.vc_ids.contains(&r.vc_id)
    }) {
        selected
            .entry((r.xpu_id, r.device_id, r.vc_id, r.direction))
            .or_default()
            .push((r.time, r.rate));
    }
    if selected.is_empty() {
        log::warn!(
            "No throughput data for switches {:?}, devices {:?}, VCs {:?}",
            config.switch_ids,
            config.device_ids,
            config.vc_ids
        );
        return;
    }
    let mut plot = Plot::new();
    for ((xpu_id, device_id, vc_id, direction), series) in selected {
        let dash = (direction == Direction::Rx).then_some(DashType::Dash);
        plot.add_trace(line_trace(
            format!("{} VC{vc_id} {direction}", label(xpu_id, device_id)),
            &sum_by_time(series),
            dash,
        ));
    }
    charts.write(
        "selected_device_throughput.html",
        plot,
        "Selected Device Throughput per VC",
        "Time (seconds)",
        "Throughput (Gbps)",
    );
}

#[derive(Debug, Clone, Default)]
pub struct ThroughputOutcome {
    pub xpu_stats: Vec<DeviceStatsRow>,
    pub switch_stats: Vec<DeviceStatsRow>,
    pub app_stats: Vec<AppStatsRow>,
    pub drop_summary: Vec<DropSummaryRow>,
    pub files: Vec<PathBuf>,
}

fn write_table<T: Serialize>(
    output_dir: &Path,
    name: &str,
    rows: &[T],
    files: &mut Vec<PathBuf>,
) -> Result<(), ReportError> {
    if rows.is_empty() {
        log::warn!("No data for {name}");
        return Ok(());
    }
    let path = output_dir.then(name);
    report::write_csv(&path, rows)?;
    files.push(path);
    Ok(())
}

/// Analyze the performance log. Returns `Ok(None)` if it holds neither throughput nor drop data.
pub fn analyze(
    records: &[PerformanceRecord],
    config: &ThroughputConfig,
    output_dir: &Path,
    charts: &mut ChartWriter,
) -> Result<Option<ThroughputOutcome>, ReportError> {
    let throughput = device_throughput(records, None);
    let app = app_rates(records, config.xpu_count);
    let drops = drop_series(records);
    if throughput.is_empty() && app.is_empty() && drops.is_empty() {
        log::warn!("No valid data available for the throughput analysis");
        return Ok(None);
    }
    log::info!("Analyzing {} XPUs", config.xpu_count);

    let (xpu_stats, switch_stats): (Vec<_>, Vec<_>) = device_stats(&throughput)
        .into_iter()
        .partition(|r| Node::new(r.xpu_id, config.xpu_count).is_xpu());
    let mut outcome = ThroughputOutcome {
        xpu_stats,
        switch_stats,
        app_stats: app_stats(&app),
        drop_summary: drop_summary(&drops, config.xpu_count),
        files: Vec::new(),
    };

    let mut files = Vec::new();
    write_table(output_dir, "xpu_stats.csv", &outcome.xpu_stats, &mut files)?;
    write_table(output_dir, "switch_stats.csv", &outcome.switch_stats, &mut files)?;
    write_table(output_dir, "xpu_app_stats.csv", &outcome.app_stats, &mut files)?;
    write_table(output_dir, "drop_summary.csv", &outcome.drop_summary, &mut files)?;
    outcome.files = files;

    render_charts(records, config, &app, &drops, charts);
    Ok(Some(outcome))
}
