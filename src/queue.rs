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
//! Usage of the destination, device, and link-layer processing queues.
//!
//! The analysis focuses on one XPU, one of its devices, and one switch. Utilization of every
//! plotted queue is summarized in `queue_utilization_stats.csv`.

use std::path::{Path, PathBuf};

use itertools::Itertools;
use plotly::{
    common::{Line, Mode, Title},
    layout::Axis,
    Histogram, Plot, Scatter,
};
use serde::Serialize;
use statrs::statistics::Statistics;

use crate::{
    chart::ChartWriter,
    records::{DestinationQueueRecord, DeviceQueueRecord, ProcessingQueueRecord, QueueType},
    report::{self, ReportError, TextReport},
    stats::{round2, sample_std_dev},
    throughput::Node,
    util::PathBufExt,
};

/// Queues selected for the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueTargets {
    pub xpu_id: u32,
    pub device_id: u32,
    /// XpuId of the switch.
    pub switch_id: u32,
    pub xpu_count: u32,
}

impl Default for QueueTargets {
    fn default() -> Self {
        Self {
            xpu_id: 1,
            device_id: 1,
            switch_id: 5,
            xpu_count: 4,
        }
    }
}

impl QueueTargets {
    /// Pick the targets from the processing queue log: the lowest XpuId and its lowest device,
    /// and the first switch. If no id exceeds the XPU count, the highest XpuId is taken as switch.
    pub fn detect(mut self, processing: &[ProcessingQueueRecord]) -> Self {
        let ids = processing.iter().map(|r| r.xpu_id).sorted().dedup().collect_vec();
        let Some(first) = ids.first() else {
            log::warn!("Cannot detect queue targets without processing queue data");
            return self;
        };
        self.xpu_id = *first;
        if let Some(device_id) = processing
            .iter()
            .filter(|r| r.xpu_id == self.xpu_id)
            .map(|r| r.device_id)
            .min()
        {
            self.device_id = device_id;
        }
        log::info!(
            "Auto-detected XPU ID: {}, Device ID: {}",
            self.xpu_id,
            self.device_id
        );
        if let Some(switch_id) = ids.iter().find(|id| **id > self.xpu_count) {
            self.switch_id = *switch_id;
            log::info!("Auto-detected switch ID: {switch_id}");
        } else if ids.len() > 1 {
            self.switch_id = ids[ids.len() - 1];
            log::warn!("Using highest XpuId {} as switch", self.switch_id);
        } else {
            log::warn!("Could not detect switch ID, using {}", self.switch_id);
        }
        self
    }

    pub fn switch(&self) -> Node {
        Node::new(self.switch_id, self.xpu_count)
    }

    fn node_prefix(&self, xpu_id: u32) -> String {
        match Node::new(xpu_id, self.xpu_count) {
            Node::Xpu(id) => format!("xpu{id}"),
            Node::Switch(id) => format!("switch{id}"),
        }
    }
}

/// Utilization over time of one queue.
#[derive(Debug, Clone, PartialEq)]
struct QueueSeries {
    queue: &'static str,
    label: String,
    /// `(time in seconds, utilization in percent)`, sorted by time.
    points: Vec<(f64, f64)>,
}

impl QueueSeries {
    fn new(
        queue: &'static str,
        label: String,
        points: impl IntoIterator<Item = (f64, f64)>,
    ) -> Self {
        let points = points
            .into_iter()
            .map(|(t, v)| (t / 1e9, v))
            .sorted_by(|a, b| a.0.total_cmp(&b.0))
            .collect();
        Self {
            queue,
            label,
            points,
        }
    }

    fn trace(&self) -> Box<Scatter<f64, f64>> {
        let (xs, ys): (Vec<f64>, Vec<f64>) = self.points.iter().copied().unzip();
        Scatter::new(xs, ys)
            .name(&self.label)
            .mode(Mode::Lines)
            .line(Line::new().width(2.0))
    }

    fn stats(&self) -> Option<UtilizationStatsRow> {
        if self.points.is_empty() {
            return None;
        }
        let values = self.points.iter().map(|(_, v)| *v).collect_vec();
        Some(UtilizationStatsRow {
            queue: self.queue,
            series: self.label.clone(),
            mean: round2(Statistics::mean(&values)),
            max: round2(Statistics::max(&values)),
            min: round2(Statistics::min(&values)),
            samples: values.len(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilizationStatsRow {
    #[serde(rename = "Queue")]
    pub queue: &'static str,
    #[serde(rename = "Series")]
    pub series: String,
    #[serde(rename = "MeanUtilization(%)")]
    pub mean: f64,
    #[serde(rename = "MaxUtilization(%)")]
    pub max: f64,
    #[serde(rename = "MinUtilization(%)")]
    pub min: f64,
    #[serde(rename = "Samples")]
    pub samples: usize,
}

/// Destination queues of one XPU, one series per `(sue, destination, vc)`.
fn destination_series(records: &[DestinationQueueRecord], xpu_id: u32) -> Vec<QueueSeries> {
    records
        .iter()
        .filter(|r| r.xpu_id == xpu_id)
        .into_group_map_by(|r| (r.sue_id, r.dest_xpu_id, r.vc_id))
        .into_iter()
        .sorted_by_key(|(k, _)| *k)
        .map(|((sue, dest, vc), group)| {
            QueueSeries::new(
                "destination",
                format!("SUE {sue} Dest{dest}-{vc}"),
                group.into_iter().map(|r| (r.time_ns, r.utilization)),
            )
        })
        .collect()
}

/// VC queues followed by the main queue of one device.
fn device_series(records: &[DeviceQueueRecord], xpu_id: u32, device_id: u32) -> Vec<QueueSeries> {
    let device = records
        .iter()
        .filter(|r| r.xpu_id == xpu_id && r.device_id == device_id)
        .collect_vec();
    let mut series = device
        .iter()
        .filter(|r| r.queue_type == QueueType::Vc)
        .into_group_map_by(|r| r.vc_id)
        .into_iter()
        .sorted_by_key(|(vc, _)| *vc)
        .map(|(vc, group)| {
            QueueSeries::new(
                "device",
                format!("VC {vc}"),
                group.into_iter().map(|r| (r.time_ns, r.utilization)),
            )
        })
        .collect_vec();
    let main = device
        .iter()
        .filter(|r| r.queue_type == QueueType::Main)
        .map(|r| (r.time_ns, r.utilization))
        .collect_vec();
    if !main.is_empty() {
        series.push(QueueSeries::new("device", "Main Queue".to_string(), main));
    }
    series
}

/// Utilization of each processing queue sample. Samples without a logged utilization are
/// related to the longest queue observed in `records`.
pub fn processing_utilization(records: &[&ProcessingQueueRecord]) -> Vec<f64> {
    let max_len = records
        .iter()
        .map(|r| r.queue_length)
        .fold(0.0, f64::max);
    records
        .iter()
        .map(|r| {
            r.utilization.unwrap_or(if max_len > 0.0 {
                r.queue_length / max_len * 100.0
            } else {
                0.0
            })
        })
        .collect()
}

/// Statistics of the processing queue length of one device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessingStats {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    /// Sample standard deviation.
    pub std_dev: f64,
    pub start: f64,
    pub end: f64,
    pub samples: usize,
}

impl ProcessingStats {
    pub fn new(records: &[&ProcessingQueueRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        let lengths = records.iter().map(|r| r.queue_length).collect_vec();
        let times = records.iter().map(|r| r.time_ns / 1e9).collect_vec();
        Some(Self {
            mean: Statistics::mean(&lengths),
            max: Statistics::max(&lengths),
            min: Statistics::min(&lengths),
            std_dev: sample_std_dev(&lengths),
            start: Statistics::min(&times),
            end: Statistics::max(&times),
            samples: records.len(),
        })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Records of one device, sorted by time.
fn processing_device(
    records: &[ProcessingQueueRecord],
    xpu_id: u32,
    device_id: u32,
) -> Vec<&ProcessingQueueRecord> {
    records
        .iter()
        .filter(|r| r.xpu_id == xpu_id && r.device_id == device_id)
        .sorted_by(|a, b| a.time_ns.total_cmp(&b.time_ns))
        .collect()
}

/// Write the time series of `series` into one chart, with the utilization axis fixed to 0..100.
fn write_utilization_chart(
    charts: &mut ChartWriter,
    file_name: &str,
    title: &str,
    series: &[QueueSeries],
) {
    if series.is_empty() {
        log::warn!("No data for {title}");
        return;
    }
    let mut plot = Plot::new();
    for s in series {
        plot.add_trace(s.trace());
    }
    let layout = charts
        .style()
        .layout(title, "Time (seconds)", "Queue Utilization (%)")
        .y_axis(
            Axis::new()
                .title(Title::with_text("Queue Utilization (%)"))
                .range(vec![0.0, 100.0]),
        );
    charts.write_with_layout(file_name, plot, layout);
}

/// Charts of the processing queue of one device. Returns the statistics of the queue length.
fn processing_charts(
    records: &[ProcessingQueueRecord],
    xpu_id: u32,
    device_id: u32,
    targets: &QueueTargets,
    charts: &mut ChartWriter,
) -> Option<(ProcessingStats, QueueSeries)> {
    let device = processing_device(records, xpu_id, device_id);
    let node = Node::new(xpu_id, targets.xpu_count);
    let Some(stats) = ProcessingStats::new(&device) else {
        log::warn!("No processing queue data found for {node} Device {device_id}");
        return None;
    };
    let prefix = format!("{}_device{device_id}", targets.node_prefix(xpu_id));
    let times = device.iter().map(|r| r.time_ns / 1e9).collect_vec();

    let mut plot = Plot::new();
    plot.add_trace(
        Scatter::new(times, device.iter().map(|r| r.queue_length).collect_vec())
            .name("Queue Length")
            .mode(Mode::Lines),
    );
    charts.write(
        &format!("{prefix}_processing_queues.html"),
        plot,
        &format!("{node} Device {device_id} Processing Queue Length Over Time"),
        "Time (seconds)",
        "Queue Length (packets)",
    );

    let utilization = QueueSeries::new(
        "processing",
        format!("{node} Device {device_id}"),
        device
            .iter()
            .map(|r| r.time_ns)
            .zip(processing_utilization(&device)),
    );
    write_utilization_chart(
        charts,
        &format!("{prefix}_processing_utilization.html"),
        &format!("{node} Device {device_id} Processing Queue Utilization Over Time"),
        std::slice::from_ref(&utilization),
    );

    let mut plot = Plot::new();
    plot.add_trace(
        Histogram::new(device.iter().map(|r| r.queue_length).collect_vec())
            .name("Queue Length")
            .n_bins_x(30),
    );
    charts.write(
        &format!("{prefix}_processing_queue_distribution.html"),
        plot,
        &format!("{node} Device {device_id} Processing Queue Length Distribution"),
        "Queue Length (packets)",
        "Frequency",
    );
    Some((stats, utilization))
}

/// Queue length of every device of one XPU.
fn processing_comparison(
    records: &[ProcessingQueueRecord],
    xpu_id: u32,
    charts: &mut ChartWriter,
) {
    let groups = records
        .iter()
        .filter(|r| r.xpu_id == xpu_id)
        .into_group_map_by(|r| r.device_id);
    if groups.is_empty() {
        return;
    }
    let mut plot = Plot::new();
    for (device_id, group) in groups.into_iter().sorted_by_key(|(k, _)| *k) {
        let (xs, ys): (Vec<f64>, Vec<f64>) = group
            .into_iter()
            .sorted_by(|a, b| a.time_ns.total_cmp(&b.time_ns))
            .map(|r| (r.time_ns / 1e9, r.queue_length))
            .unzip();
        plot.add_trace(
            Scatter::new(xs, ys)
                .name(&format!("Device {device_id}"))
                .mode(Mode::Lines),
        );
    }
    charts.write(
        &format!("xpu{xpu_id}_all_devices_processing_queues.html"),
        plot,
        &format!("XPU {xpu_id} All Devices Processing Queue Comparison"),
        "Time (seconds)",
        "Queue Length (packets)",
    );
}

/// Input logs of the queue analysis. Any of them may be empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueInputs<'a> {
    pub destination: &'a [DestinationQueueRecord],
    pub device: &'a [DeviceQueueRecord],
    pub processing: &'a [ProcessingQueueRecord],
}

impl QueueInputs<'_> {
    pub fn is_empty(&self) -> bool {
        self.destination.is_empty() && self.device.is_empty() && self.processing.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueueOutcome {
    pub utilization: Vec<UtilizationStatsRow>,
    /// Processing queue statistics of the focus XPU device and of the switch device 1.
    pub processing: Vec<(Node, u32, ProcessingStats)>,
    pub files: Vec<PathBuf>,
}

fn build_report(targets: &QueueTargets, outcome: &QueueOutcome) -> TextReport {
    let mut report = TextReport::new("Queue Usage Analysis Report");
    report
        .field(0, "Analysis Time", sue_perf_utils::other::get_report_timestamp())
        .field(0, "XPU", targets.xpu_id)
        .field(0, "Device", targets.device_id)
        .field(0, "Switch", format!("{} (XpuId {})", targets.switch(), targets.switch_id))
        .blank();

    report.section("Queue Utilization");
    for (queue, rows) in &outcome.utilization.iter().group_by(|r| r.queue) {
        report.line(format!("{queue}:"));
        for row in rows {
            report.line(format!(
                "  {}: mean {:.2}%, max {:.2}%, min {:.2}% ({} samples)",
                row.series, row.mean, row.max, row.min, row.samples
            ));
        }
    }
    report.blank();

    for (node, device_id, stats) in &outcome.processing {
        report
            .section(format!("{node} Device {device_id} Processing Queue"))
            .line("Queue Length:")
            .field(1, "Mean", format!("{:.2} packets", stats.mean))
            .field(1, "Max", format!("{:.2} packets", stats.max))
            .field(1, "Min", format!("{:.2} packets", stats.min))
            .field(1, "Std", format!("{:.2} packets", stats.std_dev))
            .line("Time Coverage:")
            .field(1, "Start", format!("{:.3}s", stats.start))
            .field(1, "End", format!("{:.3}s", stats.end))
            .field(1, "Duration", format!("{:.3}s", stats.duration()))
            .field(0, "Data Points", stats.samples)
            .blank();
    }
    report
}

/// Analyze the queue logs. Returns `Ok(None)` if all inputs are empty.
pub fn analyze(
    inputs: QueueInputs<'_>,
    targets: &QueueTargets,
    output_dir: &Path,
    charts: &mut ChartWriter,
) -> Result<Option<QueueOutcome>, ReportError> {
    if inputs.is_empty() {
        log::warn!("Queue usage data is empty");
        return Ok(None);
    }
    log::info!(
        "Analyzing XPU {} Device {} and {} (XpuId {})",
        targets.xpu_id,
        targets.device_id,
        targets.switch(),
        targets.switch_id
    );
    let mut outcome = QueueOutcome::default();
    let mut all_series = Vec::new();

    if !inputs.destination.is_empty() {
        let series = destination_series(inputs.destination, targets.xpu_id);
        write_utilization_chart(
            charts,
            &format!("xpu{}_destination_queues_by_sue.html", targets.xpu_id),
            &format!("XPU {} Destination Queue Usage by SUE", targets.xpu_id),
            &series,
        );
        all_series.extend(series);
    }

    if !inputs.device.is_empty() {
        for xpu_id in [targets.xpu_id, targets.switch_id] {
            let node = Node::new(xpu_id, targets.xpu_count);
            let mut series = device_series(inputs.device, xpu_id, targets.device_id);
            write_utilization_chart(
                charts,
                &format!(
                    "{}_device{}_queues.html",
                    targets.node_prefix(xpu_id),
                    targets.device_id
                ),
                &format!("{node} Device {} Queue Usage", targets.device_id),
                &series,
            );
            for s in &mut series {
                s.label = format!("{node} Device {} {}", targets.device_id, s.label);
            }
            all_series.extend(series);
        }
    }

    if !inputs.processing.is_empty() {
        for (xpu_id, device_id) in [(targets.xpu_id, targets.device_id), (targets.switch_id, 1)] {
            if let Some((stats, series)) =
                processing_charts(inputs.processing, xpu_id, device_id, targets, charts)
            {
                outcome
                    .processing
                    .push((Node::new(xpu_id, targets.xpu_count), device_id, stats));
                all_series.push(series);
            }
        }
        processing_comparison(inputs.processing, targets.xpu_id, charts);
    }

    outcome.utilization = all_series.iter().filter_map(QueueSeries::stats).collect();
    if !outcome.utilization.is_empty() {
        let path = output_dir.then("queue_utilization_stats.csv");
        report::write_csv(&path, &outcome.utilization)?;
        outcome.files.push(path);
    }
    let path = output_dir.then("queue_usage_report.txt");
    build_report(targets, &outcome).write(&path)?;
    outcome.files.push(path);
    Ok(Some(outcome))
}
