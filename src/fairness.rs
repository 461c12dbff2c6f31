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
//! Load balancing fairness of the SUE selection.
//!
//! Every request of a local XPU is dispatched to one of its SUEs (the *target*). For each local
//! XPU, the requests are counted per target and the dispersion of these counts is condensed into
//! a few metrics:
//!
//! - `ideal_share`: the number of requests each target would get under perfect balancing,
//!   `total_requests / distinct_targets`.
//! - `cv`: coefficient of variation, `population_std_dev(counts) / mean(counts)`.
//! - `rsd_pct`: relative standard deviation w.r.t. the ideal share, in percent.
//! - `max_min_ratio`: ratio between the busiest and the least busy target.
//! - `composite_score`: mean of three sub-scores in `[0, 100]`, where 100 is perfectly fair.
//!
//! Only targets that appear in the log are counted. A target that never received a request is
//! invisible to these metrics.
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use plotly::{common::Marker, BoxPlot, HeatMap, Plot};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use sue_perf_utils::serde::tuple_map::SerializeTupleMap;

use crate::{
    chart::{self, ChartWriter},
    records::LoadBalanceRecord,
    report::{self, ReportError, TextReport},
    util::{fmt_ids, PathBufExt},
};

/// Thresholds used to rate the fairness metrics.
pub mod thresholds {
    pub const CV_GOOD: f64 = 0.1;
    pub const CV_FAIR: f64 = 0.2;
    pub const RSD_GOOD: f64 = 10.0;
    pub const RSD_FAIR: f64 = 20.0;
    pub const RATIO_GOOD: f64 = 1.5;
    pub const RATIO_FAIR: f64 = 2.0;
    pub const SCORE_GOOD: f64 = 80.0;
    pub const SCORE_FAIR: f64 = 60.0;
}

/// Restricts which records enter the analysis. `None` accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub local_ids: Option<BTreeSet<u32>>,
    pub vc_ids: Option<BTreeSet<u32>>,
}

impl RecordFilter {
    pub fn new(local_ids: Option<Vec<u32>>, vc_ids: Option<Vec<u32>>) -> Self {
        Self {
            local_ids: local_ids.map(|x| x.into_iter().collect()),
            vc_ids: vc_ids.map(|x| x.into_iter().collect()),
        }
    }

    pub fn matches(&self, record: &LoadBalanceRecord) -> bool {
        self.local_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&record.local_xpu_id))
            && self
                .vc_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&record.vc_id))
    }

    pub fn is_empty(&self) -> bool {
        self.local_ids.is_none() && self.vc_ids.is_none()
    }
}

/// Number of requests per `(local_id, target_id)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetCounts(BTreeMap<(u32, u32), usize>);

impl TargetCounts {
    /// Count all records accepted by `filter`.
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a LoadBalanceRecord>,
        filter: &RecordFilter,
    ) -> Self {
        let mut counts = BTreeMap::new();
        for record in records.into_iter().filter(|r| filter.matches(r)) {
            *counts
                .entry((record.local_xpu_id, record.sue_id))
                .or_insert(0) += 1;
        }
        Self(counts)
    }

    pub fn get(&self, local_id: u32, target_id: u32) -> usize {
        self.0.get(&(local_id, target_id)).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of counted records.
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// All local ids with at least one record, in ascending order.
    pub fn local_ids(&self) -> Vec<u32> {
        self.0.keys().map(|(l, _)| *l).dedup().collect()
    }

    /// All target ids with at least one record, in ascending order.
    pub fn target_ids(&self) -> Vec<u32> {
        self.0
            .keys()
            .map(|(_, t)| *t)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Requests per target of a single local id.
    pub fn for_local(&self, local_id: u32) -> BTreeMap<u32, usize> {
        self.0
            .range((local_id, u32::MIN)..=(local_id, u32::MAX))
            .map(|((_, t), c)| (*t, *c))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, usize)> + '_ {
        self.0.iter().map(|((l, t), c)| (*l, *t, *c))
    }
}

impl FromIterator<((u32, u32), usize)> for TargetCounts {
    fn from_iter<I: IntoIterator<Item = ((u32, u32), usize)>>(iter: I) -> Self {
        let mut counts = BTreeMap::new();
        for (key, count) in iter {
            *counts.entry(key).or_insert(0) += count;
        }
        Self(counts)
    }
}

/// Fairness of the requests dispatched by a single local XPU.
#[derive(Debug, Clone, PartialEq)]
pub struct FairnessMetrics {
    pub local_id: u32,
    pub total_requests: usize,
    pub distinct_targets: usize,
    pub ideal_share: f64,
    pub cv: f64,
    pub rsd_pct: f64,
    pub max_min_ratio: f64,
    pub composite_score: f64,
    /// The counts the metrics were derived from.
    pub target_counts: BTreeMap<u32, usize>,
}

impl FairnessMetrics {
    /// Derive the metrics from the per-target counts of `local_id`. Returns `None` if there are
    /// no counts.
    pub fn from_counts(local_id: u32, target_counts: BTreeMap<u32, usize>) -> Option<Self> {
        if target_counts.is_empty() {
            return None;
        }
        let counts = target_counts.values().map(|c| *c as f64).collect_vec();
        let total_requests: usize = target_counts.values().sum();
        let distinct_targets = target_counts.len();
        let ideal_share = total_requests as f64 / distinct_targets as f64;

        let mean = Statistics::mean(&counts);
        let std = Statistics::population_std_dev(&counts);
        let min = Statistics::min(&counts);
        let max = Statistics::max(&counts);

        let cv = if mean > 0.0 { std / mean } else { 0.0 };
        let rsd_pct = if ideal_share > 0.0 {
            std / ideal_share * 100.0
        } else {
            0.0
        };
        let max_min_ratio = if min > 0.0 { max / min } else { f64::INFINITY };

        let mut metrics = Self {
            local_id,
            total_requests,
            distinct_targets,
            ideal_share,
            cv,
            rsd_pct,
            max_min_ratio,
            composite_score: 0.0,
            target_counts,
        };
        metrics.composite_score =
            (metrics.cv_score() + metrics.rsd_score() + metrics.ratio_score()) / 3.0;
        Some(metrics)
    }

    pub fn cv_score(&self) -> f64 {
        sub_score(100.0 - self.cv * 500.0)
    }

    pub fn rsd_score(&self) -> f64 {
        sub_score(100.0 - self.rsd_pct * 2.5)
    }

    pub fn ratio_score(&self) -> f64 {
        sub_score(100.0 - (self.max_min_ratio - 1.0) * 50.0)
    }

    /// Share of all requests of this local XPU dispatched to `target_id`, in percent.
    pub fn share_pct(&self, target_id: u32) -> f64 {
        let count = self.target_counts.get(&target_id).copied().unwrap_or(0);
        count as f64 / self.total_requests as f64 * 100.0
    }

    /// Deviation of the count of `target_id` from the ideal share, in percent.
    pub fn deviation_pct(&self, target_id: u32) -> f64 {
        let count = self.target_counts.get(&target_id).copied().unwrap_or(0);
        (count as f64 - self.ideal_share) / self.ideal_share * 100.0
    }
}

fn sub_score(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 100.0)
    }
}

/// Compute the fairness metrics of every local id in `counts`, ordered by local id.
pub fn compute_fairness(counts: &TargetCounts) -> Vec<FairnessMetrics> {
    counts
        .local_ids()
        .into_iter()
        .filter_map(|local_id| FairnessMetrics::from_counts(local_id, counts.for_local(local_id)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Assessment {
    #[strum(serialize = "EXCELLENT: Load balancing is working very well")]
    Excellent,
    #[strum(serialize = "GOOD: Load balancing is working reasonably well")]
    Good,
    #[strum(serialize = "POOR: Load balancing needs improvement")]
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Recommendation {
    #[strum(serialize = "Consider using a different hash algorithm or larger prime number")]
    HashAlgorithm,
    #[strum(serialize = "Check if hash seeds are properly distributed across XPUs")]
    HashSeeds,
    #[strum(serialize = "Consider increasing the number of SUE clients")]
    MoreSues,
    #[strum(serialize = "Verify that all SUE clients are properly registered")]
    RegisteredSues,
}

/// Averages over all local XPUs and the resulting verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetSummary {
    pub avg_cv: f64,
    pub avg_rsd_pct: f64,
    pub avg_max_min_ratio: f64,
    pub avg_score: f64,
    pub assessment: Assessment,
    pub recommendations: Vec<Recommendation>,
}

impl FleetSummary {
    /// Summarize the metrics of all local XPUs. Returns `None` if `metrics` is empty.
    pub fn new(metrics: &[FairnessMetrics]) -> Option<Self> {
        use thresholds::*;
        if metrics.is_empty() {
            return None;
        }
        let avg_cv = Statistics::mean(metrics.iter().map(|m| m.cv));
        let avg_rsd_pct = Statistics::mean(metrics.iter().map(|m| m.rsd_pct));
        let avg_max_min_ratio = Statistics::mean(metrics.iter().map(|m| m.max_min_ratio));
        let avg_score = Statistics::mean(metrics.iter().map(|m| m.composite_score));

        let assessment =
            if avg_cv < CV_GOOD && avg_rsd_pct < RSD_GOOD && avg_max_min_ratio < RATIO_GOOD {
                Assessment::Excellent
            } else if avg_cv < CV_FAIR && avg_rsd_pct < RSD_FAIR && avg_max_min_ratio < RATIO_FAIR
            {
                Assessment::Good
            } else {
                Assessment::Poor
            };

        let mut recommendations = Vec::new();
        if avg_cv > CV_FAIR {
            recommendations.push(Recommendation::HashAlgorithm);
        }
        if avg_rsd_pct > RSD_FAIR {
            recommendations.push(Recommendation::HashSeeds);
        }
        if avg_max_min_ratio > RATIO_FAIR {
            recommendations.push(Recommendation::MoreSues);
            recommendations.push(Recommendation::RegisteredSues);
        }

        Some(Self {
            avg_cv,
            avg_rsd_pct,
            avg_max_min_ratio,
            avg_score,
            assessment,
            recommendations,
        })
    }
}

/// Value ranges and record counts of a load balancing log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataOverview {
    pub total_records: usize,
    pub local_ids: BTreeSet<u32>,
    pub dest_ids: BTreeSet<u32>,
    pub vc_ids: BTreeSet<u32>,
    pub sue_ids: BTreeSet<u32>,
    pub records_per_local: BTreeMap<u32, usize>,
}

impl DataOverview {
    pub fn new<'a>(records: impl IntoIterator<Item = &'a LoadBalanceRecord>) -> Self {
        let mut overview = Self::default();
        for r in records {
            overview.total_records += 1;
            overview.local_ids.insert(r.local_xpu_id);
            overview.dest_ids.insert(r.dest_xpu_id);
            overview.vc_ids.insert(r.vc_id);
            overview.sue_ids.insert(r.sue_id);
            *overview.records_per_local.entry(r.local_xpu_id).or_insert(0) += 1;
        }
        overview
    }

    pub fn log(&self) {
        fn range(ids: &BTreeSet<u32>) -> String {
            match (ids.first(), ids.last()) {
                (Some(lo), Some(hi)) => format!("{lo} - {hi}"),
                _ => "-".to_string(),
            }
        }
        log::info!("Data overview: {} records", self.total_records);
        log::info!("  Local XPU range: {}", range(&self.local_ids));
        log::info!("  Destination XPU range: {}", range(&self.dest_ids));
        log::info!("  VC ID range: {}", range(&self.vc_ids));
        log::info!("  SUE ID range: {}", range(&self.sue_ids));
        for (local, n) in &self.records_per_local {
            log::info!("  XPU{local}: {n} records");
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct MetricsRow {
    #[serde(rename = "LocalXpuId")]
    local_id: u32,
    #[serde(rename = "TotalRequests")]
    total_requests: usize,
    #[serde(rename = "NumSues")]
    distinct_targets: usize,
    #[serde(rename = "IdealPerSue")]
    ideal_share: f64,
    #[serde(rename = "CV")]
    cv: f64,
    #[serde(rename = "RSD(%)")]
    rsd_pct: f64,
    #[serde(rename = "MaxMinRatio")]
    max_min_ratio: f64,
    #[serde(rename = "CvScore")]
    cv_score: f64,
    #[serde(rename = "RsdScore")]
    rsd_score: f64,
    #[serde(rename = "RatioScore")]
    ratio_score: f64,
    #[serde(rename = "FairnessScore")]
    composite_score: f64,
}

impl From<&FairnessMetrics> for MetricsRow {
    fn from(m: &FairnessMetrics) -> Self {
        Self {
            local_id: m.local_id,
            total_requests: m.total_requests,
            distinct_targets: m.distinct_targets,
            ideal_share: m.ideal_share,
            cv: m.cv,
            rsd_pct: m.rsd_pct,
            max_min_ratio: m.max_min_ratio,
            cv_score: m.cv_score(),
            rsd_score: m.rsd_score(),
            ratio_score: m.ratio_score(),
            composite_score: m.composite_score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct TargetCountRow {
    #[serde(rename = "LocalXpuId")]
    local_id: u32,
    #[serde(rename = "SueId")]
    target_id: u32,
    #[serde(rename = "Count")]
    count: usize,
}

/// Write one row per local XPU with all metrics and sub-scores.
pub fn write_metrics_csv(
    path: impl AsRef<Path>,
    metrics: &[FairnessMetrics],
) -> Result<usize, ReportError> {
    report::write_csv(path, metrics.iter().map(MetricsRow::from))
}

/// Write the per-target counts of all local XPUs.
pub fn write_target_counts_csv(
    path: impl AsRef<Path>,
    metrics: &[FairnessMetrics],
) -> Result<usize, ReportError> {
    report::write_csv(
        path,
        metrics.iter().flat_map(|m| {
            m.target_counts
                .iter()
                .map(move |(target_id, count)| TargetCountRow {
                    local_id: m.local_id,
                    target_id: *target_id,
                    count: *count,
                })
        }),
    )
}

/// Read back the counts written by [`write_target_counts_csv`].
pub fn read_target_counts_csv(path: impl AsRef<Path>) -> Result<TargetCounts, ReportError> {
    let mut reader = csv::Reader::from_path(path)?;
    reader
        .deserialize::<TargetCountRow>()
        .map(|row| {
            row.map(|r| ((r.local_id, r.target_id), r.count))
                .map_err(ReportError::from)
        })
        .collect()
}

/// Dump the counts as JSON, keyed by `(local_id, target_id)`.
pub fn write_target_counts_json(
    path: impl AsRef<Path>,
    counts: &TargetCounts,
) -> Result<(), ReportError> {
    let map: SerializeTupleMap<(u32, u32), usize> = counts.0.clone().into();
    std::fs::write(path.as_ref(), serde_json::to_string_pretty(&map)?)?;
    Ok(())
}

/// Build the detailed text report.
pub fn build_report(
    overview: &DataOverview,
    metrics: &[FairnessMetrics],
    summary: &FleetSummary,
) -> TextReport {
    let mut report = TextReport::new("LoadBalancer Analysis Report");
    report
        .line(format!(
            "Generated: {}",
            sue_perf_utils::other::get_report_timestamp()
        ))
        .line(format!("Total Records: {}", overview.total_records))
        .line(format!("Local XPUs: {}", fmt_ids(&overview.local_ids)))
        .line(format!("SUE IDs: {}", fmt_ids(&overview.sue_ids)))
        .line(format!("VC IDs: {}", fmt_ids(&overview.vc_ids)))
        .blank()
        .section("DETAILED ANALYSIS BY LOCAL XPU")
        .blank();

    for m in metrics {
        report
            .line(format!("Local XPU {}:", m.local_id))
            .field(1, "Total Requests", m.total_requests)
            .field(1, "Number of SUEs", m.distinct_targets)
            .field(1, "Ideal per SUE", format!("{:.1}", m.ideal_share))
            .field(1, "Coefficient of Variation", format!("{:.4}", m.cv))
            .field(1, "Relative Standard Deviation", format!("{:.2}%", m.rsd_pct))
            .field(1, "Max/Min Ratio", format!("{:.2}", m.max_min_ratio))
            .field(1, "Fairness Score", format!("{:.1}", m.composite_score))
            .line("  SUE Distribution:");
        for (target_id, count) in &m.target_counts {
            report.line(format!(
                "    SUE {target_id}: {count} requests ({:.1}%, {:+.1}% from ideal)",
                m.share_pct(*target_id),
                m.deviation_pct(*target_id)
            ));
        }
        report.blank();
    }

    report
        .section("SUMMARY AND RECOMMENDATIONS")
        .blank()
        .line("Overall Performance:")
        .field(1, "Average CV", format!("{:.4}", summary.avg_cv))
        .field(1, "Average RSD", format!("{:.2}%", summary.avg_rsd_pct))
        .field(
            1,
            "Average Max/Min Ratio",
            format!("{:.2}", summary.avg_max_min_ratio),
        )
        .field(1, "Average Fairness Score", format!("{:.1}", summary.avg_score))
        .blank()
        .line("Assessment:")
        .line(format!("  {}", summary.assessment))
        .blank()
        .line("Recommendations:");
    if summary.recommendations.is_empty() {
        report.line("  - None");
    }
    for r in &summary.recommendations {
        report.line(format!("  - {r}"));
    }
    report
}

/// Draw all load balancing charts. Failures are counted by the writer.
pub fn render_charts(counts: &TargetCounts, metrics: &[FairnessMetrics], charts: &mut ChartWriter) {
    use thresholds::*;

    // distribution of the per-SUE counts of each local XPU
    let mut plot = Plot::new();
    for m in metrics {
        let values = m.target_counts.values().map(|c| *c as f64).collect_vec();
        plot.add_trace(
            BoxPlot::<f64, f64>::new(values).name(&format!(
                "XPU{} (CV {:.3}, RSD {:.1}%, Max/Min {:.2})",
                m.local_id, m.cv, m.rsd_pct, m.max_min_ratio
            )),
        );
    }
    charts.write(
        "load_balance_boxplot.html",
        plot,
        "LoadBalancer SUE Distribution Analysis",
        "Local XPU",
        "Requests per SUE",
    );

    // pivot of local XPU x SUE, absent combinations shown as zero
    let local_ids = counts.local_ids();
    let target_ids = counts.target_ids();
    let z = local_ids
        .iter()
        .map(|l| {
            target_ids
                .iter()
                .map(|t| counts.get(*l, *t) as f64)
                .collect_vec()
        })
        .collect_vec();
    let mut plot = Plot::new();
    plot.add_trace(HeatMap::new(
        target_ids.iter().map(|t| format!("SUE{t}")).collect_vec(),
        local_ids.iter().map(|l| format!("XPU{l}")).collect_vec(),
        z,
    ));
    charts.write(
        "load_balance_heatmap.html",
        plot,
        "LoadBalancer Distribution Heatmap",
        "SUE ID",
        "Local XPU ID",
    );

    let xs = metrics.iter().map(|m| m.local_id as f64).collect_vec();
    let (x0, x1) = match (xs.first(), xs.last()) {
        (Some(a), Some(b)) => (a - 0.5, b + 0.5),
        _ => (0.0, 1.0),
    };
    type BarStyle = (
        &'static str,
        &'static str,
        &'static str,
        fn(&FairnessMetrics) -> f64,
        bool,
    );
    let bars: [(BarStyle, f64, f64); 4] = [
        (
            (
                "load_balance_fairness_cv.html",
                "Coefficient of Variation (Lower is Better)",
                "CV Value",
                |m| m.cv,
                false,
            ),
            CV_GOOD,
            CV_FAIR,
        ),
        (
            (
                "load_balance_fairness_rsd.html",
                "Relative Standard Deviation (Lower is Better)",
                "RSD (%)",
                |m| m.rsd_pct,
                false,
            ),
            RSD_GOOD,
            RSD_FAIR,
        ),
        (
            (
                "load_balance_fairness_ratio.html",
                "Max/Min Ratio (Closer to 1 is Better)",
                "Max/Min Ratio",
                |m| m.max_min_ratio,
                false,
            ),
            RATIO_GOOD,
            RATIO_FAIR,
        ),
        (
            (
                "load_balance_fairness_score.html",
                "Overall Fairness Score (Higher is Better)",
                "Score (0-100)",
                |m| m.composite_score,
                true,
            ),
            SCORE_GOOD,
            SCORE_FAIR,
        ),
    ];
    for ((file, title, y_label, value, higher_better), good, fair) in bars {
        let mut plot = Plot::new();
        for m in metrics {
            let v = value(m);
            let color = if higher_better {
                chart::rate_higher_better(v, good, fair)
            } else {
                chart::rate_lower_better(v, good, fair)
            };
            plot.add_trace(
                plotly::Bar::new(vec![m.local_id as f64], vec![v])
                    .name(&format!("XPU{}: {v:.2}", m.local_id))
                    .marker(Marker::new().color(color)),
            );
        }
        plot.add_trace(chart::threshold_line(
            &format!("Good ({good})"),
            x0,
            x1,
            good,
            chart::COLOR_GOOD,
        ));
        plot.add_trace(chart::threshold_line(
            &format!("Fair ({fair})"),
            x0,
            x1,
            fair,
            chart::COLOR_FAIR,
        ));
        charts.write(file, plot, title, "Local XPU ID", y_label);
    }
}

/// Everything computed by one load balancing analysis.
#[derive(Debug, Clone)]
pub struct FairnessOutcome {
    pub overview: DataOverview,
    pub counts: TargetCounts,
    pub metrics: Vec<FairnessMetrics>,
    pub summary: FleetSummary,
    pub files: Vec<PathBuf>,
}

/// Run the complete load balancing analysis on `records` and write all artifacts to `output_dir`.
///
/// Returns `Ok(None)` if no record passes the filter. In that case, nothing is written.
pub fn analyze(
    records: &[LoadBalanceRecord],
    filter: &RecordFilter,
    output_dir: &Path,
    charts: &mut ChartWriter,
) -> Result<Option<FairnessOutcome>, ReportError> {
    let overview = DataOverview::new(records.iter().filter(|r| filter.matches(r)));
    let counts = TargetCounts::from_records(records, filter);
    if counts.is_empty() {
        log::warn!("No load balancing records left after filtering, skipping analysis");
        return Ok(None);
    }
    overview.log();

    log::info!("Calculating load balancing metrics...");
    let metrics = compute_fairness(&counts);
    let Some(summary) = FleetSummary::new(&metrics) else {
        return Ok(None);
    };

    log::info!("Generating visualization charts...");
    render_charts(&counts, &metrics, charts);

    log::info!("Generating analysis report...");
    let report_path = output_dir.then("load_balance_analysis_report.txt");
    build_report(&overview, &metrics, &summary).write(&report_path)?;
    let metrics_path = output_dir.then("load_balance_metrics.csv");
    write_metrics_csv(&metrics_path, &metrics)?;
    let counts_path = output_dir.then("load_balance_target_counts.csv");
    write_target_counts_csv(&counts_path, &metrics)?;
    let json_path = output_dir.then("target_counts.json");
    write_target_counts_json(&json_path, &counts)?;

    Ok(Some(FairnessOutcome {
        overview,
        counts,
        metrics,
        summary,
        files: vec![report_path, metrics_path, counts_path, json_path],
    }))
}

impl fmt::Display for FairnessMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "XPU{}: {} requests over {} SUEs, CV {:.4}, RSD {:.2}%, Max/Min {:.2}, score {:.1}",
            self.local_id,
            self.total_requests,
            self.distinct_targets,
            self.cv,
            self.rsd_pct,
            self.max_min_ratio,
            self.composite_score
        )
    }
}
