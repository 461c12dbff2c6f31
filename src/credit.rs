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
//! Link-layer credits of the XPU and switch devices.

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use itertools::Itertools;
use mac_address::MacAddress;
use plotly::{common::Mode, Plot, Scatter};
use serde::Serialize;
use statrs::statistics::Statistics;

use crate::{
    chart::ChartWriter,
    records::{CreditRecord, PerformanceRecord},
    report::{self, ReportError, TextReport},
    stats::{round2, sample_std_dev},
    throughput::Node,
    util::PathBufExt,
};

/// Number of devices of every XPU and every switch.
pub const DEVICES_PER_NODE: u8 = 8;

/// Names of the devices owning a MAC address, as assigned by the simulator topology.
///
/// XPU devices use odd addresses: `xpu * 0x10 + (dev - 1) * 2 + 1`. Switch devices use even
/// addresses, interleaved in segments of two devices per switch: devices 1 and 2 of switch `s`
/// start at `s * 4 + 2`, devices 3 and 4 at `0x10 + s * 4 + 2`, and so on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceMap(HashMap<MacAddress, String>);

fn mac(last_byte: u8) -> MacAddress {
    MacAddress::new([0, 0, 0, 0, 0, last_byte])
}

impl DeviceMap {
    pub fn new(xpu_count: u8) -> Self {
        let mut map = HashMap::new();
        for xpu in 0..xpu_count {
            for dev in 1..=DEVICES_PER_NODE {
                let last = xpu.wrapping_mul(0x10).wrapping_add((dev - 1) * 2 + 1);
                map.insert(mac(last), format!("XPU{xpu} Dev{dev}"));
            }
        }
        for switch in 0..xpu_count {
            for dev in 1..=DEVICES_PER_NODE {
                let (segment, offset) = match dev {
                    1..=2 => (0x00, dev),
                    3..=4 => (0x10, dev - 2),
                    5..=6 => (0x20, dev - 4),
                    _ => (0x30, dev - 6),
                };
                let last = switch
                    .wrapping_mul(4)
                    .wrapping_add(segment)
                    .wrapping_add(offset * 2);
                map.insert(mac(last), format!("Switch{} Dev{dev}", switch + 1));
            }
        }
        Self(map)
    }

    /// Name of the device with the given address.
    pub fn name(&self, mac: Option<MacAddress>) -> String {
        match mac {
            Some(mac) => self
                .0
                .get(&mac)
                .cloned()
                .unwrap_or_else(|| format!("Unknown ({mac})")),
            None => "Unknown (0)".to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Credit records of older simulator versions, which logged them as `Tx` rows of the performance
/// log.
pub fn legacy_credits(records: &[PerformanceRecord]) -> Vec<CreditRecord> {
    records
        .iter()
        .filter_map(CreditRecord::from_legacy)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeCreditStats {
    pub min: i64,
    pub max: i64,
    pub mean: f64,
    /// Sample standard deviation.
    pub std_dev: f64,
}

impl NodeCreditStats {
    pub fn new<'a>(records: impl IntoIterator<Item = &'a CreditRecord>) -> Option<Self> {
        let credits = records.into_iter().map(|r| r.credits).collect_vec();
        let values = credits.iter().map(|c| *c as f64).collect_vec();
        Some(Self {
            min: *credits.iter().min()?,
            max: *credits.iter().max()?,
            mean: Statistics::mean(&values),
            std_dev: sample_std_dev(&values),
        })
    }
}

/// Credit statistics of one `(node, device, vc)`, rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CreditStatsRow {
    #[serde(rename = "XpuId")]
    pub xpu_id: u32,
    #[serde(rename = "DeviceId")]
    pub device_id: u32,
    #[serde(rename = "VCId")]
    pub vc_id: u32,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

pub fn credit_stats<'a>(
    records: impl IntoIterator<Item = &'a CreditRecord>,
) -> Vec<CreditStatsRow> {
    crate::stats::group_values(
        records
            .into_iter()
            .map(|r| ((r.xpu_id, r.device_id, r.vc_id), r.credits as f64)),
    )
    .into_iter()
    .map(|((xpu_id, device_id, vc_id), values)| CreditStatsRow {
        xpu_id,
        device_id,
        vc_id,
        count: values.len(),
        mean: round2(Statistics::mean(&values)),
        std: round2(sample_std_dev(&values)),
        min: round2(Statistics::min(&values)),
        max: round2(Statistics::max(&values)),
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreditConfig {
    pub xpu_count: u32,
    /// Only plot the XPU credits of these virtual channels.
    pub vc_ids: Option<Vec<u32>>,
}

/// File name of the XPU credit chart, encoding the plotted VCs.
pub fn chart_file_name(vc_ids: Option<&[u32]>) -> String {
    match vc_ids {
        Some(ids) => format!("credit_value_changes_vc{}.html", ids.iter().join("_")),
        None => "credit_value_changes.html".to_string(),
    }
}

fn series<'a>(records: impl IntoIterator<Item = &'a CreditRecord>) -> (Vec<f64>, Vec<f64>) {
    records
        .into_iter()
        .sorted_by(|a, b| a.time_ns.total_cmp(&b.time_ns))
        .map(|r| (r.time_ns / 1e9, r.credits as f64))
        .unzip()
}

fn render_charts(
    records: &[CreditRecord],
    config: &CreditConfig,
    devices: &DeviceMap,
    charts: &mut ChartWriter,
) {
    let xpu_count = config.xpu_count;
    let xpu_records = records
        .iter()
        .filter(|r| r.xpu_id <= xpu_count)
        .filter(|r| config.vc_ids.as_ref().map_or(true, |ids| ids.contains(&r.vc_id)))
        .collect_vec();
    if xpu_records.is_empty() {
        log::warn!("No XPU credit data available for VCs {:?}", config.vc_ids);
    } else {
        let mut plot = Plot::new();
        let groups = xpu_records
            .into_iter()
            .into_group_map_by(|r| (r.xpu_id, r.device_id, r.vc_id));
        for ((xpu_id, device_id, vc_id), group) in groups.into_iter().sorted_by_key(|(k, _)| *k) {
            let (xs, ys) = series(group);
            plot.add_trace(
                Scatter::new(xs, ys)
                    .name(&format!("XPU {xpu_id} Dev{device_id} VC{vc_id}"))
                    .mode(Mode::Lines),
            );
        }
        let mut title = "Link Layer Credit Value Changes Over Time".to_string();
        if let Some(ids) = &config.vc_ids {
            title.push_str(&format!(" (VCs: {})", ids.iter().join(", ")));
        }
        charts.write(
            &chart_file_name(config.vc_ids.as_deref()),
            plot,
            &title,
            "Time (seconds)",
            "Credit Value",
        );
    }

    let switch_groups = records
        .iter()
        .filter(|r| r.xpu_id > xpu_count)
        .into_group_map_by(|r| (r.xpu_id, r.device_id, devices.name(r.mac_address), r.vc_id));
    if switch_groups.is_empty() {
        log::warn!("No switch credit data available for plotting");
        return;
    }
    let mut plot = Plot::new();
    for ((xpu_id, device_id, target, vc_id), group) in switch_groups
        .into_iter()
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
    {
        let (xs, ys) = series(group);
        let node = Node::new(xpu_id, xpu_count);
        plot.add_trace(
            Scatter::new(xs, ys)
                .name(&format!("{node} Dev{device_id} -> {target} VC{vc_id}"))
                .mode(Mode::Lines),
        );
    }
    charts.write(
        "switch_credit_value_changes.html",
        plot,
        "Switch Credit Value Changes Over Time",
        "Time (seconds)",
        "Credit Value",
    );
}

fn build_report(records: &[CreditRecord], xpu_count: u32) -> TextReport {
    let mut report = TextReport::default();
    report
        .line("Link Layer Credit Analysis Report")
        .line("=".repeat(50))
        .line(format!(
            "Analysis Time: {}",
            sue_perf_utils::other::get_report_timestamp()
        ))
        .line(format!("Total Credit Records: {}", records.len()))
        .blank();

    let per_node: BTreeMap<u32, Vec<&CreditRecord>> = records
        .iter()
        .map(|r| (r.xpu_id, r))
        .into_group_map()
        .into_iter()
        .collect();
    for (heading, is_xpu) in [
        ("XPU Credit Statistics:", true),
        ("Switch Credit Statistics:", false),
    ] {
        let nodes = per_node
            .iter()
            .filter(|(id, _)| (**id <= xpu_count) == is_xpu)
            .collect_vec();
        if nodes.is_empty() {
            continue;
        }
        report.line(heading).line("-".repeat(30));
        for (id, group) in nodes {
            let Some(stats) = NodeCreditStats::new(group.iter().copied()) else {
                continue;
            };
            report
                .line(format!("  {}:", Node::new(*id, xpu_count)))
                .field(2, "Min Credit", stats.min)
                .field(2, "Max Credit", stats.max)
                .field(2, "Avg Credit", format!("{:.2}", stats.mean))
                .field(2, "Std Dev", format!("{:.2}", stats.std_dev))
                .blank();
        }
    }
    report
}

#[derive(Debug, Clone, Default)]
pub struct CreditOutcome {
    pub xpu_stats: Vec<CreditStatsRow>,
    pub switch_stats: Vec<CreditStatsRow>,
    pub files: Vec<PathBuf>,
}

/// Analyze the credit records. Returns `Ok(None)` if there are none.
pub fn analyze(
    records: &[CreditRecord],
    config: &CreditConfig,
    output_dir: &Path,
    charts: &mut ChartWriter,
) -> Result<Option<CreditOutcome>, ReportError> {
    if records.is_empty() {
        log::warn!("Credit data is empty");
        return Ok(None);
    }
    log::info!("Analyzing XPU count: {}", config.xpu_count);
    let devices = DeviceMap::new(u8::try_from(config.xpu_count).unwrap_or(u8::MAX));

    let mut outcome = CreditOutcome {
        xpu_stats: credit_stats(records.iter().filter(|r| r.xpu_id <= config.xpu_count)),
        switch_stats: credit_stats(records.iter().filter(|r| r.xpu_id > config.xpu_count)),
        files: Vec::new(),
    };

    let path = output_dir.then("credit_analysis_report.txt");
    build_report(records, config.xpu_count).write(&path)?;
    outcome.files.push(path);
    for (name, rows) in [
        ("xpu_credit_statistics.csv", &outcome.xpu_stats),
        ("switch_credit_statistics.csv", &outcome.switch_stats),
    ] {
        if rows.is_empty() {
            continue;
        }
        let path = output_dir.then(name);
        report::write_csv(&path, rows)?;
        outcome.files.push(path);
    }

    render_charts(records, config, &devices, charts);
    Ok(Some(outcome))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chart::ChartStyle;

    fn rec(xpu_id: u32, device_id: u32, vc_id: u32, credits: i64, time_ns: f64) -> CreditRecord {
        CreditRecord {
            time_ns,
            xpu_id,
            device_id,
            vc_id,
            direction: "Tx".to_string(),
            credits,
            mac_address: Some(mac(0x02)),
        }
    }

    #[test]
    fn mac_mapping() {
        let map = DeviceMap::new(4);
        assert_eq!(map.len(), 64);
        assert_eq!(map.name(Some(mac(0x01))), "XPU0 Dev1");
        assert_eq!(map.name(Some(mac(0x3f))), "XPU3 Dev8");
        assert_eq!(map.name(Some(mac(0x02))), "Switch1 Dev1");
        assert_eq!(map.name(Some(mac(0x12))), "Switch1 Dev3");
        assert_eq!(map.name(Some(mac(0x0a))), "Switch3 Dev1");
        assert_eq!(map.name(Some(mac(0x40))), "Switch4 Dev8");
        assert!(map.name(Some(mac(0xff))).starts_with("Unknown ("));
        assert_eq!(map.name(None), "Unknown (0)");
    }

    #[test]
    fn statistics() {
        let records = vec![
            rec(1, 1, 0, 10, 3.0),
            rec(1, 1, 0, 20, 1.0),
            rec(1, 2, 0, 7, 1.0),
            rec(5, 1, 1, 3, 1.0),
        ];
        let rows = credit_stats(records.iter().filter(|r| r.xpu_id <= 4));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].mean, 15.0);
        assert_eq!(rows[0].std, 7.07);
        assert_eq!(rows[1].std, 0.0);

        let node = NodeCreditStats::new(records.iter().filter(|r| r.xpu_id == 1)).unwrap();
        assert_eq!((node.min, node.max), (7, 20));
        assert!((node.mean - 37.0 / 3.0).abs() < 1e-9);

        let report = build_report(&records, 4).render();
        assert!(report.contains("  XPU 1:\n    Min Credit: 7\n    Max Credit: 20\n"));
        assert!(report.contains("  Switch 1:"));
    }

    #[test]
    fn chart_names() {
        assert_eq!(chart_file_name(None), "credit_value_changes.html");
        assert_eq!(chart_file_name(Some(&[0, 2])), "credit_value_changes_vc0_2.html");
    }

    #[test]
    fn writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut charts = ChartWriter::new(dir.path(), ChartStyle::default());
        let records = vec![rec(1, 1, 0, 10, 3.0), rec(6, 1, 1, 3, 1.0)];
        let config = CreditConfig {
            xpu_count: 4,
            vc_ids: Some(vec![0]),
        };
        let out = analyze(&records, &config, dir.path(), &mut charts)
            .unwrap()
            .unwrap();
        assert_eq!(out.files.len(), 3);
        assert!(dir.path().join("credit_value_changes_vc0.html").exists());
        assert!(dir.path().join("switch_credit_value_changes.html").exists());
        let csv = std::fs::read_to_string(dir.path().join("xpu_credit_statistics.csv")).unwrap();
        assert!(csv.starts_with("XpuId,DeviceId,VCId,count,mean,std,min,max\n"));
        assert!(analyze(&[], &config, dir.path(), &mut charts).unwrap().is_none());
    }
}
