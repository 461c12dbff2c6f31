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
//! Module defining record data types to deserialize the CSV logs written by SUE-Sim.
use std::str::FromStr;

use mac_address::MacAddress;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

/// A record type stored as one row of a CSV log with a header line.
pub trait CsvSchema: DeserializeOwned {
    /// Columns that must be present in the header of the log.
    const COLUMNS: &'static [&'static str];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
/// One load balancing decision: which SUE was selected for a request from a local XPU.
pub struct LoadBalanceRecord {
    #[serde(rename = "LocalXpuId")]
    pub local_xpu_id: u32,
    #[serde(rename = "DestXpuId")]
    pub dest_xpu_id: u32,
    #[serde(rename = "VcId")]
    pub vc_id: u32,
    #[serde(rename = "SueId")]
    pub sue_id: u32,
}

impl CsvSchema for LoadBalanceRecord {
    const COLUMNS: &'static [&'static str] = &["LocalXpuId", "DestXpuId", "VcId", "SueId"];
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
/// End-to-end delay of a single packet received by an XPU.
pub struct DelayRecord {
    #[serde(rename = "TimeNs")]
    pub time_ns: f64,
    #[serde(rename = "XpuId")]
    pub xpu_id: u32,
    #[serde(rename = "PortId")]
    pub port_id: u32,
    #[serde(rename = "Delay(ns)")]
    pub delay_ns: f64,
}

impl CsvSchema for DelayRecord {
    const COLUMNS: &'static [&'static str] = &["TimeNs", "XpuId", "PortId", "Delay(ns)"];
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
/// Time a packet waited in the transaction layer before being packed.
pub struct WaitTimeRecord {
    #[serde(rename = "XpuId")]
    pub xpu_id: u32,
    #[serde(rename = "WaitTime(ns)")]
    pub wait_time_ns: f64,
}

impl CsvSchema for WaitTimeRecord {
    const COLUMNS: &'static [&'static str] = &["XpuId", "WaitTime(ns)"];
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
/// Number of transactions packed into one packet.
pub struct PackNumRecord {
    #[serde(rename = "XpuId")]
    pub xpu_id: u32,
    #[serde(rename = "PackNums")]
    pub pack_nums: f64,
}

impl CsvSchema for PackNumRecord {
    const COLUMNS: &'static [&'static str] = &["XpuId", "PackNums"];
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    strum::Display,
)]
/// Kind of a row in the performance log. Throughput rows carry a rate, drop rows a counter.
pub enum Direction {
    Tx,
    Rx,
    #[serde(rename = "APP")]
    #[strum(serialize = "APP")]
    App,
    AppXpuSendDrop,
    LinkReceiveDrop,
    LinkSendDrop,
    #[serde(other)]
    Other,
}

impl Direction {
    /// Directions counting dropped packets instead of a rate.
    pub const DROPS: [Direction; 3] = [
        Direction::AppXpuSendDrop,
        Direction::LinkReceiveDrop,
        Direction::LinkSendDrop,
    ];

    pub fn is_link(&self) -> bool {
        matches!(self, Self::Tx | Self::Rx)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
/// One sample of the performance log (throughput, application rate, or drop counter).
pub struct PerformanceRecord {
    /// Simulation time in nanoseconds.
    #[serde(rename = "Time")]
    pub time: f64,
    #[serde(rename = "XpuId")]
    pub xpu_id: u32,
    #[serde(rename = "DeviceId")]
    pub device_id: u32,
    #[serde(rename = "VCId")]
    pub vc_id: u32,
    #[serde(rename = "Direction")]
    pub direction: Direction,
    #[serde(rename = "Rate")]
    pub rate: f64,
    #[serde(rename = "MacAddress", default, deserialize_with = "deserialize_mac")]
    pub mac_address: Option<MacAddress>,
}

impl CsvSchema for PerformanceRecord {
    const COLUMNS: &'static [&'static str] = &[
        "Time",
        "XpuId",
        "DeviceId",
        "VCId",
        "Direction",
        "Rate",
        "MacAddress",
    ];
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
/// Link-layer credits available towards a peer device on one virtual channel.
pub struct CreditRecord {
    #[serde(rename = "TimeNs")]
    pub time_ns: f64,
    #[serde(rename = "XpuId")]
    pub xpu_id: u32,
    #[serde(rename = "DeviceId")]
    pub device_id: u32,
    #[serde(rename = "VCId")]
    pub vc_id: u32,
    #[serde(rename = "Direction")]
    pub direction: String,
    #[serde(rename = "Credits")]
    pub credits: i64,
    #[serde(rename = "MacAddress", default, deserialize_with = "deserialize_mac")]
    pub mac_address: Option<MacAddress>,
}

impl CsvSchema for CreditRecord {
    const COLUMNS: &'static [&'static str] = &[
        "TimeNs",
        "XpuId",
        "DeviceId",
        "VCId",
        "Direction",
        "Credits",
        "MacAddress",
    ];
}

impl CreditRecord {
    /// Older simulator versions logged credits as `Tx` rows of the performance log.
    pub fn from_legacy(record: &PerformanceRecord) -> Option<Self> {
        (record.direction == Direction::Tx).then(|| Self {
            time_ns: record.time,
            xpu_id: record.xpu_id,
            device_id: record.device_id,
            vc_id: record.vc_id,
            direction: record.direction.to_string(),
            credits: record.rate.trunc() as i64,
            mac_address: record.mac_address,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
/// Occupancy of a per-destination queue of a SUE.
pub struct DestinationQueueRecord {
    #[serde(rename = "TimeNs")]
    pub time_ns: f64,
    #[serde(rename = "XpuId")]
    pub xpu_id: u32,
    #[serde(rename = "SueId")]
    pub sue_id: u32,
    #[serde(rename = "DestXpuId")]
    pub dest_xpu_id: u32,
    #[serde(rename = "VcId")]
    pub vc_id: u32,
    #[serde(rename = "CurrentSize")]
    pub current_size: f64,
    #[serde(rename = "MaxSize")]
    pub max_size: f64,
    #[serde(rename = "Utilization(%)")]
    pub utilization: f64,
}

impl CsvSchema for DestinationQueueRecord {
    const COLUMNS: &'static [&'static str] = &[
        "TimeNs",
        "XpuId",
        "SueId",
        "DestXpuId",
        "VcId",
        "CurrentSize",
        "MaxSize",
        "Utilization(%)",
    ];
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    strum::Display,
)]
pub enum QueueType {
    Main,
    #[serde(rename = "VC")]
    #[strum(serialize = "VC")]
    Vc,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
/// Occupancy of the main or a virtual-channel queue of a device.
pub struct DeviceQueueRecord {
    #[serde(rename = "TimeNs")]
    pub time_ns: f64,
    #[serde(rename = "XpuId")]
    pub xpu_id: u32,
    #[serde(rename = "DeviceId")]
    pub device_id: u32,
    #[serde(rename = "QueueType")]
    pub queue_type: QueueType,
    #[serde(rename = "VCId")]
    pub vc_id: u32,
    #[serde(rename = "CurrentSize")]
    pub current_size: f64,
    #[serde(rename = "MaxSize")]
    pub max_size: f64,
    #[serde(rename = "Utilization(%)")]
    pub utilization: f64,
}

impl CsvSchema for DeviceQueueRecord {
    const COLUMNS: &'static [&'static str] = &[
        "TimeNs",
        "XpuId",
        "DeviceId",
        "QueueType",
        "VCId",
        "CurrentSize",
        "MaxSize",
        "Utilization(%)",
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
/// Length of the link-layer processing queue of a device.
pub struct ProcessingQueueRecord {
    #[serde(rename = "TimeNs")]
    pub time_ns: f64,
    #[serde(rename = "XpuId")]
    pub xpu_id: u32,
    #[serde(rename = "DeviceId")]
    pub device_id: u32,
    #[serde(rename = "QueueLength")]
    pub queue_length: f64,
    #[serde(rename = "MaxSize")]
    pub max_size: f64,
    /// Only logged by newer simulator versions.
    #[serde(rename = "Utilization(%)", default)]
    pub utilization: Option<f64>,
}

impl CsvSchema for ProcessingQueueRecord {
    const COLUMNS: &'static [&'static str] =
        &["TimeNs", "XpuId", "DeviceId", "QueueLength", "MaxSize"];
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
/// Number of packets waiting in the SUE buffer of an XPU.
pub struct BufferQueueRecord {
    #[serde(rename = "TimeNs")]
    pub time_ns: f64,
    #[serde(rename = "XpuId")]
    pub xpu_id: u32,
    #[serde(rename = "BufferSize")]
    pub buffer_size: f64,
}

impl CsvSchema for BufferQueueRecord {
    const COLUMNS: &'static [&'static str] = &["TimeNs", "XpuId", "BufferSize"];
}

/// The simulator writes `0` (or nothing) when no peer MAC address is known.
fn deserialize_mac<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<MacAddress>, D::Error> {
    let buf = String::deserialize(deserializer)?;
    let buf = buf.trim();
    if buf.is_empty() || buf == "0" {
        return Ok(None);
    }
    MacAddress::from_str(buf)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse<T: CsvSchema>(data: &str) -> Vec<T> {
        csv::Reader::from_reader(data.as_bytes())
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn performance_rows() {
        let rows: Vec<PerformanceRecord> = parse(
            "Time,XpuId,DeviceId,VCId,Direction,Rate,MacAddress\n\
             1000,1,2,0,Tx,12.5,00:00:00:00:00:03\n\
             2000,5,1,0,LinkSendDrop,3,0\n\
             3000,1,1,0,APP,800,\n\
             4000,1,1,0,Unknown,1,0\n",
        );
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].direction, Direction::Tx);
        assert_eq!(
            rows[0].mac_address,
            Some(MacAddress::new([0, 0, 0, 0, 0, 3]))
        );
        assert_eq!(rows[1].direction, Direction::LinkSendDrop);
        assert_eq!(rows[1].mac_address, None);
        assert_eq!(rows[2].direction, Direction::App);
        assert_eq!(rows[3].direction, Direction::Other);
        assert!(rows[0].direction.is_link());
        assert!(!rows[2].direction.is_link());
    }

    #[test]
    fn legacy_credits() {
        let rows: Vec<PerformanceRecord> = parse(
            "Time,XpuId,DeviceId,VCId,Direction,Rate,MacAddress\n\
             1000,1,2,0,Tx,12.9,0\n\
             2000,1,2,0,Rx,12.9,0\n",
        );
        let credits: Vec<_> = rows.iter().filter_map(CreditRecord::from_legacy).collect();
        assert_eq!(credits.len(), 1);
        assert_eq!(credits[0].credits, 12);
        assert_eq!(credits[0].time_ns, 1000.0);
    }

    #[test]
    fn processing_queue_without_utilization() {
        let rows: Vec<ProcessingQueueRecord> = parse(
            "TimeNs,XpuId,DeviceId,QueueLength,MaxSize\n\
             10,1,1,4,16\n",
        );
        assert_eq!(rows[0].utilization, None);
        let rows: Vec<ProcessingQueueRecord> = parse(
            "TimeNs,XpuId,DeviceId,QueueLength,MaxSize,Utilization(%)\n\
             10,1,1,4,16,25\n",
        );
        assert_eq!(rows[0].utilization, Some(25.0));
    }

    #[test]
    fn device_queue_types() {
        let rows: Vec<DeviceQueueRecord> = parse(
            "TimeNs,XpuId,DeviceId,QueueType,VCId,CurrentSize,MaxSize,Utilization(%)\n\
             10,1,1,Main,0,2,8,25\n\
             10,1,1,VC,3,4,8,50\n",
        );
        assert_eq!(rows[0].queue_type, QueueType::Main);
        assert_eq!(rows[1].queue_type, QueueType::Vc);
        assert_eq!(rows[1].queue_type.to_string(), "VC");
    }
}
