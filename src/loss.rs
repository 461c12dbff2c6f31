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
//! Packet loss computed from the summary lines of the plain-text simulator log.

use std::{
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use regex::Regex;

use crate::{
    config::{DataLayout, LogKind},
    report::{ReportError, TextReport},
    util::PathBufExt,
};

lazy_static::lazy_static! {
    static ref SENT_RE: Regex = Regex::new(r"Sent (\d+) packets").unwrap();
    static ref RECEIVED_RE: Regex = Regex::new(r"Received (\d+) packets").unwrap();
    static ref DROPPED_RE: Regex = Regex::new(r"Dropped (\d+) packets").unwrap();
}

/// Log file names written by the simulator, in order of preference.
pub const PREFERRED_LOG_NAMES: [&str; 2] = ["sue-sim.log", "app.log"];

/// Any of these words marks a log as containing loss data.
const LOSS_KEYWORDS: [&str; 6] = [
    "Summary: Sent",
    "Received",
    "Dropped",
    "Sent",
    "packets",
    "Total",
];

#[derive(Debug, thiserror::Error)]
pub enum LossError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No sent packet data found")]
    NoSentPackets,
    #[error("{0}")]
    Report(#[from] ReportError),
}

/// How to account for packets lost inside the switches, which the simulator does not report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SwitchDropPolicy {
    /// If packets went missing but no receiver dropped any, attribute the difference to drops.
    #[default]
    Infer,
    /// Use the parsed counts as they are.
    Ignore,
}

/// Packet counters summed over all summary lines of a log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LossCounts {
    pub sent: u64,
    pub received: u64,
    pub dropped: u64,
}

fn capture(re: &Regex, line: &str) -> Option<u64> {
    re.captures(line)?.get(1)?.as_str().parse().ok()
}

impl LossCounts {
    /// Sum the counters of all matching lines.
    pub fn parse(reader: impl BufRead) -> Result<Self, std::io::Error> {
        let mut counts = Self::default();
        for line in reader.lines() {
            let line = line?;
            if line.contains("Summary: Sent") {
                counts.sent += capture(&SENT_RE, &line).unwrap_or(0);
            } else if line.contains("Received") && line.contains("Port") {
                counts.received += capture(&RECEIVED_RE, &line).unwrap_or(0);
            } else if line.contains("Dropped") && line.contains("Port") {
                counts.dropped += capture(&DROPPED_RE, &line).unwrap_or(0);
            }
        }
        Ok(counts)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        Self::parse(BufReader::new(fs::File::open(path)?))
    }

    /// Apply the switch drop policy.
    pub fn with_policy(mut self, policy: SwitchDropPolicy) -> Self {
        if policy == SwitchDropPolicy::Infer && self.sent > self.received && self.dropped == 0 {
            self.dropped = self.sent - self.received;
            log::warn!(
                "{} packets went missing without being dropped, counting them as switch drops",
                self.dropped
            );
        }
        self
    }

    pub fn network_loss(&self) -> i64 {
        self.sent as i64 - self.received as i64
    }

    pub fn total_loss(&self) -> i64 {
        self.sent as i64 - (self.received as i64 - self.dropped as i64)
    }

    /// Compute the loss rates. Fails if no packets were sent.
    pub fn rates(&self) -> Result<LossRates, LossError> {
        if self.sent == 0 {
            return Err(LossError::NoSentPackets);
        }
        let sent = self.sent as f64;
        Ok(LossRates {
            network_pct: self.network_loss() as f64 / sent * 100.0,
            receiver_pct: if self.received == 0 {
                0.0
            } else {
                self.dropped as f64 / self.received as f64 * 100.0
            },
            total_pct: self.total_loss() as f64 / sent * 100.0,
        })
    }
}

/// Loss rates in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossRates {
    /// Packets sent but never received, relative to the sent packets.
    pub network_pct: f64,
    /// Packets dropped at the receiver, relative to the received packets.
    pub receiver_pct: f64,
    /// Packets sent but not successfully processed, relative to the sent packets.
    pub total_pct: f64,
}

fn contains_loss_data(path: &Path) -> bool {
    fs::read_to_string(path)
        .map(|content| LOSS_KEYWORDS.iter().any(|k| content.contains(k)))
        .unwrap_or(false)
}

/// Pick the simulator log to analyze in `dir`: a preferred log name with loss data, then any log
/// with loss data, then the newest log.
pub fn find_loss_log_in(dir: impl AsRef<Path>) -> Option<PathBuf> {
    let dir = dir.as_ref();
    let mut logs =
        sue_perf_utils::files::matching_files(dir, LogKind::SimulatorLog.pattern());
    logs.sort();

    if let Some(path) = PREFERRED_LOG_NAMES
        .iter()
        .map(|name| dir.then(name))
        .find(|p| logs.contains(p) && contains_loss_data(p))
    {
        log::info!("Using default log file: {path:?}");
        return Some(path);
    }
    if let Some(path) = logs.iter().find(|p| contains_loss_data(p)) {
        log::info!("Found valid data log file: {path:?}");
        return Some(path.clone());
    }
    let latest = sue_perf_utils::files::newest(logs);
    if let Some(path) = &latest {
        log::warn!("No valid data log files found, using latest log file: {path:?}");
    }
    latest
}

/// Find the simulator log in the first existing log directory of `layout`.
pub fn find_loss_log(layout: &DataLayout) -> Option<PathBuf> {
    let Some(dir) = layout.log_dir(LogKind::SimulatorLog) else {
        log::warn!(
            "No log directory found, attempted paths: {:?}",
            layout.candidate_dirs(LogKind::SimulatorLog)
        );
        return None;
    };
    find_loss_log_in(dir)
}

/// Render the loss report.
pub fn build_report(log_file: &Path, counts: &LossCounts, rates: &LossRates) -> TextReport {
    let mut report = TextReport::default();
    report
        .line(format!(
            "Packet Loss Analysis Report - {}",
            sue_perf_utils::other::get_report_timestamp()
        ))
        .line("=".repeat(40))
        .blank()
        .line(format!("Log File: {}", log_file.display()))
        .blank()
        .line("Analysis Results:")
        .line("-".repeat(20))
        .line(format!("Total Sent Packets: {}", counts.sent))
        .line(format!("Total Received Packets: {}", counts.received))
        .line(format!("Total Dropped Packets: {}", counts.dropped))
        .blank()
        .line("Loss Rates:")
        .line("-".repeat(20))
        .line(format!(
            "Network Transmission Loss Rate: {:.4}%",
            rates.network_pct
        ))
        .line(format!("Receiver Drop Rate: {:.4}%", rates.receiver_pct))
        .line(format!("Total System Loss Rate: {:.4}%", rates.total_pct));
    report
}

/// The rows of `loss_statistics.csv`. Rates are formatted with four decimals.
pub fn statistics_rows(counts: &LossCounts, rates: &LossRates) -> Vec<(String, i64, String)> {
    let sent = counts.sent as f64;
    vec![
        ("Total Sent".into(), counts.sent as i64, format!("{:.4}", 100.0)),
        (
            "Total Received".into(),
            counts.received as i64,
            format!("{:.4}", counts.received as f64 / sent * 100.0),
        ),
        (
            "Total Dropped".into(),
            counts.dropped as i64,
            format!("{:.4}", counts.dropped as f64 / sent * 100.0),
        ),
        (
            "Network Loss".into(),
            counts.network_loss(),
            format!("{:.4}", rates.network_pct),
        ),
        (
            "Receiver Loss".into(),
            counts.dropped as i64,
            format!("{:.4}", rates.receiver_pct),
        ),
        (
            "Total Loss".into(),
            counts.total_loss(),
            format!("{:.4}", rates.total_pct),
        ),
    ]
}

fn write_statistics(
    path: &Path,
    counts: &LossCounts,
    rates: &LossRates,
) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Metric", "Count", "Rate(%)"])?;
    for (metric, count, rate) in statistics_rows(counts, rates) {
        writer.write_record([metric, count.to_string(), rate])?;
    }
    writer.flush()?;
    log::info!("Statistics data saved to: {path:?}");
    Ok(())
}

fn write_error_report(path: &Path, log_file: &Path, error: &LossError) -> Result<(), ReportError> {
    let mut report = TextReport::default();
    report
        .line(format!(
            "Error Analysis Report - {}",
            sue_perf_utils::other::get_report_timestamp()
        ))
        .line("=".repeat(40))
        .blank()
        .line(format!("Log File: {}", log_file.display()))
        .line(format!("Error: {error}"));
    report.write(path)
}

/// Result of a successful loss analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct LossOutcome {
    pub counts: LossCounts,
    pub rates: LossRates,
    pub files: Vec<PathBuf>,
}

/// Analyze `log_file` and write the report and statistics to `output_dir`.
///
/// If the log contains no sent packets, `error_report.txt` is written instead and
/// [`LossError::NoSentPackets`] is returned.
pub fn analyze(
    log_file: &Path,
    policy: SwitchDropPolicy,
    output_dir: &Path,
) -> Result<LossOutcome, LossError> {
    let counts = LossCounts::from_file(log_file)?.with_policy(policy);
    log::debug!("Parsed {counts:?} from {log_file:?}");

    let rates = match counts.rates() {
        Ok(rates) => rates,
        Err(e) => {
            let path = output_dir.then("error_report.txt");
            write_error_report(&path, log_file, &e)?;
            return Err(e);
        }
    };

    let report_path = output_dir.then("loss_analysis_report.txt");
    build_report(log_file, &counts, &rates).write(&report_path)?;
    let csv_path = output_dir.then("loss_statistics.csv");
    write_statistics(&csv_path, &counts, &rates)?;

    Ok(LossOutcome {
        counts,
        rates,
        files: vec![report_path, csv_path],
    })
}

#[cfg(test)]
mod test {
    use super::*;

    const LOG: &str = "\
[0.1s] XPU1 Summary: Sent 600 packets in total
[0.1s] XPU2 Summary: Sent 400 packets in total
[0.2s] XPU1 Port 1 Received 480 packets
[0.2s] XPU2 Port 3 Received 470 packets
[0.2s] XPU1 Port 1 Dropped 10 packets
[0.2s] Received 999 packets without port
[0.3s] some unrelated line
";

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn parse_counts() {
        let counts = LossCounts::parse(LOG.as_bytes()).unwrap();
        assert_eq!(
            counts,
            LossCounts {
                sent: 1000,
                received: 950,
                dropped: 10
            }
        );
        let rates = counts.with_policy(SwitchDropPolicy::Infer).rates().unwrap();
        assert!(close(rates.network_pct, 5.0));
        assert!(close(rates.receiver_pct, 10.0 / 950.0 * 100.0));
        assert!(close(rates.total_pct, 6.0));
    }

    #[test]
    fn switch_drop_policy() {
        let counts = LossCounts {
            sent: 100,
            received: 90,
            dropped: 0,
        };
        assert_eq!(counts.with_policy(SwitchDropPolicy::Infer).dropped, 10);
        assert_eq!(counts.with_policy(SwitchDropPolicy::Ignore).dropped, 0);

        let rates = counts.with_policy(SwitchDropPolicy::Infer).rates().unwrap();
        assert!(close(rates.total_pct, 20.0));
        let rates = counts.with_policy(SwitchDropPolicy::Ignore).rates().unwrap();
        assert!(close(rates.total_pct, 10.0));
    }

    #[test]
    fn nothing_received() {
        let counts = LossCounts {
            sent: 10,
            received: 0,
            dropped: 0,
        };
        let rates = counts.with_policy(SwitchDropPolicy::Ignore).rates().unwrap();
        assert_eq!(rates.receiver_pct, 0.0);
        assert!(close(rates.network_pct, 100.0));
        assert!(matches!(
            LossCounts::default().rates(),
            Err(LossError::NoSentPackets)
        ));
    }

    #[test]
    fn statistics_table() {
        let counts = LossCounts::parse(LOG.as_bytes()).unwrap();
        let rates = counts.rates().unwrap();
        let rows = statistics_rows(&counts, &rates);
        assert_eq!(rows[0], ("Total Sent".to_string(), 1000, "100.0000".to_string()));
        assert_eq!(rows[1].2, "95.0000");
        assert_eq!(rows[3], ("Network Loss".to_string(), 50, "5.0000".to_string()));
        assert_eq!(rows[5].1, 60);
    }

    #[test]
    fn analysis_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let log_file = dir.path().join("sue-sim.log");
        fs::write(&log_file, LOG).unwrap();

        let out = analyze(&log_file, SwitchDropPolicy::Infer, dir.path()).unwrap();
        assert_eq!(out.counts.sent, 1000);
        let csv = fs::read_to_string(dir.path().join("loss_statistics.csv")).unwrap();
        assert!(csv.starts_with("Metric,Count,Rate(%)\nTotal Sent,1000,100.0000\n"));
        let report = fs::read_to_string(dir.path().join("loss_analysis_report.txt")).unwrap();
        assert!(report.contains("Network Transmission Loss Rate: 5.0000%"));

        let empty = dir.path().join("empty.log");
        fs::write(&empty, "nothing to see\n").unwrap();
        assert!(matches!(
            analyze(&empty, SwitchDropPolicy::Infer, dir.path()),
            Err(LossError::NoSentPackets)
        ));
        let error = fs::read_to_string(dir.path().join("error_report.txt")).unwrap();
        assert!(error.contains("Error: No sent packet data found"));
    }

    #[test]
    fn log_discovery() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("zzz.log"), "nothing here\n").unwrap();
        assert_eq!(find_loss_log_in(dir.path()), Some(dir.path().join("zzz.log")));

        fs::write(dir.path().join("other.log"), "Summary: Sent 1 packets\n").unwrap();
        assert_eq!(
            find_loss_log_in(dir.path()),
            Some(dir.path().join("other.log"))
        );

        fs::write(dir.path().join("app.log"), "Summary: Sent 1 packets\n").unwrap();
        assert_eq!(find_loss_log_in(dir.path()), Some(dir.path().join("app.log")));

        assert!(find_loss_log_in(dir.path().join("missing")).is_none());
    }
}
