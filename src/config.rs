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
//! Where the simulator writes its logs and where the analyses place their results.

use std::path::{Path, PathBuf};

use crate::util::PathBufExt;

/// Kinds of logs written by the SUE-Sim performance logger.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum LogKind {
    LoadBalance,
    XpuDelay,
    WaitTime,
    PackNum,
    Performance,
    LinkCredit,
    DestinationQueue,
    DeviceQueue,
    ProcessingQueue,
    SueBufferQueue,
    /// Plain-text simulator output, used for the packet loss analysis.
    SimulatorLog,
}

impl LogKind {
    /// Subdirectory of the data root holding this kind of log.
    pub fn subdir(&self) -> &'static str {
        match self {
            Self::LoadBalance => "load_balance_logs",
            Self::XpuDelay => "xpu_delay_logs",
            Self::WaitTime => "wait_time_logs",
            Self::PackNum => "pack_num_logs",
            Self::Performance => "performance_logs",
            Self::LinkCredit => "link_credit_logs",
            Self::DestinationQueue => "destination_queue_logs",
            Self::DeviceQueue => "device_queue_logs",
            Self::ProcessingQueue => "processing_queue_logs",
            Self::SueBufferQueue => "sue_buffer_queue_logs",
            Self::SimulatorLog => "log",
        }
    }

    /// Glob pattern matching the timestamped files of this log kind.
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::LoadBalance => "load_balance_*.csv",
            Self::XpuDelay => "xpu_delay_*.csv",
            Self::WaitTime => "wait_time_*.csv",
            Self::PackNum => "pack_num_*.csv",
            Self::Performance => "performance*.csv",
            Self::LinkCredit => "link_credit*.csv",
            Self::DestinationQueue => "destination_queue_*.csv",
            Self::DeviceQueue => "device_queue_*.csv",
            Self::ProcessingQueue => "processing_queue_*.csv",
            Self::SueBufferQueue => "sue_buffer_queue_*.csv",
            Self::SimulatorLog => "*.log",
        }
    }
}

/// Default candidates for the data root, tried in order. Covers running from the repository root,
/// from `performance-data/`, and from `performance-data/scripts/`.
pub const DEFAULT_DATA_ROOTS: [&str; 4] = [
    "performance-data/data",
    "data",
    "../data",
    "../performance-data/data",
];

/// Default candidates for the directory holding the plain-text simulator logs.
pub const DEFAULT_LOG_DIRS: [&str; 3] = ["log", "../log", "../../log"];

/// Default root under which every analysis creates `<analysis>/<timestamp>/`.
pub const DEFAULT_RESULTS_ROOT: &str = "performance-data/results";

/// Directory layout used for finding input logs and placing results.
#[derive(Debug, Clone)]
pub struct DataLayout {
    /// Candidate data roots. The first existing one containing the log subdirectory wins.
    pub data_roots: Vec<PathBuf>,
    /// Candidate directories for plain-text simulator logs.
    pub log_dirs: Vec<PathBuf>,
    /// Root of all analysis results.
    pub results_root: PathBuf,
}

impl Default for DataLayout {
    fn default() -> Self {
        Self {
            data_roots: DEFAULT_DATA_ROOTS.iter().map(PathBuf::from).collect(),
            log_dirs: DEFAULT_LOG_DIRS.iter().map(PathBuf::from).collect(),
            results_root: PathBuf::from(DEFAULT_RESULTS_ROOT),
        }
    }
}

impl DataLayout {
    /// Layout with a single, explicitly chosen data root.
    pub fn with_data_root(data_root: impl AsRef<Path>) -> Self {
        Self {
            data_roots: vec![data_root.as_ref().to_path_buf()],
            log_dirs: vec![data_root.as_ref().then(LogKind::SimulatorLog.subdir())],
            ..Default::default()
        }
    }

    /// Replace the results root.
    pub fn results_root(mut self, results_root: impl AsRef<Path>) -> Self {
        self.results_root = results_root.as_ref().to_path_buf();
        self
    }

    /// All directories that may hold logs of the given kind, in order of preference.
    pub fn candidate_dirs(&self, kind: LogKind) -> Vec<PathBuf> {
        match kind {
            LogKind::SimulatorLog => self.log_dirs.clone(),
            _ => self
                .data_roots
                .iter()
                .map(|root| root.as_path().then(kind.subdir()))
                .collect(),
        }
    }

    /// The first existing directory that may hold logs of the given kind.
    pub fn log_dir(&self, kind: LogKind) -> Option<PathBuf> {
        self.candidate_dirs(kind).into_iter().find(|d| d.is_dir())
    }

    /// Find the most recent log of the given kind.
    pub fn find_latest(&self, kind: LogKind) -> Option<PathBuf> {
        let Some(dir) = self.log_dir(kind) else {
            log::warn!(
                "No {kind} directory found, attempted paths: {:?}",
                self.candidate_dirs(kind)
            );
            return None;
        };
        let found = sue_perf_utils::files::find_latest_file(&dir, kind.pattern());
        match &found {
            Some(path) => log::info!("Found {kind} file: {path:?}"),
            None => log::warn!("No {} files found in {dir:?}", kind.pattern()),
        }
        found
    }
}
