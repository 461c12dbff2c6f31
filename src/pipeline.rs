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
//! Running a complete analysis: find and load the input logs, create the output directory, and
//! hand everything to the `analyze` function of the analysis module.
//!
//! The inputs are resolved before the output directory is created, such that an analysis without
//! input leaves nothing behind.

use std::path::{Path, PathBuf};

use crate::{
    buffer_queue::{self, BufferQueueOutcome},
    chart::{ChartStyle, ChartWriter},
    config::{DataLayout, LogKind, DEFAULT_RESULTS_ROOT},
    credit::{self, CreditConfig, CreditOutcome},
    delay::{self, DelayOutcome},
    fairness::{self, FairnessOutcome, RecordFilter},
    loader::{load_input, LoadError},
    loss::{self, LossError, LossOutcome, SwitchDropPolicy},
    queue::{self, QueueInputs, QueueOutcome, QueueTargets},
    records::{
        BufferQueueRecord, CreditRecord, DelayRecord, DestinationQueueRecord, DeviceQueueRecord,
        LoadBalanceRecord, PackNumRecord, PerformanceRecord, ProcessingQueueRecord,
        WaitTimeRecord,
    },
    report::ReportError,
    throughput::{self, ThroughputConfig, ThroughputOutcome},
    util::create_output_dir,
    wait_time::{self, WaitTimeOutcome},
};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Loss(#[from] LossError),
    #[error("Cannot create output directory: {0}")]
    OutputDir(#[from] std::io::Error),
}

impl RunError {
    /// The analysis could not run because its input does not exist.
    pub fn is_missing_input(&self) -> bool {
        matches!(
            self,
            Self::Load(LoadError::NotFound(_) | LoadError::MissingFile(_))
        )
    }
}

/// Command-line arguments shared by all binaries.
#[derive(clap::Args, Debug, Clone)]
pub struct CommonArgs {
    /// Directory holding the `*_logs` directories. The default locations are searched if omitted.
    #[arg(short, long)]
    pub data_root: Option<PathBuf>,
    /// Root of the results. Every run writes to `<output-root>/<analysis>/<timestamp>`.
    #[arg(short, long, default_value = DEFAULT_RESULTS_ROOT)]
    pub output_root: PathBuf,
}

impl CommonArgs {
    pub fn context(&self) -> Context {
        let layout = match &self.data_root {
            Some(root) => DataLayout::with_data_root(root),
            None => DataLayout::default(),
        };
        Context::new(layout.results_root(&self.output_root), ChartStyle::default())
    }
}

/// Where the analyses read from and write to, and how charts look.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub layout: DataLayout,
    pub style: ChartStyle,
}

impl Context {
    pub fn new(layout: DataLayout, style: ChartStyle) -> Self {
        Self { layout, style }
    }

    fn start(&self, analysis: &str) -> Result<(PathBuf, ChartWriter), RunError> {
        let output_dir = create_output_dir(&self.layout.results_root, analysis)?;
        log::info!("Output directory: {output_dir:?}");
        let charts = ChartWriter::new(&output_dir, self.style.clone());
        Ok((output_dir, charts))
    }
}

/// A finished analysis run.
#[derive(Debug, Clone)]
pub struct Run<T> {
    pub output_dir: PathBuf,
    /// `None` if the input held no usable data.
    pub outcome: Option<T>,
    pub charts: Vec<PathBuf>,
    pub failed_charts: usize,
}

impl<T> Run<T> {
    fn new(output_dir: PathBuf, outcome: Option<T>, charts: ChartWriter) -> Self {
        if charts.failed() > 0 {
            log::warn!("{} charts could not be written", charts.failed());
        }
        Self {
            output_dir,
            outcome,
            charts: charts.written().to_vec(),
            failed_charts: charts.failed(),
        }
    }

    /// Names of all charts written, in natural order.
    pub fn chart_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .charts
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        names.sort_by(|a, b| human_sort::compare(a, b));
        names
    }
}

pub fn load_balance(
    ctx: &Context,
    input: Option<&Path>,
    filter: &RecordFilter,
) -> Result<Run<FairnessOutcome>, RunError> {
    let (_, records) = load_input::<LoadBalanceRecord>(&ctx.layout, LogKind::LoadBalance, input)?;
    let (output_dir, mut charts) = ctx.start("load_balance_analysis")?;
    let outcome = fairness::analyze(&records, filter, &output_dir, &mut charts)?;
    Ok(Run::new(output_dir, outcome, charts))
}

pub fn delay(ctx: &Context, input: Option<&Path>) -> Result<Run<DelayOutcome>, RunError> {
    let (path, records) = load_input::<DelayRecord>(&ctx.layout, LogKind::XpuDelay, input)?;
    let (output_dir, mut charts) = ctx.start("xpu_delay_analysis")?;
    let outcome = delay::analyze(&path, &records, &output_dir, &mut charts)?;
    Ok(Run::new(output_dir, outcome, charts))
}

/// Load an optional input. A missing log is only logged, other errors are returned.
fn load_optional<T: crate::records::CsvSchema>(
    layout: &DataLayout,
    kind: LogKind,
    input: Option<&Path>,
) -> Result<Option<(PathBuf, Vec<T>)>, RunError> {
    match load_input::<T>(layout, kind, input) {
        Ok(x) => Ok(Some(x)),
        Err(e @ (LoadError::NotFound(_) | LoadError::MissingFile(_))) => {
            log::warn!("{e}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Wait time and packing analysis. Runs if at least one of the two logs exists.
pub fn wait_time(
    ctx: &Context,
    wait_input: Option<&Path>,
    pack_input: Option<&Path>,
) -> Result<Run<WaitTimeOutcome>, RunError> {
    let wait = load_optional::<WaitTimeRecord>(&ctx.layout, LogKind::WaitTime, wait_input)?;
    let pack = load_optional::<PackNumRecord>(&ctx.layout, LogKind::PackNum, pack_input)?;
    if wait.is_none() && pack.is_none() {
        return Err(LoadError::NotFound(LogKind::WaitTime).into());
    }
    let (output_dir, mut charts) = ctx.start("performance_metrics")?;
    let outcome = wait_time::analyze(
        wait.as_ref().map(|(p, r)| (p.as_path(), r.as_slice())),
        pack.as_ref().map(|(p, r)| (p.as_path(), r.as_slice())),
        &output_dir,
        &mut charts,
    )?;
    Ok(Run::new(output_dir, outcome, charts))
}

pub fn throughput(
    ctx: &Context,
    input: Option<&Path>,
    config: &ThroughputConfig,
) -> Result<Run<ThroughputOutcome>, RunError> {
    let (_, records) =
        load_input::<PerformanceRecord>(&ctx.layout, LogKind::Performance, input)?;
    let (output_dir, mut charts) = ctx.start("network_visualizations")?;
    let outcome = throughput::analyze(&records, config, &output_dir, &mut charts)?;
    Ok(Run::new(output_dir, outcome, charts))
}

/// Credit analysis of the link credit log. Without one, the credits are taken from the `Tx` rows
/// of the performance log, as written by older simulator versions.
pub fn credit(
    ctx: &Context,
    input: Option<&Path>,
    performance_input: Option<&Path>,
    config: &CreditConfig,
) -> Result<Run<CreditOutcome>, RunError> {
    let records = if input.is_some() {
        load_input::<CreditRecord>(&ctx.layout, LogKind::LinkCredit, input)?.1
    } else if let Some((_, records)) =
        load_optional::<CreditRecord>(&ctx.layout, LogKind::LinkCredit, None)?
    {
        records
    } else {
        log::warn!("No link credit log found, reading credits from the performance log");
        let (_, records) =
            load_input::<PerformanceRecord>(&ctx.layout, LogKind::Performance, performance_input)?;
        credit::legacy_credits(&records)
    };
    let (output_dir, mut charts) = ctx.start("credit_analysis")?;
    let outcome = credit::analyze(&records, config, &output_dir, &mut charts)?;
    Ok(Run::new(output_dir, outcome, charts))
}

fn records_of<T>(input: Option<(PathBuf, Vec<T>)>) -> Vec<T> {
    input.map(|(_, records)| records).unwrap_or_default()
}

/// Explicit paths of the three queue logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueuePaths<'a> {
    pub destination: Option<&'a Path>,
    pub device: Option<&'a Path>,
    pub processing: Option<&'a Path>,
}

/// Queue usage analysis. With `auto_detect`, the targets are taken from the processing queue log.
pub fn queue(
    ctx: &Context,
    paths: QueuePaths<'_>,
    targets: QueueTargets,
    auto_detect: bool,
) -> Result<Run<QueueOutcome>, RunError> {
    let destination = load_optional::<DestinationQueueRecord>(
        &ctx.layout,
        LogKind::DestinationQueue,
        paths.destination,
    )?;
    let device =
        load_optional::<DeviceQueueRecord>(&ctx.layout, LogKind::DeviceQueue, paths.device)?;
    let processing = load_optional::<ProcessingQueueRecord>(
        &ctx.layout,
        LogKind::ProcessingQueue,
        paths.processing,
    )?;
    if destination.is_none() && device.is_none() && processing.is_none() {
        return Err(LoadError::NotFound(LogKind::DeviceQueue).into());
    }
    let destination = records_of(destination);
    let device = records_of(device);
    let processing = records_of(processing);

    let targets = if auto_detect {
        targets.detect(&processing)
    } else {
        targets
    };
    let (output_dir, mut charts) = ctx.start("queue_usage")?;
    let inputs = QueueInputs {
        destination: &destination,
        device: &device,
        processing: &processing,
    };
    let outcome = queue::analyze(inputs, &targets, &output_dir, &mut charts)?;
    Ok(Run::new(output_dir, outcome, charts))
}

pub fn buffer_queue(
    ctx: &Context,
    input: Option<&Path>,
    focus_xpu: u32,
) -> Result<Run<BufferQueueOutcome>, RunError> {
    let (_, records) =
        load_input::<BufferQueueRecord>(&ctx.layout, LogKind::SueBufferQueue, input)?;
    let (output_dir, mut charts) = ctx.start("sue_buffer_queue_analysis")?;
    let outcome = buffer_queue::analyze(&records, focus_xpu, &output_dir, &mut charts)?;
    Ok(Run::new(output_dir, outcome, charts))
}

/// Packet loss analysis of a plain-text simulator log.
pub fn loss(
    ctx: &Context,
    input: Option<&Path>,
    policy: SwitchDropPolicy,
) -> Result<Run<LossOutcome>, RunError> {
    let log_file = match input {
        Some(path) if path.is_file() => path.to_path_buf(),
        Some(path) => return Err(LoadError::MissingFile(path.to_path_buf()).into()),
        None => loss::find_loss_log(&ctx.layout)
            .ok_or(LoadError::NotFound(LogKind::SimulatorLog))?,
    };
    let (output_dir, charts) = ctx.start("loss_analysis")?;
    let outcome = loss::analyze(&log_file, policy, &output_dir)?;
    Ok(Run::new(output_dir, Some(outcome), charts))
}
