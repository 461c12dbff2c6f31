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
//! Analyze the usage of the destination, device, and link-layer processing queues.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use sue_perf::{
    pipeline::{self, CommonArgs, QueuePaths},
    queue::QueueTargets,
    util,
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Destination queue log. The latest `destination_queue_*.csv` is used if omitted.
    #[arg(long)]
    destination: Option<PathBuf>,
    /// Device queue log. The latest `device_queue_*.csv` is used if omitted.
    #[arg(long)]
    device: Option<PathBuf>,
    /// Processing queue log. The latest `processing_queue_*.csv` is used if omitted.
    #[arg(long)]
    processing: Option<PathBuf>,
    /// XPU to analyze.
    #[arg(short, long, default_value_t = 1)]
    xpu_id: u32,
    /// Device to analyze.
    #[arg(long, default_value_t = 1)]
    device_id: u32,
    /// Switch to analyze, as logged in `XpuId`.
    #[arg(short, long, default_value_t = 5)]
    switch_id: u32,
    /// Number of XPUs. Nodes with a higher id are switches.
    #[arg(short = 'n', long, default_value_t = 4)]
    xpu_count: u32,
    /// Detect the XPU, device, and switch from the processing queue log.
    #[arg(short, long)]
    auto_detect: bool,
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    util::init_logging();
    let args = Args::parse();

    let targets = QueueTargets {
        xpu_id: args.xpu_id,
        device_id: args.device_id,
        switch_id: args.switch_id,
        xpu_count: args.xpu_count,
    };
    let paths = QueuePaths {
        destination: args.destination.as_deref(),
        device: args.device.as_deref(),
        processing: args.processing.as_deref(),
    };
    let run = pipeline::queue(&args.common.context(), paths, targets, args.auto_detect)
        .context("Queue usage analysis failed")?;
    let Some(outcome) = &run.outcome else {
        println!("No queue usage data to analyze");
        return Ok(());
    };
    for row in &outcome.utilization {
        println!(
            "{} {}: mean {:.2}%, max {:.2}%",
            row.queue, row.series, row.mean, row.max
        );
    }
    for name in run.chart_names() {
        println!("  - {name}");
    }
    println!("Results saved to: {}", run.output_dir.display());
    Ok(())
}
