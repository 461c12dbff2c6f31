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
//! Visualize device throughput, application rates, and drop events of the performance log.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use sue_perf::{
    pipeline::{self, CommonArgs},
    throughput::ThroughputConfig,
    util::{self, IdList},
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Performance log to analyze. The latest `performance*.csv` is used if omitted.
    input: Option<PathBuf>,
    /// Number of XPUs. Nodes with a higher id are switches.
    #[arg(short = 'n', long, default_value_t = 4)]
    xpu_count: u32,
    /// Switches (as logged in `XpuId`) whose device throughput is plotted.
    #[arg(short, long)]
    switch_ids: Option<IdList>,
    /// Devices whose throughput is plotted.
    #[arg(long)]
    device_ids: Option<IdList>,
    /// Virtual channels whose throughput is plotted.
    #[arg(short, long)]
    vc_ids: Option<IdList>,
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    util::init_logging();
    let args = Args::parse();

    let default = ThroughputConfig::default();
    let config = ThroughputConfig {
        xpu_count: args.xpu_count,
        switch_ids: args.switch_ids.map_or(default.switch_ids, |ids| ids.0),
        device_ids: args.device_ids.map_or(default.device_ids, |ids| ids.0),
        vc_ids: args.vc_ids.map_or(default.vc_ids, |ids| ids.0),
    };
    let run = pipeline::throughput(&args.common.context(), args.input.as_deref(), &config)
        .context("Throughput analysis failed")?;
    let Some(outcome) = &run.outcome else {
        println!("No throughput or drop data to analyze");
        return Ok(());
    };
    println!("Network Throughput Analysis");
    println!("{}", "=".repeat(40));
    for row in outcome.xpu_stats.iter().chain(&outcome.switch_stats) {
        println!(
            "XpuId {} Device {}: mean {:.2}, max {:.2} ({} samples)",
            row.xpu_id, row.device_id, row.mean, row.max, row.count
        );
    }
    if !outcome.drop_summary.is_empty() {
        println!("Drop events recorded on {} devices", outcome.drop_summary.len());
    }
    for name in run.chart_names() {
        println!("  - {name}");
    }
    println!("Results saved to: {}", run.output_dir.display());
    Ok(())
}
