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
//! Analyze the link-layer credits of the XPU and switch devices.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use sue_perf::{
    credit::CreditConfig,
    pipeline::{self, CommonArgs},
    util::{self, IdList},
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Link credit log to analyze. The latest `link_credit*.csv` is used if omitted.
    input: Option<PathBuf>,
    /// Performance log of an older simulator version, used if there is no link credit log.
    #[arg(long)]
    performance_file: Option<PathBuf>,
    /// Number of XPUs. Nodes with a higher id are switches.
    #[arg(short = 'n', long, default_value_t = 4)]
    xpu_count: u32,
    /// Only plot the XPU credits of these virtual channels.
    #[arg(short, long)]
    vc_ids: Option<IdList>,
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    util::init_logging();
    let args = Args::parse();

    let config = CreditConfig {
        xpu_count: args.xpu_count,
        vc_ids: args.vc_ids.map(|ids| ids.0),
    };
    let run = pipeline::credit(
        &args.common.context(),
        args.input.as_deref(),
        args.performance_file.as_deref(),
        &config,
    )
    .context("Credit analysis failed")?;
    let Some(outcome) = &run.outcome else {
        println!("No credit data to analyze");
        return Ok(());
    };
    println!(
        "Credit statistics: {} XPU and {} switch (device, VC) pairs",
        outcome.xpu_stats.len(),
        outcome.switch_stats.len()
    );
    for name in run.chart_names() {
        println!("  - {name}");
    }
    println!("Results saved to: {}", run.output_dir.display());
    Ok(())
}
