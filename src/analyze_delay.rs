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
//! Analyze the end-to-end delay of the packets received by the XPUs.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use sue_perf::{
    pipeline::{self, CommonArgs},
    util,
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Delay log to analyze. The latest `xpu_delay_*.csv` is used if omitted.
    input: Option<PathBuf>,
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    util::init_logging();
    let args = Args::parse();

    let run = pipeline::delay(&args.common.context(), args.input.as_deref())
        .context("XPU delay analysis failed")?;
    let Some(outcome) = &run.outcome else {
        println!("No XPU delay data to analyze");
        return Ok(());
    };
    let s = &outcome.summary.overall;
    println!("XPU Delay Analysis");
    println!("{}", "=".repeat(40));
    println!("Packets: {}", s.count);
    println!("Mean: {:.2} ns, median: {:.2} ns", s.mean, s.median);
    println!("P99: {:.2} ns, P99.99: {:.2} ns", s.p99, s.p9999);
    for x in &outcome.summary.per_xpu {
        if let Some(id) = x.xpu_id {
            println!("  XPU {id}: mean {:.2} ns, p99 {:.2} ns", x.mean, x.p99);
        }
    }
    println!("Generated {} charts", run.charts.len());
    println!("Results saved to: {}", run.output_dir.display());
    Ok(())
}
