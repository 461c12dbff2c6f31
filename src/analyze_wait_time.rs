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
//! Analyze how long transactions wait before being packed, and how many are packed together.

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
    /// Wait time log. The latest `wait_time_*.csv` is used if omitted.
    #[arg(short, long)]
    wait_time: Option<PathBuf>,
    /// Pack number log. The latest `pack_num_*.csv` is used if omitted.
    #[arg(short, long)]
    pack_num: Option<PathBuf>,
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    util::init_logging();
    let args = Args::parse();

    let run = pipeline::wait_time(
        &args.common.context(),
        args.wait_time.as_deref(),
        args.pack_num.as_deref(),
    )
    .context("Wait time analysis failed")?;
    let Some(outcome) = &run.outcome else {
        println!("No wait time or pack number data to analyze");
        return Ok(());
    };
    for (name, unit, summaries) in [
        ("Wait time", " ns", &outcome.wait_time),
        ("Packed transactions", "", &outcome.pack),
    ] {
        for s in summaries {
            if let Some(id) = s.xpu_id {
                println!(
                    "{name} XPU {id}: mean {:.2}{unit}, p99 {:.2}{unit} ({} samples)",
                    s.mean, s.p99, s.count
                );
            }
        }
    }
    for name in run.chart_names() {
        println!("  - {name}");
    }
    println!("Results saved to: {}", run.output_dir.display());
    Ok(())
}
