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
//! Analyze the occupancy of the SUE buffer queue.

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
    /// Buffer queue log to analyze. The latest `sue_buffer_queue_*.csv` is used if omitted.
    input: Option<PathBuf>,
    /// XPU to focus on. All XPUs are analyzed if it has no data.
    #[arg(short, long, default_value_t = 1)]
    xpu_id: u32,
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    util::init_logging();
    let args = Args::parse();

    let run = pipeline::buffer_queue(&args.common.context(), args.input.as_deref(), args.xpu_id)
        .context("SUE buffer queue analysis failed")?;
    let Some(outcome) = &run.outcome else {
        println!("No SUE buffer queue data to analyze");
        return Ok(());
    };
    let s = &outcome.summary;
    println!("SUE Buffer Queue Analysis - {}", outcome.scope);
    println!("{}", "=".repeat(45));
    println!("Records: {}", s.total_records);
    println!("Mean buffer size: {:.2} packets (max {})", s.mean, s.max);
    println!("Empty buffer: {:.2}% of the samples", s.zero_ratio);
    println!("Results saved to: {}", run.output_dir.display());
    Ok(())
}
