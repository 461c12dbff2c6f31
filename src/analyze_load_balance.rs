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
//! Analyze the load balancing of SUE selections and rate its fairness.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use sue_perf::{
    fairness::RecordFilter,
    pipeline::{self, CommonArgs},
    util::{self, fmt_ids, IdList},
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Load balance log to analyze. The latest `load_balance_*.csv` is used if omitted.
    input: Option<PathBuf>,
    /// Only analyze requests of these local XPUs, e.g. `1,2`.
    #[arg(short, long)]
    local_ids: Option<IdList>,
    /// Only analyze requests on these virtual channels, e.g. `0,1`.
    #[arg(short, long)]
    vc_ids: Option<IdList>,
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    util::init_logging();
    let args = Args::parse();

    let filter = RecordFilter::new(
        args.local_ids.map(|ids| ids.0),
        args.vc_ids.map(|ids| ids.0),
    );
    let run = pipeline::load_balance(&args.common.context(), args.input.as_deref(), &filter)
        .context("Load balance analysis failed")?;

    let Some(outcome) = &run.outcome else {
        println!("No load balance data to analyze");
        return Ok(());
    };
    println!("Load Balance Analysis");
    println!("{}", "=".repeat(60));
    println!("Local XPUs: {}", fmt_ids(&outcome.overview.local_ids));
    for metrics in &outcome.metrics {
        println!("{metrics}");
    }
    println!();
    println!("Average CV: {:.4}", outcome.summary.avg_cv);
    println!("Average RSD: {:.2}%", outcome.summary.avg_rsd_pct);
    println!("Average Max/Min Ratio: {:.2}", outcome.summary.avg_max_min_ratio);
    println!("{}", outcome.summary.assessment);
    for recommendation in &outcome.summary.recommendations {
        println!("  - {recommendation}");
    }
    println!();
    println!("Results saved to: {}", run.output_dir.display());
    Ok(())
}
