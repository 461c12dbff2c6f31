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
//! Compute packet loss rates from the plain-text simulator log.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use sue_perf::{
    loss::SwitchDropPolicy,
    pipeline::{self, CommonArgs},
    util,
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Simulator log to analyze. Searched in the log directory if omitted.
    input: Option<PathBuf>,
    /// How to account for packets that went missing without being reported as dropped.
    #[arg(short = 'p', long, value_enum, default_value_t = SwitchDropPolicy::Infer)]
    switch_drops: SwitchDropPolicy,
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    util::init_logging();
    let args = Args::parse();

    let run = pipeline::loss(&args.common.context(), args.input.as_deref(), args.switch_drops)
        .context("Packet loss analysis failed")?;
    if let Some(outcome) = &run.outcome {
        let c = &outcome.counts;
        println!("Packet Loss Analysis");
        println!("{}", "=".repeat(40));
        println!("Sent packets:     {}", c.sent);
        println!("Received packets: {}", c.received);
        println!("Dropped packets:  {}", c.dropped);
        println!("Network loss rate:  {:.2}%", outcome.rates.network_pct);
        println!("Receiver drop rate: {:.2}%", outcome.rates.receiver_pct);
        println!("Total loss rate:    {:.2}%", outcome.rates.total_pct);
    }
    println!("Results saved to: {}", run.output_dir.display());
    Ok(())
}
