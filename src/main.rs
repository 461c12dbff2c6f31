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
//! Run every analysis whose input log can be found.

use std::time::Instant;

use anyhow::bail;
use clap::Parser;

use sue_perf::{
    credit::CreditConfig,
    fairness::RecordFilter,
    loss::SwitchDropPolicy,
    pipeline::{self, CommonArgs, QueuePaths, Run, RunError},
    queue::QueueTargets,
    throughput::ThroughputConfig,
    util,
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Number of XPUs. Nodes with a higher id are switches.
    #[arg(short = 'n', long, default_value_t = 4)]
    xpu_count: u32,
    /// How the loss analysis accounts for packets missing without being reported as dropped.
    #[arg(short = 'p', long, value_enum, default_value_t = SwitchDropPolicy::Infer)]
    switch_drops: SwitchDropPolicy,
    #[command(flatten)]
    common: CommonArgs,
}

/// Outcome of one analysis, as shown in the final summary.
enum Status {
    Done(String),
    Skipped,
    Failed,
}

fn status<T>(name: &str, result: Result<Run<T>, RunError>) -> (&str, Status) {
    let status = match result {
        Ok(run) => {
            log::info!("{name}: {} charts in {:?}", run.charts.len(), run.output_dir);
            Status::Done(run.output_dir.display().to_string())
        }
        Err(e) if e.is_missing_input() => {
            log::warn!("Skipping {name}: {e}");
            Status::Skipped
        }
        Err(e) => {
            log::error!("{name} failed: {e}");
            Status::Failed
        }
    };
    (name, status)
}

/// Fails if every analysis was skipped for lack of input.
fn check_any_ran(results: &[(&str, Status)]) -> anyhow::Result<()> {
    if results.iter().all(|(_, s)| matches!(s, Status::Skipped)) {
        bail!("No analysis could run, no input logs found");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    util::init_logging();
    let args = Args::parse();
    let ctx = args.common.context();
    let start = Instant::now();

    let xpu_count = args.xpu_count;
    let results = [
        status(
            "Load balance",
            pipeline::load_balance(&ctx, None, &RecordFilter::default()),
        ),
        status("Packet loss", pipeline::loss(&ctx, None, args.switch_drops)),
        status("XPU delay", pipeline::delay(&ctx, None)),
        status("Wait time", pipeline::wait_time(&ctx, None, None)),
        status(
            "Throughput",
            pipeline::throughput(
                &ctx,
                None,
                &ThroughputConfig {
                    xpu_count,
                    ..Default::default()
                },
            ),
        ),
        status(
            "Credit",
            pipeline::credit(
                &ctx,
                None,
                None,
                &CreditConfig {
                    xpu_count,
                    vc_ids: None,
                },
            ),
        ),
        status(
            "Queue usage",
            pipeline::queue(
                &ctx,
                QueuePaths::default(),
                QueueTargets {
                    xpu_count,
                    ..Default::default()
                },
                true,
            ),
        ),
        status("SUE buffer queue", pipeline::buffer_queue(&ctx, None, 1)),
    ];

    println!();
    println!("SUE-Sim Performance Analysis Summary");
    println!("{}", "=".repeat(60));
    for (name, status) in &results {
        match status {
            Status::Done(dir) => println!("  [done]    {name:<18} {dir}"),
            Status::Skipped => println!("  [skipped] {name:<18} no input found"),
            Status::Failed => println!("  [failed]  {name:<18} see log"),
        }
    }
    println!("Finished in {:.2}s", start.elapsed().as_secs_f64());

    check_any_ran(&results)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fails_only_if_nothing_ran() {
        assert!(check_any_ran(&[("Delay", Status::Skipped), ("Loss", Status::Skipped)]).is_err());
        assert!(check_any_ran(&[("Delay", Status::Skipped), ("Loss", Status::Failed)]).is_ok());
        assert!(check_any_ran(&[("Delay", Status::Done("out".to_string()))]).is_ok());
    }
}
