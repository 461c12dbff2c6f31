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
//! Load balancing analysis from CSV log to report artifacts.

use std::fs;

use crate::{
    config::LogKind,
    fairness::{read_target_counts_csv, Assessment, RecordFilter},
    pipeline,
};

use super::Fixture;

/// XPU 1 spreads 30 requests evenly over three SUEs, XPU 2 sends 100 requests to SUE 0 and one
/// to SUE 1, and XPU 3 only uses SUE 2.
fn log() -> String {
    let mut log = String::from("LocalXpuId,DestXpuId,VcId,SueId\n");
    for i in 0..30 {
        log.push_str(&format!("1,2,{},{}\n", i % 2, i % 3));
    }
    for _ in 0..100 {
        log.push_str("2,1,0,0\n");
    }
    log.push_str("2,1,1,1\n");
    for _ in 0..5 {
        log.push_str("3,1,0,2\n");
    }
    log
}

#[test]
fn complete_analysis() {
    let fixture = Fixture::new();
    fixture.write_log(LogKind::LoadBalance, "load_balance_20250101.csv", &log());

    let run = pipeline::load_balance(&fixture.context(), None, &RecordFilter::default()).unwrap();
    let outcome = run.outcome.unwrap();
    assert_eq!(outcome.metrics.len(), 3);

    let even = &outcome.metrics[0];
    assert_eq!(even.total_requests, 30);
    assert_eq!(even.composite_score, 100.0);
    let skewed = &outcome.metrics[1];
    assert_eq!(skewed.max_min_ratio, 100.0);
    assert_eq!(skewed.ratio_score(), 0.0);
    assert!(skewed.composite_score < 100.0);
    let single = &outcome.metrics[2];
    assert_eq!(single.distinct_targets, 1);
    assert_eq!(single.composite_score, 100.0);
    assert_eq!(outcome.summary.assessment, Assessment::Poor);

    // every local XPU's counts add up to its requests
    for m in &outcome.metrics {
        assert_eq!(m.target_counts.values().sum::<usize>(), m.total_requests);
        assert!((m.ideal_share * m.distinct_targets as f64 - m.total_requests as f64).abs() < 1e-9);
    }

    let counts =
        read_target_counts_csv(run.output_dir.join("load_balance_target_counts.csv")).unwrap();
    assert_eq!(counts.total(), 136);
    assert_eq!(counts.get(2, 0), 100);

    let files = fixture.results("load_balance_analysis");
    for name in [
        "load_balance_analysis_report.txt",
        "load_balance_metrics.csv",
        "load_balance_target_counts.csv",
        "target_counts.json",
        "load_balance_boxplot.html",
        "load_balance_heatmap.html",
        "load_balance_fairness_score.html",
    ] {
        assert!(files.contains(&name.to_string()), "missing {name}");
    }
    let report =
        fs::read_to_string(run.output_dir.join("load_balance_analysis_report.txt")).unwrap();
    assert!(report.contains("POOR"));
}

#[test]
fn filtered_analysis() {
    let fixture = Fixture::new();
    let path = fixture.write_log(LogKind::LoadBalance, "custom.csv", &log());

    let filter = RecordFilter::new(Some(vec![1, 2]), Some(vec![1]));
    let run = pipeline::load_balance(&fixture.context(), Some(&path), &filter).unwrap();
    let outcome = run.outcome.unwrap();
    assert_eq!(outcome.metrics.len(), 2);
    assert_eq!(outcome.metrics[0].total_requests, 15);
    assert_eq!(outcome.metrics[1].total_requests, 1);

    // nothing left after filtering: no artifacts besides the empty output directory
    let filter = RecordFilter::new(Some(vec![9]), None);
    let run = pipeline::load_balance(&fixture.context(), Some(&path), &filter).unwrap();
    assert!(run.outcome.is_none());
    assert!(run.charts.is_empty());
}
