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
//! Every analysis run through the pipeline on small, hand-written logs.

use std::fs;

use crate::{
    buffer_queue::Scope,
    config::LogKind,
    credit::CreditConfig,
    loss::{LossError, SwitchDropPolicy},
    pipeline::{self, QueuePaths, RunError},
    queue::QueueTargets,
    throughput::{Node, ThroughputConfig},
};

use super::Fixture;

const PERFORMANCE_LOG: &str = "\
Time,XpuId,DeviceId,VCId,Direction,Rate,MacAddress
1000,1,1,0,Tx,10,00:00:00:00:00:02
1000,1,1,0,Rx,20,0
2000,1,1,0,Tx,40,00:00:00:00:00:02
1000,6,1,0,Tx,5,00:00:00:00:00:01
1000,1,1,0,APP,8000,0
3000,5,2,0,LinkSendDrop,3,0
";

#[test]
fn delay() {
    let fixture = Fixture::new();
    fixture.write_log(
        LogKind::XpuDelay,
        "xpu_delay_1.csv",
        "TimeNs,XpuId,PortId,Delay(ns)\n1,1,1,100\n2,1,2,200\n3,2,1,300\n",
    );
    let run = pipeline::delay(&fixture.context(), None).unwrap();
    let outcome = run.outcome.unwrap();
    assert_eq!(outcome.summary.overall.count, 3);
    assert_eq!(outcome.summary.overall.mean, 200.0);
    assert_eq!(outcome.summary.per_xpu.len(), 2);

    let files = fixture.results("xpu_delay_analysis");
    for name in [
        "overall_delay_stats.csv",
        "all_xpu_delay_stats.csv",
        "xpu_1_delay_stats.csv",
        "analysis_summary.txt",
        "tail_latency.html",
    ] {
        assert!(files.contains(&name.to_string()), "missing {name}");
    }
}

#[test]
fn wait_time_without_pack_log() {
    let fixture = Fixture::new();
    fixture.write_log(
        LogKind::WaitTime,
        "wait_time_1.csv",
        "XpuId,WaitTime(ns)\n1,10\n1,30\n2,5\n",
    );
    let run = pipeline::wait_time(&fixture.context(), None, None).unwrap();
    let outcome = run.outcome.unwrap();
    assert_eq!(outcome.wait_time.len(), 2);
    assert_eq!(outcome.wait_time[0].mean, 20.0);
    assert!(outcome.pack.is_empty());
}

#[test]
fn throughput() {
    let fixture = Fixture::new();
    fixture.write_log(LogKind::Performance, "performance_1.csv", PERFORMANCE_LOG);
    let run = pipeline::throughput(&fixture.context(), None, &ThroughputConfig::default()).unwrap();
    assert_eq!(run.failed_charts, 0);
    assert!(!run.charts.is_empty());
    let outcome = run.outcome.unwrap();
    assert_eq!(outcome.xpu_stats.len(), 1);
    assert_eq!(outcome.xpu_stats[0].mean, 35.0);
    assert_eq!(outcome.switch_stats.len(), 1);
    assert_eq!(outcome.switch_stats[0].xpu_id, 6);
    assert_eq!(outcome.app_stats.len(), 1);
    assert_eq!(outcome.drop_summary.len(), 1);
    assert_eq!(outcome.files.len(), 4);
}

#[test]
fn credit_from_legacy_performance_log() {
    let fixture = Fixture::new();
    fixture.write_log(LogKind::Performance, "performance_1.csv", PERFORMANCE_LOG);
    let config = CreditConfig {
        xpu_count: 4,
        vc_ids: None,
    };
    let run = pipeline::credit(&fixture.context(), None, None, &config).unwrap();
    let outcome = run.outcome.as_ref().unwrap();
    assert_eq!(outcome.xpu_stats.len(), 1);
    assert_eq!(outcome.xpu_stats[0].count, 2);
    assert_eq!(outcome.xpu_stats[0].mean, 25.0);
    assert_eq!(outcome.switch_stats.len(), 1);

    let report = fs::read_to_string(run.output_dir.join("credit_analysis_report.txt")).unwrap();
    assert!(report.contains("XPU 1:"));
    assert!(report.contains("Switch 2:"));
    assert!(run
        .chart_names()
        .contains(&"switch_credit_value_changes.html".to_string()));
}

#[test]
fn credit_log_is_preferred() {
    let fixture = Fixture::new();
    fixture.write_log(LogKind::Performance, "performance_1.csv", PERFORMANCE_LOG);
    fixture.write_log(
        LogKind::LinkCredit,
        "link_credit_1.csv",
        "TimeNs,XpuId,DeviceId,VCId,Direction,Credits,MacAddress\n\
         10,1,1,0,Tx,7,00:00:00:00:00:02\n\
         20,1,1,1,Tx,9,0\n",
    );
    let config = CreditConfig {
        xpu_count: 4,
        vc_ids: Some(vec![1]),
    };
    let run = pipeline::credit(&fixture.context(), None, None, &config).unwrap();
    let outcome = run.outcome.as_ref().unwrap();
    assert_eq!(outcome.xpu_stats.len(), 2);
    assert!(outcome.switch_stats.is_empty());
    assert!(run
        .chart_names()
        .contains(&"credit_value_changes_vc1.html".to_string()));
}

#[test]
fn queue_with_detected_targets() {
    let fixture = Fixture::new();
    fixture.write_log(
        LogKind::ProcessingQueue,
        "processing_queue_1.csv",
        "TimeNs,XpuId,DeviceId,QueueLength,MaxSize\n0,2,1,2,16\n1000,2,1,4,16\n0,6,1,1,16\n",
    );
    fixture.write_log(
        LogKind::DeviceQueue,
        "device_queue_1.csv",
        "TimeNs,XpuId,DeviceId,QueueType,VCId,CurrentSize,MaxSize,Utilization(%)\n\
         0,2,1,Main,0,2,8,25\n\
         0,6,1,VC,1,4,8,50\n",
    );
    let run = pipeline::queue(
        &fixture.context(),
        QueuePaths::default(),
        QueueTargets::default(),
        true,
    )
    .unwrap();
    let outcome = run.outcome.unwrap();
    assert_eq!(outcome.processing.len(), 2);
    assert_eq!(outcome.processing[0].0, Node::Xpu(2));
    assert_eq!(outcome.processing[1].0, Node::Switch(2));
    assert_eq!(outcome.processing[0].2.mean, 3.0);
    assert_eq!(outcome.utilization.len(), 4);

    let files = fixture.results("queue_usage");
    for name in [
        "queue_utilization_stats.csv",
        "queue_usage_report.txt",
        "xpu2_device1_queues.html",
        "switch2_device1_queues.html",
        "xpu2_device1_processing_queues.html",
        "switch2_device1_processing_queues.html",
    ] {
        assert!(files.contains(&name.to_string()), "missing {name}");
    }
}

#[test]
fn buffer_queue_falls_back_to_all_xpus() {
    let fixture = Fixture::new();
    fixture.write_log(
        LogKind::SueBufferQueue,
        "sue_buffer_queue_1.csv",
        "TimeNs,XpuId,BufferSize\n0,2,0\n1000,2,4\n500,3,2\n",
    );
    let run = pipeline::buffer_queue(&fixture.context(), None, 1).unwrap();
    let outcome = run.outcome.unwrap();
    assert_eq!(outcome.scope, Scope::All(vec![2, 3]));
    assert_eq!(outcome.summary.total_records, 3);
    assert_eq!(outcome.summary.mean, 2.0);

    let files = fixture.results("sue_buffer_queue_analysis");
    assert!(files.contains(&"sue_buffer_queue_all_xpus_statistics.csv".to_string()));
    assert!(files.contains(&"sue_buffer_queue_all_xpus_timeseries.html".to_string()));
}

#[test]
fn loss() {
    let fixture = Fixture::new();
    fixture.write_log(
        LogKind::SimulatorLog,
        "sue-sim.log",
        "XPU1 Summary: Sent 1000 packets\nXPU2 Port 1 Received 900 packets\n",
    );
    let ctx = fixture.context();

    let run = pipeline::loss(&ctx, None, SwitchDropPolicy::Infer).unwrap();
    let outcome = run.outcome.unwrap();
    assert_eq!(outcome.counts.dropped, 100);
    assert!((outcome.rates.network_pct - 10.0).abs() < 1e-9);
    assert!((outcome.rates.total_pct - 20.0).abs() < 1e-9);

    let run = pipeline::loss(&ctx, None, SwitchDropPolicy::Ignore).unwrap();
    let outcome = run.outcome.unwrap();
    assert_eq!(outcome.counts.dropped, 0);
    assert!((outcome.rates.total_pct - 10.0).abs() < 1e-9);
}

#[test]
fn loss_without_sent_packets() {
    let fixture = Fixture::new();
    fixture.write_log(
        LogKind::SimulatorLog,
        "sue-sim.log",
        "XPU2 Port 1 Received 5 packets\n",
    );
    let e = pipeline::loss(&fixture.context(), None, SwitchDropPolicy::Infer).unwrap_err();
    assert!(matches!(e, RunError::Loss(LossError::NoSentPackets)));
    assert!(fixture
        .results("loss_analysis")
        .contains(&"error_report.txt".to_string()));
}
