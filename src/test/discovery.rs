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
//! Finding input logs, and what happens if there are none.

use std::{
    fs::File,
    time::{Duration, SystemTime},
};

use crate::{
    config::LogKind,
    fairness::RecordFilter,
    loader::LoadError,
    loss::SwitchDropPolicy,
    pipeline::{self, QueuePaths, RunError},
    queue::QueueTargets,
};

use super::Fixture;

#[test]
fn latest_log_is_used() {
    let fixture = Fixture::new();
    let old = fixture.write_log(
        LogKind::XpuDelay,
        "xpu_delay_1.csv",
        "TimeNs,XpuId,PortId,Delay(ns)\n1,1,1,100\n",
    );
    fixture.write_log(
        LogKind::XpuDelay,
        "xpu_delay_2.csv",
        "TimeNs,XpuId,PortId,Delay(ns)\n1,1,1,100\n2,1,1,300\n",
    );
    File::options()
        .write(true)
        .open(&old)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(3600))
        .unwrap();

    let run = pipeline::delay(&fixture.context(), None).unwrap();
    assert_eq!(run.outcome.unwrap().summary.overall.count, 2);
}

#[test]
fn missing_input_leaves_no_output() {
    let fixture = Fixture::new();
    let ctx = fixture.context();

    let e = pipeline::load_balance(&ctx, None, &RecordFilter::default()).unwrap_err();
    assert!(matches!(e, RunError::Load(LoadError::NotFound(LogKind::LoadBalance))));
    assert!(e.is_missing_input());
    assert!(pipeline::delay(&ctx, None).unwrap_err().is_missing_input());
    assert!(pipeline::wait_time(&ctx, None, None)
        .unwrap_err()
        .is_missing_input());
    assert!(pipeline::queue(&ctx, QueuePaths::default(), QueueTargets::default(), true)
        .unwrap_err()
        .is_missing_input());
    assert!(pipeline::loss(&ctx, None, SwitchDropPolicy::Infer)
        .unwrap_err()
        .is_missing_input());
    assert!(pipeline::buffer_queue(&ctx, None, 1)
        .unwrap_err()
        .is_missing_input());

    let missing = fixture.data_root().join("nope.csv");
    assert!(pipeline::delay(&ctx, Some(&missing))
        .unwrap_err()
        .is_missing_input());

    assert!(!fixture.results_root().exists());
}

#[test]
fn schema_mismatch_aborts_the_analysis() {
    let fixture = Fixture::new();
    fixture.write_log(
        LogKind::XpuDelay,
        "xpu_delay_1.csv",
        "TimeNs,XpuId,Delay\n1,1,100\n",
    );
    let e = pipeline::delay(&fixture.context(), None).unwrap_err();
    assert!(!e.is_missing_input());
    match e {
        RunError::Load(LoadError::SchemaMismatch { missing, .. }) => {
            assert_eq!(missing, vec!["PortId".to_string(), "Delay(ns)".to_string()]);
        }
        e => panic!("unexpected error {e:?}"),
    }
}

#[test]
fn header_only_log_writes_nothing() {
    let fixture = Fixture::new();
    fixture.write_log(
        LogKind::SueBufferQueue,
        "sue_buffer_queue_1.csv",
        "TimeNs,XpuId,BufferSize\n",
    );
    let run = pipeline::buffer_queue(&fixture.context(), None, 1).unwrap();
    assert!(run.outcome.is_none());
    assert!(fixture.results("sue_buffer_queue_analysis").is_empty());
}
