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
//! Library for the offline analysis of the performance logs written by the SUE-Sim network
//! simulator.
//!
//! Every analysis module exposes an `analyze` function that takes the parsed records, writes its
//! reports into an output directory and renders its charts through a [`chart::ChartWriter`].
//! Finding and parsing the input logs is done with [`config::DataLayout`] and [`loader`], and
//! [`pipeline`] ties both together for the binaries.

pub mod buffer_queue;
pub mod chart;
pub mod config;
pub mod credit;
pub mod delay;
pub mod fairness;
pub mod loader;
pub mod loss;
pub mod pipeline;
pub mod queue;
pub mod records;
pub mod report;
pub mod stats;
pub mod throughput;
pub mod util;
pub mod wait_time;

#[cfg(test)]
mod test;

pub mod prelude {
    pub use super::{
        chart::{ChartStyle, ChartWriter},
        config::{DataLayout, LogKind},
        loader::{load_input, LoadError},
        pipeline::{Context, Run, RunError},
        report::ReportError,
        util::{create_output_dir, init_logging, IdList, PathBufExt},
    };
}
