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
//! End-to-end tests running complete analyses on small logs in a scratch data root.

use std::{fs, path::PathBuf};

use tempfile::TempDir;

use crate::{
    chart::ChartStyle,
    config::{DataLayout, LogKind},
    pipeline::Context,
};

/// A scratch data root with a separate results root.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn data_root(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn results_root(&self) -> PathBuf {
        self.dir.path().join("results")
    }

    /// Write `content` to `<data_root>/<subdir of kind>/<name>`.
    pub fn write_log(&self, kind: LogKind, name: &str, content: &str) -> PathBuf {
        let dir = self.data_root().join(kind.subdir());
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn context(&self) -> Context {
        Context::new(
            DataLayout::with_data_root(self.data_root()).results_root(self.results_root()),
            ChartStyle::default(),
        )
    }

    /// All files written into `<results_root>/<analysis>/<timestamp>/`.
    pub fn results(&self, analysis: &str) -> Vec<String> {
        let dir = self.results_root().join(analysis);
        let Ok(runs) = fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut names = Vec::new();
        for run in runs {
            for file in fs::read_dir(run.unwrap().path()).unwrap() {
                names.push(file.unwrap().file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        names
    }
}

mod analyses;
mod discovery;
mod load_balance;
