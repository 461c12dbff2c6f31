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
//! Writing human-readable text reports and CSV summaries.
use std::{fs, path::Path};

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Width of the `=` rule below a report title.
const TITLE_RULE: usize = 80;
/// Width of the `-` rule below a section heading.
const SECTION_RULE: usize = 50;

/// Line-oriented builder for plain-text reports.
#[derive(Debug, Clone, Default)]
pub struct TextReport {
    lines: Vec<String>,
}

impl TextReport {
    /// Start a report with a framed title.
    pub fn new(title: impl AsRef<str>) -> Self {
        let mut report = Self::default();
        report.line("=".repeat(TITLE_RULE));
        report.line(title);
        report.line("=".repeat(TITLE_RULE));
        report.blank();
        report
    }

    pub fn line(&mut self, line: impl AsRef<str>) -> &mut Self {
        self.lines.push(line.as_ref().to_string());
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    /// Add a section heading followed by a rule.
    pub fn section(&mut self, heading: impl AsRef<str>) -> &mut Self {
        self.line(heading);
        self.line("-".repeat(SECTION_RULE));
        self
    }

    /// Add a `key: value` line indented by `indent` levels of two spaces.
    pub fn field(&mut self, indent: usize, key: &str, value: impl std::fmt::Display) -> &mut Self {
        self.line(format!("{}{key}: {value}", "  ".repeat(indent)))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        let mut s = self.lines.join("\n");
        s.push('\n');
        s
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        fs::write(path.as_ref(), self.render())?;
        log::info!("Report saved: {:?}", path.as_ref());
        Ok(())
    }
}

/// Serialize `rows` into a CSV file with a header derived from the row type.
pub fn write_csv<T: Serialize>(
    path: impl AsRef<Path>,
    rows: impl IntoIterator<Item = T>,
) -> Result<usize, ReportError> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    let mut n = 0;
    for row in rows {
        writer.serialize(row)?;
        n += 1;
    }
    writer.flush()?;
    log::info!("Wrote {n} rows to {:?}", path.as_ref());
    Ok(n)
}
