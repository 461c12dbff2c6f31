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
//! Rendering of interactive HTML charts with plotly.
//!
//! All charts of a run share one [`ChartStyle`] and are written by a [`ChartWriter`] into the
//! output directory of that run. A chart that cannot be written is logged and counted, and does
//! not abort the analysis.
use std::{
    fs,
    path::{Path, PathBuf},
};

use plotly::{
    common::{DashType, Font, Line, Mode, Title},
    layout::Axis,
    Layout, Plot, Scatter,
};

/// Colors used to rate a metric as good, fair, or poor.
pub const COLOR_GOOD: &str = "#2ca02c";
pub const COLOR_FAIR: &str = "#ff7f0e";
pub const COLOR_POOR: &str = "#d62728";

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("Cannot write chart {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Global styling applied to every chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    pub font_family: String,
    pub font_size: usize,
    pub width: usize,
    pub height: usize,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            font_family: "DejaVu Sans".to_string(),
            font_size: 12,
            width: 1400,
            height: 800,
        }
    }
}

impl ChartStyle {
    /// Base layout with the given title and axis labels.
    pub fn layout(&self, title: &str, x_label: &str, y_label: &str) -> Layout {
        Layout::new()
            .title(Title::with_text(format!("<b>{title}</b>")))
            .font(Font::new().family(&self.font_family).size(self.font_size))
            .width(self.width)
            .height(self.height)
            .x_axis(Axis::new().title(Title::with_text(x_label)))
            .y_axis(Axis::new().title(Title::with_text(y_label)))
    }
}

/// Writes charts into a single output directory.
#[derive(Debug)]
pub struct ChartWriter {
    dir: PathBuf,
    style: ChartStyle,
    written: Vec<PathBuf>,
    failed: usize,
}

impl ChartWriter {
    pub fn new(dir: impl AsRef<Path>, style: ChartStyle) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            style,
            written: Vec::new(),
            failed: 0,
        }
    }

    pub fn style(&self) -> &ChartStyle {
        &self.style
    }

    /// Charts successfully written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Number of charts that could not be written.
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Apply the layout to `plot` and write it to `<dir>/<file_name>`.
    pub fn try_write(
        &mut self,
        file_name: &str,
        mut plot: Plot,
        layout: Layout,
    ) -> Result<PathBuf, ChartError> {
        let path = self.dir.join(file_name);
        plot.set_layout(layout);
        fs::write(&path, plot.to_html()).map_err(|source| ChartError::Io {
            path: path.clone(),
            source,
        })?;
        log::info!("Chart saved: {path:?}");
        self.written.push(path.clone());
        Ok(path)
    }

    /// Like [`Self::try_write`], but a failure is only logged.
    pub fn write(
        &mut self,
        file_name: &str,
        plot: Plot,
        title: &str,
        x_label: &str,
        y_label: &str,
    ) -> Option<PathBuf> {
        let layout = self.style.layout(title, x_label, y_label);
        self.write_with_layout(file_name, plot, layout)
    }

    /// Write a chart with a custom layout, typically derived from [`ChartStyle::layout`].
    pub fn write_with_layout(
        &mut self,
        file_name: &str,
        plot: Plot,
        layout: Layout,
    ) -> Option<PathBuf> {
        match self.try_write(file_name, plot, layout) {
            Ok(path) => Some(path),
            Err(e) => {
                log::error!("{e}");
                self.failed += 1;
                None
            }
        }
    }
}

/// A dashed horizontal line at `y` spanning `x0..=x1`, used for threshold markers.
pub fn threshold_line(
    name: &str,
    x0: f64,
    x1: f64,
    y: f64,
    color: &'static str,
) -> Box<Scatter<f64, f64>> {
    Scatter::new(vec![x0, x1], vec![y, y])
        .name(name)
        .mode(Mode::Lines)
        .line(Line::new().color(color).dash(DashType::Dash))
}

/// Pick the color of a metric where lower values are better.
pub fn rate_lower_better(value: f64, good: f64, fair: f64) -> &'static str {
    if value < good {
        COLOR_GOOD
    } else if value < fair {
        COLOR_FAIR
    } else {
        COLOR_POOR
    }
}

/// Pick the color of a metric where higher values are better.
pub fn rate_higher_better(value: f64, good: f64, fair: f64) -> &'static str {
    if value > good {
        COLOR_GOOD
    } else if value > fair {
        COLOR_FAIR
    } else {
        COLOR_POOR
    }
}

#[cfg(test)]
mod test {
    use plotly::BoxPlot;

    use super::*;

    #[test]
    fn failed_chart_does_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ChartWriter::new(dir.path().join("missing"), ChartStyle::default());
        let mut plot = Plot::new();
        plot.add_trace(BoxPlot::<f64, f64>::new(vec![1.0, 2.0]).name("a"));
        assert!(writer.write("a.html", plot, "A", "x", "y").is_none());
        assert_eq!(writer.failed(), 1);

        let mut writer = ChartWriter::new(dir.path(), ChartStyle::default());
        let mut plot = Plot::new();
        plot.add_trace(BoxPlot::<f64, f64>::new(vec![1.0, 2.0]).name("a"));
        let path = writer.write("a.html", plot, "A", "Time (seconds)", "Delay (ns)").unwrap();
        assert!(path.exists());
        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains("DejaVu Sans"));
        assert!(html.contains("Time (seconds)"));
        assert!(html.contains("Delay (ns)"));
        assert_eq!(writer.written().len(), 1);
        assert_eq!(writer.failed(), 0);
    }

    #[test]
    fn rating_colors() {
        assert_eq!(rate_lower_better(0.05, 0.1, 0.2), COLOR_GOOD);
        assert_eq!(rate_lower_better(0.15, 0.1, 0.2), COLOR_FAIR);
        assert_eq!(rate_lower_better(0.2, 0.1, 0.2), COLOR_POOR);
        assert_eq!(rate_higher_better(90.0, 80.0, 60.0), COLOR_GOOD);
        assert_eq!(rate_higher_better(80.0, 80.0, 60.0), COLOR_FAIR);
        assert_eq!(rate_higher_better(60.0, 80.0, 60.0), COLOR_POOR);
    }
}
