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
//! Utility module collection of functions

use std::{
    fs,
    num::ParseIntError,
    path::{Path, PathBuf},
    str::FromStr,
};

use itertools::Itertools;

/// Name of the `log4rs` configuration expected in the working directory.
pub const LOG_CONFIG_FILE: &str = "log4rs.yml";

/// Initialize logging from `log4rs.yml`, falling back to `pretty_env_logger` (configured through
/// `RUST_LOG`, default `info`) if the configuration file is missing or invalid.
pub fn init_logging() {
    if Path::new(LOG_CONFIG_FILE).exists() {
        match log4rs::init_file(LOG_CONFIG_FILE, Default::default()) {
            Ok(()) => return,
            Err(e) => eprintln!("Cannot load {LOG_CONFIG_FILE}: {e}"),
        }
    }
    if let Err(e) = init_env_logger() {
        eprintln!("Cannot initialize the logger: {e}");
    }
}

/// Install `pretty_env_logger`, configured through `RUST_LOG` (default `info`).
fn init_env_logger() -> Result<(), log::SetLoggerError> {
    pretty_env_logger::formatted_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .try_init()
}

pub trait PathBufExt: Sized {
    fn then(self, p: impl AsRef<Path>) -> PathBuf;

    fn then_ts(self, p: impl AsRef<str>, ts: &str) -> PathBuf {
        self.then(p.as_ref().replacen("{}", ts, 1))
    }
}

impl PathBufExt for PathBuf {
    fn then(mut self, p: impl AsRef<Path>) -> PathBuf {
        self.push(p);
        self
    }
}

impl PathBufExt for &Path {
    fn then(self, p: impl AsRef<Path>) -> PathBuf {
        let mut path = self.to_path_buf();
        path.push(p);
        path
    }
}

/// Create the timestamped output directory `<results_root>/<analysis>/<timestamp>`.
pub fn create_output_dir(
    results_root: impl AsRef<Path>,
    analysis: impl AsRef<Path>,
) -> std::io::Result<PathBuf> {
    let output_dir = results_root
        .as_ref()
        .then(analysis)
        .then(sue_perf_utils::other::get_timestamp());
    fs::create_dir_all(&output_dir)?;
    Ok(output_dir)
}

/// Parse a comma-separated list of integers such as `"1, 2,5"`. Empty entries are ignored.
pub fn parse_id_list(s: &str) -> Result<Vec<u32>, ParseIntError> {
    s.split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(str::parse)
        .collect()
}

/// Comma-separated list of ids given on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdList(pub Vec<u32>);

impl FromStr for IdList {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_id_list(s).map(Self)
    }
}

/// Format a list of ids as `[1, 2, 3]`.
pub fn fmt_ids<T: std::fmt::Display>(ids: impl IntoIterator<Item = T>) -> String {
    format!("[{}]", ids.into_iter().join(", "))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn id_lists() {
        assert_eq!(parse_id_list("1, 2,5").unwrap(), vec![1, 2, 5]);
        assert_eq!(parse_id_list("7").unwrap(), vec![7]);
        assert_eq!(parse_id_list("").unwrap(), Vec::<u32>::new());
        assert_eq!(parse_id_list("3,,4,").unwrap(), vec![3, 4]);
        assert!(parse_id_list("1,x").is_err());
        assert_eq!("4,2".parse::<IdList>().unwrap(), IdList(vec![4, 2]));
    }

    #[test]
    fn second_logger_is_rejected() {
        let _ = init_env_logger();
        assert!(init_env_logger().is_err());
    }

    #[test]
    fn path_ext() {
        let p = Path::new("results").then("loss_analysis").then_ts("run_{}", "x");
        assert_eq!(p, PathBuf::from("results/loss_analysis/run_x"));
        assert_eq!(fmt_ids([1, 2, 3]), "[1, 2, 3]");
    }
}
