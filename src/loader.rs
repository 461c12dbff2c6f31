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
//! Loading typed records from CSV logs, with the header validated against the record schema.
use std::{
    fs,
    path::{Path, PathBuf},
};

use itertools::Itertools;

use crate::{
    config::{DataLayout, LogKind},
    records::CsvSchema,
};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid CSV format. Missing columns: {missing:?}. Found: {found:?}")]
    SchemaMismatch {
        missing: Vec<String>,
        found: Vec<String>,
    },
    #[error("Log file does not exist: {0:?}")]
    MissingFile(PathBuf),
    #[error("No {0} log found")]
    NotFound(LogKind),
}

/// Check that every column of `T` appears in `headers`.
pub fn check_columns<T: CsvSchema>(headers: &csv::StringRecord) -> Result<(), LoadError> {
    let missing = T::COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .map(|col| col.to_string())
        .collect_vec();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(LoadError::SchemaMismatch {
            missing,
            found: headers.iter().map(String::from).collect(),
        })
    }
}

/// Read all records of type `T` from a CSV log at `path`.
///
/// The header is validated before any row is parsed, such that a log of the wrong kind fails with
/// [`LoadError::SchemaMismatch`] instead of an obscure deserialization error. A log with a valid
/// header and no rows yields an empty vector.
pub fn load_records<T: CsvSchema>(path: impl AsRef<Path>) -> Result<Vec<T>, LoadError> {
    let path = path.as_ref();
    let file = fs::File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    check_columns::<T>(reader.headers()?)?;
    let records: Vec<T> = reader.deserialize().collect::<Result<_, _>>()?;

    if records.is_empty() {
        log::warn!("File {path:?} is empty");
    } else {
        log::info!("Successfully loaded {} records from {path:?}", records.len());
    }
    Ok(records)
}

/// Pick the input file of an analysis: the explicitly given path if any, otherwise the most
/// recent log of the given kind.
pub fn resolve_input(
    layout: &DataLayout,
    kind: LogKind,
    explicit: Option<&Path>,
) -> Result<PathBuf, LoadError> {
    match explicit {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => Err(LoadError::MissingFile(path.to_path_buf())),
        None => layout.find_latest(kind).ok_or(LoadError::NotFound(kind)),
    }
}

/// Resolve and load the input of an analysis in one step.
pub fn load_input<T: CsvSchema>(
    layout: &DataLayout,
    kind: LogKind,
    explicit: Option<&Path>,
) -> Result<(PathBuf, Vec<T>), LoadError> {
    let path = resolve_input(layout, kind, explicit)?;
    let records = load_records(&path)?;
    Ok((path, records))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::records::{LoadBalanceRecord, WaitTimeRecord};

    #[test]
    fn schema_mismatch_names_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wait_time_1.csv");
        fs::write(&path, "XpuId,Wait\n1,20\n").unwrap();

        match load_records::<WaitTimeRecord>(&path) {
            Err(LoadError::SchemaMismatch { missing, found }) => {
                assert_eq!(missing, vec!["WaitTime(ns)".to_string()]);
                assert_eq!(found, vec!["XpuId".to_string(), "Wait".to_string()]);
            }
            x => panic!("unexpected result {x:?}"),
        }
    }

    #[test]
    fn header_only_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("load_balance_1.csv");
        fs::write(&path, "LocalXpuId,DestXpuId,VcId,SueId\n").unwrap();
        assert!(load_records::<LoadBalanceRecord>(&path).unwrap().is_empty());
    }

    #[test]
    fn extra_columns_and_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("load_balance_1.csv");
        fs::write(
            &path,
            "LocalXpuId, DestXpuId, VcId, SueId, Extra\n1, 2, 0, 3, x\n1, 3, 1, 4, y\n",
        )
        .unwrap();
        let records = load_records::<LoadBalanceRecord>(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].sue_id, 4);
        assert_eq!(records[1].vc_id, 1);
    }

    #[test]
    fn resolve_explicit_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::with_data_root(dir.path());
        assert!(matches!(
            resolve_input(&layout, LogKind::XpuDelay, None),
            Err(LoadError::NotFound(LogKind::XpuDelay))
        ));

        let missing = dir.path().join("nope.csv");
        assert!(matches!(
            resolve_input(&layout, LogKind::XpuDelay, Some(&missing)),
            Err(LoadError::MissingFile(_))
        ));

        let path = dir.path().join("any_name.csv");
        fs::write(&path, "").unwrap();
        assert_eq!(
            resolve_input(&layout, LogKind::XpuDelay, Some(&path)).unwrap(),
            path
        );
    }
}
