//! CSV loading
//!
//! Reads an earthquake CSV into a [`RawTable`] of trimmed string cells.
//! Typing happens later in the cleaner so that column selection stays
//! configuration-driven.

use crate::error::{Result, RiskError};
use csv::{ReaderBuilder, Trim, Writer};
use std::path::Path;
use tracing::debug;

/// Header plus rows of string cells, exactly as read from disk
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Position of a column by header name
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| RiskError::MissingColumn(name.to_string()))
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Whether a cell counts as missing
    pub fn is_missing(cell: &str) -> bool {
        matches!(
            cell.trim(),
            "" | "NA" | "N/A" | "NaN" | "nan" | "null" | "NULL" | "None"
        )
    }
}

/// Data loader for CSV files
pub struct DataLoader;

impl DataLoader {
    /// Load a CSV file with a header row
    pub fn load_table<P: AsRef<Path>>(path: P) -> Result<RawTable> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_path(path.as_ref())?;

        let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        debug!(
            "Loaded {} rows x {} columns from {:?}",
            rows.len(),
            headers.len(),
            path.as_ref()
        );

        Ok(RawTable { headers, rows })
    }

    /// Write a raw table back to CSV
    pub fn save_table<P: AsRef<Path>>(table: &RawTable, path: P) -> Result<()> {
        let mut writer = Writer::from_path(path.as_ref())?;
        writer.write_record(&table.headers)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quakes.csv");
        std::fs::write(
            &path,
            "magnitude,alert,tsunami\n7.0, green ,1\n6.5,,0\n",
        )
        .unwrap();

        let table = DataLoader::load_table(&path).unwrap();
        assert_eq!(table.headers, vec!["magnitude", "alert", "tsunami"]);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.rows[0][1], "green");
        assert!(RawTable::is_missing(&table.rows[1][1]));
        assert_eq!(table.column_index("tsunami").unwrap(), 2);
        assert!(table.column_index("depth").is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("roundtrip.csv");
        let table = RawTable {
            headers: vec!["a".into(), "b".into()],
            rows: vec![vec!["1".into(), "x".into()]],
        };

        DataLoader::save_table(&table, &path).unwrap();
        let loaded = DataLoader::load_table(&path).unwrap();
        assert_eq!(loaded.rows, table.rows);
    }
}
