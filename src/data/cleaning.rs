//! Cleaning and feature selection
//!
//! Turns a [`RawTable`] into a typed [`Frame`]: keeps only the configured
//! predictors, parses the outcome, derives date parts and imputes the
//! configured nominal columns by their mode.

use super::frame::{column_mode, Frame};
use super::loader::RawTable;
use crate::config::DataConfig;
use crate::error::{Result, RiskError};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::{info, warn};

/// Applies a [`DataConfig`] to raw CSV rows
#[derive(Debug, Clone)]
pub struct Cleaner {
    config: DataConfig,
}

impl Cleaner {
    pub fn new(config: DataConfig) -> Self {
        Self { config }
    }

    /// Clean a raw table
    pub fn clean(&self, table: &RawTable) -> Result<Frame> {
        let cfg = &self.config;

        let outcome_idx = table.column_index(&cfg.outcome)?;
        let numeric_idx: Vec<usize> = cfg
            .numeric
            .iter()
            .map(|name| table.column_index(name))
            .collect::<Result<_>>()?;
        let nominal_idx: Vec<usize> = cfg
            .nominal
            .iter()
            .map(|name| table.column_index(name))
            .collect::<Result<_>>()?;
        let date_idx = match (&cfg.date_column, cfg.derive_date_parts) {
            (Some(name), true) => Some(table.column_index(name)?),
            _ => None,
        };

        for name in &cfg.impute_mode {
            if !cfg.nominal.contains(name) {
                return Err(RiskError::InvalidParameter(format!(
                    "impute_mode column {} is not a nominal predictor",
                    name
                )));
            }
        }

        let mut numeric_names = cfg.numeric.clone();
        if date_idx.is_some() {
            numeric_names.push("year".to_string());
            numeric_names.push("month".to_string());
        }

        let mut numeric: Vec<Vec<f64>> = vec![Vec::new(); numeric_names.len()];
        let mut nominal: Vec<Vec<Option<String>>> = vec![Vec::new(); nominal_idx.len()];
        let mut outcome = Vec::new();
        let mut dropped = 0usize;

        for (row_no, row) in table.rows.iter().enumerate() {
            let y = Self::parse_outcome(&row[outcome_idx]).ok_or_else(|| {
                RiskError::InvalidOutcome {
                    row: row_no + 1,
                    value: row[outcome_idx].clone(),
                }
            })?;

            let mut values: Option<Vec<f64>> = numeric_idx
                .iter()
                .map(|&j| Self::parse_number(&row[j]))
                .collect();

            if let Some(j) = date_idx {
                values = match (values, self.parse_date(&row[j])) {
                    (Some(mut vals), Some(date)) => {
                        vals.push(date.year() as f64);
                        vals.push(date.month() as f64);
                        Some(vals)
                    }
                    _ => None,
                };
            }

            let Some(values) = values else {
                dropped += 1;
                continue;
            };

            for (col, v) in numeric.iter_mut().zip(values) {
                col.push(v);
            }
            for (col, &j) in nominal.iter_mut().zip(&nominal_idx) {
                let cell = &row[j];
                col.push(if RawTable::is_missing(cell) {
                    None
                } else {
                    Some(cell.trim().to_string())
                });
            }
            outcome.push(y);
        }

        if dropped > 0 {
            warn!("Dropped {} rows with missing or unparseable numeric values", dropped);
        }

        if outcome.is_empty() {
            return Err(RiskError::EmptyData(format!(
                "all {} rows were dropped during cleaning",
                table.n_rows()
            )));
        }

        for name in &cfg.impute_mode {
            if let Some(pos) = cfg.nominal.iter().position(|n| n == name) {
                let col = &mut nominal[pos];
                let missing = col.iter().filter(|v| v.is_none()).count();
                if missing == 0 {
                    continue;
                }
                match column_mode(col) {
                    Some(mode) => {
                        info!("Imputing {} missing {} values with mode {:?}", missing, name, mode);
                        for value in col.iter_mut().filter(|v| v.is_none()) {
                            *value = Some(mode.clone());
                        }
                    }
                    None => warn!("Column {} has no observed levels to impute from", name),
                }
            }
        }

        let frame = Frame {
            numeric_names,
            numeric,
            nominal_names: cfg.nominal.clone(),
            nominal,
            outcome,
        };

        let (neg, pos) = frame.class_counts();
        info!(
            "Cleaned {} rows ({} tsunami, {} none), {} numeric + {} nominal predictors",
            frame.n_rows(),
            pos,
            neg,
            frame.numeric_names.len(),
            frame.nominal_names.len()
        );

        Ok(frame)
    }

    fn parse_outcome(cell: &str) -> Option<f64> {
        match cell.trim().to_ascii_lowercase().as_str() {
            "1" | "1.0" | "true" | "yes" => Some(1.0),
            "0" | "0.0" | "false" | "no" => Some(0.0),
            _ => None,
        }
    }

    fn parse_number(cell: &str) -> Option<f64> {
        if RawTable::is_missing(cell) {
            return None;
        }
        cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    fn parse_date(&self, cell: &str) -> Option<NaiveDate> {
        let cell = cell.trim();
        NaiveDateTime::parse_from_str(cell, &self.config.date_format)
            .map(|dt| dt.date())
            .or_else(|_| NaiveDate::parse_from_str(cell, &self.config.date_format))
            .ok()
    }
}
