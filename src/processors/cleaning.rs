//! Statistical cleaning of raw depth samples.
//!
//! The cleaning stage runs three substeps in fixed order, each producing a
//! new table and feeding a counter in the summary:
//! 1. Null removal (always): rows with a missing or non-numeric field
//! 2. Duplicate resolution (raw input only): identical (lat, lon) pairs
//!    collapse to the first occurrence
//! 3. Outlier rejection (raw input only): the IQR fence rule over `distance`

use std::fmt;
use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::config::CleaningConfig;
use crate::core::loaders::{self, LoaderError, PointTable, RawSample};
use crate::core::writers::{self, WriteError};

/// Errors that can occur during the cleaning stage.
#[derive(Error, Debug)]
pub enum CleaningError {
    #[error(transparent)]
    Load(#[from] LoaderError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Result type for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Counters for one cleaning run.
///
/// Invariant: `remaining = loaded - dropped_null - dropped_duplicate -
/// dropped_outlier`. Immutable once produced; the `Display` rendering is the
/// summary text consumed by report collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleaningSummary {
    /// Total rows read from the input file.
    pub loaded: usize,
    /// Rows dropped for a missing or non-numeric field.
    pub dropped_null: usize,
    /// Rows removed as duplicate (lat, lon) pairs.
    pub dropped_duplicate: usize,
    /// Rows removed as IQR outliers.
    pub dropped_outlier: usize,
    /// Rows retained after all substeps.
    pub remaining: usize,
}

impl fmt::Display for CleaningSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total rows loaded: {}", self.loaded)?;
        writeln!(f, "Rows dropped due to null values: {}", self.dropped_null)?;
        writeln!(
            f,
            "Rows removed due to duplicates: {}",
            self.dropped_duplicate
        )?;
        writeln!(f, "Rows removed due to outliers: {}", self.dropped_outlier)?;
        write!(
            f,
            "Total rows left after cleaning: {}",
            self.remaining
        )?;
        if self.remaining == 0 {
            write!(f, "\nNo rows remaining after cleaning.")?;
        }
        Ok(())
    }
}

/// Drop rows with any missing field.
///
/// Returns the retained table and the number of dropped rows.
fn drop_nulls(samples: &[RawSample]) -> (PointTable, usize) {
    let mut table = PointTable::with_capacity(samples.len());
    for sample in samples {
        if let (Some(lat), Some(lon), Some(distance)) = (sample.lat, sample.lon, sample.distance) {
            table.push(lat, lon, distance);
        }
    }
    let dropped = samples.len() - table.len();
    (table, dropped)
}

/// Collapse rows sharing an identical (lat, lon) pair to the first occurrence.
///
/// Keyed on the exact bit patterns of the coordinates, preserving input
/// order, so the result is deterministic for a fixed input.
fn drop_duplicates(table: &PointTable) -> (PointTable, usize) {
    use std::collections::HashSet;

    let mut seen: HashSet<(u64, u64)> = HashSet::with_capacity(table.len());
    let mut out = PointTable::with_capacity(table.len());

    for i in 0..table.len() {
        let key = (table.lat[i].to_bits(), table.lon[i].to_bits());
        if seen.insert(key) {
            out.push(table.lat[i], table.lon[i], table.distance[i]);
        }
    }

    let dropped = table.len() - out.len();
    (out, dropped)
}

/// Compute the p-quantile of sorted data with linear interpolation between
/// the two nearest ranks (the convention tabular tools default to).
fn quantile(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    debug_assert!((0.0..=1.0).contains(&p));

    let pos = (sorted.len() - 1) as f64 * p;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let frac = pos - lower as f64;
    sorted[lower] * (1.0 - frac) + sorted[upper] * frac
}

/// Remove rows whose `distance` falls outside the IQR fences
/// `[Q1 - k*IQR, Q3 + k*IQR]`.
///
/// Fences are estimated from `fence_sample`, the null-free distance
/// distribution with duplicates still included: repeated co-located
/// soundings weigh into the quartiles, while removal applies to the
/// deduplicated table. Skipped (count 0) when `fence_sample` has fewer
/// values than `config.min_rows_for_outliers`, where quartile estimation is
/// ill-defined.
fn drop_outliers(
    table: &PointTable,
    fence_sample: &[f64],
    config: &CleaningConfig,
) -> (PointTable, usize) {
    if fence_sample.len() < config.min_rows_for_outliers {
        return (table.clone(), 0);
    }

    let mut sorted = fence_sample.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let low = q1 - config.iqr_multiplier * iqr;
    let high = q3 + config.iqr_multiplier * iqr;

    let mut out = PointTable::with_capacity(table.len());
    for i in 0..table.len() {
        let d = table.distance[i];
        if d >= low && d <= high {
            out.push(table.lat[i], table.lon[i], d);
        }
    }

    let dropped = table.len() - out.len();
    (out, dropped)
}

/// Clean an in-memory batch of raw samples.
///
/// Null removal is always applied. Duplicate resolution and outlier
/// rejection run only when `is_raw` is true; for pre-cleaned input both are
/// no-ops with zero counts, so re-cleaning a cleaned table preserves it.
/// Outlier fences are estimated before duplicate collapse, duplicates
/// included. An input left empty after null removal short-circuits the
/// remaining substeps.
pub fn clean_table(
    samples: &[RawSample],
    is_raw: bool,
    config: &CleaningConfig,
) -> (PointTable, CleaningSummary) {
    let loaded = samples.len();

    let (table, dropped_null) = drop_nulls(samples);

    if table.is_empty() {
        let summary = CleaningSummary {
            loaded,
            dropped_null,
            dropped_duplicate: 0,
            dropped_outlier: 0,
            remaining: 0,
        };
        return (table, summary);
    }

    let fence_sample = table.distance.clone();

    let (table, dropped_duplicate) = if is_raw {
        drop_duplicates(&table)
    } else {
        (table, 0)
    };

    let (table, dropped_outlier) = if is_raw {
        drop_outliers(&table, &fence_sample, config)
    } else {
        (table, 0)
    };

    let summary = CleaningSummary {
        loaded,
        dropped_null,
        dropped_duplicate,
        dropped_outlier,
        remaining: table.len(),
    };

    (table, summary)
}

/// Deterministic output path for a cleaned table: `<stem>_cleaned.csv`
/// beside the input file.
pub fn cleaned_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "data".to_string());
    input.with_file_name(format!("{}_cleaned.csv", stem))
}

/// Load, clean, and persist a depth sample file.
///
/// Reads the raw CSV at `input_path`, runs the cleaning substeps (see
/// [`clean_table`]), writes the cleaned table to a path derived from the
/// input (`<stem>_cleaned.csv`), and returns that path with the summary.
///
/// # Arguments
///
/// * `input_path` - Path to the raw (or pre-cleaned) sample CSV
/// * `is_raw` - When false, duplicate and outlier substeps are skipped
/// * `config` - Cleaning parameters (IQR multiplier, outlier row minimum)
///
/// # Errors
///
/// Returns an error if the input cannot be parsed into the three required
/// numeric columns or the cleaned table cannot be written.
pub fn clean<P: AsRef<Path>>(
    input_path: P,
    is_raw: bool,
    config: &CleaningConfig,
) -> Result<(PathBuf, CleaningSummary)> {
    let input_path = input_path.as_ref();

    let samples = loaders::load_samples(input_path)?;
    let (table, summary) = clean_table(&samples, is_raw, config);

    let out_path = cleaned_path(input_path);
    writers::write_point_csv(&out_path, &table)?;

    info!(
        "cleaned '{}' -> '{}' ({} of {} rows retained)",
        input_path.display(),
        out_path.display(),
        summary.remaining,
        summary.loaded
    );

    Ok((out_path, summary))
}
