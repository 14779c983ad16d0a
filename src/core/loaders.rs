//! Data loaders for depth sample CSV files.
//!
//! This module provides the canonical in-memory point table and parsers for
//! delimited sample files with `lat`, `lon`, `distance` columns. Additional
//! columns are ignored; missing values are represented by empty fields.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use log::warn;
use thiserror::Error;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Missing required columns in '{path}': {columns}")]
    MissingColumns { path: PathBuf, columns: String },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// A single raw sample as parsed from file, before cleaning.
///
/// Fields that were empty or non-numeric in the source are `None`; the
/// cleaning stage counts and drops such rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub distance: Option<f64>,
}

impl RawSample {
    /// Returns true if all three fields parsed to numeric values.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.lat.is_some() && self.lon.is_some() && self.distance.is_some()
    }
}

/// Container for cleaned (lat, lon, distance) depth samples.
///
/// Columnar layout with equal-length columns by construction. The cleaning
/// stage guarantees no duplicate (lat, lon) pair and no outlier distance in
/// tables it produces; each stage consumes a table and emits a new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointTable {
    /// Latitude of each sample.
    pub lat: Vec<f64>,
    /// Longitude of each sample.
    pub lon: Vec<f64>,
    /// Measured distance/depth of each sample.
    pub distance: Vec<f64>,
}

impl PointTable {
    /// Creates a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new table with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lat: Vec::with_capacity(capacity),
            lon: Vec::with_capacity(capacity),
            distance: Vec::with_capacity(capacity),
        }
    }

    /// Creates a table from coordinate and value vectors.
    pub fn from_columns(lat: Vec<f64>, lon: Vec<f64>, distance: Vec<f64>) -> Self {
        debug_assert_eq!(lat.len(), lon.len());
        debug_assert_eq!(lat.len(), distance.len());
        Self { lat, lon, distance }
    }

    /// Returns the number of samples in the table.
    #[inline]
    pub fn len(&self) -> usize {
        self.lat.len()
    }

    /// Returns true if the table has no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lat.is_empty()
    }

    /// Adds a sample to the table.
    #[inline]
    pub fn push(&mut self, lat: f64, lon: f64, distance: f64) {
        self.lat.push(lat);
        self.lon.push(lon);
        self.distance.push(distance);
    }

    /// Returns the (lat, lon) coordinates as fixed-size arrays for spatial indexing.
    pub fn coords(&self) -> Vec<[f64; 2]> {
        let n = self.len();
        let mut coords = Vec::with_capacity(n);
        for i in 0..n {
            coords.push([self.lat[i], self.lon[i]]);
        }
        coords
    }

    /// Returns the bounding box as ((lat_min, lat_max), (lon_min, lon_max)).
    ///
    /// Returns `None` for an empty table.
    pub fn bounding_box(&self) -> Option<((f64, f64), (f64, f64))> {
        if self.is_empty() {
            return None;
        }
        let mut lat_min = self.lat[0];
        let mut lat_max = self.lat[0];
        let mut lon_min = self.lon[0];
        let mut lon_max = self.lon[0];
        for i in 1..self.len() {
            lat_min = lat_min.min(self.lat[i]);
            lat_max = lat_max.max(self.lat[i]);
            lon_min = lon_min.min(self.lon[i]);
            lon_max = lon_max.max(self.lon[i]);
        }
        Some(((lat_min, lat_max), (lon_min, lon_max)))
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path).map_err(|e| LoaderError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file)))
}

/// Resolve the `lat`, `lon`, `distance` column indices from the header row.
///
/// Header matching is case-insensitive; extra columns are ignored. Missing
/// columns produce a `MissingColumns` error naming each absent column.
fn resolve_columns(path: &Path, headers: &csv::StringRecord) -> Result<(usize, usize, usize)> {
    let col_map: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_lowercase(), i))
        .collect();

    let mut missing = Vec::new();
    for required in ["lat", "lon", "distance"] {
        if !col_map.contains_key(required) {
            missing.push(required);
        }
    }
    if !missing.is_empty() {
        return Err(LoaderError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing.join(", "),
        });
    }

    Ok((col_map["lat"], col_map["lon"], col_map["distance"]))
}

/// Load raw samples from a delimited sample file.
///
/// Each row yields a `RawSample` whose fields are `None` when the cell is
/// empty or non-numeric; no rows are dropped here, so the cleaning stage can
/// account for every loaded row.
///
/// # Arguments
///
/// * `path` - Path to the sample CSV file
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid CSV, or its
/// header lacks any of the `lat`, `lon`, `distance` columns.
pub fn load_samples<P: AsRef<Path>>(path: P) -> Result<Vec<RawSample>> {
    let path = path.as_ref();
    let mut reader = open_reader(path)?;

    let headers = reader.headers()?.clone();
    let (lat_idx, lon_idx, dist_idx) = resolve_columns(path, &headers)?;

    let mut samples = Vec::new();
    for result in reader.records() {
        let record = result?;
        let field = |idx: usize| -> Option<f64> {
            record
                .get(idx)
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };
        samples.push(RawSample {
            lat: field(lat_idx),
            lon: field(lon_idx),
            distance: field(dist_idx),
        });
    }

    Ok(samples)
}

/// Load a cleaned point table from a delimited sample file.
///
/// Rows with missing or non-numeric fields are skipped with a warning; a
/// cleaned artifact should not contain any.
///
/// # Errors
///
/// Returns an error if the file cannot be read, lacks required columns, or
/// holds no complete rows at all.
pub fn load_point_table<P: AsRef<Path>>(path: P) -> Result<PointTable> {
    let path = path.as_ref();
    let samples = load_samples(path)?;

    let mut table = PointTable::with_capacity(samples.len());
    let mut skipped = 0usize;
    for sample in &samples {
        match (sample.lat, sample.lon, sample.distance) {
            (Some(lat), Some(lon), Some(distance)) => table.push(lat, lon, distance),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(
            "skipped {} incomplete rows while loading '{}'",
            skipped,
            path.display()
        );
    }

    if table.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    Ok(table)
}
