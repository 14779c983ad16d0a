//! Data writers for the pipeline artifacts.
//!
//! This module provides functions for writing pipeline outputs:
//! - Cleaned point tables as CSV with `lat,lon,distance` columns
//! - Grid artifacts as NPZ containers with named `lat`, `lon`, `distance` arrays
//! - Flattened grid tables as CSV (one row per valid grid cell)

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use ndarray_npy::{NpzWriter, WriteNpzError};
use thiserror::Error;

use super::grid::DepthGrid;
use super::loaders::PointTable;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// NPZ writing error.
    #[error("NPZ write error for '{path}': {source}")]
    NpzError {
        path: String,
        #[source]
        source: WriteNpzError,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

fn create_file(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })
}

/// Write a point table to CSV with `lat,lon,distance` columns.
///
/// Creates a CSV file with a header row and one row per sample. Uses a
/// buffered writer for performance.
///
/// # Arguments
///
/// * `path` - Output file path (parent directories will be created if needed)
/// * `table` - Point table to write
///
/// # Errors
///
/// Returns an error if parent directories or the file cannot be created, or
/// a row cannot be written.
pub fn write_point_csv(path: &Path, table: &PointTable) -> Result<()> {
    ensure_parent_dirs(path)?;

    let file = create_file(path)?;
    let buf_writer = BufWriter::new(file);
    let mut csv_writer = csv::Writer::from_writer(buf_writer);

    let path_str = path.display().to_string();

    csv_writer
        .write_record(["lat", "lon", "distance"])
        .map_err(|e| WriteError::CsvError {
            path: path_str.clone(),
            source: e,
        })?;

    for i in 0..table.len() {
        csv_writer
            .write_record(&[
                format!("{:.6}", table.lat[i]),
                format!("{:.6}", table.lon[i]),
                format!("{:.6}", table.distance[i]),
            ])
            .map_err(|e| WriteError::CsvError {
                path: path_str.clone(),
                source: e,
            })?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}

/// Write a depth grid to an NPZ artifact with named `lat`, `lon`, `distance`
/// arrays.
///
/// All three arrays share the grid shape; invalid cells are encoded as NaN
/// in the `distance` array, which is how consumers (and [`super::grid::load_grid`])
/// recover the validity mask.
///
/// # Errors
///
/// Returns an error if the file cannot be created or an array cannot be
/// serialized.
pub fn write_grid_npz(path: &Path, grid: &DepthGrid) -> Result<()> {
    ensure_parent_dirs(path)?;

    let file = create_file(path)?;
    let path_str = path.display().to_string();
    let npz_err = |e: WriteNpzError| WriteError::NpzError {
        path: path_str.clone(),
        source: e,
    };

    let mut npz = NpzWriter::new(file);
    npz.add_array("lat", &grid.lat).map_err(npz_err)?;
    npz.add_array("lon", &grid.lon).map_err(npz_err)?;
    npz.add_array("distance", &grid.distance_with_nan())
        .map_err(npz_err)?;
    npz.finish().map_err(npz_err)?;

    Ok(())
}

/// Write the flattened grid table: one CSV row per valid grid cell.
///
/// Same `lat,lon,distance` column semantics as the input table, but
/// grid-aligned. Invalid (out-of-coverage) cells are omitted entirely.
///
/// # Errors
///
/// Returns an error if the file cannot be created or a row cannot be written.
pub fn write_grid_csv(path: &Path, grid: &DepthGrid) -> Result<()> {
    ensure_parent_dirs(path)?;

    let file = create_file(path)?;
    let buf_writer = BufWriter::new(file);
    let mut csv_writer = csv::Writer::from_writer(buf_writer);

    let path_str = path.display().to_string();

    csv_writer
        .write_record(["lat", "lon", "distance"])
        .map_err(|e| WriteError::CsvError {
            path: path_str.clone(),
            source: e,
        })?;

    for (lat, lon, distance) in grid.valid_cells() {
        csv_writer
            .write_record(&[
                format!("{:.6}", lat),
                format!("{:.6}", lon),
                format!("{:.6}", distance),
            ])
            .map_err(|e| WriteError::CsvError {
                path: path_str.clone(),
                source: e,
            })?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}
