//! Interpolated depth grid container and NPZ artifact loading.
//!
//! The grid artifact holds three named 2D arrays (`lat`, `lon`, `distance`)
//! of identical shape. In memory the validity of each cell is an explicit
//! boolean mask; inside the artifact invalid cells are encoded as NaN in the
//! `distance` array, and [`load_grid`] rebuilds the mask from those NaNs.

use std::fs::File;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use ndarray_npy::{NpzReader, ReadNpzError};
use thiserror::Error;

/// Errors that can occur when loading or validating a grid artifact.
#[derive(Error, Debug)]
pub enum GridError {
    #[error("IO error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("NPZ read error for '{path}': {source}")]
    Npz {
        path: PathBuf,
        #[source]
        source: ReadNpzError,
    },

    #[error("grid shape mismatch: lat {lat:?}, lon {lon:?}, distance {distance:?}")]
    ShapeMismatch {
        lat: (usize, usize),
        lon: (usize, usize),
        distance: (usize, usize),
    },
}

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;

/// A regular grid of interpolated depth values with a validity mask.
///
/// Rows vary latitude, columns vary longitude. All four arrays share the
/// same shape; `mask` is true where the cell lies inside the coverage of the
/// source samples and `distance` holds an interpolated value there.
#[derive(Debug, Clone)]
pub struct DepthGrid {
    /// Latitude of each grid node.
    pub lat: Array2<f64>,
    /// Longitude of each grid node.
    pub lon: Array2<f64>,
    /// Interpolated depth at each grid node (meaningful only where masked valid).
    pub distance: Array2<f64>,
    /// Validity mask: true = inside data coverage.
    pub mask: Array2<bool>,
}

impl DepthGrid {
    /// Creates a grid from its component arrays.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the three coordinate/value arrays disagree
    /// in shape. The mask must match as well; that is enforced by the same
    /// check since callers build it alongside `distance`.
    pub fn new(
        lat: Array2<f64>,
        lon: Array2<f64>,
        distance: Array2<f64>,
        mask: Array2<bool>,
    ) -> Result<Self> {
        if lat.dim() != lon.dim() || lat.dim() != distance.dim() || lat.dim() != mask.dim() {
            return Err(GridError::ShapeMismatch {
                lat: lat.dim(),
                lon: lon.dim(),
                distance: distance.dim(),
            });
        }
        Ok(Self {
            lat,
            lon,
            distance,
            mask,
        })
    }

    /// Returns the grid shape as (rows, cols).
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.lat.dim()
    }

    /// Returns the number of valid cells.
    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// Iterates over (lat, lon, distance) of valid cells in row-major order.
    pub fn valid_cells(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        let (_, cols) = self.shape();
        self.mask.iter().enumerate().filter_map(move |(idx, &m)| {
            if m {
                let (i, j) = (idx / cols, idx % cols);
                Some((self.lat[[i, j]], self.lon[[i, j]], self.distance[[i, j]]))
            } else {
                None
            }
        })
    }

    /// Returns the minimum and maximum over valid cells, or `None` if every
    /// cell is masked invalid.
    pub fn valid_range(&self) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for (_, _, value) in self.valid_cells() {
            range = Some(match range {
                Some((min, max)) => (min.min(value), max.max(value)),
                None => (value, value),
            });
        }
        range
    }

    /// Copy of the `distance` array with NaN at invalid cells, the encoding
    /// used by the NPZ artifact.
    pub fn distance_with_nan(&self) -> Array2<f64> {
        let mut out = self.distance.clone();
        for (v, &m) in out.iter_mut().zip(self.mask.iter()) {
            if !m {
                *v = f64::NAN;
            }
        }
        out
    }
}

/// Load a grid artifact from an NPZ file.
///
/// Expects the three named arrays `lat`, `lon`, `distance` of identical
/// shape; NaN cells in `distance` become masked-invalid cells.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, any named array is missing
/// or malformed, or the array shapes disagree.
pub fn load_grid<P: AsRef<Path>>(path: P) -> Result<DepthGrid> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| GridError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut npz = NpzReader::new(file).map_err(|e| GridError::Npz {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut by_name = |name: &str| -> Result<Array2<f64>> {
        npz.by_name(name).map_err(|e| GridError::Npz {
            path: path.to_path_buf(),
            source: e,
        })
    };

    let lat = by_name("lat")?;
    let lon = by_name("lon")?;
    let distance = by_name("distance")?;

    let mask = distance.mapv(|v| v.is_finite());
    DepthGrid::new(lat, lon, distance, mask)
}
