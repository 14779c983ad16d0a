//! Scattered-point to regular-grid interpolation.
//!
//! Builds a regular grid over the bounding box of a cleaned point table and
//! interpolates the scattered depth values onto it with inverse-distance
//! weighting over KD-tree nearest neighbors. Grid cells outside the convex
//! hull of the samples are masked invalid rather than extrapolated: depth
//! claims past data coverage are never fabricated.
//!
//! For a fixed table and configuration the output is bit-for-bit
//! reproducible; rows are processed with a rayon ordered map and neighbor
//! weights are summed in KD-tree result order, which is fixed for a fixed
//! table.

use std::path::{Path, PathBuf};

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use log::info;
use ndarray::Array2;
use rayon::prelude::*;
use thiserror::Error;

use crate::config::GridConfig;
use crate::core::grid::{DepthGrid, GridError};
use crate::core::loaders::{self, LoaderError, PointTable};
use crate::core::writers::{self, WriteError};

/// Squared-distance threshold below which a grid node is treated as an
/// exact hit on a sample and takes its value directly.
const EXACT_HIT_SQ: f64 = 1e-24;

/// Errors that can occur during the interpolation stage.
#[derive(Error, Debug)]
pub enum InterpolationError {
    #[error(transparent)]
    Load(#[from] LoaderError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("insufficient data: {points} points, need at least 3 non-collinear")]
    InsufficientData { points: usize },
}

/// Result type for interpolation operations.
pub type Result<T> = std::result::Result<T, InterpolationError>;

/// Compute the convex hull of (lat, lon) points with Andrew's monotone chain.
///
/// Returns hull vertices in counter-clockwise order. Collinear boundary
/// points are dropped, so a fully collinear input yields fewer than 3
/// vertices.
fn convex_hull(points: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut pts: Vec<[f64; 2]> = points.to_vec();
    pts.sort_by(|a, b| a.partial_cmp(b).unwrap());
    pts.dedup();

    let n = pts.len();
    if n < 3 {
        return pts;
    }

    let cross = |o: [f64; 2], a: [f64; 2], b: [f64; 2]| -> f64 {
        (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
    };

    let mut hull: Vec<[f64; 2]> = Vec::with_capacity(2 * n);

    // Lower chain
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }

    // Upper chain
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }

    hull.pop(); // last point repeats the first
    hull
}

/// Test whether a point lies inside or on the boundary of a convex polygon
/// given in counter-clockwise order.
fn point_in_hull(p: [f64; 2], hull: &[[f64; 2]], tol: f64) -> bool {
    let n = hull.len();
    for i in 0..n {
        let a = hull[i];
        let b = hull[(i + 1) % n];
        let cross = (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0]);
        if cross < -tol {
            return false;
        }
    }
    true
}

/// Interpolate a cleaned point table onto a regular grid.
///
/// The grid spans the lat/lon bounding box of the table at
/// `config.resolution` nodes per axis (rows vary latitude, columns vary
/// longitude). Each in-coverage node takes the inverse-distance-weighted
/// value of its `config.neighbors` nearest samples; nodes outside the
/// convex hull of the samples are masked invalid.
///
/// # Errors
///
/// Returns `InsufficientData` if the table holds fewer than 3 points or all
/// points are collinear.
pub fn interpolate_grid(table: &PointTable, config: &GridConfig) -> Result<DepthGrid> {
    let n = table.len();
    if n < 3 {
        return Err(InterpolationError::InsufficientData { points: n });
    }

    let coords = table.coords();
    let hull = convex_hull(&coords);
    if hull.len() < 3 {
        return Err(InterpolationError::InsufficientData { points: n });
    }

    let ((lat_min, lat_max), (lon_min, lon_max)) = table
        .bounding_box()
        .expect("non-empty table has a bounding box");

    let res = config.resolution.max(2);
    let lat_step = (lat_max - lat_min) / (res - 1) as f64;
    let lon_step = (lon_max - lon_min) / (res - 1) as f64;

    // Boundary-inclusion tolerance scaled to the bounding box so hull edges
    // and corner nodes are not lost to rounding.
    let extent = (lat_max - lat_min).max(lon_max - lon_min);
    let tol = extent * 1e-9;

    let tree: ImmutableKdTree<f64, 2> = ImmutableKdTree::new_from_slice(&coords);
    let neighbors = config.neighbors.min(n).max(1);
    let half_power = config.power / 2.0;

    // Row-parallel: each latitude row is independent, and the ordered map
    // keeps the output layout fixed regardless of scheduling.
    let rows: Vec<Vec<(f64, bool)>> = (0..res)
        .into_par_iter()
        .map(|i| {
            let lat = lat_min + i as f64 * lat_step;
            let mut row = Vec::with_capacity(res);

            for j in 0..res {
                let lon = lon_min + j as f64 * lon_step;
                let node = [lat, lon];

                if !point_in_hull(node, &hull, tol) {
                    row.push((f64::NAN, false));
                    continue;
                }

                let nearest = tree.nearest_n::<SquaredEuclidean>(&node, neighbors);

                let mut value = 0.0;
                let mut weight_sum = 0.0;
                let mut exact = None;
                for nn in &nearest {
                    if nn.distance < EXACT_HIT_SQ {
                        exact = Some(table.distance[nn.item as usize]);
                        break;
                    }
                    // SquaredEuclidean yields squared distances, so the
                    // power-p weight is dist_sq^(-p/2).
                    let weight = nn.distance.powf(-half_power);
                    value += weight * table.distance[nn.item as usize];
                    weight_sum += weight;
                }

                let interpolated = match exact {
                    Some(v) => v,
                    None => value / weight_sum,
                };
                row.push((interpolated, true));
            }

            row
        })
        .collect();

    let mut lat_grid = Array2::<f64>::zeros((res, res));
    let mut lon_grid = Array2::<f64>::zeros((res, res));
    let mut value_grid = Array2::<f64>::zeros((res, res));
    let mut mask = Array2::<bool>::from_elem((res, res), false);

    for i in 0..res {
        for j in 0..res {
            lat_grid[[i, j]] = lat_min + i as f64 * lat_step;
            lon_grid[[i, j]] = lon_min + j as f64 * lon_step;
            let (value, valid) = rows[i][j];
            value_grid[[i, j]] = if valid { value } else { 0.0 };
            mask[[i, j]] = valid;
        }
    }

    Ok(DepthGrid::new(lat_grid, lon_grid, value_grid, mask)?)
}

/// Interpolate a cleaned table file and persist the grid artifacts.
///
/// Reads the cleaned CSV, interpolates onto the regular grid, and writes two
/// companion artifacts: the NPZ container (`lat`, `lon`, `distance` arrays)
/// at `output_path` and the flattened grid table at the same path with a
/// `csv` extension.
///
/// # Arguments
///
/// * `cleaned_path` - Path to a cleaned sample CSV
/// * `output_path` - Destination for the NPZ grid artifact
/// * `config` - Grid parameters (resolution, neighbor count, IDW power)
///
/// # Returns
///
/// The path of the written NPZ artifact.
///
/// # Errors
///
/// Returns an error if the cleaned table cannot be read, holds insufficient
/// data, or either artifact cannot be written.
pub fn interpolate_and_save<P: AsRef<Path>, Q: AsRef<Path>>(
    cleaned_path: P,
    output_path: Q,
    config: &GridConfig,
) -> Result<PathBuf> {
    let cleaned_path = cleaned_path.as_ref();
    let output_path = output_path.as_ref();

    let table = match loaders::load_point_table(cleaned_path) {
        Ok(table) => table,
        // A cleaned file with no complete rows is an insufficient-data case
        // of this stage, not a loader failure.
        Err(LoaderError::EmptyFile(_)) => {
            return Err(InterpolationError::InsufficientData { points: 0 })
        }
        Err(e) => return Err(e.into()),
    };
    let grid = interpolate_grid(&table, config)?;

    writers::write_grid_npz(output_path, &grid)?;
    let csv_path = output_path.with_extension("csv");
    writers::write_grid_csv(&csv_path, &grid)?;

    info!(
        "interpolated '{}' onto {}x{} grid -> '{}' ({} valid cells)",
        cleaned_path.display(),
        grid.shape().0,
        grid.shape().1,
        output_path.display(),
        grid.valid_count()
    );

    Ok(output_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::load_grid;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::TempDir;

    /// Four corners of a unit square plus a center point.
    fn square_table() -> PointTable {
        PointTable::from_columns(
            vec![0.0, 0.0, 1.0, 1.0, 0.5],
            vec![0.0, 1.0, 0.0, 1.0, 0.5],
            vec![10.0, 20.0, 30.0, 40.0, 25.0],
        )
    }

    fn small_config() -> GridConfig {
        GridConfig {
            resolution: 11,
            ..GridConfig::default()
        }
    }

    #[test]
    fn test_convex_hull_square() {
        let points = [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0], [0.5, 0.5]];
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert!(hull.contains(&[0.0, 0.0]));
        assert!(hull.contains(&[1.0, 1.0]));
        assert!(!hull.contains(&[0.5, 0.5]));
    }

    #[test]
    fn test_convex_hull_collinear_degenerates() {
        let points = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let hull = convex_hull(&points);
        assert!(hull.len() < 3);
    }

    #[test]
    fn test_point_in_hull() {
        let hull = convex_hull(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]);
        assert!(point_in_hull([0.5, 0.5], &hull, 1e-9));
        assert!(point_in_hull([0.0, 0.0], &hull, 1e-9)); // vertex
        assert!(point_in_hull([0.0, 0.5], &hull, 1e-9)); // edge
        assert!(!point_in_hull([1.5, 0.5], &hull, 1e-9));
        assert!(!point_in_hull([-0.1, 0.5], &hull, 1e-9));
    }

    #[test]
    fn test_grid_shape_consistency() {
        let grid = interpolate_grid(&square_table(), &small_config()).unwrap();
        assert_eq!(grid.lat.dim(), grid.lon.dim());
        assert_eq!(grid.lat.dim(), grid.distance.dim());
        assert_eq!(grid.lat.dim(), grid.mask.dim());
        assert_eq!(grid.shape(), (11, 11));
    }

    #[test]
    fn test_grid_axes_span_bounding_box() {
        let grid = interpolate_grid(&square_table(), &small_config()).unwrap();
        assert_relative_eq!(grid.lat[[0, 0]], 0.0);
        assert_relative_eq!(grid.lat[[10, 0]], 1.0);
        assert_relative_eq!(grid.lon[[0, 0]], 0.0);
        assert_relative_eq!(grid.lon[[0, 10]], 1.0);
        // Rows vary latitude, columns vary longitude.
        assert_relative_eq!(grid.lat[[3, 7]], grid.lat[[3, 0]]);
        assert_relative_eq!(grid.lon[[3, 7]], grid.lon[[0, 7]]);
    }

    #[test]
    fn test_square_coverage_fully_valid() {
        // The hull of the square is the whole bounding box.
        let grid = interpolate_grid(&square_table(), &small_config()).unwrap();
        assert_eq!(grid.valid_count(), 11 * 11);
    }

    #[test]
    fn test_triangle_masks_outside_hull() {
        // Right triangle: the far corner of the bounding box lies outside.
        let table = PointTable::from_columns(
            vec![0.0, 0.0, 1.0],
            vec![0.0, 1.0, 0.0],
            vec![10.0, 20.0, 30.0],
        );
        let grid = interpolate_grid(&table, &small_config()).unwrap();

        assert!(!grid.mask[[10, 10]]);
        assert!(grid.mask[[0, 0]]);
        assert!(grid.mask[[10, 0]]);
        assert!(grid.mask[[0, 10]]);
        // Every invalid cell must lie strictly beyond the hypotenuse lat + lon = 1.
        let (rows, cols) = grid.shape();
        for i in 0..rows {
            for j in 0..cols {
                if !grid.mask[[i, j]] {
                    assert!(grid.lat[[i, j]] + grid.lon[[i, j]] > 1.0);
                }
            }
        }
    }

    #[test]
    fn test_sample_nodes_take_sample_values() {
        // Grid corners coincide with the square's corner samples.
        let grid = interpolate_grid(&square_table(), &small_config()).unwrap();
        assert_relative_eq!(grid.distance[[0, 0]], 10.0);
        assert_relative_eq!(grid.distance[[0, 10]], 20.0);
        assert_relative_eq!(grid.distance[[10, 0]], 30.0);
        assert_relative_eq!(grid.distance[[10, 10]], 40.0);
        assert_relative_eq!(grid.distance[[5, 5]], 25.0);
    }

    #[test]
    fn test_interpolated_values_within_sample_range() {
        let grid = interpolate_grid(&square_table(), &small_config()).unwrap();
        for (_, _, value) in grid.valid_cells() {
            assert!((10.0..=40.0).contains(&value));
        }
    }

    #[test]
    fn test_insufficient_points() {
        let table = PointTable::from_columns(vec![0.0, 1.0], vec![0.0, 1.0], vec![5.0, 6.0]);
        let result = interpolate_grid(&table, &small_config());
        assert!(matches!(
            result,
            Err(InterpolationError::InsufficientData { points: 2 })
        ));
    }

    #[test]
    fn test_collinear_points_rejected() {
        let table = PointTable::from_columns(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![0.0, 1.0, 2.0, 3.0],
            vec![5.0, 6.0, 7.0, 8.0],
        );
        let result = interpolate_grid(&table, &small_config());
        assert!(matches!(
            result,
            Err(InterpolationError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_deterministic_repeat() {
        let table = square_table();
        let config = small_config();
        let a = interpolate_grid(&table, &config).unwrap();
        let b = interpolate_grid(&table, &config).unwrap();
        assert_eq!(a.distance, b.distance);
        assert_eq!(a.mask, b.mask);
    }

    #[test]
    fn test_interpolate_and_save_artifacts() {
        let dir = TempDir::new().unwrap();
        let cleaned = dir.path().join("cleaned.csv");
        let mut file = std::fs::File::create(&cleaned).unwrap();
        writeln!(file, "lat,lon,distance").unwrap();
        writeln!(file, "0.0,0.0,10").unwrap();
        writeln!(file, "0.0,1.0,20").unwrap();
        writeln!(file, "1.0,0.0,30").unwrap();
        writeln!(file, "1.0,1.0,40").unwrap();
        drop(file);

        let npz_path = dir.path().join("grid.npz");
        let config = small_config();
        let written = interpolate_and_save(&cleaned, &npz_path, &config).unwrap();

        assert_eq!(written, npz_path);
        assert!(npz_path.exists());
        let csv_path = dir.path().join("grid.csv");
        assert!(csv_path.exists());

        let grid = load_grid(&npz_path).unwrap();
        assert_eq!(grid.shape(), (11, 11));
        assert_eq!(grid.valid_count(), 11 * 11);

        // Flattened CSV has one row per valid cell plus the header.
        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(content.lines().count(), 1 + grid.valid_count());
    }

    #[test]
    fn test_interpolate_and_save_empty_table_is_insufficient() {
        let dir = TempDir::new().unwrap();
        let cleaned = dir.path().join("cleaned.csv");
        std::fs::write(&cleaned, "lat,lon,distance\n").unwrap();

        let result = interpolate_and_save(&cleaned, dir.path().join("grid.npz"), &small_config());
        assert!(matches!(
            result,
            Err(InterpolationError::InsufficientData { points: 0 })
        ));
    }

    #[test]
    fn test_interpolate_and_save_insufficient() {
        let dir = TempDir::new().unwrap();
        let cleaned = dir.path().join("cleaned.csv");
        std::fs::write(&cleaned, "lat,lon,distance\n0.0,0.0,10\n1.0,1.0,20\n").unwrap();

        let result = interpolate_and_save(&cleaned, dir.path().join("grid.npz"), &small_config());
        assert!(matches!(
            result,
            Err(InterpolationError::InsufficientData { .. })
        ));
    }
}
