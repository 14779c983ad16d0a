//! Contour level generation from an interpolated depth grid.
//!
//! Levels partition the continuous surface into bands for the 2D contour
//! and 3D surface rendering collaborators. They are derived solely from the
//! valid cells of the grid and must be recomputed whenever the grid changes.

use thiserror::Error;

use crate::config::LevelConfig;
use crate::core::grid::DepthGrid;

/// Errors that can occur during level generation.
#[derive(Error, Debug)]
pub enum LevelError {
    #[error("empty grid: every cell is masked invalid")]
    EmptyGrid,
}

/// Result type for level operations.
pub type Result<T> = std::result::Result<T, LevelError>;

/// An ordered set of contour levels with the valid depth range they span.
///
/// Invariant: `min_depth <= levels[0] < ... < levels[n-1] <= max_depth`.
/// A flat surface (min == max) carries a single level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSet {
    /// Strictly increasing contour thresholds.
    pub levels: Vec<f64>,
    /// Minimum depth over valid grid cells.
    pub min_depth: f64,
    /// Maximum depth over valid grid cells.
    pub max_depth: f64,
}

/// Generate evenly spaced contour levels over the valid range of a grid.
///
/// Minimum and maximum are computed over valid (unmasked) cells only.
/// `config.count` levels span the range inclusively. A degenerate flat
/// surface, or a requested count below 2, yields the single-level set
/// `[min]` rather than dividing by zero.
///
/// # Errors
///
/// Returns `EmptyGrid` if no cell is valid.
pub fn contour_levels(grid: &DepthGrid, config: &LevelConfig) -> Result<LevelSet> {
    let (min_depth, max_depth) = grid.valid_range().ok_or(LevelError::EmptyGrid)?;

    if min_depth == max_depth || config.count < 2 {
        return Ok(LevelSet {
            levels: vec![min_depth],
            min_depth,
            max_depth,
        });
    }

    let count = config.count;
    let step = (max_depth - min_depth) / (count - 1) as f64;
    let levels = (0..count)
        .map(|i| {
            if i == count - 1 {
                max_depth
            } else {
                min_depth + i as f64 * step
            }
        })
        .collect();

    Ok(LevelSet {
        levels,
        min_depth,
        max_depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn grid_from_values(values: &[f64], mask: &[bool]) -> DepthGrid {
        let n = values.len();
        let lat = Array2::zeros((1, n));
        let lon = Array2::zeros((1, n));
        let distance = Array2::from_shape_vec((1, n), values.to_vec()).unwrap();
        let mask = Array2::from_shape_vec((1, n), mask.to_vec()).unwrap();
        DepthGrid::new(lat, lon, distance, mask).unwrap()
    }

    #[test]
    fn test_levels_strictly_increasing_and_bounded() {
        let grid = grid_from_values(&[5.0, 30.0, 12.5, 40.0], &[true, true, true, true]);
        let set = contour_levels(&grid, &LevelConfig::default()).unwrap();

        assert_eq!(set.levels.len(), 10);
        assert_eq!(set.min_depth, 5.0);
        assert_eq!(set.max_depth, 40.0);
        assert_relative_eq!(set.levels[0], 5.0);
        assert_relative_eq!(*set.levels.last().unwrap(), 40.0);
        for pair in set.levels.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        for &level in &set.levels {
            assert!(level >= set.min_depth && level <= set.max_depth);
        }
    }

    #[test]
    fn test_masked_cells_excluded_from_range() {
        // The masked extremes must not widen the level span.
        let grid = grid_from_values(
            &[-999.0, 10.0, 20.0, 999.0],
            &[false, true, true, false],
        );
        let set = contour_levels(&grid, &LevelConfig::default()).unwrap();

        assert_eq!(set.min_depth, 10.0);
        assert_eq!(set.max_depth, 20.0);
    }

    #[test]
    fn test_flat_surface_single_level() {
        let grid = grid_from_values(&[7.0, 7.0, 7.0], &[true, true, true]);
        let set = contour_levels(&grid, &LevelConfig::default()).unwrap();

        assert_eq!(set.levels, vec![7.0]);
        assert_eq!(set.min_depth, 7.0);
        assert_eq!(set.max_depth, 7.0);
    }

    #[test]
    fn test_empty_grid_error() {
        let grid = grid_from_values(&[1.0, 2.0], &[false, false]);
        let result = contour_levels(&grid, &LevelConfig::default());
        assert!(matches!(result, Err(LevelError::EmptyGrid)));
    }

    #[test]
    fn test_single_level_request_honored() {
        let grid = grid_from_values(&[0.0, 100.0], &[true, true]);
        let set = contour_levels(&grid, &LevelConfig { count: 1 }).unwrap();

        assert_eq!(set.levels, vec![0.0]);
        assert_eq!(set.min_depth, 0.0);
        assert_eq!(set.max_depth, 100.0);
    }

    #[test]
    fn test_custom_level_count() {
        let grid = grid_from_values(&[0.0, 100.0], &[true, true]);
        let set = contour_levels(&grid, &LevelConfig { count: 5 }).unwrap();

        assert_eq!(set.levels.len(), 5);
        assert_relative_eq!(set.levels[1], 25.0);
        assert_relative_eq!(set.levels[3], 75.0);
    }
}
