//! Data processing stages of the pipeline.

pub mod cleaning;
pub mod interpolation;
pub mod levels;

// Re-export key types for convenience
pub use cleaning::{clean, clean_table, CleaningError, CleaningSummary};
pub use interpolation::{interpolate_and_save, interpolate_grid, InterpolationError};
pub use levels::{contour_levels, LevelError, LevelSet};
