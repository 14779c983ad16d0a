//! Core data types and I/O operations.

pub mod grid;
pub mod loaders;
pub mod writers;

pub use grid::{load_grid, DepthGrid, GridError};
pub use loaders::{PointTable, RawSample};
pub use writers::{write_grid_csv, write_grid_npz, write_point_csv, WriteError};
