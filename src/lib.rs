//! Bathymetric depth map processing pipeline.
//!
//! This crate provides tools for:
//! - Loading and cleaning scattered (lat, lon, distance) depth samples
//! - Statistical cleaning: null removal, duplicate resolution, IQR outlier rejection
//! - Interpolating scattered samples onto a regular masked grid (parallelized)
//! - Deriving contour levels from the valid grid range
//!
//! # Example
//!
//! ```no_run
//! use depth_pipeline::config::PipelineConfig;
//! use depth_pipeline::processors::cleaning::clean;
//!
//! let config = PipelineConfig::default();
//! let (cleaned_path, summary) = clean("soundings.csv", true, &config.cleaning).unwrap();
//! println!("{}", summary);
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;

pub use config::{CleaningConfig, GridConfig, LevelConfig, PipelineConfig};
pub use core::grid::DepthGrid;
pub use core::loaders::PointTable;
pub use processors::cleaning::CleaningSummary;
pub use processors::levels::LevelSet;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
