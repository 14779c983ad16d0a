//! Configuration types for the depth map pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the statistical cleaning stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// IQR fence multiplier for outlier rejection (Tukey's 1.5 by default)
    #[serde(default = "default_iqr_multiplier")]
    pub iqr_multiplier: f64,

    /// Minimum row count for quartile estimation. Below this the outlier
    /// step is skipped entirely (quartiles of a handful of points are
    /// ill-defined) and the outlier counter stays at zero.
    #[serde(default = "default_min_rows_for_outliers")]
    pub min_rows_for_outliers: usize,
}

fn default_iqr_multiplier() -> f64 {
    1.5
}

fn default_min_rows_for_outliers() -> usize {
    4
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            iqr_multiplier: default_iqr_multiplier(),
            min_rows_for_outliers: default_min_rows_for_outliers(),
        }
    }
}

/// Configuration for grid interpolation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Number of grid points along each axis (resolution x resolution cells)
    #[serde(default = "default_resolution")]
    pub resolution: usize,

    /// Number of nearest samples consulted per grid cell
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,

    /// Inverse distance weighting power
    #[serde(default = "default_idw_power")]
    pub power: f64,
}

fn default_resolution() -> usize {
    100
}

fn default_neighbors() -> usize {
    12
}

fn default_idw_power() -> f64 {
    2.0
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            neighbors: default_neighbors(),
            power: default_idw_power(),
        }
    }
}

/// Configuration for contour level generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Number of evenly spaced levels between the valid minimum and maximum.
    /// Counts below 2 produce the single level at the minimum.
    #[serde(default = "default_level_count")]
    pub count: usize,
}

fn default_level_count() -> usize {
    10
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            count: default_level_count(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub cleaning: CleaningConfig,

    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub levels: LevelConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
