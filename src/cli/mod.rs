//! Command-line interface for the depth map pipeline.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::core::grid::load_grid;
use crate::processors::{cleaning, interpolation, levels};
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "depth-pipeline")]
#[command(about = "Bathymetric depth map processing pipeline", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a raw sample CSV: null removal, duplicates, IQR outliers
    Clean {
        /// Input sample CSV with lat,lon,distance columns
        input: PathBuf,
        /// Treat the input as already cleaned (skip duplicate/outlier steps)
        #[arg(long)]
        cleaned: bool,
    },

    /// Interpolate a cleaned CSV onto a regular masked grid
    Interpolate {
        /// Cleaned sample CSV
        cleaned_csv: PathBuf,
        /// Output NPZ grid artifact (companion CSV written alongside)
        output: PathBuf,
    },

    /// Print contour levels derived from a grid artifact
    Levels {
        /// NPZ grid artifact
        grid_file: PathBuf,
    },

    /// Run the full pipeline: clean, interpolate, derive levels
    Run {
        /// Input raw sample CSV
        input: PathBuf,
        /// Output NPZ grid artifact path (defaults to <stem>_interpolated.npz)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Default grid artifact path: `<stem>_interpolated.npz` beside the input.
///
/// The companion grid CSV is written at the artifact path with a `csv`
/// extension, so the artifact stem must differ from the input stem or the
/// companion would land on the input file itself.
fn default_grid_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "grid".to_string());
    input.with_file_name(format!("{}_interpolated.npz", stem))
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Truncate a value to fit the summary box, counting characters rather than
/// bytes so multibyte paths cannot split a character.
fn truncate_for_box(value: &str) -> String {
    if value.chars().count() > 39 {
        let head: String = value.chars().take(36).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        println!("║ {:<20}: {:<39} ║", key, truncate_for_box(value));
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    // Dispatch to subcommands
    match cli.command {
        Commands::Clean { input, cleaned } => {
            cmd_clean(&input, !cleaned, &config);
        }
        Commands::Interpolate {
            cleaned_csv,
            output,
        } => {
            cmd_interpolate(&cleaned_csv, &output, &config);
        }
        Commands::Levels { grid_file } => {
            cmd_levels(&grid_file, &config);
        }
        Commands::Run { input, output } => {
            cmd_run(&input, output, &config);
        }
    }
}

fn cmd_clean(input: &PathBuf, is_raw: bool, config: &PipelineConfig) {
    let start = Instant::now();

    println!("Cleaning sample file...");
    println!("Input: {}", input.display());

    let spinner = create_spinner("Cleaning point samples...");

    match cleaning::clean(input, is_raw, &config.cleaning) {
        Ok((out_path, summary)) => {
            spinner.finish_and_clear();

            println!("{}", summary);

            print_summary(
                "Cleaning Complete",
                &[
                    ("Input file", input.display().to_string()),
                    ("Cleaned file", out_path.display().to_string()),
                    ("Rows loaded", summary.loaded.to_string()),
                    ("Null rows", summary.dropped_null.to_string()),
                    ("Duplicates", summary.dropped_duplicate.to_string()),
                    ("Outliers", summary.dropped_outlier.to_string()),
                    ("Rows remaining", summary.remaining.to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Cleaning failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_interpolate(cleaned_csv: &PathBuf, output: &PathBuf, config: &PipelineConfig) {
    let start = Instant::now();

    println!("Interpolating cleaned samples onto grid...");
    println!("Input: {}", cleaned_csv.display());
    println!("Output: {}", output.display());
    println!("Resolution: {0}x{0}", config.grid.resolution);

    let spinner = create_spinner("Interpolating scattered points...");

    match interpolation::interpolate_and_save(cleaned_csv, output, &config.grid) {
        Ok(npz_path) => {
            spinner.finish_and_clear();

            print_summary(
                "Interpolation Complete",
                &[
                    ("Input file", cleaned_csv.display().to_string()),
                    ("Grid artifact", npz_path.display().to_string()),
                    (
                        "Grid table",
                        npz_path.with_extension("csv").display().to_string(),
                    ),
                    ("Resolution", format!("{0}x{0}", config.grid.resolution)),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Interpolation failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_levels(grid_file: &PathBuf, config: &PipelineConfig) {
    let start = Instant::now();

    let grid = match load_grid(grid_file) {
        Ok(g) => g,
        Err(e) => {
            error!("Failed to load grid artifact: {}", e);
            std::process::exit(1);
        }
    };

    match levels::contour_levels(&grid, &config.levels) {
        Ok(set) => {
            let rendered: Vec<String> = set.levels.iter().map(|l| format!("{:.3}", l)).collect();
            println!("Levels: [{}]", rendered.join(", "));

            print_summary(
                "Levels Complete",
                &[
                    ("Grid artifact", grid_file.display().to_string()),
                    ("Valid cells", grid.valid_count().to_string()),
                    ("Min depth", format!("{:.3}", set.min_depth)),
                    ("Max depth", format!("{:.3}", set.max_depth)),
                    ("Level count", set.levels.len().to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            error!("Level generation failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_run(input: &PathBuf, output: Option<PathBuf>, config: &PipelineConfig) {
    let start = Instant::now();

    let output = output.unwrap_or_else(|| default_grid_path(input));

    println!("Running full pipeline...");
    println!("Input: {}", input.display());
    println!("Grid artifact: {}", output.display());

    let spinner = create_spinner("Cleaning point samples...");

    let (cleaned_path, summary) = match cleaning::clean(input, true, &config.cleaning) {
        Ok(result) => result,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Cleaning failed: {}", e);
            std::process::exit(1);
        }
    };

    spinner.set_message("Interpolating scattered points...");

    if let Err(e) = interpolation::interpolate_and_save(&cleaned_path, &output, &config.grid) {
        spinner.finish_and_clear();
        error!("Interpolation failed: {}", e);
        std::process::exit(1);
    }

    spinner.set_message("Deriving contour levels...");

    let grid = match load_grid(&output) {
        Ok(g) => g,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Failed to reload grid artifact: {}", e);
            std::process::exit(1);
        }
    };

    let set = match levels::contour_levels(&grid, &config.levels) {
        Ok(set) => set,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Level generation failed: {}", e);
            std::process::exit(1);
        }
    };

    spinner.finish_and_clear();

    println!("{}", summary);

    print_summary(
        "Pipeline Complete",
        &[
            ("Input file", input.display().to_string()),
            ("Cleaned file", cleaned_path.display().to_string()),
            ("Grid artifact", output.display().to_string()),
            ("Rows remaining", summary.remaining.to_string()),
            ("Valid cells", grid.valid_count().to_string()),
            (
                "Depth range",
                format!("{:.3} to {:.3}", set.min_depth, set.max_depth),
            ),
            ("Level count", set.levels.len().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::{cleaning, interpolation};
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_grid_path_distinct_from_input() {
        let input = PathBuf::from("data/soundings.csv");
        let npz = default_grid_path(&input);

        assert_eq!(npz, PathBuf::from("data/soundings_interpolated.npz"));
        // The companion grid CSV lands beside the artifact, never on the input.
        assert_ne!(npz.with_extension("csv"), input);
    }

    #[test]
    fn test_default_run_preserves_input_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("soundings.csv");
        let mut file = std::fs::File::create(&input).unwrap();
        writeln!(file, "lat,lon,distance").unwrap();
        writeln!(file, "0.0,0.0,10").unwrap();
        writeln!(file, "0.0,1.0,20").unwrap();
        writeln!(file, "1.0,0.0,30").unwrap();
        writeln!(file, "1.0,1.0,40").unwrap();
        drop(file);
        let raw_before = std::fs::read_to_string(&input).unwrap();

        let mut config = PipelineConfig::default();
        config.grid.resolution = 5;

        let (cleaned_path, _) = cleaning::clean(&input, true, &config.cleaning).unwrap();
        let npz = default_grid_path(&input);
        interpolation::interpolate_and_save(&cleaned_path, &npz, &config.grid).unwrap();

        assert!(npz.exists());
        assert!(npz.with_extension("csv").exists());

        let raw_after = std::fs::read_to_string(&input).unwrap();
        assert_eq!(raw_before, raw_after);
    }

    #[test]
    fn test_truncate_for_box_multibyte() {
        let short = "plain/path.csv";
        assert_eq!(truncate_for_box(short), short);

        let long: String = "深さ図".repeat(20);
        let truncated = truncate_for_box(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 39);
    }
}
