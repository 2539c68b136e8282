//! Basinflow CLI - particle-based hydraulic erosion.
//!
//! Seeds a height field from fractal noise, erodes it with batches of
//! water drops and exports the resulting height and discharge maps.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;

use basinflow::erosion::{ErosionConfig, Simulation};
use basinflow::export::{
    export_field_png, export_field_raw, expected_file_size, PngExportOptions, RawFormat,
};
use basinflow::field::Field;
use basinflow::geometry::Shape;
use basinflow::noise::FractalNoiseConfig;
use basinflow::terrain::{Model, ModelParams};

/// Particle-based hydraulic erosion on a regular grid.
#[derive(Parser)]
#[command(name = "basinflow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed a terrain and erode it.
    Erode {
        /// Grid size along x.
        #[arg(long, default_value = "512")]
        width: usize,

        /// Grid size along y.
        #[arg(long, default_value = "512")]
        height: usize,

        /// JSON file with a full erosion configuration. Flags below override it.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of simulation steps.
        #[arg(long)]
        steps: Option<usize>,

        /// Drops spawned per step.
        #[arg(short, long)]
        particles: Option<usize>,

        /// Smoothing rate for discharge and momentum.
        #[arg(short, long)]
        rate: Option<f32>,

        /// Seed for drop spawn positions.
        #[arg(short, long)]
        seed: Option<u64>,

        /// Stop once a step's exit fraction reaches this value.
        #[arg(long)]
        stop_at: Option<f32>,

        /// Slice of the noise volume used for the initial terrain.
        #[arg(long, default_value = "5.0")]
        terrain_seed: f32,

        /// Integer seed of the fractal noise.
        #[arg(long, default_value = "42")]
        noise_seed: i32,

        /// Multiplier applied to the noise.
        #[arg(long, default_value = "80.0")]
        height_scale: f32,

        /// Bed resistance (0-1).
        #[arg(long, default_value = "0.0")]
        resistance: f32,

        /// Height difference per cell tolerated before material slides.
        #[arg(long, default_value = "0.8")]
        maxdiff: f32,

        /// Fraction of excess slope relaxed per cascade (0-1).
        #[arg(long, default_value = "1.0")]
        settling: f32,

        /// Output directory for generated files.
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Base name for output files.
        #[arg(short, long, default_value = "terrain")]
        name: String,

        /// Export format.
        #[arg(short, long, default_value = "png")]
        format: ExportFormat,

        /// Also export the initial height field.
        #[arg(long)]
        export_initial: bool,
    },

    /// Display memory and file size estimates for a grid.
    Info {
        /// Grid size along x.
        #[arg(long, default_value = "512")]
        width: usize,

        /// Grid size along y.
        #[arg(long, default_value = "512")]
        height: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    /// 16-bit PNG (universal compatibility).
    Png,
    /// 16-bit RAW little-endian (Unity).
    Raw,
    /// 32-bit float RAW (high precision).
    RawFloat,
}

struct ErodeArgs {
    width: usize,
    height: usize,
    config: ErosionConfig,
    terrain_seed: f32,
    noise: FractalNoiseConfig,
    params: ModelParams,
    output: PathBuf,
    name: String,
    format: ExportFormat,
    export_initial: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Erode {
            width,
            height,
            config,
            steps,
            particles,
            rate,
            seed,
            stop_at,
            terrain_seed,
            noise_seed,
            height_scale,
            resistance,
            maxdiff,
            settling,
            output,
            name,
            format,
            export_initial,
        } => {
            let mut erosion = match config {
                Some(path) => load_config(&path),
                None => ErosionConfig::default(),
            };
            if let Some(steps) = steps {
                erosion.steps = steps;
            }
            if let Some(particles) = particles {
                erosion.particles = particles;
            }
            if let Some(rate) = rate {
                erosion.learning_rate = rate;
            }
            if let Some(seed) = seed {
                erosion.seed = seed;
            }
            if stop_at.is_some() {
                erosion.stop_at_exit_fraction = stop_at;
            }

            run_erode(ErodeArgs {
                width,
                height,
                config: erosion,
                terrain_seed,
                noise: FractalNoiseConfig::with_seed(noise_seed),
                params: ModelParams {
                    resistance,
                    maxdiff,
                    settling,
                    height_scale,
                },
                output,
                name,
                format,
                export_initial,
            });
        }
        Commands::Info { width, height } => {
            run_info(width, height);
        }
    }
}

fn load_config(path: &Path) -> ErosionConfig {
    let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading config {}: {}", path.display(), e);
        std::process::exit(1);
    });
    serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("Error parsing config {}: {}", path.display(), e);
        std::process::exit(1);
    })
}

fn run_erode(args: ErodeArgs) {
    if args.width < 2 || args.height < 2 || args.width > 16384 || args.height > 16384 {
        eprintln!("Error: Grid extents must be between 2 and 16384");
        std::process::exit(1);
    }

    let shape = Shape::new_2d(args.width, args.height).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    println!("Basinflow - Particle Hydraulic Erosion");
    println!("======================================");
    println!("Grid: {}", shape);
    println!(
        "Steps: {}  Particles/step: {}  Rate: {}",
        args.config.steps, args.config.particles, args.config.learning_rate
    );
    println!("Output: {}", args.output.display());

    let start = Instant::now();

    let mut model = Model::build(shape, args.noise.seed_fn(), args.terrain_seed, args.params)
        .unwrap_or_else(|e| {
            eprintln!("Error building model: {}", e);
            std::process::exit(1);
        });

    if let Err(e) = std::fs::create_dir_all(&args.output) {
        eprintln!("Error creating {}: {}", args.output.display(), e);
        std::process::exit(1);
    }

    if args.export_initial {
        if let Ok(height) = model.height_field() {
            export(height, &args.output, &format!("{}_initial", args.name), args.format);
        }
    }

    let total_before = model.total_height().unwrap_or(0.0);

    let mut simulation = Simulation::new(&mut model, args.config).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let reports = simulation
        .run_with_callback(|report, _| {
            log::info!("{} ({:.3})", report.step, report.exit_fraction);
            log::debug!("Step {} took {:.2?}", report.step, report.elapsed);
        })
        .unwrap_or_else(|e| {
            eprintln!("Error during erosion: {}", e);
            std::process::exit(1);
        });

    let erosion_time = start.elapsed();
    if let Some(last) = reports.last() {
        println!(
            "\nErosion finished after {} steps in {:.2?}, final exit fraction {:.3}",
            reports.len(),
            erosion_time,
            last.exit_fraction
        );
    }
    if let (Ok(after), Ok((min, max))) = (model.total_height(), model.height_range()) {
        println!("Height range: [{:.3}, {:.3}]", min, max);
        println!("Net material change: {:+.3}", after - total_before);
    }

    println!("\nExporting...");
    let export_start = Instant::now();

    match (model.height_field(), model.discharge_field()) {
        (Ok(height), Ok(discharge)) => {
            export(height, &args.output, &format!("{}_height", args.name), args.format);
            export(discharge, &args.output, &format!("{}_discharge", args.name), args.format);
        }
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error reading model state: {}", e);
            std::process::exit(1);
        }
    }

    println!("Export completed in {:.2?}", export_start.elapsed());
    println!("\nTotal time: {:.2?}", start.elapsed());
    println!("Done!");
}

fn export(field: &Field<f32>, dir: &Path, stem: &str, format: ExportFormat) {
    let options = PngExportOptions::auto_range(field);
    let result = match format {
        ExportFormat::Png => {
            let path = dir.join(format!("{}.png", stem));
            export_field_png(field, &path, &options).map_err(|e| e.to_string())
        }
        ExportFormat::Raw => {
            let path = dir.join(format!("{}.raw", stem));
            export_field_raw(field, &path, RawFormat::R16LittleEndian, options.min_value, options.max_value)
                .map_err(|e| e.to_string())
        }
        ExportFormat::RawFloat => {
            let path = dir.join(format!("{}.r32", stem));
            export_field_raw(field, &path, RawFormat::R32Float, options.min_value, options.max_value)
                .map_err(|e| e.to_string())
        }
    };

    match result {
        Ok(()) => println!("  Exported {} (range [{:.3}, {:.3}])", stem, options.min_value, options.max_value),
        Err(e) => {
            eprintln!("Error exporting {}: {}", stem, e);
            std::process::exit(1);
        }
    }
}

fn run_info(width: usize, height: usize) {
    let shape = match Shape::new_2d(width, height) {
        Ok(shape) => shape,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let cells = shape.elem() as u64;

    // height, discharge, discharge_track: f32; momentum, momentum_track: vec2
    let bytes_scalar = cells * 4 * 3;
    let bytes_vector = cells * 8 * 2;
    let total_memory = bytes_scalar + bytes_vector;

    let mb = |bytes: u64| bytes as f64 / 1024.0 / 1024.0;

    println!("Basinflow - Grid Info");
    println!("=====================");
    println!();
    println!("Grid: {}", shape);
    println!("Cells: {:>12}", cells);
    println!();
    println!("Memory usage (in-memory):");
    println!("  Scalar layers (3): {:>12} bytes ({:.2} MB)", bytes_scalar, mb(bytes_scalar));
    println!("  Vector layers (2): {:>12} bytes ({:.2} MB)", bytes_vector, mb(bytes_vector));
    println!("  Total:             {:>12} bytes ({:.2} MB)", total_memory, mb(total_memory));
    println!();
    println!("Export file sizes (per map):");
    for (label, format) in [
        ("PNG (16-bit, raw pixels)", RawFormat::R16LittleEndian),
        ("RAW (R16)", RawFormat::R16LittleEndian),
        ("RAW (R32)", RawFormat::R32Float),
    ] {
        let bytes = expected_file_size(&shape, format);
        println!("  {:<25} {:>10} bytes ({:.2} MB)", label, bytes, mb(bytes));
    }
    println!();

    let defaults = ErosionConfig::default();
    println!("Default run: {} steps x {} particles", defaults.steps, defaults.particles);
    println!("Smoothing half-life: {:.2} steps", defaults.halflife());
}
