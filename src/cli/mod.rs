//! Command-line interface for the launch resolver.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use serde::Serialize;

use crate::config::{LaunchArguments, PandarArguments, ShareDirs, AMENT_PREFIX_PATH};
use crate::core::{loaders, writers};
use crate::resolver::{self, classify, CropBounds, LaunchDescription, VehicleGeometry};

#[derive(Parser)]
#[command(name = "nebula-launch")]
#[command(about = "Resolve the Nebula LiDAR preprocessing pipeline launch", version)]
pub struct Cli {
    /// Path to YAML file with launch arguments
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
    /// Resolve files and geometry and emit the pipeline launch description
    Resolve {
        /// Sensor model name
        #[arg(long)]
        sensor_model: Option<String>,
        /// Sensor configuration file
        #[arg(long)]
        config_file: Option<PathBuf>,
        /// Sensor correction file
        #[arg(long)]
        sensor_correction_file: Option<PathBuf>,
        /// Vehicle mirror position yaml
        #[arg(long)]
        vehicle_mirror_param_file: Option<PathBuf>,
        /// Vehicle info yaml
        #[arg(long)]
        vehicle_info_param_file: Option<PathBuf>,
        /// Share directory of nebula_ros (default: AMENT_PREFIX_PATH lookup)
        #[arg(long)]
        nebula_ros_share: Option<PathBuf>,
        /// Share directory of nebula_decoders (default: AMENT_PREFIX_PATH lookup)
        #[arg(long)]
        nebula_decoders_share: Option<PathBuf>,
        /// Launch the hardware interface node
        #[arg(long)]
        launch_driver: Option<bool>,
        /// Load into an existing container
        #[arg(long)]
        use_pointcloud_container: Option<bool>,
        /// Use the multithreaded container
        #[arg(long)]
        use_multithread: Option<bool>,
        /// Container name
        #[arg(long)]
        container_name: Option<String>,
        /// Output YAML file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the vendor family of a sensor model
    Classify {
        /// Sensor model name
        model: String,
    },

    /// Print the vehicle footprint and crop boxes
    Geometry {
        /// Vehicle info yaml
        vehicle_info: PathBuf,
        /// Vehicle mirror position yaml
        #[arg(long)]
        mirror: Option<PathBuf>,
    },

    /// Emit the launch description of the legacy Pandar driver stack
    Pandar {
        /// YAML file with Pandar launch arguments
        #[arg(long)]
        args: Option<PathBuf>,
        /// Sensor model name
        #[arg(long)]
        model: Option<String>,
        /// Calibration file
        #[arg(long)]
        calibration: Option<PathBuf>,
        /// Launch the packet driver
        #[arg(long)]
        launch_driver: Option<bool>,
        /// Output YAML file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Print a summary box to stderr, leaving stdout for the YAML output.
fn print_summary(title: &str, items: &[(&str, String)]) {
    eprintln!();
    eprintln!("╔══════════════════════════════════════════════════════════════╗");
    eprintln!("║ {:<62} ║", title);
    eprintln!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            let head: String = value.chars().take(36).collect();
            format!("{}...", head)
        } else {
            value.clone()
        };
        eprintln!("║ {:<20}: {:<39} ║", key, display_value);
    }
    eprintln!("╚══════════════════════════════════════════════════════════════╝");
    eprintln!();
}

/// Write YAML to `output`, or stdout when no path is given.
fn emit<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            writers::write_yaml_file(path, value)?;
            info!("Wrote {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            writers::write_yaml(&mut stdout.lock(), value, "stdout")?;
        }
    }
    Ok(())
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

    let result = match cli.command {
        Commands::Resolve {
            sensor_model,
            config_file,
            sensor_correction_file,
            vehicle_mirror_param_file,
            vehicle_info_param_file,
            nebula_ros_share,
            nebula_decoders_share,
            launch_driver,
            use_pointcloud_container,
            use_multithread,
            container_name,
            output,
        } => load_launch_arguments(cli.config.as_deref()).and_then(|mut args| {
            if let Some(v) = sensor_model {
                args.sensor_model = v;
            }
            if let Some(v) = config_file {
                args.config_file = v;
            }
            if let Some(v) = sensor_correction_file {
                args.sensor_correction_file = v;
            }
            if let Some(v) = vehicle_mirror_param_file {
                args.vehicle_mirror_param_file = v;
            }
            if let Some(v) = vehicle_info_param_file {
                args.vehicle_info_param_file = v;
            }
            if let Some(v) = launch_driver {
                args.launch_driver = v;
            }
            if let Some(v) = use_pointcloud_container {
                args.use_pointcloud_container = v;
            }
            if let Some(v) = use_multithread {
                args.use_multithread = v;
            }
            if let Some(v) = container_name {
                args.container_name = v;
            }
            cmd_resolve(&args, nebula_ros_share, nebula_decoders_share, output.as_deref())
        }),
        Commands::Classify { model } => cmd_classify(&model),
        Commands::Geometry {
            vehicle_info,
            mirror,
        } => cmd_geometry(&vehicle_info, mirror.as_deref()),
        Commands::Pandar {
            args,
            model,
            calibration,
            launch_driver,
            output,
        } => load_pandar_arguments(args.as_deref()).and_then(|mut pandar| {
            if let Some(v) = model {
                pandar.model = v;
            }
            if let Some(v) = calibration {
                pandar.calibration = v;
            }
            if let Some(v) = launch_driver {
                pandar.launch_driver = v;
            }
            cmd_pandar(&pandar, output.as_deref())
        }),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn load_launch_arguments(path: Option<&Path>) -> Result<LaunchArguments> {
    match path {
        Some(path) => {
            let args = LaunchArguments::from_yaml(path)
                .map_err(|e| anyhow!("failed to load launch arguments from {}: {}", path.display(), e))?;
            info!("Loaded launch arguments from: {}", path.display());
            Ok(args)
        }
        None => Ok(LaunchArguments::default()),
    }
}

fn load_pandar_arguments(path: Option<&Path>) -> Result<PandarArguments> {
    match path {
        Some(path) => PandarArguments::from_yaml(path)
            .map_err(|e| anyhow!("failed to load Pandar arguments from {}: {}", path.display(), e)),
        None => Ok(PandarArguments::default()),
    }
}

fn cmd_resolve(
    args: &LaunchArguments,
    nebula_ros_share: Option<PathBuf>,
    nebula_decoders_share: Option<PathBuf>,
    output: Option<&Path>,
) -> Result<()> {
    let start = Instant::now();

    let prefix_path = std::env::var_os(AMENT_PREFIX_PATH);
    let share = ShareDirs::locate(nebula_ros_share, nebula_decoders_share, prefix_path.as_deref())?;

    if args.vehicle_info_param_file.as_os_str().is_empty() {
        bail!("launch argument 'vehicle_info_param_file' is required");
    }
    let dimensions = loaders::load_vehicle_dimensions(&args.vehicle_info_param_file)
        .context("failed to load vehicle info")?;

    let resolution = resolver::resolve(args, &share, &dimensions)?;
    let description = resolution.topology.launch_description();
    emit(&description, output)?;

    print_summary(
        "Pipeline Resolved",
        &[
            ("Sensor model", resolution.identity.model().to_string()),
            ("Vendor", resolution.identity.vendor().to_string()),
            ("Params file", resolution.files.params_file.display().to_string()),
            ("Calibration file", resolution.files.calibration_file.display().to_string()),
            ("Correction file", resolution.files.correction_param()),
            ("Deployment", format!("{:?}", resolution.topology.mode())),
            ("Nodes", resolution.topology.nodes().len().to_string()),
            ("Hardware interface", resolution.topology.loaded_driver().is_some().to_string()),
            ("Warnings", resolution.warnings.len().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}

fn cmd_classify(model: &str) -> Result<()> {
    let identity = classify(model).require_recognized()?;
    println!(
        "{} {} {}",
        identity.model(),
        identity.vendor(),
        identity.calibration_extension().unwrap_or_default()
    );
    Ok(())
}

#[derive(Serialize)]
struct GeometryReport {
    vehicle: VehicleGeometry,
    self_crop: CropBounds,
    #[serde(skip_serializing_if = "Option::is_none")]
    mirror_crop: Option<CropBounds>,
}

fn cmd_geometry(vehicle_info: &Path, mirror: Option<&Path>) -> Result<()> {
    let dimensions = loaders::load_vehicle_dimensions(vehicle_info)?;
    let mirror_crop = mirror
        .map(loaders::load_mirror_geometry)
        .transpose()?
        .map(|m| resolver::compute_mirror_bounds(&m));

    let report = GeometryReport {
        vehicle: VehicleGeometry::from_dimensions(&dimensions),
        self_crop: resolver::compute_vehicle_bounds(&dimensions),
        mirror_crop,
    };
    emit(&report, None)
}

fn cmd_pandar(args: &PandarArguments, output: Option<&Path>) -> Result<()> {
    if args.model.is_empty() {
        bail!("launch argument 'model' is required");
    }

    let topology = resolver::build_pandar_topology(args);
    let description: LaunchDescription = topology.launch_description();
    emit(&description, output)?;

    print_summary(
        "Pandar Stack Resolved",
        &[
            ("Model", args.model.clone()),
            ("Container", topology.container().name.clone()),
            ("Executable", topology.container().executable.clone()),
            ("Driver", args.launch_driver.to_string()),
        ],
    );

    Ok(())
}
