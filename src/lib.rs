//! Launch-time resolver for the Nebula LiDAR preprocessing pipeline.
//!
//! This crate provides tools for:
//! - Classifying a sensor model into its vendor family
//! - Locating sensor parameter, calibration and correction files
//! - Computing self and mirror crop boxes from vehicle geometry
//! - Describing the composable node graph and its container deployment
//!
//! # Example
//!
//! ```no_run
//! use nebula_launch::core::loaders::load_vehicle_dimensions;
//! use nebula_launch::resolver::resolve;
//! use nebula_launch::{LaunchArguments, ShareDirs};
//!
//! let args = LaunchArguments::from_yaml("launch.yaml").unwrap();
//! let share = ShareDirs::locate(None, None, std::env::var_os("AMENT_PREFIX_PATH").as_deref()).unwrap();
//! let dimensions = load_vehicle_dimensions(&args.vehicle_info_param_file).unwrap();
//! let resolution = resolve(&args, &share, &dimensions).unwrap();
//! println!("{:?}", resolution.topology.launch_description());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod resolver;

pub use config::{ConfigError, LaunchArguments, PandarArguments, ShareDirs};
pub use resolver::{resolve, PipelineTopology, Resolution, ResolveError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
