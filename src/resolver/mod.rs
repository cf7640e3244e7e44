//! Launch-time resolution of the LiDAR preprocessing pipeline.
//!
//! Resolution runs once, strictly forward:
//! classify the sensor, locate its files, compute crop boxes, then
//! assemble the node graph.

pub mod classifier;
pub mod files;
pub mod geometry;
pub mod pandar;
pub mod topology;

use std::fmt;
use std::path::PathBuf;

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::{LaunchArguments, ShareDirs};
use crate::core::loaders::{self, LoaderError};

pub use classifier::{classify, SensorIdentity, Vendor};
pub use files::{resolve_files, FilePaths};
pub use geometry::{
    compute_mirror_bounds, compute_vehicle_bounds, BoxOffsets, CropBounds, MirrorGeometry,
    VehicleDimensions, VehicleGeometry,
};
pub use pandar::build_pandar_topology;
pub use topology::{
    build_topology, ContainerTarget, DeploymentMode, LaunchDescription, LaunchEntity, NodeRole,
    PipelineNode, PipelineTopology,
};

/// Files the pipeline cannot start without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MandatoryFile {
    SensorParams,
    Calibration,
    MirrorParams,
}

impl fmt::Display for MandatoryFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MandatoryFile::SensorParams => "Sensor params yaml file under config/",
            MandatoryFile::Calibration => "Sensor calib file under calibration/",
            MandatoryFile::MirrorParams => "Vehicle mirror param file",
        })
    }
}

/// Fatal resolution errors. Any of these aborts the launch.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No vendor matches the model, so no calibration path exists.
    #[error("unrecognized sensor model: '{0}'")]
    UnrecognizedSensorModel(String),

    #[error("{kind} was not found: {}", .path.display())]
    MissingMandatoryFile { kind: MandatoryFile, path: PathBuf },

    #[error("launch argument '{0}' is required")]
    MissingArgument(&'static str),

    #[error(transparent)]
    Loader(#[from] LoaderError),
}

/// Everything derived from one set of launch arguments.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub identity: SensorIdentity,
    pub files: FilePaths,
    pub vehicle: VehicleGeometry,
    pub self_bounds: CropBounds,
    pub mirror_bounds: CropBounds,
    pub topology: PipelineTopology,
    /// Suspicious but accepted settings.
    pub warnings: Vec<String>,
}

/// Run the full resolution for `args`.
///
/// Vehicle dimensions are passed in explicitly; they are owned by the wider
/// vehicle description rather than the sensor launch.
pub fn resolve(
    args: &LaunchArguments,
    share: &ShareDirs,
    dimensions: &VehicleDimensions,
) -> Result<Resolution, ResolveError> {
    if args.sensor_model.is_empty() {
        return Err(ResolveError::MissingArgument("sensor_model"));
    }
    if args.vehicle_mirror_param_file.as_os_str().is_empty() {
        return Err(ResolveError::MissingArgument("vehicle_mirror_param_file"));
    }

    let identity = classify(&args.sensor_model).require_recognized()?;
    info!("Sensor {} classified as {}", identity.model(), identity.vendor());

    let files = resolve_files(
        &identity,
        &args.config_file,
        &args.sensor_correction_file,
        share,
    )?;
    let sensor_params = loaders::load_parameter_set(&files.params_file)?;
    debug!("Loaded {} sensor parameters", sensor_params.len());

    let vehicle = VehicleGeometry::from_dimensions(dimensions);
    let self_bounds = compute_vehicle_bounds(dimensions);

    if !args.vehicle_mirror_param_file.exists() {
        return Err(ResolveError::MissingMandatoryFile {
            kind: MandatoryFile::MirrorParams,
            path: args.vehicle_mirror_param_file.clone(),
        });
    }
    let mirror = loaders::load_mirror_geometry(&args.vehicle_mirror_param_file)?;
    let mirror_bounds = compute_mirror_bounds(&mirror);

    let mut warnings = args.validate();
    for (label, bounds) in [("self crop box", &self_bounds), ("mirror crop box", &mirror_bounds)] {
        warnings.extend(
            bounds
                .inverted_axes()
                .into_iter()
                .map(|issue| format!("{label}: {issue}")),
        );
    }
    for warning in &warnings {
        warn!("{}", warning);
    }

    let topology = build_topology(
        &identity,
        &files,
        &self_bounds,
        &mirror_bounds,
        args,
        &sensor_params,
    );

    Ok(Resolution {
        identity,
        files,
        vehicle,
        self_bounds,
        mirror_bounds,
        topology,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const MIRROR_YAML: &str = "/**:
  ros__parameters:
    min_longitudinal_offset: 2.2
    max_longitudinal_offset: 2.6
    min_lateral_offset: -1.2
    max_lateral_offset: 1.2
    min_height_offset: 0.8
    max_height_offset: 1.2
";

    const PARAMS_YAML: &str = "/**:
  ros__parameters:
    packet_mtu_size: 1500
    frame_id: hesai
";

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn dimensions() -> VehicleDimensions {
        VehicleDimensions {
            wheel_base: 2.5,
            wheel_tread: 1.5,
            front_overhang: 0.5,
            rear_overhang: 0.5,
            left_overhang: 0.2,
            right_overhang: 0.2,
            vehicle_height: 1.8,
        }
    }

    fn setup(root: &Path) -> (ShareDirs, LaunchArguments) {
        let share = ShareDirs {
            nebula_ros: root.join("nebula_ros"),
            nebula_decoders: root.join("nebula_decoders"),
        };
        write(&share.nebula_ros.join("config/BaseParams.yaml"), PARAMS_YAML);
        write(
            &share.nebula_decoders.join("calibration/hesai/Pandar64.csv"),
            "Laser id,Elevation,Azimuth\n",
        );
        let mirror = root.join("mirror.param.yaml");
        write(&mirror, MIRROR_YAML);

        let args = LaunchArguments {
            sensor_model: "Pandar64".to_string(),
            vehicle_mirror_param_file: mirror,
            ..LaunchArguments::default()
        };
        (share, args)
    }

    #[test]
    fn test_resolve_end_to_end() {
        let root = TempDir::new().unwrap();
        let (share, args) = setup(root.path());

        let resolution = resolve(&args, &share, &dimensions()).unwrap();

        assert_eq!(resolution.identity.vendor(), Vendor::Hesai);
        assert_eq!(resolution.files.params_file, share.nebula_ros.join("config/BaseParams.yaml"));
        assert_eq!(resolution.files.correction_file, None);
        assert!(resolution.self_bounds.negative);
        assert!(resolution.mirror_bounds.negative);
        assert_eq!(resolution.mirror_bounds.min_x, 2.2);
        assert!(resolution.warnings.is_empty());

        let topology = &resolution.topology;
        assert_eq!(topology.nodes().len(), 5);
        assert!(topology.is_chained());
        assert!(topology.loaded_driver().is_some());

        let driver = topology.node(NodeRole::Driver).unwrap();
        assert!(driver.parameters.contains_key("packet_mtu_size"));
        assert_eq!(
            driver.parameters["frame_id"].as_str(),
            Some("lidar"),
            "launch arguments override the params file"
        );
    }

    #[test]
    fn test_unrecognized_model_fails_before_file_lookup() {
        let root = TempDir::new().unwrap();
        let (share, args) = setup(root.path());
        let args = LaunchArguments {
            sensor_model: "OS1-64".to_string(),
            ..args
        };

        assert!(matches!(
            resolve(&args, &share, &dimensions()),
            Err(ResolveError::UnrecognizedSensorModel(_))
        ));
    }

    #[test]
    fn test_missing_base_params_is_fatal() {
        let root = TempDir::new().unwrap();
        let (share, args) = setup(root.path());
        fs::remove_file(share.nebula_ros.join("config/BaseParams.yaml")).unwrap();

        let err = resolve(&args, &share, &dimensions()).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::MissingMandatoryFile {
                kind: MandatoryFile::SensorParams,
                ..
            }
        ));
        assert!(err.to_string().starts_with("Sensor params yaml file under config/ was not found"));
    }

    #[test]
    fn test_missing_mirror_file() {
        let root = TempDir::new().unwrap();
        let (share, args) = setup(root.path());
        let args = LaunchArguments {
            vehicle_mirror_param_file: root.path().join("absent.yaml"),
            ..args
        };

        assert!(matches!(
            resolve(&args, &share, &dimensions()),
            Err(ResolveError::MissingMandatoryFile {
                kind: MandatoryFile::MirrorParams,
                ..
            })
        ));
    }

    #[test]
    fn test_required_arguments() {
        let root = TempDir::new().unwrap();
        let (share, args) = setup(root.path());

        let no_model = LaunchArguments {
            sensor_model: String::new(),
            ..args.clone()
        };
        assert!(matches!(
            resolve(&no_model, &share, &dimensions()),
            Err(ResolveError::MissingArgument("sensor_model"))
        ));

        let no_mirror = LaunchArguments {
            vehicle_mirror_param_file: PathBuf::new(),
            ..args
        };
        assert!(matches!(
            resolve(&no_mirror, &share, &dimensions()),
            Err(ResolveError::MissingArgument("vehicle_mirror_param_file"))
        ));
    }

    #[test]
    fn test_suspicious_bounds_are_warnings() {
        let root = TempDir::new().unwrap();
        let (share, args) = setup(root.path());
        let args = LaunchArguments {
            min_range: 10.0,
            max_range: 1.0,
            ..args
        };

        let resolution = resolve(&args, &share, &dimensions()).unwrap();
        assert_eq!(resolution.warnings.len(), 1);
        assert!(resolution.warnings[0].contains("min_range"));
    }
}
