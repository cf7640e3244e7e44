//! Loaders for ROS 2 style parameter files.
//!
//! Parameter files nest their content under a wildcard node name:
//!
//! ```yaml
//! /**:
//!   ros__parameters:
//!     wheel_base: 2.79
//!     wheel_tread: 1.64
//! ```
//!
//! This module reads such files and hands back the inner mapping, either as
//! a raw parameter set or deserialized into a typed struct.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_yaml::Value;
use thiserror::Error;

use crate::resolver::geometry::{MirrorGeometry, VehicleDimensions};

/// Top-level key matching every node.
pub const WILDCARD_NODE_KEY: &str = "/**";

/// Key holding the parameter mapping below the node key.
pub const ROS_PARAMETERS_KEY: &str = "ros__parameters";

/// Named parameter values attached to a node.
pub type ParameterSet = BTreeMap<String, Value>;

/// Errors that can occur while loading a parameter file.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in '{}': {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("'{}' has no '/**.ros__parameters' section", .path.display())]
    MissingSection { path: PathBuf },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Extract the `/**.ros__parameters` mapping from YAML text.
fn parameters_section(path: &Path, content: &str) -> Result<Value> {
    let document: Value = serde_yaml::from_str(content).map_err(|e| LoaderError::Yaml {
        path: path.to_path_buf(),
        source: e,
    })?;

    document
        .get(WILDCARD_NODE_KEY)
        .and_then(|node| node.get(ROS_PARAMETERS_KEY))
        .filter(|params| params.is_mapping())
        .cloned()
        .ok_or_else(|| LoaderError::MissingSection {
            path: path.to_path_buf(),
        })
}

/// Load the parameter section of a file and deserialize it into `T`.
///
/// Keys not named by `T` are ignored, so a full vehicle info file can be
/// read into [`VehicleDimensions`].
pub fn load_ros_parameters<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| LoaderError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let section = parameters_section(path, &content)?;
    serde_yaml::from_value(section).map_err(|e| LoaderError::Yaml {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load a sensor parameter file as an untyped parameter set.
pub fn load_parameter_set<P: AsRef<Path>>(path: P) -> Result<ParameterSet> {
    load_ros_parameters(path)
}

/// Load the vehicle body dimensions.
pub fn load_vehicle_dimensions<P: AsRef<Path>>(path: P) -> Result<VehicleDimensions> {
    load_ros_parameters(path)
}

/// Load the mirror position offsets.
pub fn load_mirror_geometry<P: AsRef<Path>>(path: P) -> Result<MirrorGeometry> {
    load_ros_parameters(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_yaml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_load_parameter_set() {
        let file = write_yaml(
            "/**:\n  ros__parameters:\n    launch_hw: true\n    rotation_speed: 600\n    frame_id: hesai\n",
        );

        let params = load_parameter_set(file.path()).unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params["launch_hw"], Value::Bool(true));
        assert_eq!(params["rotation_speed"].as_u64(), Some(600));
        assert_eq!(params["frame_id"].as_str(), Some("hesai"));
    }

    #[test]
    fn test_load_vehicle_dimensions_ignores_extra_keys() {
        let file = write_yaml(
            "/**:
  ros__parameters:
    wheel_radius: 0.383
    wheel_width: 0.235
    wheel_base: 2.79
    wheel_tread: 1.64
    front_overhang: 1.0
    rear_overhang: 1.1
    left_overhang: 0.128
    right_overhang: 0.128
    vehicle_height: 2.5
    max_steer_angle: 0.70
",
        );

        let dims = load_vehicle_dimensions(file.path()).unwrap();
        assert_eq!(dims.wheel_base, 2.79);
        assert_eq!(dims.rear_overhang, 1.1);
        assert_eq!(dims.vehicle_height, 2.5);
    }

    #[test]
    fn test_load_mirror_geometry() {
        let file = write_yaml(
            "/**:
  ros__parameters:
    min_longitudinal_offset: 2.2
    max_longitudinal_offset: 2.6
    min_lateral_offset: -1.2
    max_lateral_offset: 1.2
    min_height_offset: 0.8
    max_height_offset: 1.2
",
        );

        let mirror = load_mirror_geometry(file.path()).unwrap();
        assert_eq!(mirror.min_lateral_offset, -1.2);
        assert_eq!(mirror.max_height_offset, 1.2);
    }

    #[test]
    fn test_missing_section() {
        let file = write_yaml("ros__parameters:\n  wheel_base: 2.79\n");

        let result = load_parameter_set(file.path());
        assert!(matches!(result, Err(LoaderError::MissingSection { .. })));
    }

    #[test]
    fn test_missing_field_is_yaml_error() {
        let file = write_yaml("/**:\n  ros__parameters:\n    min_longitudinal_offset: 1.0\n");

        let result = load_mirror_geometry(file.path());
        assert!(matches!(result, Err(LoaderError::Yaml { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = load_parameter_set("/nonexistent/params.yaml");
        assert!(matches!(result, Err(LoaderError::Io { .. })));
    }

    #[test]
    fn test_invalid_yaml() {
        let file = write_yaml("/**: [unterminated\n");

        let result = load_parameter_set(file.path());
        assert!(matches!(result, Err(LoaderError::Yaml { .. })));
    }
}
