//! Launch arguments and package lookup.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Environment variable listing install prefixes of ament packages.
pub const AMENT_PREFIX_PATH: &str = "AMENT_PREFIX_PATH";

/// Marker directory of the ament resource index, relative to an install prefix.
const PACKAGE_INDEX: &str = "share/ament_index/resource_index/packages";

/// Errors raised while locating installed packages.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("package '{0}' not found in AMENT_PREFIX_PATH")]
    PackageNotFound(String),
}

/// Launch arguments of the Nebula preprocessing pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LaunchArguments {
    /// Sensor model name (e.g. `Pandar64`, `VLP16`)
    #[serde(default)]
    pub sensor_model: String,

    /// Sensor configuration file; empty selects the model default
    #[serde(default)]
    pub config_file: PathBuf,

    /// Sensor correction file; empty selects the model default
    #[serde(default)]
    pub sensor_correction_file: PathBuf,

    /// Launch the hardware interface node
    #[serde(default = "default_true")]
    pub launch_driver: bool,

    /// Device IP address
    #[serde(default = "default_sensor_ip")]
    pub sensor_ip: String,

    /// Host IP address
    #[serde(default = "default_host_ip")]
    pub host_ip: String,

    #[serde(default)]
    pub scan_phase: f64,

    /// Base frame id
    #[serde(default = "default_base_frame")]
    pub base_frame: String,

    /// Minimum view range
    #[serde(default = "default_min_range")]
    pub min_range: f64,

    /// Maximum view range
    #[serde(default = "default_max_range")]
    pub max_range: f64,

    /// Minimum view angle setting on device, degrees
    #[serde(default)]
    pub cloud_min_angle: u16,

    /// Maximum view angle setting on device, degrees
    #[serde(default = "default_cloud_max_angle")]
    pub cloud_max_angle: u16,

    /// Device data port number
    #[serde(default = "default_data_port")]
    pub data_port: u16,

    /// Device GNSS port number
    #[serde(default = "default_gnss_port")]
    pub gnss_port: u16,

    /// Rotational frequency
    #[serde(default = "default_rotation_speed")]
    pub rotation_speed: f64,

    #[serde(default = "default_dual_return_distance_threshold")]
    pub dual_return_distance_threshold: f64,

    /// Frame id of the point cloud
    #[serde(default = "default_frame_id")]
    pub frame_id: String,

    /// Crop box input frame, defaults to `base_frame`
    #[serde(default)]
    pub input_frame: Option<String>,

    /// Crop box output frame, defaults to `base_frame`
    #[serde(default)]
    pub output_frame: Option<String>,

    #[serde(default = "default_return_mode")]
    pub return_mode: String,

    /// Path to the vehicle mirror position yaml
    #[serde(default)]
    pub vehicle_mirror_param_file: PathBuf,

    /// Path to the vehicle info yaml
    #[serde(default)]
    pub vehicle_info_param_file: PathBuf,

    /// Run the container multithreaded
    #[serde(default)]
    pub use_multithread: bool,

    /// Use intra-process communication between the composable nodes
    #[serde(default)]
    pub use_intra_process: bool,

    /// Load into an existing container instead of starting one
    #[serde(default)]
    pub use_pointcloud_container: bool,

    #[serde(default = "default_container_name")]
    pub container_name: String,
}

fn default_true() -> bool {
    true
}

fn default_sensor_ip() -> String {
    "192.168.1.201".to_string()
}

fn default_host_ip() -> String {
    "255.255.255.255".to_string()
}

fn default_base_frame() -> String {
    "base_link".to_string()
}

fn default_min_range() -> f64 {
    0.3
}

fn default_max_range() -> f64 {
    300.0
}

fn default_cloud_max_angle() -> u16 {
    360
}

fn default_data_port() -> u16 {
    2368
}

fn default_gnss_port() -> u16 {
    2380
}

fn default_rotation_speed() -> f64 {
    600.0
}

fn default_dual_return_distance_threshold() -> f64 {
    0.1
}

fn default_frame_id() -> String {
    "lidar".to_string()
}

fn default_return_mode() -> String {
    "Dual".to_string()
}

fn default_container_name() -> String {
    "nebula_node_container".to_string()
}

impl Default for LaunchArguments {
    fn default() -> Self {
        Self {
            sensor_model: String::new(),
            config_file: PathBuf::new(),
            sensor_correction_file: PathBuf::new(),
            launch_driver: true,
            sensor_ip: default_sensor_ip(),
            host_ip: default_host_ip(),
            scan_phase: 0.0,
            base_frame: default_base_frame(),
            min_range: default_min_range(),
            max_range: default_max_range(),
            cloud_min_angle: 0,
            cloud_max_angle: default_cloud_max_angle(),
            data_port: default_data_port(),
            gnss_port: default_gnss_port(),
            rotation_speed: default_rotation_speed(),
            dual_return_distance_threshold: default_dual_return_distance_threshold(),
            frame_id: default_frame_id(),
            input_frame: None,
            output_frame: None,
            return_mode: default_return_mode(),
            vehicle_mirror_param_file: PathBuf::new(),
            vehicle_info_param_file: PathBuf::new(),
            use_multithread: false,
            use_intra_process: false,
            use_pointcloud_container: false,
            container_name: default_container_name(),
        }
    }
}

/// Container executable for the selected threading mode.
fn container_executable(use_multithread: bool) -> &'static str {
    if use_multithread {
        "component_container_mt"
    } else {
        "component_container"
    }
}

impl LaunchArguments {
    pub fn input_frame(&self) -> &str {
        self.input_frame.as_deref().unwrap_or(&self.base_frame)
    }

    pub fn output_frame(&self) -> &str {
        self.output_frame.as_deref().unwrap_or(&self.base_frame)
    }

    pub fn container_executable(&self) -> &'static str {
        container_executable(self.use_multithread)
    }

    /// List range and angle settings that look inverted.
    ///
    /// Boundary values such as a zero minimum angle are valid; only an empty
    /// or inverted interval is reported.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !self.min_range.is_finite() || !self.max_range.is_finite() {
            warnings.push(format!(
                "view range is not finite: min_range {}, max_range {}",
                self.min_range, self.max_range
            ));
        } else if self.min_range >= self.max_range {
            warnings.push(format!(
                "min_range ({}) is not below max_range ({})",
                self.min_range, self.max_range
            ));
        }
        if self.cloud_min_angle >= self.cloud_max_angle {
            warnings.push(format!(
                "cloud_min_angle ({}) is not below cloud_max_angle ({})",
                self.cloud_min_angle, self.cloud_max_angle
            ));
        }
        if self.cloud_max_angle > 360 {
            warnings.push(format!("cloud_max_angle ({}) exceeds 360", self.cloud_max_angle));
        }

        warnings
    }

    /// Load arguments from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let args: LaunchArguments = serde_yaml::from_str(&content)?;
        Ok(args)
    }
}

/// Launch arguments of the legacy Pandar driver stack.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PandarArguments {
    #[serde(default)]
    pub model: String,

    #[serde(default = "default_true")]
    pub launch_driver: bool,

    /// Calibration file of the point cloud converter
    #[serde(default)]
    pub calibration: PathBuf,

    #[serde(default = "default_sensor_ip")]
    pub device_ip: String,

    #[serde(default)]
    pub scan_phase: f64,

    /// Azimuth window in degrees
    #[serde(default = "default_angle_range")]
    pub angle_range: [f64; 2],

    /// Distance window in meters
    #[serde(default = "default_distance_range")]
    pub distance_range: [f64; 2],

    #[serde(default = "default_return_mode")]
    pub return_mode: String,

    /// Replay from a pcap file instead of the device
    #[serde(default)]
    pub pcap: PathBuf,

    #[serde(default = "default_lidar_port")]
    pub lidar_port: u16,

    #[serde(default = "default_gps_port")]
    pub gps_port: u16,

    #[serde(default = "default_pandar_frame_id")]
    pub frame_id: String,

    #[serde(default)]
    pub use_multithread: bool,

    #[serde(default)]
    pub use_intra_process: bool,
}

fn default_angle_range() -> [f64; 2] {
    [0.0, 360.0]
}

fn default_distance_range() -> [f64; 2] {
    [0.05, 200.0]
}

fn default_lidar_port() -> u16 {
    2321
}

fn default_gps_port() -> u16 {
    10121
}

fn default_pandar_frame_id() -> String {
    "pandar".to_string()
}

impl Default for PandarArguments {
    fn default() -> Self {
        Self {
            model: String::new(),
            launch_driver: true,
            calibration: PathBuf::new(),
            device_ip: default_sensor_ip(),
            scan_phase: 0.0,
            angle_range: default_angle_range(),
            distance_range: default_distance_range(),
            return_mode: default_return_mode(),
            pcap: PathBuf::new(),
            lidar_port: default_lidar_port(),
            gps_port: default_gps_port(),
            frame_id: default_pandar_frame_id(),
            use_multithread: false,
            use_intra_process: false,
        }
    }
}

impl PandarArguments {
    pub fn container_executable(&self) -> &'static str {
        container_executable(self.use_multithread)
    }

    /// Load arguments from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let args: PandarArguments = serde_yaml::from_str(&content)?;
        Ok(args)
    }
}

/// Install share directories of the packages providing config and calibration data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareDirs {
    /// Share directory of `nebula_ros` (sensor parameter files)
    pub nebula_ros: PathBuf,
    /// Share directory of `nebula_decoders` (calibration files)
    pub nebula_decoders: PathBuf,
}

impl ShareDirs {
    /// Locate both packages, preferring explicit paths over `prefix_path` lookup.
    ///
    /// Fails on the first package that could not be found.
    pub fn locate(
        nebula_ros: Option<PathBuf>,
        nebula_decoders: Option<PathBuf>,
        prefix_path: Option<&OsStr>,
    ) -> Result<Self, ConfigError> {
        let find = |explicit: Option<PathBuf>, package: &str| {
            explicit
                .or_else(|| prefix_path.and_then(|p| find_package_share(package, p)))
                .ok_or_else(|| ConfigError::PackageNotFound(package.to_string()))
        };

        Ok(Self {
            nebula_ros: find(nebula_ros, "nebula_ros")?,
            nebula_decoders: find(nebula_decoders, "nebula_decoders")?,
        })
    }
}

/// Find `<prefix>/share/<package>` in a colon separated list of install prefixes.
///
/// Only prefixes that register the package in the ament resource index are
/// considered, so a leftover `share/<package>` directory is skipped.
pub fn find_package_share(package: &str, prefix_path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(prefix_path)
        .filter(|prefix| !prefix.as_os_str().is_empty())
        .find(|prefix| prefix.join(PACKAGE_INDEX).join(package).is_file())
        .map(|prefix| prefix.join("share").join(package))
}
