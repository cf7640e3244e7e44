//! Node graph of the LiDAR preprocessing pipeline.
//!
//! The pipeline is a fixed chain:
//!
//! ```text
//! driver ─► crop_box_filter_self ─► crop_box_filter_mirror ─► distortion_corrector ─► ring_outlier_filter
//! ```
//!
//! Topic names are part of the interface of the external nodes and must
//! not change. The hardware interface node is a sibling of the chain and
//! is only described when the driver is launched.

use serde::Serialize;
use serde_yaml::Value;

use super::classifier::SensorIdentity;
use super::files::FilePaths;
use super::geometry::CropBounds;
use crate::config::LaunchArguments;
use crate::core::loaders::ParameterSet;

/// Topic names shared with the external nodes.
pub mod topics {
    pub const POINTCLOUD_RAW: &str = "pointcloud_raw";
    pub const POINTCLOUD_RAW_EX: &str = "pointcloud_raw_ex";
    pub const SELF_CROPPED: &str = "self_cropped/pointcloud_ex";
    pub const MIRROR_CROPPED: &str = "mirror_cropped/pointcloud_ex";
    pub const RECTIFIED: &str = "rectified/pointcloud_ex";
    pub const OUTLIER_FILTERED: &str = "outlier_filtered/pointcloud";
    pub const TWIST: &str = "/sensing/vehicle_velocity_converter/twist_with_covariance";
    pub const IMU: &str = "/sensing/imu/imu_data";
}

/// Namespace of the dedicated container.
pub const CONTAINER_NAMESPACE: &str = "pointcloud_preprocessor";

/// Package providing the container executables.
pub const CONTAINER_PACKAGE: &str = "rclcpp_components";

const DRIVER_PACKAGE: &str = "nebula_ros";
const PREPROCESSOR_PACKAGE: &str = "pointcloud_preprocessor";
const CROP_BOX_PLUGIN: &str = "pointcloud_preprocessor::CropBoxFilterComponent";
const DISTORTION_CORRECTOR_PLUGIN: &str = "pointcloud_preprocessor::DistortionCorrectorComponent";
const RING_OUTLIER_FILTER_PLUGIN: &str = "pointcloud_preprocessor::RingOutlierFilterComponent";

/// Position of a node in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    Driver,
    SelfCropFilter,
    MirrorCropFilter,
    DistortionCorrector,
    OutlierFilter,
    HardwareInterface,
    /// Point cloud converter of the legacy Pandar stack.
    PandarCloud,
    /// Packet driver of the legacy Pandar stack.
    PandarDriver,
}

/// Topic rename applied when the node is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Remapping {
    pub from: String,
    pub to: String,
}

impl Remapping {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Description of a composable node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineNode {
    #[serde(skip)]
    pub role: NodeRole,
    pub name: String,
    pub package: String,
    pub plugin: String,
    /// Point cloud consumed by the node, `None` for sources.
    #[serde(skip)]
    pub input_topic: Option<String>,
    /// Point cloud handed to the next node, `None` for non-chain nodes.
    #[serde(skip)]
    pub output_topic: Option<String>,
    #[serde(skip_serializing_if = "ParameterSet::is_empty")]
    pub parameters: ParameterSet,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remappings: Vec<Remapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_intra_process_comms: Option<bool>,
}

impl PipelineNode {
    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }
}

/// How the chain is hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    /// A dedicated container is started for the pipeline.
    StandaloneContainer,
    /// Nodes are loaded into a container started elsewhere.
    SharedContainerLoad,
}

impl DeploymentMode {
    pub fn from_flag(use_shared_container: bool) -> Self {
        if use_shared_container {
            DeploymentMode::SharedContainerLoad
        } else {
            DeploymentMode::StandaloneContainer
        }
    }
}

/// Container the nodes are hosted in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSpec {
    pub name: String,
    pub executable: String,
}

/// Where a load request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ContainerTarget {
    /// The container described in the same launch description.
    Dedicated(String),
    /// A container started by another launch file.
    Shared(String),
}

/// One action of the launch description.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LaunchEntity {
    /// Start a container hosting `nodes`.
    Container {
        name: String,
        namespace: String,
        package: String,
        executable: String,
        nodes: Vec<PipelineNode>,
    },
    /// Load `nodes` into a running container.
    LoadNodes {
        target: ContainerTarget,
        nodes: Vec<PipelineNode>,
    },
}

/// Output artifact of the resolver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchDescription {
    pub entities: Vec<LaunchEntity>,
}

/// Immutable pipeline graph together with its deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineTopology {
    nodes: Vec<PipelineNode>,
    loaded_driver: Option<PipelineNode>,
    mode: DeploymentMode,
    container: ContainerSpec,
}

impl PipelineTopology {
    pub fn new(
        nodes: Vec<PipelineNode>,
        loaded_driver: Option<PipelineNode>,
        mode: DeploymentMode,
        container: ContainerSpec,
    ) -> Self {
        Self {
            nodes,
            loaded_driver,
            mode,
            container,
        }
    }

    /// Nodes hosted together, in pipeline order.
    pub fn nodes(&self) -> &[PipelineNode] {
        &self.nodes
    }

    /// Driver node loaded into the container after the hosted nodes.
    ///
    /// This is the hardware interface for the Nebula pipeline and the packet
    /// driver for the legacy Pandar stack.
    pub fn loaded_driver(&self) -> Option<&PipelineNode> {
        self.loaded_driver.as_ref()
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    pub fn container(&self) -> &ContainerSpec {
        &self.container
    }

    pub fn node(&self, role: NodeRole) -> Option<&PipelineNode> {
        self.nodes
            .iter()
            .chain(self.loaded_driver.iter())
            .find(|n| n.role == role)
    }

    /// True when every node consumes the output of its predecessor.
    pub fn is_chained(&self) -> bool {
        self.nodes
            .windows(2)
            .all(|pair| pair[0].output_topic.is_some() && pair[0].output_topic == pair[1].input_topic)
    }

    /// Container receiving the loaded driver node.
    pub fn loaded_driver_target(&self) -> ContainerTarget {
        match self.mode {
            DeploymentMode::StandaloneContainer => ContainerTarget::Dedicated(self.container.name.clone()),
            DeploymentMode::SharedContainerLoad => ContainerTarget::Shared(self.container.name.clone()),
        }
    }

    /// Realize the topology as launch actions for the selected deployment.
    pub fn launch_description(&self) -> LaunchDescription {
        let mut entities = Vec::with_capacity(2);

        match self.mode {
            DeploymentMode::StandaloneContainer => entities.push(LaunchEntity::Container {
                name: self.container.name.clone(),
                namespace: CONTAINER_NAMESPACE.to_string(),
                package: CONTAINER_PACKAGE.to_string(),
                executable: self.container.executable.clone(),
                nodes: self.nodes.clone(),
            }),
            DeploymentMode::SharedContainerLoad => entities.push(LaunchEntity::LoadNodes {
                target: ContainerTarget::Shared(self.container.name.clone()),
                nodes: self.nodes.clone(),
            }),
        }

        if let Some(driver) = &self.loaded_driver {
            entities.push(LaunchEntity::LoadNodes {
                target: self.loaded_driver_target(),
                nodes: vec![driver.clone()],
            });
        }

        LaunchDescription { entities }
    }
}

/// Insert launch arguments into a parameter set.
fn insert_all<I, V>(params: &mut ParameterSet, values: I)
where
    I: IntoIterator<Item = (&'static str, V)>,
    V: Into<Value>,
{
    for (key, value) in values {
        params.insert(key.to_string(), value.into());
    }
}

fn crop_box_parameters(bounds: &CropBounds, args: &LaunchArguments) -> ParameterSet {
    let mut params = ParameterSet::new();
    insert_all(
        &mut params,
        [
            ("input_frame", args.input_frame()),
            ("output_frame", args.output_frame()),
        ],
    );
    params.insert("negative".to_string(), Value::Bool(bounds.negative));
    insert_all(
        &mut params,
        [
            ("min_x", bounds.min_x),
            ("max_x", bounds.max_x),
            ("min_y", bounds.min_y),
            ("max_y", bounds.max_y),
            ("min_z", bounds.min_z),
            ("max_z", bounds.max_z),
        ],
    );
    params
}

fn driver_node(
    identity: &SensorIdentity,
    paths: &FilePaths,
    args: &LaunchArguments,
    sensor_params: &ParameterSet,
) -> PipelineNode {
    // File parameters override the generic sensor parameter file.
    let mut params = sensor_params.clone();
    insert_all(
        &mut params,
        [
            ("calibration_file", paths.calibration_file.display().to_string()),
            ("correction_file", paths.correction_param()),
            ("sensor_model", identity.model().to_string()),
            ("return_mode", args.return_mode.clone()),
            ("frame_id", args.frame_id.clone()),
        ],
    );
    insert_all(
        &mut params,
        [
            ("min_range", args.min_range),
            ("max_range", args.max_range),
            ("scan_phase", args.scan_phase),
            ("dual_return_distance_threshold", args.dual_return_distance_threshold),
        ],
    );
    insert_all(
        &mut params,
        [
            ("cloud_min_angle", args.cloud_min_angle),
            ("cloud_max_angle", args.cloud_max_angle),
        ],
    );

    let vendor = identity.vendor();
    PipelineNode {
        role: NodeRole::Driver,
        name: format!("{}_driver_ros_wrapper_node", vendor.lower()),
        package: DRIVER_PACKAGE.to_string(),
        plugin: format!("{}DriverRosWrapper", vendor.as_str()),
        input_topic: None,
        output_topic: Some(topics::POINTCLOUD_RAW_EX.to_string()),
        parameters: params,
        remappings: vec![
            Remapping::new("aw_points", topics::POINTCLOUD_RAW),
            Remapping::new("aw_points_ex", topics::POINTCLOUD_RAW_EX),
        ],
        use_intra_process_comms: Some(args.use_intra_process),
    }
}

/// Filter node using the plain `input` / `output` remapping convention.
fn filter_node(
    role: NodeRole,
    name: &str,
    plugin: &str,
    input: &str,
    output: &str,
    parameters: ParameterSet,
    args: &LaunchArguments,
) -> PipelineNode {
    PipelineNode {
        role,
        name: name.to_string(),
        package: PREPROCESSOR_PACKAGE.to_string(),
        plugin: plugin.to_string(),
        input_topic: Some(input.to_string()),
        output_topic: Some(output.to_string()),
        parameters,
        remappings: vec![Remapping::new("input", input), Remapping::new("output", output)],
        use_intra_process_comms: Some(args.use_intra_process),
    }
}

fn distortion_corrector_node(args: &LaunchArguments) -> PipelineNode {
    PipelineNode {
        role: NodeRole::DistortionCorrector,
        name: "distortion_corrector_node".to_string(),
        package: PREPROCESSOR_PACKAGE.to_string(),
        plugin: DISTORTION_CORRECTOR_PLUGIN.to_string(),
        input_topic: Some(topics::MIRROR_CROPPED.to_string()),
        output_topic: Some(topics::RECTIFIED.to_string()),
        parameters: ParameterSet::new(),
        remappings: vec![
            Remapping::new("~/input/twist", topics::TWIST),
            Remapping::new("~/input/imu", topics::IMU),
            Remapping::new("~/input/pointcloud", topics::MIRROR_CROPPED),
            Remapping::new("~/output/pointcloud", topics::RECTIFIED),
        ],
        use_intra_process_comms: Some(args.use_intra_process),
    }
}

fn hardware_interface_node(
    identity: &SensorIdentity,
    paths: &FilePaths,
    args: &LaunchArguments,
) -> PipelineNode {
    let mut params = ParameterSet::new();
    insert_all(
        &mut params,
        [
            ("sensor_model", identity.model().to_string()),
            ("calibration_file", paths.calibration_file.display().to_string()),
            ("sensor_ip", args.sensor_ip.clone()),
            ("host_ip", args.host_ip.clone()),
            ("return_mode", args.return_mode.clone()),
            ("frame_id", args.frame_id.clone()),
        ],
    );
    insert_all(
        &mut params,
        [("scan_phase", args.scan_phase), ("rotation_speed", args.rotation_speed)],
    );
    insert_all(
        &mut params,
        [
            ("data_port", args.data_port),
            ("gnss_port", args.gnss_port),
            ("cloud_min_angle", args.cloud_min_angle),
            ("cloud_max_angle", args.cloud_max_angle),
        ],
    );

    let vendor = identity.vendor();
    PipelineNode {
        role: NodeRole::HardwareInterface,
        // Created in a global context, so the name carries the vendor.
        name: format!("{}_hw_interface_ros_wrapper_node", vendor.lower()),
        package: DRIVER_PACKAGE.to_string(),
        plugin: format!("{}HwInterfaceRosWrapper", vendor.as_str()),
        input_topic: None,
        output_topic: None,
        parameters: params,
        remappings: Vec::new(),
        use_intra_process_comms: None,
    }
}

/// Assemble the preprocessing pipeline for a recognized sensor.
pub fn build_topology(
    identity: &SensorIdentity,
    paths: &FilePaths,
    self_bounds: &CropBounds,
    mirror_bounds: &CropBounds,
    args: &LaunchArguments,
    sensor_params: &ParameterSet,
) -> PipelineTopology {
    let nodes = vec![
        driver_node(identity, paths, args, sensor_params),
        filter_node(
            NodeRole::SelfCropFilter,
            "crop_box_filter_self",
            CROP_BOX_PLUGIN,
            topics::POINTCLOUD_RAW_EX,
            topics::SELF_CROPPED,
            crop_box_parameters(self_bounds, args),
            args,
        ),
        filter_node(
            NodeRole::MirrorCropFilter,
            "crop_box_filter_mirror",
            CROP_BOX_PLUGIN,
            topics::SELF_CROPPED,
            topics::MIRROR_CROPPED,
            crop_box_parameters(mirror_bounds, args),
            args,
        ),
        distortion_corrector_node(args),
        filter_node(
            NodeRole::OutlierFilter,
            "ring_outlier_filter",
            RING_OUTLIER_FILTER_PLUGIN,
            topics::RECTIFIED,
            topics::OUTLIER_FILTERED,
            ParameterSet::new(),
            args,
        ),
    ];

    let hardware_interface = args
        .launch_driver
        .then(|| hardware_interface_node(identity, paths, args));

    PipelineTopology::new(
        nodes,
        hardware_interface,
        DeploymentMode::from_flag(args.use_pointcloud_container),
        ContainerSpec {
            name: args.container_name.clone(),
            executable: args.container_executable().to_string(),
        },
    )
}
