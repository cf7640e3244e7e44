//! Legacy Hesai Pandar stack (`pandar_driver` + `pandar_pointcloud`).
//!
//! Older vehicles run the vendor driver split into a packet driver and a
//! point cloud converter. Only the converter lives in the container; the
//! packet driver is loaded into it when the driver is launched.

use serde_yaml::Value;

use super::topology::{
    topics, ContainerSpec, DeploymentMode, NodeRole, PipelineNode, PipelineTopology, Remapping,
};
use crate::config::PandarArguments;
use crate::core::loaders::ParameterSet;

/// Container name used by the legacy stack.
pub const PANDAR_CONTAINER_NAME: &str = "pandar_node_container";

fn pandar_cloud_node(args: &PandarArguments) -> PipelineNode {
    let mut params = ParameterSet::new();
    params.insert("model".to_string(), Value::from(args.model.as_str()));
    params.insert("scan_phase".to_string(), Value::from(args.scan_phase));
    params.insert("angle_range".to_string(), Value::from(args.angle_range.to_vec()));
    params.insert("distance_range".to_string(), Value::from(args.distance_range.to_vec()));
    params.insert("device_ip".to_string(), Value::from(args.device_ip.as_str()));
    params.insert("calibration".to_string(), Value::from(args.calibration.display().to_string()));
    params.insert("return_mode".to_string(), Value::from(args.return_mode.as_str()));

    PipelineNode {
        role: NodeRole::PandarCloud,
        name: "pandar_cloud".to_string(),
        package: "pandar_pointcloud".to_string(),
        plugin: "pandar_pointcloud::PandarCloud".to_string(),
        input_topic: None,
        output_topic: Some(topics::POINTCLOUD_RAW_EX.to_string()),
        parameters: params,
        remappings: vec![
            Remapping::new("pandar_points", topics::POINTCLOUD_RAW),
            Remapping::new("pandar_points_ex", topics::POINTCLOUD_RAW_EX),
        ],
        use_intra_process_comms: Some(args.use_intra_process),
    }
}

fn pandar_driver_node(args: &PandarArguments) -> PipelineNode {
    let mut params = ParameterSet::new();
    params.insert("pcap".to_string(), Value::from(args.pcap.display().to_string()));
    params.insert("device_ip".to_string(), Value::from(args.device_ip.as_str()));
    params.insert("lidar_port".to_string(), Value::from(args.lidar_port));
    params.insert("gps_port".to_string(), Value::from(args.gps_port));
    params.insert("scan_phase".to_string(), Value::from(args.scan_phase));
    params.insert("model".to_string(), Value::from(args.model.as_str()));
    params.insert("frame_id".to_string(), Value::from(args.frame_id.as_str()));

    PipelineNode {
        role: NodeRole::PandarDriver,
        name: "pandar_driver".to_string(),
        package: "pandar_driver".to_string(),
        plugin: "pandar_driver::PandarDriver".to_string(),
        input_topic: None,
        output_topic: None,
        parameters: params,
        remappings: Vec::new(),
        use_intra_process_comms: None,
    }
}

/// Assemble the legacy Pandar topology.
///
/// Always runs in its own container.
pub fn build_pandar_topology(args: &PandarArguments) -> PipelineTopology {
    PipelineTopology::new(
        vec![pandar_cloud_node(args)],
        args.launch_driver.then(|| pandar_driver_node(args)),
        DeploymentMode::StandaloneContainer,
        ContainerSpec {
            name: PANDAR_CONTAINER_NAME.to_string(),
            executable: args.container_executable().to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::topology::{ContainerTarget, LaunchEntity};

    fn sample_args() -> PandarArguments {
        PandarArguments {
            model: "Pandar40P".to_string(),
            ..PandarArguments::default()
        }
    }

    #[test]
    fn test_pandar_cloud_parameters() {
        let topology = build_pandar_topology(&sample_args());
        let cloud = topology.node(NodeRole::PandarCloud).unwrap();

        assert_eq!(topology.nodes().len(), 1);
        assert_eq!(cloud.plugin, "pandar_pointcloud::PandarCloud");
        assert_eq!(cloud.parameter("model").and_then(Value::as_str), Some("Pandar40P"));
        assert_eq!(cloud.parameter("return_mode").and_then(Value::as_str), Some("Dual"));
        assert_eq!(
            cloud.parameter("distance_range"),
            Some(&Value::from(vec![0.05, 200.0]))
        );
        assert_eq!(
            cloud.remappings,
            vec![
                Remapping::new("pandar_points", "pointcloud_raw"),
                Remapping::new("pandar_points_ex", "pointcloud_raw_ex"),
            ]
        );
    }

    #[test]
    fn test_driver_loaded_into_dedicated_container() {
        let topology = build_pandar_topology(&sample_args());
        assert_eq!(
            topology.loaded_driver().map(|n| n.role),
            Some(NodeRole::PandarDriver)
        );
        let description = topology.launch_description();

        assert_eq!(description.entities.len(), 2);
        match &description.entities[1] {
            LaunchEntity::LoadNodes { target, nodes } => {
                assert_eq!(target, &ContainerTarget::Dedicated("pandar_node_container".to_string()));
                assert_eq!(nodes[0].name, "pandar_driver");
                assert_eq!(nodes[0].parameter("lidar_port").and_then(Value::as_u64), Some(2321));
                assert_eq!(nodes[0].parameter("gps_port").and_then(Value::as_u64), Some(10121));
            }
            other => panic!("unexpected entity: {:?}", other),
        }
    }

    #[test]
    fn test_without_driver() {
        let args = PandarArguments {
            launch_driver: false,
            use_multithread: true,
            ..sample_args()
        };
        let topology = build_pandar_topology(&args);

        assert!(topology.loaded_driver().is_none());
        assert_eq!(topology.container().executable, "component_container_mt");
        assert_eq!(topology.launch_description().entities.len(), 1);
    }
}
