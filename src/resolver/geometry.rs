//! Crop box geometry around the ego vehicle and its mirrors.
//!
//! Crop boxes are expressed in the vehicle base frame: longitudinal offsets
//! map to X, lateral offsets to Y and height offsets to Z.

use serde::{Deserialize, Serialize};

/// Raw vehicle dimensions, as published in the vehicle info parameter file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleDimensions {
    pub wheel_base: f64,
    pub wheel_tread: f64,
    pub front_overhang: f64,
    pub rear_overhang: f64,
    pub left_overhang: f64,
    pub right_overhang: f64,
    pub vehicle_height: f64,
}

/// Axis-aligned box offsets relative to the base frame.
///
/// This is also the on-disk shape of the vehicle mirror parameter file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxOffsets {
    pub min_longitudinal_offset: f64,
    pub max_longitudinal_offset: f64,
    pub min_lateral_offset: f64,
    pub max_lateral_offset: f64,
    pub min_height_offset: f64,
    pub max_height_offset: f64,
}

/// Mirror positions share the offset layout of the vehicle body.
pub type MirrorGeometry = BoxOffsets;

/// Vehicle footprint derived from [`VehicleDimensions`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehicleGeometry {
    pub length: f64,
    pub width: f64,
    #[serde(flatten)]
    pub offsets: BoxOffsets,
}

impl VehicleGeometry {
    pub fn from_dimensions(d: &VehicleDimensions) -> Self {
        Self {
            length: d.front_overhang + d.wheel_base + d.rear_overhang,
            width: d.wheel_tread + d.left_overhang + d.right_overhang,
            offsets: BoxOffsets {
                min_longitudinal_offset: -d.rear_overhang,
                max_longitudinal_offset: d.front_overhang + d.wheel_base,
                min_lateral_offset: -(d.wheel_tread / 2.0 + d.right_overhang),
                max_lateral_offset: d.wheel_tread / 2.0 + d.left_overhang,
                min_height_offset: 0.0,
                max_height_offset: d.vehicle_height,
            },
        }
    }
}

/// Parameters of a crop box filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CropBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
    /// Points inside the box are removed rather than kept.
    pub negative: bool,
}

impl CropBounds {
    /// Exclusion box covering the given offsets.
    pub fn from_offsets(offsets: &BoxOffsets) -> Self {
        Self {
            min_x: offsets.min_longitudinal_offset,
            max_x: offsets.max_longitudinal_offset,
            min_y: offsets.min_lateral_offset,
            max_y: offsets.max_lateral_offset,
            min_z: offsets.min_height_offset,
            max_z: offsets.max_height_offset,
            negative: true,
        }
    }

    /// Describe every axis whose minimum exceeds its maximum.
    ///
    /// A degenerate (zero-extent) axis is accepted.
    pub fn inverted_axes(&self) -> Vec<String> {
        [
            ("x", self.min_x, self.max_x),
            ("y", self.min_y, self.max_y),
            ("z", self.min_z, self.max_z),
        ]
        .into_iter()
        .filter(|(_, min, max)| min > max)
        .map(|(axis, min, max)| format!("min_{axis}={min} > max_{axis}={max}"))
        .collect()
    }
}

/// Self-occlusion crop box for the vehicle body.
pub fn compute_vehicle_bounds(dimensions: &VehicleDimensions) -> CropBounds {
    CropBounds::from_offsets(&VehicleGeometry::from_dimensions(dimensions).offsets)
}

/// Occlusion crop box for the side mirrors.
pub fn compute_mirror_bounds(mirror: &MirrorGeometry) -> CropBounds {
    CropBounds::from_offsets(mirror)
}
