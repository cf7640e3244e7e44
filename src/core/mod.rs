//! Parameter file I/O.

pub mod loaders;
pub mod writers;

pub use loaders::{load_mirror_geometry, load_parameter_set, load_vehicle_dimensions, LoaderError, ParameterSet};
pub use writers::{write_yaml, write_yaml_file, WriteError};
