//! Sensor model classification by name prefix.

use std::fmt;

use super::ResolveError;

/// LiDAR vendor family recognized by the driver stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    Hesai,
    Velodyne,
    Unrecognized,
}

impl Vendor {
    /// Vendor name as used in plugin class names (e.g. `HesaiDriverRosWrapper`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Hesai => "Hesai",
            Vendor::Velodyne => "Velodyne",
            Vendor::Unrecognized => "unrecognized_sensor_model",
        }
    }

    /// Lowercase vendor name, used for share directory layout and node names.
    pub fn lower(&self) -> String {
        self.as_str().to_lowercase()
    }

    /// Extension of the vendor's base calibration file, if the vendor is known.
    pub fn calibration_extension(&self) -> Option<&'static str> {
        match self {
            Vendor::Hesai => Some(".csv"),
            Vendor::Velodyne => Some(".yaml"),
            Vendor::Unrecognized => None,
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sensor model paired with the vendor family it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorIdentity {
    model: String,
    vendor: Vendor,
}

impl SensorIdentity {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    pub fn calibration_extension(&self) -> Option<&'static str> {
        self.vendor.calibration_extension()
    }

    pub fn is_recognized(&self) -> bool {
        self.vendor != Vendor::Unrecognized
    }

    /// Reject unrecognized models up front.
    ///
    /// No calibration path can be built for an unknown vendor, so this is
    /// the point where resolution aborts rather than later in file lookup.
    pub fn require_recognized(self) -> Result<Self, ResolveError> {
        if self.is_recognized() {
            Ok(self)
        } else {
            Err(ResolveError::UnrecognizedSensorModel(self.model))
        }
    }
}

/// Lowercased prefix of at most `n` characters.
fn prefix_lower(model: &str, n: usize) -> String {
    model.chars().take(n).collect::<String>().to_lowercase()
}

/// Classify a sensor model name into its vendor family.
///
/// Matching is case-insensitive on the leading characters:
/// `pandar*` is Hesai, `hdl*` / `vlp*` / `vls*` are Velodyne.
/// Anything else is [`Vendor::Unrecognized`].
pub fn classify(model: &str) -> SensorIdentity {
    let vendor = if prefix_lower(model, 6) == "pandar" {
        Vendor::Hesai
    } else if matches!(prefix_lower(model, 3).as_str(), "hdl" | "vlp" | "vls") {
        Vendor::Velodyne
    } else {
        Vendor::Unrecognized
    };

    SensorIdentity {
        model: model.to_string(),
        vendor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_hesai_any_case() {
        for model in ["Pandar64", "PandarQT", "pandarxt32", "PANDAR128E4X", "Pandar"] {
            let identity = classify(model);
            assert_eq!(identity.vendor(), Vendor::Hesai, "{}", model);
            assert_eq!(identity.calibration_extension(), Some(".csv"));
            assert_eq!(identity.model(), model);
        }
    }

    #[test]
    fn test_classify_velodyne_prefixes() {
        for model in ["VLP16", "vlp32", "VLS128", "HDL32", "hdl64", "Vlp16"] {
            let identity = classify(model);
            assert_eq!(identity.vendor(), Vendor::Velodyne, "{}", model);
            assert_eq!(identity.calibration_extension(), Some(".yaml"));
        }
    }

    #[test]
    fn test_classify_unrecognized() {
        for model in ["", "OS1-64", "pand", "panda64", "VL16", "Helios", "xhdl"] {
            let identity = classify(model);
            assert_eq!(identity.vendor(), Vendor::Unrecognized, "{}", model);
            assert_eq!(identity.calibration_extension(), None);
            assert!(!identity.is_recognized());
        }
    }

    #[test]
    fn test_classify_non_ascii_model_does_not_panic() {
        let identity = classify("Pandär");
        assert_eq!(identity.vendor(), Vendor::Unrecognized);
    }

    #[test]
    fn test_require_recognized() {
        assert!(classify("Pandar64").require_recognized().is_ok());

        match classify("OS1-64").require_recognized() {
            Err(ResolveError::UnrecognizedSensorModel(model)) => assert_eq!(model, "OS1-64"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_vendor_names() {
        assert_eq!(Vendor::Hesai.lower(), "hesai");
        assert_eq!(Vendor::Velodyne.to_string(), "Velodyne");
    }
}
