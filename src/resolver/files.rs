//! Location of the sensor parameter, calibration and correction files.
//!
//! Parameter files are looked up per model first and fall back to the shared
//! `BaseParams.yaml`. The calibration file cannot be overridden. The
//! correction file is optional and resolves to "absent" when missing.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::classifier::SensorIdentity;
use super::{MandatoryFile, ResolveError};
use crate::config::ShareDirs;

/// Name of the generic parameter file shipped with the driver package.
pub const BASE_PARAMS_FILE: &str = "BaseParams.yaml";

/// Extension of the optional per-device correction file.
pub const CORRECTION_EXTENSION: &str = ".dat";

/// Resolved input files for the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePaths {
    pub params_file: PathBuf,
    pub calibration_file: PathBuf,
    /// `None` when no correction data is available.
    pub correction_file: Option<PathBuf>,
}

impl FilePaths {
    /// Correction path as passed to the driver; empty when absent.
    pub fn correction_param(&self) -> String {
        self.correction_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }
}

/// `<share>/config/<vendor>/<model>.yaml`
pub fn default_params_path(identity: &SensorIdentity, share: &ShareDirs) -> PathBuf {
    share
        .nebula_ros
        .join("config")
        .join(identity.vendor().lower())
        .join(format!("{}.yaml", identity.model()))
}

/// `<share>/config/BaseParams.yaml`
pub fn base_params_path(share: &ShareDirs) -> PathBuf {
    share.nebula_ros.join("config").join(BASE_PARAMS_FILE)
}

/// Directory holding the vendor's calibration data.
fn calibration_dir(identity: &SensorIdentity, share: &ShareDirs) -> PathBuf {
    share
        .nebula_decoders
        .join("calibration")
        .join(identity.vendor().lower())
}

/// `<share>/calibration/<vendor>/<model><ext>`
///
/// Fails for unrecognized models since they have no calibration extension.
pub fn calibration_path(
    identity: &SensorIdentity,
    share: &ShareDirs,
) -> Result<PathBuf, ResolveError> {
    let extension = identity
        .calibration_extension()
        .ok_or_else(|| ResolveError::UnrecognizedSensorModel(identity.model().to_string()))?;

    Ok(calibration_dir(identity, share).join(format!("{}{}", identity.model(), extension)))
}

/// `<share>/calibration/<vendor>/<model>.dat`
pub fn default_correction_path(identity: &SensorIdentity, share: &ShareDirs) -> PathBuf {
    calibration_dir(identity, share).join(format!("{}{}", identity.model(), CORRECTION_EXTENSION))
}

/// Treat an unset launch argument as "use the default".
fn user_path(raw: &Path) -> Option<&Path> {
    if raw.as_os_str().is_empty() {
        None
    } else {
        Some(raw)
    }
}

/// Resolve all driver input files for `identity`.
///
/// Only existence checks are performed; nothing is parsed here.
pub fn resolve_files(
    identity: &SensorIdentity,
    user_params_path: &Path,
    user_correction_path: &Path,
    share: &ShareDirs,
) -> Result<FilePaths, ResolveError> {
    let calibration_file = calibration_path(identity, share)?;

    let mut params_file = match user_path(user_params_path) {
        Some(path) => path.to_path_buf(),
        None => {
            warn!("No config file provided, using sensor model default");
            default_params_path(identity, share)
        }
    };

    let correction_candidate = match user_path(user_correction_path) {
        Some(path) => path.to_path_buf(),
        None => {
            warn!("No correction file provided, using sensor model default");
            default_correction_path(identity, share)
        }
    };

    let correction_file = if correction_candidate.exists() {
        Some(correction_candidate)
    } else {
        debug!(
            "Correction file {} not found, continuing without correction data",
            correction_candidate.display()
        );
        None
    };

    if !params_file.exists() {
        let base = base_params_path(share);
        debug!(
            "Params file {} not found, falling back to {}",
            params_file.display(),
            base.display()
        );
        params_file = base;
    }

    if !params_file.exists() {
        return Err(ResolveError::MissingMandatoryFile {
            kind: MandatoryFile::SensorParams,
            path: params_file,
        });
    }

    if !calibration_file.exists() {
        return Err(ResolveError::MissingMandatoryFile {
            kind: MandatoryFile::Calibration,
            path: calibration_file,
        });
    }

    info!("Sensor params: {}", params_file.display());
    info!("Calibration: {}", calibration_file.display());

    Ok(FilePaths {
        params_file,
        calibration_file,
        correction_file,
    })
}
