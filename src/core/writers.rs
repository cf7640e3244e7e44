//! Writers for the resolved launch description.
//!
//! The description is emitted as YAML, either to a file or to any
//! [`Write`] sink such as stdout.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data.
    #[error("failed to write to '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error.
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Serialize `value` as YAML into `writer`.
///
/// `label` names the sink in error messages.
pub fn write_yaml<T: Serialize, W: Write>(writer: &mut W, value: &T, label: &str) -> Result<()> {
    let content = serde_yaml::to_string(value)?;
    writer
        .write_all(content.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| WriteError::WriteFile {
            path: label.to_string(),
            source: e,
        })
}

/// Write `value` as a YAML file, creating parent directories as needed.
pub fn write_yaml_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dirs(path)?;
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);
    write_yaml(&mut writer, value, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Serialize)]
    struct Sample {
        name: String,
        values: Vec<f64>,
    }

    fn sample() -> Sample {
        Sample {
            name: "crop_box_filter_self".to_string(),
            values: vec![-0.5, 3.0],
        }
    }

    #[test]
    fn test_write_yaml_to_buffer() {
        let mut buffer = Vec::new();
        write_yaml(&mut buffer, &sample(), "buffer").unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("name: crop_box_filter_self"));
        assert!(text.contains("- -0.5"));
    }

    #[test]
    fn test_write_yaml_file_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("launch").join("nebula.yaml");

        write_yaml_file(&path, &sample()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&content).unwrap();
        assert_eq!(parsed["name"].as_str(), Some("crop_box_filter_self"));
        assert_eq!(parsed["values"][1].as_f64(), Some(3.0));
    }

    #[test]
    fn test_write_yaml_file_below_regular_file_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let result = write_yaml_file(&blocker.join("nebula.yaml"), &sample());
        assert!(result.is_err());
    }
}
