//! Fixture settings stored in a TOML or YAML file.
//!
//! The shared fixture reads the file named by `INFLUXDB_TEST_CONFIG`, see
//! [`crate::load_fixture_config`]. Keys missing from the file keep their
//! defaults.

use crate::config::InfluxDbConfig;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Serialization format of a settings file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Toml,
    Yaml
}

impl FileFormat {
    /// `.toml`, `.yaml` or `.yml`, case-insensitive.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None
        }
    }

    fn decode(self, contents: &str) -> Result<InfluxDbConfig, String> {
        match self {
            Self::Toml => toml::from_str(contents).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(contents).map_err(|e| e.to_string())
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toml => f.write_str("TOML"),
            Self::Yaml => f.write_str("YAML")
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("Cannot read settings file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error
    },

    #[error("Invalid {format} in {}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        format: FileFormat,
        reason: String
    },

    #[error("Cannot tell the format of {}, expected .toml, .yaml or .yml", path.display())]
    UnknownFormat { path: PathBuf }
}

/// Read fixture settings from `path`, picking the format from its extension.
pub fn load_from_file(path: &Path) -> Result<InfluxDbConfig, ConfigFileError> {
    let format = FileFormat::from_path(path).ok_or_else(|| ConfigFileError::UnknownFormat {
        path: path.to_path_buf()
    })?;

    let contents = fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
        path: path.to_path_buf(),
        source
    })?;

    format
        .decode(&contents)
        .map_err(|reason| ConfigFileError::Parse {
            path: path.to_path_buf(),
            format,
            reason
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_toml_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("influxdb.toml");
        fs::write(
            &path,
            r#"
image = "influxdb:2.7.4"
bucket = "test-bucket"
organization = "test-organization"
admin_token = "test-admin-token"
startup_timeout_seconds = 60
"#
        )
        .unwrap();

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.image, "influxdb:2.7.4");
        assert_eq!(config.bucket, "test-bucket");
        assert_eq!(config.organization, "test-organization");
        assert_eq!(config.admin_token, "test-admin-token");
        assert_eq!(config.startup_timeout_seconds, 60);
        assert_eq!(config.username, "any");
    }

    #[test]
    fn test_yaml_settings_with_yml_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("influxdb.YML");
        fs::write(&path, "username: admin\npassword: hunter22\n").unwrap();

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.username, "admin");
        assert_eq!(config.password, "hunter22");
        assert_eq!(config.bucket, "init.bucket");
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(FileFormat::from_path(Path::new("a.toml")), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_path(Path::new("a.yaml")), Some(FileFormat::Yaml));
        assert_eq!(FileFormat::from_path(Path::new("a.json")), None);
        assert_eq!(FileFormat::from_path(Path::new("influxdb")), None);
    }

    #[test]
    fn test_unknown_format_is_rejected_before_reading() {
        let err = load_from_file(Path::new("/nonexistent/influxdb.json")).unwrap_err();
        assert!(matches!(err, ConfigFileError::UnknownFormat { .. }));
    }

    #[test]
    fn test_parse_error_names_file_and_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[invalid\n").unwrap();

        let err = load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigFileError::Parse { format: FileFormat::Toml, .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_missing_file_keeps_io_error() {
        let err = load_from_file(Path::new("/nonexistent/path/influxdb.toml")).unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::Read { ref source, .. } if source.kind() == io::ErrorKind::NotFound
        ));
    }

    #[test]
    fn test_unreadable_path_is_not_reported_as_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::create_dir(&path).unwrap();

        let err = load_from_file(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::Read { ref source, .. } if source.kind() != io::ErrorKind::NotFound
        ));
    }
}
