/*
Copyright 2024 San Francisco Compute Company

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! TOML file configuration provider

use crate::domain::{DomainError, ProbeConfig};
use crate::ports::ConfigurationProvider;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Configuration provider reading a TOML file
///
/// Every key is optional; missing keys take their defaults:
///
/// ```toml
/// skip_sudo = true
/// command_timeout = 10
/// formats = ["json", "txt"]
/// output_dir = "/var/lib/hardware_probe"
/// ```
pub struct TomlConfigurationProvider {
    path: PathBuf,
}

impl TomlConfigurationProvider {
    /// Create a provider for the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse a probe configuration from TOML text
pub fn parse_probe_config(contents: &str) -> Result<ProbeConfig, DomainError> {
    toml::from_str(contents).map_err(|e| DomainError::InvalidConfiguration(e.to_string()))
}

#[async_trait]
impl ConfigurationProvider for TomlConfigurationProvider {
    async fn get_probe_config(&self) -> Result<ProbeConfig, DomainError> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            DomainError::InvalidConfiguration(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))
        })?;

        parse_probe_config(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OutputFormat;

    #[test]
    fn test_parse_partial_config() {
        let config = parse_probe_config(
            r#"
skip_sudo = true
formats = ["json", "txt"]
dmi_table_path = "/tmp/DMI"
"#,
        )
        .unwrap();

        assert!(config.skip_sudo);
        assert_eq!(config.formats, vec![OutputFormat::Json, OutputFormat::Text]);
        assert_eq!(config.dmi_table_path, Some(PathBuf::from("/tmp/DMI")));
        assert_eq!(config.command_timeout, 30);
        assert_eq!(config.output_dir, None);
    }

    #[test]
    fn test_parse_invalid_config() {
        assert!(matches!(
            parse_probe_config("formats = [\"yaml\"]"),
            Err(DomainError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_read_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.toml");
        std::fs::write(&path, "command_timeout = 5\nverbose = true\n").unwrap();

        let provider = TomlConfigurationProvider::new(&path);

        let config = provider.get_probe_config().await.unwrap();
        assert_eq!(config.command_timeout, 5);
        assert!(config.verbose);
        assert!(config.formats.is_empty());
    }

    #[tokio::test]
    async fn test_missing_config_file() {
        let provider = TomlConfigurationProvider::new("/nonexistent/probe.toml");
        assert!(provider.get_probe_config().await.is_err());
    }
}
