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

//! Dependency injection container for the memory probe services

use crate::adapters::{
    FileInventoryExporter, FileSystemRepository, LinuxMemoryTableSource, LogDiagnosticSink,
    MacOsMemoryTableSource, TomlConfigurationProvider, UnixCommandExecutor,
};
use crate::domain::{DomainError, InventoryCollectionService, ProbeConfig};
use crate::ports::{
    CommandExecutor, ConfigurationProvider, DiagnosticSink, HardwareProbeService,
    MemoryTableSource,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the dependency injection container
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerConfig {
    /// Command execution timeout
    pub command_timeout: Duration,
    /// Command retry count
    pub retry_count: u32,
    /// Allow sudo when firmware tables are not readable
    pub allow_sudo: bool,
    /// Decode this DMI table file instead of the platform source
    pub dmi_table_path: Option<PathBuf>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(30),
            retry_count: 2,
            allow_sudo: true,
            dmi_table_path: None,
        }
    }
}

impl From<&ProbeConfig> for ContainerConfig {
    fn from(config: &ProbeConfig) -> Self {
        ContainerConfigBuilder::new()
            .command_timeout(Duration::from_secs(config.command_timeout))
            .retry_count(config.retry_count)
            .allow_sudo(!config.skip_sudo)
            .dmi_table_path(config.dmi_table_path.clone())
            .build()
    }
}

/// Simple configuration provider implementation
pub struct SimpleConfigurationProvider {
    config: ProbeConfig,
}

impl SimpleConfigurationProvider {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl ConfigurationProvider for SimpleConfigurationProvider {
    async fn get_probe_config(&self) -> Result<ProbeConfig, DomainError> {
        Ok(self.config.clone())
    }
}

/// Dependency injection container
pub struct ServiceContainer {
    config: ContainerConfig,
}

impl ServiceContainer {
    /// Create a new service container with configuration
    pub fn new(config: ContainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Create the command executor
    pub fn create_command_executor(&self) -> Arc<dyn CommandExecutor> {
        Arc::new(UnixCommandExecutor::new(
            self.config.command_timeout,
            self.config.retry_count,
        ))
    }

    /// Create the memory table source
    ///
    /// An explicit DMI table path selects the SMBIOS source on any platform;
    /// otherwise the platform decides.
    pub fn create_memory_source(&self) -> Result<Arc<dyn MemoryTableSource>, Box<dyn Error>> {
        let command_executor = self.create_command_executor();

        let source: Arc<dyn MemoryTableSource> = if let Some(path) = &self.config.dmi_table_path {
            Arc::new(self.linux_source(command_executor).with_table_path(path))
        } else if cfg!(target_os = "macos") {
            Arc::new(MacOsMemoryTableSource::new(command_executor))
        } else if cfg!(target_os = "linux") {
            Arc::new(self.linux_source(command_executor))
        } else {
            return Err("Unsupported operating system".into());
        };

        Ok(source)
    }

    fn linux_source(&self, command_executor: Arc<dyn CommandExecutor>) -> LinuxMemoryTableSource {
        let source = LinuxMemoryTableSource::new(command_executor);
        if self.config.allow_sudo {
            source
        } else {
            source.without_sudo()
        }
    }

    /// Create the sink receiving decode diagnostics
    pub fn create_diagnostic_sink(&self) -> Arc<dyn DiagnosticSink> {
        Arc::new(LogDiagnosticSink::new())
    }

    /// Create the configuration provider
    ///
    /// Reads the TOML file at `config_path` when one is given and falls back
    /// to the defaults otherwise. This runs before any container exists, since
    /// the container is built from the loaded configuration.
    pub fn create_configuration_provider(
        config_path: Option<&Path>,
    ) -> Arc<dyn ConfigurationProvider> {
        match config_path {
            Some(path) => Arc::new(TomlConfigurationProvider::new(path)),
            None => Arc::new(SimpleConfigurationProvider::new(ProbeConfig::default())),
        }
    }

    /// Create the complete probe service
    pub fn create_probe_service(&self) -> Result<Arc<dyn HardwareProbeService>, Box<dyn Error>> {
        let memory_source = self.create_memory_source()?;
        let diagnostics = self.create_diagnostic_sink();

        Ok(Arc::new(InventoryCollectionService::new(
            memory_source,
            diagnostics,
        )))
    }

    /// Create the exporter writing dump files
    pub fn create_exporter(&self) -> FileInventoryExporter {
        FileInventoryExporter::new(Arc::new(FileSystemRepository::new()))
    }

    /// Get platform name for logging
    pub fn get_platform_name(&self) -> &'static str {
        if cfg!(target_os = "macos") {
            "macOS"
        } else if cfg!(target_os = "linux") {
            "Linux"
        } else {
            "Unknown"
        }
    }

    /// Validate that required system dependencies are available
    pub async fn validate_dependencies(&self) -> Result<Vec<String>, Box<dyn Error>> {
        let service = self.create_probe_service()?;
        let missing = service
            .validate_dependencies()
            .await
            .map_err(|e| format!("Failed to check dependencies: {}", e))?;
        Ok(missing)
    }

    /// Check if the system has required privileges
    pub async fn check_privileges(&self) -> Result<bool, Box<dyn Error>> {
        let service = self.create_probe_service()?;
        let has_privileges = service
            .check_privileges()
            .await
            .map_err(|e| format!("Failed to check privileges: {}", e))?;
        Ok(has_privileges)
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new(ContainerConfig::default())
    }
}

/// Builder pattern for container configuration
pub struct ContainerConfigBuilder {
    config: ContainerConfig,
}

impl ContainerConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            config: ContainerConfig::default(),
        }
    }

    /// Set command timeout
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self
    }

    /// Set retry count
    pub fn retry_count(mut self, count: u32) -> Self {
        self.config.retry_count = count;
        self
    }

    /// Allow or forbid sudo
    pub fn allow_sudo(mut self, allow: bool) -> Self {
        self.config.allow_sudo = allow;
        self
    }

    /// Decode a DMI table file instead of the live system
    pub fn dmi_table_path(mut self, path: Option<PathBuf>) -> Self {
        self.config.dmi_table_path = path;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ContainerConfig {
        self.config
    }
}

impl Default for ContainerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OutputFormat;

    #[test]
    fn test_container_creation() {
        let container = ServiceContainer::default();
        assert_eq!(
            container.get_platform_name(),
            if cfg!(target_os = "macos") {
                "macOS"
            } else if cfg!(target_os = "linux") {
                "Linux"
            } else {
                "Unknown"
            }
        );
    }

    #[test]
    fn test_config_builder() {
        let config = ContainerConfigBuilder::new()
            .command_timeout(Duration::from_secs(60))
            .retry_count(3)
            .allow_sudo(false)
            .dmi_table_path(Some(PathBuf::from("/tmp/DMI")))
            .build();

        assert_eq!(config.command_timeout, Duration::from_secs(60));
        assert_eq!(config.retry_count, 3);
        assert!(!config.allow_sudo);
        assert_eq!(config.dmi_table_path, Some(PathBuf::from("/tmp/DMI")));
    }

    #[test]
    fn test_config_from_probe_config() {
        let probe_config = ProbeConfig {
            skip_sudo: true,
            command_timeout: 5,
            retry_count: 0,
            ..Default::default()
        };

        let config = ContainerConfig::from(&probe_config);
        assert_eq!(config.command_timeout, Duration::from_secs(5));
        assert_eq!(config.retry_count, 0);
        assert!(!config.allow_sudo);
        assert_eq!(config.dmi_table_path, None);
    }

    #[test]
    fn test_explicit_table_selects_smbios_source() {
        let container = ServiceContainer::new(
            ContainerConfigBuilder::new()
                .dmi_table_path(Some(PathBuf::from("/tmp/DMI")))
                .build(),
        );
        assert!(container.create_memory_source().is_ok());
    }

    #[tokio::test]
    async fn test_simple_configuration_provider() {
        let provider = SimpleConfigurationProvider::new(ProbeConfig {
            verbose: true,
            ..Default::default()
        });

        let config = provider.get_probe_config().await.unwrap();
        assert!(config.verbose);
        assert_eq!(config.command_timeout, 30);
    }

    #[tokio::test]
    async fn test_configuration_provider_without_file_uses_defaults() {
        let provider = ServiceContainer::create_configuration_provider(None);
        let config = provider.get_probe_config().await.unwrap();

        assert_eq!(config.command_timeout, ProbeConfig::default().command_timeout);
        assert!(config.formats.is_empty());
    }

    #[tokio::test]
    async fn test_configuration_provider_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.toml");
        std::fs::write(&path, "skip_sudo = true\nformats = [\"json\"]\n").unwrap();

        let provider = ServiceContainer::create_configuration_provider(Some(path.as_path()));
        let config = provider.get_probe_config().await.unwrap();

        assert!(config.skip_sudo);
        assert_eq!(config.formats, vec![OutputFormat::Json]);
        assert!(!ContainerConfig::from(&config).allow_sudo);
    }

    #[test]
    fn test_complete_service_creation() {
        let container = ServiceContainer::default();
        let result = container.create_probe_service();

        // Should succeed on supported platforms
        if cfg!(target_os = "macos") || cfg!(target_os = "linux") {
            assert!(result.is_ok());
        }
    }
}
