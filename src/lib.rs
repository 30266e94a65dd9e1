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

//! Hardware Probe Library
//!
//! This library decodes the installed memory modules of a machine from its
//! firmware tables, using a Ports and Adapters (Hexagonal) architecture for
//! maintainability and testability.
//!
//! Two table formats are understood:
//!
//! - **SMBIOS**: Memory Device (Type 17) structures, read on Linux from
//!   `/sys/firmware/dmi/tables/DMI`
//! - **Device tree**: the parallel property blobs of the `IODeviceTree`
//!   memory node, read on macOS through `ioreg`
//!
//! Malformed modules never fail a probe. Each field that cannot be decoded is
//! reported to a [`DiagnosticSink`] and the module is then kept with a
//! fallback, kept without the field, or left out.
//!
//! # Architecture
//!
//! - **Domain**: Entities, pure decoders and services
//! - **Ports**: Interfaces for external interactions
//! - **Adapters**: Platform-specific implementations
//!
//! # Usage
//!
//! ```rust,no_run
//! use hardware_probe::{create_service, HardwareProbeService};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = create_service()?;
//!     let inventory = service.collect_inventory().await?;
//!
//!     for module in &inventory.memory {
//!         println!("{}: {}", module.key(), module.details.capacity);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The decoders can also be used directly on raw structures:
//!
//! ```rust
//! use hardware_probe::adapters::LogDiagnosticSink;
//! use hardware_probe::domain::{assemble, is_memory_device, split_smbios_table};
//!
//! // A table holding only the end-of-table structure
//! let table = [127, 4, 0, 0, 0, 0];
//! let devices: Vec<_> = split_smbios_table(&table)
//!     .into_iter()
//!     .filter(is_memory_device)
//!     .collect();
//! assert!(assemble(&devices, &LogDiagnosticSink::new()).is_empty());
//! ```

pub mod adapters;
pub mod container;
pub mod domain;
pub mod ports;

pub use adapters::{
    FileInventoryExporter, FileSystemRepository, LinuxMemoryTableSource, LogDiagnosticSink,
    MacOsMemoryTableSource, TomlConfigurationProvider, UnixCommandExecutor,
};
pub use container::{ContainerConfig, ContainerConfigBuilder, ServiceContainer};
pub use domain::{
    assemble, assemble_from_device_tree, render_tree, DecodeContext, DecodeError,
    HardwareInventory, MemoryModuleDetails, MemoryModuleRecord, MemorySlot, MemorySource,
    MemorySummary, OutputFormat, ProbeConfig, ProbeError, RawMemoryTables, RawTableEntry,
};
pub use ports::{
    CommandExecutor, ConfigurationProvider, DiagnosticSink, HardwareProbeService,
    InventoryRepository, MemoryTableSource,
};

use std::error::Error;
use std::sync::Arc;

/// Create a probe service with platform-appropriate adapters
///
/// # Returns
/// * `Ok(Arc<dyn HardwareProbeService>)` - Configured service ready to use
/// * `Err(Box<dyn Error>)` - The platform has no memory table source
pub fn create_service() -> Result<Arc<dyn HardwareProbeService>, Box<dyn Error>> {
    ServiceContainer::default().create_probe_service()
}

/// Create a probe service from a probe configuration
///
/// # Arguments
/// * `config` - Timeouts, sudo policy and optional DMI table path
pub fn create_service_with_config(
    config: &ProbeConfig,
) -> Result<Arc<dyn HardwareProbeService>, Box<dyn Error>> {
    ServiceContainer::new(ContainerConfig::from(config)).create_probe_service()
}

/// Validate system dependencies and privileges
///
/// # Returns
/// * `Ok((missing_deps, has_privileges))` - Missing dependencies and privilege status
/// * `Err(Box<dyn Error>)` - Error occurred during validation
pub async fn validate_system() -> Result<(Vec<String>, bool), Box<dyn Error>> {
    let container = ServiceContainer::default();
    let missing_deps = container.validate_dependencies().await?;
    let has_privileges = container.check_privileges().await?;
    Ok((missing_deps, has_privileges))
}
