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

use super::memory_decoding::{assemble, assemble_from_device_tree};
use crate::domain::parsers::{
    bytes_to_human_readable, calculate_total_memory_from_modules, determine_memory_type,
    is_memory_device,
};
use crate::domain::{HardwareInventory, MemorySummary, ProbeError, RawMemoryTables};
use crate::ports::{DiagnosticSink, HardwareProbeService, MemoryTableSource};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;

/// Domain service that implements memory inventory collection
///
/// This service reads raw memory tables from a platform-specific source,
/// decodes them into module records and summarizes the result.
pub struct InventoryCollectionService {
    /// Raw memory table source (platform-specific)
    memory_source: Arc<dyn MemoryTableSource>,
    /// Receives recovered decode failures
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl InventoryCollectionService {
    /// Create a new inventory collection service
    ///
    /// # Arguments
    /// * `memory_source` - Platform-specific raw memory table source
    /// * `diagnostics` - Sink for per-module decode failures
    pub fn new(
        memory_source: Arc<dyn MemoryTableSource>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            memory_source,
            diagnostics,
        }
    }
}

#[async_trait]
impl HardwareProbeService for InventoryCollectionService {
    async fn collect_inventory(&self) -> Result<HardwareInventory, ProbeError> {
        // Read tables and the OS total concurrently
        let (tables_result, total_result) = tokio::join!(
            self.memory_source.read_memory_tables(),
            self.memory_source.total_physical_memory(),
        );

        let tables = tables_result.map_err(|e| {
            ProbeError::CollectionFailed(format!("Memory table read failed: {}", e))
        })?;
        let source = tables.source();

        let memory = match &tables {
            RawMemoryTables::Smbios(entries) => {
                let devices: Vec<_> = entries
                    .iter()
                    .filter(|entry| is_memory_device(entry))
                    .cloned()
                    .collect();
                debug!("Decoding {} memory device structure(s)", devices.len());
                assemble(&devices, self.diagnostics.as_ref())
            }
            RawMemoryTables::DeviceTree(properties) => {
                debug!("Decoding device tree memory node ({} properties)", properties.len());
                assemble_from_device_tree(properties, self.diagnostics.as_ref())
            }
        };

        let reported_total = match total_result {
            Ok(bytes) if bytes > 0 => bytes_to_human_readable(bytes),
            Ok(_) => "Unknown".to_string(),
            Err(e) => {
                warn!("Physical memory query failed: {}", e);
                "Unknown".to_string()
            }
        };

        let summary = MemorySummary {
            source,
            module_count: memory.len(),
            memory_type: determine_memory_type(&memory),
            installed_capacity: calculate_total_memory_from_modules(&memory),
            reported_total,
        };
        info!(
            "Decoded {} memory module(s) from {}",
            summary.module_count, summary.source
        );

        Ok(HardwareInventory { summary, memory })
    }

    async fn validate_dependencies(&self) -> Result<Vec<String>, ProbeError> {
        self.memory_source
            .get_missing_dependencies()
            .await
            .map_err(|e| {
                ProbeError::CollectionFailed(format!("Dependency validation failed: {}", e))
            })
    }

    async fn check_privileges(&self) -> Result<bool, ProbeError> {
        self.memory_source
            .has_required_privileges()
            .await
            .map_err(|e| ProbeError::CollectionFailed(format!("Privilege check failed: {}", e)))
    }
}
