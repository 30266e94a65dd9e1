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

use crate::domain::{RawMemoryTables, SystemError};
use async_trait::async_trait;

/// Secondary port - Raw memory table source
///
/// This interface abstracts platform-specific acquisition of firmware memory
/// tables. Adapters hand back fully materialized buffers; all decoding
/// happens in the domain.
#[async_trait]
pub trait MemoryTableSource: Send + Sync {
    /// Read the raw memory-device tables
    ///
    /// # Returns
    /// * `Ok(RawMemoryTables)` - SMBIOS Type 17 structures or device-tree properties
    /// * `Err(SystemError)` - Tables could not be read
    async fn read_memory_tables(&self) -> Result<RawMemoryTables, SystemError>;

    /// Physical memory size reported by the operating system, in bytes
    async fn total_physical_memory(&self) -> Result<u64, SystemError>;

    /// Check if running with sufficient privileges to read the tables directly
    async fn has_required_privileges(&self) -> Result<bool, SystemError>;

    /// Get list of missing system dependencies
    ///
    /// # Returns
    /// * `Ok(Vec<String>)` - List of missing commands/tools
    /// * `Err(SystemError)` - Error checking dependencies
    async fn get_missing_dependencies(&self) -> Result<Vec<String>, SystemError>;
}
