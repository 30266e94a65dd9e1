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

use crate::domain::{HardwareInventory, ProbeError};
use async_trait::async_trait;

/// Primary port - Main interface offered by the hardware probe domain
///
/// This is what external systems (CLI, library consumers) use to interact
/// with the inventory functionality.
#[async_trait]
pub trait HardwareProbeService: Send + Sync {
    /// Collect the memory inventory of the current system
    ///
    /// Decode problems with individual modules never fail the call; they are
    /// reported as diagnostics and the affected modules are omitted or
    /// partially populated.
    ///
    /// # Returns
    /// * `Ok(HardwareInventory)` - Decoded modules and summary
    /// * `Err(ProbeError)` - Raw tables could not be read at all
    async fn collect_inventory(&self) -> Result<HardwareInventory, ProbeError>;

    /// Validate system dependencies and return missing requirements
    ///
    /// # Returns
    /// * `Ok(Vec<String>)` - List of missing dependencies (empty if all present)
    /// * `Err(ProbeError)` - Error occurred during validation
    async fn validate_dependencies(&self) -> Result<Vec<String>, ProbeError>;

    /// Check if the current user can read firmware tables without escalation
    ///
    /// # Returns
    /// * `Ok(bool)` - true if sufficient privileges, false otherwise
    /// * `Err(ProbeError)` - Error occurred during privilege check
    async fn check_privileges(&self) -> Result<bool, ProbeError>;
}
