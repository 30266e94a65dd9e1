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

use crate::domain::{ExportError, HardwareInventory};
use async_trait::async_trait;
use std::path::Path;

/// Secondary port - Inventory repository abstraction
///
/// This interface abstracts file-based storage of inventory dumps
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Save inventory to a file in JSON format
    ///
    /// # Arguments
    /// * `inventory` - The inventory to save
    /// * `path` - File path to save to
    ///
    /// # Returns
    /// * `Ok(())` - Inventory successfully saved
    /// * `Err(ExportError)` - Error occurred during save
    async fn save_json(&self, inventory: &HardwareInventory, path: &Path)
        -> Result<(), ExportError>;

    /// Save inventory to a file in TOML format
    async fn save_toml(&self, inventory: &HardwareInventory, path: &Path)
        -> Result<(), ExportError>;

    /// Save inventory to a file as a plain-text tree
    async fn save_txt(&self, inventory: &HardwareInventory, path: &Path)
        -> Result<(), ExportError>;

    /// Save inventory to a file as an XML document
    async fn save_xml(&self, inventory: &HardwareInventory, path: &Path)
        -> Result<(), ExportError>;

    /// Save inventory to a file as an XML property list
    async fn save_plist(
        &self,
        inventory: &HardwareInventory,
        path: &Path,
    ) -> Result<(), ExportError>;

    /// Load inventory from a JSON file
    ///
    /// # Arguments
    /// * `path` - File path to load from
    ///
    /// # Returns
    /// * `Ok(HardwareInventory)` - Loaded inventory
    /// * `Err(ExportError)` - Error occurred during load
    async fn load_json(&self, path: &Path) -> Result<HardwareInventory, ExportError>;

    /// Load inventory from a TOML file
    async fn load_toml(&self, path: &Path) -> Result<HardwareInventory, ExportError>;

    /// Load inventory from an XML document
    async fn load_xml(&self, path: &Path) -> Result<HardwareInventory, ExportError>;

    /// Load inventory from a property list
    async fn load_plist(&self, path: &Path) -> Result<HardwareInventory, ExportError>;

    /// Check if file exists
    async fn file_exists(&self, path: &Path) -> Result<bool, ExportError>;
}
