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

//! File-based inventory export

use super::xml::{parse_inventory_xml, render_inventory_xml};
use crate::domain::{render_tree, ExportError, HardwareInventory, OutputFormat};
use crate::ports::InventoryRepository;
use async_trait::async_trait;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// Base name of every dump file
pub const DUMP_FILE_STEM: &str = "info_dump";

/// File system repository for storing inventory dumps
pub struct FileSystemRepository;

impl FileSystemRepository {
    /// Create a new file system repository
    pub fn new() -> Self {
        Self
    }

    async fn write(&self, path: &Path, contents: impl AsRef<[u8]>) -> Result<(), ExportError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ExportError::IoFailed(format!("Failed to create directory: {}", e)))?;
        }

        fs::write(path, contents).await.map_err(|e| {
            ExportError::IoFailed(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    async fn read(&self, path: &Path) -> Result<String, ExportError> {
        fs::read_to_string(path).await.map_err(|e| {
            ExportError::IoFailed(format!("Failed to read {}: {}", path.display(), e))
        })
    }

    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, ExportError> {
        fs::read(path).await.map_err(|e| {
            ExportError::IoFailed(format!("Failed to read {}: {}", path.display(), e))
        })
    }
}

impl Default for FileSystemRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Render an inventory as text, one tree per section
pub fn render_inventory_text(inventory: &HardwareInventory) -> Result<String, ExportError> {
    let summary = serde_json::to_value(&inventory.summary)
        .map_err(|e| ExportError::SerializationFailed(format!("Summary: {}", e)))?;
    let memory = serde_json::to_value(&inventory.memory)
        .map_err(|e| ExportError::SerializationFailed(format!("Memory: {}", e)))?;

    Ok(format!(
        "{}\n{}",
        render_tree("Summary", &summary),
        render_tree("Memory", &memory)
    ))
}

#[async_trait]
impl InventoryRepository for FileSystemRepository {
    async fn save_json(
        &self,
        inventory: &HardwareInventory,
        path: &Path,
    ) -> Result<(), ExportError> {
        let json_string = serde_json::to_string_pretty(inventory).map_err(|e| {
            ExportError::SerializationFailed(format!("JSON serialization failed: {}", e))
        })?;
        self.write(path, json_string).await
    }

    async fn save_toml(
        &self,
        inventory: &HardwareInventory,
        path: &Path,
    ) -> Result<(), ExportError> {
        let toml_string = toml::to_string_pretty(inventory).map_err(|e| {
            ExportError::SerializationFailed(format!("TOML serialization failed: {}", e))
        })?;
        self.write(path, toml_string).await
    }

    async fn save_txt(
        &self,
        inventory: &HardwareInventory,
        path: &Path,
    ) -> Result<(), ExportError> {
        let text = render_inventory_text(inventory)?;
        self.write(path, text).await
    }

    async fn save_xml(
        &self,
        inventory: &HardwareInventory,
        path: &Path,
    ) -> Result<(), ExportError> {
        let xml = render_inventory_xml(inventory)?;
        self.write(path, xml).await
    }

    async fn save_plist(
        &self,
        inventory: &HardwareInventory,
        path: &Path,
    ) -> Result<(), ExportError> {
        let mut plist_bytes = Vec::new();
        plist::to_writer_xml(&mut plist_bytes, inventory).map_err(|e| {
            ExportError::SerializationFailed(format!("Plist serialization failed: {}", e))
        })?;
        self.write(path, plist_bytes).await
    }

    async fn load_json(&self, path: &Path) -> Result<HardwareInventory, ExportError> {
        let json_string = self.read(path).await?;
        serde_json::from_str(&json_string).map_err(|e| {
            ExportError::SerializationFailed(format!("JSON deserialization failed: {}", e))
        })
    }

    async fn load_toml(&self, path: &Path) -> Result<HardwareInventory, ExportError> {
        let toml_string = self.read(path).await?;
        toml::from_str(&toml_string).map_err(|e| {
            ExportError::SerializationFailed(format!("TOML deserialization failed: {}", e))
        })
    }

    async fn load_xml(&self, path: &Path) -> Result<HardwareInventory, ExportError> {
        let xml = self.read(path).await?;
        parse_inventory_xml(&xml)
    }

    async fn load_plist(&self, path: &Path) -> Result<HardwareInventory, ExportError> {
        let plist_bytes = self.read_bytes(path).await?;
        plist::from_bytes(&plist_bytes).map_err(|e| {
            ExportError::SerializationFailed(format!("Plist deserialization failed: {}", e))
        })
    }

    async fn file_exists(&self, path: &Path) -> Result<bool, ExportError> {
        fs::try_exists(path)
            .await
            .map_err(|e| ExportError::IoFailed(e.to_string()))
    }
}

/// Writes an inventory to `info_dump.<ext>` files in a directory
pub struct FileInventoryExporter {
    repository: Arc<dyn InventoryRepository>,
}

impl FileInventoryExporter {
    /// Create a new exporter on top of a repository
    pub fn new(repository: Arc<dyn InventoryRepository>) -> Self {
        Self { repository }
    }

    /// Path of the dump file for `format` inside `dir`
    pub fn dump_path(dir: &Path, format: OutputFormat) -> PathBuf {
        dir.join(format!("{}.{}", DUMP_FILE_STEM, format.extension()))
    }

    /// Save an inventory in each of the requested formats
    ///
    /// # Arguments
    /// * `inventory` - The inventory to save
    /// * `dir` - Directory receiving the dumps, created if needed
    /// * `formats` - Formats to write; duplicates are written once
    ///
    /// # Returns
    /// * `Ok(Vec<PathBuf>)` - Paths of the written files, in request order
    /// * `Err(ExportError)` - First failure; earlier files stay written
    pub async fn save_formats(
        &self,
        inventory: &HardwareInventory,
        dir: &Path,
        formats: &[OutputFormat],
    ) -> Result<Vec<PathBuf>, ExportError> {
        let mut written = Vec::new();

        for &format in formats {
            let path = Self::dump_path(dir, format);
            if written.contains(&path) {
                continue;
            }

            match format {
                OutputFormat::Json => self.repository.save_json(inventory, &path).await?,
                OutputFormat::Toml => self.repository.save_toml(inventory, &path).await?,
                OutputFormat::Text => self.repository.save_txt(inventory, &path).await?,
                OutputFormat::Xml => self.repository.save_xml(inventory, &path).await?,
                OutputFormat::Plist => self.repository.save_plist(inventory, &path).await?,
            }
            info!("Saved {} dump to {}", format, path.display());
            written.push(path);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        MemoryModuleDetails, MemoryModuleRecord, MemorySlot, MemorySource, MemorySummary,
    };
    use tempfile::tempdir;

    fn create_test_inventory() -> HardwareInventory {
        let module = |part: &str, bank: &str| {
            MemoryModuleRecord::new(
                part,
                MemoryModuleDetails {
                    memory_type: "DDR4".to_string(),
                    slot: Some(MemorySlot {
                        bank: bank.to_string(),
                        channel: "DIMM0".to_string(),
                    }),
                    manufacturer: "Samsung".to_string(),
                    capacity: "8192MB".to_string(),
                    speed: None,
                },
            )
        };

        HardwareInventory {
            summary: MemorySummary {
                source: MemorySource::Smbios,
                module_count: 2,
                memory_type: "DDR4".to_string(),
                installed_capacity: "16.0 GB".to_string(),
                reported_total: "15.6 GB".to_string(),
            },
            memory: vec![module("PN-A", "BANK 0"), module("PN-B", "BANK 1")],
        }
    }

    #[tokio::test]
    async fn test_json_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("info_dump.json");
        let repository = FileSystemRepository::new();
        let inventory = create_test_inventory();

        repository.save_json(&inventory, &path).await.unwrap();
        assert!(repository.file_exists(&path).await.unwrap());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"PN-A (Part-Number)\""));
        assert!(contents.contains("\"Source\": \"SMBIOS\""));

        assert_eq!(repository.load_json(&path).await.unwrap(), inventory);
    }

    #[tokio::test]
    async fn test_toml_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("info_dump.toml");
        let repository = FileSystemRepository::new();
        let inventory = create_test_inventory();

        repository.save_toml(&inventory, &path).await.unwrap();
        assert_eq!(repository.load_toml(&path).await.unwrap(), inventory);
    }

    #[tokio::test]
    async fn test_xml_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("info_dump.xml");
        let repository = FileSystemRepository::new();
        let inventory = create_test_inventory();

        repository.save_xml(&inventory, &path).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("<Module PartNumber=\"PN-B\">"));
        assert_eq!(repository.load_xml(&path).await.unwrap(), inventory);
    }

    #[tokio::test]
    async fn test_plist_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("info_dump.plist");
        let repository = FileSystemRepository::new();
        let inventory = create_test_inventory();

        repository.save_plist(&inventory, &path).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("<plist"));
        assert!(contents.contains("<key>PN-A (Part-Number)</key>"));
        assert_eq!(repository.load_plist(&path).await.unwrap(), inventory);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let repository = FileSystemRepository::new();
        let path = dir.path().join("absent.json");

        assert!(!repository.file_exists(&path).await.unwrap());
        assert!(matches!(
            repository.load_json(&path).await,
            Err(ExportError::IoFailed(_))
        ));
    }

    #[test]
    fn test_render_inventory_text() {
        let text = render_inventory_text(&create_test_inventory()).unwrap();

        assert!(text.starts_with("─ Summary\n"));
        assert!(text.contains("\n─ Memory\n  ├── PN-A (Part-Number)\n"));
        assert!(text.contains("  └── PN-B (Part-Number)\n"));
        assert!(text.contains("  ├── Source: SMBIOS\n  ├── Modules: 2\n"));
        assert!(text.contains("  │   ├── Manufacturer: Samsung\n  │   └── Capacity: 8192MB\n"));
    }

    #[tokio::test]
    async fn test_save_formats() {
        let dir = tempdir().unwrap();
        let exporter = FileInventoryExporter::new(Arc::new(FileSystemRepository::new()));

        let written = exporter
            .save_formats(
                &create_test_inventory(),
                dir.path(),
                &[OutputFormat::Text, OutputFormat::Json, OutputFormat::Text],
            )
            .await
            .unwrap();

        assert_eq!(
            written,
            vec![
                dir.path().join("info_dump.txt"),
                dir.path().join("info_dump.json")
            ]
        );
        assert!(written.iter().all(|path| path.exists()));
    }
}
