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

//! XML document layout of an inventory
//!
//! Record keys such as `M471A1K43DB1-CWE (Part-Number)` are not valid element
//! names, so each module becomes a `<Module PartNumber="...">` element instead
//! of being keyed by its part number:
//!
//! ```xml
//! <Inventory>
//!   <Summary>
//!     <Source>SMBIOS</Source>
//!     ...
//!   </Summary>
//!   <Memory>
//!     <Module PartNumber="M471A1K43DB1-CWE">
//!       <Type>DDR4</Type>
//!       ...
//!     </Module>
//!   </Memory>
//! </Inventory>
//! ```

use crate::domain::{
    ExportError, HardwareInventory, MemoryModuleDetails, MemoryModuleRecord, MemorySlot,
    MemorySummary,
};
use quick_xml::se::Serializer;
use serde::{Deserialize, Serialize};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const ROOT_ELEMENT: &str = "Inventory";

#[derive(Debug, Serialize, Deserialize)]
struct XmlInventory {
    #[serde(rename = "Summary")]
    summary: XmlSummary,
    #[serde(rename = "Memory")]
    memory: XmlMemory,
}

#[derive(Debug, Serialize, Deserialize)]
struct XmlSummary {
    #[serde(rename = "Source")]
    source: String,
    #[serde(rename = "Modules")]
    module_count: usize,
    #[serde(rename = "Type")]
    memory_type: String,
    #[serde(rename = "Installed")]
    installed_capacity: String,
    #[serde(rename = "Reported")]
    reported_total: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct XmlMemory {
    #[serde(rename = "Module", default)]
    modules: Vec<XmlModule>,
}

#[derive(Debug, Serialize, Deserialize)]
struct XmlModule {
    #[serde(rename = "@PartNumber")]
    part_number: String,
    #[serde(rename = "Type")]
    memory_type: String,
    #[serde(rename = "Slot", default, skip_serializing_if = "Option::is_none")]
    slot: Option<MemorySlot>,
    #[serde(rename = "Manufacturer")]
    manufacturer: String,
    #[serde(rename = "Capacity")]
    capacity: String,
    #[serde(rename = "Speed", default, skip_serializing_if = "Option::is_none")]
    speed: Option<String>,
}

impl From<&HardwareInventory> for XmlInventory {
    fn from(inventory: &HardwareInventory) -> Self {
        let summary = &inventory.summary;
        Self {
            summary: XmlSummary {
                source: summary.source.to_string(),
                module_count: summary.module_count,
                memory_type: summary.memory_type.clone(),
                installed_capacity: summary.installed_capacity.clone(),
                reported_total: summary.reported_total.clone(),
            },
            memory: XmlMemory {
                modules: inventory
                    .memory
                    .iter()
                    .map(|record| XmlModule {
                        part_number: record.part_number.clone(),
                        memory_type: record.details.memory_type.clone(),
                        slot: record.details.slot.clone(),
                        manufacturer: record.details.manufacturer.clone(),
                        capacity: record.details.capacity.clone(),
                        speed: record.details.speed.clone(),
                    })
                    .collect(),
            },
        }
    }
}

impl TryFrom<XmlInventory> for HardwareInventory {
    type Error = String;

    fn try_from(document: XmlInventory) -> Result<Self, Self::Error> {
        let summary = document.summary;
        Ok(Self {
            summary: MemorySummary {
                source: summary.source.parse()?,
                module_count: summary.module_count,
                memory_type: summary.memory_type,
                installed_capacity: summary.installed_capacity,
                reported_total: summary.reported_total,
            },
            memory: document
                .memory
                .modules
                .into_iter()
                .map(|module| {
                    MemoryModuleRecord::new(
                        module.part_number,
                        MemoryModuleDetails {
                            memory_type: module.memory_type,
                            slot: module.slot,
                            manufacturer: module.manufacturer,
                            capacity: module.capacity,
                            speed: module.speed,
                        },
                    )
                })
                .collect(),
        })
    }
}

fn xml_error(stage: &str, err: impl std::fmt::Display) -> ExportError {
    ExportError::SerializationFailed(format!("XML {} failed: {}", stage, err))
}

/// Render an inventory as an indented XML document
pub fn render_inventory_xml(inventory: &HardwareInventory) -> Result<String, ExportError> {
    let mut xml = String::from(XML_DECLARATION);
    let mut serializer = Serializer::with_root(&mut xml, Some(ROOT_ELEMENT))
        .map_err(|e| xml_error("serialization", e))?;
    serializer.indent(' ', 2);
    XmlInventory::from(inventory)
        .serialize(serializer)
        .map_err(|e| xml_error("serialization", e))?;

    xml.push('\n');
    Ok(xml)
}

/// Parse an inventory from an XML document written by [`render_inventory_xml`]
pub fn parse_inventory_xml(xml: &str) -> Result<HardwareInventory, ExportError> {
    let document: XmlInventory =
        quick_xml::de::from_str(xml).map_err(|e| xml_error("deserialization", e))?;

    HardwareInventory::try_from(document).map_err(|e| xml_error("deserialization", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MemorySource;

    fn inventory() -> HardwareInventory {
        HardwareInventory {
            summary: MemorySummary {
                source: MemorySource::DeviceTree,
                module_count: 2,
                memory_type: "LPDDR4".to_string(),
                installed_capacity: "8.0 GB".to_string(),
                reported_total: "8.0 GB".to_string(),
            },
            memory: vec![
                MemoryModuleRecord::new(
                    "PN-A",
                    MemoryModuleDetails {
                        memory_type: "LPDDR4".to_string(),
                        slot: Some(MemorySlot {
                            bank: "BANK 0".to_string(),
                            channel: "DIMM0".to_string(),
                        }),
                        manufacturer: "Hynix".to_string(),
                        capacity: "4096MB".to_string(),
                        speed: Some("4267 MHz".to_string()),
                    },
                ),
                MemoryModuleRecord::new(
                    "PN-B",
                    MemoryModuleDetails {
                        memory_type: "LPDDR4".to_string(),
                        slot: None,
                        manufacturer: "Hynix".to_string(),
                        capacity: "4096MB".to_string(),
                        speed: None,
                    },
                ),
            ],
        }
    }

    #[test]
    fn test_xml_layout() {
        let xml = render_inventory_xml(&inventory()).unwrap();

        assert!(xml.starts_with(XML_DECLARATION));
        assert!(xml.contains("<Inventory>"));
        assert!(xml.contains("<Source>Device Tree</Source>"));
        assert!(xml.contains("<Module PartNumber=\"PN-A\">"));
        assert!(xml.contains("<Bank>BANK 0</Bank>"));
        assert!(xml.contains("<Speed>4267 MHz</Speed>"));
        assert!(!xml.contains("(Part-Number)"));
    }

    #[test]
    fn test_xml_round_trip() {
        let inventory = inventory();
        let xml = render_inventory_xml(&inventory).unwrap();

        assert_eq!(parse_inventory_xml(&xml).unwrap(), inventory);
    }

    #[test]
    fn test_xml_empty_memory_round_trip() {
        let mut inventory = inventory();
        inventory.memory.clear();
        inventory.summary.module_count = 0;
        let xml = render_inventory_xml(&inventory).unwrap();

        assert_eq!(parse_inventory_xml(&xml).unwrap(), inventory);
    }

    #[test]
    fn test_xml_unknown_source_rejected() {
        let xml = render_inventory_xml(&inventory())
            .unwrap()
            .replace("Device Tree", "ACPI");

        assert!(matches!(
            parse_inventory_xml(&xml),
            Err(ExportError::SerializationFailed(_))
        ));
    }
}
