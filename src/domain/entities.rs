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

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Suffix appended to the part number to form a record's key
///
/// Tree rendering and every dump format key memory records by this string.
pub const PART_NUMBER_SUFFIX: &str = " (Part-Number)";

/// One raw SMBIOS structure: header, formatted area and trailing string table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTableEntry(Vec<u8>);

impl RawTableEntry {
    /// Wrap a byte buffer holding a single structure
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw bytes of the structure
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// SMBIOS structure type (byte 0), if the buffer is not empty
    pub fn structure_type(&self) -> Option<u8> {
        self.0.first().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for RawTableEntry {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for RawTableEntry {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Properties of a device-tree memory node, keyed by property name
pub type DeviceTreeProperties = BTreeMap<String, Vec<u8>>;

/// Raw memory description handed over by a platform collector
#[derive(Debug, Clone, PartialEq)]
pub enum RawMemoryTables {
    /// SMBIOS structures in table order; only Type 17 ones are decoded
    Smbios(Vec<RawTableEntry>),
    /// Parallel property blobs of the device-tree memory node
    DeviceTree(DeviceTreeProperties),
}

impl RawMemoryTables {
    /// Where these tables came from
    pub fn source(&self) -> MemorySource {
        match self {
            RawMemoryTables::Smbios(_) => MemorySource::Smbios,
            RawMemoryTables::DeviceTree(_) => MemorySource::DeviceTree,
        }
    }
}

/// Firmware table format a memory inventory was decoded from
///
/// Serialized as its display name in every dump format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum MemorySource {
    Smbios,
    DeviceTree,
}

impl fmt::Display for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemorySource::Smbios => write!(f, "SMBIOS"),
            MemorySource::DeviceTree => write!(f, "Device Tree"),
        }
    }
}

impl FromStr for MemorySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SMBIOS" => Ok(MemorySource::Smbios),
            "Device Tree" => Ok(MemorySource::DeviceTree),
            _ => Err(format!("Unknown memory source '{s}'")),
        }
    }
}

impl From<MemorySource> for String {
    fn from(source: MemorySource) -> Self {
        source.to_string()
    }
}

impl TryFrom<String> for MemorySource {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Field of a memory module record, used to attribute decode diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleField {
    PartNumber,
    MemoryType,
    Slot,
    Manufacturer,
    Capacity,
    Speed,
}

impl fmt::Display for ModuleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModuleField::PartNumber => "part number",
            ModuleField::MemoryType => "memory type",
            ModuleField::Slot => "slot",
            ModuleField::Manufacturer => "manufacturer",
            ModuleField::Capacity => "capacity",
            ModuleField::Speed => "speed",
        };
        f.write_str(name)
    }
}

/// Identifies the module and field a diagnostic refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeContext {
    /// Table format being decoded
    pub source: MemorySource,
    /// Zero-based index of the module in discovery order
    pub module_index: usize,
    /// Field that failed to decode
    pub field: ModuleField,
}

impl DecodeContext {
    pub fn new(source: MemorySource, module_index: usize, field: ModuleField) -> Self {
        Self {
            source,
            module_index,
            field,
        }
    }
}

impl fmt::Display for DecodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} module {}, {}",
            self.source, self.module_index, self.field
        )
    }
}

/// Physical slot of a memory module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySlot {
    #[serde(rename = "Bank")]
    pub bank: String,
    #[serde(rename = "Channel")]
    pub channel: String,
}

/// Decoded attributes of one memory module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryModuleDetails {
    /// Memory technology (e.g. DDR4), or UNKNOWN
    #[serde(rename = "Type")]
    pub memory_type: String,
    /// Absent when the bank or channel could not be resolved
    #[serde(rename = "Slot", default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<MemorySlot>,
    #[serde(rename = "Manufacturer")]
    pub manufacturer: String,
    /// Size with unit suffix (e.g. 8192MB), or UNKNOWN SIZE
    #[serde(rename = "Capacity")]
    pub capacity: String,
    /// Only reported by device-tree sources
    #[serde(rename = "Speed", default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
}

/// One decoded physical memory module
///
/// Serializes as a single-entry map `{"<part number> (Part-Number)": details}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, MemoryModuleDetails>",
    into = "BTreeMap<String, MemoryModuleDetails>"
)]
pub struct MemoryModuleRecord {
    pub part_number: String,
    pub details: MemoryModuleDetails,
}

impl MemoryModuleRecord {
    pub fn new(part_number: impl Into<String>, details: MemoryModuleDetails) -> Self {
        Self {
            part_number: part_number.into(),
            details,
        }
    }

    /// Key under which this record appears in rendered and exported output
    pub fn key(&self) -> String {
        format!("{}{}", self.part_number, PART_NUMBER_SUFFIX)
    }
}

impl From<MemoryModuleRecord> for BTreeMap<String, MemoryModuleDetails> {
    fn from(record: MemoryModuleRecord) -> Self {
        let mut map = BTreeMap::new();
        map.insert(record.key(), record.details);
        map
    }
}

impl TryFrom<BTreeMap<String, MemoryModuleDetails>> for MemoryModuleRecord {
    type Error = String;

    fn try_from(map: BTreeMap<String, MemoryModuleDetails>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(format!(
                "memory record must have exactly one key, found {}",
                map.len()
            ));
        }

        let (key, details) = map
            .into_iter()
            .next()
            .ok_or_else(|| "memory record is empty".to_string())?;

        let part_number = key
            .strip_suffix(PART_NUMBER_SUFFIX)
            .ok_or_else(|| format!("memory record key '{key}' lacks '{PART_NUMBER_SUFFIX}'"))?;

        Ok(Self::new(part_number, details))
    }
}

/// Aggregate view of the decoded memory modules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySummary {
    #[serde(rename = "Source")]
    pub source: MemorySource,
    #[serde(rename = "Modules")]
    pub module_count: usize,
    /// Common memory type, or "Mixed"
    #[serde(rename = "Type")]
    pub memory_type: String,
    /// Sum of decoded module capacities
    #[serde(rename = "Installed")]
    pub installed_capacity: String,
    /// Physical memory as reported by the operating system
    #[serde(rename = "Reported")]
    pub reported_total: String,
}

/// Root aggregate produced by a probe run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareInventory {
    #[serde(rename = "Summary")]
    pub summary: MemorySummary,
    #[serde(rename = "Memory")]
    pub memory: Vec<MemoryModuleRecord>,
}

/// Dump file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format
    Json,
    /// TOML format
    Toml,
    /// Plain-text tree
    #[serde(alias = "txt")]
    Text,
    /// XML document
    Xml,
    /// Property list, XML encoding
    Plist,
}

impl OutputFormat {
    /// File extension used for dumps in this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Toml => "toml",
            OutputFormat::Text => "txt",
            OutputFormat::Xml => "xml",
            OutputFormat::Plist => "plist",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "toml" => Ok(OutputFormat::Toml),
            "txt" | "text" => Ok(OutputFormat::Text),
            "xml" => Ok(OutputFormat::Xml),
            "plist" => Ok(OutputFormat::Plist),
            _ => Err(format!(
                "Output format must be one of 'json', 'toml', 'txt', 'xml' or 'plist', got '{s}'"
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "JSON"),
            OutputFormat::Toml => write!(f, "TOML"),
            OutputFormat::Text => write!(f, "TXT"),
            OutputFormat::Xml => write!(f, "XML"),
            OutputFormat::Plist => write!(f, "Plist"),
        }
    }
}

/// Configuration for a probe run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Never escalate privileges when reading firmware tables
    pub skip_sudo: bool,
    /// Timeout for external commands in seconds
    pub command_timeout: u64,
    /// Retry attempts for failed commands
    pub retry_count: u32,
    /// Enable verbose output
    pub verbose: bool,
    /// Read the DMI table from this file instead of the sysfs default
    pub dmi_table_path: Option<PathBuf>,
    /// Dump formats to write
    pub formats: Vec<OutputFormat>,
    /// Directory receiving dump files
    pub output_dir: Option<PathBuf>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            skip_sudo: false,
            command_timeout: 30,
            retry_count: 2,
            verbose: false,
            dmi_table_path: None,
            formats: Vec::new(),
            output_dir: None,
        }
    }
}
