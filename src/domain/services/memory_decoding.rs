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

//! Assembly of memory module records from raw firmware data
//!
//! Both entry points decode each module field by field in a fixed order and
//! never fail. A field that cannot be decoded is reported to the
//! [`DiagnosticSink`] and then, depending on the field, replaced by a
//! fallback, left out, or causes the whole module to be dropped:
//!
//! | field        | on failure            |
//! |--------------|-----------------------|
//! | part number  | module skipped        |
//! | type         | `UNKNOWN`             |
//! | slot         | `Slot` omitted        |
//! | manufacturer | module dropped        |
//! | capacity     | module dropped        |
//! | speed        | `Speed` omitted       |

use crate::domain::parsers::device_tree::{
    decode_reg_capacity, module_entry, split_slot_name, string_property,
    DIMM_MANUFACTURER_PROPERTY, DIMM_SPEEDS_PROPERTY, DIMM_TYPES_PROPERTY,
    PART_NUMBER_PROPERTY, REG_PROPERTY, SLOT_NAMES_PROPERTY,
};
use crate::domain::parsers::smbios::{
    decode_capacity, formatted_area, lookup_memory_type, offsets, parse_string_table, read_u8,
    resolve_string, resolve_string_at, UNKNOWN_TYPE,
};
use crate::domain::{
    DecodeContext, DecodeError, DeviceTreeProperties, MemoryModuleDetails, MemoryModuleRecord,
    MemorySlot, MemorySource, ModuleField, RawTableEntry,
};
use crate::ports::DiagnosticSink;
use log::debug;

/// Decode SMBIOS Memory Device structures into module records
///
/// Every entry must already be a Type 17 structure (see
/// [`is_memory_device`](crate::domain::parsers::smbios::is_memory_device));
/// the type byte is not checked again here.
///
/// # Arguments
/// * `entries` - Type 17 structures in table order
/// * `sink` - Receives one diagnostic per recovered field failure
///
/// # Returns
/// * Records for the modules that decoded, in input order
pub fn assemble(entries: &[RawTableEntry], sink: &dyn DiagnosticSink) -> Vec<MemoryModuleRecord> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(module, entry)| SmbiosModule::new(entry, module, sink).decode())
        .collect()
}

/// Decode the memory node of a device tree into module records
///
/// The `part-number` property fixes the module count; entry `i` of every
/// other property belongs to module `i`. A property that is short of
/// entries only affects the modules it has no entry for.
///
/// # Arguments
/// * `properties` - Properties of the memory node
/// * `sink` - Receives one diagnostic per recovered field failure
///
/// # Returns
/// * Records for the modules that decoded, in part-number order
pub fn assemble_from_device_tree(
    properties: &DeviceTreeProperties,
    sink: &dyn DiagnosticSink,
) -> Vec<MemoryModuleRecord> {
    let part_numbers = match string_property(properties, PART_NUMBER_PROPERTY) {
        Ok(part_numbers) => part_numbers,
        Err(err) => {
            let context = DecodeContext::new(MemorySource::DeviceTree, 0, ModuleField::PartNumber);
            sink.warn(&format!("no memory modules decoded: {err}"), &context);
            return Vec::new();
        }
    };

    let node = DeviceTreeNode {
        types: string_property(properties, DIMM_TYPES_PROPERTY),
        slots: string_property(properties, SLOT_NAMES_PROPERTY),
        manufacturers: string_property(properties, DIMM_MANUFACTURER_PROPERTY),
        speeds: string_property(properties, DIMM_SPEEDS_PROPERTY),
        reg: properties
            .get(REG_PROPERTY)
            .map(Vec::as_slice)
            .ok_or_else(|| DecodeError::MissingProperty(REG_PROPERTY.to_string())),
    };

    part_numbers
        .into_iter()
        .enumerate()
        .filter_map(|(module, part_number)| node.decode(module, part_number, sink))
        .collect()
}

/// Report a failed field, keeping the value when there is one
fn recover<T>(
    result: Result<T, DecodeError>,
    sink: &dyn DiagnosticSink,
    context: DecodeContext,
    outcome: &str,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            sink.warn(&format!("{err}; {outcome}"), &context);
            None
        }
    }
}

/// One Type 17 structure being decoded
struct SmbiosModule<'a> {
    /// Formatted area only; the string table is split off into `strings`
    raw: &'a [u8],
    strings: Vec<&'a [u8]>,
    module: usize,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> SmbiosModule<'a> {
    fn new(entry: &'a RawTableEntry, module: usize, sink: &'a dyn DiagnosticSink) -> Self {
        let raw = entry.as_bytes();
        Self {
            raw: formatted_area(raw),
            strings: parse_string_table(raw),
            module,
            sink,
        }
    }

    fn context(&self, field: ModuleField) -> DecodeContext {
        DecodeContext::new(MemorySource::Smbios, self.module, field)
    }

    fn decode(&self) -> Option<MemoryModuleRecord> {
        let part_number = self.part_number()?;

        let memory_type = recover(
            read_u8(self.raw, offsets::MEMORY_TYPE).map(lookup_memory_type),
            self.sink,
            self.context(ModuleField::MemoryType),
            "type set to UNKNOWN",
        )
        .unwrap_or(UNKNOWN_TYPE)
        .to_string();

        let slot = recover(
            self.slot(),
            self.sink,
            self.context(ModuleField::Slot),
            "slot omitted",
        );

        let manufacturer = recover(
            self.string_at(offsets::MANUFACTURER),
            self.sink,
            self.context(ModuleField::Manufacturer),
            "module dropped",
        )?;

        let capacity = recover(
            decode_capacity(self.raw),
            self.sink,
            self.context(ModuleField::Capacity),
            "module dropped",
        )?;

        Some(MemoryModuleRecord::new(
            part_number,
            MemoryModuleDetails {
                memory_type,
                slot,
                manufacturer,
                capacity,
                speed: None,
            },
        ))
    }

    fn part_number(&self) -> Option<String> {
        let context = self.context(ModuleField::PartNumber);
        let index = recover(
            read_u8(self.raw, offsets::PART_NUMBER),
            self.sink,
            context,
            "module skipped",
        )?;

        // Empty sockets carry no part number string
        if index == 0 {
            debug!("{context}: no part number, skipping empty slot");
            return None;
        }

        recover(
            resolve_string(&self.strings, index),
            self.sink,
            context,
            "module skipped",
        )
    }

    fn slot(&self) -> Result<MemorySlot, DecodeError> {
        Ok(MemorySlot {
            bank: self.string_at(offsets::BANK)?,
            channel: self.string_at(offsets::CHANNEL)?,
        })
    }

    fn string_at(&self, offset: usize) -> Result<String, DecodeError> {
        resolve_string_at(self.raw, &self.strings, offset)
    }
}

/// Per-property entries of a device-tree memory node
struct DeviceTreeNode<'a> {
    types: Result<Vec<String>, DecodeError>,
    slots: Result<Vec<String>, DecodeError>,
    manufacturers: Result<Vec<String>, DecodeError>,
    speeds: Result<Vec<String>, DecodeError>,
    reg: Result<&'a [u8], DecodeError>,
}

impl DeviceTreeNode<'_> {
    fn decode(
        &self,
        module: usize,
        part_number: String,
        sink: &dyn DiagnosticSink,
    ) -> Option<MemoryModuleRecord> {
        let context = |field| DecodeContext::new(MemorySource::DeviceTree, module, field);

        let memory_type = recover(
            entry(&self.types, DIMM_TYPES_PROPERTY, module),
            sink,
            context(ModuleField::MemoryType),
            "type set to UNKNOWN",
        )
        .unwrap_or_else(|| UNKNOWN_TYPE.to_string());

        let slot = recover(
            entry(&self.slots, SLOT_NAMES_PROPERTY, module).and_then(|name| split_slot_name(&name)),
            sink,
            context(ModuleField::Slot),
            "slot omitted",
        );

        let manufacturer = recover(
            entry(&self.manufacturers, DIMM_MANUFACTURER_PROPERTY, module),
            sink,
            context(ModuleField::Manufacturer),
            "module dropped",
        )?;

        let capacity = recover(
            self.reg
                .clone()
                .and_then(|reg| decode_reg_capacity(reg, module)),
            sink,
            context(ModuleField::Capacity),
            "module dropped",
        )?;

        // Speed is optional; only a short property is worth reporting
        let speed = match &self.speeds {
            Err(DecodeError::MissingProperty(_)) => None,
            speeds => recover(
                entry(speeds, DIMM_SPEEDS_PROPERTY, module),
                sink,
                context(ModuleField::Speed),
                "speed omitted",
            ),
        };

        Some(MemoryModuleRecord::new(
            part_number,
            MemoryModuleDetails {
                memory_type,
                slot,
                manufacturer,
                capacity,
                speed,
            },
        ))
    }
}

/// Entry `module` of a property that may itself be missing
fn entry(
    entries: &Result<Vec<String>, DecodeError>,
    property: &str,
    module: usize,
) -> Result<String, DecodeError> {
    match entries {
        Ok(entries) => module_entry(entries, property, module).map(str::to_string),
        Err(err) => Err(err.clone()),
    }
}
