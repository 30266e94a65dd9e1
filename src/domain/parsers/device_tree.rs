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

//! Device-tree memory node decoding functions
//!
//! The memory node stores one blob per property, holding that property's
//! value for every module back to back. Entry `i` of each blob belongs to
//! module `i`.

use crate::domain::{DecodeError, DeviceTreeProperties, MemorySlot};

pub const PART_NUMBER_PROPERTY: &str = "part-number";
pub const DIMM_TYPES_PROPERTY: &str = "dimm-types";
pub const SLOT_NAMES_PROPERTY: &str = "slot-names";
pub const DIMM_SPEEDS_PROPERTY: &str = "dimm-speeds";
pub const DIMM_MANUFACTURER_PROPERTY: &str = "dimm-manufacturer";
pub const REG_PROPERTY: &str = "reg";

/// Width of one module's size in the `reg` blob
const REG_ENTRY_WIDTH: usize = 8;

/// `reg` sizes are in bytes
const BYTES_PER_MEGABYTE: u64 = 0x10_0000;

/// Find the first property whose name contains `name`
pub fn find_property<'a>(properties: &'a DeviceTreeProperties, name: &str) -> Option<&'a [u8]> {
    properties
        .iter()
        .find(|(key, _)| key.contains(name))
        .map(|(_, value)| value.as_slice())
}

/// Split a NUL-delimited blob into its non-empty strings
pub fn split_string_blob(blob: &[u8]) -> Vec<String> {
    blob.split(|byte| *byte == 0)
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

/// Look up a string property and split it into per-module entries
///
/// # Arguments
/// * `properties` - Memory node properties
/// * `name` - Property name, matched as a substring
///
/// # Returns
/// * `Ok(Vec<String>)` - One entry per module
/// * `Err(DecodeError::MissingProperty)` - No property matches `name`
pub fn string_property(
    properties: &DeviceTreeProperties,
    name: &str,
) -> Result<Vec<String>, DecodeError> {
    find_property(properties, name)
        .map(split_string_blob)
        .ok_or_else(|| DecodeError::MissingProperty(name.to_string()))
}

/// Entry `module` of a split property, or an alignment failure
pub fn module_entry<'a>(
    entries: &'a [String],
    property: &str,
    module: usize,
) -> Result<&'a str, DecodeError> {
    entries
        .get(module)
        .map(String::as_str)
        .ok_or_else(|| DecodeError::AlignmentMismatch {
            property: property.to_string(),
            module,
            count: entries.len(),
        })
}

/// Split a slot name such as "BANK 0/DIMM0" into bank and channel
pub fn split_slot_name(name: &str) -> Result<MemorySlot, DecodeError> {
    match name.split('/').collect::<Vec<_>>().as_slice() {
        [bank, channel] => Ok(MemorySlot {
            bank: bank.to_string(),
            channel: channel.to_string(),
        }),
        _ => Err(DecodeError::MalformedValue(format!(
            "slot name '{name}' is not of the form bank/channel"
        ))),
    }
}

/// Decode the capacity of `module` from the `reg` property
///
/// Unlike the SMBIOS size field there is no unit bit: each module has an
/// 8-byte little-endian byte count, always rendered in megabytes.
///
/// # Arguments
/// * `reg` - Raw `reg` blob
/// * `module` - Module index
///
/// # Returns
/// * `Ok(String)` - e.g. "8192MB"
/// * `Err(DecodeError)` - The blob holds no complete entry for `module`
pub fn decode_reg_capacity(reg: &[u8], module: usize) -> Result<String, DecodeError> {
    let bytes: [u8; REG_ENTRY_WIDTH] = module
        .checked_mul(REG_ENTRY_WIDTH)
        .and_then(|start| reg.get(start..start + REG_ENTRY_WIDTH))
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| DecodeError::AlignmentMismatch {
            property: REG_PROPERTY.to_string(),
            module,
            count: reg.len() / REG_ENTRY_WIDTH,
        })?;

    let size = u64::from_le_bytes(bytes);
    Ok(format!("{}MB", size / BYTES_PER_MEGABYTE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties(pairs: &[(&str, &[u8])]) -> DeviceTreeProperties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_vec()))
            .collect()
    }

    #[test]
    fn test_split_string_blob() {
        assert_eq!(
            split_string_blob(b"DDR4\0DDR4\0"),
            vec!["DDR4".to_string(), "DDR4".to_string()]
        );
        assert_eq!(split_string_blob(b"A\0\0B"), vec!["A", "B"]);
        assert!(split_string_blob(b"").is_empty());
    }

    #[test]
    fn test_find_property_by_substring() {
        let props = properties(&[("dimm-part-number", &b"X\0"[..]), ("reg", &[0u8; 8][..])]);
        assert_eq!(find_property(&props, PART_NUMBER_PROPERTY), Some(&b"X\0"[..]));
        assert!(find_property(&props, DIMM_TYPES_PROPERTY).is_none());
    }

    #[test]
    fn test_string_property_missing() {
        let props = properties(&[]);
        assert_eq!(
            string_property(&props, DIMM_MANUFACTURER_PROPERTY),
            Err(DecodeError::MissingProperty("dimm-manufacturer".to_string()))
        );
    }

    #[test]
    fn test_module_entry_alignment() {
        let entries = vec!["Samsung".to_string()];
        assert_eq!(module_entry(&entries, "dimm-manufacturer", 0).unwrap(), "Samsung");
        assert_eq!(
            module_entry(&entries, "dimm-manufacturer", 1),
            Err(DecodeError::AlignmentMismatch {
                property: "dimm-manufacturer".to_string(),
                module: 1,
                count: 1
            })
        );
    }

    #[test]
    fn test_split_slot_name() {
        let slot = split_slot_name("BANK 0/DIMM0").unwrap();
        assert_eq!(slot.bank, "BANK 0");
        assert_eq!(slot.channel, "DIMM0");
        assert!(split_slot_name("DIMM0").is_err());
        assert!(split_slot_name("A/B/C").is_err());
    }

    #[test]
    fn test_decode_reg_capacity() {
        let mut reg = Vec::new();
        reg.extend_from_slice(&(8u64 * 1024 * 1024 * 1024).to_le_bytes());
        reg.extend_from_slice(&(4u64 * 1024 * 1024 * 1024).to_le_bytes());

        assert_eq!(decode_reg_capacity(&reg, 0).unwrap(), "8192MB");
        assert_eq!(decode_reg_capacity(&reg, 1).unwrap(), "4096MB");
        assert!(matches!(
            decode_reg_capacity(&reg, 2),
            Err(DecodeError::AlignmentMismatch { count: 2, .. })
        ));
        // Partial trailing entry does not count
        assert!(decode_reg_capacity(&reg[..12], 1).is_err());
    }
}
