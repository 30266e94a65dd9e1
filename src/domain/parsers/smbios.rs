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

//! SMBIOS Type 17 (Memory Device) decoding functions
//!
//! Every fixed-offset read is bounds-checked against the formatted area, as
//! declared by the length byte, and reported as [`DecodeError::BufferTooShort`]
//! instead of panicking. Bytes past the formatted area belong to the string
//! table and are never read as fields.

use crate::domain::{DecodeError, RawTableEntry};

/// Structure type of a Memory Device
pub const MEMORY_DEVICE_TYPE: u8 = 17;

/// Structure type marking the end of the table
pub const END_OF_TABLE_TYPE: u8 = 127;

/// Type, length and handle
const HEADER_LEN: usize = 4;

/// Byte offsets within a Type 17 structure, as laid out by the SMBIOS standard
pub mod offsets {
    /// Length of the formatted area; the string table starts right after it
    pub const LENGTH: usize = 0x01;
    /// Size, 2 bytes little-endian
    pub const SIZE: usize = 0x0C;
    /// Bank string index
    pub const BANK: usize = 0x10;
    /// Channel string index
    pub const CHANNEL: usize = 0x11;
    /// Memory type code
    pub const MEMORY_TYPE: usize = 0x12;
    /// Manufacturer string index
    pub const MANUFACTURER: usize = 0x17;
    /// Part number string index
    pub const PART_NUMBER: usize = 0x1A;
    /// Extended size, 4 bytes little-endian
    pub const EXTENDED_SIZE: usize = 0x1C;
}

/// Size field value meaning "size not reported"
pub const SIZE_UNKNOWN: u16 = 0xFFFF;

/// Size field value redirecting to the extended size field
pub const SIZE_USE_EXTENDED: u16 = 0x7FFF;

/// Bit 15 of the size field: set means kilobytes, clear means megabytes
const SIZE_KILOBYTE_UNIT: u16 = 0x8000;

/// Value of string index 0
pub const UNKNOWN_STRING: &str = "Unknown";

/// Capacity rendered for [`SIZE_UNKNOWN`]
pub const UNKNOWN_SIZE: &str = "UNKNOWN SIZE";

/// Memory type rendered for unmapped codes
pub const UNKNOWN_TYPE: &str = "UNKNOWN";

fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N], DecodeError> {
    offset
        .checked_add(N)
        .and_then(|end| buf.get(offset..end))
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(DecodeError::BufferTooShort {
            offset,
            width: N,
            len: buf.len(),
        })
}

/// Read one byte at `offset`
pub fn read_u8(buf: &[u8], offset: usize) -> Result<u8, DecodeError> {
    read_array::<1>(buf, offset).map(|[byte]| byte)
}

/// Read a little-endian u16 at `offset`
pub fn read_u16_le(buf: &[u8], offset: usize) -> Result<u16, DecodeError> {
    read_array(buf, offset).map(u16::from_le_bytes)
}

/// Read a little-endian u32 at `offset`
pub fn read_u32_le(buf: &[u8], offset: usize) -> Result<u32, DecodeError> {
    read_array(buf, offset).map(u32::from_le_bytes)
}

/// The formatted area of a structure, as declared by its length byte
///
/// A declared length past the end of the buffer is clamped to the buffer. A
/// buffer too short to hold the length byte is returned whole; every field
/// read on it fails anyway.
pub fn formatted_area(entry: &[u8]) -> &[u8] {
    match entry.get(offsets::LENGTH) {
        Some(&length) => &entry[..usize::from(length).min(entry.len())],
        None => entry,
    }
}

/// Split the string section trailing a structure's formatted area
///
/// # Arguments
/// * `entry` - One complete SMBIOS structure
///
/// # Returns
/// * The NUL-terminated strings in order; string index `n` is element `n - 1`.
///   Empty when the formatted area runs past the end of the buffer.
pub fn parse_string_table(entry: &[u8]) -> Vec<&[u8]> {
    let Some(&length) = entry.get(offsets::LENGTH) else {
        return Vec::new();
    };
    let Some(section) = entry.get(length as usize..) else {
        return Vec::new();
    };

    // The section ends at the first empty string (double NUL)
    section
        .split(|byte| *byte == 0)
        .take_while(|s| !s.is_empty())
        .collect()
}

/// Resolve a 1-based string index against a string table
///
/// # Arguments
/// * `strings` - String table as returned by [`parse_string_table`]
/// * `index` - Index byte from the formatted area
///
/// # Returns
/// * `Ok("Unknown")` - For index 0, whatever the table holds
/// * `Ok(String)` - The referenced string, control bytes untouched
/// * `Err(DecodeError)` - Index past the end of the table, or non-ASCII text
pub fn resolve_string<S: AsRef<[u8]>>(strings: &[S], index: u8) -> Result<String, DecodeError> {
    if index == 0 {
        return Ok(UNKNOWN_STRING.to_string());
    }

    let raw: &[u8] = strings
        .get(usize::from(index) - 1)
        .map(|s| s.as_ref())
        .ok_or(DecodeError::StringIndexOutOfRange {
            index,
            available: strings.len(),
        })?;

    if !raw.is_ascii() {
        return Err(DecodeError::MalformedValue(format!(
            "string {index} is not ASCII"
        )));
    }

    Ok(raw.iter().map(|&b| char::from(b)).collect())
}

/// Read the string index byte at `offset` and resolve it
pub fn resolve_string_at<S: AsRef<[u8]>>(
    entry: &[u8],
    strings: &[S],
    offset: usize,
) -> Result<String, DecodeError> {
    let index = read_u8(formatted_area(entry), offset)?;
    resolve_string(strings, index)
}

/// Decode the capacity of a memory device
///
/// The 2-byte size field selects between three cases: `0xFFFF` is unknown,
/// `0x7FFF` defers to the 4-byte extended size, anything else carries the
/// size in its low 15 bits. Bit 15 of the 2-byte field picks the unit in all
/// cases, including the extended one.
///
/// # Arguments
/// * `raw` - Buffer holding the structure
///
/// # Returns
/// * `Ok(String)` - e.g. "8192MB", "512KB" or "UNKNOWN SIZE"
/// * `Err(DecodeError)` - Formatted area too short for the fields needed
pub fn decode_capacity(raw: &[u8]) -> Result<String, DecodeError> {
    let raw = formatted_area(raw);
    let size16 = read_u16_le(raw, offsets::SIZE)?;

    if size16 == SIZE_UNKNOWN {
        return Ok(UNKNOWN_SIZE.to_string());
    }

    let size = if size16 == SIZE_USE_EXTENDED {
        read_u32_le(raw, offsets::EXTENDED_SIZE)?
    } else {
        u32::from(size16 & !SIZE_KILOBYTE_UNIT)
    };

    let unit = if size16 & SIZE_KILOBYTE_UNIT != 0 {
        "KB"
    } else {
        "MB"
    };

    Ok(format!("{size}{unit}"))
}

/// Map a memory type code to its name
pub fn lookup_memory_type(code: u8) -> &'static str {
    match code {
        0x01 => "Other",
        0x02 => "UNKNOWN",
        0x03 => "DRAM",
        0x04 => "EDRAM",
        0x05 => "VRAM",
        0x06 => "SRAM",
        0x07 => "RAM",
        0x08 => "ROM",
        0x09 => "FLASH",
        0x0A => "EEPROM",
        0x0B => "FEPROM",
        0x0C => "EPROM",
        0x0D => "CDRAM",
        0x0E => "3DRAM",
        0x0F => "SDRAM",
        0x10 => "SGRAM",
        0x11 => "RDRAM",
        0x12 => "DDR",
        0x13 => "DDR2",
        0x14 => "DDR2-FB-DIMM",
        0x15..=0x17 => "Reserved",
        0x18 => "DDR3",
        0x19 => "FBD2",
        0x1A => "DDR4",
        0x1B => "LPDDR",
        0x1C => "LPDDR2",
        0x1D => "LPDDR3",
        0x1E => "LPDDR4",
        0x1F => "Logical non-volatile device",
        0x20 => "HBM",
        0x21 => "HBM2",
        0x22 => "DDR5",
        0x23 => "LPDDR5",
        0x24 => "HBM3",
        _ => UNKNOWN_TYPE,
    }
}

/// Whether a structure is a Memory Device (Type 17)
pub fn is_memory_device(entry: &RawTableEntry) -> bool {
    entry.structure_type() == Some(MEMORY_DEVICE_TYPE)
}

/// Split a full DMI table dump into its structures
///
/// # Arguments
/// * `table` - Contents of e.g. `/sys/firmware/dmi/tables/DMI`
///
/// # Returns
/// * Structures in table order, each including its string section. Walking
///   stops at the end-of-table structure or at the first truncated one.
pub fn split_smbios_table(table: &[u8]) -> Vec<RawTableEntry> {
    let mut entries = Vec::new();
    let mut offset = 0;

    while offset + HEADER_LEN <= table.len() {
        let structure_type = table[offset];
        let length = usize::from(table[offset + 1]);
        if length < HEADER_LEN {
            break;
        }

        let strings_start = offset + length;
        let Some(section) = table.get(strings_start..) else {
            break;
        };
        let Some(terminator) = section.windows(2).position(|pair| pair == [0, 0]) else {
            break;
        };

        let end = strings_start + terminator + 2;
        entries.push(RawTableEntry::from(&table[offset..end]));

        if structure_type == END_OF_TABLE_TYPE {
            break;
        }
        offset = end;
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size_buffer(size16: u16, extended: Option<u32>) -> Vec<u8> {
        let mut buf = vec![0u8; 0x20];
        buf[offsets::LENGTH] = 0x20;
        buf[offsets::SIZE..offsets::SIZE + 2].copy_from_slice(&size16.to_le_bytes());
        if let Some(ext) = extended {
            buf[offsets::EXTENDED_SIZE..offsets::EXTENDED_SIZE + 4]
                .copy_from_slice(&ext.to_le_bytes());
        }
        buf
    }

    #[test]
    fn test_capacity_unknown_sentinel() {
        assert_eq!(decode_capacity(&size_buffer(0xFFFF, None)).unwrap(), "UNKNOWN SIZE");
        // Extended field is ignored for the sentinel
        assert_eq!(
            decode_capacity(&size_buffer(0xFFFF, Some(65536))).unwrap(),
            "UNKNOWN SIZE"
        );
        // Sentinel needs no extended field in the buffer
        let mut short = vec![0u8; 0x0E];
        short[offsets::LENGTH] = 0x0E;
        short[0x0C] = 0xFF;
        short[0x0D] = 0xFF;
        assert_eq!(decode_capacity(&short).unwrap(), "UNKNOWN SIZE");
    }

    #[test]
    fn test_capacity_extended_path() {
        assert_eq!(
            decode_capacity(&size_buffer(0x7FFF, Some(65536))).unwrap(),
            "65536MB"
        );
        assert_eq!(
            decode_capacity(&size_buffer(0x7FFF, Some(0x0002_0000))).unwrap(),
            "131072MB"
        );
    }

    #[test]
    fn test_capacity_direct_path_unit_bit() {
        assert_eq!(decode_capacity(&size_buffer(4096, None)).unwrap(), "4096MB");
        assert_eq!(
            decode_capacity(&size_buffer(4096 | 0x8000, None)).unwrap(),
            "4096KB"
        );
        assert_eq!(decode_capacity(&size_buffer(8192, None)).unwrap(), "8192MB");
        assert_eq!(decode_capacity(&size_buffer(0x8000, None)).unwrap(), "0KB");
        // Largest direct value below the extended marker
        assert_eq!(decode_capacity(&size_buffer(0x7FFE, None)).unwrap(), "32766MB");
        assert_eq!(decode_capacity(&size_buffer(0xFFFE, None)).unwrap(), "32766KB");
    }

    #[test]
    fn test_capacity_buffer_too_short() {
        let mut buf = [0u8; 0x0D];
        buf[offsets::LENGTH] = 0x0D;
        assert_eq!(
            decode_capacity(&buf),
            Err(DecodeError::BufferTooShort {
                offset: 0x0C,
                width: 2,
                len: 0x0D
            })
        );

        // Extended path needs bytes up to 0x1F
        let mut buf = vec![0u8; 0x1E];
        buf[offsets::LENGTH] = 0x1E;
        buf[0x0C] = 0xFF;
        buf[0x0D] = 0x7F;
        assert_eq!(
            decode_capacity(&buf),
            Err(DecodeError::BufferTooShort {
                offset: 0x1C,
                width: 4,
                len: 0x1E
            })
        );
    }

    #[test]
    fn test_capacity_stays_inside_formatted_area() {
        // Formatted area ends at 0x1C; the string "ABCD" sits where the
        // extended size would be
        let mut structure = vec![0u8; 0x1C];
        structure[0] = MEMORY_DEVICE_TYPE;
        structure[offsets::LENGTH] = 0x1C;
        structure[0x0C] = 0xFF;
        structure[0x0D] = 0x7F;
        structure.extend_from_slice(b"ABCD\0\0");

        assert_eq!(
            decode_capacity(&structure),
            Err(DecodeError::BufferTooShort {
                offset: 0x1C,
                width: 4,
                len: 0x1C
            })
        );
    }

    #[test]
    fn test_formatted_area() {
        let mut structure = vec![17u8, 6, 0, 0, 0x11, 0x22];
        structure.extend_from_slice(b"A\0\0");
        assert_eq!(formatted_area(&structure), &structure[..6]);
        // Declared length past the buffer is clamped
        assert_eq!(formatted_area(b"\x11\x28\x00\x00"), b"\x11\x28\x00\x00");
        assert_eq!(formatted_area(b"\x11"), b"\x11");

        let strings = parse_string_table(&structure);
        assert_eq!(
            resolve_string_at(&structure, &strings, 4),
            Err(DecodeError::StringIndexOutOfRange {
                index: 0x11,
                available: 1
            })
        );
        assert!(matches!(
            resolve_string_at(&structure, &strings, 6),
            Err(DecodeError::BufferTooShort { offset: 6, len: 6, .. })
        ));
    }

    #[test]
    fn test_resolve_zero_index() {
        assert_eq!(resolve_string(&["A", "B"], 0).unwrap(), "Unknown");
        let empty: [&[u8]; 0] = [];
        assert_eq!(resolve_string(&empty, 0).unwrap(), "Unknown");
    }

    #[test]
    fn test_resolve_in_range_and_out_of_range() {
        assert_eq!(resolve_string(&["A", "B"], 1).unwrap(), "A");
        assert_eq!(resolve_string(&["A", "B"], 2).unwrap(), "B");
        assert_eq!(
            resolve_string(&["A", "B"], 5),
            Err(DecodeError::StringIndexOutOfRange {
                index: 5,
                available: 2
            })
        );
        assert!(resolve_string(&["A", "B"], 3).is_err());
    }

    #[test]
    fn test_resolve_keeps_control_bytes() {
        let strings: [&[u8]; 1] = [b"BANK\t0"];
        assert_eq!(resolve_string(&strings, 1).unwrap(), "BANK\t0");

        let strings: [&[u8]; 1] = [&[0x42, 0xC3, 0xA9]];
        assert!(matches!(
            resolve_string(&strings, 1),
            Err(DecodeError::MalformedValue(_))
        ));
    }

    #[test]
    fn test_memory_type_lookup() {
        assert_eq!(lookup_memory_type(0x03), "DRAM");
        assert_eq!(lookup_memory_type(0x1A), "DDR4");
        assert_eq!(lookup_memory_type(0x1D), "LPDDR3");
        assert_eq!(lookup_memory_type(0x22), "DDR5");
        assert_eq!(lookup_memory_type(0x15), "Reserved");
        assert_eq!(lookup_memory_type(0x16), "Reserved");
        assert_eq!(lookup_memory_type(0x17), "Reserved");
        assert_eq!(lookup_memory_type(0x99), "UNKNOWN");
        assert_eq!(lookup_memory_type(0x00), "UNKNOWN");
    }

    #[test]
    fn test_parse_string_table() {
        let mut entry = vec![17u8, 6, 0, 0, 0, 0];
        entry.extend_from_slice(b"BANK 0\0ChannelA\0\0");
        let strings = parse_string_table(&entry);
        assert_eq!(strings, vec![b"BANK 0".as_slice(), b"ChannelA".as_slice()]);

        let no_strings = [17u8, 4, 0, 0, 0, 0];
        assert!(parse_string_table(&no_strings).is_empty());

        // Declared length past the end of the buffer
        let truncated = [17u8, 40, 0, 0];
        assert!(parse_string_table(&truncated).is_empty());
    }

    #[test]
    fn test_split_smbios_table() {
        let mut table = Vec::new();
        // Type 0 with one string
        table.extend_from_slice(&[0, 4, 0, 0]);
        table.extend_from_slice(b"Vendor\0\0");
        // Type 17 without strings
        table.extend_from_slice(&[17, 5, 1, 0, 0xAA]);
        table.extend_from_slice(&[0, 0]);
        // End of table
        table.extend_from_slice(&[127, 4, 2, 0, 0, 0]);
        // Garbage after the end marker
        table.extend_from_slice(&[17, 4, 3, 0, 0, 0]);

        let entries = split_smbios_table(&table);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].as_bytes(), b"\x00\x04\x00\x00Vendor\x00\x00");
        assert_eq!(entries[1].as_bytes(), &[17, 5, 1, 0, 0xAA, 0, 0]);
        assert!(is_memory_device(&entries[1]));
        assert!(!is_memory_device(&entries[0]));
        assert_eq!(entries[2].structure_type(), Some(END_OF_TABLE_TYPE));
    }

    #[test]
    fn test_split_stops_at_truncated_structure() {
        let mut table = vec![17u8, 4, 0, 0];
        table.extend_from_slice(b"A\0\0");
        table.extend_from_slice(&[17, 30, 1, 0, 0, 0]);

        let entries = split_smbios_table(&table);
        assert_eq!(entries.len(), 1);
        assert!(split_smbios_table(&[17, 2, 0, 0, 0, 0]).is_empty());
        assert!(split_smbios_table(&[]).is_empty());
    }

    #[test]
    fn test_little_endian_reads() {
        let buf = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(read_u8(&buf, 3).unwrap(), 0x04);
        assert_eq!(read_u16_le(&buf, 0).unwrap(), 0x0201);
        assert_eq!(read_u32_le(&buf, 0).unwrap(), 0x0403_0201);
        assert!(read_u32_le(&buf, 1).is_err());
        assert!(read_u8(&buf, usize::MAX).is_err());
    }
}
