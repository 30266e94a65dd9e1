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

//! Parsing of `ioreg` registry dumps into device-tree properties

use super::common::parse_hex_dump;
use crate::domain::DeviceTreeProperties;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DATA_PROPERTY_RE: Regex = Regex::new(r#""([^"]+)"\s*=\s*<([^>]*)>"#).unwrap();
    static ref QUOTED_STRING_RE: Regex = Regex::new(r#""([^"]*)""#).unwrap();
}

/// Parse data properties from `ioreg -l -p IODeviceTree -n memory` output
///
/// Data values come either as raw hex (`<4d3437>`) or as a list of quoted
/// strings (`<"DDR4","DDR4">`); quoted strings are stored NUL-terminated, the
/// way they sit in the registry. Non-data properties are ignored.
///
/// # Arguments
/// * `ioreg_output` - Raw ioreg output
///
/// # Returns
/// * `Ok(DeviceTreeProperties)` - Properties keyed by name
/// * `Err(String)` - A hex value could not be decoded
pub fn parse_ioreg_properties(ioreg_output: &str) -> Result<DeviceTreeProperties, String> {
    let mut properties = DeviceTreeProperties::new();

    for captures in DATA_PROPERTY_RE.captures_iter(ioreg_output) {
        let name = captures[1].to_string();
        let raw = captures[2].trim();

        let value = if raw.starts_with('"') {
            let mut blob = Vec::new();
            for string in QUOTED_STRING_RE.captures_iter(raw) {
                blob.extend_from_slice(string[1].as_bytes());
                blob.push(0);
            }
            blob
        } else {
            parse_hex_dump(raw).map_err(|e| format!("Property '{name}': {e}"))?
        };

        properties.insert(name, value);
    }

    Ok(properties)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IOREG_MEMORY_NODE: &str = r#"+-o memory  <class IORegistryEntry, id 0x100000110, retain 7>
    {
      "dimm-types" = <"DDR4","DDR4">
      "slot-names" = <"BANK 0/ChannelA-DIMM0","BANK 1/ChannelB-DIMM0">
      "reg" = <0000000002000000 0000000002000000>
      "name" = <"memory">
      "dimm-part-number" = <"M471A1K43DB1-CWE","M471A1K43DB1-CWE">
      "device_type" = <"memory">
      "ecc-enabled" = No
    }"#;

    #[test]
    fn test_parse_quoted_and_hex_properties() {
        let props = parse_ioreg_properties(IOREG_MEMORY_NODE).unwrap();

        assert_eq!(props["dimm-types"], b"DDR4\0DDR4\0".to_vec());
        assert_eq!(
            props["slot-names"],
            b"BANK 0/ChannelA-DIMM0\0BANK 1/ChannelB-DIMM0\0".to_vec()
        );
        assert_eq!(props["reg"].len(), 16);
        assert_eq!(props["reg"][4], 0x02);
        assert!(props.contains_key("dimm-part-number"));
        assert!(!props.contains_key("ecc-enabled"));
    }

    #[test]
    fn test_parse_invalid_hex() {
        let output = r#""reg" = <00zz>"#;
        assert!(parse_ioreg_properties(output).is_err());
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_ioreg_properties("").unwrap().is_empty());
    }
}
