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

//! Common parsing utilities and helper functions

use super::smbios::UNKNOWN_SIZE;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref SIZE_RE: Regex = Regex::new(r"^(\d+(?:\.\d+)?)(B|K|M|G|T)B?$").unwrap();
}

/// Parse a capacity string (e.g., "8192MB", "512KB") to bytes
///
/// # Arguments
/// * `size_str` - Size string to parse
///
/// # Returns
/// * `Ok(u64)` - Size in bytes; 0 for "UNKNOWN SIZE" and "Unknown"
/// * `Err(String)` - Parse error description
pub fn parse_size_to_bytes(size_str: &str) -> Result<u64, String> {
    let trimmed = size_str.trim();
    if trimmed.is_empty() || trimmed == UNKNOWN_SIZE || trimmed == "Unknown" {
        return Ok(0);
    }

    let size_str = trimmed.replace(' ', "").to_uppercase();

    if let Some(captures) = SIZE_RE.captures(&size_str) {
        let number: f64 = captures[1]
            .parse()
            .map_err(|_| format!("Invalid number in size: {}", &captures[1]))?;
        let unit = &captures[2];

        let multiplier = match unit {
            "B" => 1,
            "K" => 1024,
            "M" => 1024 * 1024,
            "G" => 1024 * 1024 * 1024,
            "T" => 1024_u64.pow(4),
            _ => return Err(format!("Unknown unit: {unit}")),
        };

        Ok((number * multiplier as f64) as u64)
    } else {
        Err(format!("Unable to parse size: {size_str}"))
    }
}

/// Decode whitespace-separated hex text into bytes
///
/// Accepts both `od -An -tx1` output ("1f 04 00") and contiguous hex
/// ("1f0400").
///
/// # Arguments
/// * `text` - Hex text
///
/// # Returns
/// * `Ok(Vec<u8>)` - Decoded bytes
/// * `Err(String)` - Odd-length token or non-hex character
pub fn parse_hex_dump(text: &str) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::with_capacity(text.len() / 2);

    for token in text.split_whitespace() {
        if token.len() % 2 != 0 {
            return Err(format!("Odd-length hex token: {token}"));
        }
        for pair in token.as_bytes().chunks(2) {
            let pair = std::str::from_utf8(pair).map_err(|e| e.to_string())?;
            let byte =
                u8::from_str_radix(pair, 16).map_err(|_| format!("Invalid hex byte: {pair}"))?;
            bytes.push(byte);
        }
    }

    Ok(bytes)
}

/// Convert bytes to human-readable format
///
/// # Arguments
/// * `bytes` - Number of bytes
///
/// # Returns
/// * Human-readable string (e.g., "16.0 GB", "2.5 TB")
pub fn bytes_to_human_readable(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: u64 = 1024;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD as f64 && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD as f64;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_to_bytes() {
        assert_eq!(parse_size_to_bytes("8192MB").unwrap(), 8192 * 1024 * 1024);
        assert_eq!(parse_size_to_bytes("512KB").unwrap(), 512 * 1024);
        assert_eq!(parse_size_to_bytes("16GB").unwrap(), 16 * 1024 * 1024 * 1024);
        assert_eq!(parse_size_to_bytes("UNKNOWN SIZE").unwrap(), 0);
        assert_eq!(parse_size_to_bytes("").unwrap(), 0);
        assert!(parse_size_to_bytes("lots").is_err());
    }

    #[test]
    fn test_parse_hex_dump() {
        assert_eq!(
            parse_hex_dump(" 11 28 2a 00\n ff 7f\n").unwrap(),
            vec![0x11, 0x28, 0x2A, 0x00, 0xFF, 0x7F]
        );
        assert_eq!(parse_hex_dump("4d3437").unwrap(), b"M47".to_vec());
        assert!(parse_hex_dump("").unwrap().is_empty());
        assert!(parse_hex_dump("abc").is_err());
        assert!(parse_hex_dump("zz").is_err());
    }

    #[test]
    fn test_bytes_to_human_readable() {
        assert_eq!(bytes_to_human_readable(0), "0 B");
        assert_eq!(bytes_to_human_readable(512), "512 B");
        assert_eq!(bytes_to_human_readable(1024), "1.0 KB");
        assert_eq!(bytes_to_human_readable(16 * 1024 * 1024 * 1024), "16.0 GB");
    }
}
