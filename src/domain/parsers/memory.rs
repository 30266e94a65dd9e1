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

//! Aggregate helpers over decoded memory modules

use super::common::{bytes_to_human_readable, parse_size_to_bytes};
use crate::domain::MemoryModuleRecord;

/// Calculate installed memory from module capacities
///
/// # Arguments
/// * `modules` - Decoded memory modules
///
/// # Returns
/// * Total memory as human-readable string, "Unknown" when nothing adds up
pub fn calculate_total_memory_from_modules(modules: &[MemoryModuleRecord]) -> String {
    let total_bytes: u64 = modules
        .iter()
        .map(|module| parse_size_to_bytes(&module.details.capacity).unwrap_or(0))
        .sum();

    if total_bytes > 0 {
        bytes_to_human_readable(total_bytes)
    } else {
        "Unknown".to_string()
    }
}

/// Determine common memory type from modules
///
/// # Arguments
/// * `modules` - Decoded memory modules
///
/// # Returns
/// * Common memory type or "Mixed" if different types
pub fn determine_memory_type(modules: &[MemoryModuleRecord]) -> String {
    let Some(first) = modules.first() else {
        return "Unknown".to_string();
    };

    let first_type = &first.details.memory_type;
    if modules.iter().all(|m| m.details.memory_type == *first_type) {
        first_type.clone()
    } else {
        "Mixed".to_string()
    }
}
