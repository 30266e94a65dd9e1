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

//! Platform memory table sources

mod linux;
mod macos;

pub use linux::*;
pub use macos::*;

use crate::domain::SystemError;
use sysinfo::System;

/// Physical memory size as reported by the operating system, in bytes
pub(crate) async fn os_total_memory() -> Result<u64, SystemError> {
    tokio::task::spawn_blocking(|| {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.total_memory()
    })
    .await
    .map_err(|e| SystemError::IoError(format!("Memory query task failed: {}", e)))
}
