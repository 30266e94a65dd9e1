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

//! macOS memory table source backed by the IODeviceTree memory node

use super::os_total_memory;
use crate::domain::{parse_ioreg_properties, RawMemoryTables, SystemError};
use crate::ports::{CommandExecutor, MemoryTableSource, SystemCommand};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

/// macOS memory table source using `ioreg`
pub struct MacOsMemoryTableSource {
    command_executor: Arc<dyn CommandExecutor>,
}

impl MacOsMemoryTableSource {
    /// Create a new macOS memory table source
    pub fn new(command_executor: Arc<dyn CommandExecutor>) -> Self {
        Self { command_executor }
    }
}

#[async_trait]
impl MemoryTableSource for MacOsMemoryTableSource {
    async fn read_memory_tables(&self) -> Result<RawMemoryTables, SystemError> {
        let ioreg_cmd =
            SystemCommand::new("ioreg").args(&["-l", "-w0", "-p", "IODeviceTree", "-n", "memory"]);

        let output = self.command_executor.execute(&ioreg_cmd).await?;
        if !output.success {
            return Err(SystemError::CommandFailed {
                command: ioreg_cmd.display(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        let properties = parse_ioreg_properties(&output.stdout).map_err(SystemError::ParseError)?;
        debug!("Memory node has {} data properties", properties.len());

        Ok(RawMemoryTables::DeviceTree(properties))
    }

    async fn total_physical_memory(&self) -> Result<u64, SystemError> {
        os_total_memory().await
    }

    async fn has_required_privileges(&self) -> Result<bool, SystemError> {
        // The device tree is world readable
        Ok(true)
    }

    async fn get_missing_dependencies(&self) -> Result<Vec<String>, SystemError> {
        match self.command_executor.is_command_available("ioreg").await {
            Ok(false) => Ok(vec!["ioreg".to_string()]),
            _ => Ok(Vec::new()),
        }
    }
}
