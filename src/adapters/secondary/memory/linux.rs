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

//! Linux memory table source backed by the sysfs DMI table

use super::os_total_memory;
use crate::domain::{parse_hex_dump, split_smbios_table, RawMemoryTables, SystemError};
use crate::ports::{CommandExecutor, MemoryTableSource, SystemCommand};
use async_trait::async_trait;
use log::{debug, info};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Location of the raw SMBIOS table exposed by the kernel
pub const DEFAULT_DMI_TABLE_PATH: &str = "/sys/firmware/dmi/tables/DMI";

/// Linux memory table source reading the raw SMBIOS table
///
/// The table is only readable by root. When a direct read is refused the
/// table is dumped through `sudo od` instead, unless sudo is disabled.
pub struct LinuxMemoryTableSource {
    command_executor: Arc<dyn CommandExecutor>,
    table_path: PathBuf,
    allow_sudo: bool,
}

impl LinuxMemoryTableSource {
    /// Create a new Linux memory table source
    pub fn new(command_executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            command_executor,
            table_path: PathBuf::from(DEFAULT_DMI_TABLE_PATH),
            allow_sudo: true,
        }
    }

    /// Read the table from `path` instead, e.g. an offline dump
    pub fn with_table_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.table_path = path.into();
        self
    }

    /// Never escalate privileges
    pub fn without_sudo(mut self) -> Self {
        self.allow_sudo = false;
        self
    }

    pub fn table_path(&self) -> &Path {
        &self.table_path
    }

    async fn read_table(&self) -> Result<Vec<u8>, SystemError> {
        match tokio::fs::read(&self.table_path).await {
            Ok(table) => Ok(table),
            Err(e) if e.kind() == ErrorKind::PermissionDenied && self.allow_sudo => {
                info!(
                    "{} is not readable, reading it through sudo",
                    self.table_path.display()
                );
                self.read_table_privileged().await
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(
                SystemError::PermissionDenied(format!("{}: {}", self.table_path.display(), e)),
            ),
            Err(e) => Err(SystemError::IoError(format!(
                "{}: {}",
                self.table_path.display(),
                e
            ))),
        }
    }

    /// Dump the table as hex through a privileged `od`
    async fn read_table_privileged(&self) -> Result<Vec<u8>, SystemError> {
        let path = self.table_path.to_string_lossy().into_owned();
        let od_cmd = SystemCommand::new("od").args(&["-An", "-v", "-tx1", path.as_str()]);

        let output = self
            .command_executor
            .execute_with_privileges(&od_cmd)
            .await?;

        if !output.success {
            return Err(SystemError::CommandFailed {
                command: od_cmd.display(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        parse_hex_dump(&output.stdout).map_err(SystemError::ParseError)
    }
}

#[async_trait]
impl MemoryTableSource for LinuxMemoryTableSource {
    async fn read_memory_tables(&self) -> Result<RawMemoryTables, SystemError> {
        let table = self.read_table().await?;
        let entries = split_smbios_table(&table);
        debug!(
            "Read {} byte DMI table with {} structure(s)",
            table.len(),
            entries.len()
        );
        Ok(RawMemoryTables::Smbios(entries))
    }

    async fn total_physical_memory(&self) -> Result<u64, SystemError> {
        os_total_memory().await
    }

    async fn has_required_privileges(&self) -> Result<bool, SystemError> {
        if tokio::fs::File::open(&self.table_path).await.is_ok() {
            return Ok(true);
        }

        Ok(self.command_executor.has_elevated_privileges().await?)
    }

    async fn get_missing_dependencies(&self) -> Result<Vec<String>, SystemError> {
        if self.has_required_privileges().await? {
            return Ok(Vec::new());
        }

        let mut required = vec!["od"];
        if self.allow_sudo {
            required.push("sudo");
        }

        let mut missing = Vec::new();
        for cmd in required {
            if let Ok(false) = self.command_executor.is_command_available(cmd).await {
                missing.push(cmd.to_string());
            }
        }

        Ok(missing)
    }
}
