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

use std::fmt;
use thiserror::Error;

/// Reason a single field of a memory module could not be decoded
///
/// These never escape the assembler; they are reported to the diagnostic
/// sink and then turned into an omission, a fallback value or a dropped
/// record depending on the field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A non-zero string index points past the end of the string table
    #[error("string index {index} out of range ({available} strings available)")]
    StringIndexOutOfRange { index: u8, available: usize },
    /// A fixed-offset read runs past the end of the buffer
    #[error("read of {width} byte(s) at offset {offset:#04x} exceeds buffer of {len} bytes")]
    BufferTooShort {
        offset: usize,
        width: usize,
        len: usize,
    },
    /// A device-tree property the field depends on is absent
    #[error("property '{0}' not present")]
    MissingProperty(String),
    /// A device-tree property has fewer entries than there are modules
    #[error("property '{property}' has {count} entries, no entry for module {module}")]
    AlignmentMismatch {
        property: String,
        module: usize,
        count: usize,
    },
    /// A value was present but could not be interpreted
    #[error("malformed value: {0}")]
    MalformedValue(String),
}

/// Domain-level errors that don't expose infrastructure details
#[derive(Debug, Clone)]
pub enum DomainError {
    /// Invalid configuration provided
    InvalidConfiguration(String),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::InvalidConfiguration(msg) => {
                write!(f, "Invalid configuration: {}", msg)
            }
        }
    }
}

impl std::error::Error for DomainError {}

/// Errors surfaced by the inventory probe service
#[derive(Debug, Clone)]
pub enum ProbeError {
    /// Raw table collection failed
    CollectionFailed(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::CollectionFailed(msg) => write!(f, "Inventory collection failed: {}", msg),
        }
    }
}

impl std::error::Error for ProbeError {}

/// Errors specific to exporting an inventory
#[derive(Debug, Clone)]
pub enum ExportError {
    /// Reading or writing the dump file failed
    IoFailed(String),
    /// Serialization failed
    SerializationFailed(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::IoFailed(msg) => write!(f, "I/O operation failed: {}", msg),
            ExportError::SerializationFailed(msg) => write!(f, "Serialization failed: {}", msg),
        }
    }
}

impl std::error::Error for ExportError {}

/// System-level errors for adapters (not exposed to domain)
#[derive(Debug, Clone)]
pub enum SystemError {
    /// Command execution failed
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    /// Permission denied
    PermissionDenied(String),
    /// I/O operation failed
    IoError(String),
    /// Parsing error
    ParseError(String),
    /// Platform has no memory table source
    Unsupported(String),
}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemError::CommandFailed {
                command,
                exit_code,
                stderr,
            } => {
                write!(f, "Command '{}' failed", command)?;
                if let Some(code) = exit_code {
                    write!(f, " with exit code {}", code)?;
                }
                if !stderr.is_empty() {
                    write!(f, ": {}", stderr)?;
                }
                Ok(())
            }
            SystemError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            SystemError::IoError(msg) => write!(f, "I/O error: {}", msg),
            SystemError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            SystemError::Unsupported(msg) => write!(f, "Unsupported platform: {}", msg),
        }
    }
}

impl std::error::Error for SystemError {}

/// Command execution errors
#[derive(Debug, Clone)]
pub enum CommandError {
    /// Command execution failed
    ExecutionFailed(String),
    /// Command did not finish in time
    TimedOut(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::ExecutionFailed(msg) => write!(f, "Command execution failed: {}", msg),
            CommandError::TimedOut(msg) => write!(f, "Command timed out: {}", msg),
        }
    }
}

impl std::error::Error for CommandError {}

/// Command failures surface from adapters as system errors
impl From<CommandError> for SystemError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::ExecutionFailed(msg) => SystemError::IoError(msg),
            CommandError::TimedOut(msg) => SystemError::CommandFailed {
                command: msg,
                exit_code: None,
                stderr: "timed out".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_messages() {
        let err = DecodeError::StringIndexOutOfRange {
            index: 5,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "string index 5 out of range (2 strings available)"
        );

        let err = DecodeError::BufferTooShort {
            offset: 0x1C,
            width: 4,
            len: 20,
        };
        assert_eq!(
            err.to_string(),
            "read of 4 byte(s) at offset 0x1c exceeds buffer of 20 bytes"
        );
    }

    #[test]
    fn test_command_failed_display() {
        let err = SystemError::CommandFailed {
            command: "od".to_string(),
            exit_code: Some(1),
            stderr: "denied".to_string(),
        };
        assert_eq!(err.to_string(), "Command 'od' failed with exit code 1: denied");
    }

    #[test]
    fn test_command_error_into_system_error() {
        let err: SystemError = CommandError::TimedOut("ioreg".to_string()).into();
        assert_eq!(err.to_string(), "Command 'ioreg' failed: timed out");

        let err: SystemError = CommandError::ExecutionFailed("spawn".to_string()).into();
        assert!(matches!(err, SystemError::IoError(msg) if msg == "spawn"));
    }
}
