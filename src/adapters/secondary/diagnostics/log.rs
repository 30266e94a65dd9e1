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

//! Diagnostic sink forwarding to the `log` facade

use crate::domain::DecodeContext;
use crate::ports::DiagnosticSink;

/// Log target for decode diagnostics, so they can be filtered with RUST_LOG
pub const DECODE_LOG_TARGET: &str = "hardware_probe::decode";

/// Reports decode failures as warnings
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnosticSink;

impl LogDiagnosticSink {
    pub fn new() -> Self {
        Self
    }
}

impl DiagnosticSink for LogDiagnosticSink {
    fn warn(&self, message: &str, context: &DecodeContext) {
        log::warn!(target: DECODE_LOG_TARGET, "{}: {}", context, message);
    }
}
