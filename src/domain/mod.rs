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

//! Domain layer: entities, errors and pure decoding logic
//!
//! Nothing in this module performs I/O. Raw tables come in through the
//! [`MemoryTableSource`](crate::ports::MemoryTableSource) port and decoded
//! inventories leave through the primary port.

pub mod entities;
pub mod errors;
pub mod parsers;
pub mod services;
pub mod tree;

pub use entities::*;
pub use errors::*;
pub use parsers::*;
pub use services::*;
pub use tree::*;
