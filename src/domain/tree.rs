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

//! Box-drawing tree rendering of serialized inventory sections

use serde_json::Value;

const ROOT: &str = "─ ";
const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const CONTINUATION: &str = "│   ";
const BLANK: &str = "    ";

/// Render a serialized value as an indented tree
///
/// Objects become branches and scalars become `key: value` leaves. Objects
/// inside arrays are flattened into their parent, so a list of memory
/// records renders as one branch per record key. Object keys keep their
/// insertion order, which for serialized structs is field order.
///
/// # Arguments
/// * `name` - Label of the root node
/// * `value` - Section to render
///
/// # Returns
/// * The tree, one node per line, each line newline-terminated
pub fn render_tree(name: &str, value: &Value) -> String {
    match value {
        Value::Object(_) | Value::Array(_) => {
            let mut output = format!("{ROOT}{name}\n");
            render_children(&mut output, &children(value), "  ");
            output
        }
        scalar => format!("{ROOT}{name}: {}\n", scalar_text(scalar)),
    }
}

fn children(value: &Value) -> Vec<(Option<&str>, &Value)> {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (Some(k.as_str()), v)).collect(),
        Value::Array(items) => items
            .iter()
            .flat_map(|item| match item {
                Value::Object(map) => map
                    .iter()
                    .map(|(k, v)| (Some(k.as_str()), v))
                    .collect::<Vec<_>>(),
                other => vec![(None, other)],
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn render_children(output: &mut String, nodes: &[(Option<&str>, &Value)], prefix: &str) {
    for (i, (key, value)) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let connector = if last { LAST_BRANCH } else { BRANCH };

        match (key, value) {
            (_, Value::Object(_) | Value::Array(_)) => {
                output.push_str(&format!("{prefix}{connector}{}\n", key.unwrap_or_default()));
                let nested = format!("{prefix}{}", if last { BLANK } else { CONTINUATION });
                render_children(output, &children(value), &nested);
            }
            (Some(key), scalar) => {
                output.push_str(&format!("{prefix}{connector}{key}: {}\n", scalar_text(scalar)));
            }
            (None, scalar) => {
                output.push_str(&format!("{prefix}{connector}{}\n", scalar_text(scalar)));
            }
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
