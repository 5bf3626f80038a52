//! JSON output.
//!
//! One document per invocation. Keys come out sorted because serde_json's
//! map is a `BTreeMap` unless `preserve_order` is enabled.

use serde_json::{json, Value};
use std::io::{self, Write};

/// Output formatter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// Two-space indented output instead of a single line
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// Render a document as text, without the trailing newline.
pub fn render(value: &Value, config: &OutputConfig) -> String {
    let rendered = if config.pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    // Serializing a `Value` cannot fail: keys are always strings.
    rendered.unwrap_or_default()
}

/// Write a document and a newline to stdout.
pub fn emit(value: &Value, config: &OutputConfig) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{}", render(value, config))?;
    out.flush()
}

/// Document for write commands that have nothing to read back.
pub fn ok() -> Value {
    json!({ "result": "OK" })
}
