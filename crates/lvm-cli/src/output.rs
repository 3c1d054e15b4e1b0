//! Output formatting

use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Output builder: a JSON object in `--json` mode, a plain message otherwise
pub struct Output {
    json_mode: bool,
    fields: BTreeMap<String, Value>,
    lines: Vec<String>,
}

impl Output {
    /// Create a new output builder
    pub fn new(json_mode: bool) -> Self {
        Self {
            json_mode,
            fields: BTreeMap::new(),
            lines: Vec::new(),
        }
    }

    /// Add a string field
    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Add a u64 field
    pub fn field_u64(mut self, key: &str, value: u64) -> Self {
        self.fields.insert(key.to_string(), Value::Number(value.into()));
        self
    }

    /// Add a JSON value field
    pub fn field_value(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Append a line to the human-readable message
    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    /// Render without printing
    pub fn render(&self) -> String {
        if self.json_mode {
            serde_json::to_string_pretty(&json!(self.fields)).unwrap_or_default()
        } else {
            self.lines.join("\n")
        }
    }

    /// Print the output
    pub fn print(self) {
        let rendered = self.render();
        if !rendered.is_empty() {
            println!("{}", rendered);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_mode_renders_fields() {
        let out = Output::new(true)
            .field("output", "0x14")
            .field_u64("gas_used", 18)
            .line("ignored");
        let value: Value = serde_json::from_str(&out.render()).unwrap();
        assert_eq!(value["output"], "0x14");
        assert_eq!(value["gas_used"], 18);
    }

    #[test]
    fn test_text_mode_joins_lines() {
        let out = Output::new(false).field("k", "v").line("a").line("b");
        assert_eq!(out.render(), "a\nb");
    }
}
