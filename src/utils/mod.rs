// Result formatting helpers

use serde_json::Value;

/// Render an agent result as response text.
///
/// Strings pass through unchanged; anything else is pretty-printed JSON, which
/// parses back to the same value.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
