//! Declarative argument schemas for tools.
//!
//! A [`ToolSchema`] lists each parameter with its type, optionality, default
//! and description. It renders the JSON Schema advertised in `tools/list`
//! and validates raw call arguments into [`ToolArgs`] before a handler runs.

use rmcp::model::JsonObject;
use serde_json::{Map, Value, json};

/// Caller-input errors found while validating tool arguments.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("missing required parameter `{0}`")]
    Missing(String),

    #[error("parameter `{name}` must be {expected}, got {actual}")]
    WrongType {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("parameter `{name}` must be one of [{allowed}], got \"{value}\"")]
    NotInEnum {
        name: String,
        allowed: String,
        value: String,
    },

    #[error("parameter `{name}` must be >= {minimum}, got {value}")]
    BelowMinimum {
        name: String,
        minimum: f64,
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    String,
    Number { minimum: Option<f64> },
    Boolean,
    Enum(&'static [&'static str]),
}

impl ParamKind {
    fn type_name(&self) -> &'static str {
        match self {
            ParamKind::String | ParamKind::Enum(_) => "string",
            ParamKind::Number { .. } => "number",
            ParamKind::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<Value>,
    pub description: &'static str,
}

impl ParamSpec {
    fn new(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            description,
        }
    }

    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    pub fn number(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::Number { minimum: None }, description)
    }

    pub fn boolean(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::Boolean, description)
    }

    pub fn one_of(
        name: &'static str,
        values: &'static [&'static str],
        description: &'static str,
    ) -> Self {
        Self::new(name, ParamKind::Enum(values), description)
    }

    /// Mark the parameter optional with no default.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Mark the parameter optional, filled with `value` when absent.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.required = false;
        self.default = Some(value.into());
        self
    }

    pub fn minimum(mut self, min: f64) -> Self {
        if let ParamKind::Number { minimum } = &mut self.kind {
            *minimum = Some(min);
        }
        self
    }

    fn json_schema(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), json!(self.kind.type_name()));
        match &self.kind {
            ParamKind::Enum(values) => {
                prop.insert("enum".into(), json!(values));
            }
            ParamKind::Number {
                minimum: Some(min),
            } => {
                prop.insert("minimum".into(), json!(min));
            }
            _ => {}
        }
        if let Some(default) = &self.default {
            prop.insert("default".into(), default.clone());
        }
        prop.insert("description".into(), json!(self.description));
        Value::Object(prop)
    }

    fn check(&self, value: &Value) -> Result<(), SchemaError> {
        let wrong_type = || SchemaError::WrongType {
            name: self.name.to_string(),
            expected: self.kind.type_name(),
            actual: json_type_name(value),
        };

        match &self.kind {
            ParamKind::String => value.as_str().map(|_| ()).ok_or_else(wrong_type),
            ParamKind::Boolean => value.as_bool().map(|_| ()).ok_or_else(wrong_type),
            ParamKind::Number { minimum } => {
                let n = value.as_f64().ok_or_else(wrong_type)?;
                match minimum {
                    Some(min) if n < *min => Err(SchemaError::BelowMinimum {
                        name: self.name.to_string(),
                        minimum: *min,
                        value: n,
                    }),
                    _ => Ok(()),
                }
            }
            ParamKind::Enum(allowed) => {
                let s = value.as_str().ok_or_else(wrong_type)?;
                if allowed.contains(&s) {
                    Ok(())
                } else {
                    Err(SchemaError::NotInEnum {
                        name: self.name.to_string(),
                        allowed: allowed.join(", "),
                        value: s.to_string(),
                    })
                }
            }
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Ordered parameter list for one tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolSchema {
    params: Vec<ParamSpec>,
}

impl ToolSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// JSON Schema object advertised as the tool's `inputSchema`.
    pub fn to_json_schema(&self) -> JsonObject {
        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));

        let mut properties = Map::new();
        for p in &self.params {
            properties.insert(p.name.to_string(), p.json_schema());
        }
        schema.insert("properties".to_string(), Value::Object(properties));

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();
        if !required.is_empty() {
            schema.insert("required".to_string(), json!(required));
        }
        schema
    }

    /// Validate raw arguments and fill defaults.
    ///
    /// Undeclared keys are dropped. An explicit `null` counts as absent for
    /// optional parameters.
    pub fn validate(&self, mut raw: JsonObject) -> Result<ToolArgs, SchemaError> {
        let mut values = Map::new();
        for p in &self.params {
            let value = match raw.remove(p.name) {
                Some(Value::Null) | None => None,
                Some(v) => Some(v),
            };
            match value {
                Some(v) => {
                    p.check(&v)?;
                    values.insert(p.name.to_string(), v);
                }
                None if p.required => return Err(SchemaError::Missing(p.name.to_string())),
                None => {
                    if let Some(default) = &p.default {
                        values.insert(p.name.to_string(), default.clone());
                    }
                }
            }
        }
        Ok(ToolArgs { values })
    }
}

/// Validated arguments. Accessors assume the schema already checked types,
/// so a mismatch reads as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    values: Map<String, Value>,
}

impl ToolArgs {
    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// Required string; empty when absent.
    pub fn str(&self, name: &str) -> &str {
        self.opt_str(name).unwrap_or_default()
    }

    pub fn opt_f64(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    /// Boolean flag; `false` when absent.
    pub fn flag(&self, name: &str) -> bool {
        self.values
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
