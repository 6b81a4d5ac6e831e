//! Declared argument schemas and their validation.

use crate::error::{Result, ToolError};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

/// JSON type of a tool argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldKind {
    fn as_str(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
        }
    }

    /// Check `value` against this kind, normalizing integral floats to integers.
    fn coerce(self, value: &Value) -> Option<Value> {
        match self {
            FieldKind::String if value.is_string() => Some(value.clone()),
            FieldKind::Integer if value.is_i64() || value.is_u64() => Some(value.clone()),
            FieldKind::Integer => value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| json!(f as i64)),
            FieldKind::Number if value.is_number() => Some(value.clone()),
            FieldKind::Boolean if value.is_boolean() => Some(value.clone()),
            FieldKind::Array if value.is_array() => Some(value.clone()),
            FieldKind::Object if value.is_object() => Some(value.clone()),
            _ => None,
        }
    }
}

/// One declared argument.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    /// Description shown to the calling model.
    pub description: String,
    pub default: Option<Value>,
    /// Allowed values; empty means unrestricted.
    pub allowed: Vec<Value>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    /// Reject empty strings and arrays.
    pub non_empty: bool,
    /// Element kind for array fields.
    pub items: Option<FieldKind>,
}

impl FieldSpec {
    /// A required argument.
    pub fn required(name: &str, kind: FieldKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
            default: None,
            allowed: Vec::new(),
            minimum: None,
            maximum: None,
            non_empty: false,
            items: None,
        }
    }

    /// An optional argument.
    pub fn optional(name: &str, kind: FieldKind, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }

    /// Value used when the caller omits the field.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Restrict the field to an enumerated set.
    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    /// Inclusive numeric bounds.
    pub fn range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    pub fn non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }

    /// Require every element of an array field to be of `kind`.
    pub fn items(mut self, kind: FieldKind) -> Self {
        self.items = Some(kind);
        self
    }

    fn check(&self, raw: &Value) -> Result<Value> {
        let mut value = self.kind.coerce(raw).ok_or_else(|| {
            ToolError::invalid(&self.name, format!("expected {}", self.kind.as_str()))
        })?;

        if let (Some(kind), Value::Array(elements)) = (self.items, &mut value) {
            for (i, element) in elements.iter_mut().enumerate() {
                *element = kind.coerce(element).ok_or_else(|| {
                    ToolError::invalid(
                        &self.name,
                        format!("element {} is not {}", i + 1, kind.as_str()),
                    )
                })?;
            }
        }

        if self.non_empty {
            let empty = match &value {
                Value::String(s) => s.trim().is_empty(),
                Value::Array(a) => a.is_empty(),
                _ => false,
            };
            if empty {
                return Err(ToolError::invalid(&self.name, "must not be empty"));
            }
        }

        if !self.allowed.is_empty() && !self.allowed.iter().any(|a| values_equal(a, &value)) {
            let options = self
                .allowed
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ToolError::invalid(
                &self.name,
                format!("must be one of: {}", options),
            ));
        }

        if let Some(n) = value.as_f64() {
            if self.minimum.is_some_and(|min| n < min) || self.maximum.is_some_and(|max| n > max) {
                return Err(ToolError::invalid(
                    &self.name,
                    format!(
                        "must be between {} and {}",
                        self.minimum.unwrap_or(f64::MIN),
                        self.maximum.unwrap_or(f64::MAX)
                    ),
                ));
            }
        }

        Ok(value)
    }

    fn to_json_schema(&self) -> Value {
        let mut prop = json!({
            "type": self.kind.as_str(),
            "description": self.description,
        });
        if !self.allowed.is_empty() {
            prop["enum"] = Value::Array(self.allowed.clone());
        }
        if let Some(kind) = self.items {
            prop["items"] = json!({ "type": kind.as_str() });
        }
        if let Some(default) = &self.default {
            prop["default"] = default.clone();
        }
        if let Some(min) = self.minimum {
            prop["minimum"] = json!(min);
        }
        if let Some(max) = self.maximum {
            prop["maximum"] = json!(max);
        }
        prop
    }
}

/// Numbers compare by value so `1024` matches `1024.0`.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// The declared argument schema of one tool.
#[derive(Debug, Clone, Default)]
pub struct ToolSchema {
    pub fields: Vec<FieldSpec>,
}

impl ToolSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Validate raw arguments and return the normalized argument object.
    ///
    /// Defaults are filled in, undeclared keys are dropped, and the first
    /// violation fails with [`ToolError::InvalidArgument`] naming the field.
    pub fn validate(&self, raw: &Value) -> Result<Value> {
        let empty = Map::new();
        let input = match raw {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err(ToolError::invalid("arguments", "expected an object")),
        };

        let mut output = Map::new();
        for field in &self.fields {
            match input.get(&field.name) {
                None | Some(Value::Null) => {
                    if let Some(default) = &field.default {
                        output.insert(field.name.clone(), default.clone());
                    } else if field.required {
                        return Err(ToolError::invalid(&field.name, "missing required field"));
                    }
                }
                Some(value) => {
                    output.insert(field.name.clone(), field.check(value)?);
                }
            }
        }

        for key in input.keys() {
            if !self.fields.iter().any(|f| &f.name == key) {
                debug!("Ignoring undeclared argument '{}'", key);
            }
        }

        Ok(Value::Object(output))
    }

    /// Render the schema as a JSON Schema object for the calling model.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in &self.fields {
            properties.insert(field.name.clone(), field.to_json_schema());
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}
