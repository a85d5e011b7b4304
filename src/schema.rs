//! Shape declarations and validation for data crossing the inference boundary
//!
//! Every flow declares the shape of its request and of its response.
//! Requests are checked before the external call, replies after it.
//! Nothing is coerced: a reply that does not fit is rejected outright.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::fmt;

use crate::media::MediaRef;

/// Primitive kinds a field may take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    /// Finite number in [0, 1]
    UnitInterval,
    Boolean,
    TextList,
    /// `data:<mime>;base64,<payload>` reference
    Media,
}

impl FieldKind {
    fn label(&self) -> &'static str {
        match self {
            FieldKind::Text => "string",
            FieldKind::Number => "number",
            FieldKind::UnitInterval => "number in [0, 1]",
            FieldKind::Boolean => "boolean",
            FieldKind::TextList => "array of strings",
            FieldKind::Media => "media data URI",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldShape {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Steers the external capability when the shape is sent as a response schema
    pub description: &'static str,
    pub required: bool,
}

impl FieldShape {
    pub fn required(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
        }
    }

    pub fn optional(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShapeDeclaration {
    pub name: &'static str,
    pub fields: Vec<FieldShape>,
}

/// Reason a candidate value does not conform to a shape
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeViolation {
    pub shape: &'static str,
    pub field: Option<&'static str>,
    pub message: String,
}

impl fmt::Display for ShapeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            Some(field) => write!(f, "{}.{}: {}", self.shape, field, self.message),
            None => write!(f, "{}: {}", self.shape, self.message),
        }
    }
}

impl ShapeDeclaration {
    pub fn new(name: &'static str, fields: Vec<FieldShape>) -> Self {
        Self { name, fields }
    }

    fn violation(&self, field: Option<&'static str>, message: impl Into<String>) -> ShapeViolation {
        ShapeViolation {
            shape: self.name,
            field,
            message: message.into(),
        }
    }

    /// Structural check of a candidate value against this shape
    pub fn validate(&self, candidate: &Value) -> Result<(), ShapeViolation> {
        let object = candidate
            .as_object()
            .ok_or_else(|| self.violation(None, format!("expected object, got {}", type_name(candidate))))?;

        for field in &self.fields {
            match object.get(field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        return Err(self.violation(Some(field.name), "missing required field"));
                    }
                }
                Some(value) => {
                    check_kind(field.kind, value)
                        .map_err(|message| self.violation(Some(field.name), message))?;
                }
            }
        }

        Ok(())
    }

    /// Validate, then deserialize into the typed record
    pub fn conform<T: DeserializeOwned>(&self, candidate: Value) -> Result<T, ShapeViolation> {
        self.validate(&candidate)?;
        serde_json::from_value(candidate).map_err(|e| self.violation(None, e.to_string()))
    }

    /// Render as a Gemini `response_schema` object
    pub fn to_response_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in &self.fields {
            let property = match field.kind {
                FieldKind::Text | FieldKind::Media => json!({
                    "type": "STRING",
                    "description": field.description,
                }),
                FieldKind::Number | FieldKind::UnitInterval => json!({
                    "type": "NUMBER",
                    "description": field.description,
                }),
                FieldKind::Boolean => json!({
                    "type": "BOOLEAN",
                    "description": field.description,
                }),
                FieldKind::TextList => json!({
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": field.description,
                }),
            };
            properties.insert(field.name.to_string(), property);

            if field.required {
                required.push(Value::String(field.name.to_string()));
            }
        }

        json!({
            "type": "OBJECT",
            "properties": properties,
            "required": required,
        })
    }

    /// Human-readable field list, appended to prompts
    pub fn describe(&self) -> String {
        self.fields
            .iter()
            .map(|f| format!("- {} ({}): {}", f.name, f.kind.label(), f.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn check_kind(kind: FieldKind, value: &Value) -> Result<(), String> {
    let mismatch = || format!("expected {}, got {}", kind.label(), type_name(value));

    match kind {
        FieldKind::Text => value.as_str().map(|_| ()).ok_or_else(mismatch),
        FieldKind::Boolean => value.as_bool().map(|_| ()).ok_or_else(mismatch),
        FieldKind::Number => {
            let n = value.as_f64().ok_or_else(mismatch)?;
            if n.is_finite() {
                Ok(())
            } else {
                Err(mismatch())
            }
        }
        FieldKind::UnitInterval => {
            let n = value.as_f64().ok_or_else(mismatch)?;
            if (0.0..=1.0).contains(&n) {
                Ok(())
            } else {
                Err(format!("{} is outside [0, 1]", n))
            }
        }
        FieldKind::TextList => {
            let items = value.as_array().ok_or_else(mismatch)?;
            match items.iter().position(|v| !v.is_string()) {
                Some(index) => Err(format!("element {} is not a string", index)),
                None => Ok(()),
            }
        }
        FieldKind::Media => {
            let uri = value.as_str().ok_or_else(mismatch)?;
            MediaRef::parse(uri)
                .map(|_| ())
                .map_err(|e| format!("invalid media reference: {}", e))
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
