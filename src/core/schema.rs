//! Declarative parameter contracts and the fail-fast validator.
//!
//! Validation stops at the first violated constraint and never coerces
//! types. Per-field checks run in a fixed order: presence, then type,
//! then range/length/pattern/enum. Schemas are closed by default;
//! fields not declared in the schema are rejected unless the schema is
//! explicitly opened.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::error::ValidationError;
use super::tool::JsonMap;

/// Type plus value constraints for one declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    String {
        #[serde(skip_serializing_if = "Option::is_none")]
        min_len: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_len: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    Integer {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Number {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    Boolean,
    Enum {
        allowed: Vec<String>,
    },
    Array,
    Object,
}

impl FieldType {
    fn expected_name(&self) -> &'static str {
        match self {
            FieldType::String { .. } => "string",
            FieldType::Integer { .. } => "integer",
            FieldType::Number { .. } => "number",
            FieldType::Boolean => "boolean",
            FieldType::Enum { .. } => "string (enum)",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }
}

/// One declared field of a parameter schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    pub constraint: FieldType,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, constraint: FieldType) -> Self {
        Self {
            name: name.into(),
            required: false,
            constraint,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldType::String {
                min_len: None,
                max_len: None,
                pattern: None,
            },
        )
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer { min: None, max: None })
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number { min: None, max: None })
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn enumeration(
        name: impl Into<String>,
        allowed: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::new(
            name,
            FieldType::Enum {
                allowed: allowed.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn array(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Array)
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Object)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn len_range(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        if let FieldType::String { min_len, max_len, .. } = &mut self.constraint {
            *min_len = min;
            *max_len = max;
        }
        self
    }

    pub fn pattern(mut self, re: impl Into<String>) -> Self {
        if let FieldType::String { pattern, .. } = &mut self.constraint {
            *pattern = Some(re.into());
        }
        self
    }

    pub fn int_range(mut self, lo: Option<i64>, hi: Option<i64>) -> Self {
        if let FieldType::Integer { min, max } = &mut self.constraint {
            *min = lo;
            *max = hi;
        }
        self
    }

    pub fn num_range(mut self, lo: Option<f64>, hi: Option<f64>) -> Self {
        if let FieldType::Number { min, max } = &mut self.constraint {
            *min = lo;
            *max = hi;
        }
        self
    }
}

/// Structural description of the arguments a tool accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub fields: Vec<FieldSpec>,
    /// Closed by default: undeclared argument keys are rejected.
    #[serde(default)]
    pub additional_fields: bool,
}

impl ParameterSchema {
    pub fn object() -> Self {
        Self {
            fields: Vec::new(),
            additional_fields: false,
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn open(mut self) -> Self {
        self.additional_fields = true;
        self
    }
}

/// Fail-fast validation of `arguments` against `schema`. Returns the
/// first violated constraint only.
pub fn validate(schema: &ParameterSchema, arguments: &JsonMap) -> Result<(), ValidationError> {
    for field in &schema.fields {
        let value = match arguments.get(&field.name) {
            Some(v) => v,
            None if field.required => {
                return Err(ValidationError::new(
                    &field.name,
                    "required",
                    "missing required field",
                ));
            }
            None => continue,
        };
        check_type(field, value)?;
        check_constraints(field, value)?;
    }

    if !schema.additional_fields {
        for key in arguments.keys() {
            if !schema.fields.iter().any(|f| &f.name == key) {
                return Err(ValidationError::new(
                    key,
                    "unknown_field",
                    "field is not declared by the tool schema",
                ));
            }
        }
    }

    Ok(())
}

fn check_type(field: &FieldSpec, value: &JsonValue) -> Result<(), ValidationError> {
    let ok = match &field.constraint {
        FieldType::String { .. } | FieldType::Enum { .. } => value.is_string(),
        FieldType::Integer { .. } => value.as_i64().is_some(),
        FieldType::Number { .. } => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Array => value.is_array(),
        FieldType::Object => value.is_object(),
    };
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new(
            &field.name,
            "type",
            format!(
                "expected {}, got {}",
                field.constraint.expected_name(),
                json_type_name(value)
            ),
        ))
    }
}

fn check_constraints(field: &FieldSpec, value: &JsonValue) -> Result<(), ValidationError> {
    match &field.constraint {
        FieldType::String {
            min_len,
            max_len,
            pattern,
        } => {
            // Type check above guarantees a string here.
            let s = value.as_str().unwrap_or_default();
            let chars = s.chars().count();
            if let Some(min) = min_len {
                if chars < *min {
                    return Err(ValidationError::new(
                        &field.name,
                        "length",
                        format!("string shorter than minimum length {min}"),
                    ));
                }
            }
            if let Some(max) = max_len {
                if chars > *max {
                    return Err(ValidationError::new(
                        &field.name,
                        "length",
                        format!("string longer than maximum length {max}"),
                    ));
                }
            }
            if let Some(p) = pattern {
                let re = Regex::new(p).map_err(|e| {
                    ValidationError::new(
                        &field.name,
                        "pattern",
                        format!("schema pattern does not compile: {e}"),
                    )
                })?;
                if !re.is_match(s) {
                    return Err(ValidationError::new(
                        &field.name,
                        "pattern",
                        format!("string does not match pattern `{p}`"),
                    ));
                }
            }
        }
        FieldType::Integer { min, max } => {
            let n = value.as_i64().unwrap_or_default();
            if min.is_some_and(|lo| n < lo) || max.is_some_and(|hi| n > hi) {
                return Err(ValidationError::new(
                    &field.name,
                    "range",
                    format!("integer {n} outside allowed range"),
                ));
            }
        }
        FieldType::Number { min, max } => {
            let n = value.as_f64().unwrap_or_default();
            if min.is_some_and(|lo| n < lo) || max.is_some_and(|hi| n > hi) {
                return Err(ValidationError::new(
                    &field.name,
                    "range",
                    format!("number {n} outside allowed range"),
                ));
            }
        }
        FieldType::Enum { allowed } => {
            let s = value.as_str().unwrap_or_default();
            if !allowed.iter().any(|a| a == s) {
                return Err(ValidationError::new(
                    &field.name,
                    "enum",
                    format!("value `{s}` is not one of {allowed:?}"),
                ));
            }
        }
        FieldType::Boolean | FieldType::Array | FieldType::Object => {}
    }
    Ok(())
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
