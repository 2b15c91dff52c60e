//! Response schema descriptions.
//!
//! A [`ResponseSchema`] describes the JSON object an LLM call must produce. The
//! same description is used twice: rendered into the provider's constrained
//! output dialect when the request is built, and applied to the raw output to
//! produce a validated [`StructuredRecord`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::SchemaError;

// ---------------------------------------------------------------------------
// Schema description
// ---------------------------------------------------------------------------

/// The type (and optional constraints) of a single response field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// A string, optionally restricted to a closed set of values.
    String {
        /// Permitted values. `None` means any string is accepted.
        allowed: Option<Vec<String>>,
    },
    /// An integer, optionally bounded (both bounds inclusive).
    Integer {
        /// Inclusive lower bound.
        min: Option<i64>,
        /// Inclusive upper bound.
        max: Option<i64>,
    },
    /// An ordered list of strings.
    StringList,
}

/// A named, required field of a [`ResponseSchema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// JSON property name.
    pub name: String,
    /// Accepted values.
    pub kind: FieldKind,
}

/// Describes the object an LLM call is expected to return.
///
/// Every field is required; fields not described here are ignored during
/// validation.
///
/// ```
/// use pipeline::ResponseSchema;
///
/// let schema = ResponseSchema::new("TaskRating").integer_field("rating", Some(1), Some(5));
/// let record = schema.parse_text(r#"{"rating": 4}"#).unwrap();
/// assert_eq!(record.integer("rating"), Some(4));
/// assert!(schema.parse_text(r#"{"rating": 9}"#).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSchema {
    name: String,
    fields: Vec<FieldSpec>,
}

impl ResponseSchema {
    /// Creates an empty schema. `name` is sent to providers that require a
    /// schema name (OpenAI structured outputs).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Adds an unconstrained string field.
    pub fn string_field(self, name: impl Into<String>) -> Self {
        self.with_field(name, FieldKind::String { allowed: None })
    }

    /// Adds a string field restricted to `allowed`.
    pub fn enum_field<I, S>(self, name: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed = allowed.into_iter().map(Into::into).collect();
        self.with_field(
            name,
            FieldKind::String {
                allowed: Some(allowed),
            },
        )
    }

    /// Adds an integer field with optional inclusive bounds.
    pub fn integer_field(
        self,
        name: impl Into<String>,
        min: Option<i64>,
        max: Option<i64>,
    ) -> Self {
        self.with_field(name, FieldKind::Integer { min, max })
    }

    /// Adds a list-of-strings field.
    pub fn string_list_field(self, name: impl Into<String>) -> Self {
        self.with_field(name, FieldKind::StringList)
    }

    fn with_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
        });
        self
    }

    /// Returns the schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    // -----------------------------------------------------------------------
    // Provider dialects
    // -----------------------------------------------------------------------

    /// Renders the schema as strict JSON Schema (OpenAI structured outputs).
    ///
    /// Integer bounds are expressed as a description and enforced locally by
    /// [`ResponseSchema::validate`], since strict mode rejects range keywords
    /// on some models.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let property = match &field.kind {
                FieldKind::String { allowed: None } => json!({ "type": "string" }),
                FieldKind::String {
                    allowed: Some(values),
                } => json!({ "type": "string", "enum": values }),
                FieldKind::Integer { min, max } => {
                    let mut p = json!({ "type": "integer" });
                    if let Some(text) = range_description(*min, *max) {
                        p["description"] = Value::String(text);
                    }
                    p
                }
                FieldKind::StringList => json!({
                    "type": "array",
                    "items": { "type": "string" },
                }),
            };
            properties.insert(field.name.clone(), property);
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": self.field_names(),
            "additionalProperties": false,
        })
    }

    /// Renders the schema in the OpenAPI subset accepted by Gemini's
    /// `generationConfig.responseSchema`.
    pub fn to_openapi_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let property = match &field.kind {
                FieldKind::String { allowed: None } => json!({ "type": "STRING" }),
                FieldKind::String {
                    allowed: Some(values),
                } => json!({ "type": "STRING", "format": "enum", "enum": values }),
                FieldKind::Integer { min, max } => {
                    let mut p = json!({ "type": "INTEGER" });
                    if let Some(text) = range_description(*min, *max) {
                        p["description"] = Value::String(text);
                    }
                    p
                }
                FieldKind::StringList => json!({
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                }),
            };
            properties.insert(field.name.clone(), property);
        }

        json!({
            "type": "OBJECT",
            "properties": properties,
            "required": self.field_names(),
            "propertyOrdering": self.field_names(),
        })
    }

    fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Parses raw model text as JSON and validates it against the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidJson`] if the text is not JSON, or any
    /// other [`SchemaError`] produced by [`ResponseSchema::validate`].
    pub fn parse_text(&self, raw: &str) -> Result<StructuredRecord, SchemaError> {
        let value: Value =
            serde_json::from_str(raw.trim()).map_err(|source| SchemaError::InvalidJson {
                message: source.to_string(),
            })?;
        self.validate(value)
    }

    /// Validates an already-parsed JSON value against the schema.
    ///
    /// Integer fields given as whole-number floats (`3.0`) are normalised to
    /// integers.
    pub fn validate(&self, value: Value) -> Result<StructuredRecord, SchemaError> {
        let mut object = match value {
            Value::Object(map) => map,
            other => {
                return Err(SchemaError::NotAnObject {
                    found: json_type_name(&other),
                })
            }
        };

        for field in &self.fields {
            let slot = object
                .get_mut(&field.name)
                .ok_or_else(|| SchemaError::MissingField {
                    field: field.name.clone(),
                })?;
            if let Some(normalised) = check_field(field, slot)? {
                *slot = normalised;
            }
        }

        Ok(StructuredRecord { fields: object })
    }
}

/// Checks one field, returning a replacement value when it needs normalising.
fn check_field(field: &FieldSpec, slot: &Value) -> Result<Option<Value>, SchemaError> {
    let wrong_type = |expected: &'static str, found: &Value| SchemaError::WrongType {
        field: field.name.clone(),
        expected,
        found: json_type_name(found),
    };

    match &field.kind {
        FieldKind::String { allowed } => {
            let text = slot.as_str().ok_or_else(|| wrong_type("string", slot))?;
            if let Some(allowed) = allowed {
                if !allowed.iter().any(|a| a == text) {
                    return Err(SchemaError::NotAllowed {
                        field: field.name.clone(),
                        value: text.to_string(),
                    });
                }
            }
        }
        FieldKind::Integer { min, max } => {
            let number = as_whole_number(slot).ok_or_else(|| wrong_type("integer", slot))?;
            let below = min.is_some_and(|m| number < m);
            let above = max.is_some_and(|m| number > m);
            if below || above {
                return Err(SchemaError::OutOfRange {
                    field: field.name.clone(),
                    value: number,
                });
            }
            if !slot.is_i64() {
                return Ok(Some(Value::from(number)));
            }
        }
        FieldKind::StringList => {
            let items = slot
                .as_array()
                .ok_or_else(|| wrong_type("array of strings", slot))?;
            if let Some(bad) = items.iter().find(|item| !item.is_string()) {
                return Err(wrong_type("array of strings", bad));
            }
        }
    }
    Ok(None)
}

fn as_whole_number(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn range_description(min: Option<i64>, max: Option<i64>) -> Option<String> {
    match (min, max) {
        (Some(lo), Some(hi)) => Some(format!("Integer between {lo} and {hi} inclusive")),
        (Some(lo), None) => Some(format!("Integer of at least {lo}")),
        (None, Some(hi)) => Some(format!("Integer of at most {hi}")),
        (None, None) => None,
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

// ---------------------------------------------------------------------------
// Validated output
// ---------------------------------------------------------------------------

/// A JSON object that has passed [`ResponseSchema::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRecord {
    fields: Map<String, Value>,
}

impl StructuredRecord {
    /// Returns a string field.
    pub fn string(&self, field: &str) -> Option<&str> {
        self.fields.get(field)?.as_str()
    }

    /// Returns an integer field.
    pub fn integer(&self, field: &str) -> Option<i64> {
        self.fields.get(field)?.as_i64()
    }

    /// Returns a list-of-strings field.
    pub fn string_list(&self, field: &str) -> Option<Vec<&str>> {
        self.fields
            .get(field)?
            .as_array()?
            .iter()
            .map(Value::as_str)
            .collect()
    }
}
