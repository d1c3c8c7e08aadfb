//! Fillable field definitions
//!
//! A [`FieldDefinition`] is one mass-assignable column of a model, tagged with
//! a [`FieldType`] that drives validation rules, casts and frontend types.

use crate::error::{DefinitionError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

static FIELD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("field name pattern"));

/// Scalar kind of a fillable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldType {
    /// Short string (`VARCHAR`)
    #[default]
    String,
    /// Long text
    Text,
    /// Integer number
    Integer,
    /// Floating point number
    Float,
    /// Boolean flag
    Boolean,
    /// Calendar date
    Date,
    /// Date and time
    Datetime,
    /// Arbitrary JSON document
    Json,
}

impl FieldType {
    /// Every field type, in menu order
    pub const ALL: [FieldType; 8] = [
        FieldType::String,
        FieldType::Text,
        FieldType::Integer,
        FieldType::Float,
        FieldType::Boolean,
        FieldType::Date,
        FieldType::Datetime,
        FieldType::Json,
    ];

    /// Wire tag of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Json => "json",
        }
    }

    /// Parse a tag, falling back to [`FieldType::String`] for unknown tags
    pub fn parse_lenient(tag: &str) -> FieldType {
        tag.parse().unwrap_or_else(|_| {
            tracing::warn!(tag, "unknown field type, using string");
            FieldType::String
        })
    }
}

impl FromStr for FieldType {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self> {
        FieldType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DefinitionError::UnknownFieldType(s.to_string()))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fillable column of a model
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    name: String,
    field_type: FieldType,
    default_value: Option<Value>,
    customized_type: Option<String>,
}

impl FieldDefinition {
    /// Create a field with no default and no customized type
    ///
    /// Fails when `name` is not an identifier.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Result<Self> {
        let name = name.into();
        if !FIELD_NAME.is_match(&name) {
            return Err(DefinitionError::InvalidFieldName(name));
        }
        Ok(Self {
            name,
            field_type,
            default_value: None,
            customized_type: None,
        })
    }

    /// Set the default value
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.set_default(Some(value.into()));
        self
    }

    /// Set the customized type
    pub fn with_customized_type(mut self, customized: impl Into<String>) -> Self {
        self.customized_type = Some(customized.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    /// Literal override for the generated validation/type rule
    pub fn customized_type(&self) -> Option<&str> {
        self.customized_type.as_deref()
    }

    pub fn set_type(&mut self, field_type: FieldType) {
        self.field_type = field_type;
    }

    /// Replace the default value; `Some(Value::Null)` clears it
    pub fn set_default(&mut self, value: Option<Value>) {
        self.default_value = value.filter(|v| !v.is_null());
    }

    pub fn set_customized_type(&mut self, customized: Option<String>) {
        self.customized_type = customized.filter(|c| !c.is_empty());
    }

    /// Build from the wire record, rejecting unknown type tags
    pub(crate) fn from_record(record: FieldRecord) -> Result<Self> {
        let field_type = record.field_type.parse()?;
        Self::from_parts(record, field_type)
    }

    /// Build from the wire record, coercing unknown type tags to `string`
    pub(crate) fn from_record_lenient(record: FieldRecord) -> Result<Self> {
        let field_type = FieldType::parse_lenient(&record.field_type);
        Self::from_parts(record, field_type)
    }

    fn from_parts(record: FieldRecord, field_type: FieldType) -> Result<Self> {
        let mut field = FieldDefinition::new(record.name, field_type)?;
        field.set_default(record.default_value);
        field.set_customized_type(record.customized_type);
        Ok(field)
    }

    pub(crate) fn to_record(&self) -> FieldRecord {
        FieldRecord {
            name: self.name.clone(),
            field_type: self.field_type.as_str().to_string(),
            default_value: self.default_value.clone(),
            customized_type: self.customized_type.clone(),
        }
    }
}

/// Wire shape of one `fillable` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FieldRecord {
    pub name: String,
    #[serde(rename = "type", default = "default_type_tag")]
    pub field_type: String,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub customized_type: Option<String>,
}

fn default_type_tag() -> String {
    FieldType::String.as_str().to_string()
}
