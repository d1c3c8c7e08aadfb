//! Type mapping for field types
//!
//! Maps a [`FieldType`] to the PHP cast, TypeScript type, form input and
//! base validation rule used by the generators, and maps SQL column types
//! back to a [`FieldType`] when reading a schema.

use crate::definition::{FieldDefinition, FieldType};
use serde_json::Value;

/// Target-language representations of one field type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedType {
    /// Eloquent `$casts` entry, if the type needs one
    pub php_cast: Option<&'static str>,
    /// TypeScript type of the property
    pub ts_type: &'static str,
    /// HTML input type used by form components
    pub input: &'static str,
    /// Validation rule without presence rules
    pub rule: &'static str,
}

/// Map a field type
pub fn map_field_type(field_type: FieldType) -> MappedType {
    match field_type {
        FieldType::String => MappedType {
            php_cast: None,
            ts_type: "string",
            input: "text",
            rule: "string|max:255",
        },
        FieldType::Text => MappedType {
            php_cast: None,
            ts_type: "string",
            input: "textarea",
            rule: "string",
        },
        FieldType::Integer => MappedType {
            php_cast: Some("integer"),
            ts_type: "number",
            input: "number",
            rule: "integer",
        },
        FieldType::Float => MappedType {
            php_cast: Some("float"),
            ts_type: "number",
            input: "number",
            rule: "numeric",
        },
        FieldType::Boolean => MappedType {
            php_cast: Some("boolean"),
            ts_type: "boolean",
            input: "checkbox",
            rule: "boolean",
        },
        FieldType::Date => MappedType {
            php_cast: Some("date"),
            ts_type: "string",
            input: "date",
            rule: "date",
        },
        FieldType::Datetime => MappedType {
            php_cast: Some("datetime"),
            ts_type: "string",
            input: "datetime-local",
            rule: "date",
        },
        FieldType::Json => MappedType {
            php_cast: Some("array"),
            ts_type: "Record<string, unknown>",
            input: "textarea",
            rule: "array",
        },
    }
}

/// TypeScript literal used as the initial form value of a field
pub fn ts_initial_value(field: &FieldDefinition) -> String {
    if let Some(default) = field.default_value() {
        return serde_json::to_string(default).unwrap_or_else(|_| "null".to_string());
    }
    match field.field_type() {
        FieldType::String | FieldType::Text | FieldType::Date | FieldType::Datetime => {
            "''".to_string()
        }
        FieldType::Integer | FieldType::Float => "null".to_string(),
        FieldType::Boolean => "false".to_string(),
        FieldType::Json => "{}".to_string(),
    }
}

/// Guess a field type from a SQL column type such as `varchar(255)`
pub fn field_type_for_column(column_type: &str) -> FieldType {
    let lower = column_type.trim().to_ascii_lowercase();
    let (base, args) = match lower.split_once('(') {
        Some((base, rest)) => (base.trim(), rest.trim_end_matches(')').trim()),
        None => (lower.split_whitespace().next().unwrap_or(""), ""),
    };
    let base = base.split_whitespace().next().unwrap_or(base);

    match base {
        "tinyint" if args == "1" => FieldType::Boolean,
        "bool" | "boolean" | "bit" => FieldType::Boolean,
        "int" | "integer" | "tinyint" | "smallint" | "mediumint" | "bigint" | "serial"
        | "bigserial" | "int2" | "int4" | "int8" | "year" => FieldType::Integer,
        "decimal" | "numeric" | "float" | "double" | "real" | "float4" | "float8" | "money" => {
            FieldType::Float
        }
        "text" | "tinytext" | "mediumtext" | "longtext" | "clob" => FieldType::Text,
        "date" => FieldType::Date,
        "datetime" | "timestamp" | "timestamptz" => FieldType::Datetime,
        "json" | "jsonb" => FieldType::Json,
        _ => FieldType::String,
    }
}

/// Render a default value for a PHP `$attributes` entry
pub fn php_default(value: &Value) -> String {
    super::php_literal(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_field_type() {
        assert_eq!(map_field_type(FieldType::String).php_cast, None);
        assert_eq!(map_field_type(FieldType::Json).php_cast, Some("array"));
        assert_eq!(map_field_type(FieldType::Float).ts_type, "number");
        assert_eq!(map_field_type(FieldType::Boolean).input, "checkbox");
        assert_eq!(map_field_type(FieldType::String).rule, "string|max:255");
    }

    #[test]
    fn test_column_types() {
        assert_eq!(field_type_for_column("VARCHAR(255)"), FieldType::String);
        assert_eq!(field_type_for_column("tinyint(1)"), FieldType::Boolean);
        assert_eq!(field_type_for_column("tinyint(4)"), FieldType::Integer);
        assert_eq!(field_type_for_column("bigint unsigned"), FieldType::Integer);
        assert_eq!(field_type_for_column("decimal(8,2)"), FieldType::Float);
        assert_eq!(field_type_for_column("longtext"), FieldType::Text);
        assert_eq!(field_type_for_column("timestamp"), FieldType::Datetime);
        assert_eq!(field_type_for_column("date"), FieldType::Date);
        assert_eq!(field_type_for_column("jsonb"), FieldType::Json);
        assert_eq!(field_type_for_column("uuid"), FieldType::String);
    }

    #[test]
    fn test_initial_values() {
        let title = FieldDefinition::new("title", FieldType::String).unwrap();
        assert_eq!(ts_initial_value(&title), "''");
        let active = FieldDefinition::new("active", FieldType::Boolean)
            .unwrap()
            .with_default(json!(true));
        assert_eq!(ts_initial_value(&active), "true");
        assert_eq!(php_default(&json!("draft")), "'draft'");
    }
}
