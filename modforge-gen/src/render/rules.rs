//! Validation rules for form requests
//!
//! Rule strings use the framework's pipe syntax (`required|string|max:255`)
//! and are built as opaque text. A field's `customizedType` replaces its
//! generated rule entirely.

use super::{php_string, pluralize, short_class, types::map_field_type};
use crate::definition::{FieldDefinition, ModelDefinition, Relation};
use heck::ToSnakeCase;
use indexmap::IndexMap;

/// Ordered `field => rule` map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationRules {
    rules: IndexMap<String, String>,
}

impl ValidationRules {
    /// Rules for every fillable field of `model`
    ///
    /// `belongsTo` foreign keys that are fillable get an `exists:` rule
    /// against the related table.
    pub fn for_model(model: &ModelDefinition) -> Self {
        let mut rules: IndexMap<String, String> = model
            .fields()
            .map(|field| (field.name().to_string(), field_rule(field)))
            .collect();

        for relation in model.relations() {
            let Relation::BelongsTo(descriptor) = relation else {
                continue;
            };
            let Some(fk) = descriptor.foreign_key.as_deref() else {
                continue;
            };
            let Some(field) = model.field(fk) else {
                continue;
            };
            if field.customized_type().is_some() {
                continue;
            }
            let table = match &descriptor.table {
                Some(table) => table.clone(),
                None => match descriptor.model.resolve_fqcn() {
                    Some(fqcn) => pluralize(&short_class(&fqcn).to_snake_case()),
                    None => continue,
                },
            };
            let owner = descriptor.owner_key.as_deref().unwrap_or("id");
            rules.insert(
                fk.to_string(),
                format!("{}|integer|exists:{table},{owner}", presence(field)),
            );
        }

        Self { rules }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.rules.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// `'field' => 'rule',` lines
    pub fn rule_lines(&self) -> Vec<String> {
        self.iter()
            .map(|(field, rule)| format!("{} => {},", php_string(field), php_string(rule)))
            .collect()
    }

    /// `'field.rule' => 'message',` lines for every rule with a known message
    pub fn message_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (field, rule) in self.iter() {
            for part in rule.split('|') {
                let (name, arg) = match part.split_once(':') {
                    Some((name, arg)) => (name, Some(arg)),
                    None => (part, None),
                };
                if let Some(message) = message_for(field, name, arg) {
                    lines.push(format!(
                        "{} => {},",
                        php_string(&format!("{field}.{name}")),
                        php_string(&message)
                    ));
                }
            }
        }
        lines
    }
}

/// Rule of a single field
pub fn field_rule(field: &FieldDefinition) -> String {
    if let Some(custom) = field.customized_type() {
        return custom.to_string();
    }
    format!("{}|{}", presence(field), map_field_type(field.field_type()).rule)
}

fn presence(field: &FieldDefinition) -> &'static str {
    if field.default_value().is_some() {
        "nullable"
    } else {
        "required"
    }
}

fn message_for(field: &str, rule: &str, arg: Option<&str>) -> Option<String> {
    let label = field.replace('_', " ");
    let message = match rule {
        "required" => format!("The {label} field is required."),
        "string" => format!("The {label} must be a string."),
        "max" => format!(
            "The {label} may not be greater than {} characters.",
            arg.unwrap_or_default()
        ),
        "integer" => format!("The {label} must be an integer."),
        "numeric" => format!("The {label} must be a number."),
        "boolean" => format!("The {label} field must be true or false."),
        "date" => format!("The {label} is not a valid date."),
        "array" => format!("The {label} must be an array."),
        "email" => format!("The {label} must be a valid email address."),
        "exists" => format!("The selected {label} is invalid."),
        _ => return None,
    };
    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{FieldType, RelatedModel, RelationDescriptor};
    use serde_json::json;

    fn post() -> ModelDefinition {
        let mut model =
            ModelDefinition::new("post", "Post", "Modules\\Blog\\Models", "blog_posts", "Blog").unwrap();
        model.upsert_field(FieldDefinition::new("title", FieldType::String).unwrap());
        model.upsert_field(
            FieldDefinition::new("published", FieldType::Boolean)
                .unwrap()
                .with_default(json!(false)),
        );
        model.upsert_field(
            FieldDefinition::new("email", FieldType::String)
                .unwrap()
                .with_customized_type("required|email"),
        );
        model.upsert_field(FieldDefinition::new("author_id", FieldType::Integer).unwrap());
        model
    }

    #[test]
    fn test_field_rules() {
        let rules = ValidationRules::for_model(&post());
        assert_eq!(rules.get("title"), Some("required|string|max:255"));
        assert_eq!(rules.get("published"), Some("nullable|boolean"));
        assert_eq!(rules.get("email"), Some("required|email"));
        assert_eq!(rules.get("author_id"), Some("required|integer"));
    }

    #[test]
    fn test_belongs_to_exists_rule() {
        let mut model = post();
        model.add_relation(Relation::BelongsTo(
            RelationDescriptor::new("author", RelatedModel::new("BlogAuthor", "Modules\\Blog\\Models"))
                .foreign_key("author_id"),
        ));
        let rules = ValidationRules::for_model(&model);
        assert_eq!(
            rules.get("author_id"),
            Some("required|integer|exists:blog_authors,id")
        );

        let mut model = post();
        model.add_relation(Relation::BelongsTo(
            RelationDescriptor::new("author", RelatedModel::new("Author", "App"))
                .foreign_key("author_id")
                .owner_key("uuid")
                .table("people"),
        ));
        let rules = ValidationRules::for_model(&model);
        assert_eq!(rules.get("author_id"), Some("required|integer|exists:people,uuid"));
        // order follows the fillable list
        let keys: Vec<&str> = rules.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["title", "published", "email", "author_id"]);
    }

    #[test]
    fn test_rendered_lines() {
        let rules = ValidationRules::for_model(&post());
        assert_eq!(rules.rule_lines()[0], "'title' => 'required|string|max:255',");
        let messages = rules.message_lines();
        assert!(messages.contains(&"'title.required' => 'The title field is required.',".to_string()));
        assert!(messages.contains(
            &"'title.max' => 'The title may not be greater than 255 characters.',".to_string()
        ));
        assert!(messages.contains(&"'author_id.integer' => 'The author id must be an integer.',".to_string()));
        assert!(!messages.iter().any(|m| m.starts_with("'published.nullable'")));
    }
}
