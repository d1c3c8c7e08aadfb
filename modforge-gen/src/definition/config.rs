//! Feature toggles attached to a model
//!
//! These bundles decide which generators run for a model. They carry no
//! invariants beyond their types; missing keys deserialize to `false`/empty.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Backend generation switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendConfig {
    pub has_model: bool,
    pub has_controller: bool,
    pub has_request: bool,
    pub has_route: bool,
    pub has_permission: bool,
    /// Route prefix for the API resource, e.g. `blog-posts`
    pub api_route: Option<String>,
}

/// CASL abilities exported to the frontend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaslPermissions {
    pub create: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
    pub access: bool,
}

impl CaslPermissions {
    /// Enabled abilities in canonical order
    pub fn enabled(&self) -> Vec<&'static str> {
        [
            ("access", self.access),
            ("create", self.create),
            ("read", self.read),
            ("update", self.update),
            ("delete", self.delete),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect()
    }
}

/// Frontend generation switches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrontendConfig {
    pub has_type: bool,
    pub has_api: bool,
    pub has_lang: bool,
    pub has_add_or_edit_component: bool,
    pub has_read_component: bool,
    pub has_index: bool,
    pub has_menu: bool,
    pub has_permission: bool,
    /// Free-form field list consumed by the frontend generators
    pub fields: Vec<Value>,
    pub casl: CaslPermissions,
}

impl FrontendConfig {
    /// Names of the frontend fields, skipping entries without a usable name
    ///
    /// Entries may be plain strings or objects with a `name` key.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter_map(|f| match f {
                Value::String(name) => Some(name.as_str()),
                Value::Object(map) => map.get("name").and_then(Value::as_str),
                _ => None,
            })
            .collect()
    }

    /// Whether any frontend generator is switched on
    pub fn any(&self) -> bool {
        self.has_type
            || self.has_api
            || self.has_lang
            || self.has_add_or_edit_component
            || self.has_read_component
            || self.has_index
            || self.has_menu
            || self.has_permission
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_keys_default_to_false() {
        let backend: BackendConfig = serde_json::from_value(json!({"hasModel": true})).unwrap();
        assert!(backend.has_model);
        assert!(!backend.has_controller);
        assert_eq!(backend.api_route, None);

        let frontend: FrontendConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(frontend, FrontendConfig::default());
    }

    #[test]
    fn test_wire_names() {
        let value = serde_json::to_value(FrontendConfig {
            has_add_or_edit_component: true,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(value["hasAddOrEditComponent"], json!(true));
        assert_eq!(value["casl"]["access"], json!(false));
    }

    #[test]
    fn test_field_names_accept_strings_and_objects() {
        let frontend = FrontendConfig {
            fields: vec![json!("title"), json!({"name": "body"}), json!(42)],
            ..Default::default()
        };
        assert_eq!(frontend.field_names(), vec!["title", "body"]);
    }

    #[test]
    fn test_enabled_abilities() {
        let casl = CaslPermissions {
            read: true,
            delete: true,
            ..Default::default()
        };
        assert_eq!(casl.enabled(), vec!["read", "delete"]);
    }
}
