//! Module definitions
//!
//! A [`ModuleDefinition`] is the root of a `module.json` document: module
//! metadata plus the models keyed by model key.

use super::model::{ModelDefinition, ModelRecord};
use crate::error::{DefinitionError, Result, require_non_empty};
use crate::query::DefinitionQuery;
use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use std::path::{Path, PathBuf};

/// A named group of models and its package metadata
#[derive(Debug, Clone)]
pub struct ModuleDefinition {
    name: String,
    pub alias: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub priority: i64,
    pub providers: Vec<String>,
    pub files: Vec<String>,
    models: IndexMap<String, ModelDefinition>,
    source: Option<PathBuf>,
}

impl ModuleDefinition {
    /// Create an empty module
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        require_non_empty("module name", &name).map_err(|_| DefinitionError::MissingModuleName)?;
        Ok(Self {
            alias: heck::AsKebabCase(&name).to_string(),
            name,
            description: String::new(),
            keywords: Vec::new(),
            priority: 0,
            providers: Vec::new(),
            files: Vec::new(),
            models: IndexMap::new(),
            source: None,
        })
    }

    /// Decode a module document, rejecting unknown field types
    pub fn from_value(value: Value) -> Result<Self> {
        Self::decode(value, false)
    }

    /// Decode a module document, coercing unknown field types to `string`
    pub fn from_value_lenient(value: Value) -> Result<Self> {
        Self::decode(value, true)
    }

    fn decode(value: Value, lenient: bool) -> Result<Self> {
        let record: ModuleRecord =
            serde_json::from_value(value).map_err(DefinitionError::InvalidShape)?;

        // `module` is the legacy identity key and wins over `name`
        let name = record
            .module
            .filter(|m| !m.trim().is_empty())
            .or(record.name.filter(|n| !n.trim().is_empty()))
            .ok_or(DefinitionError::MissingModuleName)?;

        let mut models = IndexMap::with_capacity(record.models.len());
        for (key, mut model) in record.models {
            // The map key is authoritative over any embedded key
            model.key = key.clone();
            models.insert(key, ModelDefinition::from_record(model, lenient)?);
        }

        Ok(Self {
            name,
            alias: record.alias,
            description: record.description,
            keywords: record.keywords,
            priority: record.priority,
            providers: record.providers,
            files: record.files,
            models,
            source: None,
        })
    }

    /// Encode the module document
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self.to_record()).map_err(DefinitionError::Encode)
    }

    /// Pretty-printed document with four-space indentation and a trailing newline
    pub fn to_json_string(&self) -> Result<String> {
        let mut out = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
        self.to_record()
            .serialize(&mut serializer)
            .map_err(DefinitionError::Encode)?;
        let mut text = String::from_utf8(out)
            .map_err(|e| DefinitionError::CodeGen(format!("non UTF-8 JSON output: {e}")))?;
        text.push('\n');
        Ok(text)
    }

    /// Write the document to `path`, or to the file it was loaded from
    ///
    /// Returns the path written. A successful save with an explicit path makes
    /// that path the new source.
    pub fn save(&mut self, path: Option<&Path>) -> Result<PathBuf> {
        let target = match path.map(Path::to_path_buf).or_else(|| self.source.clone()) {
            Some(target) => target,
            None => return Err(DefinitionError::NoSavePath(self.name.clone())),
        };

        let content = self.to_json_string()?;
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, content)?;
        tracing::info!(module = %self.name, path = %target.display(), "saved module definition");

        self.source = Some(target.clone());
        Ok(target)
    }

    fn to_record(&self) -> ModuleRecord {
        ModuleRecord {
            name: Some(self.name.clone()),
            module: None,
            alias: self.alias.clone(),
            description: self.description.clone(),
            keywords: self.keywords.clone(),
            priority: self.priority,
            providers: self.providers.clone(),
            files: self.files.clone(),
            models: self
                .models
                .iter()
                .map(|(key, model)| (key.clone(), model.to_record()))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        require_non_empty("module name", &name).map_err(|_| DefinitionError::MissingModuleName)?;
        self.name = name;
        Ok(())
    }

    /// File this module was loaded from or last saved to
    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn set_source_path(&mut self, path: impl Into<PathBuf>) {
        self.source = Some(path.into());
    }

    /// Insert a new model; fails when the key is taken and leaves the existing entry intact
    pub fn create_model(&mut self, model: ModelDefinition) -> Result<()> {
        if self.models.contains_key(model.key()) {
            return Err(DefinitionError::DuplicateModel(model.key().to_string()));
        }
        self.models.insert(model.key().to_string(), model);
        Ok(())
    }

    /// Insert or replace a model by key
    pub fn upsert_model(&mut self, model: ModelDefinition) {
        self.models.insert(model.key().to_string(), model);
    }

    /// Remove a model; absent keys are ignored
    pub fn delete_model(&mut self, key: &str) -> Option<ModelDefinition> {
        self.models.shift_remove(key)
    }

    /// Look up a model by key
    pub fn model(&self, key: &str) -> Result<&ModelDefinition> {
        self.models
            .get(key)
            .ok_or_else(|| DefinitionError::ModelNotFound(key.to_string()))
    }

    pub fn model_mut(&mut self, key: &str) -> Result<&mut ModelDefinition> {
        self.models
            .get_mut(key)
            .ok_or_else(|| DefinitionError::ModelNotFound(key.to_string()))
    }

    pub fn has_model(&self, key: &str) -> bool {
        self.models.contains_key(key)
    }

    /// Models in document order
    pub fn models(&self) -> impl Iterator<Item = &ModelDefinition> {
        self.models.values()
    }

    pub fn model_keys(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    /// Find a model by class name
    pub fn model_by_name(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.values().find(|m| m.name() == name)
    }

    /// Start a filter over this module's models
    pub fn query(&self) -> DefinitionQuery<'_> {
        DefinitionQuery::new(self.models.values())
    }
}

// The source path is bookkeeping, not content
impl PartialEq for ModuleDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.alias == other.alias
            && self.description == other.description
            && self.keywords == other.keywords
            && self.priority == other.priority
            && self.providers == other.providers
            && self.files == other.files
            && self.models == other.models
    }
}

/// Wire shape of a module document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ModuleRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing)]
    module: Option<String>,
    alias: String,
    description: String,
    keywords: Vec<String>,
    priority: i64,
    providers: Vec<String>,
    files: Vec<String>,
    #[serde(deserialize_with = "models_map")]
    models: IndexMap<String, ModelRecord>,
}

/// Accept `{}` or, as PHP writes an empty map, `[]`
fn models_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<IndexMap<String, ModelRecord>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Models {
        Map(IndexMap<String, ModelRecord>),
        List(Vec<Value>),
    }

    match Models::deserialize(deserializer)? {
        Models::Map(map) => Ok(map),
        Models::List(list) if list.is_empty() => Ok(IndexMap::new()),
        Models::List(_) => Err(serde::de::Error::custom(
            "`models` must be an object keyed by model key",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::field::{FieldDefinition, FieldType};
    use serde_json::json;

    fn model(key: &str, name: &str) -> ModelDefinition {
        ModelDefinition::new(key, name, "Modules\\Blog\\Models", format!("blog_{key}s"), "Blog")
            .unwrap()
    }

    fn blog() -> ModuleDefinition {
        let mut module = ModuleDefinition::new("Blog").unwrap();
        module.description = "Blog module".to_string();
        module.keywords = vec!["blog".to_string()];
        module.providers = vec!["Modules\\Blog\\Providers\\BlogServiceProvider".to_string()];
        let mut post = model("post", "Post");
        post.upsert_field(FieldDefinition::new("title", FieldType::String).unwrap());
        post.backend_mut().has_model = true;
        module.create_model(post).unwrap();
        module.create_model(model("tag", "Tag")).unwrap();
        module
    }

    #[test]
    fn test_module_key_wins_over_name() {
        let module = ModuleDefinition::from_value(json!({"module": "Blog", "name": "Other"})).unwrap();
        assert_eq!(module.name(), "Blog");

        let module = ModuleDefinition::from_value(json!({"module": "", "name": "Shop"})).unwrap();
        assert_eq!(module.name(), "Shop");
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let err = ModuleDefinition::from_value(json!({"alias": "x"})).unwrap_err();
        assert!(matches!(err, DefinitionError::MissingModuleName));
    }

    #[test]
    fn test_map_key_is_authoritative() {
        let module = ModuleDefinition::from_value(json!({
            "name": "Blog",
            "models": {
                "x": {
                    "key": "y",
                    "name": "Post",
                    "namespace": "Modules\\Blog\\Models",
                    "tableName": "blog_posts",
                    "moduleName": "Blog"
                }
            }
        }))
        .unwrap();
        assert_eq!(module.model("x").unwrap().key(), "x");
        assert!(module.model("y").is_err());
    }

    #[test]
    fn test_empty_models_array_is_accepted() {
        let module = ModuleDefinition::from_value(json!({"name": "Blog", "models": []})).unwrap();
        assert!(module.model_keys().is_empty());
    }

    #[test]
    fn test_create_model_rejects_existing_key() {
        let mut module = blog();
        let before = module.model("tag").unwrap().clone();
        let mut replacement = model("tag", "Label");
        replacement.backend_mut().has_route = true;

        let err = module.create_model(replacement).unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateModel(ref k) if k == "tag"));
        assert_eq!(module.model("tag").unwrap(), &before);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut module = blog();
        let tag = model("tag", "Tag");
        module.upsert_model(tag.clone());
        let first = module.to_json_string().unwrap();
        module.upsert_model(tag);
        assert_eq!(module.to_json_string().unwrap(), first);
    }

    #[test]
    fn test_delete_and_lookup() {
        let mut module = blog();
        assert!(module.delete_model("missing").is_none());
        assert!(module.delete_model("tag").is_some());
        let err = module.model("tag").unwrap_err();
        assert!(matches!(err, DefinitionError::ModelNotFound(_)));
    }

    #[test]
    fn test_round_trip() {
        let module = blog();
        let restored = ModuleDefinition::from_value(module.to_value().unwrap()).unwrap();
        assert_eq!(restored, module);
    }

    #[test]
    fn test_relation_descriptor_passes_through() {
        let relation = json!({
            "type": "belongsTo",
            "name": "author",
            "label": "Written by",
            "foreignKey": "author_id",
            "model": {"name": "Author", "namespace": "Modules\\Blog\\Models"}
        });
        let module = ModuleDefinition::from_value(json!({
            "name": "Blog",
            "models": {
                "post": {
                    "key": "post",
                    "name": "Post",
                    "namespace": "Modules\\Blog\\Models",
                    "tableName": "blog_posts",
                    "moduleName": "Blog",
                    "relations": [relation.clone()]
                }
            }
        }))
        .unwrap();
        let value = module.to_value().unwrap();
        assert_eq!(value["models"]["post"]["relations"][0], relation);
    }

    #[test]
    fn test_json_encoding() {
        let mut module = blog();
        module.description = "Blog ünïcode / slashes".to_string();
        let text = module.to_json_string().unwrap();
        assert!(text.starts_with("{\n    \"name\": \"Blog\""));
        assert!(text.contains("Blog ünïcode / slashes"));
        assert!(text.contains("Modules\\\\Blog\\\\Models"));
        assert!(!text.contains("\"module\""));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_save_requires_a_path() {
        let mut module = blog();
        let err = module.save(None).unwrap_err();
        assert!(matches!(err, DefinitionError::NoSavePath(_)));
    }

    #[test]
    fn test_save_remembers_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Blog").join("module.json");
        let mut module = blog();
        module.save(Some(&path)).unwrap();
        assert_eq!(module.source_path(), Some(path.as_path()));

        module.description = "changed".to_string();
        assert_eq!(module.save(None).unwrap(), path);
        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["description"], json!("changed"));
    }
}
