//! Model definitions
//!
//! A [`ModelDefinition`] describes one generatable entity: its identity, the
//! ordered set of fillable fields, its relations and the feature toggles that
//! select generators.

use super::config::{BackendConfig, FrontendConfig};
use super::field::{FieldDefinition, FieldRecord};
use super::relation::Relation;
use crate::error::{DefinitionError, Result, require_non_empty};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// One generatable entity of a module
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    key: String,
    name: String,
    namespace: String,
    table_name: String,
    module_name: String,
    path: Option<String>,
    fqcn: Option<String>,
    fields: IndexMap<String, FieldDefinition>,
    relations: Vec<Relation>,
    backend: BackendConfig,
    frontend: FrontendConfig,
}

impl ModelDefinition {
    /// Create a fresh model with no fields, no relations and all toggles off
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
        table_name: impl Into<String>,
        module_name: impl Into<String>,
    ) -> Result<Self> {
        let model = Self {
            key: key.into(),
            name: name.into(),
            namespace: namespace.into(),
            table_name: table_name.into(),
            module_name: module_name.into(),
            path: None,
            fqcn: None,
            fields: IndexMap::new(),
            relations: Vec::new(),
            backend: BackendConfig::default(),
            frontend: FrontendConfig::default(),
        };
        model.validate_identity()?;
        Ok(model)
    }

    /// Decode a model from its wire shape, rejecting unknown field types
    pub fn from_value(value: Value) -> Result<Self> {
        let record: ModelRecord =
            serde_json::from_value(value).map_err(DefinitionError::InvalidShape)?;
        Self::from_record(record, false)
    }

    /// Encode the model to its wire shape
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self.to_record()).map_err(DefinitionError::Encode)
    }

    pub(crate) fn from_record(record: ModelRecord, lenient: bool) -> Result<Self> {
        let mut model = Self::new(
            record.key,
            record.name,
            record.namespace,
            record.table_name,
            record.module_name,
        )?;
        model.path = record.path.filter(|p| !p.is_empty());
        model.fqcn = record.fqcn.filter(|f| !f.is_empty());
        for field in record.fillable {
            let field = if lenient {
                FieldDefinition::from_record_lenient(field)?
            } else {
                FieldDefinition::from_record(field)?
            };
            model.upsert_field(field);
        }
        model.relations = record.relations;
        model.backend = record.backend;
        model.frontend = record.frontend;
        Ok(model)
    }

    pub(crate) fn to_record(&self) -> ModelRecord {
        ModelRecord {
            name: self.name.clone(),
            key: self.key.clone(),
            namespace: self.namespace.clone(),
            table_name: self.table_name.clone(),
            module_name: self.module_name.clone(),
            fillable: self.fields.values().map(FieldDefinition::to_record).collect(),
            relations: self.relations.clone(),
            path: self.path.clone(),
            fqcn: self.fqcn.clone(),
            backend: self.backend.clone(),
            frontend: self.frontend.clone(),
        }
    }

    fn validate_identity(&self) -> Result<()> {
        require_non_empty("key", &self.key)?;
        require_non_empty("name", &self.name)?;
        require_non_empty("namespace", &self.namespace)?;
        require_non_empty("tableName", &self.table_name)?;
        require_non_empty("moduleName", &self.module_name)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Target file path, once resolved
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Stored fully-qualified class name, once resolved
    pub fn fqcn(&self) -> Option<&str> {
        self.fqcn.as_deref()
    }

    /// Stored FQCN, or `namespace\name` when none is stored yet
    pub fn class_fqcn(&self) -> String {
        match &self.fqcn {
            Some(fqcn) => fqcn.trim_start_matches('\\').to_string(),
            None => format!("{}\\{}", self.namespace.trim_matches('\\'), self.name),
        }
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = Some(path.into());
    }

    pub fn set_fqcn(&mut self, fqcn: impl Into<String>) {
        self.fqcn = Some(fqcn.into());
    }

    pub(crate) fn set_key(&mut self, key: String) -> Result<()> {
        require_non_empty("key", &key)?;
        self.key = key;
        Ok(())
    }

    /// Insert a new field; fails when the name is taken
    pub fn add_field(&mut self, field: FieldDefinition) -> Result<()> {
        if self.fields.contains_key(field.name()) {
            return Err(DefinitionError::DuplicateField {
                model: self.key.clone(),
                field: field.name().to_string(),
            });
        }
        self.fields.insert(field.name().to_string(), field);
        Ok(())
    }

    /// Insert or replace a field by name
    pub fn upsert_field(&mut self, field: FieldDefinition) {
        self.fields.insert(field.name().to_string(), field);
    }

    /// Remove a field; absent names are ignored
    pub fn remove_field(&mut self, name: &str) -> Option<FieldDefinition> {
        self.fields.shift_remove(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldDefinition> {
        self.fields.get_mut(name)
    }

    /// Fields in insertion order
    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.values()
    }

    /// Field names in insertion order; this is the generated-code order
    pub fn fillable_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn add_relation(&mut self, relation: Relation) {
        self.relations.push(relation);
    }

    pub fn set_relations(&mut self, relations: Vec<Relation>) {
        self.relations = relations;
    }

    pub fn backend(&self) -> &BackendConfig {
        &self.backend
    }

    /// Exclusive access to the backend toggles
    pub fn backend_mut(&mut self) -> &mut BackendConfig {
        &mut self.backend
    }

    /// Replace the backend toggles wholesale
    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn frontend(&self) -> &FrontendConfig {
        &self.frontend
    }

    /// Exclusive access to the frontend toggles
    pub fn frontend_mut(&mut self) -> &mut FrontendConfig {
        &mut self.frontend
    }

    /// Replace the frontend toggles wholesale
    pub fn with_frontend(mut self, frontend: FrontendConfig) -> Self {
        self.frontend = frontend;
        self
    }
}

impl Serialize for ModelDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ModelDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let record = ModelRecord::deserialize(deserializer)?;
        ModelDefinition::from_record(record, false).map_err(serde::de::Error::custom)
    }
}

/// Wire shape of a model entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ModelRecord {
    pub name: String,
    pub key: String,
    pub namespace: String,
    pub table_name: String,
    pub module_name: String,
    pub fillable: Vec<FieldRecord>,
    pub relations: Vec<Relation>,
    pub path: Option<String>,
    pub fqcn: Option<String>,
    pub backend: BackendConfig,
    pub frontend: FrontendConfig,
}
