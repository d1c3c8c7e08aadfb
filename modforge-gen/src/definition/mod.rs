//! The definition model
//!
//! Typed in-memory form of a `module.json` document:
//! - [`ModuleDefinition`]: module metadata and models keyed by model key
//! - [`ModelDefinition`]: one entity with fields, relations and toggles
//! - [`FieldDefinition`] / [`FieldType`]: fillable columns
//! - [`Relation`]: typed relation descriptors
//! - [`BackendConfig`] / [`FrontendConfig`] / [`CaslPermissions`]: generator toggles

mod config;
mod field;
mod model;
mod module;
mod relation;

pub use config::{BackendConfig, CaslPermissions, FrontendConfig};
pub use field::{FieldDefinition, FieldType};
pub use model::ModelDefinition;
pub use module::ModuleDefinition;
pub use relation::{PivotKeys, RelatedModel, Relation, RelationDescriptor, RelationKind};
