//! modforge-gen
//!
//! Definition model and stub-based code generators for modular PHP
//! applications.
//!
//! A module is described by one `module.json` document. This crate:
//! - loads and saves that document ([`DefinitionStore`])
//! - filters models with dot-path predicates ([`DefinitionQuery`])
//! - aggregates many documents ([`DefinitionDiscovery`])
//! - renders relation methods, imports and validation rules ([`render`])
//! - merges generated code into existing classes ([`ModelPatcher`])
//! - writes backend and frontend files from stubs ([`generate`])

pub mod config;
pub mod definition;
pub mod discovery;
mod error;
pub mod fs;
pub mod generate;
pub mod patcher;
pub mod query;
pub mod render;
pub mod store;

pub use config::ProjectConfig;
pub use definition::{
    BackendConfig, CaslPermissions, FieldDefinition, FieldType, FrontendConfig, ModelDefinition,
    ModuleDefinition, PivotKeys, RelatedModel, Relation, RelationDescriptor, RelationKind,
};
pub use discovery::{DefinitionDiscovery, DuplicatePolicy};
pub use error::{DefinitionError, Result};
pub use patcher::ModelPatcher;
pub use query::{DefinitionQuery, Operator};
pub use store::{DefinitionStore, LoadOptions};
