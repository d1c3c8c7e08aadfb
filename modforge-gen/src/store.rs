//! Definition store
//!
//! [`DefinitionStore`] is the single entry and exit point between a
//! `module.json` file and its in-memory [`ModuleDefinition`].

use crate::definition::ModuleDefinition;
use crate::error::{DefinitionError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Options for loading a definition file
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Coerce unknown field type tags to `string` instead of failing
    pub lenient_field_types: bool,
}

/// Owner of one module definition and the file it came from
#[derive(Debug, Clone)]
pub struct DefinitionStore {
    module: ModuleDefinition,
}

impl DefinitionStore {
    /// Wrap an in-memory module that has no file yet
    pub fn new(module: ModuleDefinition) -> Self {
        Self { module }
    }

    /// Load a definition file with strict field types
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_with(path, LoadOptions::default())
    }

    /// Load a definition file
    ///
    /// A missing file yields [`DefinitionError::FileNotFound`]; unparsable or
    /// mis-shaped content yields [`DefinitionError::InvalidJson`].
    pub fn from_file_with(path: impl AsRef<Path>, options: LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DefinitionError::FileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let value: Value =
            serde_json::from_str(&content).map_err(|source| DefinitionError::InvalidJson {
                path: path.to_path_buf(),
                source,
            })?;

        let decoded = if options.lenient_field_types {
            ModuleDefinition::from_value_lenient(value)
        } else {
            ModuleDefinition::from_value(value)
        };
        let mut module = decoded.map_err(|e| match e {
            DefinitionError::InvalidShape(source) => DefinitionError::InvalidJson {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        module.set_source_path(path);

        tracing::debug!(module = module.name(), path = %path.display(), "loaded module definition");
        Ok(Self { module })
    }

    /// Load `path`, or start a fresh module named `name` when the file is missing
    ///
    /// Malformed files are never replaced.
    pub fn open_or_create(path: impl AsRef<Path>, name: &str, options: LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        match Self::from_file_with(path, options) {
            Err(e) if e.is_not_found() => {
                tracing::info!(path = %path.display(), "definition file missing, starting fresh");
                let mut module = ModuleDefinition::new(name)?;
                module.set_source_path(path);
                Ok(Self { module })
            }
            other => other,
        }
    }

    pub fn module(&self) -> &ModuleDefinition {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut ModuleDefinition {
        &mut self.module
    }

    pub fn into_module(self) -> ModuleDefinition {
        self.module
    }

    /// File the module was loaded from or last saved to
    pub fn path(&self) -> Option<&Path> {
        self.module.source_path()
    }

    /// Write back to the known file
    pub fn save(&mut self) -> Result<PathBuf> {
        self.module.save(None)
    }

    /// Write to `path` and remember it as the source
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<PathBuf> {
        self.module.save(Some(path.as_ref()))
    }
}
