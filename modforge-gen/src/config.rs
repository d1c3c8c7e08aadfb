//! Project configuration (`modforge.toml`)
//!
//! Every key is optional. A missing file means all defaults.

use crate::discovery::{DEFAULT_IGNORE_DIRS, DEFAULT_PATTERNS, DefinitionDiscovery, DuplicatePolicy};
use crate::error::{DefinitionError, Result};
use crate::store::LoadOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default file name looked up in the working directory
pub const CONFIG_FILE: &str = "modforge.toml";

/// Trait every generated model uses unless configured otherwise
pub const HAS_FACTORY: &str = "Illuminate\\Database\\Eloquent\\Factories\\HasFactory";

/// Settings shared by the CLI and the generators
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Directory holding one sub-directory per module
    pub modules_path: PathBuf,
    /// Root PHP namespace of modules
    pub module_namespace: String,
    /// Root of generated frontend files
    pub frontend_path: PathBuf,
    /// Directory with `<name>.stub` overrides
    pub stubs_path: Option<PathBuf>,
    /// Traits added to every generated model, fully qualified
    pub model_traits: Vec<String>,
    pub lenient_field_types: bool,
    pub discovery: DiscoveryConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            modules_path: PathBuf::from("Modules"),
            module_namespace: "Modules".to_string(),
            frontend_path: PathBuf::from("resources/js"),
            stubs_path: None,
            model_traits: vec![HAS_FACTORY.to_string()],
            lenient_field_types: false,
            discovery: DiscoveryConfig::default(),
        }
    }
}

/// The `[discovery]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    pub patterns: Vec<String>,
    pub ignore_dirs: Vec<String>,
    pub recursive: bool,
    pub on_duplicate: DuplicatePolicy,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|d| d.to_string()).collect(),
            recursive: true,
            on_duplicate: DuplicatePolicy::default(),
        }
    }
}

impl ProjectConfig {
    /// Parse a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| DefinitionError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Parse `path` when it exists, else fall back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.is_file() {
            tracing::debug!(path = %path.display(), "loading project config");
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no project config, using defaults");
            Ok(Self::default())
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            lenient_field_types: self.lenient_field_types,
        }
    }

    /// `<modules_path>/<Module>`
    pub fn module_root(&self, module: &str) -> PathBuf {
        self.modules_path.join(module)
    }

    /// `<modules_path>/<Module>/module.json`
    pub fn definition_path(&self, module: &str) -> PathBuf {
        self.module_root(module).join("module.json")
    }

    /// `<module_namespace>\<Module>`
    pub fn module_namespace(&self, module: &str) -> String {
        let root = self.module_namespace.trim_matches('\\');
        if root.is_empty() {
            module.to_string()
        } else {
            format!("{root}\\{module}")
        }
    }

    /// Namespace of the models of a module
    pub fn models_namespace(&self, module: &str) -> String {
        format!("{}\\Models", self.module_namespace(module))
    }

    /// Discovery over `roots` with the `[discovery]` settings applied
    pub fn discovery(&self, roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> DefinitionDiscovery {
        DefinitionDiscovery::new(roots)
            .patterns(self.discovery.patterns.iter().cloned())
            .ignore_dirs(self.discovery.ignore_dirs.iter().cloned())
            .recursive(self.discovery.recursive)
            .load_options(self.load_options())
    }
}
