//! Discovery of definition files across directory trees
//!
//! Walks one or more roots, collects files whose basename matches a glob
//! pattern, loads them into stores and merges the modules into one registry.

use crate::definition::ModuleDefinition;
use crate::error::{DefinitionError, Result};
use crate::store::{DefinitionStore, LoadOptions};
use glob::Pattern;
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::WalkDir;

/// Default file name patterns
pub const DEFAULT_PATTERNS: [&str; 3] = ["module.json", "*.module.json", "definition.json"];

/// Default directory basenames skipped during the walk
pub const DEFAULT_IGNORE_DIRS: [&str; 3] = ["vendor", "node_modules", ".git"];

/// What to do when two files declare the same module name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail on the second occurrence
    #[default]
    Throw,
    /// Keep the first occurrence
    Skip,
    /// Register later occurrences as `Name#2`, `Name#3`, ...
    Suffix,
}

impl FromStr for DuplicatePolicy {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "throw" => Ok(DuplicatePolicy::Throw),
            "skip" => Ok(DuplicatePolicy::Skip),
            "suffix" => Ok(DuplicatePolicy::Suffix),
            other => Err(DefinitionError::InvalidArgument(format!(
                "unknown duplicate policy '{other}' (expected throw, skip or suffix)"
            ))),
        }
    }
}

/// Callback invoked with each file that failed to load
pub type ErrorCallback<'a> = &'a mut dyn FnMut(&Path, &DefinitionError);

/// Multi-root definition file discovery
#[derive(Debug, Clone)]
pub struct DefinitionDiscovery {
    roots: Vec<PathBuf>,
    patterns: Vec<String>,
    recursive: bool,
    ignore_dirs: Vec<String>,
    load_options: LoadOptions,
}

impl DefinitionDiscovery {
    /// Discovery over `roots` with the default patterns and ignore list
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
            recursive: true,
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|d| d.to_string()).collect(),
            load_options: LoadOptions::default(),
        }
    }

    pub fn patterns(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn ignore_dirs(mut self, dirs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.ignore_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn load_options(mut self, options: LoadOptions) -> Self {
        self.load_options = options;
        self
    }

    /// Absolute, deduplicated paths of every matching file
    ///
    /// Roots are visited in order, entries within a directory by name.
    pub fn find_json_files(&self) -> Result<Vec<PathBuf>> {
        let patterns = self
            .patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| DefinitionError::InvalidPattern {
                    pattern: p.clone(),
                    message: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut found = IndexSet::new();
        for root in &self.roots {
            if !root.is_dir() {
                tracing::warn!(root = %root.display(), "discovery root is not a directory, skipping");
                continue;
            }

            let max_depth = if self.recursive { usize::MAX } else { 1 };
            let walker = WalkDir::new(root)
                .max_depth(max_depth)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| {
                    entry.depth() == 0
                        || !entry.file_type().is_dir()
                        || !self.is_ignored(entry.file_name().to_str().unwrap_or_default())
                });

            let readable = walker.filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable path during discovery");
                    None
                }
            });
            for entry in readable {
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some(name) = entry.file_name().to_str() else {
                    continue;
                };
                if patterns.iter().any(|p| p.matches(name)) {
                    let path = entry.path();
                    let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
                    found.insert(absolute);
                }
            }
        }

        tracing::debug!(count = found.len(), "discovered definition files");
        Ok(found.into_iter().collect())
    }

    /// Load every discovered file
    ///
    /// Without `on_error` the first failing file aborts the whole load. With
    /// it, the callback sees each failure and the file is skipped.
    pub fn load_all_stores(&self, mut on_error: Option<ErrorCallback<'_>>) -> Result<Vec<DefinitionStore>> {
        let mut stores = Vec::new();
        for path in self.find_json_files()? {
            match DefinitionStore::from_file_with(&path, self.load_options) {
                Ok(store) => stores.push(store),
                Err(e) => match on_error.as_mut() {
                    Some(callback) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping definition file");
                        callback(&path, &e);
                    }
                    None => return Err(e),
                },
            }
        }
        Ok(stores)
    }

    /// Load every discovered module into a registry keyed by module name
    pub fn load_all_modules(
        &self,
        policy: DuplicatePolicy,
        on_error: Option<ErrorCallback<'_>>,
    ) -> Result<IndexMap<String, ModuleDefinition>> {
        let stores = self.load_all_stores(on_error)?;
        merge_modules(stores, policy)
    }

    fn is_ignored(&self, dir_name: &str) -> bool {
        self.ignore_dirs.iter().any(|d| d == dir_name)
    }
}

/// Flatten stores into `name -> module`, resolving name collisions by `policy`
pub fn merge_modules(
    stores: Vec<DefinitionStore>,
    policy: DuplicatePolicy,
) -> Result<IndexMap<String, ModuleDefinition>> {
    let mut registry: IndexMap<String, ModuleDefinition> = IndexMap::new();
    for store in stores {
        let module = store.into_module();
        let name = module.name().to_string();
        if !registry.contains_key(&name) {
            registry.insert(name, module);
            continue;
        }

        match policy {
            DuplicatePolicy::Throw => {
                return Err(DefinitionError::DuplicateModule {
                    path: module.source_path().map(Path::to_path_buf).unwrap_or_default(),
                    name,
                });
            }
            DuplicatePolicy::Skip => {
                tracing::info!(module = %name, "duplicate module skipped");
            }
            DuplicatePolicy::Suffix => {
                let mut n = 2;
                let renamed = loop {
                    let candidate = format!("{name}#{n}");
                    if !registry.contains_key(&candidate) {
                        break candidate;
                    }
                    n += 1;
                };
                tracing::info!(module = %name, as_name = %renamed, "duplicate module renamed");
                registry.insert(renamed, module);
            }
        }
    }
    Ok(registry)
}
