//! Non-interactive command implementations

use crate::error::{CliError, Result};
use crate::schema::DdlSchema;
use crate::session::Session;
use indexmap::IndexMap;
use modforge_gen::discovery::ErrorCallback;
use modforge_gen::fs::{Filesystem, LocalFilesystem, MemoryFilesystem};
use modforge_gen::generate::{GeneratedFile, GenerationContext, GenerationRun, generate_model, generate_module};
use modforge_gen::render::StubSet;
use modforge_gen::{
    DefinitionError, DefinitionStore, DuplicatePolicy, ModuleDefinition, Operator, ProjectConfig,
};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Load the definition of `module` from its configured location
pub fn open(config: &ProjectConfig, module: &str) -> Result<DefinitionStore> {
    let path = config.definition_path(module);
    Ok(DefinitionStore::from_file_with(path, config.load_options())?)
}

pub fn init(config: &ProjectConfig, module: &str, force: bool) -> Result<PathBuf> {
    let path = config.definition_path(module);
    if path.exists() && !force {
        return Err(CliError::Usage(format!(
            "{} already exists (use --force to replace it)",
            path.display()
        )));
    }
    let mut definition = ModuleDefinition::new(module)?;
    let written = definition.save(Some(path.as_path()))?;
    println!("Created {}", written.display());
    Ok(written)
}

pub fn scaffold(config: &ProjectConfig, module: &str, schema: &Path) -> Result<()> {
    let schema = DdlSchema::from_file(schema)?;
    let store =
        DefinitionStore::open_or_create(config.definition_path(module), module, config.load_options())?;
    Session::new(config, &schema, store).run()
}

/// Run the generators; with `dry_run` files land in an overlay and are discarded
pub fn generate(
    config: &ProjectConfig,
    module: &str,
    models: &[String],
    force: bool,
    dry_run: bool,
) -> Result<Vec<GeneratedFile>> {
    let store = open(config, module)?;
    if dry_run {
        let overlay = MemoryFilesystem::overlay();
        run_generators(config, store.module(), &overlay, models, force)
    } else {
        run_generators(config, store.module(), &LocalFilesystem, models, force)
    }
}

fn run_generators(
    config: &ProjectConfig,
    module: &ModuleDefinition,
    fs: &dyn Filesystem,
    models: &[String],
    force: bool,
) -> Result<Vec<GeneratedFile>> {
    let stubs = StubSet::new(config.stubs_path.clone());
    let ctx = GenerationContext::new(module, config, fs, &stubs).force(force);
    let mut run = GenerationRun::new();
    if models.is_empty() {
        generate_module(&ctx, &mut run)?;
    } else {
        for key in models {
            generate_model(&ctx, &mut run, key)?;
        }
    }
    Ok(run.into_files())
}

pub fn discover(
    config: &ProjectConfig,
    roots: &[PathBuf],
    patterns: &[String],
    policy: DuplicatePolicy,
    keep_going: bool,
) -> Result<IndexMap<String, ModuleDefinition>> {
    let mut discovery = config.discovery(roots.iter().cloned());
    if !patterns.is_empty() {
        discovery = discovery.patterns(patterns.iter().cloned());
    }

    let mut report = |path: &Path, error: &DefinitionError| {
        eprintln!("Skipping {}: {error}", path.display());
    };
    let on_error: Option<ErrorCallback<'_>> = if keep_going { Some(&mut report) } else { None };
    Ok(discovery.load_all_modules(policy, on_error)?)
}

/// Keys of the models matching every predicate
pub fn query(config: &ProjectConfig, module: &str, predicates: &[String]) -> Result<Vec<String>> {
    let store = open(config, module)?;
    let mut query = store.module().query();
    for predicate in predicates {
        let (path, operator, value) = parse_predicate(predicate)?;
        query = query.and_where(path, operator, value);
    }
    Ok(query.get().into_iter().map(|m| m.key().to_string()).collect())
}

/// Split `"<path> <op> <value>"`; the value is JSON when it parses, else a string
pub fn parse_predicate(text: &str) -> Result<(String, Operator, Value)> {
    let mut parts = text.trim().splitn(3, char::is_whitespace);
    let (Some(path), Some(operator), Some(raw)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CliError::Usage(format!(
            "expected '<path> <operator> <value>', got '{text}'"
        )));
    };
    let operator: Operator = operator.parse()?;
    let raw = raw.trim();
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((path.to_string(), operator, value))
}
