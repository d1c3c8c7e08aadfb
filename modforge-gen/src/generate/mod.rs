//! Generators for backend and frontend source files
//!
//! Each generator is switched on by one flag of a model's backend or
//! frontend configuration and writes its files through the
//! [`Filesystem`] port:
//! - backend: model, form request, controller, routes
//! - frontend: type, API client, translations, form, read view, index page,
//!   menu entry, CASL permissions
//!
//! Existing files are kept unless `force` is set. Model files are the
//! exception: they are patched in place with missing imports, traits and
//! relation methods.

mod backend;
mod frontend;
mod model;

pub use backend::{ControllerGenerator, RequestGenerator, RouteGenerator};
pub use frontend::{
    ApiGenerator, FormGenerator, IndexGenerator, LangGenerator, MenuGenerator, PermissionGenerator,
    ReadGenerator, TypeGenerator,
};
pub use model::ModelGenerator;

use crate::config::ProjectConfig;
use crate::definition::{ModelDefinition, ModuleDefinition};
use crate::error::{DefinitionError, Result};
use crate::fs::Filesystem;
use crate::render::{StubSet, pluralize};
use heck::{ToKebabCase, ToSnakeCase};
use indexmap::IndexSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// A code generator for one kind of file
pub trait Generator {
    /// Generator name, as accepted by [`get_generator`]
    fn name(&self) -> &str;

    /// Whether the model asks for this generator
    fn enabled(&self, model: &ModelDefinition) -> bool;

    /// Write the files for `model`
    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        run: &mut GenerationRun,
        model: &ModelDefinition,
    ) -> Result<Vec<GeneratedFile>>;
}

/// What happened to a target file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Created,
    Overwritten,
    /// Existing file merged with new content
    Patched,
    /// Existing file already had the content
    Unchanged,
    /// Existing file left alone because `force` was not set
    Skipped,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileAction::Created => "created",
            FileAction::Overwritten => "overwritten",
            FileAction::Patched => "patched",
            FileAction::Unchanged => "unchanged",
            FileAction::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// One file touched by a generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub generator: String,
    pub path: PathBuf,
    pub action: FileAction,
    /// Content now on disk, or the untouched content for skipped files
    pub content: String,
}

/// Everything a generator needs besides the model
pub struct GenerationContext<'a> {
    pub module: &'a ModuleDefinition,
    pub config: &'a ProjectConfig,
    pub fs: &'a dyn Filesystem,
    pub stubs: &'a StubSet,
    /// Overwrite existing files instead of keeping or patching them
    pub force: bool,
}

impl<'a> GenerationContext<'a> {
    pub fn new(
        module: &'a ModuleDefinition,
        config: &'a ProjectConfig,
        fs: &'a dyn Filesystem,
        stubs: &'a StubSet,
    ) -> Self {
        Self {
            module,
            config,
            fs,
            stubs,
            force: false,
        }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn module_root(&self) -> PathBuf {
        self.config.module_root(self.module.name())
    }

    /// PHP namespace of the module, e.g. `Modules\Blog`
    pub fn module_namespace(&self) -> String {
        self.config.module_namespace(self.module.name())
    }

    /// Class file of a model: its stored `path`, else `app/Models/<Name>.php`
    pub fn model_path(&self, model: &ModelDefinition) -> PathBuf {
        match model.path() {
            Some(path) => PathBuf::from(path),
            None => self
                .module_root()
                .join("app/Models")
                .join(format!("{}.php", model.name())),
        }
    }

    /// Class file of an arbitrary class under the module namespace root
    ///
    /// `Modules\Blog\Models\Author` maps to
    /// `<modules_path>/Blog/app/Models/Author.php`.
    pub fn class_path(&self, fqcn: &str) -> Option<PathBuf> {
        let root = self.config.module_namespace.trim_matches('\\');
        let fqcn = fqcn.trim_start_matches('\\');
        let rest = if root.is_empty() {
            fqcn
        } else {
            fqcn.strip_prefix(root)?.strip_prefix('\\')?
        };
        let mut parts = rest.split('\\');
        let module = parts.next().filter(|m| !m.is_empty())?;
        let segments: Vec<&str> = parts.collect();
        if segments.is_empty() {
            return None;
        }
        let mut path = self.config.module_root(module).join("app");
        for segment in &segments[..segments.len() - 1] {
            path.push(segment);
        }
        path.push(format!("{}.php", segments[segments.len() - 1]));
        Some(path)
    }

    /// Root of this module's frontend files
    pub fn frontend_root(&self) -> PathBuf {
        self.config
            .frontend_path
            .join("modules")
            .join(self.module.name().to_kebab_case())
    }

    /// Write `content` to `path` following the overwrite policy
    pub fn write(&self, generator: &str, path: &Path, content: String) -> Result<GeneratedFile> {
        let action = if !self.fs.exists(path) {
            FileAction::Created
        } else {
            let existing = self.fs.read_to_string(path)?;
            if existing == content {
                FileAction::Unchanged
            } else if self.force {
                FileAction::Overwritten
            } else {
                tracing::info!(generator, path = %path.display(), "file exists, skipping");
                return Ok(GeneratedFile {
                    generator: generator.to_string(),
                    path: path.to_path_buf(),
                    action: FileAction::Skipped,
                    content: existing,
                });
            }
        };
        if action != FileAction::Unchanged {
            self.fs.write(path, &content)?;
            tracing::info!(generator, path = %path.display(), %action, "wrote file");
        }
        Ok(GeneratedFile {
            generator: generator.to_string(),
            path: path.to_path_buf(),
            action,
            content,
        })
    }

    /// Write merged content over an existing file
    pub fn write_patched(&self, generator: &str, path: &Path, before: &str, after: String) -> Result<GeneratedFile> {
        let action = if before == after {
            FileAction::Unchanged
        } else {
            self.fs.write(path, &after)?;
            tracing::info!(generator, path = %path.display(), "patched file");
            FileAction::Patched
        };
        Ok(GeneratedFile {
            generator: generator.to_string(),
            path: path.to_path_buf(),
            action,
            content: after,
        })
    }
}

/// State of one generation run
///
/// Tracks which model classes were already generated so relation cascades
/// terminate, and collects every file touched.
#[derive(Debug, Default)]
pub struct GenerationRun {
    visited: IndexSet<String>,
    files: Vec<GeneratedFile>,
}

impl GenerationRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a class as generated; false if it already was
    pub fn enter(&mut self, fqcn: &str) -> bool {
        self.visited.insert(fqcn.trim_start_matches('\\').to_string())
    }

    pub fn is_visited(&self, fqcn: &str) -> bool {
        self.visited.contains(fqcn.trim_start_matches('\\'))
    }

    pub fn visited(&self) -> impl Iterator<Item = &str> {
        self.visited.iter().map(String::as_str)
    }

    pub fn files(&self) -> &[GeneratedFile] {
        &self.files
    }

    pub fn into_files(self) -> Vec<GeneratedFile> {
        self.files
    }

    fn record(&mut self, files: Vec<GeneratedFile>) {
        self.files.extend(files);
    }
}

/// Every generator, in generation order
pub fn generators() -> Vec<Box<dyn Generator>> {
    vec![
        Box::new(ModelGenerator),
        Box::new(RequestGenerator),
        Box::new(ControllerGenerator),
        Box::new(RouteGenerator),
        Box::new(TypeGenerator),
        Box::new(ApiGenerator),
        Box::new(LangGenerator),
        Box::new(FormGenerator),
        Box::new(ReadGenerator),
        Box::new(IndexGenerator),
        Box::new(MenuGenerator),
        Box::new(PermissionGenerator),
    ]
}

/// Get a generator by name
pub fn get_generator(name: &str) -> Result<Box<dyn Generator>> {
    generators()
        .into_iter()
        .find(|g| g.name() == name)
        .ok_or_else(|| DefinitionError::CodeGen(format!("unknown generator: {name}")))
}

/// Run every enabled generator for one model
pub fn generate_model(ctx: &GenerationContext<'_>, run: &mut GenerationRun, key: &str) -> Result<()> {
    let model = ctx.module.model(key)?;
    tracing::debug!(module = ctx.module.name(), model = key, "generating model");
    for generator in generators() {
        if generator.enabled(model) {
            let files = generator.generate(ctx, run, model)?;
            run.record(files);
        }
    }
    Ok(())
}

/// Run every enabled generator for every model of the module
pub fn generate_module(ctx: &GenerationContext<'_>, run: &mut GenerationRun) -> Result<()> {
    for key in ctx.module.model_keys() {
        generate_model(ctx, run, key)?;
    }
    Ok(())
}

/// Permission name `<module>.<model>.<ability>`
pub fn permission_name(module: &str, model: &ModelDefinition, ability: &str) -> String {
    format!("{}.{}.{}", module.to_snake_case(), model.key().to_snake_case(), ability)
}

/// URL segment of a model's API resource
pub fn api_route(model: &ModelDefinition) -> String {
    match model.backend().api_route.as_deref().map(|r| r.trim_matches('/')) {
        Some(route) if !route.is_empty() => route.to_string(),
        _ => pluralize(model.name()).to_kebab_case(),
    }
}

/// Insert `line` before the line holding `marker`, unless an equal line exists
///
/// Without a marker the line is appended. Returns `None` when nothing
/// changes.
pub fn insert_line(text: &str, marker: &str, line: &str) -> Option<String> {
    if text.lines().any(|existing| existing.trim() == line.trim()) {
        return None;
    }
    if let Some(at) = text.find(marker) {
        let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
        return Some(format!("{}{line}\n{}", &text[..line_start], &text[line_start..]));
    }
    let mut out = text.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(line);
    out.push('\n');
    Some(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::definition::{FieldDefinition, FieldType};
    use crate::fs::MemoryFilesystem;

    pub(crate) fn blog_author() -> ModelDefinition {
        let mut model = ModelDefinition::new(
            "author",
            "Author",
            "Modules\\Blog\\Models",
            "blog_authors",
            "Blog",
        )
        .unwrap();
        model.upsert_field(FieldDefinition::new("name", FieldType::String).unwrap());
        model.upsert_field(FieldDefinition::new("email", FieldType::String).unwrap());
        model
    }

    #[test]
    fn test_class_path() {
        let module = ModuleDefinition::new("Blog").unwrap();
        let config = ProjectConfig::default();
        let fs = MemoryFilesystem::new();
        let stubs = StubSet::default();
        let ctx = GenerationContext::new(&module, &config, &fs, &stubs);
        assert_eq!(
            ctx.class_path("\\Modules\\Shop\\Models\\Product"),
            Some(PathBuf::from("Modules/Shop/app/Models/Product.php"))
        );
        assert_eq!(ctx.class_path("App\\Models\\User"), None);
        assert_eq!(
            ctx.model_path(&blog_author()),
            PathBuf::from("Modules/Blog/app/Models/Author.php")
        );
    }

    #[test]
    fn test_write_policy() {
        let module = ModuleDefinition::new("Blog").unwrap();
        let config = ProjectConfig::default();
        let fs = MemoryFilesystem::new().with_file("a.txt", "old");
        let stubs = StubSet::default();
        let ctx = GenerationContext::new(&module, &config, &fs, &stubs);

        let file = ctx.write("t", Path::new("a.txt"), "new".into()).unwrap();
        assert_eq!(file.action, FileAction::Skipped);
        assert_eq!(fs.get("a.txt").as_deref(), Some("old"));

        let file = ctx.write("t", Path::new("b.txt"), "new".into()).unwrap();
        assert_eq!(file.action, FileAction::Created);

        let ctx = ctx.force(true);
        assert_eq!(ctx.write("t", Path::new("a.txt"), "new".into()).unwrap().action, FileAction::Overwritten);
        assert_eq!(ctx.write("t", Path::new("a.txt"), "new".into()).unwrap().action, FileAction::Unchanged);
    }

    #[test]
    fn test_insert_line() {
        let text = "a\n    // marker\n}\n";
        let once = insert_line(text, "// marker", "    x;").unwrap();
        assert_eq!(once, "a\n    x;\n    // marker\n}\n");
        assert!(insert_line(&once, "// marker", "    x;").is_none());
        assert_eq!(insert_line("a", "// marker", "b").unwrap(), "a\nb\n");
    }

    #[test]
    fn test_run_visited_set() {
        let mut run = GenerationRun::new();
        assert!(run.enter("\\App\\A"));
        assert!(!run.enter("App\\A"));
        assert!(run.is_visited("App\\A"));
        assert_eq!(run.visited().count(), 1);
    }

    #[test]
    fn test_api_route_and_permissions() {
        let mut model = blog_author();
        assert_eq!(api_route(&model), "authors");
        model.backend_mut().api_route = Some("/writers/".into());
        assert_eq!(api_route(&model), "writers");
        assert_eq!(permission_name("Blog", &model, "create"), "blog.author.create");
        assert!(get_generator("model").is_ok());
        assert!(get_generator("nope").is_err());
    }
}
