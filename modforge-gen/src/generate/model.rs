//! Eloquent model generation
//!
//! Renders the `model` stub, or patches an existing class. Afterwards:
//! - related models of the same module that want a model class and have
//!   no file yet are generated too (guarded by the run's visited set)
//! - `belongsTo` relations flagged `isParentHasMany` inject a `hasMany`
//!   accessor into the parent's class file when that file exists

use super::{FileAction, GeneratedFile, GenerationContext, GenerationRun, Generator};
use crate::definition::{ModelDefinition, Relation};
use crate::error::Result;
use crate::patcher::ModelPatcher;
use crate::render::relation::render_parent_has_many;
use crate::render::types::{map_field_type, php_default};
use crate::render::{ImportList, Replacements, php_string, relation::render_relations, short_class};

/// Generates the model class (`backend.hasModel`)
pub struct ModelGenerator;

impl Generator for ModelGenerator {
    fn name(&self) -> &str {
        "model"
    }

    fn enabled(&self, model: &ModelDefinition) -> bool {
        model.backend().has_model
    }

    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        run: &mut GenerationRun,
        model: &ModelDefinition,
    ) -> Result<Vec<GeneratedFile>> {
        if !run.enter(&model.class_fqcn()) {
            tracing::debug!(class = %model.class_fqcn(), "model already generated in this run");
            return Ok(Vec::new());
        }

        let mut files = vec![write_model(ctx, model)?];
        files.extend(cascade(self, ctx, run, model)?);
        files.extend(inject_parent_relations(ctx, model)?);
        Ok(files)
    }
}

fn write_model(ctx: &GenerationContext<'_>, model: &ModelDefinition) -> Result<GeneratedFile> {
    let path = ctx.model_path(model);
    let relations = render_relations(model);
    let traits: ImportList = ctx.config.model_traits.iter().cloned().collect();

    if ctx.fs.exists(&path) && !ctx.force {
        let existing = ctx.fs.read_to_string(&path)?;
        let patched = ModelPatcher::new()
            .imports(traits.iter().chain(relations.imports.iter()))
            .traits(traits.iter())
            .methods(relations.methods())
            .apply(&existing)?;
        return ctx.write_patched("model", &path, &existing, patched);
    }

    let imports: Vec<String> = relations
        .imports
        .iter()
        .filter(|fqcn| !traits.iter().any(|t| t == *fqcn))
        .map(|fqcn| format!("use {fqcn};\n"))
        .collect();
    let trait_namespaces: Vec<String> = traits.lines().into_iter().map(|l| l + "\n").collect();
    let trait_names: Vec<&str> = traits.iter().map(short_class).collect();
    let fillable: Vec<String> = model.fillable_names().into_iter().map(php_string).collect();
    let relation_block = if relations.is_empty() {
        String::new()
    } else {
        format!("\n{}\n", relations.methods_block())
    };

    let stub = ctx.stubs.get("model")?;
    let stub = if trait_names.is_empty() {
        stub.without_line("{{ traitNames }}")
    } else {
        stub
    };
    let content = stub.render(
        &Replacements::new()
            .set("namespace", model.namespace())
            .set("modelName", model.name())
            .set("tableName", model.table_name())
            .set("fillable", fillable.join(", "))
            .set("imports", imports.concat())
            .set("traitNamespaces", trait_namespaces.concat())
            .set("traitNames", trait_names.join(", "))
            .set("props", props(model))
            .set("relations", relation_block),
    );
    ctx.write("model", &path, content)
}

/// `$casts` and `$attributes` blocks, each preceded by a blank line
fn props(model: &ModelDefinition) -> String {
    let casts: Vec<String> = model
        .fields()
        .filter(|f| f.customized_type().is_none())
        .filter_map(|f| {
            map_field_type(f.field_type())
                .php_cast
                .map(|cast| format!("        {} => {},", php_string(f.name()), php_string(cast)))
        })
        .collect();
    let defaults: Vec<String> = model
        .fields()
        .filter_map(|f| {
            f.default_value()
                .map(|v| format!("        {} => {},", php_string(f.name()), php_default(v)))
        })
        .collect();

    let mut out = String::new();
    for (property, entries) in [("$casts", casts), ("$attributes", defaults)] {
        if entries.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "\n    protected {property} = [\n{}\n    ];\n",
            entries.join("\n")
        ));
    }
    out
}

/// Generate related models of this module whose class file is missing
fn cascade(
    generator: &ModelGenerator,
    ctx: &GenerationContext<'_>,
    run: &mut GenerationRun,
    model: &ModelDefinition,
) -> Result<Vec<GeneratedFile>> {
    let mut files = Vec::new();
    for relation in model.relations() {
        let Some(descriptor) = relation.descriptor() else {
            continue;
        };
        if descriptor.external_module {
            continue;
        }
        let Some(fqcn) = descriptor.model.resolve_fqcn() else {
            continue;
        };
        let Some(related) = ctx.module.models().find(|m| m.class_fqcn() == fqcn) else {
            continue;
        };
        if !related.backend().has_model || run.is_visited(&fqcn) || ctx.fs.exists(&ctx.model_path(related)) {
            continue;
        }
        tracing::info!(from = model.key(), to = related.key(), "generating related model");
        files.extend(generator.generate(ctx, run, related)?);
    }
    Ok(files)
}

/// Add the mirrored `hasMany` accessor to parent class files that exist
fn inject_parent_relations(ctx: &GenerationContext<'_>, model: &ModelDefinition) -> Result<Vec<GeneratedFile>> {
    let mut files = Vec::new();
    for relation in model.relations() {
        let Relation::BelongsTo(descriptor) = relation else {
            continue;
        };
        let Some(mirror) = render_parent_has_many(model, relation) else {
            continue;
        };
        let Some(parent_fqcn) = descriptor.model.resolve_fqcn() else {
            continue;
        };

        let parent_path = match &descriptor.model.path {
            Some(path) => Some(path.into()),
            None => match ctx.module.models().find(|m| m.class_fqcn() == parent_fqcn) {
                Some(parent) => Some(ctx.model_path(parent)),
                None => ctx.class_path(&parent_fqcn),
            },
        };
        let Some(parent_path) = parent_path.filter(|p| ctx.fs.exists(p)) else {
            tracing::info!(
                child = model.key(),
                parent = %parent_fqcn,
                "parent class file not found, skipping hasMany back-reference"
            );
            continue;
        };

        let existing = ctx.fs.read_to_string(&parent_path)?;
        let patched = ModelPatcher::new()
            .imports(mirror.imports.iter())
            .methods([mirror.method.as_str()])
            .apply(&existing)?;
        let file = ctx.write_patched("model", &parent_path, &existing, patched)?;
        if file.action == FileAction::Patched {
            tracing::info!(parent = %parent_fqcn, method = %mirror.method_name, "added hasMany back-reference");
        }
        files.push(file);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::definition::{
        FieldDefinition, FieldType, ModuleDefinition, RelatedModel, RelationDescriptor,
    };
    use crate::fs::MemoryFilesystem;
    use crate::generate::tests::blog_author;
    use crate::generate::{generate_model, generate_module};
    use crate::render::StubSet;
    use serde_json::json;

    const AUTHOR_PATH: &str = "Modules/Blog/app/Models/Author.php";
    const POST_PATH: &str = "Modules/Blog/app/Models/Post.php";

    fn no_traits() -> ProjectConfig {
        ProjectConfig {
            model_traits: Vec::new(),
            ..ProjectConfig::default()
        }
    }

    fn post_with_author(parent_has_many: bool) -> ModelDefinition {
        let mut post =
            ModelDefinition::new("post", "Post", "Modules\\Blog\\Models", "blog_posts", "Blog").unwrap();
        post.upsert_field(FieldDefinition::new("title", FieldType::String).unwrap());
        post.upsert_field(FieldDefinition::new("author_id", FieldType::Integer).unwrap());
        post.add_relation(Relation::BelongsTo(
            RelationDescriptor::new("author", RelatedModel::new("Author", "Modules\\Blog\\Models"))
                .foreign_key("author_id")
                .parent_has_many(parent_has_many),
        ));
        post.backend_mut().has_model = true;
        post
    }

    fn blog(models: Vec<ModelDefinition>) -> ModuleDefinition {
        let mut module = ModuleDefinition::new("Blog").unwrap();
        for model in models {
            module.upsert_model(model);
        }
        module
    }

    #[test]
    fn test_fillable_without_relations() {
        let mut author = blog_author();
        author.backend_mut().has_model = true;
        let module = blog(vec![author]);
        let config = no_traits();
        let fs = MemoryFilesystem::new();
        let stubs = StubSet::default();
        let ctx = GenerationContext::new(&module, &config, &fs, &stubs);

        let mut run = GenerationRun::new();
        generate_model(&ctx, &mut run, "author").unwrap();
        let content = fs.get(AUTHOR_PATH).unwrap();

        assert!(content.contains("protected $fillable = ['name', 'email'];"));
        assert!(!content.contains("Relations\\"));
        assert!(!content.contains("public function"));
        assert!(!content.contains("{{"));
        assert_eq!(
            content,
            "<?php\n\nnamespace Modules\\Blog\\Models;\n\nuse Illuminate\\Database\\Eloquent\\Model;\n\nclass Author extends Model\n{\n    protected $table = 'blog_authors';\n\n    protected $fillable = ['name', 'email'];\n}\n"
        );
        assert_eq!(run.files().len(), 1);
        assert_eq!(run.files()[0].action, FileAction::Created);
    }

    #[test]
    fn test_belongs_to_relation() {
        let module = blog(vec![post_with_author(false)]);
        let config = ProjectConfig::default();
        let fs = MemoryFilesystem::new();
        let stubs = StubSet::default();
        let ctx = GenerationContext::new(&module, &config, &fs, &stubs);

        let mut run = GenerationRun::new();
        generate_model(&ctx, &mut run, "post").unwrap();
        let content = fs.get(POST_PATH).unwrap();

        assert!(content.contains("use Illuminate\\Database\\Eloquent\\Factories\\HasFactory;\n"));
        assert!(content.contains("use Modules\\Blog\\Models\\Author;\n"));
        assert!(content.contains("use Illuminate\\Database\\Eloquent\\Relations\\BelongsTo;\n"));
        assert!(content.contains("    use HasFactory;\n"));
        assert!(content.contains("return $this->belongsTo(Author::class, 'author_id');"));
        assert!(content.contains("protected $casts = [\n        'author_id' => 'integer',\n    ];"));
        assert_eq!(content.matches("use Modules\\Blog\\Models\\Author;").count(), 1);
    }

    #[test]
    fn test_existing_model_is_patched() {
        let module = blog(vec![post_with_author(false)]);
        let config = no_traits();
        let manual = "<?php\n\nnamespace Modules\\Blog\\Models;\n\nuse Illuminate\\Database\\Eloquent\\Model;\n\nclass Post extends Model\n{\n    public function summary(): string\n    {\n        return 'manual';\n    }\n}\n";
        let fs = MemoryFilesystem::new().with_file(POST_PATH, manual);
        let stubs = StubSet::default();
        let ctx = GenerationContext::new(&module, &config, &fs, &stubs);

        let mut run = GenerationRun::new();
        generate_model(&ctx, &mut run, "post").unwrap();
        let content = fs.get(POST_PATH).unwrap();
        assert!(content.contains("return 'manual';"));
        assert!(content.contains("use Modules\\Blog\\Models\\Author;"));
        assert!(content.contains("public function author(): BelongsTo"));
        assert_eq!(run.files()[0].action, FileAction::Patched);

        let mut again = GenerationRun::new();
        generate_model(&ctx, &mut again, "post").unwrap();
        assert_eq!(again.files()[0].action, FileAction::Unchanged);
        assert_eq!(fs.get(POST_PATH).unwrap(), content);
    }

    #[test]
    fn test_cascade_generates_missing_related_model() {
        let mut author = blog_author();
        author.backend_mut().has_model = true;
        let mut author_with_posts = author.clone();
        author_with_posts.add_relation(Relation::HasMany(
            RelationDescriptor::new("posts", RelatedModel::new("Post", "Modules\\Blog\\Models"))
                .foreign_key("author_id"),
        ));
        let module = blog(vec![post_with_author(false), author_with_posts]);
        let config = no_traits();
        let fs = MemoryFilesystem::new();
        let stubs = StubSet::default();
        let ctx = GenerationContext::new(&module, &config, &fs, &stubs);

        let mut run = GenerationRun::new();
        generate_model(&ctx, &mut run, "post").unwrap();
        assert!(fs.get(POST_PATH).is_some());
        assert!(fs.get(AUTHOR_PATH).is_some());
        let models: Vec<_> = run.files().iter().filter(|f| f.generator == "model").collect();
        assert_eq!(models.len(), 2);

        // the whole module in one run generates each class once
        let fs = MemoryFilesystem::new();
        let ctx = GenerationContext::new(&module, &config, &fs, &stubs);
        let mut run = GenerationRun::new();
        generate_module(&ctx, &mut run).unwrap();
        assert_eq!(run.files().iter().filter(|f| f.generator == "model").count(), 2);
    }

    #[test]
    fn test_parent_back_reference() {
        let module = blog(vec![post_with_author(true)]);
        let config = no_traits();
        let stubs = StubSet::default();

        // parent missing: skipped, not an error
        let fs = MemoryFilesystem::new();
        let ctx = GenerationContext::new(&module, &config, &fs, &stubs);
        let mut run = GenerationRun::new();
        generate_model(&ctx, &mut run, "post").unwrap();
        assert!(fs.get(AUTHOR_PATH).is_none());

        // parent present: hasMany injected once
        let parent = "<?php\n\nnamespace Modules\\Blog\\Models;\n\nuse Illuminate\\Database\\Eloquent\\Model;\n\nclass Author extends Model\n{\n}\n";
        let fs = MemoryFilesystem::new().with_file(AUTHOR_PATH, parent);
        let ctx = GenerationContext::new(&module, &config, &fs, &stubs);
        let mut run = GenerationRun::new();
        generate_model(&ctx, &mut run, "post").unwrap();
        let author = fs.get(AUTHOR_PATH).unwrap();
        assert!(author.contains("use Modules\\Blog\\Models\\Post;"));
        assert!(author.contains("use Illuminate\\Database\\Eloquent\\Relations\\HasMany;"));
        assert!(author.contains("return $this->hasMany(Post::class, 'author_id');"));

        let mut run = GenerationRun::new();
        generate_model(&ctx, &mut run, "post").unwrap();
        assert_eq!(fs.get(AUTHOR_PATH).unwrap(), author);
    }

    #[test]
    fn test_props_defaults_and_custom_types() {
        let mut model = blog_author();
        model.upsert_field(
            FieldDefinition::new("active", FieldType::Boolean)
                .unwrap()
                .with_default(json!(true)),
        );
        model.upsert_field(
            FieldDefinition::new("meta", FieldType::Json)
                .unwrap()
                .with_customized_type("array"),
        );
        let props = props(&model);
        assert_eq!(
            props,
            "\n    protected $casts = [\n        'active' => 'boolean',\n    ];\n\n    protected $attributes = [\n        'active' => true,\n    ];\n"
        );
    }

    #[test]
    fn test_force_overwrites() {
        let mut author = blog_author();
        author.backend_mut().has_model = true;
        let module = blog(vec![author]);
        let config = no_traits();
        let fs = MemoryFilesystem::new().with_file(AUTHOR_PATH, "<?php\n\nclass Author\n{\n}\n");
        let stubs = StubSet::default();
        let ctx = GenerationContext::new(&module, &config, &fs, &stubs).force(true);
        let mut run = GenerationRun::new();
        generate_model(&ctx, &mut run, "author").unwrap();
        assert_eq!(run.files()[0].action, FileAction::Overwritten);
        assert!(fs.get(AUTHOR_PATH).unwrap().contains("protected $table = 'blog_authors';"));
    }
}
