//! Interactive scaffolding session
//!
//! The session edits one module definition through a menu loop. Every action
//! reports its own failure and returns to the menu; only prompt I/O errors
//! (a closed terminal) end the session.

use crate::error::{CliError, Result};
use crate::schema::{ColumnInfo, SchemaSource};
use dialoguer::{Confirm, Input, MultiSelect, Select};
use heck::{ToSnakeCase, ToUpperCamelCase};
use modforge_gen::fs::LocalFilesystem;
use modforge_gen::generate::{GenerationContext, GenerationRun, generate_model};
use modforge_gen::render::{StubSet, pluralize, singularize};
use modforge_gen::{
    DefinitionStore, FieldDefinition, FieldType, ModelDefinition, ProjectConfig, RelatedModel,
    Relation, RelationDescriptor, RelationKind,
};
use serde_json::Value;

/// Columns the framework maintains itself
pub const SYSTEM_COLUMNS: [&str; 4] = ["id", "created_at", "updated_at", "deleted_at"];

type Toggle = fn(&mut ModelDefinition) -> &mut bool;

/// Generator switches offered by the session, in menu order
pub fn features() -> [(&'static str, Toggle); 13] {
    [
        ("Model", |m| &mut m.backend_mut().has_model),
        ("Form request", |m| &mut m.backend_mut().has_request),
        ("API controller", |m| &mut m.backend_mut().has_controller),
        ("API route", |m| &mut m.backend_mut().has_route),
        ("Backend permissions", |m| &mut m.backend_mut().has_permission),
        ("TypeScript type", |m| &mut m.frontend_mut().has_type),
        ("API client", |m| &mut m.frontend_mut().has_api),
        ("Translations", |m| &mut m.frontend_mut().has_lang),
        ("Add/edit form", |m| &mut m.frontend_mut().has_add_or_edit_component),
        ("Read view", |m| &mut m.frontend_mut().has_read_component),
        ("Index page", |m| &mut m.frontend_mut().has_index),
        ("Menu entry", |m| &mut m.frontend_mut().has_menu),
        ("Frontend permissions", |m| &mut m.frontend_mut().has_permission),
    ]
}

/// Current state of every feature switch
pub fn feature_states(model: &mut ModelDefinition) -> Vec<bool> {
    features().into_iter().map(|(_, toggle)| *toggle(model)).collect()
}

/// Turn on exactly the features at `selected`
pub fn apply_features(model: &mut ModelDefinition, selected: &[usize]) {
    for (i, (_, toggle)) in features().into_iter().enumerate() {
        *toggle(model) = selected.contains(&i);
    }
}

/// Columns offered as fillable
pub fn fillable_candidates(columns: &[ColumnInfo]) -> Vec<&ColumnInfo> {
    columns
        .iter()
        .filter(|c| !SYSTEM_COLUMNS.contains(&c.name.as_str()))
        .collect()
}

/// `blog_authors` becomes `BlogAuthor`
pub fn model_name_for_table(table: &str) -> String {
    singularize(table).to_upper_camel_case()
}

/// Related model suggested by a foreign key column, `author_id` gives `Author`
pub fn suggest_belongs_to(column: &str) -> Option<String> {
    column
        .strip_suffix("_id")
        .filter(|stem| !stem.is_empty())
        .map(|stem| stem.to_upper_camel_case())
}

/// Field for a column, carrying its default converted to the field type
pub fn field_from_column(column: &ColumnInfo, field_type: FieldType) -> Result<FieldDefinition> {
    let mut field = FieldDefinition::new(column.name.as_str(), field_type)?;
    if let Some(raw) = &column.default {
        field.set_default(Some(default_for(raw, field_type)));
    }
    Ok(field)
}

fn default_for(raw: &str, field_type: FieldType) -> Value {
    match field_type {
        FieldType::Integer => raw.parse::<i64>().map(Value::from).unwrap_or_else(|_| raw.into()),
        FieldType::Float => raw.parse::<f64>().map(Value::from).unwrap_or_else(|_| raw.into()),
        FieldType::Boolean => Value::Bool(matches!(raw.to_ascii_lowercase().as_str(), "1" | "true")),
        _ => Value::String(raw.to_string()),
    }
}

/// Fresh model for `table` placed under the module's model namespace
pub fn build_model(
    config: &ProjectConfig,
    module: &str,
    table: &str,
    name: &str,
    fields: Vec<FieldDefinition>,
) -> Result<ModelDefinition> {
    let mut model = ModelDefinition::new(
        name.to_snake_case(),
        name,
        config.models_namespace(module),
        table,
        module,
    )?;
    for field in fields {
        model.add_field(field)?;
    }
    Ok(model)
}

/// Relation to `related` of the same module
///
/// When the related model is already defined its table is recorded so
/// validation rules can point at it.
pub fn build_relation(
    store: &DefinitionStore,
    config: &ProjectConfig,
    kind: RelationKind,
    method: &str,
    related: &str,
    foreign_key: Option<String>,
    owner_key: Option<String>,
) -> Relation {
    let module = store.module();
    let mut descriptor = RelationDescriptor::new(
        method,
        RelatedModel::new(related, config.models_namespace(module.name())),
    );
    descriptor.foreign_key = foreign_key;
    descriptor.owner_key = owner_key;
    descriptor.module_name = Some(module.name().to_string());
    if let Some(existing) = module.model_by_name(related) {
        descriptor.table = Some(existing.table_name().to_string());
    }

    match kind {
        RelationKind::BelongsTo => Relation::BelongsTo(descriptor),
        RelationKind::HasMany => Relation::HasMany(descriptor),
        RelationKind::BelongsToMany => Relation::BelongsToMany(descriptor),
    }
}

/// Aligned text table
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let mut out = vec![
        pad_row(headers, &widths),
        pad_row(&rule.iter().map(String::as_str).collect::<Vec<_>>(), &widths),
    ];
    for row in rows {
        out.push(pad_row(&row.iter().map(String::as_str).collect::<Vec<_>>(), &widths));
    }
    out.join("\n")
}

fn pad_row(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}", width = *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// One row per model: key, class, table, field count, relation count
pub fn model_rows(store: &DefinitionStore) -> Vec<Vec<String>> {
    store
        .module()
        .models()
        .map(|m| {
            vec![
                m.key().to_string(),
                m.class_fqcn(),
                m.table_name().to_string(),
                m.fields().count().to_string(),
                m.relations().len().to_string(),
            ]
        })
        .collect()
}

pub const MODEL_HEADERS: [&str; 5] = ["key", "class", "table", "fields", "relations"];

const MENU: [&str; 6] = [
    "Scaffold a model from a table",
    "Edit model features",
    "Show models",
    "Generate files for a model",
    "Save",
    "Quit",
];

/// Menu-driven editor for one module definition
pub struct Session<'a> {
    config: &'a ProjectConfig,
    schema: &'a dyn SchemaSource,
    store: DefinitionStore,
    dirty: bool,
}

impl<'a> Session<'a> {
    pub fn new(config: &'a ProjectConfig, schema: &'a dyn SchemaSource, store: DefinitionStore) -> Self {
        Self {
            config,
            schema,
            store,
            dirty: false,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        println!("Module {}", self.store.module().name());
        loop {
            let choice = Select::new()
                .with_prompt("What next?")
                .items(&MENU)
                .default(0)
                .interact()?;

            let outcome = match choice {
                0 => self.scaffold_model(),
                1 => self.edit_features(),
                2 => {
                    self.show_models();
                    Ok(())
                }
                3 => self.generate(),
                4 => self.save(),
                _ => {
                    if self.dirty
                        && Confirm::new()
                            .with_prompt("Save changes before quitting?")
                            .default(true)
                            .interact()?
                    {
                        self.save()?;
                    }
                    return Ok(());
                }
            };

            match outcome {
                Err(CliError::Prompt(e)) => return Err(CliError::Prompt(e)),
                Err(e) => {
                    tracing::debug!(error = ?e, "session action failed");
                    eprintln!("Error: {e}");
                }
                Ok(()) => {}
            }
        }
    }

    fn scaffold_model(&mut self) -> Result<()> {
        let tables = self.schema.tables();
        if tables.is_empty() {
            return Err(CliError::Schema("the schema has no tables".to_string()));
        }
        let table = &tables[Select::new()
            .with_prompt("Table")
            .items(&tables)
            .default(0)
            .interact()?];
        let columns = self.schema.columns(table)?;
        let candidates = fillable_candidates(&columns);
        if candidates.is_empty() {
            return Err(CliError::Schema(format!("table '{table}' has no fillable columns")));
        }

        let module = self.store.module().name().to_string();
        let name: String = Input::new()
            .with_prompt("Model name")
            .default(model_name_for_table(table))
            .interact_text()?;

        let labels: Vec<String> = candidates
            .iter()
            .map(|c| {
                let null = if c.nullable { ", nullable" } else { "" };
                format!("{} ({}{null})", c.name, c.column_type)
            })
            .collect();
        let picked = MultiSelect::new()
            .with_prompt("Fillable columns")
            .items(&labels)
            .defaults(&vec![true; labels.len()])
            .interact()?;

        let type_labels: Vec<&str> = FieldType::ALL.iter().map(FieldType::as_str).collect();
        let mut fields = Vec::with_capacity(picked.len());
        for &i in &picked {
            let column = candidates[i];
            let suggested = FieldType::ALL
                .iter()
                .position(|t| *t == column.field_type())
                .unwrap_or(0);
            let chosen = Select::new()
                .with_prompt(format!("Type of {}", column.name))
                .items(&type_labels)
                .default(suggested)
                .interact()?;
            fields.push(field_from_column(column, FieldType::ALL[chosen])?);
        }

        let mut model = build_model(self.config, &module, table, &name, fields)?;
        if self.store.module().has_model(model.key())
            && !Confirm::new()
                .with_prompt(format!("Model '{}' exists. Replace it?", model.key()))
                .default(false)
                .interact()?
        {
            return Ok(());
        }

        let selected: Vec<String> = picked.iter().map(|&i| candidates[i].name.clone()).collect();
        self.relation_loop(&mut model, &selected)?;
        self.choose_features(&mut model)?;

        tracing::info!(model = model.key(), table = %table, "scaffolded model");
        self.store.module_mut().upsert_model(model);
        self.dirty = true;
        Ok(())
    }

    fn relation_loop(&self, model: &mut ModelDefinition, selected: &[String]) -> Result<()> {
        for column in selected {
            let Some(related) = suggest_belongs_to(column) else {
                continue;
            };
            let accept = Confirm::new()
                .with_prompt(format!("Add belongsTo {related} via {column}?"))
                .default(true)
                .interact()?;
            if accept {
                let method = column.trim_end_matches("_id").to_string();
                let mut relation = build_relation(
                    &self.store,
                    self.config,
                    RelationKind::BelongsTo,
                    &method,
                    &related,
                    Some(column.clone()),
                    None,
                );
                self.ask_mirror(&mut relation)?;
                model.add_relation(relation);
            }
        }

        let kinds = [RelationKind::BelongsTo, RelationKind::HasMany, RelationKind::BelongsToMany];
        let kind_labels: Vec<&str> = kinds.iter().map(RelationKind::tag).collect();
        while Confirm::new()
            .with_prompt("Add another relation?")
            .default(false)
            .interact()?
        {
            let kind = kinds[Select::new()
                .with_prompt("Relation type")
                .items(&kind_labels)
                .default(0)
                .interact()?];
            let related: String = Input::new().with_prompt("Related model").interact_text()?;
            let method: String = Input::new()
                .with_prompt("Method name")
                .default(match kind {
                    RelationKind::BelongsTo => related.to_snake_case(),
                    _ => pluralize(&related.to_snake_case()),
                })
                .interact_text()?;
            let foreign_key = optional_input("Foreign key (empty for the framework default)")?;
            let owner_key = optional_input("Owner key (empty for the framework default)")?;

            let mut relation = build_relation(
                &self.store,
                self.config,
                kind,
                &method,
                related.trim(),
                foreign_key,
                owner_key,
            );
            if let Relation::BelongsToMany(descriptor) = &mut relation {
                descriptor.pivot_table = optional_input("Pivot table (empty for the framework default)")?;
            }
            self.ask_mirror(&mut relation)?;
            model.add_relation(relation);
        }
        Ok(())
    }

    fn ask_mirror(&self, relation: &mut Relation) -> Result<()> {
        if let Relation::BelongsTo(descriptor) = relation {
            descriptor.is_parent_has_many = Confirm::new()
                .with_prompt(format!("Also add hasMany on {}?", descriptor.model.name))
                .default(false)
                .interact()?;
        }
        Ok(())
    }

    fn choose_features(&self, model: &mut ModelDefinition) -> Result<()> {
        let labels: Vec<&str> = features().iter().map(|(label, _)| *label).collect();
        let current = feature_states(model);
        let defaults = if current.iter().any(|on| *on) {
            current
        } else {
            vec![true; labels.len()]
        };
        let selected = MultiSelect::new()
            .with_prompt("Generate")
            .items(&labels)
            .defaults(&defaults)
            .interact()?;
        apply_features(model, &selected);

        if model.frontend().has_permission {
            let abilities = ["access", "create", "read", "update", "delete"];
            let casl = &model.frontend().casl;
            let on = [casl.access, casl.create, casl.read, casl.update, casl.delete];
            let defaults: Vec<bool> = if on.iter().any(|b| *b) { on.to_vec() } else { vec![true; 5] };
            let picked = MultiSelect::new()
                .with_prompt("Abilities")
                .items(&abilities)
                .defaults(&defaults)
                .interact()?;
            let casl = &mut model.frontend_mut().casl;
            casl.access = picked.contains(&0);
            casl.create = picked.contains(&1);
            casl.read = picked.contains(&2);
            casl.update = picked.contains(&3);
            casl.delete = picked.contains(&4);
        }
        Ok(())
    }

    fn pick_model(&self) -> Result<String> {
        let keys: Vec<String> = self
            .store
            .module()
            .model_keys()
            .into_iter()
            .map(str::to_string)
            .collect();
        if keys.is_empty() {
            return Err(CliError::Usage("no models defined yet".to_string()));
        }
        let index = Select::new()
            .with_prompt("Model")
            .items(&keys)
            .default(0)
            .interact()?;
        Ok(keys[index].clone())
    }

    fn edit_features(&mut self) -> Result<()> {
        let key = self.pick_model()?;
        let mut model = self.store.module().model(&key)?.clone();
        self.choose_features(&mut model)?;
        self.store.module_mut().upsert_model(model);
        self.dirty = true;
        Ok(())
    }

    fn show_models(&self) {
        let rows = model_rows(&self.store);
        if rows.is_empty() {
            println!("No models defined.");
        } else {
            println!("{}", format_table(&MODEL_HEADERS, &rows));
        }
    }

    fn save(&mut self) -> Result<()> {
        let path = if self.store.path().is_some() {
            self.store.save()?
        } else {
            let path = self.config.definition_path(self.store.module().name());
            self.store.save_as(path)?
        };
        self.dirty = false;
        println!("Saved {}", path.display());
        Ok(())
    }

    fn generate(&mut self) -> Result<()> {
        let key = self.pick_model()?;
        if self.dirty {
            self.save()?;
        }
        let fs = LocalFilesystem;
        let stubs = StubSet::new(self.config.stubs_path.clone());
        let ctx = GenerationContext::new(self.store.module(), self.config, &fs, &stubs);
        let mut run = GenerationRun::new();
        generate_model(&ctx, &mut run, &key)?;

        for file in run.files() {
            println!("{:>11}  {}", file.action.to_string(), file.path.display());
        }
        Ok(())
    }
}

fn optional_input(prompt: &str) -> Result<Option<String>> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use modforge_gen::ModuleDefinition;

    fn column(name: &str, column_type: &str, default: Option<&str>) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            column_type: column_type.to_string(),
            nullable: false,
            default: default.map(str::to_string),
        }
    }

    #[test]
    fn test_fillable_candidates_skip_system_columns() {
        let columns = vec![
            column("id", "bigint", None),
            column("name", "varchar(255)", None),
            column("email", "varchar(255)", None),
            column("created_at", "timestamp", None),
            column("updated_at", "timestamp", None),
        ];
        let names: Vec<&str> = fillable_candidates(&columns).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["name", "email"]);
    }

    #[test]
    fn test_model_name_for_table() {
        assert_eq!(model_name_for_table("blog_authors"), "BlogAuthor");
        assert_eq!(model_name_for_table("categories"), "Category");
    }

    #[test]
    fn test_suggest_belongs_to() {
        assert_eq!(suggest_belongs_to("author_id").as_deref(), Some("Author"));
        assert_eq!(suggest_belongs_to("blog_category_id").as_deref(), Some("BlogCategory"));
        assert_eq!(suggest_belongs_to("_id"), None);
        assert_eq!(suggest_belongs_to("title"), None);
    }

    #[test]
    fn test_field_defaults_follow_type() {
        let active = field_from_column(&column("active", "tinyint(1)", Some("1")), FieldType::Boolean).unwrap();
        assert_eq!(active.default_value(), Some(&Value::Bool(true)));

        let views = field_from_column(&column("views", "int", Some("0")), FieldType::Integer).unwrap();
        assert_eq!(views.default_value(), Some(&Value::from(0)));

        let status = field_from_column(&column("status", "varchar(20)", Some("draft")), FieldType::String).unwrap();
        assert_eq!(status.default_value(), Some(&Value::from("draft")));

        let plain = field_from_column(&column("name", "varchar(255)", None), FieldType::String).unwrap();
        assert_eq!(plain.default_value(), None);
    }

    #[test]
    fn test_build_model() {
        let config = ProjectConfig::default();
        let fields = vec![
            FieldDefinition::new("name", FieldType::String).unwrap(),
            FieldDefinition::new("email", FieldType::String).unwrap(),
        ];
        let model = build_model(&config, "Blog", "blog_authors", "Author", fields).unwrap();
        assert_eq!(model.key(), "author");
        assert_eq!(model.namespace(), "Modules\\Blog\\Models");
        assert_eq!(model.table_name(), "blog_authors");
        assert_eq!(model.fillable_names(), vec!["name", "email"]);
    }

    #[test]
    fn test_build_model_rejects_duplicate_columns() {
        let config = ProjectConfig::default();
        let fields = vec![
            FieldDefinition::new("name", FieldType::String).unwrap(),
            FieldDefinition::new("name", FieldType::Text).unwrap(),
        ];
        assert!(build_model(&config, "Blog", "blog_authors", "Author", fields).is_err());
    }

    #[test]
    fn test_build_relation_uses_known_table() {
        let config = ProjectConfig::default();
        let mut module = ModuleDefinition::new("Blog").unwrap();
        module.upsert_model(
            ModelDefinition::new("author", "Author", "Modules\\Blog\\Models", "blog_authors", "Blog").unwrap(),
        );
        let store = DefinitionStore::new(module);

        let relation = build_relation(
            &store,
            &config,
            RelationKind::BelongsTo,
            "author",
            "Author",
            Some("author_id".to_string()),
            None,
        );
        let descriptor = relation.descriptor().unwrap();
        assert_eq!(relation.kind(), Some(RelationKind::BelongsTo));
        assert_eq!(descriptor.table.as_deref(), Some("blog_authors"));
        assert_eq!(descriptor.model.resolve_fqcn().as_deref(), Some("Modules\\Blog\\Models\\Author"));
        assert_eq!(descriptor.owner_key, None);

        let other = build_relation(&store, &config, RelationKind::HasMany, "tags", "Tag", None, None);
        assert_eq!(other.descriptor().unwrap().table, None);
    }

    #[test]
    fn test_apply_features() {
        let mut model = ModelDefinition::new("author", "Author", "Modules\\Blog\\Models", "blog_authors", "Blog").unwrap();
        assert!(feature_states(&mut model).iter().all(|on| !on));

        apply_features(&mut model, &[0, 2, 5]);
        assert!(model.backend().has_model);
        assert!(model.backend().has_controller);
        assert!(!model.backend().has_request);
        assert!(model.frontend().has_type);
        assert_eq!(feature_states(&mut model).iter().filter(|on| **on).count(), 3);
    }

    #[test]
    fn test_format_table() {
        let rows = vec![vec!["author".to_string(), "blog_authors".to_string()]];
        assert_eq!(
            format_table(&["key", "table"], &rows),
            "key     table\n------  ------------\nauthor  blog_authors"
        );
    }
}
