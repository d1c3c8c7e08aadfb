//! Frontend generation (TypeScript and React)
//!
//! Files land under `<frontend_path>/modules/<module>/`:
//! `types/`, `api/`, `lang/en/`, `components/`, `pages/`, `permissions/`
//! and a module-wide `menu.ts`.

use super::{
    GeneratedFile, GenerationContext, GenerationRun, Generator, api_route, insert_line, permission_name,
};
use crate::definition::{FieldDefinition, FieldType, ModelDefinition};
use crate::error::{DefinitionError, Result};
use crate::render::types::{map_field_type, ts_initial_value};
use crate::render::{Replacements, pluralize};
use heck::{ToKebabCase, ToLowerCamelCase, ToTitleCase};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Marker line in `menu.ts` before which entries are inserted
pub const MENU_MARKER: &str = "// modforge:menu";

fn file_name(model: &ModelDefinition) -> String {
    model.key().to_kebab_case()
}

fn api_name(model: &ModelDefinition) -> String {
    format!("{}Api", model.name().to_lower_camel_case())
}

fn label(name: &str) -> String {
    name.to_title_case()
}

/// Fields shown by the UI: `frontend.fields` when set, else every fillable field
fn ui_fields(model: &ModelDefinition) -> Vec<&FieldDefinition> {
    let selected = model.frontend().field_names();
    if selected.is_empty() {
        return model.fields().collect();
    }
    selected.into_iter().filter_map(|name| model.field(name)).collect()
}

/// Placeholders shared by every frontend stub
fn base_replacements(ctx: &GenerationContext<'_>, model: &ModelDefinition) -> Replacements {
    Replacements::new()
        .set("modelName", model.name())
        .set("fileName", file_name(model))
        .set("apiName", api_name(model))
        .set("baseUrl", format!("/api/{}/{}", ctx.module.name().to_kebab_case(), api_route(model)))
}

fn render_to(
    ctx: &GenerationContext<'_>,
    generator: &str,
    stub: &str,
    replacements: &Replacements,
    path: PathBuf,
) -> Result<Vec<GeneratedFile>> {
    let content = ctx.stubs.get(stub)?.render(replacements);
    Ok(vec![ctx.write(generator, &path, content)?])
}

/// `types/<model>.ts` (`frontend.hasType`)
pub struct TypeGenerator;

impl Generator for TypeGenerator {
    fn name(&self) -> &str {
        "type"
    }

    fn enabled(&self, model: &ModelDefinition) -> bool {
        model.frontend().has_type
    }

    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        _run: &mut GenerationRun,
        model: &ModelDefinition,
    ) -> Result<Vec<GeneratedFile>> {
        let properties: Vec<String> = model
            .fields()
            .map(|field| {
                let optional = if field.default_value().is_some() { "?" } else { "" };
                format!(
                    "  {}{optional}: {};",
                    field.name(),
                    map_field_type(field.field_type()).ts_type
                )
            })
            .collect();
        let replacements = base_replacements(ctx, model).set("properties", properties.join("\n"));
        let path = ctx.frontend_root().join("types").join(format!("{}.ts", file_name(model)));
        render_to(ctx, self.name(), "type", &replacements, path)
    }
}

/// `api/<model>.ts` (`frontend.hasApi`)
pub struct ApiGenerator;

impl Generator for ApiGenerator {
    fn name(&self) -> &str {
        "api"
    }

    fn enabled(&self, model: &ModelDefinition) -> bool {
        model.frontend().has_api
    }

    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        _run: &mut GenerationRun,
        model: &ModelDefinition,
    ) -> Result<Vec<GeneratedFile>> {
        let path = ctx.frontend_root().join("api").join(format!("{}.ts", file_name(model)));
        render_to(ctx, self.name(), "api", &base_replacements(ctx, model), path)
    }
}

/// `lang/en/<model>.json` (`frontend.hasLang`)
pub struct LangGenerator;

impl Generator for LangGenerator {
    fn name(&self) -> &str {
        "lang"
    }

    fn enabled(&self, model: &ModelDefinition) -> bool {
        model.frontend().has_lang
    }

    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        _run: &mut GenerationRun,
        model: &ModelDefinition,
    ) -> Result<Vec<GeneratedFile>> {
        let fields: Map<String, Value> = model
            .fields()
            .map(|f| (f.name().to_string(), Value::from(label(f.name()))))
            .collect();
        let mut document = Map::new();
        document.insert("title".to_string(), Value::from(label(&pluralize(model.name()))));
        document.insert("singular".to_string(), Value::from(label(model.name())));
        document.insert("fields".to_string(), Value::Object(fields));

        let mut content =
            serde_json::to_string_pretty(&Value::Object(document)).map_err(DefinitionError::Encode)?;
        content.push('\n');
        let path = ctx
            .frontend_root()
            .join("lang/en")
            .join(format!("{}.json", file_name(model)));
        Ok(vec![ctx.write(self.name(), &path, content)?])
    }
}

/// `components/<Name>Form.tsx` (`frontend.hasAddOrEditComponent`)
pub struct FormGenerator;

impl Generator for FormGenerator {
    fn name(&self) -> &str {
        "form"
    }

    fn enabled(&self, model: &ModelDefinition) -> bool {
        model.frontend().has_add_or_edit_component
    }

    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        _run: &mut GenerationRun,
        model: &ModelDefinition,
    ) -> Result<Vec<GeneratedFile>> {
        let defaults: Vec<String> = model
            .fields()
            .map(|f| format!("  {}: {},", f.name(), ts_initial_value(f)))
            .collect();
        let inputs: Vec<String> = ui_fields(model).into_iter().map(form_field).collect();
        let replacements = base_replacements(ctx, model)
            .set("defaultValues", defaults.join("\n"))
            .set("formFields", inputs.join("\n"));
        let path = ctx
            .frontend_root()
            .join("components")
            .join(format!("{}Form.tsx", model.name()));
        render_to(ctx, self.name(), "form", &replacements, path)
    }
}

/// One labelled input bound to `formData`
fn form_field(field: &FieldDefinition) -> String {
    let name = field.name();
    let mapped = map_field_type(field.field_type());
    let control = match field.field_type() {
        FieldType::Boolean => format!(
            "<input type=\"checkbox\" checked={{Boolean(formData.{name})}} onChange={{(e) => setFormData({{ ...formData, {name}: e.target.checked }})}} />"
        ),
        FieldType::Integer | FieldType::Float => format!(
            "<input type=\"number\" value={{formData.{name} ?? ''}} onChange={{(e) => setFormData({{ ...formData, {name}: Number(e.target.value) }})}} />"
        ),
        FieldType::Json => format!(
            "<textarea value={{JSON.stringify(formData.{name} ?? {{}})}} onChange={{(e) => setFormData({{ ...formData, {name}: JSON.parse(e.target.value || '{{}}') }})}} />"
        ),
        FieldType::Text => format!(
            "<textarea value={{formData.{name} ?? ''}} onChange={{(e) => setFormData({{ ...formData, {name}: e.target.value }})}} />"
        ),
        _ => format!(
            "<input type=\"{}\" value={{formData.{name} ?? ''}} onChange={{(e) => setFormData({{ ...formData, {name}: e.target.value }})}} />",
            mapped.input
        ),
    };
    format!(
        "      <label>\n        {}\n        {control}\n      </label>",
        label(name)
    )
}

/// `components/<Name>Read.tsx` (`frontend.hasReadComponent`)
pub struct ReadGenerator;

impl Generator for ReadGenerator {
    fn name(&self) -> &str {
        "read"
    }

    fn enabled(&self, model: &ModelDefinition) -> bool {
        model.frontend().has_read_component
    }

    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        _run: &mut GenerationRun,
        model: &ModelDefinition,
    ) -> Result<Vec<GeneratedFile>> {
        let rows: Vec<String> = ui_fields(model)
            .into_iter()
            .map(|f| {
                format!(
                    "      <dt>{}</dt>\n      <dd>{{String(record.{} ?? '')}}</dd>",
                    label(f.name()),
                    f.name()
                )
            })
            .collect();
        let replacements = base_replacements(ctx, model).set("readFields", rows.join("\n"));
        let path = ctx
            .frontend_root()
            .join("components")
            .join(format!("{}Read.tsx", model.name()));
        render_to(ctx, self.name(), "read", &replacements, path)
    }
}

/// `pages/<Name>Index.tsx` (`frontend.hasIndex`)
pub struct IndexGenerator;

impl Generator for IndexGenerator {
    fn name(&self) -> &str {
        "index"
    }

    fn enabled(&self, model: &ModelDefinition) -> bool {
        model.frontend().has_index
    }

    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        _run: &mut GenerationRun,
        model: &ModelDefinition,
    ) -> Result<Vec<GeneratedFile>> {
        let fields = ui_fields(model);
        let headers: Vec<String> = fields
            .iter()
            .map(|f| format!("          <th>{}</th>", label(f.name())))
            .collect();
        let cells: Vec<String> = fields
            .iter()
            .map(|f| format!("            <td>{{String(row.{} ?? '')}}</td>", f.name()))
            .collect();
        let replacements = base_replacements(ctx, model)
            .set("headers", headers.join("\n"))
            .set("cells", cells.join("\n"));
        let path = ctx
            .frontend_root()
            .join("pages")
            .join(format!("{}Index.tsx", model.name()));
        render_to(ctx, self.name(), "index", &replacements, path)
    }
}

/// Entry in the module's `menu.ts` (`frontend.hasMenu`)
pub struct MenuGenerator;

impl MenuGenerator {
    pub fn menu_line(ctx: &GenerationContext<'_>, model: &ModelDefinition) -> String {
        let permission = if model.frontend().has_permission {
            format!(
                ", permission: '{}'",
                permission_name(ctx.module.name(), model, "access")
            )
        } else {
            String::new()
        };
        format!(
            "  {{ title: '{}', route: '/{}/{}'{permission} }},",
            label(&pluralize(model.name())),
            ctx.module.name().to_kebab_case(),
            api_route(model)
        )
    }
}

impl Generator for MenuGenerator {
    fn name(&self) -> &str {
        "menu"
    }

    fn enabled(&self, model: &ModelDefinition) -> bool {
        model.frontend().has_menu
    }

    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        _run: &mut GenerationRun,
        model: &ModelDefinition,
    ) -> Result<Vec<GeneratedFile>> {
        let path = ctx.frontend_root().join("menu.ts");
        let line = Self::menu_line(ctx, model);
        if ctx.fs.exists(&path) {
            let before = ctx.fs.read_to_string(&path)?;
            let after = insert_line(&before, MENU_MARKER, &line).unwrap_or_else(|| before.clone());
            return Ok(vec![ctx.write_patched(self.name(), &path, &before, after)?]);
        }
        let base = ctx.stubs.get("menu")?.render(&Replacements::new());
        let content = insert_line(&base, MENU_MARKER, &line).unwrap_or(base);
        Ok(vec![ctx.write(self.name(), &path, content)?])
    }
}

/// `permissions/<model>.ts` listing CASL abilities (`frontend.hasPermission`)
pub struct PermissionGenerator;

impl Generator for PermissionGenerator {
    fn name(&self) -> &str {
        "permissions"
    }

    fn enabled(&self, model: &ModelDefinition) -> bool {
        model.frontend().has_permission
    }

    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        _run: &mut GenerationRun,
        model: &ModelDefinition,
    ) -> Result<Vec<GeneratedFile>> {
        let abilities: Vec<String> = model
            .frontend()
            .casl
            .enabled()
            .into_iter()
            .map(|action| format!("  {{ action: '{action}', subject: '{}' }},", model.name()))
            .collect();
        let replacements = base_replacements(ctx, model)
            .set(
                "permissionConst",
                format!("{}Permissions", model.name().to_lower_camel_case()),
            )
            .set("abilities", abilities.join("\n"));
        let path = ctx
            .frontend_root()
            .join("permissions")
            .join(format!("{}.ts", file_name(model)));
        render_to(ctx, self.name(), "permissions", &replacements, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::definition::ModuleDefinition;
    use crate::fs::MemoryFilesystem;
    use crate::generate::tests::blog_author;
    use crate::generate::{FileAction, generate_model};
    use crate::render::StubSet;
    use serde_json::json;

    const ROOT: &str = "resources/js/modules/blog";

    fn generate(configure: impl FnOnce(&mut ModelDefinition)) -> MemoryFilesystem {
        let mut author = blog_author();
        author.upsert_field(
            FieldDefinition::new("active", FieldType::Boolean)
                .unwrap()
                .with_default(json!(true)),
        );
        configure(&mut author);
        let mut module = ModuleDefinition::new("Blog").unwrap();
        module.upsert_model(author);

        let config = ProjectConfig::default();
        let fs = MemoryFilesystem::new();
        let stubs = StubSet::default();
        let ctx = GenerationContext::new(&module, &config, &fs, &stubs);
        let mut run = GenerationRun::new();
        generate_model(&ctx, &mut run, "author").unwrap();
        fs
    }

    #[test]
    fn test_type_and_api() {
        let fs = generate(|m| {
            m.frontend_mut().has_type = true;
            m.frontend_mut().has_api = true;
        });
        let types = fs.get(format!("{ROOT}/types/author.ts")).unwrap();
        assert!(types.contains("export interface Author {\n  id: number;\n  name: string;\n  email: string;\n  active?: boolean;\n}"));

        let api = fs.get(format!("{ROOT}/api/author.ts")).unwrap();
        assert!(api.contains("const baseUrl = '/api/blog/authors';"));
        assert!(api.contains("export const authorApi = {"));
        assert!(!api.contains("{{ "));
    }

    #[test]
    fn test_lang() {
        let fs = generate(|m| m.frontend_mut().has_lang = true);
        let lang: Value = serde_json::from_str(&fs.get(format!("{ROOT}/lang/en/author.json")).unwrap()).unwrap();
        assert_eq!(lang["title"], "Authors");
        assert_eq!(lang["fields"]["email"], "Email");
    }

    #[test]
    fn test_components_use_selected_fields() {
        let fs = generate(|m| {
            let frontend = m.frontend_mut();
            frontend.has_add_or_edit_component = true;
            frontend.has_read_component = true;
            frontend.has_index = true;
            frontend.fields = vec![json!("name"), json!({"name": "active"}), json!("missing")];
        });
        let form = fs.get(format!("{ROOT}/components/AuthorForm.tsx")).unwrap();
        assert!(form.contains("  name: '',\n  email: '',\n  active: true,"));
        assert!(form.contains("setFormData({ ...formData, active: e.target.checked })"));
        assert!(!form.contains("formData.email"));

        let read = fs.get(format!("{ROOT}/components/AuthorRead.tsx")).unwrap();
        assert!(read.contains("      <dt>Name</dt>\n      <dd>{String(record.name ?? '')}</dd>"));

        let index = fs.get(format!("{ROOT}/pages/AuthorIndex.tsx")).unwrap();
        assert!(index.contains("          <th>Name</th>\n          <th>Active</th>"));
        assert!(index.contains("<td>{String(row.active ?? '')}</td>"));
    }

    #[test]
    fn test_menu_and_permissions() {
        let fs = generate(|m| {
            let frontend = m.frontend_mut();
            frontend.has_menu = true;
            frontend.has_permission = true;
            frontend.casl.create = true;
            frontend.casl.access = true;
        });
        let menu = fs.get(format!("{ROOT}/menu.ts")).unwrap();
        assert!(menu.contains(
            "  { title: 'Authors', route: '/blog/authors', permission: 'blog.author.access' },\n  // modforge:menu"
        ));

        let permissions = fs.get(format!("{ROOT}/permissions/author.ts")).unwrap();
        assert!(permissions.contains(
            "export const authorPermissions = [\n  { action: 'access', subject: 'Author' },\n  { action: 'create', subject: 'Author' },\n] as const;"
        ));
    }

    #[test]
    fn test_menu_entry_added_once() {
        let mut author = blog_author();
        author.frontend_mut().has_menu = true;
        let mut module = ModuleDefinition::new("Blog").unwrap();
        module.upsert_model(author);
        let config = ProjectConfig::default();
        let fs = MemoryFilesystem::new();
        let stubs = StubSet::default();
        let ctx = GenerationContext::new(&module, &config, &fs, &stubs);

        generate_model(&ctx, &mut GenerationRun::new(), "author").unwrap();
        let first = fs.get(format!("{ROOT}/menu.ts")).unwrap();
        let mut run = GenerationRun::new();
        generate_model(&ctx, &mut run, "author").unwrap();
        assert_eq!(run.files()[0].action, FileAction::Unchanged);
        assert_eq!(fs.get(format!("{ROOT}/menu.ts")).unwrap(), first);
    }
}
