//! Form request, controller and route generation

use super::{GeneratedFile, GenerationContext, GenerationRun, Generator, api_route, insert_line, permission_name};
use crate::definition::ModelDefinition;
use crate::error::Result;
use crate::render::rules::ValidationRules;
use crate::render::{Replacements, indent_join, php_string, relation::render_relations};
use heck::{ToKebabCase, ToLowerCamelCase};

/// Marker line in `routes/api.php` before which routes are inserted
pub const ROUTES_MARKER: &str = "// modforge:routes";

const RULE_INDENT: &str = "            ";

/// Generates `<Name>Request` (`backend.hasRequest`)
pub struct RequestGenerator;

impl RequestGenerator {
    pub fn namespace(ctx: &GenerationContext<'_>) -> String {
        format!("{}\\Http\\Requests", ctx.module_namespace())
    }

    pub fn class_name(model: &ModelDefinition) -> String {
        format!("{}Request", model.name())
    }
}

impl Generator for RequestGenerator {
    fn name(&self) -> &str {
        "request"
    }

    fn enabled(&self, model: &ModelDefinition) -> bool {
        model.backend().has_request
    }

    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        _run: &mut GenerationRun,
        model: &ModelDefinition,
    ) -> Result<Vec<GeneratedFile>> {
        let rules = ValidationRules::for_model(model);
        let class_name = Self::class_name(model);
        let content = ctx.stubs.get("request")?.render(
            &Replacements::new()
                .set("namespace", Self::namespace(ctx))
                .set("requestName", class_name.as_str())
                .set("modelName", model.name())
                .set("validationRules", indent_join(&rules.rule_lines(), RULE_INDENT))
                .set("errorMessages", indent_join(&rules.message_lines(), RULE_INDENT)),
        );
        let path = ctx
            .module_root()
            .join("app/Http/Requests")
            .join(format!("{class_name}.php"));
        Ok(vec![ctx.write(self.name(), &path, content)?])
    }
}

/// Generates `<Name>Controller` (`backend.hasController`)
///
/// With `backend.hasPermission` the controller guards each action with a
/// `permission:` middleware.
pub struct ControllerGenerator;

impl ControllerGenerator {
    pub fn namespace(ctx: &GenerationContext<'_>) -> String {
        format!("{}\\Http\\Controllers", ctx.module_namespace())
    }

    pub fn class_name(model: &ModelDefinition) -> String {
        format!("{}Controller", model.name())
    }

    pub fn class_fqcn(ctx: &GenerationContext<'_>, model: &ModelDefinition) -> String {
        format!("{}\\{}", Self::namespace(ctx), Self::class_name(model))
    }
}

impl Generator for ControllerGenerator {
    fn name(&self) -> &str {
        "controller"
    }

    fn enabled(&self, model: &ModelDefinition) -> bool {
        model.backend().has_controller
    }

    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        _run: &mut GenerationRun,
        model: &ModelDefinition,
    ) -> Result<Vec<GeneratedFile>> {
        let backend = model.backend();
        let (request_fqcn, request_name, payload) = if backend.has_request {
            let name = RequestGenerator::class_name(model);
            (
                format!("{}\\{}", RequestGenerator::namespace(ctx), name),
                name,
                "$request->validated()",
            )
        } else {
            (
                "Illuminate\\Http\\Request".to_string(),
                "Request".to_string(),
                "$request->all()",
            )
        };

        let relation_names: Vec<String> = render_relations(model)
            .relations
            .iter()
            .map(|r| php_string(&r.method_name))
            .collect();
        let (eager_with, eager_load) = if relation_names.is_empty() {
            (String::new(), String::new())
        } else {
            let list = relation_names.join(", ");
            (format!("->with([{list}])"), format!("->load([{list}])"))
        };

        let middleware = if backend.has_permission {
            permission_middleware(ctx, model)
        } else {
            String::new()
        };

        let class_name = Self::class_name(model);
        let content = ctx.stubs.get("controller")?.render(
            &Replacements::new()
                .set("namespace", Self::namespace(ctx))
                .set("controllerName", class_name.as_str())
                .set("modelName", model.name())
                .set("modelFqcn", model.class_fqcn())
                .set("modelVariable", model.name().to_lower_camel_case())
                .set("requestFqcn", request_fqcn)
                .set("requestName", request_name)
                .set("payload", payload)
                .set("eagerWith", eager_with)
                .set("eagerLoad", eager_load)
                .set("middleware", middleware),
        );
        let path = ctx
            .module_root()
            .join("app/Http/Controllers")
            .join(format!("{class_name}.php"));
        Ok(vec![ctx.write(self.name(), &path, content)?])
    }
}

/// Constructor registering one permission middleware per action
fn permission_middleware(ctx: &GenerationContext<'_>, model: &ModelDefinition) -> String {
    let module = ctx.module.name();
    let lines: Vec<String> = [
        ("access", "index"),
        ("read", "show"),
        ("create", "store"),
        ("update", "update"),
        ("delete", "destroy"),
    ]
    .iter()
    .map(|(ability, action)| {
        format!(
            "        $this->middleware({})->only({});",
            php_string(&format!("permission:{}", permission_name(module, model, ability))),
            php_string(action)
        )
    })
    .collect();
    format!(
        "    public function __construct()\n    {{\n{}\n    }}\n\n",
        lines.join("\n")
    )
}

/// Registers the controller in the module's `routes/api.php` (`backend.hasRoute`)
///
/// The route line is inserted once; re-running leaves the file alone.
pub struct RouteGenerator;

impl RouteGenerator {
    pub fn route_line(ctx: &GenerationContext<'_>, model: &ModelDefinition) -> String {
        format!(
            "    Route::apiResource({}, \\{}::class);",
            php_string(&api_route(model)),
            ControllerGenerator::class_fqcn(ctx, model)
        )
    }
}

impl Generator for RouteGenerator {
    fn name(&self) -> &str {
        "route"
    }

    fn enabled(&self, model: &ModelDefinition) -> bool {
        model.backend().has_route
    }

    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        _run: &mut GenerationRun,
        model: &ModelDefinition,
    ) -> Result<Vec<GeneratedFile>> {
        let path = ctx.module_root().join("routes/api.php");
        let existing = if ctx.fs.exists(&path) {
            Some(ctx.fs.read_to_string(&path)?)
        } else {
            None
        };
        let base = match &existing {
            Some(text) => text.clone(),
            None => ctx.stubs.get("routes")?.render(
                &Replacements::new().set("routePrefix", ctx.module.name().to_kebab_case()),
            ),
        };

        let line = Self::route_line(ctx, model);
        let updated = insert_line(&base, ROUTES_MARKER, &line).unwrap_or(base);
        let file = match existing {
            Some(before) => ctx.write_patched(self.name(), &path, &before, updated)?,
            None => ctx.write(self.name(), &path, updated)?,
        };
        Ok(vec![file])
    }
}
