//! Stub templates
//!
//! A stub is plain text with `{{ name }}` placeholders. Substitution is a
//! single literal pass: known names are replaced, unknown placeholders stay
//! in the output untouched, and replacement values are never rescanned.

use crate::error::{DefinitionError, Result};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{ ([A-Za-z_][A-Za-z0-9_]*) \}\}").expect("valid placeholder regex"));

/// Built-in stubs, embedded at compile time
const BUILTIN: &[(&str, &str)] = &[
    ("model", include_str!("../../stubs/model.stub")),
    ("request", include_str!("../../stubs/request.stub")),
    ("controller", include_str!("../../stubs/controller.stub")),
    ("routes", include_str!("../../stubs/routes.stub")),
    ("type", include_str!("../../stubs/type.stub")),
    ("api", include_str!("../../stubs/api.stub")),
    ("form", include_str!("../../stubs/form.stub")),
    ("read", include_str!("../../stubs/read.stub")),
    ("index", include_str!("../../stubs/index.stub")),
    ("menu", include_str!("../../stubs/menu.stub")),
    ("permissions", include_str!("../../stubs/permissions.stub")),
];

/// Named placeholder values, applied in one pass
#[derive(Debug, Clone, Default)]
pub struct Replacements {
    values: IndexMap<String, String>,
}

impl Replacements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Replacements::insert`]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// One template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stub {
    name: String,
    template: String,
}

impl Stub {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Drop every line containing `needle`, together with a blank line right after it
    pub fn without_line(&self, needle: &str) -> Stub {
        let mut kept: Vec<&str> = Vec::new();
        let mut skip_blank = false;
        for line in self.template.split('\n') {
            if line.contains(needle) {
                skip_blank = true;
                continue;
            }
            if skip_blank && line.trim().is_empty() {
                skip_blank = false;
                continue;
            }
            skip_blank = false;
            kept.push(line);
        }
        Stub::new(self.name.clone(), kept.join("\n"))
    }

    /// Substitute every known placeholder
    pub fn render(&self, replacements: &Replacements) -> String {
        PLACEHOLDER
            .replace_all(&self.template, |caps: &Captures<'_>| {
                match replacements.get(&caps[1]) {
                    Some(value) => value.to_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

/// Built-in stubs with an optional override directory
///
/// An override file `<dir>/<name>.stub` replaces the built-in of that name.
#[derive(Debug, Clone, Default)]
pub struct StubSet {
    override_dir: Option<PathBuf>,
}

impl StubSet {
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        Self { override_dir }
    }

    pub fn override_dir(&self) -> Option<&Path> {
        self.override_dir.as_deref()
    }

    /// Names of every built-in stub
    pub fn builtin_names() -> impl Iterator<Item = &'static str> {
        BUILTIN.iter().map(|(name, _)| *name)
    }

    /// Load a stub by name
    pub fn get(&self, name: &str) -> Result<Stub> {
        if let Some(dir) = &self.override_dir {
            let path = dir.join(format!("{name}.stub"));
            if path.is_file() {
                tracing::debug!(stub = name, path = %path.display(), "using stub override");
                return Ok(Stub::new(name, std::fs::read_to_string(&path)?));
            }
        }
        BUILTIN
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, template)| Stub::new(name, *template))
            .ok_or_else(|| DefinitionError::CodeGen(format!("unknown stub '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_known_placeholders() {
        let stub = Stub::new("t", "class {{ modelName }} extends {{ base }} {}");
        let out = stub.render(&Replacements::new().set("modelName", "Post"));
        assert_eq!(out, "class Post extends {{ base }} {}");
    }

    #[test]
    fn test_render_is_single_pass() {
        let stub = Stub::new("t", "{{ a }} {{ b }}");
        let out = stub.render(&Replacements::new().set("a", "{{ b }}").set("b", "x"));
        assert_eq!(out, "{{ b }} x");
    }

    #[test]
    fn test_placeholder_spacing_is_literal() {
        let stub = Stub::new("t", "{{name}} {{ name }}");
        let out = stub.render(&Replacements::new().set("name", "v"));
        assert_eq!(out, "{{name}} v");
    }

    #[test]
    fn test_without_line() {
        let stub = Stub::new("t", "{\n    use {{ traitNames }};\n\n    body\n}");
        assert_eq!(stub.without_line("{{ traitNames }}").template(), "{\n    body\n}");
    }

    #[test]
    fn test_builtins_and_overrides() {
        let stubs = StubSet::default();
        for name in StubSet::builtin_names() {
            assert!(stubs.get(name).is_ok(), "missing builtin {name}");
        }
        assert!(stubs.get("nope").is_err());

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.stub"), "custom {{ modelName }}").unwrap();
        let stubs = StubSet::new(Some(dir.path().to_path_buf()));
        let stub = stubs.get("model").unwrap();
        assert_eq!(stub.template(), "custom {{ modelName }}");
        assert_ne!(stubs.get("request").unwrap().template(), "");
    }
}
