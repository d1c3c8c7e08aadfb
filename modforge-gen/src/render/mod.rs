//! Rendering of definition fragments into source text
//!
//! Everything here is pure string building. Generators combine these
//! fragments with stubs:
//! - [`stub`]: literal `{{ name }}` placeholder substitution
//! - [`imports`]: order-preserving import lists
//! - [`relation`]: relation accessor methods
//! - [`rules`]: validation rules and messages
//! - [`types`]: field type mappings for PHP casts, TypeScript and inputs

pub mod imports;
pub mod relation;
pub mod rules;
pub mod stub;
pub mod types;

pub use imports::ImportList;
pub use relation::{RenderedRelation, RenderedRelations};
pub use stub::{Replacements, Stub, StubSet};

use serde_json::Value;

/// Quote a string as a PHP single-quoted literal
pub fn php_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Render a JSON value as a PHP literal
pub fn php_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => php_string(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(php_literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let pairs: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{} => {}", php_string(k), php_literal(v)))
                .collect();
            format!("[{}]", pairs.join(", "))
        }
    }
}

/// Short class name of a fully-qualified name
pub fn short_class(fqcn: &str) -> &str {
    let trimmed = fqcn.trim_start_matches('\\');
    trimmed.rsplit('\\').next().unwrap_or(trimmed)
}

/// Join lines so that every line after the first carries `indent`
///
/// The first line is expected to sit where the placeholder already is.
pub fn indent_join(lines: &[String], indent: &str) -> String {
    lines.join(&format!("\n{indent}"))
}

/// Re-indent a block so its least indented non-blank line starts at `indent`
pub fn reindent(block: &str, indent: &str) -> String {
    let min = block
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    block
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{indent}{}", &line[min..])
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// English plural of a word, enough for class and table names
pub fn pluralize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{word}es");
    }
    if let Some(stem) = word.strip_suffix('y').or_else(|| word.strip_suffix('Y')) {
        let vowel_before = stem
            .chars()
            .last()
            .is_some_and(|c| "aeiouAEIOU".contains(c));
        if !vowel_before && !stem.is_empty() {
            return format!("{stem}ies");
        }
    }
    format!("{word}s")
}

/// Inverse of [`pluralize`] for regular English plurals
pub fn singularize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    if lower.ends_with("ies") && word.len() > 3 {
        return format!("{}y", &word[..word.len() - 3]);
    }
    for suffix in ["ses", "xes", "zes", "ches", "shes"] {
        if lower.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if lower.ends_with('s') && !lower.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}
