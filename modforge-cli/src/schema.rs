//! Table schema source
//!
//! Reads `CREATE TABLE` statements from a SQL dump so scaffolding can offer
//! real column lists without a database connection.

use crate::error::{CliError, Result};
use indexmap::IndexMap;
use modforge_gen::definition::FieldType;
use modforge_gen::render::types::field_type_for_column;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^\s*create\s+(?:temporary\s+)?table\s+(?:if\s+not\s+exists\s+)?([`"\[\]\w.]+)\s*\("#)
        .expect("create table pattern")
});

/// Column metadata as reported by a schema source
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    /// Raw SQL type, e.g. `varchar(255)`
    pub column_type: String,
    pub nullable: bool,
    /// Literal default, unquoted
    pub default: Option<String>,
}

impl ColumnInfo {
    /// Field type suggested for this column
    pub fn field_type(&self) -> FieldType {
        field_type_for_column(&self.column_type)
    }
}

/// Read-only table introspection
pub trait SchemaSource {
    fn tables(&self) -> Vec<String>;

    fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>>;
}

/// Schema parsed from a DDL file
#[derive(Debug, Clone, Default)]
pub struct DdlSchema {
    tables: IndexMap<String, Vec<ColumnInfo>>,
}

impl DdlSchema {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::Schema(format!("cannot read {}: {e}", path.display())))?;
        let schema = Self::parse(&content);
        tracing::debug!(path = %path.display(), tables = schema.tables.len(), "loaded schema");
        Ok(schema)
    }

    /// Parse every `CREATE TABLE` statement in `sql`
    pub fn parse(sql: &str) -> Self {
        let mut tables = IndexMap::new();
        let mut current: Option<(String, String)> = None;
        let mut depth = 0i32;

        for line in sql.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with("--") {
                continue;
            }

            if current.is_none() {
                if let Some(caps) = CREATE_TABLE.captures(line) {
                    let name = unquote(caps[1].rsplit('.').next().unwrap_or(&caps[1]));
                    let rest = &line[caps.get(0).map_or(0, |m| m.end())..];
                    depth = 1;
                    let mut body = String::new();
                    if let Some(end) = scan_depth(rest, &mut depth) {
                        tables.insert(name, parse_columns(&rest[..end]));
                        continue;
                    }
                    body.push_str(rest);
                    body.push('\n');
                    current = Some((name, body));
                }
                continue;
            }

            if let Some((name, mut body)) = current.take() {
                match scan_depth(line, &mut depth) {
                    Some(end) => {
                        body.push_str(&line[..end]);
                        tables.insert(name, parse_columns(&body));
                    }
                    None => {
                        body.push_str(line);
                        body.push('\n');
                        current = Some((name, body));
                    }
                }
            }
        }

        Self { tables }
    }
}

impl SchemaSource for DdlSchema {
    fn tables(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| CliError::Schema(format!("unknown table '{table}'")))
    }
}

/// Track parenthesis depth; returns the offset of the closing paren at depth 0
fn scan_depth(text: &str, depth: &mut i32) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '(' => *depth += 1,
                ')' => {
                    *depth -= 1;
                    if *depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// Split a table body on top-level commas
fn split_definitions(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '(' => depth += 1,
                ')' => depth -= 1,
                ',' if depth == 0 => {
                    parts.push(&body[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(&body[start..]);
    parts
}

fn parse_columns(body: &str) -> Vec<ColumnInfo> {
    split_definitions(body)
        .into_iter()
        .filter_map(parse_column)
        .collect()
}

fn parse_column(definition: &str) -> Option<ColumnInfo> {
    let definition = definition.trim();
    if definition.is_empty() {
        return None;
    }
    let first = definition.split_whitespace().next()?;
    let keyword = first.to_ascii_lowercase();
    if matches!(
        keyword.as_str(),
        "primary" | "unique" | "key" | "index" | "constraint" | "foreign" | "check" | "fulltext" | "spatial"
    ) {
        return None;
    }

    let name = unquote(first);
    let rest = definition[first.len()..].trim_start();
    let column_type = column_type(rest);
    if column_type.is_empty() {
        return None;
    }
    let upper = rest.to_ascii_uppercase();
    let nullable = !upper.contains("NOT NULL") && !upper.contains("PRIMARY KEY");

    Some(ColumnInfo {
        name,
        column_type,
        nullable,
        default: default_value(rest),
    })
}

/// Type up to the first modifier, keeping `(..)` arguments and `unsigned`
fn column_type(rest: &str) -> String {
    let mut depth = 0;
    let mut end = rest.len();
    for (i, c) in rest.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c.is_whitespace() && depth == 0 => {
                end = i;
                break;
            }
            _ => {}
        }
    }
    let mut ty = rest[..end].to_string();
    if rest[end..].trim_start().to_ascii_lowercase().starts_with("unsigned") {
        ty.push_str(" unsigned");
    }
    ty
}

fn default_value(rest: &str) -> Option<String> {
    let lower = rest.to_ascii_lowercase();
    let at = lower.find("default ")?;
    let value = rest[at + "default ".len()..].trim_start();
    if let Some(quoted) = value.strip_prefix('\'') {
        return quoted.find('\'').map(|end| quoted[..end].to_string());
    }
    let token = value.split_whitespace().next()?;
    if token.eq_ignore_ascii_case("null") {
        return None;
    }
    Some(token.to_string())
}

fn unquote(name: &str) -> String {
    name.trim_matches(|c| matches!(c, '`' | '"' | '[' | ']')).to_string()
}
