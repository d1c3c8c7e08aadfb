//! Idempotent merging of generated code into an existing PHP class
//!
//! [`ModelPatcher`] adds imports, trait usages and methods to a class file
//! without touching anything that is already there:
//! - imports are compared by normalized class name
//! - traits are appended to the class's first trait `use` statement, which
//!   may carry a `{ ... }` conflict block; entries already listed are left
//!   as written and compared by short name
//! - methods are added only when no method of the same name exists
//!
//! The class body is located by brace matching over a masked copy of the
//! source in which string literals and comments are blanked out, so braces
//! inside them do not count. Applying the same patch twice changes nothing
//! the second time. CRLF files stay CRLF, and a file that needs no change
//! is returned byte for byte.

use crate::error::{DefinitionError, Result};
use crate::render::{reindent, relation::METHOD_INDENT, short_class};
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static USE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*use\s+([^;{]+);").expect("use line pattern"));
static TRAIT_USE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*use\s+([^;{]+?)\s*[;{]").expect("trait use pattern"));
static NAMESPACE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*namespace\s+[^;]+;[^\n]*").expect("namespace pattern"));
static OPEN_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<\?php[^\n]*").expect("open tag pattern"));
static CLASS_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^:$\w])class\s+[A-Za-z_][A-Za-z0-9_]*").expect("class pattern")
});
static METHOD_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"function\s+&?\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("method name pattern")
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Requested additions to an existing class file
#[derive(Debug, Clone, Default)]
pub struct ModelPatcher {
    imports: Vec<String>,
    traits: Vec<String>,
    methods: Vec<String>,
}

impl ModelPatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classes to import, as `Foo\Bar` or `use Foo\Bar;`
    pub fn imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imports.extend(imports.into_iter().map(Into::into));
        self
    }

    /// Traits to use; fully-qualified names are reduced to short names
    pub fn traits<I, S>(mut self, traits: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.traits.extend(traits.into_iter().map(Into::into));
        self
    }

    /// Complete method blocks
    pub fn methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods.extend(methods.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.traits.is_empty() && self.methods.is_empty()
    }

    /// Apply the patch to `source`
    ///
    /// Fails when traits or methods are requested and no class body can be
    /// found.
    pub fn apply(&self, source: &str) -> Result<String> {
        let crlf = source.contains("\r\n");
        let normalized = source.replace("\r\n", "\n");

        let mut text = self.apply_imports(&normalized);
        if !self.traits.is_empty() {
            text = self.apply_traits(&text)?;
        }
        if !self.methods.is_empty() {
            text = self.apply_methods(&text)?;
        }

        if text == normalized {
            return Ok(source.to_string());
        }
        if crlf {
            text = text.replace('\n', "\r\n");
        }
        Ok(text)
    }

    fn apply_imports(&self, text: &str) -> String {
        let masked = mask_php(text);
        let header_end = class_body(&masked)
            .map(|body| body.start)
            .unwrap_or(masked.len());
        let header = &masked[..header_end];

        let mut present: IndexSet<String> = USE_LINE
            .captures_iter(header)
            .map(|caps| normalize_import(&caps[1]))
            .collect();
        let missing: Vec<String> = self
            .imports
            .iter()
            .map(|import| normalize_import(import))
            .filter(|import| !import.is_empty() && present.insert(import.clone()))
            .collect();
        if missing.is_empty() {
            return text.to_string();
        }

        let block = missing
            .iter()
            .map(|import| format!("use {import};"))
            .collect::<Vec<_>>()
            .join("\n");

        if let Some(last) = USE_LINE.find_iter(header).last() {
            return splice(text, last.end(), &format!("\n{block}"));
        }
        if let Some(namespace) = NAMESPACE_LINE.find(header) {
            return splice(text, namespace.end(), &format!("\n\n{block}"));
        }
        if let Some(open) = OPEN_TAG.find(header) {
            return splice(text, open.end(), &format!("\n\n{block}"));
        }
        format!("{block}\n\n{text}")
    }

    fn apply_traits(&self, text: &str) -> Result<String> {
        let masked = mask_php(text);
        let body = class_body(&masked).ok_or_else(no_class)?;

        let wanted: Vec<String> = self
            .traits
            .iter()
            .map(|t| short_class(t.trim().trim_end_matches(';')).to_string())
            .filter(|t| !t.is_empty())
            .collect();

        match top_level_use(&masked, body.clone()) {
            Some(statement) => {
                let present: IndexSet<String> = masked[statement.list.clone()]
                    .split(',')
                    .map(|name| short_class(name.trim()).to_string())
                    .filter(|name| !name.is_empty())
                    .collect();
                let missing: IndexSet<String> = wanted
                    .into_iter()
                    .filter(|name| !present.contains(name))
                    .collect();
                if missing.is_empty() {
                    return Ok(text.to_string());
                }
                let list = missing.into_iter().collect::<Vec<_>>().join(", ");
                Ok(splice(text, statement.list.end, &format!(", {list}")))
            }
            None => {
                let names: IndexSet<String> = wanted.into_iter().collect();
                if names.is_empty() {
                    return Ok(text.to_string());
                }
                let list = names.into_iter().collect::<Vec<_>>().join(", ");
                Ok(splice(text, body.start, &format!("\n{METHOD_INDENT}use {list};\n")))
            }
        }
    }

    fn apply_methods(&self, text: &str) -> Result<String> {
        let masked = mask_php(text);
        let body = class_body(&masked).ok_or_else(no_class)?;

        let mut existing: IndexSet<String> = METHOD_NAME
            .captures_iter(&masked[body.clone()])
            .map(|caps| caps[1].to_ascii_lowercase())
            .collect();

        let mut blocks = Vec::new();
        for method in &self.methods {
            let Some(name) = method_name(method) else {
                tracing::warn!("method block without a recognizable name left out of patch");
                continue;
            };
            if existing.insert(name.to_ascii_lowercase()) {
                blocks.push(reindent(method.trim_matches('\n'), METHOD_INDENT));
            }
        }
        if blocks.is_empty() {
            return Ok(text.to_string());
        }

        let before = text[..body.end].trim_end();
        let separator = if before.ends_with('{') { "\n" } else { "\n\n" };
        Ok(format!(
            "{before}{separator}{}\n{}",
            blocks.join("\n\n"),
            &text[body.end..]
        ))
    }
}

/// Name of the first function declared in `block`
pub fn method_name(block: &str) -> Option<String> {
    METHOD_NAME
        .captures(&mask_php(block))
        .map(|caps| caps[1].to_string())
}

/// Canonical form of an import for comparison
///
/// Trims, drops `use` and `;`, strips the leading backslash and collapses
/// whitespace.
pub fn normalize_import(import: &str) -> String {
    let mut s = import.trim();
    if let Some(rest) = s.strip_prefix("use ").or_else(|| s.strip_prefix("use\t")) {
        s = rest.trim();
    }
    let s = s.trim_end_matches(';').trim().trim_start_matches('\\');
    WHITESPACE.replace_all(s, " ").into_owned()
}

fn no_class() -> DefinitionError {
    DefinitionError::CodeGen("no class body found in target file".to_string())
}

fn splice(text: &str, at: usize, insert: &str) -> String {
    let mut out = String::with_capacity(text.len() + insert.len());
    out.push_str(&text[..at]);
    out.push_str(insert);
    out.push_str(&text[at..]);
    out
}

/// Byte range strictly between the braces of the first class declaration
fn class_body(masked: &str) -> Option<Range<usize>> {
    let decl = CLASS_DECL.find(masked)?;
    let bytes = masked.as_bytes();
    let open = decl.end() + masked[decl.end()..].find('{')?;
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + 1..i);
                }
            }
            _ => {}
        }
    }
    None
}

struct TraitUse {
    list: Range<usize>,
}

/// First `use` statement directly inside the class body
///
/// `list` ends after the last name, before `;` or the `{` of a conflict block.
fn top_level_use(masked: &str, body: Range<usize>) -> Option<TraitUse> {
    let bytes = masked.as_bytes();
    for caps in TRAIT_USE.captures_iter(&masked[body.clone()]) {
        let whole = caps.get(0)?;
        let start = body.start + whole.start();
        let depth = bytes[body.start..start].iter().fold(0i64, |d, &b| match b {
            b'{' => d + 1,
            b'}' => d - 1,
            _ => d,
        });
        if depth == 0 {
            let list = caps.get(1)?;
            let raw = &masked[body.start + list.start()..body.start + list.end()];
            let trimmed_end = raw.trim_end().len();
            return Some(TraitUse {
                list: body.start + list.start()..body.start + list.start() + trimmed_end,
            });
        }
    }
    None
}

/// Copy of `source` with string literals and comments replaced by spaces
///
/// Newlines are kept and byte offsets are preserved.
pub(crate) fn mask_php(source: &str) -> String {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Code,
        Single,
        Double,
        Line,
        Block,
    }

    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mut state = State::Code;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            State::Code => match (b, next) {
                (b'\'', _) => state = State::Single,
                (b'"', _) => state = State::Double,
                (b'/', Some(b'/')) => state = State::Line,
                (b'#', next) if next != Some(b'[') => state = State::Line,
                (b'/', Some(b'*')) => {
                    out[i] = b' ';
                    out[i + 1] = b' ';
                    i += 2;
                    state = State::Block;
                    continue;
                }
                _ => {
                    i += 1;
                    continue;
                }
            },
            State::Single | State::Double => {
                let quote = if state == State::Single { b'\'' } else { b'"' };
                if b == b'\\' && next.is_some() {
                    out[i] = b' ';
                    if next != Some(b'\n') {
                        out[i + 1] = b' ';
                    }
                    i += 2;
                    continue;
                }
                if b == quote {
                    state = State::Code;
                }
            }
            State::Line => {
                if b == b'\n' {
                    state = State::Code;
                    i += 1;
                    continue;
                }
            }
            State::Block => {
                if b == b'*' && next == Some(b'/') {
                    out[i] = b' ';
                    out[i + 1] = b' ';
                    i += 2;
                    state = State::Code;
                    continue;
                }
            }
        }
        if out[i] != b'\n' {
            out[i] = b' ';
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
