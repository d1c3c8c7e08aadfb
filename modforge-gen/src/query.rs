//! Read-only filtering of model definitions
//!
//! Predicates address the wire shape of a model with dot paths such as
//! `backend.hasController` or `fillable.0.name`. Every predicate must hold
//! for a model to match; a path that cannot be resolved simply does not match.

use crate::definition::ModelDefinition;
use crate::error::DefinitionError;
use regex::RegexBuilder;
use serde_json::Value;
use std::str::FromStr;

/// Comparison applied by a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Exact JSON equality
    Equals,
    /// Negated exact JSON equality
    NotEquals,
    /// Case-insensitive match where `%` stands for any run of characters
    Like,
}

impl FromStr for Operator {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "=" | "==" | "eq" => Ok(Operator::Equals),
            "!=" | "<>" | "ne" => Ok(Operator::NotEquals),
            "like" => Ok(Operator::Like),
            other => Err(DefinitionError::InvalidArgument(format!(
                "unknown query operator '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
struct Predicate {
    path: String,
    operator: Operator,
    value: Value,
}

impl Predicate {
    fn matches(&self, record: &Value) -> bool {
        let found = lookup(record, &self.path);
        match self.operator {
            Operator::Equals => found == Some(&self.value),
            Operator::NotEquals => found.is_some_and(|v| v != &self.value),
            Operator::Like => found.is_some_and(|v| like(v, &self.value)),
        }
    }
}

/// AND-combined filter over a set of models
#[derive(Debug, Clone)]
pub struct DefinitionQuery<'a> {
    models: Vec<&'a ModelDefinition>,
    predicates: Vec<Predicate>,
}

impl<'a> DefinitionQuery<'a> {
    pub fn new(models: impl IntoIterator<Item = &'a ModelDefinition>) -> Self {
        Self {
            models: models.into_iter().collect(),
            predicates: Vec::new(),
        }
    }

    /// Add a predicate; it is ANDed with all previous ones
    pub fn and_where(mut self, path: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate {
            path: path.into(),
            operator,
            value: value.into(),
        });
        self
    }

    /// Shorthand for an [`Operator::Equals`] predicate
    pub fn where_eq(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and_where(path, Operator::Equals, value)
    }

    /// Every matching model, in input order
    pub fn get(&self) -> Vec<&'a ModelDefinition> {
        self.models
            .iter()
            .copied()
            .filter(|model| self.accepts(model))
            .collect()
    }

    /// First matching model
    pub fn first(&self) -> Option<&'a ModelDefinition> {
        self.models.iter().copied().find(|model| self.accepts(model))
    }

    pub fn count(&self) -> usize {
        self.get().len()
    }

    fn accepts(&self, model: &ModelDefinition) -> bool {
        let record = match model.to_value() {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(model = model.key(), error = %e, "model skipped by query");
                return false;
            }
        };
        self.predicates.iter().all(|p| p.matches(&record))
    }
}

/// Resolve a dot path; numeric segments index into arrays
pub fn lookup<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn like(found: &Value, pattern: &Value) -> bool {
    let (Some(haystack), Some(pattern)) = (scalar_text(found), scalar_text(pattern)) else {
        return false;
    };
    let body = pattern
        .split('%')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    RegexBuilder::new(&format!("^{body}$"))
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map(|re| re.is_match(&haystack))
        .unwrap_or(false)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
