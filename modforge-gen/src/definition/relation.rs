//! Relation descriptors
//!
//! Relations are stored as loosely shaped JSON objects tagged by `type`. The
//! three kinds the generators understand are decoded into [`Relation`]
//! variants; anything else is kept verbatim as [`Relation::Unknown`] so it
//! survives a load/save cycle and is skipped at render time.
//!
//! A decoded descriptor remembers the object it was read from. Encoding it
//! again keeps that object's key order, keys the descriptor does not model,
//! and blank placeholders such as `"ownerKey": ""`, so an unmodified relation
//! is written back as it was read.

use serde::de::Deserializer;
use serde::ser::{Error as _, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Relation kinds with a known rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    BelongsTo,
    HasMany,
    BelongsToMany,
}

impl RelationKind {
    /// The `type` tag used on the wire and as the Eloquent method name
    pub fn tag(&self) -> &'static str {
        match self {
            RelationKind::BelongsTo => "belongsTo",
            RelationKind::HasMany => "hasMany",
            RelationKind::BelongsToMany => "belongsToMany",
        }
    }

    /// Short name of the framework relation class
    pub fn class_name(&self) -> &'static str {
        match self {
            RelationKind::BelongsTo => "BelongsTo",
            RelationKind::HasMany => "HasMany",
            RelationKind::BelongsToMany => "BelongsToMany",
        }
    }

    /// Fully-qualified name of the framework relation class
    pub fn class_fqcn(&self) -> String {
        format!("Illuminate\\Database\\Eloquent\\Relations\\{}", self.class_name())
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "belongsTo" => Some(RelationKind::BelongsTo),
            "hasMany" => Some(RelationKind::HasMany),
            "belongsToMany" => Some(RelationKind::BelongsToMany),
            _ => None,
        }
    }
}

/// The model on the far side of a relation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatedModel {
    pub name: String,
    pub namespace: String,
    #[serde(deserialize_with = "empty_as_none")]
    pub fqcn: Option<String>,
    #[serde(deserialize_with = "empty_as_none")]
    pub path: Option<String>,
}

impl RelatedModel {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            fqcn: None,
            path: None,
        }
    }

    /// Fully-qualified class name: explicit `fqcn`, else `namespace\name`
    pub fn resolve_fqcn(&self) -> Option<String> {
        if let Some(fqcn) = &self.fqcn {
            return Some(fqcn.trim_start_matches('\\').to_string());
        }
        if self.name.is_empty() {
            return None;
        }
        let namespace = self.namespace.trim_matches('\\');
        if namespace.is_empty() {
            Some(self.name.clone())
        } else {
            Some(format!("{}\\{}", namespace, self.name))
        }
    }

    /// Short class name, derived from the FQCN when `name` is empty
    pub fn short_name(&self) -> Option<String> {
        if !self.name.is_empty() {
            return Some(self.name.clone());
        }
        self.resolve_fqcn()
            .map(|fqcn| fqcn.rsplit('\\').next().unwrap_or(&fqcn).to_string())
    }
}

/// Explicit pivot columns of a many-to-many relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotKeys {
    pub foreign_pivot_key: String,
    pub related_pivot_key: String,
}

/// Payload shared by every known relation kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelationDescriptor {
    /// Accessor method name
    pub name: String,
    #[serde(deserialize_with = "empty_as_none")]
    pub foreign_key: Option<String>,
    #[serde(deserialize_with = "empty_as_none")]
    pub owner_key: Option<String>,
    #[serde(deserialize_with = "empty_as_none")]
    pub table: Option<String>,
    #[serde(deserialize_with = "empty_as_none")]
    pub module_name: Option<String>,
    pub external_module: bool,
    pub model: RelatedModel,
    /// Mirror this `belongsTo` as a `hasMany` on the related model
    pub is_parent_has_many: bool,
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub pivot_table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot_keys: Option<PivotKeys>,
    /// Keys not modelled above, written back as they were read
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    layout: WireLayout,
}

/// The object a descriptor was decoded from; ignored by equality
#[derive(Debug, Clone, Default)]
struct WireLayout(Option<Map<String, Value>>);

impl PartialEq for WireLayout {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl Eq for WireLayout {}

impl RelationDescriptor {
    pub fn new(name: impl Into<String>, model: RelatedModel) -> Self {
        Self {
            name: name.into(),
            model,
            ..Default::default()
        }
    }

    pub fn foreign_key(mut self, key: impl Into<String>) -> Self {
        self.foreign_key = Some(key.into());
        self
    }

    pub fn owner_key(mut self, key: impl Into<String>) -> Self {
        self.owner_key = Some(key.into());
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn pivot(mut self, table: impl Into<String>, keys: Option<PivotKeys>) -> Self {
        self.pivot_table = Some(table.into());
        self.pivot_keys = keys;
        self
    }

    pub fn parent_has_many(mut self, mirror: bool) -> Self {
        self.is_parent_has_many = mirror;
        self
    }
}

/// A relation of a model to another model
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    BelongsTo(RelationDescriptor),
    HasMany(RelationDescriptor),
    BelongsToMany(RelationDescriptor),
    /// Unrecognized or malformed descriptor, kept as-is
    Unknown(Value),
}

impl Relation {
    pub fn kind(&self) -> Option<RelationKind> {
        match self {
            Relation::BelongsTo(_) => Some(RelationKind::BelongsTo),
            Relation::HasMany(_) => Some(RelationKind::HasMany),
            Relation::BelongsToMany(_) => Some(RelationKind::BelongsToMany),
            Relation::Unknown(_) => None,
        }
    }

    pub fn descriptor(&self) -> Option<&RelationDescriptor> {
        match self {
            Relation::BelongsTo(d) | Relation::HasMany(d) | Relation::BelongsToMany(d) => Some(d),
            Relation::Unknown(_) => None,
        }
    }

    /// Decode a raw descriptor; never fails
    pub fn from_value(value: Value) -> Relation {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .and_then(RelationKind::from_tag);
        let Some(kind) = kind else {
            return Relation::Unknown(value);
        };

        let raw = match &value {
            Value::Object(map) => map.clone(),
            _ => return Relation::Unknown(value),
        };
        let mut body = raw.clone();
        body.remove("type");

        let odd_pivot_keys = match body.get("pivotKeys") {
            Some(keys) if serde_json::from_value::<Option<PivotKeys>>(keys.clone()).is_err() => {
                body.remove("pivotKeys")
            }
            _ => None,
        };

        match serde_json::from_value::<RelationDescriptor>(Value::Object(body)) {
            Ok(mut descriptor) => {
                if let Some(keys) = odd_pivot_keys {
                    tracing::warn!(relation = %descriptor.name, "pivotKeys not understood, kept verbatim");
                    descriptor.extra.insert("pivotKeys".to_string(), keys);
                }
                descriptor.layout = WireLayout(Some(raw));
                match kind {
                    RelationKind::BelongsTo => Relation::BelongsTo(descriptor),
                    RelationKind::HasMany => Relation::HasMany(descriptor),
                    RelationKind::BelongsToMany => Relation::BelongsToMany(descriptor),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "malformed relation descriptor kept verbatim");
                Relation::Unknown(value)
            }
        }
    }

    /// Encode back to the wire shape
    ///
    /// `type` comes first unless the descriptor was decoded, in which case
    /// the decoded key order is kept.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        let (kind, descriptor) = match self {
            Relation::Unknown(raw) => return Ok(raw.clone()),
            Relation::BelongsTo(d) => (RelationKind::BelongsTo, d),
            Relation::HasMany(d) => (RelationKind::HasMany, d),
            Relation::BelongsToMany(d) => (RelationKind::BelongsToMany, d),
        };

        let mut out = Map::new();
        out.insert("type".to_string(), Value::from(kind.tag()));
        if let Value::Object(body) = serde_json::to_value(descriptor)? {
            out.extend(body);
        }
        match &descriptor.layout.0 {
            Some(raw) => Ok(Value::Object(merge_layout(raw, out, false))),
            None => Ok(Value::Object(out)),
        }
    }
}

impl Serialize for Relation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Relation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Relation::from_value)
    }
}

/// Lay `fresh` out in the key order of `raw`
///
/// A `null` that replaces a blank placeholder keeps the placeholder, and
/// blank fresh keys that `raw` never had are left out. Keys of `raw` missing
/// from `fresh` were cleared at the top level and are dropped unless blank;
/// inside nested objects they are kept.
fn merge_layout(
    raw: &Map<String, Value>,
    mut fresh: Map<String, Value>,
    nested: bool,
) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, old) in raw {
        let value = match (fresh.remove(key), old) {
            (Some(Value::Object(new)), Value::Object(old)) => {
                Value::Object(merge_layout(old, new, true))
            }
            (Some(new), old) if new.is_null() && is_blank(old) => old.clone(),
            (Some(new), _) => new,
            (None, old) if nested || is_blank(old) => old.clone(),
            (None, _) => continue,
        };
        out.insert(key.clone(), value);
    }
    out.extend(fresh.into_iter().filter(|(_, value)| !is_blank(value)));
    out
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(_) => false,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.values().all(is_blank),
    }
}

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
