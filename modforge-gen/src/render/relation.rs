//! Relation accessor rendering
//!
//! Turns a model's relation list into Eloquent accessor methods and the
//! imports they need. Handles:
//! - `belongsTo` / `hasMany`: class, foreign key, owner key
//! - `belongsToMany`: class, pivot table, pivot keys
//! - the `hasMany` mirror injected into a parent model (`isParentHasMany`)
//!
//! Unknown relation kinds are skipped with a warning.

use super::{ImportList, php_string, reindent, pluralize, short_class};
use crate::definition::{ModelDefinition, Relation, RelationDescriptor, RelationKind};
use heck::ToLowerCamelCase;

/// Indentation of a method inside a class body
pub const METHOD_INDENT: &str = "    ";

/// One rendered accessor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRelation {
    pub kind: RelationKind,
    /// Accessor method name
    pub method_name: String,
    /// Classes the method refers to, related class first
    pub imports: Vec<String>,
    /// Full method text indented for a class body
    pub method: String,
}

/// Every accessor of one model plus the merged import list
#[derive(Debug, Clone, Default)]
pub struct RenderedRelations {
    pub imports: ImportList,
    pub relations: Vec<RenderedRelation>,
}

impl RenderedRelations {
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn methods(&self) -> Vec<String> {
        self.relations.iter().map(|r| r.method.clone()).collect()
    }

    /// Methods separated by one blank line
    pub fn methods_block(&self) -> String {
        self.methods().join("\n\n")
    }
}

/// Render all relations of `model`
pub fn render_relations(model: &ModelDefinition) -> RenderedRelations {
    let own_fqcn = model.class_fqcn();
    let mut rendered = RenderedRelations::default();
    for relation in model.relations() {
        let Some(accessor) = render_relation(&own_fqcn, relation) else {
            continue;
        };
        rendered.imports.extend(accessor.imports.iter().cloned());
        rendered.relations.push(accessor);
    }
    rendered
}

/// Render one relation of the class `own_fqcn`
///
/// Returns `None` for unknown kinds and for descriptors whose related class
/// cannot be resolved.
pub fn render_relation(own_fqcn: &str, relation: &Relation) -> Option<RenderedRelation> {
    let (kind, descriptor) = match (relation.kind(), relation.descriptor()) {
        (Some(kind), Some(descriptor)) => (kind, descriptor),
        _ => {
            let tag = match relation {
                Relation::Unknown(raw) => raw.get("type").cloned().unwrap_or_default(),
                _ => serde_json::Value::Null,
            };
            tracing::warn!(class = own_fqcn, relation_type = %tag, "skipping unknown relation type");
            return None;
        }
    };

    let Some(related_fqcn) = descriptor.model.resolve_fqcn() else {
        tracing::warn!(
            class = own_fqcn,
            relation = descriptor.name.as_str(),
            "skipping relation without a related class"
        );
        return None;
    };
    let related_short = short_class(&related_fqcn).to_string();

    let method_name = accessor_name(kind, &descriptor.name, &related_short);
    let arguments = relation_arguments(kind, descriptor, &format!("{related_short}::class"));
    Some(RenderedRelation {
        kind,
        imports: relation_imports(own_fqcn, &related_fqcn, kind),
        method: accessor_method(&method_name, kind, &arguments),
        method_name,
    })
}

/// Render the `hasMany` accessor a parent gets for a child's `belongsTo`
///
/// Only `belongsTo` relations flagged `isParentHasMany` produce a mirror.
pub fn render_parent_has_many(child: &ModelDefinition, relation: &Relation) -> Option<RenderedRelation> {
    let Relation::BelongsTo(descriptor) = relation else {
        return None;
    };
    if !descriptor.is_parent_has_many {
        return None;
    }
    let parent_fqcn = descriptor.model.resolve_fqcn()?;
    let child_fqcn = child.class_fqcn();
    let child_short = short_class(&child_fqcn).to_string();

    let kind = RelationKind::HasMany;
    let method_name = accessor_name(kind, "", &child_short);
    let arguments = relation_arguments(kind, descriptor, &format!("{child_short}::class"));
    Some(RenderedRelation {
        kind,
        imports: relation_imports(&parent_fqcn, &child_fqcn, kind),
        method: accessor_method(&method_name, kind, &arguments),
        method_name,
    })
}

/// Argument list of the relation call
///
/// - `belongsTo` / `hasMany`: `Class`, `Class, fk`, `Class, fk, owner`
/// - `belongsToMany`: `Class`, `Class, pivot`, `Class, pivot, fpk, rpk`
///
/// A trailing key without its predecessor gets `null` in the gap so the
/// positional arguments keep their meaning.
pub fn relation_arguments(kind: RelationKind, descriptor: &RelationDescriptor, class_ref: &str) -> Vec<String> {
    let mut args = vec![class_ref.to_string()];
    match kind {
        RelationKind::BelongsTo | RelationKind::HasMany => {
            match (&descriptor.foreign_key, &descriptor.owner_key) {
                (None, None) => {}
                (Some(fk), None) => args.push(php_string(fk)),
                (Some(fk), Some(owner)) => {
                    args.push(php_string(fk));
                    args.push(php_string(owner));
                }
                (None, Some(owner)) => {
                    args.push("null".to_string());
                    args.push(php_string(owner));
                }
            }
        }
        RelationKind::BelongsToMany => {
            match (&descriptor.pivot_table, &descriptor.pivot_keys) {
                (None, None) => {}
                (Some(table), None) => args.push(php_string(table)),
                (Some(table), Some(keys)) => {
                    args.push(php_string(table));
                    args.push(php_string(&keys.foreign_pivot_key));
                    args.push(php_string(&keys.related_pivot_key));
                }
                (None, Some(keys)) => {
                    args.push("null".to_string());
                    args.push(php_string(&keys.foreign_pivot_key));
                    args.push(php_string(&keys.related_pivot_key));
                }
            }
        }
    }
    args
}

/// Accessor name: the descriptor's name, else derived from the related class
pub fn accessor_name(kind: RelationKind, explicit: &str, related_short: &str) -> String {
    if !explicit.trim().is_empty() {
        return explicit.trim().to_string();
    }
    match kind {
        RelationKind::BelongsTo => related_short.to_lower_camel_case(),
        RelationKind::HasMany | RelationKind::BelongsToMany => {
            pluralize(related_short).to_lower_camel_case()
        }
    }
}

/// Full accessor method text
pub fn accessor_method(name: &str, kind: RelationKind, arguments: &[String]) -> String {
    let body = format!(
        "public function {name}(): {class}\n{{\n    return $this->{call}({args});\n}}",
        class = kind.class_name(),
        call = kind.tag(),
        args = arguments.join(", "),
    );
    reindent(&body, METHOD_INDENT)
}

fn relation_imports(own_fqcn: &str, related_fqcn: &str, kind: RelationKind) -> Vec<String> {
    let mut imports = Vec::with_capacity(2);
    if related_fqcn.trim_start_matches('\\') != own_fqcn.trim_start_matches('\\') {
        imports.push(related_fqcn.to_string());
    }
    imports.push(kind.class_fqcn());
    imports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{PivotKeys, RelatedModel};
    use serde_json::json;

    fn author() -> RelatedModel {
        RelatedModel::new("Author", "Modules\\Blog\\Models")
    }

    fn post() -> ModelDefinition {
        ModelDefinition::new("post", "Post", "Modules\\Blog\\Models", "blog_posts", "Blog").unwrap()
    }

    #[test]
    fn test_belongs_to_with_foreign_key() {
        let mut model = post();
        model.add_relation(Relation::BelongsTo(
            RelationDescriptor::new("author", author()).foreign_key("author_id"),
        ));
        let rendered = render_relations(&model);

        assert_eq!(
            rendered.imports.lines(),
            vec![
                "use Modules\\Blog\\Models\\Author;",
                "use Illuminate\\Database\\Eloquent\\Relations\\BelongsTo;",
            ]
        );
        assert_eq!(
            rendered.methods_block(),
            "    public function author(): BelongsTo\n    {\n        return $this->belongsTo(Author::class, 'author_id');\n    }"
        );
    }

    #[test]
    fn test_belongs_to_argument_combinations() {
        let kind = RelationKind::BelongsTo;
        let base = RelationDescriptor::new("author", author());
        assert_eq!(relation_arguments(kind, &base, "A::class"), vec!["A::class"]);

        let fk = base.clone().foreign_key("author_id");
        assert_eq!(relation_arguments(kind, &fk, "A::class"), vec!["A::class", "'author_id'"]);

        let both = fk.clone().owner_key("uuid");
        assert_eq!(
            relation_arguments(kind, &both, "A::class"),
            vec!["A::class", "'author_id'", "'uuid'"]
        );

        let owner_only = base.owner_key("uuid");
        assert_eq!(
            relation_arguments(kind, &owner_only, "A::class"),
            vec!["A::class", "null", "'uuid'"]
        );
    }

    #[test]
    fn test_has_many_argument_combinations() {
        let kind = RelationKind::HasMany;
        let base = RelationDescriptor::new("comments", RelatedModel::new("Comment", "App"));
        assert_eq!(relation_arguments(kind, &base, "C::class"), vec!["C::class"]);
        assert_eq!(
            relation_arguments(kind, &base.clone().foreign_key("post_id"), "C::class"),
            vec!["C::class", "'post_id'"]
        );
        assert_eq!(
            relation_arguments(kind, &base.foreign_key("post_id").owner_key("id"), "C::class"),
            vec!["C::class", "'post_id'", "'id'"]
        );
    }

    #[test]
    fn test_belongs_to_many_argument_combinations() {
        let kind = RelationKind::BelongsToMany;
        let keys = PivotKeys {
            foreign_pivot_key: "post_id".into(),
            related_pivot_key: "tag_id".into(),
        };
        let base = RelationDescriptor::new("tags", RelatedModel::new("Tag", "App"));
        assert_eq!(relation_arguments(kind, &base, "T::class"), vec!["T::class"]);
        assert_eq!(
            relation_arguments(kind, &base.clone().pivot("post_tag", None), "T::class"),
            vec!["T::class", "'post_tag'"]
        );
        assert_eq!(
            relation_arguments(kind, &base.clone().pivot("post_tag", Some(keys.clone())), "T::class"),
            vec!["T::class", "'post_tag'", "'post_id'", "'tag_id'"]
        );

        let mut keys_only = base.clone();
        keys_only.pivot_keys = Some(keys);
        assert_eq!(
            relation_arguments(kind, &keys_only, "T::class"),
            vec!["T::class", "null", "'post_id'", "'tag_id'"]
        );

        // foreign/owner keys do not leak into many-to-many calls
        let noisy = base.foreign_key("x").owner_key("y");
        assert_eq!(relation_arguments(kind, &noisy, "T::class"), vec!["T::class"]);
    }

    #[test]
    fn test_same_class_imported_once() {
        let mut model = post();
        model.add_relation(Relation::BelongsTo(
            RelationDescriptor::new("author", author()).foreign_key("author_id"),
        ));
        model.add_relation(Relation::BelongsTo(
            RelationDescriptor::new("editor", author()).foreign_key("editor_id"),
        ));
        let rendered = render_relations(&model);
        let author_lines = rendered
            .imports
            .lines()
            .into_iter()
            .filter(|l| l == "use Modules\\Blog\\Models\\Author;")
            .count();
        assert_eq!(author_lines, 1);
        assert_eq!(rendered.imports.len(), 2);
        assert_eq!(rendered.relations.len(), 2);
        assert!(rendered.methods_block().contains("}\n\n    public function editor(): BelongsTo"));
    }

    #[test]
    fn test_unknown_relations_are_skipped() {
        let mut model = post();
        model.add_relation(Relation::from_value(json!({"type": "morphTo", "name": "subject"})));
        model.add_relation(Relation::HasMany(RelationDescriptor::new(
            "",
            RelatedModel::new("Comment", "Modules\\Blog\\Models"),
        )));
        let rendered = render_relations(&model);
        assert_eq!(rendered.relations.len(), 1);
        assert_eq!(rendered.relations[0].method_name, "comments");
    }

    #[test]
    fn test_explicit_fqcn_and_self_reference() {
        let mut model = post();
        let mut parent = RelatedModel::new("Post", "Modules\\Blog\\Models");
        parent.fqcn = Some("\\Modules\\Blog\\Models\\Post".into());
        model.add_relation(Relation::BelongsTo(
            RelationDescriptor::new("parent", parent).foreign_key("parent_id"),
        ));
        let rendered = render_relations(&model);
        assert_eq!(
            rendered.imports.lines(),
            vec!["use Illuminate\\Database\\Eloquent\\Relations\\BelongsTo;"]
        );
        assert!(rendered.methods_block().contains("belongsTo(Post::class, 'parent_id')"));
    }

    #[test]
    fn test_parent_has_many_mirror() {
        let comment = ModelDefinition::new(
            "comment",
            "Comment",
            "Modules\\Blog\\Models",
            "blog_comments",
            "Blog",
        )
        .unwrap();
        let relation = Relation::BelongsTo(
            RelationDescriptor::new("post", RelatedModel::new("Post", "Modules\\Blog\\Models"))
                .foreign_key("post_id")
                .parent_has_many(true),
        );
        let mirror = render_parent_has_many(&comment, &relation).unwrap();
        assert_eq!(mirror.method_name, "comments");
        assert_eq!(
            mirror.imports,
            vec![
                "Modules\\Blog\\Models\\Comment".to_string(),
                "Illuminate\\Database\\Eloquent\\Relations\\HasMany".to_string(),
            ]
        );
        assert!(mirror.method.contains("return $this->hasMany(Comment::class, 'post_id');"));

        let plain = Relation::BelongsTo(RelationDescriptor::new("post", author()));
        assert!(render_parent_has_many(&comment, &plain).is_none());
    }
}
