//! The quest pack document schema.

use std::sync::LazyLock;

use questpack_core::{ROOT_PATH, RawValue, ValidationIssue, Visibility};
use tracing::debug;

use crate::schema::{ObjectRule, ObjectSchema, SchemaNode};

static PACK_SCHEMA: LazyLock<SchemaNode> = LazyLock::new(pack_schema);

fn identifier() -> SchemaNode {
    SchemaNode::union(vec![SchemaNode::string(), SchemaNode::Number])
}

fn visibility() -> SchemaNode {
    SchemaNode::enumeration(Visibility::ALL.iter().map(|v| v.name()))
}

fn description() -> SchemaNode {
    SchemaNode::union(vec![SchemaNode::text(), SchemaNode::array(SchemaNode::text())])
}

fn typed_entry() -> SchemaNode {
    let kind = SchemaNode::pattern(r"^[a-z][a-z0-9_]*$", "a lower-case snake_case kind name")
        .expect("static regex must compile");
    SchemaNode::object(ObjectSchema::new().required("type", kind).allow_unknown())
}

fn dependency() -> SchemaNode {
    let object = SchemaNode::object(
        ObjectSchema::new()
            .optional("quest", identifier())
            .optional("id", identifier())
            .optional("required", SchemaNode::Boolean)
            .optional("optional", SchemaNode::Boolean)
            .rule(ObjectRule::RequireAnyOf(vec!["quest".into(), "id".into()])),
    );
    SchemaNode::union(vec![identifier(), object])
}

fn quest() -> SchemaNode {
    SchemaNode::object(
        ObjectSchema::new()
            .required("id", identifier())
            .required("title", SchemaNode::string())
            .required("icon", SchemaNode::string())
            .required("tasks", SchemaNode::array(typed_entry()))
            .required("rewards", SchemaNode::array(typed_entry()))
            .optional("description", description())
            .optional(
                "dependencies",
                SchemaNode::union(vec![dependency(), SchemaNode::array(dependency())]),
            )
            .optional("visibility", visibility())
            .optional("x", SchemaNode::Number)
            .optional("y", SchemaNode::Number)
            .optional("shape", SchemaNode::string())
            .optional("size", SchemaNode::Number),
    )
}

fn chapter() -> SchemaNode {
    let image = SchemaNode::object(
        ObjectSchema::new()
            .required("image", SchemaNode::string())
            .allow_unknown(),
    );
    let quest_link = SchemaNode::object(
        ObjectSchema::new()
            .required("linked_quest", identifier())
            .allow_unknown(),
    );

    SchemaNode::object(
        ObjectSchema::new()
            .required("id", identifier())
            .required("title", SchemaNode::string())
            .required("icon", SchemaNode::string())
            .required("background", SchemaNode::string())
            .required("quests", SchemaNode::array(quest()))
            .optional("description", description())
            .optional("group", identifier())
            .optional("visibility", visibility())
            .optional("images", SchemaNode::array(image))
            .optional("quest_links", SchemaNode::array(quest_link))
            .optional("order_index", SchemaNode::Number),
    )
}

fn chapter_group() -> SchemaNode {
    SchemaNode::object(
        ObjectSchema::new()
            .required("id", identifier())
            .required("title", SchemaNode::string())
            .optional("icon", SchemaNode::string())
            .optional("visibility", visibility())
            .optional("chapter_ids", SchemaNode::array(identifier()))
            .optional("chapters", SchemaNode::array(identifier()))
            .rule(ObjectRule::RequireAnyOf(vec![
                "chapter_ids".into(),
                "chapters".into(),
            ])),
    )
}

fn loot_table() -> SchemaNode {
    SchemaNode::object(
        ObjectSchema::new()
            .required("id", identifier())
            .required(
                "entries",
                SchemaNode::array(SchemaNode::object(ObjectSchema::new().allow_unknown())),
            )
            .optional("title", SchemaNode::string())
            .allow_unknown(),
    )
}

fn pack_schema() -> SchemaNode {
    SchemaNode::object(
        ObjectSchema::new()
            .required("id", identifier())
            .required("title", SchemaNode::string())
            .required("chapters", SchemaNode::array(chapter()))
            .optional("file_version", identifier())
            .optional("version", identifier())
            .optional("description", description())
            .optional("icon", SchemaNode::string())
            .optional("chapter_groups", SchemaNode::array(chapter_group()))
            .optional("loot_tables", SchemaNode::array(loot_table())),
    )
}

/// Checks a pack tree against the structural pack schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Returns every structural issue of `root`, in document order.
    pub fn validate(&self, root: &RawValue) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        PACK_SCHEMA.validate(root, ROOT_PATH, &mut issues);
        debug!(issues = issues.len(), "schema validation finished");
        issues
    }
}
