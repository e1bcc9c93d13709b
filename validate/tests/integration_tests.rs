use questpack_core::{RawValue, Severity, ValidationIssue, has_errors};
use questpack_validate::{SchemaNode, validate_pack_tree};
use serde_json::json;

fn sample_pack() -> serde_json::Value {
    json!({
        "id": "starter_pack",
        "title": "Starter Pack",
        "file_version": 13,
        "chapter_groups": [
            {"id": "main", "title": "Main", "chapter_ids": ["intro", "mining"]}
        ],
        "chapters": [
            {
                "id": "intro",
                "title": "Introduction",
                "icon": "minecraft:book",
                "background": "textures/gui/intro.png",
                "quests": [
                    {
                        "id": "welcome",
                        "title": "Welcome",
                        "icon": "minecraft:oak_sapling",
                        "tasks": [{"type": "checkmark"}],
                        "rewards": [{"type": "loot_table", "table": "starter_loot"}]
                    },
                    {
                        "id": "first_tools",
                        "title": "First Tools",
                        "icon": "minecraft:wooden_pickaxe",
                        "dependencies": ["welcome"],
                        "tasks": [{"type": "item", "item": {"id": "minecraft:wooden_pickaxe", "count": 1}}],
                        "rewards": [{"type": "xp", "xp": 25}]
                    }
                ]
            },
            {
                "id": "mining",
                "title": "Mining",
                "icon": "minecraft:iron_pickaxe",
                "background": "textures/gui/mining.png",
                "quests": [
                    {
                        "id": "deep_dive",
                        "title": "Deep Dive",
                        "icon": "minecraft:diamond",
                        "dependencies": [{"quest": "first_tools", "required": true}],
                        "tasks": [{
                            "type": "location",
                            "dimension": "minecraft:overworld",
                            "x": 0, "y": -40, "z": 0, "radius": 16
                        }],
                        "rewards": []
                    }
                ]
            }
        ],
        "loot_tables": [
            {"id": "starter_loot", "title": "Starter Loot", "entries": [{"item": "minecraft:bread"}]}
        ]
    })
}

#[test]
fn test_well_formed_pack_has_no_issues() {
    let issues = validate_pack_tree(&RawValue::from(sample_pack()));
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");
}

#[test]
fn test_union_of_string_and_number_reports_first_candidate_on_boolean() {
    let identifier = SchemaNode::union(vec![SchemaNode::string(), SchemaNode::Number]);
    let mut issues = Vec::new();
    identifier.validate(&RawValue::Bool(false), "$.chapters[0].id", &mut issues);

    assert_eq!(
        issues,
        vec![ValidationIssue::error(
            "$.chapters[0].id",
            "Expected string but found boolean"
        )]
    );
}

#[test]
fn test_duplicate_chapter_id_names_id_and_first_path() {
    let mut pack = sample_pack();
    pack["chapters"][1]["id"] = json!("intro");
    pack["chapter_groups"][0]["chapter_ids"] = json!(["intro"]);

    let issues = validate_pack_tree(&RawValue::from(pack));
    let duplicates: Vec<_> = issues
        .iter()
        .filter(|issue| issue.message.contains("already defined"))
        .collect();

    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].severity, Severity::Error);
    assert!(duplicates[0].message.contains("intro"));
    assert!(duplicates[0].message.contains("$.chapters[0].id"));
}

#[test]
fn test_resolvable_dependencies_produce_no_dependency_errors() {
    let issues = validate_pack_tree(&RawValue::from(sample_pack()));
    assert!(!issues.iter().any(|issue| issue.path.contains("dependencies")));

    let mut broken = sample_pack();
    broken["chapters"][1]["quests"][0]["dependencies"] = json!([{"quest": "missing"}]);
    let issues = validate_pack_tree(&RawValue::from(broken));
    assert!(has_errors(&issues));
    assert_eq!(
        issues[0].path,
        "$.chapters[1].quests[0].dependencies[0].quest"
    );
}

#[test]
fn test_schema_issues_come_before_reference_issues() {
    let mut pack = sample_pack();
    pack["chapters"][0]["quests"][0]["title"] = json!("  ");
    pack["chapter_groups"][0]["chapter_ids"] = json!(["intro", "ghost"]);

    let issues = validate_pack_tree(&RawValue::from(pack));
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0].message, "Value cannot be blank");
    assert!(issues[1].message.contains("ghost"));
}

#[test]
fn test_both_passes_report_groups_without_chapters_once_each() {
    let mut pack = sample_pack();
    pack["chapter_groups"][0]
        .as_object_mut()
        .unwrap()
        .remove("chapter_ids");

    let issues = validate_pack_tree(&RawValue::from(pack));
    assert!(issues.iter().all(|issue| issue.path == "$.chapter_groups[0]"));
    assert_eq!(issues.len(), 2);
}
