//! Cross-reference checks over a raw pack tree.
//!
//! Runs independently of the structural schema: malformed entries are
//! skipped silently since the schema pass already reports them.

use std::collections::HashMap;

use questpack_core::{ROOT_PATH, RawValue, ValidationIssue, field_path, index_path};
use tracing::debug;

/// Declared ids of one category, with the path of their first declaration.
#[derive(Debug)]
struct IdIndex {
    label: &'static str,
    first_seen: HashMap<String, String>,
}

impl IdIndex {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            first_seen: HashMap::new(),
        }
    }

    fn declare(&mut self, id: String, path: String, issues: &mut Vec<ValidationIssue>) {
        if let Some(first) = self.first_seen.get(&id) {
            issues.push(ValidationIssue::error(
                &path,
                format!("{} id '{id}' is already defined at {first}", self.label),
            ));
            return;
        }
        self.first_seen.insert(id, path);
    }

    fn contains(&self, id: &str) -> bool {
        self.first_seen.contains_key(id)
    }
}

/// A reference recorded during the forward pass and resolved afterwards.
#[derive(Debug)]
struct Reference {
    target: String,
    path: String,
}

#[derive(Debug)]
struct Collector {
    groups: IdIndex,
    chapters: IdIndex,
    quests: IdIndex,
    loot_tables: IdIndex,
    chapter_refs: Vec<Reference>,
    dependency_refs: Vec<Reference>,
    loot_table_refs: Vec<Reference>,
    issues: Vec<ValidationIssue>,
}

impl Collector {
    fn new() -> Self {
        Self {
            groups: IdIndex::new("Chapter group"),
            chapters: IdIndex::new("Chapter"),
            quests: IdIndex::new("Quest"),
            loot_tables: IdIndex::new("Loot table"),
            chapter_refs: Vec::new(),
            dependency_refs: Vec::new(),
            loot_table_refs: Vec::new(),
            issues: Vec::new(),
        }
    }

    fn visit_root(&mut self, root: &RawValue) {
        for (index, group) in entries(root, "chapter_groups") {
            self.visit_group(group, &index_path(&field_path(ROOT_PATH, "chapter_groups"), index));
        }
        for (index, chapter) in entries(root, "chapters") {
            self.visit_chapter(chapter, &index_path(&field_path(ROOT_PATH, "chapters"), index));
        }
        for (index, table) in entries(root, "loot_tables") {
            let path = index_path(&field_path(ROOT_PATH, "loot_tables"), index);
            if let Some(id) = table.get("id").and_then(RawValue::as_id) {
                self.loot_tables
                    .declare(id, field_path(&path, "id"), &mut self.issues);
            }
        }
    }

    fn visit_group(&mut self, group: &RawValue, path: &str) {
        if let Some(id) = group.get("id").and_then(RawValue::as_id) {
            self.groups.declare(id, field_path(path, "id"), &mut self.issues);
        }

        // `chapter_ids` wins over `chapters` when both are non-empty.
        let listed = ["chapter_ids", "chapters"].into_iter().find_map(|key| {
            group
                .get(key)
                .and_then(RawValue::as_list)
                .filter(|items| !items.is_empty())
                .map(|items| (key, items))
        });

        let Some((key, items)) = listed else {
            self.issues.push(ValidationIssue::error(
                path,
                "Chapter group must reference at least one chapter",
            ));
            return;
        };
        let list_path = field_path(path, key);
        for (index, item) in items.iter().enumerate() {
            if let Some(target) = item.as_id() {
                self.chapter_refs.push(Reference {
                    target,
                    path: index_path(&list_path, index),
                });
            }
        }
    }

    fn visit_chapter(&mut self, chapter: &RawValue, path: &str) {
        if let Some(id) = chapter.get("id").and_then(RawValue::as_id) {
            self.chapters.declare(id, field_path(path, "id"), &mut self.issues);
        }
        let quests_path = field_path(path, "quests");
        for (index, quest) in entries(chapter, "quests") {
            self.visit_quest(quest, &index_path(&quests_path, index));
        }
    }

    fn visit_quest(&mut self, quest: &RawValue, path: &str) {
        let quest_id = quest.get("id").and_then(RawValue::as_id);
        if let Some(id) = &quest_id {
            self.quests
                .declare(id.clone(), field_path(path, "id"), &mut self.issues);
        }

        if let Some(dependencies) = quest.get("dependencies") {
            let deps_path = field_path(path, "dependencies");
            match dependencies.as_list() {
                Some(items) => {
                    for (index, item) in items.iter().enumerate() {
                        self.record_dependency(item, index_path(&deps_path, index), quest_id.as_deref());
                    }
                }
                None => self.record_dependency(dependencies, deps_path, quest_id.as_deref()),
            }
        }

        let tasks_path = field_path(path, "tasks");
        for (index, task) in entries(quest, "tasks") {
            self.check_task(task, &index_path(&tasks_path, index));
        }
        let rewards_path = field_path(path, "rewards");
        for (index, reward) in entries(quest, "rewards") {
            self.check_reward(reward, &index_path(&rewards_path, index));
        }
    }

    fn record_dependency(&mut self, entry: &RawValue, path: String, owner: Option<&str>) {
        let (target, path) = match entry {
            RawValue::Compound(map) => {
                let Some((key, target)) = ["quest", "id"]
                    .into_iter()
                    .find_map(|key| map.get(key).and_then(RawValue::as_id).map(|id| (key, id)))
                else {
                    return;
                };
                (target, field_path(&path, key))
            }
            other => match other.as_id() {
                Some(target) => (target, path),
                None => return,
            },
        };

        if owner == Some(target.as_str()) {
            self.issues.push(ValidationIssue::warning(
                &path,
                format!("Quest '{target}' depends on itself"),
            ));
        }
        self.dependency_refs.push(Reference { target, path });
    }

    fn check_task(&mut self, task: &RawValue, path: &str) {
        match task.get("type").and_then(RawValue::as_str) {
            Some("item") => self.check_item(task, path, "Item task"),
            Some("location") => {
                if task.get("dimension").and_then(RawValue::as_str).is_none() {
                    self.issues.push(ValidationIssue::error(
                        field_path(path, "dimension"),
                        "Location task requires a string 'dimension'",
                    ));
                }
                for key in ["x", "y", "z", "radius"] {
                    if !task.get(key).is_some_and(RawValue::is_number) {
                        self.issues.push(ValidationIssue::error(
                            field_path(path, key),
                            format!("Location task requires a numeric '{key}'"),
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    fn check_reward(&mut self, reward: &RawValue, path: &str) {
        match reward.get("type").and_then(RawValue::as_str) {
            Some("item") => self.check_item(reward, path, "Item reward"),
            Some("loot_table") => {
                let table_path = field_path(path, "table");
                match reward.get("table").and_then(RawValue::as_str) {
                    Some(table) if !table.trim().is_empty() => {
                        self.loot_table_refs.push(Reference {
                            target: table.to_string(),
                            path: table_path,
                        });
                    }
                    _ => self.issues.push(ValidationIssue::error(
                        table_path,
                        "Loot table reward requires a non-blank 'table'",
                    )),
                }
            }
            _ => {}
        }
    }

    fn check_item(&mut self, entry: &RawValue, path: &str, label: &str) {
        let id = entry.get("item").and_then(|item| match item {
            RawValue::String(id) => Some(id.as_str()),
            other => other.get("id").and_then(RawValue::as_str),
        });
        if id.is_none_or(|id| id.trim().is_empty()) {
            self.issues.push(ValidationIssue::error(
                field_path(path, "item"),
                format!("{label} requires a non-blank item id"),
            ));
        }
    }

    fn resolve_references(&mut self) {
        for reference in &self.chapter_refs {
            if !self.chapters.contains(&reference.target) {
                self.issues.push(ValidationIssue::error(
                    &reference.path,
                    format!("Unknown chapter '{}' referenced by chapter group", reference.target),
                ));
            }
        }
        for reference in &self.dependency_refs {
            if !self.quests.contains(&reference.target) {
                self.issues.push(ValidationIssue::error(
                    &reference.path,
                    format!("Unknown quest '{}' referenced as dependency", reference.target),
                ));
            }
        }
        for reference in &self.loot_table_refs {
            if !self.loot_tables.contains(&reference.target) {
                self.issues.push(ValidationIssue::error(
                    &reference.path,
                    format!("Unknown loot table '{}' referenced by reward", reference.target),
                ));
            }
        }
    }
}

/// Enumerated compound entries of the list stored under `key`.
fn entries<'a>(parent: &'a RawValue, key: &str) -> impl Iterator<Item = (usize, &'a RawValue)> {
    parent
        .get(key)
        .and_then(RawValue::as_list)
        .unwrap_or_default()
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.as_compound().is_some())
}

/// Checks id uniqueness, reference resolution and kind-specific required
/// fields of a pack tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossReferenceValidator;

impl CrossReferenceValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, root: &RawValue) -> Vec<ValidationIssue> {
        if root.as_compound().is_none() {
            return Vec::new();
        }
        let mut collector = Collector::new();
        collector.visit_root(root);
        collector.resolve_references();
        debug!(
            chapters = collector.chapters.first_seen.len(),
            quests = collector.quests.first_seen.len(),
            issues = collector.issues.len(),
            "cross-reference validation finished"
        );
        collector.issues
    }
}

#[cfg(test)]
mod tests {
    use questpack_core::{Severity, has_errors};
    use serde_json::json;

    use super::*;

    fn validate(value: serde_json::Value) -> Vec<ValidationIssue> {
        CrossReferenceValidator::new().validate(&RawValue::from(value))
    }

    #[test]
    fn test_duplicate_chapter_reports_first_path() {
        let issues = validate(json!({
            "chapters": [{"id": "intro"}, {"id": "intro"}]
        }));
        assert_eq!(
            issues,
            vec![ValidationIssue::error(
                "$.chapters[1].id",
                "Chapter id 'intro' is already defined at $.chapters[0].id"
            )]
        );
    }

    #[test]
    fn test_numeric_and_string_ids_collide() {
        let issues = validate(json!({
            "chapters": [{"id": "c", "quests": [{"id": 7}, {"id": "7"}]}]
        }));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.starts_with("Quest id '7'"));
    }

    #[test]
    fn test_unknown_dependency_is_error() {
        let issues = validate(json!({
            "chapters": [{"id": "c", "quests": [
                {"id": "a", "dependencies": [{"quest": "ghost"}]}
            ]}]
        }));
        assert_eq!(
            issues,
            vec![ValidationIssue::error(
                "$.chapters[0].quests[0].dependencies[0].quest",
                "Unknown quest 'ghost' referenced as dependency"
            )]
        );
    }

    #[test]
    fn test_self_dependency_is_warning() {
        let issues = validate(json!({
            "chapters": [{"id": "c", "quests": [{"id": "a", "dependencies": "a"}]}]
        }));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_group_prefers_chapter_ids() {
        let issues = validate(json!({
            "chapter_groups": [{"id": "g", "chapter_ids": ["intro"], "chapters": ["ghost"]}],
            "chapters": [{"id": "intro"}]
        }));
        assert!(issues.is_empty());

        let issues = validate(json!({
            "chapter_groups": [{"id": "g", "chapter_ids": [], "chapters": ["ghost"]}],
            "chapters": [{"id": "intro"}]
        }));
        assert_eq!(issues[0].path, "$.chapter_groups[0].chapters[0]");
    }

    #[test]
    fn test_kind_spot_checks() {
        let issues = validate(json!({
            "chapters": [{"id": "c", "quests": [{
                "id": "a",
                "tasks": [
                    {"type": "item", "item": {"id": " "}},
                    {"type": "location", "dimension": "minecraft:overworld", "x": 1, "y": 2, "z": "3"}
                ],
                "rewards": [
                    {"type": "item", "item": "minecraft:apple"},
                    {"type": "loot_table"}
                ]
            }]}]
        }));
        let paths: Vec<_> = issues.iter().map(|issue| issue.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "$.chapters[0].quests[0].tasks[0].item",
                "$.chapters[0].quests[0].tasks[1].z",
                "$.chapters[0].quests[0].tasks[1].radius",
                "$.chapters[0].quests[0].rewards[1].table",
            ]
        );
    }

    #[test]
    fn test_loot_table_reference_must_resolve() {
        let pack = |table: &str| {
            json!({
                "chapters": [{"id": "c", "quests": [{
                    "id": "a", "rewards": [{"type": "loot_table", "table": table}]
                }]}],
                "loot_tables": [{"id": "starter"}]
            })
        };
        assert!(!has_errors(&validate(pack("starter"))));
        assert!(has_errors(&validate(pack("missing"))));
    }

    #[test]
    fn test_non_object_root_yields_nothing() {
        assert!(validate(json!([1, 2])).is_empty());
    }
}
