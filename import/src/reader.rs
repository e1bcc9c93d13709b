//! Lenient conversion of a raw pack tree into an [`ImportedPack`].
//!
//! Reading never fails on a malformed record. Missing values fall back to
//! defaults and problems become pack warnings, so a pack that only partly
//! validates can still be inspected and merged. The only fatal case is a
//! root that is not an object.

use std::collections::{BTreeSet, HashSet};

use questpack_core::{DEFAULT_ICON, KindRegistry, PropertyMap, RawValue, Visibility};
use tracing::{debug, info};

use crate::error::ReadError;
use crate::pack::{
    ImportedChapter, ImportedChapterGroup, ImportedDependency, ImportedLootTable, ImportedPack,
    ImportedQuest, ImportedReward, ImportedTask,
};

const CHAPTER_KEYS: &[&str] = &[
    "id",
    "title",
    "description",
    "group",
    "icon",
    "background",
    "visibility",
    "quests",
    "images",
    "quest_links",
];

/// Chapter display fields a merge only overwrites when the pack sets them.
const CHAPTER_DISPLAY_KEYS: &[&str] = &["title", "description", "icon", "visibility"];

const QUEST_KEYS: &[&str] = &[
    "id",
    "title",
    "description",
    "icon",
    "visibility",
    "tasks",
    "rewards",
    "dependencies",
];

/// Generates an id for a record that declares none.
pub fn fresh_id() -> String {
    format!("{:016X}", rand::random::<u64>())
}

/// Reads raw pack trees using a [`KindRegistry`] to recognize task and
/// reward kinds.
///
/// # Examples
///
/// ```
/// use questpack_core::{KindRegistry, RawValue};
/// use questpack_import::PackReader;
///
/// let registry = KindRegistry::standard();
/// let tree = RawValue::from(serde_json::json!({
///     "id": "pack",
///     "chapters": [{"id": "intro", "quests": [{"id": "welcome"}]}]
/// }));
///
/// let pack = PackReader::new(&registry).read(&tree).unwrap();
/// assert_eq!(pack.title, "pack");
/// assert_eq!(pack.warnings, vec!["Quest 'welcome' has no tasks"]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PackReader<'a> {
    registry: &'a KindRegistry,
}

impl<'a> PackReader<'a> {
    pub fn new(registry: &'a KindRegistry) -> Self {
        Self { registry }
    }

    /// Reads `root` into a typed pack.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::RootNotObject`] when `root` is not a compound.
    pub fn read(&self, root: &RawValue) -> Result<ImportedPack, ReadError> {
        if root.as_compound().is_none() {
            return Err(ReadError::RootNotObject {
                found: root.kind_name(),
            });
        }

        let mut state = ReadState::default();
        let id = id_or_fresh(root);
        let title = string_or(root, "title", &id);
        let schema_version = ["file_version", "version"]
            .into_iter()
            .filter_map(|key| root.get(key))
            .find(|value| !value.is_null())
            .map(RawValue::to_display_string);

        let chapter_groups = compounds(root, "chapter_groups", "chapter group", &mut state)
            .into_iter()
            .map(|group| self.read_group(group, &mut state))
            .collect();

        let mut chapters: Vec<ImportedChapter> = Vec::new();
        let mut chapter_ids = HashSet::new();
        for raw in compounds(root, "chapters", "chapter", &mut state) {
            let chapter = self.read_chapter(raw, &mut state);
            if !chapter_ids.insert(chapter.id.clone()) {
                state.warn(format!(
                    "Duplicate chapter id '{}' in pack; later definition ignored",
                    chapter.id
                ));
                continue;
            }
            chapters.push(chapter);
        }

        let loot_tables = compounds(root, "loot_tables", "loot table", &mut state)
            .into_iter()
            .map(read_loot_table)
            .collect();

        let pack = ImportedPack {
            id,
            title,
            schema_version,
            chapter_groups,
            chapters,
            loot_tables,
            referenced_assets: state.assets,
            warnings: state.warnings,
        };
        info!(
            pack = %pack.id,
            chapters = pack.chapters.len(),
            quests = pack.quest_count(),
            warnings = pack.warnings.len(),
            "read quest pack"
        );
        Ok(pack)
    }

    fn read_group(&self, raw: &RawValue, state: &mut ReadState) -> ImportedChapterGroup {
        let id = id_or_fresh(raw);
        let icon = string_or(raw, "icon", DEFAULT_ICON);
        state.note_icon(&icon);

        let chapter_ids = ["chapter_ids", "chapters"]
            .into_iter()
            .filter_map(|key| raw.get(key).and_then(RawValue::as_list))
            .find(|items| !items.is_empty())
            .map(|items| items.iter().filter_map(RawValue::as_id).collect())
            .unwrap_or_default();

        ImportedChapterGroup {
            title: string_or(raw, "title", &id),
            id,
            icon,
            chapter_ids,
            visibility: visibility(raw),
        }
    }

    fn read_chapter(&self, raw: &RawValue, state: &mut ReadState) -> ImportedChapter {
        let id = id_or_fresh(raw);
        let icon = string_or(raw, "icon", DEFAULT_ICON);
        state.note_icon(&icon);

        let background = string_or(raw, "background", "");
        if !background.trim().is_empty() {
            state.assets.insert(background.clone());
        }

        let images = compounds(raw, "images", "chapter image", state)
            .into_iter()
            .filter_map(RawValue::as_compound)
            .cloned()
            .collect::<Vec<_>>();
        for image in &images {
            if let Some(path) = image.get("image").and_then(RawValue::as_str) {
                if !path.trim().is_empty() {
                    state.assets.insert(path.to_string());
                }
            }
        }

        let quest_links = compounds(raw, "quest_links", "quest link", state)
            .into_iter()
            .filter_map(RawValue::as_compound)
            .cloned()
            .collect();

        let quests = compounds(raw, "quests", "quest", state)
            .into_iter()
            .map(|quest| self.read_quest(quest, state))
            .collect();

        ImportedChapter {
            title: string_or(raw, "title", &id),
            description: description(raw),
            group_id: raw.get("group").and_then(RawValue::as_id),
            icon,
            background,
            visibility: visibility(raw),
            quests,
            images,
            quest_links,
            extra_properties: extra_properties(raw, CHAPTER_KEYS),
            declared_fields: declared_fields(raw, CHAPTER_DISPLAY_KEYS),
            id,
        }
    }

    fn read_quest(&self, raw: &RawValue, state: &mut ReadState) -> ImportedQuest {
        let id = id_or_fresh(raw);
        let icon = string_or(raw, "icon", DEFAULT_ICON);
        state.note_icon(&icon);

        if raw.get("tasks").is_none_or(RawValue::is_null) {
            state.warn(format!("Quest '{id}' has no tasks"));
        }

        let mut tasks = Vec::new();
        for (kind, properties) in typed_entries(raw, "tasks", &id, state) {
            if self.registry.has_task_kind(&kind) {
                tasks.push(ImportedTask { kind, properties });
            } else {
                debug!(quest = %id, kind = %kind, "skipping task of unknown kind");
                state.warn(format!("Quest '{id}' has task of unknown kind '{kind}'; skipped"));
            }
        }

        let mut rewards = Vec::new();
        for (kind, properties) in typed_entries(raw, "rewards", &id, state) {
            if self.registry.has_reward_kind(&kind) {
                rewards.push(ImportedReward { kind, properties });
            } else {
                debug!(quest = %id, kind = %kind, "skipping reward of unknown kind");
                state.warn(format!("Quest '{id}' has reward of unknown kind '{kind}'; skipped"));
            }
        }

        ImportedQuest {
            title: string_or(raw, "title", &id),
            description: description(raw),
            icon,
            visibility: visibility(raw),
            tasks,
            rewards,
            dependencies: dependencies(raw, &id, state),
            extra_properties: extra_properties(raw, QUEST_KEYS),
            id,
        }
    }
}

#[derive(Debug, Default)]
struct ReadState {
    assets: BTreeSet<String>,
    warnings: Vec<String>,
}

impl ReadState {
    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    fn note_icon(&mut self, icon: &str) {
        if icon.ends_with(".png") {
            self.assets.insert(icon.to_string());
        }
    }
}

fn id_or_fresh(raw: &RawValue) -> String {
    raw.get("id")
        .and_then(RawValue::as_id)
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(fresh_id)
}

fn string_or(raw: &RawValue, key: &str, default: &str) -> String {
    raw.get(key)
        .and_then(RawValue::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default)
        .to_string()
}

fn description(raw: &RawValue) -> String {
    match raw.get("description") {
        None | Some(RawValue::Null) => String::new(),
        Some(RawValue::String(text)) => text.clone(),
        Some(RawValue::List(lines)) => lines
            .iter()
            .map(RawValue::to_display_string)
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => other.to_display_string(),
    }
}

fn visibility(raw: &RawValue) -> Visibility {
    raw.get("visibility")
        .and_then(RawValue::as_str)
        .and_then(Visibility::from_name)
        .unwrap_or_default()
}

fn declared_fields(raw: &RawValue, keys: &[&str]) -> BTreeSet<String> {
    keys.iter()
        .filter(|key| raw.get(key).is_some_and(|value| !value.is_null()))
        .map(|key| key.to_string())
        .collect()
}

fn extra_properties(raw: &RawValue, known: &[&str]) -> PropertyMap {
    raw.as_compound()
        .map(|map| {
            map.iter()
                .filter(|(key, _)| !known.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// Compound entries of the list under `key`. Other entries, or a non-list
/// value, become warnings.
fn compounds<'v>(
    raw: &'v RawValue,
    key: &str,
    label: &str,
    state: &mut ReadState,
) -> Vec<&'v RawValue> {
    let items = match raw.get(key) {
        None | Some(RawValue::Null) => return Vec::new(),
        Some(RawValue::List(items)) => items,
        Some(other) => {
            state.warn(format!(
                "Skipping '{key}': {label} list expected but found {}",
                other.kind_name()
            ));
            return Vec::new();
        }
    };
    items
        .iter()
        .enumerate()
        .filter(|(index, item)| {
            let keep = item.as_compound().is_some();
            if !keep {
                state.warn(format!(
                    "Skipping {label} #{index}: expected object but found {}",
                    item.kind_name()
                ));
            }
            keep
        })
        .map(|(_, item)| item)
        .collect()
}

/// `(kind, properties)` pairs of a task or reward list.
fn typed_entries(
    quest: &RawValue,
    key: &str,
    quest_id: &str,
    state: &mut ReadState,
) -> Vec<(String, PropertyMap)> {
    let mut entries = Vec::new();
    for entry in compounds(quest, key, key.trim_end_matches('s'), state) {
        let Some(map) = entry.as_compound() else {
            continue;
        };
        let Some(kind) = map.get("type").and_then(RawValue::as_str) else {
            state.warn(format!(
                "Quest '{quest_id}' has a {} without a type; skipped",
                key.trim_end_matches('s')
            ));
            continue;
        };
        let properties = map
            .iter()
            .filter(|(name, _)| name.as_str() != "type")
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        entries.push((kind.to_string(), properties));
    }
    entries
}

fn dependencies(raw: &RawValue, quest_id: &str, state: &mut ReadState) -> Vec<ImportedDependency> {
    let entries = match raw.get("dependencies") {
        None | Some(RawValue::Null) => return Vec::new(),
        Some(RawValue::List(items)) => items.iter().collect::<Vec<_>>(),
        Some(single) => vec![single],
    };

    let mut dependencies = Vec::new();
    for entry in entries {
        let dependency = match entry {
            RawValue::Compound(map) => {
                let target = map
                    .get("quest")
                    .and_then(RawValue::as_id)
                    .or_else(|| map.get("id").and_then(RawValue::as_id));
                let required = match (
                    map.get("required").and_then(RawValue::as_bool),
                    map.get("optional").and_then(RawValue::as_bool),
                ) {
                    (Some(required), _) => required,
                    (None, Some(optional)) => !optional,
                    (None, None) => true,
                };
                target.map(|quest_id| ImportedDependency { quest_id, required })
            }
            other => other.as_id().map(|quest_id| ImportedDependency {
                quest_id,
                required: true,
            }),
        };
        match dependency {
            Some(dependency) => dependencies.push(dependency),
            None => state.warn(format!(
                "Quest '{quest_id}' has an unreadable dependency entry; skipped"
            )),
        }
    }
    dependencies
}

fn read_loot_table(raw: &RawValue) -> ImportedLootTable {
    let id = id_or_fresh(raw);
    ImportedLootTable {
        title: string_or(raw, "title", &id),
        properties: extra_properties(raw, &["id", "title"]),
        id,
    }
}
