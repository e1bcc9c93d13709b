//! Typed, defaulted view of an imported pack.
//!
//! Produced by [`PackReader`](crate::PackReader). Every field is already
//! coerced: ids are never empty, lists are never absent, and unknown keys
//! are kept in `extra_properties` so a merge can carry them forward.

use std::collections::BTreeSet;

use questpack_core::{PropertyMap, Visibility};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedPack {
    pub id: String,
    pub title: String,
    pub schema_version: Option<String>,
    pub chapter_groups: Vec<ImportedChapterGroup>,
    pub chapters: Vec<ImportedChapter>,
    pub loot_tables: Vec<ImportedLootTable>,
    /// Asset references (textures and icons) found anywhere in the pack.
    pub referenced_assets: BTreeSet<String>,
    /// Per-record problems found while reading.
    pub warnings: Vec<String>,
}

impl ImportedPack {
    /// Total number of quests across all chapters.
    pub fn quest_count(&self) -> usize {
        self.chapters.iter().map(|c| c.quests.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedChapterGroup {
    pub id: String,
    pub title: String,
    pub icon: String,
    pub chapter_ids: Vec<String>,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedChapter {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Group declared by the chapter itself, before any remapping.
    pub group_id: Option<String>,
    pub icon: String,
    pub background: String,
    pub visibility: Visibility,
    pub quests: Vec<ImportedQuest>,
    pub images: Vec<PropertyMap>,
    pub quest_links: Vec<PropertyMap>,
    pub extra_properties: PropertyMap,
    /// Display fields (`title`, `description`, `icon`, `visibility`) the
    /// pack set explicitly rather than leaving to defaults.
    #[serde(skip)]
    pub declared_fields: BTreeSet<String>,
}

impl ImportedChapter {
    pub fn declares(&self, field: &str) -> bool {
        self.declared_fields.contains(field)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedQuest {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub visibility: Visibility,
    pub tasks: Vec<ImportedTask>,
    pub rewards: Vec<ImportedReward>,
    pub dependencies: Vec<ImportedDependency>,
    pub extra_properties: PropertyMap,
}

/// Task kind plus its raw properties, `type` excluded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedTask {
    pub kind: String,
    pub properties: PropertyMap,
}

/// Reward kind plus its raw properties, `type` excluded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedReward {
    pub kind: String,
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedDependency {
    pub quest_id: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedLootTable {
    pub id: String,
    pub title: String,
    pub properties: PropertyMap,
}
