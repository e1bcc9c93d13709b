//! Shared types for quest pack imports.
//!
//! This crate defines the values every other crate in the workspace passes
//! around:
//!
//! - [`RawValue`]: the schema-less tree produced by a text parser.
//! - [`ValidationIssue`]: a located ERROR or WARNING finding.
//! - [`Project`], [`Chapter`], [`ChapterGroup`], [`Quest`], [`LootTable`]:
//!   immutable project values with validating builders.
//! - [`Task`] and [`Reward`]: closed sum types built through a
//!   [`KindRegistry`].
//!
//! # Example
//!
//! ```
//! use questpack_core::*;
//!
//! let registry = KindRegistry::standard();
//! let mut props = PropertyMap::new();
//! props.insert("table".into(), RawValue::from("starter_loot"));
//!
//! let quest = Quest::builder("welcome")
//!     .with_task(Task::Checkmark)
//!     .with_reward(registry.build_reward("loot_table", &props).unwrap())
//!     .build()
//!     .unwrap();
//! let chapter = Chapter::builder("intro").with_quest(quest).build().unwrap();
//! let project = Project::new(vec![], vec![chapter], vec![]).unwrap();
//!
//! assert_eq!(project.quest_ids().collect::<Vec<_>>(), vec!["welcome"]);
//! ```

mod error;
mod issue;
mod kinds;
mod model;
mod tree;

pub use error::{ModelError, Result};
pub use issue::{
    ROOT_PATH, Severity, ValidationIssue, dedupe_issues, error_count, field_path, has_errors,
    index_path,
};
pub use kinds::{ItemStack, KindRegistry, Reward, RewardFactory, Task, TaskFactory};
pub use model::{
    Chapter, ChapterBuilder, ChapterGroup, DEFAULT_ICON, Dependency, LootTable, Project, Quest,
    QuestBuilder, Visibility,
};
pub use tree::{PropertyMap, RawValue};
