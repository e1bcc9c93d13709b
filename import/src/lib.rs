//! Quest pack import: reading, id resolution and merging.
//!
//! The pieces can be used one by one or through [`Importer`]:
//!
//! 1. [`TreeParser`] turns text into a [`RawValue`](questpack_core::RawValue).
//! 2. [`questpack_validate::validate_pack_tree`] reports issues.
//! 3. [`PackReader`] coerces the tree into an [`ImportedPack`].
//! 4. [`MergeEngine`] merges the pack into a copy of a
//!    [`Project`](questpack_core::Project) under the configured
//!    [`ConflictPolicy`] values.
//!
//! # Example
//!
//! ```
//! use questpack_core::{KindRegistry, Project};
//! use questpack_import::{ImportConfig, Importer};
//!
//! let text = r#"{
//!     "id": "starter", "title": "Starter",
//!     "chapters": [{
//!         "id": "intro", "title": "Intro", "icon": "minecraft:book", "background": "textures/intro.png",
//!         "quests": [{
//!             "id": "welcome", "title": "Welcome", "icon": "minecraft:apple",
//!             "tasks": [{"type": "checkmark"}], "rewards": []
//!         }]
//!     }]
//! }"#;
//!
//! let importer = Importer::new(KindRegistry::standard(), ImportConfig::default());
//! let report = importer.import(text, &Project::empty()).unwrap();
//!
//! assert_eq!(report.outcome.summary.added_chapters, vec!["intro"]);
//! assert!(report.outcome.project.find_quest("welcome").is_some());
//! ```

mod assets;
mod config;
mod error;
mod ids;
mod merge;
mod pack;
mod parse;
mod pipeline;
mod reader;

pub use assets::{asset_relative_path, copy_assets};
pub use config::{AssetConfig, ImportConfig};
pub use error::{ConfigError, ImportError, MergeError, ParseError, ReadError};
pub use ids::{ConflictPolicy, IdResolver, Resolution, ResolutionOutcome, hashed_id};
pub use merge::{MergeEngine, MergeOptions, MergeOutcome, MergeSummary};
pub use pack::{
    ImportedChapter, ImportedChapterGroup, ImportedDependency, ImportedLootTable, ImportedPack,
    ImportedQuest, ImportedReward, ImportedTask,
};
pub use parse::{JsonTreeParser, TreeParser};
pub use pipeline::{ImportCheck, ImportReport, Importer};
pub use reader::{PackReader, fresh_id};
