//! Import configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! chapter_policy: MERGE_BY_ID
//! quest_policy: RENAME
//! target_group_id: main
//! allow_errors: false
//! assets:
//!   copy: true
//!   source: ./pack
//!   destination: ./project
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ids::ConflictPolicy;
use crate::merge::MergeOptions;

/// Asset copy settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Copy referenced assets after a merge.
    pub copy: bool,
    /// Root the pack's assets are read from.
    pub source: Option<PathBuf>,
    /// Root the assets are written to.
    pub destination: Option<PathBuf>,
}

/// Settings for one import run.
///
/// Every field has a default, so an empty YAML document is a valid config.
///
/// # Examples
///
/// ```
/// use questpack_import::{ConflictPolicy, ImportConfig};
///
/// let config: ImportConfig = serde_yaml::from_str("quest_policy: NEW_IDS").unwrap();
/// assert_eq!(config.chapter_policy, ConflictPolicy::Rename);
/// assert_eq!(config.quest_policy, ConflictPolicy::NewIds);
/// assert!(!config.assets.copy);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub chapter_policy: ConflictPolicy,
    pub quest_policy: ConflictPolicy,
    /// Group that receives every newly added chapter.
    pub target_group_id: Option<String>,
    /// Merge even when validation reported errors.
    pub allow_errors: bool,
    pub assets: AssetConfig,
}

impl ImportConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be written, or
    /// [`ConfigError::Yaml`] if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Merge options described by this configuration.
    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            chapter_policy: self.chapter_policy,
            quest_policy: self.quest_policy,
            target_group_id: self.target_group_id.clone(),
            copy_assets: self.assets.copy,
            asset_source: self.assets.source.clone(),
            asset_destination: self.assets.destination.clone(),
        }
    }
}
