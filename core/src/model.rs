//! Project value objects.
//!
//! A [`Project`] owns chapter groups, chapters (each owning its quests) and
//! loot tables. All values are immutable once built: fields are private and
//! every builder re-validates invariants in `build()`, so a value obtained
//! from a builder, from [`Project::new`], or from deserialization is always
//! well-formed. To change a value, go through `to_builder()` and build a new
//! one.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::kinds::{Reward, Task};
use crate::tree::PropertyMap;

/// Icon used when a source omits one.
pub const DEFAULT_ICON: &str = "minecraft:book";

/// Visibility state of a quest, chapter or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
    Secret,
    Invisible,
}

impl Visibility {
    pub const ALL: [Visibility; 4] = [
        Visibility::Visible,
        Visibility::Hidden,
        Visibility::Secret,
        Visibility::Invisible,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
            Self::Secret => "secret",
            Self::Invisible => "invisible",
        }
    }

    /// Case-insensitive lookup by name.
    ///
    /// # Examples
    ///
    /// ```
    /// use questpack_core::Visibility;
    ///
    /// assert_eq!(Visibility::from_name("HIDDEN"), Some(Visibility::Hidden));
    /// assert_eq!(Visibility::from_name("ghostly"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(name))
    }
}

/// Edge from a quest to a quest it depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub quest_id: String,
    pub required: bool,
}

impl Dependency {
    pub fn required(quest_id: impl Into<String>) -> Self {
        Self {
            quest_id: quest_id.into(),
            required: true,
        }
    }

    pub fn optional(quest_id: impl Into<String>) -> Self {
        Self {
            quest_id: quest_id.into(),
            required: false,
        }
    }
}

fn require_id(entity: &'static str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(ModelError::BlankId { entity });
    }
    Ok(())
}

/// A quest with its tasks, rewards and dependencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_icon")]
    icon: String,
    #[serde(default)]
    visibility: Visibility,
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    rewards: Vec<Reward>,
    #[serde(default)]
    dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    extra: PropertyMap,
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

impl Quest {
    /// Starts a quest whose title defaults to its id.
    ///
    /// # Examples
    ///
    /// ```
    /// use questpack_core::{Dependency, Quest, Task};
    ///
    /// let quest = Quest::builder("welcome")
    ///     .with_title("Welcome!")
    ///     .with_task(Task::Checkmark)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(quest.title(), "Welcome!");
    ///
    /// let looped = Quest::builder("a").with_dependency(Dependency::required("a")).build();
    /// assert!(looped.is_err());
    /// ```
    pub fn builder(id: impl Into<String>) -> QuestBuilder {
        let id = id.into();
        QuestBuilder {
            quest: Quest {
                title: id.clone(),
                id,
                description: String::new(),
                icon: default_icon(),
                visibility: Visibility::Visible,
                tasks: Vec::new(),
                rewards: Vec::new(),
                dependencies: Vec::new(),
                extra: PropertyMap::new(),
            },
        }
    }

    pub fn to_builder(&self) -> QuestBuilder {
        QuestBuilder {
            quest: self.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn rewards(&self) -> &[Reward] {
        &self.rewards
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn extra(&self) -> &PropertyMap {
        &self.extra
    }

    pub fn validate(&self) -> Result<()> {
        require_id("quest", &self.id)?;
        for task in &self.tasks {
            task.validate()?;
        }
        for reward in &self.rewards {
            reward.validate()?;
        }
        for dependency in &self.dependencies {
            require_id("dependency", &dependency.quest_id)?;
            if dependency.quest_id == self.id {
                return Err(ModelError::SelfDependency(self.id.clone()));
            }
        }
        Ok(())
    }
}

/// Builder for [`Quest`].
#[derive(Debug, Clone)]
pub struct QuestBuilder {
    quest: Quest,
}

impl QuestBuilder {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.quest.id = id.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.quest.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.quest.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.quest.icon = icon.into();
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.quest.visibility = visibility;
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.quest.tasks.push(task);
        self
    }

    pub fn with_tasks(mut self, tasks: Vec<Task>) -> Self {
        self.quest.tasks = tasks;
        self
    }

    pub fn with_reward(mut self, reward: Reward) -> Self {
        self.quest.rewards.push(reward);
        self
    }

    pub fn with_rewards(mut self, rewards: Vec<Reward>) -> Self {
        self.quest.rewards = rewards;
        self
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.quest.dependencies.push(dependency);
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Dependency>) -> Self {
        self.quest.dependencies = dependencies;
        self
    }

    pub fn with_extra(mut self, extra: PropertyMap) -> Self {
        self.quest.extra = extra;
        self
    }

    /// Validates and returns the quest.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] for a blank id, an invalid task or reward, or
    /// a self-dependency.
    pub fn build(self) -> Result<Quest> {
        self.quest.validate()?;
        Ok(self.quest)
    }
}

/// A chapter owning an ordered list of quests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_icon")]
    icon: String,
    #[serde(default)]
    background: String,
    #[serde(default)]
    visibility: Visibility,
    #[serde(default)]
    quests: Vec<Quest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<PropertyMap>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    quest_links: Vec<PropertyMap>,
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    extra: PropertyMap,
}

impl Chapter {
    pub fn builder(id: impl Into<String>) -> ChapterBuilder {
        let id = id.into();
        ChapterBuilder {
            chapter: Chapter {
                title: id.clone(),
                id,
                description: String::new(),
                icon: default_icon(),
                background: String::new(),
                visibility: Visibility::Visible,
                quests: Vec::new(),
                images: Vec::new(),
                quest_links: Vec::new(),
                extra: PropertyMap::new(),
            },
        }
    }

    pub fn to_builder(&self) -> ChapterBuilder {
        ChapterBuilder {
            chapter: self.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn background(&self) -> &str {
        &self.background
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn quests(&self) -> &[Quest] {
        &self.quests
    }

    pub fn images(&self) -> &[PropertyMap] {
        &self.images
    }

    pub fn quest_links(&self) -> &[PropertyMap] {
        &self.quest_links
    }

    pub fn extra(&self) -> &PropertyMap {
        &self.extra
    }

    pub fn quest(&self, id: &str) -> Option<&Quest> {
        self.quests.iter().find(|q| q.id == id)
    }

    pub fn quest_ids(&self) -> Vec<&str> {
        self.quests.iter().map(|q| q.id.as_str()).collect()
    }

    pub fn validate(&self) -> Result<()> {
        require_id("chapter", &self.id)?;
        let mut seen = HashSet::new();
        for quest in &self.quests {
            quest.validate()?;
            if !seen.insert(quest.id.as_str()) {
                return Err(ModelError::DuplicateId {
                    entity: "quest",
                    id: quest.id.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`Chapter`].
#[derive(Debug, Clone)]
pub struct ChapterBuilder {
    chapter: Chapter,
}

impl ChapterBuilder {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.chapter.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.chapter.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.chapter.icon = icon.into();
        self
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.chapter.background = background.into();
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.chapter.visibility = visibility;
        self
    }

    pub fn with_quest(mut self, quest: Quest) -> Self {
        self.chapter.quests.push(quest);
        self
    }

    pub fn with_quests(mut self, quests: Vec<Quest>) -> Self {
        self.chapter.quests = quests;
        self
    }

    pub fn with_images(mut self, images: Vec<PropertyMap>) -> Self {
        self.chapter.images = images;
        self
    }

    pub fn with_quest_links(mut self, quest_links: Vec<PropertyMap>) -> Self {
        self.chapter.quest_links = quest_links;
        self
    }

    pub fn with_extra(mut self, extra: PropertyMap) -> Self {
        self.chapter.extra = extra;
        self
    }

    /// Validates and returns the chapter.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] for a blank id, an invalid quest, or two
    /// quests sharing an id.
    pub fn build(self) -> Result<Chapter> {
        self.chapter.validate()?;
        Ok(self.chapter)
    }
}

/// Named, ordered collection of chapter ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterGroup {
    id: String,
    title: String,
    #[serde(default = "default_icon")]
    icon: String,
    #[serde(default)]
    visibility: Visibility,
    #[serde(default)]
    chapter_ids: Vec<String>,
}

impl ChapterGroup {
    /// Creates and validates a group.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] for a blank id, a blank chapter id, or a
    /// chapter listed twice.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        icon: impl Into<String>,
        visibility: Visibility,
        chapter_ids: Vec<String>,
    ) -> Result<Self> {
        let group = Self {
            id: id.into(),
            title: title.into(),
            icon: icon.into(),
            visibility,
            chapter_ids,
        };
        group.validate()?;
        Ok(group)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn chapter_ids(&self) -> &[String] {
        &self.chapter_ids
    }

    pub fn validate(&self) -> Result<()> {
        require_id("chapter group", &self.id)?;
        let mut seen = HashSet::new();
        for chapter_id in &self.chapter_ids {
            require_id("chapter", chapter_id)?;
            if !seen.insert(chapter_id.as_str()) {
                return Err(ModelError::DuplicateId {
                    entity: "grouped chapter",
                    id: chapter_id.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Loot table referenced by `loot_table` rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootTable {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    properties: PropertyMap,
}

impl LootTable {
    /// # Errors
    ///
    /// Returns [`ModelError::BlankId`] for a blank id.
    pub fn new(id: impl Into<String>, title: impl Into<String>, properties: PropertyMap) -> Result<Self> {
        let table = Self {
            id: id.into(),
            title: title.into(),
            properties,
        };
        require_id("loot table", &table.id)?;
        Ok(table)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }
}

/// Complete project snapshot.
///
/// # Examples
///
/// ```
/// use questpack_core::*;
///
/// let chapter = Chapter::builder("core")
///     .with_quest(Quest::builder("a").build().unwrap())
///     .build()
///     .unwrap();
/// let group = ChapterGroup::new("main", "Main", DEFAULT_ICON, Visibility::Visible, vec!["core".into()]).unwrap();
/// let project = Project::new(vec![group], vec![chapter], vec![]).unwrap();
///
/// assert!(project.find_quest("a").is_some());
/// assert_eq!(project.group_of("core").map(ChapterGroup::id), Some("main"));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "ProjectRecord")]
pub struct Project {
    chapter_groups: Vec<ChapterGroup>,
    chapters: Vec<Chapter>,
    loot_tables: Vec<LootTable>,
}

#[derive(Deserialize)]
struct ProjectRecord {
    #[serde(default)]
    chapter_groups: Vec<ChapterGroup>,
    #[serde(default)]
    chapters: Vec<Chapter>,
    #[serde(default)]
    loot_tables: Vec<LootTable>,
}

impl TryFrom<ProjectRecord> for Project {
    type Error = ModelError;

    fn try_from(record: ProjectRecord) -> Result<Self> {
        Self::new(record.chapter_groups, record.chapters, record.loot_tables)
    }
}

impl Project {
    /// Creates an empty project.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates and validates a project.
    ///
    /// Ids must be unique per category (quest ids across the whole project),
    /// every grouped chapter must exist, and a chapter may belong to at most
    /// one group.
    ///
    /// # Errors
    ///
    /// Returns the first [`ModelError`] found.
    pub fn new(
        chapter_groups: Vec<ChapterGroup>,
        chapters: Vec<Chapter>,
        loot_tables: Vec<LootTable>,
    ) -> Result<Self> {
        check_project(&chapter_groups, &chapters, &loot_tables)?;
        Ok(Self {
            chapter_groups,
            chapters,
            loot_tables,
        })
    }

    pub fn chapter_groups(&self) -> &[ChapterGroup] {
        &self.chapter_groups
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn loot_tables(&self) -> &[LootTable] {
        &self.loot_tables
    }

    pub fn chapter(&self, id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn chapter_group(&self, id: &str) -> Option<&ChapterGroup> {
        self.chapter_groups.iter().find(|g| g.id == id)
    }

    pub fn loot_table(&self, id: &str) -> Option<&LootTable> {
        self.loot_tables.iter().find(|t| t.id == id)
    }

    /// Finds a quest in any chapter.
    pub fn find_quest(&self, id: &str) -> Option<&Quest> {
        self.chapters.iter().find_map(|c| c.quest(id))
    }

    /// Ids of every quest, in chapter order.
    pub fn quest_ids(&self) -> impl Iterator<Item = &str> {
        self.chapters
            .iter()
            .flat_map(|c| c.quests.iter().map(|q| q.id.as_str()))
    }

    /// Group that lists `chapter_id`, if any.
    pub fn group_of(&self, chapter_id: &str) -> Option<&ChapterGroup> {
        self.chapter_groups
            .iter()
            .find(|g| g.chapter_ids.iter().any(|id| id == chapter_id))
    }
}

fn check_project(
    chapter_groups: &[ChapterGroup],
    chapters: &[Chapter],
    loot_tables: &[LootTable],
) -> Result<()> {
    let mut chapter_ids = HashSet::new();
    let mut quest_ids = HashSet::new();
    for chapter in chapters {
        chapter.validate()?;
        if !chapter_ids.insert(chapter.id.as_str()) {
            return Err(ModelError::DuplicateId {
                entity: "chapter",
                id: chapter.id.clone(),
            });
        }
        for quest in &chapter.quests {
            if !quest_ids.insert(quest.id.as_str()) {
                return Err(ModelError::DuplicateId {
                    entity: "quest",
                    id: quest.id.clone(),
                });
            }
        }
    }

    let mut group_ids = HashSet::new();
    let mut grouped = HashSet::new();
    for group in chapter_groups {
        group.validate()?;
        if !group_ids.insert(group.id.as_str()) {
            return Err(ModelError::DuplicateId {
                entity: "chapter group",
                id: group.id.clone(),
            });
        }
        for chapter_id in &group.chapter_ids {
            if !chapter_ids.contains(chapter_id.as_str()) {
                return Err(ModelError::UnknownReference {
                    entity: "chapter group",
                    owner: group.id.clone(),
                    target: "chapter",
                    id: chapter_id.clone(),
                });
            }
            if !grouped.insert(chapter_id.as_str()) {
                return Err(ModelError::DuplicateId {
                    entity: "grouped chapter",
                    id: chapter_id.clone(),
                });
            }
        }
    }

    let mut table_ids = HashSet::new();
    for table in loot_tables {
        require_id("loot table", &table.id)?;
        if !table_ids.insert(table.id.as_str()) {
            return Err(ModelError::DuplicateId {
                entity: "loot table",
                id: table.id.clone(),
            });
        }
    }

    Ok(())
}
