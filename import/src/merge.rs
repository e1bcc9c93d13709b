//! Merging an imported pack into an existing project.
//!
//! The engine never mutates its input project. It resolves every imported
//! id against the ids already in use (per entity class), records each
//! rename per class, rebuilds the imported entities with references
//! rewritten through the map of the class they point at, and returns a new
//! validated
//! [`Project`] together with a [`MergeSummary`].
//!
//! # Example
//!
//! ```
//! use questpack_core::{Chapter, KindRegistry, Project, Quest, RawValue, Task};
//! use questpack_import::{ConflictPolicy, MergeEngine, MergeOptions, PackReader};
//!
//! let registry = KindRegistry::standard();
//! let existing = Chapter::builder("core")
//!     .with_quest(Quest::builder("a").with_task(Task::Checkmark).build().unwrap())
//!     .build()
//!     .unwrap();
//! let project = Project::new(vec![], vec![existing], vec![]).unwrap();
//!
//! let tree = RawValue::from(serde_json::json!({
//!     "id": "pack",
//!     "chapters": [{"id": "core", "quests": [{"id": "b", "tasks": [{"type": "checkmark"}]}]}]
//! }));
//! let pack = PackReader::new(&registry).read(&tree).unwrap();
//!
//! let options = MergeOptions {
//!     chapter_policy: ConflictPolicy::MergeById,
//!     quest_policy: ConflictPolicy::MergeById,
//!     ..MergeOptions::default()
//! };
//! let outcome = MergeEngine::new(&registry).merge(&project, &pack, &options).unwrap();
//!
//! assert_eq!(outcome.project.chapter("core").unwrap().quest_ids(), vec!["a", "b"]);
//! assert_eq!(outcome.summary.merged_chapters, vec!["core"]);
//! assert_eq!(outcome.summary.added_quests, vec!["b"]);
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use indexmap::IndexMap;
use questpack_core::{
    Chapter, ChapterGroup, DEFAULT_ICON, Dependency, KindRegistry, LootTable, Project,
    PropertyMap, Quest, RawValue, Visibility,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::assets::copy_assets;
use crate::error::MergeError;
use crate::ids::{ConflictPolicy, IdResolver, Resolution, ResolutionOutcome};
use crate::pack::{ImportedChapter, ImportedChapterGroup, ImportedPack, ImportedQuest};

const DEFAULT_GROUP_ID: &str = "default";
const DEFAULT_GROUP_TITLE: &str = "Imported";

/// Caller choices for one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Policy for conflicting chapter and chapter group ids.
    pub chapter_policy: ConflictPolicy,
    pub quest_policy: ConflictPolicy,
    /// Group receiving every newly added chapter, when it exists.
    pub target_group_id: Option<String>,
    pub copy_assets: bool,
    pub asset_source: Option<PathBuf>,
    pub asset_destination: Option<PathBuf>,
}

/// What a merge did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub added_chapters: Vec<String>,
    pub merged_chapters: Vec<String>,
    pub skipped_chapters: Vec<String>,
    pub added_quests: Vec<String>,
    pub merged_quests: Vec<String>,
    pub skipped_quests: Vec<String>,
    pub added_groups: Vec<String>,
    pub added_loot_tables: Vec<String>,
    /// `"old -> new"` for every renamed entity.
    pub renamed_ids: Vec<String>,
    /// Every rename across all classes. References are rewritten through
    /// per-class maps, so a key shared by two classes reports the last one.
    pub id_remap: BTreeMap<String, String>,
    pub warnings: Vec<String>,
    pub asset_warnings: Vec<String>,
}

/// Merged project plus summary.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub project: Project,
    pub summary: MergeSummary,
}

/// Merges imported packs into projects.
#[derive(Debug, Clone, Copy)]
pub struct MergeEngine<'a> {
    registry: &'a KindRegistry,
}

impl<'a> MergeEngine<'a> {
    pub fn new(registry: &'a KindRegistry) -> Self {
        Self { registry }
    }

    /// Merges `pack` into a copy of `project`.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::MissingAssetRoot`] when asset copying is
    /// requested without both roots, and [`MergeError::InvalidProject`] when
    /// the merged entities violate a model invariant.
    pub fn merge(
        &self,
        project: &Project,
        pack: &ImportedPack,
        options: &MergeOptions,
    ) -> Result<MergeOutcome, MergeError> {
        let asset_roots = if options.copy_assets {
            let source = options
                .asset_source
                .as_deref()
                .ok_or(MergeError::MissingAssetRoot { which: "source" })?;
            let destination = options
                .asset_destination
                .as_deref()
                .ok_or(MergeError::MissingAssetRoot {
                    which: "destination",
                })?;
            Some((source, destination))
        } else {
            None
        };

        let mut run = MergeRun::new(self.registry, project, pack, options);
        let group_plans = run.resolve_groups(&pack.chapter_groups);
        let chapter_plans = run.resolve_chapters(&pack.chapters);
        run.add_groups(&group_plans);

        let mut known_quests: HashSet<String> = project.quest_ids().map(str::to_string).collect();
        known_quests.extend(
            chapter_plans
                .iter()
                .flat_map(|plan| &plan.quests)
                .filter(|quest| quest.resolution.outcome != ResolutionOutcome::Skip)
                .map(|quest| quest.resolution.resolved_id.clone()),
        );

        let mut replacements = HashMap::new();
        for plan in &chapter_plans {
            run.apply_chapter(plan, &known_quests, &mut replacements)?;
        }
        run.place_new_chapters(&chapter_plans, &group_plans);
        run.add_loot_tables(pack);
        run.apply_replacements(&replacements)?;

        let (project, mut summary) = run.finish()?;
        if let Some((source, destination)) = asset_roots {
            summary.asset_warnings = copy_assets(&pack.referenced_assets, source, destination);
        }

        info!(
            pack = %pack.id,
            added_chapters = summary.added_chapters.len(),
            merged_chapters = summary.merged_chapters.len(),
            skipped_chapters = summary.skipped_chapters.len(),
            added_quests = summary.added_quests.len(),
            renamed = summary.renamed_ids.len(),
            warnings = summary.warnings.len(),
            "merged quest pack"
        );
        Ok(MergeOutcome { project, summary })
    }
}

#[derive(Debug)]
struct GroupDescriptor {
    title: String,
    icon: String,
    visibility: Visibility,
    chapter_ids: Vec<String>,
}

#[derive(Debug)]
struct GroupPlan<'p> {
    group: &'p ImportedChapterGroup,
    resolution: Resolution,
}

#[derive(Debug)]
struct QuestPlan<'p> {
    quest: &'p ImportedQuest,
    resolution: Resolution,
}

#[derive(Debug)]
struct ChapterPlan<'p> {
    chapter: &'p ImportedChapter,
    resolution: Resolution,
    quests: Vec<QuestPlan<'p>>,
}

/// Entity class an id belongs to. Ids are unique per class only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum IdClass {
    Group,
    Chapter,
    Quest,
}

/// Mutable state of a single merge call.
struct MergeRun<'a> {
    registry: &'a KindRegistry,
    options: &'a MergeOptions,
    groups: IndexMap<String, GroupDescriptor>,
    chapters: Vec<Chapter>,
    loot_tables: Vec<LootTable>,
    group_ids: IdResolver,
    chapter_ids: IdResolver,
    quest_ids: IdResolver,
    renames: HashMap<IdClass, HashMap<String, String>>,
    summary: MergeSummary,
}

impl<'a> MergeRun<'a> {
    fn new(
        registry: &'a KindRegistry,
        project: &Project,
        pack: &ImportedPack,
        options: &'a MergeOptions,
    ) -> Self {
        let groups = project
            .chapter_groups()
            .iter()
            .map(|group| {
                (
                    group.id().to_string(),
                    GroupDescriptor {
                        title: group.title().to_string(),
                        icon: group.icon().to_string(),
                        visibility: group.visibility(),
                        chapter_ids: group.chapter_ids().to_vec(),
                    },
                )
            })
            .collect::<IndexMap<_, _>>();

        Self {
            registry,
            options,
            group_ids: IdResolver::new(&pack.id, groups.keys().cloned()),
            chapter_ids: IdResolver::new(
                &pack.id,
                project.chapters().iter().map(|c| c.id().to_string()),
            ),
            quest_ids: IdResolver::new(&pack.id, project.quest_ids().map(str::to_string)),
            groups,
            chapters: project.chapters().to_vec(),
            loot_tables: project.loot_tables().to_vec(),
            renames: HashMap::new(),
            summary: MergeSummary::default(),
        }
    }

    fn warn(&mut self, message: String) {
        debug!(%message, "merge warning");
        self.summary.warnings.push(message);
    }

    fn record_rename(&mut self, class: IdClass, original: &str, resolution: &Resolution) {
        if resolution.outcome == ResolutionOutcome::New && resolution.resolved_id != original {
            self.renames
                .entry(class)
                .or_default()
                .insert(original.to_string(), resolution.resolved_id.clone());
            self.summary
                .renamed_ids
                .push(format!("{original} -> {}", resolution.resolved_id));
            self.summary
                .id_remap
                .insert(original.to_string(), resolution.resolved_id.clone());
        }
    }

    /// `id` rewritten through the renames of its own class.
    fn remapped(&self, class: IdClass, id: &str) -> String {
        self.renames
            .get(&class)
            .and_then(|renames| renames.get(id))
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    fn resolve_groups<'p>(&mut self, groups: &'p [ImportedChapterGroup]) -> Vec<GroupPlan<'p>> {
        let policy = self.options.chapter_policy;
        let mut plans = Vec::new();
        for group in groups {
            let resolution = self.group_ids.resolve(&group.id, policy);
            if resolution.outcome == ResolutionOutcome::Skip {
                self.warn(format!("Chapter group '{}' already exists; skipped", group.id));
            }
            self.record_rename(IdClass::Group, &group.id, &resolution);
            plans.push(GroupPlan { group, resolution });
        }
        plans
    }

    fn resolve_chapters<'p>(&mut self, chapters: &'p [ImportedChapter]) -> Vec<ChapterPlan<'p>> {
        let mut plans = Vec::new();
        for chapter in chapters {
            let resolution = self.chapter_ids.resolve(&chapter.id, self.options.chapter_policy);
            self.record_rename(IdClass::Chapter, &chapter.id, &resolution);

            let quests = match resolution.outcome {
                ResolutionOutcome::Skip => {
                    self.warn(format!(
                        "Chapter '{}' already exists; skipped along with its {} quest(s)",
                        chapter.id,
                        chapter.quests.len()
                    ));
                    self.summary.skipped_chapters.push(chapter.id.clone());
                    Vec::new()
                }
                outcome => {
                    if outcome == ResolutionOutcome::Merge {
                        self.summary.merged_chapters.push(resolution.resolved_id.clone());
                    } else {
                        self.summary.added_chapters.push(resolution.resolved_id.clone());
                    }
                    chapter
                        .quests
                        .iter()
                        .map(|quest| self.resolve_quest(quest))
                        .collect()
                }
            };

            debug!(
                chapter = %chapter.id,
                resolved = %resolution.resolved_id,
                outcome = ?resolution.outcome,
                quests = quests.len(),
                "planned chapter"
            );
            plans.push(ChapterPlan {
                chapter,
                resolution,
                quests,
            });
        }
        plans
    }

    fn resolve_quest<'p>(&mut self, quest: &'p ImportedQuest) -> QuestPlan<'p> {
        let resolution = self.quest_ids.resolve(&quest.id, self.options.quest_policy);
        match resolution.outcome {
            ResolutionOutcome::Skip => {
                self.warn(format!("Quest '{}' already exists; skipped", quest.id));
                self.summary.skipped_quests.push(quest.id.clone());
            }
            ResolutionOutcome::Merge => {
                self.summary.merged_quests.push(resolution.resolved_id.clone());
            }
            ResolutionOutcome::New => {
                self.summary.added_quests.push(resolution.resolved_id.clone());
            }
        }
        self.record_rename(IdClass::Quest, &quest.id, &resolution);
        QuestPlan { quest, resolution }
    }

    fn add_groups(&mut self, plans: &[GroupPlan<'_>]) {
        for plan in plans {
            let group = plan.group;
            let id = &plan.resolution.resolved_id;
            match plan.resolution.outcome {
                ResolutionOutcome::New => {
                    self.groups.insert(
                        id.clone(),
                        GroupDescriptor {
                            title: group.title.clone(),
                            icon: group.icon.clone(),
                            visibility: group.visibility,
                            chapter_ids: Vec::new(),
                        },
                    );
                    self.summary.added_groups.push(id.clone());
                }
                ResolutionOutcome::Merge => {
                    if let Some(existing) = self.groups.get_mut(id) {
                        existing.title = group.title.clone();
                        existing.icon = group.icon.clone();
                        existing.visibility = group.visibility;
                    }
                }
                ResolutionOutcome::Skip => {}
            }
        }
    }

    fn build_quest(
        &mut self,
        quest: &ImportedQuest,
        id: &str,
        known_quests: &HashSet<String>,
    ) -> Result<Quest, MergeError> {
        let mut tasks = Vec::new();
        for task in &quest.tasks {
            match self.registry.build_task(&task.kind, &task.properties) {
                Ok(built) => tasks.push(built),
                Err(e) => self.warn(format!(
                    "Quest '{id}' dropped its '{}' task: {e}",
                    task.kind
                )),
            }
        }

        let mut rewards = Vec::new();
        for reward in &quest.rewards {
            match self.registry.build_reward(&reward.kind, &reward.properties) {
                Ok(built) => rewards.push(built),
                Err(e) => self.warn(format!(
                    "Quest '{id}' dropped its '{}' reward: {e}",
                    reward.kind
                )),
            }
        }

        let mut dependencies = Vec::new();
        for dependency in &quest.dependencies {
            let target = self.remapped(IdClass::Quest, &dependency.quest_id);
            if target == id {
                self.warn(format!("Quest '{id}' depends on itself; dependency dropped"));
                continue;
            }
            if !known_quests.contains(&target) {
                self.warn(format!("Quest '{id}' depends on unknown quest '{target}'"));
            }
            dependencies.push(if dependency.required {
                Dependency::required(target)
            } else {
                Dependency::optional(target)
            });
        }

        let built = Quest::builder(id)
            .with_title(&quest.title)
            .with_description(&quest.description)
            .with_icon(&quest.icon)
            .with_visibility(quest.visibility)
            .with_tasks(tasks)
            .with_rewards(rewards)
            .with_dependencies(dependencies)
            .with_extra(quest.extra_properties.clone())
            .build()?;
        Ok(built)
    }

    fn remapped_links(&self, links: &[PropertyMap]) -> Vec<PropertyMap> {
        links
            .iter()
            .map(|link| {
                let mut link = link.clone();
                if let Some(target) = link.get("linked_quest").and_then(RawValue::as_id) {
                    let renamed = self.remapped(IdClass::Quest, &target);
                    if renamed != target {
                        link.insert("linked_quest".to_string(), RawValue::from(renamed.as_str()));
                    }
                }
                link
            })
            .collect()
    }

    fn apply_chapter(
        &mut self,
        plan: &ChapterPlan<'_>,
        known_quests: &HashSet<String>,
        replacements: &mut HashMap<String, Quest>,
    ) -> Result<(), MergeError> {
        let imported = plan.chapter;
        let id = &plan.resolution.resolved_id;

        let mut appended = Vec::new();
        for quest_plan in &plan.quests {
            let quest_id = &quest_plan.resolution.resolved_id;
            match quest_plan.resolution.outcome {
                ResolutionOutcome::Skip => {}
                ResolutionOutcome::New => {
                    appended.push(self.build_quest(quest_plan.quest, quest_id, known_quests)?);
                }
                ResolutionOutcome::Merge => {
                    let quest = self.build_quest(quest_plan.quest, quest_id, known_quests)?;
                    replacements.insert(quest_id.clone(), quest);
                }
            }
        }
        let quest_links = self.remapped_links(&imported.quest_links);

        match plan.resolution.outcome {
            ResolutionOutcome::Skip => {}
            ResolutionOutcome::New => {
                let chapter = Chapter::builder(id)
                    .with_title(&imported.title)
                    .with_description(&imported.description)
                    .with_icon(&imported.icon)
                    .with_background(&imported.background)
                    .with_visibility(imported.visibility)
                    .with_quests(appended)
                    .with_images(imported.images.clone())
                    .with_quest_links(quest_links)
                    .with_extra(imported.extra_properties.clone())
                    .build()?;
                self.chapters.push(chapter);
            }
            ResolutionOutcome::Merge => {
                let Some(position) = self.chapters.iter().position(|c| c.id() == id) else {
                    return Ok(());
                };
                let existing = &self.chapters[position];

                let mut quests = existing.quests().to_vec();
                quests.extend(appended);
                let mut extra = existing.extra().clone();
                extra.extend(
                    imported
                        .extra_properties
                        .iter()
                        .map(|(key, value)| (key.clone(), value.clone())),
                );
                let mut builder = existing.to_builder().with_quests(quests).with_extra(extra);
                if imported.declares("title") {
                    builder = builder.with_title(&imported.title);
                }
                if imported.declares("description") {
                    builder = builder.with_description(&imported.description);
                }
                if imported.declares("icon") {
                    builder = builder.with_icon(&imported.icon);
                }
                if imported.declares("visibility") {
                    builder = builder.with_visibility(imported.visibility);
                }
                if !imported.background.is_empty() {
                    builder = builder.with_background(&imported.background);
                }
                if !imported.images.is_empty() {
                    builder = builder.with_images(imported.images.clone());
                }
                if !quest_links.is_empty() {
                    builder = builder.with_quest_links(quest_links);
                }
                self.chapters[position] = builder.build()?;
            }
        }
        Ok(())
    }

    /// Group ids and remapped chapter lists declared by the pack's groups.
    fn imported_group_lists(&self, plans: &[GroupPlan<'_>]) -> Vec<(String, Vec<String>)> {
        plans
            .iter()
            .map(|plan| {
                let chapters = plan
                    .group
                    .chapter_ids
                    .iter()
                    .map(|chapter_id| self.remapped(IdClass::Chapter, chapter_id))
                    .collect();
                (plan.resolution.resolved_id.clone(), chapters)
            })
            .collect()
    }

    fn place_new_chapters(&mut self, chapters: &[ChapterPlan<'_>], groups: &[GroupPlan<'_>]) {
        let new_chapters: Vec<_> = chapters
            .iter()
            .filter(|plan| plan.resolution.outcome == ResolutionOutcome::New)
            .collect();
        if new_chapters.is_empty() {
            return;
        }

        let mut target = self.options.target_group_id.clone();
        if let Some(group_id) = target.as_deref() {
            if !self.groups.contains_key(group_id) {
                self.warn(format!(
                    "Target group '{group_id}' does not exist; using fallback placement"
                ));
                target = None;
            }
        }
        let imported_lists = self.imported_group_lists(groups);

        for plan in new_chapters {
            let chapter_id = &plan.resolution.resolved_id;
            let declared = plan
                .chapter
                .group_id
                .as_deref()
                .map(|group_id| self.remapped(IdClass::Group, group_id))
                .filter(|group_id| self.groups.contains_key(group_id));
            let listed = imported_lists
                .iter()
                .find(|(group_id, chapter_ids)| {
                    self.groups.contains_key(group_id) && chapter_ids.contains(chapter_id)
                })
                .map(|(group_id, _)| group_id.clone());
            let found = target
                .clone()
                .or(declared)
                .or(listed)
                .or_else(|| self.groups.keys().next().cloned());

            let group_id = match found {
                Some(group_id) => group_id,
                None => self.create_default_group(),
            };
            debug!(chapter = %chapter_id, group = %group_id, "placed chapter");
            if let Some(group) = self.groups.get_mut(&group_id) {
                group.chapter_ids.push(chapter_id.clone());
            }
        }
    }

    fn create_default_group(&mut self) -> String {
        let resolution = self
            .group_ids
            .resolve(DEFAULT_GROUP_ID, ConflictPolicy::Rename);
        let id = resolution.resolved_id;
        self.groups.insert(
            id.clone(),
            GroupDescriptor {
                title: DEFAULT_GROUP_TITLE.to_string(),
                icon: DEFAULT_ICON.to_string(),
                visibility: Visibility::Visible,
                chapter_ids: Vec::new(),
            },
        );
        self.summary.added_groups.push(id.clone());
        self.warn(format!(
            "Project has no chapter group; created group '{id}' for imported chapters"
        ));
        id
    }

    fn add_loot_tables(&mut self, pack: &ImportedPack) {
        for table in &pack.loot_tables {
            if self.loot_tables.iter().any(|t| t.id() == table.id) {
                self.warn(format!(
                    "Loot table '{}' already exists; existing table kept",
                    table.id
                ));
                continue;
            }
            match LootTable::new(&table.id, &table.title, table.properties.clone()) {
                Ok(built) => {
                    self.loot_tables.push(built);
                    self.summary.added_loot_tables.push(table.id.clone());
                }
                Err(e) => self.warn(format!("Loot table '{}' skipped: {e}", table.id)),
            }
        }
    }

    fn apply_replacements(&mut self, replacements: &HashMap<String, Quest>) -> Result<(), MergeError> {
        if replacements.is_empty() {
            return Ok(());
        }
        for chapter in &mut self.chapters {
            if !chapter.quests().iter().any(|q| replacements.contains_key(q.id())) {
                continue;
            }
            let quests = chapter
                .quests()
                .iter()
                .map(|quest| replacements.get(quest.id()).unwrap_or(quest).clone())
                .collect();
            *chapter = chapter.to_builder().with_quests(quests).build()?;
        }
        Ok(())
    }

    fn finish(self) -> Result<(Project, MergeSummary), MergeError> {
        let groups = self
            .groups
            .into_iter()
            .map(|(id, group)| {
                ChapterGroup::new(id, group.title, group.icon, group.visibility, group.chapter_ids)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let project = Project::new(groups, self.chapters, self.loot_tables)?;
        Ok((project, self.summary))
    }
}

#[cfg(test)]
mod tests {
    use questpack_core::{ChapterGroup, Task};
    use serde_json::json;

    use super::*;
    use crate::reader::PackReader;

    fn pack(value: serde_json::Value) -> ImportedPack {
        PackReader::new(&KindRegistry::standard())
            .read(&RawValue::from(value))
            .unwrap()
    }

    fn quest(id: &str) -> Quest {
        Quest::builder(id).with_task(Task::Checkmark).build().unwrap()
    }

    fn project_with_core() -> Project {
        let chapter = Chapter::builder("core")
            .with_quests(vec![quest("a"), quest("welcome")])
            .build()
            .unwrap();
        let group = ChapterGroup::new("main", "Main", DEFAULT_ICON, Visibility::Visible, vec!["core".into()])
            .unwrap();
        Project::new(vec![group], vec![chapter], vec![]).unwrap()
    }

    fn merge(project: &Project, pack: &ImportedPack, options: &MergeOptions) -> MergeOutcome {
        MergeEngine::new(&KindRegistry::standard())
            .merge(project, pack, options)
            .unwrap()
    }

    #[test]
    fn test_skip_leaves_project_untouched() {
        let project = project_with_core();
        let imported = pack(json!({"id": "p", "chapters": [
            {"id": "core", "quests": [{"id": "x", "tasks": []}, {"id": "y", "tasks": []}]}
        ]}));
        let options = MergeOptions {
            chapter_policy: ConflictPolicy::Skip,
            ..MergeOptions::default()
        };

        let outcome = merge(&project, &imported, &options);
        assert_eq!(outcome.project.chapters(), project.chapters());
        assert_eq!(outcome.summary.warnings.len(), 1);
        assert!(outcome.summary.warnings[0].contains("core"));
        assert!(outcome.summary.added_chapters.is_empty());
        assert!(outcome.summary.merged_chapters.is_empty());
        assert!(outcome.summary.added_quests.is_empty());
    }

    #[test]
    fn test_merge_by_id_replaces_quest_in_place() {
        let project = project_with_core();
        let imported = pack(json!({"id": "p", "chapters": [{"id": "core", "title": "Core!", "quests": [
            {"id": "a", "title": "New A", "tasks": [{"type": "checkmark"}]}
        ]}]}));
        let options = MergeOptions {
            chapter_policy: ConflictPolicy::MergeById,
            quest_policy: ConflictPolicy::MergeById,
            ..MergeOptions::default()
        };

        let outcome = merge(&project, &imported, &options);
        let core = outcome.project.chapter("core").unwrap();
        assert_eq!(core.title(), "Core!");
        assert_eq!(core.quest_ids(), vec!["a", "welcome"]);
        assert_eq!(core.quest("a").unwrap().title(), "New A");
        assert_eq!(outcome.summary.merged_quests, vec!["a"]);
    }

    #[test]
    fn test_rename_rewrites_dependencies_and_links() {
        let project = project_with_core();
        let imported = pack(json!({"id": "p", "chapters": [{
            "id": "extra",
            "quests": [
                {"id": "welcome", "tasks": []},
                {"id": "next", "tasks": [], "dependencies": ["welcome"]}
            ],
            "quest_links": [{"linked_quest": "welcome", "x": 1}]
        }]}));

        let outcome = merge(&project, &imported, &MergeOptions::default());
        let extra = outcome.project.chapter("extra").unwrap();
        let next = extra.quest("next").unwrap();
        assert_eq!(next.dependencies()[0].quest_id, "welcome_import");
        assert_eq!(
            extra.quest_links()[0].get("linked_quest"),
            Some(&RawValue::from("welcome_import"))
        );
        assert_eq!(outcome.summary.renamed_ids, vec!["welcome -> welcome_import"]);
        assert_eq!(
            outcome.summary.id_remap.get("welcome").map(String::as_str),
            Some("welcome_import")
        );
    }

    #[test]
    fn test_chapter_rename_does_not_rewrite_quest_references() {
        let project = project_with_core();
        let imported = pack(json!({"id": "p", "chapters": [{
            "id": "core",
            "quests": [
                {"id": "core", "tasks": []},
                {"id": "next", "tasks": [], "dependencies": ["core"]}
            ],
            "quest_links": [{"linked_quest": "core"}]
        }]}));

        let outcome = merge(&project, &imported, &MergeOptions::default());
        let renamed = outcome.project.chapter("core_import").unwrap();
        assert_eq!(renamed.quest_ids(), vec!["core", "next"]);
        assert_eq!(renamed.quest("next").unwrap().dependencies()[0].quest_id, "core");
        assert_eq!(
            renamed.quest_links()[0].get("linked_quest"),
            Some(&RawValue::from("core"))
        );
        assert!(
            outcome
                .summary
                .warnings
                .iter()
                .all(|w| !w.contains("unknown quest"))
        );
    }

    #[test]
    fn test_merge_by_id_keeps_display_fields_the_pack_omits() {
        let chapter = Chapter::builder("core")
            .with_title("Core")
            .with_description("Existing text")
            .with_visibility(Visibility::Hidden)
            .with_quest(quest("a"))
            .build()
            .unwrap();
        let project = Project::new(vec![], vec![chapter], vec![]).unwrap();
        let options = MergeOptions {
            chapter_policy: ConflictPolicy::MergeById,
            ..MergeOptions::default()
        };

        let imported = pack(json!({"id": "p", "chapters": [{"id": "core", "quests": []}]}));
        let outcome = merge(&project, &imported, &options);
        let core = outcome.project.chapter("core").unwrap();
        assert_eq!(core.title(), "Core");
        assert_eq!(core.description(), "Existing text");
        assert_eq!(core.visibility(), Visibility::Hidden);

        let imported = pack(json!({"id": "p", "chapters": [
            {"id": "core", "title": "Renamed", "visibility": "visible", "quests": []}
        ]}));
        let outcome = merge(&project, &imported, &options);
        let core = outcome.project.chapter("core").unwrap();
        assert_eq!(core.title(), "Renamed");
        assert_eq!(core.description(), "Existing text");
        assert_eq!(core.visibility(), Visibility::Visible);
    }

    #[test]
    fn test_new_chapter_lands_in_declared_group() {
        let project = project_with_core();
        let imported = pack(json!({
            "id": "p",
            "chapter_groups": [{"id": "side", "title": "Side", "chapter_ids": ["bonus"]}],
            "chapters": [{"id": "bonus", "quests": []}, {"id": "loose", "quests": []}]
        }));

        let outcome = merge(&project, &imported, &MergeOptions::default());
        let side = outcome.project.chapter_group("side").unwrap();
        assert_eq!(side.chapter_ids(), ["bonus".to_string()]);
        let main = outcome.project.chapter_group("main").unwrap();
        assert_eq!(main.chapter_ids(), ["core".to_string(), "loose".to_string()]);
        assert_eq!(outcome.summary.added_groups, vec!["side"]);
    }

    #[test]
    fn test_target_group_wins_and_missing_target_warns() {
        let project = project_with_core();
        let imported = pack(json!({"id": "p", "chapters": [{"id": "bonus", "group": "elsewhere"}]}));

        let options = MergeOptions {
            target_group_id: Some("main".into()),
            ..MergeOptions::default()
        };
        let outcome = merge(&project, &imported, &options);
        assert_eq!(outcome.project.group_of("bonus").map(ChapterGroup::id), Some("main"));
        assert!(outcome.summary.warnings.is_empty());

        let options = MergeOptions {
            target_group_id: Some("ghost".into()),
            ..MergeOptions::default()
        };
        let outcome = merge(&project, &imported, &options);
        assert_eq!(outcome.project.group_of("bonus").map(ChapterGroup::id), Some("main"));
        assert_eq!(outcome.summary.warnings.len(), 1);
    }

    #[test]
    fn test_default_group_created_when_project_has_none() {
        let imported = pack(json!({"id": "p", "chapters": [{"id": "bonus"}]}));
        let outcome = merge(&Project::empty(), &imported, &MergeOptions::default());

        let group = outcome.project.chapter_group("default").unwrap();
        assert_eq!(group.title(), "Imported");
        assert_eq!(group.chapter_ids(), ["bonus".to_string()]);
        assert_eq!(outcome.summary.warnings.len(), 1);
    }

    #[test]
    fn test_self_and_unknown_dependencies() {
        let imported = pack(json!({"id": "p", "chapters": [{"id": "c", "quests": [
            {"id": "q", "tasks": [], "dependencies": ["q", "nowhere"]}
        ]}]}));
        let outcome = merge(&Project::empty(), &imported, &MergeOptions::default());

        let quest = outcome.project.find_quest("q").unwrap();
        assert_eq!(quest.dependencies(), [Dependency::required("nowhere")]);
        let warnings = &outcome.summary.warnings;
        assert!(warnings.iter().any(|w| w.contains("depends on itself")));
        assert!(warnings.iter().any(|w| w.contains("unknown quest 'nowhere'")));
    }

    #[test]
    fn test_invalid_task_is_dropped_with_warning() {
        let imported = pack(json!({"id": "p", "chapters": [{"id": "c", "quests": [
            {"id": "q", "tasks": [{"type": "item"}, {"type": "checkmark"}]}
        ]}]}));
        let outcome = merge(&Project::empty(), &imported, &MergeOptions::default());
        assert_eq!(outcome.project.find_quest("q").unwrap().tasks(), [Task::Checkmark]);
        assert!(outcome.summary.warnings.iter().any(|w| w.contains("'item' task")));
    }

    #[test]
    fn test_loot_tables_added_or_kept() {
        let existing = LootTable::new("starter", "Starter", PropertyMap::new()).unwrap();
        let project = Project::new(vec![], vec![], vec![existing]).unwrap();
        let imported = pack(json!({"id": "p", "loot_tables": [
            {"id": "starter", "title": "Other"},
            {"id": "rare", "entries": []}
        ]}));

        let outcome = merge(&project, &imported, &MergeOptions::default());
        assert_eq!(outcome.project.loot_table("starter").unwrap().title(), "Starter");
        assert!(outcome.project.loot_table("rare").is_some());
        assert_eq!(outcome.summary.added_loot_tables, vec!["rare"]);
        assert_eq!(outcome.summary.warnings.len(), 1);
    }

    #[test]
    fn test_copy_assets_requires_roots() {
        let imported = pack(json!({"id": "p"}));
        let options = MergeOptions {
            copy_assets: true,
            asset_destination: Some(PathBuf::from("out")),
            ..MergeOptions::default()
        };
        let err = MergeEngine::new(&KindRegistry::standard())
            .merge(&Project::empty(), &imported, &options)
            .unwrap_err();
        assert!(matches!(err, MergeError::MissingAssetRoot { which: "source" }));
    }

    #[test]
    fn test_input_project_is_not_mutated() {
        let project = project_with_core();
        let snapshot = project.clone();
        let imported = pack(json!({"id": "p", "chapters": [{"id": "core", "quests": [{"id": "a", "tasks": []}]}]}));
        let _ = merge(&project, &imported, &MergeOptions::default());
        assert_eq!(project, snapshot);
    }
}
