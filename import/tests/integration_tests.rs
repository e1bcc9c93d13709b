use std::fs;
use std::path::Path;

use questpack_core::{
    Chapter, ChapterGroup, DEFAULT_ICON, KindRegistry, Project, Quest, RawValue, Task, Visibility,
};
use questpack_import::{
    AssetConfig, ConflictPolicy, IdResolver, ImportConfig, ImportError, Importer, MergeEngine,
    MergeOptions, PackReader, ResolutionOutcome, hashed_id,
};
use serde_json::json;
use tempfile::TempDir;

fn checkmark_quest(id: &str) -> Quest {
    Quest::builder(id)
        .with_task(Task::Checkmark)
        .build()
        .unwrap()
}

fn core_project(quests: &[&str]) -> Project {
    let chapter = Chapter::builder("core")
        .with_title("Core")
        .with_quests(quests.iter().map(|id| checkmark_quest(id)).collect())
        .build()
        .unwrap();
    let group = ChapterGroup::new(
        "main",
        "Main",
        DEFAULT_ICON,
        Visibility::Visible,
        vec!["core".to_string()],
    )
    .unwrap();
    Project::new(vec![group], vec![chapter], vec![]).unwrap()
}

fn quest_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": id,
        "icon": "minecraft:book",
        "tasks": [{"type": "checkmark"}],
        "rewards": []
    })
}

fn pack_text(chapters: serde_json::Value) -> String {
    json!({"id": "incoming", "title": "Incoming", "chapters": chapters}).to_string()
}

fn chapter_json(id: &str, quests: Vec<serde_json::Value>) -> serde_json::Value {
    json!({
        "id": id,
        "title": id,
        "icon": "minecraft:book",
        "background": "incoming:textures/bg.png",
        "quests": quests
    })
}

#[test]
fn test_new_ids_resolution_is_stable_for_same_pack() {
    let mut first = IdResolver::new("incoming", ["chap1".to_string()]);
    let mut second = IdResolver::new("incoming", ["chap1".to_string()]);

    let a = first.resolve("chap1", ConflictPolicy::NewIds);
    let b = second.resolve("chap1", ConflictPolicy::NewIds);

    assert_eq!(a, b);
    assert_eq!(a.outcome, ResolutionOutcome::New);
    assert_eq!(a.resolved_id, hashed_id("incoming", "chap1"));
}

#[test]
fn test_renamed_quest_dependencies_follow_the_rename() {
    let project = core_project(&["welcome"]);
    let mut dependent = quest_json("tour");
    dependent["dependencies"] = json!(["welcome"]);
    let text = pack_text(json!([chapter_json(
        "extra",
        vec![quest_json("welcome"), dependent]
    )]));

    let importer = Importer::new(KindRegistry::standard(), ImportConfig::default());
    let report = importer.import(&text, &project).unwrap();
    let merged = &report.outcome.project;

    let tour = merged.find_quest("tour").unwrap();
    assert_eq!(tour.dependencies()[0].quest_id, "welcome_import");
    assert!(merged.find_quest("welcome_import").is_some());
    assert!(
        report
            .outcome
            .summary
            .renamed_ids
            .contains(&"welcome -> welcome_import".to_string())
    );
}

#[test]
fn test_quest_without_tasks_reads_with_single_warning() {
    let registry = KindRegistry::standard();
    let tree = RawValue::from(json!({
        "id": "incoming",
        "chapters": [{"id": "c", "quests": [{"id": "no_tasks_here", "rewards": []}]}]
    }));

    let pack = PackReader::new(&registry).read(&tree).unwrap();
    assert!(pack.chapters[0].quests[0].tasks.is_empty());
    assert_eq!(pack.warnings.len(), 1);
    assert!(pack.warnings[0].contains("no_tasks_here"));
}

#[test]
fn test_skip_policy_on_existing_chapter() {
    let project = core_project(&["a"]);
    let text = pack_text(json!([chapter_json("core", vec![quest_json("z")])]));
    let config = ImportConfig {
        chapter_policy: ConflictPolicy::Skip,
        ..ImportConfig::default()
    };

    let report = Importer::new(KindRegistry::standard(), config)
        .import(&text, &project)
        .unwrap();
    let summary = &report.outcome.summary;

    assert_eq!(report.outcome.project.chapters(), project.chapters());
    assert_eq!(summary.warnings.len(), 1);
    assert!(summary.warnings[0].contains("core"));
    assert!(summary.added_chapters.is_empty());
    assert!(summary.merged_chapters.is_empty());
}

#[test]
fn test_merge_by_id_policy_on_existing_chapter() {
    let project = core_project(&["a"]);
    let text = pack_text(json!([chapter_json("core", vec![quest_json("b")])]));
    let config = ImportConfig {
        chapter_policy: ConflictPolicy::MergeById,
        quest_policy: ConflictPolicy::MergeById,
        ..ImportConfig::default()
    };

    let report = Importer::new(KindRegistry::standard(), config)
        .import(&text, &project)
        .unwrap();
    let core = report.outcome.project.chapter("core").unwrap();

    assert_eq!(core.quest_ids(), vec!["a", "b"]);
    assert_eq!(report.outcome.summary.merged_chapters, vec!["core"]);
    assert_eq!(report.outcome.summary.added_quests, vec!["b"]);
    assert_eq!(report.outcome.project.chapters().len(), 1);
}

#[test]
fn test_new_ids_policy_places_hashed_chapter() {
    let project = core_project(&["a"]);
    let text = pack_text(json!([chapter_json("core", vec![quest_json("a")])]));
    let config = ImportConfig {
        chapter_policy: ConflictPolicy::NewIds,
        quest_policy: ConflictPolicy::NewIds,
        ..ImportConfig::default()
    };

    let report = Importer::new(KindRegistry::standard(), config)
        .import(&text, &project)
        .unwrap();
    let chapter_id = hashed_id("incoming", "core");
    let quest_id = hashed_id("incoming", "a");
    let merged = &report.outcome.project;

    assert_eq!(merged.chapter(&chapter_id).unwrap().quest_ids(), vec![quest_id.as_str()]);
    assert_eq!(merged.group_of(&chapter_id).map(ChapterGroup::id), Some("main"));
    assert_eq!(report.outcome.summary.id_remap.len(), 2);
}

#[test]
fn test_validation_errors_block_merge() {
    let mut chapter = chapter_json("core", vec![quest_json("b")]);
    chapter["quests"][0]["dependencies"] = json!(["missing"]);
    let text = pack_text(json!([chapter]));

    let err = Importer::new(KindRegistry::standard(), ImportConfig::default())
        .import(&text, &core_project(&["a"]))
        .unwrap_err();
    assert!(matches!(err, ImportError::Blocked { error_count: 1, .. }));
}

fn write_asset(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"texture").unwrap();
}

#[test]
fn test_assets_are_copied_after_merge() {
    let source = TempDir::new().unwrap();
    let destination = TempDir::new().unwrap();
    write_asset(source.path(), "assets/incoming/textures/bg.png");

    let mut chapter = chapter_json("extra", vec![quest_json("b")]);
    chapter["quests"][0]["icon"] = json!("incoming:textures/missing_icon.png");
    let text = pack_text(json!([chapter]));
    let config = ImportConfig {
        assets: AssetConfig {
            copy: true,
            source: Some(source.path().to_path_buf()),
            destination: Some(destination.path().to_path_buf()),
        },
        ..ImportConfig::default()
    };

    let report = Importer::new(KindRegistry::standard(), config)
        .import(&text, &core_project(&["a"]))
        .unwrap();

    assert!(
        destination
            .path()
            .join("assets/incoming/textures/bg.png")
            .is_file()
    );
    let asset_warnings = &report.outcome.summary.asset_warnings;
    assert_eq!(asset_warnings.len(), 1);
    assert!(asset_warnings[0].contains("missing_icon.png"));
}

#[test]
fn test_engine_can_be_driven_without_pipeline() {
    let registry = KindRegistry::standard();
    let tree = RawValue::from(json!({"id": "incoming", "chapters": [{"id": "solo", "quests": []}]}));
    let pack = PackReader::new(&registry).read(&tree).unwrap();

    let outcome = MergeEngine::new(&registry)
        .merge(&Project::empty(), &pack, &MergeOptions::default())
        .unwrap();

    assert_eq!(outcome.summary.added_groups, vec!["default"]);
    assert_eq!(
        outcome.project.group_of("solo").map(ChapterGroup::title),
        Some("Imported")
    );
}

#[test]
fn test_renamed_group_lists_renamed_chapter() {
    let project = core_project(&["a"]);
    let mut chapter = chapter_json("core", vec![quest_json("b")]);
    chapter["group"] = json!("main");
    let text = json!({
        "id": "incoming",
        "title": "Incoming",
        "chapter_groups": [{"id": "main", "title": "Main", "chapter_ids": ["core"]}],
        "chapters": [chapter]
    })
    .to_string();

    let report = Importer::new(KindRegistry::standard(), ImportConfig::default())
        .import(&text, &project)
        .unwrap();
    let merged = &report.outcome.project;

    let imported_group = merged.chapter_group("main_import").unwrap();
    assert_eq!(imported_group.chapter_ids(), ["core_import".to_string()]);
    assert_eq!(
        merged.chapter_group("main").unwrap().chapter_ids(),
        ["core".to_string()]
    );
    assert_eq!(report.outcome.summary.added_groups, vec!["main_import"]);
    assert_eq!(report.outcome.summary.added_chapters, vec!["core_import"]);
}
