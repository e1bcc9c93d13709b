//! Conflict policies and id resolution.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// What to do when an imported id is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictPolicy {
    /// Keep the existing entity and drop the imported one.
    Skip,
    /// Replace the existing entity in place.
    MergeById,
    /// Import under `<id>_import`, `<id>_import1`, ...
    #[default]
    Rename,
    /// Import under an id hashed from the pack id and the original id.
    NewIds,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Skip => "SKIP",
            Self::MergeById => "MERGE_BY_ID",
            Self::Rename => "RENAME",
            Self::NewIds => "NEW_IDS",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResolutionOutcome {
    /// Added as a new entity.
    New,
    /// Replaces the existing entity with the same id.
    Merge,
    /// Dropped.
    Skip,
}

/// Resolved id of one imported entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub resolved_id: String,
    pub outcome: ResolutionOutcome,
}

impl Resolution {
    fn new(resolved_id: impl Into<String>, outcome: ResolutionOutcome) -> Self {
        Self {
            resolved_id: resolved_id.into(),
            outcome,
        }
    }
}

/// First 16 upper-case hex digits of SHA-256 over `<pack_id>:<original_id>`.
///
/// # Examples
///
/// ```
/// use questpack_import::hashed_id;
///
/// let id = hashed_id("starter_pack", "chap1");
/// assert_eq!(id.len(), 16);
/// assert_eq!(id, hashed_id("starter_pack", "chap1"));
/// assert_ne!(id, hashed_id("other_pack", "chap1"));
/// ```
pub fn hashed_id(pack_id: &str, original_id: &str) -> String {
    let hash = Sha256::digest(format!("{pack_id}:{original_id}").as_bytes());
    let mut hex = format!("{hash:X}");
    hex.truncate(16);
    hex
}

/// Resolves imported ids of one entity class against the ids already in use.
///
/// Every id resolved to [`ResolutionOutcome::New`] joins the used set, so
/// later imports of the same class see it as taken.
///
/// # Examples
///
/// ```
/// use questpack_import::{ConflictPolicy, IdResolver, ResolutionOutcome};
///
/// let mut quests = IdResolver::new("pack", ["welcome".to_string()]);
///
/// let first = quests.resolve("welcome", ConflictPolicy::Rename);
/// assert_eq!(first.resolved_id, "welcome_import");
/// assert_eq!(first.outcome, ResolutionOutcome::New);
///
/// let second = quests.resolve("welcome", ConflictPolicy::Rename);
/// assert_eq!(second.resolved_id, "welcome_import1");
/// ```
#[derive(Debug, Clone)]
pub struct IdResolver {
    pack_id: String,
    used: HashSet<String>,
}

impl IdResolver {
    pub fn new<I>(pack_id: impl Into<String>, existing: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            pack_id: pack_id.into(),
            used: existing.into_iter().collect(),
        }
    }

    pub fn is_used(&self, id: &str) -> bool {
        self.used.contains(id)
    }

    /// Resolves `original_id`, treating it as conflicting when already used.
    pub fn resolve(&mut self, original_id: &str, policy: ConflictPolicy) -> Resolution {
        let conflict = self.used.contains(original_id);
        self.resolve_with(original_id, conflict, policy)
    }

    /// Resolves `original_id` with an explicit conflict flag.
    pub fn resolve_with(
        &mut self,
        original_id: &str,
        conflict: bool,
        policy: ConflictPolicy,
    ) -> Resolution {
        let resolution = if !conflict {
            Resolution::new(original_id, ResolutionOutcome::New)
        } else {
            match policy {
                ConflictPolicy::Skip => Resolution::new(original_id, ResolutionOutcome::Skip),
                ConflictPolicy::MergeById => {
                    Resolution::new(original_id, ResolutionOutcome::Merge)
                }
                ConflictPolicy::Rename => {
                    Resolution::new(self.renamed(original_id), ResolutionOutcome::New)
                }
                ConflictPolicy::NewIds => {
                    Resolution::new(self.hashed(original_id), ResolutionOutcome::New)
                }
            }
        };

        if resolution.outcome == ResolutionOutcome::New {
            self.used.insert(resolution.resolved_id.clone());
        }
        debug!(
            original = %original_id,
            resolved = %resolution.resolved_id,
            outcome = ?resolution.outcome,
            %policy,
            conflict,
            "resolved imported id"
        );
        resolution
    }

    fn renamed(&self, original_id: &str) -> String {
        let base = format!("{original_id}_import");
        if !self.used.contains(&base) {
            return base;
        }
        let mut suffix = 1u64;
        loop {
            let candidate = format!("{base}{suffix}");
            if !self.used.contains(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    fn hashed(&self, original_id: &str) -> String {
        let mut candidate = hashed_id(&self.pack_id, original_id);
        while self.used.contains(&candidate) {
            let salt = format!("{original_id}:{:016X}", rand::random::<u64>());
            candidate = hashed_id(&self.pack_id, &salt);
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(existing: &[&str]) -> IdResolver {
        IdResolver::new("pack", existing.iter().map(|id| id.to_string()))
    }

    #[test]
    fn test_unused_id_is_kept_whatever_the_policy() {
        for policy in [
            ConflictPolicy::Skip,
            ConflictPolicy::MergeById,
            ConflictPolicy::Rename,
            ConflictPolicy::NewIds,
        ] {
            let resolution = resolver(&[]).resolve("chap1", policy);
            assert_eq!(resolution, Resolution::new("chap1", ResolutionOutcome::New));
        }
    }

    #[test]
    fn test_new_outcome_marks_id_used() {
        let mut ids = resolver(&[]);
        ids.resolve("intro", ConflictPolicy::Rename);
        assert!(ids.is_used("intro"));
        assert_eq!(ids.resolve("intro", ConflictPolicy::Rename).resolved_id, "intro_import");
        assert!(ids.is_used("intro_import"));
    }

    #[test]
    fn test_skip_and_merge_keep_original() {
        let mut ids = resolver(&["core"]);
        assert_eq!(
            ids.resolve("core", ConflictPolicy::Skip),
            Resolution::new("core", ResolutionOutcome::Skip)
        );
        assert_eq!(
            ids.resolve("core", ConflictPolicy::MergeById),
            Resolution::new("core", ResolutionOutcome::Merge)
        );
    }

    #[test]
    fn test_rename_suffix_sequence() {
        let mut ids = resolver(&["a", "a_import", "a_import1"]);
        assert_eq!(ids.resolve("a", ConflictPolicy::Rename).resolved_id, "a_import2");
        assert_eq!(ids.resolve("a", ConflictPolicy::Rename).resolved_id, "a_import3");
    }

    #[test]
    fn test_new_ids_are_deterministic_per_pack() {
        let first = resolver(&["chap1"]).resolve_with("chap1", true, ConflictPolicy::NewIds);
        let second = resolver(&["chap1"]).resolve_with("chap1", true, ConflictPolicy::NewIds);
        assert_eq!(first, second);
        assert_eq!(first.resolved_id, hashed_id("pack", "chap1"));
        assert!(first.resolved_id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_new_ids_rehash_on_collision() {
        let taken = hashed_id("pack", "chap1");
        let mut ids = resolver(&["chap1", taken.as_str()]);
        let resolution = ids.resolve("chap1", ConflictPolicy::NewIds);
        assert_ne!(resolution.resolved_id, taken);
        assert_eq!(resolution.resolved_id.len(), 16);
    }

    #[test]
    fn test_policy_display_names() {
        let names: Vec<_> = [
            ConflictPolicy::Skip,
            ConflictPolicy::MergeById,
            ConflictPolicy::Rename,
            ConflictPolicy::NewIds,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(names, vec!["SKIP", "MERGE_BY_ID", "RENAME", "NEW_IDS"]);
    }
}
