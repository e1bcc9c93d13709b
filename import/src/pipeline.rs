//! End-to-end import: parse, validate, read, merge.

use questpack_core::{
    KindRegistry, Project, ROOT_PATH, ValidationIssue, error_count, has_errors,
};
use questpack_validate::validate_pack_tree;
use tracing::{debug, info};

use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::merge::{MergeEngine, MergeOutcome};
use crate::pack::ImportedPack;
use crate::parse::{JsonTreeParser, TreeParser};
use crate::reader::PackReader;

/// Result of checking pack text without merging it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportCheck {
    pub issues: Vec<ValidationIssue>,
    /// The read pack, absent when the text did not parse.
    pub pack: Option<ImportedPack>,
}

impl ImportCheck {
    pub fn has_errors(&self) -> bool {
        has_errors(&self.issues)
    }
}

/// Result of a successful import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    /// Validation issues, warnings only unless errors were allowed.
    pub issues: Vec<ValidationIssue>,
    /// Warnings raised while reading the pack.
    pub pack_warnings: Vec<String>,
    pub outcome: MergeOutcome,
}

/// Bundles a parser, a kind registry and an import configuration.
///
/// # Examples
///
/// ```
/// use questpack_core::{KindRegistry, Project};
/// use questpack_import::{ImportConfig, Importer};
///
/// let importer = Importer::new(KindRegistry::standard(), ImportConfig::default());
///
/// let check = importer.check("{ not json");
/// assert!(check.has_errors());
/// assert!(check.pack.is_none());
///
/// let report = importer
///     .import(r#"{"id": "p", "title": "P", "chapters": []}"#, &Project::empty())
///     .unwrap();
/// assert!(report.issues.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Importer<P = JsonTreeParser> {
    parser: P,
    registry: KindRegistry,
    config: ImportConfig,
}

impl Importer<JsonTreeParser> {
    pub fn new(registry: KindRegistry, config: ImportConfig) -> Self {
        Self::with_parser(JsonTreeParser, registry, config)
    }
}

impl<P: TreeParser> Importer<P> {
    pub fn with_parser(parser: P, registry: KindRegistry, config: ImportConfig) -> Self {
        Self {
            parser,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    /// Parses, validates and reads `text`. A parse failure becomes a single
    /// root-level ERROR.
    pub fn check(&self, text: &str) -> ImportCheck {
        let tree = match self.parser.parse_root_compound(text) {
            Ok(tree) => tree,
            Err(e) => {
                debug!(error = %e, "pack text did not parse");
                return ImportCheck {
                    issues: vec![ValidationIssue::error(ROOT_PATH, e.to_string())],
                    pack: None,
                };
            }
        };

        let issues = validate_pack_tree(&tree);
        let pack = PackReader::new(&self.registry).read(&tree).ok();
        ImportCheck { issues, pack }
    }

    /// Parses, validates, reads and merges `text` into a copy of `project`.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Parse`] for unparsable text,
    /// [`ImportError::Blocked`] when validation reports errors and
    /// `allow_errors` is off, and the read or merge error otherwise.
    pub fn import(&self, text: &str, project: &Project) -> Result<ImportReport, ImportError> {
        let tree = self.parser.parse_root_compound(text)?;

        let issues = validate_pack_tree(&tree);
        if has_errors(&issues) && !self.config.allow_errors {
            let error_count = error_count(&issues);
            info!(error_count, "import blocked by validation errors");
            return Err(ImportError::Blocked {
                error_count,
                issues,
            });
        }

        let pack = PackReader::new(&self.registry).read(&tree)?;
        let outcome = MergeEngine::new(&self.registry).merge(
            project,
            &pack,
            &self.config.merge_options(),
        )?;
        Ok(ImportReport {
            issues,
            pack_warnings: pack.warnings,
            outcome,
        })
    }
}
