//! Copying of textures and icons referenced by an imported pack.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

/// Maps an asset reference to a path relative to an asset root.
///
/// Namespaced references (`ns:path`) land under `assets/ns/path`; plain
/// references are used as-is. References that could escape the root
/// (absolute paths, `..`, drive prefixes) yield `None`.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use questpack_import::asset_relative_path;
///
/// assert_eq!(
///     asset_relative_path("questpack:textures/bg.png"),
///     Some(PathBuf::from("assets/questpack/textures/bg.png"))
/// );
/// assert_eq!(asset_relative_path("textures/bg.png"), Some(PathBuf::from("textures/bg.png")));
/// assert_eq!(asset_relative_path("../secret.png"), None);
/// ```
pub fn asset_relative_path(reference: &str) -> Option<PathBuf> {
    let relative = match reference.split_once(':') {
        Some((namespace, path)) => Path::new("assets").join(namespace).join(path),
        None => PathBuf::from(reference),
    };

    let mut components = relative.components().peekable();
    components.peek()?;
    if components.all(|component| matches!(component, Component::Normal(_))) {
        Some(relative)
    } else {
        None
    }
}

/// Copies every asset from `source` to `destination`, preserving relative
/// layout. Returns one warning per asset that could not be copied.
pub fn copy_assets(assets: &BTreeSet<String>, source: &Path, destination: &Path) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut copied = 0usize;

    for reference in assets {
        let Some(relative) = asset_relative_path(reference) else {
            warnings.push(format!("Asset '{reference}' has an unsafe path; skipped"));
            continue;
        };

        let from = source.join(&relative);
        if !from.is_file() {
            warnings.push(format!(
                "Asset '{reference}' not found at {}",
                from.display()
            ));
            continue;
        }

        let to = destination.join(&relative);
        let result = match to.parent() {
            Some(parent) => fs::create_dir_all(parent).and_then(|()| fs::copy(&from, &to)),
            None => fs::copy(&from, &to),
        };
        match result {
            Ok(bytes) => {
                debug!(asset = %reference, to = %to.display(), bytes, "copied asset");
                copied += 1;
            }
            Err(e) => {
                warn!(asset = %reference, error = %e, "asset copy failed");
                warnings.push(format!("Failed to copy asset '{reference}': {e}"));
            }
        }
    }

    info!(copied, failed = warnings.len(), "asset copy finished");
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_escaping_paths() {
        assert_eq!(asset_relative_path("/etc/passwd"), None);
        assert_eq!(asset_relative_path("ns:../../x.png"), None);
        assert_eq!(asset_relative_path(""), None);
    }

    #[test]
    fn test_copies_and_reports_missing() {
        let source = tempfile::TempDir::new().unwrap();
        let destination = tempfile::TempDir::new().unwrap();
        let texture = source.path().join("assets/qp/textures/bg.png");
        fs::create_dir_all(texture.parent().unwrap()).unwrap();
        fs::write(&texture, b"png").unwrap();

        let assets: BTreeSet<String> = ["qp:textures/bg.png", "qp:textures/missing.png"]
            .into_iter()
            .map(String::from)
            .collect();
        let warnings = copy_assets(&assets, source.path(), destination.path());

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("missing.png"));
        let copied = destination.path().join("assets/qp/textures/bg.png");
        assert_eq!(fs::read(copied).unwrap(), b"png");
    }
}
