//! The [`FilePath`] value object: a raw path resolved against the ownership map.
//!
//! Resolution is a pure function of (raw path, project root, map) — it never
//! touches the filesystem, because a candidate path is a logical key (it may
//! name a deleted or not-yet-created file). Classification precedence is
//! strict: config, then shared, then instance ownership.

use std::path::{Path, PathBuf};

use crate::ownership::OwnershipMap;

/// A file path with resolved boundary metadata.
///
/// Immutable value object; two resolutions of the same inputs are
/// field-identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePath {
    /// Absolute form of the path.
    pub absolute: PathBuf,
    /// Path relative to the project root, `/`-separated.
    pub relative: String,
    /// Owning instance, if the path falls in declared territory.
    pub instance_owner: Option<String>,
    /// Path sits under the canonical tests root.
    pub is_test_file: bool,
    /// Path falls in a shared category.
    pub is_shared: bool,
    /// Path matches a project-level config pattern.
    pub is_config: bool,
    /// Verbatim extension including the dot (e.g. ".py"), or empty.
    pub file_extension: String,
}

impl FilePath {
    /// Resolve a raw path against the project root and ownership map.
    pub fn resolve(raw: &Path, project_root: &Path, map: &OwnershipMap) -> FilePath {
        let (absolute, relative) = if raw.is_absolute() {
            let rel = raw
                .strip_prefix(project_root)
                .map(Path::to_path_buf)
                // Outside the project root: keep the raw path as the key.
                .unwrap_or_else(|_| raw.to_path_buf());
            (raw.to_path_buf(), rel)
        } else {
            (project_root.join(raw), raw.to_path_buf())
        };

        let relative = normalize_separators(&relative);

        // Strict precedence: config beats shared beats ownership. A config or
        // shared path gets no owner even when an instance prefix also matches.
        let is_config = map.is_config(&relative);
        let is_shared = !is_config && map.is_shared(&relative);
        let instance_owner = if is_config || is_shared {
            None
        } else {
            map.owner_of(&relative).map(str::to_string)
        };

        let tests_prefix = format!("{}/", map.tests_root);
        let tests_segment = format!("/{}/", map.tests_root);
        let is_test_file =
            relative.starts_with(&tests_prefix) || relative.contains(&tests_segment);

        let file_extension = absolute
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();

        FilePath {
            absolute,
            relative,
            instance_owner,
            is_test_file,
            is_shared,
            is_config,
            file_extension,
        }
    }
}

/// Render a relative path with `/` separators regardless of platform.
fn normalize_separators(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(&component.as_os_str().to_string_lossy());
    }
    out
}
