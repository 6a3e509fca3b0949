//! The ownership map: who owns which subtree.
//!
//! An [`OwnershipMap`] assigns each instance an ordered list of directory
//! prefixes and declares shared categories every instance may touch. It is
//! loaded once from TOML at process start and frozen for the run; every
//! resolver and validator receives it by reference.
//!
//! Prefixes are plain string prefixes against project-relative paths, so a
//! declared prefix does not have to exist on disk yet. Existence only matters
//! to the self-validation pass, which reports a missing prefix as a warning
//! (instances may declare territory before creating code).

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::contract::CapabilityDescriptor;
use crate::error::ConfigError;
use crate::report::Severity;

fn default_root_prefix() -> String {
    "src".to_string()
}

fn default_tests_root() -> String {
    "tests".to_string()
}

fn default_config_patterns() -> Vec<String> {
    [
        ".github/",
        "pyproject.toml",
        "poetry.lock",
        ".gitignore",
        ".pre-commit-config.yaml",
        ".instance",
        "mise.toml",
        "README.md",
        "LICENSE",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_critical_extensions() -> Vec<String> {
    [".py", ".yaml", ".yml", ".toml", ".json", ".md"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// One instance's declared territory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceBoundary {
    /// Instance identifier (e.g. "instance1").
    pub id: String,
    /// Directory prefixes this instance exclusively owns, in declaration order.
    #[serde(default)]
    pub owned_paths: Vec<String>,
    /// Prefixes this instance may import from beyond its own territory.
    #[serde(default)]
    pub allowed_imports: Vec<String>,
}

/// A category of shared territory (e.g. "interfaces", "docs").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedCategory {
    pub category: String,
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Static ownership configuration for one project.
///
/// Declaration order matters twice: owner resolution returns the *first*
/// instance whose prefix matches, and the self-validation pass attributes a
/// duplicate prefix to the instance that declared it first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipMap {
    /// Top-level package segment of project-internal imports (dotted form).
    #[serde(default = "default_root_prefix")]
    pub root_prefix: String,
    /// Canonical tests directory segment.
    #[serde(default = "default_tests_root")]
    pub tests_root: String,
    /// Project-level config filenames/patterns, exempt from ownership.
    #[serde(default = "default_config_patterns")]
    pub config_patterns: Vec<String>,
    /// Extensions subject to boundary enforcement.
    #[serde(default = "default_critical_extensions")]
    pub critical_extensions: Vec<String>,
    /// Instance territories, in declaration order.
    #[serde(default, rename = "instance")]
    pub instances: Vec<InstanceBoundary>,
    /// Shared categories, in declaration order.
    #[serde(default, rename = "shared")]
    pub shared: Vec<SharedCategory>,
    /// Interface contracts for the contract checker.
    #[serde(default, rename = "interface")]
    pub interfaces: Vec<CapabilityDescriptor>,
}

impl Default for OwnershipMap {
    fn default() -> Self {
        Self {
            root_prefix: default_root_prefix(),
            tests_root: default_tests_root(),
            config_patterns: default_config_patterns(),
            critical_extensions: default_critical_extensions(),
            instances: Vec::new(),
            shared: Vec::new(),
            interfaces: Vec::new(),
        }
    }
}

impl OwnershipMap {
    /// Parse an ownership map from a TOML document.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let map: OwnershipMap = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!(
            instances = map.instances.len(),
            shared = map.shared.len(),
            "loaded ownership map"
        );
        Ok(map)
    }

    /// Load an ownership map from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Look up an instance's territory by id.
    pub fn instance(&self, id: &str) -> Option<&InstanceBoundary> {
        self.instances.iter().find(|b| b.id == id)
    }

    /// Resolve the owning instance for a project-relative path.
    ///
    /// Scans instances in declaration order and returns the first whose
    /// declared prefix is a string-prefix of the path. `None` means the path
    /// is unrestricted.
    pub fn owner_of(&self, path: &str) -> Option<&str> {
        for boundary in &self.instances {
            for prefix in &boundary.owned_paths {
                if path.starts_with(prefix.as_str()) {
                    return Some(&boundary.id);
                }
            }
        }
        None
    }

    /// Whether a project-relative path falls in any shared category.
    pub fn is_shared(&self, path: &str) -> bool {
        self.shared
            .iter()
            .flat_map(|c| &c.paths)
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// All shared prefixes across categories, in declaration order.
    pub fn shared_prefixes(&self) -> Vec<String> {
        self.shared
            .iter()
            .flat_map(|c| c.paths.iter().cloned())
            .collect()
    }

    /// Whether a project-relative path matches a config filename/pattern.
    ///
    /// Patterns match either the exact path or a fixed substring of it, the
    /// same way pre-commit-style path filters behave.
    pub fn is_config(&self, path: &str) -> bool {
        self.config_patterns
            .iter()
            .any(|pattern| path == pattern || path.contains(pattern.as_str()))
    }

    /// Validate the map itself for internal consistency.
    ///
    /// Duplicate literal-prefix declarations across instances are fatal
    /// configuration bugs; a declared prefix that does not exist under
    /// `project_root` is a warning only. Pass `None` to skip the existence
    /// check (resolution itself never touches the filesystem).
    pub fn validate(&self, project_root: Option<&Path>) -> Vec<MapIssue> {
        let mut seen: Vec<(&str, &str)> = Vec::new();
        let mut issues = Vec::new();

        for boundary in &self.instances {
            for prefix in &boundary.owned_paths {
                if let Some((_, first)) = seen.iter().find(|(p, _)| *p == prefix.as_str()) {
                    issues.push(MapIssue {
                        instance: boundary.id.clone(),
                        prefix: prefix.clone(),
                        kind: MapIssueKind::DuplicateOwnership {
                            first_owner: (*first).to_string(),
                        },
                    });
                    continue;
                }
                seen.push((prefix, &boundary.id));

                if let Some(root) = project_root {
                    if !root.join(prefix).exists() {
                        issues.push(MapIssue {
                            instance: boundary.id.clone(),
                            prefix: prefix.clone(),
                            kind: MapIssueKind::MissingOnDisk,
                        });
                    }
                }
            }
        }

        issues
    }
}

/// A problem found by ownership-map self-validation.
#[derive(Debug, Clone, Serialize)]
pub struct MapIssue {
    /// Instance whose declaration triggered the issue.
    pub instance: String,
    /// The offending prefix.
    pub prefix: String,
    #[serde(flatten)]
    pub kind: MapIssueKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapIssueKind {
    /// The same literal prefix is owned by two instances.
    DuplicateOwnership { first_owner: String },
    /// The declared prefix does not exist on disk yet.
    MissingOnDisk,
}

impl MapIssue {
    pub fn severity(&self) -> Severity {
        match self.kind {
            MapIssueKind::DuplicateOwnership { .. } => Severity::Error,
            MapIssueKind::MissingOnDisk => Severity::Warning,
        }
    }

    /// Whether this issue makes the map unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, MapIssueKind::DuplicateOwnership { .. })
    }
}

impl fmt::Display for MapIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MapIssueKind::DuplicateOwnership { first_owner } => write!(
                f,
                "{}: \"{}\" - DUPLICATE OWNERSHIP (already declared by {})",
                self.instance, self.prefix, first_owner
            ),
            MapIssueKind::MissingOnDisk => write!(
                f,
                "{}: \"{}\" - does not exist yet",
                self.instance, self.prefix
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_instance_map() -> OwnershipMap {
        OwnershipMap {
            instances: vec![
                InstanceBoundary {
                    id: "instance1".into(),
                    owned_paths: vec!["src/storage/".into(), "src/pipeline/".into()],
                    allowed_imports: vec!["src/common/".into()],
                },
                InstanceBoundary {
                    id: "instance2".into(),
                    owned_paths: vec!["src/embeddings/".into()],
                    allowed_imports: vec!["src/common/".into()],
                },
            ],
            shared: vec![SharedCategory {
                category: "common".into(),
                paths: vec!["src/common/".into(), "src/interfaces/".into()],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn owner_resolution_respects_declaration_order() {
        let map = two_instance_map();
        assert_eq!(map.owner_of("src/storage/gcs.py"), Some("instance1"));
        assert_eq!(map.owner_of("src/embeddings/generator.py"), Some("instance2"));
        assert_eq!(map.owner_of("src/unclaimed/thing.py"), None);
    }

    #[test]
    fn shared_and_config_classification() {
        let map = two_instance_map();
        assert!(map.is_shared("src/common/types.py"));
        assert!(!map.is_shared("src/storage/gcs.py"));
        assert!(map.is_config("pyproject.toml"));
        assert!(map.is_config(".github/workflows/ci.yml"));
        assert!(!map.is_config("src/storage/gcs.py"));
    }

    #[test]
    fn duplicate_prefix_is_a_single_fatal_issue() {
        let mut map = two_instance_map();
        map.instances[1].owned_paths.push("src/storage/".into());

        let issues = map.validate(None);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_fatal());
        assert_eq!(issues[0].severity(), Severity::Error);
        assert_eq!(issues[0].instance, "instance2");
        assert!(format!("{}", issues[0]).contains("DUPLICATE OWNERSHIP"));
    }

    #[test]
    fn missing_prefix_on_disk_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/storage")).unwrap();

        let map = OwnershipMap {
            instances: vec![InstanceBoundary {
                id: "instance1".into(),
                owned_paths: vec!["src/storage/".into(), "src/pipeline/".into()],
                allowed_imports: vec![],
            }],
            ..Default::default()
        };

        let issues = map.validate(Some(dir.path()));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].prefix, "src/pipeline/");
        assert_eq!(issues[0].severity(), Severity::Warning);
        assert!(!issues[0].is_fatal());
    }

    #[test]
    fn toml_round_trip() {
        let text = r#"
            root_prefix = "src"

            [[instance]]
            id = "instance1"
            owned_paths = ["src/storage/"]
            allowed_imports = ["src/common/"]

            [[shared]]
            category = "common"
            paths = ["src/common/"]
        "#;
        let map = OwnershipMap::from_toml_str(text, Path::new("test.toml")).unwrap();
        assert_eq!(map.instances.len(), 1);
        assert_eq!(map.owner_of("src/storage/x.py"), Some("instance1"));
        assert!(map.is_shared("src/common/types.py"));
        // Defaults fill in the omitted tables.
        assert!(map.critical_extensions.contains(&".py".to_string()));
        assert_eq!(map.tests_root, "tests");
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let err = OwnershipMap::from_toml_str("[[instance]]\nid = 42", Path::new("bad.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
