//! Composable specifications over [`FilePath`] and the boundary policy.
//!
//! A [`Specification`] is a pure predicate with a human-readable `reason()`.
//! Specifications compose with AND/OR/NOT into the canonical modification
//! policy:
//!
//! ```text
//! BoundaryAllowed(i) = OwnedByInstance(i) OR InSharedPath OR IsTestFile
//!                      OR IsConfigFile OR NOT IsCriticalFile
//! ```
//!
//! A modification is permitted unless the file is of a critical type and is
//! neither owned, shared, a test file, nor project config.

use crate::filepath::FilePath;

/// A composable boolean rule over resolved file paths.
pub trait Specification: Send + Sync {
    /// Whether the candidate satisfies this rule. Pure and deterministic.
    fn is_satisfied_by(&self, file: &FilePath) -> bool;

    /// Human-readable rendering of this rule.
    fn reason(&self) -> String;
}

/// Combinator methods, available on every specification.
pub trait SpecificationExt: Specification + Sized {
    fn and<S: Specification>(self, other: S) -> And<Self, S> {
        And(self, other)
    }

    fn or<S: Specification>(self, other: S) -> Or<Self, S> {
        Or(self, other)
    }

    fn negate(self) -> Not<Self> {
        Not(self)
    }
}

impl<T: Specification> SpecificationExt for T {}

impl Specification for Box<dyn Specification> {
    fn is_satisfied_by(&self, file: &FilePath) -> bool {
        self.as_ref().is_satisfied_by(file)
    }

    fn reason(&self) -> String {
        self.as_ref().reason()
    }
}

/// Both rules must hold.
pub struct And<A, B>(A, B);

impl<A: Specification, B: Specification> Specification for And<A, B> {
    fn is_satisfied_by(&self, file: &FilePath) -> bool {
        self.0.is_satisfied_by(file) && self.1.is_satisfied_by(file)
    }

    fn reason(&self) -> String {
        format!("{} AND {}", self.0.reason(), self.1.reason())
    }
}

/// At least one rule must hold.
pub struct Or<A, B>(A, B);

impl<A: Specification, B: Specification> Specification for Or<A, B> {
    fn is_satisfied_by(&self, file: &FilePath) -> bool {
        self.0.is_satisfied_by(file) || self.1.is_satisfied_by(file)
    }

    fn reason(&self) -> String {
        format!("{} OR {}", self.0.reason(), self.1.reason())
    }
}

/// The rule must not hold.
pub struct Not<S>(S);

impl<S: Specification> Specification for Not<S> {
    fn is_satisfied_by(&self, file: &FilePath) -> bool {
        !self.0.is_satisfied_by(file)
    }

    fn reason(&self) -> String {
        format!("NOT ({})", self.0.reason())
    }
}

// ---------------------------------------------------------------------------
// Atomic specifications
// ---------------------------------------------------------------------------

/// File belongs to the given instance's territory.
pub struct OwnedByInstance {
    pub instance_id: String,
}

impl OwnedByInstance {
    pub fn new(instance_id: &str) -> Self {
        Self {
            instance_id: instance_id.to_string(),
        }
    }
}

impl Specification for OwnedByInstance {
    fn is_satisfied_by(&self, file: &FilePath) -> bool {
        file.instance_owner.as_deref() == Some(self.instance_id.as_str())
    }

    fn reason(&self) -> String {
        format!("owned by {}", self.instance_id)
    }
}

/// File is in shared territory.
pub struct InSharedPath;

impl Specification for InSharedPath {
    fn is_satisfied_by(&self, file: &FilePath) -> bool {
        file.is_shared
    }

    fn reason(&self) -> String {
        "in shared path (coordinate changes)".to_string()
    }
}

/// File sits under the tests root.
pub struct IsTestFile;

impl Specification for IsTestFile {
    fn is_satisfied_by(&self, file: &FilePath) -> bool {
        file.is_test_file
    }

    fn reason(&self) -> String {
        "in tests directory".to_string()
    }
}

/// File is project-level configuration.
pub struct IsConfigFile;

impl Specification for IsConfigFile {
    fn is_satisfied_by(&self, file: &FilePath) -> bool {
        file.is_config
    }

    fn reason(&self) -> String {
        "project-level config".to_string()
    }
}

/// File is of a type subject to boundary enforcement.
pub struct IsCriticalFile {
    extensions: Vec<String>,
}

impl IsCriticalFile {
    pub fn new(extensions: &[String]) -> Self {
        Self {
            extensions: extensions.to_vec(),
        }
    }
}

impl Specification for IsCriticalFile {
    fn is_satisfied_by(&self, file: &FilePath) -> bool {
        self.extensions.contains(&file.file_extension)
    }

    fn reason(&self) -> String {
        "critical file type".to_string()
    }
}

// ---------------------------------------------------------------------------
// The boundary policy
// ---------------------------------------------------------------------------

/// The canonical modification policy for one acting instance.
pub struct BoundaryAllowed {
    inner: Box<dyn Specification>,
}

impl BoundaryAllowed {
    /// Build the policy for an instance, with the map's critical extensions.
    pub fn new(instance_id: &str, critical_extensions: &[String]) -> Self {
        let spec = OwnedByInstance::new(instance_id)
            .or(InSharedPath)
            .or(IsTestFile)
            .or(IsConfigFile)
            .or(IsCriticalFile::new(critical_extensions).negate());
        Self {
            inner: Box::new(spec),
        }
    }
}

impl Specification for BoundaryAllowed {
    fn is_satisfied_by(&self, file: &FilePath) -> bool {
        self.inner.is_satisfied_by(file)
    }

    fn reason(&self) -> String {
        self.inner.reason()
    }
}

/// Per-file boundary decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Warning,
    Violation,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Ok => write!(f, "OK"),
            Verdict::Warning => write!(f, "WARNING"),
            Verdict::Violation => write!(f, "VIOLATION"),
        }
    }
}

/// Decide whether `instance` may modify `file`, with a specific reason.
///
/// The policy itself is [`BoundaryAllowed`]; this narrows its outcome to one
/// verdict and picks the most informative reason string. Shared paths pass
/// but carry a warning (changes there need coordination); an unsatisfied
/// policy is a hard violation only when another instance owns the file —
/// a critical file in no declared territory is a warning.
pub fn decide(
    file: &FilePath,
    instance_id: &str,
    critical_extensions: &[String],
) -> (Verdict, String) {
    let policy = BoundaryAllowed::new(instance_id, critical_extensions);

    if policy.is_satisfied_by(file) {
        if file.is_shared {
            return (Verdict::Warning, InSharedPath.reason());
        }
        let reason = if file.instance_owner.as_deref() == Some(instance_id) {
            OwnedByInstance::new(instance_id).reason()
        } else if file.is_config {
            IsConfigFile.reason()
        } else if file.is_test_file {
            IsTestFile.reason()
        } else {
            "non-critical file type".to_string()
        };
        return (Verdict::Ok, reason);
    }

    match file.instance_owner.as_deref() {
        Some(owner) => (Verdict::Violation, format!("owned by {owner}")),
        None => (
            Verdict::Warning,
            "not in any declared boundary".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::ownership::{InstanceBoundary, OwnershipMap, SharedCategory};

    fn map() -> OwnershipMap {
        OwnershipMap {
            instances: vec![
                InstanceBoundary {
                    id: "instance1".into(),
                    owned_paths: vec!["src/storage/".into()],
                    allowed_imports: vec![],
                },
                InstanceBoundary {
                    id: "instance2".into(),
                    owned_paths: vec!["src/embeddings/".into()],
                    allowed_imports: vec![],
                },
            ],
            shared: vec![SharedCategory {
                category: "common".into(),
                paths: vec!["src/common/".into()],
            }],
            ..Default::default()
        }
    }

    fn resolve(path: &str) -> FilePath {
        FilePath::resolve(Path::new(path), Path::new("/p"), &map())
    }

    fn policy(instance: &str) -> BoundaryAllowed {
        BoundaryAllowed::new(instance, &map().critical_extensions)
    }

    #[test]
    fn owned_file_satisfies_policy() {
        let fp = resolve("src/storage/gcs.py");
        assert!(policy("instance1").is_satisfied_by(&fp));
        assert!(!policy("instance2").is_satisfied_by(&fp));
    }

    #[test]
    fn shared_file_satisfies_policy_for_every_instance() {
        let fp = resolve("src/common/types.py");
        for instance in ["instance1", "instance2", "instance9"] {
            assert!(policy(instance).is_satisfied_by(&fp));
        }
    }

    #[test]
    fn non_critical_file_always_passes() {
        let fp = resolve("src/embeddings/image.png");
        assert!(policy("instance1").is_satisfied_by(&fp));
        assert!(policy("instance2").is_satisfied_by(&fp));
    }

    #[test]
    fn foreign_critical_file_fails_policy() {
        let fp = resolve("src/embeddings/generator.py");
        assert!(!policy("instance1").is_satisfied_by(&fp));
    }

    #[test]
    fn double_negation_is_idempotent() {
        let owned = resolve("src/storage/gcs.py");
        let foreign = resolve("src/embeddings/generator.py");
        let spec = OwnedByInstance::new("instance1");
        let double = OwnedByInstance::new("instance1").negate().negate();
        assert_eq!(spec.is_satisfied_by(&owned), double.is_satisfied_by(&owned));
        assert_eq!(
            spec.is_satisfied_by(&foreign),
            double.is_satisfied_by(&foreign)
        );
    }

    #[test]
    fn reasons_render_in_both_polarities() {
        // reason() text is independent of whether a candidate satisfies the
        // rule; assert it reads sensibly against both outcomes.
        let spec = OwnedByInstance::new("instance1");
        let satisfied = resolve("src/storage/gcs.py");
        let unsatisfied = resolve("src/embeddings/generator.py");
        assert!(spec.is_satisfied_by(&satisfied));
        assert!(!spec.is_satisfied_by(&unsatisfied));
        assert_eq!(spec.reason(), "owned by instance1");

        let not = spec.negate();
        assert!(!not.is_satisfied_by(&satisfied));
        assert!(not.is_satisfied_by(&unsatisfied));
        assert_eq!(not.reason(), "NOT (owned by instance1)");
    }

    #[test]
    fn composite_reasons_join_children() {
        let spec = InSharedPath.and(IsTestFile.or(IsConfigFile));
        assert_eq!(
            spec.reason(),
            "in shared path (coordinate changes) AND in tests directory OR project-level config"
        );
    }

    #[test]
    fn boundary_allowed_reason_mentions_every_branch() {
        let reason = policy("instance1").reason();
        assert!(reason.contains("owned by instance1"));
        assert!(reason.contains("shared path"));
        assert!(reason.contains("tests directory"));
        assert!(reason.contains("NOT (critical file type)"));
    }

    #[test]
    fn decide_maps_outcomes_to_verdicts() {
        let exts = map().critical_extensions;

        let (v, r) = decide(&resolve("src/storage/gcs.py"), "instance1", &exts);
        assert_eq!(v, Verdict::Ok);
        assert_eq!(r, "owned by instance1");

        let (v, _) = decide(&resolve("src/common/types.py"), "instance1", &exts);
        assert_eq!(v, Verdict::Warning);

        let (v, r) = decide(&resolve("src/embeddings/generator.py"), "instance1", &exts);
        assert_eq!(v, Verdict::Violation);
        assert_eq!(r, "owned by instance2");

        let (v, _) = decide(&resolve("src/unclaimed/new.py"), "instance1", &exts);
        assert_eq!(v, Verdict::Warning);

        let (v, _) = decide(&resolve("assets/image.png"), "instance1", &exts);
        assert_eq!(v, Verdict::Ok);
    }
}
