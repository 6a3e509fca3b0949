//! The boundary checker: batch orchestration over candidate files.
//!
//! For each candidate the checker resolves a [`FilePath`], applies the
//! boundary policy, extracts and validates imports, and checks interface
//! contracts. Every per-file check is a pure function of (path, static
//! tables), so the batch fans out over rayon and merges with a stable sort;
//! the report is identical regardless of worker count.
//!
//! Nothing thrown past a single file's check crashes the batch: a missing
//! file or a parse failure degrades to a warning-severity violation for that
//! file only.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::contract;
use crate::error::{ExtractError, FenceResult};
use crate::extract;
use crate::filepath::FilePath;
use crate::ownership::OwnershipMap;
use crate::policy::{self, Verdict};
use crate::report::{FileDecision, Report, Severity, Violation, ViolationKind};
use crate::validate::{ValidationChain, ValidationContext};

/// Checks candidate files against one instance's boundaries.
pub struct BoundaryChecker {
    map: OwnershipMap,
    project_root: PathBuf,
    instance: String,
    ctx: ValidationContext,
    chain: ValidationChain,
}

impl BoundaryChecker {
    /// Build a checker for one acting instance.
    ///
    /// Fails if the instance is not declared in the map.
    pub fn new(map: OwnershipMap, project_root: &Path, instance: &str) -> FenceResult<Self> {
        let ctx = ValidationContext::for_instance(&map, instance)?;
        Ok(Self {
            map,
            project_root: project_root.to_path_buf(),
            instance: instance.to_string(),
            ctx,
            chain: ValidationChain::standard(),
        })
    }

    /// Replace the standard validation chain (e.g. to append custom rules).
    pub fn with_chain(mut self, chain: ValidationChain) -> Self {
        self.chain = chain;
        self
    }

    /// Check a batch of candidate files and produce the merged report.
    ///
    /// The batch always completes: per-file failures are captured as
    /// violations, never propagated.
    pub fn check_files(&self, files: &[PathBuf]) -> Report {
        debug!(
            instance = %self.instance,
            files = files.len(),
            "checking boundaries"
        );

        let results: Vec<(FileDecision, Vec<Violation>)> = files
            .par_iter()
            .map(|file| self.check_file(file))
            .collect();

        let mut report = Report::new(&self.instance);
        for (decision, violations) in results {
            report.decisions.push(decision);
            report.violations.extend(violations);
        }
        report.sort();
        report
    }

    /// Check one candidate file: boundary verdict, imports, contracts.
    fn check_file(&self, file: &Path) -> (FileDecision, Vec<Violation>) {
        let resolved = FilePath::resolve(file, &self.project_root, &self.map);
        trace!(file = %resolved.relative, "checking file");
        let mut violations = Vec::new();

        let (verdict, reason) =
            policy::decide(&resolved, &self.instance, &self.map.critical_extensions);
        match verdict {
            Verdict::Violation => violations.push(self.violation(
                &resolved,
                ViolationKind::Ownership,
                Severity::Error,
                format!(
                    "{} cannot modify {} ({reason})",
                    self.instance, resolved.relative
                ),
            )),
            Verdict::Warning if !resolved.is_shared => violations.push(self.violation(
                &resolved,
                ViolationKind::Undefined,
                Severity::Warning,
                format!("{} is {reason}", resolved.relative),
            )),
            _ => {}
        }

        if resolved.file_extension == ".py" {
            violations.extend(self.check_source(&resolved));
        }

        let decision = FileDecision {
            file: resolved.relative,
            verdict,
            reason,
        };
        (decision, violations)
    }

    /// Import and contract checks for one Python file.
    ///
    /// Extraction failures degrade here: a missing file becomes a
    /// warning-severity `path_not_found`, a malformed file a `parse_error`.
    fn check_source(&self, resolved: &FilePath) -> Vec<Violation> {
        let source = match std::fs::read_to_string(&resolved.absolute) {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return vec![self.violation(
                    resolved,
                    ViolationKind::PathNotFound,
                    Severity::Warning,
                    format!("{} does not exist on disk", resolved.relative),
                )];
            }
            Err(e) => {
                return vec![self.violation(
                    resolved,
                    ViolationKind::ParseError,
                    Severity::Warning,
                    format!("could not read {}: {e}", resolved.relative),
                )];
            }
        };

        let mut violations = Vec::new();

        match extract::parse_source(&source, &resolved.absolute) {
            Ok(imports) => {
                for stmt in &imports {
                    for found in self.chain.run(stmt, &self.ctx) {
                        violations.push(self.violation(
                            resolved,
                            ViolationKind::Import,
                            found.severity,
                            found.message,
                        ));
                    }
                }
            }
            Err(ExtractError::ParseFailure { line, message, .. }) => {
                violations.push(self.violation(
                    resolved,
                    ViolationKind::ParseError,
                    Severity::Warning,
                    format!("syntax error at line {line}: {message}"),
                ));
            }
            Err(e) => {
                violations.push(self.violation(
                    resolved,
                    ViolationKind::ParseError,
                    Severity::Warning,
                    format!("could not parse {}: {e}", resolved.relative),
                ));
            }
        }

        for cv in contract::check_contracts(&resolved.absolute, &source, &self.map.interfaces) {
            violations.push(self.violation(
                resolved,
                ViolationKind::Contract,
                Severity::Error,
                format!(
                    "class {} (line {}) implements {} but is missing: {}",
                    cv.class_name,
                    cv.line_number,
                    cv.interface,
                    cv.missing.join(", ")
                ),
            ));
        }

        violations
    }

    fn violation(
        &self,
        resolved: &FilePath,
        kind: ViolationKind,
        severity: Severity,
        message: String,
    ) -> Violation {
        Violation {
            instance: self.instance.clone(),
            file: resolved.relative.clone(),
            kind,
            severity,
            message,
        }
    }
}

/// Validate the ownership map itself and fold the result into a report.
///
/// Duplicate prefixes surface as errors (fatal for the run), missing
/// directories as warnings.
pub fn validate_map(map: &OwnershipMap, project_root: &Path) -> Report {
    let mut report = Report::new("<map>");
    for issue in map.validate(Some(project_root)) {
        let kind = if issue.is_fatal() {
            ViolationKind::Ownership
        } else {
            ViolationKind::Undefined
        };
        report.violations.push(Violation {
            instance: issue.instance.clone(),
            file: issue.prefix.clone(),
            kind,
            severity: issue.severity(),
            message: issue.to_string(),
        });
    }
    report.sort();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ownership::{InstanceBoundary, SharedCategory};

    fn map() -> OwnershipMap {
        OwnershipMap {
            instances: vec![
                InstanceBoundary {
                    id: "instance1".into(),
                    owned_paths: vec!["src/storage/".into()],
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
                paths: vec!["src/common/".into()],
            }],
            ..Default::default()
        }
    }

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        PathBuf::from(rel)
    }

    #[test]
    fn cross_instance_import_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(
            dir.path(),
            "src/storage/gcs.py",
            "from src.embeddings.generator import Foo\n",
        );

        let checker = BoundaryChecker::new(map(), dir.path(), "instance1").unwrap();
        let report = checker.check_files(&[file]);

        assert_eq!(report.errors(), 1);
        let v = &report.violations[0];
        assert_eq!(v.kind, ViolationKind::Import);
        assert!(v.message.contains("instance2"));
        assert!(v.message.contains("line 1"));
        assert!(report.failed(false));
    }

    #[test]
    fn shared_import_produces_zero_violations() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(
            dir.path(),
            "src/storage/gcs.py",
            "from src.common.types import Document\n",
        );

        let checker = BoundaryChecker::new(map(), dir.path(), "instance1").unwrap();
        let report = checker.check_files(&[file]);
        assert!(report.violations.is_empty());
        assert!(!report.failed(false));
    }

    #[test]
    fn parse_failure_degrades_to_warning_and_batch_completes() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write(dir.path(), "src/storage/bad.py", "from import X\n");
        let good = write(
            dir.path(),
            "src/storage/good.py",
            "from src.common.types import Document\n",
        );

        let checker = BoundaryChecker::new(map(), dir.path(), "instance1").unwrap();
        let report = checker.check_files(&[bad, good]);

        assert_eq!(report.decisions.len(), 2);
        assert_eq!(report.errors(), 0);
        assert_eq!(report.warnings(), 1);
        let v = &report.violations[0];
        assert_eq!(v.kind, ViolationKind::ParseError);
        assert!(v.message.contains("syntax error"));
    }

    #[test]
    fn missing_python_file_is_a_path_not_found_warning() {
        let dir = tempfile::tempdir().unwrap();
        let checker = BoundaryChecker::new(map(), dir.path(), "instance1").unwrap();
        let report = checker.check_files(&[PathBuf::from("src/storage/deleted.py")]);

        assert_eq!(report.warnings(), 1);
        assert_eq!(report.violations[0].kind, ViolationKind::PathNotFound);
    }

    #[test]
    fn foreign_file_modification_is_an_ownership_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "src/embeddings/generator.py", "x = 1\n");

        let checker = BoundaryChecker::new(map(), dir.path(), "instance1").unwrap();
        let report = checker.check_files(&[file]);

        assert_eq!(report.errors(), 1);
        assert_eq!(report.violations[0].kind, ViolationKind::Ownership);
        assert_eq!(report.decisions[0].verdict, Verdict::Violation);
    }

    #[test]
    fn report_is_deterministic_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = (0..8)
            .map(|i| {
                write(
                    dir.path(),
                    &format!("src/storage/mod{i}.py"),
                    "from src.embeddings.generator import Foo\nimport os\n",
                )
            })
            .collect();

        let checker = BoundaryChecker::new(map(), dir.path(), "instance1").unwrap();
        let first = checker.check_files(&files);
        let second = checker.check_files(&files);

        let render = |r: &Report| {
            r.violations
                .iter()
                .map(|v| format!("{}:{}", v.file, v.message))
                .collect::<Vec<_>>()
        };
        assert_eq!(render(&first), render(&second));
        assert_eq!(first.errors(), 8);
    }

    #[test]
    fn contract_violation_is_an_error() {
        let mut m = map();
        m.interfaces.push(crate::contract::CapabilityDescriptor {
            name: "StorageAdapter".into(),
            required_methods: vec!["read".into(), "write".into()],
        });

        let dir = tempfile::tempdir().unwrap();
        let file = write(
            dir.path(),
            "src/storage/impl.py",
            "class Impl(StorageAdapter):\n    def read(self, key):\n        pass\n",
        );

        let checker = BoundaryChecker::new(m, dir.path(), "instance1").unwrap();
        let report = checker.check_files(&[file]);

        assert_eq!(report.errors(), 1);
        assert_eq!(report.violations[0].kind, ViolationKind::Contract);
        assert!(report.violations[0].message.contains("write"));
    }

    #[test]
    fn map_validation_report_flags_duplicates() {
        let mut m = map();
        m.instances[1].owned_paths.push("src/storage/".into());

        let dir = tempfile::tempdir().unwrap();
        let report = validate_map(&m, dir.path());

        assert_eq!(report.errors(), 1);
        assert!(report.failed(false));
        assert!(report.violations[0].message.contains("DUPLICATE OWNERSHIP"));
    }
}
