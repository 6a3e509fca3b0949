//! Violations, per-file decisions, and the merged report.
//!
//! A [`Report`] collects one boundary decision per candidate file plus
//! zero-or-more violations, sorted errors before warnings before info and
//! grouped by file. Reports are ephemeral: callers may export them as JSON
//! but nothing is persisted otherwise.

use std::fmt;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use crate::error::CheckError;
use crate::policy::Verdict;

/// Severity of a violation. Ordering is report rank: errors sort first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// What kind of rule produced a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Modification of a file owned by another instance.
    Ownership,
    /// Critical file outside every declared boundary.
    Undefined,
    /// Cross-boundary import.
    Import,
    /// Source file could not be parsed.
    ParseError,
    /// Candidate path does not exist on disk.
    PathNotFound,
    /// Interface contract not satisfied.
    Contract,
}

/// One finding, never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    /// The acting instance.
    pub instance: String,
    /// Project-relative file the finding concerns.
    pub file: String,
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    pub severity: Severity,
    pub message: String,
}

/// The boundary verdict for one candidate file.
#[derive(Debug, Clone)]
pub struct FileDecision {
    pub file: String,
    pub verdict: Verdict,
    pub reason: String,
}

/// Merged result of one validation run.
#[derive(Debug)]
pub struct Report {
    /// The acting instance.
    pub instance: String,
    /// One decision per candidate file, in input order.
    pub decisions: Vec<FileDecision>,
    /// All violations, ranked by severity then grouped by file.
    pub violations: Vec<Violation>,
}

impl Report {
    pub fn new(instance: &str) -> Self {
        Self {
            instance: instance.to_string(),
            decisions: Vec::new(),
            violations: Vec::new(),
        }
    }

    /// Rank violations errors-first, grouping by file within a severity.
    ///
    /// The sort is stable, so per-file ordering (e.g. import line order) is
    /// preserved and the result is independent of how many workers produced
    /// the violations.
    pub fn sort(&mut self) {
        self.violations
            .sort_by(|a, b| a.severity.cmp(&b.severity).then_with(|| a.file.cmp(&b.file)));
    }

    pub fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn infos(&self) -> usize {
        self.count(Severity::Info)
    }

    fn count(&self, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.errors() > 0
    }

    /// Whether this run should exit non-zero. Strict mode also fails on
    /// warnings.
    pub fn failed(&self, strict: bool) -> bool {
        self.has_errors() || (strict && self.warnings() > 0)
    }

    /// Snapshot the report for JSON export.
    pub fn to_export(&self) -> ReportExport<'_> {
        ReportExport {
            timestamp: Utc::now().to_rfc3339(),
            instance: &self.instance,
            total_violations: self.violations.len(),
            errors: self.errors(),
            warnings: self.warnings(),
            violations: &self.violations,
        }
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), CheckError> {
        let json = serde_json::to_string_pretty(&self.to_export()).map_err(|e| {
            CheckError::ExportSerde {
                message: e.to_string(),
            }
        })?;
        std::fs::write(path, json).map_err(|source| CheckError::ExportIo {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Render the human-readable summary.
    pub fn render(&self) -> String {
        let mut out = String::new();

        for decision in &self.decisions {
            out.push_str(&format!(
                "{:9} {} ({})\n",
                decision.verdict.to_string(),
                decision.file,
                decision.reason
            ));
        }

        for severity in [Severity::Error, Severity::Warning, Severity::Info] {
            let group: Vec<&Violation> = self
                .violations
                .iter()
                .filter(|v| v.severity == severity)
                .collect();
            if group.is_empty() {
                continue;
            }
            out.push_str(&format!("\n{} {severity}(s):\n", group.len()));
            for v in group {
                out.push_str(&format!("  [{}] {}\n", v.file, v.message));
            }
        }

        out.push_str(&format!(
            "\nsummary: {} error(s), {} warning(s), {} info\n",
            self.errors(),
            self.warnings(),
            self.infos()
        ));
        out
    }
}

/// JSON export shape for CI integration.
#[derive(Debug, Serialize)]
pub struct ReportExport<'a> {
    pub timestamp: String,
    pub instance: &'a str,
    pub total_violations: usize,
    pub errors: usize,
    pub warnings: usize,
    pub violations: &'a [Violation],
}
