//! Per-import validators and the accumulating validation chain.
//!
//! Validators are independent predicate-evaluators over one
//! [`ImportStatement`] plus a read-only [`ValidationContext`]. The chain runs
//! *every* validator for every import and concatenates their findings —
//! there is no early exit, so two validators may each flag the same import.
//!
//! Only imports whose dotted module begins with the project-internal root
//! prefix are inspected; external and standard-library imports pass through
//! untouched.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ConfigError;
use crate::extract::ImportStatement;
use crate::ownership::OwnershipMap;
use crate::report::Severity;

/// Read-only context for one validation run.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    /// The instance doing the importing.
    pub instance_id: String,
    /// Dotted root of project-internal modules (e.g. "src").
    pub root_prefix: String,
    /// Directory prefixes the acting instance owns.
    pub owned_paths: BTreeSet<String>,
    /// Prefixes the acting instance may import from beyond its own territory.
    pub allowed_imports: BTreeSet<String>,
    /// Shared prefixes importable by everyone.
    pub shared_prefixes: Vec<String>,
    /// Every instance's owned prefixes, for cross-instance detection.
    pub all_instance_boundaries: BTreeMap<String, Vec<String>>,
}

impl ValidationContext {
    /// Build the context for one acting instance from the ownership map.
    pub fn for_instance(map: &OwnershipMap, instance_id: &str) -> Result<Self, ConfigError> {
        let boundary = map
            .instance(instance_id)
            .ok_or_else(|| ConfigError::UnknownInstance {
                instance: instance_id.to_string(),
            })?;

        Ok(Self {
            instance_id: instance_id.to_string(),
            root_prefix: map.root_prefix.clone(),
            owned_paths: boundary.owned_paths.iter().cloned().collect(),
            allowed_imports: boundary.allowed_imports.iter().cloned().collect(),
            shared_prefixes: map.shared_prefixes(),
            all_instance_boundaries: map
                .instances
                .iter()
                .map(|b| (b.id.clone(), b.owned_paths.clone()))
                .collect(),
        })
    }

    /// Whether a dotted module is project-internal and therefore checked.
    fn is_internal(&self, module: &str) -> bool {
        module == self.root_prefix || module.starts_with(&format!("{}.", self.root_prefix))
    }
}

/// An import flagged by a validator.
#[derive(Debug, Clone)]
pub struct ImportViolation {
    pub import: ImportStatement,
    /// Name of the validator that produced this finding.
    pub validator: &'static str,
    pub message: String,
    pub severity: Severity,
}

/// One link of the validation chain.
pub trait ImportValidator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Check one import; `None` means this validator has no objection.
    fn validate(&self, stmt: &ImportStatement, ctx: &ValidationContext)
        -> Option<ImportViolation>;
}

/// Checks that imports come from owned or explicitly allowed prefixes.
///
/// Currently a pass-through: imports outside both sets fall to
/// [`CrossInstanceValidator`] when they land in another instance's territory,
/// and are tolerated otherwise. Kept as the extension point for a stricter
/// allow-list mode.
pub struct OwnedPathValidator;

impl ImportValidator for OwnedPathValidator {
    fn name(&self) -> &'static str {
        "OwnedPathValidator"
    }

    fn validate(
        &self,
        stmt: &ImportStatement,
        ctx: &ValidationContext,
    ) -> Option<ImportViolation> {
        if !ctx.is_internal(&stmt.module) {
            return None;
        }

        let module_path = stmt.module_path();
        if ctx.owned_paths.iter().any(|p| module_path.starts_with(p.as_str())) {
            return None;
        }
        if ctx
            .allowed_imports
            .iter()
            .any(|p| module_path.starts_with(p.as_str()))
        {
            return None;
        }

        // Neither owned nor allowed: tolerated here.
        None
    }
}

/// Recognizes shared/common module imports as always valid.
///
/// Extension point for future rules over shared territory, such as
/// circular-dependency detection between shared modules.
pub struct SharedImportValidator;

impl ImportValidator for SharedImportValidator {
    fn name(&self) -> &'static str {
        "SharedImportValidator"
    }

    fn validate(
        &self,
        stmt: &ImportStatement,
        ctx: &ValidationContext,
    ) -> Option<ImportViolation> {
        let module_path = stmt.module_path();
        let _is_shared = ctx
            .shared_prefixes
            .iter()
            .any(|p| module_path.starts_with(p.as_str()));
        None
    }
}

/// Detects imports reaching into another instance's territory.
///
/// The only validator in the default chain that can fail a run.
pub struct CrossInstanceValidator;

impl ImportValidator for CrossInstanceValidator {
    fn name(&self) -> &'static str {
        "CrossInstanceValidator"
    }

    fn validate(
        &self,
        stmt: &ImportStatement,
        ctx: &ValidationContext,
    ) -> Option<ImportViolation> {
        if !ctx.is_internal(&stmt.module) {
            return None;
        }

        let module_path = stmt.module_path();
        for (other, owned_paths) in &ctx.all_instance_boundaries {
            if *other == ctx.instance_id {
                continue;
            }
            for prefix in owned_paths {
                if module_path.starts_with(prefix.as_str()) {
                    return Some(ImportViolation {
                        import: stmt.clone(),
                        validator: self.name(),
                        message: format!(
                            "cannot import from {other}'s module: {} (line {})",
                            stmt.module, stmt.line_number
                        ),
                        severity: Severity::Error,
                    });
                }
            }
        }

        None
    }
}

/// An ordered list of validators, all always invoked.
pub struct ValidationChain {
    validators: Vec<Box<dyn ImportValidator>>,
}

impl ValidationChain {
    /// The standard chain: owned-path, shared-import, cross-instance.
    pub fn standard() -> Self {
        Self {
            validators: vec![
                Box::new(OwnedPathValidator),
                Box::new(SharedImportValidator),
                Box::new(CrossInstanceValidator),
            ],
        }
    }

    /// Append a custom validator to the chain.
    pub fn push(&mut self, validator: Box<dyn ImportValidator>) {
        self.validators.push(validator);
    }

    /// Run every validator against one import, concatenating all findings.
    pub fn run(&self, stmt: &ImportStatement, ctx: &ValidationContext) -> Vec<ImportViolation> {
        self.validators
            .iter()
            .filter_map(|v| v.validate(stmt, ctx))
            .collect()
    }
}

impl Default for ValidationChain {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

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

    fn ctx() -> ValidationContext {
        ValidationContext::for_instance(&map(), "instance1").unwrap()
    }

    fn stmt(module: &str, line: usize) -> ImportStatement {
        ImportStatement {
            module: module.to_string(),
            names: vec!["Thing".into()],
            level: 0,
            source_file: PathBuf::from("src/storage/gcs.py"),
            line_number: line,
            is_from_import: true,
        }
    }

    #[test]
    fn cross_instance_import_is_an_error() {
        let violations = ValidationChain::standard().run(&stmt("src.embeddings.generator", 4), &ctx());
        assert_eq!(violations.len(), 1);
        let v = &violations[0];
        assert_eq!(v.severity, Severity::Error);
        assert_eq!(v.validator, "CrossInstanceValidator");
        assert!(v.message.contains("instance2"));
        assert!(v.message.contains("src.embeddings.generator"));
        assert!(v.message.contains("line 4"));
    }

    #[test]
    fn own_territory_and_shared_imports_are_clean() {
        let chain = ValidationChain::standard();
        assert!(chain.run(&stmt("src.storage.adapters", 1), &ctx()).is_empty());
        assert!(chain.run(&stmt("src.common.types", 2), &ctx()).is_empty());
    }

    #[test]
    fn external_imports_pass_through_untouched() {
        let chain = ValidationChain::standard();
        assert!(chain.run(&stmt("os.path", 1), &ctx()).is_empty());
        assert!(chain.run(&stmt("numpy", 1), &ctx()).is_empty());
        // "srcx" must not be mistaken for the "src" root.
        assert!(chain.run(&stmt("srcx.embeddings", 1), &ctx()).is_empty());
    }

    #[test]
    fn unknown_instance_is_a_config_error() {
        let err = ValidationContext::for_instance(&map(), "instance9").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownInstance { .. }));
    }

    #[test]
    fn chain_accumulates_across_validators() {
        struct AlwaysInfo;
        impl ImportValidator for AlwaysInfo {
            fn name(&self) -> &'static str {
                "AlwaysInfo"
            }
            fn validate(
                &self,
                stmt: &ImportStatement,
                _ctx: &ValidationContext,
            ) -> Option<ImportViolation> {
                Some(ImportViolation {
                    import: stmt.clone(),
                    validator: self.name(),
                    message: "noted".into(),
                    severity: Severity::Info,
                })
            }
        }

        let mut chain = ValidationChain::standard();
        chain.push(Box::new(AlwaysInfo));

        // The cross-instance error and the custom info finding both surface.
        let violations = chain.run(&stmt("src.embeddings.generator", 9), &ctx());
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().any(|v| v.severity == Severity::Error));
        assert!(violations.iter().any(|v| v.severity == Severity::Info));
    }

    #[test]
    fn relative_imports_are_not_cross_instance() {
        let relative = ImportStatement {
            module: "helpers".into(),
            names: vec!["util".into()],
            level: 1,
            source_file: PathBuf::from("src/storage/gcs.py"),
            line_number: 3,
            is_from_import: true,
        };
        assert!(ValidationChain::standard().run(&relative, &ctx()).is_empty());
    }
}
