//! Interface contract checking via capability descriptors.
//!
//! A [`CapabilityDescriptor`] names an interface and the methods any
//! implementation must define. The scanner finds classes whose *direct* base
//! list textually names a described interface and reports missing methods.
//!
//! Known limitation: only direct, textually-matching base classes are
//! recognized. Transitive inheritance and aliased imports are invisible to
//! the scan.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// An interface contract: name plus required method set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Interface class name (e.g. "StorageAdapter").
    pub name: String,
    /// Method names every implementation must define.
    #[serde(default)]
    pub required_methods: Vec<String>,
}

/// A class that names an interface but does not satisfy its contract.
#[derive(Debug, Clone)]
pub struct ContractViolation {
    pub class_name: String,
    pub interface: String,
    /// Required methods the class fails to define.
    pub missing: Vec<String>,
    /// Line of the class definition.
    pub line_number: usize,
}

/// A scanned Python class: name, direct bases, defined methods.
#[derive(Debug)]
struct PyClass {
    name: String,
    bases: Vec<String>,
    methods: Vec<String>,
    line_number: usize,
    indent: usize,
}

/// Check every class in `source` against the capability descriptors.
pub fn check_contracts(
    path: &Path,
    source: &str,
    descriptors: &[CapabilityDescriptor],
) -> Vec<ContractViolation> {
    if descriptors.is_empty() || path.extension().and_then(|e| e.to_str()) != Some("py") {
        return Vec::new();
    }

    let mut violations = Vec::new();
    for class in scan_classes(source) {
        for base in &class.bases {
            let Some(descriptor) = descriptors.iter().find(|d| d.name == *base) else {
                continue;
            };
            let missing: Vec<String> = descriptor
                .required_methods
                .iter()
                .filter(|m| !class.methods.contains(m))
                .cloned()
                .collect();
            if !missing.is_empty() {
                violations.push(ContractViolation {
                    class_name: class.name.clone(),
                    interface: descriptor.name.clone(),
                    missing,
                    line_number: class.line_number,
                });
            }
        }
    }
    violations
}

/// Line-based scan for `class Name(Base, ...):` headers and their `def`s.
///
/// A method belongs to the most recently opened class whose indent is
/// shallower than the `def` line. Multi-line class headers are not followed.
fn scan_classes(source: &str) -> Vec<PyClass> {
    let mut classes: Vec<PyClass> = Vec::new();
    // Indices into `classes` for the currently-open lexical nesting.
    let mut open: Vec<usize> = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let trimmed = raw.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = raw.len() - trimmed.len();

        // Close any class at or outside this indent.
        while let Some(&last) = open.last() {
            if indent <= classes[last].indent {
                open.pop();
            } else {
                break;
            }
        }

        if let Some(rest) = trimmed.strip_prefix("class ") {
            if let Some((name, bases)) = parse_class_header(rest) {
                classes.push(PyClass {
                    name,
                    bases,
                    methods: Vec::new(),
                    line_number: idx + 1,
                    indent,
                });
                open.push(classes.len() - 1);
            }
        } else if let Some(rest) = trimmed
            .strip_prefix("def ")
            .or_else(|| trimmed.strip_prefix("async def "))
        {
            if let (Some(&owner), Some(name)) = (open.last(), identifier_prefix(rest)) {
                classes[owner].methods.push(name);
            }
        }
    }

    classes
}

/// Parse `Name(Base1, pkg.Base2):` → (Name, [Base1, Base2]).
///
/// Dotted bases keep only their final segment, matching how the contract
/// names interfaces.
fn parse_class_header(header: &str) -> Option<(String, Vec<String>)> {
    let header = header.split(':').next()?.trim();
    let (name, bases) = match header.split_once('(') {
        Some((name, rest)) => {
            let inside = rest.strip_suffix(')')?;
            let bases = inside
                .split(',')
                .map(|b| b.trim())
                .filter(|b| !b.is_empty() && !b.contains('='))
                .filter_map(|b| b.rsplit('.').next())
                .map(str::to_string)
                .collect();
            (name.trim(), bases)
        }
        None => (header, Vec::new()),
    };
    identifier_prefix(name).map(|n| (n, bases))
}

/// Leading identifier of a string, if any.
fn identifier_prefix(text: &str) -> Option<String> {
    let ident: String = text
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if ident.is_empty() { None } else { Some(ident) }
}
